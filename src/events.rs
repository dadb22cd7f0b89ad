use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::decimal::{Money, Rate};
use crate::types::{CustomerCriteria, CustomerId, PaymentId, PaymentMethod, SaleId, SaleStatus};

/// all events that can be emitted while a sale is created or mutated
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Event {
    // lifecycle events
    SaleOriginated {
        sale_id: SaleId,
        customer_id: CustomerId,
        price: Money,
        down_payment: Money,
        monthly_installment: Money,
        term_months: u32,
        timestamp: DateTime<Utc>,
    },
    StatusChanged {
        sale_id: SaleId,
        old_status: SaleStatus,
        new_status: SaleStatus,
        reason: String,
        timestamp: DateTime<Utc>,
    },
    CriteriaAdvanced {
        customer_id: CustomerId,
        old_criteria: CustomerCriteria,
        new_criteria: CustomerCriteria,
        timestamp: DateTime<Utc>,
    },

    // payment events
    PaymentRecorded {
        sale_id: SaleId,
        payment_id: PaymentId,
        amount: Money,
        principal: Money,
        interest: Money,
        overpayment: Money,
        method: PaymentMethod,
        payment_date: NaiveDate,
        outstanding_after: Money,
        timestamp: DateTime<Utc>,
    },
    PaymentRejected {
        sale_id: SaleId,
        amount: Money,
        reason: String,
        timestamp: DateTime<Utc>,
    },

    // terms events
    InstallmentRecalculated {
        sale_id: SaleId,
        old_installment: Money,
        new_installment: Money,
        reason: String,
        timestamp: DateTime<Utc>,
    },
    PriceChanged {
        sale_id: SaleId,
        old_price: Money,
        new_price: Money,
        timestamp: DateTime<Utc>,
    },
    InterestRateChanged {
        sale_id: SaleId,
        old_rate: Rate,
        new_rate: Rate,
        timestamp: DateTime<Utc>,
    },
    DownPaymentCorrected {
        sale_id: SaleId,
        old_down_payment: Money,
        new_down_payment: Money,
        timestamp: DateTime<Utc>,
    },
    AmountPaidCorrected {
        sale_id: SaleId,
        old_amount: Money,
        new_amount: Money,
        timestamp: DateTime<Utc>,
    },
}

/// event store for collecting events during operations
#[derive(Debug, Default)]
pub struct EventStore {
    events: Vec<Event>,
}

impl EventStore {
    pub fn new() -> Self {
        Self { events: Vec::new() }
    }

    pub fn emit(&mut self, event: Event) {
        self.events.push(event);
    }

    pub fn take_events(&mut self) -> Vec<Event> {
        std::mem::take(&mut self.events)
    }

    pub fn events(&self) -> &[Event] {
        &self.events
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    pub fn clear(&mut self) {
        self.events.clear();
    }
}
