pub mod amortization;
pub mod backfill;
pub mod ledger;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::decimal::Money;
use crate::types::{PaymentId, PaymentKind, PaymentMethod, PaymentSplit, SaleId};

pub use amortization::{
    add_months, compute_installment, AmortizationCalculator, AmortizationSchedule,
    ScheduledInstallment,
};
pub use backfill::{backfill_sale, needs_backfill};
pub use ledger::{PaymentAllocation, PaymentLedger};

/// payment request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PaymentRequest {
    pub amount: Money,
    pub payment_date: NaiveDate,
    pub method: PaymentMethod,
    pub note: Option<String>,
}

impl PaymentRequest {
    pub fn new(amount: Money, payment_date: NaiveDate, method: PaymentMethod) -> Self {
        Self {
            amount,
            payment_date,
            method,
            note: None,
        }
    }

    pub fn with_note(mut self, note: impl Into<String>) -> Self {
        self.note = Some(note.into());
        self
    }
}

/// a recorded payment, immutable once stored
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Payment {
    id: PaymentId,
    sale_id: SaleId,
    amount: Money,
    payment_date: NaiveDate,
    method: PaymentMethod,
    split: PaymentSplit,
    note: Option<String>,
    recorded_at: DateTime<Utc>,
}

impl Payment {
    pub(crate) fn new(
        sale_id: SaleId,
        request: PaymentRequest,
        split: PaymentSplit,
        recorded_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            sale_id,
            amount: request.amount,
            payment_date: request.payment_date,
            method: request.method,
            split,
            note: request.note,
            recorded_at,
        }
    }

    pub fn id(&self) -> PaymentId {
        self.id
    }

    pub fn sale_id(&self) -> SaleId {
        self.sale_id
    }

    pub fn amount(&self) -> Money {
        self.amount
    }

    pub fn payment_date(&self) -> NaiveDate {
        self.payment_date
    }

    pub fn method(&self) -> PaymentMethod {
        self.method
    }

    pub fn split(&self) -> PaymentSplit {
        self.split
    }

    pub fn note(&self) -> Option<&str> {
        self.note.as_deref()
    }

    pub fn recorded_at(&self) -> DateTime<Utc> {
        self.recorded_at
    }

    /// down payments never touch the interest-bearing balance
    pub fn kind(&self) -> PaymentKind {
        self.method.kind()
    }

    /// rows written before splits were tracked carry zero on every component
    pub fn has_split(&self) -> bool {
        !self.split.is_empty()
    }

    /// split rewrite for legacy rows; the amount itself never changes
    pub(crate) fn set_split(&mut self, split: PaymentSplit) {
        self.split = split;
    }
}
