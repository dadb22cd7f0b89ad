use chrono::{DateTime, NaiveDate, Utc};
use hourglass_rs::SafeTimeProvider;
use serde::{Deserialize, Serialize};
use tracing::info;
use uuid::Uuid;

use crate::config::EngineConfig;
use crate::decimal::{Money, Rate};
use crate::errors::{Result, SaleError};
use crate::events::{Event, EventStore};
use crate::payments::{AmortizationCalculator, Payment, PaymentRequest};
use crate::types::{
    ClusterId, CustomerCriteria, CustomerId, PaymentKind, PaymentMethod, PaymentSplit, SaleId,
    SaleStatus,
};

impl SaleStatus {
    /// status implied by the amounts once financing is running
    pub fn settled(amount_paid: Money, price: Money) -> SaleStatus {
        if amount_paid >= price {
            SaleStatus::Paid
        } else {
            SaleStatus::Process
        }
    }
}

impl CustomerCriteria {
    /// criteria after a payment lands; only a deposit advances automatically
    pub fn on_payment(self) -> Option<CustomerCriteria> {
        match self {
            CustomerCriteria::Deposited => Some(CustomerCriteria::Process),
            _ => None,
        }
    }

    /// criteria that open a sale as soon as the customer is registered
    pub fn opening_hold(self) -> Option<SaleStatus> {
        match self {
            CustomerCriteria::Booked => Some(SaleStatus::Booked),
            CustomerCriteria::Deposited => Some(SaleStatus::Deposited),
            _ => None,
        }
    }
}

/// prospective or active buyer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Customer {
    pub id: CustomerId,
    pub name: String,
    pub cluster_id: Option<ClusterId>,
    criteria: CustomerCriteria,
}

impl Customer {
    pub fn new(name: impl Into<String>, criteria: CustomerCriteria) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            cluster_id: None,
            criteria,
        }
    }

    pub fn interested_in(mut self, cluster_id: ClusterId) -> Self {
        self.cluster_id = Some(cluster_id);
        self
    }

    pub fn criteria(&self) -> CustomerCriteria {
        self.criteria
    }

    /// one-way advance after a payment, returns whether the criteria changed
    pub fn advance_on_payment(&mut self, time: &SafeTimeProvider, events: &mut EventStore) -> bool {
        let Some(next) = self.criteria.on_payment() else {
            return false;
        };

        let old = self.criteria;
        self.criteria = next;
        events.emit(Event::CriteriaAdvanced {
            customer_id: self.id,
            old_criteria: old,
            new_criteria: next,
            timestamp: time.now(),
        });
        info!(customer_id = %self.id, from = ?old, to = ?next, "customer criteria advanced");
        true
    }
}

/// property cluster listing a sale is drawn from
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Cluster {
    pub id: ClusterId,
    pub name: String,
    pub unit_type: String,
    pub price: Money,
}

/// financing chosen when a customer books or deposits on a unit
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BookingTerms {
    pub down_payment: Money,
    pub term_months: i64,
    pub interest_rate: Rate,
    pub method: PaymentMethod,
    pub booking_date: NaiveDate,
}

/// everything needed to open a sale
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SaleTerms {
    pub customer_id: CustomerId,
    pub cluster_id: ClusterId,
    /// unit type captured at sale time, kept even if the cluster changes later
    pub unit_type: String,
    pub price: Money,
    pub down_payment: Money,
    pub term_months: i64,
    pub interest_rate: Rate,
    /// installments fall due monthly from this date
    pub origination_date: Option<NaiveDate>,
    pub booking_date: NaiveDate,
    /// how the buyer settles the balance (cash, installments, mortgage)
    pub payment_method: PaymentMethod,
    /// `Booked` or `Deposited` to open the sale on hold
    pub hold: Option<SaleStatus>,
}

impl SaleTerms {
    pub fn validate(&self, config: &EngineConfig) -> Result<()> {
        if !self.price.is_positive() {
            return Err(SaleError::InvalidAmount {
                field: "price",
                amount: self.price,
            });
        }
        if self.down_payment.is_negative() {
            return Err(SaleError::InvalidAmount {
                field: "down payment",
                amount: self.down_payment,
            });
        }
        if self.term_months < 0 || self.term_months > i64::from(config.max_term_months) {
            return Err(SaleError::InvalidTerm {
                term: self.term_months,
            });
        }
        if self.interest_rate.is_negative() {
            return Err(SaleError::InvalidInterestRate {
                rate: self.interest_rate,
            });
        }
        if let Some(hold) = self.hold {
            if !hold.is_hold() {
                return Err(SaleError::InvalidConfiguration {
                    message: format!("a sale cannot open on hold as {hold}"),
                });
            }
        }
        Ok(())
    }
}

/// a financed property sale and its append-only payment history
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Sale {
    id: SaleId,
    customer_id: CustomerId,
    cluster_id: ClusterId,
    unit_type: String,
    price: Money,
    down_payment: Money,
    term_months: u32,
    interest_rate: Rate,
    origination_date: Option<NaiveDate>,
    booking_date: Option<NaiveDate>,
    payment_method: PaymentMethod,
    amount_paid: Money,
    monthly_installment: Money,
    status: SaleStatus,
    payments: Vec<Payment>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl Sale {
    /// open a sale, computing its installment and recording any down payment
    pub fn originate(
        terms: SaleTerms,
        customer: Option<&mut Customer>,
        config: &EngineConfig,
        time: &SafeTimeProvider,
        events: &mut EventStore,
    ) -> Result<Self> {
        terms.validate(config)?;
        let now = time.now();

        let financed = terms.price - terms.down_payment;
        let monthly_installment =
            AmortizationCalculator::new(config).installment(financed, terms.term_months, terms.interest_rate)?;
        let term_months = u32::try_from(terms.term_months).map_err(|_| SaleError::InvalidTerm {
            term: terms.term_months,
        })?;

        let status = match terms.hold {
            Some(_) if terms.down_payment >= terms.price => SaleStatus::Paid,
            Some(hold) => hold,
            None => SaleStatus::settled(terms.down_payment, terms.price),
        };

        let mut sale = Self {
            id: Uuid::new_v4(),
            customer_id: terms.customer_id,
            cluster_id: terms.cluster_id,
            unit_type: terms.unit_type,
            price: terms.price,
            down_payment: terms.down_payment,
            term_months,
            interest_rate: terms.interest_rate,
            origination_date: terms.origination_date,
            booking_date: Some(terms.booking_date),
            payment_method: terms.payment_method,
            amount_paid: Money::ZERO,
            monthly_installment,
            status,
            payments: Vec::new(),
            created_at: now,
            updated_at: now,
        };

        events.emit(Event::SaleOriginated {
            sale_id: sale.id,
            customer_id: sale.customer_id,
            price: sale.price,
            down_payment: sale.down_payment,
            monthly_installment,
            term_months,
            timestamp: now,
        });

        if terms.down_payment.is_positive() {
            let request = PaymentRequest::new(terms.down_payment, terms.booking_date, PaymentMethod::Initial)
                .with_note("Booking fee / down payment");
            let payment = Payment::new(
                sale.id,
                request,
                PaymentSplit::all_principal(terms.down_payment),
                now,
            );
            sale.append_payment(payment, now);

            if terms.hold.is_none() {
                if let Some(customer) = customer {
                    customer.advance_on_payment(time, events);
                }
            }
        }

        info!(
            sale_id = %sale.id,
            price = %sale.price,
            down_payment = %sale.down_payment,
            term_months,
            installment = %monthly_installment,
            status = %sale.status,
            "sale originated"
        );

        Ok(sale)
    }

    /// open the sale that a booked or deposited customer implies, if any
    pub fn from_booking(
        customer: &Customer,
        cluster: &Cluster,
        booking: BookingTerms,
        config: &EngineConfig,
        time: &SafeTimeProvider,
        events: &mut EventStore,
    ) -> Result<Option<Self>> {
        let Some(hold) = customer.criteria().opening_hold() else {
            return Ok(None);
        };

        let terms = SaleTerms {
            customer_id: customer.id,
            cluster_id: cluster.id,
            unit_type: cluster.unit_type.clone(),
            price: cluster.price,
            down_payment: booking.down_payment,
            term_months: booking.term_months,
            interest_rate: booking.interest_rate,
            origination_date: Some(booking.booking_date),
            booking_date: booking.booking_date,
            payment_method: booking.method,
            hold: Some(hold),
        };

        Self::originate(terms, None, config, time, events).map(Some)
    }

    pub fn id(&self) -> SaleId {
        self.id
    }

    pub fn customer_id(&self) -> CustomerId {
        self.customer_id
    }

    pub fn cluster_id(&self) -> ClusterId {
        self.cluster_id
    }

    pub fn unit_type(&self) -> &str {
        &self.unit_type
    }

    pub fn price(&self) -> Money {
        self.price
    }

    pub fn down_payment(&self) -> Money {
        self.down_payment
    }

    pub fn term_months(&self) -> u32 {
        self.term_months
    }

    pub fn interest_rate(&self) -> Rate {
        self.interest_rate
    }

    pub fn origination_date(&self) -> Option<NaiveDate> {
        self.origination_date
    }

    pub fn booking_date(&self) -> Option<NaiveDate> {
        self.booking_date
    }

    pub fn payment_method(&self) -> PaymentMethod {
        self.payment_method
    }

    /// headline running total, down payment included
    pub fn amount_paid(&self) -> Money {
        self.amount_paid
    }

    pub fn monthly_installment(&self) -> Money {
        self.monthly_installment
    }

    pub fn status(&self) -> SaleStatus {
        self.status
    }

    /// payments in recording order
    pub fn payments(&self) -> &[Payment] {
        &self.payments
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }

    /// price less the down payment, the amount actually amortized
    pub fn financed_principal(&self) -> Money {
        self.price - self.down_payment
    }

    /// principal repaid through installment payments, down payment excluded
    pub fn principal_repaid(&self) -> Money {
        self.payments
            .iter()
            .filter(|p| p.kind() == PaymentKind::Installment)
            .map(|p| p.split().principal)
            .sum()
    }

    pub fn interest_paid(&self) -> Money {
        self.payments.iter().map(|p| p.split().interest).sum()
    }

    pub fn is_fully_paid(&self) -> bool {
        self.amount_paid >= self.price
    }

    /// operator edit of the price; the installment follows the new financed principal
    pub fn change_price(
        &mut self,
        new_price: Money,
        config: &EngineConfig,
        time: &SafeTimeProvider,
        events: &mut EventStore,
    ) -> Result<()> {
        if !new_price.is_positive() {
            return Err(SaleError::InvalidAmount {
                field: "price",
                amount: new_price,
            });
        }

        let installment = self.installment_for(new_price - self.down_payment, self.interest_rate, config)?;

        let now = time.now();
        let old_price = self.price;
        self.price = new_price;
        events.emit(Event::PriceChanged {
            sale_id: self.id,
            old_price,
            new_price,
            timestamp: now,
        });
        info!(sale_id = %self.id, old_price = %old_price, new_price = %new_price, "price changed");

        self.apply_installment(installment, "price changed", time, events);
        self.reevaluate_status("price changed", time, events);
        self.updated_at = now;
        Ok(())
    }

    pub fn change_interest_rate(
        &mut self,
        new_rate: Rate,
        config: &EngineConfig,
        time: &SafeTimeProvider,
        events: &mut EventStore,
    ) -> Result<()> {
        if new_rate.is_negative() {
            return Err(SaleError::InvalidInterestRate { rate: new_rate });
        }

        let installment = self.installment_for(self.financed_principal(), new_rate, config)?;

        let now = time.now();
        let old_rate = self.interest_rate;
        self.interest_rate = new_rate;
        events.emit(Event::InterestRateChanged {
            sale_id: self.id,
            old_rate,
            new_rate,
            timestamp: now,
        });
        info!(sale_id = %self.id, old_rate = %old_rate, new_rate = %new_rate, "interest rate changed");

        self.apply_installment(installment, "interest rate changed", time, events);
        self.reevaluate_status("interest rate changed", time, events);
        self.updated_at = now;
        Ok(())
    }

    /// correct the recorded down payment; cumulative paid moves by the same delta
    pub fn correct_down_payment(
        &mut self,
        new_down_payment: Money,
        config: &EngineConfig,
        time: &SafeTimeProvider,
        events: &mut EventStore,
    ) -> Result<()> {
        if new_down_payment.is_negative() {
            return Err(SaleError::InvalidAmount {
                field: "down payment",
                amount: new_down_payment,
            });
        }

        let corrected_total = self.amount_paid + (new_down_payment - self.down_payment);
        if corrected_total.is_negative() {
            return Err(SaleError::InvalidAmount {
                field: "amount paid",
                amount: corrected_total,
            });
        }

        let installment = self.installment_for(self.price - new_down_payment, self.interest_rate, config)?;

        let now = time.now();
        let old_down_payment = self.down_payment;
        self.down_payment = new_down_payment;
        self.amount_paid = corrected_total;
        events.emit(Event::DownPaymentCorrected {
            sale_id: self.id,
            old_down_payment,
            new_down_payment,
            timestamp: now,
        });
        info!(
            sale_id = %self.id,
            old_down_payment = %old_down_payment,
            new_down_payment = %new_down_payment,
            "down payment corrected"
        );

        self.apply_installment(installment, "down payment corrected", time, events);
        self.reevaluate_status("down payment corrected", time, events);
        self.updated_at = now;
        Ok(())
    }

    /// the only path by which cumulative paid may decrease
    pub fn correct_amount_paid(
        &mut self,
        new_amount: Money,
        time: &SafeTimeProvider,
        events: &mut EventStore,
    ) -> Result<()> {
        if new_amount.is_negative() {
            return Err(SaleError::InvalidAmount {
                field: "amount paid",
                amount: new_amount,
            });
        }

        let now = time.now();
        let old_amount = self.amount_paid;
        self.amount_paid = new_amount;
        events.emit(Event::AmountPaidCorrected {
            sale_id: self.id,
            old_amount,
            new_amount,
            timestamp: now,
        });
        info!(sale_id = %self.id, old_amount = %old_amount, new_amount = %new_amount, "amount paid corrected");

        self.reevaluate_status("amount paid corrected", time, events);
        self.updated_at = now;
        Ok(())
    }

    /// explicit operator status change
    pub fn override_status(
        &mut self,
        new_status: SaleStatus,
        reason: &str,
        time: &SafeTimeProvider,
        events: &mut EventStore,
    ) -> Result<()> {
        // a hold cannot be re-entered once installments are flowing
        if new_status.is_hold()
            && !self.status.is_hold()
            && self.payments.iter().any(|p| p.kind() == PaymentKind::Installment)
        {
            return Err(SaleError::InvalidTransition {
                from: self.status,
                to: new_status,
            });
        }

        self.transition(new_status, reason, time, events);
        Ok(())
    }

    /// leave a Booked/Deposited hold once a payment lands
    pub(crate) fn release_hold(&mut self, time: &SafeTimeProvider, events: &mut EventStore) -> Result<()> {
        if !self.status.is_hold() {
            return Err(SaleError::InvalidTransition {
                from: self.status,
                to: SaleStatus::Process,
            });
        }
        let next = SaleStatus::settled(self.amount_paid, self.price);
        self.transition(next, "payment received on hold", time, events);
        Ok(())
    }

    /// recompute Paid/Process from the amounts; holds are left alone
    pub(crate) fn reevaluate_status(&mut self, reason: &str, time: &SafeTimeProvider, events: &mut EventStore) {
        if self.status.is_hold() {
            return;
        }
        let next = SaleStatus::settled(self.amount_paid, self.price);
        self.transition(next, reason, time, events);
    }

    pub(crate) fn payments_mut(&mut self) -> &mut [Payment] {
        &mut self.payments
    }

    pub(crate) fn append_payment(&mut self, payment: Payment, now: DateTime<Utc>) {
        self.amount_paid += payment.amount();
        self.payments.push(payment);
        self.updated_at = now;
    }

    fn transition(&mut self, next: SaleStatus, reason: &str, time: &SafeTimeProvider, events: &mut EventStore) {
        if next == self.status {
            return;
        }
        let old = self.status;
        self.status = next;
        events.emit(Event::StatusChanged {
            sale_id: self.id,
            old_status: old,
            new_status: next,
            reason: reason.to_string(),
            timestamp: time.now(),
        });
        info!(sale_id = %self.id, from = %old, to = %next, reason, "sale status changed");
    }

    /// installment over the sale's term for a prospective principal and rate
    fn installment_for(&self, principal: Money, rate: Rate, config: &EngineConfig) -> Result<Money> {
        AmortizationCalculator::new(config).installment(principal, i64::from(self.term_months), rate)
    }

    fn apply_installment(
        &mut self,
        new_installment: Money,
        reason: &str,
        time: &SafeTimeProvider,
        events: &mut EventStore,
    ) {
        if new_installment != self.monthly_installment {
            let old_installment = self.monthly_installment;
            self.monthly_installment = new_installment;
            events.emit(Event::InstallmentRecalculated {
                sale_id: self.id,
                old_installment,
                new_installment,
                reason: reason.to_string(),
                timestamp: time.now(),
            });
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use chrono::TimeZone;
    use hourglass_rs::TimeSource;
    use rust_decimal_macros::dec;

    pub(crate) fn test_time() -> SafeTimeProvider {
        SafeTimeProvider::new(TimeSource::Test(
            Utc.with_ymd_and_hms(2024, 1, 15, 9, 0, 0).unwrap(),
        ))
    }

    pub(crate) fn terms(price: i64, down_payment: i64, term_months: i64, rate: Rate) -> SaleTerms {
        SaleTerms {
            customer_id: Uuid::new_v4(),
            cluster_id: Uuid::new_v4(),
            unit_type: "Type 36/72".to_string(),
            price: Money::from_major(price),
            down_payment: Money::from_major(down_payment),
            term_months,
            interest_rate: rate,
            origination_date: NaiveDate::from_ymd_opt(2024, 1, 15),
            booking_date: NaiveDate::from_ymd_opt(2024, 1, 15).unwrap(),
            payment_method: PaymentMethod::CashInstallments,
            hold: None,
        }
    }

    #[test]
    fn test_originate_interest_free_sale() {
        let time = test_time();
        let mut events = EventStore::new();

        let sale = Sale::originate(
            terms(1_500_000_000, 10_000_000, 10, Rate::ZERO),
            None,
            &EngineConfig::standard(),
            &time,
            &mut events,
        )
        .unwrap();

        assert_eq!(sale.monthly_installment(), Money::from_major(149_000_000));
        assert_eq!(sale.amount_paid(), Money::from_major(10_000_000));
        assert_eq!(sale.status(), SaleStatus::Process);
        assert_eq!(sale.payments().len(), 1);
        assert_eq!(sale.payments()[0].kind(), PaymentKind::DownPayment);
        assert_eq!(sale.principal_repaid(), Money::ZERO);
        assert!(matches!(events.events()[0], Event::SaleOriginated { .. }));
    }

    #[test]
    fn test_cash_sale_has_no_installment() {
        let time = test_time();
        let mut events = EventStore::new();

        let sale = Sale::originate(
            terms(500_000_000, 500_000_000, 0, Rate::ZERO),
            None,
            &EngineConfig::standard(),
            &time,
            &mut events,
        )
        .unwrap();

        assert_eq!(sale.monthly_installment(), Money::ZERO);
        assert_eq!(sale.status(), SaleStatus::Paid);
    }

    #[test]
    fn test_originate_validates_terms() {
        let time = test_time();
        let mut events = EventStore::new();
        let config = EngineConfig::standard();

        let zero_price = terms(0, 0, 12, Rate::ZERO);
        assert!(matches!(
            Sale::originate(zero_price, None, &config, &time, &mut events),
            Err(SaleError::InvalidAmount { field: "price", .. })
        ));

        let negative_term = terms(1_000, 0, -3, Rate::ZERO);
        assert!(matches!(
            Sale::originate(negative_term, None, &config, &time, &mut events),
            Err(SaleError::InvalidTerm { term: -3 })
        ));

        let mut bad_hold = terms(1_000, 0, 12, Rate::ZERO);
        bad_hold.hold = Some(SaleStatus::Paid);
        assert!(Sale::originate(bad_hold, None, &config, &time, &mut events).is_err());
        assert!(events.is_empty());
    }

    #[test]
    fn test_down_payment_advances_deposited_customer() {
        let time = test_time();
        let mut events = EventStore::new();
        let mut customer = Customer::new("Siti", CustomerCriteria::Deposited);

        let mut sale_terms = terms(300_000_000, 30_000_000, 12, Rate::ZERO);
        sale_terms.customer_id = customer.id;
        Sale::originate(sale_terms, Some(&mut customer), &EngineConfig::standard(), &time, &mut events)
            .unwrap();

        assert_eq!(customer.criteria(), CustomerCriteria::Process);
        assert!(events
            .events()
            .iter()
            .any(|e| matches!(e, Event::CriteriaAdvanced { .. })));
    }

    #[test]
    fn test_criteria_transitions_are_one_way() {
        assert_eq!(CustomerCriteria::Deposited.on_payment(), Some(CustomerCriteria::Process));
        assert_eq!(CustomerCriteria::Process.on_payment(), None);
        assert_eq!(CustomerCriteria::Visited.on_payment(), None);
        assert_eq!(CustomerCriteria::Booked.on_payment(), None);
    }

    #[test]
    fn test_booking_opens_sale_on_hold() {
        let time = test_time();
        let mut events = EventStore::new();
        let cluster = Cluster {
            id: Uuid::new_v4(),
            name: "Green Hills".to_string(),
            unit_type: "Type 45".to_string(),
            price: Money::from_major(450_000_000),
        };
        let booking = BookingTerms {
            down_payment: Money::from_major(5_000_000),
            term_months: 24,
            interest_rate: Rate::ZERO,
            method: PaymentMethod::Cash,
            booking_date: NaiveDate::from_ymd_opt(2024, 1, 15).unwrap(),
        };

        let booked = Customer::new("Budi", CustomerCriteria::Booked);
        let sale = Sale::from_booking(&booked, &cluster, booking.clone(), &EngineConfig::standard(), &time, &mut events)
            .unwrap()
            .unwrap();
        assert_eq!(sale.status(), SaleStatus::Booked);
        assert_eq!(sale.unit_type(), "Type 45");
        assert_eq!(sale.amount_paid(), Money::from_major(5_000_000));

        let visitor = Customer::new("Andi", CustomerCriteria::Visited);
        let none = Sale::from_booking(&visitor, &cluster, booking, &EngineConfig::standard(), &time, &mut events)
            .unwrap();
        assert!(none.is_none());
    }

    #[test]
    fn test_rate_change_recalculates_installment() {
        let time = test_time();
        let mut events = EventStore::new();
        let config = EngineConfig::standard();
        let mut sale = Sale::originate(terms(110_000, 10_000, 12, Rate::ZERO), None, &config, &time, &mut events)
            .unwrap();
        assert_eq!(sale.monthly_installment(), Money::from_str_exact("8333.33").unwrap());

        sale.change_interest_rate(Rate::from_percentage(12), &config, &time, &mut events)
            .unwrap();
        assert_eq!(sale.monthly_installment(), Money::from_str_exact("8884.88").unwrap());
        assert!(events
            .events()
            .iter()
            .any(|e| matches!(e, Event::InstallmentRecalculated { .. })));

        assert!(sale
            .change_interest_rate(Rate::from_percent(dec!(-0.5)), &config, &time, &mut events)
            .is_err());
    }

    #[test]
    fn test_failed_recalculation_leaves_sale_unchanged() {
        let time = test_time();
        let mut events = EventStore::new();
        let mut sale = Sale::originate(
            terms(120_000, 20_000, 12, Rate::ZERO),
            None,
            &EngineConfig::standard(),
            &time,
            &mut events,
        )
        .unwrap();
        let before = sale.clone();
        events.clear();

        let short_terms = EngineConfig {
            max_term_months: 6,
            ..EngineConfig::standard()
        };
        assert!(matches!(
            sale.change_price(Money::from_major(90_000), &short_terms, &time, &mut events),
            Err(SaleError::InvalidTerm { term: 12 })
        ));
        assert!(matches!(
            sale.change_interest_rate(Rate::from_percentage(12), &short_terms, &time, &mut events),
            Err(SaleError::InvalidTerm { .. })
        ));
        assert!(matches!(
            sale.correct_down_payment(Money::from_major(30_000), &short_terms, &time, &mut events),
            Err(SaleError::InvalidTerm { .. })
        ));

        assert_eq!(sale, before);
        assert!(events.is_empty());
    }

    #[test]
    fn test_paid_is_derived_not_latched() {
        let time = test_time();
        let mut events = EventStore::new();
        let config = EngineConfig::standard();
        let mut sale = Sale::originate(terms(100_000, 100_000, 0, Rate::ZERO), None, &config, &time, &mut events)
            .unwrap();
        assert_eq!(sale.status(), SaleStatus::Paid);

        sale.change_price(Money::from_major(120_000), &config, &time, &mut events)
            .unwrap();
        assert_eq!(sale.status(), SaleStatus::Process);

        sale.change_price(Money::from_major(90_000), &config, &time, &mut events)
            .unwrap();
        assert_eq!(sale.status(), SaleStatus::Paid);
    }

    #[test]
    fn test_down_payment_correction() {
        let time = test_time();
        let mut events = EventStore::new();
        let config = EngineConfig::standard();
        let mut sale = Sale::originate(terms(120_000, 20_000, 10, Rate::ZERO), None, &config, &time, &mut events)
            .unwrap();
        assert_eq!(sale.monthly_installment(), Money::from_major(10_000));

        sale.correct_down_payment(Money::from_major(30_000), &config, &time, &mut events)
            .unwrap();
        assert_eq!(sale.down_payment(), Money::from_major(30_000));
        assert_eq!(sale.amount_paid(), Money::from_major(30_000));
        assert_eq!(sale.monthly_installment(), Money::from_major(9_000));
    }

    #[test]
    fn test_amount_paid_correction_can_decrease() {
        let time = test_time();
        let mut events = EventStore::new();
        let config = EngineConfig::standard();
        let mut sale = Sale::originate(terms(100_000, 100_000, 0, Rate::ZERO), None, &config, &time, &mut events)
            .unwrap();

        sale.correct_amount_paid(Money::from_major(40_000), &time, &mut events)
            .unwrap();
        assert_eq!(sale.amount_paid(), Money::from_major(40_000));
        assert_eq!(sale.status(), SaleStatus::Process);

        assert!(sale
            .correct_amount_paid(Money::from_major(-1), &time, &mut events)
            .is_err());
    }

    #[test]
    fn test_override_status_guards_hold_reentry() {
        let time = test_time();
        let mut events = EventStore::new();
        let config = EngineConfig::standard();
        let mut sale = Sale::originate(terms(100_000, 10_000, 10, Rate::ZERO), None, &config, &time, &mut events)
            .unwrap();

        // only the down payment so far, a hold may still be set
        sale.override_status(SaleStatus::Deposited, "customer asked to pause", &time, &mut events)
            .unwrap();
        assert_eq!(sale.status(), SaleStatus::Deposited);

        sale.release_hold(&time, &mut events).unwrap();
        assert_eq!(sale.status(), SaleStatus::Process);
        assert!(matches!(
            sale.release_hold(&time, &mut events),
            Err(SaleError::InvalidTransition { .. })
        ));
    }
}
