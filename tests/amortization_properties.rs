//! Property tests for installment amortization and payment splitting

use chrono::{NaiveDate, TimeZone, Utc};
use proptest::prelude::*;
use rust_decimal::Decimal;
use sale_installments_rs::{
    AmortizationCalculator, AmortizationSchedule, EngineConfig, EventStore, Money, PaymentLedger,
    PaymentMethod, PaymentRequest, Rate, SafeTimeProvider, Sale, SaleTerms, TimeSource, Uuid,
};

fn origination() -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 1, 31).unwrap()
}

fn clock() -> SafeTimeProvider {
    SafeTimeProvider::new(TimeSource::Test(Utc.with_ymd_and_hms(2024, 1, 31, 8, 0, 0).unwrap()))
}

/// basis points to a rate, 750 -> 7.5%
fn rate_bps(bps: u32) -> Rate {
    Rate::from_decimal(Decimal::new(i64::from(bps), 4))
}

fn sale_terms(principal: Money, term_months: u32, rate: Rate) -> SaleTerms {
    SaleTerms {
        customer_id: Uuid::new_v4(),
        cluster_id: Uuid::new_v4(),
        unit_type: "Type 36".to_string(),
        price: principal,
        down_payment: Money::ZERO,
        term_months: i64::from(term_months),
        interest_rate: rate,
        origination_date: Some(origination()),
        booking_date: origination(),
        payment_method: PaymentMethod::CashInstallments,
        hold: None,
    }
}

proptest! {
    /// Property: n interest-free installments repay the principal within one rounding unit each
    #[test]
    fn prop_zero_rate_installments_sum_to_principal(
        cents in 100i64..100_000_000_000i64,
        term in 1u32..=600u32,
    ) {
        let config = EngineConfig::standard();
        let principal = Money::from_minor(cents, 2);
        let installment = AmortizationCalculator::new(&config)
            .installment(principal, i64::from(term), Rate::ZERO)
            .expect("installment");

        let repaid = installment * Decimal::from(term);
        let tolerance = Money::from_minor(5, 3) * Decimal::from(term);
        prop_assert!((repaid - principal).abs() <= tolerance, "repaid {} vs principal {}", repaid, principal);
    }

    /// Property: the exact annuity installment drives the balance to zero
    #[test]
    fn prop_exact_installment_fully_amortizes(
        cents in 100_000i64..100_000_000_000i64,
        term in 1u32..=240u32,
        bps in 1u32..=1_500u32,
    ) {
        let rate = rate_bps(bps);
        let principal = Money::from_minor(cents, 2);
        let installment = AmortizationCalculator::new(&EngineConfig::standard())
            .exact_installment(principal, i64::from(term), rate)
            .expect("installment");

        let r = rate.monthly_rate();
        let mut balance = principal;
        for _ in 0..term {
            balance = balance + balance * r - installment;
        }
        prop_assert!(balance.abs() < Money::from_minor(1, 6), "residual balance {}", balance);
    }

    /// Property: a projected schedule ends at exactly zero and repays exactly the principal
    #[test]
    fn prop_schedule_closes_at_zero(
        cents in 100_000i64..10_000_000_000i64,
        term in 1u32..=240u32,
        bps in 0u32..=1_500u32,
    ) {
        let principal = Money::from_minor(cents, 2);
        let schedule = AmortizationSchedule::project(
            principal,
            i64::from(term),
            rate_bps(bps),
            origination(),
            &EngineConfig::standard(),
        ).expect("schedule");

        let last = schedule.rows.last().expect("at least one row");
        prop_assert_eq!(last.ending_balance, Money::ZERO);
        let repaid: Money = schedule.rows.iter().map(|row| row.principal_portion).sum();
        prop_assert_eq!(repaid, principal);
        prop_assert!(schedule.rows.len() <= term as usize);
    }

    /// Property: paying the rounded installment for the whole term is always accepted
    /// and leaves at most the accumulated rounding residue
    #[test]
    fn prop_ledger_payments_amortize_balance(
        cents in 1_000_000i64..1_000_000_000i64,
        term in 1u32..=120u32,
        bps in 1u32..=1_500u32,
    ) {
        let config = EngineConfig::standard();
        let ledger = PaymentLedger::new(config.clone());
        let time = clock();
        let mut events = EventStore::new();
        let rate = rate_bps(bps);
        let principal = Money::from_minor(cents, 2);

        let mut sale = Sale::originate(sale_terms(principal, term, rate), None, &config, &time, &mut events)
            .expect("sale");
        let installment = sale.monthly_installment();

        for month in 1..=term {
            let before = ledger.outstanding_balance(&sale).expect("balance");
            let date = origination() + chrono::Months::new(month);
            let payment = ledger
                .record_payment(&mut sale, None, PaymentRequest::new(installment, date, PaymentMethod::CashInstallments), &time, &mut events)
                .expect("payment");
            let after = ledger.outstanding_balance(&sale).expect("balance");
            prop_assert_eq!(before - after, payment.split().principal);
            prop_assert_eq!(payment.split().total(), installment);
            prop_assert!(!after.is_negative(), "balance {} went negative", after);
        }

        let remaining = ledger.outstanding_balance(&sale).expect("balance");
        let growth = (0..term).fold(Decimal::ONE, |acc, _| acc * (Decimal::ONE + rate.monthly_rate()));
        let bound = Money::from_minor(1, 2) * Decimal::from(term) * growth;
        prop_assert!(remaining <= bound, "residue {} above bound {}", remaining, bound);
        prop_assert_eq!(sale.amount_paid(), installment * Decimal::from(term));
    }
}
