//! Migration for payment rows stored before principal/interest splits were tracked.
//!
//! Such rows carry zero on both sides of the split. They predate interest-bearing
//! bookkeeping, so the whole amount is taken as principal. Run once per sale,
//! before the sale is handed to the ledger.

use tracing::info;

use crate::errors::{Result, SaleError};
use crate::sale::Sale;
use crate::types::PaymentSplit;

use super::Payment;

/// true when any payment on the sale still lacks a split
pub fn needs_backfill(sale: &Sale) -> bool {
    sale.payments().iter().any(|p| !p.has_split())
}

/// rewrite unsplit payments as all principal, returning how many changed
///
/// Rows that already carry a split are checked and left untouched. Nothing is
/// rewritten if any row is inconsistent.
pub fn backfill_sale(sale: &mut Sale) -> Result<usize> {
    for payment in sale.payments() {
        check_split(payment)?;
    }

    let mut rewritten = 0;
    for payment in sale.payments_mut() {
        if !payment.has_split() {
            payment.set_split(PaymentSplit::all_principal(payment.amount()));
            rewritten += 1;
        }
    }

    if rewritten > 0 {
        info!(sale_id = %sale.id(), rewritten, "backfilled legacy payment splits");
    }
    Ok(rewritten)
}

fn check_split(payment: &Payment) -> Result<()> {
    if !payment.has_split() {
        return Ok(());
    }

    let split = payment.split();
    if split.principal.is_negative()
        || split.interest.is_negative()
        || split.overpayment.is_negative()
        || split.total() != payment.amount()
    {
        return Err(SaleError::InvalidAmount {
            field: "payment split",
            amount: split.total(),
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::EngineConfig;
    use crate::decimal::{Money, Rate};
    use crate::events::EventStore;
    use crate::payments::{PaymentLedger, PaymentRequest};
    use crate::sale::tests::{terms, test_time};
    use crate::types::PaymentMethod;
    use chrono::NaiveDate;
    use rust_decimal_macros::dec;

    fn legacy_row(sale: &Sale, amount: Money, split: PaymentSplit) -> Payment {
        Payment::new(
            sale.id(),
            PaymentRequest::new(amount, NaiveDate::from_ymd_opt(2023, 6, 1).unwrap(), PaymentMethod::Cash),
            split,
            test_time().now(),
        )
    }

    fn sale_with_rate(rate: Rate) -> Sale {
        let mut events = EventStore::new();
        Sale::originate(terms(110_000, 10_000, 12, rate), None, &EngineConfig::standard(), &test_time(), &mut events)
            .unwrap()
    }

    #[test]
    fn test_backfills_unsplit_rows() {
        let mut sale = sale_with_rate(Rate::from_percentage(12));
        let row = legacy_row(&sale, Money::from_major(5_000), PaymentSplit::default());
        sale.append_payment(row, test_time().now());
        assert!(needs_backfill(&sale));

        assert_eq!(backfill_sale(&mut sale).unwrap(), 1);
        assert!(!needs_backfill(&sale));
        assert_eq!(sale.principal_repaid(), Money::from_major(5_000));

        let ledger = PaymentLedger::new(EngineConfig::standard());
        assert_eq!(ledger.outstanding_balance(&sale).unwrap(), Money::from_major(95_000));

        // second run is a no-op
        assert_eq!(backfill_sale(&mut sale).unwrap(), 0);
    }

    #[test]
    fn test_split_rows_are_kept() {
        let mut sale = sale_with_rate(Rate::from_percentage(12));
        let split = PaymentSplit {
            principal: Money::from_decimal(dec!(7884.88)),
            interest: Money::from_major(1_000),
            overpayment: Money::ZERO,
        };
        let row = legacy_row(&sale, Money::from_decimal(dec!(8884.88)), split);
        sale.append_payment(row, test_time().now());

        assert_eq!(backfill_sale(&mut sale).unwrap(), 0);
        assert_eq!(sale.payments()[1].split(), split);
    }

    #[test]
    fn test_inconsistent_split_blocks_the_whole_sale() {
        let mut sale = sale_with_rate(Rate::ZERO);
        let unsplit = legacy_row(&sale, Money::from_major(1_000), PaymentSplit::default());
        let broken = legacy_row(
            &sale,
            Money::from_major(1_000),
            PaymentSplit {
                principal: Money::from_major(900),
                interest: Money::from_major(50),
                overpayment: Money::ZERO,
            },
        );
        sale.append_payment(unsplit, test_time().now());
        sale.append_payment(broken, test_time().now());

        assert!(matches!(
            backfill_sale(&mut sale),
            Err(SaleError::InvalidAmount { field: "payment split", .. })
        ));
        assert!(needs_backfill(&sale));
    }
}
