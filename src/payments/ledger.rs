use hourglass_rs::SafeTimeProvider;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::config::EngineConfig;
use crate::decimal::{Money, Rate};
use crate::errors::{Result, SaleError};
use crate::events::{Event, EventStore};
use crate::sale::{Customer, Sale};
use crate::types::{PaymentKind, PaymentSplit};

use super::{Payment, PaymentRequest};

/// how a payment lands against the amortizing balance
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PaymentAllocation {
    pub split: PaymentSplit,
    /// interest charged for the period before the payment is applied
    pub interest_due: Money,
    pub outstanding_before: Money,
    pub outstanding_after: Money,
}

impl PaymentAllocation {
    /// payment covered no principal at all
    pub fn is_negative_amortization(&self) -> bool {
        self.split.principal.is_zero() && self.split.interest.is_positive()
    }
}

/// records payments and splits them into principal and interest
#[derive(Debug, Clone)]
pub struct PaymentLedger {
    config: EngineConfig,
}

impl PaymentLedger {
    pub fn new(config: EngineConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// financed principal less principal repaid through installments
    pub fn outstanding_balance(&self, sale: &Sale) -> Result<Money> {
        let balance = sale.financed_principal() - sale.principal_repaid();
        let tolerance = self.config.balance_tolerance;

        if balance < -tolerance {
            warn!(
                sale_id = %sale.id(),
                balance = %balance,
                tolerance = %tolerance,
                "outstanding balance negative beyond tolerance"
            );
            return Err(SaleError::BalanceInconsistency { balance, tolerance });
        }

        Ok(balance)
    }

    /// split `amount` against `outstanding` at the monthly rate of `annual_rate`
    ///
    /// Interest is taken first, then principal up to the outstanding balance.
    /// Whatever is left is recorded as overpayment so the split sums to `amount`.
    pub fn split_payment(&self, amount: Money, outstanding: Money, annual_rate: Rate) -> Result<PaymentAllocation> {
        if !amount.is_positive() {
            return Err(SaleError::InvalidPayment { amount });
        }

        let interest_due = if annual_rate.is_zero() || !outstanding.is_positive() {
            Money::ZERO
        } else {
            outstanding
                .checked_mul(annual_rate.monthly_rate())
                .ok_or_else(|| SaleError::overflow("period interest"))?
                .round_to(self.config.currency_scale)
        };

        let split = if interest_due >= amount {
            // negative amortization: nothing reaches principal
            PaymentSplit {
                interest: amount,
                ..PaymentSplit::default()
            }
        } else {
            // principal never takes the balance below zero
            let principal = (amount - interest_due).min(outstanding.max(Money::ZERO));
            PaymentSplit {
                principal,
                interest: interest_due,
                overpayment: amount - interest_due - principal,
            }
        };

        let allocation = PaymentAllocation {
            split,
            interest_due,
            outstanding_before: outstanding,
            outstanding_after: outstanding - split.principal,
        };
        debug!(
            amount = %amount,
            principal = %split.principal,
            interest = %split.interest,
            overpayment = %split.overpayment,
            outstanding_after = %allocation.outstanding_after,
            "split payment"
        );
        Ok(allocation)
    }

    /// record an installment payment against `sale`
    ///
    /// The whole read-split-append-update sequence runs on the exclusive borrow of
    /// `sale`; callers sharing sales across threads serialize through `SaleBook`.
    /// The cumulative paid total grows by the full amount whatever the split.
    pub fn record_payment(
        &self,
        sale: &mut Sale,
        customer: Option<&mut Customer>,
        request: PaymentRequest,
        time: &SafeTimeProvider,
        events: &mut EventStore,
    ) -> Result<Payment> {
        let allocation = match self.allocate(sale, &request) {
            Ok(allocation) => allocation,
            Err(e) => {
                warn!(sale_id = %sale.id(), amount = %request.amount, error = %e, "payment rejected");
                events.emit(Event::PaymentRejected {
                    sale_id: sale.id(),
                    amount: request.amount,
                    reason: e.to_string(),
                    timestamp: time.now(),
                });
                return Err(e);
            }
        };

        let now = time.now();
        let payment = Payment::new(sale.id(), request, allocation.split, now);
        sale.append_payment(payment.clone(), now);

        if let Some(customer) = customer {
            customer.advance_on_payment(time, events);
        }

        if sale.status().is_hold() {
            sale.release_hold(time, events)?;
        } else {
            sale.reevaluate_status("payment recorded", time, events);
        }

        events.emit(Event::PaymentRecorded {
            sale_id: sale.id(),
            payment_id: payment.id(),
            amount: payment.amount(),
            principal: allocation.split.principal,
            interest: allocation.split.interest,
            overpayment: allocation.split.overpayment,
            method: payment.method(),
            payment_date: payment.payment_date(),
            outstanding_after: allocation.outstanding_after,
            timestamp: now,
        });
        info!(
            sale_id = %sale.id(),
            payment_id = %payment.id(),
            amount = %payment.amount(),
            principal = %allocation.split.principal,
            interest = %allocation.split.interest,
            overpayment = %allocation.split.overpayment,
            amount_paid = %sale.amount_paid(),
            status = %sale.status(),
            "payment recorded"
        );

        Ok(payment)
    }

    fn allocate(&self, sale: &Sale, request: &PaymentRequest) -> Result<PaymentAllocation> {
        if !request.amount.is_positive() {
            return Err(SaleError::InvalidPayment {
                amount: request.amount,
            });
        }
        if request.method.kind() == PaymentKind::DownPayment {
            return Err(SaleError::ReservedMethod {
                method: request.method,
            });
        }

        let outstanding = self.outstanding_balance(sale)?;
        self.split_payment(request.amount, outstanding, sale.interest_rate())
    }
}
