use chrono::NaiveDate;
use hourglass_rs::SafeTimeProvider;
use rust_decimal::prelude::ToPrimitive;
use serde::{Deserialize, Serialize};

use crate::config::EngineConfig;
use crate::decimal::Money;
use crate::errors::{Result, SaleError};
use crate::payments::add_months;
use crate::sale::Sale;
use crate::types::{PaymentHealth, SaleStatus};

/// derived health of a sale as of one day
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentStatusInfo {
    pub status: PaymentHealth,
    pub label: String,
    pub next_due_date: Option<NaiveDate>,
    /// signed days from the as-of date to the next due date
    pub days_until_due: Option<i64>,
}

impl PaymentStatusInfo {
    fn settled(status: PaymentHealth, label: &str) -> Self {
        Self {
            status,
            label: label.to_string(),
            next_due_date: None,
            days_until_due: None,
        }
    }
}

/// read-side classifier of sale health
///
/// Every call recomputes from the sale snapshot and the supplied date; nothing
/// is cached and the sale is never touched.
#[derive(Debug, Clone, Copy)]
pub struct PaymentStatusEngine {
    due_soon_days: i64,
}

impl Default for PaymentStatusEngine {
    fn default() -> Self {
        Self::new(&EngineConfig::standard())
    }
}

impl PaymentStatusEngine {
    pub fn new(config: &EngineConfig) -> Self {
        Self {
            due_soon_days: config.due_soon_days,
        }
    }

    pub fn derive(&self, sale: &Sale, as_of: NaiveDate) -> PaymentStatusInfo {
        match sale.status() {
            SaleStatus::Booked => return PaymentStatusInfo::settled(PaymentHealth::Booked, "Booked"),
            SaleStatus::Deposited => return PaymentStatusInfo::settled(PaymentHealth::Deposited, "Deposited"),
            SaleStatus::Process | SaleStatus::Paid => {}
        }

        // an operator-set Paid stands until the next mutation re-evaluates it
        if sale.status() == SaleStatus::Paid || sale.is_fully_paid() {
            return PaymentStatusInfo::settled(PaymentHealth::Paid, "Paid in full");
        }

        let next_due = match scheduled_due_date(sale) {
            Ok(date) => date,
            Err(e) => {
                let label = match e {
                    SaleError::UndeterminedStatus { reason } => reason,
                    other => other.to_string(),
                };
                return PaymentStatusInfo {
                    status: PaymentHealth::Unknown,
                    label,
                    next_due_date: None,
                    days_until_due: None,
                };
            }
        };

        let diff_days = (next_due - as_of).num_days();
        let (status, label) = if diff_days < 0 {
            (PaymentHealth::Overdue, format!("Overdue by {}", days(-diff_days)))
        } else if diff_days == 0 {
            (PaymentHealth::DueSoon, "Due today".to_string())
        } else if diff_days <= self.due_soon_days {
            (PaymentHealth::DueSoon, format!("Due in {}", days(diff_days)))
        } else {
            (PaymentHealth::Normal, "Current".to_string())
        };

        PaymentStatusInfo {
            status,
            label,
            next_due_date: Some(next_due),
            days_until_due: Some(diff_days),
        }
    }

    /// classify against the provider's current date
    pub fn derive_now(&self, sale: &Sale, time: &SafeTimeProvider) -> PaymentStatusInfo {
        self.derive(sale, time.now().date_naive())
    }

    /// next installment due date, `None` while on hold or once paid
    pub fn next_due_date(&self, sale: &Sale) -> Result<Option<NaiveDate>> {
        if sale.status().is_hold() || sale.status() == SaleStatus::Paid || sale.is_fully_paid() {
            return Ok(None);
        }
        scheduled_due_date(sale).map(Some)
    }
}

/// derive health with the standard due-soon window
pub fn derive_status(sale: &Sale, as_of: NaiveDate) -> PaymentStatusInfo {
    PaymentStatusEngine::default().derive(sale, as_of)
}

/// origination date plus one month past the periods already covered
fn scheduled_due_date(sale: &Sale) -> Result<NaiveDate> {
    let installment = sale.monthly_installment();
    if !installment.is_positive() {
        return Err(SaleError::UndeterminedStatus {
            reason: "No installment set".to_string(),
        });
    }
    let origination = sale.origination_date().ok_or_else(|| SaleError::UndeterminedStatus {
        reason: "No origination date".to_string(),
    })?;

    let months_paid = months_covered(sale.amount_paid(), installment)?;
    let offset = months_paid
        .checked_add(1)
        .ok_or_else(|| SaleError::overflow("due date offset"))?;
    add_months(origination, offset).ok_or_else(|| SaleError::CalculationError {
        message: format!("due date {offset} months after {origination} is out of range"),
    })
}

fn months_covered(amount_paid: Money, installment: Money) -> Result<u32> {
    let periods = amount_paid
        .whole_multiples_of(installment)
        .ok_or_else(|| SaleError::overflow("installment periods covered"))?;
    periods.to_u32().ok_or_else(|| SaleError::CalculationError {
        message: format!("{periods} installment periods is out of range"),
    })
}

fn days(n: i64) -> String {
    if n == 1 {
        "1 day".to_string()
    } else {
        format!("{n} days")
    }
}
