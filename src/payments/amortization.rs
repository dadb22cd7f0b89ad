use chrono::{Months, NaiveDate};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::EngineConfig;
use crate::decimal::{Money, Rate};
use crate::errors::{Result, SaleError};

/// fixed monthly installment for `principal` over `term_months` at `annual_rate`,
/// rounded with the standard configuration
pub fn compute_installment(principal: Money, term_months: i64, annual_rate: Rate) -> Result<Money> {
    AmortizationCalculator::new(&EngineConfig::standard()).installment(principal, term_months, annual_rate)
}

/// add calendar months, clamping to the last day of shorter months
pub fn add_months(date: NaiveDate, months: u32) -> Option<NaiveDate> {
    date.checked_add_months(Months::new(months))
}

/// annuity installment calculator
#[derive(Debug, Clone, Copy)]
pub struct AmortizationCalculator {
    scale: u32,
    max_term_months: u32,
}

impl AmortizationCalculator {
    pub fn new(config: &EngineConfig) -> Self {
        Self {
            scale: config.currency_scale,
            max_term_months: config.max_term_months,
        }
    }

    /// installment rounded to the currency scale, ready to be stored
    pub fn installment(&self, principal: Money, term_months: i64, annual_rate: Rate) -> Result<Money> {
        let exact = self.exact_installment(principal, term_months, annual_rate)?;
        let rounded = exact.round_to(self.scale);
        debug!(
            principal = %principal,
            term_months,
            annual_rate = %annual_rate,
            installment = %rounded,
            "computed monthly installment"
        );
        Ok(rounded)
    }

    /// installment at full decimal precision
    pub fn exact_installment(&self, principal: Money, term_months: i64, annual_rate: Rate) -> Result<Money> {
        let months = self.validate_term(term_months)?;
        if annual_rate.is_negative() {
            return Err(SaleError::InvalidInterestRate { rate: annual_rate });
        }

        if months == 0 || !principal.is_positive() {
            return Ok(Money::ZERO);
        }

        let n = Decimal::from(months);

        // zero-rate branch is mandatory: the annuity denominator is zero there
        if annual_rate.is_zero() {
            return principal
                .checked_div(n)
                .ok_or_else(|| SaleError::overflow("linear installment"));
        }

        // M = P * r * (1 + r)^n / ((1 + r)^n - 1)
        let r = annual_rate.monthly_rate();
        let compound = compound_factor(r, months)?;
        let denominator = compound - Decimal::ONE;
        if denominator.is_zero() {
            return Err(SaleError::CalculationError {
                message: format!("monthly rate {r} too small for annuity formula"),
            });
        }

        principal
            .checked_mul(r)
            .and_then(|m| m.checked_mul(compound))
            .and_then(|m| m.checked_div(denominator))
            .ok_or_else(|| SaleError::overflow("annuity installment"))
    }

    fn validate_term(&self, term_months: i64) -> Result<u32> {
        if term_months < 0 || term_months > i64::from(self.max_term_months) {
            return Err(SaleError::InvalidTerm { term: term_months });
        }
        u32::try_from(term_months).map_err(|_| SaleError::InvalidTerm { term: term_months })
    }
}

/// (1 + r)^n by repeated multiplication, keeping decimal precision
pub(crate) fn compound_factor(monthly_rate: Decimal, months: u32) -> Result<Decimal> {
    let base = Decimal::ONE + monthly_rate;
    let mut factor = Decimal::ONE;
    for _ in 0..months {
        factor = factor
            .checked_mul(base)
            .ok_or_else(|| SaleError::overflow("compound factor"))?;
    }
    Ok(factor)
}

/// one projected month of an amortization schedule
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScheduledInstallment {
    pub number: u32,
    pub due_date: NaiveDate,
    pub beginning_balance: Money,
    pub payment_amount: Money,
    pub interest_portion: Money,
    pub principal_portion: Money,
    pub ending_balance: Money,
}

/// projected repayment plan for a financed principal
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AmortizationSchedule {
    pub principal: Money,
    pub annual_rate: Rate,
    pub term_months: u32,
    pub installment: Money,
    pub rows: Vec<ScheduledInstallment>,
    pub total_interest: Money,
    pub total_payment: Money,
}

impl AmortizationSchedule {
    /// project the schedule; row `k` falls due `k` months after `origination_date`
    pub fn project(
        principal: Money,
        term_months: i64,
        annual_rate: Rate,
        origination_date: NaiveDate,
        config: &EngineConfig,
    ) -> Result<Self> {
        let calculator = AmortizationCalculator::new(config);
        let installment = calculator.installment(principal, term_months, annual_rate)?;
        let months = calculator.validate_term(term_months)?;
        let r = annual_rate.monthly_rate();

        let mut rows = Vec::with_capacity(months as usize);
        let mut balance = principal.max(Money::ZERO);

        if installment.is_positive() {
            for number in 1..=months {
                let due_date = add_months(origination_date, number).ok_or_else(|| {
                    SaleError::CalculationError {
                        message: format!("due date overflow at month {number}"),
                    }
                })?;

                let interest = (balance * r).round_to(config.currency_scale);
                let mut principal_portion = (installment - interest).max(Money::ZERO);
                let mut payment_amount = installment;

                // last row absorbs rounding residue
                if number == months || principal_portion > balance {
                    principal_portion = balance;
                    payment_amount = principal_portion + interest;
                }

                let ending_balance = balance - principal_portion;
                rows.push(ScheduledInstallment {
                    number,
                    due_date,
                    beginning_balance: balance,
                    payment_amount,
                    interest_portion: interest,
                    principal_portion,
                    ending_balance,
                });
                balance = ending_balance;

                if balance.is_zero() {
                    break;
                }
            }
        }

        let total_interest = rows.iter().map(|row| row.interest_portion).sum();
        let total_payment = rows.iter().map(|row| row.payment_amount).sum();

        Ok(Self {
            principal,
            annual_rate,
            term_months: months,
            installment,
            rows,
            total_interest,
            total_payment,
        })
    }

    /// get the row for a 1-based installment number
    pub fn row(&self, number: u32) -> Option<&ScheduledInstallment> {
        number
            .checked_sub(1)
            .and_then(|index| self.rows.get(index as usize))
    }

    /// balance still owed after `number` installments
    pub fn balance_after(&self, number: u32) -> Money {
        if number == 0 {
            return self.principal;
        }
        self.row(number)
            .or_else(|| self.rows.last())
            .map(|row| row.ending_balance)
            .unwrap_or(self.principal)
    }
}
