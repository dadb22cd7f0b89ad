use thiserror::Error;

use crate::decimal::{Money, Rate};
use crate::types::{CustomerId, PaymentMethod, SaleId, SaleStatus};

#[derive(Error, Debug, Clone, PartialEq)]
pub enum SaleError {
    #[error("invalid payment amount: {amount}")]
    InvalidPayment {
        amount: Money,
    },

    #[error("payment method {method:?} is reserved for the down payment")]
    ReservedMethod {
        method: PaymentMethod,
    },

    #[error("invalid {field}: {amount}")]
    InvalidAmount {
        field: &'static str,
        amount: Money,
    },

    #[error("invalid term: {term} months")]
    InvalidTerm {
        term: i64,
    },

    #[error("invalid interest rate: {rate}")]
    InvalidInterestRate {
        rate: Rate,
    },

    #[error("payment status cannot be determined: {reason}")]
    UndeterminedStatus {
        reason: String,
    },

    #[error("outstanding balance {balance} is negative beyond tolerance {tolerance}")]
    BalanceInconsistency {
        balance: Money,
        tolerance: Money,
    },

    #[error("invalid status transition from {from:?} to {to:?}")]
    InvalidTransition {
        from: SaleStatus,
        to: SaleStatus,
    },

    #[error("calculation error: {message}")]
    CalculationError {
        message: String,
    },

    #[error("invalid configuration: {message}")]
    InvalidConfiguration {
        message: String,
    },

    #[error("sale not found: {id}")]
    SaleNotFound {
        id: SaleId,
    },

    #[error("customer not found: {id}")]
    CustomerNotFound {
        id: CustomerId,
    },

    #[error("storage error: {message}")]
    Storage {
        message: String,
    },
}

impl SaleError {
    pub(crate) fn overflow(what: &str) -> Self {
        SaleError::CalculationError {
            message: format!("decimal overflow computing {what}"),
        }
    }
}

pub type Result<T> = std::result::Result<T, SaleError>;
