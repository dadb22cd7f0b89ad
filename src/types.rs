use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

use crate::decimal::Money;

/// unique identifier for a sale
pub type SaleId = Uuid;

/// unique identifier for a recorded payment
pub type PaymentId = Uuid;

/// unique identifier for a customer
pub type CustomerId = Uuid;

/// unique identifier for a property cluster
pub type ClusterId = Uuid;

/// stored lifecycle tag of a sale
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SaleStatus {
    /// unit reserved, no financing running yet
    Booked,
    /// deposit placed, no financing running yet
    Deposited,
    /// financing running, price not yet covered
    Process,
    /// cumulative payments cover the price
    Paid,
}

impl SaleStatus {
    /// pre-financing holds are reported verbatim and carry no due dates
    pub fn is_hold(&self) -> bool {
        matches!(self, SaleStatus::Booked | SaleStatus::Deposited)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            SaleStatus::Booked => "Booked",
            SaleStatus::Deposited => "Deposited",
            SaleStatus::Process => "Process",
            SaleStatus::Paid => "Paid",
        }
    }
}

impl fmt::Display for SaleStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// sales-funnel stage of a customer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CustomerCriteria {
    Visited,
    Deposited,
    Booked,
    Process,
}

/// how a payment was made
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PaymentMethod {
    /// booking fee / down payment taken at origination
    Initial,
    Cash,
    /// cash paid in stages against the installment plan
    CashInstallments,
    BankTransfer,
    /// bank-financed mortgage disbursement
    Mortgage,
    Unknown,
}

impl PaymentMethod {
    pub fn kind(&self) -> PaymentKind {
        match self {
            PaymentMethod::Initial => PaymentKind::DownPayment,
            _ => PaymentKind::Installment,
        }
    }
}

/// ledger classification of a payment
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PaymentKind {
    /// never part of the interest-bearing balance
    DownPayment,
    /// reduces the financed principal
    Installment,
}

/// principal / interest components of a single payment
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct PaymentSplit {
    pub principal: Money,
    pub interest: Money,
    /// part of the amount beyond the remaining balance and period interest
    #[serde(default)]
    pub overpayment: Money,
}

impl PaymentSplit {
    pub fn all_principal(amount: Money) -> Self {
        Self {
            principal: amount,
            ..Self::default()
        }
    }

    pub fn total(&self) -> Money {
        self.principal + self.interest + self.overpayment
    }

    pub fn is_empty(&self) -> bool {
        self.principal.is_zero() && self.interest.is_zero() && self.overpayment.is_zero()
    }
}

/// derived, read-side health of a sale
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PaymentHealth {
    Booked,
    Deposited,
    Paid,
    Overdue,
    #[serde(rename = "Due Soon")]
    DueSoon,
    Normal,
    /// no installment or no origination date to measure from
    Unknown,
}

impl PaymentHealth {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentHealth::Booked => "Booked",
            PaymentHealth::Deposited => "Deposited",
            PaymentHealth::Paid => "Paid",
            PaymentHealth::Overdue => "Overdue",
            PaymentHealth::DueSoon => "Due Soon",
            PaymentHealth::Normal => "Normal",
            PaymentHealth::Unknown => "Unknown",
        }
    }
}

impl fmt::Display for PaymentHealth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
