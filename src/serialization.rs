//! serialization support for sales
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::decimal::{Money, Rate};
use crate::payments::Payment;
use crate::sale::Sale;
use crate::status::{PaymentStatusEngine, PaymentStatusInfo};
use crate::types::{ClusterId, CustomerId, PaymentId, PaymentKind, PaymentMethod, SaleId, SaleStatus};

/// serializable view of a sale with its derived payment status
#[derive(Debug, Serialize, Deserialize)]
pub struct SaleView {
    pub id: SaleId,
    pub customer_id: CustomerId,
    pub cluster_id: ClusterId,
    pub unit_type: String,
    pub status: SaleStatus,
    pub payment_method: PaymentMethod,
    pub origination_date: Option<NaiveDate>,
    pub booking_date: Option<NaiveDate>,
    pub financial: FinancialView,
    pub payments: Vec<PaymentView>,
    pub payment_status_info: PaymentStatusInfo,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct FinancialView {
    pub price: Money,
    pub down_payment: Money,
    pub financed_principal: Money,
    pub interest_rate: Rate,
    pub term_months: u32,
    pub monthly_installment: Money,
    pub amount_paid: Money,
    pub remaining: Money,
    pub principal_repaid: Money,
    pub interest_paid: Money,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct PaymentView {
    pub id: PaymentId,
    pub amount: Money,
    pub payment_date: NaiveDate,
    pub method: PaymentMethod,
    pub kind: PaymentKind,
    pub principal: Money,
    pub interest: Money,
    pub overpayment: Money,
    pub note: Option<String>,
}

impl PaymentView {
    pub fn from_payment(payment: &Payment) -> Self {
        PaymentView {
            id: payment.id(),
            amount: payment.amount(),
            payment_date: payment.payment_date(),
            method: payment.method(),
            kind: payment.kind(),
            principal: payment.split().principal,
            interest: payment.split().interest,
            overpayment: payment.split().overpayment,
            note: payment.note().map(str::to_string),
        }
    }
}

impl SaleView {
    /// view as of `as_of`, status derived through `engine`
    pub fn from_sale(sale: &Sale, engine: &PaymentStatusEngine, as_of: NaiveDate) -> Self {
        SaleView {
            id: sale.id(),
            customer_id: sale.customer_id(),
            cluster_id: sale.cluster_id(),
            unit_type: sale.unit_type().to_string(),
            status: sale.status(),
            payment_method: sale.payment_method(),
            origination_date: sale.origination_date(),
            booking_date: sale.booking_date(),
            financial: FinancialView {
                price: sale.price(),
                down_payment: sale.down_payment(),
                financed_principal: sale.financed_principal(),
                interest_rate: sale.interest_rate(),
                term_months: sale.term_months(),
                monthly_installment: sale.monthly_installment(),
                amount_paid: sale.amount_paid(),
                remaining: (sale.price() - sale.amount_paid()).max(Money::ZERO),
                principal_repaid: sale.principal_repaid(),
                interest_paid: sale.interest_paid(),
            },
            payments: sale.payments().iter().map(PaymentView::from_payment).collect(),
            payment_status_info: engine.derive(sale, as_of),
            created_at: sale.created_at(),
            updated_at: sale.updated_at(),
        }
    }

    /// convert to pretty-printed json string
    pub fn to_json_pretty(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}
