/// quick start - minimal example to get started
use sale_installments_rs::{
    EngineConfig, InMemorySaleStore, Money, PaymentMethod, PaymentRequest, PaymentStatusEngine, Rate,
    SafeTimeProvider, SaleBook, SaleTerms, SaleView, TimeSource, Uuid,
};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let time = SafeTimeProvider::new(TimeSource::System);
    let book = SaleBook::new(InMemorySaleStore::new(), EngineConfig::standard())?;
    let today = time.now().date_naive();

    // a 450m unit, 45m down, 120 months at 6%
    let sale = book.open_sale(
        SaleTerms {
            customer_id: Uuid::new_v4(),
            cluster_id: Uuid::new_v4(),
            unit_type: "Type 45/90".to_string(),
            price: Money::from_major(450_000_000),
            down_payment: Money::from_major(45_000_000),
            term_months: 120,
            interest_rate: Rate::from_percentage(6),
            origination_date: Some(today),
            booking_date: today,
            payment_method: PaymentMethod::CashInstallments,
            hold: None,
        },
        &time,
    )?;
    println!("monthly installment: {}", sale.monthly_installment());

    // pay the first installment
    let (sale, payment) = book.record_payment(
        sale.id(),
        PaymentRequest::new(sale.monthly_installment(), today, PaymentMethod::BankTransfer),
        &time,
    )?;
    println!(
        "paid {}: principal {}, interest {}",
        payment.amount(),
        payment.split().principal,
        payment.split().interest
    );

    // print current state with its derived status
    let engine = PaymentStatusEngine::new(book.config());
    println!("{}", SaleView::from_sale(&sale, &engine, today).to_json_pretty()?);

    Ok(())
}
