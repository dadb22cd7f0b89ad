/// payment health - watch a sale move through due soon, overdue and paid
use chrono::{Duration, TimeZone, Utc};
use sale_installments_rs::{
    derive_status, AmortizationSchedule, EngineConfig, InMemorySaleStore, Money, PaymentHealth,
    PaymentMethod, PaymentRequest, Rate, SafeTimeProvider, SaleBook, SaleTerms, TimeSource, Uuid,
};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    println!("=== payment health walkthrough ===\n");

    let time = SafeTimeProvider::new(TimeSource::Test(
        Utc.with_ymd_and_hms(2024, 1, 10, 9, 0, 0).unwrap()
    ));
    let controller = time.test_control().unwrap();
    let config = EngineConfig::standard();
    let book = SaleBook::new(InMemorySaleStore::new(), config.clone())?;
    let origination = time.now().date_naive();

    // a small 3-month sale for easy testing
    let sale = book.open_sale(
        SaleTerms {
            customer_id: Uuid::new_v4(),
            cluster_id: Uuid::new_v4(),
            unit_type: "Kavling".to_string(),
            price: Money::from_major(33_000),
            down_payment: Money::from_major(3_000),
            term_months: 3,
            interest_rate: Rate::from_percentage(12),
            origination_date: Some(origination),
            booking_date: origination,
            payment_method: PaymentMethod::CashInstallments,
            hold: None,
        },
        &time,
    )?;

    let schedule = AmortizationSchedule::project(
        sale.financed_principal(),
        i64::from(sale.term_months()),
        sale.interest_rate(),
        origination,
        &config,
    )?;
    for row in &schedule.rows {
        println!(
            "{:>2}. {}  pay {}  interest {}  principal {}  balance {}",
            row.number, row.due_date, row.payment_amount, row.interest_portion, row.principal_portion, row.ending_balance
        );
    }
    println!();

    for row in &schedule.rows {
        // walk up to the due date and report health on the way
        controller.advance(Duration::days(25));
        let info = book.payment_status_now(sale.id(), &time)?;
        println!("{}: {} ({})", time.now().date_naive(), info.status, info.label);

        controller.advance(Duration::days(10));
        let info = book.payment_status_now(sale.id(), &time)?;
        println!("{}: {} ({})", time.now().date_naive(), info.status, info.label);
        assert_eq!(info.status, PaymentHealth::Overdue);

        let (updated, payment) = book.record_payment(
            sale.id(),
            PaymentRequest::new(row.payment_amount, time.now().date_naive(), PaymentMethod::Cash),
            &time,
        )?;
        println!(
            "  paid {} (principal {}, interest {}), total paid {}\n",
            payment.amount(),
            payment.split().principal,
            payment.split().interest,
            updated.amount_paid()
        );
    }

    let sale = book.sale(sale.id())?;
    let info = derive_status(&sale, time.now().date_naive());
    println!("final: {} / {} ({})", sale.status(), info.status, info.label);
    assert_eq!(info.status, PaymentHealth::Paid);

    for event in book.take_events()? {
        println!("{:?}", event);
    }

    Ok(())
}
