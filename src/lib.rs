pub mod book;
pub mod config;
pub mod decimal;
pub mod errors;
pub mod events;
pub mod payments;
pub mod sale;
pub mod serialization;
pub mod status;
pub mod types;

// re-export key types
pub use book::{InMemorySaleStore, SaleBook, SaleStore};
pub use config::EngineConfig;
pub use decimal::{Money, Rate};
pub use errors::{Result, SaleError};
pub use events::{Event, EventStore};
pub use payments::{
    backfill_sale, compute_installment, AmortizationCalculator, AmortizationSchedule, Payment,
    PaymentAllocation, PaymentLedger, PaymentRequest, ScheduledInstallment,
};
pub use sale::{BookingTerms, Cluster, Customer, Sale, SaleTerms};
pub use serialization::{PaymentView, SaleView};
pub use status::{derive_status, PaymentStatusEngine, PaymentStatusInfo};
pub use types::{
    ClusterId, CustomerCriteria, CustomerId, PaymentHealth, PaymentId, PaymentKind, PaymentMethod,
    PaymentSplit, SaleId, SaleStatus,
};

// re-export external dependencies that users will need
pub use chrono;
pub use hourglass_rs::{SafeTimeProvider, TimeSource};
pub use rust_decimal::Decimal;
pub use uuid::Uuid;
