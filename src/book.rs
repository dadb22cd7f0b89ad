use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError, RwLock};

use chrono::NaiveDate;
use hourglass_rs::SafeTimeProvider;
use tracing::{debug, info};

use crate::config::EngineConfig;
use crate::decimal::{Money, Rate};
use crate::errors::{Result, SaleError};
use crate::events::{Event, EventStore};
use crate::payments::{backfill_sale, Payment, PaymentLedger, PaymentRequest};
use crate::sale::{BookingTerms, Cluster, Customer, Sale, SaleTerms};
use crate::status::{PaymentStatusEngine, PaymentStatusInfo};
use crate::types::{CustomerId, PaymentHealth, SaleId, SaleStatus};

/// persistence boundary for sales and customers
pub trait SaleStore: Send + Sync {
    fn load_sale(&self, id: SaleId) -> Result<Sale>;
    fn save_sale(&self, sale: &Sale) -> Result<()>;
    fn load_customer(&self, id: CustomerId) -> Result<Option<Customer>>;
    fn save_customer(&self, customer: &Customer) -> Result<()>;
    /// snapshot of every stored sale
    fn sales(&self) -> Result<Vec<Sale>>;
}

/// process-local store, used by tests and demos
#[derive(Debug, Default)]
pub struct InMemorySaleStore {
    sales: RwLock<HashMap<SaleId, Sale>>,
    customers: RwLock<HashMap<CustomerId, Customer>>,
}

impl InMemorySaleStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl SaleStore for InMemorySaleStore {
    fn load_sale(&self, id: SaleId) -> Result<Sale> {
        let sales = self.sales.read().map_err(poisoned)?;
        sales.get(&id).cloned().ok_or(SaleError::SaleNotFound { id })
    }

    fn save_sale(&self, sale: &Sale) -> Result<()> {
        let mut sales = self.sales.write().map_err(poisoned)?;
        sales.insert(sale.id(), sale.clone());
        Ok(())
    }

    fn load_customer(&self, id: CustomerId) -> Result<Option<Customer>> {
        let customers = self.customers.read().map_err(poisoned)?;
        Ok(customers.get(&id).cloned())
    }

    fn save_customer(&self, customer: &Customer) -> Result<()> {
        let mut customers = self.customers.write().map_err(poisoned)?;
        customers.insert(customer.id, customer.clone());
        Ok(())
    }

    fn sales(&self) -> Result<Vec<Sale>> {
        let sales = self.sales.read().map_err(poisoned)?;
        Ok(sales.values().cloned().collect())
    }
}

fn poisoned<T>(_: PoisonError<T>) -> SaleError {
    SaleError::Storage {
        message: "lock poisoned".to_string(),
    }
}

/// service entry point over a store
///
/// Every mutation of a sale runs load, compute, append and save under that
/// sale's own lock, so concurrent payments on one sale are applied one at a
/// time while different sales proceed in parallel. Status reads take no lock.
pub struct SaleBook<S: SaleStore> {
    store: S,
    config: EngineConfig,
    ledger: PaymentLedger,
    status: PaymentStatusEngine,
    locks: Mutex<HashMap<SaleId, Arc<Mutex<()>>>>,
    events: Mutex<EventStore>,
}

impl<S: SaleStore> SaleBook<S> {
    pub fn new(store: S, config: EngineConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            store,
            ledger: PaymentLedger::new(config.clone()),
            status: PaymentStatusEngine::new(&config),
            config,
            locks: Mutex::new(HashMap::new()),
            events: Mutex::new(EventStore::new()),
        })
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// store a customer; a booked or deposited one with a booking opens a sale
    pub fn register_customer(
        &self,
        customer: Customer,
        booking: Option<(&Cluster, BookingTerms)>,
        time: &SafeTimeProvider,
    ) -> Result<Option<Sale>> {
        self.store.save_customer(&customer)?;

        let Some((cluster, terms)) = booking else {
            return Ok(None);
        };

        let mut events = EventStore::new();
        let sale = Sale::from_booking(&customer, cluster, terms, &self.config, time, &mut events)?;
        if let Some(sale) = &sale {
            self.store.save_sale(sale)?;
        }
        self.publish(events)?;
        Ok(sale)
    }

    pub fn open_sale(&self, terms: SaleTerms, time: &SafeTimeProvider) -> Result<Sale> {
        let mut customer = self.store.load_customer(terms.customer_id)?;
        let mut events = EventStore::new();

        let sale = Sale::originate(terms, customer.as_mut(), &self.config, time, &mut events)?;
        self.store.save_sale(&sale)?;
        if let Some(customer) = &customer {
            self.store.save_customer(customer)?;
        }
        self.publish(events)?;
        Ok(sale)
    }

    pub fn sale(&self, id: SaleId) -> Result<Sale> {
        self.store.load_sale(id)
    }

    pub fn customer(&self, id: CustomerId) -> Result<Customer> {
        self.store
            .load_customer(id)?
            .ok_or(SaleError::CustomerNotFound { id })
    }

    /// record a payment and return the updated sale with the new payment
    pub fn record_payment(
        &self,
        sale_id: SaleId,
        request: PaymentRequest,
        time: &SafeTimeProvider,
    ) -> Result<(Sale, Payment)> {
        self.with_sale_lock(sale_id, || {
            let mut sale = self.store.load_sale(sale_id)?;
            let mut customer = self.store.load_customer(sale.customer_id())?;
            let mut events = EventStore::new();

            let result = self
                .ledger
                .record_payment(&mut sale, customer.as_mut(), request, time, &mut events);
            let payment = match result {
                Ok(payment) => payment,
                Err(e) => {
                    self.publish(events)?;
                    return Err(e);
                }
            };

            self.store.save_sale(&sale)?;
            if let Some(customer) = &customer {
                self.store.save_customer(customer)?;
            }
            self.publish(events)?;
            Ok((sale, payment))
        })
    }

    pub fn change_price(&self, sale_id: SaleId, new_price: Money, time: &SafeTimeProvider) -> Result<Sale> {
        self.mutate(sale_id, |sale, events| {
            sale.change_price(new_price, &self.config, time, events)
        })
    }

    pub fn change_interest_rate(&self, sale_id: SaleId, new_rate: Rate, time: &SafeTimeProvider) -> Result<Sale> {
        self.mutate(sale_id, |sale, events| {
            sale.change_interest_rate(new_rate, &self.config, time, events)
        })
    }

    pub fn correct_down_payment(
        &self,
        sale_id: SaleId,
        new_down_payment: Money,
        time: &SafeTimeProvider,
    ) -> Result<Sale> {
        self.mutate(sale_id, |sale, events| {
            sale.correct_down_payment(new_down_payment, &self.config, time, events)
        })
    }

    pub fn correct_amount_paid(&self, sale_id: SaleId, new_amount: Money, time: &SafeTimeProvider) -> Result<Sale> {
        self.mutate(sale_id, |sale, events| sale.correct_amount_paid(new_amount, time, events))
    }

    pub fn override_status(
        &self,
        sale_id: SaleId,
        new_status: SaleStatus,
        reason: &str,
        time: &SafeTimeProvider,
    ) -> Result<Sale> {
        self.mutate(sale_id, |sale, events| {
            sale.override_status(new_status, reason, time, events)
        })
    }

    /// migrate legacy unsplit payments on one sale
    pub fn backfill(&self, sale_id: SaleId) -> Result<usize> {
        let mut rewritten = 0;
        self.mutate(sale_id, |sale, _| {
            rewritten = backfill_sale(sale)?;
            Ok(())
        })?;
        Ok(rewritten)
    }

    /// derived health of one sale; reads a snapshot without locking
    pub fn payment_status(&self, sale_id: SaleId, as_of: NaiveDate) -> Result<PaymentStatusInfo> {
        let sale = self.store.load_sale(sale_id)?;
        Ok(self.status.derive(&sale, as_of))
    }

    pub fn payment_status_now(&self, sale_id: SaleId, time: &SafeTimeProvider) -> Result<PaymentStatusInfo> {
        self.payment_status(sale_id, time.now().date_naive())
    }

    /// sales whose derived health on `as_of` equals `health`
    pub fn sales_with_health(
        &self,
        health: PaymentHealth,
        as_of: NaiveDate,
    ) -> Result<Vec<(Sale, PaymentStatusInfo)>> {
        let mut matching: Vec<(Sale, PaymentStatusInfo)> = self
            .store
            .sales()?
            .into_iter()
            .map(|sale| {
                let info = self.status.derive(&sale, as_of);
                (sale, info)
            })
            .filter(|(_, info)| info.status == health)
            .collect();
        matching.sort_by_key(|(sale, _)| sale.created_at());
        debug!(health = %health, %as_of, count = matching.len(), "filtered sales by health");
        Ok(matching)
    }

    /// sales whose stored lifecycle tag equals `status`
    pub fn sales_with_status(&self, status: SaleStatus) -> Result<Vec<Sale>> {
        let mut matching: Vec<Sale> = self
            .store
            .sales()?
            .into_iter()
            .filter(|sale| sale.status() == status)
            .collect();
        matching.sort_by_key(|sale| sale.created_at());
        Ok(matching)
    }

    /// drain the audit trail collected so far
    pub fn take_events(&self) -> Result<Vec<Event>> {
        let mut events = self.events.lock().map_err(poisoned)?;
        Ok(events.take_events())
    }

    fn mutate<F>(&self, sale_id: SaleId, op: F) -> Result<Sale>
    where
        F: FnOnce(&mut Sale, &mut EventStore) -> Result<()>,
    {
        self.with_sale_lock(sale_id, || {
            let mut sale = self.store.load_sale(sale_id)?;
            let mut events = EventStore::new();
            op(&mut sale, &mut events)?;

            self.store.save_sale(&sale)?;
            info!(sale_id = %sale_id, events = events.len(), "sale updated");
            self.publish(events)?;
            Ok(sale)
        })
    }

    /// run `op` holding the sale's lock; the lock entry is dropped once nobody waits on it
    fn with_sale_lock<T, F>(&self, sale_id: SaleId, op: F) -> Result<T>
    where
        F: FnOnce() -> Result<T>,
    {
        let lock = {
            let mut locks = self.locks.lock().map_err(poisoned)?;
            Arc::clone(locks.entry(sale_id).or_default())
        };

        let result = match lock.lock() {
            Ok(_guard) => op(),
            Err(e) => Err(poisoned(e)),
        };

        let mut locks = self.locks.lock().map_err(poisoned)?;
        // the map and this call hold the only references
        if Arc::strong_count(&lock) == 2 {
            locks.remove(&sale_id);
        }
        result
    }

    #[cfg(test)]
    fn tracked_locks(&self) -> usize {
        self.locks.lock().map(|locks| locks.len()).unwrap_or_default()
    }

    fn publish(&self, mut batch: EventStore) -> Result<()> {
        let mut events = self.events.lock().map_err(poisoned)?;
        for event in batch.take_events() {
            events.emit(event);
        }
        Ok(())
    }
}
