use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock};

use super::controller::{FormResult, read_lock, write_lock};
use super::values::{FieldValue, FormValues};

#[derive(Clone, Copy, Debug, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct SubscriptionId(pub u64);

type Observer = Arc<dyn Fn(&FormValues) + Send + Sync>;

/// Field values of one form page.
///
/// Cloning shares the underlying values. Observers run synchronously after
/// every mutation, outside the values lock.
#[derive(Clone, Default)]
pub struct FormStore {
    next_subscription: Arc<AtomicU64>,
    values: Arc<RwLock<FormValues>>,
    observers: Arc<RwLock<Vec<(SubscriptionId, Observer)>>>,
}

impl FormStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn values(&self) -> FormResult<FormValues> {
        Ok(read_lock(&self.values, "reading store values")?.clone())
    }

    pub fn value(&self, field_id: &str) -> FormResult<Option<FieldValue>> {
        Ok(read_lock(&self.values, "reading store value")?
            .get(field_id)
            .cloned())
    }

    pub fn is_empty(&self) -> FormResult<bool> {
        Ok(read_lock(&self.values, "checking store emptiness")?.is_empty())
    }

    /// Replaces the value of exactly one field.
    pub fn set_value(&self, field_id: impl Into<String>, value: FieldValue) -> FormResult<()> {
        let next = self.write_value(field_id, value)?;
        self.notify(&next)
    }

    /// Writes without notifying, returning the values observers should see.
    pub(super) fn write_value(
        &self,
        field_id: impl Into<String>,
        value: FieldValue,
    ) -> FormResult<FormValues> {
        let mut values = write_lock(&self.values, "writing store value")?;
        values.insert(field_id.into(), value);
        Ok(values.clone())
    }

    pub fn reset(&self) -> FormResult<()> {
        write_lock(&self.values, "resetting store")?.clear();
        self.notify(&FormValues::new())
    }

    pub fn subscribe(
        &self,
        observer: impl Fn(&FormValues) + Send + Sync + 'static,
    ) -> FormResult<SubscriptionId> {
        let id = SubscriptionId(self.next_subscription.fetch_add(1, Ordering::SeqCst) + 1);
        write_lock(&self.observers, "registering store observer")?.push((id, Arc::new(observer)));
        Ok(id)
    }

    pub fn unsubscribe(&self, id: SubscriptionId) -> FormResult<bool> {
        let mut observers = write_lock(&self.observers, "removing store observer")?;
        let before = observers.len();
        observers.retain(|(candidate, _)| *candidate != id);
        Ok(observers.len() != before)
    }

    #[cfg(test)]
    pub(super) fn poison(&self) {
        let values = self.values.clone();
        let _ = std::thread::spawn(move || {
            let _guard = values.write();
            panic!("poisoning store values");
        })
        .join();
    }

    pub(super) fn notify(&self, values: &FormValues) -> FormResult<()> {
        let observers = read_lock(&self.observers, "reading store observers")?
            .iter()
            .map(|(_, observer)| observer.clone())
            .collect::<Vec<_>>();
        for observer in observers {
            observer(values);
        }
        Ok(())
    }
}
