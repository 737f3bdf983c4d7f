//! In-memory record store.
//!
//! Thread-safe and constraint-free: like a hosted table without a unique
//! index, it will happily hold two simulation-state rows for one customer if
//! two inserts arrive. It reports [`WriteStrategy::CheckThenWrite`] unless
//! told otherwise, so callers must serialize writers themselves.
//!
//! Built for tests: every trait call is counted, reads can be slowed down to
//! widen race windows or made to wait for each other, and individual
//! operations can be made to fail.

use super::{DependentKind, RecordStore, WriteStrategy};
use crate::{
    chat_inquiry::ChatInquiry,
    customer::Customer,
    error::{PiggError, PiggResult},
    login_log::LoginLog,
    risk_profile::RiskProfile,
    simulation_state::SimulationState,
};
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Condvar, Mutex, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::thread;
use std::time::Duration;

fn lock_err(context: &'static str) -> PiggError {
    PiggError::Backend(format!("poisoned lock: {context}"))
}

fn injected(what: impl std::fmt::Display) -> PiggError {
    PiggError::Backend(format!("injected failure: {what}"))
}

#[derive(Debug, Default)]
struct Tables {
    customers: HashMap<String, Customer>,
    simulation_states: Vec<SimulationState>,
    risk_profiles: Vec<RiskProfile>,
    login_logs: Vec<LoginLog>,
    chat_inquiries: Vec<ChatInquiry>,
    /// Rows of kinds this crate never writes, by customer.
    linked: HashMap<DependentKind, Vec<String>>,
}

#[derive(Debug, Default)]
struct Faults {
    dependent_deletes: HashSet<DependentKind>,
    customer_delete: bool,
    simulation_state: bool,
}

#[derive(Debug, Default)]
struct Meeting {
    inside: usize,
    peak: usize,
}

/// Simulation-state readers wait here until `parties` of them have been
/// inside at once, or until `patience` runs out.
struct ReadRendezvous {
    parties: usize,
    patience: Duration,
    meeting: Mutex<Meeting>,
    arrived: Condvar,
}

impl ReadRendezvous {
    fn meet(&self) {
        let mut m = self.meeting.lock().unwrap_or_else(PoisonError::into_inner);
        m.inside += 1;
        m.peak = m.peak.max(m.inside);
        self.arrived.notify_all();
        let (mut m, _) = self
            .arrived
            .wait_timeout_while(m, self.patience, |m| m.peak < self.parties)
            .unwrap_or_else(PoisonError::into_inner);
        m.inside -= 1;
    }

    fn peak(&self) -> usize {
        self.meeting.lock().unwrap_or_else(PoisonError::into_inner).peak
    }
}

pub struct MemoryStore {
    tables: RwLock<Tables>,
    faults: RwLock<Faults>,
    calls: AtomicUsize,
    strategy: WriteStrategy,
    read_delay: Duration,
    rendezvous: Option<ReadRendezvous>,
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryStore {
    pub fn new() -> Self {
        Self {
            tables: RwLock::new(Tables::default()),
            faults: RwLock::new(Faults::default()),
            calls: AtomicUsize::new(0),
            strategy: WriteStrategy::CheckThenWrite,
            read_delay: Duration::ZERO,
            rendezvous: None,
        }
    }

    /// Report a different write strategy. `upsert_simulation_state` is always
    /// atomic here; this only changes what callers are told.
    pub fn with_write_strategy(mut self, strategy: WriteStrategy) -> Self {
        self.strategy = strategy;
        self
    }

    /// Sleep this long inside every simulation-state read, outside the lock.
    pub fn with_read_delay(mut self, delay: Duration) -> Self {
        self.read_delay = delay;
        self
    }

    /// Hold each simulation-state read until `parties` reads are in flight
    /// together, giving up after `patience`. Readers that were serialized
    /// upstream never meet, so [`MemoryStore::peak_concurrent_reads`] stays 1.
    pub fn with_read_rendezvous(mut self, parties: usize, patience: Duration) -> Self {
        self.rendezvous = Some(ReadRendezvous {
            parties,
            patience,
            meeting: Mutex::new(Meeting::default()),
            arrived: Condvar::new(),
        });
        self
    }

    /// Most simulation-state reads seen in flight at once, when a
    /// rendezvous is set; otherwise 0.
    pub fn peak_concurrent_reads(&self) -> usize {
        self.rendezvous.as_ref().map_or(0, ReadRendezvous::peak)
    }

    /// Number of `RecordStore` calls made so far.
    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn fail_dependent_delete(&self, kind: DependentKind) {
        if let Ok(mut f) = self.faults.write() {
            f.dependent_deletes.insert(kind);
        }
    }

    pub fn fail_customer_delete(&self) {
        if let Ok(mut f) = self.faults.write() {
            f.customer_delete = true;
        }
    }

    /// Every simulation-state operation fails from now on.
    pub fn fail_simulation_state(&self) {
        if let Ok(mut f) = self.faults.write() {
            f.simulation_state = true;
        }
    }

    /// Insert a bare record of a kind owned by another service.
    pub fn insert_linked_record(&self, kind: DependentKind, customer_id: &str) -> PiggResult<()> {
        self.write()?
            .linked
            .entry(kind)
            .or_default()
            .push(customer_id.to_string());
        Ok(())
    }

    /// Rows of `kind` held for a customer.
    pub fn dependent_count(&self, kind: DependentKind, customer_id: &str) -> PiggResult<usize> {
        let t = self.read()?;
        let n = match kind {
            DependentKind::SimulationState => count(&t.simulation_states, customer_id, |s| &s.customer_id),
            DependentKind::RiskProfiles => count(&t.risk_profiles, customer_id, |p| &p.customer_id),
            DependentKind::LoginLogs => count(&t.login_logs, customer_id, |l| &l.customer_id),
            DependentKind::ChatInquiries => count(&t.chat_inquiries, customer_id, |q| &q.customer_id),
            other => t
                .linked
                .get(&other)
                .map_or(0, |ids| ids.iter().filter(|id| *id == customer_id).count()),
        };
        Ok(n)
    }

    fn touch(&self) {
        self.calls.fetch_add(1, Ordering::SeqCst);
    }

    fn read(&self) -> PiggResult<RwLockReadGuard<'_, Tables>> {
        self.tables.read().map_err(|_| lock_err("tables"))
    }

    fn write(&self) -> PiggResult<RwLockWriteGuard<'_, Tables>> {
        self.tables.write().map_err(|_| lock_err("tables"))
    }

    fn faults(&self) -> PiggResult<RwLockReadGuard<'_, Faults>> {
        self.faults.read().map_err(|_| lock_err("faults"))
    }

    fn check_state_fault(&self) -> PiggResult<()> {
        if self.faults()?.simulation_state {
            return Err(injected("simulation_state"));
        }
        Ok(())
    }
}

fn count<T>(rows: &[T], customer_id: &str, key: impl Fn(&T) -> &String) -> usize {
    rows.iter().filter(|r| key(r) == customer_id).count()
}

fn remove_for<T>(rows: &mut Vec<T>, customer_id: &str, key: impl Fn(&T) -> &String) -> usize {
    let before = rows.len();
    rows.retain(|r| key(r) != customer_id);
    before - rows.len()
}

impl RecordStore for MemoryStore {
    fn insert_customer(&self, customer: &Customer) -> PiggResult<()> {
        self.touch();
        let mut t = self.write()?;
        if t.customers.contains_key(&customer.customer_id) {
            return Err(PiggError::Backend(format!(
                "duplicate customer_id {}",
                customer.customer_id
            )));
        }
        t.customers.insert(customer.customer_id.clone(), customer.clone());
        Ok(())
    }

    fn get_customer(&self, customer_id: &str) -> PiggResult<Option<Customer>> {
        self.touch();
        Ok(self.read()?.customers.get(customer_id).cloned())
    }

    fn delete_customer(&self, customer_id: &str) -> PiggResult<bool> {
        self.touch();
        if self.faults()?.customer_delete {
            return Err(injected("customer"));
        }
        Ok(self.write()?.customers.remove(customer_id).is_some())
    }

    fn delete_dependents(&self, kind: DependentKind, customer_id: &str) -> PiggResult<usize> {
        self.touch();
        if self.faults()?.dependent_deletes.contains(&kind) {
            return Err(injected(kind));
        }
        let mut t = self.write()?;
        let removed = match kind {
            DependentKind::SimulationState => {
                remove_for(&mut t.simulation_states, customer_id, |s| &s.customer_id)
            }
            DependentKind::RiskProfiles => remove_for(&mut t.risk_profiles, customer_id, |p| &p.customer_id),
            DependentKind::LoginLogs => remove_for(&mut t.login_logs, customer_id, |l| &l.customer_id),
            DependentKind::ChatInquiries => {
                remove_for(&mut t.chat_inquiries, customer_id, |q| &q.customer_id)
            }
            other => match t.linked.get_mut(&other) {
                Some(ids) => remove_for(ids, customer_id, |id| id),
                None => 0,
            },
        };
        Ok(removed)
    }

    fn write_strategy(&self) -> WriteStrategy {
        self.strategy
    }

    fn find_simulation_state(&self, customer_id: &str) -> PiggResult<Option<SimulationState>> {
        self.touch();
        self.check_state_fault()?;
        if !self.read_delay.is_zero() {
            thread::sleep(self.read_delay);
        }
        if let Some(rendezvous) = &self.rendezvous {
            rendezvous.meet();
        }
        let t = self.read()?;
        Ok(t
            .simulation_states
            .iter()
            .find(|s| s.customer_id == customer_id)
            .cloned())
    }

    fn insert_simulation_state(&self, state: &SimulationState) -> PiggResult<()> {
        self.touch();
        self.check_state_fault()?;
        self.write()?.simulation_states.push(state.clone());
        Ok(())
    }

    fn update_simulation_state(&self, state: &SimulationState) -> PiggResult<usize> {
        self.touch();
        self.check_state_fault()?;
        let mut t = self.write()?;
        let mut touched = 0;
        for row in t
            .simulation_states
            .iter_mut()
            .filter(|s| s.customer_id == state.customer_id)
        {
            row.current_month = state.current_month.clone();
            row.performance_data = state.performance_data.clone();
            row.updated_at = state.updated_at.clone();
            touched += 1;
        }
        Ok(touched)
    }

    fn upsert_simulation_state(&self, state: &SimulationState) -> PiggResult<()> {
        self.touch();
        self.check_state_fault()?;
        let mut t = self.write()?;
        match t
            .simulation_states
            .iter_mut()
            .find(|s| s.customer_id == state.customer_id)
        {
            Some(row) => *row = state.clone(),
            None => t.simulation_states.push(state.clone()),
        }
        Ok(())
    }

    fn simulation_state_count(&self, customer_id: &str) -> PiggResult<usize> {
        self.touch();
        Ok(count(&self.read()?.simulation_states, customer_id, |s| &s.customer_id))
    }

    fn insert_risk_profile(&self, profile: &RiskProfile) -> PiggResult<()> {
        self.touch();
        self.write()?.risk_profiles.push(profile.clone());
        Ok(())
    }

    fn latest_risk_profile(&self, customer_id: &str) -> PiggResult<Option<RiskProfile>> {
        self.touch();
        let t = self.read()?;
        Ok(t
            .risk_profiles
            .iter()
            .rev()
            .find(|p| p.customer_id == customer_id)
            .cloned())
    }

    fn insert_login_log(&self, entry: &LoginLog) -> PiggResult<()> {
        self.touch();
        self.write()?.login_logs.push(entry.clone());
        Ok(())
    }

    fn login_logs(&self, customer_id: &str, limit: usize) -> PiggResult<Vec<LoginLog>> {
        self.touch();
        let t = self.read()?;
        Ok(t
            .login_logs
            .iter()
            .rev()
            .filter(|l| l.customer_id == customer_id)
            .take(limit)
            .cloned()
            .collect())
    }

    fn insert_chat_inquiry(&self, inquiry: &ChatInquiry) -> PiggResult<()> {
        self.touch();
        self.write()?.chat_inquiries.push(inquiry.clone());
        Ok(())
    }

    fn chat_inquiries(&self, customer_id: &str) -> PiggResult<Vec<ChatInquiry>> {
        self.touch();
        let t = self.read()?;
        Ok(t
            .chat_inquiries
            .iter()
            .rev()
            .filter(|q| q.customer_id == customer_id)
            .cloned()
            .collect())
    }
}
