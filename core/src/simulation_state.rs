//! Per-customer simulation progress.
//!
//! One state row per customer. Every write replaces `current_month` and
//! `performance_data` wholesale; the payloads are stored and returned
//! verbatim, never interpreted.
//!
//! Writes go through the store's conditional upsert when it has one.
//! Otherwise the read-check-then-write sequence runs under a lock keyed by
//! customer id, so concurrent writers for one customer cannot both insert
//! while writers for different customers proceed independently.

use crate::{
    error::PiggResult,
    keyed_locks::KeyedLocks,
    store::{RecordStore, WriteStrategy},
    types::{self, CustomerId, Timestamp, CUSTOMER_ID},
};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimulationState {
    pub customer_id: CustomerId,
    pub current_month: Value,
    pub performance_data: Value,
    pub updated_at: Timestamp,
}

impl SimulationState {
    pub fn snapshot(&self) -> StateSnapshot {
        StateSnapshot {
            current_month: self.current_month.clone(),
            performance_data: self.performance_data.clone(),
        }
    }
}

/// What a client sees of a stored state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StateSnapshot {
    pub current_month: Value,
    pub performance_data: Value,
}

pub struct SimulationStateService {
    store: Arc<dyn RecordStore>,
    writers: KeyedLocks,
}

impl SimulationStateService {
    pub fn new(store: Arc<dyn RecordStore>) -> Self {
        Self {
            store,
            writers: KeyedLocks::new(),
        }
    }

    /// Create the customer's state, or overwrite it if one exists.
    pub fn upsert(
        &self,
        customer_id: Option<&str>,
        current_month: Value,
        performance_data: Value,
    ) -> PiggResult<()> {
        let customer_id = types::require(CUSTOMER_ID, customer_id)?;

        match self.store.write_strategy() {
            WriteStrategy::AtomicUpsert => {
                let state = new_state(customer_id, current_month, performance_data);
                self.store.upsert_simulation_state(&state)?;
            }
            WriteStrategy::CheckThenWrite => {
                let _writer = self.writers.lock(customer_id);
                let state = new_state(customer_id, current_month, performance_data);
                if self.store.find_simulation_state(customer_id)?.is_some() {
                    self.store.update_simulation_state(&state)?;
                } else {
                    self.store.insert_simulation_state(&state)?;
                }
            }
        }

        log::debug!("simulation state saved for customer {customer_id}");
        Ok(())
    }

    /// `Ok(None)` when the customer has no state yet.
    pub fn fetch(&self, customer_id: Option<&str>) -> PiggResult<Option<StateSnapshot>> {
        let customer_id = types::require(CUSTOMER_ID, customer_id)?;
        let state = self.store.find_simulation_state(customer_id)?;
        Ok(state.as_ref().map(SimulationState::snapshot))
    }
}

fn new_state(customer_id: &str, current_month: Value, performance_data: Value) -> SimulationState {
    SimulationState {
        customer_id: customer_id.to_string(),
        current_month,
        performance_data,
        updated_at: types::now(),
    }
}
