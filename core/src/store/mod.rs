//! Record store seam.
//!
//! Services see the database only through [`RecordStore`]: one method per
//! equality-filtered query they issue. `sqlite` is the production backend,
//! `memory` the test double.

pub mod memory;
pub mod sqlite;

mod activity;
mod customer;
mod simulation_state;

use crate::{
    chat_inquiry::ChatInquiry,
    customer::Customer,
    error::PiggResult,
    login_log::LoginLog,
    risk_profile::RiskProfile,
    simulation_state::SimulationState,
};
use serde::{Deserialize, Serialize};
use std::fmt;

/// How a store can satisfy "one simulation state row per customer".
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteStrategy {
    /// The store has a single conditional write (insert, or update on conflict).
    AtomicUpsert,
    /// The store only offers separate read, insert and update calls. The caller
    /// must serialize writers per customer.
    CheckThenWrite,
}

/// Record kinds that reference a customer and are removed with it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DependentKind {
    InvestmentDetails,
    BrokerLinks,
    VirtualAccounts,
    ChatInquiries,
    Notifications,
    SimulationState,
    RiskProfiles,
    LoginLogs,
}

impl DependentKind {
    /// Cascade order. The customer row itself is deleted after all of these.
    pub const ALL: [DependentKind; 8] = [
        DependentKind::InvestmentDetails,
        DependentKind::BrokerLinks,
        DependentKind::VirtualAccounts,
        DependentKind::ChatInquiries,
        DependentKind::Notifications,
        DependentKind::SimulationState,
        DependentKind::RiskProfiles,
        DependentKind::LoginLogs,
    ];

    pub fn table(self) -> &'static str {
        match self {
            DependentKind::InvestmentDetails => "investment_details",
            DependentKind::BrokerLinks       => "broker_link",
            DependentKind::VirtualAccounts   => "virtual_account",
            DependentKind::ChatInquiries     => "chat_inquiry",
            DependentKind::Notifications     => "notification",
            DependentKind::SimulationState   => "simulation_state",
            DependentKind::RiskProfiles      => "risk_profile",
            DependentKind::LoginLogs         => "login_log",
        }
    }
}

impl fmt::Display for DependentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.table())
    }
}

/// Keyed-record store used by every service.
///
/// Implementations must be safe to share between request handlers.
/// "Not found" is `Ok(None)` / `Ok(false)`, never an error.
pub trait RecordStore: Send + Sync {
    // ── Customer ───────────────────────────────────────────────

    fn insert_customer(&self, customer: &Customer) -> PiggResult<()>;

    fn get_customer(&self, customer_id: &str) -> PiggResult<Option<Customer>>;

    /// Delete the customer row. Returns whether a row was removed.
    fn delete_customer(&self, customer_id: &str) -> PiggResult<bool>;

    /// Delete every `kind` record referencing `customer_id`. Returns the row count.
    fn delete_dependents(&self, kind: DependentKind, customer_id: &str) -> PiggResult<usize>;

    // ── Simulation state ───────────────────────────────────────

    fn write_strategy(&self) -> WriteStrategy;

    /// At most one row, keyed by customer.
    fn find_simulation_state(&self, customer_id: &str) -> PiggResult<Option<SimulationState>>;

    fn insert_simulation_state(&self, state: &SimulationState) -> PiggResult<()>;

    /// Overwrite `current_month`, `performance_data` and `updated_at` for the
    /// state's customer. Returns the number of rows touched.
    fn update_simulation_state(&self, state: &SimulationState) -> PiggResult<usize>;

    /// Insert, or replace on conflict, as one store operation.
    fn upsert_simulation_state(&self, state: &SimulationState) -> PiggResult<()>;

    /// Number of state rows held for a customer.
    fn simulation_state_count(&self, customer_id: &str) -> PiggResult<usize>;

    // ── Risk profile ───────────────────────────────────────────

    fn insert_risk_profile(&self, profile: &RiskProfile) -> PiggResult<()>;

    fn latest_risk_profile(&self, customer_id: &str) -> PiggResult<Option<RiskProfile>>;

    // ── Login log ──────────────────────────────────────────────

    fn insert_login_log(&self, entry: &LoginLog) -> PiggResult<()>;

    /// Newest first.
    fn login_logs(&self, customer_id: &str, limit: usize) -> PiggResult<Vec<LoginLog>>;

    // ── Chat inquiry ───────────────────────────────────────────

    fn insert_chat_inquiry(&self, inquiry: &ChatInquiry) -> PiggResult<()>;

    /// Newest first.
    fn chat_inquiries(&self, customer_id: &str) -> PiggResult<Vec<ChatInquiry>>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn dependent_tables_are_distinct() {
        let tables: HashSet<_> = DependentKind::ALL.iter().map(|k| k.table()).collect();
        assert_eq!(tables.len(), DependentKind::ALL.len());
    }

    #[test]
    fn simulation_state_is_part_of_the_cascade() {
        assert!(DependentKind::ALL.contains(&DependentKind::SimulationState));
        assert_eq!(DependentKind::SimulationState.to_string(), "simulation_state");
    }
}
