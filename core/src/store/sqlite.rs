//! SQLite persistence layer.
//!
//! RULE: only `store` talks to the database.
//! Services call [`RecordStore`] methods; they never execute SQL directly.

use super::{DependentKind, RecordStore, WriteStrategy};
use crate::{
    chat_inquiry::ChatInquiry,
    customer::Customer,
    error::{PiggError, PiggResult},
    login_log::LoginLog,
    risk_profile::RiskProfile,
    simulation_state::SimulationState,
};
use rusqlite::{Connection, OpenFlags};
use std::sync::Mutex;
use std::time::Duration;

const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

/// Idle connections kept for reuse. Checkouts beyond this open a fresh
/// connection that is closed when handed back.
const MAX_IDLE: usize = 8;

/// SQLite store with a small connection pool.
///
/// Each store call checks out its own connection, so calls for different
/// customers never queue behind one another in this process; SQLite's own
/// locking (WAL plus `busy_timeout`) arbitrates between them. The pool lock
/// is held only while taking or returning a connection.
pub struct SqliteStore {
    uri: String,
    idle: Mutex<Vec<Connection>>,
}

fn connect(uri: &str) -> PiggResult<Connection> {
    let conn = Connection::open_with_flags(
        uri,
        OpenFlags::SQLITE_OPEN_READ_WRITE
            | OpenFlags::SQLITE_OPEN_CREATE
            | OpenFlags::SQLITE_OPEN_URI
            | OpenFlags::SQLITE_OPEN_NO_MUTEX,
    )?;
    // WAL only takes for real files; in-memory databases keep their own mode.
    let _ = conn.query_row("PRAGMA journal_mode=WAL", [], |r| r.get::<_, String>(0));
    conn.execute_batch("PRAGMA foreign_keys=ON;")?;
    conn.busy_timeout(BUSY_TIMEOUT)?;
    Ok(conn)
}

impl SqliteStore {
    /// Open (or create) the database at `path`. `file:` URIs are accepted.
    pub fn open(path: &str) -> PiggResult<Self> {
        let first = connect(path)?;
        Ok(Self {
            uri: path.to_string(),
            idle: Mutex::new(vec![first]),
        })
    }

    /// Open a fresh in-memory database. It is private to this store (and
    /// stores made by [`SqliteStore::reopen`]) but shared by every pooled
    /// connection, and lives until the last of them closes.
    pub fn in_memory() -> PiggResult<Self> {
        Self::open(&format!("file:/pigg-{}?vfs=memdb", uuid::Uuid::new_v4()))
    }

    /// Open a second store on the same database.
    pub fn reopen(&self) -> PiggResult<Self> {
        Self::open(&self.uri)
    }

    /// Apply all schema migrations in order. Safe to run more than once.
    pub fn migrate(&self) -> PiggResult<()> {
        self.with_conn(|c| {
            c.execute_batch(include_str!("../../../migrations/001_customers.sql"))?;
            c.execute_batch(include_str!("../../../migrations/002_profiles_and_logs.sql"))?;
            c.execute_batch(include_str!("../../../migrations/003_investment_links.sql"))
        })
    }

    /// Run `work` on a pooled connection.
    pub(super) fn with_conn<T>(
        &self,
        work: impl FnOnce(&Connection) -> rusqlite::Result<T>,
    ) -> PiggResult<T> {
        let conn = self.checkout()?;
        let result = work(&conn);
        self.give_back(conn);
        Ok(result?)
    }

    fn checkout(&self) -> PiggResult<Connection> {
        let reused = self
            .idle
            .lock()
            .map_err(|_| PiggError::Backend("sqlite pool lock poisoned".into()))?
            .pop();
        match reused {
            Some(conn) => Ok(conn),
            None => {
                log::debug!("sqlite pool empty, opening another connection");
                connect(&self.uri)
            }
        }
    }

    fn give_back(&self, conn: Connection) {
        if let Ok(mut idle) = self.idle.lock() {
            if idle.len() < MAX_IDLE {
                idle.push(conn);
            }
        }
    }

    #[cfg(test)]
    fn idle_count(&self) -> usize {
        self.idle.lock().map(|idle| idle.len()).unwrap_or(0)
    }
}

impl RecordStore for SqliteStore {
    fn insert_customer(&self, customer: &Customer) -> PiggResult<()> {
        SqliteStore::insert_customer(self, customer)
    }

    fn get_customer(&self, customer_id: &str) -> PiggResult<Option<Customer>> {
        SqliteStore::get_customer(self, customer_id)
    }

    fn delete_customer(&self, customer_id: &str) -> PiggResult<bool> {
        SqliteStore::delete_customer(self, customer_id)
    }

    fn delete_dependents(&self, kind: DependentKind, customer_id: &str) -> PiggResult<usize> {
        SqliteStore::delete_dependents(self, kind, customer_id)
    }

    fn write_strategy(&self) -> WriteStrategy {
        WriteStrategy::AtomicUpsert
    }

    fn find_simulation_state(&self, customer_id: &str) -> PiggResult<Option<SimulationState>> {
        SqliteStore::find_simulation_state(self, customer_id)
    }

    fn insert_simulation_state(&self, state: &SimulationState) -> PiggResult<()> {
        SqliteStore::insert_simulation_state(self, state)
    }

    fn update_simulation_state(&self, state: &SimulationState) -> PiggResult<usize> {
        SqliteStore::update_simulation_state(self, state)
    }

    fn upsert_simulation_state(&self, state: &SimulationState) -> PiggResult<()> {
        SqliteStore::upsert_simulation_state(self, state)
    }

    fn simulation_state_count(&self, customer_id: &str) -> PiggResult<usize> {
        SqliteStore::simulation_state_count(self, customer_id)
    }

    fn insert_risk_profile(&self, profile: &RiskProfile) -> PiggResult<()> {
        SqliteStore::insert_risk_profile(self, profile)
    }

    fn latest_risk_profile(&self, customer_id: &str) -> PiggResult<Option<RiskProfile>> {
        SqliteStore::latest_risk_profile(self, customer_id)
    }

    fn insert_login_log(&self, entry: &LoginLog) -> PiggResult<()> {
        SqliteStore::insert_login_log(self, entry)
    }

    fn login_logs(&self, customer_id: &str, limit: usize) -> PiggResult<Vec<LoginLog>> {
        SqliteStore::login_logs(self, customer_id, limit)
    }

    fn insert_chat_inquiry(&self, inquiry: &ChatInquiry) -> PiggResult<()> {
        SqliteStore::insert_chat_inquiry(self, inquiry)
    }

    fn chat_inquiries(&self, customer_id: &str) -> PiggResult<Vec<ChatInquiry>> {
        SqliteStore::chat_inquiries(self, customer_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::sync::{mpsc, Arc};
    use std::thread;

    fn migrated() -> SqliteStore {
        let store = SqliteStore::in_memory().unwrap();
        store.migrate().unwrap();
        store
    }

    fn state(customer_id: &str, month: i64) -> SimulationState {
        SimulationState {
            customer_id: customer_id.into(),
            current_month: json!(month),
            performance_data: json!({ "nav": month * 100 }),
            updated_at: crate::types::now(),
        }
    }

    #[test]
    fn migrations_are_idempotent() {
        let store = migrated();
        store.migrate().unwrap();
    }

    #[test]
    fn in_memory_stores_are_isolated_from_each_other() {
        let a = migrated();
        let b = SqliteStore::in_memory().unwrap();
        a.upsert_simulation_state(&state("cust-1", 1)).unwrap();
        // Fresh database: no schema yet.
        assert!(b.simulation_state_count("cust-1").is_err());
    }

    #[test]
    fn reopen_shares_the_in_memory_database() {
        let store = migrated();
        store.upsert_simulation_state(&state("cust-1", 7)).unwrap();
        let other = store.reopen().unwrap();
        let seen = other.find_simulation_state("cust-1").unwrap().unwrap();
        assert_eq!(seen.current_month, json!(7));
    }

    #[test]
    fn every_pooled_connection_sees_the_same_data() {
        let store = migrated();
        let month: String = store
            .with_conn(|held| {
                // The only idle connection is checked out; this write opens another.
                store.upsert_simulation_state(&state("cust-1", 3)).unwrap();
                held.query_row(
                    "SELECT current_month FROM simulation_state WHERE customer_id = 'cust-1'",
                    [],
                    |r| r.get(0),
                )
            })
            .unwrap();
        assert_eq!(month, "3");
    }

    #[test]
    fn calls_for_another_customer_do_not_wait_for_a_busy_connection() {
        let store = Arc::new(migrated());
        store.upsert_simulation_state(&state("cust-b", 1)).unwrap();

        // While a call for cust-a is still running on its connection, a call
        // for cust-b on another thread must finish.
        let seen = store
            .with_conn(|_cust_a_in_flight| {
                let (tx, rx) = mpsc::channel();
                let other = Arc::clone(&store);
                let worker = thread::spawn(move || {
                    let result = other
                        .upsert_simulation_state(&state("cust-b", 2))
                        .and_then(|()| other.find_simulation_state("cust-b"));
                    let _ = tx.send(result.map(|s| s.map(|s| s.current_month)));
                });
                let seen = rx
                    .recv_timeout(Duration::from_secs(10))
                    .expect("cust-b call should finish while cust-a is in flight");
                worker.join().unwrap();
                Ok(seen)
            })
            .unwrap()
            .unwrap();
        assert_eq!(seen, Some(json!(2)));
    }

    #[test]
    fn returned_connections_are_reused() {
        let store = migrated();
        assert_eq!(store.idle_count(), 1);
        store
            .with_conn(|_| {
                store.with_conn(|_| {
                    assert_eq!(store.idle_count(), 0);
                    Ok(())
                })
                .unwrap();
                Ok(())
            })
            .unwrap();
        assert_eq!(store.idle_count(), 2);
        store.simulation_state_count("cust-1").unwrap();
        assert_eq!(store.idle_count(), 2);
    }
}
