//! Record-store services behind the PIGG investment simulation backend.
//!
//! RULE: only `store` talks to a database. Services validate the request,
//! call the store, and shape the result; they never hold SQL.

pub mod chat_inquiry;
pub mod customer;
pub mod error;
pub mod keyed_locks;
pub mod login_log;
pub mod risk_profile;
pub mod simulation_state;
pub mod store;
pub mod types;

pub use error::{PiggError, PiggResult};
pub use store::{memory::MemoryStore, sqlite::SqliteStore, DependentKind, RecordStore, WriteStrategy};
