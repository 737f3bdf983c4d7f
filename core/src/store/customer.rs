use super::{sqlite::SqliteStore, DependentKind};
use crate::{customer::Customer, error::PiggResult};
use rusqlite::{params, OptionalExtension};

impl SqliteStore {
    // ── Customer ──────────────────────────────────────────────────

    pub fn insert_customer(&self, c: &Customer) -> PiggResult<()> {
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO customer (customer_id, name, email, phone, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                params![c.customer_id, c.name, c.email, c.phone, c.created_at],
            )
        })?;
        Ok(())
    }

    pub fn get_customer(&self, customer_id: &str) -> PiggResult<Option<Customer>> {
        self.with_conn(|conn| {
            conn.query_row(
                "SELECT customer_id, name, email, phone, created_at
                 FROM customer WHERE customer_id = ?1",
                params![customer_id],
                |r| {
                    Ok(Customer {
                        customer_id: r.get(0)?,
                        name: r.get(1)?,
                        email: r.get(2)?,
                        phone: r.get(3)?,
                        created_at: r.get(4)?,
                    })
                },
            )
            .optional()
        })
    }

    pub fn delete_customer(&self, customer_id: &str) -> PiggResult<bool> {
        let removed = self.with_conn(|conn| {
            conn.execute(
                "DELETE FROM customer WHERE customer_id = ?1",
                params![customer_id],
            )
        })?;
        Ok(removed > 0)
    }

    // ── Dependents ────────────────────────────────────────────────

    pub fn delete_dependents(&self, kind: DependentKind, customer_id: &str) -> PiggResult<usize> {
        let sql = format!("DELETE FROM {} WHERE customer_id = ?1", kind.table());
        self.with_conn(|conn| conn.execute(&sql, params![customer_id]))
    }

    /// Count `kind` rows for a customer (test helper).
    pub fn dependent_count(&self, kind: DependentKind, customer_id: &str) -> PiggResult<i64> {
        let sql = format!("SELECT COUNT(*) FROM {} WHERE customer_id = ?1", kind.table());
        self.with_conn(|conn| conn.query_row(&sql, params![customer_id], |r| r.get(0)))
    }

    /// Insert a bare linked record (test helper).
    /// Only for kinds owned by other services: investment details, broker
    /// links, virtual accounts, notifications.
    pub fn insert_linked_record(&self, kind: DependentKind, customer_id: &str) -> PiggResult<()> {
        let sql = format!("INSERT INTO {} (customer_id) VALUES (?1)", kind.table());
        self.with_conn(|conn| conn.execute(&sql, params![customer_id]))?;
        Ok(())
    }
}
