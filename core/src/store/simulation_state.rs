use super::sqlite::SqliteStore;
use crate::{error::PiggResult, simulation_state::SimulationState};
use rusqlite::{params, OptionalExtension};

/// customer_id, current_month, performance_data, updated_at as stored.
type StateRow = (String, String, String, String);

impl SqliteStore {
    // ── Simulation state ──────────────────────────────────────────

    pub fn find_simulation_state(&self, customer_id: &str) -> PiggResult<Option<SimulationState>> {
        let row: Option<StateRow> = self.with_conn(|c| {
            c.query_row(
                "SELECT customer_id, current_month, performance_data, updated_at
                 FROM simulation_state WHERE customer_id = ?1
                 ORDER BY id ASC LIMIT 1",
                params![customer_id],
                |r| Ok((r.get(0)?, r.get(1)?, r.get(2)?, r.get(3)?)),
            )
            .optional()
        })?;
        row.map(decode_state).transpose()
    }

    pub fn insert_simulation_state(&self, s: &SimulationState) -> PiggResult<()> {
        let (month, data) = encode_payload(s)?;
        self.with_conn(|c| {
            c.execute(
                "INSERT INTO simulation_state (customer_id, current_month, performance_data, updated_at)
                 VALUES (?1, ?2, ?3, ?4)",
                params![s.customer_id, month, data, s.updated_at],
            )
        })?;
        Ok(())
    }

    pub fn update_simulation_state(&self, s: &SimulationState) -> PiggResult<usize> {
        let (month, data) = encode_payload(s)?;
        self.with_conn(|c| {
            c.execute(
                "UPDATE simulation_state
                 SET current_month = ?1, performance_data = ?2, updated_at = ?3
                 WHERE customer_id = ?4",
                params![month, data, s.updated_at, s.customer_id],
            )
        })
    }

    /// Single statement: the UNIQUE(customer_id) constraint decides between
    /// insert and update, so concurrent writers cannot create a second row.
    pub fn upsert_simulation_state(&self, s: &SimulationState) -> PiggResult<()> {
        let (month, data) = encode_payload(s)?;
        self.with_conn(|c| {
            c.execute(
                "INSERT INTO simulation_state (customer_id, current_month, performance_data, updated_at)
                 VALUES (?1, ?2, ?3, ?4)
                 ON CONFLICT(customer_id) DO UPDATE SET
                    current_month    = excluded.current_month,
                    performance_data = excluded.performance_data,
                    updated_at       = excluded.updated_at",
                params![s.customer_id, month, data, s.updated_at],
            )
        })?;
        Ok(())
    }

    pub fn simulation_state_count(&self, customer_id: &str) -> PiggResult<usize> {
        let n: i64 = self.with_conn(|c| {
            c.query_row(
                "SELECT COUNT(*) FROM simulation_state WHERE customer_id = ?1",
                params![customer_id],
                |r| r.get(0),
            )
        })?;
        Ok(n as usize)
    }
}

fn encode_payload(s: &SimulationState) -> PiggResult<(String, String)> {
    Ok((
        serde_json::to_string(&s.current_month)?,
        serde_json::to_string(&s.performance_data)?,
    ))
}

fn decode_state((customer_id, month, data, updated_at): StateRow) -> PiggResult<SimulationState> {
    Ok(SimulationState {
        customer_id,
        current_month: serde_json::from_str(&month)?,
        performance_data: serde_json::from_str(&data)?,
        updated_at,
    })
}
