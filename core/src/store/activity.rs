//! Risk profiles, login logs and chat inquiries: append-only per customer.

use super::sqlite::SqliteStore;
use crate::{
    chat_inquiry::ChatInquiry, error::PiggResult, login_log::LoginLog, risk_profile::RiskProfile,
};
use rusqlite::{params, OptionalExtension};

impl SqliteStore {
    // ── Risk profile ──────────────────────────────────────────────

    pub fn insert_risk_profile(&self, p: &RiskProfile) -> PiggResult<()> {
        let answers = serde_json::to_string(&p.answers)?;
        self.with_conn(|c| {
            c.execute(
                "INSERT INTO risk_profile (customer_id, risk_type, score, answers, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                params![p.customer_id, p.risk_type, p.score, answers, p.created_at],
            )
        })?;
        Ok(())
    }

    pub fn latest_risk_profile(&self, customer_id: &str) -> PiggResult<Option<RiskProfile>> {
        let row: Option<(String, String, i64, String, String)> = self.with_conn(|c| {
            c.query_row(
                "SELECT customer_id, risk_type, score, answers, created_at
                 FROM risk_profile WHERE customer_id = ?1
                 ORDER BY id DESC LIMIT 1",
                params![customer_id],
                |r| Ok((r.get(0)?, r.get(1)?, r.get(2)?, r.get(3)?, r.get(4)?)),
            )
            .optional()
        })?;

        match row {
            Some((customer_id, risk_type, score, answers, created_at)) => Ok(Some(RiskProfile {
                customer_id,
                risk_type,
                score,
                answers: serde_json::from_str(&answers)?,
                created_at,
            })),
            None => Ok(None),
        }
    }

    // ── Login log ─────────────────────────────────────────────────

    pub fn insert_login_log(&self, e: &LoginLog) -> PiggResult<()> {
        self.with_conn(|c| {
            c.execute(
                "INSERT INTO login_log (customer_id, ip_address, user_agent, logged_in_at)
                 VALUES (?1, ?2, ?3, ?4)",
                params![e.customer_id, e.ip_address, e.user_agent, e.logged_in_at],
            )
        })?;
        Ok(())
    }

    pub fn login_logs(&self, customer_id: &str, limit: usize) -> PiggResult<Vec<LoginLog>> {
        self.with_conn(|c| {
            let mut stmt = c.prepare(
                "SELECT customer_id, ip_address, user_agent, logged_in_at
                 FROM login_log WHERE customer_id = ?1
                 ORDER BY id DESC LIMIT ?2",
            )?;
            let rows = stmt.query_map(params![customer_id, limit as i64], |r| {
                Ok(LoginLog {
                    customer_id: r.get(0)?,
                    ip_address: r.get(1)?,
                    user_agent: r.get(2)?,
                    logged_in_at: r.get(3)?,
                })
            })?;
            rows.collect()
        })
    }

    // ── Chat inquiry ──────────────────────────────────────────────

    pub fn insert_chat_inquiry(&self, q: &ChatInquiry) -> PiggResult<()> {
        self.with_conn(|c| {
            c.execute(
                "INSERT INTO chat_inquiry (inquiry_id, customer_id, title, content, status, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                params![q.inquiry_id, q.customer_id, q.title, q.content, q.status, q.created_at],
            )
        })?;
        Ok(())
    }

    pub fn chat_inquiries(&self, customer_id: &str) -> PiggResult<Vec<ChatInquiry>> {
        self.with_conn(|c| {
            let mut stmt = c.prepare(
                "SELECT inquiry_id, customer_id, title, content, status, created_at
                 FROM chat_inquiry WHERE customer_id = ?1
                 ORDER BY rowid DESC",
            )?;
            let rows = stmt.query_map(params![customer_id], |r| {
                Ok(ChatInquiry {
                    inquiry_id: r.get(0)?,
                    customer_id: r.get(1)?,
                    title: r.get(2)?,
                    content: r.get(3)?,
                    status: r.get(4)?,
                    created_at: r.get(5)?,
                })
            })?;
            rows.collect()
        })
    }
}
