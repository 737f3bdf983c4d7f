use crate::{
    error::PiggResult,
    store::RecordStore,
    types::{self, CustomerId, Timestamp, CUSTOMER_ID},
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

pub const DEFAULT_LIMIT: usize = 20;
pub const MAX_LIMIT: usize = 100;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginLog {
    pub customer_id: CustomerId,
    pub ip_address: Option<String>,
    pub user_agent: Option<String>,
    pub logged_in_at: Timestamp,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewLoginLog {
    pub ip_address: Option<String>,
    pub user_agent: Option<String>,
}

pub struct LoginLogService {
    store: Arc<dyn RecordStore>,
}

impl LoginLogService {
    pub fn new(store: Arc<dyn RecordStore>) -> Self {
        Self { store }
    }

    pub fn record(&self, customer_id: Option<&str>, new: NewLoginLog) -> PiggResult<LoginLog> {
        let customer_id = types::require(CUSTOMER_ID, customer_id)?;
        let entry = LoginLog {
            customer_id: customer_id.to_string(),
            ip_address: new.ip_address,
            user_agent: new.user_agent,
            logged_in_at: types::now(),
        };
        self.store.insert_login_log(&entry)?;
        Ok(entry)
    }

    /// Newest first, at most `limit` entries (default 20, clamped to 1..=100).
    pub fn recent(&self, customer_id: Option<&str>, limit: Option<usize>) -> PiggResult<Vec<LoginLog>> {
        let customer_id = types::require(CUSTOMER_ID, customer_id)?;
        self.store.login_logs(customer_id, clamp_limit(limit))
    }
}

fn clamp_limit(limit: Option<usize>) -> usize {
    limit.unwrap_or(DEFAULT_LIMIT).clamp(1, MAX_LIMIT)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn limit_defaults_and_clamps() {
        assert_eq!(clamp_limit(None), DEFAULT_LIMIT);
        assert_eq!(clamp_limit(Some(0)), 1);
        assert_eq!(clamp_limit(Some(5)), 5);
        assert_eq!(clamp_limit(Some(10_000)), MAX_LIMIT);
    }
}
