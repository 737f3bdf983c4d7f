//! Investor risk assessments. Every save appends; readers want the latest.

use crate::{
    error::PiggResult,
    store::RecordStore,
    types::{self, CustomerId, Timestamp, CUSTOMER_ID},
};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RiskProfile {
    pub customer_id: CustomerId,
    pub risk_type: String,
    pub score: i64,
    /// Questionnaire answers, kept as submitted.
    pub answers: Value,
    pub created_at: Timestamp,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewRiskProfile {
    pub risk_type: Option<String>,
    #[serde(default)]
    pub score: i64,
    #[serde(default)]
    pub answers: Value,
}

pub struct RiskProfileService {
    store: Arc<dyn RecordStore>,
}

impl RiskProfileService {
    pub fn new(store: Arc<dyn RecordStore>) -> Self {
        Self { store }
    }

    pub fn save(&self, customer_id: Option<&str>, new: NewRiskProfile) -> PiggResult<RiskProfile> {
        let customer_id = types::require(CUSTOMER_ID, customer_id)?;
        let risk_type = types::require("Risk type", new.risk_type.as_deref())?;

        let profile = RiskProfile {
            customer_id: customer_id.to_string(),
            risk_type: risk_type.to_string(),
            score: new.score,
            answers: new.answers,
            created_at: types::now(),
        };
        self.store.insert_risk_profile(&profile)?;
        Ok(profile)
    }

    pub fn latest(&self, customer_id: Option<&str>) -> PiggResult<Option<RiskProfile>> {
        let customer_id = types::require(CUSTOMER_ID, customer_id)?;
        self.store.latest_risk_profile(customer_id)
    }
}
