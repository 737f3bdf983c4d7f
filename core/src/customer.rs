//! Customer records and the cascade that removes them.
//!
//! Deletion policy: dependent cleanup is advisory, the customer row is
//! authoritative. A failed dependent delete is logged and recorded in the
//! [`CascadeReport`] and the cascade moves on; a failed customer delete is
//! returned as an error.

use crate::{
    error::PiggResult,
    store::{DependentKind, RecordStore},
    types::{self, CustomerId, Timestamp, CUSTOMER_ID},
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Customer {
    pub customer_id: CustomerId,
    pub name: String,
    pub email: String,
    pub phone: Option<String>,
    pub created_at: Timestamp,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct NewCustomer {
    pub name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
}

/// A dependent delete that failed and was skipped.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CleanupFailure {
    pub kind: DependentKind,
    pub message: String,
}

/// Outcome of a cascade whose customer-row delete succeeded.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CascadeReport {
    /// False when no customer row matched.
    pub customer_removed: bool,
    pub cleanup_failures: Vec<CleanupFailure>,
}

impl CascadeReport {
    pub fn is_clean(&self) -> bool {
        self.cleanup_failures.is_empty()
    }
}

pub struct CustomerService {
    store: Arc<dyn RecordStore>,
}

impl CustomerService {
    pub fn new(store: Arc<dyn RecordStore>) -> Self {
        Self { store }
    }

    pub fn create(&self, new: NewCustomer) -> PiggResult<Customer> {
        let name = types::require("Name", new.name.as_deref())?;
        let email = types::require("Email", new.email.as_deref())?;

        let customer = Customer {
            customer_id: uuid::Uuid::new_v4().to_string(),
            name: name.to_string(),
            email: email.to_string(),
            phone: new.phone.filter(|p| !p.is_empty()),
            created_at: types::now(),
        };
        self.store.insert_customer(&customer)?;
        log::info!("customer {} created", customer.customer_id);
        Ok(customer)
    }

    pub fn get(&self, customer_id: Option<&str>) -> PiggResult<Option<Customer>> {
        let customer_id = types::require(CUSTOMER_ID, customer_id)?;
        self.store.get_customer(customer_id)
    }

    /// Remove every dependent record, then the customer.
    pub fn delete(&self, customer_id: Option<&str>) -> PiggResult<CascadeReport> {
        let customer_id = types::require(CUSTOMER_ID, customer_id)?;
        let mut report = CascadeReport::default();

        for kind in DependentKind::ALL {
            match self.store.delete_dependents(kind, customer_id) {
                Ok(removed) => {
                    log::debug!("customer {customer_id}: removed {removed} {kind} rows");
                }
                Err(e) => {
                    log::warn!("customer {customer_id}: {kind} cleanup failed: {e}");
                    report.cleanup_failures.push(CleanupFailure {
                        kind,
                        message: e.to_string(),
                    });
                }
            }
        }

        report.customer_removed = self.store.delete_customer(customer_id)?;
        log::info!(
            "customer {customer_id} deleted (row removed: {}, cleanup failures: {})",
            report.customer_removed,
            report.cleanup_failures.len()
        );
        Ok(report)
    }
}
