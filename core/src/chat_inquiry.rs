//! Customer support inquiries submitted from the chat widget.

use crate::{
    error::PiggResult,
    store::RecordStore,
    types::{self, CustomerId, Timestamp, CUSTOMER_ID},
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

pub const STATUS_PENDING: &str = "pending";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatInquiry {
    pub inquiry_id: String,
    pub customer_id: CustomerId,
    pub title: String,
    pub content: String,
    pub status: String, // pending | answered
    pub created_at: Timestamp,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct NewChatInquiry {
    pub title: Option<String>,
    pub content: Option<String>,
}

pub struct ChatInquiryService {
    store: Arc<dyn RecordStore>,
}

impl ChatInquiryService {
    pub fn new(store: Arc<dyn RecordStore>) -> Self {
        Self { store }
    }

    pub fn submit(&self, customer_id: Option<&str>, new: NewChatInquiry) -> PiggResult<ChatInquiry> {
        let customer_id = types::require(CUSTOMER_ID, customer_id)?;
        let title = types::require("Title", new.title.as_deref())?;
        let content = types::require("Content", new.content.as_deref())?;

        let inquiry = ChatInquiry {
            inquiry_id: uuid::Uuid::new_v4().to_string(),
            customer_id: customer_id.to_string(),
            title: title.to_string(),
            content: content.to_string(),
            status: STATUS_PENDING.to_string(),
            created_at: types::now(),
        };
        self.store.insert_chat_inquiry(&inquiry)?;
        log::info!("chat inquiry {} submitted by {customer_id}", inquiry.inquiry_id);
        Ok(inquiry)
    }

    pub fn list(&self, customer_id: Option<&str>) -> PiggResult<Vec<ChatInquiry>> {
        let customer_id = types::require(CUSTOMER_ID, customer_id)?;
        self.store.chat_inquiries(customer_id)
    }
}
