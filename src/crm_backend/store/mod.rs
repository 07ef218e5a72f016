pub mod supabase;
pub mod types;

use async_trait::async_trait;
use thiserror::Error;

use crate::crm_backend::auth::Session;
use types::{Lead, LeadProfile, Message, NewLead, NewMessage};

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("record not found")]
    NotFound,
    #[error("request failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("store error ({status}): {body}")]
    Api {
        status: reqwest::StatusCode,
        body: String,
    },
    #[error("unexpected store response: {0}")]
    Malformed(String),
}

/// Remote collection access for `leads` and `messages`. Every call carries
/// the session it acts on behalf of; row-level access control is enforced
/// by the store itself.
#[async_trait]
pub trait DataStore: Send + Sync {
    /// Leads ordered by creation time descending, limit/offset ranged.
    async fn list_leads(
        &self,
        session: &Session,
        limit: usize,
        offset: usize,
    ) -> Result<Vec<Lead>, StoreError>;

    /// Insert and return the created record.
    async fn insert_lead(&self, session: &Session, lead: &NewLead) -> Result<Lead, StoreError>;

    /// Single-record read of the prompt fields by lead id.
    async fn fetch_lead_profile(
        &self,
        session: &Session,
        lead_id: &str,
    ) -> Result<LeadProfile, StoreError>;

    /// All messages for one lead, creation time descending, unpaginated.
    async fn list_messages(
        &self,
        session: &Session,
        lead_id: &str,
    ) -> Result<Vec<Message>, StoreError>;

    async fn insert_message(
        &self,
        session: &Session,
        message: &NewMessage,
    ) -> Result<Message, StoreError>;
}
