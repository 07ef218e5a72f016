use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum LeadStatus {
    Draft,
    Approved,
    Sent,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Lead {
    pub id: String,
    pub name: String,
    pub role: String,
    pub company: String,
    pub linkedin_url: Option<String>,
    pub status: LeadStatus,
    pub user_id: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Message {
    pub id: String,
    pub lead_id: String,
    pub content: String,
    pub user_id: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Insert payload for the `leads` collection. The id and timestamps are
/// assigned by the store.
#[derive(Debug, Serialize, Clone)]
pub struct NewLead {
    pub name: String,
    pub role: String,
    pub company: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub linkedin_url: Option<String>,
    pub status: LeadStatus,
    pub user_id: String,
}

#[derive(Debug, Serialize, Clone)]
pub struct NewMessage {
    pub lead_id: String,
    pub content: String,
    pub user_id: String,
}

/// The three fields the outreach prompt is built from.
#[derive(Debug, Deserialize, Clone, Default)]
pub struct LeadProfile {
    pub name: Option<String>,
    pub role: Option<String>,
    pub company: Option<String>,
}
