use std::time::Duration;

use async_trait::async_trait;
use log::debug;
use reqwest::{Client, RequestBuilder, Response};
use serde_json::Value;

use super::types::{Lead, LeadProfile, Message, NewLead, NewMessage};
use super::{DataStore, StoreError};
use crate::crm_backend::auth::Session;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(15);

/// PostgREST client for the hosted Supabase project that holds the `leads`
/// and `messages` collections. Ordering, ranging and row-level security all
/// happen server-side; this client only shapes requests.
pub struct SupabaseStore {
    client: Client,
    base_url: String,
    anon_key: String,
}

impl SupabaseStore {
    pub fn from_env() -> Result<Self, String> {
        let base_url =
            std::env::var("SUPABASE_URL").map_err(|_| "SUPABASE_URL is not set".to_string())?;
        let anon_key = std::env::var("SUPABASE_ANON_KEY")
            .map_err(|_| "SUPABASE_ANON_KEY is not set".to_string())?;
        Self::new(&base_url, &anon_key)
    }

    pub fn new(base_url: &str, anon_key: &str) -> Result<Self, String> {
        let parsed =
            url::Url::parse(base_url).map_err(|e| format!("Invalid SUPABASE_URL: {}", e))?;
        if parsed.scheme() != "http" && parsed.scheme() != "https" {
            return Err(format!("Invalid SUPABASE_URL scheme: {}", parsed.scheme()));
        }

        let client = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| e.to_string())?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            anon_key: anon_key.to_string(),
        })
    }

    fn table_url(&self, table: &str) -> String {
        format!("{}/rest/v1/{}", self.base_url, table)
    }

    fn with_auth(&self, req: RequestBuilder, session: &Session) -> RequestBuilder {
        req.header("apikey", &self.anon_key)
            .header("Authorization", format!("Bearer {}", session.access_token))
    }

    /// Password-grant sign in against the project's auth endpoint.
    pub async fn sign_in(&self, email: &str, password: &str) -> Result<Session, StoreError> {
        let url = format!("{}/auth/v1/token?grant_type=password", self.base_url);
        let resp = self
            .client
            .post(&url)
            .header("apikey", &self.anon_key)
            .json(&serde_json::json!({ "email": email, "password": password }))
            .send()
            .await?;
        let body: Value = Self::check(resp).await?.json().await?;

        let access_token = body["access_token"]
            .as_str()
            .ok_or_else(|| StoreError::Malformed("no access_token in auth response".into()))?;
        let user_id = body["user"]["id"]
            .as_str()
            .ok_or_else(|| StoreError::Malformed("no user id in auth response".into()))?;

        Ok(Session {
            access_token: access_token.to_string(),
            user_id: user_id.to_string(),
        })
    }

    async fn check(resp: Response) -> Result<Response, StoreError> {
        if resp.status().is_success() {
            return Ok(resp);
        }
        let status = resp.status();
        let body = resp.text().await.unwrap_or_default();
        Err(StoreError::Api { status, body })
    }
}

#[async_trait]
impl DataStore for SupabaseStore {
    async fn list_leads(
        &self,
        session: &Session,
        limit: usize,
        offset: usize,
    ) -> Result<Vec<Lead>, StoreError> {
        debug!("Listing leads, limit {} offset {}", limit, offset);
        let req = self
            .client
            .get(self.table_url("leads"))
            .query(&[("select", "*"), ("order", "created_at.desc")])
            .query(&[("limit", limit.to_string()), ("offset", offset.to_string())]);
        let resp = Self::check(self.with_auth(req, session).send().await?).await?;
        Ok(resp.json::<Vec<Lead>>().await?)
    }

    async fn insert_lead(&self, session: &Session, lead: &NewLead) -> Result<Lead, StoreError> {
        let req = self
            .client
            .post(self.table_url("leads"))
            .header("Prefer", "return=representation")
            .json(&[lead]);
        let resp = Self::check(self.with_auth(req, session).send().await?).await?;
        let mut rows: Vec<Lead> = resp.json().await?;
        rows.pop()
            .ok_or_else(|| StoreError::Malformed("insert returned no record".into()))
    }

    async fn fetch_lead_profile(
        &self,
        session: &Session,
        lead_id: &str,
    ) -> Result<LeadProfile, StoreError> {
        let req = self
            .client
            .get(self.table_url("leads"))
            .query(&[("select", "name,role,company")])
            .query(&[("id", format!("eq.{}", lead_id))]);
        let resp = Self::check(self.with_auth(req, session).send().await?).await?;
        let rows: Vec<LeadProfile> = resp.json().await?;
        rows.into_iter().next().ok_or(StoreError::NotFound)
    }

    async fn list_messages(
        &self,
        session: &Session,
        lead_id: &str,
    ) -> Result<Vec<Message>, StoreError> {
        debug!("Listing messages for lead {}", lead_id);
        let req = self
            .client
            .get(self.table_url("messages"))
            .query(&[("select", "*"), ("order", "created_at.desc")])
            .query(&[("lead_id", format!("eq.{}", lead_id))]);
        let resp = Self::check(self.with_auth(req, session).send().await?).await?;
        Ok(resp.json::<Vec<Message>>().await?)
    }

    async fn insert_message(
        &self,
        session: &Session,
        message: &NewMessage,
    ) -> Result<Message, StoreError> {
        let req = self
            .client
            .post(self.table_url("messages"))
            .header("Prefer", "return=representation")
            .json(&[message]);
        let resp = Self::check(self.with_auth(req, session).send().await?).await?;
        let mut rows: Vec<Message> = resp.json().await?;
        rows.pop()
            .ok_or_else(|| StoreError::Malformed("insert returned no record".into()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_non_http_base_url() {
        assert!(SupabaseStore::new("ftp://example.com", "key").is_err());
        assert!(SupabaseStore::new("not a url", "key").is_err());
    }

    #[test]
    fn trims_trailing_slash_from_base_url() {
        let store = SupabaseStore::new("https://proj.supabase.co/", "key").unwrap();
        assert_eq!(store.table_url("leads"), "https://proj.supabase.co/rest/v1/leads");
    }
}
