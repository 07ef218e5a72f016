use std::sync::Arc;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::sync::Mutex;

use crate::crm_backend::auth::Session;
use crate::crm_backend::store::types::{Lead, LeadStatus, NewLead};
use crate::crm_backend::store::{DataStore, StoreError};

/// Fixed page sizes for the infinite-scroll feed. Not user-adjustable.
pub const INITIAL_LOAD_LIMIT: usize = 10;
pub const LOAD_MORE_LIMIT: usize = 10;

#[derive(Debug, Error)]
pub enum FeedError {
    #[error("Missing required field: {0}")]
    MissingField(&'static str),
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// What the frontend renders: the current list plus whether the scroll
/// sentinel should keep triggering `load_more`.
#[derive(Debug, Clone, Serialize)]
pub struct FeedSnapshot {
    pub leads: Vec<Lead>,
    pub has_more: bool,
}

/// User-submitted fields for a new lead.
#[derive(Debug, Clone, Deserialize)]
pub struct LeadFields {
    pub name: String,
    pub role: String,
    pub company: String,
    pub linkedin_url: Option<String>,
}

#[derive(Default)]
struct FeedState {
    leads: Vec<Lead>,
    // Offset of the next page, equal to the number of records the feed
    // accounts for (fetched pages plus optimistic prepends).
    offset: usize,
    has_more: bool,
    loading: bool,
}

/// The paginated lead feed. Owns the in-memory list for the session: pages
/// are appended in creation-descending order, newly created leads are
/// optimistically prepended. The local list is always a prefix of the
/// remote collection as of the last successful fetch, except for those
/// prepends.
pub struct LeadFeed {
    store: Arc<dyn DataStore>,
    state: Mutex<FeedState>,
}

impl LeadFeed {
    pub fn new(store: Arc<dyn DataStore>) -> Self {
        Self {
            store,
            state: Mutex::new(FeedState::default()),
        }
    }

    /// Fetches the first page and replaces whatever the feed held before.
    /// Runs once per session start; running it again is a full reload that
    /// also re-arms pagination after end-of-data.
    pub async fn load_initial(&self, session: &Session) -> Result<FeedSnapshot, StoreError> {
        let page = self.store.list_leads(session, INITIAL_LOAD_LIMIT, 0).await?;

        let mut state = self.state.lock().await;
        state.offset = page.len();
        state.has_more = page.len() == INITIAL_LOAD_LIMIT;
        state.loading = false;
        state.leads = page;
        Ok(snapshot(&state))
    }

    /// Fetches the next page from the current cursor and appends it.
    /// Duplicate triggers while a load is in flight, and any trigger after
    /// the end of the data, are no-ops.
    pub async fn load_more(&self, session: &Session) -> Result<FeedSnapshot, StoreError> {
        let offset = {
            let mut state = self.state.lock().await;
            if state.loading || !state.has_more {
                return Ok(snapshot(&state));
            }
            state.loading = true;
            state.offset
        };

        let result = self.store.list_leads(session, LOAD_MORE_LIMIT, offset).await;

        let mut state = self.state.lock().await;
        if !state.loading {
            // The feed was reset while the request was in flight; the page
            // belongs to the previous session and must not be appended.
            return Ok(snapshot(&state));
        }
        state.loading = false;

        let page = result?;
        if page.is_empty() {
            state.has_more = false;
        } else {
            state.offset += page.len();
            state.has_more = page.len() == LOAD_MORE_LIMIT;
            state.leads.extend(page);
        }
        Ok(snapshot(&state))
    }

    /// Validates the required fields, creates the lead with status `draft`,
    /// and prepends it to the local list. Failures are returned to the
    /// caller so the submission form can stay open and retry.
    pub async fn add_lead(&self, session: &Session, fields: LeadFields) -> Result<Lead, FeedError> {
        let name = fields.name.trim();
        let role = fields.role.trim();
        let company = fields.company.trim();
        if name.is_empty() {
            return Err(FeedError::MissingField("name"));
        }
        if role.is_empty() {
            return Err(FeedError::MissingField("role"));
        }
        if company.is_empty() {
            return Err(FeedError::MissingField("company"));
        }

        let new_lead = NewLead {
            name: name.to_string(),
            role: role.to_string(),
            company: company.to_string(),
            linkedin_url: fields
                .linkedin_url
                .as_deref()
                .map(str::trim)
                .filter(|u| !u.is_empty())
                .map(String::from),
            status: LeadStatus::Draft,
            user_id: session.user_id.clone(),
        };

        let lead = self.store.insert_lead(session, &new_lead).await?;

        let mut state = self.state.lock().await;
        state.leads.insert(0, lead.clone());
        state.offset += 1;
        Ok(lead)
    }

    pub async fn snapshot(&self) -> FeedSnapshot {
        snapshot(&*self.state.lock().await)
    }

    pub async fn reset(&self) {
        let mut state = self.state.lock().await;
        *state = FeedState::default();
    }

    #[cfg(test)]
    async fn cursor(&self) -> usize {
        self.state.lock().await.offset
    }
}

fn snapshot(state: &FeedState) -> FeedSnapshot {
    FeedSnapshot {
        leads: state.leads.clone(),
        has_more: state.has_more,
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
    use std::time::Duration;

    use async_trait::async_trait;
    use chrono::Utc;
    use tokio::sync::Notify;

    use super::*;
    use crate::crm_backend::store::types::{LeadProfile, Message, NewMessage};

    fn lead(n: usize) -> Lead {
        Lead {
            id: format!("lead-{}", n),
            name: format!("Lead {}", n),
            role: "CTO".to_string(),
            company: "Acme".to_string(),
            linkedin_url: None,
            status: LeadStatus::Draft,
            user_id: "user-1".to_string(),
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    fn session() -> Session {
        Session {
            access_token: "token".to_string(),
            user_id: "user-1".to_string(),
        }
    }

    #[derive(Default)]
    struct FakeStore {
        leads: Vec<Lead>,
        list_calls: AtomicUsize,
        insert_calls: AtomicUsize,
        fail_lists: AtomicBool,
        gate: Option<Arc<Notify>>,
    }

    impl FakeStore {
        fn with_leads(count: usize) -> Self {
            Self {
                leads: (0..count).map(lead).collect(),
                ..Self::default()
            }
        }
    }

    #[async_trait]
    impl DataStore for FakeStore {
        async fn list_leads(
            &self,
            _session: &Session,
            limit: usize,
            offset: usize,
        ) -> Result<Vec<Lead>, StoreError> {
            self.list_calls.fetch_add(1, Ordering::SeqCst);
            if let Some(gate) = &self.gate {
                gate.notified().await;
            }
            if self.fail_lists.load(Ordering::SeqCst) {
                return Err(StoreError::NotFound);
            }
            let end = (offset + limit).min(self.leads.len());
            if offset >= end {
                return Ok(Vec::new());
            }
            Ok(self.leads[offset..end].to_vec())
        }

        async fn insert_lead(
            &self,
            session: &Session,
            new_lead: &NewLead,
        ) -> Result<Lead, StoreError> {
            let n = self.insert_calls.fetch_add(1, Ordering::SeqCst);
            Ok(Lead {
                id: format!("created-{}", n),
                name: new_lead.name.clone(),
                role: new_lead.role.clone(),
                company: new_lead.company.clone(),
                linkedin_url: new_lead.linkedin_url.clone(),
                status: new_lead.status,
                user_id: session.user_id.clone(),
                created_at: Utc::now(),
                updated_at: Utc::now(),
            })
        }

        async fn fetch_lead_profile(
            &self,
            _session: &Session,
            _lead_id: &str,
        ) -> Result<LeadProfile, StoreError> {
            unimplemented!("not used by feed tests")
        }

        async fn list_messages(
            &self,
            _session: &Session,
            _lead_id: &str,
        ) -> Result<Vec<Message>, StoreError> {
            unimplemented!("not used by feed tests")
        }

        async fn insert_message(
            &self,
            _session: &Session,
            _message: &NewMessage,
        ) -> Result<Message, StoreError> {
            unimplemented!("not used by feed tests")
        }
    }

    fn fields(name: &str, role: &str, company: &str) -> LeadFields {
        LeadFields {
            name: name.to_string(),
            role: role.to_string(),
            company: company.to_string(),
            linkedin_url: None,
        }
    }

    #[tokio::test]
    async fn paginates_through_25_leads() {
        let store = Arc::new(FakeStore::with_leads(25));
        let feed = LeadFeed::new(store.clone());
        let session = session();

        let snap = feed.load_initial(&session).await.unwrap();
        assert_eq!(snap.leads.len(), 10);
        assert!(snap.has_more);

        let snap = feed.load_more(&session).await.unwrap();
        assert_eq!(snap.leads.len(), 20);
        assert_eq!(feed.cursor().await, 20);
        assert!(snap.has_more);

        let snap = feed.load_more(&session).await.unwrap();
        assert_eq!(snap.leads.len(), 25);
        assert_eq!(feed.cursor().await, 25);
        assert!(!snap.has_more);

        // Exhausted pagination is a permanent no-op until a full reload.
        let snap = feed.load_more(&session).await.unwrap();
        assert_eq!(snap.leads.len(), 25);
        assert_eq!(store.list_calls.load(Ordering::SeqCst), 3);

        // Pages arrive in creation-descending store order.
        let ids: Vec<&str> = snap.leads.iter().map(|l| l.id.as_str()).collect();
        assert_eq!(ids[0], "lead-0");
        assert_eq!(ids[24], "lead-24");
    }

    #[tokio::test]
    async fn short_initial_page_disables_has_more() {
        let store = Arc::new(FakeStore::with_leads(4));
        let feed = LeadFeed::new(store.clone());
        let session = session();

        let snap = feed.load_initial(&session).await.unwrap();
        assert_eq!(snap.leads.len(), 4);
        assert!(!snap.has_more);

        let snap = feed.load_more(&session).await.unwrap();
        assert_eq!(snap.leads.len(), 4);
        assert_eq!(store.list_calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn load_more_before_initial_load_is_a_noop() {
        let store = Arc::new(FakeStore::with_leads(25));
        let feed = LeadFeed::new(store.clone());

        let snap = feed.load_more(&session()).await.unwrap();
        assert!(snap.leads.is_empty());
        assert_eq!(store.list_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn add_lead_validates_before_any_request() {
        let store = Arc::new(FakeStore::with_leads(0));
        let feed = LeadFeed::new(store.clone());
        let session = session();

        for bad in [
            fields("", "CTO", "Acme"),
            fields("Ana", "   ", "Acme"),
            fields("Ana", "CTO", ""),
        ] {
            let err = feed.add_lead(&session, bad).await.unwrap_err();
            assert!(matches!(err, FeedError::MissingField(_)));
        }
        assert_eq!(store.insert_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn add_lead_prepends_and_advances_cursor() {
        let store = Arc::new(FakeStore::with_leads(25));
        let feed = LeadFeed::new(store);
        let session = session();

        feed.load_initial(&session).await.unwrap();
        assert_eq!(feed.cursor().await, 10);

        let created = feed
            .add_lead(&session, fields("Ana", "CTO", "Acme"))
            .await
            .unwrap();
        assert_eq!(created.status, LeadStatus::Draft);

        let snap = feed.snapshot().await;
        assert_eq!(snap.leads[0].id, created.id);
        assert_eq!(snap.leads.len(), 11);
        assert_eq!(feed.cursor().await, 11);
    }

    #[tokio::test]
    async fn duplicate_load_more_while_in_flight_is_ignored() {
        let gate = Arc::new(Notify::new());
        let store = Arc::new(FakeStore {
            gate: Some(gate.clone()),
            ..FakeStore::with_leads(25)
        });
        let feed = Arc::new(LeadFeed::new(store.clone()));
        let session = session();

        // First page, released immediately.
        let opened = tokio::spawn({
            let feed = feed.clone();
            let session = session.clone();
            async move { feed.load_initial(&session).await }
        });
        tokio::time::sleep(Duration::from_millis(20)).await;
        gate.notify_one();
        opened.await.unwrap().unwrap();

        // Hold the next page open and trigger again while it is in flight.
        let in_flight = tokio::spawn({
            let feed = feed.clone();
            let session = session.clone();
            async move { feed.load_more(&session).await }
        });
        tokio::time::sleep(Duration::from_millis(20)).await;

        let snap = feed.load_more(&session).await.unwrap();
        assert_eq!(snap.leads.len(), 10);

        gate.notify_one();
        let snap = in_flight.await.unwrap().unwrap();
        assert_eq!(snap.leads.len(), 20);
        assert_eq!(store.list_calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn failed_load_more_clears_the_in_flight_flag() {
        let store = Arc::new(FakeStore::with_leads(25));
        let feed = LeadFeed::new(store.clone());
        let session = session();

        feed.load_initial(&session).await.unwrap();
        store.fail_lists.store(true, Ordering::SeqCst);
        assert!(feed.load_more(&session).await.is_err());

        // The list keeps its last-good prefix and the next trigger works.
        assert_eq!(feed.snapshot().await.leads.len(), 10);
        store.fail_lists.store(false, Ordering::SeqCst);
        let snap = feed.load_more(&session).await.unwrap();
        assert_eq!(snap.leads.len(), 20);
    }
}
