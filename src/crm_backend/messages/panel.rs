use std::sync::Arc;

use log::{error, info};
use serde::Serialize;
use thiserror::Error;
use tokio::sync::Mutex;

use crate::crm_backend::auth::Session;
use crate::crm_backend::llm::drafting::{render_prompt, DraftModel, SYSTEM_PROMPT};
use crate::crm_backend::store::types::{Message, NewMessage};
use crate::crm_backend::store::{DataStore, StoreError};

#[derive(Debug, Error)]
pub enum PanelError {
    #[error("Messages are still loading")]
    Busy,
    #[error("No lead selected")]
    NotOpen,
    #[error("Message content is empty")]
    EmptyContent,
    #[error("Lead not found")]
    LeadNotFound,
    #[error("Lead information is incomplete")]
    IncompleteLead,
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error("Generation failed: {0}")]
    Generation(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum PanelPhase {
    Closed,
    Loading,
    Ready,
}

#[derive(Debug, Clone, Serialize)]
pub struct PanelSnapshot {
    pub phase: PanelPhase,
    pub lead_id: Option<String>,
    pub messages: Vec<Message>,
    pub pending_draft: Option<String>,
}

struct PanelState {
    phase: PanelPhase,
    lead_id: Option<String>,
    messages: Vec<Message>,
    pending_draft: Option<String>,
    generating: bool,
    submitting: bool,
}

impl Default for PanelState {
    fn default() -> Self {
        Self {
            phase: PanelPhase::Closed,
            lead_id: None,
            messages: Vec::new(),
            pending_draft: None,
            generating: false,
            submitting: false,
        }
    }
}

/// The per-lead message panel. Owns the message list for the currently
/// open lead and the pending (uncommitted) draft; everything is discarded
/// when the panel closes or the lead changes. Generation and submission
/// each carry their own in-flight flag and may overlap, since generation
/// only fills the staging field.
pub struct MessagePanel {
    store: Arc<dyn DataStore>,
    model: Arc<dyn DraftModel>,
    state: Mutex<PanelState>,
}

impl MessagePanel {
    pub fn new(store: Arc<dyn DataStore>, model: Arc<dyn DraftModel>) -> Self {
        Self {
            store,
            model,
            state: Mutex::new(PanelState::default()),
        }
    }

    /// Opens the panel for a lead, or reloads it on a lead change. Replaces
    /// the message list wholesale; only `Closed` and `Ready` panels may
    /// start a load.
    pub async fn open(&self, session: &Session, lead_id: &str) -> Result<PanelSnapshot, PanelError> {
        {
            let mut state = self.state.lock().await;
            if state.phase == PanelPhase::Loading {
                return Err(PanelError::Busy);
            }
            state.phase = PanelPhase::Loading;
            state.lead_id = Some(lead_id.to_string());
            state.messages.clear();
            state.pending_draft = None;
        }

        let result = self.store.list_messages(session, lead_id).await;

        let mut state = self.state.lock().await;
        if state.phase != PanelPhase::Loading || state.lead_id.as_deref() != Some(lead_id) {
            // Closed while the fetch was in flight.
            return Ok(snapshot(&state));
        }
        state.phase = PanelPhase::Ready;
        match result {
            Ok(messages) => {
                state.messages = messages;
                Ok(snapshot(&state))
            }
            // The panel stays open with an empty list; the caller shows the
            // failure and may retry by reopening.
            Err(e) => Err(e.into()),
        }
    }

    pub async fn close(&self) {
        let mut state = self.state.lock().await;
        *state = PanelState::default();
    }

    /// Commits a message for the open lead and prepends it to the local
    /// list. Whitespace-only content is rejected before any request goes
    /// out; a duplicate trigger while a submission is in flight is ignored.
    pub async fn add_message(
        &self,
        session: &Session,
        content: &str,
    ) -> Result<PanelSnapshot, PanelError> {
        let trimmed = content.trim();
        let lead_id = {
            let mut state = self.state.lock().await;
            if state.submitting {
                return Ok(snapshot(&state));
            }
            if trimmed.is_empty() {
                return Err(PanelError::EmptyContent);
            }
            let Some(lead_id) = state.lead_id.clone() else {
                return Err(PanelError::NotOpen);
            };
            state.submitting = true;
            lead_id
        };

        let message = NewMessage {
            lead_id: lead_id.clone(),
            content: trimmed.to_string(),
            user_id: session.user_id.clone(),
        };
        let result = self.store.insert_message(session, &message).await;

        let mut state = self.state.lock().await;
        state.submitting = false;
        let created = result?;
        if state.lead_id.as_deref() == Some(lead_id.as_str()) {
            state.messages.insert(0, created);
            state.pending_draft = None;
        }
        Ok(snapshot(&state))
    }

    /// Asks the model for a draft and stages it as the pending content for
    /// review. Mutually exclusive with itself; a duplicate trigger returns
    /// the current pending draft unchanged. Any failure leaves the pending
    /// draft exactly as it was.
    pub async fn generate_draft(&self, session: &Session) -> Result<Option<String>, PanelError> {
        let lead_id = {
            let mut state = self.state.lock().await;
            if state.generating {
                return Ok(state.pending_draft.clone());
            }
            let Some(lead_id) = state.lead_id.clone() else {
                return Err(PanelError::NotOpen);
            };
            state.generating = true;
            lead_id
        };

        let result = self.draft_for(session, &lead_id).await;

        let mut state = self.state.lock().await;
        state.generating = false;
        let text = result?;
        if state.lead_id.as_deref() == Some(lead_id.as_str()) {
            state.pending_draft = Some(text.clone());
        }
        Ok(Some(text))
    }

    async fn draft_for(&self, session: &Session, lead_id: &str) -> Result<String, PanelError> {
        let profile = match self.store.fetch_lead_profile(session, lead_id).await {
            Ok(profile) => profile,
            Err(StoreError::NotFound) => return Err(PanelError::LeadNotFound),
            Err(e) => {
                error!("Error fetching lead {}: {}", lead_id, e);
                return Err(PanelError::LeadNotFound);
            }
        };

        let name = profile.name.as_deref().unwrap_or("").trim();
        let role = profile.role.as_deref().unwrap_or("").trim();
        let company = profile.company.as_deref().unwrap_or("").trim();
        if name.is_empty() || role.is_empty() || company.is_empty() {
            return Err(PanelError::IncompleteLead);
        }

        info!("Generating message for lead: {}, {}, {}", name, role, company);
        let prompt = render_prompt(name, role, company);
        self.model
            .complete(SYSTEM_PROMPT, &prompt)
            .await
            .map_err(PanelError::Generation)
    }

    pub async fn snapshot(&self) -> PanelSnapshot {
        snapshot(&*self.state.lock().await)
    }
}

fn snapshot(state: &PanelState) -> PanelSnapshot {
    PanelSnapshot {
        phase: state.phase,
        lead_id: state.lead_id.clone(),
        messages: state.messages.clone(),
        pending_draft: state.pending_draft.clone(),
    }
}
