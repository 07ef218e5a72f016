use std::sync::Arc;

use log::{error, info};
use serde::Serialize;
use tauri::Manager;

use super::SessionState;
use crate::crm_backend::leads::feed::LeadFeed;
use crate::crm_backend::messages::panel::MessagePanel;
use crate::crm_backend::store::supabase::SupabaseStore;

/// What the frontend gets back from a sign-in. The access token stays on
/// this side of the boundary.
#[derive(Debug, Serialize)]
pub struct SignedIn {
    pub user_id: String,
}

#[tauri::command]
pub async fn sign_in<R: tauri::Runtime>(
    app_handle: tauri::AppHandle<R>,
    email: String,
    password: String,
) -> Result<SignedIn, String> {
    let store = app_handle.state::<Arc<SupabaseStore>>();
    let session = store.sign_in(&email, &password).await.map_err(|e| {
        error!("Sign-in failed: {}", e);
        e.to_string()
    })?;
    info!("Signed in as {}", session.user_id);

    let user_id = session.user_id.clone();
    let state = app_handle.state::<SessionState>();
    *state.0.write().await = Some(session);
    Ok(SignedIn { user_id })
}

#[tauri::command]
pub async fn sign_out<R: tauri::Runtime>(app_handle: tauri::AppHandle<R>) -> Result<(), String> {
    let state = app_handle.state::<SessionState>();
    *state.0.write().await = None;

    // The next session starts from a clean slate.
    app_handle.state::<LeadFeed>().reset().await;
    app_handle.state::<MessagePanel>().close().await;
    Ok(())
}
