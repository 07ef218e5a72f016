use log::error;
use tauri::Manager;

use super::panel::{MessagePanel, PanelSnapshot};
use crate::crm_backend::auth::current_session;

#[tauri::command]
pub async fn open_message_panel<R: tauri::Runtime>(
    app_handle: tauri::AppHandle<R>,
    lead_id: String,
) -> Result<PanelSnapshot, String> {
    let session = current_session(&app_handle).await?;
    let panel = app_handle.state::<MessagePanel>();
    panel.open(&session, &lead_id).await.map_err(|e| {
        error!("Error loading messages: {}", e);
        e.to_string()
    })
}

#[tauri::command]
pub async fn get_message_panel<R: tauri::Runtime>(
    app_handle: tauri::AppHandle<R>,
) -> Result<PanelSnapshot, String> {
    let panel = app_handle.state::<MessagePanel>();
    Ok(panel.snapshot().await)
}

#[tauri::command]
pub async fn close_message_panel<R: tauri::Runtime>(
    app_handle: tauri::AppHandle<R>,
) -> Result<(), String> {
    let panel = app_handle.state::<MessagePanel>();
    panel.close().await;
    Ok(())
}

#[tauri::command]
pub async fn add_message<R: tauri::Runtime>(
    app_handle: tauri::AppHandle<R>,
    content: String,
) -> Result<PanelSnapshot, String> {
    let session = current_session(&app_handle).await?;
    let panel = app_handle.state::<MessagePanel>();
    panel.add_message(&session, &content).await.map_err(|e| {
        error!("Error adding message: {}", e);
        e.to_string()
    })
}

/// Stages a model-drafted message for review; the draft is only ever
/// replaced by regenerating or cleared by submitting, never edited by hand.
#[tauri::command]
pub async fn generate_message<R: tauri::Runtime>(
    app_handle: tauri::AppHandle<R>,
) -> Result<Option<String>, String> {
    let session = current_session(&app_handle).await?;
    let panel = app_handle.state::<MessagePanel>();
    panel.generate_draft(&session).await.map_err(|e| {
        error!("Error generating message: {}", e);
        e.to_string()
    })
}
