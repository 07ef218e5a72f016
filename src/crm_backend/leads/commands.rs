use log::error;
use tauri::Manager;

use super::feed::{FeedSnapshot, LeadFeed, LeadFields};
use crate::crm_backend::auth::current_session;
use crate::crm_backend::store::types::Lead;

#[tauri::command]
pub async fn load_initial_leads<R: tauri::Runtime>(
    app_handle: tauri::AppHandle<R>,
) -> Result<FeedSnapshot, String> {
    let session = current_session(&app_handle).await?;
    let feed = app_handle.state::<LeadFeed>();
    feed.load_initial(&session).await.map_err(|e| {
        error!("Error loading leads: {}", e);
        e.to_string()
    })
}

#[tauri::command]
pub async fn load_more_leads<R: tauri::Runtime>(
    app_handle: tauri::AppHandle<R>,
) -> Result<FeedSnapshot, String> {
    let session = current_session(&app_handle).await?;
    let feed = app_handle.state::<LeadFeed>();
    feed.load_more(&session).await.map_err(|e| {
        error!("Error loading more leads: {}", e);
        e.to_string()
    })
}

/// Current feed state without touching the store; used by the frontend to
/// re-render after a webview reload.
#[tauri::command]
pub async fn get_feed<R: tauri::Runtime>(
    app_handle: tauri::AppHandle<R>,
) -> Result<FeedSnapshot, String> {
    let feed = app_handle.state::<LeadFeed>();
    Ok(feed.snapshot().await)
}

/// Unlike the read paths, failures here propagate to the frontend so the
/// submission form can stay open and the user can retry.
#[tauri::command]
pub async fn add_lead<R: tauri::Runtime>(
    app_handle: tauri::AppHandle<R>,
    fields: LeadFields,
) -> Result<Lead, String> {
    let session = current_session(&app_handle).await?;
    let feed = app_handle.state::<LeadFeed>();
    feed.add_lead(&session, fields).await.map_err(|e| {
        error!("Error adding lead: {}", e);
        e.to_string()
    })
}
