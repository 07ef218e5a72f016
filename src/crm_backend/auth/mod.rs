pub mod commands;

use tauri::Manager;
use tokio::sync::RwLock;

/// The identity every store call acts on behalf of. Obtained from sign-in
/// and passed explicitly into each controller operation; nothing reads an
/// ambient current user.
#[derive(Debug, Clone)]
pub struct Session {
    pub access_token: String,
    pub user_id: String,
}

#[derive(Default)]
pub struct SessionState(pub RwLock<Option<Session>>);

pub async fn current_session<R: tauri::Runtime>(
    app_handle: &tauri::AppHandle<R>,
) -> Result<Session, String> {
    let state = app_handle.state::<SessionState>();
    let guard = state.0.read().await;
    guard.clone().ok_or_else(|| "Not signed in".to_string())
}
