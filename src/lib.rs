use std::sync::Arc;

use tauri::Manager;

mod crm_backend;

use crm_backend::auth::SessionState;
use crm_backend::leads::feed::LeadFeed;
use crm_backend::llm::drafting::ChatCompletionModel;
use crm_backend::messages::panel::MessagePanel;
use crm_backend::store::supabase::SupabaseStore;
use crm_backend::store::DataStore;

#[cfg_attr(mobile, tauri::mobile_entry_point)]
pub fn run() {
    dotenvy::dotenv().ok();

    tauri::Builder::default()
        .plugin(
            tauri_plugin_log::Builder::new()
                .level(log::LevelFilter::Info)
                .build(),
        )
        .plugin(tauri_plugin_opener::init())
        .setup(|app| {
            let store = Arc::new(SupabaseStore::from_env()?);
            let model = Arc::new(ChatCompletionModel::from_env()?);
            let data_store: Arc<dyn DataStore> = store.clone();

            app.manage(store);
            app.manage(SessionState::default());
            app.manage(LeadFeed::new(data_store.clone()));
            app.manage(MessagePanel::new(data_store, model));
            Ok(())
        })
        .invoke_handler(tauri::generate_handler![
            crm_backend::auth::commands::sign_in,
            crm_backend::auth::commands::sign_out,
            crm_backend::leads::commands::load_initial_leads,
            crm_backend::leads::commands::load_more_leads,
            crm_backend::leads::commands::add_lead,
            crm_backend::leads::commands::get_feed,
            crm_backend::messages::commands::open_message_panel,
            crm_backend::messages::commands::get_message_panel,
            crm_backend::messages::commands::close_message_panel,
            crm_backend::messages::commands::add_message,
            crm_backend::messages::commands::generate_message,
        ])
        .run(tauri::generate_context!())
        .expect("error while running tauri application");
}
