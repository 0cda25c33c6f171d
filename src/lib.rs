pub mod commands;
pub mod error;
pub mod gateway;
pub mod models;
pub mod scoring;

use commands::{
    db::prune_expired_records,
    records::{get_save_status, load_score, save_score},
    scoring::{calculate_score, get_score_breakdown},
    settings::{get_settings, save_settings},
};
use models::session::GatewaySession;
use std::sync::{Arc, Mutex};
use tauri::Manager;

#[cfg_attr(mobile, tauri::mobile_entry_point)]
pub fn run() {
    tauri::Builder::default()
        .setup(|app| {
            let data_dir = app.path().app_data_dir()?;
            commands::settings::load_settings_from_disk(&data_dir)?;
            log::info!("using data directory {}", data_dir.display());
            app.manage(Arc::new(Mutex::new(GatewaySession::new(data_dir))));
            Ok(())
        })
        .invoke_handler(tauri::generate_handler![
            calculate_score,
            get_score_breakdown,
            save_score,
            load_score,
            get_save_status,
            prune_expired_records,
            get_settings,
            save_settings,
        ])
        .run(tauri::generate_context!())
        .expect("error while running tauri application");
}
