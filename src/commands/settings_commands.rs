use std::collections::HashMap;

use crate::db::settings_repo;
use crate::error::{AppError, AppResult};
use crate::models::settings::Theme;
use crate::state::AppState;

pub async fn get_settings(state: &AppState) -> AppResult<HashMap<String, String>> {
    let state = state.clone();
    tokio::task::spawn_blocking(move || {
        let settings = settings_repo::get_all_settings(&state)?;
        Ok(settings.into_iter().map(|s| (s.key, s.value)).collect())
    })
    .await
    .map_err(|e| AppError::Internal(e.to_string()))?
}

pub async fn update_setting(state: &AppState, key: String, value: String) -> AppResult<()> {
    let state = state.clone();
    tokio::task::spawn_blocking(move || settings_repo::set_setting(&state, &key, &value))
        .await
        .map_err(|e| AppError::Internal(e.to_string()))?
}

pub async fn get_theme(state: &AppState) -> AppResult<Theme> {
    let state = state.clone();
    tokio::task::spawn_blocking(move || settings_repo::load_theme(&state))
        .await
        .map_err(|e| AppError::Internal(e.to_string()))?
}

/// Flip between light and dark and persist the result.
pub async fn toggle_theme(state: &AppState) -> AppResult<Theme> {
    let state = state.clone();
    tokio::task::spawn_blocking(move || {
        let theme = settings_repo::load_theme(&state)?.toggled();
        settings_repo::save_theme(&state, theme)?;
        log::info!("Theme switched to {}", theme);
        Ok(theme)
    })
    .await
    .map_err(|e| AppError::Internal(e.to_string()))?
}
