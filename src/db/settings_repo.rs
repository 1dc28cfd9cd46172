use rusqlite::params;

use crate::error::{AppError, AppResult};
use crate::models::settings::{AppSettings, Theme, THEME_KEY};
use crate::state::AppState;

fn row_to_setting(row: &rusqlite::Row) -> rusqlite::Result<AppSettings> {
    Ok(AppSettings {
        key: row.get(0)?,
        value: row.get(1)?,
        updated_at: row.get(2)?,
    })
}

pub fn get_setting(state: &AppState, key: &str) -> AppResult<Option<AppSettings>> {
    let db = state.db.lock().map_err(|e| AppError::Database(e.to_string()))?;
    match db.query_row(
        "SELECT key, value, updated_at FROM settings WHERE key = ?1",
        params![key],
        row_to_setting,
    ) {
        Ok(s) => Ok(Some(s)),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(AppError::Database(e.to_string())),
    }
}

pub fn set_setting(state: &AppState, key: &str, value: &str) -> AppResult<()> {
    let db = state.db.lock().map_err(|e| AppError::Database(e.to_string()))?;
    db.execute(
        "INSERT OR REPLACE INTO settings (key, value, updated_at) VALUES (?1, ?2, datetime('now'))",
        params![key, value],
    )
    .map_err(|e| AppError::Database(e.to_string()))?;
    Ok(())
}

pub fn get_all_settings(state: &AppState) -> AppResult<Vec<AppSettings>> {
    let db = state.db.lock().map_err(|e| AppError::Database(e.to_string()))?;
    let mut stmt = db
        .prepare("SELECT key, value, updated_at FROM settings ORDER BY key")
        .map_err(|e| AppError::Database(e.to_string()))?;

    let settings = stmt
        .query_map([], row_to_setting)
        .map_err(|e| AppError::Database(e.to_string()))?
        .collect::<Result<Vec<_>, _>>()
        .map_err(|e| AppError::Database(e.to_string()))?;

    Ok(settings)
}

/// Stored theme, falling back to the default when unset or unreadable.
pub fn load_theme(state: &AppState) -> AppResult<Theme> {
    let theme = match get_setting(state, THEME_KEY)? {
        Some(setting) => setting.value.parse().unwrap_or_else(|e| {
            log::warn!("Ignoring stored theme: {}", e);
            Theme::default()
        }),
        None => Theme::default(),
    };
    Ok(theme)
}

pub fn save_theme(state: &AppState, theme: Theme) -> AppResult<()> {
    set_setting(state, THEME_KEY, &theme.to_string())
}
