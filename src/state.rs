use std::sync::Arc;
use rusqlite::Connection;

pub struct AppState {
    /// SQLite database connection (settings only)
    pub db: Arc<std::sync::Mutex<Connection>>,
}

impl AppState {
    pub fn new(conn: Connection) -> Self {
        Self {
            db: Arc::new(std::sync::Mutex::new(conn)),
        }
    }
}

// Implement Clone manually to allow state sharing in blocking tasks
impl Clone for AppState {
    fn clone(&self) -> Self {
        Self {
            db: Arc::clone(&self.db),
        }
    }
}

