use std::path::PathBuf;

use clap::Parser;

use crate::chat::backend::DEFAULT_ENDPOINT;
use crate::chat::conversation::{ConversationLog, DEFAULT_GREETING};
use crate::chat::decoder::LineFraming;
use crate::db::migrations;

pub const DEFAULT_API_BASE: &str = "http://127.0.0.1:8787";

#[derive(Debug, Clone, Parser)]
#[command(
    name = "workers-chat",
    version,
    about = "Chat with a streaming LLM endpoint from the terminal"
)]
pub struct Config {
    /// Base URL of the chat backend
    #[arg(long, env = "WORKERS_CHAT_API_BASE", default_value = DEFAULT_API_BASE)]
    pub api_base: String,

    /// Path of the chat endpoint on the backend
    #[arg(long, env = "WORKERS_CHAT_ENDPOINT", default_value = DEFAULT_ENDPOINT)]
    pub endpoint: String,

    /// Split every response chunk on its own instead of buffering partial
    /// lines (a line cut by a chunk boundary is then dropped)
    #[arg(long)]
    pub per_chunk: bool,

    /// Start with an empty conversation instead of the assistant greeting
    #[arg(long)]
    pub no_greeting: bool,

    /// Settings database location
    #[arg(long, env = "WORKERS_CHAT_DB")]
    pub db_path: Option<PathBuf>,
}

impl Config {
    pub fn framing(&self) -> LineFraming {
        if self.per_chunk {
            LineFraming::PerChunk
        } else {
            LineFraming::Buffered
        }
    }

    pub fn db_path(&self) -> PathBuf {
        self.db_path.clone().unwrap_or_else(migrations::get_db_path)
    }

    pub fn conversation(&self) -> ConversationLog {
        if self.no_greeting {
            ConversationLog::new()
        } else {
            ConversationLog::with_greeting(DEFAULT_GREETING)
        }
    }
}
