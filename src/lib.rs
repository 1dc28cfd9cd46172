pub mod chat;
pub mod commands;
pub mod config;
pub mod db;
pub mod error;
pub mod models;
pub mod render;
pub mod state;

use std::io::Write;

use tokio::io::{AsyncBufReadExt, BufReader};

use chat::backend::HttpBackend;
use chat::session::ChatSession;
use commands::{chat_commands, settings_commands, Input};
use config::Config;
use render::{Palette, ReplyRenderer};
use state::AppState;

const HELP: &str = "Type a message and press Enter. Commands: /theme, /history, /help, /quit";

fn init_logging() {
    let level = if cfg!(debug_assertions) { "debug" } else { "info" };
    let _ = env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level))
        .format_timestamp_millis()
        .try_init();
}

pub async fn run(config: Config) -> anyhow::Result<()> {
    init_logging();
    log::info!("Starting workers-chat against {}{}", config.api_base, config.endpoint);

    let conn = db::migrations::init_db(&config.db_path())?;
    let state = AppState::new(conn);

    let backend = HttpBackend::new(&config.api_base, &config.endpoint)?;
    let session = ChatSession::new(backend, config.conversation(), config.framing());

    let mut palette = Palette::for_theme(settings_commands::get_theme(&state).await?);
    let mut stdout = std::io::stdout();

    for message in chat_commands::get_messages(&session)? {
        render::print_message(&mut stdout, &palette, &message);
    }
    render::print_notice(&mut stdout, &palette, HELP);

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        write!(stdout, "> ")?;
        stdout.flush()?;

        let Some(line) = lines.next_line().await? else {
            break;
        };

        match commands::parse_input(&line) {
            Input::Message(text) => {
                if text.trim().is_empty() {
                    continue;
                }
                let mut renderer = ReplyRenderer::start(std::io::stdout(), palette);
                chat_commands::send_message(&session, &text, &mut renderer).await?;
                renderer.finish();
            }
            Input::ToggleTheme => {
                let theme = settings_commands::toggle_theme(&state).await?;
                palette = Palette::for_theme(theme);
                render::print_notice(&mut stdout, &palette, &format!("Theme: {theme}"));
            }
            Input::History => {
                for message in chat_commands::get_messages(&session)? {
                    render::print_message(&mut stdout, &palette, &message);
                }
            }
            Input::Help => render::print_notice(&mut stdout, &palette, HELP),
            Input::Quit => break,
            Input::Unknown(command) => render::print_notice(
                &mut stdout,
                &palette,
                &format!("Unknown command: /{command}. {HELP}"),
            ),
        }
    }

    log::info!("Exiting");
    Ok(())
}
