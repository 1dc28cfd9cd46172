pub mod chat_commands;
pub mod settings_commands;

/// What a line typed at the prompt asks for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Input {
    Message(String),
    ToggleTheme,
    History,
    Help,
    Quit,
    Unknown(String),
}

/// Classify a raw input line. Anything not starting with `/` is a message,
/// including blank lines (the session rejects those itself).
pub fn parse_input(line: &str) -> Input {
    let trimmed = line.trim();
    let Some(command) = trimmed.strip_prefix('/') else {
        return Input::Message(line.to_string());
    };

    match command.split_whitespace().next().unwrap_or("") {
        "theme" => Input::ToggleTheme,
        "history" => Input::History,
        "help" | "?" => Input::Help,
        "quit" | "exit" => Input::Quit,
        other => Input::Unknown(other.to_string()),
    }
}
