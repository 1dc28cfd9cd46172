use clap::Parser;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    chat_lib::run(chat_lib::config::Config::parse()).await
}
