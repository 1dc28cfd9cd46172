use crate::chat::backend::ChatBackend;
use crate::chat::session::{ChatSession, ReplySink, SubmitOutcome};
use crate::error::AppResult;
use crate::models::message::ChatMessage;

pub async fn send_message<B: ChatBackend>(
    session: &ChatSession<B>,
    content: &str,
    sink: &mut impl ReplySink,
) -> AppResult<SubmitOutcome> {
    log::info!("send_message called: content_len={}", content.len());
    let outcome = session.submit(content, sink).await?;
    match &outcome {
        SubmitOutcome::Rejected(reason) => log::debug!("send_message rejected: {:?}", reason),
        SubmitOutcome::Completed(text) => {
            log::info!("send_message completed: reply_len={}", text.len())
        }
        SubmitOutcome::Failed { error, .. } => log::warn!("send_message failed: {}", error),
    }
    Ok(outcome)
}

pub fn get_messages<B: ChatBackend>(session: &ChatSession<B>) -> AppResult<Vec<ChatMessage>> {
    session.messages()
}
