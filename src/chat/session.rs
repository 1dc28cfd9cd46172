use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, MutexGuard};

use crate::chat::accumulator::accumulate;
use crate::chat::backend::ChatBackend;
use crate::chat::conversation::ConversationLog;
use crate::chat::decoder::LineFraming;
use crate::error::{AppError, AppResult};
use crate::models::message::ChatMessage;

pub const FALLBACK_REPLY: &str = "Sorry, there was an error processing your request.";

/// Receives the assistant reply as it grows.
pub trait ReplySink {
    /// Called with the full accumulated text after every fragment.
    fn update(&mut self, text: &str);

    /// Called once with the fallback text when the request fails.
    fn fallback(&mut self, text: &str) {
        self.update(text);
    }
}

impl<F: FnMut(&str)> ReplySink for F {
    fn update(&mut self, text: &str) {
        self(text)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RejectReason {
    /// Input was empty or whitespace only.
    Empty,
    /// Another request is still in flight.
    Busy,
}

#[derive(Debug)]
pub enum SubmitOutcome {
    /// Nothing was appended and nothing was sent.
    Rejected(RejectReason),
    /// The reply streamed to completion and was appended to the log.
    Completed(String),
    /// The request failed; the fallback reply was appended instead.
    Failed { fallback: String, error: AppError },
}

/// Clears the in-flight flag on every exit path.
struct InFlight<'a>(&'a AtomicBool);

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

/// One conversation with one backend. At most one request is in flight at a
/// time; submissions made meanwhile are rejected, not queued.
pub struct ChatSession<B> {
    backend: B,
    log: Mutex<ConversationLog>,
    processing: AtomicBool,
    framing: LineFraming,
}

impl<B: ChatBackend> ChatSession<B> {
    pub fn new(backend: B, log: ConversationLog, framing: LineFraming) -> Self {
        Self {
            backend,
            log: Mutex::new(log),
            processing: AtomicBool::new(false),
            framing,
        }
    }

    pub fn is_processing(&self) -> bool {
        self.processing.load(Ordering::Acquire)
    }

    pub fn messages(&self) -> AppResult<Vec<ChatMessage>> {
        Ok(self.lock_log()?.snapshot())
    }

    pub fn log_len(&self) -> AppResult<usize> {
        Ok(self.lock_log()?.len())
    }

    /// Submit user input and stream the reply into `sink`.
    ///
    /// Rejections and backend failures are reported through the outcome; an
    /// `Err` means the session state itself is unusable.
    pub async fn submit(
        &self,
        input: &str,
        sink: &mut impl ReplySink,
    ) -> AppResult<SubmitOutcome> {
        let message = input.trim();
        if message.is_empty() {
            log::debug!("Ignoring empty submission");
            return Ok(SubmitOutcome::Rejected(RejectReason::Empty));
        }

        let _in_flight = match self.begin() {
            Some(guard) => guard,
            None => {
                log::debug!("Ignoring submission while a request is in flight");
                return Ok(SubmitOutcome::Rejected(RejectReason::Busy));
            }
        };

        let snapshot = {
            let mut log = self.lock_log()?;
            log.append(ChatMessage::user(message));
            log.snapshot()
        };

        let result = match self.backend.send(&snapshot).await {
            Ok(stream) => accumulate(stream, self.framing, |text: &str| sink.update(text)).await,
            Err(e) => Err(e),
        };

        match result {
            Ok(text) => {
                log::info!("Assistant reply complete ({} bytes)", text.len());
                self.lock_log()?.append(ChatMessage::assistant(text.clone()));
                Ok(SubmitOutcome::Completed(text))
            }
            Err(error) => {
                log::error!("Chat request failed: {}", error);
                sink.fallback(FALLBACK_REPLY);
                self.lock_log()?
                    .append(ChatMessage::assistant(FALLBACK_REPLY));
                Ok(SubmitOutcome::Failed {
                    fallback: FALLBACK_REPLY.to_string(),
                    error,
                })
            }
        }
    }

    fn begin(&self) -> Option<InFlight<'_>> {
        self.processing
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| InFlight(&self.processing))
    }

    fn lock_log(&self) -> AppResult<MutexGuard<'_, ConversationLog>> {
        self.log.lock().map_err(|e| AppError::Internal(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use std::collections::VecDeque;
    use std::sync::atomic::AtomicUsize;
    use std::sync::Arc;

    use async_trait::async_trait;
    use bytes::Bytes;
    use tokio::sync::Notify;

    use super::*;
    use crate::chat::accumulator::ByteStream;
    use crate::chat::conversation::DEFAULT_GREETING;
    use crate::models::message::Role;

    enum Reply {
        Chunks(Vec<&'static str>),
        Status(u16),
        BrokenStream(&'static str),
    }

    struct ScriptedBackend {
        replies: Mutex<VecDeque<Reply>>,
        requests: Mutex<Vec<Vec<ChatMessage>>>,
        calls: AtomicUsize,
        gate: Option<Arc<Notify>>,
    }

    impl ScriptedBackend {
        fn new(replies: Vec<Reply>) -> Self {
            Self {
                replies: Mutex::new(replies.into()),
                requests: Mutex::new(Vec::new()),
                calls: AtomicUsize::new(0),
                gate: None,
            }
        }

        fn gated(replies: Vec<Reply>, gate: Arc<Notify>) -> Self {
            Self {
                gate: Some(gate),
                ..Self::new(replies)
            }
        }
    }

    #[async_trait]
    impl ChatBackend for ScriptedBackend {
        async fn send(&self, messages: &[ChatMessage]) -> AppResult<ByteStream> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.requests.lock().unwrap().push(messages.to_vec());
            if let Some(gate) = &self.gate {
                gate.notified().await;
            }
            let reply = self
                .replies
                .lock()
                .unwrap()
                .pop_front()
                .expect("unexpected request");
            match reply {
                Reply::Chunks(parts) => Ok(Box::pin(futures::stream::iter(
                    parts
                        .into_iter()
                        .map(|p| Ok(Bytes::from_static(p.as_bytes())))
                        .collect::<Vec<_>>(),
                ))),
                Reply::Status(status) => Err(AppError::Status {
                    status,
                    body: String::new(),
                }),
                Reply::BrokenStream(first) => Ok(Box::pin(futures::stream::iter(vec![
                    Ok(Bytes::from_static(first.as_bytes())),
                    Err(AppError::Transport("connection reset".into())),
                ]))),
            }
        }
    }

    fn hello_reply() -> Reply {
        Reply::Chunks(vec![
            "data: {\"response\":\"Hel\"}\n",
            "data: {\"response\":\"lo\"}\n",
        ])
    }

    fn session(backend: ScriptedBackend) -> ChatSession<ScriptedBackend> {
        ChatSession::new(
            backend,
            ConversationLog::with_greeting(DEFAULT_GREETING),
            LineFraming::Buffered,
        )
    }

    #[tokio::test]
    async fn test_submit_appends_user_then_assistant() {
        let session = session(ScriptedBackend::new(vec![hello_reply()]));
        let mut seen = Vec::new();

        let outcome = session
            .submit("  hi there \n", &mut |s: &str| seen.push(s.to_string()))
            .await
            .unwrap();

        assert!(matches!(outcome, SubmitOutcome::Completed(ref t) if t == "Hello"));
        assert_eq!(seen, vec!["Hel", "Hello"]);

        let messages = session.messages().unwrap();
        assert_eq!(messages.len(), 3);
        assert_eq!(messages[1], ChatMessage::user("hi there"));
        assert_eq!(messages[2], ChatMessage::assistant("Hello"));
        assert!(!session.is_processing());
    }

    #[tokio::test]
    async fn test_request_carries_full_log_including_new_user_turn() {
        let session = session(ScriptedBackend::new(vec![hello_reply()]));
        session.submit("question", &mut |_: &str| {}).await.unwrap();

        let requests = session.backend.requests.lock().unwrap();
        assert_eq!(requests.len(), 1);
        assert_eq!(
            requests[0],
            vec![
                ChatMessage::assistant(DEFAULT_GREETING),
                ChatMessage::user("question"),
            ]
        );
    }

    #[tokio::test]
    async fn test_whitespace_input_is_rejected() {
        let session = session(ScriptedBackend::new(vec![]));
        for input in ["", "   ", "\n\t"] {
            let outcome = session.submit(input, &mut |_: &str| {}).await.unwrap();
            assert!(matches!(outcome, SubmitOutcome::Rejected(RejectReason::Empty)));
        }
        assert_eq!(session.log_len().unwrap(), 1);
        assert_eq!(session.backend.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_submit_while_in_flight_is_rejected() {
        let gate = Arc::new(Notify::new());
        let session = Arc::new(session(ScriptedBackend::gated(
            vec![hello_reply()],
            gate.clone(),
        )));

        let first = {
            let session = session.clone();
            tokio::spawn(async move { session.submit("first", &mut |_: &str| {}).await })
        };
        while !session.is_processing() {
            tokio::task::yield_now().await;
        }

        let outcome = session.submit("second", &mut |_: &str| {}).await.unwrap();
        assert!(matches!(outcome, SubmitOutcome::Rejected(RejectReason::Busy)));
        assert_eq!(session.log_len().unwrap(), 2);
        assert_eq!(session.backend.calls.load(Ordering::SeqCst), 1);

        gate.notify_one();
        let outcome = first.await.unwrap().unwrap();
        assert!(matches!(outcome, SubmitOutcome::Completed(_)));
        assert_eq!(session.log_len().unwrap(), 3);
        assert!(!session.is_processing());
    }

    #[tokio::test]
    async fn test_status_failure_appends_single_fallback_and_resets() {
        let session = session(ScriptedBackend::new(vec![Reply::Status(500), hello_reply()]));
        let mut seen = Vec::new();

        let outcome = session
            .submit("hi", &mut |s: &str| seen.push(s.to_string()))
            .await
            .unwrap();
        assert!(matches!(
            outcome,
            SubmitOutcome::Failed { error: AppError::Status { status: 500, .. }, .. }
        ));
        assert_eq!(seen, vec![FALLBACK_REPLY]);

        let messages = session.messages().unwrap();
        assert_eq!(messages.len(), 3);
        assert_eq!(messages[2], ChatMessage::assistant(FALLBACK_REPLY));
        assert_eq!(
            messages.iter().filter(|m| m.content() == FALLBACK_REPLY).count(),
            1
        );
        assert!(!session.is_processing());

        // The next cycle behaves like the first one.
        let outcome = session.submit("again", &mut |_: &str| {}).await.unwrap();
        assert!(matches!(outcome, SubmitOutcome::Completed(ref t) if t == "Hello"));
        let messages = session.messages().unwrap();
        assert_eq!(messages.len(), 5);
        assert_eq!(messages[3].role(), Role::User);
        assert_eq!(messages[4], ChatMessage::assistant("Hello"));
    }

    #[tokio::test]
    async fn test_mid_stream_error_does_not_commit_partial_reply() {
        let session = session(ScriptedBackend::new(vec![Reply::BrokenStream(
            "data: {\"response\":\"partial\"}\n",
        )]));

        struct Recorder<'a> {
            updates: &'a mut Vec<String>,
            fallbacks: &'a mut Vec<String>,
        }
        impl ReplySink for Recorder<'_> {
            fn update(&mut self, text: &str) {
                self.updates.push(text.to_string());
            }
            fn fallback(&mut self, text: &str) {
                self.fallbacks.push(text.to_string());
            }
        }

        let mut updates = Vec::new();
        let mut fallbacks = Vec::new();
        let mut recorder = Recorder {
            updates: &mut updates,
            fallbacks: &mut fallbacks,
        };
        let outcome = session.submit("hi", &mut recorder).await.unwrap();

        assert!(matches!(outcome, SubmitOutcome::Failed { .. }));
        assert_eq!(updates, vec!["partial"]);
        assert_eq!(fallbacks, vec![FALLBACK_REPLY]);
        let messages = session.messages().unwrap();
        assert_eq!(messages.last(), Some(&ChatMessage::assistant(FALLBACK_REPLY)));
        assert!(!messages.iter().any(|m| m.content() == "partial"));
    }

    #[tokio::test]
    async fn test_reply_without_fragments_commits_empty_turn() {
        let session = session(ScriptedBackend::new(vec![Reply::Chunks(vec![": ping\n\n"])]));
        let outcome = session.submit("hi", &mut |_: &str| {}).await.unwrap();
        assert!(matches!(outcome, SubmitOutcome::Completed(ref t) if t.is_empty()));
        assert_eq!(
            session.messages().unwrap().last(),
            Some(&ChatMessage::assistant(""))
        );
    }
}
