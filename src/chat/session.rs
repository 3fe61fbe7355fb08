//! Core chat session management.
//!
//! This module provides the `ChatSession` struct which owns the transcript and the
//! turn-taking guard. At most one turn is open at a time: a submit that arrives while a
//! turn is in flight is dropped, not queued.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Instant;

use serde_json::Value;

use crate::chat::config::ChatConfig;
use crate::client::{GatewayClient, Transport};
use crate::error::Result;
use crate::observability::{
    CHAT_DROPPED_SUBMITS, CHAT_TURN_DURATION, CHAT_TURN_ERRORS, CHAT_TURNS,
};
use crate::render::Renderer;
use crate::types::Message;

/// Shown in place of a reply whenever a turn fails, whatever the cause.
pub const APOLOGY: &str = "Sorry, I am unable to respond right now.";

/// Whether a turn is currently open.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TurnState {
    /// Input and send are enabled; no turn is pending.
    Idle,
    /// A message is in flight; input and send are disabled.
    Sending,
}

/// Why a submit did not open a turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IgnoreReason {
    /// The text was empty after trimming.
    Empty,
    /// Another turn was already open.
    Busy,
}

/// The result of a submit.
#[derive(Debug, Clone, PartialEq)]
pub enum SubmitOutcome {
    /// Nothing was appended and nothing was sent.
    Ignored(IgnoreReason),
    /// The bot replied; the reply is the last transcript entry.
    Replied(Message),
    /// The turn failed; the apology is the last transcript entry.
    Failed(Message),
}

impl SubmitOutcome {
    /// Returns true if the submit was dropped.
    pub fn is_ignored(&self) -> bool {
        matches!(self, SubmitOutcome::Ignored(_))
    }

    /// The bot message that resolved the turn, if a turn ran.
    pub fn message(&self) -> Option<&Message> {
        match self {
            SubmitOutcome::Ignored(_) => None,
            SubmitOutcome::Replied(message) | SubmitOutcome::Failed(message) => Some(message),
        }
    }
}

/// Keys the input box reacts to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Key {
    /// The send key; with the line-break modifier it inserts a newline instead.
    Enter,
    /// A printable character.
    Char(char),
    /// Delete the last character.
    Backspace,
}

/// User interaction with the input affordances.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputEvent {
    /// A key press; `shift` is the line-break modifier.
    Key {
        /// The key pressed.
        key: Key,
        /// Whether the line-break modifier was held.
        shift: bool,
    },
    /// The send button was activated.
    SendClicked,
}

/// Aggregated stats for a chat session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionStats {
    /// The number of transcript entries.
    pub message_count: usize,
    /// Turns that ended with a reply.
    pub turns_completed: u64,
    /// Turns that ended with the apology.
    pub turns_failed: u64,
    /// Submits dropped because a turn was already open.
    pub submits_dropped: u64,
    /// The current turn state.
    pub state: TurnState,
}

/// Holds the turn open; dropping it returns the session to Idle.
///
/// The guard lives on the turn's stack frame, so the session is released on every exit
/// path, including when the turn's future is dropped mid-flight.
struct TurnGuard<'a> {
    open: &'a AtomicBool,
}

impl<'a> TurnGuard<'a> {
    fn acquire(open: &'a AtomicBool) -> Option<Self> {
        open.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| Self { open })
    }
}

impl Drop for TurnGuard<'_> {
    fn drop(&mut self) {
        self.open.store(false, Ordering::Release);
    }
}

/// A single conversation with the gateway.
///
/// All operations take `&self`; wrap the session in an `Arc` to drive it from several
/// tasks. The transcript is append-only and never pruned.
pub struct ChatSession<T: Transport = GatewayClient> {
    transport: T,
    config: ChatConfig,
    transcript: Mutex<Vec<Message>>,
    input: Mutex<String>,
    turn_open: AtomicBool,
    turns_completed: AtomicU64,
    turns_failed: AtomicU64,
    submits_dropped: AtomicU64,
}

impl ChatSession<GatewayClient> {
    /// Creates a session that talks to the gateway named in `config`.
    pub fn connect(config: ChatConfig) -> Result<Self> {
        let client = GatewayClient::with_options(config.gateway_url.clone(), Some(config.timeout))?;
        Ok(Self::new(client, config))
    }
}

impl<T: Transport> ChatSession<T> {
    /// Creates a new session over `transport`.
    ///
    /// If the configuration has a greeting it becomes the first transcript entry.
    pub fn new(transport: T, config: ChatConfig) -> Self {
        let transcript = config
            .greeting
            .as_ref()
            .map(|greeting| vec![Message::bot(greeting.clone())])
            .unwrap_or_default();
        Self {
            transport,
            config,
            transcript: Mutex::new(transcript),
            input: Mutex::new(String::new()),
            turn_open: AtomicBool::new(false),
            turns_completed: AtomicU64::new(0),
            turns_failed: AtomicU64::new(0),
            submits_dropped: AtomicU64::new(0),
        }
    }

    /// Submits `text` as the next turn.
    ///
    /// Whitespace-only text and submits made while a turn is open are ignored without
    /// touching the transcript. Otherwise the user's message is appended immediately,
    /// exactly one request is sent, and the turn resolves with either the reply or the
    /// apology. Failures never escape this method.
    pub async fn submit(&self, text: &str, renderer: &mut dyn Renderer) -> SubmitOutcome {
        let text = text.trim();
        let guard = match self.begin_turn(text) {
            Ok(guard) => guard,
            Err(reason) => return SubmitOutcome::Ignored(reason),
        };
        self.run_turn(guard, text, renderer).await
    }

    /// Submits the contents of the input box.
    ///
    /// The box is cleared only when a turn actually opens.
    pub async fn submit_input(&self, renderer: &mut dyn Renderer) -> SubmitOutcome {
        let (guard, text) = {
            let mut input = lock(&self.input);
            let text = input.trim().to_string();
            match self.begin_turn(&text) {
                Ok(guard) => {
                    input.clear();
                    (guard, text)
                }
                Err(reason) => return SubmitOutcome::Ignored(reason),
            }
        };
        self.run_turn(guard, &text, renderer).await
    }

    /// Applies one interaction with the input affordances.
    ///
    /// The send key without the line-break modifier and the send button both submit
    /// the input box; the returned outcome is `None` for plain edits.
    pub async fn handle_event(
        &self,
        event: InputEvent,
        renderer: &mut dyn Renderer,
    ) -> Option<SubmitOutcome> {
        match event {
            InputEvent::SendClicked
            | InputEvent::Key {
                key: Key::Enter,
                shift: false,
            } => Some(self.submit_input(renderer).await),
            InputEvent::Key { key, .. } => {
                self.edit_input(key);
                None
            }
        }
    }

    fn edit_input(&self, key: Key) {
        if !self.is_input_enabled() {
            return;
        }
        let mut input = lock(&self.input);
        match key {
            Key::Enter => input.push('\n'),
            Key::Char(c) => input.push(c),
            Key::Backspace => {
                input.pop();
            }
        }
    }

    fn begin_turn(&self, text: &str) -> std::result::Result<TurnGuard<'_>, IgnoreReason> {
        if text.is_empty() {
            return Err(IgnoreReason::Empty);
        }
        match TurnGuard::acquire(&self.turn_open) {
            Some(guard) => Ok(guard),
            None => {
                self.submits_dropped.fetch_add(1, Ordering::Relaxed);
                CHAT_DROPPED_SUBMITS.click();
                tracing::debug!("turn already open; dropping submit");
                Err(IgnoreReason::Busy)
            }
        }
    }

    async fn run_turn(
        &self,
        _guard: TurnGuard<'_>,
        text: &str,
        renderer: &mut dyn Renderer,
    ) -> SubmitOutcome {
        let start = Instant::now();
        CHAT_TURNS.click();
        self.append(Message::user(text), renderer);
        renderer.set_loading(true);

        let outcome = match self.transport.send_message(text).await {
            Ok(data) => {
                let reply = Message::bot(reply_text(&data));
                self.turns_completed.fetch_add(1, Ordering::Relaxed);
                self.append(reply.clone(), renderer);
                SubmitOutcome::Replied(reply)
            }
            Err(err) => {
                CHAT_TURN_ERRORS.click();
                tracing::warn!(error = %err, "turn failed");
                let notice = Message::bot_error(APOLOGY);
                self.turns_failed.fetch_add(1, Ordering::Relaxed);
                self.append(notice.clone(), renderer);
                SubmitOutcome::Failed(notice)
            }
        };

        CHAT_TURN_DURATION.add(start.elapsed().as_secs_f64());
        renderer.set_loading(false);
        outcome
    }

    fn append(&self, message: Message, renderer: &mut dyn Renderer) {
        renderer.render_message(&message);
        lock(&self.transcript).push(message);
    }

    /// The current turn state.
    pub fn state(&self) -> TurnState {
        if self.turn_open.load(Ordering::Acquire) {
            TurnState::Sending
        } else {
            TurnState::Idle
        }
    }

    /// True while no turn is open.
    pub fn is_input_enabled(&self) -> bool {
        self.state() == TurnState::Idle
    }

    /// The contents of the input box.
    pub fn input(&self) -> String {
        lock(&self.input).clone()
    }

    /// Replaces the contents of the input box; ignored while a turn is open.
    pub fn set_input(&self, text: impl Into<String>) {
        if self.is_input_enabled() {
            *lock(&self.input) = text.into();
        }
    }

    /// A snapshot of the transcript in display order.
    pub fn transcript(&self) -> Vec<Message> {
        lock(&self.transcript).clone()
    }

    /// Returns the number of messages in the transcript.
    pub fn message_count(&self) -> usize {
        lock(&self.transcript).len()
    }

    /// The session's configuration.
    pub fn config(&self) -> &ChatConfig {
        &self.config
    }

    /// Returns the current session statistics snapshot.
    pub fn stats(&self) -> SessionStats {
        SessionStats {
            message_count: self.message_count(),
            turns_completed: self.turns_completed.load(Ordering::Relaxed),
            turns_failed: self.turns_failed.load(Ordering::Relaxed),
            submits_dropped: self.submits_dropped.load(Ordering::Relaxed),
            state: self.state(),
        }
    }

    /// Reports the session statistics through `renderer`.
    pub fn print_stats(&self, renderer: &mut dyn Renderer) {
        let stats = self.stats();
        let url = self.config.gateway_url.as_deref().unwrap_or("(default)");
        renderer.print_info("    Session Statistics:");
        renderer.print_info(&format!("      Gateway: {}", url));
        renderer.print_info(&format!("      Messages: {}", stats.message_count));
        renderer.print_info(&format!("      Replies: {}", stats.turns_completed));
        renderer.print_info(&format!("      Failed turns: {}", stats.turns_failed));
        renderer.print_info(&format!("      Dropped submits: {}", stats.submits_dropped));
    }
}

/// Text to show for a successful backend payload.
///
/// Backends are expected to answer `{"reply": "..."}`, but the gateway passes payloads
/// through unchecked. A bare JSON string is shown as is; a missing or null `reply`
/// shows as an empty message.
fn reply_text(data: &Value) -> String {
    match data {
        Value::String(text) => text.clone(),
        Value::Object(fields) => match fields.get("reply") {
            Some(Value::String(text)) => text.clone(),
            Some(Value::Null) | None => {
                tracing::warn!("backend payload has no reply field");
                String::new()
            }
            Some(other) => other.to_string(),
        },
        _ => {
            tracing::warn!("backend payload is not an object");
            String::new()
        }
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::sync::atomic::AtomicUsize;

    use serde_json::json;
    use tokio::sync::Semaphore;

    use super::*;
    use crate::error::Error;
    use crate::types::Sender;

    /// Answers every message with a fixed result once a permit is released.
    struct GatedTransport {
        calls: AtomicUsize,
        sent: Mutex<Vec<String>>,
        release: Semaphore,
        reply: Result<Value>,
    }

    impl GatedTransport {
        fn replying(reply: Result<Value>) -> Self {
            Self {
                calls: AtomicUsize::new(0),
                sent: Mutex::new(Vec::new()),
                release: Semaphore::new(0),
                reply,
            }
        }

        fn open(reply: Result<Value>) -> Self {
            let transport = Self::replying(reply);
            transport.release.add_permits(1024);
            transport
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait::async_trait]
    impl Transport for GatedTransport {
        async fn send_message(&self, message: &str) -> Result<Value> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            lock(&self.sent).push(message.to_string());
            let _permit = self.release.acquire().await.expect("semaphore closed");
            self.reply.clone()
        }
    }

    #[derive(Default)]
    struct RecordingRenderer {
        rendered: Vec<Message>,
        loading: Vec<bool>,
        info: Vec<String>,
    }

    impl Renderer for RecordingRenderer {
        fn render_message(&mut self, message: &Message) {
            self.rendered.push(message.clone());
        }

        fn set_loading(&mut self, loading: bool) {
            self.loading.push(loading);
        }

        fn print_error(&mut self, _: &str) {}

        fn print_info(&mut self, info: &str) {
            self.info.push(info.to_string());
        }
    }

    fn quiet_config() -> ChatConfig {
        ChatConfig::new().without_greeting()
    }

    async fn wait_for_sending<T: Transport>(session: &ChatSession<T>) {
        while session.state() != TurnState::Sending {
            tokio::task::yield_now().await;
        }
    }

    #[test]
    fn new_session_shows_greeting() {
        let session = ChatSession::new(GatedTransport::open(Ok(json!({}))), ChatConfig::new());
        let transcript = session.transcript();
        assert_eq!(transcript.len(), 1);
        assert_eq!(transcript[0].sender(), Sender::Bot);
        assert_eq!(transcript[0].text(), "Hello! How can I help you today?");
        assert_eq!(session.state(), TurnState::Idle);
    }

    #[tokio::test]
    async fn successful_turn_appends_user_then_reply() {
        let transport = GatedTransport::open(Ok(json!({"reply": "Hello!"})));
        let session = ChatSession::new(transport, quiet_config());
        let mut renderer = RecordingRenderer::default();

        let outcome = session.submit("  Hi  ", &mut renderer).await;

        let reply = outcome.message().expect("turn should run");
        assert_eq!(reply.text(), "Hello!");
        assert!(!reply.is_error());
        let transcript = session.transcript();
        assert_eq!(transcript.len(), 2);
        assert_eq!(transcript[0].text(), "Hi");
        assert_eq!(transcript[0].sender(), Sender::User);
        assert_eq!(transcript[1].sender(), Sender::Bot);
        assert_eq!(*lock(&session.transport.sent), vec!["Hi".to_string()]);
        assert_eq!(renderer.rendered, transcript);
        assert_eq!(renderer.loading, vec![true, false]);
        assert_eq!(session.state(), TurnState::Idle);
    }

    #[tokio::test]
    async fn failed_turn_keeps_user_message_and_apologizes() {
        let transport =
            GatedTransport::open(Err(Error::api(500, "Failed to connect to the webhook.")));
        let session = ChatSession::new(transport, quiet_config());
        let mut renderer = RecordingRenderer::default();

        let outcome = session.submit("Hi", &mut renderer).await;

        assert!(matches!(outcome, SubmitOutcome::Failed(_)));
        let transcript = session.transcript();
        assert_eq!(transcript.len(), 2);
        assert_eq!(transcript[0].text(), "Hi");
        assert!(!transcript[0].is_error());
        assert_eq!(transcript[1].text(), APOLOGY);
        assert!(transcript[1].is_error());
        assert_eq!(session.state(), TurnState::Idle);
        assert_eq!(session.stats().turns_failed, 1);
    }

    #[tokio::test]
    async fn every_failure_kind_releases_the_guard() {
        let failures = vec![
            Error::api(400, "Message is empty."),
            Error::api(500, "Invalid response from webhook."),
            Error::timeout("Request timed out", Some(35.0)),
            Error::connection("Connection refused", None),
            Error::serialization("Failed to parse gateway response", None),
        ];
        for failure in failures {
            let session =
                ChatSession::new(GatedTransport::open(Err(failure.clone())), quiet_config());
            let mut renderer = RecordingRenderer::default();
            let outcome = session.submit("Hi", &mut renderer).await;
            assert!(matches!(outcome, SubmitOutcome::Failed(_)), "{failure:?}");
            assert_eq!(session.state(), TurnState::Idle, "{failure:?}");
            assert!(session.is_input_enabled());
            assert_eq!(renderer.loading, vec![true, false]);
        }
    }

    #[tokio::test]
    async fn empty_input_is_a_no_op() {
        let session = ChatSession::new(GatedTransport::open(Ok(json!({}))), quiet_config());
        let mut renderer = RecordingRenderer::default();

        for text in ["", "   ", "\n\t "] {
            let outcome = session.submit(text, &mut renderer).await;
            assert_eq!(outcome, SubmitOutcome::Ignored(IgnoreReason::Empty));
        }

        assert_eq!(session.message_count(), 0);
        assert_eq!(session.transport.calls(), 0);
        assert!(renderer.rendered.is_empty());
        assert!(renderer.loading.is_empty());
    }

    #[tokio::test]
    async fn submit_while_sending_is_dropped() {
        let transport = Arc::new(GatedTransport::replying(Ok(json!({"reply": "first"}))));
        let session = Arc::new(ChatSession::new(transport.clone(), quiet_config()));

        let first = {
            let session = session.clone();
            tokio::spawn(async move {
                let mut renderer = RecordingRenderer::default();
                session.submit("one", &mut renderer).await
            })
        };
        wait_for_sending(&session).await;
        assert!(!session.is_input_enabled());

        let mut renderer = RecordingRenderer::default();
        let second = session.submit("two", &mut renderer).await;
        assert_eq!(second, SubmitOutcome::Ignored(IgnoreReason::Busy));
        assert_eq!(session.message_count(), 1);
        assert_eq!(transport.calls(), 1);
        assert!(renderer.rendered.is_empty());

        transport.release.add_permits(1);
        let first = first.await.unwrap();
        assert_eq!(first.message().map(Message::text), Some("first"));
        assert_eq!(session.message_count(), 2);
        assert_eq!(session.stats().submits_dropped, 1);
        assert_eq!(session.state(), TurnState::Idle);
    }

    #[tokio::test]
    async fn dropped_turn_still_releases_guard() {
        let transport = Arc::new(GatedTransport::replying(Ok(json!({"reply": "never"}))));
        let session = Arc::new(ChatSession::new(transport.clone(), quiet_config()));

        let turn = {
            let session = session.clone();
            tokio::spawn(async move {
                let mut renderer = RecordingRenderer::default();
                session.submit("Hi", &mut renderer).await
            })
        };
        wait_for_sending(&session).await;
        turn.abort();
        assert!(turn.await.unwrap_err().is_cancelled());

        assert_eq!(session.state(), TurnState::Idle);
        assert_eq!(session.message_count(), 1);
    }

    #[tokio::test]
    async fn sequential_turns_append_in_order() {
        let session = ChatSession::new(
            GatedTransport::open(Ok(json!({"reply": "ok"}))),
            quiet_config(),
        );
        let mut renderer = RecordingRenderer::default();

        for i in 0..5 {
            let outcome = session.submit(&format!("message {i}"), &mut renderer).await;
            assert!(matches!(outcome, SubmitOutcome::Replied(_)));
        }

        let transcript = session.transcript();
        assert_eq!(transcript.len(), 10);
        for (i, pair) in transcript.chunks(2).enumerate() {
            assert_eq!(pair[0].sender(), Sender::User);
            assert_eq!(pair[0].text(), format!("message {i}"));
            assert_eq!(pair[1].sender(), Sender::Bot);
        }
        assert_eq!(session.stats().turns_completed, 5);
    }

    #[tokio::test]
    async fn enter_and_send_button_share_submit() {
        let session = ChatSession::new(
            GatedTransport::open(Ok(json!({"reply": "ok"}))),
            quiet_config(),
        );
        let mut renderer = RecordingRenderer::default();

        for c in "Hi".chars() {
            let outcome = session
                .handle_event(
                    InputEvent::Key {
                        key: Key::Char(c),
                        shift: false,
                    },
                    &mut renderer,
                )
                .await;
            assert!(outcome.is_none());
        }
        let outcome = session
            .handle_event(
                InputEvent::Key {
                    key: Key::Enter,
                    shift: false,
                },
                &mut renderer,
            )
            .await;
        assert!(matches!(outcome, Some(SubmitOutcome::Replied(_))));
        assert_eq!(session.input(), "");

        session.set_input("Again");
        let outcome = session
            .handle_event(InputEvent::SendClicked, &mut renderer)
            .await;
        assert!(matches!(outcome, Some(SubmitOutcome::Replied(_))));
        assert_eq!(session.message_count(), 4);
        assert_eq!(session.transport.calls(), 2);
    }

    #[tokio::test]
    async fn shift_enter_inserts_line_break() {
        let session = ChatSession::new(GatedTransport::open(Ok(json!({}))), quiet_config());
        let mut renderer = RecordingRenderer::default();

        session.set_input("line one");
        let outcome = session
            .handle_event(
                InputEvent::Key {
                    key: Key::Enter,
                    shift: true,
                },
                &mut renderer,
            )
            .await;
        assert!(outcome.is_none());
        session
            .handle_event(
                InputEvent::Key {
                    key: Key::Char('x'),
                    shift: false,
                },
                &mut renderer,
            )
            .await;
        session
            .handle_event(
                InputEvent::Key {
                    key: Key::Backspace,
                    shift: false,
                },
                &mut renderer,
            )
            .await;
        assert_eq!(session.input(), "line one\n");
        assert_eq!(session.transport.calls(), 0);
    }

    #[tokio::test]
    async fn whitespace_input_is_not_cleared_or_sent() {
        let session = ChatSession::new(GatedTransport::open(Ok(json!({}))), quiet_config());
        let mut renderer = RecordingRenderer::default();

        session.set_input("   ");
        let outcome = session
            .handle_event(InputEvent::SendClicked, &mut renderer)
            .await;
        assert_eq!(outcome, Some(SubmitOutcome::Ignored(IgnoreReason::Empty)));
        assert_eq!(session.input(), "   ");
        assert_eq!(session.message_count(), 0);
    }

    #[test]
    fn reply_text_normalization() {
        assert_eq!(reply_text(&json!({"reply": "Hello!"})), "Hello!");
        assert_eq!(reply_text(&json!("plain")), "plain");
        assert_eq!(reply_text(&json!({"reply": 42})), "42");
        assert_eq!(reply_text(&json!({"answer": "x"})), "");
        assert_eq!(reply_text(&json!({"reply": null})), "");
        assert_eq!(reply_text(&json!([1, 2])), "");
    }

    #[tokio::test]
    async fn stats_are_reported_through_renderer() {
        let session = ChatSession::new(
            GatedTransport::open(Ok(json!({"reply": "ok"}))),
            quiet_config().with_gateway_url("http://gateway/message"),
        );
        let mut renderer = RecordingRenderer::default();
        session.submit("Hi", &mut renderer).await;

        session.print_stats(&mut renderer);
        assert!(renderer.info.contains(&"      Gateway: http://gateway/message".to_string()));
        assert!(renderer.info.contains(&"      Messages: 2".to_string()));
        assert!(renderer.info.contains(&"      Replies: 1".to_string()));
        assert_eq!(renderer.rendered.len(), 2);
    }
}
