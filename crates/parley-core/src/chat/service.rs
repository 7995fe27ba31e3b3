//! Relay service: one chat turn end-to-end.
//!
//! `RelayService` coordinates the `TurnRepository`, the persona builder and
//! the completion provider:
//!
//! 1. validate the request (nothing touches the store before this passes)
//! 2. write the persona as the session's system turn on its first message
//! 3. append the user turn
//! 4. load the ordered transcript and cut it to the history window
//! 5. call the provider
//! 6. append the assistant turn and return the reply
//!
//! Nothing here is transactional across the store and the provider call. A
//! provider failure leaves the user turn in place with no assistant reply;
//! it is replayed as context on the next call. Concurrent requests for the
//! same session may interleave their turns, since no per-session lock is
//! held between reading the transcript and writing the reply.

use std::time::Instant;

use parley_types::error::ChatError;
use parley_types::llm::{CompletionRequest, Message, MessageRole};
use parley_types::mood::normalize_mood;
use parley_types::session::SessionId;
use parley_types::turn::{NewTurn, Turn};
use tracing::{debug, info, warn};

use crate::llm::box_provider::BoxLlmProvider;
use crate::persona::PersonaBuilder;
use crate::repository::turn::TurnRepository;

/// Raw chat input as received from a caller; fields are validated here.
#[derive(Debug, Clone, Default)]
pub struct ChatTurnRequest {
    pub session_id: Option<String>,
    pub message: Option<String>,
    pub mood: Option<String>,
}

/// Result of a successful chat turn.
#[derive(Debug, Clone, PartialEq)]
pub struct ChatReply {
    pub session_id: SessionId,
    pub reply: String,
}

/// Tunables for the relay flow.
#[derive(Debug, Clone, Default)]
pub struct RelayOptions {
    /// Non-system turns replayed to the provider; all when `None`.
    pub max_history_turns: Option<usize>,
    pub max_tokens: Option<u32>,
    pub temperature: Option<f64>,
}

/// Orchestrates chat turns over a turn store and a completion provider.
///
/// Generic over `TurnRepository` so the core never depends on a storage
/// backend; the provider is type-erased.
pub struct RelayService<R: TurnRepository> {
    repo: R,
    provider: BoxLlmProvider,
    persona: PersonaBuilder,
    options: RelayOptions,
}

impl<R: TurnRepository> RelayService<R> {
    pub fn new(
        repo: R,
        provider: BoxLlmProvider,
        persona: PersonaBuilder,
        options: RelayOptions,
    ) -> Self {
        Self {
            repo,
            provider,
            persona,
            options,
        }
    }

    pub fn provider_name(&self) -> &str {
        self.provider.name()
    }

    /// Run one chat turn and return the provider's reply.
    ///
    /// Every failure is logged with the session id it concerns.
    pub async fn handle_chat(&self, request: ChatTurnRequest) -> Result<ChatReply, ChatError> {
        let raw_session_id = request.session_id.clone();
        let (session_id, message, mood) = match validate(request) {
            Ok(fields) => fields,
            Err(e) => {
                warn!(session_id = ?raw_session_id, error = %e, "Chat request rejected");
                return Err(e);
            }
        };

        let result = self.relay(&session_id, message, mood).await;
        if let Err(ChatError::StoreUnavailable(e)) = &result {
            warn!(session_id = %session_id, error = %e, "Turn store failed during chat turn");
        }
        result
    }

    #[tracing::instrument(
        name = "chat_turn",
        skip_all,
        fields(session_id = %session_id)
    )]
    async fn relay(
        &self,
        session_id: &SessionId,
        message: String,
        mood: Option<String>,
    ) -> Result<ChatReply, ChatError> {
        let start = Instant::now();

        let history = self.repo.list_by_session(session_id).await?;
        if !has_system_turn(&history) {
            let persona = NewTurn::now(
                session_id.clone(),
                MessageRole::System,
                self.persona.build(mood.as_deref()),
                mood.clone(),
            );
            if self.repo.append_system_once(&persona).await? {
                info!(session_id = %session_id, mood = ?mood, "Persona written for new session");
            }
        }

        self.repo
            .append(&NewTurn::now(
                session_id.clone(),
                MessageRole::User,
                message,
                mood.clone(),
            ))
            .await?;

        let transcript = self.repo.list_by_session(session_id).await?;
        let mut messages = window_transcript(&transcript, self.options.max_history_turns);
        if !has_system_turn(&transcript) {
            // Only reachable when the stored persona is not visible yet.
            messages.insert(
                0,
                Message {
                    role: MessageRole::System,
                    content: self.persona.build(mood.as_deref()),
                },
            );
        }

        let completion = CompletionRequest {
            model: String::new(),
            messages,
            max_tokens: self.options.max_tokens,
            temperature: self.options.temperature,
        };
        debug!(
            session_id = %session_id,
            messages = completion.messages.len(),
            provider = self.provider.name(),
            "Calling completion provider"
        );

        let response = match self.provider.complete(&completion).await {
            Ok(response) => response,
            Err(e) => {
                warn!(session_id = %session_id, error = %e, "Completion failed; user turn kept without reply");
                return Err(e.into());
            }
        };

        self.repo
            .append(&NewTurn::now(
                session_id.clone(),
                MessageRole::Assistant,
                response.content.clone(),
                mood,
            ))
            .await?;

        info!(
            session_id = %session_id,
            response_id = %response.id,
            model = %response.model,
            stop_reason = %response.stop_reason,
            input_tokens = response.usage.input_tokens,
            output_tokens = response.usage.output_tokens,
            elapsed_ms = start.elapsed().as_millis() as u64,
            "Chat turn completed"
        );

        Ok(ChatReply {
            session_id: session_id.clone(),
            reply: response.content,
        })
    }

    /// The stored transcript of a session, oldest first.
    pub async fn transcript(&self, session_id: &SessionId) -> Result<Vec<Turn>, ChatError> {
        Ok(self.repo.list_by_session(session_id).await?)
    }
}

fn validate(request: ChatTurnRequest) -> Result<(SessionId, String, Option<String>), ChatError> {
    let session_id = request
        .session_id
        .as_deref()
        .ok_or_else(|| ChatError::InvalidRequest("session_id is required".to_string()))
        .and_then(SessionId::parse)?;

    let message = match request.message {
        Some(m) if !m.trim().is_empty() => m,
        _ => {
            return Err(ChatError::InvalidRequest(
                "message must not be empty".to_string(),
            ));
        }
    };

    Ok((session_id, message, normalize_mood(request.mood.as_deref())))
}

fn has_system_turn(turns: &[Turn]) -> bool {
    turns.iter().any(|t| t.role == MessageRole::System)
}

/// Cut an ordered transcript down to what is replayed to the provider.
///
/// System turns come first, followed by the most recent `max_turns`
/// non-system turns in their original order.
pub fn window_transcript(turns: &[Turn], max_turns: Option<usize>) -> Vec<Message> {
    let (system, rest): (Vec<&Turn>, Vec<&Turn>) =
        turns.iter().partition(|t| t.role == MessageRole::System);

    let skip = match max_turns {
        Some(max) => rest.len().saturating_sub(max),
        None => 0,
    };

    system
        .into_iter()
        .chain(rest.into_iter().skip(skip))
        .map(Turn::to_message)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
    use std::sync::{Arc, Mutex};

    use parley_types::error::RepositoryError;
    use parley_types::llm::{CompletionResponse, LlmError, StopReason, Usage};

    use crate::llm::provider::LlmProvider;
    use crate::persona::DEFAULT_PERSONA;

    /// In-memory turn log with a switch to simulate an unreachable store.
    #[derive(Default)]
    struct MemoryTurnRepository {
        turns: Mutex<Vec<Turn>>,
        writes: AtomicUsize,
        unavailable: AtomicBool,
    }

    impl MemoryTurnRepository {
        fn check(&self) -> Result<(), RepositoryError> {
            if self.unavailable.load(Ordering::SeqCst) {
                Err(RepositoryError::Connection("store offline".to_string()))
            } else {
                Ok(())
            }
        }

        fn all(&self) -> Vec<Turn> {
            self.turns.lock().unwrap().clone()
        }
    }

    impl TurnRepository for Arc<MemoryTurnRepository> {
        async fn initialize(&self) -> Result<(), RepositoryError> {
            self.check()
        }

        async fn append(&self, turn: &NewTurn) -> Result<Turn, RepositoryError> {
            self.check()?;
            let mut turns = self.turns.lock().unwrap();
            if turn.role == MessageRole::System
                && turns
                    .iter()
                    .any(|t| t.session_id == turn.session_id && t.role == MessageRole::System)
            {
                return Err(RepositoryError::Conflict("system turn exists".to_string()));
            }
            let stored = turn.clone().into_turn(turns.len() as i64 + 1);
            turns.push(stored.clone());
            self.writes.fetch_add(1, Ordering::SeqCst);
            Ok(stored)
        }

        async fn append_system_once(&self, turn: &NewTurn) -> Result<bool, RepositoryError> {
            match self.append(turn).await {
                Ok(_) => Ok(true),
                Err(RepositoryError::Conflict(_)) => Ok(false),
                Err(e) => Err(e),
            }
        }

        async fn list_by_session(
            &self,
            session_id: &SessionId,
        ) -> Result<Vec<Turn>, RepositoryError> {
            self.check()?;
            let mut turns: Vec<Turn> = self
                .turns
                .lock()
                .unwrap()
                .iter()
                .filter(|t| &t.session_id == session_id)
                .cloned()
                .collect();
            turns.sort_by(|a, b| a.timestamp.cmp(&b.timestamp).then(a.id.cmp(&b.id)));
            Ok(turns)
        }

        async fn count_turns(&self) -> Result<u64, RepositoryError> {
            self.check()?;
            Ok(self.turns.lock().unwrap().len() as u64)
        }
    }

    /// Provider stub returning a fixed reply (or failing) and recording requests.
    struct StubProvider {
        reply: Option<String>,
        seen: Arc<Mutex<Vec<CompletionRequest>>>,
    }

    impl LlmProvider for StubProvider {
        fn name(&self) -> &str {
            "stub"
        }

        async fn complete(
            &self,
            request: &CompletionRequest,
        ) -> Result<CompletionResponse, LlmError> {
            self.seen.lock().unwrap().push(request.clone());
            match &self.reply {
                Some(reply) => Ok(CompletionResponse {
                    id: "stub-1".to_string(),
                    content: reply.clone(),
                    model: "stub-model".to_string(),
                    stop_reason: StopReason::EndTurn,
                    usage: Usage::default(),
                }),
                None => Err(LlmError::RateLimited {
                    retry_after_ms: None,
                }),
            }
        }
    }

    struct Harness {
        service: RelayService<Arc<MemoryTurnRepository>>,
        repo: Arc<MemoryTurnRepository>,
        seen: Arc<Mutex<Vec<CompletionRequest>>>,
    }

    fn harness(reply: Option<&str>, options: RelayOptions) -> Harness {
        let repo = Arc::new(MemoryTurnRepository::default());
        let seen = Arc::new(Mutex::new(Vec::new()));
        let provider = StubProvider {
            reply: reply.map(str::to_string),
            seen: seen.clone(),
        };
        let service = RelayService::new(
            repo.clone(),
            BoxLlmProvider::new(provider),
            PersonaBuilder::default(),
            options,
        );
        Harness {
            service,
            repo,
            seen,
        }
    }

    fn request(session_id: &str, message: &str, mood: Option<&str>) -> ChatTurnRequest {
        ChatTurnRequest {
            session_id: Some(session_id.to_string()),
            message: Some(message.to_string()),
            mood: mood.map(str::to_string),
        }
    }

    #[tokio::test]
    async fn test_first_message_writes_system_user_assistant() {
        let h = harness(Some("salut!"), RelayOptions::default());

        let reply = h
            .service
            .handle_chat(request("abc-123", "hello", Some("joie")))
            .await
            .unwrap();
        assert_eq!(reply.reply, "salut!");
        assert_eq!(reply.session_id.as_str(), "abc-123");

        let turns = h.repo.all();
        let roles: Vec<MessageRole> = turns.iter().map(|t| t.role).collect();
        assert_eq!(
            roles,
            vec![MessageRole::System, MessageRole::User, MessageRole::Assistant]
        );
        assert_eq!(
            turns[0].content,
            PersonaBuilder::default().build(Some("joie"))
        );
        assert_eq!(turns[1].content, "hello");
        assert_eq!(turns[2].content, "salut!");
        assert!(turns.iter().all(|t| t.mood.as_deref() == Some("joie")));
    }

    #[tokio::test]
    async fn test_provider_receives_ordered_transcript() {
        let h = harness(Some("ok"), RelayOptions::default());
        h.service
            .handle_chat(request("s", "first", None))
            .await
            .unwrap();
        h.service
            .handle_chat(request("s", "second", None))
            .await
            .unwrap();

        let seen = h.seen.lock().unwrap();
        let last = &seen[1].messages;
        let contents: Vec<&str> = last.iter().map(|m| m.content.as_str()).collect();
        assert_eq!(contents, vec![DEFAULT_PERSONA, "first", "ok", "second"]);
        assert_eq!(last[0].role, MessageRole::System);
    }

    #[tokio::test]
    async fn test_persona_written_only_once() {
        let h = harness(Some("ok"), RelayOptions::default());
        for _ in 0..3 {
            h.service
                .handle_chat(request("s", "again", Some("amour")))
                .await
                .unwrap();
        }
        let system_count = h
            .repo
            .all()
            .iter()
            .filter(|t| t.role == MessageRole::System)
            .count();
        assert_eq!(system_count, 1);
        assert_eq!(h.repo.all().len(), 7);
    }

    #[tokio::test]
    async fn test_later_mood_does_not_replace_persona() {
        let h = harness(Some("ok"), RelayOptions::default());
        h.service
            .handle_chat(request("s", "one", Some("joie")))
            .await
            .unwrap();
        h.service
            .handle_chat(request("s", "two", Some("tristesse")))
            .await
            .unwrap();
        let system = h
            .repo
            .all()
            .into_iter()
            .find(|t| t.role == MessageRole::System)
            .unwrap();
        assert!(system.content.contains("joie"));
        assert!(!system.content.contains("tristesse"));
    }

    #[tokio::test]
    async fn test_missing_session_id_is_rejected_without_writes() {
        let h = harness(Some("ok"), RelayOptions::default());
        let err = h
            .service
            .handle_chat(ChatTurnRequest {
                session_id: None,
                message: Some("hello".to_string()),
                mood: None,
            })
            .await
            .unwrap_err();
        assert!(matches!(err, ChatError::InvalidRequest(_)));
        assert_eq!(h.repo.writes.load(Ordering::SeqCst), 0);
        assert!(h.seen.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_empty_message_is_rejected_without_writes() {
        let h = harness(Some("ok"), RelayOptions::default());
        for message in [None, Some(""), Some("   ")] {
            let err = h
                .service
                .handle_chat(ChatTurnRequest {
                    session_id: Some("s".to_string()),
                    message: message.map(str::to_string),
                    mood: None,
                })
                .await
                .unwrap_err();
            assert!(matches!(err, ChatError::InvalidRequest(_)));
        }
        assert_eq!(h.repo.writes.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_provider_failure_keeps_user_turn_only() {
        let h = harness(None, RelayOptions::default());
        let err = h
            .service
            .handle_chat(request("s", "hello", None))
            .await
            .unwrap_err();
        assert!(matches!(err, ChatError::ProviderFailure(_)));

        let turns = h.repo.all();
        assert!(turns.iter().any(|t| t.role == MessageRole::User));
        assert!(!turns.iter().any(|t| t.role == MessageRole::Assistant));
    }

    #[tokio::test]
    async fn test_orphan_user_turn_is_replayed() {
        let failing = harness(None, RelayOptions::default());
        let _ = failing
            .service
            .handle_chat(request("s", "lost", None))
            .await;

        // Same store, working provider.
        let seen = Arc::new(Mutex::new(Vec::new()));
        let service = RelayService::new(
            failing.repo.clone(),
            BoxLlmProvider::new(StubProvider {
                reply: Some("back".to_string()),
                seen: seen.clone(),
            }),
            PersonaBuilder::default(),
            RelayOptions::default(),
        );
        service
            .handle_chat(request("s", "retry", None))
            .await
            .unwrap();

        let sent = &seen.lock().unwrap()[0].messages;
        let contents: Vec<&str> = sent.iter().map(|m| m.content.as_str()).collect();
        assert_eq!(contents, vec![DEFAULT_PERSONA, "lost", "retry"]);
    }

    #[tokio::test]
    async fn test_store_unavailable() {
        let h = harness(Some("ok"), RelayOptions::default());
        h.repo.unavailable.store(true, Ordering::SeqCst);
        let err = h
            .service
            .handle_chat(request("s", "hello", None))
            .await
            .unwrap_err();
        assert!(matches!(err, ChatError::StoreUnavailable(_)));
        assert!(h.seen.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_sessions_are_isolated() {
        let h = harness(Some("ok"), RelayOptions::default());
        h.service
            .handle_chat(request("a", "for a", None))
            .await
            .unwrap();
        h.service
            .handle_chat(request("b", "for b", None))
            .await
            .unwrap();

        let b = h
            .service
            .transcript(&SessionId("b".to_string()))
            .await
            .unwrap();
        assert_eq!(b.len(), 3);
        assert!(b.iter().all(|t| t.content != "for a"));
    }

    #[tokio::test]
    async fn test_history_window_applied() {
        let options = RelayOptions {
            max_history_turns: Some(3),
            ..RelayOptions::default()
        };
        let h = harness(Some("ok"), options);
        for i in 0..4 {
            h.service
                .handle_chat(request("s", &format!("m{i}"), None))
                .await
                .unwrap();
        }
        let seen = h.seen.lock().unwrap();
        let last = &seen[3].messages;
        let contents: Vec<&str> = last.iter().map(|m| m.content.as_str()).collect();
        assert_eq!(contents, vec![DEFAULT_PERSONA, "m2", "ok", "m3"]);
    }

    #[test]
    fn test_window_transcript_without_limit_keeps_everything() {
        let sid = SessionId("s".to_string());
        let turns: Vec<Turn> = [
            (MessageRole::System, "p"),
            (MessageRole::User, "u1"),
            (MessageRole::Assistant, "a1"),
        ]
        .into_iter()
        .enumerate()
        .map(|(i, (role, content))| {
            NewTurn::now(sid.clone(), role, content, None).into_turn(i as i64 + 1)
        })
        .collect();

        let messages = window_transcript(&turns, None);
        assert_eq!(messages.len(), 3);
        let zero = window_transcript(&turns, Some(0));
        assert_eq!(zero.len(), 1);
        assert_eq!(zero[0].role, MessageRole::System);
    }

    #[tokio::test]
    async fn test_blank_mood_is_stored_as_none() {
        let h = harness(Some("ok"), RelayOptions::default());
        h.service
            .handle_chat(request("s", "hi", Some("  ")))
            .await
            .unwrap();
        assert!(h.repo.all().iter().all(|t| t.mood.is_none()));
        assert_eq!(h.repo.all()[0].content, DEFAULT_PERSONA);
    }

    /// Log sink shared between the subscriber and the test body.
    #[derive(Clone, Default)]
    struct LogBuffer(Arc<Mutex<Vec<u8>>>);

    impl std::io::Write for LogBuffer {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    impl LogBuffer {
        fn contents(&self) -> String {
            String::from_utf8_lossy(&self.0.lock().unwrap()).into_owned()
        }
    }

    #[tokio::test]
    async fn test_failures_are_logged_with_session_id() {
        let logs = LogBuffer::default();
        let writer = logs.clone();
        let subscriber = tracing_subscriber::fmt()
            .with_ansi(false)
            .with_max_level(tracing::Level::WARN)
            .with_writer(move || writer.clone())
            .finish();
        let _guard = tracing::subscriber::set_default(subscriber);

        let h = harness(Some("ok"), RelayOptions::default());
        let _ = h
            .service
            .handle_chat(request("bad-session", "   ", None))
            .await;
        h.repo.unavailable.store(true, Ordering::SeqCst);
        let _ = h
            .service
            .handle_chat(request("offline-session", "hello", None))
            .await;

        let output = logs.contents();
        assert!(output.contains("Chat request rejected"), "{output}");
        assert!(output.contains("bad-session"), "{output}");
        assert!(output.contains("Turn store failed during chat turn"), "{output}");
        assert!(output.contains("offline-session"), "{output}");
    }
}
