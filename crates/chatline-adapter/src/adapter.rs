use std::collections::VecDeque;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use futures::stream::{self, BoxStream};
use futures::{Stream, StreamExt as _, TryStreamExt as _};
use tracing::debug;

use crate::abort::{AbortHandle, AbortSignal};
use crate::config::{ChatClientConfig, PresentationText, ResponseMode};
use crate::content::{AssistantSnapshot, Message, latest_user_text};
use crate::errors::ChatError;
use crate::session::{SessionId, SessionIdentity, SessionStore};
use crate::transport::{SseDecoder, StreamEvent, StreamEventKind};

pub(crate) type ByteStream =
    Pin<Box<dyn Stream<Item = Result<bytes::Bytes, ChatError>> + Send + 'static>>;

type SnapshotResult = Result<AssistantSnapshot, ChatError>;

const EVENT_STREAM_MIME: &str = "text/event-stream";

#[derive(serde::Serialize)]
struct ChatRequestBody {
    message: String,
    session_id: String,
}

#[derive(serde::Deserialize)]
struct ChatReplyBody {
    #[serde(default)]
    reply: Option<String>,
}

/// Backend health probe result.
#[derive(Clone, Debug, PartialEq, Eq, serde::Deserialize)]
pub struct HealthStatus {
    pub status: String,
}

/// Turns a conversation history into one backend request and exposes the
/// reply as a stream of assistant snapshots.
#[derive(Clone)]
pub struct ChatAdapter {
    client: reqwest::Client,
    config: Arc<ChatClientConfig>,
    identity: SessionIdentity,
}

impl ChatAdapter {
    /// Creates an adapter persisting the session id in `store`.
    pub fn new(config: ChatClientConfig, store: Arc<dyn SessionStore>) -> Result<Self, ChatError> {
        let client = reqwest::Client::builder()
            .build()
            .map_err(|e| ChatError::Config(format!("failed to build HTTP client: {e}")))?;
        Self::with_client(config, store, client)
    }

    /// Creates an adapter around an existing HTTP client.
    pub fn with_client(
        config: ChatClientConfig,
        store: Arc<dyn SessionStore>,
        client: reqwest::Client,
    ) -> Result<Self, ChatError> {
        config.validate()?;
        let identity = SessionIdentity::new(store).key(config.session_key.clone());
        Ok(Self {
            client,
            config: Arc::new(config),
            identity,
        })
    }

    /// Replaces the session identity manager (for example to change strategy).
    pub fn identity(mut self, identity: SessionIdentity) -> Self {
        self.identity = identity;
        self
    }

    /// Returns the session identity manager.
    pub fn session_identity(&self) -> &SessionIdentity {
        &self.identity
    }

    /// Returns the active configuration.
    pub fn config(&self) -> &ChatClientConfig {
        &self.config
    }

    /// Starts a run for the latest user turn in `history`.
    ///
    /// Nothing is sent until the returned stream is first polled. Without user
    /// text the stream yields one placeholder snapshot and makes no request.
    /// Aborting `abort` ends the stream quietly and drops the connection.
    pub fn run(
        &self,
        history: &[Message],
        abort: AbortHandle,
        thread_id: Option<&str>,
    ) -> SnapshotStream {
        let run_id = uuid::Uuid::new_v4();
        let Some(message) = latest_user_text(history) else {
            debug!(run_id = %run_id, "no user text; emitting placeholder");
            let placeholder = AssistantSnapshot::text(self.config.text.empty_input.clone());
            return SnapshotStream::new(run_id, abort, stream::iter([Ok(placeholder)]).boxed());
        };

        let plan = RunPlan {
            run_id,
            client: self.client.clone(),
            config: self.config.clone(),
            identity: self.identity.clone(),
            thread_id: thread_id.map(ToOwned::to_owned),
            message,
            signal: abort.signal(),
        };
        let inner = stream::once(plan.start()).try_flatten().boxed();
        SnapshotStream::new(run_id, abort, inner)
    }

    /// Probes the backend health endpoint.
    pub async fn health(&self) -> Result<HealthStatus, ChatError> {
        let response = self
            .client
            .get(self.config.health_url())
            .send()
            .await
            .map_err(ChatError::transport)?;
        let status = response.status();
        if !status.is_success() {
            return Err(ChatError::RequestFailed {
                status: status.as_u16(),
            });
        }
        response
            .json::<HealthStatus>()
            .await
            .map_err(|e| ChatError::protocol_msg(format!("invalid health response: {e}")))
    }
}

struct RunPlan {
    run_id: uuid::Uuid,
    client: reqwest::Client,
    config: Arc<ChatClientConfig>,
    identity: SessionIdentity,
    thread_id: Option<String>,
    message: String,
    signal: AbortSignal,
}

impl RunPlan {
    async fn start(mut self) -> Result<BoxStream<'static, SnapshotResult>, ChatError> {
        let session_id: SessionId = self.identity.resolve(self.thread_id.as_deref());
        let mode = self.config.mode;
        debug!(run_id = %self.run_id, session_id = %session_id, mode = %mode, "starting chat run");

        let request = self.client.post(self.config.run_url()).json(&ChatRequestBody {
            message: self.message,
            session_id: session_id.to_string(),
        });

        if self.signal.is_aborted() {
            return Ok(stream::empty().boxed());
        }
        let response = tokio::select! {
            biased;
            _ = self.signal.aborted() => {
                debug!(run_id = %self.run_id, "run aborted while awaiting response");
                return Ok(stream::empty().boxed());
            }
            sent = request.send() => sent.map_err(ChatError::transport)?,
        };

        let status = response.status();
        if !status.is_success() {
            debug!(run_id = %self.run_id, status = status.as_u16(), "chat request failed");
            return Err(ChatError::RequestFailed {
                status: status.as_u16(),
            });
        }

        match ResponseProtocol::select(mode, &response) {
            ResponseProtocol::SingleShot => {
                let text = self.config.text.clone();
                let reply = tokio::select! {
                    biased;
                    _ = self.signal.aborted() => return Ok(stream::empty().boxed()),
                    body = response.bytes() => body.map_err(ChatError::transport)?,
                };
                let snapshot = single_shot_snapshot(&reply, &text)?;
                Ok(stream::iter([Ok(snapshot)]).boxed())
            }
            ResponseProtocol::EventStream => {
                if status == reqwest::StatusCode::NO_CONTENT || response.content_length() == Some(0) {
                    return Err(ChatError::MalformedStream(
                        "Streaming response has no body.".into(),
                    ));
                }
                let bytes: ByteStream =
                    Box::pin(response.bytes_stream().map_err(ChatError::transport));
                Ok(snapshot_stream(self.run_id, bytes, self.signal).boxed())
            }
        }
    }
}

/// Response decoder chosen once per run.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum ResponseProtocol {
    SingleShot,
    EventStream,
}

impl ResponseProtocol {
    fn select(mode: ResponseMode, response: &reqwest::Response) -> Self {
        match mode {
            ResponseMode::Json => Self::SingleShot,
            ResponseMode::Stream => Self::EventStream,
            ResponseMode::Auto => {
                let content_type = response
                    .headers()
                    .get(reqwest::header::CONTENT_TYPE)
                    .and_then(|v| v.to_str().ok())
                    .unwrap_or_default();
                Self::from_content_type(content_type)
            }
        }
    }

    fn from_content_type(content_type: &str) -> Self {
        if content_type
            .trim()
            .to_ascii_lowercase()
            .starts_with(EVENT_STREAM_MIME)
        {
            Self::EventStream
        } else {
            Self::SingleShot
        }
    }
}

fn single_shot_snapshot(
    body: &[u8],
    text: &PresentationText,
) -> Result<AssistantSnapshot, ChatError> {
    let decoded: ChatReplyBody = serde_json::from_slice(body)
        .map_err(|e| ChatError::protocol_msg(format!("invalid chat response: {e}")))?;
    let reply = decoded
        .reply
        .as_deref()
        .map(str::trim)
        .filter(|r| !r.is_empty())
        .unwrap_or(&text.no_response);
    Ok(AssistantSnapshot::text(reply))
}

/// Drives an SSE byte stream into assistant snapshots.
///
/// Cancellation is checked before every emitted snapshot and raced against
/// every chunk read; the byte stream is dropped as soon as the run ends.
pub(crate) fn snapshot_stream(
    run_id: uuid::Uuid,
    bytes: ByteStream,
    signal: AbortSignal,
) -> impl Stream<Item = SnapshotResult> + Send + 'static {
    struct State {
        run_id: uuid::Uuid,
        bytes: ByteStream,
        signal: AbortSignal,
        decoder: SseDecoder,
        pending: VecDeque<StreamEvent>,
        accumulated: String,
        seq: u64,
        eof: bool,
        finished: bool,
    }

    stream::try_unfold(
        State {
            run_id,
            bytes,
            signal,
            decoder: SseDecoder::default(),
            pending: VecDeque::new(),
            accumulated: String::new(),
            seq: 0,
            eof: false,
            finished: false,
        },
        |mut state| async move {
            loop {
                if state.signal.is_aborted() {
                    debug!(run_id = %state.run_id, "run aborted");
                    return Ok(None);
                }
                if state.finished {
                    return Ok(None);
                }

                if let Some(event) = state.pending.pop_front() {
                    match event.kind {
                        StreamEventKind::Token => {
                            state.accumulated.push_str(event.content());
                            debug!(run_id = %state.run_id, seq = state.seq, "token");
                            state.seq = state.seq.saturating_add(1);
                            let snapshot = AssistantSnapshot::text(state.accumulated.clone());
                            return Ok(Some((snapshot, state)));
                        }
                        StreamEventKind::End => {
                            let content = event.content();
                            let final_text = if content.trim().is_empty() {
                                std::mem::take(&mut state.accumulated)
                            } else {
                                content.to_string()
                            };
                            debug!(run_id = %state.run_id, tokens = state.seq, "stream ended");
                            state.pending.clear();
                            state.finished = true;
                            return Ok(Some((AssistantSnapshot::text(final_text), state)));
                        }
                        StreamEventKind::Error => {
                            debug!(run_id = %state.run_id, "backend reported stream error");
                            return Err(ChatError::stream_failed(event.content()));
                        }
                        StreamEventKind::Unknown => continue,
                    }
                }

                if state.eof {
                    if state.accumulated.trim().is_empty() {
                        return Ok(None);
                    }
                    debug!(run_id = %state.run_id, "byte stream closed without end event");
                    let final_text = std::mem::take(&mut state.accumulated);
                    state.finished = true;
                    return Ok(Some((AssistantSnapshot::text(final_text), state)));
                }

                let next = tokio::select! {
                    biased;
                    _ = state.signal.aborted() => {
                        debug!(run_id = %state.run_id, "run aborted while reading");
                        return Ok(None);
                    }
                    next = state.bytes.next() => next,
                };
                match next {
                    Some(Ok(chunk)) => {
                        let events = state.decoder.push_chunk(&chunk)?;
                        state.pending.extend(events);
                    }
                    Some(Err(err)) => return Err(err),
                    None => state.eof = true,
                }
            }
        },
    )
}

/// Lazy, cancellable sequence of assistant snapshots for one run.
///
/// Each item is the full reply so far; render by replacement.
pub struct SnapshotStream {
    run_id: uuid::Uuid,
    abort_handle: AbortHandle,
    inner: BoxStream<'static, SnapshotResult>,
}

impl SnapshotStream {
    fn new(
        run_id: uuid::Uuid,
        abort_handle: AbortHandle,
        inner: BoxStream<'static, SnapshotResult>,
    ) -> Self {
        Self {
            run_id,
            abort_handle,
            inner,
        }
    }

    /// Returns the id used to correlate this run in logs.
    pub fn run_id(&self) -> uuid::Uuid {
        self.run_id
    }

    /// Returns a handle that cancels this run.
    pub fn abort_handle(&self) -> AbortHandle {
        self.abort_handle.clone()
    }

    /// Waits for the next snapshot. `None` once the run has ended.
    pub async fn next_snapshot(&mut self) -> Option<SnapshotResult> {
        self.inner.next().await
    }

    /// Drains the run and returns its last snapshot.
    ///
    /// Returns `Ok(None)` if the run ended before any snapshot, for example
    /// because it was cancelled.
    pub async fn finish(mut self) -> Result<Option<AssistantSnapshot>, ChatError> {
        let mut last = None;
        while let Some(snapshot) = self.inner.next().await {
            last = Some(snapshot?);
        }
        Ok(last)
    }

    /// Drains the run and returns the final reply text (empty if none).
    pub async fn collect_text(self) -> Result<String, ChatError> {
        Ok(self
            .finish()
            .await?
            .map(|snapshot| snapshot.as_text())
            .unwrap_or_default())
    }
}

impl Stream for SnapshotStream {
    type Item = SnapshotResult;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.inner.poll_next_unpin(cx)
    }
}
