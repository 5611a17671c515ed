use std::fmt;
use std::io::{self, BufRead, BufReader};
use std::sync::mpsc::{self, RecvTimeoutError};
use std::thread;
use std::time::{Duration, Instant};

use reqwest::blocking::{Client, Response};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::engine::cancel::CancelToken;

pub const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";
pub const DEFAULT_MODEL: &str = "gpt-3.5-turbo";
pub const DEFAULT_TEMPERATURE: f32 = 0.7;
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 60;
pub const DEFAULT_STREAM_IDLE_TIMEOUT_SECS: u64 = 90;
const CONNECT_TIMEOUT_SECS: u64 = 15;
/// How often a stream consumer looks at its cancel token while waiting.
const CANCEL_POLL: Duration = Duration::from_millis(50);
/// Lines buffered between the body reader thread and the consumer.
const STREAM_BUFFER_LINES: usize = 64;

pub const ENV_API_KEY: &str = "OPENAI_API_KEY";
pub const ENV_BASE_URL: &str = "OPENAI_API_BASE_URL";
pub const ENV_MODEL: &str = "OPENAI_MODEL_NAME";

/* =========================
   Configuration
   ========================= */

#[derive(Clone, PartialEq)]
pub struct LlmConfig {
    /// Sent as a bearer token. Not validated locally.
    pub api_key: String,
    pub base_url: String,
    pub model: String,
    pub temperature: f32,
    /// Applies to single-shot requests only.
    pub request_timeout_secs: u64,
    /// A stream that sends nothing for this long is treated as broken.
    pub stream_idle_timeout_secs: u64,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            base_url: DEFAULT_BASE_URL.into(),
            model: DEFAULT_MODEL.into(),
            temperature: DEFAULT_TEMPERATURE,
            request_timeout_secs: DEFAULT_REQUEST_TIMEOUT_SECS,
            stream_idle_timeout_secs: DEFAULT_STREAM_IDLE_TIMEOUT_SECS,
        }
    }
}

impl fmt::Debug for LlmConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LlmConfig")
            .field("api_key", &if self.api_key.is_empty() { "<unset>" } else { "<redacted>" })
            .field("base_url", &self.base_url)
            .field("model", &self.model)
            .field("temperature", &self.temperature)
            .field("request_timeout_secs", &self.request_timeout_secs)
            .field("stream_idle_timeout_secs", &self.stream_idle_timeout_secs)
            .finish()
    }
}

impl LlmConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Resolve from any key lookup. Blank values count as unset.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let get = |key: &str| {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        let defaults = Self::default();
        Self {
            api_key: get(ENV_API_KEY).unwrap_or_default(),
            base_url: get(ENV_BASE_URL).unwrap_or(defaults.base_url),
            model: get(ENV_MODEL).unwrap_or(defaults.model),
            ..defaults
        }
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/{}", self.base_url.trim_end_matches('/'), path)
    }

    pub fn chat_completions_url(&self) -> String {
        self.endpoint("chat/completions")
    }

    pub fn models_url(&self) -> String {
        self.endpoint("models")
    }
}

/* =========================
   Wire types
   ========================= */

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: "system".into(),
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: "user".into(),
            content: content.into(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ChatCompletionRequest<'a> {
    pub model: &'a str,
    pub messages: &'a [ChatMessage],
    pub temperature: f32,
    pub stream: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub response_format: Option<ResponseFormat>,
}

#[derive(Debug, Serialize)]
pub struct ResponseFormat {
    #[serde(rename = "type")]
    pub kind: &'static str,
}

impl ResponseFormat {
    pub fn json_object() -> Self {
        Self {
            kind: "json_object",
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct ChatCompletionResponse {
    pub choices: Vec<CompletionChoice>,
}

#[derive(Debug, Deserialize)]
pub struct CompletionChoice {
    pub message: ChatMessageResponse,
}

#[derive(Debug, Deserialize)]
pub struct ChatMessageResponse {
    #[serde(default)]
    pub content: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ChatCompletionChunk {
    #[serde(default)]
    pub choices: Vec<ChunkChoice>,
}

#[derive(Debug, Deserialize)]
pub struct ChunkChoice {
    #[serde(default)]
    pub delta: ChunkDelta,
}

#[derive(Debug, Default, Deserialize)]
pub struct ChunkDelta {
    #[serde(default)]
    pub content: Option<String>,
}

/* =========================
   Errors
   ========================= */

#[derive(Debug, Error)]
pub enum LlmError {
    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("endpoint returned status {status}: {body}")]
    Status { status: u16, body: String },
    #[error("stream read failed: {0}")]
    Io(#[from] std::io::Error),
    #[error("response contained no choices")]
    EmptyResponse,
    #[error("request cancelled")]
    Cancelled,
}

/* =========================
   Backend seam
   ========================= */

/// A chat-completion endpoint.
pub trait ChatBackend: Send {
    /// Stream a completion, handing each non-empty text fragment to
    /// `on_delta` in arrival order. Returns once the stream is exhausted.
    fn stream_chat(
        &self,
        messages: &[ChatMessage],
        cancel: &CancelToken,
        on_delta: &mut dyn FnMut(&str),
    ) -> Result<(), LlmError>;

    /// Single-shot completion constrained to a JSON object. `Ok(None)` means
    /// the backend answered without content.
    fn complete_json(
        &self,
        messages: &[ChatMessage],
        cancel: &CancelToken,
    ) -> Result<Option<String>, LlmError>;

    /// Human-readable reachability summary.
    fn test_connection(&self) -> Result<String, LlmError>;
}

/* =========================
   Server-sent events
   ========================= */

#[derive(Debug, PartialEq, Eq)]
pub enum SseLine {
    Delta(String),
    Done,
    Skip,
}

pub fn parse_sse_line(line: &str) -> SseLine {
    let line = line.trim_end_matches('\r');
    let Some(data) = line.strip_prefix("data:") else {
        return SseLine::Skip;
    };

    let data = data.trim();
    if data == "[DONE]" {
        return SseLine::Done;
    }

    match serde_json::from_str::<ChatCompletionChunk>(data) {
        Ok(chunk) => chunk
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.delta.content)
            .filter(|c| !c.is_empty())
            .map(SseLine::Delta)
            .unwrap_or(SseLine::Skip),
        Err(e) => {
            log::debug!("skipping unparseable stream line: {e}");
            SseLine::Skip
        }
    }
}

/// Read an SSE body line by line until `[DONE]` or end of input.
///
/// The blocking reads happen on a helper thread so that a stalled body
/// cannot hold up cancellation: the token is polled while waiting and the
/// helper is left behind once it trips. Going `idle_timeout` without a
/// single line fails with a timed-out I/O error.
pub fn read_sse_stream<R>(
    reader: R,
    cancel: &CancelToken,
    idle_timeout: Duration,
    on_delta: &mut dyn FnMut(&str),
) -> Result<(), LlmError>
where
    R: BufRead + Send + 'static,
{
    if cancel.is_cancelled() {
        return Err(LlmError::Cancelled);
    }

    let (line_tx, line_rx) = mpsc::sync_channel::<io::Result<String>>(STREAM_BUFFER_LINES);
    thread::Builder::new()
        .name("sse-reader".into())
        .spawn(move || {
            for line in reader.lines() {
                let failed = line.is_err();
                if line_tx.send(line).is_err() || failed {
                    break;
                }
            }
        })?;

    let mut last_line = Instant::now();
    loop {
        if cancel.is_cancelled() {
            return Err(LlmError::Cancelled);
        }

        match line_rx.recv_timeout(CANCEL_POLL) {
            Ok(line) => {
                last_line = Instant::now();
                match parse_sse_line(&line?) {
                    SseLine::Delta(text) => {
                        if cancel.is_cancelled() {
                            return Err(LlmError::Cancelled);
                        }
                        on_delta(&text);
                    }
                    SseLine::Done => return Ok(()),
                    SseLine::Skip => {}
                }
            }
            Err(RecvTimeoutError::Timeout) if last_line.elapsed() >= idle_timeout => {
                log::warn!("stream sent nothing for {idle_timeout:?}; giving up");
                return Err(LlmError::Io(io::Error::new(
                    io::ErrorKind::TimedOut,
                    format!("no data for {}s", idle_timeout.as_secs()),
                )));
            }
            Err(RecvTimeoutError::Timeout) => {}
            Err(RecvTimeoutError::Disconnected) => return Ok(()),
        }
    }
}

/* =========================
   HTTP backend
   ========================= */

pub struct OpenAiBackend {
    client: Client,
    config: LlmConfig,
}

impl OpenAiBackend {
    pub fn new(config: LlmConfig) -> Result<Self, LlmError> {
        let client = Client::builder()
            .connect_timeout(Duration::from_secs(CONNECT_TIMEOUT_SECS))
            .timeout(None::<Duration>)
            .build()?;

        Ok(Self { client, config })
    }

    pub fn config(&self) -> &LlmConfig {
        &self.config
    }

    fn body<'a>(&'a self, messages: &'a [ChatMessage], stream: bool) -> ChatCompletionRequest<'a> {
        ChatCompletionRequest {
            model: &self.config.model,
            messages,
            temperature: self.config.temperature,
            stream,
            response_format: (!stream).then(ResponseFormat::json_object),
        }
    }
}

fn check_status(resp: Response) -> Result<Response, LlmError> {
    let status = resp.status();
    if status.is_success() {
        return Ok(resp);
    }

    let body = resp.text().unwrap_or_default();
    Err(LlmError::Status {
        status: status.as_u16(),
        body,
    })
}

impl ChatBackend for OpenAiBackend {
    fn stream_chat(
        &self,
        messages: &[ChatMessage],
        cancel: &CancelToken,
        on_delta: &mut dyn FnMut(&str),
    ) -> Result<(), LlmError> {
        if cancel.is_cancelled() {
            return Err(LlmError::Cancelled);
        }

        let resp = self
            .client
            .post(self.config.chat_completions_url())
            .bearer_auth(&self.config.api_key)
            .json(&self.body(messages, true))
            .send()?;

        let resp = check_status(resp)?;
        read_sse_stream(
            BufReader::new(resp),
            cancel,
            Duration::from_secs(self.config.stream_idle_timeout_secs),
            on_delta,
        )
    }

    fn complete_json(
        &self,
        messages: &[ChatMessage],
        cancel: &CancelToken,
    ) -> Result<Option<String>, LlmError> {
        if cancel.is_cancelled() {
            return Err(LlmError::Cancelled);
        }

        let resp = self
            .client
            .post(self.config.chat_completions_url())
            .bearer_auth(&self.config.api_key)
            .timeout(Duration::from_secs(self.config.request_timeout_secs))
            .json(&self.body(messages, false))
            .send()?;

        let resp = check_status(resp)?.json::<ChatCompletionResponse>()?;

        if cancel.is_cancelled() {
            return Err(LlmError::Cancelled);
        }

        let choice = resp
            .choices
            .into_iter()
            .next()
            .ok_or(LlmError::EmptyResponse)?;

        Ok(choice.message.content)
    }

    fn test_connection(&self) -> Result<String, LlmError> {
        let resp = self
            .client
            .get(self.config.models_url())
            .bearer_auth(&self.config.api_key)
            .timeout(Duration::from_secs(self.config.request_timeout_secs))
            .send()?;

        let resp: serde_json::Value = check_status(resp)?.json()?;

        Ok(format!(
            "Connected to {} ({} models available)",
            self.config.base_url,
            resp["data"].as_array().map(|a| a.len()).unwrap_or(0)
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::io::{Cursor, Read};

    const IDLE: Duration = Duration::from_secs(5);

    fn sse(lines: &[&str]) -> Cursor<String> {
        Cursor::new(lines.join("\n"))
    }

    /// A body that hangs for `stall` before reporting end of input.
    struct StalledBody {
        stall: Duration,
    }

    impl Read for StalledBody {
        fn read(&mut self, _buf: &mut [u8]) -> io::Result<usize> {
            thread::sleep(self.stall);
            Ok(0)
        }
    }

    fn delta(text: &str) -> String {
        format!(
            "data: {}",
            serde_json::json!({ "choices": [{ "delta": { "content": text } }] })
        )
    }

    #[test]
    fn config_defaults_when_unset_or_blank() {
        let config = LlmConfig::from_lookup(|key| match key {
            ENV_MODEL => Some("   ".into()),
            _ => None,
        });
        assert_eq!(config.api_key, "");
        assert_eq!(config.base_url, DEFAULT_BASE_URL);
        assert_eq!(config.model, DEFAULT_MODEL);
    }

    #[test]
    fn config_reads_overrides() {
        let env: HashMap<&str, &str> = [
            (ENV_API_KEY, "sk-test"),
            (ENV_BASE_URL, "http://localhost:1234/v1/"),
            (ENV_MODEL, "local-model"),
        ]
        .into_iter()
        .collect();

        let config = LlmConfig::from_lookup(|key| env.get(key).map(|v| v.to_string()));
        assert_eq!(config.api_key, "sk-test");
        assert_eq!(config.model, "local-model");
        assert_eq!(
            config.chat_completions_url(),
            "http://localhost:1234/v1/chat/completions"
        );
        assert!(!format!("{config:?}").contains("sk-test"));
    }

    #[test]
    fn parses_sse_lines() {
        assert_eq!(parse_sse_line(&delta("你好")), SseLine::Delta("你好".into()));
        assert_eq!(parse_sse_line("data: [DONE]\r"), SseLine::Done);
        assert_eq!(parse_sse_line(": keep-alive"), SseLine::Skip);
        assert_eq!(parse_sse_line(""), SseLine::Skip);
        assert_eq!(parse_sse_line("data: {broken"), SseLine::Skip);
        assert_eq!(parse_sse_line(&delta("")), SseLine::Skip);
        assert_eq!(
            parse_sse_line(r#"data: {"choices":[{"delta":{"role":"assistant"}}]}"#),
            SseLine::Skip
        );
    }

    #[test]
    fn stream_delivers_fragments_in_order() {
        let hello = delta("Hello");
        let world = delta(" world");
        let late = delta("ignored after done");
        let body = sse(&[hello.as_str(), "", world.as_str(), "", "data: [DONE]", late.as_str()]);

        let mut seen = Vec::new();
        read_sse_stream(body, &CancelToken::new(), IDLE, &mut |d| seen.push(d.to_string())).unwrap();
        assert_eq!(seen, vec!["Hello", " world"]);
        assert_eq!(seen.concat(), "Hello world");
    }

    #[test]
    fn stream_without_done_keeps_what_arrived() {
        let partial = delta("partial");
        let body = sse(&[partial.as_str()]);
        let mut text = String::new();
        read_sse_stream(body, &CancelToken::new(), IDLE, &mut |d| text.push_str(d)).unwrap();
        assert_eq!(text, "partial");
    }

    #[test]
    fn cancelled_stream_stops() {
        let cancel = CancelToken::new();
        cancel.cancel();
        let mut calls = 0;
        let result =
            read_sse_stream(sse(&[delta("x").as_str()]), &cancel, IDLE, &mut |_| calls += 1);
        assert!(matches!(result, Err(LlmError::Cancelled)));
        assert_eq!(calls, 0);
    }

    #[test]
    fn cancel_interrupts_a_stalled_stream() {
        let cancel = CancelToken::new();
        let trip = cancel.clone();
        thread::spawn(move || {
            thread::sleep(Duration::from_millis(100));
            trip.cancel();
        });

        let body = BufReader::new(StalledBody {
            stall: Duration::from_secs(3),
        });
        let started = Instant::now();
        let result = read_sse_stream(body, &cancel, IDLE, &mut |_| {});

        assert!(matches!(result, Err(LlmError::Cancelled)));
        assert!(started.elapsed() < Duration::from_secs(1));
    }

    #[test]
    fn silent_stream_times_out() {
        let body = BufReader::new(StalledBody {
            stall: Duration::from_secs(3),
        });
        let started = Instant::now();
        let result = read_sse_stream(body, &CancelToken::new(), Duration::from_millis(200), &mut |_| {});

        match result {
            Err(LlmError::Io(e)) => assert_eq!(e.kind(), io::ErrorKind::TimedOut),
            other => panic!("expected a timeout, got {other:?}"),
        }
        assert!(started.elapsed() < Duration::from_secs(1));
    }

    #[test]
    fn structured_request_asks_for_json_object() {
        let backend = OpenAiBackend::new(LlmConfig::default()).unwrap();
        let messages = [ChatMessage::user("hi")];

        let json = serde_json::to_value(backend.body(&messages, false)).unwrap();
        assert_eq!(json["response_format"]["type"], "json_object");
        assert_eq!(json["stream"], false);
        assert_eq!(json["model"], DEFAULT_MODEL);

        let json = serde_json::to_value(backend.body(&messages, true)).unwrap();
        assert!(json.get("response_format").is_none());
        assert_eq!(json["messages"][0]["role"], "user");
    }
}
