//! Ollama generation provider.
//!
//! Ollama API: https://github.com/ollama/ollama/blob/main/docs/api.md
//! `/api/generate` answers with one JSON object, or with newline-delimited
//! JSON objects when streaming.

use crate::client::{LlmClient, LlmRequest, LlmResponse, LlmStream, LlmStreamChunk, LlmUsage};
use futures::{Stream, StreamExt};
use lexora_core::{AppError, AppResult};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::pin::Pin;
use std::time::Duration;
use tracing::{debug, info, instrument};

const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Serialize)]
struct OllamaRequest {
    model: String,
    prompt: String,
    stream: bool,
    #[serde(skip_serializing_if = "OllamaOptions::is_empty")]
    options: OllamaOptions,
}

#[derive(Debug, Default, Serialize)]
struct OllamaOptions {
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    num_predict: Option<u32>,
}

impl OllamaOptions {
    fn is_empty(&self) -> bool {
        self.temperature.is_none() && self.num_predict.is_none()
    }
}

/// One response object; streaming sends many, each on its own line.
#[derive(Debug, Deserialize)]
struct OllamaResponse {
    #[serde(default)]
    model: String,
    #[serde(default)]
    response: String,
    #[serde(default)]
    done: bool,
    #[serde(default)]
    prompt_eval_count: Option<u32>,
    #[serde(default)]
    eval_count: Option<u32>,
    #[serde(default)]
    error: Option<String>,
}

impl OllamaResponse {
    fn usage(&self) -> LlmUsage {
        LlmUsage::new(
            self.prompt_eval_count.unwrap_or(0),
            self.eval_count.unwrap_or(0),
        )
    }
}

/// Ollama generation client.
pub struct OllamaClient {
    base_url: String,
    /// Bounds a blocking completion, and the wait for a stream's response
    /// headers. An open stream runs until done or dropped.
    timeout: Duration,
    client: reqwest::Client,
}

impl OllamaClient {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> AppResult<Self> {
        let client = reqwest::Client::builder()
            .connect_timeout(CONNECT_TIMEOUT)
            .build()
            .map_err(|e| AppError::Config(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            timeout,
            client,
        })
    }

    fn to_ollama_request(&self, request: &LlmRequest, stream: bool) -> OllamaRequest {
        OllamaRequest {
            model: request.model.clone(),
            prompt: request.prompt.clone(),
            stream,
            options: OllamaOptions {
                temperature: request.temperature,
                num_predict: request.max_tokens,
            },
        }
    }

    fn generate_url(&self) -> String {
        format!("{}/api/generate", self.base_url)
    }

    async fn check_status(response: reqwest::Response) -> AppResult<reqwest::Response> {
        if response.status().is_success() {
            return Ok(response);
        }
        let status = response.status();
        let error_text = response
            .text()
            .await
            .unwrap_or_else(|_| "Unknown error".to_string());
        Err(AppError::Generation(format!(
            "Ollama API error ({}): {}",
            status, error_text
        )))
    }
}

#[async_trait::async_trait]
impl LlmClient for OllamaClient {
    fn provider_name(&self) -> &str {
        "ollama"
    }

    #[instrument(skip(self, request), fields(model = %request.model))]
    async fn complete(&self, request: &LlmRequest) -> AppResult<LlmResponse> {
        info!("Sending completion request to Ollama");

        let response = self
            .client
            .post(self.generate_url())
            .timeout(self.timeout)
            .json(&self.to_ollama_request(request, false))
            .send()
            .await
            .map_err(|e| AppError::Generation(format!("Failed to send request to Ollama: {}", e)))?;

        let response = Self::check_status(response).await?;

        let body: OllamaResponse = response
            .json()
            .await
            .map_err(|e| AppError::Generation(format!("Failed to parse Ollama response: {}", e)))?;

        if let Some(error) = &body.error {
            return Err(AppError::Generation(format!("Ollama error: {}", error)));
        }

        debug!(eval_count = ?body.eval_count, "Received completion from Ollama");

        let usage = body.usage();
        Ok(LlmResponse {
            content: body.response,
            model: body.model,
            usage,
            done: body.done,
        })
    }

    #[instrument(skip(self, request), fields(model = %request.model))]
    async fn stream(&self, request: &LlmRequest) -> AppResult<LlmStream> {
        info!("Starting streaming request to Ollama");

        let send = self
            .client
            .post(self.generate_url())
            .json(&self.to_ollama_request(request, true))
            .send();
        let response = tokio::time::timeout(self.timeout, send)
            .await
            .map_err(|_| {
                AppError::Generation(format!(
                    "Ollama did not start streaming within {}s",
                    self.timeout.as_secs_f64()
                ))
            })?
            .map_err(|e| AppError::Generation(format!("Failed to send streaming request: {}", e)))?;

        let response = Self::check_status(response).await?;

        let bytes = response
            .bytes_stream()
            .map(|result| result.map(|b| b.to_vec()).map_err(|e| e.to_string()));

        Ok(decode_ndjson(Box::pin(bytes)))
    }
}

/// Raw body stream as delivered by the HTTP client.
pub(crate) type ByteStream = Pin<Box<dyn Stream<Item = Result<Vec<u8>, String>> + Send>>;

/// Splits a byte stream into lines and parses each line as a response object.
///
/// Network reads do not respect line boundaries, so partial lines are
/// buffered until their newline arrives.
#[derive(Debug, Default)]
struct LineDecoder {
    buffer: Vec<u8>,
}

impl LineDecoder {
    fn push(&mut self, bytes: &[u8]) -> Vec<AppResult<LlmStreamChunk>> {
        self.buffer.extend_from_slice(bytes);

        let mut out = Vec::new();
        while let Some(pos) = self.buffer.iter().position(|b| *b == b'\n') {
            let line: Vec<u8> = self.buffer.drain(..=pos).collect();
            if let Some(chunk) = parse_line(&line) {
                out.push(chunk);
            }
        }
        out
    }

    fn finish(&mut self) -> Option<AppResult<LlmStreamChunk>> {
        let rest = std::mem::take(&mut self.buffer);
        parse_line(&rest)
    }
}

fn parse_line(line: &[u8]) -> Option<AppResult<LlmStreamChunk>> {
    let text = String::from_utf8_lossy(line);
    let text = text.trim();
    if text.is_empty() {
        return None;
    }

    let parsed = serde_json::from_str::<OllamaResponse>(text)
        .map_err(|e| AppError::Generation(format!("Failed to parse chunk: {}", e)))
        .and_then(|resp| {
            if let Some(error) = &resp.error {
                return Err(AppError::Generation(format!("Ollama error: {}", error)));
            }
            Ok(LlmStreamChunk {
                usage: resp.done.then(|| resp.usage()),
                content: resp.response,
                model: resp.model,
                done: resp.done,
            })
        });
    Some(parsed)
}

struct DecodeState {
    bytes: ByteStream,
    decoder: LineDecoder,
    pending: VecDeque<AppResult<LlmStreamChunk>>,
    finished: bool,
}

pub(crate) fn decode_ndjson(bytes: ByteStream) -> LlmStream {
    let state = DecodeState {
        bytes,
        decoder: LineDecoder::default(),
        pending: VecDeque::new(),
        finished: false,
    };

    Box::pin(futures::stream::unfold(state, |mut state| async move {
        loop {
            if let Some(item) = state.pending.pop_front() {
                return Some((item, state));
            }
            if state.finished {
                return None;
            }
            match state.bytes.next().await {
                Some(Ok(bytes)) => {
                    let decoded = state.decoder.push(&bytes);
                    state.pending.extend(decoded);
                }
                Some(Err(e)) => {
                    state.finished = true;
                    state
                        .pending
                        .push_back(Err(AppError::Generation(format!("Stream error: {}", e))));
                }
                None => {
                    state.finished = true;
                    state.pending.extend(state.decoder.finish());
                }
            }
        }
    }))
}
