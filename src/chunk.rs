use std::thread;
use std::time::{Duration, Instant};

use reqwest::blocking::Client;
use reqwest::header::{HeaderMap, HeaderValue, USER_AGENT};
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::app::{ProgressEvent, ProgressSink};
use crate::domain::{Entry, EntryId, EntryRecord};
use crate::error::GlossaryError;

/// Outcome of requesting one numbered chunk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChunkResponse {
    Body(String),
    NotFound,
}

pub trait ChunkSource: Send + Sync {
    fn fetch_chunk(&self, index: u32) -> Result<ChunkResponse, GlossaryError>;
}

#[derive(Clone)]
pub struct HttpChunkSource {
    client: Client,
    base_url: String,
    version: String,
}

impl HttpChunkSource {
    pub fn new(
        base_url: &str,
        version: &str,
        timeout: Option<Duration>,
    ) -> Result<Self, GlossaryError> {
        let mut headers = HeaderMap::new();
        headers.insert(
            USER_AGENT,
            HeaderValue::from_str(&format!("glossary-browser/{}", env!("CARGO_PKG_VERSION")))
                .map_err(|err| GlossaryError::Http(err.to_string()))?,
        );
        let client = Client::builder()
            .default_headers(headers)
            .timeout(timeout)
            .build()
            .map_err(|err| GlossaryError::Http(err.to_string()))?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            version: version.to_string(),
        })
    }

    pub fn chunk_url(base_url: &str, index: u32, version: &str) -> String {
        format!(
            "{}/content/data{index}.json?v={version}",
            base_url.trim_end_matches('/')
        )
    }

    fn handle_status(
        index: u32,
        response: reqwest::blocking::Response,
    ) -> Result<ChunkResponse, GlossaryError> {
        let status = response.status();
        if status == reqwest::StatusCode::NOT_FOUND {
            return Ok(ChunkResponse::NotFound);
        }
        if status.is_success() {
            let body = response
                .text()
                .map_err(|err| GlossaryError::Http(err.to_string()))?;
            return Ok(ChunkResponse::Body(body));
        }
        let message = response
            .text()
            .unwrap_or_else(|_| "chunk request failed".to_string());
        Err(GlossaryError::HttpStatus {
            chunk: index,
            status: status.as_u16(),
            message,
        })
    }

    fn send_with_retries<F>(
        &self,
        mut make_req: F,
    ) -> Result<reqwest::blocking::Response, GlossaryError>
    where
        F: FnMut() -> reqwest::blocking::RequestBuilder,
    {
        const MAX_RETRIES: usize = 3;
        const BASE_DELAY_MS: u64 = 200;
        let mut attempt = 0usize;
        loop {
            match make_req().send() {
                Ok(resp) => {
                    let status = resp.status().as_u16();
                    if attempt < MAX_RETRIES && is_retryable_status(status) {
                        let delay = BASE_DELAY_MS * (attempt as u64 + 1);
                        debug!(status, attempt, "retrying chunk request");
                        thread::sleep(Duration::from_millis(delay));
                        attempt += 1;
                        continue;
                    }
                    return Ok(resp);
                }
                Err(err) => {
                    if attempt < MAX_RETRIES && is_retryable_error(&err) {
                        let delay = BASE_DELAY_MS * (attempt as u64 + 1);
                        debug!(error = %err, attempt, "retrying chunk request");
                        thread::sleep(Duration::from_millis(delay));
                        attempt += 1;
                        continue;
                    }
                    return Err(GlossaryError::Http(err.to_string()));
                }
            }
        }
    }
}

impl ChunkSource for HttpChunkSource {
    fn fetch_chunk(&self, index: u32) -> Result<ChunkResponse, GlossaryError> {
        let url = Self::chunk_url(&self.base_url, index, &self.version);
        let start = Instant::now();
        let response = self.send_with_retries(|| self.client.get(&url))?;
        debug!(
            index,
            status = response.status().as_u16(),
            latency_ms = start.elapsed().as_millis() as u64,
            "chunk response"
        );
        Self::handle_status(index, response)
    }
}

fn is_retryable_status(status: u16) -> bool {
    matches!(status, 429 | 500 | 502 | 503 | 504)
}

fn is_retryable_error(err: &reqwest::Error) -> bool {
    err.is_timeout() || err.is_connect() || err.is_request()
}

/// Records recovered from one chunk body.
#[derive(Debug, Default)]
pub struct ParsedChunk {
    pub records: Vec<Value>,
    /// Fragments that were not valid JSON.
    pub failed_fragments: usize,
}

/// Lenient parse of a chunk body.
///
/// The data host sometimes emits several top-level arrays back to back
/// (`[...][...]`). The body is split at every `][` adjacency and each
/// fragment is parsed on its own. Blank fragments are skipped, fragments
/// that parse to something other than an array are dropped, and fragments
/// that fail to parse are counted in `failed_fragments`.
pub fn parse_chunk(text: &str) -> ParsedChunk {
    let mut parsed = ParsedChunk::default();
    for fragment in split_fragments(text) {
        let fragment = fragment.trim();
        if fragment.is_empty() {
            continue;
        }
        match serde_json::from_str::<Value>(fragment) {
            Ok(Value::Array(items)) => parsed.records.extend(items),
            Ok(_) => debug!("dropping non-array chunk fragment"),
            Err(err) => {
                warn!(error = %err, "dropping malformed chunk fragment");
                parsed.failed_fragments += 1;
            }
        }
    }
    parsed
}

fn split_fragments(text: &str) -> Vec<&str> {
    let mut fragments = Vec::new();
    let mut start = 0;
    for (pos, _) in text.match_indices("][") {
        fragments.push(&text[start..=pos]);
        start = pos + 1;
    }
    fragments.push(&text[start..]);
    fragments
}

/// Turns raw records into entries numbered by their position.
///
/// Elements that are not objects with string fields are skipped before
/// numbering, so ids stay dense.
pub fn assign_ids(records: Vec<Value>) -> Vec<Entry> {
    let mut entries = Vec::with_capacity(records.len());
    for value in records {
        if !value.is_object() {
            warn!("skipping non-object glossary record");
            continue;
        }
        match serde_json::from_value::<EntryRecord>(value) {
            Ok(record) => {
                let id = entries.len() as EntryId;
                entries.push(Entry::new(id, record));
            }
            Err(err) => warn!(error = %err, "skipping glossary record with invalid fields"),
        }
    }
    entries
}

pub struct ChunkFetcher<S: ChunkSource> {
    source: S,
}

impl<S: ChunkSource> ChunkFetcher<S> {
    pub fn new(source: S) -> Self {
        Self { source }
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    /// Fetches chunks 1, 2, 3, ... until the host reports one missing.
    ///
    /// Chunk 1 must exist. Any status other than success or a terminating
    /// not-found is fatal.
    pub fn fetch_all(&self, sink: &dyn ProgressSink) -> Result<Vec<Entry>, GlossaryError> {
        let started = Instant::now();
        let mut records = Vec::new();
        let mut failed_fragments = 0usize;
        let mut index = 1u32;
        loop {
            sink.event(ProgressEvent {
                message: format!("phase=Fetch; chunk {index}"),
                elapsed: Some(started.elapsed()),
            });
            let body = match self.source.fetch_chunk(index)? {
                ChunkResponse::Body(body) => body,
                ChunkResponse::NotFound if index > 1 => break,
                ChunkResponse::NotFound => return Err(GlossaryError::MissingFirstChunk),
            };
            let parsed = parse_chunk(&body);
            debug!(index, records = parsed.records.len(), "chunk parsed");
            failed_fragments += parsed.failed_fragments;
            records.extend(parsed.records);
            sink.event(ProgressEvent {
                message: format!("chunk {index} done, {} records", records.len()),
                elapsed: Some(started.elapsed()),
            });
            index += 1;
        }

        if records.is_empty() && failed_fragments > 0 {
            return Err(GlossaryError::MalformedData(format!(
                "{failed_fragments} fragment(s) failed to parse and no records were loaded"
            )));
        }

        let entries = assign_ids(records);
        info!(
            chunks = index - 1,
            entries = entries.len(),
            "glossary fetched from network"
        );
        Ok(entries)
    }
}
