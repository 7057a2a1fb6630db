use std::collections::HashMap;
use std::sync::Mutex;

use assert_matches::assert_matches;

use glossary_browser::app::{ProgressEvent, ProgressSink};
use glossary_browser::chunk::{ChunkFetcher, ChunkResponse, ChunkSource, parse_chunk};
use glossary_browser::error::GlossaryError;

struct NoopSink;

impl ProgressSink for NoopSink {
    fn event(&self, _event: ProgressEvent) {}
}

enum Scripted {
    Body(&'static str),
    Status(u16),
}

#[derive(Default)]
struct MockSource {
    chunks: HashMap<u32, Scripted>,
    calls: Mutex<Vec<u32>>,
}

impl MockSource {
    fn with(mut self, index: u32, chunk: Scripted) -> Self {
        self.chunks.insert(index, chunk);
        self
    }
}

impl ChunkSource for MockSource {
    fn fetch_chunk(&self, index: u32) -> Result<ChunkResponse, GlossaryError> {
        self.calls.lock().unwrap().push(index);
        match self.chunks.get(&index) {
            Some(Scripted::Body(body)) => Ok(ChunkResponse::Body(body.to_string())),
            Some(Scripted::Status(status)) => Err(GlossaryError::HttpStatus {
                chunk: index,
                status: *status,
                message: "scripted".to_string(),
            }),
            None => Ok(ChunkResponse::NotFound),
        }
    }
}

const CHUNK_ONE: &str = r#"[{"chinese":"龙","english":"dragon","novel":"Coiling Dragon"}]"#;
const CHUNK_TWO: &str = r#"[{"chinese":"剑","english":"sword","novel":"Coiling Dragon"}][{"chinese":"气","english":"qi","novel":"Battle Through"}]"#;

#[test]
fn repairs_back_to_back_arrays() {
    assert_eq!(parse_chunk(r#"[{"a":1}][{"a":2}]"#).records.len(), 2);
    assert_eq!(parse_chunk(r#"[{"a":1}]"#).records.len(), 1);
    assert_eq!(parse_chunk("").records.len(), 0);
}

#[test]
fn concatenates_chunks_until_not_found() {
    let source = MockSource::default()
        .with(1, Scripted::Body(CHUNK_ONE))
        .with(2, Scripted::Body(CHUNK_TWO));
    let fetcher = ChunkFetcher::new(source);

    let entries = fetcher.fetch_all(&NoopSink).unwrap();
    let ids: Vec<u64> = entries.iter().map(|entry| entry.id).collect();
    assert_eq!(ids, vec![0, 1, 2]);
    assert_eq!(entries[0].english, "dragon");
    assert_eq!(entries[2].novel, "Battle Through");
    assert_eq!(*fetcher.source().calls.lock().unwrap(), vec![1, 2, 3]);
}

#[test]
fn missing_first_chunk_is_fatal() {
    let fetcher = ChunkFetcher::new(MockSource::default());
    let err = fetcher.fetch_all(&NoopSink).unwrap_err();
    assert_matches!(err, GlossaryError::MissingFirstChunk);
    assert!(err.is_network());
}

#[test]
fn second_chunk_not_found_ends_sequence() {
    let source = MockSource::default().with(1, Scripted::Body(CHUNK_ONE));
    let entries = ChunkFetcher::new(source).fetch_all(&NoopSink).unwrap();
    assert_eq!(entries.len(), 1);
}

#[test]
fn server_error_on_later_chunk_is_fatal() {
    let source = MockSource::default()
        .with(1, Scripted::Body(CHUNK_ONE))
        .with(2, Scripted::Status(500));
    let err = ChunkFetcher::new(source).fetch_all(&NoopSink).unwrap_err();
    assert_matches!(err, GlossaryError::HttpStatus { chunk: 2, status: 500, .. });
}

#[test]
fn empty_chunk_contributes_nothing() {
    let source = MockSource::default()
        .with(1, Scripted::Body(""))
        .with(2, Scripted::Body(CHUNK_ONE));
    let entries = ChunkFetcher::new(source).fetch_all(&NoopSink).unwrap();
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].id, 0);
}

#[test]
fn malformed_fragment_dropped_when_others_load() {
    let source = MockSource::default()
        .with(1, Scripted::Body(CHUNK_ONE))
        .with(2, Scripted::Body("[{\"chinese\":"));
    let entries = ChunkFetcher::new(source).fetch_all(&NoopSink).unwrap();
    assert_eq!(entries.len(), 1);
}

#[test]
fn only_malformed_data_is_an_error() {
    let source = MockSource::default().with(1, Scripted::Body("[{\"chinese\":"));
    let err = ChunkFetcher::new(source).fetch_all(&NoopSink).unwrap_err();
    assert_matches!(err, GlossaryError::MalformedData(_));
}

#[test]
fn missing_fields_default_to_empty() {
    let source = MockSource::default().with(1, Scripted::Body(r#"[{"a":1}][{"a":2}]"#));
    let entries = ChunkFetcher::new(source).fetch_all(&NoopSink).unwrap();
    assert_eq!(entries.len(), 2);
    assert_eq!(entries[1].id, 1);
    assert!(entries[1].chinese.is_empty());
}
