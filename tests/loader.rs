use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

use assert_matches::assert_matches;
use camino::Utf8PathBuf;

use glossary_browser::app::{ProgressEvent, ProgressSink};
use glossary_browser::chunk::{ChunkResponse, ChunkSource};
use glossary_browser::domain::{Entry, EntryRecord};
use glossary_browser::error::GlossaryError;
use glossary_browser::loader::{DataLoader, LoadOrigin, LoadState};
use glossary_browser::store::{EntryTable, KeyValueStore, Store};
use glossary_browser::version::{VERSION_KEY, VersionGate};

struct NoopSink;

impl ProgressSink for NoopSink {
    fn event(&self, _event: ProgressEvent) {}
}

const BODY: &str = r#"[{"chinese":"龙","english":"dragon","novel":"N"},{"chinese":"剑","english":"sword","novel":"N"}]"#;

#[derive(Default)]
struct CountingSource {
    calls: AtomicUsize,
    fail: bool,
}

impl ChunkSource for CountingSource {
    fn fetch_chunk(&self, index: u32) -> Result<ChunkResponse, GlossaryError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.fail {
            return Err(GlossaryError::Http("connection refused".to_string()));
        }
        Ok(match index {
            1 => ChunkResponse::Body(BODY.to_string()),
            _ => ChunkResponse::NotFound,
        })
    }
}

struct SharedSource(Arc<CountingSource>);

impl ChunkSource for SharedSource {
    fn fetch_chunk(&self, index: u32) -> Result<ChunkResponse, GlossaryError> {
        self.0.fetch_chunk(index)
    }
}

struct FailingTable;

impl EntryTable for FailingTable {
    fn replace_all(&self, _entries: &[Entry]) -> Result<(), GlossaryError> {
        Err(GlossaryError::Storage("quota exceeded".to_string()))
    }

    fn read_all(&self) -> Result<Vec<Entry>, GlossaryError> {
        Err(GlossaryError::Storage("cannot open".to_string()))
    }
}

/// Blocks on chunk 1 until released.
struct GatedSource {
    release: Mutex<Receiver<()>>,
}

impl ChunkSource for GatedSource {
    fn fetch_chunk(&self, index: u32) -> Result<ChunkResponse, GlossaryError> {
        if index == 1 {
            let _ = self.release.lock().unwrap().recv();
            return Ok(ChunkResponse::Body(BODY.to_string()));
        }
        Ok(ChunkResponse::NotFound)
    }
}

fn temp_store() -> (tempfile::TempDir, Store) {
    let dir = tempfile::tempdir().unwrap();
    let root = Utf8PathBuf::from_path_buf(dir.path().join("cache")).unwrap();
    (dir, Store::new_with_root(root))
}

fn cached_entry(id: u64) -> Entry {
    Entry::new(
        id,
        EntryRecord {
            chinese: "旧".to_string(),
            english: "old".to_string(),
            novel: "Cached".to_string(),
        },
    )
}

#[test]
fn stamp_mismatch_loads_network_and_rewrites_cache() {
    let (_dir, store) = temp_store();
    store.set(VERSION_KEY, "v1").unwrap();
    store.replace_all(&[cached_entry(0)]).unwrap();

    let source = Arc::new(CountingSource::default());
    let loader = DataLoader::new(
        SharedSource(source.clone()),
        store.clone(),
        store.clone(),
        VersionGate::new("v2"),
    );
    let outcome = loader.initialize(&NoopSink).unwrap();

    assert_eq!(outcome.state, LoadState::Success);
    assert_eq!(outcome.origin, Some(LoadOrigin::Network));
    assert_eq!(outcome.entries.len(), 2);
    assert_eq!(source.calls.load(Ordering::SeqCst), 2);
    assert_eq!(store.read_all().unwrap(), outcome.entries);
    assert_eq!(store.get(VERSION_KEY).unwrap().as_deref(), Some("v2"));
}

#[test]
fn matching_stamp_uses_cache_without_network() {
    let (_dir, store) = temp_store();
    store.set(VERSION_KEY, "v2").unwrap();
    store.replace_all(&[cached_entry(0)]).unwrap();

    let source = Arc::new(CountingSource::default());
    let loader = DataLoader::new(
        SharedSource(source.clone()),
        store.clone(),
        store.clone(),
        VersionGate::new("v2"),
    );
    let outcome = loader.initialize(&NoopSink).unwrap();

    assert_eq!(outcome.origin, Some(LoadOrigin::Cache));
    assert_eq!(outcome.entries, vec![cached_entry(0)]);
    assert_eq!(source.calls.load(Ordering::SeqCst), 0);
}

#[test]
fn matching_stamp_with_empty_cache_goes_to_network() {
    let (_dir, store) = temp_store();
    store.set(VERSION_KEY, "v2").unwrap();

    let loader = DataLoader::new(
        CountingSource::default(),
        store.clone(),
        store.clone(),
        VersionGate::new("v2"),
    );
    let outcome = loader.initialize(&NoopSink).unwrap();
    assert_eq!(outcome.origin, Some(LoadOrigin::Network));
    assert_eq!(outcome.entries.len(), 2);
}

#[test]
fn cache_read_failure_falls_back_to_network() {
    let (_dir, store) = temp_store();
    store.set(VERSION_KEY, "v2").unwrap();

    let loader = DataLoader::new(
        CountingSource::default(),
        FailingTable,
        store.clone(),
        VersionGate::new("v2"),
    );
    let outcome = loader.initialize(&NoopSink).unwrap();
    assert_eq!(outcome.state, LoadState::Success);
    assert_eq!(outcome.origin, Some(LoadOrigin::Network));
}

#[test]
fn cache_write_failure_keeps_success() {
    let (_dir, store) = temp_store();
    let loader = DataLoader::new(
        CountingSource::default(),
        FailingTable,
        store.clone(),
        VersionGate::new("v2"),
    );
    let outcome = loader.initialize(&NoopSink).unwrap();
    assert_eq!(outcome.state, LoadState::Success);
    assert_eq!(outcome.entries.len(), 2);
    assert!(outcome.error.is_none());
    // The stamp must not vouch for a cache that was never written.
    assert_eq!(store.get(VERSION_KEY).unwrap(), None);
}

#[test]
fn force_refresh_bypasses_valid_cache() {
    let (_dir, store) = temp_store();
    store.set(VERSION_KEY, "v2").unwrap();
    store.replace_all(&[cached_entry(0)]).unwrap();

    let source = Arc::new(CountingSource::default());
    let loader = DataLoader::new(
        SharedSource(source.clone()),
        store.clone(),
        store.clone(),
        VersionGate::new("v2"),
    );
    let outcome = loader.force_refresh(&NoopSink).unwrap();
    assert_eq!(outcome.origin, Some(LoadOrigin::Network));
    assert_eq!(outcome.entries[0].english, "dragon");
    assert_eq!(store.read_all().unwrap().len(), 2);
}

#[test]
fn network_failure_is_error_state_with_no_entries() {
    let (_dir, store) = temp_store();
    let loader = DataLoader::new(
        CountingSource {
            fail: true,
            ..CountingSource::default()
        },
        store.clone(),
        store.clone(),
        VersionGate::new("v2"),
    );
    let outcome = loader.initialize(&NoopSink).unwrap();
    assert!(outcome.state.is_error());
    assert!(outcome.entries.is_empty());
    assert_matches!(outcome.into_entries(), Err(GlossaryError::Http(_)));
    assert!(!loader.is_loading());
}

#[test]
fn second_load_while_busy_is_rejected() {
    let (_dir, store) = temp_store();
    let (release, gate): (Sender<()>, Receiver<()>) = mpsc::channel();
    let loader = Arc::new(DataLoader::new(
        GatedSource {
            release: Mutex::new(gate),
        },
        store.clone(),
        store.clone(),
        VersionGate::new("v2"),
    ));

    let background = {
        let loader = Arc::clone(&loader);
        thread::spawn(move || loader.initialize(&NoopSink).map(|outcome| outcome.entries.len()))
    };
    while !loader.is_loading() {
        thread::sleep(Duration::from_millis(5));
    }

    assert_matches!(
        loader.force_refresh(&NoopSink),
        Err(GlossaryError::LoadInProgress)
    );

    release.send(()).unwrap();
    assert_eq!(background.join().unwrap().unwrap(), 2);
    assert!(!loader.is_loading());
}
