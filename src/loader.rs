use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Instant;

use serde::Serialize;
use tracing::{info, warn};

use crate::app::{ProgressEvent, ProgressSink};
use crate::chunk::{ChunkFetcher, ChunkSource};
use crate::domain::Entry;
use crate::error::GlossaryError;
use crate::store::{EntryTable, KeyValueStore};
use crate::version::VersionGate;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoadState {
    Loading,
    Success,
    Error(String),
}

impl LoadState {
    pub fn is_error(&self) -> bool {
        matches!(self, LoadState::Error(_))
    }
}

impl fmt::Display for LoadState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LoadState::Loading => write!(f, "loading"),
            LoadState::Success => write!(f, "success"),
            LoadState::Error(message) => write!(f, "error: {message}"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LoadOrigin {
    Cache,
    Network,
}

#[derive(Debug)]
pub struct LoadOutcome {
    pub entries: Vec<Entry>,
    pub state: LoadState,
    pub origin: Option<LoadOrigin>,
    pub error: Option<GlossaryError>,
}

impl LoadOutcome {
    fn success(entries: Vec<Entry>, origin: LoadOrigin) -> Self {
        Self {
            entries,
            state: LoadState::Success,
            origin: Some(origin),
            error: None,
        }
    }

    fn failure(error: GlossaryError) -> Self {
        Self {
            entries: Vec::new(),
            state: LoadState::Error(error.to_string()),
            origin: None,
            error: Some(error),
        }
    }

    pub fn into_entries(self) -> Result<Vec<Entry>, GlossaryError> {
        match self.error {
            Some(err) => Err(err),
            None => Ok(self.entries),
        }
    }
}

/// Assembles the entry set from the local cache or the network.
///
/// At most one load runs at a time; a second call while one is in flight
/// is rejected with [`GlossaryError::LoadInProgress`].
pub struct DataLoader<S: ChunkSource, T: EntryTable, K: KeyValueStore> {
    fetcher: ChunkFetcher<S>,
    table: T,
    settings: K,
    gate: VersionGate,
    in_flight: AtomicBool,
}

struct FlightGuard<'a>(&'a AtomicBool);

impl Drop for FlightGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

impl<S: ChunkSource, T: EntryTable, K: KeyValueStore> DataLoader<S, T, K> {
    pub fn new(source: S, table: T, settings: K, gate: VersionGate) -> Self {
        Self {
            fetcher: ChunkFetcher::new(source),
            table,
            settings,
            gate,
            in_flight: AtomicBool::new(false),
        }
    }

    pub fn is_loading(&self) -> bool {
        self.in_flight.load(Ordering::Acquire)
    }

    pub fn gate(&self) -> &VersionGate {
        &self.gate
    }

    pub fn fetcher(&self) -> &ChunkFetcher<S> {
        &self.fetcher
    }

    /// Uses the cache when its version stamp matches and it holds entries,
    /// otherwise loads from the network.
    pub fn initialize(&self, sink: &dyn ProgressSink) -> Result<LoadOutcome, GlossaryError> {
        let _guard = self.begin()?;
        sink.event(ProgressEvent {
            message: "phase=Cache; checking local cache".to_string(),
            elapsed: None,
        });

        if self.gate.is_current(&self.settings) {
            match self.table.read_all() {
                Ok(entries) if !entries.is_empty() => {
                    info!(entries = entries.len(), "glossary loaded from cache");
                    sink.event(ProgressEvent {
                        message: format!("phase=Done; {} entries from cache", entries.len()),
                        elapsed: None,
                    });
                    return Ok(LoadOutcome::success(entries, LoadOrigin::Cache));
                }
                Ok(_) => info!("cache is empty, loading from network"),
                Err(err) => warn!(error = %err, "cache read failed, loading from network"),
            }
        } else {
            info!(expected = self.gate.expected(), "cache version mismatch, loading from network");
        }

        Ok(self.load_from_network(sink))
    }

    /// Always loads from the network and rewrites the cache on success.
    pub fn force_refresh(&self, sink: &dyn ProgressSink) -> Result<LoadOutcome, GlossaryError> {
        let _guard = self.begin()?;
        info!("forced refresh");
        Ok(self.load_from_network(sink))
    }

    fn begin(&self) -> Result<FlightGuard<'_>, GlossaryError> {
        self.in_flight
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .map_err(|_| GlossaryError::LoadInProgress)?;
        Ok(FlightGuard(&self.in_flight))
    }

    fn load_from_network(&self, sink: &dyn ProgressSink) -> LoadOutcome {
        let started = Instant::now();
        let entries = match self.fetcher.fetch_all(sink) {
            Ok(entries) => entries,
            Err(err) => {
                warn!(error = %err, "glossary load failed");
                sink.event(ProgressEvent {
                    message: format!("phase=Error; {err}"),
                    elapsed: Some(started.elapsed()),
                });
                return LoadOutcome::failure(err);
            }
        };

        sink.event(ProgressEvent {
            message: "phase=Store; writing local cache".to_string(),
            elapsed: Some(started.elapsed()),
        });
        self.persist(&entries);
        sink.event(ProgressEvent {
            message: format!("phase=Done; {} entries from network", entries.len()),
            elapsed: Some(started.elapsed()),
        });
        LoadOutcome::success(entries, LoadOrigin::Network)
    }

    // Best effort: a failed write leaves the loaded entries in place.
    fn persist(&self, entries: &[Entry]) {
        if let Err(err) = self.table.replace_all(entries) {
            warn!(error = %err, "failed to write entry cache");
            return;
        }
        if let Err(err) = self.gate.record(&self.settings) {
            warn!(error = %err, "failed to write cache version stamp");
        }
    }
}
