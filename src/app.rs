use std::sync::Arc;
use std::time::Duration;

use camino::{Utf8Path, Utf8PathBuf};
use serde::Serialize;
use tracing::{info, warn};

use crate::chunk::ChunkSource;
use crate::domain::{Entry, EntryId, Theme, WorkFilter};
use crate::error::GlossaryError;
use crate::export;
use crate::loader::{DataLoader, LoadOrigin, LoadOutcome, LoadState};
use crate::mutation::MutationTracker;
use crate::pipeline::{self, Pagination, ViewCache, ViewKey};
use crate::store::{EntryTable, KeyValueStore};

#[derive(Debug, Clone)]
pub struct ProgressEvent {
    pub message: String,
    pub elapsed: Option<Duration>,
}

pub trait ProgressSink {
    fn event(&self, event: ProgressEvent);
}

#[derive(Debug, Clone, Serialize)]
pub struct LoadSummary {
    pub state: String,
    pub origin: Option<LoadOrigin>,
    pub entries: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct SearchResult {
    pub total: usize,
    pub shown: usize,
    pub entries: Vec<Entry>,
}

#[derive(Debug, Clone, Serialize)]
pub struct WorksResult {
    pub works: Vec<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ExportResult {
    pub path: String,
    pub rows: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct HiddenResult {
    pub hidden: Vec<EntryId>,
}

/// User intents emitted by the rendering layer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Intent {
    SetSearch(String),
    SelectWork(WorkFilter),
    ToggleTheme,
    Hide(EntryId),
    UnhideAll,
    ToggleDelete(EntryId),
    ConfirmDeletion,
    ClearDeletions,
    RequestMore,
    ExportCsv,
    ForceRefresh,
    Retry,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadKind {
    Initialize,
    Refresh,
}

/// Work the driver has to carry out after an intent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Effect {
    None,
    Load(LoadKind),
    Saved(Utf8PathBuf),
}

pub type SharedLoader<S, T, K> = Arc<DataLoader<S, T, K>>;

/// Session state of one glossary browser.
pub struct App<S: ChunkSource, T: EntryTable, K: KeyValueStore> {
    loader: SharedLoader<S, T, K>,
    mutations: MutationTracker<K>,
    entries: Vec<Entry>,
    entries_rev: u64,
    hidden_rev: u64,
    state: LoadState,
    origin: Option<LoadOrigin>,
    search: String,
    work: WorkFilter,
    theme: Theme,
    pagination: Pagination,
    view: ViewCache,
    status: Option<String>,
    export_dir: Utf8PathBuf,
}

impl<S: ChunkSource, T: EntryTable, K: KeyValueStore> App<S, T, K> {
    pub fn new(
        loader: DataLoader<S, T, K>,
        mutations: MutationTracker<K>,
        theme: Theme,
        page_size: usize,
        export_dir: Utf8PathBuf,
    ) -> Self {
        Self {
            loader: Arc::new(loader),
            mutations,
            entries: Vec::new(),
            entries_rev: 0,
            hidden_rev: 0,
            state: LoadState::Loading,
            origin: None,
            search: String::new(),
            work: WorkFilter::All,
            theme,
            pagination: Pagination::new(page_size),
            view: ViewCache::default(),
            status: None,
            export_dir,
        }
    }

    pub fn loader(&self) -> SharedLoader<S, T, K> {
        Arc::clone(&self.loader)
    }

    pub fn entries(&self) -> &[Entry] {
        &self.entries
    }

    pub fn state(&self) -> &LoadState {
        &self.state
    }

    pub fn origin(&self) -> Option<LoadOrigin> {
        self.origin
    }

    pub fn search(&self) -> &str {
        &self.search
    }

    pub fn work(&self) -> &WorkFilter {
        &self.work
    }

    pub fn theme(&self) -> Theme {
        self.theme
    }

    pub fn pagination(&self) -> Pagination {
        self.pagination
    }

    pub fn mutations(&self) -> &MutationTracker<K> {
        &self.mutations
    }

    pub fn status(&self) -> Option<&str> {
        self.status.as_deref()
    }

    pub fn export_dir(&self) -> &Utf8Path {
        &self.export_dir
    }

    pub fn summary(&self) -> LoadSummary {
        LoadSummary {
            state: self.state.to_string(),
            origin: self.origin,
            entries: self.entries.len(),
        }
    }

    /// Marks a load as started and returns the state it replaced.
    pub fn begin_load(&mut self) -> LoadState {
        self.status = None;
        std::mem::replace(&mut self.state, LoadState::Loading)
    }

    /// Puts back the state a rejected load replaced.
    pub fn cancel_load(&mut self, previous: LoadState, reason: &GlossaryError) {
        self.state = previous;
        self.status = Some(reason.to_string());
    }

    /// Adopts a finished load. A failed load keeps the current entries.
    pub fn apply_load(&mut self, outcome: LoadOutcome) {
        match outcome.state {
            LoadState::Success => {
                self.entries = outcome.entries;
                self.entries_rev += 1;
                self.origin = outcome.origin;
                self.pagination.reset();
                self.view.invalidate();
                self.state = LoadState::Success;
            }
            state => self.state = state,
        }
    }

    /// Runs a load on the calling thread. A failed load is applied as the
    /// error state and its cause is returned.
    pub fn run_load(&mut self, kind: LoadKind, sink: &dyn ProgressSink) -> Result<(), GlossaryError> {
        let loader = self.loader();
        let previous = self.begin_load();
        let result = match kind {
            LoadKind::Initialize => loader.initialize(sink),
            LoadKind::Refresh => loader.force_refresh(sink),
        };
        match result {
            Ok(mut outcome) => {
                let error = outcome.error.take();
                self.apply_load(outcome);
                match error {
                    Some(err) => Err(err),
                    None => Ok(()),
                }
            }
            Err(err) => {
                self.cancel_load(previous, &err);
                Err(err)
            }
        }
    }

    pub fn dispatch(&mut self, intent: Intent) -> Effect {
        match intent {
            Intent::SetSearch(text) => {
                if text != self.search {
                    self.search = text;
                    self.pagination.reset();
                }
                Effect::None
            }
            Intent::SelectWork(work) => {
                if work != self.work {
                    self.work = work;
                    self.pagination.reset();
                }
                Effect::None
            }
            Intent::ToggleTheme => {
                self.theme = self.theme.toggled();
                Effect::None
            }
            Intent::Hide(id) => {
                self.status = Some(match self.hide(id) {
                    Ok(()) => format!("Hidden entry {id}"),
                    Err(err) => format!("Hidden entry {id} for this session only: {err}"),
                });
                Effect::None
            }
            Intent::UnhideAll => {
                self.status = Some(match self.unhide_all() {
                    Ok(()) => "All entries visible".to_string(),
                    Err(err) => format!("All entries visible, but saving failed: {err}"),
                });
                Effect::None
            }
            Intent::ToggleDelete(id) => {
                let marked = self.mutations.toggle_delete(id);
                self.status = Some(if marked {
                    format!("Entry {id} marked for deletion")
                } else {
                    format!("Entry {id} unmarked")
                });
                Effect::None
            }
            Intent::ConfirmDeletion => match self.confirm_deletion() {
                Ok(result) => {
                    self.status = Some(format!(
                        "Saved {} remaining entries to {}",
                        result.rows, result.path
                    ));
                    Effect::Saved(Utf8PathBuf::from(result.path))
                }
                Err(err) => {
                    warn!(error = %err, "deletion export failed");
                    self.status = Some(err.to_string());
                    Effect::None
                }
            },
            Intent::ClearDeletions => {
                self.mutations.clear_deletions();
                self.status = Some("Pending deletions cleared".to_string());
                Effect::None
            }
            Intent::RequestMore => {
                self.pagination.load_more();
                Effect::None
            }
            Intent::ExportCsv => match self.export_csv() {
                Ok(result) => {
                    self.status = Some(format!("Saved {} rows to {}", result.rows, result.path));
                    Effect::Saved(Utf8PathBuf::from(result.path))
                }
                Err(err) => {
                    self.status = Some(err.to_string());
                    Effect::None
                }
            },
            Intent::ForceRefresh => self.request_load(LoadKind::Refresh),
            Intent::Retry => self.request_load(LoadKind::Initialize),
        }
    }

    /// Hides `id`. The entry stays hidden for the session even when the
    /// hidden set could not be saved.
    pub fn hide(&mut self, id: EntryId) -> Result<(), GlossaryError> {
        let result = self.mutations.hide(id);
        self.hidden_rev += 1;
        result
    }

    pub fn unhide_all(&mut self) -> Result<(), GlossaryError> {
        let result = self.mutations.unhide_all();
        self.hidden_rev += 1;
        result
    }

    /// Saves the entry set minus pending deletions and clears the marks.
    pub fn confirm_deletion(&mut self) -> Result<ExportResult, GlossaryError> {
        let rows = self
            .entries
            .iter()
            .filter(|entry| !self.mutations.is_pending(entry.id))
            .count();
        let path = self
            .mutations
            .export_and_clear(&self.entries, &self.export_dir)?;
        Ok(ExportResult {
            path: path.to_string(),
            rows,
        })
    }

    fn request_load(&mut self, kind: LoadKind) -> Effect {
        if self.loader.is_loading() {
            self.status = Some(GlossaryError::LoadInProgress.to_string());
            return Effect::None;
        }
        Effect::Load(kind)
    }

    fn view_key(&self) -> ViewKey {
        ViewKey {
            entries_rev: self.entries_rev,
            hidden_rev: self.hidden_rev,
            search: pipeline::normalize_search(&self.search),
            work: self.work.clone(),
        }
    }

    /// Every entry of the current view, ranked.
    pub fn results(&mut self) -> Vec<&Entry> {
        let key = self.view_key();
        let positions = self.view.results(key, &self.entries, self.mutations.hidden());
        positions.iter().map(|&pos| &self.entries[pos]).collect()
    }

    pub fn total_results(&mut self) -> usize {
        let key = self.view_key();
        self.view
            .results(key, &self.entries, self.mutations.hidden())
            .len()
    }

    /// The paginated window of the current view.
    pub fn visible_page(&mut self) -> Vec<&Entry> {
        let key = self.view_key();
        let positions = self.view.results(key, &self.entries, self.mutations.hidden());
        self.pagination
            .window(positions)
            .iter()
            .map(|&pos| &self.entries[pos])
            .collect()
    }

    pub fn works(&mut self) -> &[String] {
        self.view.works(
            self.entries_rev,
            self.hidden_rev,
            &self.entries,
            self.mutations.hidden(),
        )
    }

    pub fn selector_works(&mut self, query: &str) -> Vec<String> {
        pipeline::filter_works(self.works(), query)
            .into_iter()
            .map(str::to_string)
            .collect()
    }

    pub fn search_result(&mut self) -> SearchResult {
        let total = self.total_results();
        let entries: Vec<Entry> = self.visible_page().into_iter().cloned().collect();
        SearchResult {
            total,
            shown: entries.len(),
            entries,
        }
    }

    pub fn export_csv(&mut self) -> Result<ExportResult, GlossaryError> {
        let dir = self.export_dir.clone();
        let work = self.work.clone();
        let results = self.results();
        let rows = results.len();
        let path = export::export_csv(&dir, &work, results)?;
        info!(rows, path = %path, "exported CSV");
        Ok(ExportResult {
            path: path.to_string(),
            rows,
        })
    }
}
