use std::collections::BTreeSet;

use camino::{Utf8Path, Utf8PathBuf};
use tracing::{info, warn};

use crate::domain::{Entry, EntryId};
use crate::error::GlossaryError;
use crate::export::{self, UPDATED_GLOSSARY_FILE};
use crate::store::KeyValueStore;

pub const HIDDEN_KEY: &str = "hiddenGlossaryEntryIds";

/// Hidden ids (persisted) and the session's pending deletions (memory only).
///
/// Ids are positions in the current load, so both sets are only
/// meaningful against the data version they were recorded with.
pub struct MutationTracker<K: KeyValueStore> {
    settings: K,
    hidden: BTreeSet<EntryId>,
    pending: BTreeSet<EntryId>,
}

impl<K: KeyValueStore> MutationTracker<K> {
    /// Restores the hidden set. An unreadable record starts empty.
    pub fn load(settings: K) -> Self {
        let hidden = match settings.get(HIDDEN_KEY) {
            Ok(Some(raw)) => serde_json::from_str::<Vec<EntryId>>(&raw)
                .map(|ids| ids.into_iter().collect())
                .unwrap_or_else(|err| {
                    warn!(error = %err, "ignoring corrupt hidden entry record");
                    BTreeSet::new()
                }),
            Ok(None) => BTreeSet::new(),
            Err(err) => {
                warn!(error = %err, "failed to read hidden entry record");
                BTreeSet::new()
            }
        };
        Self {
            settings,
            hidden,
            pending: BTreeSet::new(),
        }
    }

    pub fn hidden(&self) -> &BTreeSet<EntryId> {
        &self.hidden
    }

    pub fn pending(&self) -> &BTreeSet<EntryId> {
        &self.pending
    }

    pub fn is_hidden(&self, id: EntryId) -> bool {
        self.hidden.contains(&id)
    }

    pub fn is_pending(&self, id: EntryId) -> bool {
        self.pending.contains(&id)
    }

    /// Adds `id` to the hidden set and persists the whole set.
    ///
    /// The in-memory set keeps the id even when persisting fails.
    pub fn hide(&mut self, id: EntryId) -> Result<(), GlossaryError> {
        self.hidden.insert(id);
        let ids: Vec<EntryId> = self.hidden.iter().copied().collect();
        let raw =
            serde_json::to_string(&ids).map_err(|err| GlossaryError::Storage(err.to_string()))?;
        self.settings.set(HIDDEN_KEY, &raw).inspect_err(|err| {
            warn!(error = %err, id, "failed to persist hidden entries");
        })
    }

    pub fn unhide_all(&mut self) -> Result<(), GlossaryError> {
        self.hidden.clear();
        self.settings.remove(HIDDEN_KEY).inspect_err(|err| {
            warn!(error = %err, "failed to erase hidden entries");
        })
    }

    /// Flips the pending-deletion mark; returns whether `id` is now marked.
    pub fn toggle_delete(&mut self, id: EntryId) -> bool {
        if self.pending.remove(&id) {
            false
        } else {
            self.pending.insert(id);
            true
        }
    }

    pub fn clear_deletions(&mut self) {
        self.pending.clear();
    }

    /// Pretty JSON of `entries` without pending deletions and without ids.
    pub fn render_update(&self, entries: &[Entry]) -> Result<String, GlossaryError> {
        export::updated_glossary_json(entries, &self.pending)
    }

    /// Writes the updated glossary into `dir` and clears the pending set.
    ///
    /// The save is synchronous, so the pending set is only cleared once the
    /// file is in place. A failed write returns the error and keeps every
    /// mark so the deletion can be confirmed again.
    pub fn export_and_clear(
        &mut self,
        entries: &[Entry],
        dir: &Utf8Path,
    ) -> Result<Utf8PathBuf, GlossaryError> {
        let document = self.render_update(entries)?;
        let path = export::save(dir, UPDATED_GLOSSARY_FILE, document.as_bytes())?;
        info!(
            removed = self.pending.len(),
            path = %path,
            "exported updated glossary"
        );
        self.pending.clear();
        Ok(path)
    }
}
