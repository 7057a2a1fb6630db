//! Pure view transforms over the loaded entries.
//!
//! Every function here is deterministic in its inputs. [`ViewCache`] only
//! memoizes the last result per input key so redraws stay cheap.

use std::collections::{BTreeSet, HashSet};

use crate::domain::{Entry, EntryId, WorkFilter};

/// How far one "load more" extends the visible window.
pub const LOAD_MORE_STEP: usize = 100;

pub fn visible<'a>(
    entries: &'a [Entry],
    hidden: &'a BTreeSet<EntryId>,
) -> impl Iterator<Item = &'a Entry> + 'a {
    entries.iter().filter(move |entry| !hidden.contains(&entry.id))
}

/// Distinct works among non-hidden entries, sorted.
pub fn distinct_works(entries: &[Entry], hidden: &BTreeSet<EntryId>) -> Vec<String> {
    let mut seen = HashSet::new();
    let mut works: Vec<String> = visible(entries, hidden)
        .filter(|entry| seen.insert(entry.novel.as_str()))
        .map(|entry| entry.novel.clone())
        .collect();
    works.sort();
    works
}

/// Narrows the work selector list by a case-insensitive substring.
pub fn filter_works<'a>(works: &'a [String], query: &str) -> Vec<&'a str> {
    let needle = query.trim().to_lowercase();
    works
        .iter()
        .filter(|work| needle.is_empty() || work.to_lowercase().contains(&needle))
        .map(String::as_str)
        .collect()
}

pub fn normalize_search(text: &str) -> String {
    text.trim().to_lowercase()
}

/// Positions (into `entries`) of the filtered, searched and ranked view.
///
/// With a search term, exact matches on either field come first; within
/// each group shorter matched fields come first and ties keep load order.
pub fn filter_and_sort_positions(
    entries: &[Entry],
    hidden: &BTreeSet<EntryId>,
    search: &str,
    work: &WorkFilter,
) -> Vec<usize> {
    let term = normalize_search(search);
    let candidates = entries
        .iter()
        .enumerate()
        .filter(|(_, entry)| !hidden.contains(&entry.id))
        .filter(|(_, entry)| work.matches(&entry.novel));

    if term.is_empty() {
        return candidates.map(|(pos, _)| pos).collect();
    }

    let mut ranked: Vec<(usize, bool, usize)> = candidates
        .filter_map(|(pos, entry)| {
            let chinese = entry.chinese.to_lowercase();
            let english = entry.english.to_lowercase();
            let in_chinese = chinese.contains(&term);
            if !in_chinese && !english.contains(&term) {
                return None;
            }
            let exact = chinese == term || english == term;
            let matched_len = if in_chinese {
                chinese.chars().count()
            } else {
                english.chars().count()
            };
            Some((pos, exact, matched_len))
        })
        .collect();

    ranked.sort_by_key(|&(_, exact, matched_len)| (!exact, matched_len));
    ranked.into_iter().map(|(pos, _, _)| pos).collect()
}

pub fn filter_and_sort<'a>(
    entries: &'a [Entry],
    hidden: &BTreeSet<EntryId>,
    search: &str,
    work: &WorkFilter,
) -> Vec<&'a Entry> {
    filter_and_sort_positions(entries, hidden, search, work)
        .into_iter()
        .map(|pos| &entries[pos])
        .collect()
}

/// Externally held display window over the filtered results.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pagination {
    page_size: usize,
    display_count: usize,
}

impl Pagination {
    pub fn new(page_size: usize) -> Self {
        let page_size = page_size.max(1);
        Self {
            page_size,
            display_count: page_size,
        }
    }

    pub fn display_count(&self) -> usize {
        self.display_count
    }

    pub fn load_more(&mut self) {
        self.display_count = self.display_count.saturating_add(LOAD_MORE_STEP);
    }

    pub fn reset(&mut self) {
        self.display_count = self.page_size;
    }

    pub fn has_more(&self, total: usize) -> bool {
        total > self.display_count
    }

    pub fn window<'a, T>(&self, results: &'a [T]) -> &'a [T] {
        &results[..results.len().min(self.display_count)]
    }
}

impl Default for Pagination {
    fn default() -> Self {
        Self::new(LOAD_MORE_STEP)
    }
}

/// Inputs the ranked view depends on. Revisions are bumped by the owner
/// whenever the entry set or the hidden set changes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ViewKey {
    pub entries_rev: u64,
    pub hidden_rev: u64,
    pub search: String,
    pub work: WorkFilter,
}

#[derive(Debug, Default)]
pub struct ViewCache {
    results_key: Option<ViewKey>,
    positions: Vec<usize>,
    works_key: Option<(u64, u64)>,
    works: Vec<String>,
}

impl ViewCache {
    pub fn results(
        &mut self,
        key: ViewKey,
        entries: &[Entry],
        hidden: &BTreeSet<EntryId>,
    ) -> &[usize] {
        if self.results_key.as_ref() != Some(&key) {
            self.positions = filter_and_sort_positions(entries, hidden, &key.search, &key.work);
            self.results_key = Some(key);
        }
        &self.positions
    }

    pub fn works(
        &mut self,
        entries_rev: u64,
        hidden_rev: u64,
        entries: &[Entry],
        hidden: &BTreeSet<EntryId>,
    ) -> &[String] {
        let key = (entries_rev, hidden_rev);
        if self.works_key != Some(key) {
            self.works = distinct_works(entries, hidden);
            self.works_key = Some(key);
        }
        &self.works
    }

    pub fn invalidate(&mut self) {
        self.results_key = None;
        self.works_key = None;
    }
}
