use std::collections::BTreeSet;

use camino::{Utf8Path, Utf8PathBuf};

use crate::domain::{Entry, EntryId, EntryRecord, WorkFilter};
use crate::error::GlossaryError;
use crate::store::Store;

pub const UPDATED_GLOSSARY_FILE: &str = "glossary_updated.json";
pub const CSV_HEADER: &str = "Chinese,English";

pub fn csv_filename(work: &WorkFilter) -> String {
    format!("{}_glossary.csv", work.label().replace(' ', "_"))
}

fn csv_field(value: &str) -> String {
    format!("\"{}\"", value.replace('"', "\"\""))
}

/// Two-column CSV of the given entries, header first, rows joined by `\n`.
pub fn render_csv<'a, I>(entries: I) -> String
where
    I: IntoIterator<Item = &'a Entry>,
{
    let mut out = String::from(CSV_HEADER);
    for entry in entries {
        out.push('\n');
        out.push_str(&csv_field(&entry.chinese));
        out.push(',');
        out.push_str(&csv_field(&entry.english));
    }
    out
}

pub fn updated_glossary_json(
    entries: &[Entry],
    deleted: &BTreeSet<EntryId>,
) -> Result<String, GlossaryError> {
    let records: Vec<EntryRecord> = entries
        .iter()
        .filter(|entry| !deleted.contains(&entry.id))
        .map(Entry::to_record)
        .collect();
    serde_json::to_string_pretty(&records).map_err(|err| GlossaryError::Export(err.to_string()))
}

/// Saves an export file into `dir`, replacing any previous file of that name.
pub fn save(dir: &Utf8Path, filename: &str, content: &[u8]) -> Result<Utf8PathBuf, GlossaryError> {
    let path = dir.join(filename);
    Store::write_bytes_atomic(&path, content)
        .map_err(|err| GlossaryError::Export(format!("{path}: {err}")))?;
    Ok(path)
}

pub fn export_csv<'a, I>(
    dir: &Utf8Path,
    work: &WorkFilter,
    entries: I,
) -> Result<Utf8PathBuf, GlossaryError>
where
    I: IntoIterator<Item = &'a Entry>,
{
    let content = render_csv(entries);
    save(dir, &csv_filename(work), content.as_bytes())
}
