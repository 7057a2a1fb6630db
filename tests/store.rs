use camino::Utf8PathBuf;

use glossary_browser::domain::{Entry, EntryRecord};
use glossary_browser::store::{EntryTable, KeyValueStore, Store};

fn temp_store() -> (tempfile::TempDir, Store) {
    let dir = tempfile::tempdir().unwrap();
    let root = Utf8PathBuf::from_path_buf(dir.path().join("cache")).unwrap();
    (dir, Store::new_with_root(root))
}

#[test]
fn layout_paths() {
    let (_dir, store) = temp_store();
    assert!(store.entries_path().ends_with("cache/entries.json"));
    assert!(store.settings_path().ends_with("cache/settings.json"));
}

#[test]
fn entry_table_survives_reopen() {
    let (dir, store) = temp_store();
    let entries = vec![Entry::new(
        0,
        EntryRecord {
            chinese: "龙".to_string(),
            english: "dragon".to_string(),
            novel: "N".to_string(),
        },
    )];
    store.replace_all(&entries).unwrap();

    let reopened =
        Store::new_with_root(Utf8PathBuf::from_path_buf(dir.path().join("cache")).unwrap());
    assert_eq!(reopened.read_all().unwrap(), entries);
}

#[test]
fn settings_keys_are_independent() {
    let (_dir, store) = temp_store();
    store.set("a", "1").unwrap();
    store.set("b", "2").unwrap();
    store.remove("a").unwrap();

    assert_eq!(store.get("a").unwrap(), None);
    assert_eq!(store.get("b").unwrap().as_deref(), Some("2"));
}

#[test]
fn corrupt_entry_cache_is_a_storage_error() {
    let (_dir, store) = temp_store();
    store.ensure_root().unwrap();
    std::fs::write(store.entries_path(), "[{").unwrap();

    let err = store.read_all().unwrap_err();
    assert!(err.is_storage());
}
