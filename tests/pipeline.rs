use std::collections::BTreeSet;

use glossary_browser::domain::{Entry, EntryRecord, WorkFilter};
use glossary_browser::pipeline::{
    LOAD_MORE_STEP, Pagination, distinct_works, filter_and_sort, filter_works,
};

fn entry(id: u64, chinese: &str, english: &str, novel: &str) -> Entry {
    Entry::new(
        id,
        EntryRecord {
            chinese: chinese.to_string(),
            english: english.to_string(),
            novel: novel.to_string(),
        },
    )
}

fn sample() -> Vec<Entry> {
    vec![
        entry(0, "龙", "dragon", "Coiling Dragon"),
        entry(1, "龙血", "dragon blood", "Coiling Dragon"),
        entry(2, "斗气", "battle qi", "Battle Through"),
        entry(3, "真龙", "true dragon", "Stellar Transformations"),
        entry(4, "气", "Qi", "Battle Through"),
    ]
}

fn english(results: &[&Entry]) -> Vec<String> {
    results.iter().map(|entry| entry.english.clone()).collect()
}

#[test]
fn works_are_distinct_sorted_and_skip_hidden() {
    let entries = sample();
    assert_eq!(
        distinct_works(&entries, &BTreeSet::new()),
        vec![
            "Battle Through",
            "Coiling Dragon",
            "Stellar Transformations"
        ]
    );

    let hidden = BTreeSet::from([3]);
    assert_eq!(
        distinct_works(&entries, &hidden),
        vec!["Battle Through", "Coiling Dragon"]
    );
}

#[test]
fn work_selector_filters_case_insensitively() {
    let works = distinct_works(&sample(), &BTreeSet::new());
    assert_eq!(filter_works(&works, "DRAGON"), vec!["Coiling Dragon"]);
    assert_eq!(filter_works(&works, "").len(), 3);
    assert!(filter_works(&works, "missing").is_empty());
}

#[test]
fn no_search_keeps_load_order_within_work() {
    let entries = sample();
    let results = filter_and_sort(
        &entries,
        &BTreeSet::new(),
        "",
        &WorkFilter::Work("Battle Through".to_string()),
    );
    assert_eq!(english(&results), vec!["battle qi", "Qi"]);
}

#[test]
fn exact_matches_rank_first_then_shorter_fields() {
    let entries = sample();
    let results = filter_and_sort(&entries, &BTreeSet::new(), "  DRAGON ", &WorkFilter::All);
    assert_eq!(
        english(&results),
        vec!["dragon", "true dragon", "dragon blood"]
    );
}

#[test]
fn exact_english_match_beats_shorter_partial() {
    let entries = vec![
        entry(0, "气功", "qigong", "A"),
        entry(1, "气", "qi", "A"),
        entry(2, "斗气", "battle qi", "A"),
    ];
    let results = filter_and_sort(&entries, &BTreeSet::new(), "qi", &WorkFilter::All);
    assert_eq!(english(&results), vec!["qi", "qigong", "battle qi"]);
}

#[test]
fn chinese_search_matches_chinese_field() {
    let entries = sample();
    let results = filter_and_sort(&entries, &BTreeSet::new(), "龙", &WorkFilter::All);
    assert_eq!(english(&results), vec!["dragon", "dragon blood", "true dragon"]);
}

#[test]
fn hidden_entries_never_appear() {
    let entries = sample();
    let hidden = BTreeSet::from([0, 1]);
    let results = filter_and_sort(&entries, &hidden, "dragon", &WorkFilter::All);
    assert_eq!(english(&results), vec!["true dragon"]);
}

#[test]
fn empty_inputs_give_empty_outputs() {
    assert!(filter_and_sort(&[], &BTreeSet::new(), "dragon", &WorkFilter::All).is_empty());
    assert!(distinct_works(&[], &BTreeSet::new()).is_empty());
}

#[test]
fn pagination_grows_by_step_and_resets() {
    let results: Vec<u32> = (0..250).collect();
    let mut page = Pagination::new(LOAD_MORE_STEP);

    assert_eq!(page.window(&results).len(), 100);
    assert!(page.has_more(results.len()));

    page.load_more();
    assert_eq!(page.window(&results).len(), 200);

    page.load_more();
    assert_eq!(page.window(&results).len(), 250);
    assert!(!page.has_more(results.len()));

    page.reset();
    assert_eq!(page.display_count(), 100);
}
