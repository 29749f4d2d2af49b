mod common;

use common::{strings, TestStore};
use danci_lexicon::query::{format_translations, QueryService};
use danci_lexicon::storage::StorageError;

fn query(store: &TestStore) -> QueryService {
    QueryService::new(store.storage.clone(), store.diagnostics.clone())
}

#[test]
fn set_then_get_round_trips() {
    let store = TestStore::new();
    let repo = store.storage.entries();

    assert!(repo.ensure_exists("w").unwrap());
    assert!(!repo.ensure_exists("w").unwrap());
    repo.set_translations("w", &strings(&["a", "b"])).unwrap();

    assert_eq!(repo.get_translations("w").unwrap(), strings(&["a", "b"]));
}

#[test]
fn search_is_substring_and_ordered() {
    let store = TestStore::new();
    store.import_text("pineapple:ananas\napple:pomme\ngrape:raisin\nApplet:widget");
    let query = query(&store);

    assert_eq!(
        query.search("app").unwrap(),
        strings(&["Applet", "apple", "pineapple"])
    );
    assert_eq!(query.search("").unwrap().len(), 4);
    assert!(query.search("zzz").unwrap().is_empty());
}

#[test]
fn like_wildcards_are_literal() {
    let store = TestStore::new();
    store.import_text("100%:all\nabc:letters\na_c:underscore");
    let query = query(&store);

    assert_eq!(query.search("%").unwrap(), strings(&["100%"]));
    assert_eq!(query.search("_").unwrap(), strings(&["a_c"]));
}

#[test]
fn decode_failure_does_not_leak_into_other_lookups() {
    let store = TestStore::new();
    store.import_text("cat:feline\ndog:bark");
    store.corrupt("cat", "{\"not\": \"an array\"}");
    let query = query(&store);

    assert!(matches!(
        query.select_word("cat"),
        Err(StorageError::Decode { .. })
    ));
    assert_eq!(query.search("").unwrap(), strings(&["cat", "dog"]));
    assert_eq!(query.select_word("dog").unwrap(), strings(&["bark"]));
    assert!(store
        .diagnostics
        .records()
        .iter()
        .any(|r| r.message.contains("cat")));
}

#[test]
fn select_word_renders_one_translation_per_line() {
    let store = TestStore::new();
    store.import_text("cat:feline,kitty");

    let translations = query(&store).select_word("cat").unwrap();
    assert_eq!(format_translations(&translations), "feline\nkitty\n");
}
