use chrono::Utc;

use super::*;

fn row(embedding: Option<&str>) -> KnowledgeEntryRow {
    let now = Utc::now().naive_utc();
    KnowledgeEntryRow {
        id: 7,
        title: "Ownership".to_string(),
        content: "Every value has a single owner.".to_string(),
        module_id: Some(2),
        embedding: embedding.map(str::to_string),
        created_date: now,
        updated_date: now,
    }
}

#[test]
fn row_with_embedding_decodes() {
    let entry = KnowledgeEntry::from(row(Some("[0.5,-0.25,1.0]")));
    assert_eq!(entry.embedding, Some(vec![0.5, -0.25, 1.0]));
    assert!(entry.has_embedding());
    assert_eq!(entry.module_id, Some(2));
}

#[test]
fn row_without_embedding_stays_empty() {
    let entry = KnowledgeEntry::from(row(None));
    assert_eq!(entry.embedding, None);
    assert!(!entry.has_embedding());
}

#[test]
fn corrupted_embedding_is_treated_as_missing() {
    let entry = KnowledgeEntry::from(row(Some("[0.5, oops")));
    assert_eq!(entry.embedding, None);
}

#[test]
fn embedding_encoding_is_json() {
    let encoded = encode_embedding(&[1.0, 0.0, -0.5]).expect("encodes");
    assert_eq!(encoded, "[1.0,0.0,-0.5]");
    assert_eq!(
        decode_embedding(&encoded).expect("decodes"),
        vec![1.0, 0.0, -0.5]
    );
}

#[test]
fn embedding_text_joins_title_and_content() {
    let entry = KnowledgeEntry::from(row(None));
    assert_eq!(
        entry.embedding_text(),
        "Ownership\n\nEvery value has a single owner."
    );
}

#[test]
fn pending_embeddings_count() {
    let stats = KnowledgeStatistics {
        total_entries: 10,
        embedded_entries: 4,
        modules: 3,
        chat_exchanges: 0,
    };
    assert_eq!(stats.pending_embeddings(), 6);
}

#[test]
fn new_entry_deserializes_without_module() {
    let entry: NewKnowledgeEntry =
        toml::from_str("title = \"Traits\"\ncontent = \"Shared behaviour.\"").expect("parses");
    assert_eq!(entry.module_id, None);
}
