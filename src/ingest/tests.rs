use super::*;
use crate::embeddings::EmbeddingProvider;
use crate::knowledge::MemoryKnowledgeStore;
use crate::test_support::{FailingEmbedder, ScriptedEmbedder, UnavailableStore, new_entry};

fn ingestor(store: &Arc<MemoryKnowledgeStore>) -> Ingestor {
    Ingestor::new(
        Arc::clone(store) as Arc<dyn KnowledgeStore>,
        Arc::clone(store) as Arc<dyn CourseCatalogue>,
    )
}

fn batch() -> Vec<NewKnowledgeEntry> {
    vec![
        new_entry("Variables", "let binds a value to a name.", Some(1)),
        new_entry("Mutability", "Bindings are immutable unless marked mut.", Some(1)),
        new_entry("Functions", "fn declares a function.", None),
    ]
}

#[tokio::test]
async fn ingesting_twice_inserts_once() {
    let store = Arc::new(MemoryKnowledgeStore::with_modules([1]));
    let ingestor = ingestor(&store);

    let first = ingestor.ingest(batch()).await;
    assert_eq!(first.inserted, 3);
    assert_eq!(first.skipped(), 0);

    let second = ingestor.ingest(batch()).await;
    assert_eq!(second.inserted, 0);
    assert_eq!(second.duplicates, 3);
    assert_eq!(store.len(), 3);
}

#[tokio::test]
async fn unknown_module_is_dropped() {
    let store = Arc::new(MemoryKnowledgeStore::with_modules([1]));

    let report = ingestor(&store)
        .ingest(vec![new_entry("A", "about a", Some(5))])
        .await;

    assert_eq!(report.inserted, 0);
    assert_eq!(report.orphaned, 1);
    assert!(store.is_empty());
}

#[tokio::test]
async fn invalid_entries_do_not_stop_the_batch() {
    let store = Arc::new(MemoryKnowledgeStore::new());

    let report = ingestor(&store)
        .ingest(vec![
            new_entry("", "no title", None),
            new_entry("No content", "   ", None),
            new_entry("Valid", "has both", None),
        ])
        .await;

    assert_eq!(report.invalid, 2);
    assert_eq!(report.inserted, 1);
    assert_eq!(store.len(), 1);
}

#[tokio::test]
async fn titles_are_trimmed_and_deduplicated_within_batch() {
    let store = Arc::new(MemoryKnowledgeStore::new());

    let report = ingestor(&store)
        .ingest(vec![
            new_entry("Slices", "a view into a sequence", None),
            new_entry("  Slices  ", "the same title again", None),
        ])
        .await;

    assert_eq!(report.inserted, 1);
    assert_eq!(report.duplicates, 1);
    let stored = store
        .get_by_title("Slices")
        .await
        .expect("lookup succeeds")
        .expect("entry stored");
    assert_eq!(stored.content, "a view into a sequence");
}

#[tokio::test]
async fn store_failures_are_counted_not_raised() {
    let store = Arc::new(UnavailableStore);
    let catalogue = Arc::new(MemoryKnowledgeStore::new());

    let report = Ingestor::new(store, catalogue).ingest(batch()).await;

    assert_eq!(report.inserted, 0);
    assert_eq!(report.failed, 3);
}

#[tokio::test]
async fn entries_are_not_embedded_by_default() {
    let store = Arc::new(MemoryKnowledgeStore::with_modules([1]));
    let report = ingestor(&store).ingest(batch()).await;

    assert_eq!(report.embedded, 0);
    let entries = store.list_all().await.expect("list");
    assert!(entries.iter().all(|e| e.embedding.is_none()));
}

#[tokio::test]
async fn precompute_embeds_and_persists_new_entries() {
    let store = Arc::new(MemoryKnowledgeStore::with_modules([1]));
    let embedder = Arc::new(ScriptedEmbedder::new().with_fallback(vec![0.5, 0.5]));
    let retriever = Arc::new(Retriever::new(
        Arc::clone(&store) as Arc<dyn KnowledgeStore>,
        Arc::clone(&embedder) as Arc<dyn EmbeddingProvider>,
    ));

    let report = ingestor(&store)
        .with_precompute(retriever)
        .ingest(batch())
        .await;

    assert_eq!(report.inserted, 3);
    assert_eq!(report.embedded, 3);
    assert_eq!(embedder.calls(), 3);
    let entries = store.list_all().await.expect("list");
    assert!(entries.iter().all(|e| e.embedding == Some(vec![0.5, 0.5])));
}

#[tokio::test]
async fn precomputed_vectors_of_the_wrong_length_are_not_counted_as_embedded() {
    let store = Arc::new(MemoryKnowledgeStore::with_modules([1]));
    let embedder = Arc::new(ScriptedEmbedder::new().with_fallback(vec![0.5, 0.5]));
    let retriever = Arc::new(
        Retriever::new(
            Arc::clone(&store) as Arc<dyn KnowledgeStore>,
            Arc::clone(&embedder) as Arc<dyn EmbeddingProvider>,
        )
        .with_expected_dimension(768),
    );

    let report = ingestor(&store)
        .with_precompute(retriever)
        .ingest(batch())
        .await;

    assert_eq!(report.inserted, 3);
    assert_eq!(report.embedded, 0);
    assert_eq!(report.uncached, 3);
    let entries = store.list_all().await.expect("list");
    assert!(entries.iter().all(|e| e.embedding.is_none()));
}

#[tokio::test]
async fn precompute_failure_leaves_entry_for_lazy_embedding() {
    let store = Arc::new(MemoryKnowledgeStore::new());
    let retriever = Arc::new(Retriever::new(
        Arc::clone(&store) as Arc<dyn KnowledgeStore>,
        Arc::new(FailingEmbedder::default()),
    ));

    let report = ingestor(&store)
        .with_precompute(retriever)
        .ingest(vec![new_entry("Modules", "mod declares a module", None)])
        .await;

    assert_eq!(report.inserted, 1);
    assert_eq!(report.embedded, 0);
    assert!(!store.is_empty());
}

#[test]
fn report_display_and_merge() {
    let mut total = IngestReport {
        inserted: 2,
        duplicates: 1,
        ..IngestReport::default()
    };
    total.merge(IngestReport {
        inserted: 1,
        orphaned: 1,
        embedded: 2,
        uncached: 1,
        ..IngestReport::default()
    });

    assert_eq!(total.inserted, 3);
    assert_eq!(total.skipped(), 2);
    assert_eq!(
        total.to_string(),
        "3 inserted, 1 duplicate, 1 orphaned, 0 invalid, 0 failed, 2 embedded, 1 not cached"
    );
}
