use super::*;
use sqlx::sqlite::SqlitePoolOptions;
use tempfile::TempDir;

async fn create_test_pool() -> (TempDir, SqlitePool) {
    let temp_dir = TempDir::new().expect("Failed to create temp directory");
    let db_path = temp_dir.path().join("test.db");

    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect_with(
            sqlx::sqlite::SqliteConnectOptions::new()
                .filename(&db_path)
                .create_if_missing(true),
        )
        .await
        .expect("Failed to create test pool");

    sqlx::raw_sql(include_str!("../migrations/001_initial_schema.sql"))
        .execute(&pool)
        .await
        .expect("Failed to run migrations");

    (temp_dir, pool)
}

fn new_entry(title: &str, module_id: Option<i64>) -> NewKnowledgeEntry {
    NewKnowledgeEntry {
        title: title.to_string(),
        content: format!("Content about {title}."),
        module_id,
    }
}

#[tokio::test]
async fn knowledge_crud_operations() {
    let (_temp_dir, pool) = create_test_pool().await;

    let created = KnowledgeQueries::create(&pool, new_entry("Borrowing", Some(1)))
        .await
        .expect("Failed to create entry");

    assert_eq!(created.title, "Borrowing");
    assert_eq!(created.module_id, Some(1));
    assert_eq!(created.embedding, None);

    let by_id = KnowledgeQueries::get_by_id(&pool, created.id)
        .await
        .expect("Failed to get entry")
        .expect("Entry should exist");
    assert_eq!(by_id, created);

    let by_title = KnowledgeQueries::get_by_title(&pool, "Borrowing")
        .await
        .expect("Failed to get entry")
        .expect("Entry should exist");
    assert_eq!(by_title.id, created.id);

    assert!(
        KnowledgeQueries::get_by_title(&pool, "Missing")
            .await
            .expect("query succeeds")
            .is_none()
    );
}

#[tokio::test]
async fn duplicate_titles_are_rejected() {
    let (_temp_dir, pool) = create_test_pool().await;

    KnowledgeQueries::create(&pool, new_entry("Lifetimes", None))
        .await
        .expect("first insert succeeds");
    let duplicate = KnowledgeQueries::create(&pool, new_entry("Lifetimes", Some(2))).await;

    assert!(duplicate.is_err());
    assert_eq!(KnowledgeQueries::list_all(&pool).await.expect("list succeeds").len(), 1);
}

#[tokio::test]
async fn list_by_module_scopes_results() {
    let (_temp_dir, pool) = create_test_pool().await;

    for (title, module) in [("A", Some(1)), ("B", Some(2)), ("C", Some(1)), ("D", None)] {
        KnowledgeQueries::create(&pool, new_entry(title, module))
            .await
            .expect("insert succeeds");
    }

    let module_one = KnowledgeQueries::list_by_module(&pool, 1)
        .await
        .expect("list succeeds");
    let titles: Vec<&str> = module_one.iter().map(|e| e.title.as_str()).collect();
    assert_eq!(titles, vec!["A", "C"]);

    let all = KnowledgeQueries::list_all(&pool).await.expect("list succeeds");
    assert_eq!(all.len(), 4);
    let mut all_titles: Vec<&str> = all.iter().map(|e| e.title.as_str()).collect();
    all_titles.sort_unstable();
    assert_eq!(all_titles, vec!["A", "B", "C", "D"]);
}

#[tokio::test]
async fn embedding_update_and_clear() {
    let (_temp_dir, pool) = create_test_pool().await;

    let entry = KnowledgeQueries::create(&pool, new_entry("Traits", None))
        .await
        .expect("insert succeeds");

    assert!(
        KnowledgeQueries::update_embedding(&pool, entry.id, &[0.25, 0.5])
            .await
            .expect("update succeeds")
    );
    assert!(
        !KnowledgeQueries::update_embedding(&pool, 9999, &[1.0])
            .await
            .expect("update of missing row succeeds")
    );

    let stored = KnowledgeQueries::get_by_id(&pool, entry.id)
        .await
        .expect("get succeeds")
        .expect("entry exists");
    assert_eq!(stored.embedding, Some(vec![0.25, 0.5]));

    // Last write wins
    KnowledgeQueries::update_embedding(&pool, entry.id, &[0.75, 0.0])
        .await
        .expect("second update succeeds");
    let stored = KnowledgeQueries::get_by_id(&pool, entry.id)
        .await
        .expect("get succeeds")
        .expect("entry exists");
    assert_eq!(stored.embedding, Some(vec![0.75, 0.0]));

    let cleared = KnowledgeQueries::clear_embeddings(&pool)
        .await
        .expect("clear succeeds");
    assert_eq!(cleared, 1);

    let stored = KnowledgeQueries::get_by_id(&pool, entry.id)
        .await
        .expect("get succeeds")
        .expect("entry exists");
    assert_eq!(stored.embedding, None);
}

#[tokio::test]
async fn module_catalogue_operations() {
    let (_temp_dir, pool) = create_test_pool().await;

    let module = ModuleQueries::create(
        &pool,
        NewCourseModule {
            title: "Rust Basics".to_string(),
            description: Some("Variables and types".to_string()),
        },
    )
    .await
    .expect("module created");

    assert!(ModuleQueries::exists(&pool, module.id).await.expect("checks"));
    assert!(!ModuleQueries::exists(&pool, module.id + 100).await.expect("checks"));

    let by_title = ModuleQueries::get_by_title(&pool, "Rust Basics")
        .await
        .expect("lookup succeeds")
        .expect("module exists");
    assert_eq!(by_title, module);

    let modules = ModuleQueries::list_all(&pool).await.expect("list succeeds");
    assert_eq!(modules.len(), 1);
}

#[tokio::test]
async fn recent_chat_exchanges_are_oldest_first() {
    let (_temp_dir, pool) = create_test_pool().await;

    for n in 1..=5 {
        ChatQueries::create(
            &pool,
            NewChatExchange {
                user_id: "student-1".to_string(),
                question: format!("Question {n}"),
                answer: format!("Answer {n}"),
                confidence: 0.8,
                source: "General Knowledge".to_string(),
                module_id: None,
            },
        )
        .await
        .expect("exchange recorded");
    }
    ChatQueries::create(
        &pool,
        NewChatExchange {
            user_id: "student-2".to_string(),
            question: "Other".to_string(),
            answer: "Other".to_string(),
            confidence: 0.0,
            source: "Error".to_string(),
            module_id: Some(3),
        },
    )
    .await
    .expect("exchange recorded");

    let recent = ChatQueries::recent_for_user(&pool, "student-1", 3)
        .await
        .expect("recent loads");
    let questions: Vec<&str> = recent.iter().map(|e| e.question.as_str()).collect();
    assert_eq!(questions, vec!["Question 3", "Question 4", "Question 5"]);
}

#[tokio::test]
async fn statistics_count_everything() {
    let (_temp_dir, pool) = create_test_pool().await;

    let entry = KnowledgeQueries::create(&pool, new_entry("Enums", None))
        .await
        .expect("insert succeeds");
    KnowledgeQueries::create(&pool, new_entry("Structs", None))
        .await
        .expect("insert succeeds");
    KnowledgeQueries::update_embedding(&pool, entry.id, &[1.0])
        .await
        .expect("update succeeds");

    let stats = StatisticsQueries::collect(&pool).await.expect("stats collected");
    assert_eq!(stats.total_entries, 2);
    assert_eq!(stats.embedded_entries, 1);
    assert_eq!(stats.modules, 0);
    assert_eq!(stats.chat_exchanges, 0);
}
