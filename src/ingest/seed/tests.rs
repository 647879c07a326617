use super::*;
use tempfile::TempDir;

const SEED: &str = r#"
[[modules]]
title = "Rust Basics"
description = "Variables, types and control flow"

[[modules]]
title = "Async Rust"

[[entries]]
title = "Shadowing"
content = "A later let binding can reuse a name."
module = "Rust Basics"

[[entries]]
title = "Futures"
content = "A future does nothing until polled."
module = "Async Rust"

[[entries]]
title = "Ghost"
content = "References a module nobody created."
module = "Unsafe Rust"

[[entries]]
title = "Untagged"
content = "Belongs to no module."
"#;

async fn create_test_database() -> (TempDir, Database) {
    let temp_dir = TempDir::new().expect("Failed to create temp directory");
    let database = Database::initialize_from_config_dir(temp_dir.path())
        .await
        .expect("Failed to create database");
    (temp_dir, database)
}

#[test]
fn parses_modules_and_entries() {
    let seed = SeedFile::parse(SEED).expect("valid seed");
    assert_eq!(seed.modules.len(), 2);
    assert_eq!(seed.modules[1].description, None);
    assert_eq!(seed.entries.len(), 4);
    assert_eq!(seed.entries[0].module.as_deref(), Some("Rust Basics"));
    assert_eq!(seed.entries[3].module, None);
}

#[test]
fn missing_fields_parse_as_blank() {
    let seed = SeedFile::parse("[[entries]]\ntitle = \"Only a title\"\n").expect("valid seed");
    assert_eq!(seed.entries[0].content, "");
    assert!(seed.modules.is_empty());
}

#[test]
fn malformed_seed_is_an_error() {
    assert!(SeedFile::parse("[[entries]\ntitle = ").is_err());
}

#[test]
fn load_reports_missing_file() {
    let temp_dir = TempDir::new().expect("Failed to create temp directory");
    let error = SeedFile::load(&temp_dir.path().join("missing.toml")).expect_err("missing file");
    assert!(format!("{error:#}").contains("missing.toml"));
}

#[tokio::test]
async fn prepare_creates_modules_and_resolves_titles() {
    let (_temp_dir, database) = create_test_database().await;

    let prepared = SeedFile::parse(SEED)
        .expect("valid seed")
        .prepare(&database)
        .await
        .expect("prepare succeeds");

    assert_eq!(prepared.modules_created, 2);
    assert_eq!(prepared.unresolved, 1);
    let titles: Vec<&str> = prepared.entries.iter().map(|e| e.title.as_str()).collect();
    assert_eq!(titles, vec!["Shadowing", "Futures", "Untagged"]);

    let basics = database
        .get_module_by_title("Rust Basics")
        .await
        .expect("lookup succeeds")
        .expect("module created");
    assert_eq!(prepared.entries[0].module_id, Some(basics.id));
    assert_eq!(prepared.entries[2].module_id, None);
}

#[tokio::test]
async fn prepare_reuses_existing_modules() {
    let (_temp_dir, database) = create_test_database().await;
    let existing = database
        .create_module(&NewCourseModule {
            title: "Async Rust".to_string(),
            description: None,
        })
        .await
        .expect("module created");

    let prepared = SeedFile::parse(SEED)
        .expect("valid seed")
        .prepare(&database)
        .await
        .expect("prepare succeeds");

    assert_eq!(prepared.modules_created, 1);
    assert_eq!(prepared.entries[1].module_id, Some(existing.id));
    assert_eq!(database.list_modules().await.expect("list").len(), 2);
}

#[tokio::test]
async fn conflicting_module_reference_is_dropped() {
    let (_temp_dir, database) = create_test_database().await;
    let seed = SeedFile {
        modules: vec![NewCourseModule {
            title: "Traits".to_string(),
            description: None,
        }],
        entries: vec![SeedEntry {
            title: "Confused".to_string(),
            content: "Points two ways.".to_string(),
            module_id: Some(999),
            module: Some("Traits".to_string()),
        }],
    };

    let prepared = seed.prepare(&database).await.expect("prepare succeeds");
    assert!(prepared.entries.is_empty());
    assert_eq!(prepared.unresolved, 1);
}
