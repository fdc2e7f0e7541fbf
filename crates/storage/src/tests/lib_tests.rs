use super::*;

fn fields(level_id: LevelId, name: &str) -> DeveloperFields {
    DeveloperFields {
        level_id,
        name: name.to_string(),
        gender: Gender::Female,
        date_of_birth: NaiveDate::from_ymd_opt(1994, 3, 12).expect("date"),
        age: 30,
        hobby: "climbing".to_string(),
    }
}

#[tokio::test]
async fn stores_and_lists_levels() {
    let storage = Storage::new("sqlite::memory:").await.expect("db");
    let junior = storage.create_level("Junior").await.expect("level");
    let senior = storage.create_level("Senior").await.expect("level");
    let levels = storage.list_levels().await.expect("levels");
    assert_eq!(levels, vec![junior, senior]);
}

#[tokio::test]
async fn health_check_succeeds_for_live_pool() {
    let storage = Storage::new("sqlite::memory:").await.expect("db");
    storage.health_check().await.expect("health check");
}

#[tokio::test]
async fn creates_database_file_when_missing() {
    let temp_root = tempfile::tempdir().expect("tempdir");
    let db_path = temp_root.path().join("nested").join("storage.db");
    let database_url = format!("sqlite://{}", db_path.to_string_lossy().replace('\\', "/"));

    let storage = Storage::new(&database_url).await.expect("db");
    drop(storage);

    assert!(
        db_path.exists(),
        "database file should exist: {}",
        db_path.display()
    );
}

#[tokio::test]
async fn update_level_reports_missing_rows() {
    let storage = Storage::new("sqlite::memory:").await.expect("db");
    let level = storage.create_level("Junior").await.expect("level");

    let renamed = storage
        .update_level(level.level_id, "Mid")
        .await
        .expect("update")
        .expect("row exists");
    assert_eq!(renamed.name, "Mid");

    let missing = storage
        .update_level(LevelId(999), "Ghost")
        .await
        .expect("update");
    assert!(missing.is_none());
}

#[tokio::test]
async fn developer_round_trips_every_column() {
    let storage = Storage::new("sqlite::memory:").await.expect("db");
    let level = storage.create_level("Junior").await.expect("level");
    let created = storage
        .create_developer(&fields(level.level_id, "Ana"))
        .await
        .expect("developer");

    let loaded = storage
        .developer(created.developer_id)
        .await
        .expect("load")
        .expect("row exists");
    assert_eq!(loaded, created);
    assert_eq!(loaded.gender, Gender::Female);
    assert_eq!(
        storage
            .count_developers_for_level(level.level_id)
            .await
            .expect("count"),
        1
    );
}

#[tokio::test]
async fn update_developer_moves_between_levels() {
    let storage = Storage::new("sqlite::memory:").await.expect("db");
    let junior = storage.create_level("Junior").await.expect("level");
    let senior = storage.create_level("Senior").await.expect("level");
    let dev = storage
        .create_developer(&fields(junior.level_id, "Ana"))
        .await
        .expect("developer");

    let updated = storage
        .update_developer(dev.developer_id, &fields(senior.level_id, "Ana Clara"))
        .await
        .expect("update")
        .expect("row exists");
    assert_eq!(updated.level_id, senior.level_id);
    assert_eq!(updated.name, "Ana Clara");
    assert_eq!(
        storage
            .count_developers_for_level(junior.level_id)
            .await
            .expect("count"),
        0
    );
}

#[tokio::test]
async fn foreign_key_blocks_orphan_developers_and_referenced_levels() {
    let storage = Storage::new("sqlite::memory:").await.expect("db");
    assert!(storage
        .create_developer(&fields(LevelId(42), "Orphan"))
        .await
        .is_err());

    let level = storage.create_level("Junior").await.expect("level");
    storage
        .create_developer(&fields(level.level_id, "Ana"))
        .await
        .expect("developer");
    assert!(storage.delete_level(level.level_id).await.is_err());
}

#[tokio::test]
async fn deletes_report_whether_a_row_was_removed() {
    let storage = Storage::new("sqlite::memory:").await.expect("db");
    let level = storage.create_level("Junior").await.expect("level");
    let dev = storage
        .create_developer(&fields(level.level_id, "Ana"))
        .await
        .expect("developer");

    assert!(storage
        .delete_developer(dev.developer_id)
        .await
        .expect("delete"));
    assert!(!storage
        .delete_developer(dev.developer_id)
        .await
        .expect("delete again"));
    assert!(storage.delete_level(level.level_id).await.expect("delete"));
    assert!(storage.list_levels().await.expect("levels").is_empty());
}

#[test]
fn sqlite_path_ignores_memory_urls() {
    assert!(sqlite_path("sqlite::memory:").is_none());
    assert_eq!(
        sqlite_path("sqlite://./data/dev.db?mode=rwc"),
        Some(PathBuf::from("./data/dev.db"))
    );
}
