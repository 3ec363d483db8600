use super::*;

use std::{
    collections::HashMap,
    env,
    time::{SystemTime, UNIX_EPOCH},
};

#[test]
fn normalizes_plain_file_path_to_sqlite_url() {
    assert_eq!(
        normalize_database_url("./data/test.db"),
        "sqlite://./data/test.db"
    );
}

#[test]
fn keeps_memory_and_full_urls_untouched() {
    assert_eq!(normalize_database_url("sqlite::memory:"), "sqlite::memory:");
    assert_eq!(
        normalize_database_url("sqlite://./data/notes.db?mode=rwc"),
        "sqlite://./data/notes.db?mode=rwc"
    );
    assert_eq!(
        normalize_database_url("   "),
        Settings::default().database_url
    );
}

#[test]
fn keeps_windows_absolute_path_with_single_sqlite_colon() {
    assert_eq!(
        normalize_database_url("sqlite:C:\\Users\\alice\\notes.db"),
        "sqlite:C:/Users/alice/notes.db"
    );
}

#[test]
fn normalizes_windows_plain_path_with_single_sqlite_colon() {
    assert_eq!(
        normalize_database_url("C:\\Users\\alice\\notes.db"),
        "sqlite:C:/Users/alice/notes.db"
    );
}

#[test]
fn converts_sqlite_double_slash_windows_path() {
    assert_eq!(
        normalize_database_url("sqlite://C:/Users/alice/notes.db"),
        "sqlite:C:/Users/alice/notes.db"
    );
}

#[test]
fn file_settings_override_defaults() {
    let mut settings = Settings::default();
    apply_file(
        &mut settings,
        "bind_addr = \"0.0.0.0:8080\"\nmax_form_bytes = 1024\n",
    );
    assert_eq!(settings.server_bind, "0.0.0.0:8080");
    assert_eq!(settings.max_form_bytes, 1024);
    assert_eq!(settings.database_url, Settings::default().database_url);
}

#[test]
fn malformed_file_is_ignored() {
    let mut settings = Settings::default();
    apply_file(&mut settings, "bind_addr = [");
    assert_eq!(settings, Settings::default());
}

#[test]
fn app_prefixed_env_wins_over_plain_env() {
    let vars: HashMap<&str, &str> = HashMap::from([
        ("SERVER_BIND", "127.0.0.1:4000"),
        ("APP__BIND_ADDR", "127.0.0.1:5000"),
        ("DATABASE_URL", "sqlite://./plain.db"),
        ("APP__MAX_FORM_BYTES", "not-a-number"),
    ]);
    let mut settings = Settings::default();
    apply_env(&mut settings, |key| vars.get(key).map(|v| v.to_string()));

    assert_eq!(settings.server_bind, "127.0.0.1:5000");
    assert_eq!(settings.database_url, "sqlite://./plain.db");
    assert_eq!(settings.max_form_bytes, Settings::default().max_form_bytes);
}

#[tokio::test]
async fn normalized_plain_path_opens_sqlite_file_in_new_directory() {
    let suffix = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .expect("clock")
        .as_nanos();

    let temp_root = env::temp_dir().join(format!("notes_server_open_test_{suffix}"));
    let db_path = temp_root.join("nested").join("notes.db");

    let database_url = normalize_database_url(db_path.to_string_lossy().as_ref());
    assert!(database_url.starts_with("sqlite:"));
    let storage = storage::Storage::new(&database_url).await.expect("open sqlite");
    drop(storage);

    assert!(
        db_path.exists(),
        "database file should be created: {}",
        db_path.display()
    );

    fs::remove_dir_all(temp_root).expect("cleanup");
}
