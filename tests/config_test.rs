use std::env;
use std::fs;
use tempfile::tempdir;
use toggl_wiki::config::Config;

#[test]
fn test_env_variable_override() {
    env::set_var("TOGGL_WORKSPACE_ID", "4242");
    env::set_var("TOGGL_USER_AGENT", "wiki@example.org");
    env::set_var("TOGGL_CACHE_TTL_SECS", "60");
    env::set_var("TOGGL_API_URL", "http://localhost:9000/api/v9");

    let mut config = Config::default();
    config
        .apply_env_overrides()
        .expect("Failed to apply env overrides");

    assert_eq!(config.toggl.default_workspace_id.as_deref(), Some("4242"));
    assert_eq!(config.toggl.user_agent.as_deref(), Some("wiki@example.org"));
    assert_eq!(config.cache.ttl_seconds, 60);
    assert_eq!(config.toggl.api_base_url, "http://localhost:9000/api/v9");
    assert!(config.validate().is_ok());

    env::set_var("TOGGL_CACHE_TTL_SECS", "soon");
    assert!(Config::default().apply_env_overrides().is_err());

    env::remove_var("TOGGL_WORKSPACE_ID");
    env::remove_var("TOGGL_USER_AGENT");
    env::remove_var("TOGGL_CACHE_TTL_SECS");
    env::remove_var("TOGGL_API_URL");
}

#[test]
fn test_load_from_file() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("toggl-wiki.toml");
    fs::write(
        &path,
        r#"
[toggl]
default_workspace_id = "123"
user_agent = "ops@example.org"

[cache]
ttl_seconds = 120
"#,
    )
    .unwrap();

    let config = Config::load_from_file(&path).unwrap();

    assert_eq!(config.toggl.default_workspace_id.as_deref(), Some("123"));
    assert_eq!(config.toggl.user_agent.as_deref(), Some("ops@example.org"));
    assert_eq!(config.cache.ttl_seconds, 120);
    assert_eq!(config.logging.format, "pretty");
}

#[test]
fn test_invalid_file_is_an_error() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("broken.toml");
    fs::write(&path, "[cache\nttl_seconds = ").unwrap();

    let err = Config::load_from_file(&path).unwrap_err();
    assert!(err.to_string().contains("Failed to parse config file"));
}

#[test]
fn test_save_and_reload() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("saved.toml");
    let mut config = Config::default();
    config.toggl.default_workspace_id = Some("9".to_string());

    config.save_to_file(&path).unwrap();
    let reloaded = Config::load_from_file(&path).unwrap();

    assert_eq!(reloaded.toggl.default_workspace_id.as_deref(), Some("9"));
    assert_eq!(reloaded.cache.ttl_seconds, config.cache.ttl_seconds);
}
