use controller_examples::config::Settings;
use secrecy::ExposeSecret;
use std::collections::HashMap;
use std::fs;
use std::time::Duration;
use tempfile::TempDir;

fn vars(pairs: &[(&str, &str)]) -> Option<HashMap<String, String>> {
    Some(
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect(),
    )
}

#[test]
fn test_load_from_file() -> anyhow::Result<()> {
    let temp_dir = TempDir::new()?;
    let path = temp_dir.path().join("controller-examples.toml");
    fs::write(
        &path,
        r#"
[controller]
domain = "controller.file.example.com"
key = "file-key"
timeout_secs = 10

[provider]
addr = "192.168.1.5"
port = 7000

[discovery]
url = "http://discoverd.example.com:1111"
heartbeat_secs = 2
"#,
    )?;

    let settings = Settings::load(&path, vars(&[]))?;

    assert_eq!(settings.controller.domain, "controller.file.example.com");
    assert_eq!(settings.controller.key.expose_secret(), "file-key");
    assert_eq!(settings.controller.timeout(), Duration::from_secs(10));
    assert_eq!(settings.provider.external_addr(), "192.168.1.5:7000");
    assert_eq!(settings.discovery.heartbeat(), Duration::from_secs(2));
    assert_eq!(settings.discovery_url()?, "http://discoverd.example.com:1111");
    Ok(())
}

#[test]
fn test_environment_overrides_file() -> anyhow::Result<()> {
    let temp_dir = TempDir::new()?;
    let path = temp_dir.path().join("controller-examples.toml");
    fs::write(
        &path,
        r#"
[controller]
domain = "controller.file.example.com"
key = "file-key"
"#,
    )?;

    let settings = Settings::load(
        &path,
        vars(&[
            ("EXAMPLES_CONTROLLER__TIMEOUT_SECS", "30"),
            ("CONTROLLER_KEY", "env-key"),
        ]),
    )?;

    assert_eq!(settings.controller.domain, "controller.file.example.com");
    assert_eq!(settings.controller.key.expose_secret(), "env-key");
    assert_eq!(settings.controller.timeout(), Duration::from_secs(30));
    Ok(())
}

#[test]
fn test_invalid_file_values_fail_validation() -> anyhow::Result<()> {
    let temp_dir = TempDir::new()?;
    let path = temp_dir.path().join("controller-examples.toml");
    fs::write(
        &path,
        r#"
[controller]
domain = "controller.example.com"
key = ""

[discovery]
heartbeat_secs = 0
"#,
    )?;

    let err = Settings::load(&path, vars(&[])).unwrap_err().to_string();
    assert!(err.contains("Configuration validation failed"));
    assert!(err.contains("controller.key"));
    assert!(err.contains("discovery.heartbeat_secs"));
    Ok(())
}

#[test]
fn test_settings_debug_redacts_key() -> anyhow::Result<()> {
    let settings = Settings::load(
        std::path::Path::new("missing/controller-examples"),
        vars(&[
            ("CONTROLLER_DOMAIN", "controller.example.com"),
            ("CONTROLLER_KEY", "super-secret"),
        ]),
    )?;

    assert!(!format!("{:?}", settings).contains("super-secret"));
    Ok(())
}
