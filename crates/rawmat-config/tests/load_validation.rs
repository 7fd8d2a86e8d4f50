//! Config load validation tests for rawmat-config.
// crates/rawmat-config/tests/load_validation.rs
// =============================================================================
// Module: Config Load Validation Tests
// Description: Validate config loading guards (path, size, encoding).
// Purpose: Ensure config input handling is strict and fail-closed.
// =============================================================================

use std::io::Write;
use std::path::Path;

use rawmat_config::ConfigError;
use rawmat_config::LogFormat;
use rawmat_config::RawmatConfig;
use rawmat_config::StoreType;
use tempfile::NamedTempFile;

type TestResult = Result<(), String>;

fn assert_invalid(result: Result<RawmatConfig, ConfigError>, needle: &str) -> TestResult {
    match result {
        Err(error) => {
            let message = error.to_string();
            if message.contains(needle) {
                Ok(())
            } else {
                Err(format!("error {message} did not contain {needle}"))
            }
        }
        Ok(_) => Err("expected invalid config load".to_string()),
    }
}

fn write_config(content: &str) -> Result<NamedTempFile, String> {
    let mut file = NamedTempFile::new().map_err(|err| err.to_string())?;
    file.write_all(content.as_bytes()).map_err(|err| err.to_string())?;
    Ok(file)
}

#[test]
fn load_rejects_path_too_long() -> TestResult {
    let long_path = "a".repeat(5_000);
    let path = Path::new(&long_path);
    assert_invalid(RawmatConfig::load(Some(path)), "config path exceeds max length")?;
    Ok(())
}

#[test]
fn load_rejects_path_component_too_long() -> TestResult {
    let long_component = "a".repeat(300);
    let path = Path::new(&long_component);
    assert_invalid(RawmatConfig::load(Some(path)), "config path component too long")?;
    Ok(())
}

#[test]
fn load_rejects_oversized_file() -> TestResult {
    let mut file = NamedTempFile::new().map_err(|err| err.to_string())?;
    let payload = vec![b'#'; 1_048_577];
    file.write_all(&payload).map_err(|err| err.to_string())?;
    assert_invalid(RawmatConfig::load(Some(file.path())), "config file exceeds size limit")?;
    Ok(())
}

#[test]
fn load_rejects_non_utf8_file() -> TestResult {
    let mut file = NamedTempFile::new().map_err(|err| err.to_string())?;
    file.write_all(&[0xFF, 0xFE, 0xFF]).map_err(|err| err.to_string())?;
    assert_invalid(RawmatConfig::load(Some(file.path())), "config file must be utf-8")?;
    Ok(())
}

#[test]
fn load_rejects_malformed_toml() -> TestResult {
    let file = write_config("[store\ntype = ")?;
    match RawmatConfig::load(Some(file.path())) {
        Err(ConfigError::Parse(_)) => Ok(()),
        other => Err(format!("expected parse error, got {other:?}")),
    }
}

#[test]
fn load_rejects_unknown_store_type() -> TestResult {
    let file = write_config("[store]\ntype = \"postgres\"\n")?;
    match RawmatConfig::load(Some(file.path())) {
        Err(ConfigError::Parse(_)) => Ok(()),
        other => Err(format!("expected parse error, got {other:?}")),
    }
}

#[test]
fn load_rejects_missing_explicit_file() -> TestResult {
    let dir = tempfile::tempdir().map_err(|err| err.to_string())?;
    let path = dir.path().join("missing.toml");
    match RawmatConfig::load(Some(&path)) {
        Err(ConfigError::Io(_)) => Ok(()),
        other => Err(format!("expected io error, got {other:?}")),
    }
}

#[test]
fn empty_file_yields_defaults() -> TestResult {
    let file = write_config("")?;
    let config = RawmatConfig::load(Some(file.path())).map_err(|err| err.to_string())?;
    if config != RawmatConfig::default() {
        return Err(format!("expected defaults, got {config:?}"));
    }
    Ok(())
}

#[test]
fn load_reads_every_section() -> TestResult {
    let file = write_config(
        r#"
[store]
type = "sqlite"
path = "data/ledger.db"
busy_timeout_ms = 2500
journal_mode = "delete"
sync_mode = "normal"
read_pool_size = 2

[lifecycle]
conflict_retries = 5
default_dispensing_method = "fefo"
expiry_alert_days = 60

[logging]
level = "rawmat_core=debug"
format = "json"
event_log = "logs/events.jsonl"
"#,
    )?;
    let config = RawmatConfig::load(Some(file.path())).map_err(|err| err.to_string())?;
    if config.store.store_type != StoreType::Sqlite
        || config.store.effective_path() != Path::new("data/ledger.db")
        || config.store.busy_timeout_ms != 2_500
        || config.store.read_pool_size != 2
    {
        return Err(format!("unexpected store config {:?}", config.store));
    }
    if config.lifecycle.conflict_retries != 5 || config.lifecycle.expiry_alert_days != 60 {
        return Err(format!("unexpected lifecycle config {:?}", config.lifecycle));
    }
    if config.logging.format != LogFormat::Json
        || config.logging.event_log.as_deref() != Some(Path::new("logs/events.jsonl"))
    {
        return Err(format!("unexpected logging config {:?}", config.logging));
    }
    Ok(())
}
