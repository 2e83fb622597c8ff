// Configuration loading and parsing (draftroomd.toml).

use std::path::{Path, PathBuf};

use directories::ProjectDirs;
use serde::Deserialize;
use thiserror::Error;

pub const CONFIG_FILE: &str = "draftroomd.toml";

/// File name used when the database lives in the platform data directory.
const DEFAULT_DB_FILE: &str = "draftroom.db";

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("config file not found: {path}")]
    FileNotFound { path: PathBuf },

    #[error("failed to parse config file {path}: {source}")]
    ParseError {
        path: PathBuf,
        source: toml::de::Error,
    },

    #[error("validation error for field `{field}`: {message}")]
    ValidationError { field: String, message: String },

    #[error("failed to initialize config from defaults: {message}")]
    DefaultsCopyError { message: String },
}

// ---------------------------------------------------------------------------
// Config structs
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct Config {
    /// Resolved database location.
    pub db_path: PathBuf,
    pub sweeper: SweeperConfig,
    pub events: EventsConfig,
    pub players: PlayersConfig,
    pub logging: LoggingConfig,
}

/// Raw deserialization target for draftroomd.toml.
#[derive(Debug, Clone, Deserialize)]
struct ConfigFile {
    database: DatabaseSection,
    sweeper: SweeperConfig,
    #[serde(default)]
    events: EventsConfig,
    #[serde(default)]
    players: PlayersConfig,
    #[serde(default)]
    logging: LoggingConfig,
}

#[derive(Debug, Clone, Deserialize)]
struct DatabaseSection {
    #[serde(default)]
    path: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SweeperConfig {
    pub interval_seconds: u64,
    pub max_concurrent_drafts: usize,
}

#[derive(Debug, Clone, Deserialize)]
pub struct EventsConfig {
    pub channel_capacity: usize,
}

impl Default for EventsConfig {
    fn default() -> Self {
        EventsConfig {
            channel_capacity: 256,
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct PlayersConfig {
    /// Seed CSV imported on startup, relative to the working directory.
    #[serde(default)]
    pub csv_path: Option<PathBuf>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    pub filter: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        LoggingConfig {
            filter: "draftroomd=info,draftroom_engine=info,draftroom_core=info,warn".into(),
        }
    }
}

// ---------------------------------------------------------------------------
// Loading logic
// ---------------------------------------------------------------------------

/// Load and validate `config/draftroomd.toml` relative to `base_dir`.
/// Does not copy defaults; see [`load_config`].
pub(crate) fn load_config_from(base_dir: &Path) -> Result<Config, ConfigError> {
    let path = base_dir.join("config").join(CONFIG_FILE);
    let text = read_file(&path)?;
    let file: ConfigFile = toml::from_str(&text).map_err(|e| ConfigError::ParseError {
        path: path.clone(),
        source: e,
    })?;

    let db_path = resolve_db_path(&file.database.path)?;
    let players = PlayersConfig {
        csv_path: file
            .players
            .csv_path
            .filter(|p| !p.as_os_str().is_empty())
            .map(|p| if p.is_relative() { base_dir.join(p) } else { p }),
    };

    let config = Config {
        db_path,
        sweeper: file.sweeper,
        events: file.events,
        players,
        logging: file.logging,
    };

    validate(&config)?;

    Ok(config)
}

/// Seed `config/draftroomd.toml` from `defaults/` on first run. An existing
/// config file is never touched. Returns the path written, if any.
pub fn ensure_config_file(base_dir: &Path) -> Result<Option<PathBuf>, ConfigError> {
    let target = base_dir.join("config").join(CONFIG_FILE);
    if target.is_file() {
        return Ok(None);
    }
    let source = base_dir.join("defaults").join(CONFIG_FILE);
    let content = std::fs::read(&source).map_err(|e| ConfigError::DefaultsCopyError {
        message: format!(
            "no config at {} and no shipped default at {}: {e}",
            target.display(),
            source.display()
        ),
    })?;

    if let Some(dir) = target.parent() {
        std::fs::create_dir_all(dir).map_err(|e| ConfigError::DefaultsCopyError {
            message: format!("failed to create {}: {e}", dir.display()),
        })?;
    }

    // Another process may have written it since the check above.
    match std::fs::OpenOptions::new()
        .write(true)
        .create_new(true)
        .open(&target)
    {
        Ok(mut dest) => {
            std::io::Write::write_all(&mut dest, &content).map_err(|e| {
                ConfigError::DefaultsCopyError {
                    message: format!("failed to write {}: {e}", target.display()),
                }
            })?;
            Ok(Some(target))
        }
        Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => Ok(None),
        Err(e) => Err(ConfigError::DefaultsCopyError {
            message: format!("failed to create {}: {e}", target.display()),
        }),
    }
}

/// Load config relative to the current working directory, copying
/// defaults first.
pub fn load_config() -> Result<Config, ConfigError> {
    let cwd = std::env::current_dir().map_err(|_| ConfigError::FileNotFound {
        path: PathBuf::from("."),
    })?;
    ensure_config_file(&cwd)?;
    load_config_from(&cwd)
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn read_file(path: &Path) -> Result<String, ConfigError> {
    std::fs::read_to_string(path).map_err(|_| ConfigError::FileNotFound {
        path: path.to_path_buf(),
    })
}

/// An empty path means the platform data directory.
fn resolve_db_path(raw: &str) -> Result<PathBuf, ConfigError> {
    let raw = raw.trim();
    if !raw.is_empty() {
        return Ok(PathBuf::from(raw));
    }
    ProjectDirs::from("", "", "draftroom")
        .map(|dirs| dirs.data_dir().join(DEFAULT_DB_FILE))
        .ok_or_else(|| ConfigError::ValidationError {
            field: "database.path".into(),
            message: "no platform data directory available; set an explicit path".into(),
        })
}

// ---------------------------------------------------------------------------
// Validation
// ---------------------------------------------------------------------------

fn validate(config: &Config) -> Result<(), ConfigError> {
    if config.sweeper.interval_seconds == 0 {
        return Err(ConfigError::ValidationError {
            field: "sweeper.interval_seconds".into(),
            message: "must be greater than 0".into(),
        });
    }

    if config.sweeper.max_concurrent_drafts == 0 {
        return Err(ConfigError::ValidationError {
            field: "sweeper.max_concurrent_drafts".into(),
            message: "must be greater than 0".into(),
        });
    }

    if config.events.channel_capacity == 0 {
        return Err(ConfigError::ValidationError {
            field: "events.channel_capacity".into(),
            message: "must be greater than 0".into(),
        });
    }

    if config.logging.filter.trim().is_empty() {
        return Err(ConfigError::ValidationError {
            field: "logging.filter".into(),
            message: "must not be empty".into(),
        });
    }

    Ok(())
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    /// Helper: the draftroomd crate root, whether tests run from the crate
    /// or the workspace root.
    fn crate_root() -> PathBuf {
        let cwd = std::env::current_dir().unwrap();
        if cwd.join("defaults").exists() {
            cwd
        } else if cwd.join("crates/draftroomd/defaults").exists() {
            cwd.join("crates/draftroomd")
        } else {
            panic!("Cannot locate defaults/ directory from CWD {:?}", cwd);
        }
    }

    /// Fresh temp dir holding `config/draftroomd.toml` with `contents`.
    fn temp_config(name: &str, contents: &str) -> PathBuf {
        let tmp = std::env::temp_dir().join(name);
        let _ = fs::remove_dir_all(&tmp);
        fs::create_dir_all(tmp.join("config")).unwrap();
        fs::write(tmp.join("config").join(CONFIG_FILE), contents).unwrap();
        tmp
    }

    #[test]
    fn load_default_config() {
        let tmp = std::env::temp_dir().join("draftroomd_config_defaults");
        let _ = fs::remove_dir_all(&tmp);
        fs::create_dir_all(tmp.join("defaults")).unwrap();
        fs::copy(
            crate_root().join("defaults").join(CONFIG_FILE),
            tmp.join("defaults").join(CONFIG_FILE),
        )
        .unwrap();

        let copied = ensure_config_file(&tmp).unwrap();
        assert_eq!(copied, Some(tmp.join("config").join(CONFIG_FILE)));
        assert_eq!(ensure_config_file(&tmp).unwrap(), None);

        let config = load_config_from(&tmp).expect("defaults should load");
        assert_eq!(config.db_path, PathBuf::from("draftroom.db"));
        assert_eq!(config.sweeper.interval_seconds, 5);
        assert_eq!(config.sweeper.max_concurrent_drafts, 8);
        assert_eq!(config.events.channel_capacity, 256);
        assert!(config.players.csv_path.is_none());
        assert!(config.logging.filter.contains("draftroom_engine=info"));

        let _ = fs::remove_dir_all(&tmp);
    }

    #[test]
    fn existing_config_is_not_overwritten() {
        let tmp = temp_config(
            "draftroomd_config_keep",
            "[database]\npath = \"keep.db\"\n[sweeper]\ninterval_seconds = 2\nmax_concurrent_drafts = 1\n",
        );
        fs::create_dir_all(tmp.join("defaults")).unwrap();
        fs::copy(
            crate_root().join("defaults").join(CONFIG_FILE),
            tmp.join("defaults").join(CONFIG_FILE),
        )
        .unwrap();
        fs::write(tmp.join("defaults").join("players.csv"), "name\n").unwrap();

        assert_eq!(ensure_config_file(&tmp).unwrap(), None);
        // Only the daemon's own config is ever seeded.
        assert!(!tmp.join("config").join("players.csv").exists());

        let config = load_config_from(&tmp).unwrap();
        assert_eq!(config.db_path, PathBuf::from("keep.db"));
        assert_eq!(config.sweeper.interval_seconds, 2);

        let _ = fs::remove_dir_all(&tmp);
    }

    #[test]
    fn optional_sections_fall_back_to_defaults() {
        let tmp = temp_config(
            "draftroomd_config_minimal",
            "[database]\npath = \":memory:\"\n[sweeper]\ninterval_seconds = 1\nmax_concurrent_drafts = 2\n\n[players]\ncsv_path = \"seed/players.csv\"\n",
        );
        let config = load_config_from(&tmp).unwrap();
        assert_eq!(config.db_path, PathBuf::from(":memory:"));
        assert_eq!(config.events.channel_capacity, 256);
        assert_eq!(
            config.players.csv_path,
            Some(tmp.join("seed/players.csv"))
        );
        assert_eq!(config.logging.filter, LoggingConfig::default().filter);

        let _ = fs::remove_dir_all(&tmp);
    }

    #[test]
    fn zero_interval_is_rejected() {
        let tmp = temp_config(
            "draftroomd_config_zero_interval",
            "[database]\npath = \"x.db\"\n[sweeper]\ninterval_seconds = 0\nmax_concurrent_drafts = 2\n",
        );
        match load_config_from(&tmp) {
            Err(ConfigError::ValidationError { field, .. }) => {
                assert_eq!(field, "sweeper.interval_seconds");
            }
            other => panic!("expected validation error, got {other:?}"),
        }
        let _ = fs::remove_dir_all(&tmp);
    }

    #[test]
    fn zero_concurrency_is_rejected() {
        let tmp = temp_config(
            "draftroomd_config_zero_concurrency",
            "[database]\npath = \"x.db\"\n[sweeper]\ninterval_seconds = 3\nmax_concurrent_drafts = 0\n",
        );
        match load_config_from(&tmp) {
            Err(ConfigError::ValidationError { field, .. }) => {
                assert_eq!(field, "sweeper.max_concurrent_drafts");
            }
            other => panic!("expected validation error, got {other:?}"),
        }
        let _ = fs::remove_dir_all(&tmp);
    }

    #[test]
    fn malformed_toml_reports_path() {
        let tmp = temp_config("draftroomd_config_malformed", "[sweeper\ninterval_seconds = ");
        match load_config_from(&tmp) {
            Err(ConfigError::ParseError { path, .. }) => {
                assert!(path.ends_with("config/draftroomd.toml"));
            }
            other => panic!("expected parse error, got {other:?}"),
        }
        let _ = fs::remove_dir_all(&tmp);
    }

    #[test]
    fn missing_file_and_missing_dirs() {
        let tmp = std::env::temp_dir().join("draftroomd_config_missing");
        let _ = fs::remove_dir_all(&tmp);
        fs::create_dir_all(&tmp).unwrap();

        assert!(matches!(
            load_config_from(&tmp),
            Err(ConfigError::FileNotFound { .. })
        ));
        assert!(matches!(
            ensure_config_file(&tmp),
            Err(ConfigError::DefaultsCopyError { .. })
        ));
        let _ = fs::remove_dir_all(&tmp);
    }

    #[test]
    fn empty_db_path_uses_data_dir() {
        match resolve_db_path("") {
            Ok(path) => assert!(path.ends_with(DEFAULT_DB_FILE)),
            // Some sandboxes have no home directory at all.
            Err(ConfigError::ValidationError { field, .. }) => assert_eq!(field, "database.path"),
            Err(other) => panic!("unexpected error {other:?}"),
        }
    }
}
