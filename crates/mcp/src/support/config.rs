#![forbid(unsafe_code)]

use serde::Deserialize;
use std::path::{Path, PathBuf};

pub(crate) const DEFAULT_STORAGE_DIR: &str = ".reagent_ledger";
pub(crate) const DEFAULT_LOG_FILTER: &str = "warn";

const ENV_STORAGE_DIR: &str = "RL_STORAGE_DIR";
const ENV_CONFIG: &str = "RL_CONFIG";
const ENV_LOG: &str = "RL_LOG";

/// Optional YAML config document. Every key is optional.
#[derive(Clone, Debug, Default, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
struct FileConfig {
    #[serde(default)]
    storage_dir: Option<PathBuf>,
    #[serde(default)]
    log: Option<String>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
struct CliArgs {
    storage_dir: Option<PathBuf>,
    config: Option<PathBuf>,
    log: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) struct RuntimeConfig {
    pub(crate) storage_dir: PathBuf,
    pub(crate) log_filter: String,
    pub(crate) config_path: Option<PathBuf>,
}

#[derive(Debug)]
pub(crate) enum ConfigError {
    MissingValue(String),
    UnknownFlag(String),
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    Parse {
        path: PathBuf,
        source: serde_yaml::Error,
    },
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::MissingValue(flag) => write!(f, "{flag} requires a value"),
            Self::UnknownFlag(flag) => write!(f, "unknown flag: {flag} (see --help)"),
            Self::Read { path, source } => {
                write!(f, "cannot read config {}: {source}", path.display())
            }
            Self::Parse { path, source } => {
                write!(f, "invalid config {}: {source}", path.display())
            }
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Read { source, .. } => Some(source),
            Self::Parse { source, .. } => Some(source),
            _ => None,
        }
    }
}

impl RuntimeConfig {
    /// Resolves settings with precedence CLI > environment > config file > defaults.
    pub(crate) fn resolve<F>(args: &[String], env: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let lookup = |key: &str| env(key).filter(|value| !value.trim().is_empty());
        let cli = parse_cli(args)?;

        let config_path = cli.config.clone().or_else(|| lookup(ENV_CONFIG).map(PathBuf::from));
        let file = match config_path.as_deref() {
            Some(path) => load_file(path)?,
            None => FileConfig::default(),
        };

        let storage_dir = cli
            .storage_dir
            .or_else(|| lookup(ENV_STORAGE_DIR).map(PathBuf::from))
            .or(file.storage_dir)
            .unwrap_or_else(|| PathBuf::from(DEFAULT_STORAGE_DIR));
        let log_filter = cli
            .log
            .or_else(|| lookup(ENV_LOG))
            .or(file.log)
            .unwrap_or_else(|| DEFAULT_LOG_FILTER.to_string());

        Ok(Self {
            storage_dir,
            log_filter,
            config_path,
        })
    }

    pub(crate) fn from_process() -> Result<Self, ConfigError> {
        let args = std::env::args().skip(1).collect::<Vec<_>>();
        Self::resolve(&args, |key| std::env::var(key).ok())
    }
}

fn parse_cli(args: &[String]) -> Result<CliArgs, ConfigError> {
    let mut out = CliArgs::default();
    let mut iter = args.iter();
    while let Some(arg) = iter.next() {
        let (flag, inline) = match arg.split_once('=') {
            Some((flag, value)) if flag.starts_with("--") => (flag, Some(value.to_string())),
            _ => (arg.as_str(), None),
        };
        let mut value = || {
            inline
                .clone()
                .or_else(|| iter.next().cloned())
                .ok_or_else(|| ConfigError::MissingValue(flag.to_string()))
        };
        match flag {
            "--storage-dir" => out.storage_dir = Some(PathBuf::from(value()?)),
            "--config" => out.config = Some(PathBuf::from(value()?)),
            "--log" => out.log = Some(value()?),
            "-h" | "--help" | "-V" | "--version" => {}
            other => return Err(ConfigError::UnknownFlag(other.to_string())),
        }
    }
    Ok(out)
}

fn load_file(path: &Path) -> Result<FileConfig, ConfigError> {
    let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    if raw.trim().is_empty() {
        return Ok(FileConfig::default());
    }
    serde_yaml::from_str(&raw).map_err(|source| ConfigError::Parse {
        path: path.to_path_buf(),
        source,
    })
}
