use std::env;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::generator::{default_reference_time, GenerationOptions, DEFAULT_SEED};
use crate::taxonomy::DatasetKind;

pub const CONFIG_FILE_CANDIDATES: [&str; 2] = ["costdeck.toml", "config/costdeck.toml"];

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AppConfig {
    pub generator: GeneratorConfig,
    pub logging: LoggingConfig,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct GeneratorConfig {
    pub dataset: DatasetKind,
    pub seed: u64,
    pub reference_time: ReferenceTime,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LoggingConfig {
    pub level: String,
    pub format: LogFormat,
}

/// The "now" the generator measures windows against.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ReferenceTime {
    #[default]
    Fixed,
    Now,
    At(DateTime<Utc>),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogFormat {
    Compact,
    Pretty,
    Json,
}

#[derive(Clone, Debug, Default)]
pub struct ConfigOverrides {
    pub dataset: Option<DatasetKind>,
    pub seed: Option<u64>,
    pub reference_time: Option<ReferenceTime>,
    pub log_level: Option<String>,
    pub log_format: Option<LogFormat>,
}

#[derive(Clone, Debug, Default)]
pub struct LoadOptions {
    pub config_path: Option<PathBuf>,
    pub require_file: bool,
    pub overrides: ConfigOverrides,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("could not read config file `{path}`: {source}")]
    ReadFile { path: PathBuf, source: std::io::Error },
    #[error("could not parse config file `{path}`: {source}")]
    ParseFile { path: PathBuf, source: toml::de::Error },
    #[error("required config file was not found: `{0}`")]
    MissingConfigFile(PathBuf),
    #[error("environment variable interpolation failed for `{var}`")]
    MissingEnvInterpolation { var: String },
    #[error("unterminated environment interpolation expression")]
    UnterminatedInterpolation,
    #[error("invalid environment override for `{key}`: `{value}`")]
    InvalidEnvOverride { key: String, value: String },
    #[error("configuration validation failed: {0}")]
    Validation(String),
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            generator: GeneratorConfig {
                dataset: DatasetKind::Cloud,
                seed: DEFAULT_SEED,
                reference_time: ReferenceTime::Fixed,
            },
            logging: LoggingConfig { level: "info".to_string(), format: LogFormat::Compact },
        }
    }
}

impl ReferenceTime {
    pub fn resolve(&self) -> DateTime<Utc> {
        match self {
            Self::Fixed => default_reference_time(),
            Self::Now => Utc::now(),
            Self::At(moment) => *moment,
        }
    }
}

impl fmt::Display for ReferenceTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Fixed => f.write_str("fixed"),
            Self::Now => f.write_str("now"),
            Self::At(moment) => f.write_str(&moment.to_rfc3339()),
        }
    }
}

impl std::str::FromStr for ReferenceTime {
    type Err = ConfigError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "fixed" => Ok(Self::Fixed),
            "now" => Ok(Self::Now),
            _ => DateTime::parse_from_rfc3339(value.trim())
                .map(|moment| Self::At(moment.with_timezone(&Utc)))
                .map_err(|_| {
                    ConfigError::Validation(format!(
                        "unsupported reference time `{value}` (expected fixed|now|RFC 3339 timestamp)"
                    ))
                }),
        }
    }
}

impl<'de> Deserialize<'de> for ReferenceTime {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

impl std::str::FromStr for LogFormat {
    type Err = ConfigError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "compact" => Ok(Self::Compact),
            "pretty" => Ok(Self::Pretty),
            "json" => Ok(Self::Json),
            other => Err(ConfigError::Validation(format!(
                "unsupported log format `{other}` (expected compact|pretty|json)"
            ))),
        }
    }
}

impl fmt::Display for LogFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Compact => "compact",
            Self::Pretty => "pretty",
            Self::Json => "json",
        };
        f.write_str(label)
    }
}

impl AppConfig {
    pub fn load(options: LoadOptions) -> Result<Self, ConfigError> {
        let mut config = Self::default();
        let maybe_path = resolve_config_path(options.config_path.as_deref());

        if let Some(path) = maybe_path {
            let patch = read_patch(&path)?;
            config.apply_patch(patch);
        } else if options.require_file {
            let expected =
                options.config_path.unwrap_or_else(|| PathBuf::from(CONFIG_FILE_CANDIDATES[0]));
            return Err(ConfigError::MissingConfigFile(expected));
        }

        config.apply_env_overrides()?;
        config.apply_overrides(options.overrides);
        config.validate()?;

        Ok(config)
    }

    /// Generation options with the reference time resolved at call time.
    pub fn generation_options(&self) -> GenerationOptions {
        GenerationOptions {
            seed: self.generator.seed,
            reference_time: self.generator.reference_time.resolve(),
        }
    }

    fn apply_patch(&mut self, patch: ConfigPatch) {
        if let Some(generator) = patch.generator {
            if let Some(dataset) = generator.dataset {
                self.generator.dataset = dataset;
            }
            if let Some(seed) = generator.seed {
                self.generator.seed = seed;
            }
            if let Some(reference_time) = generator.reference_time {
                self.generator.reference_time = reference_time;
            }
        }

        if let Some(logging) = patch.logging {
            if let Some(level) = logging.level {
                self.logging.level = level;
            }
            if let Some(format) = logging.format {
                self.logging.format = format;
            }
        }
    }

    fn apply_env_overrides(&mut self) -> Result<(), ConfigError> {
        if let Some(value) = read_env("COSTDECK_GENERATOR_DATASET") {
            self.generator.dataset = value.parse().map_err(|_| ConfigError::InvalidEnvOverride {
                key: "COSTDECK_GENERATOR_DATASET".to_string(),
                value: value.clone(),
            })?;
        }
        if let Some(value) = read_env("COSTDECK_GENERATOR_SEED") {
            self.generator.seed = parse_u64("COSTDECK_GENERATOR_SEED", &value)?;
        }
        if let Some(value) = read_env("COSTDECK_GENERATOR_REFERENCE_TIME") {
            self.generator.reference_time = value.parse()?;
        }

        let log_level =
            read_env("COSTDECK_LOGGING_LEVEL").or_else(|| read_env("COSTDECK_LOG_LEVEL"));
        if let Some(value) = log_level {
            self.logging.level = value;
        }
        let log_format =
            read_env("COSTDECK_LOGGING_FORMAT").or_else(|| read_env("COSTDECK_LOG_FORMAT"));
        if let Some(value) = log_format {
            self.logging.format = value.parse()?;
        }

        Ok(())
    }

    fn apply_overrides(&mut self, overrides: ConfigOverrides) {
        if let Some(dataset) = overrides.dataset {
            self.generator.dataset = dataset;
        }
        if let Some(seed) = overrides.seed {
            self.generator.seed = seed;
        }
        if let Some(reference_time) = overrides.reference_time {
            self.generator.reference_time = reference_time;
        }
        if let Some(log_level) = overrides.log_level {
            self.logging.level = log_level;
        }
        if let Some(log_format) = overrides.log_format {
            self.logging.format = log_format;
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        validate_generator(&self.generator)?;
        validate_logging(&self.logging)?;
        Ok(())
    }
}

pub fn resolve_config_path(explicit_path: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = explicit_path {
        return path.exists().then_some(path.to_path_buf());
    }

    CONFIG_FILE_CANDIDATES.into_iter().map(PathBuf::from).find(|path| path.exists())
}

fn read_patch(path: &Path) -> Result<ConfigPatch, ConfigError> {
    let raw = fs::read_to_string(path)
        .map_err(|source| ConfigError::ReadFile { path: path.to_path_buf(), source })?;

    let interpolated = interpolate_env_vars(&raw)?;
    toml::from_str::<ConfigPatch>(&interpolated)
        .map_err(|source| ConfigError::ParseFile { path: path.to_path_buf(), source })
}

fn interpolate_env_vars(input: &str) -> Result<String, ConfigError> {
    let mut output = String::with_capacity(input.len());
    let mut chars = input.chars().peekable();

    while let Some(ch) = chars.next() {
        if ch == '$' && matches!(chars.peek(), Some('{')) {
            chars.next();
            let mut key = String::new();

            loop {
                match chars.next() {
                    Some('}') => break,
                    Some(next) => key.push(next),
                    None => return Err(ConfigError::UnterminatedInterpolation),
                }
            }

            let value = env::var(&key)
                .map_err(|_| ConfigError::MissingEnvInterpolation { var: key.clone() })?;
            output.push_str(&value);
            continue;
        }

        output.push(ch);
    }

    Ok(output)
}

fn validate_generator(generator: &GeneratorConfig) -> Result<(), ConfigError> {
    if let ReferenceTime::At(moment) = generator.reference_time {
        if moment.timestamp() <= 0 {
            return Err(ConfigError::Validation(
                "generator.reference_time must be after the Unix epoch".to_string(),
            ));
        }
    }
    Ok(())
}

fn validate_logging(logging: &LoggingConfig) -> Result<(), ConfigError> {
    let level = logging.level.trim().to_ascii_lowercase();
    match level.as_str() {
        "trace" | "debug" | "info" | "warn" | "error" => Ok(()),
        _ => Err(ConfigError::Validation(
            "logging.level must be one of trace|debug|info|warn|error".to_string(),
        )),
    }
}

fn read_env(key: &str) -> Option<String> {
    env::var(key).ok().filter(|value| !value.trim().is_empty())
}

fn parse_u64(key: &str, value: &str) -> Result<u64, ConfigError> {
    value.trim().parse::<u64>().map_err(|_| ConfigError::InvalidEnvOverride {
        key: key.to_string(),
        value: value.to_string(),
    })
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct ConfigPatch {
    generator: Option<GeneratorPatch>,
    logging: Option<LoggingPatch>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct GeneratorPatch {
    dataset: Option<DatasetKind>,
    seed: Option<u64>,
    reference_time: Option<ReferenceTime>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct LoggingPatch {
    level: Option<String>,
    format: Option<LogFormat>,
}
