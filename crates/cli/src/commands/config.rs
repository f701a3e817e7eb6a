use std::env;
use std::fs;
use std::path::Path;

use costdeck_core::config::{resolve_config_path, AppConfig, ConfigOverrides};
use serde::Serialize;
use toml::Value;

use super::CommandResult;

#[derive(Debug, Serialize)]
struct ConfigEntry {
    key: &'static str,
    value: String,
    source: String,
}

pub fn run(
    config: &AppConfig,
    config_path: Option<&Path>,
    overrides: &ConfigOverrides,
) -> CommandResult {
    let config_file_path = resolve_config_path(config_path);
    let config_file_doc = load_config_file_doc(config_file_path.as_deref());
    let source = |key: &'static str, flagged: bool, env_keys: &[&str]| {
        if flagged {
            return "flag".to_string();
        }
        field_source(key, env_keys, config_file_doc.as_ref(), config_file_path.as_deref())
    };

    let entries = vec![
        ConfigEntry {
            key: "generator.dataset",
            value: config.generator.dataset.to_string(),
            source: source(
                "generator.dataset",
                overrides.dataset.is_some(),
                &["COSTDECK_GENERATOR_DATASET"],
            ),
        },
        ConfigEntry {
            key: "generator.seed",
            value: config.generator.seed.to_string(),
            source: source(
                "generator.seed",
                overrides.seed.is_some(),
                &["COSTDECK_GENERATOR_SEED"],
            ),
        },
        ConfigEntry {
            key: "generator.reference_time",
            value: config.generator.reference_time.to_string(),
            source: source(
                "generator.reference_time",
                overrides.reference_time.is_some(),
                &["COSTDECK_GENERATOR_REFERENCE_TIME"],
            ),
        },
        ConfigEntry {
            key: "logging.level",
            value: config.logging.level.clone(),
            source: source(
                "logging.level",
                overrides.log_level.is_some(),
                &["COSTDECK_LOGGING_LEVEL", "COSTDECK_LOG_LEVEL"],
            ),
        },
        ConfigEntry {
            key: "logging.format",
            value: config.logging.format.to_string(),
            source: source(
                "logging.format",
                overrides.log_format.is_some(),
                &["COSTDECK_LOGGING_FORMAT", "COSTDECK_LOG_FORMAT"],
            ),
        },
    ];

    let mut lines =
        vec!["effective config (source precedence: flag > env > file > default):".to_string()];
    lines.extend(entries.iter().map(render_line));

    CommandResult::success_with_data("config", lines.join("\n"), entries)
}

fn load_config_file_doc(path: Option<&Path>) -> Option<Value> {
    let path = path?;
    let raw = fs::read_to_string(path).ok()?;
    raw.parse::<Value>().ok()
}

fn field_source(
    key_path: &str,
    env_keys: &[&str],
    config_file_doc: Option<&Value>,
    config_file_path: Option<&Path>,
) -> String {
    if let Some(env_key) = env_keys.iter().find(|key| env::var_os(key).is_some()) {
        return format!("env ({env_key})");
    }

    if let Some(doc) = config_file_doc {
        if contains_path(doc, key_path) {
            let file_path = config_file_path
                .map(|path| path.display().to_string())
                .unwrap_or_else(|| "config file".to_string());
            return format!("file ({file_path})");
        }
    }

    "default".to_string()
}

fn contains_path(root: &Value, key_path: &str) -> bool {
    let mut current = root;
    for key in key_path.split('.') {
        let Some(next) = current.get(key) else {
            return false;
        };
        current = next;
    }
    true
}

fn render_line(entry: &ConfigEntry) -> String {
    format!("- {} = {} (source: {})", entry.key, entry.value, entry.source)
}
