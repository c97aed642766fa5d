#[cfg(test)]
#[path = "config_test.rs"]
mod tests;

use std::collections::HashMap;
use std::path;

use anyhow::bail;
use anyhow::Result;
use clap::ArgMatches;
use clap::Command;
use dashmap::DashMap;
use once_cell::sync::Lazy;
use strum::EnumIter;
use strum::EnumVariantNames;
use strum::IntoEnumIterator;
use tokio::fs;

use crate::domain::models::GenerationConfig;
use crate::domain::models::GenerationOption;
use crate::domain::models::OptionValue;
use crate::domain::services::FrameMode;
use crate::domain::services::DEFAULT_MAX_FILE_BYTES;

static CONFIG: Lazy<DashMap<String, String>> = Lazy::new(DashMap::new);

#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, EnumIter, EnumVariantNames, strum::Display)]
#[strum(serialize_all = "kebab-case")]
pub enum ConfigKey {
    ConfigFile,
    ServerURL,
    RequestTimeout,
    MaxFileBytes,
    StreamReassemble,
    SessionID,
    Transcript,
    MaxNewTokens,
    Temperature,
    TopP,
    TopK,
    RepetitionPenalty,
    DoSample,
    MaxHistoryTurns,
    SystemPrompt,
    EnableThinking,
}

impl ConfigKey {
    /// The generation option a key configures, if any.
    pub fn generation_option(&self) -> Option<GenerationOption> {
        return match self {
            ConfigKey::MaxNewTokens => Some(GenerationOption::MaxNewTokens),
            ConfigKey::Temperature => Some(GenerationOption::Temperature),
            ConfigKey::TopP => Some(GenerationOption::TopP),
            ConfigKey::TopK => Some(GenerationOption::TopK),
            ConfigKey::RepetitionPenalty => Some(GenerationOption::RepetitionPenalty),
            ConfigKey::DoSample => Some(GenerationOption::DoSample),
            ConfigKey::MaxHistoryTurns => Some(GenerationOption::MaxHistoryTurns),
            ConfigKey::SystemPrompt => Some(GenerationOption::SystemPrompt),
            ConfigKey::EnableThinking => Some(GenerationOption::EnableThinking),
            _ => None,
        };
    }
}

fn option_default(option: GenerationOption) -> String {
    return match option.default_value() {
        OptionValue::Bool(val) => val.to_string(),
        OptionValue::Int(val) => val.to_string(),
        OptionValue::Float(val) => val.to_string(),
        OptionValue::Text(val) => val,
    };
}

/// Fails when `value` can't be used for `key`. Keys with a fixed set of
/// values are checked against the clap value parsers.
fn validate(cmd: &Command, key: ConfigKey, value: &str) -> Result<()> {
    if let Some(option) = key.generation_option() {
        option.parse_value(value)?;
        return Ok(());
    }

    if key == ConfigKey::RequestTimeout || key == ConfigKey::MaxFileBytes {
        if value.parse::<u64>().is_err() {
            bail!(format!("expected a positive integer, got '{value}'"));
        }
        return Ok(());
    }

    if let Some(arg) = cmd
        .get_arguments()
        .find(|e| return e.get_long() == Some(key.to_string().as_str()))
    {
        let possible_values = arg
            .get_possible_values()
            .iter()
            .map(|e| return e.get_name().to_string())
            .collect::<Vec<String>>();

        if !possible_values.is_empty() && !possible_values.contains(&value.to_string()) {
            bail!(format!(
                "{value}\nPossible values are: {}",
                possible_values.join(", ")
            ));
        }
    }

    return Ok(());
}

fn toml_value(val: &toml_edit::Item) -> Option<String> {
    if let Some(val_int) = val.as_integer() {
        return Some(val_int.to_string());
    }
    if let Some(val_float) = val.as_float() {
        return Some(val_float.to_string());
    }
    if let Some(val_bool) = val.as_bool() {
        return Some(val_bool.to_string());
    }
    return val.as_str().map(|val_str| return val_str.to_string());
}

pub struct Config {}

impl Config {
    pub fn get(key: ConfigKey) -> String {
        if let Some(val) = CONFIG.get(&key.to_string()) {
            return val.to_string();
        }

        return "".to_string();
    }

    pub fn set(key: ConfigKey, value: &str) {
        CONFIG.insert(key.to_string(), value.to_string());
    }

    pub fn default(key: ConfigKey) -> String {
        if let Some(option) = key.generation_option() {
            return option_default(option);
        }

        let config_path = dirs::config_dir()
            .unwrap_or_else(|| return path::PathBuf::from("."))
            .join("idlechat/config.toml");

        return match key {
            ConfigKey::ServerURL => "http://127.0.0.1:8000".to_string(),
            ConfigKey::RequestTimeout => "1000".to_string(),
            ConfigKey::MaxFileBytes => DEFAULT_MAX_FILE_BYTES.to_string(),
            ConfigKey::StreamReassemble => "false".to_string(),

            // Special
            ConfigKey::ConfigFile => config_path.to_string_lossy().to_string(),
            _ => "".to_string(),
        };
    }

    /// Reads defaults, then the config file, then CLI flags and environment
    /// variables. Nothing is stored unless every value is valid.
    pub async fn load(cmd: Command, clap_arg_matches: Vec<&ArgMatches>) -> Result<()> {
        let mut values = ConfigKey::iter()
            .map(|key| return (key, Config::default(key)))
            .collect::<HashMap<ConfigKey, String>>();

        let mut config_file = Config::default(ConfigKey::ConfigFile);
        for matches in clap_arg_matches.as_slice() {
            if let Ok(Some(arg_config_file)) =
                matches.try_get_one::<String>(&ConfigKey::ConfigFile.to_string())
            {
                config_file = arg_config_file.to_string();
            }
        }
        values.insert(ConfigKey::ConfigFile, config_file.to_string());

        let config_path = path::PathBuf::from(config_file);
        if config_path.exists() {
            let toml_str = fs::read_to_string(config_path).await?;
            let doc = toml_str.parse::<toml_edit::Document>()?;

            for key in ConfigKey::iter() {
                if let Some(val) = doc.get(&key.to_string()) {
                    let val_str = match toml_value(val) {
                        Some(val_str) => val_str,
                        None => bail!(format!("config.toml has an unsupported value type for key '{key}'")),
                    };
                    if val_str.is_empty() {
                        continue;
                    }
                    if let Err(err) = validate(&cmd, key, &val_str) {
                        bail!(format!("config.toml has an invalid value for key '{key}': {err}"));
                    }
                    values.insert(key, val_str);
                }
            }
        }

        for key in ConfigKey::iter() {
            for matches in clap_arg_matches.as_slice() {
                if let Ok(Some(val)) = matches.try_get_one::<String>(&key.to_string()) {
                    if val.is_empty() {
                        continue;
                    }
                    if let Err(err) = validate(&cmd, key, val) {
                        bail!(format!("Invalid value for '{key}': {err}"));
                    }
                    values.insert(key, val.to_string());
                }
            }
        }

        for (key, val) in values.iter() {
            Config::set(*key, val);
        }

        tracing::debug!(
            server_url = Config::get(ConfigKey::ServerURL),
            session_id = Config::get(ConfigKey::SessionID),
            stream_reassemble = Config::get(ConfigKey::StreamReassemble),
            "config"
        );

        return Ok(());
    }

    /// Generation options as configured.
    pub fn generation_config() -> Result<GenerationConfig> {
        let mut config = GenerationConfig::default();
        for key in ConfigKey::iter() {
            if let Some(option) = key.generation_option() {
                let val = Config::get(key);
                if val.is_empty() {
                    continue;
                }
                config.set_raw(option, &val)?;
            }
        }

        return Ok(config);
    }

    pub fn frame_mode() -> FrameMode {
        if Config::get(ConfigKey::StreamReassemble) == "true" {
            return FrameMode::Reassemble;
        }

        return FrameMode::PerChunk;
    }

    pub fn max_file_bytes() -> usize {
        return Config::get(ConfigKey::MaxFileBytes)
            .parse::<usize>()
            .unwrap_or(DEFAULT_MAX_FILE_BYTES);
    }

    pub fn serialize_default(cmd: Command) -> String {
        let toml_str = ConfigKey::iter()
            .filter_map(|key| {
                if key == ConfigKey::SessionID || key == ConfigKey::ConfigFile {
                    return None;
                }

                let arg = cmd
                    .get_arguments()
                    .find(|e| return e.get_long() == Some(key.to_string().as_str()))?;

                let help = arg
                    .get_help()
                    .map(|help| return help.to_string())
                    .unwrap_or_default();
                let description = help.split("[default:").next().unwrap_or_default().trim();

                let mut val = Config::default(key);
                if val.is_empty() {
                    val = format!("# {key} = \"\"");
                } else if val.parse::<f64>().is_ok() || val == "true" || val == "false" {
                    val = format!("{key} = {val}");
                } else {
                    val = format!("{key} = \"{val}\"");
                }

                return Some(format!("# {description}\n{val}"));
            })
            .collect::<Vec<String>>()
            .join("\n\n");

        return toml_str;
    }
}
