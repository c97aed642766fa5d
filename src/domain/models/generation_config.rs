#[cfg(test)]
#[path = "generation_config_test.rs"]
mod tests;

use std::collections::BTreeMap;
use std::collections::BTreeSet;

use anyhow::bail;
use anyhow::Result;
use serde::Deserialize;
use serde::Serialize;
use serde_json::Map;
use serde_json::Value;
use strum::EnumIter;
use strum::IntoEnumIterator;

#[derive(
    Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, EnumIter, strum::Display,
)]
#[strum(serialize_all = "snake_case")]
pub enum GenerationOption {
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

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum OptionKind {
    Bool,
    Int,
    Float,
    Text,
}

impl GenerationOption {
    pub fn kind(&self) -> OptionKind {
        return match self {
            GenerationOption::MaxNewTokens
            | GenerationOption::TopK
            | GenerationOption::MaxHistoryTurns => OptionKind::Int,
            GenerationOption::Temperature
            | GenerationOption::TopP
            | GenerationOption::RepetitionPenalty => OptionKind::Float,
            GenerationOption::DoSample | GenerationOption::EnableThinking => OptionKind::Bool,
            GenerationOption::SystemPrompt => OptionKind::Text,
        };
    }

    pub fn default_value(&self) -> OptionValue {
        return match self {
            GenerationOption::MaxNewTokens => OptionValue::Int(1024),
            GenerationOption::Temperature => OptionValue::Float(0.7),
            GenerationOption::TopP => OptionValue::Float(0.9),
            GenerationOption::TopK => OptionValue::Int(40),
            GenerationOption::RepetitionPenalty => OptionValue::Float(1.1),
            GenerationOption::DoSample => OptionValue::Bool(true),
            GenerationOption::MaxHistoryTurns => OptionValue::Int(10),
            GenerationOption::SystemPrompt => {
                OptionValue::Text("You are a helpful AI assistant.".to_string())
            }
            GenerationOption::EnableThinking => OptionValue::Bool(true),
        };
    }

    /// Parses a raw string, as found in the config store, into a typed value.
    pub fn parse_value(&self, raw: &str) -> Result<OptionValue> {
        let trimmed = raw.trim();
        let res = match self.kind() {
            OptionKind::Bool => match trimmed {
                "true" | "1" | "yes" | "on" => OptionValue::Bool(true),
                "false" | "0" | "no" | "off" => OptionValue::Bool(false),
                _ => bail!(format!("{self} expects a boolean, got '{raw}'")),
            },
            OptionKind::Int => match trimmed.parse::<i64>() {
                Ok(val) => OptionValue::Int(val),
                Err(_) => bail!(format!("{self} expects an integer, got '{raw}'")),
            },
            OptionKind::Float => match trimmed.parse::<f64>() {
                Ok(val) if val.is_finite() => OptionValue::Float(val),
                _ => bail!(format!("{self} expects a number, got '{raw}'")),
            },
            OptionKind::Text => OptionValue::Text(raw.to_string()),
        };

        return Ok(res);
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum OptionValue {
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
}

impl OptionValue {
    pub fn to_json(&self) -> Value {
        return match self {
            OptionValue::Bool(val) => Value::Bool(*val),
            OptionValue::Int(val) => Value::from(*val),
            OptionValue::Float(val) => Value::from(*val),
            OptionValue::Text(val) => Value::String(val.to_string()),
        };
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct GenerationConfig {
    values: BTreeMap<GenerationOption, OptionValue>,
}

impl Default for GenerationConfig {
    fn default() -> GenerationConfig {
        let values = GenerationOption::iter()
            .map(|option| return (option, option.default_value()))
            .collect();

        return GenerationConfig { values };
    }
}

impl GenerationConfig {
    pub fn get(&self, option: GenerationOption) -> Option<&OptionValue> {
        return self.values.get(&option);
    }

    pub fn set(&mut self, option: GenerationOption, value: OptionValue) {
        self.values.insert(option, value);
    }

    pub fn set_raw(&mut self, option: GenerationOption, raw: &str) -> Result<()> {
        let value = option.parse_value(raw)?;
        self.set(option, value);
        return Ok(());
    }

    /// Builds the request `config` object. Only keys in `supported` are kept.
    /// An unknown capability list (`None`) keeps every configured key.
    pub fn to_request(&self, supported: Option<&BTreeSet<String>>) -> Map<String, Value> {
        return self
            .values
            .iter()
            .filter(|(option, _)| {
                if let Some(keys) = supported {
                    return keys.contains(&option.to_string());
                }
                return true;
            })
            .map(|(option, value)| return (option.to_string(), value.to_json()))
            .collect();
    }
}
