use std::collections::BTreeSet;

use anyhow::Result;
use serde_json::json;
use serde_json::Value;

use super::GenerationConfig;
use super::GenerationOption;
use super::OptionValue;

#[test]
fn it_has_defaults() {
    let config = GenerationConfig::default();
    assert_eq!(
        config.get(GenerationOption::MaxNewTokens),
        Some(&OptionValue::Int(1024))
    );
    assert_eq!(
        config.get(GenerationOption::Temperature),
        Some(&OptionValue::Float(0.7))
    );
    assert_eq!(
        config.get(GenerationOption::SystemPrompt),
        Some(&OptionValue::Text("You are a helpful AI assistant.".to_string()))
    );
    assert_eq!(
        config.get(GenerationOption::EnableThinking),
        Some(&OptionValue::Bool(true))
    );
}

#[test]
fn it_names_options_in_snake_case() {
    assert_eq!(GenerationOption::MaxNewTokens.to_string(), "max_new_tokens");
    assert_eq!(GenerationOption::TopP.to_string(), "top_p");
    assert_eq!(
        GenerationOption::RepetitionPenalty.to_string(),
        "repetition_penalty"
    );
}

#[test]
fn it_parses_values_by_kind() -> Result<()> {
    assert_eq!(
        GenerationOption::TopK.parse_value("12")?,
        OptionValue::Int(12)
    );
    assert_eq!(
        GenerationOption::TopP.parse_value("0.5")?,
        OptionValue::Float(0.5)
    );
    assert_eq!(
        GenerationOption::DoSample.parse_value("false")?,
        OptionValue::Bool(false)
    );
    assert_eq!(
        GenerationOption::SystemPrompt.parse_value("Be brief.")?,
        OptionValue::Text("Be brief.".to_string())
    );
    return Ok(());
}

#[test]
fn it_rejects_invalid_values() {
    assert!(GenerationOption::TopK.parse_value("many").is_err());
    assert!(GenerationOption::Temperature.parse_value("NaN").is_err());
    assert!(GenerationOption::DoSample.parse_value("maybe").is_err());
}

#[test]
fn it_keeps_every_key_without_capabilities() {
    let config = GenerationConfig::default();
    let req = config.to_request(None);
    assert_eq!(req.len(), 9);
    assert_eq!(req.get("top_k"), Some(&json!(40)));
    assert_eq!(req.get("do_sample"), Some(&Value::Bool(true)));
}

#[test]
fn it_omits_unsupported_keys() {
    let config = GenerationConfig::default();
    let supported = ["temperature", "max_new_tokens", "unrelated"]
        .iter()
        .map(|e| return e.to_string())
        .collect::<BTreeSet<String>>();

    let req = config.to_request(Some(&supported));
    assert_eq!(
        Value::Object(req),
        json!({ "max_new_tokens": 1024, "temperature": 0.7 })
    );
}

#[test]
fn it_omits_everything_for_empty_capabilities() {
    let config = GenerationConfig::default();
    let req = config.to_request(Some(&BTreeSet::new()));
    assert!(req.is_empty());
}
