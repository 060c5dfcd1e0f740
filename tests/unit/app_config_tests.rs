/*!
 * Tests for app configuration functionality
 */

use anyhow::Result;
use std::str::FromStr;
use std::time::Duration;

use docxlate::app_config::{Config, LogLevel, ProviderConfig, TranslationProvider};
use crate::common;

/// Test that the default configuration matches the documented defaults
#[test]
fn test_default_config_shouldHaveDocumentedValues() {
    let config = Config::default();

    assert_eq!(config.source_language, "vi");
    assert_eq!(config.target_language, "ja");
    assert_eq!(config.translation.provider, TranslationProvider::Gemini);
    assert_eq!(config.translation.common.batch_size, 100);
    assert_eq!(config.translation.common.inter_batch_delay_ms, 2000);
    assert_eq!(config.translation.common.delimiter, "|||");
    assert_eq!(config.translation.common.max_tokens, 8192);
    assert!((config.translation.common.temperature - 0.3).abs() < f32::EPSILON);
    assert_eq!(config.paths.system_prompt_path.to_string_lossy(), "trans-excel-system-prompt.txt");
    assert_eq!(config.translation.available_providers.len(), 3);
}

/// Test that every provider gets its own endpoint and model
#[test]
fn test_default_providers_shouldHaveEndpointsAndModels() {
    let mut config = Config::default();

    config.translation.provider = TranslationProvider::LMStudio;
    assert_eq!(config.translation.get_endpoint(), "http://localhost:1234/v1");

    config.translation.provider = TranslationProvider::OpenAI;
    assert_eq!(config.translation.get_endpoint(), "https://api.openai.com/v1");
    assert_eq!(config.translation.get_model(), "gpt-4o-mini");

    config.translation.provider = TranslationProvider::Gemini;
    assert!(config.translation.get_endpoint().contains("generativelanguage.googleapis.com"));
    assert_eq!(config.translation.get_timeout_secs(), 120);
}

/// Test validation of a local provider configuration
#[test]
fn test_validate_withLocalProvider_shouldSucceed() {
    let dir = common::create_temp_dir().unwrap();
    let config = common::test_config(dir.path());

    assert!(config.validate().is_ok());
}

/// Test that identical languages are rejected
#[test]
fn test_validate_withSameLanguages_shouldFail() {
    let dir = common::create_temp_dir().unwrap();
    let mut config = common::test_config(dir.path());
    config.source_language = "ja".to_string();
    config.target_language = "jpn".to_string();

    assert!(config.validate().is_err());
}

/// Test that invalid values are rejected
#[test]
fn test_validate_withInvalidValues_shouldFail() {
    let dir = common::create_temp_dir().unwrap();

    let mut config = common::test_config(dir.path());
    config.target_language = "xx".to_string();
    assert!(config.validate().is_err());

    let mut config = common::test_config(dir.path());
    config.translation.common.batch_size = 0;
    assert!(config.validate().is_err());

    let mut config = common::test_config(dir.path());
    config.translation.common.delimiter = String::new();
    assert!(config.validate().is_err());

    let mut config = common::test_config(dir.path());
    config.translation.common.temperature = 3.5;
    assert!(config.validate().is_err());

    let mut config = common::test_config(dir.path());
    config.translation.active_provider_config_mut().endpoint = "not a url".to_string();
    assert!(config.validate().is_err());
}

/// Test that a hosted provider with a configured key validates
#[test]
fn test_validate_withHostedProviderAndKey_shouldSucceed() {
    let mut config = Config::default();
    config.translation.provider = TranslationProvider::OpenAI;
    config.translation.active_provider_config_mut().api_key = "sk-test".to_string();

    assert!(config.validate().is_ok());
    assert_eq!(config.translation.get_api_key(), "sk-test");
}

/// Test that a missing config file is created with defaults, then reloaded
#[test]
fn test_load_or_create_withMissingFile_shouldCreateThenReload() -> Result<()> {
    let dir = common::create_temp_dir()?;
    let path = dir.path().join("conf.json");

    let (created, was_created) = Config::load_or_create(&path)?;
    assert!(was_created);
    assert!(path.exists());

    let (loaded, was_created) = Config::load_or_create(&path)?;
    assert!(!was_created);
    assert_eq!(loaded.source_language, created.source_language);
    assert_eq!(loaded.translation.common.delimiter, created.translation.common.delimiter);
    Ok(())
}

/// Test that a partial config file gets defaults for the missing fields
#[test]
fn test_load_or_create_withPartialFile_shouldFillDefaults() -> Result<()> {
    let dir = common::create_temp_dir()?;
    let path = common::create_test_file(
        dir.path(),
        "conf.json",
        r#"{ "source_language": "en", "target_language": "fr" }"#,
    )?;

    let (config, _) = Config::load_or_create(&path)?;

    assert_eq!(config.source_language, "en");
    assert_eq!(config.target_language, "fr");
    assert_eq!(config.translation.common.batch_size, 100);
    Ok(())
}

/// Test that batch settings are derived from the common translation config
#[test]
fn test_batch_settings_shouldReflectConfig() {
    let mut config = Config::default();
    config.translation.common.batch_size = 7;
    config.translation.common.inter_batch_delay_ms = 15;
    config.translation.common.delimiter = "@@".to_string();

    let settings = config.batch_settings();

    assert_eq!(settings.batch_size, 7);
    assert_eq!(settings.inter_batch_delay, Duration::from_millis(15));
    assert_eq!(settings.delimiter, "@@");
}

/// Test provider parsing and display
#[test]
fn test_translation_provider_fromStr_shouldParseKnownNames() {
    assert_eq!(TranslationProvider::from_str("gemini").unwrap(), TranslationProvider::Gemini);
    assert_eq!(TranslationProvider::from_str("OpenAI").unwrap(), TranslationProvider::OpenAI);
    assert_eq!(TranslationProvider::from_str("lmstudio").unwrap(), TranslationProvider::LMStudio);
    assert!(TranslationProvider::from_str("anthropic").is_err());

    assert_eq!(TranslationProvider::LMStudio.display_name(), "LM Studio");
    assert!(TranslationProvider::Gemini.requires_api_key());
    assert!(!TranslationProvider::LMStudio.requires_api_key());
    assert_eq!(TranslationProvider::Gemini.api_key_env_var(), Some("GEMINI_API_KEY"));
}

/// Test that a provider config gets the provider defaults
#[test]
fn test_provider_config_new_shouldUseProviderDefaults() {
    let provider = ProviderConfig::new(TranslationProvider::LMStudio);

    assert_eq!(provider.provider_type, "lmstudio");
    assert_eq!(provider.endpoint, "http://localhost:1234/v1");
    assert!(provider.api_key.is_empty());
}

/// Test log level conversion
#[test]
fn test_log_level_toLevelFilter_shouldMap() {
    assert_eq!(LogLevel::Debug.to_level_filter(), log::LevelFilter::Debug);
    assert_eq!(LogLevel::Error.to_level_filter(), log::LevelFilter::Error);
}
