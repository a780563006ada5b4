use std::env;
use crate::error::{AppError, Result};
use dotenvy::dotenv;

/// Model used when neither the environment nor the settings name one.
pub const DEFAULT_MODEL: &str = "gemini-flash-latest";

/// Sampling temperature for homework answers.
pub const DEFAULT_TEMPERATURE: f32 = 0.4;

#[derive(Clone, Debug)]
pub struct Config {
    pub gemini_api_key: String,
    pub model_name: String,
    pub temperature: f32,
}

impl Config {
    pub fn load() -> Result<Self> {
        // Load .env file if it exists, ignore if it doesn't
        let _ = dotenv();

        let api_key = env::var("GEMINI_API_KEY")
            .map_err(|_| AppError::config("GEMINI_API_KEY must be set in environment or .env file"))?;

        let model_name = env::var("GEMINI_MODEL")
            .unwrap_or_else(|_| DEFAULT_MODEL.to_string());

        let temperature = match env::var("HOMEWORK_TEMPERATURE") {
            Ok(raw) => raw
                .parse::<f32>()
                .map_err(|_| AppError::config(format!("HOMEWORK_TEMPERATURE is not a number: {raw}")))?,
            Err(_) => DEFAULT_TEMPERATURE,
        };

        ConfigBuilder::default()
            .with_api_key(api_key)
            .with_model(model_name)
            .with_temperature(temperature)
            .build()
    }

    pub fn builder() -> ConfigBuilder {
        ConfigBuilder::default()
    }
}

/// Builds a [`Config`] from values collected in the settings panel or CLI flags.
#[derive(Default, Debug)]
pub struct ConfigBuilder {
    api_key: Option<String>,
    model: Option<String>,
    temperature: Option<f32>,
}

impl ConfigBuilder {
    pub fn with_api_key(mut self, key: impl Into<String>) -> Self {
        self.api_key = Some(key.into());
        self
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }

    pub fn build(self) -> Result<Config> {
        let gemini_api_key = self
            .api_key
            .filter(|k| !k.trim().is_empty())
            .ok_or_else(|| AppError::config("A Gemini API key is required"))?;

        let model_name = self
            .model
            .filter(|m| !m.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_MODEL.to_string());

        let temperature = self.temperature.unwrap_or(DEFAULT_TEMPERATURE);
        if !(0.0..=2.0).contains(&temperature) {
            return Err(AppError::config(format!(
                "Temperature must be between 0.0 and 2.0, got {temperature}"
            )));
        }

        Ok(Config {
            gemini_api_key,
            model_name,
            temperature,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builder_fills_defaults() {
        let config = Config::builder().with_api_key("key").build().unwrap();
        assert_eq!(config.model_name, DEFAULT_MODEL);
        assert_eq!(config.temperature, 0.4);
    }

    #[test]
    fn builder_rejects_missing_key() {
        let err = Config::builder().with_model("gemini-2.5-pro").build().unwrap_err();
        assert!(matches!(err, AppError::Config(_)));

        let err = Config::builder().with_api_key("   ").build().unwrap_err();
        assert!(matches!(err, AppError::Config(_)));
    }

    #[test]
    fn builder_rejects_out_of_range_temperature() {
        let err = Config::builder()
            .with_api_key("key")
            .with_temperature(3.5)
            .build()
            .unwrap_err();
        assert!(matches!(err, AppError::Config(_)));
    }

    #[test]
    fn blank_model_falls_back() {
        let config = Config::builder()
            .with_api_key("key")
            .with_model("")
            .build()
            .unwrap();
        assert_eq!(config.model_name, DEFAULT_MODEL);
    }
}
