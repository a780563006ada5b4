use crate::chat::TutorBackend;
use crate::config::Config;
use crate::error::{AppError, Result};
use crate::prompt::TutorRequest;
use gemini_rust::{Blob, Content, Gemini, GenerationResponse, Message, Part, Role};
use std::future::Future;
use std::pin::Pin;

const BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta/";

/// Stream of answer text chunks in arrival order.
pub type AnswerStream = Pin<Box<dyn futures::Stream<Item = Result<String>> + Send>>;

pub struct GeminiClient {
    client: Gemini,
}

impl GeminiClient {
    pub fn new(config: &Config) -> Result<Self> {
        // Explicit base URL, the default one trips a BadScheme error
        let base_url = url::Url::parse(BASE_URL)
            .map_err(|e| AppError::config(format!("Invalid base URL: {}", e)))?;

        let model_url = format!("{}{}", BASE_URL, model_path(&config.model_name));

        let client = Gemini::with_model_and_base_url(&config.gemini_api_key, model_url, base_url)
            .map_err(|e| AppError::config(format!("Failed to create Gemini client: {}", e)))?;

        Ok(Self { client })
    }

    /// Sends the request and returns the full answer text.
    pub async fn generate(&self, request: TutorRequest) -> Result<String> {
        let temperature = request.temperature;
        let response = self
            .client
            .generate_content()
            .with_messages(vec![build_message(request)])
            .with_temperature(temperature)
            .execute()
            .await
            .map_err(|e| AppError::gemini(format!("API request failed: {:?}", e)))?;

        let text = response_text(&response);
        if text.is_empty() {
            return Err(AppError::gemini("No text response received from Gemini"));
        }
        Ok(text)
    }

    /// Sends the request and streams the answer as it is generated.
    pub async fn generate_stream(&self, request: TutorRequest) -> Result<AnswerStream> {
        use futures::TryStreamExt;

        let temperature = request.temperature;
        let stream = self
            .client
            .generate_content()
            .with_messages(vec![build_message(request)])
            .with_temperature(temperature)
            .execute_stream()
            .await
            .map_err(|e| AppError::gemini(format!("API request failed: {:?}", e)))?;

        let mapped = stream
            .map_err(|e| AppError::gemini(format!("Stream error: {:?}", e)))
            .try_filter_map(|response| async move {
                let text = response_text(&response);
                Ok(if text.is_empty() { None } else { Some(text) })
            });

        Ok(Box::pin(mapped))
    }
}

impl TutorBackend for GeminiClient {
    fn answer(&self, request: TutorRequest) -> impl Future<Output = Result<String>> + Send {
        self.generate(request)
    }
}

/// Normalizes a model name to the `models/<name>` form the REST path expects.
fn model_path(model_name: &str) -> String {
    if model_name.starts_with("models/") {
        model_name.to_string()
    } else {
        format!("models/{}", model_name)
    }
}

/// Builds the user message: inline image first, then the text block.
fn build_message(request: TutorRequest) -> Message {
    let mut parts = Vec::with_capacity(2);

    if let Some(image) = request.image {
        parts.push(Part::InlineData {
            inline_data: Blob {
                mime_type: image.mime_type,
                data: image.data,
            },
        });
    }

    parts.push(Part::Text {
        text: request.prompt,
        thought: None,
        thought_signature: None,
    });

    Message {
        role: Role::User,
        content: Content {
            role: Some(Role::User),
            parts: Some(parts),
        },
    }
}

/// Concatenates the non-thought text parts of the first candidate.
fn response_text(response: &GenerationResponse) -> String {
    let Some(candidate) = response.candidates.first() else {
        return String::new();
    };
    let Some(parts) = &candidate.content.parts else {
        return String::new();
    };

    parts
        .iter()
        .filter_map(|part| match part {
            Part::Text { text, thought, .. } if !thought.unwrap_or(false) => Some(text.as_str()),
            _ => None,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::encode::encode_bytes;

    fn request(with_image: bool) -> TutorRequest {
        TutorRequest {
            model: "gemini-flash-latest".into(),
            image: with_image.then(|| encode_bytes(b"img", "image/png")),
            prompt: "solve".into(),
            temperature: 0.4,
        }
    }

    #[test]
    fn image_part_comes_first() {
        let message = build_message(request(true));
        let parts = message.content.parts.unwrap();
        assert_eq!(parts.len(), 2);
        match &parts[0] {
            Part::InlineData { inline_data } => {
                assert_eq!(inline_data.mime_type, "image/png");
                assert_eq!(inline_data.data, "aW1n");
            }
            other => panic!("expected inline data, got {other:?}"),
        }
        assert!(matches!(&parts[1], Part::Text { text, .. } if text == "solve"));
    }

    #[test]
    fn text_only_message() {
        let parts = build_message(request(false)).content.parts.unwrap();
        assert_eq!(parts.len(), 1);
        assert!(matches!(&parts[0], Part::Text { .. }));
    }

    #[test]
    fn model_names_are_prefixed_once() {
        assert_eq!(model_path("gemini-2.5-pro"), "models/gemini-2.5-pro");
        assert_eq!(model_path("models/gemini-2.5-pro"), "models/gemini-2.5-pro");
    }
}
