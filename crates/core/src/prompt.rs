//! Request assembly for the tutor model.

use crate::config::Config;
use crate::encode::EncodedImage;

/// Instructions sent ahead of every question.
pub const INSTRUCTION_PREAMBLE: &str = "You are a patient homework tutor. \
Solve the problem step by step and explain each step in plain language a student can follow. \
If an image is attached, first restate the problem it shows, then solve it. \
Format the answer with short headers (#, ##, ###), bullet lists (- item), **bold** for key results \
and `code` for formulas or code. Finish with a line that states the final answer.";

/// Question used when the user attaches an image without typing anything.
pub const DEFAULT_IMAGE_QUESTION: &str = "Solve the problem shown in the image.";

/// One outgoing request to the tutor model.
#[derive(Debug, Clone, PartialEq)]
pub struct TutorRequest {
    pub model: String,
    /// Optional inline image, sent before the text part.
    pub image: Option<EncodedImage>,
    /// Preamble plus the user's literal question.
    pub prompt: String,
    pub temperature: f32,
}

impl TutorRequest {
    /// Builds a request from the user's question and optional image.
    ///
    /// Returns `None` when there is nothing to ask: a blank question and no image.
    pub fn new(config: &Config, question: &str, image: Option<EncodedImage>) -> Option<Self> {
        let question = question.trim();
        let question = match (question.is_empty(), image.is_some()) {
            (true, false) => return None,
            (true, true) => DEFAULT_IMAGE_QUESTION,
            (false, _) => question,
        };

        Some(Self {
            model: config.model_name.clone(),
            image,
            prompt: build_prompt(question),
            temperature: config.temperature,
        })
    }
}

/// Joins the preamble and the question into the text part of a request.
pub fn build_prompt(question: &str) -> String {
    format!("{INSTRUCTION_PREAMBLE}\n\nStudent's question:\n{question}")
}
