//! Commentary generation
//!
//! Turns a source file plus an abstraction level into model prompts, calls the
//! configured provider once, and shapes the reply into the comment array the
//! store expects.

use crate::error::ApiError;
use crate::language::Language;
use crate::level::{AbstractionLevel, CommentShape};
use crate::provider::{ChatMessage, CompletionOptions, ModelProviderClient};
use crate::reconcile::{reconcile_line_comments, source_lines};
use serde::{Deserialize, Serialize};
use std::time::Instant;
use tracing::{debug, info, warn};

/// Input to one generation call.
#[derive(Debug, Clone, PartialEq)]
pub struct CommentaryRequest {
    pub code: String,
    pub language: Language,
    pub file_name: String,
    pub abstraction_level: AbstractionLevel,
}

/// Outcome of one generation call. `success == false` carries no comments.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommentaryResponse {
    pub comments: Vec<String>,
    pub model: String,
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl CommentaryResponse {
    pub fn success(comments: Vec<String>, model: impl Into<String>) -> Self {
        Self {
            comments,
            model: model.into(),
            success: true,
            error: None,
        }
    }

    pub fn failure(model: impl Into<String>, error: impl Into<String>) -> Self {
        Self {
            comments: Vec::new(),
            model: model.into(),
            success: false,
            error: Some(error.into()),
        }
    }
}

const SYSTEM_PROMPT: &str = "You are an experienced software engineer who writes clear, \
accurate commentary for source code. Explain intent and behavior, not syntax. \
Never wrap your answer in code fences.";

pub struct CommentaryGenerator {
    client: Box<dyn ModelProviderClient>,
    options: CompletionOptions,
}

impl CommentaryGenerator {
    pub fn new(client: Box<dyn ModelProviderClient>, options: CompletionOptions) -> Self {
        Self { client, options }
    }

    pub fn model_name(&self) -> &str {
        self.client.model_name()
    }

    pub fn provider_name(&self) -> &str {
        self.client.provider_name()
    }

    /// Generate commentary for `request`. Provider failures come back as a
    /// failure response, never as `Err`.
    pub async fn generate(&self, request: &CommentaryRequest) -> CommentaryResponse {
        let messages = vec![
            ChatMessage::system(SYSTEM_PROMPT),
            ChatMessage::user(build_user_prompt(request)),
        ];

        let start = Instant::now();
        info!(
            file = %request.file_name,
            level = request.abstraction_level.as_u8(),
            provider = self.client.provider_name(),
            model = self.client.model_name(),
            "Requesting commentary"
        );

        let response = match self.client.complete(messages, self.options.clone()).await {
            Ok(response) => response,
            Err(e) => {
                let e = self.describe_failure(e).await;
                warn!(
                    file = %request.file_name,
                    duration_ms = start.elapsed().as_millis() as u64,
                    error = %e,
                    "Commentary generation failed"
                );
                return CommentaryResponse::failure(self.client.model_name(), e.to_string());
            }
        };

        debug!(
            file = %request.file_name,
            duration_ms = start.elapsed().as_millis() as u64,
            completion_tokens = response.usage.completion_tokens,
            "Commentary received"
        );

        let model = if response.model.is_empty() {
            self.client.model_name().to_string()
        } else {
            response.model
        };

        match shape_comments(&response.content, request) {
            Some(comments) => CommentaryResponse::success(comments, model),
            None => CommentaryResponse::failure(model, "Model returned an empty response"),
        }
    }

    /// Name the available models when the configured one is unknown.
    async fn describe_failure(&self, error: ApiError) -> ApiError {
        if !matches!(error, ApiError::ProviderModelNotFound(_)) {
            return error;
        }
        match self.client.list_models().await {
            Ok(models) if !models.is_empty() => ApiError::ProviderModelNotFound(format!(
                "Model '{}' not found. Available models: {}",
                self.client.model_name(),
                models.join(", ")
            )),
            _ => error,
        }
    }
}

/// Build the user turn: level instruction, file identity, then the code.
pub fn build_user_prompt(request: &CommentaryRequest) -> String {
    let level = request.abstraction_level;
    let code = match level.shape() {
        CommentShape::PerLine => numbered(&request.code),
        CommentShape::Single => request.code.clone(),
    };
    format!(
        "{}\n\nFile: {}\nLanguage: {}\n\n{}\n",
        level.instruction(),
        request.file_name,
        request.language.tag(),
        code
    )
}

fn numbered(code: &str) -> String {
    source_lines(code)
        .iter()
        .enumerate()
        .map(|(i, line)| format!("{:>4} | {}", i + 1, line))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Shape the raw reply for the level. `None` when there is nothing usable.
fn shape_comments(content: &str, request: &CommentaryRequest) -> Option<Vec<String>> {
    let content = strip_code_fence(content);
    match request.abstraction_level.shape() {
        CommentShape::Single => {
            let summary = content.trim();
            if summary.is_empty() {
                None
            } else {
                Some(vec![summary.to_string()])
            }
        }
        CommentShape::PerLine => {
            let comments = reconcile_line_comments(content, &request.code);
            debug_assert_eq!(
                comments.len(),
                request
                    .abstraction_level
                    .expected_comment_count(source_lines(&request.code).len())
            );
            Some(comments)
        }
    }
}

fn strip_code_fence(content: &str) -> &str {
    let trimmed = content.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return content;
    };
    let Some(body) = rest.strip_suffix("```") else {
        return content;
    };
    // Drop the language tag line after the opening fence.
    match body.find('\n') {
        Some(idx) => &body[idx + 1..],
        None => body,
    }
}
