use std::fmt::Write as _;
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;
use tracing::{debug, info};

use eco_common::openai::{ChatCompletionRequest, Message, OpenAiClient, ResponseFormat};
use eco_engine::{CategoryDefinition, IndicatorRubric};

use crate::error::AppError;
use crate::rate_limit::RateLimiter;

/// Inputs for one fact-extraction call.
pub struct ExtractionRequest<'a> {
    pub product_name: &'a str,
    pub category: &'a CategoryDefinition,
    pub search_context: &'a str,
    pub locale: &'a str,
}

/// Capability that turns product context into per-criterion `{score, evidence}` records.
///
/// Implementations return the raw JSON payload; decoding and tolerance of malformed
/// criteria happen in the engine.
#[async_trait]
pub trait FactExtractor: Send + Sync {
    async fn extract(&self, request: &ExtractionRequest<'_>) -> Result<Value, AppError>;
}

pub struct LlmFactExtractor {
    client: Arc<OpenAiClient>,
    model: String,
    limiter: Option<RateLimiter>,
}

impl LlmFactExtractor {
    pub fn new(client: Arc<OpenAiClient>, model: String, limiter: Option<RateLimiter>) -> Self {
        Self {
            client,
            model,
            limiter,
        }
    }
}

#[async_trait]
impl FactExtractor for LlmFactExtractor {
    async fn extract(&self, request: &ExtractionRequest<'_>) -> Result<Value, AppError> {
        if let Some(limiter) = &self.limiter {
            limiter.check().await?;
        }

        let chat = ChatCompletionRequest {
            model: self.model.clone(),
            messages: build_messages(request),
            temperature: Some(0.0),
            max_tokens: Some(1_500),
            response_format: Some(ResponseFormat::json_object()),
        };
        let response = self.client.chat_completions(chat, None).await?;

        if let Some(usage) = &response.usage {
            debug!(
                model = %self.model,
                prompt_tokens = ?usage.prompt_tokens,
                completion_tokens = ?usage.completion_tokens,
                "extraction usage"
            );
        }

        let text = response.first_content().ok_or_else(|| {
            AppError::Extraction("missing choices[0].message.content".to_string())
        })?;
        let payload = parse_json_reply(text)?;
        info!(
            product = request.product_name,
            category = %request.category.id,
            "facts extracted"
        );
        Ok(payload)
    }
}

pub fn build_messages(request: &ExtractionRequest<'_>) -> Vec<Message> {
    let system = "You assess product sustainability from evidence. Reply with one JSON object \
of the form {\"criteria\": {\"<criterion>\": {\"score\": <integer 0-100>, \"evidence\": [\"...\"]}}, \
\"certifications\": [\"...\"], \"origin\": \"<country or empty>\"}. Score every listed criterion. \
Use only the provided context and widely known facts about the brand; when evidence is missing \
give a conservative score and say so in the evidence.";

    let mut prompt = String::new();
    let _ = writeln!(prompt, "Product: {}", request.product_name);
    let _ = writeln!(
        prompt,
        "Category: {} ({})",
        request.category.name, request.category.id
    );
    let _ = writeln!(
        prompt,
        "Write evidence strings in the language of locale '{}'.",
        request.locale
    );
    let _ = writeln!(prompt, "\nCriteria:");
    for (criterion, config) in &request.category.sustainability_criteria {
        let _ = writeln!(prompt, "- {criterion} (weight {:.2})", config.weight);
        for indicator in &config.indicators {
            let _ = writeln!(
                prompt,
                "  * {}: {}",
                indicator.name, indicator.description
            );
            if let Some(rubric) = &indicator.evaluation {
                write_rubric(&mut prompt, rubric);
            }
        }
    }

    if request.search_context.trim().is_empty() {
        let _ = writeln!(prompt, "\nNo web context was found for this product.");
    } else {
        let _ = writeln!(prompt, "\nWeb context:\n{}", request.search_context);
    }

    vec![Message::system(system), Message::user(prompt)]
}

fn write_rubric(prompt: &mut String, rubric: &IndicatorRubric) {
    for (label, band) in [
        ("excellent", &rubric.excellent),
        ("good", &rubric.good),
        ("acceptable", &rubric.acceptable),
        ("poor", &rubric.poor),
    ] {
        let _ = writeln!(
            prompt,
            "    {label} (>= {}): {}",
            band.threshold, band.description
        );
    }
}

/// Decode the model reply, tolerating markdown code fences and chatter around the object.
pub fn parse_json_reply(text: &str) -> Result<Value, AppError> {
    let trimmed = text.trim();
    let start = trimmed.find('{');
    let end = trimmed.rfind('}');
    let (Some(start), Some(end)) = (start, end) else {
        return Err(AppError::Extraction(
            "reply does not contain a JSON object".to_string(),
        ));
    };
    if end < start {
        return Err(AppError::Extraction(
            "reply does not contain a JSON object".to_string(),
        ));
    }
    serde_json::from_str(&trimmed[start..=end])
        .map_err(|e| AppError::Extraction(format!("reply is not valid JSON: {e}")))
}
