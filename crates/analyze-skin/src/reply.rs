/// Extraction and validation of the model's free-text reply.
///
/// The model is asked for bare JSON but frequently wraps it in a markdown fence.
/// One fence-stripping pass is made, then the text must parse as a JSON object
/// whose `disease_name`, `confidence_score`, and `severity` are all truthy.
/// Nothing here touches the network.
use std::sync::LazyLock;

use regex::Regex;
use serde_json::{Map, Value};

use skinscan_common::model::ScanResult;

static DATA_URL_PREFIX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^data:image/[^;,]+;base64,").expect("valid regex"));
static JSON_FENCE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"```json\s*([\s\S]*?)\s*```").expect("valid regex"));
static ANY_FENCE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"```\s*([\s\S]*?)\s*```").expect("valid regex"));

#[derive(Debug, thiserror::Error)]
pub enum ReplyError {
    #[error("Failed to parse AI response as JSON")]
    Parse(#[source] serde_json::Error),

    #[error("Invalid response format from AI")]
    Invalid { detail: String },
}

impl ReplyError {
    fn invalid(detail: impl Into<String>) -> Self {
        ReplyError::Invalid {
            detail: detail.into(),
        }
    }
}

/// Drop a leading `data:image/<fmt>;base64,` marker, leaving the bare payload.
pub fn strip_data_url_prefix(image: &str) -> &str {
    match DATA_URL_PREFIX.find(image) {
        Some(m) => &image[m.end()..],
        None => image,
    }
}

/// Return the body of the first fenced code block, preferring a `json` fence.
///
/// Text without a fence is returned trimmed.
pub fn strip_code_fences(content: &str) -> &str {
    JSON_FENCE
        .captures(content)
        .or_else(|| ANY_FENCE.captures(content))
        .and_then(|caps| caps.get(1))
        .map_or(content, |m| m.as_str())
        .trim()
}

pub fn parse_model_reply(content: &str) -> Result<ScanResult, ReplyError> {
    let json = strip_code_fences(content);
    let value: Value = serde_json::from_str(json).map_err(ReplyError::Parse)?;
    validate_reply(value)
}

fn validate_reply(value: Value) -> Result<ScanResult, ReplyError> {
    let Value::Object(obj) = value else {
        return Err(ReplyError::invalid("reply is not a JSON object"));
    };

    let disease_name = required_text(&obj, "disease_name")?;
    let confidence_score = required_score(&obj, "confidence_score")?;
    let severity = required_text(&obj, "severity")?;

    Ok(ScanResult {
        disease_name,
        confidence_score,
        severity,
        symptoms: string_list(&obj, "symptoms")?,
        recommendations: string_list(&obj, "recommendations")?,
        food_recommendations: string_list(&obj, "food_recommendations")?,
    })
}

fn required_text(obj: &Map<String, Value>, field: &str) -> Result<String, ReplyError> {
    match obj.get(field) {
        Some(Value::String(s)) if !s.trim().is_empty() => Ok(s.clone()),
        Some(Value::String(_)) => Err(ReplyError::invalid(format!("{field} is empty"))),
        Some(other) => Err(ReplyError::invalid(format!(
            "{field} must be a string, got {other}"
        ))),
        None => Err(ReplyError::invalid(format!("{field} is missing"))),
    }
}

/// Zero counts as missing, as it is falsy. Any other number is rounded and
/// clamped into 0-100.
fn required_score(obj: &Map<String, Value>, field: &str) -> Result<u8, ReplyError> {
    let score = match obj.get(field) {
        Some(Value::Number(n)) => n.as_f64(),
        Some(Value::String(s)) => s.trim().parse::<f64>().ok(),
        Some(_) => None,
        None => return Err(ReplyError::invalid(format!("{field} is missing"))),
    }
    .ok_or_else(|| ReplyError::invalid(format!("{field} is not a number")))?;

    if score == 0.0 || score.is_nan() {
        return Err(ReplyError::invalid(format!("{field} is zero")));
    }
    Ok(score.round().clamp(0.0, 100.0) as u8)
}

fn string_list(obj: &Map<String, Value>, field: &str) -> Result<Vec<String>, ReplyError> {
    match obj.get(field) {
        None | Some(Value::Null) => Ok(Vec::new()),
        Some(Value::Array(items)) => items
            .iter()
            .map(|item| match item {
                Value::String(s) => Ok(s.clone()),
                other => Err(ReplyError::invalid(format!(
                    "{field} must contain strings, got {other}"
                ))),
            })
            .collect(),
        Some(other) => Err(ReplyError::invalid(format!(
            "{field} must be an array, got {other}"
        ))),
    }
}
