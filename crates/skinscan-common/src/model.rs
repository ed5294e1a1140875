use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

/// A structured assessment of one skin image, as produced by the analysis gateway.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScanResult {
    /// Condition label chosen by the model, e.g. "Acne"
    pub disease_name: String,
    /// Model-asserted confidence, 0-100
    pub confidence_score: u8,
    /// Raw severity text from the model; see [`ScanResult::severity_level`]
    pub severity: String,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub symptoms: Vec<String>,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub recommendations: Vec<String>,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub food_recommendations: Vec<String>,
}

/// Stored rows may hold `null` in the array columns.
fn null_as_empty<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<Vec<String>>::deserialize(deserializer)?.unwrap_or_default())
}

impl ScanResult {
    /// The severity as a known level, or `None` when the model used some other wording.
    pub fn severity_level(&self) -> Option<Severity> {
        self.severity.parse().ok()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Mild,
    Moderate,
    Severe,
}

impl Severity {
    pub fn as_str(self) -> &'static str {
        match self {
            Severity::Mild => "mild",
            Severity::Moderate => "moderate",
            Severity::Severe => "severe",
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown severity: {0}")]
pub struct UnknownSeverity(pub String);

impl FromStr for Severity {
    type Err = UnknownSeverity;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "mild" => Ok(Severity::Mild),
            "moderate" => Ok(Severity::Moderate),
            "severe" => Ok(Severity::Severe),
            _ => Err(UnknownSeverity(s.to_string())),
        }
    }
}

/// A persisted scan: one row of the `skin_scans` table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScanRecord {
    pub id: String,
    pub user_id: String,
    /// Public URL of the uploaded image
    pub image_url: String,
    #[serde(flatten)]
    pub result: ScanResult,
    pub created_at: DateTime<Utc>,
}

impl ScanRecord {
    pub fn new(
        id: String,
        user_id: &str,
        image_url: &str,
        result: ScanResult,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            user_id: user_id.to_string(),
            image_url: image_url.to_string(),
            result,
            created_at,
        }
    }
}

/// Per-user profile row holding the display name and the age gate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Profile {
    pub id: String,
    #[serde(default)]
    pub full_name: Option<String>,
    #[serde(default)]
    pub age: Option<u32>,
    #[serde(default)]
    pub is_adult: bool,
}

impl Profile {
    /// A profile is complete once the user has stated their age.
    pub fn is_complete(&self) -> bool {
        self.age.is_some()
    }
}

/// Fields written when the user fills in their details.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProfileUpdate {
    pub full_name: String,
    pub age: u32,
    pub is_adult: bool,
}

pub const ADULT_AGE: u32 = 18;

impl ProfileUpdate {
    pub fn new(full_name: &str, age: u32) -> Self {
        Self {
            full_name: full_name.trim().to_string(),
            age,
            is_adult: age >= ADULT_AGE,
        }
    }
}
