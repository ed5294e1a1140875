use std::fmt;

use serde::Serialize;

use crate::analysis::AnalysisError;
use crate::capture::CaptureError;
use crate::error::ClientError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum NoticeVariant {
    Default,
    Destructive,
}

/// A transient message shown to the user after an operation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Notice {
    pub title: String,
    pub description: String,
    pub variant: NoticeVariant,
}

/// User-facing operations, for picking notice wording.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    SignIn,
    SignUp,
    SaveProfile,
    Capture,
    Analyze,
    LoadHistory,
    DeleteScan,
}

impl Notice {
    fn new(title: &str, description: impl Into<String>, variant: NoticeVariant) -> Self {
        Self {
            title: title.to_string(),
            description: description.into(),
            variant,
        }
    }

    pub fn success(op: Operation) -> Self {
        let (title, description) = match op {
            Operation::SignIn => ("Welcome back!", "Successfully logged in."),
            Operation::SignUp => (
                "Account created!",
                "Please check your email to verify your account.",
            ),
            Operation::SaveProfile => (
                "Profile Updated",
                "Your information has been saved successfully.",
            ),
            Operation::Capture => ("Photo Captured", "Your photo is ready for analysis."),
            Operation::Analyze => (
                "Analysis Complete",
                "Your skin analysis has been completed successfully.",
            ),
            Operation::LoadHistory => ("History Loaded", "Your scan history is up to date."),
            Operation::DeleteScan => ("Deleted", "Scan deleted successfully"),
        };
        Self::new(title, description, NoticeVariant::Default)
    }

    pub fn failure(op: Operation, err: &ClientError) -> Self {
        let destructive = |title: &str, description: String| {
            Self::new(title, description, NoticeVariant::Destructive)
        };
        match (op, err) {
            (_, ClientError::Capture(CaptureError::PermissionDenied)) => destructive(
                "Camera Access Denied",
                "Please allow camera access to capture images.".to_string(),
            ),
            (_, ClientError::Capture(_)) => destructive("Capture Failed", err.to_string()),
            (Operation::SignUp, ClientError::AgeVerificationRequired) => {
                destructive("Age Verification Required", err.to_string())
            }
            (_, ClientError::Underage { .. }) => destructive("Age Requirement", err.to_string()),
            (Operation::SignIn | Operation::SignUp, _) => {
                destructive("Authentication Error", err.to_string())
            }
            (Operation::Analyze, ClientError::Analysis(AnalysisError::Request(_))) => destructive(
                "Analysis Failed",
                "Failed to analyze image. Please try again.".to_string(),
            ),
            (Operation::Analyze, _) => destructive("Analysis Failed", err.to_string()),
            (Operation::LoadHistory, _) => {
                destructive("Error", "Failed to load scan history".to_string())
            }
            (Operation::DeleteScan, _) => destructive("Error", "Failed to delete scan".to_string()),
            (Operation::Capture, _) => destructive("Capture Failed", err.to_string()),
            (Operation::SaveProfile, _) => destructive("Error", err.to_string()),
        }
    }
}

impl ClientError {
    pub fn notice(&self, op: Operation) -> Notice {
        Notice::failure(op, self)
    }
}

impl fmt::Display for Notice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.title, self.description)
    }
}
