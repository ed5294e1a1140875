//! Account flows layered over the identity and profile endpoints: sign-up
//! behind the adult confirmation, and the age gate on profile details.
use tracing::{info, warn};

use skinscan_common::model::{Profile, ProfileUpdate, ADULT_AGE};

use crate::auth::SignUpOutcome;
use crate::backend::BackendClient;
use crate::error::ClientError;
use crate::session::Session;

/// Everything the sign-up form collects.
#[derive(Debug, Clone)]
pub struct SignUpForm {
    pub email: String,
    pub password: String,
    pub full_name: String,
    /// The "I confirm I am 18 or older" checkbox.
    pub confirmed_adult: bool,
}

pub async fn sign_up(
    backend: &BackendClient,
    form: &SignUpForm,
) -> Result<SignUpOutcome, ClientError> {
    if !form.confirmed_adult {
        return Err(ClientError::AgeVerificationRequired);
    }
    Ok(backend
        .sign_up(&form.email, &form.password, form.full_name.trim())
        .await?)
}

/// Whether the user still has to fill in their details before scanning.
/// A missing profile row counts as incomplete.
pub async fn needs_details(
    backend: &BackendClient,
    session: &Session,
) -> Result<bool, ClientError> {
    let profile = backend.get_profile(session).await?;
    Ok(!profile.as_ref().is_some_and(Profile::is_complete))
}

/// Save name and age. Ages under 18 are refused without touching the backend.
pub async fn complete_profile(
    backend: &BackendClient,
    session: &Session,
    full_name: &str,
    age: u32,
) -> Result<Profile, ClientError> {
    if age < ADULT_AGE {
        warn!(user_id = %session.user.id, age, "profile refused: under age");
        return Err(ClientError::Underage { age });
    }
    let update = ProfileUpdate::new(full_name, age);
    let profile = backend
        .update_profile(session, &update)
        .await?
        .ok_or_else(|| ClientError::ProfileMissing(session.user.id.clone()))?;
    info!(user_id = %profile.id, "profile updated");
    Ok(profile)
}
