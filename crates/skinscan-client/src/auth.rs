use reqwest::Method;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::info;

use crate::backend::BackendClient;
use crate::error::BackendError;
use crate::session::{Session, SessionEvent, User};

#[derive(Debug, Clone, Serialize)]
struct Credentials<'a> {
    email: &'a str,
    password: &'a str,
}

/// Sign-up answers with a full session when no email confirmation is pending,
/// and with the bare user otherwise.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum SignUpResponse {
    Session(Session),
    User(User),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignUpOutcome {
    pub user: User,
    /// `None` until the user confirms their email address.
    pub session: Option<Session>,
}

impl BackendClient {
    pub async fn sign_up(
        &self,
        email: &str,
        password: &str,
        full_name: &str,
    ) -> Result<SignUpOutcome, BackendError> {
        let url = self.url(&["auth", "v1", "signup"])?;
        let body = json!({
            "email": email,
            "password": password,
            "data": { "full_name": full_name },
        });
        let resp: SignUpResponse =
            Self::send_json(self.request(Method::POST, url, None).json(&body)).await?;

        let outcome = match resp {
            SignUpResponse::Session(session) => SignUpOutcome {
                user: session.user.clone(),
                session: Some(session),
            },
            SignUpResponse::User(user) => SignUpOutcome {
                user,
                session: None,
            },
        };
        info!(
            user_id = %outcome.user.id,
            confirmed = outcome.session.is_some(),
            "account created"
        );
        if let Some(session) = &outcome.session {
            self.events.emit(SessionEvent::SignedIn(session.clone()));
        }
        Ok(outcome)
    }

    pub async fn sign_in(&self, email: &str, password: &str) -> Result<Session, BackendError> {
        let mut url = self.url(&["auth", "v1", "token"])?;
        url.query_pairs_mut().append_pair("grant_type", "password");
        let session: Session = Self::send_json(
            self.request(Method::POST, url, None)
                .json(&Credentials { email, password }),
        )
        .await?;
        info!(user_id = %session.user.id, "signed in");
        self.events.emit(SessionEvent::SignedIn(session.clone()));
        Ok(session)
    }

    /// Revoke the session. Consumes it: a signed-out session must not be reused.
    pub async fn sign_out(&self, session: Session) -> Result<(), BackendError> {
        let url = self.url(&["auth", "v1", "logout"])?;
        Self::send_empty(self.request(Method::POST, url, Some(&session))).await?;
        info!(user_id = %session.user.id, "signed out");
        self.events.emit(SessionEvent::SignedOut);
        Ok(())
    }

    /// The user the session's token belongs to, as the identity provider sees it now.
    pub async fn current_user(&self, session: &Session) -> Result<User, BackendError> {
        let url = self.url(&["auth", "v1", "user"])?;
        Self::send_json(self.request(Method::GET, url, Some(session))).await
    }
}
