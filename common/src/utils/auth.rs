use async_trait::async_trait;
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{info, warn};

use crate::{error::AppError, utils::config::AppConfig};

const MIN_PASSWORD_LEN: usize = 6;

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Credentials {
    pub email: String,
    pub password: String,
}

impl Credentials {
    pub fn validate(&self) -> Result<(), AppError> {
        let email = self.email.trim();
        if email.is_empty() || !email.contains('@') {
            return Err(AppError::Validation("A valid email is required".into()));
        }
        if self.password.chars().count() < MIN_PASSWORD_LEN {
            return Err(AppError::Validation(format!(
                "Password must be at least {MIN_PASSWORD_LEN} characters"
            )));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct AuthUser {
    pub id: String,
    #[serde(default)]
    pub email: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct AuthSession {
    pub access_token: String,
    #[serde(default)]
    pub refresh_token: Option<String>,
    #[serde(default)]
    pub expires_in: Option<u64>,
    pub user: AuthUser,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SignUpOutcome {
    pub user: AuthUser,
    /// Present when the project confirms accounts automatically.
    pub session: Option<AuthSession>,
}

#[async_trait]
pub trait AuthProvider: Send + Sync {
    async fn sign_up(&self, credentials: &Credentials) -> Result<SignUpOutcome, AppError>;
    async fn sign_in(&self, credentials: &Credentials) -> Result<AuthSession, AppError>;
    async fn sign_out(&self, access_token: &str) -> Result<(), AppError>;
    async fn get_user(&self, access_token: &str) -> Result<AuthUser, AppError>;
}

/// Supabase GoTrue REST client.
pub struct SupabaseAuth {
    client: reqwest::Client,
    base_url: String,
    anon_key: String,
}

impl SupabaseAuth {
    pub fn new(client: reqwest::Client, supabase_url: &str, anon_key: &str) -> Self {
        Self {
            client,
            base_url: format!("{}/auth/v1", supabase_url.trim_end_matches('/')),
            anon_key: anon_key.to_string(),
        }
    }

    pub fn from_config(config: &AppConfig, client: reqwest::Client) -> Self {
        Self::new(client, &config.supabase_url, &config.supabase_anon_key)
    }

    fn request(&self, method: reqwest::Method, path: &str) -> reqwest::RequestBuilder {
        self.client
            .request(method, format!("{}{path}", self.base_url))
            .header("apikey", &self.anon_key)
    }
}

#[async_trait]
impl AuthProvider for SupabaseAuth {
    async fn sign_up(&self, credentials: &Credentials) -> Result<SignUpOutcome, AppError> {
        let response = self
            .request(reqwest::Method::POST, "/signup")
            .json(credentials)
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;
        if !status.is_success() {
            warn!(%status, "Supabase sign-up rejected");
            return Err(map_auth_failure("Supabase sign-up", status, &body));
        }

        let value: Value = serde_json::from_str(&body)?;
        let outcome = parse_sign_up(value)?;
        info!(user_id = %outcome.user.id, "User signed up");
        Ok(outcome)
    }

    async fn sign_in(&self, credentials: &Credentials) -> Result<AuthSession, AppError> {
        let response = self
            .request(reqwest::Method::POST, "/token?grant_type=password")
            .json(credentials)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            warn!(%status, "Supabase sign-in rejected");
            return Err(map_auth_failure("Supabase sign-in", status, &body));
        }

        Ok(response.json::<AuthSession>().await?)
    }

    async fn sign_out(&self, access_token: &str) -> Result<(), AppError> {
        let response = self
            .request(reqwest::Method::POST, "/logout")
            .bearer_auth(access_token)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(map_auth_failure("Supabase sign-out", status, &body));
        }
        Ok(())
    }

    async fn get_user(&self, access_token: &str) -> Result<AuthUser, AppError> {
        let response = self
            .request(reqwest::Method::GET, "/user")
            .bearer_auth(access_token)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(map_auth_failure("Supabase user lookup", status, &body));
        }

        Ok(response.json::<AuthUser>().await?)
    }
}

/// Supabase answers sign-up with a session when auto-confirm is on, otherwise with the bare user.
fn parse_sign_up(value: Value) -> Result<SignUpOutcome, AppError> {
    if value.get("access_token").is_some() {
        let session: AuthSession = serde_json::from_value(value)?;
        return Ok(SignUpOutcome {
            user: session.user.clone(),
            session: Some(session),
        });
    }

    let user_value = value.get("user").cloned().unwrap_or(value);
    let user: AuthUser = serde_json::from_value(user_value)?;
    Ok(SignUpOutcome {
        user,
        session: None,
    })
}

fn map_auth_failure(service: &str, status: StatusCode, body: &str) -> AppError {
    let message = serde_json::from_str::<Value>(body)
        .ok()
        .and_then(|v| {
            ["msg", "error_description", "message"]
                .iter()
                .find_map(|key| v.get(*key).and_then(Value::as_str).map(str::to_string))
        })
        .unwrap_or_else(|| "Authentication failed".to_string());

    match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => AppError::Auth(message),
        StatusCode::BAD_REQUEST | StatusCode::UNPROCESSABLE_ENTITY => {
            if service.ends_with("sign-up") {
                AppError::Validation(message)
            } else {
                AppError::Auth(message)
            }
        }
        _ => AppError::upstream(service, status, body),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn credentials_validation() {
        let ok = Credentials {
            email: "a@b.io".into(),
            password: "secret1".into(),
        };
        assert!(ok.validate().is_ok());

        let bad_email = Credentials {
            email: "nobody".into(),
            password: "secret1".into(),
        };
        assert!(matches!(bad_email.validate(), Err(AppError::Validation(_))));

        let short = Credentials {
            email: "a@b.io".into(),
            password: "123".into(),
        };
        assert!(matches!(short.validate(), Err(AppError::Validation(_))));
    }

    #[test]
    fn sign_up_with_session() {
        let outcome = parse_sign_up(json!({
            "access_token": "tok",
            "refresh_token": "ref",
            "expires_in": 3600,
            "user": {"id": "u1", "email": "a@b.io"}
        }))
        .unwrap();
        assert_eq!(outcome.user.id, "u1");
        assert_eq!(outcome.session.unwrap().access_token, "tok");
    }

    #[test]
    fn sign_up_pending_confirmation() {
        let outcome = parse_sign_up(json!({"id": "u2", "email": "c@d.io", "role": ""})).unwrap();
        assert_eq!(outcome.user.id, "u2");
        assert!(outcome.session.is_none());
    }

    #[test]
    fn auth_failures_map_to_client_errors() {
        let err = map_auth_failure(
            "Supabase sign-in",
            StatusCode::BAD_REQUEST,
            r#"{"error":"invalid_grant","error_description":"Invalid login credentials"}"#,
        );
        assert!(matches!(err, AppError::Auth(msg) if msg == "Invalid login credentials"));

        let err = map_auth_failure(
            "Supabase sign-up",
            StatusCode::UNPROCESSABLE_ENTITY,
            r#"{"msg":"User already registered"}"#,
        );
        assert!(matches!(err, AppError::Validation(msg) if msg == "User already registered"));

        let err = map_auth_failure("Supabase user lookup", StatusCode::BAD_GATEWAY, "oops");
        assert!(matches!(err, AppError::Upstream(_)));
    }
}
