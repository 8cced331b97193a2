use anyhow::{anyhow, Result};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Serialize)]
struct PasswordGrant {
    email: String,
    password: String,
}

#[derive(Serialize)]
struct SignUpRequest {
    email: String,
    password: String,
    data: SignUpMetadata,
}

#[derive(Serialize)]
struct SignUpMetadata {
    name: String,
}

/// Issued session. Sign-up may return no token when the project requires
/// email confirmation, hence the default.
#[derive(Debug, Clone, Deserialize)]
pub struct Session {
    #[serde(default)]
    pub access_token: String,
    pub token_type: Option<String>,
    pub user: Option<AuthUser>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AuthUser {
    pub id: Option<String>,
    pub email: Option<String>,
}

/// Client for a Supabase-compatible auth backend (password grant + signup).
#[derive(Clone)]
pub struct AuthClient {
    client: Client,
    base_url: String,
    api_key: String,
}

impl AuthClient {
    pub fn new(base_url: &str, api_key: &str) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
        }
    }

    pub async fn sign_in(&self, email: &str, password: &str) -> Result<Session> {
        let url = format!("{}/auth/v1/token?grant_type=password", self.base_url);
        let request = PasswordGrant {
            email: email.to_string(),
            password: password.to_string(),
        };

        let response = self
            .client
            .post(&url)
            .header("apikey", &self.api_key)
            .json(&request)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(anyhow!(extract_error_message(status.as_u16(), &body)));
        }

        Ok(response.json().await?)
    }

    pub async fn sign_up(&self, email: &str, password: &str, name: &str) -> Result<Session> {
        let url = format!("{}/auth/v1/signup", self.base_url);
        let request = SignUpRequest {
            email: email.to_string(),
            password: password.to_string(),
            data: SignUpMetadata {
                name: name.to_string(),
            },
        };

        let response = self
            .client
            .post(&url)
            .header("apikey", &self.api_key)
            .json(&request)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(anyhow!(extract_error_message(status.as_u16(), &body)));
        }

        Ok(response.json().await?)
    }
}

/// Pull the human-readable message out of an auth error body. The backend
/// varies the shape by endpoint (`error_description`, `msg`, or a nested
/// `error.message`), so try each before falling back to the status code.
fn extract_error_message(status: u16, body: &str) -> String {
    if let Ok(value) = serde_json::from_str::<Value>(body) {
        for key in ["error_description", "msg", "message"] {
            if let Some(msg) = value.get(key).and_then(Value::as_str) {
                return msg.to_string();
            }
        }
        if let Some(msg) = value
            .get("error")
            .and_then(|e| e.get("message"))
            .and_then(Value::as_str)
        {
            return msg.to_string();
        }
    }
    format!("Authentication failed with status {}", status)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_error_description() {
        let body = r#"{"error":"invalid_grant","error_description":"Invalid login credentials"}"#;
        assert_eq!(extract_error_message(400, body), "Invalid login credentials");
    }

    #[test]
    fn test_extract_msg_field() {
        let body = r#"{"code":422,"msg":"Password should be at least 6 characters"}"#;
        assert_eq!(
            extract_error_message(422, body),
            "Password should be at least 6 characters"
        );
    }

    #[test]
    fn test_extract_nested_error_message() {
        let body = r#"{"error":{"message":"User already registered"}}"#;
        assert_eq!(extract_error_message(400, body), "User already registered");
    }

    #[test]
    fn test_extract_falls_back_to_status() {
        assert_eq!(
            extract_error_message(502, "<html>bad gateway</html>"),
            "Authentication failed with status 502"
        );
    }

    #[test]
    fn test_session_without_token_deserializes() {
        let body = r#"{"user":{"id":"abc","email":"a@b.com"}}"#;
        let session: Session = serde_json::from_str(body).unwrap();
        assert_eq!(session.access_token, "");
        assert_eq!(session.user.unwrap().email.as_deref(), Some("a@b.com"));
    }
}
