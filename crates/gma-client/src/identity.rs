//! Identity provider (Firebase Auth REST) client.
//!
//! # Design
//! - A session keeps only the long-lived refresh credential; every outgoing
//!   backend call exchanges it for a fresh ID token.
//! - Provider error codes are mapped to fixed user-facing messages here so no
//!   caller has to know the provider's vocabulary.

use std::fmt;
use std::time::Duration;

use gma_config::DashboardConfig;
use reqwest::{Client, RequestBuilder, StatusCode};
use serde::{Deserialize, Serialize};
use tracing::debug;
use url::Url;

use crate::error::{ClientError, ClientResult};

/// An authenticated identity as returned by the provider.
#[derive(Clone, PartialEq, Eq)]
pub struct IdentitySession {
    /// Provider user id.
    pub uid: String,
    /// Account email, when the provider supplies one.
    pub email: Option<String>,
    /// Display name, when set.
    pub display_name: Option<String>,
    /// Avatar URL, when set.
    pub photo_url: Option<String>,
    refresh_token: String,
}

impl IdentitySession {
    /// Assemble a session from its parts.
    #[must_use]
    pub fn new(
        uid: impl Into<String>,
        email: Option<String>,
        display_name: Option<String>,
        photo_url: Option<String>,
        refresh_token: impl Into<String>,
    ) -> Self {
        Self {
            uid: uid.into(),
            email,
            display_name,
            photo_url,
            refresh_token: refresh_token.into(),
        }
    }

    /// Refresh credential used to mint ID tokens.
    #[must_use]
    pub fn refresh_token(&self) -> &str {
        &self.refresh_token
    }

    /// Replace the refresh credential after the provider rotates it.
    pub fn rotate_refresh_token(&mut self, refresh_token: impl Into<String>) {
        self.refresh_token = refresh_token.into();
    }
}

impl fmt::Debug for IdentitySession {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter
            .debug_struct("IdentitySession")
            .field("uid", &self.uid)
            .field("email", &self.email)
            .field("display_name", &self.display_name)
            .field("photo_url", &self.photo_url)
            .field("refresh_token", &"<redacted>")
            .finish()
    }
}

/// A freshly minted ID token.
#[derive(Clone, PartialEq, Eq)]
pub struct RefreshedToken {
    /// Short-lived bearer token for backend calls.
    pub id_token: String,
    /// Refresh credential to keep (may equal the previous one).
    pub refresh_token: String,
    /// Provider user id the token belongs to.
    pub user_id: String,
}

impl fmt::Debug for RefreshedToken {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter
            .debug_struct("RefreshedToken")
            .field("user_id", &self.user_id)
            .finish_non_exhaustive()
    }
}

/// Client for the identity toolkit and secure token endpoints.
#[derive(Debug, Clone)]
pub struct FirebaseIdentity {
    http: Client,
    identity_url: Url,
    secure_token_url: Url,
    api_key: String,
}

impl FirebaseIdentity {
    /// Build an identity client.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::Transport`] if the HTTP client cannot be constructed.
    pub fn new(
        identity_url: Url,
        secure_token_url: Url,
        api_key: impl Into<String>,
        timeout: Duration,
    ) -> ClientResult<Self> {
        let http = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|source| ClientError::Transport {
                operation: "identity.client.build",
                source,
            })?;
        Ok(Self {
            http,
            identity_url,
            secure_token_url,
            api_key: api_key.into(),
        })
    }

    /// Build an identity client from loaded configuration.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::Config`] when no API key is configured.
    pub fn from_config(config: &DashboardConfig) -> ClientResult<Self> {
        let api_key = config
            .identity
            .require_api_key()
            .map_err(|source| ClientError::Config { source })?;
        Self::new(
            config.identity.identity_url.clone(),
            config.identity.secure_token_url.clone(),
            api_key,
            config.http_timeout,
        )
    }

    /// Email and password sign-in.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::Identity`] for rejected credentials, otherwise
    /// transport or decode errors.
    pub async fn sign_in_with_password(
        &self,
        email: &str,
        password: &str,
    ) -> ClientResult<IdentitySession> {
        const OP: &str = "identity.sign_in";
        let url = self.toolkit_url(OP, "v1/accounts:signInWithPassword")?;
        let body = PasswordRequest {
            email,
            password,
            return_secure_token: true,
        };
        let response: AccountResponse = self.call(OP, self.http.post(url).json(&body)).await?;
        Ok(response.into_session())
    }

    /// Email and password account creation.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::Identity`] for rejected sign-ups (existing email,
    /// weak password), otherwise transport or decode errors.
    pub async fn sign_up(&self, email: &str, password: &str) -> ClientResult<IdentitySession> {
        const OP: &str = "identity.sign_up";
        let url = self.toolkit_url(OP, "v1/accounts:signUp")?;
        let body = PasswordRequest {
            email,
            password,
            return_secure_token: true,
        };
        let response: AccountResponse = self.call(OP, self.http.post(url).json(&body)).await?;
        Ok(response.into_session())
    }

    /// Sign in with an ID token issued by a federated provider (for example `google.com`).
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::Identity`] when the provider token is rejected,
    /// otherwise transport or decode errors.
    pub async fn sign_in_with_idp(
        &self,
        provider_id: &str,
        provider_token: &str,
    ) -> ClientResult<IdentitySession> {
        const OP: &str = "identity.sign_in_idp";
        let url = self.toolkit_url(OP, "v1/accounts:signInWithIdp")?;
        let post_body = url::form_urlencoded::Serializer::new(String::new())
            .append_pair("id_token", provider_token)
            .append_pair("providerId", provider_id)
            .finish();
        let body = IdpRequest {
            post_body,
            request_uri: "http://localhost",
            return_secure_token: true,
            return_idp_credential: true,
        };
        let response: AccountResponse = self.call(OP, self.http.post(url).json(&body)).await?;
        Ok(response.into_session())
    }

    /// Exchange a refresh credential for a fresh ID token.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::Identity`] when the credential is expired or
    /// revoked, otherwise transport or decode errors.
    pub async fn refresh(&self, refresh_token: &str) -> ClientResult<RefreshedToken> {
        const OP: &str = "identity.refresh";
        let mut url = self
            .secure_token_url
            .join("v1/token")
            .map_err(|source| ClientError::Url {
                operation: OP,
                source,
            })?;
        url.query_pairs_mut().append_pair("key", &self.api_key);
        let form = [
            ("grant_type", "refresh_token"),
            ("refresh_token", refresh_token),
        ];
        let response: TokenResponse = self.call(OP, self.http.post(url).form(&form)).await?;
        Ok(RefreshedToken {
            id_token: response.id_token,
            refresh_token: response.refresh_token,
            user_id: response.user_id,
        })
    }

    fn toolkit_url(&self, operation: &'static str, path: &str) -> ClientResult<Url> {
        let mut url = self
            .identity_url
            .join(path)
            .map_err(|source| ClientError::Url { operation, source })?;
        url.query_pairs_mut().append_pair("key", &self.api_key);
        Ok(url)
    }

    async fn call<T: for<'de> Deserialize<'de>>(
        &self,
        operation: &'static str,
        request: RequestBuilder,
    ) -> ClientResult<T> {
        debug!(operation, "identity request");
        let response = request
            .send()
            .await
            .map_err(|source| ClientError::Transport { operation, source })?;
        let status = response.status();
        if status.is_success() {
            return response
                .json::<T>()
                .await
                .map_err(|source| ClientError::Decode { operation, source });
        }
        let body = response.text().await.unwrap_or_default();
        Err(identity_error(operation, status, &body))
    }
}

fn identity_error(operation: &'static str, status: StatusCode, body: &str) -> ClientError {
    let code = serde_json::from_str::<ErrorEnvelope>(body)
        .ok()
        .and_then(|envelope| envelope.code());
    match code {
        Some(code) => ClientError::Identity {
            message: friendly_message(&code),
            code,
        },
        None => ClientError::Status {
            operation,
            status,
            detail: None,
        },
    }
}

/// Map a provider error code onto a fixed user-facing message.
#[must_use]
pub fn friendly_message(code: &str) -> &'static str {
    match code {
        "EMAIL_NOT_FOUND" => "No account found with this email",
        "INVALID_PASSWORD" => "Incorrect password",
        "INVALID_LOGIN_CREDENTIALS" => "Incorrect email or password",
        "EMAIL_EXISTS" => "This email is already registered",
        "INVALID_EMAIL" | "MISSING_EMAIL" => "Invalid email address",
        "WEAK_PASSWORD" => "Password is too weak",
        "USER_DISABLED" => "Account has been disabled",
        "TOKEN_EXPIRED" | "INVALID_REFRESH_TOKEN" | "USER_NOT_FOUND" => {
            "Your session has expired, please sign in again"
        }
        "TOO_MANY_ATTEMPTS_TRY_LATER" => "Too many attempts, try again later",
        "INVALID_IDP_RESPONSE" => "The provider sign-in was rejected",
        _ => "Authentication failed",
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct PasswordRequest<'a> {
    email: &'a str,
    password: &'a str,
    return_secure_token: bool,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct IdpRequest {
    post_body: String,
    request_uri: &'static str,
    return_secure_token: bool,
    return_idp_credential: bool,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct AccountResponse {
    local_id: String,
    #[serde(default)]
    email: Option<String>,
    #[serde(default)]
    display_name: Option<String>,
    #[serde(default)]
    photo_url: Option<String>,
    refresh_token: String,
}

impl AccountResponse {
    fn into_session(self) -> IdentitySession {
        IdentitySession::new(
            self.local_id,
            non_empty(self.email),
            non_empty(self.display_name),
            non_empty(self.photo_url),
            self.refresh_token,
        )
    }
}

#[derive(Deserialize)]
struct TokenResponse {
    id_token: String,
    refresh_token: String,
    #[serde(default)]
    user_id: String,
}

#[derive(Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum ErrorBody {
    Structured { message: String },
    Code(String),
}

impl ErrorEnvelope {
    fn code(self) -> Option<String> {
        let raw = match self.error {
            ErrorBody::Structured { message } => message,
            ErrorBody::Code(code) => code.to_ascii_uppercase(),
        };
        raw.split(|ch: char| ch == ':' || ch.is_whitespace())
            .map(str::trim)
            .find(|part| !part.is_empty())
            .map(str::to_string)
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|text| !text.trim().is_empty())
}
