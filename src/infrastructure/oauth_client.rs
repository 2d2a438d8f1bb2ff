use crate::infrastructure::error::InfraError;
use async_trait::async_trait;
use reqwest::Client;
use tracing::debug;

#[derive(Debug, Clone)]
pub struct OAuthClientCredentials {
    pub token_endpoint: String,
    pub client_id: String,
    pub client_secret: String,
}

#[derive(Debug, Clone)]
pub enum TokenGrant {
    AuthorizationCode { code: String, redirect_uri: String },
    RefreshToken { refresh_token: String },
}

impl TokenGrant {
    fn grant_type(&self) -> &'static str {
        match self {
            Self::AuthorizationCode { .. } => "authorization_code",
            Self::RefreshToken { .. } => "refresh_token",
        }
    }
}

#[derive(Debug, Clone)]
pub struct OAuthTokenResponse {
    pub access_token: String,
    pub refresh_token: Option<String>,
    pub expires_in: i64,
    pub token_type: Option<String>,
    pub scope: Option<String>,
}

#[async_trait]
pub trait OAuthHttpClient: Send + Sync {
    async fn request_token(
        &self,
        credentials: &OAuthClientCredentials,
        grant: TokenGrant,
    ) -> Result<OAuthTokenResponse, InfraError>;
}

#[derive(Debug, Clone, Default)]
pub struct ReqwestOAuthClient {
    client: Client,
}

impl ReqwestOAuthClient {
    pub fn new() -> Self {
        Self {
            client: Client::new(),
        }
    }
}

#[derive(Debug, serde::Deserialize)]
struct TokenEndpointPayload {
    access_token: Option<String>,
    refresh_token: Option<String>,
    expires_in: Option<i64>,
    token_type: Option<String>,
    scope: Option<String>,
    error: Option<String>,
    error_description: Option<String>,
}

fn form_params(credentials: &OAuthClientCredentials, grant: TokenGrant) -> Vec<(&'static str, String)> {
    let mut params = vec![
        ("grant_type", grant.grant_type().to_string()),
        ("client_id", credentials.client_id.clone()),
        ("client_secret", credentials.client_secret.clone()),
    ];
    match grant {
        TokenGrant::AuthorizationCode { code, redirect_uri } => {
            params.push(("code", code));
            params.push(("redirect_uri", redirect_uri));
        }
        TokenGrant::RefreshToken { refresh_token } => {
            params.push(("refresh_token", refresh_token));
        }
    }
    params
}

#[async_trait]
impl OAuthHttpClient for ReqwestOAuthClient {
    async fn request_token(
        &self,
        credentials: &OAuthClientCredentials,
        grant: TokenGrant,
    ) -> Result<OAuthTokenResponse, InfraError> {
        debug!(grant_type = grant.grant_type(), "requesting oauth token");
        let response = self
            .client
            .post(&credentials.token_endpoint)
            .form(&form_params(credentials, grant))
            .send()
            .await
            .map_err(|error| InfraError::OAuth(format!("network error while requesting token: {error}")))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|error| InfraError::OAuth(format!("failed reading token response: {error}")))?;

        let parsed = serde_json::from_str::<TokenEndpointPayload>(&body).map_err(|error| {
            InfraError::OAuth(format!("invalid token response payload: {error}; body={body}"))
        })?;

        if !status.is_success() || parsed.error.is_some() {
            let code = parsed.error.unwrap_or_else(|| format!("http_{}", status.as_u16()));
            let detail = parsed.error_description.unwrap_or(body);
            return Err(InfraError::OAuth(format!("token endpoint error: {code}; {detail}")));
        }

        let access_token = parsed
            .access_token
            .filter(|value| !value.trim().is_empty())
            .ok_or_else(|| InfraError::OAuth("token response did not include access_token".to_string()))?;

        Ok(OAuthTokenResponse {
            access_token,
            refresh_token: parsed.refresh_token,
            expires_in: parsed.expires_in.unwrap_or(0).max(0),
            token_type: parsed.token_type,
            scope: parsed.scope,
        })
    }
}
