use std::fmt;
use std::sync::Arc;

use reqwest::header::ACCEPT;
use reqwest::{Client, Method, RequestBuilder, Response, StatusCode};
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use tokio::sync::Mutex;
use tracing::{debug, error, instrument, warn};

use crate::config::{ClientConfig, DEFAULT_USER_AGENT, endpoints};
use crate::errors::{AuthError, Result};
use crate::models::*;
use crate::navigator::Navigator;
use crate::store::{TokenSlot, TokenStore};

/// Description of an outbound API call, independent of the token it will carry
#[derive(Debug, Clone, PartialEq)]
pub struct ApiRequest {
    pub method: Method,
    pub path: String,
    pub body: Option<Value>,
}

impl ApiRequest {
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            body: None,
        }
    }

    pub fn get(path: impl Into<String>) -> Self {
        Self::new(Method::GET, path)
    }

    pub fn post(path: impl Into<String>) -> Self {
        Self::new(Method::POST, path)
    }

    /// Attach a JSON body
    pub fn json<B: Serialize + ?Sized>(mut self, body: &B) -> Result<Self> {
        self.body = Some(serde_json::to_value(body)?);
        Ok(self)
    }
}

/// HTTP client for the contaduría gateway
///
/// Every request carries the stored access token. A `401` triggers one
/// renewal through the refresh endpoint and one retry of the original
/// request; if renewal fails the stored session is wiped and the
/// [`Navigator`] is sent back to the login screen.
#[derive(Clone)]
pub struct ApiClient {
    config: ClientConfig,
    http: Client,
    store: Arc<dyn TokenStore>,
    navigator: Arc<dyn Navigator>,
    /// Serializes renewals so concurrent 401s share one refresh call
    refresh_lock: Arc<Mutex<()>>,
}

impl fmt::Debug for ApiClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ApiClient")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl ApiClient {
    /// Create a new API client
    pub fn new(
        config: ClientConfig,
        store: Arc<dyn TokenStore>,
        navigator: Arc<dyn Navigator>,
    ) -> Result<Self> {
        let http = Client::builder()
            .connect_timeout(config.http_timeouts.connect)
            .timeout(config.http_timeouts.request)
            .user_agent(config.user_agent.as_deref().unwrap_or(DEFAULT_USER_AGENT))
            .build()?;

        Ok(Self {
            config,
            http,
            store,
            navigator,
            refresh_lock: Arc::new(Mutex::new(())),
        })
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    pub fn store(&self) -> &Arc<dyn TokenStore> {
        &self.store
    }

    /// Build the outgoing request, attaching `Authorization: Bearer` when a token is given
    pub fn build(&self, request: &ApiRequest, access_token: Option<&str>) -> Result<RequestBuilder> {
        let url = self.config.endpoint(&request.path)?;
        let mut builder = self
            .http
            .request(request.method.clone(), url)
            .header(ACCEPT, "application/json");

        if let Some(token) = access_token {
            builder = builder.bearer_auth(token);
        }
        if let Some(body) = &request.body {
            builder = builder.json(body);
        }

        Ok(builder)
    }

    /// Send an authenticated request, renewing the access token once on `401`
    #[instrument(skip(self, request), fields(method = %request.method, path = %request.path))]
    pub async fn send(&self, request: &ApiRequest) -> Result<Response> {
        let token = self.store.get(TokenSlot::AccessToken).await;
        let response = self.build(request, token.as_deref())?.send().await?;
        debug!("Response: {}", response.status());

        if response.status() != StatusCode::UNAUTHORIZED {
            return check_status(response).await;
        }

        let original = http_error(response).await;
        let Some(new_token) = self.renew_after_unauthorized(token.as_deref()).await else {
            return Err(original);
        };

        debug!("Retrying request with renewed access token");
        let retry = self.build(request, Some(&new_token))?.send().await?;
        check_status(retry).await
    }

    /// Send a request without a bearer token and without the renewal path
    #[instrument(skip(self, request), fields(method = %request.method, path = %request.path))]
    pub async fn send_public(&self, request: &ApiRequest) -> Result<Response> {
        let response = self.build(request, None)?.send().await?;
        debug!("Response: {}", response.status());
        check_status(response).await
    }

    /// Authenticated request decoded into an envelope
    pub async fn request<T: DeserializeOwned>(&self, request: &ApiRequest) -> Result<Envelope<T>> {
        let response = self.send(request).await?;
        decode(response).await
    }

    /// Public request decoded into an envelope
    pub async fn request_public<T: DeserializeOwned>(
        &self,
        request: &ApiRequest,
    ) -> Result<Envelope<T>> {
        let response = self.send_public(request).await?;
        decode(response).await
    }

    /// Obtain a token to retry with after `rejected_token` got a 401.
    ///
    /// Returns `None` when the original failure should be propagated.
    async fn renew_after_unauthorized(&self, rejected_token: Option<&str>) -> Option<String> {
        let _guard = self.refresh_lock.lock().await;

        let current = self.store.get(TokenSlot::AccessToken).await;
        if current.as_deref() != rejected_token {
            // renewed (or wiped) by another request while we waited
            debug!("Access token changed while waiting, skipping renewal");
            return current;
        }

        let Some(refresh_token) = self.store.get(TokenSlot::RefreshToken).await else {
            debug!("No refresh token stored, propagating 401");
            return None;
        };

        match self.renew_access_token(&refresh_token).await {
            Ok(new_token) => {
                if let Err(e) = self.store.set(TokenSlot::AccessToken, &new_token).await {
                    warn!("Failed to persist renewed access token: {}", e);
                }
                Some(new_token)
            }
            Err(e) => {
                warn!("Token renewal failed: {}", e);
                self.expire_session().await;
                None
            }
        }
    }

    /// Wipe the stored session and send the UI back to login
    async fn expire_session(&self) {
        if let Err(e) = self.store.clear().await {
            error!("Failed to clear token store: {}", e);
        }
        self.navigator.redirect_to_login();
    }

    /// Exchange a refresh token for a new access token
    #[instrument(skip(self, refresh_token))]
    pub async fn renew_access_token(&self, refresh_token: &str) -> Result<String> {
        debug!("Renewing access token");
        let request = ApiRequest::post(endpoints::REFRESH).json(&RefreshRequest { refresh_token })?;
        let envelope: Envelope<RefreshData> = self.request_public(&request).await?;
        Ok(envelope.into_data()?.access_token)
    }

    /// POST credentials to the login endpoint
    ///
    /// An `exito: false` envelope is returned as-is so the caller can read its message.
    #[instrument(skip(self, credentials), fields(usuario = %credentials.usuario))]
    pub async fn login(&self, credentials: &Credentials) -> Result<Envelope<LoginData>> {
        debug!("Logging in");
        let request = ApiRequest::post(endpoints::LOGIN).json(&credentials.to_request())?;
        self.request_public(&request).await
    }

    /// Fetch the profile of the user owning the stored access token
    #[instrument(skip(self))]
    pub async fn fetch_profile(&self) -> Result<User> {
        debug!("Fetching user profile");
        let envelope: Envelope<ProfileData> =
            self.request(&ApiRequest::get(endpoints::PROFILE)).await?;
        Ok(envelope.into_data()?.usuario)
    }

    /// Notify the backend of a logout; the response body is ignored
    #[instrument(skip(self))]
    pub async fn logout(&self) -> Result<()> {
        debug!("Notifying logout");
        self.send(&ApiRequest::post(endpoints::LOGOUT)).await?;
        Ok(())
    }

    /// Change the current user's password
    #[instrument(skip(self, actual, nueva))]
    pub async fn change_password(&self, actual: &str, nueva: &str) -> Result<()> {
        let request = ApiRequest::post(endpoints::CHANGE_PASSWORD).json(&ChangePasswordRequest {
            contrasena_actual: actual,
            contrasena_nueva: nueva,
        })?;
        let envelope: Envelope<Value> = self.request(&request).await?;
        if !envelope.exito {
            return Err(AuthError::Rejected(
                envelope
                    .error
                    .unwrap_or_else(|| "password change rejected".to_string()),
            ));
        }
        Ok(())
    }
}

async fn check_status(response: Response) -> Result<Response> {
    if response.status().is_success() {
        Ok(response)
    } else {
        Err(http_error(response).await)
    }
}

/// Turn a failed response into [`AuthError::Http`], keeping the envelope's `error` field
async fn http_error(response: Response) -> AuthError {
    let status = response.status();
    let body = response.text().await.unwrap_or_default();
    let server_error = serde_json::from_str::<Envelope<Value>>(&body)
        .ok()
        .and_then(|e| e.error);

    AuthError::Http {
        status,
        body_snippet: body.chars().take(200).collect(),
        server_error,
    }
}

async fn decode<T: DeserializeOwned>(response: Response) -> Result<Envelope<T>> {
    let bytes = response.bytes().await?;
    Ok(serde_json::from_slice(&bytes)?)
}
