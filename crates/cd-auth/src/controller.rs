use std::sync::Arc;

use tokio::sync::watch;
use tracing::{debug, info, instrument, warn};

use crate::client::ApiClient;
use crate::errors::{AuthError, Result};
use crate::models::{Credentials, User, UserPatch};
use crate::session::{SessionAction, SessionState};
use crate::store::{TokenSlot, TokenStore};

/// Shown when the server rejects a login without saying why
pub const LOGIN_FALLBACK_MESSAGE: &str = "Error en el login";

/// Shown when the backend could not be reached
pub const CONNECTION_FALLBACK_MESSAGE: &str = "Error de conexión";

/// Result of [`SessionController::login`]
#[derive(Debug, Clone, PartialEq)]
pub enum LoginOutcome {
    Success(User),
    Failure { message: String },
}

impl LoginOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success(_))
    }

    pub fn error(&self) -> Option<&str> {
        match self {
            Self::Success(_) => None,
            Self::Failure { message } => Some(message),
        }
    }
}

/// Pick the message shown to the user for a failed login
fn login_failure_message(err: &AuthError) -> String {
    if let Some(message) = err.server_message().filter(|m| !m.is_empty()) {
        return message.to_string();
    }
    match err {
        AuthError::Network(_) => CONNECTION_FALLBACK_MESSAGE.to_string(),
        other => other.to_string(),
    }
}

/// Owns the session state and drives it through login, logout and bootstrap.
///
/// Construct one per application and hand clones of it to the UI; every
/// clone shares the same state cell.
#[derive(Debug, Clone)]
pub struct SessionController {
    api: ApiClient,
    state: Arc<watch::Sender<SessionState>>,
}

impl SessionController {
    pub fn new(api: ApiClient) -> Self {
        let (state, _) = watch::channel(SessionState::new());
        Self {
            api,
            state: Arc::new(state),
        }
    }

    pub fn api(&self) -> &ApiClient {
        &self.api
    }

    fn store(&self) -> &Arc<dyn TokenStore> {
        self.api.store()
    }

    /// Apply an action to the shared state in a single update
    pub fn dispatch(&self, action: SessionAction) {
        debug!("Dispatching {:?}", ActionKind::from(&action));
        self.state.send_modify(|state| state.apply(action));
    }

    /// Copy of the current state
    pub fn snapshot(&self) -> SessionState {
        self.state.borrow().clone()
    }

    /// Receiver notified on every transition
    pub fn subscribe(&self) -> watch::Receiver<SessionState> {
        self.state.subscribe()
    }

    pub fn user(&self) -> Option<User> {
        self.state.borrow().user.clone()
    }

    pub fn is_authenticated(&self) -> bool {
        self.state.borrow().is_authenticated()
    }

    pub fn is_loading(&self) -> bool {
        self.state.borrow().is_loading()
    }

    pub fn has_role(&self, role: &str) -> bool {
        self.state.borrow().has_role(role)
    }

    pub fn can_view_all_clients(&self) -> bool {
        self.state.borrow().can_view_all_clients()
    }

    /// Authenticate against the backend and persist the new session.
    ///
    /// Never fails: errors are folded into [`LoginOutcome::Failure`] and
    /// recorded on the session.
    #[instrument(skip(self, credentials), fields(usuario = %credentials.usuario))]
    pub async fn login(&self, credentials: &Credentials) -> LoginOutcome {
        self.dispatch(SessionAction::BeginLoading);

        let message = match self.try_login(credentials).await {
            Ok(Ok(user)) => {
                info!("Login succeeded for {}", user.usuario);
                return LoginOutcome::Success(user);
            }
            Ok(Err(rejection)) => rejection,
            Err(e) => login_failure_message(&e),
        };

        warn!("Login failed: {}", message);
        self.dispatch(SessionAction::LoginError(message.clone()));
        LoginOutcome::Failure { message }
    }

    /// Outer error: transport or storage failure. Inner error: server rejection message.
    async fn try_login(&self, credentials: &Credentials) -> Result<std::result::Result<User, String>> {
        let envelope = self.api.login(credentials).await?;

        if !envelope.exito {
            let message = envelope
                .error
                .filter(|m| !m.is_empty())
                .unwrap_or_else(|| LOGIN_FALLBACK_MESSAGE.to_string());
            return Ok(Err(message));
        }

        let data = envelope.into_data()?;
        let serialized_user = serde_json::to_string(&data.usuario)?;

        let store = self.store();
        store.set(TokenSlot::AccessToken, &data.access_token).await?;
        store.set(TokenSlot::RefreshToken, &data.refresh_token).await?;
        store.set(TokenSlot::User, &serialized_user).await?;

        self.dispatch(SessionAction::LoginSuccess {
            user: data.usuario.clone(),
            access_token: data.access_token,
            refresh_token: Some(data.refresh_token),
        });

        Ok(Ok(data.usuario))
    }

    /// End the session locally, telling the backend on a best-effort basis
    #[instrument(skip(self))]
    pub async fn logout(&self) {
        if let Err(e) = self.api.logout().await {
            warn!("Logout request failed: {}", e);
        }

        if let Err(e) = self.store().clear().await {
            warn!("Failed to clear token store on logout: {}", e);
        }

        self.dispatch(SessionAction::Logout);
        info!("Logged out");
    }

    /// Merge `patch` into the current user and persist the result locally
    #[instrument(skip(self, patch))]
    pub async fn update_user(&self, patch: UserPatch) -> Result<User> {
        let current = self.user().ok_or(AuthError::NotAuthenticated)?;
        let merged = current.merged(&patch);

        let serialized = serde_json::to_string(&merged)?;
        self.store().set(TokenSlot::User, &serialized).await?;

        self.dispatch(SessionAction::UpdateUser(patch));
        Ok(merged)
    }

    /// Rebuild the session from persisted credentials.
    ///
    /// When the profile check fails but the cached user still parses, the
    /// cached user is trusted until the next API call proves otherwise.
    #[instrument(skip(self))]
    pub async fn bootstrap(&self) -> SessionState {
        self.dispatch(SessionAction::BeginLoading);

        let stored = self.store().load_all().await;
        let (Some(access_token), Some(cached_user)) = (stored.access_token, stored.user) else {
            debug!("No persisted session");
            self.dispatch(SessionAction::Logout);
            return self.snapshot();
        };

        match self.api.fetch_profile().await {
            Ok(user) => {
                info!("Session restored for {}", user.usuario);
                if let Ok(serialized) = serde_json::to_string(&user) {
                    if let Err(e) = self.store().set(TokenSlot::User, &serialized).await {
                        warn!("Failed to persist refreshed user: {}", e);
                    }
                }
                // a renewal during the profile call may have replaced the token
                let access_token = self
                    .store()
                    .get(TokenSlot::AccessToken)
                    .await
                    .unwrap_or(access_token);
                let refresh_token = self.store().get(TokenSlot::RefreshToken).await;
                self.dispatch(SessionAction::LoginSuccess {
                    user,
                    access_token,
                    refresh_token,
                });
            }
            Err(e) => {
                warn!("Profile check failed: {}", e);
                self.restore_cached(stored.refresh_token, &cached_user).await;
            }
        }

        self.snapshot()
    }

    async fn restore_cached(&self, refresh_token: Option<String>, cached_user: &str) {
        // a renewal during the profile call may have replaced the token
        let Some(access_token) = self.store().get(TokenSlot::AccessToken).await else {
            info!("Stored session was revoked during the profile check");
            self.dispatch(SessionAction::Logout);
            return;
        };

        match serde_json::from_str::<User>(cached_user) {
            Ok(user) => {
                info!("Restoring cached session for {}", user.usuario);
                self.dispatch(SessionAction::LoginSuccess {
                    user,
                    access_token,
                    refresh_token,
                });
            }
            Err(e) => {
                warn!("Cached user is corrupt, discarding session: {}", e);
                if let Err(e) = self.store().clear().await {
                    warn!("Failed to clear token store: {}", e);
                }
                self.dispatch(SessionAction::Logout);
            }
        }
    }
}

/// Action name without its payload, for logs
#[derive(Debug)]
enum ActionKind {
    BeginLoading,
    LoginSuccess,
    LoginError,
    Logout,
    UpdateUser,
}

impl From<&SessionAction> for ActionKind {
    fn from(action: &SessionAction) -> Self {
        match action {
            SessionAction::BeginLoading => Self::BeginLoading,
            SessionAction::LoginSuccess { .. } => Self::LoginSuccess,
            SessionAction::LoginError(_) => Self::LoginError,
            SessionAction::Logout => Self::Logout,
            SessionAction::UpdateUser(_) => Self::UpdateUser,
        }
    }
}
