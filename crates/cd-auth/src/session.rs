use crate::models::{User, UserPatch};

/// Authentication status of a session
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SessionStatus {
    /// Startup or a login in flight
    #[default]
    Loading,
    Authenticated,
    /// Logged out, or the last login failed (see [`SessionState::error`])
    Unauthenticated,
}

/// Transitions of the session state machine
#[derive(Debug, Clone, PartialEq)]
pub enum SessionAction {
    BeginLoading,
    LoginSuccess {
        user: User,
        access_token: String,
        refresh_token: Option<String>,
    },
    LoginError(String),
    Logout,
    UpdateUser(UserPatch),
}

/// In-memory record of authentication status and user identity
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SessionState {
    pub status: SessionStatus,
    pub user: Option<User>,
    pub access_token: Option<String>,
    pub refresh_token: Option<String>,
    /// Message of the last failed login
    pub error: Option<String>,
}

impl SessionState {
    /// Fresh session, before bootstrap has run
    pub fn new() -> Self {
        Self::default()
    }

    pub fn unauthenticated() -> Self {
        Self {
            status: SessionStatus::Unauthenticated,
            ..Self::default()
        }
    }

    /// Apply one action
    pub fn apply(&mut self, action: SessionAction) {
        match action {
            SessionAction::BeginLoading => {
                self.status = SessionStatus::Loading;
                self.error = None;
            }
            SessionAction::LoginSuccess {
                user,
                access_token,
                refresh_token,
            } => {
                self.status = SessionStatus::Authenticated;
                self.user = Some(user);
                self.access_token = Some(access_token);
                self.refresh_token = refresh_token;
                self.error = None;
            }
            SessionAction::LoginError(message) => {
                self.status = SessionStatus::Unauthenticated;
                self.user = None;
                self.access_token = None;
                self.refresh_token = None;
                self.error = Some(message);
            }
            SessionAction::Logout => *self = Self::unauthenticated(),
            SessionAction::UpdateUser(patch) => {
                if let Some(user) = self.user.as_mut() {
                    user.merge(&patch);
                }
            }
        }
    }

    /// Apply an action, returning the new state
    pub fn reduce(mut self, action: SessionAction) -> Self {
        self.apply(action);
        self
    }

    pub fn is_authenticated(&self) -> bool {
        self.status == SessionStatus::Authenticated
    }

    pub fn is_loading(&self) -> bool {
        self.status == SessionStatus::Loading
    }

    /// False when no user is loaded
    pub fn has_role(&self, role: &str) -> bool {
        self.user.as_ref().is_some_and(|u| u.has_role(role))
    }

    pub fn can_view_all_clients(&self) -> bool {
        self.user.as_ref().is_some_and(User::can_view_all_clients)
    }
}
