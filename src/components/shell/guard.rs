use cd_auth::{SessionState, SessionStatus};

/// Screen the shell should show for a session snapshot
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub enum Screen {
    #[default]
    Verifying,
    Login,
    Dashboard,
}

impl Screen {
    pub fn resolve(state: &SessionState) -> Self {
        match state.status {
            SessionStatus::Loading => Screen::Verifying,
            SessionStatus::Authenticated => Screen::Dashboard,
            SessionStatus::Unauthenticated => Screen::Login,
        }
    }

    pub fn label(&self) -> &str {
        match self {
            Screen::Verifying => "Verificando sesión...",
            Screen::Login => "Iniciar sesión",
            Screen::Dashboard => "Panel principal",
        }
    }
}
