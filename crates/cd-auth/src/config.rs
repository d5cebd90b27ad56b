use std::time::Duration;
use url::Url;

/// Backend endpoint paths, appended to [`ClientConfig::base_url`]
pub mod endpoints {
    pub const LOGIN: &str = "/api/auth/login";
    pub const PROFILE: &str = "/api/auth/perfil";
    pub const REFRESH: &str = "/api/auth/renovar";
    pub const LOGOUT: &str = "/api/auth/logout";
    pub const CHANGE_PASSWORD: &str = "/api/auth/cambiar-contrasena";

    pub const CLIENTES: &str = "/api/clientes";
    pub const EMPRESAS: &str = "/api/empresas";
    pub const DOCUMENTOS: &str = "/api/documentos";
    pub const REPORTES: &str = "/api/reportes";
    pub const FACTURAS: &str = "/api/facturas";
    pub const BALANCES: &str = "/api/balances";
}

/// Gateway address used when nothing else is configured
pub const DEFAULT_BASE_URL: &str = "http://localhost:8081";

pub const DEFAULT_USER_AGENT: &str = "contaduria-client";

/// HTTP client configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpTimeouts {
    pub connect: Duration,
    pub request: Duration,
}

impl Default for HttpTimeouts {
    fn default() -> Self {
        Self {
            connect: Duration::from_secs(15),
            request: Duration::from_secs(30),
        }
    }
}

/// Configuration for [`crate::ApiClient`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    /// Gateway base URL, possibly with a path prefix kept in front of every endpoint
    pub base_url: Url,

    /// HTTP client timeouts
    pub http_timeouts: HttpTimeouts,

    /// Custom user agent (optional)
    pub user_agent: Option<String>,
}

impl ClientConfig {
    /// Create config pointing at a specific gateway
    pub fn new(base_url: Url) -> Self {
        Self {
            base_url,
            http_timeouts: HttpTimeouts::default(),
            user_agent: Some(DEFAULT_USER_AGENT.to_string()),
        }
    }

    /// Parse the base URL and build a config with default timeouts
    pub fn from_base_url(base_url: &str) -> crate::Result<Self> {
        Ok(Self::new(Url::parse(base_url)?))
    }

    pub fn with_timeouts(mut self, http_timeouts: HttpTimeouts) -> Self {
        self.http_timeouts = http_timeouts;
        self
    }

    /// Append an endpoint path to the base URL
    pub fn endpoint(&self, path: &str) -> crate::Result<Url> {
        let base = self.base_url.as_str().trim_end_matches('/');
        let url = format!("{}/{}", base, path.trim_start_matches('/'));
        Ok(Url::parse(&url)?)
    }
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self::new(Url::parse(DEFAULT_BASE_URL).expect("valid default base URL"))
    }
}
