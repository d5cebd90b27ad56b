//! Accounting resource endpoints exposed by the gateway
//!
//! Payloads are passed through as untyped JSON inside the standard envelope;
//! all requests go through [`cd_auth::ApiClient`] and so share its token
//! renewal.

use std::fmt;
use std::str::FromStr;

use cd_auth::{ApiClient, ApiRequest, Envelope, Result, endpoints};
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, instrument};

/// Read-only resource collections shown on the dashboard
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Resource {
    Clientes,
    Empresas,
    Documentos,
    Reportes,
    Facturas,
    Balances,
}

impl Resource {
    pub const ALL: [Resource; 6] = [
        Self::Clientes,
        Self::Empresas,
        Self::Documentos,
        Self::Reportes,
        Self::Facturas,
        Self::Balances,
    ];

    pub fn path(self) -> &'static str {
        match self {
            Self::Clientes => endpoints::CLIENTES,
            Self::Empresas => endpoints::EMPRESAS,
            Self::Documentos => endpoints::DOCUMENTOS,
            Self::Reportes => endpoints::REPORTES,
            Self::Facturas => endpoints::FACTURAS,
            Self::Balances => endpoints::BALANCES,
        }
    }

    /// Short identifier, also accepted by [`FromStr`]
    pub fn id(self) -> &'static str {
        match self {
            Self::Clientes => "clientes",
            Self::Empresas => "empresas",
            Self::Documentos => "documentos",
            Self::Reportes => "reportes",
            Self::Facturas => "facturas",
            Self::Balances => "balances",
        }
    }

    pub fn title(self) -> &'static str {
        match self {
            Self::Clientes => "Clientes",
            Self::Empresas => "Empresas",
            Self::Documentos => "Documentos",
            Self::Reportes => "Reportes",
            Self::Facturas => "Facturas",
            Self::Balances => "Balances",
        }
    }
}

impl fmt::Display for Resource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.title())
    }
}

impl FromStr for Resource {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let wanted = s.trim().to_lowercase();
        Self::ALL
            .into_iter()
            .find(|r| r.id() == wanted)
            .ok_or_else(|| format!("unknown resource '{}'", s.trim()))
    }
}

/// Client for the contaduría resource endpoints
#[derive(Debug, Clone)]
pub struct ContaduriaService {
    api: ApiClient,
}

impl ContaduriaService {
    pub fn new(api: ApiClient) -> Self {
        Self { api }
    }

    /// GET a resource collection
    #[instrument(skip(self))]
    pub async fn fetch(&self, resource: Resource) -> Result<Envelope<Value>> {
        debug!("Fetching {}", resource.path());
        self.api.request(&ApiRequest::get(resource.path())).await
    }

    pub async fn clientes(&self) -> Result<Envelope<Value>> {
        self.fetch(Resource::Clientes).await
    }

    pub async fn empresas(&self) -> Result<Envelope<Value>> {
        self.fetch(Resource::Empresas).await
    }

    pub async fn documentos(&self) -> Result<Envelope<Value>> {
        self.fetch(Resource::Documentos).await
    }

    pub async fn reportes(&self) -> Result<Envelope<Value>> {
        self.fetch(Resource::Reportes).await
    }

    pub async fn facturas(&self) -> Result<Envelope<Value>> {
        self.fetch(Resource::Facturas).await
    }

    pub async fn balances(&self) -> Result<Envelope<Value>> {
        self.fetch(Resource::Balances).await
    }

    /// POST a new invoice
    #[instrument(skip(self, factura))]
    pub async fn create_factura<B: Serialize + ?Sized>(&self, factura: &B) -> Result<Envelope<Value>> {
        debug!("Creating factura");
        let request = ApiRequest::post(endpoints::FACTURAS).json(factura)?;
        self.api.request(&request).await
    }
}
