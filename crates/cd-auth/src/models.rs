use std::fmt;

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use zeroize::Zeroizing;

use crate::errors::{AuthError, Result};

/// Role names issued by the auth service
pub mod roles {
    pub const ADMIN: &str = "Administrador";
    pub const EMPLEADO: &str = "Empleado";
    pub const CONTADOR: &str = "Contador";
}

/// Integer sentinel the backend uses for "enabled" flags
const ENABLED_FLAG: i64 = 1;

/// True only for the exact integer sentinel; `true`, `"1"`, `0` and absence are all false
fn is_enabled_flag(value: Option<&Value>) -> bool {
    match value {
        Some(Value::Number(n)) => n.as_i64() == Some(ENABLED_FLAG) || n.as_f64() == Some(1.0),
        _ => false,
    }
}

/// Uniform `{exito, datos, error}` wrapper around every backend response
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Envelope<T> {
    pub exito: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub datos: Option<T>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mensaje: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub codigo_error: Option<String>,
}

impl<T> Envelope<T> {
    /// Unwrap `datos`, turning `exito: false` into [`AuthError::Rejected`]
    pub fn into_data(self) -> Result<T> {
        if !self.exito {
            return Err(AuthError::Rejected(
                self.error
                    .unwrap_or_else(|| "request rejected without detail".to_string()),
            ));
        }
        self.datos
            .ok_or_else(|| AuthError::InvalidResponse("Missing datos in envelope".to_string()))
    }
}

/// Employee record linked to a user account
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Employee {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id_empleados: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub telefono: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Authenticated user as returned by login and profile endpoints
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct User {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id_usuarios: Option<i64>,
    pub usuario: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nombre_completo: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub activo: Option<Value>,
    #[serde(default)]
    pub roles: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub puede_ver_todos_clientes: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub empleado: Option<Employee>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ultimo_acceso: Option<Value>,
    /// Fields this client does not model, kept so persistence round-trips them
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl User {
    pub fn has_role(&self, role: &str) -> bool {
        self.roles.iter().any(|r| r == role)
    }

    pub fn can_view_all_clients(&self) -> bool {
        is_enabled_flag(self.puede_ver_todos_clientes.as_ref())
    }

    pub fn is_active(&self) -> bool {
        is_enabled_flag(self.activo.as_ref())
    }

    pub fn employee_id(&self) -> Option<i64> {
        self.empleado.as_ref().and_then(|e| e.id_empleados)
    }

    /// Last access timestamp, when the server sent it as an ISO local date-time
    pub fn last_access(&self) -> Option<NaiveDateTime> {
        let raw = self.ultimo_acceso.as_ref()?.as_str()?;
        NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f").ok()
    }

    /// Shallow merge: every field present in `patch` replaces the current one
    pub fn merge(&mut self, patch: &UserPatch) {
        if let Some(id) = patch.id_usuarios {
            self.id_usuarios = Some(id);
        }
        if let Some(usuario) = &patch.usuario {
            self.usuario = usuario.clone();
        }
        if let Some(nombre) = &patch.nombre_completo {
            self.nombre_completo = Some(nombre.clone());
        }
        if let Some(email) = &patch.email {
            self.email = Some(email.clone());
        }
        if let Some(activo) = &patch.activo {
            self.activo = Some(activo.clone());
        }
        if let Some(roles) = &patch.roles {
            self.roles = roles.clone();
        }
        if let Some(flag) = &patch.puede_ver_todos_clientes {
            self.puede_ver_todos_clientes = Some(flag.clone());
        }
        if let Some(empleado) = &patch.empleado {
            self.empleado = Some(empleado.clone());
        }
        if let Some(ultimo) = &patch.ultimo_acceso {
            self.ultimo_acceso = Some(ultimo.clone());
        }
        for (key, value) in &patch.extra {
            self.extra.insert(key.clone(), value.clone());
        }
    }

    pub fn merged(mut self, patch: &UserPatch) -> Self {
        self.merge(patch);
        self
    }
}

/// Partial user update; absent fields leave the user untouched
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct UserPatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id_usuarios: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub usuario: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nombre_completo: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub activo: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub roles: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub puede_ver_todos_clientes: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub empleado: Option<Employee>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ultimo_acceso: Option<Value>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl UserPatch {
    pub fn email(email: impl Into<String>) -> Self {
        Self {
            email: Some(email.into()),
            ..Self::default()
        }
    }

    pub fn nombre_completo(nombre: impl Into<String>) -> Self {
        Self {
            nombre_completo: Some(nombre.into()),
            ..Self::default()
        }
    }
}

/// Login form input; the password is wiped from memory on drop
#[derive(Clone)]
pub struct Credentials {
    pub usuario: String,
    contrasena: Zeroizing<String>,
}

impl Credentials {
    pub fn new(usuario: impl Into<String>, contrasena: impl Into<String>) -> Self {
        Self {
            usuario: usuario.into(),
            contrasena: Zeroizing::new(contrasena.into()),
        }
    }

    pub(crate) fn to_request(&self) -> LoginRequest<'_> {
        LoginRequest {
            usuario: &self.usuario,
            contrasena: self.contrasena.as_str(),
        }
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("usuario", &self.usuario)
            .field("contrasena", &"[PROTEGIDA]")
            .finish()
    }
}

/// POST /api/auth/login body
#[derive(Serialize)]
pub(crate) struct LoginRequest<'a> {
    pub usuario: &'a str,
    pub contrasena: &'a str,
}

/// `datos` of a successful login
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginData {
    pub access_token: String,
    pub refresh_token: String,
    pub usuario: User,
    #[serde(default)]
    pub tipo_token: Option<String>,
    #[serde(default)]
    pub expira_en: Option<i64>,
}

/// `datos` of GET /api/auth/perfil
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProfileData {
    pub usuario: User,
}

/// POST /api/auth/renovar body
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RefreshRequest<'a> {
    pub refresh_token: &'a str,
}

/// `datos` of a successful renewal; only the access token is consumed
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RefreshData {
    pub access_token: String,
}

/// POST /api/auth/cambiar-contrasena body
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct ChangePasswordRequest<'a> {
    pub contrasena_actual: &'a str,
    pub contrasena_nueva: &'a str,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn user_with_flag(flag: Option<Value>) -> User {
        User {
            usuario: "ana".to_string(),
            puede_ver_todos_clientes: flag,
            ..User::default()
        }
    }

    #[test]
    fn test_can_view_all_clients_only_for_integer_one() {
        assert!(user_with_flag(Some(json!(1))).can_view_all_clients());
        assert!(!user_with_flag(Some(json!(0))).can_view_all_clients());
        assert!(!user_with_flag(Some(json!(true))).can_view_all_clients());
        assert!(!user_with_flag(Some(json!("1"))).can_view_all_clients());
        assert!(!user_with_flag(None).can_view_all_clients());
    }

    #[test]
    fn test_merge_keeps_fields_absent_from_patch() {
        let mut user: User = serde_json::from_value(json!({
            "usuario": "ana",
            "email": "old@example.com",
            "roles": ["Contador", "Empleado"],
            "puedeVerTodosClientes": 1
        }))
        .unwrap();

        user.merge(&UserPatch::email("x"));

        assert_eq!(user.email.as_deref(), Some("x"));
        assert_eq!(user.roles, vec!["Contador", "Empleado"]);
        assert!(user.can_view_all_clients());
    }

    #[test]
    fn test_unknown_fields_survive_round_trip() {
        let raw = json!({
            "usuario": "ana",
            "roles": [],
            "empleado": {"idEmpleados": 7, "estado": 1},
            "sucursal": "Centro"
        });
        let user: User = serde_json::from_value(raw).unwrap();
        assert_eq!(user.employee_id(), Some(7));

        let back = serde_json::to_value(&user).unwrap();
        assert_eq!(back["sucursal"], "Centro");
        assert_eq!(back["empleado"]["estado"], 1);
    }

    #[test]
    fn test_last_access_parses_local_date_time() {
        let user = User {
            ultimo_acceso: Some(json!("2024-03-01T09:15:30")),
            ..User::default()
        };
        let ts = user.last_access().unwrap();
        assert_eq!(ts.to_string(), "2024-03-01 09:15:30");
    }

    #[test]
    fn test_envelope_rejection_carries_server_error() {
        let envelope: Envelope<ProfileData> =
            serde_json::from_value(json!({"exito": false, "error": "Token inválido"})).unwrap();
        match envelope.into_data() {
            Err(AuthError::Rejected(message)) => assert_eq!(message, "Token inválido"),
            other => panic!("Expected Rejected, got {:?}", other),
        }
    }

    fn decode_generic<T: serde::de::DeserializeOwned>(value: serde_json::Value) -> Envelope<T> {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn test_envelope_decodes_without_datos_for_any_payload() {
        let envelope: Envelope<LoginData> = decode_generic(json!({"exito": false}));
        assert!(envelope.datos.is_none());

        let envelope: Envelope<RefreshData> =
            decode_generic(json!({"exito": true, "datos": {"accessToken": "A2"}}));
        assert_eq!(envelope.into_data().unwrap().access_token, "A2");
    }

    #[test]
    fn test_credentials_debug_hides_password() {
        let credentials = Credentials::new("testuser", "password123");
        let rendered = format!("{:?}", credentials);
        assert!(rendered.contains("testuser"));
        assert!(!rendered.contains("password123"));
    }
}
