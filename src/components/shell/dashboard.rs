use std::fmt::Write as _;
use std::sync::Arc;

use anyhow::Result;
use cd_auth::{FlagNavigator, SessionController, User};
use cd_services::{ContaduriaService, Resource};
use tokio::io::{AsyncBufRead, AsyncWrite};
use tracing::{debug, warn};

use super::terminal::Terminal;

const NOT_AVAILABLE: &str = "No disponible";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DashboardExit {
    LoggedOut,
    /// The API client dropped the session and asked for the login screen
    Redirected,
    Quit,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Command {
    Profile,
    Section(Resource),
    Menu,
    Logout,
    Quit,
}

impl Command {
    fn parse(input: &str) -> Option<Command> {
        let input = input.trim().to_lowercase();
        match input.as_str() {
            "perfil" => Some(Command::Profile),
            "" | "menu" | "ayuda" | "?" => Some(Command::Menu),
            "salir" => Some(Command::Logout),
            "q" | "terminar" => Some(Command::Quit),
            other => other.parse().ok().map(Command::Section),
        }
    }
}

pub struct Dashboard<'a> {
    session: &'a SessionController,
    service: &'a ContaduriaService,
    navigator: &'a Arc<FlagNavigator>,
}

impl<'a> Dashboard<'a> {
    pub fn new(
        session: &'a SessionController,
        service: &'a ContaduriaService,
        navigator: &'a Arc<FlagNavigator>,
    ) -> Self {
        Self {
            session,
            service,
            navigator,
        }
    }

    pub async fn run<R, W>(&self, term: &mut Terminal<R, W>) -> Result<DashboardExit>
    where
        R: AsyncBufRead + Unpin,
        W: AsyncWrite + Unpin,
    {
        let Some(user) = self.session.user() else {
            return Ok(DashboardExit::Redirected);
        };
        let name = user.nombre_completo.as_deref().unwrap_or(&user.usuario);
        term.print(&format!("\nHola, {name}")).await?;
        term.print(&render_profile(&user)).await?;
        term.print(&render_menu()).await?;

        loop {
            let Some(line) = term.prompt("contaduria> ").await? else {
                return Ok(DashboardExit::Quit);
            };

            match Command::parse(&line) {
                None => term.print(&format!("Sección desconocida: {line}")).await?,
                Some(Command::Menu) => term.print(&render_menu()).await?,
                Some(Command::Profile) => match self.session.user() {
                    Some(user) => term.print(&render_profile(&user)).await?,
                    None => return Ok(DashboardExit::Redirected),
                },
                Some(Command::Section(resource)) => {
                    let text = self.render_section(resource).await;
                    term.print(&text).await?;
                }
                Some(Command::Logout) => {
                    self.session.logout().await;
                    term.print("Sesión cerrada").await?;
                    return Ok(DashboardExit::LoggedOut);
                }
                Some(Command::Quit) => return Ok(DashboardExit::Quit),
            }

            if self.navigator.take_redirect() {
                debug!("Session expired while on the dashboard");
                term.print("Tu sesión expiró, inicia sesión de nuevo").await?;
                return Ok(DashboardExit::Redirected);
            }
        }
    }

    async fn render_section(&self, resource: Resource) -> String {
        match self.service.fetch(resource).await {
            Ok(envelope) => {
                let body = match envelope.datos {
                    Some(datos) => serde_json::to_string_pretty(&datos)
                        .unwrap_or_else(|_| datos.to_string()),
                    None => "Sin datos".to_string(),
                };
                format!("=== {resource} ===\n{body}")
            }
            Err(e) => {
                warn!("Failed to load {}: {}", resource.id(), e);
                let message = e
                    .server_message()
                    .map(str::to_string)
                    .unwrap_or_else(|| e.to_string());
                format!("=== {resource} ===\nNo se pudo cargar: {message}")
            }
        }
    }
}

pub fn render_menu() -> String {
    let mut menu = String::from("Secciones: perfil");
    for resource in Resource::ALL {
        let _ = write!(menu, ", {}", resource.id());
    }
    menu.push_str("\nComandos: salir (cerrar sesión), q (terminar), ayuda");
    menu
}

pub fn render_profile(user: &User) -> String {
    let yes_no = |flag: bool| if flag { "Sí" } else { "No" };
    let roles = if user.roles.is_empty() {
        NOT_AVAILABLE.to_string()
    } else {
        user.roles.join(", ")
    };
    let employee = user
        .employee_id()
        .map(|id| id.to_string())
        .unwrap_or_else(|| NOT_AVAILABLE.to_string());

    let mut out = String::from("=== Mi Perfil ===\n");
    let _ = writeln!(out, "Usuario: {}", user.usuario);
    let _ = writeln!(
        out,
        "Nombre Completo: {}",
        user.nombre_completo.as_deref().unwrap_or(NOT_AVAILABLE)
    );
    let _ = writeln!(out, "Email: {}", user.email.as_deref().unwrap_or(NOT_AVAILABLE));
    let _ = writeln!(
        out,
        "Estado: {}",
        if user.is_active() { "Activo" } else { "Inactivo" }
    );
    let _ = writeln!(out, "Roles: {roles}");
    let _ = writeln!(
        out,
        "Ver Todos los Clientes: {}",
        yes_no(user.can_view_all_clients())
    );
    let _ = write!(out, "Empleado ID: {employee}");
    out
}
