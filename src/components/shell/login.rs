use anyhow::Result;
use cd_auth::{Credentials, LoginOutcome, SessionController};
use tokio::io::{AsyncBufRead, AsyncWrite};
use tracing::debug;

use super::terminal::Terminal;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoginExit {
    Authenticated,
    Quit,
}

pub struct LoginScreen<'a> {
    session: &'a SessionController,
}

impl<'a> LoginScreen<'a> {
    pub fn new(session: &'a SessionController) -> Self {
        Self { session }
    }

    /// Prompt until a login succeeds; an empty user name or closed input quits
    pub async fn run<R, W>(&self, term: &mut Terminal<R, W>) -> Result<LoginExit>
    where
        R: AsyncBufRead + Unpin,
        W: AsyncWrite + Unpin,
    {
        term.print("\n=== Sistema Contaduría ===").await?;
        term.print("Ingresa tus credenciales para acceder (usuario vacío para salir)")
            .await?;

        loop {
            let usuario = match term.prompt("Usuario: ").await? {
                Some(usuario) if !usuario.is_empty() => usuario,
                _ => return Ok(LoginExit::Quit),
            };
            let Some(contrasena) = term.prompt("Contraseña: ").await? else {
                return Ok(LoginExit::Quit);
            };
            if contrasena.is_empty() {
                term.print("La contraseña es obligatoria").await?;
                continue;
            }

            let credentials = Credentials::new(usuario, contrasena);
            debug!("Submitting login for {}", credentials.usuario);

            match self.session.login(&credentials).await {
                LoginOutcome::Success(user) => {
                    let name = user.nombre_completo.as_deref().unwrap_or(&user.usuario);
                    term.print(&format!("Bienvenido, {name}")).await?;
                    return Ok(LoginExit::Authenticated);
                }
                LoginOutcome::Failure { message } => {
                    term.print(&format!("Error: {message}")).await?;
                }
            }
        }
    }
}
