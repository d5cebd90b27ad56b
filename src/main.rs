mod components;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use cd_auth::{
    ApiClient, FileTokenStore, FlagNavigator, MemoryTokenStore, SessionController, TokenStore,
};
use cd_config::Settings;
use cd_services::ContaduriaService;
use tokio::io::{AsyncBufRead, AsyncWrite};
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

use crate::components::shell::{
    Dashboard, DashboardExit, LoginExit, LoginScreen, Screen, Terminal,
};

#[derive(Parser, Debug)]
#[command(name = "contaduria", version, about = "Terminal client for the contaduría back office")]
struct Cli {
    /// Settings file; defaults to the platform config directory
    #[arg(long, env = "CONTADURIA_CONFIG", value_name = "PATH")]
    config: Option<PathBuf>,

    /// Write the default settings to the settings file and exit
    #[arg(long, default_value_t = false)]
    init_config: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let settings_path = match cli.config {
        Some(path) => path,
        None => Settings::default_path()?,
    };

    if cli.init_config {
        Settings::default().save(&settings_path).await?;
        println!("Wrote default settings to {}", settings_path.display());
        return Ok(());
    }

    let settings = Settings::load_or_default(&settings_path).await?;

    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&settings.logging.filter))
        .context("Invalid logging filter")?;
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let store: Arc<dyn TokenStore> = if settings.storage.ephemeral {
        info!("Using in-memory session storage");
        Arc::new(MemoryTokenStore::new())
    } else {
        Arc::new(FileTokenStore::new(settings.storage_dir()?).await?)
    };

    let navigator = Arc::new(FlagNavigator::new());
    let api = ApiClient::new(settings.client_config()?, store, navigator.clone())?;
    let service = ContaduriaService::new(api.clone());
    let session = SessionController::new(api);

    run(&session, &service, &navigator, &mut Terminal::stdio()).await
}

async fn run<R, W>(
    session: &SessionController,
    service: &ContaduriaService,
    navigator: &Arc<FlagNavigator>,
    term: &mut Terminal<R, W>,
) -> Result<()>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    loop {
        if navigator.take_redirect() {
            debug!("Redirect pending, re-running bootstrap");
            session.bootstrap().await;
        }

        match Screen::resolve(&session.snapshot()) {
            Screen::Verifying => {
                term.print(Screen::Verifying.label()).await?;
                session.bootstrap().await;
            }
            Screen::Login => match LoginScreen::new(session).run(term).await? {
                LoginExit::Authenticated => continue,
                LoginExit::Quit => break,
            },
            Screen::Dashboard => {
                match Dashboard::new(session, service, navigator).run(term).await? {
                    DashboardExit::LoggedOut => continue,
                    // the client wiped the store; bootstrap turns that into a logout
                    DashboardExit::Redirected => {
                        session.bootstrap().await;
                    }
                    DashboardExit::Quit => break,
                }
            }
        }
    }

    info!("Bye");
    Ok(())
}
