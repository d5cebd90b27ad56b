//! Session management for the contaduría back-office client
//!
//! This crate owns everything between the UI and the gateway that has to do
//! with who is logged in: persisted credentials, the authenticated HTTP
//! client, and the session state machine.
//!
//! # Session Lifecycle
//!
//! 1. [`SessionController::bootstrap`] rebuilds the session from the
//!    [`TokenStore`] at startup
//! 2. [`SessionController::login`] authenticates and persists the tokens
//! 3. Every [`ApiClient`] call carries the access token; a `401` renews it
//!    once through the refresh endpoint and retries
//! 4. [`SessionController::logout`] wipes the store whether or not the
//!    backend answers
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use cd_auth::{ApiClient, ClientConfig, Credentials, FileTokenStore, NoopNavigator, SessionController};
//!
//! #[tokio::main]
//! async fn main() -> cd_auth::Result<()> {
//!     let store = FileTokenStore::new(FileTokenStore::default_storage_dir()?).await?;
//!     let api = ApiClient::new(ClientConfig::default(), Arc::new(store), Arc::new(NoopNavigator))?;
//!     let session = SessionController::new(api);
//!
//!     if !session.bootstrap().await.is_authenticated() {
//!         let outcome = session.login(&Credentials::new("testuser", "password123")).await;
//!         if let Some(message) = outcome.error() {
//!             eprintln!("Login failed: {}", message);
//!         }
//!     }
//!
//!     println!("Contador: {}", session.has_role(cd_auth::roles::CONTADOR));
//!     Ok(())
//! }
//! ```
//!
//! # Token Storage
//!
//! ```
//! use cd_auth::{MemoryTokenStore, TokenSlot, TokenStore};
//!
//! # async fn example() -> cd_auth::Result<()> {
//! let store = MemoryTokenStore::new();
//! store.set(TokenSlot::AccessToken, "A1").await?;
//!
//! let loaded = store.load_all().await;
//! assert_eq!(loaded.access_token.as_deref(), Some("A1"));
//! assert!(loaded.refresh_token.is_none());
//! # Ok(())
//! # }
//! # tokio_test::block_on(example()).unwrap();
//! ```
//!
//! # Important Notes
//!
//! - Tokens and passwords are never logged
//! - A failed renewal clears the store and calls [`Navigator::redirect_to_login`]

pub mod client;
pub mod config;
pub mod controller;
pub mod errors;
pub mod file_store;
pub mod models;
pub mod navigator;
pub mod session;
pub mod store;

// Re-export main types
pub use client::{ApiClient, ApiRequest};
pub use config::{ClientConfig, HttpTimeouts, endpoints};
pub use controller::{LoginOutcome, SessionController};
pub use errors::{AuthError, Result};
pub use file_store::FileTokenStore;
pub use models::{Credentials, Employee, Envelope, User, UserPatch, roles};
pub use navigator::{FlagNavigator, Navigator, NoopNavigator};
pub use session::{SessionAction, SessionState, SessionStatus};
pub use store::{MemoryTokenStore, PersistedCredentials, TokenSlot, TokenStore};
