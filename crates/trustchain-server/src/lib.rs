//! # Trustchain Server
//!
//! HTTP adapters for the signer and chain services.
//!
//! ## Key Types
//!
//! - [`signer::router`] - `/pubkey`, `/keys`, `/sign`, `/verify`, `/rotate`, `/health`
//! - [`chain::router`] - `/chain`, `/head`, `/health`, `/append`, `/verify`, `/reload`
//! - [`ApiError`] - maps failures to stable `{ "error": <code> }` bodies
//!
//! ## Usage
//!
//! ```rust,no_run
//! use trustchain::{Ledger, LedgerConfig};
//!
//! async fn example() {
//!     let ledger = Ledger::open(&LedgerConfig::default()).await.unwrap();
//!
//!     let listener = tokio::net::TcpListener::bind("127.0.0.1:7002").await.unwrap();
//!     trustchain_server::serve(listener, trustchain_server::chain::router(ledger))
//!         .await
//!         .unwrap();
//! }
//! ```

pub mod chain;
pub mod error;
pub mod signer;

pub use error::{ApiError, ApiResult};

use axum::Router;
use tokio::net::TcpListener;
use tracing::info;

/// Serve `router` on `listener` until Ctrl-C.
pub async fn serve(listener: TcpListener, router: Router) -> std::io::Result<()> {
    info!(addr = %listener.local_addr()?, "listening");
    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await
}

async fn shutdown_signal() {
    if tokio::signal::ctrl_c().await.is_ok() {
        info!("shutdown signal received");
    }
}
