//! # Dusty Vaults Aggregator
//!
//! Off-chain statistics service for the Dusty Vaults staking dashboard.
//! Connects a wallet session, reads the vault and token contracts, and
//! publishes aggregate statistics and the connected account's position.
//!
//! ## Quick Start
//! ```bash
//! cargo run --bin dusty-aggregator
//! ```
//!
//! ## Endpoints
//! - `GET /health` - Health check with session and RPC status
//! - `GET /stats` - Published vault statistics
//! - `GET /position` - Published position of the connected account
//! - `GET /metrics` - Prometheus metrics
//! - `POST /connect` - Connect the wallet and run a full fetch cycle
//! - `POST /refresh` - Re-run the fetch cycle
//! - `POST /events` - Forward a provider-level wallet notification

pub mod aggregator;
pub mod config;
pub mod contracts;
mod error;
mod handlers;
pub mod indexer;
pub mod metrics;
mod middleware;
mod response;
mod router;
pub mod rpc;
pub mod session;
pub mod state;
pub mod stats;
pub mod wallet;

pub use aggregator::Aggregator;
pub use config::Config;
pub use error::Error;
pub use router::create as create_router;
pub use session::{Session, SessionState, WalletEvent};
pub use state::AppState;
