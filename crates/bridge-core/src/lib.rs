//! Ledger Bridge Core Library
//!
//! This crate implements the device protocol layer of a browser-hosted
//! bridge that relays signing requests from a parent application to a Ledger
//! hardware wallet. Private keys never leave the device: the bridge only
//! frames commands, moves bytes and classifies the answers.
//!
//! # Overview
//!
//! - **APDU codec**: command/response framing, account index encoding,
//!   status word and payload extraction
//! - **Optional fields**: version-gated encoding of the transaction display
//!   context (ticker, destination, chain id, wallet ids)
//! - **Chunking**: oversized payloads sent as sequential 255-byte frames
//! - **Status classification**: the closed set of device outcomes
//! - **Sessions**: direct or companion-bridge discovery, scoped
//!   acquire/use/release, cancellable bounded polling
//! - **Control surface**: typed JSON requests and replies
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │              Bridge (JSON requests / replies)                │
//! ├─────────────────────────────────────────────────────────────┤
//! │        SessionManager (discovery, guard, release)            │
//! ├─────────────────────────────────────────────────────────────┤
//! │                LedgerApp (device commands)                   │
//! │  ┌─────────┐  ┌─────────┐  ┌─────────┐  ┌─────────────────┐ │
//! │  │  APDU   │  │ Fields  │  │  Chunk  │  │     Status      │ │
//! │  │ Codec   │  │ Encoder │  │ Transmit│  │ Classification  │ │
//! │  └─────────┘  └─────────┘  └─────────┘  └─────────────────┘ │
//! ├─────────────────────────────────────────────────────────────┤
//! │        Transport / Connector (WebHID, companion WS)          │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Quick Start
//!
//! The host implements [`transport::Connector`] for its environment, then
//! feeds requests to a [`Bridge`]:
//!
//! ```ignore
//! use ledger_bridge_core::{Bridge, BridgeConfig};
//!
//! let bridge = Bridge::new(connector, BridgeConfig::default());
//! let reply = bridge
//!     .handle_json(r#"{"action":"ledger-get-public-key","params":{"account":0}}"#)
//!     .await;
//! ```
//!
//! Lower layers are usable on their own:
//!
//! ```
//! use ledger_bridge_core::fields::{EncodingStrategy, SigningContext, encode_optional_fields};
//!
//! let ctx = SigningContext {
//!     decimals: 9,
//!     asset: "EVER".to_string(),
//!     chain_id: Some(42),
//!     ..SigningContext::default()
//! };
//! let block = encode_optional_fields(&ctx, EncodingStrategy::Versioned).unwrap();
//! assert_eq!(block, vec![0x08, 0x00, 0x00, 0x00, 0x2A]);
//! ```
//!
//! # Feature Flags
//!
//! This crate currently has no optional features.

// Modules
pub mod apdu;
pub mod app;
pub mod bridge;
pub mod chunk;
pub mod codec;
pub mod config;
pub mod error;
pub mod fields;
pub mod session;
pub mod status;
pub mod transport;

// Re-exports for convenience
pub use apdu::{Apdu, ApduResponse};
pub use app::{Configuration, LedgerApp};
pub use bridge::{Bridge, Reply, Request};
pub use config::{BridgeConfig, DiscoveryMode};
pub use error::{Error, Result};
pub use fields::{DeviceVersion, EncodingStrategy, SigningContext, WalletIds};
pub use session::{CancelHandle, SessionManager, SessionState};
pub use status::{Outcome, StatusWord};
pub use transport::{Connector, Transport, TransportError};
