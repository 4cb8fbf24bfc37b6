//! The `LedgerBridge` class exported to JavaScript.
//!
//! # Example
//!
//! ```javascript
//! import init, { LedgerBridge } from 'ledger-bridge-wasm';
//!
//! await init();
//!
//! const bridge = new LedgerBridge(host, JSON.stringify({ pollAttempts: 60 }));
//!
//! window.addEventListener('message', async (event) => {
//!     if (event.data?.target !== 'LEDGER-IFRAME') return;
//!     const reply = await bridge.handle(JSON.stringify(event.data));
//!     window.parent.postMessage(JSON.parse(reply), '*');
//! });
//! ```

use std::fmt;

use ledger_bridge_core::bridge::Bridge;
use ledger_bridge_core::config::BridgeConfig;
use wasm_bindgen::prelude::*;

use crate::connector::{Host, JsConnector};
use crate::error::WasmResult;

/// A bridge between the host page and the device.
///
/// # Thread Safety
///
/// This type is not thread-safe and should only be used from the main thread
/// in a browser environment.
#[wasm_bindgen]
pub struct LedgerBridge {
    /// The core bridge over the page's capabilities.
    inner: Bridge<JsConnector>,
}

impl fmt::Debug for LedgerBridge {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LedgerBridge")
            .field("inner", &self.inner)
            .finish()
    }
}

#[wasm_bindgen]
impl LedgerBridge {
    /// Creates a bridge over the page's host object.
    ///
    /// # Arguments
    ///
    /// * `host` - Object implementing `LedgerHost`
    /// * `config` - Optional JSON configuration
    ///
    /// # Errors
    ///
    /// Throws if the configuration is malformed or invalid.
    #[wasm_bindgen(constructor)]
    pub fn new(host: Host, config: Option<String>) -> Result<LedgerBridge, JsValue> {
        Self::new_internal(host, config.as_deref()).map_err(JsValue::from)
    }

    fn new_internal(host: Host, config: Option<&str>) -> WasmResult<LedgerBridge> {
        let config = match config {
            Some(json) => BridgeConfig::from_json(json)?,
            None => BridgeConfig::default(),
        };
        log::info!(
            "ledger bridge ready, mode {:?}, endpoint {}",
            config.initial_mode,
            config.bridge_url
        );

        Ok(Self {
            inner: Bridge::new(JsConnector::new(host), config),
        })
    }

    /// Handles one JSON request and resolves to the JSON reply.
    ///
    /// Never rejects: failures are reported inside the reply.
    pub async fn handle(&self, request: String) -> String {
        self.inner.handle_json(&request).await
    }

    /// Cancels a running bridge discovery.
    pub fn cancel(&self) {
        self.inner.cancel();
    }

    /// Returns the session state, for diagnostics.
    #[wasm_bindgen(getter)]
    pub fn state(&self) -> String {
        format!("{:?}", self.inner.sessions().state())
    }
}
