//! Ledger Bridge WASM Library
//!
//! This crate provides WebAssembly bindings for the Ledger bridge, letting
//! an iframe page relay signing requests from its parent application to a
//! Ledger device.
//!
//! The page keeps ownership of the byte pipe: it supplies a host object able
//! to open a WebHID transport or a companion WebSocket transport, and
//! forwards `postMessage` requests to [`LedgerBridge::handle`].
//!
//! # Browser Support
//!
//! Direct mode requires WebHID, which is only available in Chromium-based
//! browsers. Companion mode works wherever WebSockets do, as long as the
//! companion application is installed.
//!
//! # Quick Start
//!
//! ```javascript
//! import init, { LedgerBridge } from 'ledger-bridge-wasm';
//!
//! await init();
//!
//! const bridge = new LedgerBridge({
//!     openLocal: () => TransportWebHID.create(),
//!     probeBridge: (url) => WebSocketTransport.check(url),
//!     openBridge: (url) => WebSocketTransport.open(url),
//! });
//!
//! const reply = await bridge.handle(JSON.stringify({
//!     action: 'ledger-get-public-key',
//!     params: { account: 0 },
//! }));
//! ```
//!
//! # API Reference
//!
//! ## [`LedgerBridge`]
//!
//! - [`new LedgerBridge(host, config?)`](LedgerBridge::new) - Create a bridge
//! - [`handle(requestJson)`](LedgerBridge::handle) - Handle a request, resolve to the reply JSON
//! - [`cancel()`](LedgerBridge::cancel) - Stop a running companion discovery
//! - [`state`](LedgerBridge::state) - Current session state

pub mod bridge;
pub mod connector;
pub mod error;
pub mod transport;

pub use bridge::LedgerBridge;
pub use connector::JsConnector;
pub use error::{WasmError, WasmResult};
pub use transport::JsTransport;

use wasm_bindgen::prelude::*;

/// Initializes the WASM module.
///
/// Installs the panic hook and routes log records to the browser console.
#[wasm_bindgen(start)]
pub fn init() {
    console_error_panic_hook::set_once();
    wasm_logger::init(wasm_logger::Config::new(log::Level::Info));
}

/// Checks if WebHID is supported in the current browser.
///
/// # Example
///
/// ```javascript
/// if (!isWebHidSupported()) {
///     await bridge.handle(JSON.stringify({
///         action: 'ledger-update-transport',
///         params: { useLedgerLive: true },
///     }));
/// }
/// ```
#[wasm_bindgen(js_name = "isWebHidSupported")]
pub fn is_webhid_supported() -> bool {
    if let Some(window) = web_sys::window() {
        let navigator: web_sys::Navigator = window.navigator();
        js_sys::Reflect::has(&navigator, &JsValue::from_str("hid")).unwrap_or(false)
    } else {
        false
    }
}

/// Returns the library version.
///
/// # Returns
///
/// The version string (e.g., `"0.1.0"`).
#[wasm_bindgen(js_name = "getVersion")]
pub fn get_version() -> String {
    env!("CARGO_PKG_VERSION").to_string()
}
