//! Host-provided transport.
//!
//! The page owns the actual byte pipe (a WebHID transport, or the companion
//! WebSocket). It hands the bridge any object with this shape:
//!
//! ```typescript
//! interface LedgerTransport {
//!     exchange(apdu: Uint8Array): Promise<Uint8Array>;
//!     close(): Promise<void> | void;
//! }
//! ```
//!
//! [`JsTransport`] adapts such an object to the core [`Transport`] trait and
//! classifies every exception it raises.

use std::fmt;

use js_sys::{Promise, Uint8Array};
use ledger_bridge_core::apdu::{Apdu, ApduResponse};
use ledger_bridge_core::transport::{Transport, TransportError};
use wasm_bindgen::prelude::*;
use wasm_bindgen_futures::JsFuture;

use crate::error::classify_js_error;

#[wasm_bindgen]
extern "C" {
    /// A transport object supplied by the host page.
    #[wasm_bindgen(typescript_type = "LedgerTransport")]
    pub type HostTransport;

    #[wasm_bindgen(method, catch)]
    fn exchange(this: &HostTransport, apdu: &Uint8Array) -> Result<Promise, JsValue>;

    #[wasm_bindgen(method, catch, js_name = "close")]
    fn close_raw(this: &HostTransport) -> Result<JsValue, JsValue>;
}

/// Adapter from a [`HostTransport`] to the core [`Transport`] trait.
pub struct JsTransport {
    /// The host object.
    inner: HostTransport,

    /// Whether `close` was already called.
    closed: bool,
}

impl fmt::Debug for JsTransport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("JsTransport")
            .field("closed", &self.closed)
            .finish_non_exhaustive()
    }
}

impl JsTransport {
    /// Wraps a host transport object.
    #[must_use]
    pub const fn new(inner: HostTransport) -> Self {
        Self {
            inner,
            closed: false,
        }
    }
}

impl Transport for JsTransport {
    async fn exchange(&mut self, apdu: &Apdu) -> Result<ApduResponse, TransportError> {
        if self.closed {
            return Err(TransportError::Io("transport is closed".to_string()));
        }

        let bytes = apdu.to_bytes();
        let request = Uint8Array::from(bytes.as_slice());

        let promise = self
            .inner
            .exchange(&request)
            .map_err(|e| classify_js_error(&e))?;
        let value = JsFuture::from(promise)
            .await
            .map_err(|e| classify_js_error(&e))?;

        let raw = Uint8Array::new(&value).to_vec();
        ApduResponse::from_bytes(raw).map_err(|e| TransportError::Io(e.to_string()))
    }

    async fn close(&mut self) {
        if self.closed {
            return;
        }
        self.closed = true;

        match self.inner.close_raw() {
            Ok(value) => {
                if let Ok(promise) = value.dyn_into::<Promise>()
                    && let Err(e) = JsFuture::from(promise).await
                {
                    log::warn!("closing transport failed: {:?}", classify_js_error(&e));
                }
            }
            Err(e) => {
                log::warn!("closing transport failed: {:?}", classify_js_error(&e));
            }
        }
    }
}
