//! Host capabilities used for session discovery.
//!
//! The page passes an object with this shape to the [`LedgerBridge`]
//! constructor:
//!
//! ```typescript
//! interface LedgerHost {
//!     openLocal(): Promise<LedgerTransport>;
//!     probeBridge(url: string): Promise<void>;
//!     openBridge(url: string): Promise<LedgerTransport>;
//!     launchCompanion?(uri: string): void;
//! }
//! ```
//!
//! `launchCompanion` is optional; without it the launch URI is opened with
//! `window.open`. Sleeping uses browser timers.
//!
//! [`LedgerBridge`]: crate::bridge::LedgerBridge

use std::fmt;
use std::time::Duration;

use js_sys::Promise;
use ledger_bridge_core::transport::{Connector, TransportError};
use wasm_bindgen::prelude::*;
use wasm_bindgen_futures::JsFuture;

use crate::error::classify_js_error;
use crate::transport::{HostTransport, JsTransport};

#[wasm_bindgen]
extern "C" {
    /// The host capability object supplied by the page.
    #[wasm_bindgen(typescript_type = "LedgerHost")]
    pub type Host;

    #[wasm_bindgen(method, catch, js_name = "openLocal")]
    fn open_local(this: &Host) -> Result<Promise, JsValue>;

    #[wasm_bindgen(method, catch, js_name = "probeBridge")]
    fn probe_bridge(this: &Host, url: &str) -> Result<Promise, JsValue>;

    #[wasm_bindgen(method, catch, js_name = "openBridge")]
    fn open_bridge(this: &Host, url: &str) -> Result<Promise, JsValue>;

    #[wasm_bindgen(method, catch, js_name = "launchCompanion")]
    fn launch_companion(this: &Host, uri: &str) -> Result<JsValue, JsValue>;
}

/// Where the companion launch URI is sent.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LaunchRoute {
    /// The host's own `launchCompanion`. Its failures are only logged.
    Host,

    /// `window.open`, used only when the host has no `launchCompanion`.
    Window,
}

impl LaunchRoute {
    const fn for_host(provides_launch: bool) -> Self {
        if provides_launch { Self::Host } else { Self::Window }
    }
}

/// Adapter from a [`Host`] object to the core [`Connector`] trait.
pub struct JsConnector {
    /// The host object.
    host: Host,
}

impl fmt::Debug for JsConnector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("JsConnector").finish_non_exhaustive()
    }
}

impl JsConnector {
    /// Wraps a host capability object.
    #[must_use]
    pub const fn new(host: Host) -> Self {
        Self { host }
    }

    async fn settle(promise: Result<Promise, JsValue>) -> Result<JsValue, TransportError> {
        let promise = promise.map_err(|e| classify_js_error(&e))?;
        JsFuture::from(promise)
            .await
            .map_err(|e| classify_js_error(&e))
    }
}

impl Connector for JsConnector {
    type Transport = JsTransport;

    async fn open_local(&self) -> Result<JsTransport, TransportError> {
        let value = Self::settle(self.host.open_local()).await?;
        Ok(JsTransport::new(value.unchecked_into::<HostTransport>()))
    }

    async fn probe_bridge(&self, url: &str) -> Result<(), TransportError> {
        Self::settle(self.host.probe_bridge(url))
            .await
            .map(drop)
            .map_err(|e| match e {
                TransportError::Io(msg) => TransportError::Unreachable(msg),
                other => other,
            })
    }

    async fn open_bridge(&self, url: &str) -> Result<JsTransport, TransportError> {
        let value = Self::settle(self.host.open_bridge(url)).await?;
        Ok(JsTransport::new(value.unchecked_into::<HostTransport>()))
    }

    fn launch_companion(&self, uri: &str) {
        let provided = js_sys::Reflect::get(&self.host, &JsValue::from_str("launchCompanion"))
            .is_ok_and(|method| method.is_function());

        match LaunchRoute::for_host(provided) {
            LaunchRoute::Host => {
                if let Err(e) = self.host.launch_companion(uri) {
                    log::warn!("host launchCompanion failed for {uri}: {e:?}");
                }
            }
            LaunchRoute::Window => {
                log::debug!("host has no launchCompanion, opening {uri} directly");
                let opened = web_sys::window().map(|window| window.open_with_url(uri));
                match opened {
                    Some(Ok(_)) => {}
                    Some(Err(e)) => log::warn!("failed to open {uri}: {e:?}"),
                    None => log::warn!("no window to open {uri} from"),
                }
            }
        }
    }

    async fn sleep(&self, duration: Duration) {
        gloo_timers::future::sleep(duration).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn launch_falls_back_only_without_host_method() {
        assert_eq!(LaunchRoute::for_host(true), LaunchRoute::Host);
        assert_eq!(LaunchRoute::for_host(false), LaunchRoute::Window);
    }
}
