//! JavaScript-friendly error types for WASM bindings.
//!
//! Two directions are covered here:
//!
//! - [`WasmError`] is what the bindings throw back to JavaScript.
//! - [`classify_js_error`] turns exceptions raised by the host transport into
//!   the closed [`TransportError`] set, so nothing past this boundary looks at
//!   free-form error text.

use std::{error, fmt};

use js_sys::{Error as JsError, Reflect};
use ledger_bridge_core::error::Error as CoreError;
use ledger_bridge_core::transport::TransportError;
use wasm_bindgen::prelude::*;

/// Exception name raised when the device picker is dismissed or refused.
const USER_CANCELLED_NAME: &str = "TransportOpenUserCancelled";

/// Message fragment telling a refusal apart from a dismissed picker.
const ACCESS_DENIED: &str = "Access denied";

/// Error type for WASM operations.
#[derive(Debug, Clone)]
pub enum WasmError {
    /// The configuration passed to the constructor is invalid.
    InvalidConfig(String),

    /// Core library error.
    CoreError {
        /// Stable reason string.
        reason: &'static str,

        /// Diagnostic text.
        message: String,
    },

    /// JavaScript error raised by the host.
    JsError(String),
}

impl fmt::Display for WasmError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidConfig(msg) => {
                write!(f, "Invalid configuration: {msg}")
            }
            Self::CoreError { reason, message } => {
                write!(f, "{reason}: {message}")
            }
            Self::JsError(msg) => {
                write!(f, "JavaScript error: {msg}")
            }
        }
    }
}

impl error::Error for WasmError {}

impl From<WasmError> for JsValue {
    fn from(error: WasmError) -> Self {
        JsError::new(&error.to_string()).into()
    }
}

impl From<CoreError> for WasmError {
    fn from(error: CoreError) -> Self {
        match error {
            CoreError::InvalidRequest(msg) => Self::InvalidConfig(msg),
            other => Self::CoreError {
                reason: other.reason(),
                message: other.to_string(),
            },
        }
    }
}

impl From<JsValue> for WasmError {
    fn from(value: JsValue) -> Self {
        Self::JsError(js_message(&value))
    }
}

/// Result type for WASM operations.
pub type WasmResult<T> = Result<T, WasmError>;

/// Maps an exception thrown by the host transport.
///
/// A numeric `statusCode` property is matched against the codes the
/// transport raises below the device application. The picker exception is
/// split into refusal and dismissal by its message.
pub fn classify_js_error(value: &JsValue) -> TransportError {
    let status_code = Reflect::get(value, &JsValue::from_str("statusCode"))
        .ok()
        .and_then(|v| v.as_f64());
    let name = Reflect::get(value, &JsValue::from_str("name"))
        .ok()
        .and_then(|v| v.as_string());

    classify(status_code, name.as_deref(), &js_message(value))
}

fn classify(status_code: Option<f64>, name: Option<&str>, message: &str) -> TransportError {
    let known = status_code
        .filter(|code| code.fract() == 0.0 && (0.0..=f64::from(u16::MAX)).contains(code))
        .and_then(|code| TransportError::from_status_word(code as u16));
    if let Some(err) = known {
        return err;
    }

    if name.is_some_and(|name| name.contains(USER_CANCELLED_NAME)) {
        return if message.contains(ACCESS_DENIED) {
            TransportError::PermissionDenied
        } else {
            TransportError::UserCancelledSelection
        };
    }

    TransportError::Io(message.to_string())
}

fn js_message(value: &JsValue) -> String {
    if let Some(s) = value.as_string() {
        s
    } else if let Some(err) = value.dyn_ref::<JsError>() {
        err.message().into()
    } else {
        format!("{value:?}")
    }
}
