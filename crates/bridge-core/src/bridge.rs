//! Inbound control surface.
//!
//! The host page forwards messages of the form
//!
//! ```json
//! { "action": "ledger-get-public-key", "params": { "account": 0 } }
//! ```
//!
//! and sends back the reply produced by [`Bridge::handle_json`]:
//!
//! ```json
//! { "action": "ledger-get-public-key-reply", "success": true, "payload": "a1b2..." }
//! ```
//!
//! Failed operations carry `error.reason`, one of the stable strings returned
//! by [`Error::reason`], and `error.message` with the diagnostic text. Byte
//! payloads are lowercase hex.

use core::fmt;

use serde::de::{Deserializer, IgnoredAny};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, warn};

use crate::config::{BridgeConfig, DiscoveryMode};
use crate::error::{Error, Result};
use crate::fields::SigningContext;
use crate::session::SessionManager;
use crate::transport::Connector;

/// Action name used in replies when the request carried none.
const UNKNOWN_ACTION: &str = "ledger-unknown";

/// Parameters of actions that take none.
///
/// A missing `params`, `null` or any object is accepted and ignored.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct NoParams {}

impl<'de> Deserialize<'de> for NoParams {
    fn deserialize<D>(deserializer: D) -> core::result::Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        Option::<IgnoredAny>::deserialize(deserializer).map(|_| Self {})
    }
}

/// Parameters of `ledger-get-public-key`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GetPublicKeyParams {
    /// Account index.
    pub account: u32,

    /// Display the key on the device first. Defaults to `false`.
    #[serde(default)]
    pub confirm: Option<bool>,
}

/// Parameters of `ledger-get-address`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GetAddressParams {
    /// Account index.
    pub account: u32,

    /// Wallet contract type.
    pub contract: u8,

    /// Display the address on the device first. Defaults to `true`.
    #[serde(default)]
    pub confirm: Option<bool>,
}

/// Parameters of `ledger-sign-message`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SignMessageParams {
    /// Account index.
    pub account: u32,

    /// Message to sign, hex encoded.
    pub message: String,
}

/// Parameters of `ledger-sign-transaction`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SignTransactionParams {
    /// Account index.
    pub account: u32,

    /// Serialized transaction, hex encoded.
    pub message: String,

    /// Display and routing context.
    pub context: SigningContext,
}

/// Parameters of `ledger-update-transport`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateTransportParams {
    /// Reach the device through the companion application.
    pub use_ledger_live: bool,
}

/// A request from the host application.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "action", content = "params")]
pub enum Request {
    /// Read the application configuration.
    #[serde(rename = "ledger-get-configuration")]
    GetConfiguration(NoParams),

    /// Read an account public key.
    #[serde(rename = "ledger-get-public-key")]
    GetPublicKey(GetPublicKeyParams),

    /// Read an account address.
    #[serde(rename = "ledger-get-address")]
    GetAddress(GetAddressParams),

    /// Sign an arbitrary message.
    #[serde(rename = "ledger-sign-message")]
    SignMessage(SignMessageParams),

    /// Sign a transaction.
    #[serde(rename = "ledger-sign-transaction")]
    SignTransaction(SignTransactionParams),

    /// Release the held session.
    #[serde(rename = "ledger-close-bridge")]
    CloseBridge(NoParams),

    /// Switch between direct and companion discovery.
    #[serde(rename = "ledger-update-transport")]
    UpdateTransport(UpdateTransportParams),
}

impl Request {
    /// Returns the action name of the request.
    #[must_use]
    pub const fn action(&self) -> &'static str {
        match self {
            Self::GetConfiguration(_) => "ledger-get-configuration",
            Self::GetPublicKey(_) => "ledger-get-public-key",
            Self::GetAddress(_) => "ledger-get-address",
            Self::SignMessage(_) => "ledger-sign-message",
            Self::SignTransaction(_) => "ledger-sign-transaction",
            Self::CloseBridge(_) => "ledger-close-bridge",
            Self::UpdateTransport(_) => "ledger-update-transport",
        }
    }
}

/// The failure part of a reply.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReplyError {
    /// Stable reason string.
    pub reason: String,

    /// Diagnostic text.
    pub message: String,
}

impl From<&Error> for ReplyError {
    fn from(err: &Error) -> Self {
        Self {
            reason: err.reason().to_string(),
            message: err.to_string(),
        }
    }
}

/// A reply to the host application.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reply {
    /// `<action>-reply`.
    pub action: String,

    /// Whether the operation succeeded.
    pub success: bool,

    /// Result bytes, hex encoded.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payload: Option<String>,

    /// Failure details.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<ReplyError>,
}

impl Reply {
    /// Builds a reply from an operation result.
    #[must_use]
    pub fn new(action: &str, result: &Result<Option<Vec<u8>>>) -> Self {
        let action = format!("{action}-reply");
        match result {
            Ok(payload) => Self {
                action,
                success: true,
                payload: payload.as_deref().map(hex::encode),
                error: None,
            },
            Err(err) => Self {
                action,
                success: false,
                payload: None,
                error: Some(err.into()),
            },
        }
    }
}

/// Dispatches requests to the device through a [`SessionManager`].
pub struct Bridge<C: Connector> {
    sessions: SessionManager<C>,
}

impl<C: Connector> fmt::Debug for Bridge<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Bridge")
            .field("sessions", &self.sessions)
            .finish()
    }
}

impl<C: Connector> Bridge<C> {
    /// Creates a bridge over a host connector.
    #[must_use]
    pub fn new(connector: C, config: BridgeConfig) -> Self {
        Self {
            sessions: SessionManager::new(connector, config),
        }
    }

    /// Returns the session manager.
    pub const fn sessions(&self) -> &SessionManager<C> {
        &self.sessions
    }

    /// Cancels a running discovery.
    pub fn cancel(&self) {
        self.sessions.cancel();
    }

    /// Handles a JSON request and returns the JSON reply.
    ///
    /// Malformed input yields an `INVALID_REQUEST` reply.
    pub async fn handle_json(&self, json: &str) -> String {
        let reply = match serde_json::from_str::<Value>(json) {
            Ok(value) => {
                let action = value
                    .get("action")
                    .and_then(Value::as_str)
                    .unwrap_or(UNKNOWN_ACTION)
                    .to_string();
                match serde_json::from_value::<Request>(value) {
                    Ok(request) => self.handle(request).await,
                    Err(err) => {
                        warn!(%err, action = %action, "rejecting malformed request");
                        Reply::new(&action, &Err(err.into()))
                    }
                }
            }
            Err(err) => {
                warn!(%err, "rejecting malformed request");
                Reply::new(UNKNOWN_ACTION, &Err(err.into()))
            }
        };

        render(&reply)
    }

    /// Handles a typed request.
    pub async fn handle(&self, request: Request) -> Reply {
        let action = request.action();
        debug!(action, "handling request");

        let result = self.dispatch(request).await;
        if let Err(err) = &result {
            warn!(action, reason = err.reason(), %err, "request failed");
        }
        Reply::new(action, &result)
    }

    async fn dispatch(&self, request: Request) -> Result<Option<Vec<u8>>> {
        match request {
            Request::GetConfiguration(_) => {
                let config = self
                    .sessions
                    .with_session(async |app| app.get_configuration().await)
                    .await?;
                Ok(Some(config.raw))
            }
            Request::GetPublicKey(params) => {
                let confirm = params.confirm.unwrap_or(false);
                let key = self
                    .sessions
                    .with_session(async |app| app.get_public_key(params.account, confirm).await)
                    .await?;
                Ok(Some(key.to_vec()))
            }
            Request::GetAddress(params) => {
                let confirm = params.confirm.unwrap_or(true);
                let address = self
                    .sessions
                    .with_session(async |app| {
                        app.get_address(params.account, params.contract, confirm)
                            .await
                    })
                    .await?;
                Ok(Some(address.to_vec()))
            }
            Request::SignMessage(params) => {
                let message = decode_hex(&params.message)?;
                let signature = self
                    .sessions
                    .with_session(async |app| app.sign_message(params.account, &message).await)
                    .await?;
                Ok(Some(signature))
            }
            Request::SignTransaction(params) => {
                let message = decode_hex(&params.message)?;
                let signature = self
                    .sessions
                    .with_signing_session(async |app, strategy| {
                        app.sign_transaction(params.account, &params.context, &message, strategy)
                            .await
                    })
                    .await?;
                Ok(Some(signature))
            }
            Request::CloseBridge(_) => {
                self.sessions.close().await;
                Ok(None)
            }
            Request::UpdateTransport(params) => {
                let mode = DiscoveryMode::from_companion_flag(params.use_ledger_live);
                self.sessions.set_mode(mode).await;
                Ok(None)
            }
        }
    }
}

fn decode_hex(text: &str) -> Result<Vec<u8>> {
    let text = text.trim();
    let text = text.strip_prefix("0x").unwrap_or(text);
    Ok(hex::decode(text)?)
}

fn render(reply: &Reply) -> String {
    serde_json::to_string(reply).unwrap_or_else(|err| {
        warn!(%err, "failed to serialize reply");
        format!(
            r#"{{"action":"{}","success":false}}"#,
            reply.action.replace('"', "")
        )
    })
}
