//! Sign-transaction payload encoding.
//!
//! A sign-transaction command carries a fixed prefix (account, wallet ids,
//! decimals, display ticker) followed by an optional-field block and the
//! serialized message. The optional-field block exists in two incompatible
//! wire formats selected once per session from the device version:
//!
//! - [`EncodingStrategy::Legacy`] (firmware below 1.1): address presence tag
//!   in the prefix, then a single chain-id metadata byte
//! - [`EncodingStrategy::Versioned`] (firmware 1.1 and above): a bitmask byte
//!   followed by the present fields in increasing bit order
//!
//! # Versioned Layout
//!
//! ```text
//! | account | orig wallet | decimals | len | ticker | mask | fields... | message |
//! |   4B    |     1B      |    1B    | 1B  |  Var   |  1B  |   Var     |   Var   |
//! ```
//!
//! | Bit | Field        | Size |
//! |-----|--------------|------|
//! | 0   | wallet id    | 1B   |
//! | 1   | workchain id | 1B   |
//! | 2   | address      | 32B  |
//! | 3   | chain id     | 4B   |
//!
//! # Example
//!
//! ```
//! use ledger_bridge_core::fields::{normalize_ticker, DeviceVersion, EncodingStrategy};
//!
//! assert_eq!(normalize_ticker("EVER"), "EVER");
//! assert_eq!(normalize_ticker("FLATQUBE-LP-WEVER-USDT"), "LP");
//!
//! let strategy = EncodingStrategy::for_version(DeviceVersion::new(1, 1, 0));
//! assert_eq!(strategy, EncodingStrategy::Versioned);
//! ```

use core::fmt;

use serde::{Deserialize, Serialize};

use crate::codec::encode_account_index;
use crate::error::{Error, Result};

/// Substring marking a liquidity-pool token in an asset name.
const LP_MARKER: &str = "-LP-";

/// Ticker shown for liquidity-pool tokens.
const LP_TICKER: &str = "LP";

/// Longest ticker the device displays without truncation.
const MAX_TICKER_CHARS: usize = 8;

/// Characters kept when a ticker is truncated.
const TRUNCATED_TICKER_CHARS: usize = 6;

/// Suffix appended to truncated tickers.
const ELLIPSIS: &str = "..";

/// Length of a raw destination address.
pub const ADDRESS_LEN: usize = 32;

/// Optional-field flag bits.
pub mod flag {
    /// Current wallet id present.
    pub const WALLET_ID: u8 = 1 << 0;

    /// Workchain id present.
    pub const WORKCHAIN_ID: u8 = 1 << 1;

    /// Destination address present.
    pub const ADDRESS: u8 = 1 << 2;

    /// Chain id present.
    pub const CHAIN_ID: u8 = 1 << 3;
}

/// Firmware version of the device application.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct DeviceVersion {
    /// Major version.
    pub major: u8,

    /// Minor version.
    pub minor: u8,

    /// Patch version.
    pub patch: u8,
}

impl DeviceVersion {
    /// Creates a new version.
    #[must_use]
    pub const fn new(major: u8, minor: u8, patch: u8) -> Self {
        Self {
            major,
            minor,
            patch,
        }
    }

    /// Parses a version from the first 3 bytes of a configuration payload.
    ///
    /// # Errors
    ///
    /// Returns [`Error::MalformedResponse`] if fewer than 3 bytes are given.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        match bytes {
            [major, minor, patch, ..] => Ok(Self::new(*major, *minor, *patch)),
            _ => Err(Error::MalformedResponse(format!(
                "configuration of {} bytes has no version",
                bytes.len()
            ))),
        }
    }
}

impl fmt::Display for DeviceVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.major, self.minor, self.patch)
    }
}

/// Wire format of the optional-field block.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EncodingStrategy {
    /// Single chain-id metadata byte, address carried in the prefix.
    Legacy,

    /// Bitmask followed by the present fields.
    Versioned,
}

impl EncodingStrategy {
    /// First firmware version that understands the bitmask block.
    pub const VERSIONED_SINCE: DeviceVersion = DeviceVersion::new(1, 1, 0);

    /// Selects the strategy for a device version.
    #[must_use]
    pub fn for_version(version: DeviceVersion) -> Self {
        if version < Self::VERSIONED_SINCE {
            Self::Legacy
        } else {
            Self::Versioned
        }
    }
}

/// Original and current wallet type ids.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct WalletIds {
    /// Wallet type the key was originally derived for.
    pub original: u8,

    /// Wallet type of the account being signed for.
    pub current: u8,
}

/// Display and routing context of a transaction to sign.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SigningContext {
    /// Decimals of the transferred asset.
    pub decimals: u8,

    /// Asset name; normalized before display.
    pub asset: String,

    /// Destination workchain.
    #[serde(default)]
    pub workchain_id: Option<i8>,

    /// Destination address, hex encoded.
    #[serde(default)]
    pub address: Option<String>,

    /// Network signature id.
    #[serde(default)]
    pub chain_id: Option<i32>,

    /// Wallet type ids.
    #[serde(default)]
    pub wallet: Option<WalletIds>,
}

/// Normalizes an asset name to the ticker shown on the device.
///
/// Liquidity-pool tokens become `"LP"`. Names longer than 8 characters keep
/// their first 6 characters followed by `".."`.
#[must_use]
pub fn normalize_ticker(asset: &str) -> String {
    if asset.contains(LP_MARKER) {
        return LP_TICKER.to_string();
    }

    if asset.chars().count() > MAX_TICKER_CHARS {
        let mut ticker: String = asset.chars().take(TRUNCATED_TICKER_CHARS).collect();
        ticker.push_str(ELLIPSIS);
        ticker
    } else {
        asset.to_string()
    }
}

/// Parses a destination address into its 32 raw bytes.
///
/// Whitespace, `-` and `_` separators, a `0x` prefix, and a `<workchain>:`
/// prefix are ignored.
///
/// # Errors
///
/// Returns [`Error::InvalidAddressFormat`] unless exactly 64 hex characters
/// remain.
pub fn parse_address(address: &str) -> Result<[u8; ADDRESS_LEN]> {
    let raw = address.rsplit(':').next().unwrap_or(address).trim();
    let raw = raw.strip_prefix("0x").unwrap_or(raw);
    let cleaned: String = raw
        .chars()
        .filter(|c| !c.is_whitespace() && *c != '-' && *c != '_')
        .collect();

    if cleaned.len() != ADDRESS_LEN * 2 {
        return Err(Error::InvalidAddressFormat(format!(
            "expected {} hex characters, got {}",
            ADDRESS_LEN * 2,
            cleaned.len()
        )));
    }

    let mut bytes = [0u8; ADDRESS_LEN];
    hex::decode_to_slice(&cleaned, &mut bytes)
        .map_err(|e| Error::InvalidAddressFormat(e.to_string()))?;
    Ok(bytes)
}

/// Encodes the optional-field block for `strategy`.
///
/// The legacy block only carries the chain id; the address is part of the
/// legacy prefix (see [`encode_sign_transaction`]).
///
/// # Errors
///
/// Returns [`Error::InvalidAddressFormat`] if the context address is invalid.
pub fn encode_optional_fields(ctx: &SigningContext, strategy: EncodingStrategy) -> Result<Vec<u8>> {
    match strategy {
        EncodingStrategy::Legacy => Ok(match ctx.chain_id {
            Some(chain_id) => {
                let mut block = vec![flag::CHAIN_ID];
                block.extend_from_slice(&chain_id.to_be_bytes());
                block
            }
            None => vec![0x00],
        }),
        EncodingStrategy::Versioned => {
            let address = ctx.address.as_deref().map(parse_address).transpose()?;

            let mut mask = 0u8;
            let mut fields = Vec::with_capacity(1 + 1 + ADDRESS_LEN + 4);

            if let Some(wallet) = ctx.wallet {
                mask |= flag::WALLET_ID;
                fields.push(wallet.current);
            }
            if let Some(workchain_id) = ctx.workchain_id {
                mask |= flag::WORKCHAIN_ID;
                fields.extend_from_slice(&workchain_id.to_be_bytes());
            }
            if let Some(address) = address {
                mask |= flag::ADDRESS;
                fields.extend_from_slice(&address);
            }
            if let Some(chain_id) = ctx.chain_id {
                mask |= flag::CHAIN_ID;
                fields.extend_from_slice(&chain_id.to_be_bytes());
            }

            let mut block = Vec::with_capacity(1 + fields.len());
            block.push(mask);
            block.extend_from_slice(&fields);
            Ok(block)
        }
    }
}

/// Leading bytes of a serialized transaction that the device does not take.
pub const MESSAGE_HEADER_LEN: usize = 4;

/// Builds the complete sign-transaction payload, before chunking.
///
/// The first [`MESSAGE_HEADER_LEN`] bytes of `message` are not sent.
///
/// # Errors
///
/// Returns [`Error::InvalidAddressFormat`] if the context address is invalid,
/// and [`Error::InvalidRequest`] if the normalized ticker does not fit its
/// length byte or `message` is shorter than its header.
pub fn encode_sign_transaction(
    account: u32,
    ctx: &SigningContext,
    message: &[u8],
    strategy: EncodingStrategy,
) -> Result<Vec<u8>> {
    let body = message.get(MESSAGE_HEADER_LEN..).ok_or_else(|| {
        Error::InvalidRequest(format!(
            "transaction message of {} bytes has no {MESSAGE_HEADER_LEN}-byte header",
            message.len()
        ))
    })?;
    let ticker = normalize_ticker(&ctx.asset);
    let ticker_len = u8::try_from(ticker.len())
        .map_err(|_| Error::InvalidRequest("ticker too long".to_string()))?;
    let wallet = ctx.wallet.unwrap_or(WalletIds {
        original: 0,
        current: 0,
    });

    let mut data = Vec::with_capacity(64 + message.len());
    data.extend_from_slice(&encode_account_index(account));

    match strategy {
        EncodingStrategy::Legacy => {
            data.push(wallet.original);
            data.push(wallet.current);
        }
        EncodingStrategy::Versioned => data.push(wallet.original),
    }

    data.push(ctx.decimals);
    data.push(ticker_len);
    data.extend_from_slice(ticker.as_bytes());

    if strategy == EncodingStrategy::Legacy {
        match ctx.address.as_deref().map(parse_address).transpose()? {
            Some(address) => {
                data.push(0x01);
                data.extend_from_slice(&address);
            }
            None => data.push(0x00),
        }
    }

    data.extend_from_slice(&encode_optional_fields(ctx, strategy)?);
    data.extend_from_slice(body);
    Ok(data)
}
