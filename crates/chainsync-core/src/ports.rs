use alloy::primitives::{Address, U256};
use serde_json::Value;
use thiserror::Error;
use tokio::sync::mpsc::UnboundedSender;

use crate::domain::{ProviderEvent, ProviderEventKind};

#[derive(Debug, Error)]
pub enum PortError {
    #[error("port not implemented: {0}")]
    NotImplemented(&'static str),
    #[error("transport error: {0}")]
    Transport(String),
    #[error("validation error: {0}")]
    Validation(String),
    #[error("policy error: {0}")]
    Policy(String),
    #[error("not found: {0}")]
    NotFound(String),
    #[error("provider error {code}: {message}")]
    Rpc { code: i64, message: String },
}

impl PortError {
    /// Provider error code, when the failure came from the wallet itself.
    pub fn code(&self) -> Option<i64> {
        match self {
            Self::Rpc { code, .. } => Some(*code),
            _ => None,
        }
    }

    /// The named EIP-1193 code; `None` for transport failures and
    /// codes outside the standard set.
    pub fn provider_code(&self) -> Option<ProviderErrorCode> {
        self.code().and_then(ProviderErrorCode::from_code)
    }

    pub fn is_unrecognized_chain(&self) -> bool {
        self.provider_code() == Some(ProviderErrorCode::UnrecognizedChain)
    }
}

/// EIP-1193 provider error codes, plus 4902 from EIP-3326.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProviderErrorCode {
    UserRejected,
    Unauthorized,
    UnsupportedMethod,
    Disconnected,
    ChainDisconnected,
    UnrecognizedChain,
}

impl ProviderErrorCode {
    pub fn code(self) -> i64 {
        match self {
            Self::UserRejected => 4001,
            Self::Unauthorized => 4100,
            Self::UnsupportedMethod => 4200,
            Self::Disconnected => 4900,
            Self::ChainDisconnected => 4901,
            Self::UnrecognizedChain => 4902,
        }
    }

    pub fn from_code(code: i64) -> Option<Self> {
        match code {
            4001 => Some(Self::UserRejected),
            4100 => Some(Self::Unauthorized),
            4200 => Some(Self::UnsupportedMethod),
            4900 => Some(Self::Disconnected),
            4901 => Some(Self::ChainDisconnected),
            4902 => Some(Self::UnrecognizedChain),
            _ => None,
        }
    }

    pub fn into_error(self, message: impl Into<String>) -> PortError {
        PortError::Rpc {
            code: self.code(),
            message: message.into(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SubscriptionId(pub u64);

/// An injected EIP-1193 wallet provider.
///
/// Futures returned by `request` are not required to be `Send`: browser
/// providers resolve JS promises on the main thread.
#[allow(async_fn_in_trait)]
pub trait ProviderPort {
    async fn request(&self, method: &str, params: Value) -> Result<Value, PortError>;

    /// Registers `sink` for events of `kind`; events are delivered until
    /// `unsubscribe` is called with the returned id.
    fn subscribe(
        &self,
        kind: ProviderEventKind,
        sink: UnboundedSender<ProviderEvent>,
    ) -> Result<SubscriptionId, PortError>;

    fn unsubscribe(&self, id: SubscriptionId);
}

/// Account and balance query layer sitting next to the provider.
pub trait AccountPort {
    /// Connected account as seen by the account layer.
    fn active_account(&self) -> Option<Address>;

    /// Balance already fetched by the account layer, in the smallest unit.
    fn known_balance(&self, address: Address) -> Option<U256>;

    /// Applies an `accountsChanged` payload; an empty list means disconnected.
    fn observe_accounts(&self, accounts: &[Address]);
}
