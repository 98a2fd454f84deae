use alloy::primitives::Address;
use serde::{Deserialize, Serialize};

/// Decimals used for every native currency in the registry.
pub const NATIVE_CURRENCY_DECIMALS: u8 = 18;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChainDescriptor {
    pub id: u64,
    pub hex_id: String,
    pub name: String,
    pub network: String,
    pub icon: String,
    pub symbol: String,
    pub rpc_url: String,
    pub block_explorer_url: String,
    pub testnet: bool,
}

impl ChainDescriptor {
    /// Numeric value of `hex_id`, if it parses.
    pub fn parsed_hex_id(&self) -> Option<u64> {
        let digits = self
            .hex_id
            .strip_prefix("0x")
            .or_else(|| self.hex_id.strip_prefix("0X"))?;
        u64::from_str_radix(digits, 16).ok()
    }

    /// EIP-3085 `wallet_addEthereumChain` parameters for this chain.
    pub fn add_chain_params(&self) -> AddChainParams {
        AddChainParams {
            chain_id: self.hex_id.clone(),
            chain_name: self.name.clone(),
            native_currency: NativeCurrency {
                name: self.symbol.clone(),
                symbol: self.symbol.clone(),
                decimals: NATIVE_CURRENCY_DECIMALS,
            },
            rpc_urls: vec![self.rpc_url.clone()],
            block_explorer_urls: vec![self.block_explorer_url.clone()],
        }
    }

    pub fn switch_chain_params(&self) -> SwitchChainParams {
        SwitchChainParams {
            chain_id: self.hex_id.clone(),
        }
    }

    pub fn explorer_address_url(&self, address: &Address) -> String {
        format!(
            "{}/address/{address}",
            self.block_explorer_url.trim_end_matches('/')
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SwitchChainParams {
    pub chain_id: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddChainParams {
    pub chain_id: String,
    pub chain_name: String,
    pub native_currency: NativeCurrency,
    pub rpc_urls: Vec<String>,
    pub block_explorer_urls: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NativeCurrency {
    pub name: String,
    pub symbol: String,
    pub decimals: u8,
}

/// Opaque signing capability for the connected account.
///
/// Holds no key material: signing stays inside the external wallet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignerHandle {
    address: Address,
}

impl SignerHandle {
    pub fn new(address: Address) -> Self {
        Self { address }
    }

    pub fn address(&self) -> Address {
        self.address
    }
}

/// Best-known view of the wallet connection.
///
/// Replaced wholesale on every update; `connected` is true iff `address` is set.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WalletSnapshot {
    pub address: Option<Address>,
    pub balance: Option<String>,
    pub signer: Option<SignerHandle>,
    pub connected: bool,
}

impl WalletSnapshot {
    pub fn disconnected() -> Self {
        Self::default()
    }

    pub fn connected(address: Address, balance: String) -> Self {
        Self {
            address: Some(address),
            balance: Some(balance),
            signer: Some(SignerHandle::new(address)),
            connected: true,
        }
    }

    pub fn with_balance(&self, balance: String) -> Self {
        Self {
            balance: Some(balance),
            ..self.clone()
        }
    }

    /// `0x1234…abcd` form for compact display.
    pub fn short_address(&self) -> Option<String> {
        self.address.map(|a| {
            let full = a.to_string();
            format!("{}…{}", &full[..6], &full[full.len() - 4..])
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ProviderEventKind {
    AccountsChanged,
    ChainChanged,
}

impl ProviderEventKind {
    /// Event name used by EIP-1193 `on` / `removeListener`.
    pub fn event_name(self) -> &'static str {
        match self {
            Self::AccountsChanged => "accountsChanged",
            Self::ChainChanged => "chainChanged",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ProviderEvent {
    AccountsChanged { sequence: u64, accounts: Vec<Address> },
    ChainChanged { sequence: u64, chain_id: u64 },
}

impl ProviderEvent {
    pub fn kind(&self) -> ProviderEventKind {
        match self {
            Self::AccountsChanged { .. } => ProviderEventKind::AccountsChanged,
            Self::ChainChanged { .. } => ProviderEventKind::ChainChanged,
        }
    }

    pub fn sequence(&self) -> u64 {
        match self {
            Self::AccountsChanged { sequence, .. } | Self::ChainChanged { sequence, .. } => {
                *sequence
            }
        }
    }
}

/// What the shell must do after the synchronizer processed provider events.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncSignal {
    Continue,
    /// The active chain changed; discard the session and mount a fresh one.
    ReloadRequired { chain_id: u64 },
}
