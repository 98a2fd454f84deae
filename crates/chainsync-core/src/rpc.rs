//! Typed wrappers over the raw EIP-1193 `request` surface.

use alloy::primitives::{Address, U256};
use serde_json::Value;

use crate::domain::{AddChainParams, SwitchChainParams};
use crate::ports::{PortError, ProviderPort};

pub const ETH_CHAIN_ID: &str = "eth_chainId";
pub const ETH_ACCOUNTS: &str = "eth_accounts";
pub const ETH_REQUEST_ACCOUNTS: &str = "eth_requestAccounts";
pub const ETH_GET_BALANCE: &str = "eth_getBalance";
pub const WALLET_SWITCH_CHAIN: &str = "wallet_switchEthereumChain";
pub const WALLET_ADD_CHAIN: &str = "wallet_addEthereumChain";

pub async fn chain_id<P: ProviderPort>(provider: &P) -> Result<u64, PortError> {
    let result = provider.request(ETH_CHAIN_ID, serde_json::json!([])).await?;
    json_chain_id_to_u64(&result)
}

pub async fn accounts<P: ProviderPort>(provider: &P) -> Result<Vec<Address>, PortError> {
    let result = provider.request(ETH_ACCOUNTS, serde_json::json!([])).await?;
    parse_accounts(ETH_ACCOUNTS, &result)
}

pub async fn request_accounts<P: ProviderPort>(provider: &P) -> Result<Vec<Address>, PortError> {
    let result = provider
        .request(ETH_REQUEST_ACCOUNTS, serde_json::json!([]))
        .await?;
    parse_accounts(ETH_REQUEST_ACCOUNTS, &result)
}

pub async fn balance<P: ProviderPort>(provider: &P, address: Address) -> Result<U256, PortError> {
    let result = provider
        .request(
            ETH_GET_BALANCE,
            serde_json::json!([address.to_string(), "latest"]),
        )
        .await?;
    let raw = result
        .as_str()
        .ok_or_else(|| PortError::Transport("eth_getBalance must return hex string".to_owned()))?;
    parse_quantity(raw)
}

pub async fn switch_chain<P: ProviderPort>(
    provider: &P,
    params: &SwitchChainParams,
) -> Result<(), PortError> {
    let params = serde_json::to_value([params])
        .map_err(|e| PortError::Validation(format!("switch params encode failed: {e}")))?;
    provider.request(WALLET_SWITCH_CHAIN, params).await?;
    Ok(())
}

pub async fn add_chain<P: ProviderPort>(
    provider: &P,
    params: &AddChainParams,
) -> Result<(), PortError> {
    let params = serde_json::to_value([params])
        .map_err(|e| PortError::Validation(format!("add chain params encode failed: {e}")))?;
    provider.request(WALLET_ADD_CHAIN, params).await?;
    Ok(())
}

pub fn parse_accounts(method: &str, value: &Value) -> Result<Vec<Address>, PortError> {
    let arr = value
        .as_array()
        .ok_or_else(|| PortError::Transport(format!("{method}: array expected")))?;
    let mut accounts = Vec::with_capacity(arr.len());
    for item in arr {
        let raw = item
            .as_str()
            .ok_or_else(|| PortError::Transport(format!("{method}: string expected")))?;
        let parsed: Address = raw
            .parse()
            .map_err(|e| PortError::Validation(format!("invalid account address: {e}")))?;
        accounts.push(parsed);
    }
    Ok(accounts)
}

pub fn json_chain_id_to_u64(value: &Value) -> Result<u64, PortError> {
    if let Some(n) = value.as_u64() {
        return Ok(n);
    }
    let s = value
        .as_str()
        .ok_or_else(|| PortError::Validation("chain id must be string or number".to_owned()))?;
    parse_chain_id_str(s)
}

pub fn parse_chain_id_str(raw: &str) -> Result<u64, PortError> {
    if let Some(digits) = raw.strip_prefix("0x").or_else(|| raw.strip_prefix("0X")) {
        u64::from_str_radix(digits, 16)
            .map_err(|e| PortError::Validation(format!("invalid hex chain id: {e}")))
    } else {
        raw.parse()
            .map_err(|e| PortError::Validation(format!("invalid chain id: {e}")))
    }
}

pub fn to_hex_chain_id(chain_id: u64) -> String {
    format!("0x{chain_id:x}")
}

fn parse_quantity(raw: &str) -> Result<U256, PortError> {
    let digits = raw
        .strip_prefix("0x")
        .or_else(|| raw.strip_prefix("0X"))
        .ok_or_else(|| PortError::Validation(format!("quantity must be 0x-prefixed: {raw}")))?;
    U256::from_str_radix(digits, 16)
        .map_err(|e| PortError::Validation(format!("invalid quantity {raw}: {e}")))
}

pub fn to_quantity(value: U256) -> String {
    format!("0x{value:x}")
}
