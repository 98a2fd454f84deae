//! Supported networks, in display order.

use std::collections::HashSet;
use std::sync::LazyLock;

use crate::domain::ChainDescriptor;
use crate::ports::PortError;

static BUILTIN: LazyLock<ChainRegistry> = LazyLock::new(|| ChainRegistry {
    chains: vec![
        chain(
            47763,
            "0xBA93",
            "NeoX Mainnet",
            "neoxmainnet",
            "/chains/neox.png",
            "GAS",
            "https://mainnet-1.rpc.banelabs.org/",
            "https://xexplorer.neo.org/",
            false,
        ),
        chain(
            12227332,
            "0xBA9304",
            "NeoX Testnet",
            "neoxtestnet",
            "/chains/neox.png",
            "GAS",
            "https://neoxt4seed1.ngd.network/",
            "https://xt4scan.ngd.network/",
            true,
        ),
        chain(
            656476,
            "0xA045C",
            "EduChain Testnet",
            "educhaintestnet",
            "/chains/educhain.png",
            "EDU",
            "https://open-campus-codex-sepolia.drpc.org/",
            "https://opencampus-codex.blockscout.com/",
            true,
        ),
        chain(
            545,
            "0x221",
            "Flow Testnet",
            "flowtestnet",
            "/chains/flow.png",
            "FLOW",
            "https://testnet.evm.nodes.onflow.org",
            "https://evm-testnet.flowscan.io",
            true,
        ),
        chain(
            41,
            "0x29",
            "Telos Testnet",
            "telostestnet",
            "/chains/telos.png",
            "TLOS",
            "https://testnet.telos.net/evm",
            "https://testnet.teloscan.io/",
            true,
        ),
        chain(
            28122024,
            "0x1AD1BA8",
            "Ancient8 Testnet",
            "ancient8testnet",
            "/chains/ancient8.png",
            "ETH",
            "https://rpcv2-testnet.ancient8.gg/",
            "https://ancient8.testnet.routescan.io/",
            true,
        ),
    ],
});

#[allow(clippy::too_many_arguments)]
fn chain(
    id: u64,
    hex_id: &str,
    name: &str,
    network: &str,
    icon: &str,
    symbol: &str,
    rpc_url: &str,
    block_explorer_url: &str,
    testnet: bool,
) -> ChainDescriptor {
    ChainDescriptor {
        id,
        hex_id: hex_id.to_owned(),
        name: name.to_owned(),
        network: network.to_owned(),
        icon: icon.to_owned(),
        symbol: symbol.to_owned(),
        rpc_url: rpc_url.to_owned(),
        block_explorer_url: block_explorer_url.to_owned(),
        testnet,
    }
}

/// The built-in network list.
pub fn supported_chains() -> &'static [ChainDescriptor] {
    BUILTIN.chains()
}

/// Ordered, non-empty set of networks with unique ids.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChainRegistry {
    chains: Vec<ChainDescriptor>,
}

impl ChainRegistry {
    pub fn new(chains: Vec<ChainDescriptor>) -> Result<Self, PortError> {
        if chains.is_empty() {
            return Err(PortError::Validation(
                "chain registry must not be empty".to_owned(),
            ));
        }
        let mut seen = HashSet::with_capacity(chains.len());
        for chain in &chains {
            if !seen.insert(chain.id) {
                return Err(PortError::Validation(format!(
                    "duplicate chain id {}",
                    chain.id
                )));
            }
            if chain.parsed_hex_id() != Some(chain.id) {
                return Err(PortError::Validation(format!(
                    "hex id {} does not denote chain {}",
                    chain.hex_id, chain.id
                )));
            }
        }
        Ok(Self { chains })
    }

    pub fn builtin() -> Self {
        BUILTIN.clone()
    }

    pub fn chains(&self) -> &[ChainDescriptor] {
        &self.chains
    }

    pub fn iter(&self) -> impl Iterator<Item = &ChainDescriptor> {
        self.chains.iter()
    }

    pub fn len(&self) -> usize {
        self.chains.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chains.is_empty()
    }

    pub fn first(&self) -> &ChainDescriptor {
        // non-empty by construction
        &self.chains[0]
    }

    pub fn find(&self, id: u64) -> Option<&ChainDescriptor> {
        self.chains.iter().find(|c| c.id == id)
    }

    pub fn find_by_hex(&self, hex_id: &str) -> Option<&ChainDescriptor> {
        self.chains
            .iter()
            .find(|c| c.hex_id.eq_ignore_ascii_case(hex_id))
    }

    /// Entry for `active`, or the first entry when it is unknown or unset.
    ///
    /// The fallback can show a network the wallet is not actually on.
    pub fn display_chain(&self, active: Option<u64>) -> &ChainDescriptor {
        active
            .and_then(|id| self.find(id))
            .unwrap_or_else(|| self.first())
    }
}

impl Default for ChainRegistry {
    fn default() -> Self {
        Self::builtin()
    }
}
