pub mod balance;
pub mod domain;
pub mod ports;
pub mod registry;
pub mod rpc;
pub mod selector;
pub mod state_machine;
pub mod subscription;
pub mod synchronizer;

pub use balance::{format_ether, format_units, BalanceError};
pub use domain::{
    AddChainParams, ChainDescriptor, NativeCurrency, ProviderEvent, ProviderEventKind,
    SignerHandle, SwitchChainParams, SyncSignal, WalletSnapshot, NATIVE_CURRENCY_DECIMALS,
};
pub use ports::{AccountPort, PortError, ProviderErrorCode, ProviderPort, SubscriptionId};
pub use registry::{supported_chains, ChainRegistry};
pub use selector::{
    ChainSelector, LayoutMode, PointerTarget, SelectionUiState, SelectorEntry, SelectorView,
    SkipReason, SwitchOutcome, DEFAULT_COMPACT_BREAKPOINT,
};
pub use state_machine::{switch_transition, StateTransition, SwitchAction, SwitchState};
pub use subscription::Subscription;
pub use synchronizer::{SnapshotReader, WalletSynchronizer};
