pub mod account;
pub mod config;
pub mod eip1193;

pub use account::AccountAdapter;
pub use config::{ChainSyncConfig, RuntimeProfile};
pub use eip1193::Eip1193Adapter;
