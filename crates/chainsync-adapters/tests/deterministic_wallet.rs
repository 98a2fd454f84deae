mod common;

use std::sync::Arc;

use alloy::primitives::U256;
use tokio::sync::mpsc;

use chainsync_adapters::{ChainSyncConfig, Eip1193Adapter, RuntimeProfile};
use chainsync_core::rpc;
use chainsync_core::{
    supported_chains, AccountPort, PortError, ProviderEventKind, ProviderPort, Subscription,
    SwitchOutcome, SyncSignal,
};

use common::{deterministic_account, other_account, session};

#[tokio::test]
async fn connect_after_mount_is_picked_up_through_accounts_changed() {
    let s = session(Eip1193Adapter::deterministic());
    assert!(!s.sync.mount().await.connected);

    let active = s
        .accounts
        .connect(s.provider.as_ref())
        .await
        .expect("connect");
    assert_eq!(active, Some(deterministic_account()));

    assert_eq!(s.sync.process_events().await, SyncSignal::Continue);
    let snapshot = s.sync.current_snapshot();
    assert!(snapshot.connected);
    assert_eq!(snapshot.address, Some(deterministic_account()));
    assert_eq!(snapshot.balance.as_deref(), Some("1.5"));
}

#[tokio::test]
async fn eth_accounts_is_empty_until_authorized() {
    let adapter = Eip1193Adapter::deterministic();
    assert!(rpc::accounts(&adapter).await.expect("accounts").is_empty());
    rpc::request_accounts(&adapter).await.expect("request");
    assert_eq!(
        rpc::accounts(&adapter).await.expect("accounts"),
        vec![deterministic_account()]
    );
}

#[tokio::test]
async fn selecting_an_unknown_chain_adds_it_and_requires_reload() {
    let s = session(Eip1193Adapter::deterministic());
    s.accounts
        .connect(s.provider.as_ref())
        .await
        .expect("connect");
    s.sync.mount().await;
    s.selector.mount(1280.0);
    let flow = &supported_chains()[3];

    let outcome = s.selector.select_chain(flow).await;

    assert_eq!(outcome, SwitchOutcome::Added);
    assert_eq!(rpc::chain_id(s.provider.as_ref()).await.expect("chain"), 545);
    assert_eq!(
        s.sync.process_events().await,
        SyncSignal::ReloadRequired { chain_id: 545 }
    );
}

#[tokio::test]
async fn added_chain_can_be_switched_to_directly() {
    let s = session(Eip1193Adapter::deterministic());
    s.accounts
        .connect(s.provider.as_ref())
        .await
        .expect("connect");
    s.sync.mount().await;
    let chains = supported_chains();

    assert_eq!(s.selector.select_chain(&chains[4]).await, SwitchOutcome::Added);
    assert_eq!(s.selector.select_chain(&chains[5]).await, SwitchOutcome::Added);
    assert_eq!(
        s.selector.select_chain(&chains[4]).await,
        SwitchOutcome::Switched
    );
    assert_eq!(rpc::chain_id(s.provider.as_ref()).await.expect("chain"), 41);
}

#[tokio::test]
async fn rejected_prompt_leaves_chain_unchanged() {
    let s = session(Eip1193Adapter::deterministic());
    s.accounts
        .connect(s.provider.as_ref())
        .await
        .expect("connect");
    s.sync.mount().await;
    s.provider
        .debug_reject_next(rpc::WALLET_ADD_CHAIN, 4001)
        .expect("script rejection");

    let outcome = s.selector.select_chain(&supported_chains()[0]).await;

    assert_eq!(outcome, SwitchOutcome::AddFailed { code: Some(4001) });
    assert_eq!(rpc::chain_id(s.provider.as_ref()).await.expect("chain"), 1);
    assert_eq!(s.sync.process_events().await, SyncSignal::Continue);
}

#[tokio::test]
async fn injected_events_reach_the_synchronizer_in_order() {
    let s = session(Eip1193Adapter::deterministic());
    s.accounts
        .connect(s.provider.as_ref())
        .await
        .expect("connect");
    s.sync.mount().await;
    s.provider
        .debug_set_balance(other_account(), U256::from(250_000_000_000_000_000u128))
        .expect("balance");

    s.provider
        .debug_inject_accounts_changed(vec![other_account()])
        .expect("inject accounts");
    s.provider
        .debug_inject_chain_changed(8453)
        .expect("inject chain");

    let events = s.sync.drain_events();
    assert_eq!(events.len(), 2);
    assert_eq!(events[0].sequence() + 1, events[1].sequence());
    assert_eq!(events[0].kind(), ProviderEventKind::AccountsChanged);
    assert_eq!(events[1].kind(), ProviderEventKind::ChainChanged);

    assert_eq!(
        s.sync.handle_event(events[0].clone()).await,
        SyncSignal::Continue
    );
    let snapshot = s.sync.current_snapshot();
    assert_eq!(snapshot.address, Some(other_account()));
    assert_eq!(snapshot.balance.as_deref(), Some("0.25"));
    assert_eq!(s.accounts.active_account(), Some(other_account()));
}

#[tokio::test]
async fn unmount_removes_provider_listeners() {
    let s = session(Eip1193Adapter::deterministic());
    s.sync.mount().await;
    s.sync.unmount();

    s.provider
        .debug_inject_chain_changed(41)
        .expect("inject chain");
    assert!(s.sync.drain_events().is_empty());

    s.sync.mount().await;
    s.provider
        .debug_inject_chain_changed(545)
        .expect("inject chain");
    let events = s.sync.drain_events();
    assert_eq!(events.len(), 1);
    assert_eq!(
        s.sync.handle_event(events[0].clone()).await,
        SyncSignal::ReloadRequired { chain_id: 545 }
    );
}

#[tokio::test]
async fn dropped_receiver_does_not_break_other_listeners() {
    let provider = Arc::new(Eip1193Adapter::deterministic());
    let (tx, rx) = mpsc::unbounded_channel();
    provider
        .subscribe(ProviderEventKind::ChainChanged, tx)
        .expect("subscribe");
    drop(rx);
    let mut live =
        Subscription::acquire(&provider, ProviderEventKind::ChainChanged).expect("subscribe");

    provider.debug_inject_chain_changed(41).expect("inject");

    assert_eq!(live.drain().len(), 1);
}

#[tokio::test]
async fn unsupported_method_maps_to_4200() {
    let adapter = Eip1193Adapter::deterministic();
    let err = adapter
        .request("eth_sign", serde_json::json!([]))
        .await
        .expect_err("unsupported");
    assert_eq!(err.code(), Some(4200));
}

#[tokio::test]
async fn production_profile_requires_eip1193_runtime() {
    let cfg = ChainSyncConfig {
        runtime_profile: RuntimeProfile::Production,
        eip1193_proxy_url: None,
        ..ChainSyncConfig::default()
    };
    let adapter = Arc::new(Eip1193Adapter::with_config(cfg));
    assert!(!adapter.is_available());
    assert_eq!(adapter.mode_label(), "disabled");
    assert!(adapter.disabled_reason().is_some());

    let err = rpc::request_accounts(adapter.as_ref())
        .await
        .expect_err("runtime should be required");
    assert!(matches!(err, PortError::Policy(_)));
    let err = Subscription::acquire(&adapter, ProviderEventKind::AccountsChanged)
        .expect_err("subscribe should be refused");
    assert!(matches!(err, PortError::Policy(_)));
}

#[tokio::test]
async fn development_profile_falls_back_to_deterministic_wallet() {
    let adapter = Eip1193Adapter::with_config(ChainSyncConfig::default());
    assert!(adapter.is_available());
    assert_eq!(adapter.mode_label(), "deterministic");
    assert_eq!(rpc::chain_id(&adapter).await.expect("chain"), 1);
}
