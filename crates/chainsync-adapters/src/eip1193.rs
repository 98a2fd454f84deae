use std::collections::{BTreeSet, HashMap, VecDeque};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use alloy::primitives::{address, Address, U256};
use serde_json::Value;
use tokio::sync::mpsc::UnboundedSender;

use chainsync_core::rpc;
use chainsync_core::{
    AddChainParams, PortError, ProviderErrorCode, ProviderEvent, ProviderEventKind, ProviderPort,
    SubscriptionId,
};

use crate::ChainSyncConfig;

const DETERMINISTIC_ACCOUNT: Address = address!("1000000000000000000000000000000000000001");
const DETERMINISTIC_BALANCE_WEI: u128 = 1_500_000_000_000_000_000;

/// EIP-1193 provider backed by the browser wallet, a JSON-RPC proxy, or an
/// in-memory wallet, depending on runtime and config.
#[derive(Debug, Clone)]
pub struct Eip1193Adapter {
    mode: ProviderMode,
    state: Arc<Mutex<ProviderState>>,
}

#[derive(Debug, Clone)]
enum ProviderMode {
    Disabled(String),
    Deterministic,
    #[cfg(not(target_arch = "wasm32"))]
    Proxy(ProxyRuntime),
    #[cfg(target_arch = "wasm32")]
    Browser,
}

#[derive(Debug, Clone)]
#[cfg(not(target_arch = "wasm32"))]
struct ProxyRuntime {
    base_url: String,
    client: reqwest::Client,
}

#[derive(Debug)]
struct Listener {
    kind: ProviderEventKind,
    sink: UnboundedSender<ProviderEvent>,
}

#[derive(Debug)]
struct ProviderState {
    wallet_accounts: Vec<Address>,
    exposed: bool,
    chain_id: u64,
    known_chains: BTreeSet<u64>,
    balances: HashMap<Address, U256>,
    rejections: HashMap<String, VecDeque<i64>>,
    event_seq: u64,
    next_subscription: u64,
    next_rpc_id: u64,
    listeners: HashMap<SubscriptionId, Listener>,
    observed_accounts: Option<Vec<Address>>,
    observed_chain: Option<u64>,
}

impl Default for ProviderState {
    fn default() -> Self {
        Self {
            wallet_accounts: vec![DETERMINISTIC_ACCOUNT],
            exposed: false,
            chain_id: 1,
            known_chains: BTreeSet::from([1]),
            balances: HashMap::from([(
                DETERMINISTIC_ACCOUNT,
                U256::from(DETERMINISTIC_BALANCE_WEI),
            )]),
            rejections: HashMap::new(),
            event_seq: 0,
            next_subscription: 0,
            next_rpc_id: 0,
            listeners: HashMap::new(),
            observed_accounts: None,
            observed_chain: None,
        }
    }
}

impl ProviderState {
    fn exposed_accounts(&self) -> &[Address] {
        if self.exposed {
            &self.wallet_accounts
        } else {
            &[]
        }
    }

    fn switch_to(&mut self, chain_id: u64) {
        if self.chain_id == chain_id {
            return;
        }
        self.chain_id = chain_id;
        emit(self, |sequence| ProviderEvent::ChainChanged { sequence, chain_id });
    }
}

/// Stamps the next sequence number and fans the event out to listeners of
/// its kind. Listeners whose receiver is gone are dropped.
fn emit(state: &mut ProviderState, event_for: impl FnOnce(u64) -> ProviderEvent) {
    state.event_seq = state.event_seq.saturating_add(1);
    let event = event_for(state.event_seq);
    let kind = event.kind();
    state.listeners.retain(|id, listener| {
        if listener.kind != kind {
            return true;
        }
        let delivered = listener.sink.send(event.clone()).is_ok();
        if !delivered {
            tracing::debug!(id = id.0, event = kind.event_name(), "dropping closed listener");
        }
        delivered
    });
}

impl Default for Eip1193Adapter {
    fn default() -> Self {
        Self::with_config(ChainSyncConfig::from_env())
    }
}

impl Eip1193Adapter {
    pub fn with_config(config: ChainSyncConfig) -> Self {
        #[cfg(target_arch = "wasm32")]
        let mode = if browser::provider_available() {
            ProviderMode::Browser
        } else if config.strict_runtime_required() {
            ProviderMode::Disabled(
                "EIP-1193 browser provider not found in production runtime profile".to_owned(),
            )
        } else {
            ProviderMode::Deterministic
        };

        #[cfg(not(target_arch = "wasm32"))]
        let mode = if let Some(ref base_url) = config.eip1193_proxy_url {
            let timeout = std::time::Duration::from_millis(config.provider_timeout_ms);
            // Callers may drive requests from short-lived runtimes; pooled
            // connections would outlive them.
            match reqwest::Client::builder()
                .timeout(timeout)
                .pool_max_idle_per_host(0)
                .build()
            {
                Ok(client) => ProviderMode::Proxy(ProxyRuntime {
                    base_url: base_url.clone(),
                    client,
                }),
                Err(e) => {
                    if config.strict_runtime_required() {
                        ProviderMode::Disabled(format!(
                            "failed to initialize EIP-1193 proxy client in production profile: {e}"
                        ))
                    } else {
                        tracing::warn!(error = %e, "proxy client unavailable, using deterministic wallet");
                        ProviderMode::Deterministic
                    }
                }
            }
        } else if config.strict_runtime_required() {
            ProviderMode::Disabled(
                "EIP-1193 proxy URL not configured in production runtime profile".to_owned(),
            )
        } else {
            ProviderMode::Deterministic
        };

        Self {
            mode,
            state: Arc::new(Mutex::new(ProviderState::default())),
        }
    }

    /// In-memory wallet regardless of environment.
    pub fn deterministic() -> Self {
        Self {
            mode: ProviderMode::Deterministic,
            state: Arc::new(Mutex::new(ProviderState::default())),
        }
    }

    /// False when the adapter refuses every request.
    pub fn is_available(&self) -> bool {
        !matches!(self.mode, ProviderMode::Disabled(_))
    }

    pub fn disabled_reason(&self) -> Option<&str> {
        match &self.mode {
            ProviderMode::Disabled(reason) => Some(reason.as_str()),
            _ => None,
        }
    }

    pub fn mode_label(&self) -> &'static str {
        match self.mode {
            ProviderMode::Disabled(_) => "disabled",
            ProviderMode::Deterministic => "deterministic",
            #[cfg(not(target_arch = "wasm32"))]
            ProviderMode::Proxy(_) => "proxy",
            #[cfg(target_arch = "wasm32")]
            ProviderMode::Browser => "browser",
        }
    }

    fn check_mode(&self) -> Result<(), PortError> {
        if let ProviderMode::Disabled(reason) = &self.mode {
            return Err(PortError::Policy(reason.clone()));
        }
        Ok(())
    }

    fn lock_state(&self) -> Result<MutexGuard<'_, ProviderState>, PortError> {
        self.state
            .lock()
            .map_err(|e| PortError::Transport(format!("provider lock poisoned: {e}")))
    }

    pub fn debug_inject_accounts_changed(&self, accounts: Vec<Address>) -> Result<(), PortError> {
        let mut g = self.lock_state()?;
        g.exposed = !accounts.is_empty();
        g.wallet_accounts = accounts.clone();
        emit(&mut g, |sequence| ProviderEvent::AccountsChanged { sequence, accounts });
        Ok(())
    }

    pub fn debug_inject_chain_changed(&self, chain_id: u64) -> Result<(), PortError> {
        let mut g = self.lock_state()?;
        g.known_chains.insert(chain_id);
        g.chain_id = chain_id;
        emit(&mut g, |sequence| ProviderEvent::ChainChanged { sequence, chain_id });
        Ok(())
    }

    pub fn debug_set_balance(&self, address: Address, balance: U256) -> Result<(), PortError> {
        self.lock_state()?.balances.insert(address, balance);
        Ok(())
    }

    /// Makes the next in-memory `method` call fail with `code`, as if the
    /// user dismissed the wallet prompt.
    pub fn debug_reject_next(&self, method: &str, code: i64) -> Result<(), PortError> {
        self.lock_state()?
            .rejections
            .entry(method.to_owned())
            .or_default()
            .push_back(code);
        Ok(())
    }

    fn deterministic_request(&self, method: &str, params: &Value) -> Result<Value, PortError> {
        let mut g = self.lock_state()?;
        if let Some(code) = g.rejections.get_mut(method).and_then(VecDeque::pop_front) {
            return Err(PortError::Rpc {
                code,
                message: format!("{method} rejected"),
            });
        }
        tracing::trace!(method, "deterministic provider request");

        match method {
            rpc::ETH_CHAIN_ID => Ok(Value::String(rpc::to_hex_chain_id(g.chain_id))),
            rpc::ETH_ACCOUNTS => Ok(accounts_json(g.exposed_accounts())),
            rpc::ETH_REQUEST_ACCOUNTS => {
                if !g.exposed {
                    g.exposed = true;
                    let accounts = g.wallet_accounts.clone();
                    emit(&mut g, |sequence| ProviderEvent::AccountsChanged {
                        sequence,
                        accounts,
                    });
                }
                Ok(accounts_json(&g.wallet_accounts))
            }
            rpc::ETH_GET_BALANCE => {
                let raw = first_param(params)?.as_str().ok_or_else(|| {
                    PortError::Validation("eth_getBalance address must be a string".to_owned())
                })?;
                let address: Address = raw
                    .parse()
                    .map_err(|e| PortError::Validation(format!("invalid account address: {e}")))?;
                let balance = g.balances.get(&address).copied().unwrap_or(U256::ZERO);
                Ok(Value::String(rpc::to_quantity(balance)))
            }
            rpc::WALLET_SWITCH_CHAIN => {
                let raw = first_param(params)?
                    .get("chainId")
                    .and_then(Value::as_str)
                    .ok_or_else(|| PortError::Validation("chainId missing".to_owned()))?;
                let chain_id = rpc::parse_chain_id_str(raw)?;
                if !g.known_chains.contains(&chain_id) {
                    return Err(ProviderErrorCode::UnrecognizedChain.into_error(format!(
                        "Unrecognized chain ID \"{raw}\". Try adding the chain using wallet_addEthereumChain first."
                    )));
                }
                g.switch_to(chain_id);
                Ok(Value::Null)
            }
            rpc::WALLET_ADD_CHAIN => {
                let params: AddChainParams = serde_json::from_value(first_param(params)?.clone())
                    .map_err(|e| PortError::Validation(format!("invalid add chain params: {e}")))?;
                let chain_id = rpc::parse_chain_id_str(&params.chain_id)?;
                if params.rpc_urls.is_empty() {
                    return Err(PortError::Rpc {
                        code: -32602,
                        message: "rpcUrls must not be empty".to_owned(),
                    });
                }
                g.known_chains.insert(chain_id);
                g.switch_to(chain_id);
                Ok(Value::Null)
            }
            _ => Err(ProviderErrorCode::UnsupportedMethod
                .into_error(format!("{method} is not supported by the deterministic wallet"))),
        }
    }

    #[cfg(not(target_arch = "wasm32"))]
    async fn proxy_call(
        &self,
        proxy: &ProxyRuntime,
        method: &str,
        params: Value,
    ) -> Result<Value, PortError> {
        let id = {
            let mut g = self.lock_state()?;
            g.next_rpc_id = g.next_rpc_id.saturating_add(1);
            g.next_rpc_id
        };
        let payload = serde_json::json!({
            "jsonrpc": "2.0",
            "id": id,
            "method": method,
            "params": params,
        });
        let response = proxy
            .client
            .post(&proxy.base_url)
            .json(&payload)
            .send()
            .await
            .map_err(|e| PortError::Transport(format!("eip1193 proxy request failed: {e}")))?;
        let status = response.status();
        let body: Value = response
            .json()
            .await
            .map_err(|e| PortError::Transport(format!("eip1193 proxy json decode failed: {e}")))?;
        if let Some(err) = body.get("error") {
            let message = err
                .get("message")
                .and_then(Value::as_str)
                .unwrap_or("unknown provider error")
                .to_owned();
            return match err.get("code").and_then(Value::as_i64) {
                Some(code) => Err(PortError::Rpc { code, message }),
                None => Err(PortError::Transport(format!(
                    "eip1193 proxy returned error: {err}"
                ))),
            };
        }
        if !status.is_success() {
            return Err(PortError::Transport(format!(
                "eip1193 proxy status {status}: {body}"
            )));
        }
        body.get("result")
            .cloned()
            .ok_or_else(|| PortError::Transport("eip1193 proxy missing result".to_owned()))
    }

    /// Polls the proxy for account and chain changes and emits the matching
    /// events. The first poll only records a baseline.
    ///
    /// Returns the number of events emitted. Other modes push their events
    /// directly and always return zero.
    #[cfg(not(target_arch = "wasm32"))]
    pub async fn poll_events(&self) -> Result<usize, PortError> {
        self.check_mode()?;
        let ProviderMode::Proxy(proxy) = &self.mode else {
            return Ok(0);
        };
        let accounts = rpc::parse_accounts(
            rpc::ETH_ACCOUNTS,
            &self
                .proxy_call(proxy, rpc::ETH_ACCOUNTS, serde_json::json!([]))
                .await?,
        )?;
        let chain_id = rpc::json_chain_id_to_u64(
            &self
                .proxy_call(proxy, rpc::ETH_CHAIN_ID, serde_json::json!([]))
                .await?,
        )?;

        let mut g = self.lock_state()?;
        let mut emitted = 0;
        let accounts_changed = g
            .observed_accounts
            .as_ref()
            .is_some_and(|prev| *prev != accounts);
        let chain_changed = g.observed_chain.is_some_and(|prev| prev != chain_id);
        g.observed_accounts = Some(accounts.clone());
        g.observed_chain = Some(chain_id);
        g.chain_id = chain_id;
        if accounts_changed {
            emit(&mut g, |sequence| ProviderEvent::AccountsChanged {
                sequence,
                accounts,
            });
            emitted += 1;
        }
        if chain_changed {
            emit(&mut g, |sequence| ProviderEvent::ChainChanged { sequence, chain_id });
            emitted += 1;
        }
        Ok(emitted)
    }
}

impl ProviderPort for Eip1193Adapter {
    async fn request(&self, method: &str, params: Value) -> Result<Value, PortError> {
        match &self.mode {
            ProviderMode::Disabled(reason) => Err(PortError::Policy(reason.clone())),
            ProviderMode::Deterministic => self.deterministic_request(method, &params),
            #[cfg(not(target_arch = "wasm32"))]
            ProviderMode::Proxy(proxy) => self.proxy_call(proxy, method, params).await,
            #[cfg(target_arch = "wasm32")]
            ProviderMode::Browser => browser::request(method, params).await,
        }
    }

    fn subscribe(
        &self,
        kind: ProviderEventKind,
        sink: UnboundedSender<ProviderEvent>,
    ) -> Result<SubscriptionId, PortError> {
        self.check_mode()?;
        #[cfg(target_arch = "wasm32")]
        if matches!(self.mode, ProviderMode::Browser) {
            browser::ensure_hook(kind, &self.state)?;
        }
        let mut g = self.lock_state()?;
        g.next_subscription = g.next_subscription.saturating_add(1);
        let id = SubscriptionId(g.next_subscription);
        g.listeners.insert(id, Listener { kind, sink });
        Ok(id)
    }

    fn unsubscribe(&self, id: SubscriptionId) {
        let mut g = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        let Some(listener) = g.listeners.remove(&id) else {
            return;
        };
        let remaining = g
            .listeners
            .values()
            .filter(|l| l.kind == listener.kind)
            .count();
        drop(g);
        tracing::trace!(id = id.0, remaining, "provider listener released");

        #[cfg(target_arch = "wasm32")]
        if remaining == 0 && matches!(self.mode, ProviderMode::Browser) {
            browser::release_hook(listener.kind);
        }
    }
}

fn first_param(params: &Value) -> Result<&Value, PortError> {
    params
        .get(0)
        .ok_or_else(|| PortError::Validation("request params must be a non-empty array".to_owned()))
}

fn accounts_json(accounts: &[Address]) -> Value {
    Value::Array(
        accounts
            .iter()
            .map(|a| Value::String(a.to_string()))
            .collect(),
    )
}

#[cfg(target_arch = "wasm32")]
mod browser {
    use std::cell::RefCell;
    use std::collections::HashMap;
    use std::sync::{Arc, Mutex, PoisonError};

    use alloy::primitives::Address;
    use serde::Serialize;
    use serde_json::Value;
    use wasm_bindgen::closure::Closure;
    use wasm_bindgen::{JsCast, JsValue};

    use chainsync_core::rpc;
    use chainsync_core::{PortError, ProviderEvent, ProviderEventKind};

    use super::{emit, ProviderState};

    thread_local! {
        // One JS callback per event name; fan-out happens in `emit`.
        static HOOKS: RefCell<HashMap<ProviderEventKind, Closure<dyn FnMut(JsValue)>>> =
            RefCell::new(HashMap::new());
    }

    pub(super) fn provider_available() -> bool {
        provider().is_ok()
    }

    pub(super) async fn request(method: &str, params: Value) -> Result<Value, PortError> {
        let provider = provider()?;
        let request_fn = function(&provider, "request").ok_or(PortError::NotImplemented(
            "window.ethereum.request is unavailable",
        ))?;

        let request = serde_json::json!({
            "method": method,
            "params": params,
        });
        let request_js = request
            .serialize(&serde_wasm_bindgen::Serializer::json_compatible())
            .map_err(|e| PortError::Transport(format!("failed to encode wasm request: {e}")))?;
        let promise_js = request_fn.call1(&provider, &request_js).map_err(|e| {
            PortError::Transport(format!("provider request dispatch failed: {e:?}"))
        })?;
        let promise = promise_js.dyn_into::<js_sys::Promise>().map_err(|_| {
            PortError::Transport("provider request did not return Promise".to_owned())
        })?;
        let result_js = wasm_bindgen_futures::JsFuture::from(promise)
            .await
            .map_err(rejection_to_error)?;
        serde_wasm_bindgen::from_value(result_js)
            .map_err(|e| PortError::Transport(format!("failed to decode wasm response: {e}")))
    }

    pub(super) fn ensure_hook(
        kind: ProviderEventKind,
        state: &Arc<Mutex<ProviderState>>,
    ) -> Result<(), PortError> {
        if HOOKS.with(|hooks| hooks.borrow().contains_key(&kind)) {
            return Ok(());
        }
        let provider = provider()?;
        let on_fn = function(&provider, "on")
            .or_else(|| function(&provider, "addListener"))
            .ok_or(PortError::NotImplemented(
                "provider does not expose on/addListener",
            ))?;

        let state = Arc::clone(state);
        let callback = Closure::<dyn FnMut(JsValue)>::new(move |value: JsValue| {
            let mut g = state.lock().unwrap_or_else(PoisonError::into_inner);
            match kind {
                ProviderEventKind::AccountsChanged => {
                    let accounts = js_accounts(&value);
                    emit(&mut g, |sequence| ProviderEvent::AccountsChanged {
                        sequence,
                        accounts,
                    });
                }
                ProviderEventKind::ChainChanged => match js_chain_id(&value) {
                    Ok(chain_id) => {
                        g.chain_id = chain_id;
                        emit(&mut g, |sequence| ProviderEvent::ChainChanged {
                            sequence,
                            chain_id,
                        });
                    }
                    Err(e) => tracing::warn!(error = %e, "ignoring malformed chainChanged payload"),
                },
            }
        });

        on_fn
            .call2(
                &provider,
                &JsValue::from_str(kind.event_name()),
                callback.as_ref().unchecked_ref(),
            )
            .map_err(|e| {
                PortError::Transport(format!("register {} failed: {e:?}", kind.event_name()))
            })?;
        HOOKS.with(|hooks| hooks.borrow_mut().insert(kind, callback));
        Ok(())
    }

    pub(super) fn release_hook(kind: ProviderEventKind) {
        let Some(callback) = HOOKS.with(|hooks| hooks.borrow_mut().remove(&kind)) else {
            return;
        };
        let Ok(provider) = provider() else {
            return;
        };
        let Some(remove_fn) = function(&provider, "removeListener") else {
            tracing::warn!(event = kind.event_name(), "provider has no removeListener");
            return;
        };
        if let Err(e) = remove_fn.call2(
            &provider,
            &JsValue::from_str(kind.event_name()),
            callback.as_ref().unchecked_ref(),
        ) {
            tracing::warn!(event = kind.event_name(), error = ?e, "removeListener failed");
        }
    }

    fn provider() -> Result<JsValue, PortError> {
        let window =
            web_sys::window().ok_or_else(|| PortError::Transport("missing window".to_owned()))?;
        let provider = get_prop(&window.into(), "ethereum")?;
        if provider.is_null() || provider.is_undefined() {
            return Err(PortError::NotFound("window.ethereum missing".to_owned()));
        }
        Ok(provider)
    }

    fn get_prop(target: &JsValue, key: &str) -> Result<JsValue, PortError> {
        js_sys::Reflect::get(target, &JsValue::from_str(key))
            .map_err(|e| PortError::Transport(format!("read provider property {key} failed: {e:?}")))
    }

    fn function(target: &JsValue, key: &str) -> Option<js_sys::Function> {
        get_prop(target, key)
            .ok()
            .and_then(|v| v.dyn_into::<js_sys::Function>().ok())
    }

    fn error_code(value: &JsValue) -> Option<i64> {
        get_prop(value, "code")
            .ok()
            .and_then(|c| c.as_f64())
            .map(|c| c as i64)
    }

    /// Some mobile wallets nest the real code under `data.originalError`.
    fn rejection_to_error(value: JsValue) -> PortError {
        let code = error_code(&value).or_else(|| {
            get_prop(&value, "data")
                .and_then(|data| get_prop(&data, "originalError"))
                .ok()
                .and_then(|original| error_code(&original))
        });
        let message = get_prop(&value, "message")
            .ok()
            .and_then(|m| m.as_string())
            .unwrap_or_else(|| format!("{value:?}"));
        match code {
            Some(code) => PortError::Rpc { code, message },
            None => PortError::Transport(format!("provider request rejected: {message}")),
        }
    }

    fn js_accounts(value: &JsValue) -> Vec<Address> {
        if !js_sys::Array::is_array(value) {
            return Vec::new();
        }
        js_sys::Array::from(value)
            .iter()
            .filter_map(|item| item.as_string())
            .filter_map(|raw| match raw.parse::<Address>() {
                Ok(address) => Some(address),
                Err(e) => {
                    tracing::warn!(account = %raw, error = %e, "skipping invalid account");
                    None
                }
            })
            .collect()
    }

    fn js_chain_id(value: &JsValue) -> Result<u64, PortError> {
        if let Some(s) = value.as_string() {
            return rpc::parse_chain_id_str(&s);
        }
        if let Some(num) = value.as_f64() {
            return Ok(num as u64);
        }
        Err(PortError::Validation("invalid JS chain id".to_owned()))
    }
}
