//! Control logic behind the chain selector dropdown.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use crate::domain::ChainDescriptor;
use crate::ports::ProviderPort;
use crate::registry::ChainRegistry;
use crate::rpc;
use crate::state_machine::{switch_transition, SwitchAction, SwitchState};
use crate::synchronizer::SnapshotReader;

/// Viewport width below which the selector shows the currency symbol only.
pub const DEFAULT_COMPACT_BREAKPOINT: f32 = 768.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LayoutMode {
    Compact,
    #[default]
    Full,
}

impl LayoutMode {
    pub fn for_width(width: f32, breakpoint: f32) -> Self {
        if width < breakpoint {
            Self::Compact
        } else {
            Self::Full
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PointerTarget {
    Inside,
    Outside,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    NoProvider,
    NotConnected,
    InFlight,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SwitchOutcome {
    Skipped(SkipReason),
    Switched,
    Added,
    SwitchFailed { code: Option<i64> },
    AddFailed { code: Option<i64> },
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct SelectionUiState {
    pub open: bool,
    pub switch: SwitchState,
    pub layout: LayoutMode,
    pub active_chain_id: Option<u64>,
    pub mounted: bool,
}

impl SelectionUiState {
    pub fn in_flight(&self) -> bool {
        self.switch.in_flight()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SelectorEntry<'a> {
    pub chain: &'a ChainDescriptor,
    pub active: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SelectorView<'a> {
    pub current: &'a ChainDescriptor,
    pub label: &'a str,
    pub open: bool,
    pub switching: bool,
    pub layout: LayoutMode,
    pub entries: Vec<SelectorEntry<'a>>,
}

pub struct ChainSelector<P: ProviderPort> {
    provider: Option<Arc<P>>,
    wallet: SnapshotReader,
    registry: ChainRegistry,
    compact_breakpoint: f32,
    ui: Mutex<SelectionUiState>,
}

impl<P: ProviderPort> ChainSelector<P> {
    pub fn new(provider: Option<Arc<P>>, wallet: SnapshotReader, registry: ChainRegistry) -> Self {
        Self {
            provider,
            wallet,
            registry,
            compact_breakpoint: DEFAULT_COMPACT_BREAKPOINT,
            ui: Mutex::new(SelectionUiState::default()),
        }
    }

    pub fn with_compact_breakpoint(mut self, breakpoint: f32) -> Self {
        self.compact_breakpoint = breakpoint;
        self
    }

    pub fn registry(&self) -> &ChainRegistry {
        &self.registry
    }

    pub fn ui_state(&self) -> SelectionUiState {
        self.lock_ui().clone()
    }

    pub fn mount(&self, viewport_width: f32) {
        *self.lock_ui() = SelectionUiState {
            layout: LayoutMode::for_width(viewport_width, self.compact_breakpoint),
            mounted: true,
            ..SelectionUiState::default()
        };
    }

    pub fn unmount(&self) {
        *self.lock_ui() = SelectionUiState::default();
    }

    /// Chain shown on the selector button, with the first-entry fallback.
    pub fn current_chain(&self) -> &ChainDescriptor {
        let active = self.lock_ui().active_chain_id;
        self.registry.display_chain(active)
    }

    /// `None` while the wallet is disconnected: the selector renders nothing.
    pub fn view(&self) -> Option<SelectorView<'_>> {
        if !self.wallet.is_connected() {
            return None;
        }
        let ui = self.ui_state();
        let current = self.registry.display_chain(ui.active_chain_id);
        let label = match ui.layout {
            LayoutMode::Compact => current.symbol.as_str(),
            LayoutMode::Full => current.name.as_str(),
        };
        let entries = self
            .registry
            .iter()
            .map(|chain| SelectorEntry {
                chain,
                active: Some(chain.id) == ui.active_chain_id,
            })
            .collect();
        Some(SelectorView {
            current,
            label,
            open: ui.open,
            switching: ui.in_flight(),
            layout: ui.layout,
            entries,
        })
    }

    pub fn toggle_dropdown(&self) -> bool {
        let mut ui = self.lock_ui();
        ui.open = !ui.open;
        ui.open
    }

    /// Closes the dropdown on a pointer-down outside it; returns whether it closed.
    pub fn on_pointer_down(&self, target: PointerTarget) -> bool {
        let mut ui = self.lock_ui();
        if ui.mounted && ui.open && target == PointerTarget::Outside {
            ui.open = false;
            return true;
        }
        false
    }

    pub fn on_viewport_resize(&self, width: f32) -> LayoutMode {
        let mut ui = self.lock_ui();
        ui.layout = LayoutMode::for_width(width, self.compact_breakpoint);
        ui.layout
    }

    pub fn on_chain_changed(&self, chain_id: u64) {
        self.lock_ui().active_chain_id = Some(chain_id);
    }

    /// Asks the provider for the active chain and records it.
    pub async fn refresh_active_chain(&self) -> Option<u64> {
        let provider = self.provider.as_ref()?;
        if !self.wallet.is_connected() {
            return None;
        }
        match rpc::chain_id(provider.as_ref()).await {
            Ok(chain_id) => {
                self.on_chain_changed(chain_id);
                Some(chain_id)
            }
            Err(e) => {
                tracing::warn!(error = %e, "error getting chain id");
                None
            }
        }
    }

    /// Switches the wallet to `chain`, adding it first when the wallet
    /// reports it as unrecognized (4902).
    pub async fn select_chain(&self, chain: &ChainDescriptor) -> SwitchOutcome {
        let Some(provider) = self.provider.as_ref() else {
            return SwitchOutcome::Skipped(SkipReason::NoProvider);
        };
        if !self.wallet.is_connected() {
            return SwitchOutcome::Skipped(SkipReason::NotConnected);
        }
        let _flight = {
            let mut ui = self.lock_ui();
            if ui.in_flight() {
                return SwitchOutcome::Skipped(SkipReason::InFlight);
            }
            apply(&mut ui, SwitchAction::Begin);
            InFlight { ui: &self.ui }
        };

        tracing::debug!(chain_id = chain.id, hex_id = %chain.hex_id, "switching chain");
        let switched = rpc::switch_chain(provider.as_ref(), &chain.switch_chain_params()).await;
        match switched {
            Ok(()) => {
                self.finish(SwitchAction::Switched, true);
                SwitchOutcome::Switched
            }
            Err(e) if e.is_unrecognized_chain() => {
                apply(&mut self.lock_ui(), SwitchAction::UnrecognizedChain);
                self.add_chain(provider.as_ref(), chain).await
            }
            Err(e) => {
                tracing::warn!(
                    chain_id = chain.id,
                    provider_code = ?e.provider_code(),
                    error = %e,
                    "error switching chain"
                );
                self.finish(SwitchAction::SwitchFailed, false);
                SwitchOutcome::SwitchFailed { code: e.code() }
            }
        }
    }

    async fn add_chain(&self, provider: &P, chain: &ChainDescriptor) -> SwitchOutcome {
        tracing::debug!(chain_id = chain.id, "adding chain to wallet");
        match rpc::add_chain(provider, &chain.add_chain_params()).await {
            Ok(()) => {
                self.finish(SwitchAction::Added, true);
                SwitchOutcome::Added
            }
            Err(e) => {
                tracing::error!(
                    chain_id = chain.id,
                    provider_code = ?e.provider_code(),
                    error = %e,
                    "error adding chain"
                );
                self.finish(SwitchAction::AddFailed, false);
                SwitchOutcome::AddFailed { code: e.code() }
            }
        }
    }

    fn finish(&self, action: SwitchAction, close: bool) {
        let mut ui = self.lock_ui();
        apply(&mut ui, action);
        if close {
            ui.open = false;
        }
    }

    fn lock_ui(&self) -> MutexGuard<'_, SelectionUiState> {
        lock_ui(&self.ui)
    }
}

fn lock_ui(ui: &Mutex<SelectionUiState>) -> MutexGuard<'_, SelectionUiState> {
    ui.lock().unwrap_or_else(PoisonError::into_inner)
}

fn apply(ui: &mut SelectionUiState, action: SwitchAction) {
    match switch_transition(ui.switch, action) {
        Ok((next, transition)) => {
            tracing::debug!(
                from = ?transition.from,
                to = ?transition.to,
                reason = transition.reason,
                "switch transition"
            );
            ui.switch = next;
        }
        Err(e) => {
            tracing::warn!(error = %e, "resetting switch flow");
            ui.switch = SwitchState::Idle;
        }
    }
}

/// Returns the switch flow to `Idle` however the request future ends,
/// including when it is dropped mid-flight.
struct InFlight<'a> {
    ui: &'a Mutex<SelectionUiState>,
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        lock_ui(self.ui).switch = SwitchState::Idle;
    }
}
