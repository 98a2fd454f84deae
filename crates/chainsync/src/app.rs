//! Main application

use std::future::Future;
use std::sync::{Arc, Mutex, PoisonError};

use eframe::egui;

use chainsync_adapters::{ChainSyncConfig, Eip1193Adapter};
use chainsync_core::{SwitchOutcome, SyncSignal, WalletSnapshot};

use crate::chain_selector::{self, SelectorAction};
use crate::session::WalletSession;
use crate::ui;

const BALANCE_REFRESH_SECS: f64 = 15.0;

/// Result of a user-triggered wallet action
enum ActionResult {
    Mounted(WalletSnapshot),
    Connected(Result<WalletSnapshot, String>),
    Disconnected(WalletSnapshot),
    Switched(SwitchOutcome),
}

type Slot<T> = Arc<Mutex<Option<(u64, T)>>>;

/// The main application state
pub struct App {
    config: ChainSyncConfig,
    /// Outlives sessions: a reload rebuilds everything around the same wallet
    provider: Eip1193Adapter,
    session: Arc<WalletSession>,
    /// Bumped on every reload; results from older sessions are dropped
    generation: u64,
    snapshot: WalletSnapshot,
    action_result: Slot<ActionResult>,
    action_pending: bool,
    pump_result: Slot<SyncSignal>,
    pump_pending: bool,
    last_pump: f64,
    last_balance_refresh: f64,
    viewport_width: f32,
    error: Option<String>,
}

impl App {
    pub fn new(cc: &eframe::CreationContext<'_>) -> Self {
        let config = ChainSyncConfig::from_env();
        let provider = Eip1193Adapter::with_config(config.clone());
        let mut app = Self {
            session: Arc::new(WalletSession::with_provider(provider.clone(), config.clone())),
            config,
            provider,
            generation: 0,
            snapshot: WalletSnapshot::disconnected(),
            action_result: Arc::new(Mutex::new(None)),
            action_pending: false,
            pump_result: Arc::new(Mutex::new(None)),
            pump_pending: false,
            last_pump: 0.0,
            last_balance_refresh: 0.0,
            viewport_width: cc.egui_ctx.screen_rect().width(),
            error: None,
        };
        app.mount(&cc.egui_ctx);
        app
    }

    fn mount(&mut self, ctx: &egui::Context) {
        let width = self.viewport_width;
        self.start_action(ctx, move |session| async move {
            ActionResult::Mounted(session.mount(width).await)
        });
    }

    /// Drops the current session and mounts a fresh one.
    fn reload(&mut self, ctx: &egui::Context, chain_id: u64) {
        tracing::info!(chain_id, generation = self.generation, "reloading wallet session");
        self.session.unmount();
        self.generation += 1;
        self.session = Arc::new(WalletSession::with_provider(
            self.provider.clone(),
            self.config.clone(),
        ));
        self.snapshot = WalletSnapshot::disconnected();
        self.action_pending = false;
        self.pump_pending = false;
        self.error = None;
        self.mount(ctx);
    }

    fn start_action<F, Fut>(&mut self, ctx: &egui::Context, task: F)
    where
        F: FnOnce(Arc<WalletSession>) -> Fut + Send + 'static,
        Fut: Future<Output = ActionResult> + 'static,
    {
        self.action_pending = true;
        self.error = None;
        spawn_task(
            ctx,
            Arc::clone(&self.session),
            self.generation,
            Arc::clone(&self.action_result),
            task,
        );
    }

    fn maybe_pump(&mut self, ctx: &egui::Context) {
        if self.pump_pending || !self.session.provider_available() {
            return;
        }
        let now = ctx.input(|i| i.time);
        let interval = self.session.poll_interval();
        if now - self.last_pump < interval.as_secs_f64() {
            ctx.request_repaint_after(interval);
            return;
        }
        self.last_pump = now;
        let refresh_balance =
            self.snapshot.connected && now - self.last_balance_refresh >= BALANCE_REFRESH_SECS;
        if refresh_balance {
            self.last_balance_refresh = now;
        }
        self.pump_pending = true;
        spawn_task(
            ctx,
            Arc::clone(&self.session),
            self.generation,
            Arc::clone(&self.pump_result),
            move |session| async move { session.pump(refresh_balance).await },
        );
        ctx.request_repaint_after(interval);
    }

    fn check_action_result(&mut self) {
        let Some((generation, result)) = take(&self.action_result) else {
            return;
        };
        if generation != self.generation {
            return;
        }
        self.action_pending = false;
        match result {
            ActionResult::Mounted(snapshot) | ActionResult::Disconnected(snapshot) => {
                self.snapshot = snapshot;
            }
            ActionResult::Connected(Ok(snapshot)) => self.snapshot = snapshot,
            ActionResult::Connected(Err(e)) => {
                tracing::warn!(error = %e, "wallet connection failed");
                self.error = Some(e);
            }
            ActionResult::Switched(outcome) => {
                tracing::debug!(?outcome, "chain selection finished");
                self.snapshot = self.session.snapshot();
            }
        }
    }

    fn check_pump_result(&mut self, ctx: &egui::Context) {
        let Some((generation, signal)) = take(&self.pump_result) else {
            return;
        };
        if generation != self.generation {
            return;
        }
        self.pump_pending = false;
        match signal {
            SyncSignal::Continue => self.snapshot = self.session.snapshot(),
            SyncSignal::ReloadRequired { chain_id } => self.reload(ctx, chain_id),
        }
    }

    fn track_viewport(&mut self, ctx: &egui::Context) {
        let width = ctx.screen_rect().width();
        if (width - self.viewport_width).abs() > f32::EPSILON {
            self.viewport_width = width;
            self.session.selector().on_viewport_resize(width);
        }
    }

    fn render_header(&mut self, ui: &mut egui::Ui, ctx: &egui::Context) {
        ui.horizontal(|ui| {
            ui::styled_heading(ui, "⛓ ChainSync");
            ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                if self.snapshot.connected {
                    if ui::secondary_button(ui, "Disconnect").clicked() && !self.action_pending {
                        self.start_action(ctx, |session| async move {
                            ActionResult::Disconnected(session.disconnect().await)
                        });
                    }
                } else {
                    let enabled = self.session.provider_available() && !self.action_pending;
                    if ui::primary_button_enabled(ui, "Connect wallet", enabled).clicked() {
                        self.start_action(ctx, |session| async move {
                            ActionResult::Connected(
                                session.connect().await.map_err(|e| e.to_string()),
                            )
                        });
                    }
                }

                let chain = self.session.selector().current_chain().clone();
                ui::wallet_summary(ui, &self.snapshot, &chain);

                if let SelectorAction::Select(chain) =
                    chain_selector::render(ui, self.session.selector())
                {
                    self.start_action(ctx, move |session| async move {
                        ActionResult::Switched(session.select_chain(&chain).await)
                    });
                }
            });
        });
    }
}

impl eframe::App for App {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        ctx.set_visuals(egui::Visuals::dark());

        self.check_action_result();
        self.check_pump_result(ctx);
        self.track_viewport(ctx);
        self.maybe_pump(ctx);

        egui::TopBottomPanel::top("header").show(ctx, |ui| {
            ui.add_space(8.0);
            self.render_header(ui, ctx);
            ui.add_space(4.0);
        });

        egui::CentralPanel::default().show(ctx, |ui| {
            ui.add_space(10.0);
            if let Some(error) = &self.error {
                ui::error_message(ui, error);
            }
            if !self.session.provider_available() {
                ui::error_message(ui, "No wallet provider available");
            } else if !self.snapshot.connected {
                ui.label("Connect a wallet to choose a network.");
            }
            ui.label(
                egui::RichText::new(format!("provider: {}", self.session.provider_label()))
                    .weak()
                    .small(),
            );
        });
    }
}

fn take<T>(slot: &Slot<T>) -> Option<(u64, T)> {
    slot.lock().unwrap_or_else(PoisonError::into_inner).take()
}

/// Runs `task` off the UI loop and parks its output in `slot`.
///
/// Provider futures are not `Send`, so native builds drive them on a
/// current-thread runtime inside a dedicated thread.
fn spawn_task<T, F, Fut>(
    ctx: &egui::Context,
    session: Arc<WalletSession>,
    generation: u64,
    slot: Slot<T>,
    task: F,
) where
    T: Send + 'static,
    F: FnOnce(Arc<WalletSession>) -> Fut + Send + 'static,
    Fut: Future<Output = T> + 'static,
{
    let ctx = ctx.clone();

    #[cfg(target_arch = "wasm32")]
    {
        wasm_bindgen_futures::spawn_local(async move {
            let output = task(session).await;
            *slot.lock().unwrap_or_else(PoisonError::into_inner) = Some((generation, output));
            ctx.request_repaint();
        });
    }

    #[cfg(not(target_arch = "wasm32"))]
    {
        std::thread::spawn(move || {
            let rt = match tokio::runtime::Builder::new_current_thread()
                .enable_all()
                .build()
            {
                Ok(rt) => rt,
                Err(e) => {
                    tracing::error!(error = %e, "failed to start background runtime");
                    return;
                }
            };
            let output = rt.block_on(task(session));
            *slot.lock().unwrap_or_else(PoisonError::into_inner) = Some((generation, output));
            ctx.request_repaint();
        });
    }
}
