//! ChainSync: wallet account and network switcher for EVM chains

#[cfg(not(target_arch = "wasm32"))]
use eframe::egui;

mod app;
mod chain_selector;
mod session;
mod ui;

#[cfg(not(target_arch = "wasm32"))]
fn main() -> eframe::Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .init();

    tracing::info!("Starting ChainSync");

    let native_options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_title("ChainSync")
            .with_inner_size([900.0, 600.0])
            .with_min_inner_size([360.0, 300.0]),
        ..Default::default()
    };

    eframe::run_native(
        "ChainSync",
        native_options,
        Box::new(|cc| Ok(Box::new(app::App::new(cc)))),
    )
}

#[cfg(target_arch = "wasm32")]
fn main() {
    use wasm_bindgen::JsCast;

    tracing_wasm::set_as_global_default();
    tracing::info!("Starting ChainSync");

    wasm_bindgen_futures::spawn_local(async {
        let Some(canvas) = web_sys::window()
            .and_then(|w| w.document())
            .and_then(|d| d.get_element_by_id("chainsync_canvas"))
            .and_then(|e| e.dyn_into::<web_sys::HtmlCanvasElement>().ok())
        else {
            tracing::error!("canvas #chainsync_canvas not found");
            return;
        };

        let started = eframe::WebRunner::new()
            .start(
                canvas,
                eframe::WebOptions::default(),
                Box::new(|cc| Ok(Box::new(app::App::new(cc)))),
            )
            .await;
        if let Err(e) = started {
            tracing::error!(error = ?e, "failed to start eframe");
        }
    });
}
