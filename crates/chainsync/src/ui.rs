//! UI helper components

use eframe::egui;

use chainsync_core::{ChainDescriptor, WalletSnapshot};

pub const ACCENT: egui::Color32 = egui::Color32::from_rgb(0, 212, 170);

/// Open URL in a new browser tab
#[cfg(target_arch = "wasm32")]
pub fn open_url_new_tab(url: &str) {
    if let Some(window) = web_sys::window() {
        let _ = window.open_with_url_and_target(url, "_blank");
    }
}

#[cfg(not(target_arch = "wasm32"))]
pub fn open_url_new_tab(url: &str) {
    if let Err(e) = open::that(url) {
        tracing::warn!(url, error = %e, "could not open browser");
    }
}

/// Styled heading with accent color
pub fn styled_heading(ui: &mut egui::Ui, text: &str) {
    ui.heading(egui::RichText::new(text).size(22.0).color(ACCENT));
}

/// Connected account, balance and currency symbol. The address links to
/// the chain's block explorer.
pub fn wallet_summary(ui: &mut egui::Ui, snapshot: &WalletSnapshot, chain: &ChainDescriptor) {
    let (Some(address), Some(short)) = (snapshot.address, snapshot.short_address()) else {
        return;
    };
    let explorer_url = chain.explorer_address_url(&address);

    card(ui, |ui| {
        ui.horizontal(|ui| {
            let response = ui
                .link(egui::RichText::new(short).monospace())
                .on_hover_text(format!("{address}\nOpen in block explorer"));
            if response.clicked() {
                open_url_new_tab(&explorer_url);
            }
            ui.separator();
            let balance = snapshot.balance.as_deref().unwrap_or("…");
            ui.label(egui::RichText::new(format!("{balance} {}", chain.symbol)).strong());
        });
    });
}

pub fn testnet_badge(ui: &mut egui::Ui) {
    ui.label(
        egui::RichText::new("testnet")
            .small()
            .color(egui::Color32::from_rgb(220, 180, 50)),
    );
}

/// Error message display
pub fn error_message(ui: &mut egui::Ui, message: &str) {
    ui.horizontal(|ui| {
        ui.label(egui::RichText::new("❌").size(14.0));
        ui.label(egui::RichText::new(message).color(egui::Color32::from_rgb(220, 80, 80)));
    });
}

/// Primary button with enabled state
pub fn primary_button_enabled(ui: &mut egui::Ui, text: &str, enabled: bool) -> egui::Response {
    let btn = egui::Button::new(egui::RichText::new(text).size(14.0).color(egui::Color32::WHITE))
        .min_size(egui::vec2(110.0, 30.0))
        .fill(egui::Color32::from_rgb(0, 180, 150));
    ui.add_enabled(enabled, btn)
}

/// Secondary action button - subdued, outline style
pub fn secondary_button(ui: &mut egui::Ui, text: &str) -> egui::Response {
    ui.add(egui::Button::new(egui::RichText::new(text).size(14.0)).min_size(egui::vec2(90.0, 30.0)))
}

/// Render content in a subtle card/frame
pub fn card(ui: &mut egui::Ui, add_contents: impl FnOnce(&mut egui::Ui)) {
    egui::Frame::none()
        .fill(ui.visuals().faint_bg_color)
        .rounding(6.0)
        .inner_margin(egui::Margin::symmetric(10.0, 6.0))
        .show(ui, add_contents);
}
