//! Chain selector button and dropdown

use eframe::egui;

use chainsync_core::{
    ChainDescriptor, ChainSelector, LayoutMode, PointerTarget, ProviderPort, SelectorView,
};

use crate::ui;

/// What the user picked this frame.
pub enum SelectorAction {
    None,
    Select(ChainDescriptor),
}

/// Renders the selector; draws nothing while the wallet is disconnected.
pub fn render<P: ProviderPort>(ui: &mut egui::Ui, selector: &ChainSelector<P>) -> SelectorAction {
    let Some(view) = selector.view() else {
        return SelectorAction::None;
    };

    let button = ui
        .add(egui::Button::new(button_text(&view)).min_size(egui::vec2(0.0, 30.0)))
        .on_hover_text(view.current.name.as_str());
    if button.clicked() {
        selector.toggle_dropdown();
    }
    if !selector.ui_state().open {
        return SelectorAction::None;
    }

    let mut action = SelectorAction::None;
    let popup_id = ui.make_persistent_id("chain_selector_dropdown");
    let area = egui::Area::new(popup_id)
        .order(egui::Order::Foreground)
        .fixed_pos(button.rect.left_bottom() + egui::vec2(0.0, 4.0))
        .show(ui.ctx(), |ui| {
            egui::Frame::popup(ui.style()).show(ui, |ui| {
                ui.set_min_width(button.rect.width().max(200.0));
                ui.label(egui::RichText::new("Select network").weak().small());
                ui.separator();
                for entry in &view.entries {
                    ui.horizontal(|ui| {
                        let label = egui::RichText::new(&entry.chain.name);
                        let response = ui.add_enabled(
                            !view.switching,
                            egui::SelectableLabel::new(entry.active, label),
                        );
                        if entry.chain.testnet {
                            ui::testnet_badge(ui);
                        }
                        if response.clicked() {
                            action = SelectorAction::Select(entry.chain.clone());
                        }
                    });
                }
            });
        });

    if button.clicked() {
        return action;
    }
    let (clicked, pointer) = ui.input(|i| (i.pointer.any_click(), i.pointer.interact_pos()));
    if clicked {
        let pos = pointer.unwrap_or_default();
        let target = if area.response.rect.contains(pos) || button.rect.contains(pos) {
            PointerTarget::Inside
        } else {
            PointerTarget::Outside
        };
        selector.on_pointer_down(target);
    }
    action
}

fn button_text(view: &SelectorView<'_>) -> egui::RichText {
    let mut text = view.label.to_owned();
    if view.switching {
        text.push_str(" …");
    }
    text.push_str(" ⏷");
    let rich = egui::RichText::new(text).size(14.0);
    match view.layout {
        LayoutMode::Compact => rich.monospace(),
        LayoutMode::Full => rich,
    }
}
