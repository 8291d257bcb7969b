// src/ui/panel.rs
//! Debug panel and loading indicator
//!
//! The panel edits [`MaterialParams`] in place and reports what changed as
//! [`PanelAction`]s; the application decides what to do with them.

use crate::assets::ProgressEvent;
use crate::material::{quantize_unit, Color, MaterialParams};

/// Something the user asked for through the debug panel this frame
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PanelAction {
    /// One of the material or lighting parameters was edited
    ParamsChanged,
    /// The `downloadScreenshot` button was pressed
    Screenshot,
}

/// State of the asset loading indicator
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum LoadingState {
    Loading { fraction: f32 },
    /// Loading stopped short; the indicator stays up
    Failed { fraction: f32 },
    Done,
}

impl LoadingState {
    pub fn is_visible(&self) -> bool {
        !matches!(self, LoadingState::Done)
    }

    /// Folds one loader notification into the indicator
    ///
    /// Only `Loaded` hides it. A failure is sticky: later progress never
    /// brings the indicator back to `Loading`.
    pub fn apply(&mut self, event: &ProgressEvent) {
        *self = match (*self, event) {
            (_, ProgressEvent::Loaded) => LoadingState::Done,
            (LoadingState::Loading { fraction }, ProgressEvent::Error { .. }) => {
                LoadingState::Failed { fraction }
            }
            (LoadingState::Loading { .. }, ProgressEvent::Progress { loaded, total, .. }) => {
                let fraction = if *total == 0 {
                    0.0
                } else {
                    *loaded as f32 / *total as f32
                };
                LoadingState::Loading { fraction }
            }
            (state, _) => state,
        };
    }
}

/// Snaps a slider value to the parameter grid; true when the stored value moved
fn set_unit(target: &mut f32, value: f32) -> bool {
    let quantized = quantize_unit(value);
    let changed = quantized != *target;
    *target = quantized;
    changed
}

/// Draws the "Debug" window
///
/// Returns one [`PanelAction::ParamsChanged`] per edited control and a
/// [`PanelAction::Screenshot`] when the button was pressed.
pub fn debug_panel(ui: &imgui::Ui, params: &mut MaterialParams) -> Vec<PanelAction> {
    let mut actions = Vec::new();
    let display_size = ui.io().display_size;
    if display_size[0] <= 0.0 || display_size[1] <= 0.0 {
        return actions;
    }

    ui.window("Debug")
        .position([display_size[0] - 20.0, 20.0], imgui::Condition::FirstUseEver)
        .position_pivot([1.0, 0.0])
        .always_auto_resize(true)
        .collapsible(true)
        .build(|| {
            if ui.collapsing_header("Bike Materials", imgui::TreeNodeFlags::DEFAULT_OPEN) {
                let mut rgb = params.bike_color.to_array();
                if ui.color_edit3("bikeColor", &mut rgb) {
                    params.bike_color = Color::from_array(rgb);
                    actions.push(PanelAction::ParamsChanged);
                }

                if unit_slider(ui, "bikeMetalness", &mut params.bike_metalness) {
                    actions.push(PanelAction::ParamsChanged);
                }
                if unit_slider(ui, "bikeRoughness", &mut params.bike_roughness) {
                    actions.push(PanelAction::ParamsChanged);
                }
            }

            if ui.collapsing_header("Lighting", imgui::TreeNodeFlags::DEFAULT_OPEN) {
                if ui.checkbox("toggleEnvLight", &mut params.toggle_env_light) {
                    actions.push(PanelAction::ParamsChanged);
                }
                if unit_slider(ui, "envMapIntensity", &mut params.env_map_intensity) {
                    actions.push(PanelAction::ParamsChanged);
                }
            }

            ui.separator();
            if ui.button("downloadScreenshot") {
                actions.push(PanelAction::Screenshot);
            }
        });

    actions
}

fn unit_slider(ui: &imgui::Ui, label: &str, value: &mut f32) -> bool {
    let mut edited = *value;
    if ui
        .slider_config(label, 0.0, 1.0)
        .display_format("%.2f")
        .build(&mut edited)
    {
        set_unit(value, edited)
    } else {
        false
    }
}

/// Small centred window with a progress bar while assets load
pub fn loading_window(ui: &imgui::Ui, state: LoadingState) {
    let (fraction, failed) = match state {
        LoadingState::Loading { fraction } => (fraction, false),
        LoadingState::Failed { fraction } => (fraction, true),
        LoadingState::Done => return,
    };

    let display_size = ui.io().display_size;
    ui.window("Loading")
        .position(
            [display_size[0] * 0.5, display_size[1] * 0.5],
            imgui::Condition::Always,
        )
        .position_pivot([0.5, 0.5])
        .always_auto_resize(true)
        .title_bar(false)
        .resizable(false)
        .movable(false)
        .build(|| {
            let label = format!("{:.0}%", fraction.clamp(0.0, 1.0) * 100.0);
            imgui::ProgressBar::new(fraction.clamp(0.0, 1.0))
                .size([240.0, 0.0])
                .overlay_text(&label)
                .build(ui);
            if failed {
                ui.text_colored([1.0, 0.4, 0.4, 1.0], "Loading failed, see the log");
            }
        });
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_set_unit_quantizes_and_reports_change() {
        let mut value = 0.5;
        assert!(set_unit(&mut value, 0.734));
        assert!((value - 0.73).abs() < 1e-6);
        assert!(!set_unit(&mut value, 0.731));
        assert!(set_unit(&mut value, 7.0));
        assert_eq!(value, 1.0);
    }

    fn progress(loaded: usize, total: usize) -> ProgressEvent {
        ProgressEvent::Progress {
            url: "model.glb".to_string(),
            loaded,
            total,
        }
    }

    #[test]
    fn test_progress_moves_the_bar() {
        let mut state = LoadingState::Loading { fraction: 0.0 };
        state.apply(&progress(1, 2));
        assert_eq!(state, LoadingState::Loading { fraction: 0.5 });
        state.apply(&progress(0, 0));
        assert_eq!(state, LoadingState::Loading { fraction: 0.0 });
    }

    #[test]
    fn test_loaded_hides_the_indicator() {
        let mut state = LoadingState::Loading { fraction: 0.5 };
        state.apply(&progress(2, 2));
        assert!(state.is_visible());
        state.apply(&ProgressEvent::Loaded);
        assert_eq!(state, LoadingState::Done);
        assert!(!state.is_visible());
    }

    #[test]
    fn test_failure_stays_visible_after_later_progress() {
        let mut state = LoadingState::Loading { fraction: 0.0 };
        state.apply(&progress(1, 2));
        state.apply(&ProgressEvent::Error {
            url: "env.hdr".to_string(),
        });
        assert_eq!(state, LoadingState::Failed { fraction: 0.5 });

        state.apply(&progress(2, 2));
        state.apply(&ProgressEvent::Error {
            url: "model.glb".to_string(),
        });
        assert_eq!(state, LoadingState::Failed { fraction: 0.5 });
        assert!(state.is_visible());
    }

    #[test]
    fn test_loading_state_visibility() {
        assert!(LoadingState::Loading { fraction: 0.5 }.is_visible());
        assert!(LoadingState::Failed { fraction: 0.5 }.is_visible());
        assert!(!LoadingState::Done.is_visible());
    }
}
