//! # User Interface Module
//!
//! Dear ImGui overlay for the viewer: the "Debug" panel that edits the live
//! material parameters and the loading indicator shown while assets decode.
//!
//! - [`UiManager`] - ImGui integration with winit and wgpu
//! - [`debug_panel`] - Material and lighting controls plus the screenshot button
//! - [`loading_window`] - Progress bar driven by the loader's progress events
//!
//! When the pointer is over a UI window the orbit controls ignore it.

pub mod manager;
pub mod panel;

// Re-export main types
pub use manager::UiManager;
pub use panel::{debug_panel, loading_window, LoadingState, PanelAction};
