//! # Material Parameters
//!
//! The live parameter store edited by the debug panel, and the routine that
//! pushes those parameters onto the loaded model's surfaces.

pub mod applier;
pub mod color;
pub mod params;

pub use applier::apply_materials;
pub use color::{Color, ColorParseError};
pub use params::{quantize_unit, MaterialParams, PARAM_STEP};
