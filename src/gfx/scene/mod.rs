//! # Scene Management Module
//!
//! The viewer's scene: a ground plane, one orbiting spotlight, the orbit
//! camera and the loaded model, which is attached exactly once.
//!
//! ## Key Components
//!
//! - [`Scene`] - Owns the camera, ground, light and model
//! - [`Object`] - A group of named [`Surface`]s sharing one transform
//! - [`SpotLight`] / [`LightHelper`] - The shadow-casting light and its wireframe
//! - [`Vertex3D`] - Vertex format shared by every mesh

pub mod light;
pub mod object;
pub mod scene;
pub mod vertex;

// Re-export main types
pub use light::{LightHelper, SpotLight, SpotLightUniform};
pub use object::{DrawObject, Mesh, Object, Surface, SurfaceRole};
pub use scene::{Scene, SceneError, SceneStatistics};
pub use vertex::{LineVertex, Vertex3D};
