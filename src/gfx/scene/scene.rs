use std::sync::Arc;

use log::{info, warn};
use thiserror::Error;
use wgpu::Device;

use crate::assets::EnvironmentMap;
use crate::config::ViewerConfig;
use crate::gfx::{
    camera::{CameraController, CameraManager, OrbitCamera},
    geometry::generate_plane,
    resources::material::{Material, MaterialBindings},
};
use crate::material::{apply_materials, MaterialParams};
use crate::viewport::Viewport;
use crate::wgpu_utils::BindGroupLayoutWithDesc;

use super::light::{LightHelper, SpotLight};
use super::object::{Object, Surface};

#[derive(Debug, Error, PartialEq, Eq)]
pub enum SceneError {
    #[error("a model is already attached to the scene")]
    ModelAlreadyAttached,
}

/// The viewer's scene: camera, ground plane, spotlight and (once loaded) the model
pub struct Scene {
    pub camera_manager: CameraManager,
    pub light_helper: LightHelper,
    ground: Object,
    light: SpotLight,
    model: Option<Object>,
    model_scale: f32,
    subject_marker: String,
}

impl Scene {
    /// Builds everything that does not depend on loaded assets
    pub fn new(config: &ViewerConfig, viewport: Viewport) -> Self {
        let camera = OrbitCamera::from_config(&config.camera, &config.controls, viewport.aspect());
        let controller = CameraController::from_config(&config.controls);

        let size = config.scene.ground_size;
        let ground_mesh = generate_plane(size, size, 1, 1).into_mesh();
        let ground_material = Material::new("Ground", config.scene.ground_color, 0.0, 1.0);
        let mut ground_surface = Surface::new("Ground", ground_mesh, ground_material);
        ground_surface.receive_shadow = true;

        let light = SpotLight::from_config(&config.light);
        let mut light_helper = LightHelper::new(config.debug.light_helper);
        light_helper.update(&light);

        Self {
            camera_manager: CameraManager::new(camera, controller),
            light_helper,
            ground: Object::new("Ground", vec![ground_surface]),
            light,
            model: None,
            model_scale: config.scene.model_scale,
            subject_marker: config.assets.subject_marker.clone(),
        }
    }

    /// Inserts the loaded model; only the first call succeeds
    ///
    /// Returns the number of surfaces tagged as subject.
    pub fn attach_model(&mut self, mut model: Object) -> Result<usize, SceneError> {
        if self.model.is_some() {
            return Err(SceneError::ModelAlreadyAttached);
        }

        model.set_scale(self.model_scale);
        let subjects = model.tag_subject_surfaces(&self.subject_marker);
        if subjects == 0 {
            warn!(
                "No surface name contains '{}'; material edits will only touch shared settings",
                self.subject_marker
            );
        }

        self.light.target = model.translation();
        self.light_helper.update(&self.light);

        info!(
            "Attached '{}': {} surface(s), {} subject surface(s)",
            model.name,
            model.surfaces.len(),
            subjects
        );
        self.model = Some(model);
        Ok(subjects)
    }

    /// Runs the material applier against the attached model (no-op before load)
    pub fn apply_material_params(
        &mut self,
        params: &MaterialParams,
        env_map: Option<&Arc<EnvironmentMap>>,
    ) {
        apply_materials(self.model.as_mut(), params, env_map);
    }

    /// Advances time-driven scene state: the orbiting light and its helper
    pub fn animate(&mut self, elapsed_seconds: f32) {
        self.light.orbit(elapsed_seconds);
        self.light_helper.update(&self.light);
    }

    pub fn model(&self) -> Option<&Object> {
        self.model.as_ref()
    }

    pub fn model_mut(&mut self) -> Option<&mut Object> {
        self.model.as_mut()
    }

    pub fn ground(&self) -> &Object {
        &self.ground
    }

    pub fn light(&self) -> &SpotLight {
        &self.light
    }

    pub fn light_mut(&mut self) -> &mut SpotLight {
        &mut self.light
    }

    /// Ground first, then the model when present
    pub fn objects(&self) -> impl Iterator<Item = &Object> {
        std::iter::once(&self.ground).chain(self.model.iter())
    }

    pub fn surfaces(&self) -> impl Iterator<Item = &Surface> {
        self.objects().flat_map(|object| object.surfaces.iter())
    }

    /// Uploads new geometry and pushes changed transforms and materials
    pub fn sync_gpu_resources(
        &mut self,
        device: &Device,
        queue: &wgpu::Queue,
        transform_layout: &BindGroupLayoutWithDesc,
        material_bindings: &MaterialBindings,
    ) {
        self.ground
            .sync_gpu_resources(device, queue, transform_layout, material_bindings);
        if let Some(model) = &mut self.model {
            model.sync_gpu_resources(device, queue, transform_layout, material_bindings);
        }
        self.light_helper.sync_gpu_resources(device, queue);
    }

    /// Gets statistics about the scene
    pub fn statistics(&self) -> SceneStatistics {
        SceneStatistics {
            object_count: self.objects().count(),
            surface_count: self.surfaces().count(),
            subject_count: self
                .model
                .as_ref()
                .map_or(0, |model| model.subject_surfaces().count()),
            total_triangles: self.objects().map(Object::triangle_count).sum(),
            total_vertices: self.objects().map(Object::vertex_count).sum(),
        }
    }
}

/// Scene statistics for debugging and UI display
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SceneStatistics {
    pub object_count: usize,
    pub surface_count: usize,
    pub subject_count: usize,
    pub total_triangles: usize,
    pub total_vertices: usize,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gfx::scene::object::Mesh;
    use crate::material::Color;
    use cgmath::Vector3;

    fn scene() -> Scene {
        Scene::new(&ViewerConfig::default(), Viewport::new(1280, 720))
    }

    fn bike() -> Object {
        let surface = |name: &str| {
            let mesh = Mesh::from_arrays(
                vec![[0.0, 0.0, 0.0], [1.0, 0.0, 0.0], [0.0, 0.0, -1.0]],
                Vec::new(),
                vec![0, 1, 2],
            );
            Surface::new(name, mesh, Material::new(name, Color::WHITE, 0.0, 1.0))
        };
        Object::new("bike", vec![surface("Object_6_mesh"), surface("Frame_mesh")])
    }

    #[test]
    fn test_construction_defaults() {
        let scene = scene();
        let camera = &scene.camera_manager.camera;
        assert!((camera.eye.x - 3.5).abs() < 1e-4);
        assert!((camera.eye.y - 2.8).abs() < 1e-4);
        assert!((camera.eye.z - 5.0).abs() < 1e-4);
        assert!((camera.aspect - 1280.0 / 720.0).abs() < 1e-6);

        let light = scene.light();
        assert_eq!(light.position, Vector3::new(0.0, 10.0, 0.0));
        assert_eq!(light.intensity, 10.0);
        assert!(light.cast_shadow);

        let ground = &scene.ground().surfaces[0];
        assert!(ground.receive_shadow);
        assert_eq!(ground.material.color.to_hex(), "#c2c2c2");
        assert!(scene.model().is_none());
    }

    #[test]
    fn test_attach_scales_and_tags() {
        let mut scene = scene();
        assert_eq!(scene.attach_model(bike()), Ok(1));

        let model = scene.model().unwrap();
        assert_eq!(model.transform[0][0], 3.5);
        assert_eq!(model.transform[1][1], 3.5);
        assert!(model.surfaces[0].is_subject());
        assert!(!model.surfaces[1].is_subject());
        assert_eq!(scene.light().target, Vector3::new(0.0, 0.0, 0.0));
    }

    #[test]
    fn test_second_attach_is_rejected() {
        let mut scene = scene();
        scene.attach_model(bike()).unwrap();
        let mut other = bike();
        other.name = "other".into();
        assert_eq!(scene.attach_model(other), Err(SceneError::ModelAlreadyAttached));
        assert_eq!(scene.model().unwrap().name, "bike");
    }

    #[test]
    fn test_apply_before_load_is_no_op() {
        let mut scene = scene();
        scene.apply_material_params(&MaterialParams::default(), None);
        assert_eq!(scene.statistics().surface_count, 1);
    }

    #[test]
    fn test_statistics_count_ground_and_model() {
        let mut scene = scene();
        scene.attach_model(bike()).unwrap();
        let stats = scene.statistics();
        assert_eq!(stats.object_count, 2);
        assert_eq!(stats.surface_count, 3);
        assert_eq!(stats.subject_count, 1);
        assert_eq!(stats.total_triangles, 2 + 2);
        assert_eq!(stats.total_vertices, 4 + 6);
    }

    #[test]
    fn test_animate_moves_light_on_circle() {
        let mut scene = scene();
        scene.animate(std::f32::consts::PI);
        let p = scene.light().position;
        assert!(p.x.abs() < 1e-5);
        assert!((p.z + 1.5).abs() < 1e-5);
        assert_eq!(p.y, 10.0);
    }
}
