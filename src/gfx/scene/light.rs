//! Spotlight and its wireframe helper

use cgmath::{perspective, InnerSpace, Matrix4, Point3, Rad, Vector3};

use super::vertex::LineVertex;
use crate::config::SpotLightConfig;
use crate::gfx::camera::orbit_camera::OPENGL_TO_WGPU_MATRIX;
use crate::gfx::geometry::generate_cone_lines;

const SHADOW_NEAR: f32 = 0.5;
const SHADOW_FAR: f32 = 500.0;

/// Spotlight uniform block. MUST match `SpotLight` in the shaders.
#[repr(C)]
#[derive(Copy, Clone, Debug, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct SpotLightUniform {
    pub position: [f32; 3],
    pub intensity: f32,
    pub direction: [f32; 3],
    /// cos of the outer cone angle
    pub cos_outer: f32,
    /// Linear RGB
    pub color: [f32; 3],
    /// cos of the angle where the penumbra starts
    pub cos_inner: f32,
    pub decay: f32,
    /// 0 means unlimited range
    pub distance: f32,
    pub cast_shadow: f32,
    pub shadow_bias: f32,
    pub view_proj: [[f32; 4]; 4],
}

#[derive(Debug, Clone)]
pub struct SpotLight {
    pub position: Vector3<f32>,
    pub target: Vector3<f32>,
    pub color: [f32; 3],
    pub intensity: f32,
    pub angle: f32,
    pub penumbra: f32,
    pub decay: f32,
    pub distance: f32,
    pub cast_shadow: bool,
    pub shadow_bias: f32,
    pub orbit_radius: f32,
}

impl SpotLight {
    pub fn from_config(config: &SpotLightConfig) -> Self {
        Self {
            position: config.position.into(),
            target: Vector3::new(0.0, 0.0, 0.0),
            color: config.color.to_linear(),
            intensity: config.intensity,
            angle: config.angle.clamp(0.0, std::f32::consts::FRAC_PI_2 - 1e-3),
            penumbra: config.penumbra.clamp(0.0, 1.0),
            decay: config.decay,
            distance: 0.0,
            cast_shadow: config.cast_shadow,
            shadow_bias: 0.0005,
            orbit_radius: config.orbit_radius,
        }
    }

    /// Moves the light around the Y axis; height is kept
    pub fn orbit(&mut self, elapsed_seconds: f32) {
        self.position.x = elapsed_seconds.sin() * self.orbit_radius;
        self.position.z = elapsed_seconds.cos() * self.orbit_radius;
    }

    pub fn direction(&self) -> Vector3<f32> {
        let direction = self.target - self.position;
        if direction.magnitude2() > f32::EPSILON {
            direction.normalize()
        } else {
            -Vector3::unit_y()
        }
    }

    /// Perspective view-projection used to render the shadow map
    pub fn view_proj(&self) -> Matrix4<f32> {
        let direction = self.direction();
        let up = if direction.cross(Vector3::unit_y()).magnitude2() < 1e-6 {
            Vector3::unit_z()
        } else {
            Vector3::unit_y()
        };
        let eye = Point3::new(self.position.x, self.position.y, self.position.z);
        let view = Matrix4::look_at_rh(eye, eye + direction, up);
        let far = if self.distance > 0.0 { self.distance } else { SHADOW_FAR };
        let proj = perspective(Rad(self.angle * 2.0), 1.0, SHADOW_NEAR, far);
        OPENGL_TO_WGPU_MATRIX * proj * view
    }

    pub fn uniform(&self) -> SpotLightUniform {
        SpotLightUniform {
            position: self.position.into(),
            intensity: self.intensity,
            direction: self.direction().into(),
            cos_outer: self.angle.cos(),
            color: self.color,
            cos_inner: (self.angle * (1.0 - self.penumbra)).cos(),
            decay: self.decay,
            distance: self.distance,
            cast_shadow: if self.cast_shadow { 1.0 } else { 0.0 },
            shadow_bias: self.shadow_bias,
            view_proj: self.view_proj().into(),
        }
    }
}

/// Cone wireframe following the spotlight
pub struct LightHelper {
    pub visible: bool,
    vertices: Vec<LineVertex>,
    vertex_buffer: Option<wgpu::Buffer>,
    dirty: bool,
}

impl LightHelper {
    const SEGMENTS: u32 = 32;
    const SPOKES: u32 = 5;

    pub fn new(visible: bool) -> Self {
        Self {
            visible,
            vertices: Vec::new(),
            vertex_buffer: None,
            dirty: true,
        }
    }

    /// Rebuilds the cone from the light's current pose
    pub fn update(&mut self, light: &SpotLight) {
        let length = if light.distance > 0.0 {
            light.distance
        } else {
            (light.target - light.position).magnitude()
        };
        self.vertices = generate_cone_lines(
            light.position,
            light.direction(),
            length,
            light.angle,
            Self::SEGMENTS,
            Self::SPOKES,
        )
        .into_iter()
        .map(|position| LineVertex { position })
        .collect();
        self.dirty = true;
    }

    pub fn vertices(&self) -> &[LineVertex] {
        &self.vertices
    }

    pub fn sync_gpu_resources(&mut self, device: &wgpu::Device, queue: &wgpu::Queue) {
        if !self.visible || !self.dirty || self.vertices.is_empty() {
            return;
        }
        let bytes: &[u8] = bytemuck::cast_slice(&self.vertices);
        match &self.vertex_buffer {
            Some(buffer) if buffer.size() == bytes.len() as u64 => {
                queue.write_buffer(buffer, 0, bytes);
            }
            _ => {
                self.vertex_buffer = Some(wgpu::util::DeviceExt::create_buffer_init(
                    device,
                    &wgpu::util::BufferInitDescriptor {
                        label: Some("Light Helper Buffer"),
                        contents: bytes,
                        usage: wgpu::BufferUsages::VERTEX | wgpu::BufferUsages::COPY_DST,
                    },
                ));
            }
        }
        self.dirty = false;
    }

    /// GPU buffer and vertex count, when there is something to draw
    pub fn draw_data(&self) -> Option<(&wgpu::Buffer, u32)> {
        if !self.visible {
            return None;
        }
        self.vertex_buffer
            .as_ref()
            .map(|buffer| (buffer, self.vertices.len() as u32))
    }
}
