use cgmath::{InnerSpace, Vector3};

use super::GeometryData;

/// Generate a plane in the XZ plane facing +Y
///
/// # Arguments
/// * `width` - Extent along X
/// * `depth` - Extent along Z
/// * `width_segments` - Subdivisions along X
/// * `depth_segments` - Subdivisions along Z
///
/// Returns a plane centered at the origin.
pub fn generate_plane(width: f32, depth: f32, width_segments: u32, depth_segments: u32) -> GeometryData {
    let mut data = GeometryData::default();

    let w_segs = width_segments.max(1);
    let d_segs = depth_segments.max(1);

    for z in 0..=d_segs {
        let v = z as f32 / d_segs as f32;
        let pos_z = (v - 0.5) * depth;

        for x in 0..=w_segs {
            let u = x as f32 / w_segs as f32;
            let pos_x = (u - 0.5) * width;

            data.vertices.push([pos_x, 0.0, pos_z]);
            data.normals.push([0.0, 1.0, 0.0]);
        }
    }

    // Counter-clockwise when viewed from above
    for z in 0..d_segs {
        for x in 0..w_segs {
            let i = z * (w_segs + 1) + x;
            let next_row = i + w_segs + 1;

            data.indices.extend_from_slice(&[i, next_row, i + 1]);
            data.indices.extend_from_slice(&[next_row, next_row + 1, i + 1]);
        }
    }

    data
}

/// Line-list vertices outlining a cone
///
/// The apex sits at `apex` and the cone opens along `direction` over `length`
/// with half-angle `angle` (radians). Produces the base circle plus `spokes`
/// lines from the apex to the rim.
pub fn generate_cone_lines(
    apex: Vector3<f32>,
    direction: Vector3<f32>,
    length: f32,
    angle: f32,
    segments: u32,
    spokes: u32,
) -> Vec<[f32; 3]> {
    let segments = segments.max(3);
    let forward = if direction.magnitude2() > f32::EPSILON {
        direction.normalize()
    } else {
        -Vector3::unit_y()
    };
    let helper = if forward.y.abs() > 0.99 {
        Vector3::unit_z()
    } else {
        Vector3::unit_y()
    };
    let right = forward.cross(helper).normalize();
    let up = right.cross(forward);

    let radius = length * angle.tan();
    let center = apex + forward * length;
    let rim = |t: f32| center + right * (radius * t.cos()) + up * (radius * t.sin());

    let mut lines = Vec::with_capacity(((segments + spokes) * 2) as usize);
    for i in 0..segments {
        let a = i as f32 / segments as f32 * std::f32::consts::TAU;
        let b = (i + 1) as f32 / segments as f32 * std::f32::consts::TAU;
        lines.push(rim(a).into());
        lines.push(rim(b).into());
    }
    for i in 0..spokes {
        let a = i as f32 / spokes.max(1) as f32 * std::f32::consts::TAU;
        lines.push(apex.into());
        lines.push(rim(a).into());
    }
    lines
}
