use std::sync::Arc;

use crate::assets::EnvironmentMap;
use crate::gfx::scene::object::Object;

use super::params::MaterialParams;

/// Pushes the current parameters onto every surface of the loaded model.
///
/// Every surface casts shadows and gets the environment map (or none, when
/// the toggle is off) at the configured intensity. Subject surfaces also take
/// the colour, metalness and roughness. Does nothing until a model exists.
pub fn apply_materials(
    model: Option<&mut Object>,
    params: &MaterialParams,
    env_map: Option<&Arc<EnvironmentMap>>,
) {
    let Some(model) = model else {
        return;
    };

    let env_map = if params.toggle_env_light {
        env_map.cloned()
    } else {
        None
    };

    for surface in &mut model.surfaces {
        surface.cast_shadow = true;
        surface.material.env_map = env_map.clone();
        surface.material.env_map_intensity = params.env_map_intensity;

        if surface.is_subject() {
            surface.material.color = params.bike_color;
            surface.material.metalness = params.bike_metalness;
            surface.material.roughness = params.bike_roughness;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gfx::resources::material::Material;
    use crate::gfx::scene::object::{Mesh, Surface};
    use crate::material::Color;

    fn surface(name: &str, color: Color) -> Surface {
        let mesh = Mesh::from_arrays(
            vec![[0.0, 0.0, 0.0], [1.0, 0.0, 0.0], [0.0, 0.0, -1.0]],
            Vec::new(),
            vec![0, 1, 2],
        );
        Surface::new(name, mesh, Material::new(name, color, 0.1, 0.9))
    }

    fn model() -> Object {
        let mut object = Object::new(
            "bike",
            vec![
                surface("Object_6_mesh", Color::WHITE),
                surface("Frame_mesh", Color::from_hex("#333333").unwrap()),
            ],
        );
        object.tag_subject_surfaces("Object_6");
        object
    }

    fn env() -> Arc<EnvironmentMap> {
        Arc::new(EnvironmentMap::from_pixels(1, 1, vec![[1.0, 1.0, 1.0, 1.0]]))
    }

    #[test]
    fn test_no_model_is_a_no_op() {
        apply_materials(None, &MaterialParams::default(), Some(&env()));
    }

    #[test]
    fn test_green_paint_only_touches_subject() {
        let mut model = model();
        let env = env();
        let params = MaterialParams {
            bike_color: Color::from_hex("#00ff00").unwrap(),
            ..MaterialParams::default()
        };

        apply_materials(Some(&mut model), &params, Some(&env));

        let paint = &model.surfaces[0];
        assert_eq!(paint.material.color.to_hex(), "#00ff00");
        assert_eq!(paint.material.metalness, params.bike_metalness);
        assert_eq!(paint.material.roughness, params.bike_roughness);

        let frame = &model.surfaces[1];
        assert_eq!(frame.material.color.to_hex(), "#333333");
        assert_eq!(frame.material.metalness, 0.1);
        assert_eq!(frame.material.roughness, 0.9);
        assert!(model.surfaces.iter().all(|s| s.cast_shadow));
    }

    #[test]
    fn test_env_toggle_on_shares_the_loaded_map() {
        let mut model = model();
        let env = env();
        let mut params = MaterialParams::default();
        params.set_env_map_intensity(0.4);

        apply_materials(Some(&mut model), &params, Some(&env));

        for surface in &model.surfaces {
            let assigned = surface.material.env_map.as_ref().unwrap();
            assert!(Arc::ptr_eq(assigned, &env));
            assert_eq!(surface.material.env_map_intensity, params.env_map_intensity);
        }
    }

    #[test]
    fn test_env_toggle_off_clears_every_surface() {
        let mut model = model();
        let env = env();
        apply_materials(Some(&mut model), &MaterialParams::default(), Some(&env));

        let params = MaterialParams {
            toggle_env_light: false,
            ..MaterialParams::default()
        };
        apply_materials(Some(&mut model), &params, Some(&env));

        assert!(model.surfaces.iter().all(|s| s.material.env_map.is_none()));
        assert_eq!(Arc::strong_count(&env), 1);
    }

    #[test]
    fn test_apply_is_idempotent() {
        let mut model = model();
        let env = env();
        let params = MaterialParams::default();

        let uniforms = |model: &Object| -> Vec<_> {
            model
                .surfaces
                .iter()
                .map(|s| s.material.uniform(s.receive_shadow))
                .collect()
        };

        apply_materials(Some(&mut model), &params, Some(&env));
        let first = uniforms(&model);
        apply_materials(Some(&mut model), &params, Some(&env));
        let second = uniforms(&model);

        assert_eq!(first, second);
        assert_eq!(Arc::strong_count(&env), 3);
    }

    #[test]
    fn test_full_panel_edit_leaves_frame_untouched() {
        let mut model = model();
        let env = env();
        let params = MaterialParams {
            bike_color: Color::from_hex("#00ff00").unwrap(),
            bike_metalness: 0.2,
            bike_roughness: 0.8,
            toggle_env_light: false,
            env_map_intensity: 0.5,
        };

        for _ in 0..3 {
            apply_materials(Some(&mut model), &params, Some(&env));

            let paint = &model.surfaces[0].material;
            assert_eq!(paint.color.to_hex(), "#00ff00");
            assert_eq!(paint.metalness, 0.2);
            assert_eq!(paint.roughness, 0.8);

            let frame = &model.surfaces[1].material;
            assert_eq!(frame.color.to_hex(), "#333333");
            assert_eq!(frame.metalness, 0.1);
            assert_eq!(frame.roughness, 0.9);

            for surface in &model.surfaces {
                assert!(surface.material.env_map.is_none());
                assert_eq!(surface.material.env_map_intensity, 0.5);
                assert!(surface.cast_shadow);
            }
        }
        assert_eq!(Arc::strong_count(&env), 1);
    }
}
