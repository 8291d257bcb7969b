//! Concurrent loading of the environment map and the model
//!
//! Each asset decodes on its own worker thread and reports back through a
//! oneshot channel. The two receivers are joined, so the load fails as a unit
//! when either side fails.

use std::{
    path::{Path, PathBuf},
    sync::Arc,
    thread::JoinHandle,
};

use futures::channel::oneshot;
use log::{error, info};

use super::{
    environment::EnvironmentMap,
    error::{AssetError, LoadError},
    model::load_model,
    progress::{LoadProgress, ProgressEvent},
};
use crate::config::AssetManifest;
use crate::gfx::scene::object::Object;

/// Everything the viewer needs before the model can be shown
pub struct LoadedAssets {
    pub environment: Arc<EnvironmentMap>,
    pub model: Object,
}

pub struct AssetLoader {
    manifest: AssetManifest,
}

impl AssetLoader {
    pub fn new(manifest: AssetManifest) -> Self {
        Self { manifest }
    }

    pub fn manifest(&self) -> &AssetManifest {
        &self.manifest
    }

    /// Blocks until both assets are decoded
    pub fn load(&self, progress: Arc<LoadProgress>) -> Result<LoadedAssets, LoadError> {
        pollster::block_on(self.load_async(progress))
    }

    pub async fn load_async(&self, progress: Arc<LoadProgress>) -> Result<LoadedAssets, LoadError> {
        let env_path = self.manifest.environment_map.clone();
        let model_path = self.manifest.model.clone();

        // Register both before either worker can finish
        progress.item_start(&display(&env_path));
        progress.item_start(&display(&model_path));

        let max_width = self.manifest.max_environment_width;
        let env_rx = spawn_decode("env-decode", env_path.clone(), progress.clone(), move |path| {
            EnvironmentMap::load(path, max_width)
        });

        let draco_path = self.manifest.draco_decoder_path.clone();
        let model_rx = spawn_decode("model-decode", model_path.clone(), progress, move |path| {
            load_model(path, &draco_path)
        });

        let (environment, model) = futures::future::join(env_rx, model_rx).await;

        let environment = environment
            .unwrap_or(Err(AssetError::Cancelled))
            .map_err(|source| LoadError::EnvironmentMap {
                path: env_path,
                source,
            })?;
        let model = model
            .unwrap_or(Err(AssetError::Cancelled))
            .map_err(|source| LoadError::Model {
                path: model_path,
                source,
            })?;

        Ok(LoadedAssets {
            environment: Arc::new(environment),
            model,
        })
    }

    /// Runs [`AssetLoader::load`] on a background thread
    ///
    /// `on_progress` is called from the decode workers, `on_done` once from the
    /// loader thread.
    pub fn spawn<P, D>(self, on_progress: P, on_done: D) -> std::io::Result<JoinHandle<()>>
    where
        P: Fn(ProgressEvent) + Send + Sync + 'static,
        D: FnOnce(Result<LoadedAssets, LoadError>) + Send + 'static,
    {
        std::thread::Builder::new()
            .name("asset-loader".to_string())
            .spawn(move || {
                let progress = Arc::new(LoadProgress::new(on_progress));
                let result = self.load(progress);
                match &result {
                    Ok(assets) => info!(
                        "Assets ready: {} surface(s), environment {}x{}",
                        assets.model.surfaces.len(),
                        assets.environment.width(),
                        assets.environment.height()
                    ),
                    Err(err) => error!("Asset load failed: {}", err),
                }
                on_done(result);
            })
    }
}

fn display(path: &Path) -> String {
    path.display().to_string()
}

fn spawn_decode<T, F>(
    name: &str,
    path: PathBuf,
    progress: Arc<LoadProgress>,
    decode: F,
) -> oneshot::Receiver<Result<T, AssetError>>
where
    T: Send + 'static,
    F: FnOnce(&Path) -> Result<T, AssetError> + Send + 'static,
{
    let (tx, rx) = oneshot::channel();
    let spawned = std::thread::Builder::new()
        .name(name.to_string())
        .spawn(move || {
            let url = display(&path);
            let result = decode(&path);
            match &result {
                Ok(_) => progress.item_end(&url),
                Err(_) => progress.item_error(&url),
            }
            // The receiver only disappears if the whole load was dropped
            let _ = tx.send(result);
        });

    if let Err(err) = spawned {
        // `tx` went down with the closure, so the receiver resolves as cancelled
        error!("Could not start {} worker: {}", name, err);
    }
    rx
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assets::environment::tests::write_hdr_fixture;
    use crate::assets::model::tests::{temp_dir, write_gltf_fixture};
    use std::sync::{mpsc, Mutex};

    fn manifest(dir: &Path, env: &str, model: &str) -> AssetManifest {
        AssetManifest {
            environment_map: dir.join(env),
            model: dir.join(model),
            ..AssetManifest::default()
        }
    }

    #[test]
    fn test_load_joins_both_assets() {
        let dir = temp_dir("loader-ok");
        write_hdr_fixture(&dir.join("env.hdr"));
        write_gltf_fixture(&dir.join("bike.gltf"));

        let events = Arc::new(Mutex::new(Vec::new()));
        let sink = events.clone();
        let progress = Arc::new(LoadProgress::new(move |e| sink.lock().unwrap().push(e)));

        let loader = AssetLoader::new(manifest(&dir, "env.hdr", "bike.gltf"));
        let assets = loader.load(progress.clone()).unwrap();

        assert_eq!(assets.model.surfaces.len(), 2);
        assert_eq!(assets.environment.width(), 2);
        assert_eq!(progress.fraction(), 1.0);
        assert!(events.lock().unwrap().contains(&ProgressEvent::Loaded));
    }

    #[test]
    fn test_missing_environment_names_environment() {
        let dir = temp_dir("loader-env");
        write_gltf_fixture(&dir.join("bike.gltf"));

        let loader = AssetLoader::new(manifest(&dir, "missing.hdr", "bike.gltf"));
        let progress = Arc::new(LoadProgress::silent());
        let err = loader.load(progress.clone()).err().unwrap();

        assert!(matches!(
            &err,
            LoadError::EnvironmentMap { source: AssetError::Io(_), .. }
        ));
        assert_eq!(err.path(), dir.join("missing.hdr"));
        assert!(progress.has_failed());
        assert!(progress.fraction() < 1.0);
    }

    #[test]
    fn test_missing_model_names_model() {
        let dir = temp_dir("loader-model");
        write_hdr_fixture(&dir.join("env.hdr"));

        let loader = AssetLoader::new(manifest(&dir, "env.hdr", "missing.glb"));
        let err = loader.load(Arc::new(LoadProgress::silent())).err().unwrap();
        assert!(matches!(err, LoadError::Model { .. }));
    }

    #[test]
    fn test_environment_error_wins_when_both_fail() {
        let dir = temp_dir("loader-both");
        let loader = AssetLoader::new(manifest(&dir, "nope.hdr", "nope.glb"));
        let err = loader.load(Arc::new(LoadProgress::silent())).err().unwrap();
        assert!(matches!(err, LoadError::EnvironmentMap { .. }));
    }

    #[test]
    fn test_spawn_reports_completion() {
        let dir = temp_dir("loader-spawn");
        write_hdr_fixture(&dir.join("env.hdr"));
        write_gltf_fixture(&dir.join("bike.gltf"));

        let (tx, rx) = mpsc::channel();
        let handle = AssetLoader::new(manifest(&dir, "env.hdr", "bike.gltf"))
            .spawn(|_| {}, move |result| tx.send(result.is_ok()).unwrap())
            .unwrap();
        handle.join().unwrap();
        assert!(rx.recv().unwrap());
    }
}
