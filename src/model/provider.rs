use std::{
    ffi::OsString,
    path::{Path, PathBuf},
    sync::Arc,
};

use log::{error, info};
use tokio::sync::OnceCell;

use crate::config::ModelConfig;
use crate::error::{DigitError, Result};

use super::classifier::{Classifier, SoftmaxModel};
use super::remote::{DriveStore, RemoteStore};

/// Loads the classifier at most once per process and hands out the shared
/// handle afterwards.
///
/// Concurrent first callers wait on the same initialization. A failed load
/// leaves nothing cached, so the next session start tries again.
pub struct ModelProvider {
    config: ModelConfig,
    store: Arc<dyn RemoteStore>,
    model: OnceCell<Arc<dyn Classifier>>,
}

impl ModelProvider {
    pub fn new(config: ModelConfig) -> Self {
        let store = Arc::new(DriveStore::new(&config));
        Self::with_store(config, store)
    }

    pub fn with_store(config: ModelConfig, store: Arc<dyn RemoteStore>) -> Self {
        Self {
            config,
            store,
            model: OnceCell::new(),
        }
    }

    pub fn is_loaded(&self) -> bool {
        self.model.initialized()
    }

    pub fn cached(&self) -> Option<Arc<dyn Classifier>> {
        self.model.get().cloned()
    }

    pub async fn get_model(&self) -> Result<Arc<dyn Classifier>> {
        self.model
            .get_or_try_init(|| self.load())
            .await
            .cloned()
    }

    async fn load(&self) -> Result<Arc<dyn Classifier>> {
        let path = self.config.local_path.clone();

        if !file_exists(&path).await {
            if let Err(err) = self.download(&path).await {
                error!("Model download failed: {err}");
                return Err(err);
            }
        }

        let load_path = path.clone();
        let model = tokio::task::spawn_blocking(move || SoftmaxModel::load(&load_path))
            .await
            .map_err(|e| DigitError::model_unavailable(format!("model loader stopped: {e}")))??;

        info!("Model loaded from {}", path.display());
        Ok(Arc::new(model))
    }

    async fn download(&self, path: &Path) -> Result<()> {
        let Some(file_id) = self.config.file_id.clone() else {
            return Err(DigitError::model_unavailable(format!(
                "{} is missing and no remote file id is configured; place a model file there",
                path.display()
            )));
        };

        info!("Model not found at {}, downloading", path.display());

        let store = self.store.clone();
        let bytes = tokio::task::spawn_blocking(move || store.fetch(&file_id))
            .await
            .map_err(|e| DigitError::model_unavailable(format!("download task stopped: {e}")))?
            .map_err(|e| DigitError::model_unavailable(e.to_string()))?;

        if bytes.is_empty() {
            return Err(DigitError::model_unavailable("store returned an empty file"));
        }

        // Only a loadable artifact may reach the final path; anything else
        // would pass the presence check on every later start.
        let text = std::str::from_utf8(&bytes).map_err(|e| {
            DigitError::model_unavailable(format!("downloaded artifact is not text: {e}"))
        })?;
        SoftmaxModel::from_json(text)?;

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| unavailable_io("creating", parent, e))?;
        }

        // Write beside the target and rename, so an interrupted write never
        // passes the presence check either.
        let partial = partial_path(path);
        if let Err(err) = write_then_rename(&partial, path, &bytes).await {
            let _ = tokio::fs::remove_file(&partial).await;
            return Err(err);
        }

        if !file_exists(path).await {
            return Err(DigitError::model_unavailable(format!(
                "{} is missing after download",
                path.display()
            )));
        }

        info!("Model downloaded ({} bytes)", bytes.len());
        Ok(())
    }
}

async fn file_exists(path: &Path) -> bool {
    tokio::fs::metadata(path)
        .await
        .map(|meta| meta.is_file())
        .unwrap_or(false)
}

async fn write_then_rename(partial: &Path, path: &Path, bytes: &[u8]) -> Result<()> {
    tokio::fs::write(partial, bytes)
        .await
        .map_err(|e| unavailable_io("writing", partial, e))?;
    tokio::fs::rename(partial, path)
        .await
        .map_err(|e| unavailable_io("moving into place", path, e))
}

fn partial_path(path: &Path) -> PathBuf {
    let mut name = OsString::from(path.as_os_str());
    name.push(".part");
    PathBuf::from(name)
}

fn unavailable_io(action: &str, path: &Path, err: std::io::Error) -> DigitError {
    DigitError::model_unavailable(format!("{action} {}: {err}", path.display()))
}
