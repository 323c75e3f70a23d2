pub mod canvas;
pub mod config;
pub mod error;
pub mod gate;
pub mod model;
pub mod session;
pub mod settings;
pub mod view;
mod utils;

#[cfg(feature = "desktop")]
mod commands;

pub use canvas::{CanvasPreprocessor, FeatureVector, RawSurface};
pub use config::{ModelConfig, PadConfig};
pub use error::{DigitError, Result};
pub use gate::{GateOutcome, PredictionGate};
pub use model::{Classifier, ModelProvider, Probabilities, RemoteStore, SoftmaxModel};
pub use session::{SessionController, SessionState, SessionStatus};
pub use view::{Notice, NoticeLevel, PadView};

#[cfg(feature = "desktop")]
pub(crate) struct AppState {
    pub(crate) provider: std::sync::Arc<ModelProvider>,
    pub(crate) config: PadConfig,
    pub(crate) session: tokio::sync::RwLock<commands::SessionSlot>,
}

#[cfg(feature = "desktop")]
#[cfg_attr(mobile, tauri::mobile_entry_point)]
pub fn run() {
    use std::sync::Arc;

    use anyhow::Context;
    use commands::{
        clear_canvas, get_view, retry_model_load, save_drawing, set_stroke_width, submit_stroke,
        SessionSlot,
    };
    use tauri::Manager;

    // Initialize logging (reads RUST_LOG env var)
    env_logger::Builder::from_default_env()
        .filter_level(log::LevelFilter::Info)
        .init();

    log::info!("digitpad starting up...");

    tauri::Builder::default()
        .setup(|app| {
            let result = (|| -> anyhow::Result<()> {
                let app_data_dir = app
                    .path()
                    .app_data_dir()
                    .map_err(|err| anyhow::anyhow!(err))?;
                std::fs::create_dir_all(&app_data_dir).with_context(|| {
                    format!("Failed to create {}", app_data_dir.display())
                })?;

                let mut config = PadConfig::default();
                if config.model.local_path.is_relative() {
                    config.model.local_path = app_data_dir.join(&config.model.local_path);
                }
                config.validate()?;
                log::info!("Model artifact path: {}", config.model.local_path.display());

                let provider = Arc::new(ModelProvider::new(config.model.clone()));

                app.manage(AppState {
                    provider: provider.clone(),
                    config: config.clone(),
                    session: tokio::sync::RwLock::new(SessionSlot::Loading),
                });

                // The download can take a while; the window shows a loading
                // view and gets a pad-view-changed event once it is done.
                commands::spawn_session_start(app.handle().clone(), provider, config);

                Ok(())
            })();

            result.map_err(|err| err.into())
        })
        .invoke_handler(tauri::generate_handler![
            get_view,
            submit_stroke,
            clear_canvas,
            save_drawing,
            set_stroke_width,
            retry_model_load,
        ])
        .run(tauri::generate_context!())
        .expect("error while running tauri application");
}
