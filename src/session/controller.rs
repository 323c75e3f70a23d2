use std::sync::Arc;

use log::{debug, info};
use tokio::sync::Mutex;

use crate::canvas::{CanvasPreprocessor, RawSurface};
use crate::config::PadConfig;
use crate::error::Result;
use crate::gate::PredictionGate;
use crate::model::{Classifier, ModelProvider};
use crate::settings::SettingsStore;
use crate::view::{Notice, PadView};

use super::{SessionState, SessionStatus};

pub const SAVE_UNAVAILABLE: &str = "Saving is not available right now";

/// One user's drawing session. Every control event runs a full cycle under
/// the session lock, so cycles never overlap.
#[derive(Clone)]
pub struct SessionController {
    state: Arc<Mutex<SessionState>>,
    settings: Arc<SettingsStore>,
    model: Arc<dyn Classifier>,
    preprocessor: CanvasPreprocessor,
    gate: PredictionGate,
}

impl SessionController {
    /// Fails with `ModelUnavailable` when no classifier can be had; the
    /// session must not start without one.
    pub async fn start(provider: &ModelProvider, config: &PadConfig) -> Result<Self> {
        config.validate()?;
        let model = provider.get_model().await?;
        info!("Session started");
        Ok(Self::with_model(model, config))
    }

    pub fn with_model(model: Arc<dyn Classifier>, config: &PadConfig) -> Self {
        Self {
            state: Arc::new(Mutex::new(SessionState::new())),
            settings: Arc::new(SettingsStore::new(config)),
            model,
            preprocessor: CanvasPreprocessor::from_config(config),
            gate: PredictionGate::from_config(config),
        }
    }

    pub async fn state(&self) -> SessionState {
        self.state.lock().await.clone()
    }

    pub async fn view(&self) -> PadView {
        let state = self.state.lock().await;
        self.render(&state, Vec::new())
    }

    /// The widget's latest bitmap, or `None` when it had nothing to give.
    pub async fn submit_stroke(&self, surface: Option<RawSurface>) -> PadView {
        let mut state = self.state.lock().await;
        let before = state.status;

        let failure = state.draw_cycle(
            surface.as_ref(),
            &self.preprocessor,
            &self.gate,
            self.model.as_ref(),
        );

        let notices = match failure {
            Some(err) => vec![Notice::prediction_failed(&err)],
            None => Vec::new(),
        };

        if before != state.status {
            debug!("Session {:?} -> {:?}", before, state.status);
        }

        self.render(&state, notices)
    }

    pub async fn clear(&self) -> PadView {
        let mut state = self.state.lock().await;
        state.clear();
        self.render(&state, Vec::new())
    }

    pub async fn set_stroke_width(&self, width: u32) -> Result<PadView> {
        let state = self.state.lock().await;
        self.settings.update_stroke_width(width)?;
        Ok(self.render(&state, Vec::new()))
    }

    /// Placeholder: nothing is stored, the user is told so.
    pub async fn save(&self) -> PadView {
        let state = self.state.lock().await;
        self.render(&state, vec![Notice::info(SAVE_UNAVAILABLE)])
    }

    pub async fn status(&self) -> SessionStatus {
        self.state.lock().await.status
    }

    fn render(&self, state: &SessionState, notices: Vec<Notice>) -> PadView {
        PadView::from_state(state, self.settings.stroke_width(), notices)
    }
}
