use std::sync::Arc;

use log::{error, info};
use tauri::{AppHandle, Emitter, Manager, State};

use crate::{
    canvas::RawSurface,
    config::PadConfig,
    model::ModelProvider,
    session::SessionController,
    view::{Notice, PadView},
    AppState,
};

pub(crate) const VIEW_CHANGED_EVENT: &str = "pad-view-changed";

/// Where the desktop session is in its startup.
pub(crate) enum SessionSlot {
    Loading,
    Ready(SessionController),
    Failed(PadView),
}

fn loading_view(config: &PadConfig) -> PadView {
    PadView::unavailable(
        config.default_stroke_width,
        Notice::info("Loading the model..."),
    )
}

async fn controller_from_state(state: &State<'_, AppState>) -> Result<SessionController, String> {
    match &*state.session.read().await {
        SessionSlot::Ready(controller) => Ok(controller.clone()),
        SessionSlot::Loading => Err("the model is still loading".into()),
        SessionSlot::Failed(_) => Err("the model is unavailable".into()),
    }
}

fn emit_view(app_handle: &AppHandle, view: &PadView) {
    let _ = app_handle.emit(VIEW_CHANGED_EVENT, view);
}

/// Loads the model off the UI thread and fills the session slot. The window
/// shows a loading view until this finishes.
pub(crate) fn spawn_session_start(
    app_handle: AppHandle,
    provider: Arc<ModelProvider>,
    config: PadConfig,
) {
    tauri::async_runtime::spawn(async move {
        let view = match SessionController::start(&provider, &config).await {
            Ok(controller) => {
                info!("Model ready, predictions enabled");
                let mut view = controller.view().await;
                if let Some(state) = app_handle.try_state::<AppState>() {
                    *state.session.write().await = SessionSlot::Ready(controller);
                }
                view.notices.push(Notice::success("Model loaded"));
                view
            }
            Err(err) => {
                error!("Session could not start: {err}");
                let view = PadView::startup_failure(&err, config.default_stroke_width);
                if let Some(state) = app_handle.try_state::<AppState>() {
                    *state.session.write().await = SessionSlot::Failed(view.clone());
                }
                view
            }
        };
        emit_view(&app_handle, &view);
    });
}

#[tauri::command]
pub async fn get_view(state: State<'_, AppState>) -> Result<PadView, String> {
    let slot = state.session.read().await;
    Ok(match &*slot {
        SessionSlot::Ready(controller) => controller.view().await,
        SessionSlot::Loading => loading_view(&state.config),
        SessionSlot::Failed(view) => view.clone(),
    })
}

#[tauri::command]
pub async fn submit_stroke(
    state: State<'_, AppState>,
    app_handle: AppHandle,
    image_data: Option<Vec<u8>>,
    width: u32,
    height: u32,
) -> Result<PadView, String> {
    let controller = controller_from_state(&state).await?;
    let surface = image_data.and_then(|data| RawSurface::from_rgba(width, height, data));
    let view = controller.submit_stroke(surface).await;
    emit_view(&app_handle, &view);
    Ok(view)
}

#[tauri::command]
pub async fn clear_canvas(
    state: State<'_, AppState>,
    app_handle: AppHandle,
) -> Result<PadView, String> {
    let controller = controller_from_state(&state).await?;
    let view = controller.clear().await;
    emit_view(&app_handle, &view);
    Ok(view)
}

#[tauri::command]
pub async fn save_drawing(state: State<'_, AppState>) -> Result<PadView, String> {
    let controller = controller_from_state(&state).await?;
    Ok(controller.save().await)
}

#[tauri::command]
pub async fn set_stroke_width(
    state: State<'_, AppState>,
    app_handle: AppHandle,
    width: u32,
) -> Result<PadView, String> {
    let controller = controller_from_state(&state).await?;
    let view = controller
        .set_stroke_width(width)
        .await
        .map_err(|e| e.to_string())?;
    emit_view(&app_handle, &view);
    Ok(view)
}

/// After a failed start, tries the download and load again.
#[tauri::command]
pub async fn retry_model_load(
    state: State<'_, AppState>,
    app_handle: AppHandle,
) -> Result<(), String> {
    {
        let mut slot = state.session.write().await;
        if !matches!(*slot, SessionSlot::Failed(_)) {
            return Ok(());
        }
        *slot = SessionSlot::Loading;
    }
    spawn_session_start(app_handle, state.provider.clone(), state.config.clone());
    Ok(())
}
