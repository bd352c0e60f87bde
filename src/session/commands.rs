use std::path::PathBuf;

use crate::{
    acquisition::AcquisitionMode,
    models::Track,
    playback::PreviewAction,
    session::{SessionController, SessionSnapshot, SessionState},
    settings::AppSettings,
};

use crate::AppState;

fn controller_from_state(state: &AppState) -> SessionController {
    state.session.clone()
}

pub async fn get_session_snapshot(state: &AppState) -> Result<SessionSnapshot, String> {
    let controller = controller_from_state(state);
    Ok(controller.snapshot().await)
}

pub async fn select_mode(state: &AppState, mode: AcquisitionMode) -> Result<SessionState, String> {
    let controller = controller_from_state(state);
    controller.select_mode(mode).await.map_err(|e| e.to_string())
}

pub async fn deselect_mode(state: &AppState) -> Result<SessionState, String> {
    let controller = controller_from_state(state);
    controller.deselect_mode().await.map_err(|e| e.to_string())
}

pub async fn start_camera(state: &AppState) -> Result<SessionState, String> {
    let controller = controller_from_state(state);
    controller.start_camera().await.map_err(|e| e.to_string())
}

pub async fn stop_camera(state: &AppState) -> Result<SessionState, String> {
    let controller = controller_from_state(state);
    controller.stop_camera().await.map_err(|e| e.to_string())
}

pub async fn reload_camera(state: &AppState) -> Result<SessionState, String> {
    let controller = controller_from_state(state);
    controller.reload_camera().await.map_err(|e| e.to_string())
}

pub async fn capture_and_analyze(state: &AppState) -> Result<SessionState, String> {
    let controller = controller_from_state(state);
    controller
        .capture_and_analyze()
        .await
        .map_err(|e| e.to_string())
}

pub async fn submit_file(state: &AppState, path: PathBuf) -> Result<SessionState, String> {
    let controller = controller_from_state(state);
    controller.submit_file(path).await.map_err(|e| e.to_string())
}

pub async fn get_recommendations(state: &AppState) -> Result<Vec<Track>, String> {
    let controller = controller_from_state(state);
    Ok(controller.recommendations().await)
}

pub async fn select_preview(state: &AppState, track_id: String) -> Result<PreviewAction, String> {
    let controller = controller_from_state(state);
    controller
        .select_preview(&track_id)
        .await
        .map_err(|e| e.to_string())
}

pub async fn open_external(state: &AppState, track_id: String) -> Result<(), String> {
    let controller = controller_from_state(state);
    controller
        .open_external(&track_id)
        .await
        .map_err(|e| e.to_string())
}

/// Applies the volume and remembers it for the next launch.
pub async fn set_volume(state: &AppState, volume: f32) -> Result<f32, String> {
    let volume = volume.clamp(0.0, 1.0);
    state.session.set_volume(volume);
    state
        .settings
        .update(|settings| settings.playback.volume = volume)
        .map_err(|e| e.to_string())?;
    Ok(volume)
}

pub fn get_settings(state: &AppState) -> Result<AppSettings, String> {
    Ok(state.settings.current())
}
