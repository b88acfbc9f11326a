//! One-shot functions. None of these can be reverted.

use routines_domain::error::RoutinesError;
use routines_domain::routine::ActionSpec;

use crate::ports::Capabilities;

pub(super) async fn run<C: Capabilities>(spec: &ActionSpec, desktop: &C) -> Result<(), RoutinesError> {
    match spec {
        ActionSpec::OpenLink { url } => desktop.open_link(url).await?,
        ActionSpec::TakeScreenshot => desktop.take_screenshot().await?,
        ActionSpec::OpenApp { app_ids } => {
            for app_id in app_ids {
                desktop.launch_app(app_id).await?;
            }
        }
        ActionSpec::Notification { title, message } => desktop.notify(title, message).await?,
        ActionSpec::ExecuteCommand { command } => {
            tracing::info!(command = %command, "running command");
            desktop.execute_command(command).await?;
        }
        _ => {}
    }
    Ok(())
}
