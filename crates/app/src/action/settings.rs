//! Desktop settings: switches, sliders, wallpaper and screen parameters.

use routines_domain::desktop::{Slider, Switch};
use routines_domain::error::RoutinesError;
use routines_domain::routine::ActionSpec;
use serde_json::{Value, json};

use super::{ActionContext, Previous};
use crate::ports::{Capabilities, StateStore};

const DARK_MODE_KEY: &str = "dark_mode";
const NIGHT_LIGHT_KEY: &str = "night_light";
const SCREEN_TIMEOUT_KEY: &str = "screen_timeout";
const REFRESH_RATE_KEY: &str = "refresh_rate";

/// Where a setting's previous value is kept.
enum Target {
    /// Remembered on the instance.
    Switch(Switch, bool),
    Slider(Slider, u8),
    /// Not remembered; reverting applies the inverse.
    Inverse(Switch, bool),
    /// Captured through the state manager under a key.
    CapturedSwitch(Switch, bool, &'static str),
}

fn target(spec: &ActionSpec) -> Option<Target> {
    let target = match *spec {
        ActionSpec::DoNotDisturb { enabled } => Target::Switch(Switch::DoNotDisturb, enabled),
        ActionSpec::WifiPower { enabled } => Target::Switch(Switch::Wifi, enabled),
        ActionSpec::BluetoothPower { enabled } => Target::Switch(Switch::Bluetooth, enabled),
        ActionSpec::Volume { level } => Target::Slider(Slider::Volume, level),
        ActionSpec::Brightness { level } => Target::Slider(Slider::Brightness, level),
        ActionSpec::KeyboardBrightness { level } => Target::Slider(Slider::KeyboardBrightness, level),
        ActionSpec::AirplaneMode { enabled } => Target::Inverse(Switch::AirplaneMode, enabled),
        ActionSpec::PowerSaver { enabled } => Target::Inverse(Switch::PowerSaver, enabled),
        ActionSpec::DarkMode { enabled } => {
            Target::CapturedSwitch(Switch::DarkMode, enabled, DARK_MODE_KEY)
        }
        ActionSpec::NightLight { enabled } => {
            Target::CapturedSwitch(Switch::NightLight, enabled, NIGHT_LIGHT_KEY)
        }
        _ => return None,
    };
    Some(target)
}

/// Remember the first previous value until the next revert.
fn remember(previous: &mut Option<Previous>, value: Previous) {
    if previous.is_none() {
        *previous = Some(value);
    }
}

pub(super) async fn apply<C: Capabilities, S: StateStore>(
    spec: &ActionSpec,
    previous: &mut Option<Previous>,
    ctx: &mut ActionContext<'_, C, S>,
) -> Result<(), RoutinesError> {
    let desktop = ctx.capabilities;
    if let Some(target) = target(spec) {
        match target {
            Target::Switch(switch, on) => {
                remember(previous, Previous::Switch(desktop.switch(switch).await?));
                desktop.set_switch(switch, on).await?;
            }
            Target::Slider(slider, level) => {
                remember(previous, Previous::Slider(desktop.slider(slider).await?));
                desktop.set_slider(slider, level).await?;
            }
            Target::Inverse(switch, on) => desktop.set_switch(switch, on).await?,
            Target::CapturedSwitch(switch, on, key) => {
                let current = desktop.switch(switch).await?;
                ctx.states.save_state(ctx.routine_id, key, json!(current)).await?;
                desktop.set_switch(switch, on).await?;
            }
        }
        return Ok(());
    }

    match spec {
        ActionSpec::Wallpaper { uri } => {
            remember(previous, Previous::Wallpaper(desktop.wallpaper().await?));
            desktop.set_wallpaper(uri).await?;
        }
        ActionSpec::ScreenTimeout { seconds } => {
            let current = desktop.screen_timeout().await?;
            ctx.states
                .save_state(ctx.routine_id, SCREEN_TIMEOUT_KEY, json!(current))
                .await?;
            desktop.set_screen_timeout(*seconds).await?;
        }
        ActionSpec::RefreshRate { rate } => {
            let current = desktop.refresh_rate().await?;
            ctx.states
                .save_state(ctx.routine_id, REFRESH_RATE_KEY, json!(current))
                .await?;
            desktop.set_refresh_rate(*rate).await?;
        }
        ActionSpec::ScreenOrientation { orientation } => {
            desktop.set_screen_orientation(*orientation).await?;
        }
        _ => {}
    }
    Ok(())
}

pub(super) async fn revert<C: Capabilities, S: StateStore>(
    spec: &ActionSpec,
    previous: &mut Option<Previous>,
    ctx: &mut ActionContext<'_, C, S>,
) -> Result<(), RoutinesError> {
    let desktop = ctx.capabilities;
    if let Some(target) = target(spec) {
        match (target, previous.take()) {
            (Target::Switch(switch, _), Some(Previous::Switch(on))) => {
                desktop.set_switch(switch, on).await?;
            }
            (Target::Slider(slider, _), Some(Previous::Slider(level))) => {
                desktop.set_slider(slider, level).await?;
            }
            (Target::Inverse(switch, on), _) => desktop.set_switch(switch, !on).await?,
            (Target::CapturedSwitch(switch, _, key), _) => {
                if let Some(on) = restored(ctx, key).and_then(|value| value.as_bool()) {
                    desktop.set_switch(switch, on).await?;
                }
            }
            _ => tracing::debug!("nothing remembered to revert"),
        }
        return Ok(());
    }

    match spec {
        ActionSpec::Wallpaper { .. } => {
            if let Some(Previous::Wallpaper(uri)) = previous.take() {
                desktop.set_wallpaper(&uri).await?;
            }
        }
        ActionSpec::ScreenTimeout { .. } => {
            let seconds = restored(ctx, SCREEN_TIMEOUT_KEY)
                .and_then(|value| value.as_u64())
                .and_then(|seconds| u32::try_from(seconds).ok());
            if let Some(seconds) = seconds {
                desktop.set_screen_timeout(seconds).await?;
            }
        }
        ActionSpec::RefreshRate { .. } => {
            if let Some(rate) = restored(ctx, REFRESH_RATE_KEY).and_then(|value| value.as_f64()) {
                desktop.set_refresh_rate(rate).await?;
            }
        }
        ActionSpec::ScreenOrientation { orientation } => {
            // The orientation before execution is not known; assume the other one.
            desktop.set_screen_orientation(orientation.toggled()).await?;
        }
        _ => {}
    }
    Ok(())
}

fn restored<C, S: StateStore>(ctx: &ActionContext<'_, C, S>, key: &str) -> Option<Value> {
    let value = ctx.states.restore_state(ctx.routine_id, key);
    if value.is_none() {
        tracing::debug!(routine = %ctx.routine_id, key, "no captured value to restore");
    }
    value
}
