//! Live actions.
//!
//! An [`Action`] performs its forward effect with [`Action::execute`] and
//! undoes it with [`Action::revert`]. What "undo" means depends on the
//! type: some actions remember the previous value on the instance, some
//! capture it through the [`StateManager`] so it survives a restart, and
//! one-shot actions cannot be undone at all.

mod clipboard;
mod connection;
mod function;
mod settings;

use routines_domain::error::{HydrationError, RoutinesError};
use routines_domain::id::{ActionId, RoutineId};
use routines_domain::routine::{ActionConfig, ActionSpec, ActionType, DeactivatePolicy};

use self::clipboard::ClipboardEditor;
use crate::ports::{Capabilities, StateStore};
use crate::state_manager::StateManager;

/// What an action may touch while running.
pub struct ActionContext<'a, C, S> {
    pub capabilities: &'a C,
    pub states: &'a mut StateManager<S>,
    pub routine_id: &'a RoutineId,
}

/// Value remembered on the instance for a later revert.
#[derive(Debug, Clone, PartialEq)]
enum Previous {
    Switch(bool),
    Slider(u8),
    Wallpaper(String),
    /// The action established a connection that did not exist before.
    Connected,
}

/// How an action is handled when its routine deactivates.
pub enum Deactivation<'a> {
    Keep,
    /// The action has nothing to undo.
    Skip,
    Revert,
    Custom(&'a mut Action),
}

pub struct Action {
    id: ActionId,
    kind: ActionType,
    spec: ActionSpec,
    policy: DeactivatePolicy,
    custom: Option<Box<Action>>,
    clipboard: Option<ClipboardEditor>,
    previous: Option<Previous>,
}

impl Action {
    /// Hydrate an action from its configuration.
    ///
    /// A custom deactivation payload is hydrated too, as an action of the
    /// same type.
    ///
    /// # Errors
    ///
    /// Returns a [`HydrationError`] when either payload does not fit the
    /// action type, or a clipboard pattern is not a valid regex.
    pub fn new(config: &ActionConfig) -> Result<Self, HydrationError> {
        let (policy, custom) = match &config.on_deactivate {
            None => (DeactivatePolicy::Revert, None),
            Some(on_deactivate) => {
                let custom = match (on_deactivate.policy, &on_deactivate.config) {
                    (DeactivatePolicy::Custom, Some(custom)) => Some(Box::new(Self::build(
                        config.id.clone(),
                        config.kind,
                        ActionSpec::parse(config.kind, &config.id, custom)?,
                        DeactivatePolicy::Keep,
                    )?)),
                    _ => None,
                };
                (on_deactivate.policy, custom)
            }
        };
        let spec = ActionSpec::parse(config.kind, &config.id, &config.config)?;
        let mut action = Self::build(config.id.clone(), config.kind, spec, policy)?;
        action.custom = custom;
        Ok(action)
    }

    fn build(
        id: ActionId,
        kind: ActionType,
        spec: ActionSpec,
        policy: DeactivatePolicy,
    ) -> Result<Self, HydrationError> {
        let clipboard = match &spec {
            ActionSpec::Clipboard(config) => Some(ClipboardEditor::new(&id, config)?),
            _ => None,
        };
        Ok(Self {
            id,
            kind,
            spec,
            policy,
            custom: None,
            clipboard,
            previous: None,
        })
    }

    #[must_use]
    pub fn id(&self) -> &ActionId {
        &self.id
    }

    #[must_use]
    pub fn kind(&self) -> ActionType {
        self.kind
    }

    /// Decide what deactivation does with this action.
    ///
    /// `custom` without a payload falls back to reverting.
    pub fn deactivation(&mut self) -> Deactivation<'_> {
        match (self.policy, self.custom.as_deref_mut()) {
            (DeactivatePolicy::Keep, _) => Deactivation::Keep,
            (DeactivatePolicy::Custom, Some(custom)) => Deactivation::Custom(custom),
            _ if !self.kind.can_revert() => Deactivation::Skip,
            _ => Deactivation::Revert,
        }
    }

    /// Perform the forward effect.
    ///
    /// # Errors
    ///
    /// Returns the capability or storage error that stopped the action.
    pub async fn execute<C: Capabilities, S: StateStore>(
        &mut self,
        ctx: &mut ActionContext<'_, C, S>,
    ) -> Result<(), RoutinesError> {
        tracing::debug!(action = %self.id, kind = %self.kind, "executing action");
        match &self.spec {
            ActionSpec::Wallpaper { .. }
            | ActionSpec::DoNotDisturb { .. }
            | ActionSpec::Volume { .. }
            | ActionSpec::Brightness { .. }
            | ActionSpec::KeyboardBrightness { .. }
            | ActionSpec::WifiPower { .. }
            | ActionSpec::BluetoothPower { .. }
            | ActionSpec::AirplaneMode { .. }
            | ActionSpec::PowerSaver { .. }
            | ActionSpec::DarkMode { .. }
            | ActionSpec::NightLight { .. }
            | ActionSpec::ScreenTimeout { .. }
            | ActionSpec::RefreshRate { .. }
            | ActionSpec::ScreenOrientation { .. } => {
                settings::apply(&self.spec, &mut self.previous, ctx).await
            }
            ActionSpec::ConnectWifi(_)
            | ActionSpec::ConnectBluetooth { .. }
            | ActionSpec::DisconnectBluetooth { .. } => {
                connection::apply(&self.spec, &mut self.previous, ctx.capabilities).await
            }
            ActionSpec::Clipboard(_) => match &self.clipboard {
                Some(editor) => editor.apply(ctx.capabilities).await,
                None => Ok(()),
            },
            ActionSpec::OpenLink { .. }
            | ActionSpec::TakeScreenshot
            | ActionSpec::OpenApp { .. }
            | ActionSpec::Notification { .. }
            | ActionSpec::ExecuteCommand { .. } => function::run(&self.spec, ctx.capabilities).await,
        }
    }

    /// Undo the forward effect as far as the type allows.
    ///
    /// # Errors
    ///
    /// Returns the capability or storage error that stopped the revert.
    pub async fn revert<C: Capabilities, S: StateStore>(
        &mut self,
        ctx: &mut ActionContext<'_, C, S>,
    ) -> Result<(), RoutinesError> {
        if !self.kind.can_revert() {
            return Ok(());
        }
        tracing::debug!(action = %self.id, kind = %self.kind, "reverting action");
        match &self.spec {
            ActionSpec::ConnectWifi(_)
            | ActionSpec::ConnectBluetooth { .. }
            | ActionSpec::DisconnectBluetooth { .. } => {
                connection::revert(&self.spec, &mut self.previous, ctx.capabilities).await
            }
            _ => settings::revert(&self.spec, &mut self.previous, ctx).await,
        }
    }
}

#[cfg(test)]
mod tests;
