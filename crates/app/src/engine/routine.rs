use std::sync::Arc;

use routines_domain::error::{HydrationError, RoutinesError};
use routines_domain::routine::{Resource, RoutineConfig};

use super::driver::SignalSender;
use crate::action::Action;
use crate::ports::Capabilities;
use crate::trigger::{Trigger, TriggerContext, TriggerEvent};

/// A routine hydrated into live triggers and actions.
pub(super) struct LiveRoutine<C> {
    pub(super) config: RoutineConfig,
    pub(super) triggers: Vec<Trigger<C>>,
    pub(super) actions: Vec<Action>,
    pub(super) active: bool,
}

impl<C: Capabilities> LiveRoutine<C> {
    /// Build every trigger and action of `config`.
    ///
    /// Each trigger's `Triggered` notifications are forwarded to `signals`.
    pub(super) fn hydrate(
        config: RoutineConfig,
        capabilities: &Arc<C>,
        context: &TriggerContext,
        signals: &SignalSender,
    ) -> Result<Self, RoutinesError> {
        config.validate()?;
        let triggers = config
            .triggers
            .iter()
            .map(|trigger| {
                let trigger = Trigger::new(trigger, Arc::clone(capabilities), context.clone())?;
                let signals = signals.clone();
                trigger.events().subscribe(move |event| {
                    if *event == TriggerEvent::Triggered {
                        signals.notify();
                    }
                });
                Ok(trigger)
            })
            .collect::<Result<Vec<_>, HydrationError>>()?;
        let actions = config
            .actions
            .iter()
            .map(Action::new)
            .collect::<Result<Vec<_>, HydrationError>>()?;
        Ok(Self {
            config,
            triggers,
            actions,
            active: false,
        })
    }

    pub(super) async fn activate_triggers(&mut self) {
        for trigger in &mut self.triggers {
            if let Err(err) = trigger.activate().await {
                tracing::warn!(
                    routine = %self.config.name,
                    trigger = %trigger.id(),
                    error = %err,
                    "trigger activation failed, will retry on next evaluation",
                );
            }
        }
    }

    pub(super) fn deactivate_triggers(&mut self) {
        for trigger in &mut self.triggers {
            trigger.deactivate();
        }
    }

    pub(super) fn resources(&self) -> impl Iterator<Item = Resource> + '_ {
        self.actions
            .iter()
            .flat_map(|action| action.kind().resources().iter().copied())
    }
}
