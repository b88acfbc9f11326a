//! ALL / ANY combination of trigger checks.

use routines_domain::routine::MatchType;

use crate::ports::Capabilities;
use crate::trigger::Trigger;

/// Whether a routine with these triggers should be active now.
///
/// Checks short-circuit, so an event-latched trigger after the deciding one
/// keeps its latch. A routine without triggers is never satisfied.
pub(super) async fn is_satisfied<C: Capabilities>(
    match_type: MatchType,
    triggers: &[Trigger<C>],
) -> bool {
    if triggers.is_empty() {
        return false;
    }
    match match_type {
        MatchType::All => {
            for trigger in triggers {
                if !trigger.check().await {
                    return false;
                }
            }
            true
        }
        MatchType::Any => {
            for trigger in triggers {
                if trigger.check().await {
                    return true;
                }
            }
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use routines_domain::routine::{TriggerConfig, TriggerType};
    use serde_json::json;

    use super::*;
    use crate::ports::{FakeClock, ManualScheduler};
    use crate::testing::FakeDesktop;
    use crate::trigger::{TriggerContext, TriggerSettings};

    fn flag(desktop: &Arc<FakeDesktop>, kind: TriggerType, expected: bool) -> Trigger<FakeDesktop> {
        let context = TriggerContext {
            clock: Arc::new(FakeClock::default()),
            scheduler: Arc::new(ManualScheduler::new()),
            settings: TriggerSettings::default(),
        };
        Trigger::new(
            &TriggerConfig::new(kind, json!({"state": expected})),
            Arc::clone(desktop),
            context,
        )
        .unwrap()
    }

    #[tokio::test]
    async fn should_never_match_when_there_are_no_triggers() {
        assert!(!is_satisfied::<FakeDesktop>(MatchType::All, &[]).await);
        assert!(!is_satisfied::<FakeDesktop>(MatchType::Any, &[]).await);
    }

    #[tokio::test]
    async fn should_require_every_trigger_when_match_is_all() {
        let desktop = Arc::new(FakeDesktop::default());
        let triggers = [
            flag(&desktop, TriggerType::DarkMode, true),
            flag(&desktop, TriggerType::Headphones, true),
        ];
        desktop.simulate_headphones(true);
        assert!(!is_satisfied(MatchType::All, &triggers).await);

        desktop.simulate_switch(routines_domain::desktop::Switch::DarkMode, true);
        assert!(is_satisfied(MatchType::All, &triggers).await);
    }

    #[tokio::test]
    async fn should_accept_single_trigger_when_match_is_any() {
        let desktop = Arc::new(FakeDesktop::default());
        let triggers = [
            flag(&desktop, TriggerType::DarkMode, true),
            flag(&desktop, TriggerType::Headphones, true),
        ];
        assert!(!is_satisfied(MatchType::Any, &triggers).await);

        desktop.simulate_headphones(true);
        assert!(is_satisfied(MatchType::Any, &triggers).await);
    }
}
