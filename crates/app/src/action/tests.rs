use std::sync::Arc;

use routines_domain::desktop::{ClipboardContent, ScreenOrientation, Slider, Switch};
use serde_json::{Value, json};

use super::*;
use crate::testing::{FakeDesktop, MemoryStore};

struct Harness {
    desktop: FakeDesktop,
    states: StateManager<MemoryStore>,
    routine_id: RoutineId,
}

impl Harness {
    fn new() -> Self {
        Self {
            desktop: FakeDesktop::default(),
            states: StateManager::new(Arc::new(MemoryStore::default())),
            routine_id: "evening".parse().unwrap(),
        }
    }

    async fn execute(&mut self, action: &mut Action) -> Result<(), RoutinesError> {
        let mut ctx = ActionContext {
            capabilities: &self.desktop,
            states: &mut self.states,
            routine_id: &self.routine_id,
        };
        action.execute(&mut ctx).await
    }

    async fn revert(&mut self, action: &mut Action) -> Result<(), RoutinesError> {
        let mut ctx = ActionContext {
            capabilities: &self.desktop,
            states: &mut self.states,
            routine_id: &self.routine_id,
        };
        action.revert(&mut ctx).await
    }
}

fn action(kind: ActionType, config: Value) -> Action {
    Action::new(&ActionConfig::new(kind, config)).unwrap()
}

#[tokio::test]
async fn should_restore_remembered_slider_when_reverting() {
    let mut harness = Harness::new();
    let mut volume = action(ActionType::Volume, json!({"level": 10}));

    harness.execute(&mut volume).await.unwrap();
    assert_eq!(harness.desktop.state().sliders[&Slider::Volume], 10);

    harness.revert(&mut volume).await.unwrap();
    assert_eq!(harness.desktop.state().sliders[&Slider::Volume], 50);
}

#[tokio::test]
async fn should_keep_first_remembered_value_across_executions() {
    let mut harness = Harness::new();
    let mut wallpaper = action(ActionType::Wallpaper, json!({"uri": "file:///night.png"}));

    harness.execute(&mut wallpaper).await.unwrap();
    harness.execute(&mut wallpaper).await.unwrap();
    harness.revert(&mut wallpaper).await.unwrap();

    assert_eq!(harness.desktop.state().wallpaper, "file:///default.png");
}

#[tokio::test]
async fn should_capture_dark_mode_through_state_manager() {
    let mut harness = Harness::new();
    let mut dark = action(ActionType::DarkMode, json!({"enabled": true}));

    harness.execute(&mut dark).await.unwrap();
    assert!(harness.desktop.state().switches[&Switch::DarkMode]);
    assert_eq!(
        harness.states.restore_state(&harness.routine_id, "dark_mode"),
        Some(json!(false))
    );

    // A second execution does not overwrite the captured value.
    harness.execute(&mut dark).await.unwrap();
    assert_eq!(
        harness.states.restore_state(&harness.routine_id, "dark_mode"),
        Some(json!(false))
    );

    harness.revert(&mut dark).await.unwrap();
    assert!(!harness.desktop.state().switches[&Switch::DarkMode]);
}

#[tokio::test]
async fn should_share_captured_value_between_actions_of_same_routine() {
    let mut harness = Harness::new();
    let mut first = action(ActionType::ScreenTimeout, json!({"seconds": 30}));
    let mut second = action(ActionType::ScreenTimeout, json!({"seconds": 600}));

    harness.execute(&mut first).await.unwrap();
    harness.execute(&mut second).await.unwrap();
    assert_eq!(harness.desktop.state().screen_timeout, 600);

    harness.revert(&mut second).await.unwrap();
    assert_eq!(harness.desktop.state().screen_timeout, 300);
}

#[tokio::test]
async fn should_apply_inverse_when_reverting_airplane_mode() {
    let mut harness = Harness::new();
    let mut airplane = action(ActionType::AirplaneMode, json!({"enabled": true}));

    harness.execute(&mut airplane).await.unwrap();
    harness.revert(&mut airplane).await.unwrap();

    assert_eq!(
        harness.desktop.calls(),
        vec![
            "set_switch airplane mode=true".to_string(),
            "set_switch airplane mode=false".to_string(),
        ]
    );
}

#[tokio::test]
async fn should_apply_opposite_of_configured_orientation_when_reverting() {
    let mut harness = Harness::new();
    let mut rotate = action(
        ActionType::ScreenOrientation,
        json!({"orientation": "landscape"}),
    );

    harness.execute(&mut rotate).await.unwrap();
    assert_eq!(harness.desktop.state().orientation, ScreenOrientation::Landscape);

    // Rotated by hand while the routine was active.
    harness
        .desktop
        .set_screen_orientation(ScreenOrientation::Portrait)
        .await
        .unwrap();

    harness.revert(&mut rotate).await.unwrap();
    assert_eq!(harness.desktop.state().orientation, ScreenOrientation::Portrait);
    assert_eq!(
        harness.desktop.calls().last().map(String::as_str),
        Some("set_screen_orientation portrait")
    );
}

#[tokio::test]
async fn should_skip_wifi_join_when_already_connected() {
    let mut harness = Harness::new();
    harness.desktop.simulate_ssid(Some("Office"));
    let mut join = action(ActionType::ConnectWifi, json!({"ssid": "Office"}));

    harness.execute(&mut join).await.unwrap();
    harness.revert(&mut join).await.unwrap();

    assert!(harness.desktop.calls().is_empty());
}

#[tokio::test]
async fn should_disconnect_only_network_it_joined() {
    let mut harness = Harness::new();
    harness.desktop.with_state(|state| {
        state.switches.insert(Switch::Wifi, false);
    });
    let mut join = action(ActionType::ConnectWifi, json!({"ssid": "Office"}));

    harness.execute(&mut join).await.unwrap();
    assert_eq!(harness.desktop.state().ssid.as_deref(), Some("Office"));

    harness.revert(&mut join).await.unwrap();
    assert_eq!(
        harness.desktop.calls(),
        vec![
            "set_switch wifi=true".to_string(),
            "connect_wifi Office".to_string(),
            "disconnect_wifi".to_string(),
        ]
    );
}

#[tokio::test]
async fn should_propagate_capability_failure() {
    let mut harness = Harness::new();
    harness.desktop.fail("set_slider");
    let mut brightness = action(ActionType::Brightness, json!({"level": 80}));

    let err = harness.execute(&mut brightness).await.unwrap_err();
    assert!(matches!(err, RoutinesError::Capability(_)));
}

#[tokio::test]
async fn should_not_revert_one_shot_actions() {
    let mut harness = Harness::new();
    let mut notify = action(
        ActionType::Notification,
        json!({"title": "Focus", "message": "Deep work started"}),
    );

    harness.execute(&mut notify).await.unwrap();
    harness.revert(&mut notify).await.unwrap();

    assert_eq!(
        harness.desktop.calls(),
        vec!["notify Focus: Deep work started".to_string()]
    );
    assert!(matches!(notify.deactivation(), Deactivation::Skip));
}

#[tokio::test]
async fn should_launch_every_configured_app() {
    let mut harness = Harness::new();
    let mut open = action(
        ActionType::OpenApp,
        json!({"appIds": ["org.gnome.Terminal", "firefox"]}),
    );

    harness.execute(&mut open).await.unwrap();

    assert_eq!(
        harness.desktop.calls(),
        vec![
            "launch_app org.gnome.Terminal".to_string(),
            "launch_app firefox".to_string(),
        ]
    );
}

#[tokio::test]
async fn should_rewrite_clipboard_only_when_text_changes() {
    let mut harness = Harness::new();
    let mut sanitize = action(ActionType::Clipboard, json!({"sanitize": true}));

    harness
        .desktop
        .simulate_clipboard(ClipboardContent::Text("plain words".into()));
    harness.execute(&mut sanitize).await.unwrap();
    assert!(harness.desktop.calls().is_empty());

    harness.desktop.simulate_clipboard(ClipboardContent::Text(
        "https://youtu.be/abc?si=tracker".into(),
    ));
    harness.execute(&mut sanitize).await.unwrap();
    assert_eq!(
        harness.desktop.calls(),
        vec!["set_clipboard_text https://youtu.be/abc".to_string()]
    );
}

#[tokio::test]
async fn should_replace_before_sanitizing() {
    let mut harness = Harness::new();
    let mut edit = action(
        ActionType::Clipboard,
        json!({"operation": "replace", "find": "http://", "replace": "https://", "sanitize": true}),
    );
    harness.desktop.simulate_clipboard(ClipboardContent::Text(
        "http://example.com/?utm_source=a".into(),
    ));

    harness.execute(&mut edit).await.unwrap();

    assert_eq!(
        harness.desktop.state().clipboard,
        ClipboardContent::Text("https://example.com/".into())
    );
}

#[tokio::test]
async fn should_clear_clipboard() {
    let mut harness = Harness::new();
    harness
        .desktop
        .simulate_clipboard(ClipboardContent::Text("secret".into()));
    let mut clear = action(ActionType::Clipboard, json!({"operation": "clear"}));

    harness.execute(&mut clear).await.unwrap();

    assert_eq!(harness.desktop.state().clipboard, ClipboardContent::Empty);
}

#[test]
fn should_choose_deactivation_from_policy() {
    let keep = ActionConfig::new(ActionType::Volume, json!({"level": 5}))
        .with_on_deactivate(DeactivatePolicy::Keep, None);
    let mut keep = Action::new(&keep).unwrap();
    assert!(matches!(keep.deactivation(), Deactivation::Keep));

    let bare_custom = ActionConfig::new(ActionType::Volume, json!({"level": 5}))
        .with_on_deactivate(DeactivatePolicy::Custom, None);
    let mut bare_custom = Action::new(&bare_custom).unwrap();
    assert!(matches!(bare_custom.deactivation(), Deactivation::Revert));

    let mut plain = action(ActionType::Volume, json!({"level": 5}));
    assert!(matches!(plain.deactivation(), Deactivation::Revert));
}

#[tokio::test]
async fn should_run_custom_payload_on_deactivation() {
    let mut harness = Harness::new();
    let config = ActionConfig::new(ActionType::Volume, json!({"level": 5}))
        .with_on_deactivate(DeactivatePolicy::Custom, Some(json!({"level": 70})));
    let mut volume = Action::new(&config).unwrap();

    harness.execute(&mut volume).await.unwrap();
    let Deactivation::Custom(custom) = volume.deactivation() else {
        panic!("expected a custom deactivation");
    };
    assert_eq!(custom.kind(), ActionType::Volume);
    harness.execute(custom).await.unwrap();

    assert_eq!(harness.desktop.state().sliders[&Slider::Volume], 70);
}

#[test]
fn should_reject_invalid_custom_payload_at_hydration() {
    let config = ActionConfig::new(ActionType::Volume, json!({"level": 5}))
        .with_on_deactivate(DeactivatePolicy::Custom, Some(json!({"level": 300})));
    assert!(matches!(
        Action::new(&config),
        Err(HydrationError::InvalidValue { field: "level", .. })
    ));
}
