//! End-to-end LockScreen sessions on the virtual clock.
//!
//! # Test Strategy
//!
//! Each test scripts what a user and the platform do:
//! 1. Seed the passcode settings
//! 2. Slide, type on the keypad, tap notifications, toggle the screen
//! 3. Let the simulated platform answer (input app, window close)
//! 4. Verify the final state, the display and the requests sent out
//!
//! The scenario runner checks the standard invariants after every cycle, so
//! every test also asserts that none of them broke along the way.

use std::time::Duration;

use gaia_lockscreen_app::{CAMERA_ACTIVITY, LockScreenEvent, RuntimeConfig};
use gaia_lockscreen_core::{
    LockScreenAction, Panel, StateType, UnlockingMessage, ValidationStatus,
    lockscreen::KeypadVisibility,
    settings::RADIO_DISABLED,
};
use gaia_lockscreen_harness::{Scenario, ScenarioError, ScenarioOutcome};

fn unlock_messages(outcome: &ScenarioOutcome) -> Vec<&UnlockingMessage> {
    outcome
        .actions
        .iter()
        .filter_map(|action| match action {
            LockScreenAction::RequestUnlock { message } => Some(message),
            _ => None,
        })
        .collect()
}

fn tap(id: &str) -> LockScreenEvent {
    LockScreenEvent::NotificationTapped { notification_id: id.to_string() }
}

fn added(id: &str) -> LockScreenEvent {
    LockScreenEvent::NotificationAdded {
        notification_id: id.to_string(),
        title: "Messages".to_string(),
        body: "See you at 9".to_string(),
    }
}

fn screen(enabled: bool) -> LockScreenEvent {
    LockScreenEvent::ScreenChanged { enabled, by_proximity: false }
}

#[tokio::test(start_paused = true)]
async fn slide_right_without_passcode_unlocks() {
    let outcome = Scenario::new().event(LockScreenEvent::SlideActivateRight).run().await.unwrap();

    assert_eq!(outcome.path(), vec![StateType::Unlock, StateType::SlideShow]);
    assert_eq!(outcome.unlock_requests(), 1);
    assert!(!outcome.view.locked);
}

#[tokio::test(start_paused = true)]
async fn correct_passcode_unlocks() {
    let outcome =
        Scenario::new().passcode("1234").event(LockScreenEvent::SlideActivateRight).keys("1234").run().await.unwrap();

    assert_eq!(outcome.path(), vec![
        StateType::KeypadRising,
        StateType::KeypadShow,
        StateType::KeypadShowFulfilledPasscode,
        StateType::KeypadHiding,
        StateType::PanelHide,
        StateType::Unlock,
        StateType::SlideShow,
    ]);
    assert_eq!(outcome.unlock_requests(), 1);
    assert!(outcome.elapsed >= Duration::from_millis(100));
    assert!(outcome.actions.contains(&LockScreenAction::CloseInputPad));
}

#[tokio::test(start_paused = true)]
async fn passcode_unlock_history_snapshot() {
    let outcome =
        Scenario::new().passcode("0000").event(LockScreenEvent::SlideActivateRight).keys("0000").run().await.unwrap();

    insta::assert_snapshot!(outcome.history.render(), @r"
    slideShow -> keypadRising: Activate to unlock, show the passcode pad
    keypadRising -> keypadShow: Passcode pad risen, show the keypad
    keypadShow -> keypadShowFulfilledPasscode: Passcode accepted, show the fulfilled feedback
    keypadShowFulfilledPasscode -> keypadHiding: Fulfilled feedback shown, carry on unlocking
    keypadHiding -> panelHide: Passcode pad hidden, hide every panel for unlocking
    panelHide -> unlock: Panels hidden, unlock
    unlock -> slideShow: Resume from screen off
    ");
}

#[tokio::test(start_paused = true)]
async fn wrong_passcode_shows_error_and_keeps_keypad() {
    let outcome =
        Scenario::new().passcode("1234").event(LockScreenEvent::SlideActivateRight).keys("9999").run().await.unwrap();

    assert_eq!(outcome.state, StateType::KeypadShow);
    assert_eq!(outcome.view.passcode_status, Some(ValidationStatus::Error));
    assert_eq!(outcome.view.passcode_len, 4);
    assert_eq!(outcome.unlock_requests(), 0);
    assert!(outcome.actions.contains(&LockScreenAction::NotifyValidationFailed));
    assert!(outcome.actions.iter().any(|a| matches!(a, LockScreenAction::Vibrate { .. })));
}

#[tokio::test(start_paused = true)]
async fn error_status_clears_after_timeout() {
    let outcome = Scenario::new()
        .passcode("1234")
        .event(LockScreenEvent::SlideActivateRight)
        .keys("9999")
        .wait(Duration::from_millis(600))
        .run()
        .await
        .unwrap();

    assert_eq!(outcome.view.passcode_status, None);
    assert_eq!(outcome.view.passcode_len, 0);
    assert_eq!(outcome.state, StateType::KeypadShow);
}

#[tokio::test(start_paused = true)]
async fn retry_after_error_unlocks() {
    let outcome = Scenario::new()
        .passcode("1234")
        .event(LockScreenEvent::SlideActivateRight)
        .keys("9999")
        .wait(Duration::from_millis(600))
        .keys("1234")
        .run()
        .await
        .unwrap();

    assert_eq!(outcome.state, StateType::SlideShow);
    assert_eq!(outcome.unlock_requests(), 1);
}

#[tokio::test(start_paused = true)]
async fn digits_during_error_are_dropped() {
    let outcome = Scenario::new()
        .passcode("1234")
        .event(LockScreenEvent::SlideActivateRight)
        .keys("99991")
        .run()
        .await
        .unwrap();

    assert_eq!(outcome.view.passcode_len, 4);
    let validations =
        outcome.actions.iter().filter(|a| matches!(a, LockScreenAction::RequestPasscodeValidation { .. })).count();
    assert_eq!(validations, 1);
}

#[tokio::test(start_paused = true)]
async fn cancel_returns_to_slide() {
    let outcome = Scenario::new()
        .passcode("1234")
        .event(LockScreenEvent::SlideActivateRight)
        .keys("12c")
        .run()
        .await
        .unwrap();

    assert_eq!(outcome.state, StateType::SlideShow);
    assert_eq!(outcome.view.panel, Panel::Main);
    assert_eq!(outcome.view.passcode_len, 0);
    assert_eq!(outcome.view.keypad, KeypadVisibility::Hidden);
    assert_eq!(outcome.unlock_requests(), 0);
}

#[tokio::test(start_paused = true)]
async fn home_hides_keypad() {
    let outcome = Scenario::new()
        .passcode("1234")
        .event(LockScreenEvent::SlideActivateRight)
        .event(LockScreenEvent::HomePressed)
        .run()
        .await
        .unwrap();

    assert_eq!(outcome.path(), vec![
        StateType::KeypadRising,
        StateType::KeypadShow,
        StateType::KeypadHiding,
        StateType::SlideShow,
    ]);
}

#[tokio::test(start_paused = true)]
async fn relock_within_timeout_skips_passcode() {
    let outcome = Scenario::new()
        .passcode("1234")
        .passcode_timeout(Duration::from_secs(60))
        .event(LockScreenEvent::SlideActivateRight)
        .keys("1234")
        .wait(Duration::from_secs(5))
        .event(LockScreenEvent::RequestLock)
        .wait(Duration::from_secs(5))
        .event(LockScreenEvent::SlideActivateRight)
        .run()
        .await
        .unwrap();

    assert_eq!(outcome.unlock_requests(), 2);
    let risings = outcome.path().iter().filter(|s| **s == StateType::KeypadRising).count();
    assert_eq!(risings, 1);
}

#[tokio::test(start_paused = true)]
async fn relock_without_timeout_setting_requires_passcode() {
    let outcome = Scenario::new()
        .passcode("1234")
        .event(LockScreenEvent::SlideActivateRight)
        .keys("1234")
        .event(LockScreenEvent::RequestLock)
        .event(LockScreenEvent::SlideActivateRight)
        .run()
        .await
        .unwrap();

    assert_eq!(outcome.unlock_requests(), 1);
    assert_eq!(outcome.state, StateType::KeypadShow);
    let risings = outcome.path().iter().filter(|s| **s == StateType::KeypadRising).count();
    assert_eq!(risings, 2);
}

#[tokio::test(start_paused = true)]
async fn relock_after_timeout_requires_passcode() {
    let outcome = Scenario::new()
        .passcode("1234")
        .passcode_timeout(Duration::from_secs(10))
        .event(LockScreenEvent::SlideActivateRight)
        .keys("1234")
        .event(LockScreenEvent::RequestLock)
        .wait(Duration::from_secs(30))
        .event(LockScreenEvent::SlideActivateRight)
        .run()
        .await
        .unwrap();

    assert_eq!(outcome.unlock_requests(), 1);
    assert_eq!(outcome.state, StateType::KeypadShow);
}

#[tokio::test(start_paused = true)]
async fn slide_left_with_passcode_launches_camera_securely() {
    let outcome = Scenario::new()
        .passcode("1234")
        .event(LockScreenEvent::SlideActivateLeft)
        .event(LockScreenEvent::SecureAppOpened)
        .event(LockScreenEvent::SecureAppTerminated)
        .run()
        .await
        .unwrap();

    assert!(
        outcome.actions.iter().any(|a| matches!(a, LockScreenAction::InvokeSecureApp(app) if app.name == "camera"))
    );
    assert_eq!(outcome.unlock_requests(), 0);
    assert_eq!(outcome.state, StateType::SlideShow);
    assert!(outcome.path().contains(&StateType::SecureAppLaunching));
}

#[tokio::test(start_paused = true)]
async fn slide_left_without_passcode_unlocks_into_camera() {
    let outcome = Scenario::new().event(LockScreenEvent::SlideActivateLeft).run().await.unwrap();

    let messages = unlock_messages(&outcome);
    assert_eq!(messages.len(), 1);
    assert_eq!(messages[0].activity.as_deref(), Some(CAMERA_ACTIVITY));
}

#[tokio::test(start_paused = true)]
async fn dragged_slide_activates_on_release() {
    let outcome = Scenario::new()
        .event(LockScreenEvent::SlideDragged { delta: 200 })
        .event(LockScreenEvent::SlideReleased)
        .run()
        .await
        .unwrap();

    assert_eq!(outcome.unlock_requests(), 1);
    assert_eq!(outcome.view.slide_offset, 0);
}

#[tokio::test(start_paused = true)]
async fn short_drag_snaps_back() {
    let outcome = Scenario::new()
        .event(LockScreenEvent::SlideDragged { delta: 10 })
        .event(LockScreenEvent::SlideReleased)
        .run()
        .await
        .unwrap();

    assert_eq!(outcome.unlock_requests(), 0);
    assert_eq!(outcome.view.slide_offset, 0);
    assert_eq!(outcome.state, StateType::SlideShow);
}

#[tokio::test(start_paused = true)]
async fn emergency_call_from_keypad() {
    let outcome =
        Scenario::new().passcode("1234").event(LockScreenEvent::SlideActivateRight).keys("e").run().await.unwrap();

    assert!(
        outcome
            .actions
            .iter()
            .any(|a| matches!(a, LockScreenAction::InvokeSecureApp(app) if app.name == "emergency-call"))
    );
}

#[tokio::test(start_paused = true)]
async fn screen_off_while_keypad_shown_restores_slide() {
    let outcome = Scenario::new()
        .passcode("1234")
        .event(LockScreenEvent::SlideActivateRight)
        .keys("12")
        .event(screen(false))
        .event(screen(true))
        .run()
        .await
        .unwrap();

    assert_eq!(outcome.state, StateType::SlideShow);
    assert_eq!(outcome.view.passcode_len, 0);
    assert!(outcome.path().contains(&StateType::SlideRestore));
}

#[tokio::test(start_paused = true)]
async fn proximity_screen_off_changes_nothing() {
    let outcome = Scenario::new()
        .passcode("1234")
        .event(LockScreenEvent::SlideActivateRight)
        .event(LockScreenEvent::ScreenChanged { enabled: false, by_proximity: true })
        .run()
        .await
        .unwrap();

    assert_eq!(outcome.state, StateType::KeypadShow);
}

#[tokio::test(start_paused = true)]
async fn forcible_unlock_from_keypad() {
    let outcome = Scenario::new()
        .passcode("1234")
        .event(LockScreenEvent::SlideActivateRight)
        .keys("12")
        .event(LockScreenEvent::RequestUnlock { forcibly: true })
        .run()
        .await
        .unwrap();

    assert_eq!(outcome.unlock_requests(), 1);
    assert_eq!(outcome.path()[2], StateType::Unlock);
}

#[tokio::test(start_paused = true)]
async fn tapping_highlighted_notification_unlocks_with_its_id() {
    let outcome = Scenario::new()
        .event(added("sms-1"))
        .event(added("sms-2"))
        .event(tap("sms-1"))
        .event(tap("sms-1"))
        .run()
        .await
        .unwrap();

    assert_eq!(unlock_messages(&outcome), vec![&UnlockingMessage::notification("sms-1")]);
    let frame = outcome.frame.unwrap();
    assert_eq!(frame.notifications, vec!["sms-2".to_string(), "sms-1".to_string()]);
}

#[tokio::test(start_paused = true)]
async fn notification_with_passcode_asks_for_it() {
    let outcome = Scenario::new()
        .passcode("1234")
        .event(added("sms-1"))
        .event(tap("sms-1"))
        .event(tap("sms-1"))
        .keys("1234")
        .run()
        .await
        .unwrap();

    assert!(outcome.path().contains(&StateType::KeypadShow));
    assert_eq!(unlock_messages(&outcome), vec![&UnlockingMessage::notification("sms-1")]);
}

#[tokio::test(start_paused = true)]
async fn highlight_expires() {
    let outcome = Scenario::new().event(added("sms-1")).event(tap("sms-1")).wait(Duration::from_secs(4)).run().await.unwrap();

    let frame = outcome.frame.as_ref().unwrap();
    assert_eq!(frame.highlighted, None);
    assert_eq!(outcome.unlock_requests(), 0);
}

#[tokio::test(start_paused = true)]
async fn tap_after_expiry_only_highlights() {
    let outcome = Scenario::new()
        .event(added("sms-1"))
        .event(tap("sms-1"))
        .wait(Duration::from_secs(4))
        .event(tap("sms-1"))
        .run()
        .await
        .unwrap();

    assert_eq!(outcome.unlock_requests(), 0);
    assert_eq!(outcome.frame.unwrap().highlighted.as_deref(), Some("sms-1"));
}

#[tokio::test(start_paused = true)]
async fn removed_notification_drops_highlight() {
    let outcome = Scenario::new()
        .event(added("sms-1"))
        .event(tap("sms-1"))
        .event(LockScreenEvent::NotificationRemoved { notification_id: "sms-1".to_string() })
        .run()
        .await
        .unwrap();

    let frame = outcome.frame.unwrap();
    assert!(frame.notifications.is_empty());
    assert_eq!(frame.highlighted, None);
}

#[tokio::test(start_paused = true)]
async fn airplane_mode_follows_radio_setting() {
    let outcome = Scenario::new()
        .wait(Duration::from_millis(10))
        .event(LockScreenEvent::SettingChanged { key: RADIO_DISABLED.to_string(), value: true.into() })
        .wait(Duration::from_millis(10))
        .run()
        .await
        .unwrap();

    assert!(outcome.connection.airplane_mode);
    assert!(outcome.frame.unwrap().airplane_mode);
}

#[tokio::test(start_paused = true)]
async fn clock_shows_local_time() {
    let outcome = Scenario::new().wait(Duration::from_secs(2)).run().await.unwrap();

    assert_eq!(outcome.clock.time, "08:30");
    assert!(!outcome.clock.suspended);
}

#[tokio::test(start_paused = true)]
async fn clock_suspends_while_screen_off() {
    let outcome =
        Scenario::new().wait(Duration::from_millis(10)).event(screen(false)).wait(Duration::from_secs(2)).run().await.unwrap();

    assert!(outcome.clock.suspended);
}

#[tokio::test(start_paused = true)]
async fn clock_resumes_with_screen() {
    let outcome = Scenario::new()
        .wait(Duration::from_millis(10))
        .event(screen(false))
        .wait(Duration::from_secs(2))
        .event(screen(true))
        .wait(Duration::from_secs(2))
        .run()
        .await
        .unwrap();

    assert!(!outcome.clock.suspended);
    assert_eq!(outcome.clock.time, "08:30");
}

#[tokio::test(start_paused = true)]
async fn manual_platform_keeps_keypad_rising() {
    let outcome = Scenario::new()
        .passcode("1234")
        .manual_platform()
        .event(LockScreenEvent::SlideActivateRight)
        .run()
        .await
        .unwrap();

    assert_eq!(outcome.state, StateType::KeypadRising);
    assert_eq!(outcome.view.keypad, KeypadVisibility::Rising);
}

#[tokio::test(start_paused = true)]
async fn manual_platform_scripted_input_app() {
    let outcome = Scenario::new()
        .passcode("1234")
        .manual_platform()
        .event(LockScreenEvent::SlideActivateRight)
        .event(LockScreenEvent::InputAppOpening)
        .keys("1234")
        .event(LockScreenEvent::InputAppClosed)
        .run()
        .await
        .unwrap();

    assert_eq!(outcome.state, StateType::Unlock);
    assert_eq!(outcome.unlock_requests(), 1);
}

#[tokio::test(start_paused = true)]
async fn failed_action_stops_scenario() {
    let result = Scenario::new()
        .passcode("1234")
        .fail_on(|action| matches!(action, LockScreenAction::OpenInputPad))
        .event(LockScreenEvent::SlideActivateRight)
        .run()
        .await;

    assert!(matches!(result, Err(ScenarioError::Driver(_))));
}

#[tokio::test(start_paused = true)]
async fn custom_fulfilled_delay_is_honored() {
    let mut config = RuntimeConfig::default();
    config.manager.fulfilled_delay = Duration::from_secs(2);

    let outcome = Scenario::new()
        .passcode("1234")
        .config(config)
        .event(LockScreenEvent::SlideActivateRight)
        .keys("1234")
        .run()
        .await
        .unwrap();

    assert!(outcome.elapsed >= Duration::from_secs(2));
    assert_eq!(outcome.unlock_requests(), 1);
}

#[tokio::test(start_paused = true)]
async fn backspace_removes_last_digit() {
    let outcome = Scenario::new()
        .passcode("1234")
        .event(LockScreenEvent::SlideActivateRight)
        .keys("12b")
        .run()
        .await
        .unwrap();

    assert_eq!(outcome.view.passcode_len, 1);
    assert!(!outcome.actions.iter().any(|a| matches!(a, LockScreenAction::RequestPasscodeValidation { .. })));
}
