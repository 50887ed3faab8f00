//! Transition rule table.
//!
//! Every transfer request is matched against an ordered list of rules. A rule
//! names the states it may leave, the input conditions it requires and the
//! state it enters. The first rule that matches wins. Conditions left unset
//! match any value.
//!
//! A rule whose target is the current state never matches, so re-running the
//! table after a transfer settles instead of looping.

use gaia_lockscreen_core::{InputPad, KeypadKey, LockScreenInputs, StateType};

/// Input conditions of a rule. `None` matches anything.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Conditions {
    screen_on: Option<bool>,
    passcode_enabled: Option<bool>,
    passcode_timeout: Option<bool>,
    home_pressed: Option<bool>,
    activate_unlock: Option<bool>,
    unlocking: Option<bool>,
    keypad_input: Option<KeypadKey>,
    forcibly_unlock: Option<bool>,
    inputpad: Option<InputPad>,
    passcode_validated: Option<bool>,
    secure_app_open: Option<bool>,
    secure_app_close: Option<bool>,
    unlocking_app_activated: Option<bool>,
}

macro_rules! flag_setters {
    ($($name:ident),* $(,)?) => {
        $(
            #[doc = concat!("Require `", stringify!($name), "` to equal `value`.")]
            #[must_use]
            pub fn $name(mut self, value: bool) -> Self {
                self.$name = Some(value);
                self
            }
        )*
    };
}

impl Conditions {
    /// Conditions matching every input.
    pub fn new() -> Self {
        Self::default()
    }

    flag_setters!(
        screen_on,
        passcode_enabled,
        passcode_timeout,
        home_pressed,
        activate_unlock,
        unlocking,
        forcibly_unlock,
        passcode_validated,
        secure_app_open,
        secure_app_close,
        unlocking_app_activated,
    );

    /// Require this key to have been pressed.
    #[must_use]
    pub fn keypad_input(mut self, key: KeypadKey) -> Self {
        self.keypad_input = Some(key);
        self
    }

    /// Require this input app notification.
    #[must_use]
    pub fn inputpad(mut self, pad: InputPad) -> Self {
        self.inputpad = Some(pad);
        self
    }

    /// Returns true if every set condition holds for `inputs`.
    pub fn matches(&self, inputs: &LockScreenInputs) -> bool {
        fn holds<T: PartialEq>(condition: Option<T>, actual: T) -> bool {
            condition.is_none_or(|expected| expected == actual)
        }

        holds(self.screen_on, inputs.screen_on)
            && self.passcode_enabled.is_none_or(|expected| inputs.passcode_enabled == Some(expected))
            && holds(self.passcode_timeout, inputs.passcode_timeout)
            && holds(self.home_pressed, inputs.home_pressed)
            && holds(self.activate_unlock, inputs.activate_unlock)
            && holds(self.unlocking, inputs.unlocking)
            && self.keypad_input.is_none_or(|expected| inputs.keypad_input == Some(expected))
            && holds(self.forcibly_unlock, inputs.forcibly_unlock)
            && self.inputpad.is_none_or(|expected| inputs.inputpad == Some(expected))
            && holds(self.passcode_validated, inputs.passcode_validated)
            && holds(self.secure_app_open, inputs.secure_app_open)
            && holds(self.secure_app_close, inputs.secure_app_close)
            && holds(self.unlocking_app_activated, inputs.unlocking_app_activated)
    }
}

/// One transition rule.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rule {
    /// Required inputs
    pub conditions: Conditions,
    /// States the rule may leave
    pub previous: Vec<StateType>,
    /// State the rule enters
    pub target: StateType,
    /// Why the rule exists, logged as the transition reason
    pub comment: String,
}

impl Rule {
    fn same_previous(&self, previous: &[StateType]) -> bool {
        let mut mine = self.previous.clone();
        let mut theirs = previous.to_vec();
        mine.sort_unstable();
        mine.dedup();
        theirs.sort_unstable();
        theirs.dedup();
        mine == theirs
    }
}

/// Ordered rule list.
#[derive(Debug, Clone, Default)]
pub struct RuleTable {
    rules: Vec<Rule>,
}

impl RuleTable {
    /// Empty table.
    pub fn new() -> Self {
        Self::default()
    }

    /// The LockScreen's standard rules.
    ///
    /// `fulfilled_successor` is where the accepted-passcode feedback state
    /// goes once it resolved while unlocking.
    #[allow(clippy::too_many_lines)]
    pub fn standard(fulfilled_successor: StateType) -> Self {
        use StateType::{
            KeypadHiding, KeypadRising, KeypadShow, KeypadShowFulfilledPasscode, PanelHide, SecureAppLaunching,
            SlideRestore, SlideShow, Unlock,
        };

        let mut table = Self::new();
        table.register_rule(
            Conditions::new().forcibly_unlock(true),
            [
                SlideRestore,
                SlideShow,
                KeypadRising,
                KeypadShow,
                KeypadShowFulfilledPasscode,
                KeypadHiding,
                PanelHide,
                SecureAppLaunching,
            ],
            Unlock,
            "Forcibly unlock",
        );
        table.register_rule(
            Conditions::new().secure_app_open(true),
            [KeypadShow, SlideShow],
            SlideRestore,
            "Restore the slider when secure app opened",
        );
        table.register_rule(
            Conditions::new().screen_on(true),
            [SlideRestore],
            SlideShow,
            "Show the slide after restore it",
        );
        table.register_rule(
            Conditions::new().screen_on(true).unlocking(false),
            [PanelHide, Unlock],
            SlideShow,
            "Resume from screen off",
        );
        table.register_rule(
            Conditions::new().passcode_enabled(false).screen_on(true).activate_unlock(true),
            [SlideShow],
            Unlock,
            "Activate to unlock without passcode",
        );
        table.register_rule(
            Conditions::new().passcode_enabled(true).passcode_timeout(false).screen_on(true).activate_unlock(true),
            [SlideShow],
            Unlock,
            "Activate to unlock with unexpired passcode",
        );
        table.register_rule(
            Conditions::new().passcode_enabled(true).passcode_timeout(true).screen_on(true).activate_unlock(true),
            [SlideShow],
            KeypadRising,
            "Activate to unlock, show the passcode pad",
        );
        table.register_rule(
            Conditions::new().passcode_enabled(true).screen_on(true).home_pressed(true),
            [KeypadShow],
            KeypadHiding,
            "Home pressed, hide the passcode pad",
        );
        table.register_rule(
            Conditions::new().passcode_enabled(true).screen_on(true).inputpad(InputPad::Close).unlocking(false),
            [KeypadHiding],
            SlideShow,
            "Passcode pad hidden, show the slide",
        );
        table.register_rule(
            Conditions::new().screen_on(false),
            [KeypadShow, KeypadHiding, KeypadRising, KeypadShowFulfilledPasscode],
            SlideShow,
            "Screen off, show the slide as cache",
        );
        table.register_rule(
            Conditions::new().screen_on(false),
            [SlideShow],
            SlideRestore,
            "Screen off, restore the slide",
        );
        table.register_rule(
            Conditions::new().passcode_enabled(true).screen_on(true).inputpad(InputPad::Open),
            [KeypadRising],
            KeypadShow,
            "Passcode pad risen, show the keypad",
        );
        table.register_rule(
            Conditions::new().passcode_enabled(true).passcode_validated(true).screen_on(true),
            [KeypadShow],
            KeypadShowFulfilledPasscode,
            "Passcode accepted, show the fulfilled feedback",
        );
        table.register_rule(
            Conditions::new().unlocking(true),
            [KeypadShowFulfilledPasscode],
            fulfilled_successor,
            "Fulfilled feedback shown, carry on unlocking",
        );
        table.register_rule(
            Conditions::new().passcode_enabled(true).passcode_validated(true).screen_on(true).unlocking(true),
            [KeypadShow],
            KeypadHiding,
            "Unlock with passcode, hide the passcode pad",
        );
        table.register_rule(
            Conditions::new().passcode_enabled(true).screen_on(true).inputpad(InputPad::Close).unlocking(true),
            [KeypadHiding],
            PanelHide,
            "Passcode pad hidden, hide every panel for unlocking",
        );
        table.register_rule(Conditions::new().unlocking(true), [PanelHide], Unlock, "Panels hidden, unlock");
        table.register_rule(
            Conditions::new().keypad_input(KeypadKey::Cancel),
            [KeypadShow],
            KeypadHiding,
            "Passcode cancelled, hide the pad",
        );
        table.register_rule(
            Conditions::new().unlocking_app_activated(true).passcode_enabled(true).passcode_timeout(true),
            [SlideShow],
            SecureAppLaunching,
            "App activated with expired passcode, launch it securely",
        );
        table.register_rule(
            Conditions::new().unlocking_app_activated(true).passcode_enabled(true).passcode_timeout(false),
            [SlideShow],
            Unlock,
            "App activated with unexpired passcode, unlock",
        );
        table.register_rule(
            Conditions::new().secure_app_close(true),
            [SecureAppLaunching],
            SlideRestore,
            "Secure app ended, restore the slide",
        );
        table.register_rule(
            Conditions::new().unlocking_app_activated(true).passcode_enabled(false),
            [SlideShow],
            Unlock,
            "App activated without passcode, unlock",
        );
        table
    }

    /// Append a rule.
    pub fn register_rule(
        &mut self,
        conditions: Conditions,
        previous: impl IntoIterator<Item = StateType>,
        target: StateType,
        comment: impl Into<String>,
    ) {
        self.rules.push(Rule { conditions, previous: previous.into_iter().collect(), target, comment: comment.into() });
    }

    /// Remove the first rule leaving exactly the states in `previous` whose
    /// conditions hold for `inputs`. Returns the removed rule.
    pub fn unregister_rule(&mut self, inputs: &LockScreenInputs, previous: &[StateType]) -> Option<Rule> {
        let index = self.rules.iter().position(|rule| rule.same_previous(previous) && rule.conditions.matches(inputs))?;
        Some(self.rules.remove(index))
    }

    /// First rule leaving `current` that matches `inputs`.
    pub fn find(&self, current: StateType, inputs: &LockScreenInputs) -> Option<&Rule> {
        self.rules.iter().find(|rule| {
            rule.target != current && rule.previous.contains(&current) && rule.conditions.matches(inputs)
        })
    }

    /// Every rule, in matching order.
    pub fn rules(&self) -> &[Rule] {
        &self.rules
    }

    /// Number of rules.
    pub fn len(&self) -> usize {
        self.rules.len()
    }

    /// Returns true if the table has no rule.
    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;

    use super::*;

    fn resolved() -> LockScreenInputs {
        LockScreenInputs { passcode_enabled: Some(true), ..LockScreenInputs::default() }
    }

    fn target(table: &RuleTable, current: StateType, inputs: &LockScreenInputs) -> Option<StateType> {
        table.find(current, inputs).map(|rule| rule.target)
    }

    #[test]
    fn unset_conditions_match_anything() {
        let conditions = Conditions::new().screen_on(true);
        assert!(conditions.matches(&LockScreenInputs::default()));
        assert!(!conditions.matches(&LockScreenInputs { screen_on: false, ..LockScreenInputs::default() }));
    }

    #[test]
    fn passcode_enabled_requires_resolved_value() {
        let conditions = Conditions::new().passcode_enabled(false);
        assert!(!conditions.matches(&LockScreenInputs::default()));
        assert!(conditions.matches(&LockScreenInputs { passcode_enabled: Some(false), ..LockScreenInputs::default() }));
    }

    #[test]
    fn activate_unlock_depends_on_passcode() {
        let table = RuleTable::standard(StateType::KeypadHiding);
        let mut inputs = LockScreenInputs { activate_unlock: true, ..resolved() };
        assert_eq!(target(&table, StateType::SlideShow, &inputs), Some(StateType::KeypadRising));

        inputs.passcode_timeout = false;
        assert_eq!(target(&table, StateType::SlideShow, &inputs), Some(StateType::Unlock));

        inputs.passcode_enabled = Some(false);
        inputs.passcode_timeout = true;
        assert_eq!(target(&table, StateType::SlideShow, &inputs), Some(StateType::Unlock));
    }

    #[test]
    fn validated_passcode_goes_through_fulfilled_feedback() {
        let table = RuleTable::standard(StateType::KeypadHiding);
        let inputs = LockScreenInputs { passcode_validated: true, unlocking: true, ..resolved() };
        assert_eq!(target(&table, StateType::KeypadShow, &inputs), Some(StateType::KeypadShowFulfilledPasscode));

        let persistent = inputs.persistent();
        assert_eq!(
            target(&table, StateType::KeypadShowFulfilledPasscode, &persistent),
            Some(StateType::KeypadHiding)
        );
    }

    #[test]
    fn fulfilled_successor_is_configurable() {
        let table = RuleTable::standard(StateType::PanelHide);
        let inputs = LockScreenInputs { unlocking: true, ..resolved() };
        assert_eq!(target(&table, StateType::KeypadShowFulfilledPasscode, &inputs), Some(StateType::PanelHide));
    }

    #[test]
    fn rule_targeting_current_state_is_skipped() {
        let mut table = RuleTable::new();
        table.register_rule(Conditions::new(), [StateType::SlideShow], StateType::SlideShow, "self loop");
        table.register_rule(Conditions::new(), [StateType::SlideShow], StateType::SlideRestore, "fallback");

        assert_eq!(target(&table, StateType::SlideShow, &resolved()), Some(StateType::SlideRestore));
    }

    #[test]
    fn first_match_wins() {
        let mut table = RuleTable::new();
        table.register_rule(Conditions::new().home_pressed(true), [StateType::KeypadShow], StateType::KeypadHiding, "a");
        table.register_rule(Conditions::new(), [StateType::KeypadShow], StateType::SlideShow, "b");

        let inputs = LockScreenInputs { home_pressed: true, ..resolved() };
        assert_eq!(table.find(StateType::KeypadShow, &inputs).map(|r| r.comment.as_str()), Some("a"));
    }

    #[test]
    fn unregister_requires_exact_previous_set() {
        let mut table = RuleTable::standard(StateType::KeypadHiding);
        let before = table.len();
        let screen_off = LockScreenInputs { screen_on: false, ..resolved() };

        assert!(table.unregister_rule(&screen_off, &[StateType::KeypadShow]).is_none());

        let removed = table.unregister_rule(
            &screen_off,
            &[
                StateType::KeypadRising,
                StateType::KeypadShow,
                StateType::KeypadShowFulfilledPasscode,
                StateType::KeypadHiding,
            ],
        );
        assert_eq!(removed.map(|r| r.target), Some(StateType::SlideShow));
        assert_eq!(table.len(), before - 1);
        assert_eq!(target(&table, StateType::KeypadShow, &screen_off), None);
    }

    #[test]
    fn unregistering_fulfilled_rule_restores_direct_hiding() {
        let mut table = RuleTable::standard(StateType::KeypadHiding);
        let inputs = LockScreenInputs { passcode_validated: true, unlocking: true, ..resolved() };

        table.unregister_rule(&inputs, &[StateType::KeypadShow]);

        assert_eq!(target(&table, StateType::KeypadShow, &inputs), Some(StateType::KeypadHiding));
    }

    #[test]
    fn forcibly_unlock_from_any_locked_state() {
        let table = RuleTable::standard(StateType::KeypadHiding);
        let inputs = LockScreenInputs { forcibly_unlock: true, ..resolved() };
        for state in StateType::ALL.into_iter().filter(|s| *s != StateType::Unlock) {
            assert_eq!(target(&table, state, &inputs), Some(StateType::Unlock), "from {state}");
        }
    }

    fn inputs_strategy() -> impl Strategy<Value = LockScreenInputs> {
        (
            prop::array::uniform8(any::<bool>()),
            prop::option::of(any::<bool>()),
            prop::array::uniform4(any::<bool>()),
        )
            .prop_map(|(flags, passcode_enabled, more)| LockScreenInputs {
                screen_on: flags[0],
                passcode_enabled,
                passcode_timeout: flags[1],
                home_pressed: flags[2],
                activate_unlock: flags[3],
                unlocking: flags[4],
                keypad_input: None,
                forcibly_unlock: flags[5],
                inputpad: None,
                passcode_validated: flags[6],
                secure_app_open: flags[7],
                secure_app_close: more[0],
                unlocking_app_activated: more[1],
            })
    }

    proptest! {
        #[test]
        fn prop_found_rule_leaves_current_state(
            inputs in inputs_strategy(),
            current in prop::sample::select(StateType::ALL.to_vec()),
        ) {
            let table = RuleTable::standard(StateType::KeypadHiding);
            if let Some(rule) = table.find(current, &inputs) {
                prop_assert_ne!(rule.target, current);
                prop_assert!(rule.previous.contains(&current));
                prop_assert!(rule.conditions.matches(&inputs));
            }
        }

        #[test]
        fn prop_unresolved_passcode_never_unlocks_from_slide(inputs in inputs_strategy()) {
            let table = RuleTable::standard(StateType::KeypadHiding);
            let inputs = LockScreenInputs { passcode_enabled: None, forcibly_unlock: false, ..inputs };
            prop_assert_ne!(target(&table, StateType::SlideShow, &inputs), Some(StateType::Unlock));
        }
    }
}
