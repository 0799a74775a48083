//! Ergonomic testing utilities for reducers
//!
//! This module provides a fluent API for testing reducers with readable Given-When-Then syntax.

#![allow(clippy::module_name_repetitions)] // ReducerTest is the natural name

use quill_core::{effect::Effect, reducer::Reducer};

/// Type alias for state assertion functions
type StateAssertion<S> = Box<dyn FnOnce(&S)>;

/// Type alias for effect assertion functions
type EffectAssertion<A> = Box<dyn FnOnce(&[Effect<A>])>;

/// Fluent API for testing reducers with Given-When-Then syntax
///
/// # Example
///
/// ```ignore
/// use quill_testing::ReducerTest;
///
/// ReducerTest::new(PostFormReducer)
///     .with_env(env)
///     .given_state(PostFormState::create())
///     .given_actions([PostFormAction::TitleChanged("  ".into())])
///     .when_action(PostFormAction::Submit)
///     .then_state(|state| {
///         assert_eq!(state.error.as_deref(), Some("Title and content are required"));
///     })
///     .then_effects(assertions::assert_no_effects)
///     .run();
/// ```
pub struct ReducerTest<R, S, A, E>
where
    R: Reducer<State = S, Action = A, Environment = E>,
{
    reducer: R,
    environment: Option<E>,
    initial_state: Option<S>,
    prelude: Vec<A>,
    action: Option<A>,
    state_assertions: Vec<StateAssertion<S>>,
    effect_assertions: Vec<EffectAssertion<A>>,
}

impl<R, S, A, E> ReducerTest<R, S, A, E>
where
    R: Reducer<State = S, Action = A, Environment = E>,
{
    /// Create a new reducer test with the given reducer
    #[must_use]
    pub const fn new(reducer: R) -> Self {
        Self {
            reducer,
            environment: None,
            initial_state: None,
            prelude: Vec::new(),
            action: None,
            state_assertions: Vec::new(),
            effect_assertions: Vec::new(),
        }
    }

    /// Set the environment for the test
    #[must_use]
    pub fn with_env(mut self, env: E) -> Self {
        self.environment = Some(env);
        self
    }

    /// Set the initial state (Given)
    #[must_use]
    pub fn given_state(mut self, state: S) -> Self {
        self.initial_state = Some(state);
        self
    }

    /// Reduce these actions before the action under test (Given)
    ///
    /// Their effects are discarded.
    #[must_use]
    pub fn given_actions(mut self, actions: impl IntoIterator<Item = A>) -> Self {
        self.prelude.extend(actions);
        self
    }

    /// Set the action to test (When)
    #[must_use]
    pub fn when_action(mut self, action: A) -> Self {
        self.action = Some(action);
        self
    }

    /// Add an assertion about the resulting state (Then)
    #[must_use]
    pub fn then_state<F>(mut self, assertion: F) -> Self
    where
        F: FnOnce(&S) + 'static,
    {
        self.state_assertions.push(Box::new(assertion));
        self
    }

    /// Add an assertion about the resulting effects (Then)
    #[must_use]
    pub fn then_effects<F>(mut self, assertion: F) -> Self
    where
        F: FnOnce(&[Effect<A>]) + 'static,
    {
        self.effect_assertions.push(Box::new(assertion));
        self
    }

    /// Run the test and execute all assertions
    ///
    /// # Panics
    ///
    /// Panics if initial state, action, or environment is not set,
    /// or if any assertions fail.
    #[allow(clippy::expect_used)] // Test code can use expect
    pub fn run(self) {
        let mut state = self
            .initial_state
            .expect("Initial state must be set with given_state()");

        let action = self.action.expect("Action must be set with when_action()");

        let env = self
            .environment
            .expect("Environment must be set with with_env()");

        for earlier in self.prelude {
            let _ = self.reducer.reduce(&mut state, earlier, &env);
        }

        let effects = self.reducer.reduce(&mut state, action, &env);

        for assertion in self.state_assertions {
            assertion(&state);
        }

        for assertion in self.effect_assertions {
            assertion(&effects);
        }
    }
}

/// Execute effects without a store and collect the actions they produce
///
/// Futures are awaited in order, nested `Parallel`/`Sequential` effects are
/// flattened, and `Delay` yields its action immediately.
pub async fn resolve_effects<A>(effects: impl IntoIterator<Item = Effect<A>>) -> Vec<A> {
    let mut pending: Vec<Effect<A>> = effects.into_iter().collect();
    pending.reverse();

    let mut produced = Vec::new();
    while let Some(effect) = pending.pop() {
        match effect {
            Effect::None => {},
            Effect::Future(fut) => produced.extend(fut.await),
            Effect::Delay { action, .. } => produced.push(*action),
            Effect::Parallel(nested) | Effect::Sequential(nested) => {
                pending.extend(nested.into_iter().rev());
            },
        }
    }
    produced
}

/// Helper assertions for effects
pub mod assertions {
    use quill_core::effect::Effect;
    use std::time::Duration;

    /// Assert that there are no effects
    ///
    /// # Panics
    ///
    /// Panics if effects contain anything other than `Effect::None`.
    pub fn assert_no_effects<A: std::fmt::Debug>(effects: &[Effect<A>]) {
        assert!(
            effects.iter().all(Effect::is_none),
            "Expected no effects, but found {}: {:?}",
            effects.len(),
            effects
        );
    }

    /// Assert the number of effects
    ///
    /// # Panics
    ///
    /// Panics if the number of effects doesn't match expected.
    pub fn assert_effects_count<A>(effects: &[Effect<A>], expected: usize) {
        assert_eq!(
            effects.len(),
            expected,
            "Expected {} effects, but found {}",
            expected,
            effects.len()
        );
    }

    /// Assert that effects contain at least one Future effect
    ///
    /// # Panics
    ///
    /// Panics if no Future effect is found.
    pub fn assert_has_future_effect<A>(effects: &[Effect<A>]) {
        assert!(
            effects.iter().any(|e| matches!(e, Effect::Future(_))),
            "Expected at least one Future effect, but none found"
        );
    }

    /// Assert that effects schedule a delayed action after `expected`
    ///
    /// # Panics
    ///
    /// Panics if no matching `Delay` effect is found.
    pub fn assert_has_delay<A: std::fmt::Debug>(effects: &[Effect<A>], expected: Duration) {
        assert!(
            effects
                .iter()
                .any(|e| matches!(e, Effect::Delay { duration, .. } if *duration == expected)),
            "Expected a Delay of {expected:?}, found {effects:?}"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use quill_core::reducer::Reducer;
    use quill_core::{smallvec, SmallVec};
    use std::time::Duration;

    #[derive(Clone, Debug, Default)]
    struct DraftState {
        title: String,
        saved: Vec<String>,
    }

    #[derive(Clone, Debug, PartialEq)]
    enum DraftAction {
        Edit(String),
        Save,
        Saved(String),
        ScheduleReminder,
    }

    struct DraftReducer;

    impl Reducer for DraftReducer {
        type State = DraftState;
        type Action = DraftAction;
        type Environment = ();

        fn reduce(
            &self,
            state: &mut Self::State,
            action: Self::Action,
            _env: &Self::Environment,
        ) -> SmallVec<[Effect<Self::Action>; 4]> {
            match action {
                DraftAction::Edit(title) => {
                    state.title = title;
                    SmallVec::new()
                },
                DraftAction::Save => {
                    let title = state.title.clone();
                    smallvec![Effect::Future(Box::pin(async move {
                        Some(DraftAction::Saved(title))
                    }))]
                },
                DraftAction::Saved(title) => {
                    state.saved.push(title);
                    SmallVec::new()
                },
                DraftAction::ScheduleReminder => smallvec![Effect::Delay {
                    duration: Duration::from_secs(2),
                    action: Box::new(DraftAction::Save),
                }],
            }
        }
    }

    #[test]
    fn test_given_actions_run_before_action_under_test() {
        ReducerTest::new(DraftReducer)
            .with_env(())
            .given_state(DraftState::default())
            .given_actions([DraftAction::Edit("first".into()), DraftAction::Edit("hello".into())])
            .when_action(DraftAction::Save)
            .then_state(|state| assert_eq!(state.title, "hello"))
            .then_effects(|effects| {
                assertions::assert_effects_count(effects, 1);
                assertions::assert_has_future_effect(effects);
            })
            .run();
    }

    #[test]
    fn test_delay_assertion() {
        ReducerTest::new(DraftReducer)
            .with_env(())
            .given_state(DraftState::default())
            .when_action(DraftAction::ScheduleReminder)
            .then_effects(|effects| assertions::assert_has_delay(effects, Duration::from_secs(2)))
            .run();
    }

    #[test]
    fn test_assertions_no_effects() {
        assertions::assert_no_effects::<DraftAction>(&[Effect::None]);
        assertions::assert_no_effects::<DraftAction>(&[]);
    }

    #[tokio::test]
    async fn test_resolve_effects_flattens_in_order() {
        let effects = vec![
            Effect::Sequential(vec![
                Effect::Future(Box::pin(async { Some(DraftAction::Saved("a".into())) })),
                Effect::None,
            ]),
            Effect::Delay {
                duration: Duration::from_secs(60),
                action: Box::new(DraftAction::Saved("b".into())),
            },
            Effect::Future(Box::pin(async { None })),
        ];

        let produced = resolve_effects(effects).await;
        assert_eq!(
            produced,
            vec![DraftAction::Saved("a".into()), DraftAction::Saved("b".into())]
        );
    }
}
