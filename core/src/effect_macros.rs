//! Declarative macros for ergonomic effect construction
//!
//! These macros reduce boilerplate when a reducer hands a network call or a
//! timer to the runtime.

/// Create an `Effect::Future` from an async block
///
/// The block is moved into the future, so clone whatever the reducer needs
/// out of the environment before invoking the macro.
///
/// # Example
///
/// ```rust,ignore
/// use quill_core::async_effect;
///
/// let api = env.api.clone();
/// async_effect! {
///     let result = api.get_post(&id).await;
///     Some(PostDetailAction::Loaded { request, result })
/// }
/// ```
#[macro_export]
macro_rules! async_effect {
    ($($body:tt)*) => {
        $crate::effect::Effect::Future(
            ::std::boxed::Box::pin(async move { $($body)* })
        )
    };
}

/// Create an `Effect::Delay` for scheduling delayed actions
///
/// # Example
///
/// ```rust,ignore
/// use quill_core::delay;
/// use std::time::Duration;
///
/// delay! {
///     duration: Duration::from_secs(2),
///     action: AuthFormAction::RedirectToLogin
/// }
/// ```
#[macro_export]
macro_rules! delay {
    (
        duration: $duration:expr,
        action: $action:expr
    ) => {
        $crate::effect::Effect::Delay {
            duration: $duration,
            action: ::std::boxed::Box::new($action),
        }
    };
}
