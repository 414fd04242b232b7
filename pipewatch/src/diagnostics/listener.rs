use crate::Activity;

/// Receiver of activities emitted into a [`DiagnosticSource`](crate::DiagnosticSource).
///
/// `on_activity` runs on the pipeline task that emitted the activity, so it
/// must be quick and must not block. A listener that panics is removed from
/// the source.
///
/// Closures `Fn(&Activity) + Send + Sync` implement this trait.
///
/// # Example
///
/// ```rust
/// use pipewatch::{Activity, ActivityListener};
///
/// struct NameLogger;
///
/// impl ActivityListener for NameLogger {
///     fn on_activity(&self, activity: &Activity) {
///         println!("[activity] {}", activity.name());
///     }
/// }
/// ```
pub trait ActivityListener: Send + Sync {
    /// Called once for every emitted activity.
    fn on_activity(&self, activity: &Activity);
}

impl<F> ActivityListener for F
where
    F: Fn(&Activity) + Send + Sync,
{
    fn on_activity(&self, activity: &Activity) {
        self(activity)
    }
}
