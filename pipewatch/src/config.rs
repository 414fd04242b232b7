use std::time::Duration;

/// Environment variable enabling interactive mode (`1`, `true`, `yes`, `on`).
pub const INTERACTIVE_ENV: &str = "PIPEWATCH_INTERACTIVE";

/// Environment variable overriding the default timeout, in milliseconds.
pub const TIMEOUT_MS_ENV: &str = "PIPEWATCH_TIMEOUT_MS";

/// Harness configuration.
///
/// Controls how long wait calls block and how concurrent sessions on one
/// bus are treated. Use the builder methods to customize, or [`Default`]
/// for the standard settings.
///
/// # Timeout resolution
///
/// For each wait call the effective timeout is, in order of precedence:
/// 1. the per-call override (`within` / `without_timeout`),
/// 2. no timeout at all when [`interactive`](Self::interactive) is set,
/// 3. [`default_timeout`](Self::default_timeout).
///
/// Interactive mode exists for stepping through a test in a debugger, where
/// a wall-clock deadline would fail the test spuriously. Never enable it in
/// automated runs: a wait that never matches then blocks forever.
///
/// # Examples
///
/// ```rust
/// use std::time::Duration;
/// use pipewatch::Config;
///
/// let config = Config::default()
///     .with_default_timeout(Duration::from_secs(2))
///     .with_serialized_sessions(true);
///
/// assert_eq!(config.effective_timeout(None), Some(Duration::from_secs(2)));
/// assert_eq!(config.with_interactive(true).effective_timeout(None), None);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct Config {
    /// Deadline applied when a call does not override it.
    /// Default: 10s
    default_timeout: Duration,

    /// Disable the default deadline.
    /// Default: false
    interactive: bool,

    /// Queue sessions behind other serialized sessions on the same bus.
    /// Default: false
    serialized_sessions: bool,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            default_timeout: Duration::from_secs(10),
            interactive: false,
            serialized_sessions: false,
        }
    }
}

impl Config {
    /// Default settings overlaid with [`INTERACTIVE_ENV`] and [`TIMEOUT_MS_ENV`].
    ///
    /// Unparseable values are ignored with a warning.
    pub fn from_env() -> Self {
        Self::default().with_env_overrides(|key| std::env::var(key).ok())
    }

    pub(crate) fn with_env_overrides(mut self, lookup: impl Fn(&str) -> Option<String>) -> Self {
        if let Some(raw) = lookup(INTERACTIVE_ENV) {
            match parse_flag(&raw) {
                Some(flag) => self.interactive = flag,
                None => tracing::warn!(var = INTERACTIVE_ENV, value = %raw, "ignoring unparseable flag"),
            }
        }
        if let Some(raw) = lookup(TIMEOUT_MS_ENV) {
            match raw.trim().parse::<u64>() {
                Ok(ms) => self.default_timeout = Duration::from_millis(ms),
                Err(e) => tracing::warn!(var = TIMEOUT_MS_ENV, value = %raw, error = %e, "ignoring unparseable timeout"),
            }
        }
        self
    }

    /// Set the deadline used when a call does not override it.
    pub fn with_default_timeout(mut self, timeout: Duration) -> Self {
        self.default_timeout = timeout;
        self
    }

    /// Returns the deadline used when a call does not override it.
    pub fn default_timeout(&self) -> Duration {
        self.default_timeout
    }

    /// Enable or disable interactive mode (no default deadline).
    pub fn with_interactive(mut self, interactive: bool) -> Self {
        self.interactive = interactive;
        self
    }

    pub fn interactive(&self) -> bool {
        self.interactive
    }

    /// Queue this harness's sessions on the bus's session gate.
    ///
    /// Only harnesses with this flag set take the gate, so they wait for
    /// each other. A sink attached by hand, or a session from a harness
    /// without the flag, still makes the call fail with
    /// [`Error::SessionAlreadyArmed`](crate::Error::SessionAlreadyArmed).
    pub fn with_serialized_sessions(mut self, serialized: bool) -> Self {
        self.serialized_sessions = serialized;
        self
    }

    pub fn serialized_sessions(&self) -> bool {
        self.serialized_sessions
    }

    /// Resolve the deadline for one call.
    ///
    /// `per_call` is `Some(Some(d))` for an explicit deadline, `Some(None)`
    /// for an explicit "no deadline" and `None` when the call did not say.
    pub fn effective_timeout(&self, per_call: Option<Option<Duration>>) -> Option<Duration> {
        match per_call {
            Some(explicit) => explicit,
            None if self.interactive => None,
            None => Some(self.default_timeout),
        }
    }
}

fn parse_flag(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" | "" => Some(false),
        _ => None,
    }
}
