/// Options of the DevTools instrumentation.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct DevToolsConfiguration {
    /// Whether [`default_enhancer`](crate::default_enhancer) instruments the store.
    pub enabled: bool,
    /// Display name of the store. Defaults to `"Store for <state type>"`.
    pub name: Option<String>,
    /// Number of actions kept after the initial one before the oldest are
    /// committed. `0` keeps everything.
    pub max_age: usize,
    /// Record reducer panics on the computed state instead of unwinding.
    pub should_catch_exceptions: bool,
    pub should_start_locked: bool,
    pub should_record_changes: bool,
}

impl Default for DevToolsConfiguration {
    fn default() -> Self {
        DevToolsConfiguration {
            enabled: false,
            name: None,
            max_age: 100,
            should_catch_exceptions: true,
            should_start_locked: false,
            should_record_changes: true,
        }
    }
}

impl DevToolsConfiguration {
    pub fn enabled() -> Self {
        DevToolsConfiguration {
            enabled: true,
            ..Default::default()
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn with_max_age(mut self, max_age: usize) -> Self {
        self.max_age = max_age;
        self
    }

    pub fn with_catch_exceptions(mut self, catch: bool) -> Self {
        self.should_catch_exceptions = catch;
        self
    }

    pub fn with_start_locked(mut self, locked: bool) -> Self {
        self.should_start_locked = locked;
        self
    }

    pub fn with_record_changes(mut self, record: bool) -> Self {
        self.should_record_changes = record;
        self
    }

    /// Reads a configuration from JSON. Missing fields keep their defaults.
    #[cfg(feature = "serde")]
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }
}
