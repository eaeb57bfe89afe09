//! Default encode parameters, keyed by job kind.

use restrike_model::{EncodeSettings, JobKind};

use crate::config::EncodeDefaults;

/// Source of fallback encode parameters. Consulted only when a job's
/// own settings blob is absent or unparseable.
pub trait SettingsProvider: Send + Sync {
    fn defaults_for(&self, kind: JobKind) -> EncodeSettings;
}

/// Serves statically configured defaults.
#[derive(Clone, Copy, Debug, Default)]
pub struct FixedSettingsProvider {
    defaults: EncodeDefaults,
}

impl FixedSettingsProvider {
    pub fn new(defaults: EncodeDefaults) -> Self {
        Self { defaults }
    }
}

impl SettingsProvider for FixedSettingsProvider {
    fn defaults_for(&self, kind: JobKind) -> EncodeSettings {
        self.defaults.for_kind(kind)
    }
}
