use tracing::debug;

use crate::error::GlossaryError;
use crate::store::KeyValueStore;

/// Version of the remote dataset this build expects.
pub const BUILD_DATA_VERSION: &str = "2025.06.1";

pub const VERSION_KEY: &str = "glossary_data_version";

/// Decides whether the cached entry table can be trusted.
#[derive(Debug, Clone)]
pub struct VersionGate {
    expected: String,
}

impl VersionGate {
    pub fn new(expected: impl Into<String>) -> Self {
        Self {
            expected: expected.into(),
        }
    }

    pub fn expected(&self) -> &str {
        &self.expected
    }

    pub fn stored(&self, settings: &dyn KeyValueStore) -> Result<Option<String>, GlossaryError> {
        settings.get(VERSION_KEY)
    }

    /// True only when the stored stamp equals the expected version. A read
    /// failure counts as a mismatch.
    pub fn is_current(&self, settings: &dyn KeyValueStore) -> bool {
        match self.stored(settings) {
            Ok(Some(stamp)) => stamp == self.expected,
            Ok(None) => false,
            Err(err) => {
                debug!(error = %err, "version stamp unreadable");
                false
            }
        }
    }

    pub fn record(&self, settings: &dyn KeyValueStore) -> Result<(), GlossaryError> {
        settings.set(VERSION_KEY, &self.expected)
    }
}

impl Default for VersionGate {
    fn default() -> Self {
        Self::new(BUILD_DATA_VERSION)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::Store;
    use camino::Utf8PathBuf;

    #[test]
    fn stamp_must_match_exactly() {
        let dir = tempfile::tempdir().unwrap();
        let store = Store::new_with_root(Utf8PathBuf::from_path_buf(dir.path().to_path_buf()).unwrap());
        let gate = VersionGate::new("v2");

        assert!(!gate.is_current(&store));
        store.set(VERSION_KEY, "v1").unwrap();
        assert!(!gate.is_current(&store));
        gate.record(&store).unwrap();
        assert!(gate.is_current(&store));
        assert_eq!(gate.stored(&store).unwrap().as_deref(), Some("v2"));
    }
}
