//! Ordered collection of feature declarations.

use std::sync::Arc;

use crate::feature::FeatureEntry;
use crate::features;

/// The features known to a session, in display order.
///
/// Duplicate keys or names are tolerated here and rejected when the command
/// registry is assembled from the catalog.
#[derive(Debug, Clone, Default)]
pub struct FeatureCatalog {
    entries: Vec<Arc<FeatureEntry>>,
}

impl FeatureCatalog {
    pub fn new(entries: impl IntoIterator<Item = FeatureEntry>) -> Self {
        Self {
            entries: entries.into_iter().map(Arc::new).collect(),
        }
    }

    /// Every built-in feature.
    pub fn builtin() -> Self {
        Self::new(features::builtin_entries())
    }

    /// Builder: append an entry.
    pub fn with(mut self, entry: FeatureEntry) -> Self {
        self.entries.push(Arc::new(entry));
        self
    }

    /// Look up an entry by key (`"CROP"`).
    pub fn get(&self, key: &str) -> Option<&Arc<FeatureEntry>> {
        self.entries.iter().find(|e| e.key() == key)
    }

    /// Look up an entry by display name (`"Crop"`).
    pub fn by_name(&self, name: &str) -> Option<&Arc<FeatureEntry>> {
        self.entries.iter().find(|e| e.name() == name)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Arc<FeatureEntry>> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builtin_contains_every_feature() {
        let catalog = FeatureCatalog::builtin();
        let keys: Vec<&str> = catalog.iter().map(|e| e.key()).collect();
        assert_eq!(
            keys,
            [
                "ASPECT_RATIO",
                "RESIZE",
                "CROP",
                "TRIM",
                "COMPRESS",
                "CONVERT",
                "GRAYSCALE",
                "REMOVE_AUDIO",
                "VOLUME",
                "CUSTOM_RUN"
            ]
        );
    }

    #[test]
    fn builtin_defaults_compile() {
        for entry in FeatureCatalog::builtin().iter() {
            if let Some(defaults) = entry.default_configuration() {
                assert!(
                    entry.instantiate(defaults).is_ok(),
                    "defaults of {} do not compile",
                    entry.key()
                );
            }
        }
    }

    #[test]
    fn direct_features_have_no_ui() {
        let catalog = FeatureCatalog::builtin();
        for key in ["GRAYSCALE", "REMOVE_AUDIO"] {
            let entry = catalog.get(key).unwrap();
            assert!(entry.ui_handle().is_none());
            assert!(entry.default_configuration().is_some());
        }
        assert!(catalog.get("CROP").unwrap().ui_handle().is_some());
    }

    #[test]
    fn lookup_by_name() {
        let catalog = FeatureCatalog::builtin();
        assert_eq!(catalog.by_name("Change Volume").unwrap().key(), "VOLUME");
        assert!(catalog.by_name("Sharpen").is_none());
    }

    #[test]
    fn duplicates_are_kept() {
        let dup = FeatureCatalog::builtin()
            .iter()
            .find(|e| e.key() == "CROP")
            .map(|e| FeatureEntry::clone(e))
            .unwrap();
        let catalog = FeatureCatalog::builtin().with(dup);
        assert_eq!(catalog.len(), 11);
        assert!(FeatureCatalog::default().is_empty());
    }
}
