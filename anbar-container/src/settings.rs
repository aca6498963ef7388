//! Container configuration.

use serde::Deserialize;

/// Tunables for a [`Container`](crate::Container).
///
/// Every field has a default, so settings can be loaded from a partial
/// configuration document.
///
/// ```rust
/// use anbar_container::{Container, ContainerSettings};
///
/// let settings = ContainerSettings {
///     eager_singletons: true,
///     ..ContainerSettings::default()
/// };
/// let container = Container::with_settings(settings);
/// assert!(container.is_empty());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct ContainerSettings {
    /// How many "did you mean" names a not-found error may list.
    pub max_suggestions: usize,

    /// Construct every singleton during build, turning construction
    /// failures into build failures.
    pub eager_singletons: bool,
}

impl Default for ContainerSettings {
    fn default() -> Self {
        Self {
            max_suggestions: 3,
            eager_singletons: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let settings = ContainerSettings::default();
        assert_eq!(settings.max_suggestions, 3);
        assert!(!settings.eager_singletons);
    }

    #[test]
    fn partial_document_keeps_defaults() {
        let settings: ContainerSettings =
            serde_json::from_str(r#"{ "eager_singletons": true }"#).unwrap();
        assert!(settings.eager_singletons);
        assert_eq!(settings.max_suggestions, 3);
    }

    #[test]
    fn empty_document() {
        let settings: ContainerSettings = serde_json::from_str("{}").unwrap();
        assert_eq!(settings, ContainerSettings::default());
    }
}
