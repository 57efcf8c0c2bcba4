//! Price model bundle loader.

use std::path::Path;

use rental_map_price::{ModelBundle, ModelRegistry};

use crate::IngestError;

/// Reads one JSON model bundle.
///
/// # Errors
///
/// Returns [`IngestError`] if the file cannot be read or is not a valid
/// bundle.
pub fn load_bundle(path: &Path) -> Result<ModelBundle, IngestError> {
    let text = std::fs::read_to_string(path).map_err(|e| IngestError::io(path, e))?;
    let bundle = ModelBundle::from_json(&text)?;
    log::debug!("Read {} models from {}", bundle.models.len(), path.display());
    Ok(bundle)
}

/// Builds a registry with the default schedule from every bundle in
/// `paths`.
///
/// # Errors
///
/// Returns the first [`IngestError`] from [`load_bundle`].
pub fn load_registry(paths: &[impl AsRef<Path>]) -> Result<ModelRegistry, IngestError> {
    let mut registry = ModelRegistry::default();
    for path in paths {
        registry.add_bundle(load_bundle(path.as_ref())?);
    }
    Ok(registry)
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use super::*;

    #[test]
    fn no_bundles_give_an_empty_registry() {
        let registry = load_registry(&Vec::<PathBuf>::new()).unwrap();
        assert!(registry.is_empty());
    }

    #[test]
    fn missing_bundle_fails_the_whole_registry() {
        let missing = PathBuf::from("/nonexistent/rental_map/models.json");
        let err = load_registry(&[missing.clone()]).unwrap_err();
        assert!(matches!(err, IngestError::Io { ref path, .. } if *path == missing));
    }
}
