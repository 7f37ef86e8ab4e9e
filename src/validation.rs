//! Input validation.
//!
//! Every precondition of a run is checked here, before any index is built.

use std::collections::HashSet;

use crate::error::ValidationError;
use crate::layer::{GeometryKind, LayerInput};

/// Validates caller-supplied layers.
///
/// # Errors
/// - `NoLayers` if `layers` is empty
/// - `EmptyLayerId`, `DuplicateLayer` for bad layer identity
/// - `NotPolygonLayer` if a layer is not declared polygonal
/// - `CrsMismatch` if a layer's CRS differs from the first layer's
/// - `DuplicateFeature`, `SchemaMismatch` for bad feature rows
pub fn validate_layers(layers: &[LayerInput]) -> Result<(), ValidationError> {
    let Some(first) = layers.first() else {
        return Err(ValidationError::NoLayers);
    };

    let mut seen_layers = HashSet::with_capacity(layers.len());
    for layer in layers {
        if layer.id.as_str().trim().is_empty() {
            return Err(ValidationError::EmptyLayerId);
        }
        if !seen_layers.insert(&layer.id) {
            return Err(ValidationError::DuplicateLayer {
                layer: layer.id.clone(),
            });
        }
        if layer.geometry_kind != GeometryKind::Polygon {
            return Err(ValidationError::NotPolygonLayer {
                layer: layer.id.clone(),
                kind: layer.geometry_kind,
            });
        }
        if layer.crs != first.crs {
            return Err(ValidationError::CrsMismatch {
                layer: layer.id.clone(),
                expected: first.crs.clone(),
                actual: layer.crs.clone(),
            });
        }
        validate_features(layer)?;
    }
    Ok(())
}

fn validate_features(layer: &LayerInput) -> Result<(), ValidationError> {
    let mut seen = HashSet::with_capacity(layer.features.len());
    for feature in &layer.features {
        if !seen.insert(feature.id) {
            return Err(ValidationError::DuplicateFeature {
                layer: layer.id.clone(),
                feature: feature.id,
            });
        }
        if feature.attributes.len() != layer.fields.len() {
            return Err(ValidationError::SchemaMismatch {
                layer: layer.id.clone(),
                feature: feature.id,
                expected: layer.fields.len(),
                actual: feature.attributes.len(),
            });
        }
    }
    Ok(())
}
