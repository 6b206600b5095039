//! # KML Module
//!
//! Converts every `Placemark` and then every `GroundOverlay` of a KML
//! document into GeoJSON Features.

use geojson::{FeatureCollection, Value};
use tracing::debug;

use crate::dom::{Document, Element};
use crate::feature::{build_features, kml_properties};
use crate::geometry::kml_geometries;
use crate::style::StyleIndex;

pub fn convert_kml(doc: &Document) -> FeatureCollection {
    let styles = StyleIndex::build(doc);
    let placemarks = doc.descendants("Placemark");
    let overlays = doc.descendants("GroundOverlay");

    let features: Vec<_> = placemarks
        .iter()
        .chain(overlays.iter())
        .flat_map(|node| convert_feature(node, &styles))
        .collect();

    debug!(
        "Converted {} placemarks and {} ground overlays into {} features",
        placemarks.len(),
        overlays.len(),
        features.len()
    );

    FeatureCollection {
        bbox: None,
        features,
        foreign_members: None,
    }
}

fn convert_feature(node: &Element, styles: &StyleIndex<'_>) -> Vec<geojson::Feature> {
    let assembled = kml_geometries(node);
    if assembled.is_empty() {
        return Vec::new();
    }

    let mut geometries = Vec::with_capacity(assembled.len());
    let mut coord_times = Vec::new();
    for geometry in assembled {
        coord_times.extend(geometry.times);
        geometries.push(geometry.geometry);
    }

    let has_polygon = geometries.iter().any(|g| matches!(g.value, Value::Polygon(_)));
    let has_point = geometries.iter().any(|g| matches!(g.value, Value::Point(_)));
    if geometries.len() > 1 && has_polygon && has_point {
        debug!(
            "<{}> {:?} mixes polygon and point geometries",
            node.name(),
            node.attr("id").unwrap_or_default()
        );
    }

    let properties = kml_properties(node, styles, coord_times);
    build_features(geometries, properties, node.attr("id"))
}
