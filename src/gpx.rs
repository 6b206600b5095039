//! # GPX Module
//!
//! Converts tracks, then routes, then waypoints of a GPX document into
//! GeoJSON Features.

use geojson::{Feature, FeatureCollection, Geometry, Value};
use tracing::debug;

use crate::dom::{Document, Element};
use crate::feature::{feature, gpx_properties, insert_parallel, insert_text};
use crate::geometry::{gpx_line, gpx_point, gpx_track};

pub fn convert_gpx(doc: &Document) -> FeatureCollection {
    let tracks = doc.descendants("trk");
    let routes = doc.descendants("rte");
    let waypoints = doc.descendants("wpt");

    let mut features = Vec::with_capacity(tracks.len() + routes.len() + waypoints.len());
    features.extend(tracks.iter().filter_map(|node| track_feature(node)));
    features.extend(routes.iter().filter_map(|node| route_feature(node)));
    features.extend(waypoints.iter().map(|node| waypoint_feature(node)));

    debug!(
        "Converted {} tracks, {} routes and {} waypoints into {} features",
        tracks.len(),
        routes.len(),
        waypoints.len(),
        features.len()
    );

    FeatureCollection {
        bbox: None,
        features,
        foreign_members: None,
    }
}

fn track_feature(node: &Element) -> Option<Feature> {
    let track = gpx_track(node)?;
    let single = track.lines.len() == 1;

    let mut properties = gpx_properties(node);
    let (times, heart_rates): (Vec<_>, Vec<_>) = track
        .lines
        .into_iter()
        .map(|line| (line.times, line.heart_rates))
        .unzip();
    insert_parallel(&mut properties, "coordTimes", times, single);
    insert_parallel(&mut properties, "heartRates", heart_rates, single);

    Some(feature(Some(track.geometry), properties, None))
}

fn route_feature(node: &Element) -> Option<Feature> {
    let line = gpx_line(node, "rtept")?;

    let mut properties = gpx_properties(node);
    insert_parallel(&mut properties, "coordTimes", vec![line.times], true);
    insert_parallel(&mut properties, "heartRates", vec![line.heart_rates], true);

    let geometry = Geometry::new(Value::LineString(line.coordinates));
    Some(feature(Some(geometry), properties, None))
}

fn waypoint_feature(node: &Element) -> Feature {
    let mut properties = gpx_properties(node);
    insert_text(&mut properties, "sym", node.first_text("sym"));
    feature(Some(gpx_point(node)), properties, None)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_order_tracks_routes_waypoints() {
        let doc = Document::parse(
            r#"<gpx>
                <wpt lat="1" lon="1"><name>w</name></wpt>
                <rte><name>r</name><rtept lat="1" lon="1"/><rtept lat="2" lon="2"/></rte>
                <trk><name>t</name><trkseg><trkpt lat="1" lon="1"/><trkpt lat="2" lon="2"/></trkseg></trk>
            </gpx>"#,
        )
        .unwrap();

        let names: Vec<_> = convert_gpx(&doc)
            .features
            .iter()
            .map(|f| f.property("name").unwrap().as_str().unwrap().to_string())
            .collect();
        assert_eq!(names, vec!["t", "r", "w"]);
    }

    #[test]
    fn test_short_route_is_skipped() {
        let doc = Document::parse(r#"<gpx><rte><rtept lat="1" lon="1"/></rte></gpx>"#).unwrap();
        assert!(convert_gpx(&doc).features.is_empty());
    }

    #[test]
    fn test_route_times() {
        let doc = Document::parse(
            r#"<gpx><rte>
                <rtept lat="1" lon="2"><time>t1</time></rtept>
                <rtept lat="3" lon="4"><time>t2</time></rtept>
            </rte></gpx>"#,
        )
        .unwrap();

        let fc = convert_gpx(&doc);
        assert_eq!(
            fc.features[0].property("coordTimes"),
            Some(&serde_json::json!(["t1", "t2"]))
        );
        assert!(!fc.features[0].contains_property("heartRates"));
    }

    #[test]
    fn test_waypoint_sym() {
        let doc = Document::parse(
            r#"<gpx><wpt lat="10" lon="20"><ele>5</ele><sym>Flag</sym></wpt><wpt lat="0" lon="0"><sym></sym></wpt></gpx>"#,
        )
        .unwrap();

        let fc = convert_gpx(&doc);
        assert_eq!(fc.features[0].property("sym"), Some(&serde_json::json!("Flag")));
        assert_eq!(
            fc.features[0].geometry.as_ref().unwrap().value,
            Value::Point(vec![20.0, 10.0, 5.0])
        );
        assert!(!fc.features[1].contains_property("sym"));
    }
}
