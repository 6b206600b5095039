//! Coordinate text parsing shared by the KML and GPX readers.

use crate::dom::Element;

pub type Position = Vec<f64>;

/// Parses one `lon,lat[,alt]` group. Whitespace anywhere in the group is
/// ignored; parts that are not numbers become `NaN`.
pub fn parse_scalar_coordinate(text: &str) -> Position {
    let compact: String = text.chars().filter(|c| !c.is_whitespace()).collect();
    compact.split(',').map(parse_f64).collect()
}

/// Parses a whitespace separated list of coordinate groups, keeping the
/// source order.
pub fn parse_coordinate_sequence(text: &str) -> Vec<Position> {
    text.split_whitespace().map(parse_scalar_coordinate).collect()
}

pub(crate) fn parse_f64(text: &str) -> f64 {
    text.trim().parse().unwrap_or(f64::NAN)
}

/// A GPX point (`trkpt`, `rtept` or `wpt`) read into GeoJSON order.
#[derive(Debug, Clone, PartialEq)]
pub struct CoordinatePair {
    /// `[lon, lat]` or `[lon, lat, ele]`
    pub coordinates: Position,
    pub time: Option<String>,
    pub heart_rate: Option<f64>,
}

/// Reads `lat`/`lon` attributes plus optional `ele`, `time` and heart rate
/// children. Elevation and heart rate are kept only when numeric and
/// non-zero.
pub fn parse_coordinate_pair(node: &Element) -> CoordinatePair {
    let mut coordinates = vec![node.attr_f64("lon"), node.attr_f64("lat")];

    if let Some(ele) = node.first("ele") {
        let elevation = parse_f64(&ele.text());
        if is_present(elevation) {
            coordinates.push(elevation);
        }
    }

    let time = node
        .first("time")
        .map(Element::text)
        .filter(|t| !t.is_empty());

    let heart_rate = node
        .first("gpxtpx:hr")
        .or_else(|| node.first("hr"))
        .map(|hr| parse_f64(&hr.text()))
        .filter(|hr| is_present(*hr));

    CoordinatePair {
        coordinates,
        time,
        heart_rate,
    }
}

// zero and NaN both read as "no value"
fn is_present(value: f64) -> bool {
    value != 0.0 && !value.is_nan()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dom::Document;

    #[test]
    fn test_parse_coordinate_sequence_keeps_order() {
        assert_eq!(
            parse_coordinate_sequence("1,2 3,4"),
            vec![vec![1.0, 2.0], vec![3.0, 4.0]]
        );
        assert_eq!(
            parse_coordinate_sequence("\n   135.5,35.1,10\n\t136.0,35.2,12   \n"),
            vec![vec![135.5, 35.1, 10.0], vec![136.0, 35.2, 12.0]]
        );
    }

    #[test]
    fn test_parse_coordinate_sequence_empty() {
        assert!(parse_coordinate_sequence("   ").is_empty());
    }

    #[test]
    fn test_parse_scalar_coordinate_non_numeric() {
        let coords = parse_scalar_coordinate("1.5,abc");
        assert_eq!(coords.len(), 2);
        assert_eq!(coords[0], 1.5);
        assert!(coords[1].is_nan());
    }

    #[test]
    fn test_parse_coordinate_pair_flips_to_lon_lat() {
        let doc = Document::parse(
            r#"<trkpt lat="45.5" lon="-122.5"><ele>100</ele><time>2024-01-01T00:00:00Z</time></trkpt>"#,
        )
        .unwrap();
        let pair = parse_coordinate_pair(doc.root());

        assert_eq!(pair.coordinates, vec![-122.5, 45.5, 100.0]);
        assert_eq!(pair.time.as_deref(), Some("2024-01-01T00:00:00Z"));
        assert_eq!(pair.heart_rate, None);
    }

    #[test]
    fn test_parse_coordinate_pair_zero_elevation_dropped() {
        let doc = Document::parse(r#"<wpt lat="1" lon="2"><ele>0</ele></wpt>"#).unwrap();
        assert_eq!(parse_coordinate_pair(doc.root()).coordinates, vec![2.0, 1.0]);
    }

    #[test]
    fn test_parse_coordinate_pair_heart_rate() {
        let namespaced = Document::parse(
            r#"<trkpt lat="1" lon="2"><extensions><gpxtpx:TrackPointExtension><gpxtpx:hr>142</gpxtpx:hr></gpxtpx:TrackPointExtension></extensions></trkpt>"#,
        )
        .unwrap();
        let bare = Document::parse(
            r#"<trkpt lat="1" lon="2"><extensions><hr>98</hr></extensions></trkpt>"#,
        )
        .unwrap();

        assert_eq!(parse_coordinate_pair(namespaced.root()).heart_rate, Some(142.0));
        assert_eq!(parse_coordinate_pair(bare.root()).heart_rate, Some(98.0));
    }
}
