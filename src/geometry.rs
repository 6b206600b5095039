//! # Geometry Module
//!
//! Turns KML and GPX geometry elements into GeoJSON geometries.
//!
//! KML geometries are collected per feature in a fixed precedence order
//! (see [`KmlGeometryKind::PRECEDENCE`]). `MultiGeometry`, `MultiTrack` and
//! `gx:MultiTrack` are transparent containers: their members are descendants
//! of the feature and join its list without a nested geometry node.
//!
//! GPX lines need at least two points. Shorter segments and routes are
//! dropped rather than padded.

use geojson::{Geometry, Value};

use crate::coords::{
    parse_coordinate_pair, parse_coordinate_sequence, parse_f64, parse_scalar_coordinate,
    Position,
};
use crate::dom::Element;

/// KML geometry elements understood by the converter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KmlGeometryKind {
    Polygon,
    LineString,
    Point,
    Track,
    GxTrack,
    LatLonBox,
}

impl KmlGeometryKind {
    /// Order in which geometries of one feature are emitted.
    pub const PRECEDENCE: [Self; 6] = [
        Self::Polygon,
        Self::LineString,
        Self::Point,
        Self::Track,
        Self::GxTrack,
        Self::LatLonBox,
    ];

    pub fn tag(self) -> &'static str {
        match self {
            Self::Polygon => "Polygon",
            Self::LineString => "LineString",
            Self::Point => "Point",
            Self::Track => "Track",
            Self::GxTrack => "gx:Track",
            Self::LatLonBox => "LatLonBox",
        }
    }

    pub fn assemble(self, node: &Element) -> AssembledGeometry {
        match self {
            Self::Polygon => AssembledGeometry::plain(polygon(node)),
            Self::LineString => AssembledGeometry::plain(line_string(node)),
            Self::Point => AssembledGeometry::plain(point(node)),
            Self::Track | Self::GxTrack => track(node),
            Self::LatLonBox => AssembledGeometry::plain(lat_lon_box(node)),
        }
    }
}

/// A geometry plus the per-vertex timestamps it carried, if any.
#[derive(Debug, Clone, PartialEq)]
pub struct AssembledGeometry {
    pub geometry: Geometry,
    pub times: Option<Vec<String>>,
}

impl AssembledGeometry {
    fn plain(geometry: Geometry) -> Self {
        Self {
            geometry,
            times: None,
        }
    }
}

/// Every geometry under a KML feature, in precedence order and then in
/// document order.
pub fn kml_geometries(root: &Element) -> Vec<AssembledGeometry> {
    KmlGeometryKind::PRECEDENCE
        .iter()
        .flat_map(|kind| {
            root.descendants(kind.tag())
                .into_iter()
                .map(move |node| kind.assemble(node))
        })
        .collect()
}

fn point(node: &Element) -> Geometry {
    Geometry::new(Value::Point(parse_scalar_coordinate(
        &node.first_text("coordinates"),
    )))
}

fn line_string(node: &Element) -> Geometry {
    Geometry::new(Value::LineString(parse_coordinate_sequence(
        &node.first_text("coordinates"),
    )))
}

// Rings stay in source order; winding is not normalized.
fn polygon(node: &Element) -> Geometry {
    let rings = node
        .descendants("LinearRing")
        .into_iter()
        .map(|ring| parse_coordinate_sequence(&ring.first_text("coordinates")))
        .collect();
    Geometry::new(Value::Polygon(rings))
}

fn lat_lon_box(node: &Element) -> Geometry {
    let bound = |tag: &str| parse_f64(&node.first_text(tag));
    let (west, south, east, north) = (bound("west"), bound("south"), bound("east"), bound("north"));

    let ring = vec![
        vec![west, south],
        vec![west, north],
        vec![east, north],
        vec![east, south],
        vec![west, south],
    ];

    Geometry {
        bbox: Some(vec![west, south, east, north]),
        value: Value::Polygon(vec![ring]),
        foreign_members: None,
    }
}

fn track(node: &Element) -> AssembledGeometry {
    let mut coord_nodes = node.descendants("coord");
    if coord_nodes.is_empty() {
        coord_nodes = node.descendants("gx:coord");
    }
    let coordinates: Vec<Position> = coord_nodes
        .iter()
        .map(|c| c.text().split_whitespace().map(parse_f64).collect())
        .collect();

    let times: Vec<String> = node
        .descendants("when")
        .iter()
        .map(|w| w.text())
        .collect();

    AssembledGeometry {
        geometry: Geometry::new(Value::LineString(coordinates)),
        times: (!times.is_empty()).then_some(times),
    }
}

/// Points of one GPX line with the samples recorded along it.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct GpxLine {
    pub coordinates: Vec<Position>,
    pub times: Vec<String>,
    pub heart_rates: Vec<f64>,
}

/// Reads the `point_tag` children of a GPX segment or route. Returns `None`
/// for fewer than two points.
pub fn gpx_line(node: &Element, point_tag: &str) -> Option<GpxLine> {
    let points = node.descendants(point_tag);
    if points.len() < 2 {
        return None;
    }

    let mut line = GpxLine::default();
    for point in points {
        let pair = parse_coordinate_pair(point);
        line.coordinates.push(pair.coordinates);
        line.times.extend(pair.time);
        line.heart_rates.extend(pair.heart_rate);
    }
    Some(line)
}

/// A GPX track: one line per usable `trkseg`.
#[derive(Debug, Clone, PartialEq)]
pub struct GpxTrack {
    pub geometry: Geometry,
    pub lines: Vec<GpxLine>,
}

/// Builds a `LineString` for a single usable segment or a
/// `MultiLineString` for several. Returns `None` when no segment has two
/// points.
pub fn gpx_track(node: &Element) -> Option<GpxTrack> {
    let lines: Vec<GpxLine> = node
        .descendants("trkseg")
        .into_iter()
        .filter_map(|segment| gpx_line(segment, "trkpt"))
        .collect();

    let value = match lines.as_slice() {
        [] => return None,
        [single] => Value::LineString(single.coordinates.clone()),
        many => Value::MultiLineString(many.iter().map(|l| l.coordinates.clone()).collect()),
    };

    Some(GpxTrack {
        geometry: Geometry::new(value),
        lines,
    })
}

pub fn gpx_point(node: &Element) -> Geometry {
    Geometry::new(Value::Point(parse_coordinate_pair(node).coordinates))
}
