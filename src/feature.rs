//! # Feature Module
//!
//! Assembles GeoJSON property bags and Features. Every writer in this module
//! skips empty values, so a property is either absent or meaningful; no key
//! is ever `null` or `""`.

use geojson::{feature::Id, Feature, Geometry, JsonObject};
use serde_json::Value;

use crate::color::parse_kml_color;
use crate::coords::parse_f64;
use crate::description;
use crate::dom::Element;
use crate::style::StyleIndex;

/// GPX elements copied verbatim into properties.
pub const GPX_METADATA: [&str; 7] = [
    "name",
    "desc",
    "author",
    "copyright",
    "link",
    "time",
    "keywords",
];

pub(crate) fn insert_text(properties: &mut JsonObject, key: &str, value: String) {
    if !value.is_empty() {
        properties.insert(key.to_string(), Value::String(value));
    }
}

fn insert_number(properties: &mut JsonObject, key: &str, value: Option<f64>) {
    if let Some(v) = value.filter(|v| !v.is_nan()) {
        properties.insert(key.to_string(), Value::from(v));
    }
}

/// Writes per-vertex samples. A single part is stored as a flat array,
/// several parts as an array of arrays. Nothing is written without samples.
pub(crate) fn insert_parallel<T>(
    properties: &mut JsonObject,
    key: &str,
    mut parts: Vec<Vec<T>>,
    single: bool,
) where
    T: Into<Value>,
{
    parts.retain(|part| !part.is_empty());
    if parts.is_empty() {
        return;
    }

    let value = if single && parts.len() == 1 {
        Value::Array(parts.remove(0).into_iter().map(Into::into).collect())
    } else {
        Value::Array(
            parts
                .into_iter()
                .map(|part| Value::Array(part.into_iter().map(Into::into).collect()))
                .collect(),
        )
    };
    properties.insert(key.to_string(), value);
}

/// Builds the properties of a KML `Placemark` or `GroundOverlay`.
pub fn kml_properties(
    root: &Element,
    styles: &StyleIndex<'_>,
    coord_times: Vec<Vec<String>>,
) -> JsonObject {
    let mut properties = JsonObject::new();

    insert_text(&mut properties, "name", root.first_text("name"));

    let mut line_style = root.first("LineStyle");
    let mut poly_style = root.first("PolyStyle");
    let mut icon_style = root.first("IconStyle").or_else(|| root.first("Icon"));

    let style_url = root.first_text("styleUrl");
    if let Some(lookup) = styles.lookup(&style_url) {
        properties.insert("styleUrl".to_string(), Value::String(style_url));
        insert_text(&mut properties, "styleHash", lookup.hash);
        line_style = lookup.style.line_style.or(line_style);
        poly_style = lookup.style.poly_style.or(poly_style);
        icon_style = lookup.style.icon_style.or(icon_style);
    }

    let text = root.first_text("description");
    if description::is_table(&text) {
        description::merge_table(&mut properties, &text);
    } else {
        insert_text(&mut properties, "description", text);
    }

    if let Some(time_span) = root.first("TimeSpan") {
        let mut span = JsonObject::new();
        insert_text(&mut span, "begin", time_span.first_text("begin"));
        insert_text(&mut span, "end", time_span.first_text("end"));
        if !span.is_empty() {
            properties.insert("timespan".to_string(), Value::Object(span));
        }
    }

    if let Some(icon) = icon_style.and_then(icon_properties) {
        properties.insert("icon".to_string(), Value::Object(icon));
    }

    if let Some(line) = line_style {
        let color = parse_kml_color(&line.first_text("color"));
        if let Some(stroke) = color.color {
            properties.insert("stroke".to_string(), Value::String(stroke));
        }
        insert_number(&mut properties, "stroke-opacity", color.opacity);
        insert_number(
            &mut properties,
            "stroke-width",
            Some(parse_f64(&line.first_text("width"))),
        );
    }

    if let Some(poly) = poly_style {
        let color = parse_kml_color(&poly.first_text("color"));
        if let Some(fill) = color.color {
            properties.insert("fill".to_string(), Value::String(fill));
        }
        insert_number(&mut properties, "fill-opacity", color.opacity);

        let fill = poly.first_text("fill");
        if !fill.is_empty() {
            properties.insert("fill-opacity".to_string(), flag(&fill));
        }
        let outline = poly.first_text("outline");
        if !outline.is_empty() && !properties.contains_key("stroke-opacity") {
            properties.insert("stroke-opacity".to_string(), flag(&outline));
        }
    }

    if let Some(extended) = root.first("ExtendedData") {
        for data in extended.descendants("Data") {
            if let Some(name) = data.attr("name") {
                insert_text(&mut properties, name, data.first_text("value"));
            }
        }
        for data in extended.descendants("SimpleData") {
            if let Some(name) = data.attr("name") {
                insert_text(&mut properties, name, data.text());
            }
        }
    }

    insert_parallel(&mut properties, "coordTimes", coord_times, true);

    properties
}

fn flag(value: &str) -> Value {
    Value::from(if value == "1" { 1 } else { 0 })
}

fn icon_properties(icon_style: &Element) -> Option<JsonObject> {
    let mut icon = JsonObject::new();
    insert_text(&mut icon, "url", icon_style.first_text("href"));
    insert_text(&mut icon, "scale", icon_style.first_text("scale"));
    insert_text(&mut icon, "color", icon_style.first_text("color"));

    if let Some(hot_spot) = icon_style.first("hotSpot") {
        let mut spot = JsonObject::new();
        for key in ["x", "y", "xunits", "yunits"] {
            insert_text(&mut spot, key, hot_spot.attr(key).unwrap_or_default().to_string());
        }
        if !spot.is_empty() {
            icon.insert("hotspot".to_string(), Value::Object(spot));
        }
    }

    (!icon.is_empty()).then_some(icon)
}

/// Builds the metadata properties shared by GPX tracks, routes and
/// waypoints.
pub fn gpx_properties(node: &Element) -> JsonObject {
    let mut properties = JsonObject::new();
    for key in GPX_METADATA {
        // descendant lookup: a track without its own <time> takes the first
        // point's time
        let mut value = node.first_text(key);
        if key == "link" && value.is_empty() {
            value = node
                .first("link")
                .and_then(|link| link.attr("href"))
                .unwrap_or_default()
                .to_string();
        }
        insert_text(&mut properties, key, value);
    }
    properties
}

/// Wraps geometries into Features. One geometry gives one Feature carrying
/// `id`; several give one Feature each with a copy of `properties`; none
/// give nothing.
pub fn build_features(
    geometries: Vec<Geometry>,
    properties: JsonObject,
    id: Option<&str>,
) -> Vec<Feature> {
    match geometries.len() {
        0 => Vec::new(),
        1 => vec![feature(
            geometries.into_iter().next(),
            properties,
            id.filter(|id| !id.is_empty()),
        )],
        _ => geometries
            .into_iter()
            .map(|geometry| feature(Some(geometry), properties.clone(), None))
            .collect(),
    }
}

pub(crate) fn feature(
    geometry: Option<Geometry>,
    properties: JsonObject,
    id: Option<&str>,
) -> Feature {
    Feature {
        bbox: None,
        geometry,
        id: id.map(|id| Id::String(id.to_string())),
        properties: Some(properties),
        foreign_members: None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dom::Document;
    use geojson::Value as GeoValue;

    fn properties_of(kml: &str) -> JsonObject {
        let doc = Document::parse(kml).unwrap();
        let styles = StyleIndex::build(&doc);
        let placemark = doc.descendants("Placemark")[0];
        kml_properties(placemark, &styles, Vec::new())
    }

    #[test]
    fn test_name_and_description() {
        let props = properties_of(
            "<kml><Placemark><name>Tower</name><description>Tall &amp; old</description></Placemark></kml>",
        );
        assert_eq!(props["name"], "Tower");
        assert_eq!(props["description"], "Tall & old");
    }

    #[test]
    fn test_empty_fields_are_omitted() {
        let props = properties_of(
            "<kml><Placemark><name></name><description>  </description><TimeSpan/><styleUrl>#none</styleUrl></Placemark></kml>",
        );
        assert!(props.is_empty(), "unexpected properties: {:?}", props);
    }

    #[test]
    fn test_table_description_replaces_description() {
        let props = properties_of(
            "<kml><Placemark><name>p</name><description><![CDATA[<table>\n<tr>\n<td>name</td>\n<td>Renamed</td>\n</tr>\n</table>]]></description></Placemark></kml>",
        );
        assert_eq!(props["name"], "Renamed");
        assert_eq!(props["og_name"], "p");
        assert!(!props.contains_key("description"));
    }

    #[test]
    fn test_table_without_rows_drops_description() {
        let props = properties_of(
            "<kml><Placemark><description><![CDATA[<table><tr><td>one line</td></tr></table>]]></description></Placemark></kml>",
        );
        assert!(!props.contains_key("description"));
    }

    #[test]
    fn test_timespan() {
        let props = properties_of(
            "<kml><Placemark><TimeSpan><begin>2020-01-01</begin></TimeSpan></Placemark></kml>",
        );
        assert_eq!(props["timespan"], serde_json::json!({"begin": "2020-01-01"}));
    }

    #[test]
    fn test_inline_styles() {
        let props = properties_of(
            r#"<kml><Placemark>
                <Style>
                    <IconStyle><color>ff00ff00</color><scale>1.1</scale><Icon><href>pin.png</href></Icon>
                        <hotSpot x="20" y="2" xunits="pixels" yunits="pixels"/></IconStyle>
                    <LineStyle><color>7f0000ff</color><width>4</width></LineStyle>
                    <PolyStyle><color>ff00ff00</color><outline>0</outline></PolyStyle>
                </Style>
            </Placemark></kml>"#,
        );

        assert_eq!(
            props["icon"],
            serde_json::json!({
                "url": "pin.png",
                "scale": "1.1",
                "color": "ff00ff00",
                "hotspot": {"x": "20", "y": "2", "xunits": "pixels", "yunits": "pixels"}
            })
        );
        assert_eq!(props["stroke"], "#ff0000");
        assert!((props["stroke-opacity"].as_f64().unwrap() - 127.0 / 255.0).abs() < 1e-12);
        assert_eq!(props["stroke-width"], 4.0);
        assert_eq!(props["fill"], "#00ff00");
        assert_eq!(props["fill-opacity"], 1.0);
    }

    #[test]
    fn test_fill_flag_overrides_opacity_and_outline_fills_gap() {
        let props = properties_of(
            "<kml><Placemark><PolyStyle><color>ff0000ff</color><fill>0</fill><outline>1</outline></PolyStyle></Placemark></kml>",
        );
        assert_eq!(props["fill-opacity"], 0);
        assert_eq!(props["stroke-opacity"], 1);
    }

    #[test]
    fn test_shared_style_overrides_inline_style() {
        let props = properties_of(
            r##"<kml><Document>
                <Style id="thick"><LineStyle><width>9</width></LineStyle></Style>
                <Placemark>
                    <styleUrl>#thick</styleUrl>
                    <Style><LineStyle><width>1</width></LineStyle><PolyStyle><color>ff0000ff</color></PolyStyle></Style>
                </Placemark>
            </Document></kml>"##,
        );

        assert_eq!(props["styleUrl"], "#thick");
        assert!(props["styleHash"].is_string());
        assert_eq!(props["stroke-width"], 9.0);
        // the shared style has no PolyStyle, the inline one is kept
        assert_eq!(props["fill"], "#ff0000");
    }

    #[test]
    fn test_ground_overlay_icon() {
        let doc = Document::parse(
            "<kml><GroundOverlay><Icon><href>overlay.png</href></Icon></GroundOverlay></kml>",
        )
        .unwrap();
        let styles = StyleIndex::build(&doc);
        let overlay = doc.descendants("GroundOverlay")[0];
        let props = kml_properties(overlay, &styles, Vec::new());

        assert_eq!(props["icon"], serde_json::json!({"url": "overlay.png"}));
    }

    #[test]
    fn test_extended_data() {
        let props = properties_of(
            r##"<kml><Placemark><ExtendedData>
                <Data name="holeNumber"><value>1</value></Data>
                <Data name="empty"><value></value></Data>
                <SchemaData schemaUrl="#s"><SimpleData name="par">4</SimpleData></SchemaData>
            </ExtendedData></Placemark></kml>"##,
        );
        assert_eq!(props["holeNumber"], "1");
        assert_eq!(props["par"], "4");
        assert!(!props.contains_key("empty"));
    }

    #[test]
    fn test_coord_times_flattening() {
        let doc = Document::parse("<kml><Placemark/></kml>").unwrap();
        let styles = StyleIndex::build(&doc);
        let placemark = doc.descendants("Placemark")[0];

        let single = kml_properties(placemark, &styles, vec![vec!["t1".to_string()]]);
        assert_eq!(single["coordTimes"], serde_json::json!(["t1"]));

        let multi = kml_properties(
            placemark,
            &styles,
            vec![vec!["t1".to_string()], vec!["t2".to_string()]],
        );
        assert_eq!(multi["coordTimes"], serde_json::json!([["t1"], ["t2"]]));
    }

    #[test]
    fn test_gpx_properties() {
        let doc = Document::parse(
            r#"<wpt lat="1" lon="2"><name>Summit</name><desc></desc><link href="http://example.com/summit"><text></text></link><keywords>peak</keywords></wpt>"#,
        )
        .unwrap();
        let props = gpx_properties(doc.root());

        assert_eq!(props["name"], "Summit");
        assert_eq!(props["link"], "http://example.com/summit");
        assert_eq!(props["keywords"], "peak");
        assert!(!props.contains_key("desc"));
        assert!(!props.contains_key("time"));
    }

    #[test]
    fn test_gpx_track_time_from_first_point() {
        let doc = Document::parse(
            "<trk><name>Loop</name><trkseg><trkpt lat=\"1\" lon=\"2\"><time>T1</time></trkpt><trkpt lat=\"3\" lon=\"4\"><time>T2</time></trkpt></trkseg></trk>",
        )
        .unwrap();
        let props = gpx_properties(doc.root());

        assert_eq!(props["time"], "T1");
    }

    #[test]
    fn test_build_features_fan_out() {
        let mut props = JsonObject::new();
        props.insert("name".to_string(), Value::String("twin".to_string()));
        let geometries = vec![
            Geometry::new(GeoValue::Point(vec![1.0, 2.0])),
            Geometry::new(GeoValue::Point(vec![3.0, 4.0])),
        ];

        let features = build_features(geometries, props, Some("pm1"));
        assert_eq!(features.len(), 2);
        assert_eq!(features[0].properties, features[1].properties);
        assert_ne!(features[0].geometry, features[1].geometry);
        assert!(features.iter().all(|f| f.id.is_none()));
    }

    #[test]
    fn test_build_features_single_keeps_id() {
        let features = build_features(
            vec![Geometry::new(GeoValue::Point(vec![1.0, 2.0]))],
            JsonObject::new(),
            Some("pm1"),
        );
        assert_eq!(features.len(), 1);
        assert_eq!(features[0].id, Some(Id::String("pm1".to_string())));
    }

    #[test]
    fn test_build_features_none() {
        assert!(build_features(Vec::new(), JsonObject::new(), Some("pm1")).is_empty());
    }
}
