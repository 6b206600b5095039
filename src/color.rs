/// A KML color split into a CSS hex color and an opacity in `[0, 1]`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct KmlColor {
    pub color: Option<String>,
    pub opacity: Option<f64>,
}

/// Parses a KML `AABBGGRR` color.
///
/// Three and six character values are passed through as `#<value>` with no
/// opacity. Eight character values are split into alpha and a `BBGGRR`
/// triple that is reordered to `#RRGGBB`. Anything else yields neither.
pub fn parse_kml_color(value: &str) -> KmlColor {
    let v = value.trim();
    let v = v.strip_prefix('#').unwrap_or(v);

    match v.len() {
        3 | 6 => KmlColor {
            color: Some(format!("#{v}")),
            opacity: None,
        },
        8 if v.is_ascii() => {
            let opacity = u8::from_str_radix(&v[0..2], 16)
                .ok()
                .map(|alpha| f64::from(alpha) / 255.0);
            let (bb, gg, rr) = (&v[2..4], &v[4..6], &v[6..8]);
            KmlColor {
                color: Some(format!("#{rr}{gg}{bb}")),
                opacity,
            }
        }
        _ => KmlColor::default(),
    }
}
