//! # Style Module
//!
//! KML features point at their style with a `styleUrl` such as `#red-line`.
//! The URL names either a `Style` or a `StyleMap`, and a style map in turn
//! names the style used for its first (normal) pair. [`StyleIndex`] is built
//! once per document and answers both hops.

use std::collections::HashMap;

use tracing::{debug, warn};

use crate::dom::{Document, Element};

/// Short, deterministic hash of a string: the 31-multiplier rolling hash
/// over UTF-16 code units wrapped to 32 bits, printed in signed radix 16.
pub fn style_hash(content: &str) -> String {
    let hash = content
        .encode_utf16()
        .fold(0i32, |h, unit| h.wrapping_mul(31).wrapping_add(i32::from(unit)));

    if hash < 0 {
        format!("-{:x}", i64::from(hash).unsigned_abs())
    } else {
        format!("{hash:x}")
    }
}

/// Style nodes resolved for one feature.
#[derive(Debug, Clone, Copy, Default)]
pub struct ResolvedStyle<'a> {
    pub line_style: Option<&'a Element>,
    pub poly_style: Option<&'a Element>,
    pub icon_style: Option<&'a Element>,
}

/// Result of looking a `styleUrl` up in the index.
#[derive(Debug, Clone)]
pub struct StyleLookup<'a> {
    /// Hash of the referenced style. A style map yields its target URL.
    pub hash: String,
    pub style: ResolvedStyle<'a>,
}

/// Style and style-map tables of one KML document.
#[derive(Debug, Default)]
pub struct StyleIndex<'a> {
    styles: Vec<&'a Element>,
    style_hashes: HashMap<String, String>,
    style_maps: HashMap<String, String>,
}

impl<'a> StyleIndex<'a> {
    pub fn build(doc: &'a Document) -> Self {
        let styles = doc.descendants("Style");

        let mut style_hashes = HashMap::new();
        for style in &styles {
            let Some(id) = style.attr("id") else {
                continue;
            };
            let serialized = style.to_xml().unwrap_or_else(|e| {
                warn!("Failed to serialize style #{}: {}", id, e);
                String::new()
            });
            style_hashes.insert(format!("#{id}"), style_hash(&serialized));
        }

        let mut style_maps = HashMap::new();
        for style_map in doc.descendants("StyleMap") {
            if let Some(id) = style_map.attr("id") {
                style_maps.insert(format!("#{id}"), style_map.first_text("styleUrl"));
            }
        }

        debug!(
            "Indexed {} styles and {} style maps",
            style_hashes.len(),
            style_maps.len()
        );

        Self {
            styles,
            style_hashes,
            style_maps,
        }
    }

    /// Resolves a feature's `styleUrl`. Returns `None` when the URL names
    /// neither an indexed style nor a style map.
    pub fn lookup(&self, style_url: &str) -> Option<StyleLookup<'a>> {
        if let Some(hash) = self.style_hashes.get(style_url) {
            return Some(StyleLookup {
                hash: hash.clone(),
                style: self.find_style(style_url, style_url),
            });
        }

        let target = self.style_maps.get(style_url)?;
        if target.is_empty() {
            return None;
        }
        Some(StyleLookup {
            hash: target.clone(),
            style: self.find_style(target, style_url),
        })
    }

    // Last style whose id matches either URL wins.
    fn find_style(&self, target: &str, style_url: &str) -> ResolvedStyle<'a> {
        let mut resolved = ResolvedStyle::default();
        for style in &self.styles {
            let Some(id) = style.attr("id") else {
                continue;
            };
            let url = format!("#{id}");
            if url == target || url == style_url {
                resolved = ResolvedStyle {
                    line_style: style.first("LineStyle"),
                    poly_style: style.first("PolyStyle"),
                    icon_style: style.first("IconStyle"),
                };
            }
        }
        resolved
    }
}
