//! Reading KML, KMZ and GPX sources from disk and picking the matching
//! converter.

use std::fs::File;
use std::io::{BufReader, Read, Seek};
use std::path::Path;

use geojson::FeatureCollection;
use tracing::{debug, warn};
use zip::ZipArchive;

use crate::dom::Document;
use crate::error::{Error, Result};
use crate::gpx::convert_gpx;
use crate::kml::convert_kml;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceFormat {
    Kml,
    /// Zipped KML
    Kmz,
    Gpx,
}

impl SourceFormat {
    /// Detects the format from a file extension, ignoring case.
    pub fn from_path(path: &Path) -> Option<Self> {
        let ext = path.extension()?.to_str()?.to_ascii_lowercase();
        match ext.as_str() {
            "kml" => Some(Self::Kml),
            "kmz" => Some(Self::Kmz),
            "gpx" => Some(Self::Gpx),
            _ => None,
        }
    }

    /// Detects the format from the document's root element.
    pub fn from_root(doc: &Document) -> Option<Self> {
        let name = doc.root().name();
        let local = name.rsplit(':').next().unwrap_or(name);
        match local {
            "kml" => Some(Self::Kml),
            "gpx" => Some(Self::Gpx),
            _ => None,
        }
    }
}

/// Converts a document, picking KML or GPX by its root element.
pub fn convert(doc: &Document) -> Result<FeatureCollection> {
    match SourceFormat::from_root(doc) {
        Some(SourceFormat::Gpx) => Ok(convert_gpx(doc)),
        Some(_) => Ok(convert_kml(doc)),
        None => Err(Error::UnsupportedFormat(format!(
            "root element <{}>",
            doc.root().name()
        ))),
    }
}

/// Reads the KML document inside a KMZ archive: `doc.kml` when present,
/// otherwise the `.kml` entry whose name sorts first.
pub fn read_kmz<R: Read + Seek>(reader: R) -> Result<Document> {
    let mut archive = ZipArchive::new(reader)?;

    let entry_name = if archive.index_for_name("doc.kml").is_some() {
        "doc.kml".to_string()
    } else {
        let fallback = archive
            .file_names()
            .filter(|name| name.to_ascii_lowercase().ends_with(".kml"))
            .min()
            .map(str::to_string)
            .ok_or(Error::MissingKml)?;
        warn!("KMZ archive has no doc.kml, reading {}", fallback);
        fallback
    };

    let mut content = String::new();
    archive.by_name(&entry_name)?.read_to_string(&mut content)?;
    debug!("Read {} bytes from KMZ entry {}", content.len(), entry_name);
    Document::parse(&content)
}

pub fn read_document(path: &Path, format: SourceFormat) -> Result<Document> {
    let file = File::open(path)?;
    match format {
        SourceFormat::Kmz => read_kmz(file),
        SourceFormat::Kml | SourceFormat::Gpx => Document::from_reader(BufReader::new(file)),
    }
}

/// Reads and converts a file, detecting its format from the extension.
pub fn convert_file(path: &Path) -> Result<FeatureCollection> {
    let format = SourceFormat::from_path(path)
        .ok_or_else(|| Error::UnsupportedFormat(path.display().to_string()))?;
    convert_file_as(path, format)
}

pub fn convert_file_as(path: &Path, format: SourceFormat) -> Result<FeatureCollection> {
    let doc = read_document(path, format)?;
    let collection = match format {
        SourceFormat::Kml | SourceFormat::Kmz => convert_kml(&doc),
        SourceFormat::Gpx => convert_gpx(&doc),
    };
    debug!(
        "Converted {:?} as {:?}: {} features",
        path,
        format,
        collection.features.len()
    );
    Ok(collection)
}
