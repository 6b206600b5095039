pub mod color;
pub mod coords;
pub mod description;
pub mod dom;
pub mod error;
pub mod feature;
pub mod geometry;
pub mod gpx;
pub mod kml;
pub mod source;
pub mod style;
pub mod writer;

pub use dom::Document;
pub use error::{Error, Result};
pub use gpx::convert_gpx;
pub use kml::convert_kml;
pub use source::{convert, convert_file, SourceFormat};
pub use writer::{GeoJsonWriter, WriterConfig};
