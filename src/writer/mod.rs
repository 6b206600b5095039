use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use geojson::FeatureCollection;

use crate::error::Result;

#[derive(Debug, Clone, Default)]
pub struct WriterConfig {
    /// Indent the output instead of writing a single line.
    pub pretty: bool,
}

#[derive(Debug, Default)]
pub struct GeoJsonWriter {
    config: WriterConfig,
}

impl GeoJsonWriter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(config: WriterConfig) -> Self {
        Self { config }
    }

    pub fn write(&self, collection: &FeatureCollection, output_path: &Path) -> Result<()> {
        tracing::info!(
            "Writing {} features to {:?}",
            collection.features.len(),
            output_path
        );

        let mut writer = BufWriter::new(File::create(output_path)?);
        self.write_to(collection, &mut writer)?;
        writer.flush()?;
        Ok(())
    }

    pub fn write_to<W: Write>(&self, collection: &FeatureCollection, mut writer: W) -> Result<()> {
        if self.config.pretty {
            serde_json::to_writer_pretty(&mut writer, collection)?;
        } else {
            serde_json::to_writer(&mut writer, collection)?;
        }
        writeln!(writer)?;
        Ok(())
    }

    pub fn to_string(&self, collection: &FeatureCollection) -> Result<String> {
        let json = if self.config.pretty {
            serde_json::to_string_pretty(collection)?
        } else {
            serde_json::to_string(collection)?
        };
        Ok(json)
    }
}
