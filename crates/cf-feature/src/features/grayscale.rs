//! Desaturate every frame.

use cf_core::{MediaType, Result};

use crate::configuration::Configuration;
use crate::feature::{CompiledCommand, FeatureEntry, Schema};
use crate::file_config::FileConfig;

#[derive(Debug, Clone, Copy)]
pub struct Grayscale;

impl Schema for Grayscale {
    type Settings = ();
    const PATHS: &'static [&'static str] = &[];

    fn parse(&self, _config: &Configuration) -> Result<()> {
        Ok(())
    }

    fn synthesize(&self, _settings: &()) -> Result<CompiledCommand> {
        Ok(CompiledCommand::new(["-vf", "hue=s=0"]))
    }
}

pub(super) fn entry() -> FeatureEntry {
    FeatureEntry::new(
        "GRAYSCALE",
        "Grayscale",
        FileConfig::single(MediaType::Video),
        Grayscale,
    )
    .description("Convert a video to black and white")
    .progress("Removing Color ...", "#7F8C8D")
    .defaults(Configuration::new())
}
