//! Change the output container.

use cf_core::{Container, Error, MediaType, Result};

use crate::configuration::Configuration;
use crate::feature::{CompiledCommand, FeatureEntry, Schema};
use crate::file_config::FileConfig;

#[derive(Debug, Clone, Copy)]
pub struct Convert;

impl Schema for Convert {
    type Settings = Container;
    const PATHS: &'static [&'static str] = &["CONVERT.FORMAT"];

    fn parse(&self, config: &Configuration) -> Result<Container> {
        config
            .text("CONVERT.FORMAT")?
            .parse()
            .map_err(|e: String| Error::configuration("CONVERT.FORMAT", e))
    }

    fn synthesize(&self, container: &Container) -> Result<CompiledCommand> {
        Ok(CompiledCommand::new(["-f", container.muxer()]).with_container(*container))
    }
}

pub(super) fn entry() -> FeatureEntry {
    let mut defaults = Configuration::new();
    defaults.set("CONVERT.FORMAT", "mp4");

    FeatureEntry::new(
        "CONVERT",
        "Convert Format",
        FileConfig::single(MediaType::Video),
        Convert,
    )
    .description("Convert a video into another container format")
    .progress("Converting ...", "#8E44AD")
    .ui("convert")
    .defaults(defaults)
}
