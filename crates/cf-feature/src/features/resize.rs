//! Scale a video to explicit dimensions.

use cf_core::{MediaType, Result};

use super::dimension;
use crate::configuration::Configuration;
use crate::feature::{CompiledCommand, FeatureEntry, Schema};
use crate::file_config::FileConfig;

#[derive(Debug, Clone, Copy)]
pub struct Resize;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResizeSettings {
    pub width: u32,
    pub height: u32,
}

impl Schema for Resize {
    type Settings = ResizeSettings;
    const PATHS: &'static [&'static str] = &["RESIZE.WIDTH", "RESIZE.HEIGHT"];

    fn parse(&self, config: &Configuration) -> Result<ResizeSettings> {
        Ok(ResizeSettings {
            width: dimension(config, "RESIZE.WIDTH")?,
            height: dimension(config, "RESIZE.HEIGHT")?,
        })
    }

    fn synthesize(&self, s: &ResizeSettings) -> Result<CompiledCommand> {
        Ok(CompiledCommand::new([
            "-vf".to_string(),
            format!("scale={}:{}", s.width, s.height),
        ]))
    }
}

pub(super) fn entry() -> FeatureEntry {
    FeatureEntry::new("RESIZE", "Resize", FileConfig::single(MediaType::Video), Resize)
        .description("Scale a video to a new resolution")
        .progress("Resizing ...", "#4A90E2")
        .ui("resize")
}
