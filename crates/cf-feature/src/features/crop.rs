//! Crop a rectangle out of each frame.

use cf_core::{MediaType, Result};

use super::dimension;
use crate::configuration::Configuration;
use crate::feature::{CompiledCommand, FeatureEntry, Schema};
use crate::file_config::FileConfig;

#[derive(Debug, Clone, Copy)]
pub struct Crop;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CropSettings {
    pub width: u32,
    pub height: u32,
    pub x: u32,
    pub y: u32,
}

impl Schema for Crop {
    type Settings = CropSettings;
    const PATHS: &'static [&'static str] = &["CROP.WIDTH", "CROP.HEIGHT", "CROP.X", "CROP.Y"];

    fn parse(&self, config: &Configuration) -> Result<CropSettings> {
        Ok(CropSettings {
            width: dimension(config, "CROP.WIDTH")?,
            height: dimension(config, "CROP.HEIGHT")?,
            x: config.optional_integer("CROP.X")?.unwrap_or(0),
            y: config.optional_integer("CROP.Y")?.unwrap_or(0),
        })
    }

    fn synthesize(&self, s: &CropSettings) -> Result<CompiledCommand> {
        Ok(CompiledCommand::new([
            "-vf".to_string(),
            format!("crop={}:{}:{}:{}", s.width, s.height, s.x, s.y),
        ]))
    }
}

pub(super) fn entry() -> FeatureEntry {
    FeatureEntry::new("CROP", "Crop", FileConfig::single(MediaType::Video), Crop)
        .description("Crop a region out of a video")
        .progress("Cropping ...", "#E2A14A")
        .ui("crop")
}
