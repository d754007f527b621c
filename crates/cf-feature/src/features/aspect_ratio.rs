//! Scale to explicit dimensions after checking them against a declared ratio.

use cf_core::{Error, MediaType, Result};

use super::dimension;
use crate::configuration::{ConfigNode, ConfigValue, Configuration};
use crate::feature::{CompiledCommand, FeatureEntry, Schema};
use crate::file_config::FileConfig;

/// Absolute tolerance when comparing `width / height` with the declared ratio.
pub const ASPECT_RATIO_EPSILON: f64 = 1e-6;

const NAME: &str = "Aspect Ratio";

#[derive(Debug, Clone, Copy)]
pub struct AspectRatio;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AspectRatioSettings {
    pub ratio: f64,
    pub width: u32,
    pub height: u32,
}

impl Schema for AspectRatio {
    type Settings = AspectRatioSettings;
    const PATHS: &'static [&'static str] =
        &["ASPECT_RATIO", "ASPECT_RATIO.WIDTH", "ASPECT_RATIO.HEIGHT"];

    fn parse(&self, config: &Configuration) -> Result<AspectRatioSettings> {
        let ratio = match config.value("ASPECT_RATIO")? {
            ConfigValue::Text(text) => parse_ratio(text)
                .ok_or_else(|| Error::configuration("ASPECT_RATIO", format!("`{text}` is not W:H")))?,
            _ => config.number("ASPECT_RATIO")?,
        };
        if ratio <= 0.0 {
            return Err(Error::configuration(
                "ASPECT_RATIO",
                format!("ratio must be positive, got {ratio}"),
            ));
        }
        Ok(AspectRatioSettings {
            ratio,
            width: dimension(config, "ASPECT_RATIO.WIDTH")?,
            height: dimension(config, "ASPECT_RATIO.HEIGHT")?,
        })
    }

    fn synthesize(&self, s: &AspectRatioSettings) -> Result<CompiledCommand> {
        let actual = f64::from(s.width) / f64::from(s.height);
        if (actual - s.ratio).abs() > ASPECT_RATIO_EPSILON {
            return Err(Error::invariant(
                NAME,
                format!(
                    "{}x{} has ratio {actual:.6}, declared {:.6}",
                    s.width, s.height, s.ratio
                ),
            ));
        }
        Ok(CompiledCommand::new([
            "-vf".to_string(),
            format!("scale={}:{}", s.width, s.height),
        ]))
    }
}

/// Parse `"16:9"` or `"16/9"` into a ratio.
fn parse_ratio(text: &str) -> Option<f64> {
    let (w, h) = text.split_once([':', '/'])?;
    let w: f64 = w.trim().parse().ok()?;
    let h: f64 = h.trim().parse().ok()?;
    (h != 0.0).then(|| w / h)
}

pub(super) fn entry() -> FeatureEntry {
    FeatureEntry::new(
        "ASPECT_RATIO",
        NAME,
        FileConfig::single(MediaType::Video),
        AspectRatio,
    )
    .description("Change the display aspect ratio of a video")
    .progress("Changing Aspect Ratio ...", "#3FBD71")
    .ui("aspect-ratio")
    .defaults(Configuration::new().with(
        "ASPECT_RATIO",
        ConfigNode::leaf(1920.0 / 1080.0)
            .with_child("WIDTH", ConfigNode::leaf(1920))
            .with_child("HEIGHT", ConfigNode::leaf(1080)),
    ))
}
