//! Built-in features.
//!
//! Each feature lives in its own module and exposes an `entry()` constructor
//! returning its catalog declaration.

mod aspect_ratio;
mod compress;
mod convert;
mod crop;
mod custom_run;
mod grayscale;
mod remove_audio;
mod resize;
mod trim;
mod volume;

pub use aspect_ratio::{AspectRatio, ASPECT_RATIO_EPSILON};
pub use compress::Compress;
pub use convert::Convert;
pub use crop::Crop;
pub use custom_run::CustomRun;
pub use grayscale::Grayscale;
pub use remove_audio::RemoveAudio;
pub use resize::Resize;
pub use trim::Trim;
pub use volume::Volume;

use cf_core::{Error, Result};

use crate::configuration::Configuration;
use crate::feature::FeatureEntry;

/// Largest frame dimension accepted by the scaling features.
const MAX_DIMENSION: u32 = 16_384;

/// Catalog declarations of every built-in feature, in display order.
pub fn builtin_entries() -> Vec<FeatureEntry> {
    vec![
        aspect_ratio::entry(),
        resize::entry(),
        crop::entry(),
        trim::entry(),
        compress::entry(),
        convert::entry(),
        grayscale::entry(),
        remove_audio::entry(),
        volume::entry(),
        custom_run::entry(),
    ]
}

/// A frame dimension in `1..=MAX_DIMENSION`.
fn dimension(config: &Configuration, path: &str) -> Result<u32> {
    let value = config.integer(path)?;
    if value == 0 || value > MAX_DIMENSION {
        return Err(Error::configuration(
            path,
            format!("dimension must be between 1 and {MAX_DIMENSION}, got {value}"),
        ));
    }
    Ok(value)
}

/// A point in time, in seconds, that must not be negative.
fn seconds(config: &Configuration, path: &str) -> Result<f64> {
    let value = config.number(path)?;
    if value < 0.0 {
        return Err(Error::configuration(
            path,
            format!("time must not be negative, got {value}"),
        ));
    }
    Ok(value)
}
