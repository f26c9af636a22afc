use std::path::Path;

use hound::WavReader;
use log::debug;

use crate::error::{Error, Result};

/// Length in seconds of the audio a note list is aligned against.
///
/// # Arguments
///
/// * `path` - A WAV file.
///
/// # Returns
///
/// * Frames divided by sample rate.
pub fn reference_duration_from_wav<P: AsRef<Path>>(path: P) -> Result<f64> {
    let reader = WavReader::open(path)?;
    let spec = reader.spec();
    // frames per channel, not interleaved samples
    let frames = reader.duration();

    if spec.sample_rate == 0 {
        return Err(Error::MalformedInput("wav file declares a sample rate of 0".to_string()));
    }

    let seconds = frames as f64 / spec.sample_rate as f64;
    debug!(
        "reference audio: {} frames at {} Hz, {} channels = {:.3}s",
        frames, spec.sample_rate, spec.channels, seconds
    );

    Ok(seconds)
}
