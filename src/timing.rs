use midly::Timing;

use crate::constants::{MAX_TEMPO_MICROSECONDS, MICROSECONDS_PER_MINUTE, MICROSECONDS_PER_SECOND};
use crate::error::{Error, Result};

/// Converts a span of seconds to ticks at the given resolution and tempo.
///
/// # Arguments
///
/// * `delta_seconds` - Time span in seconds.
/// * `ticks_per_quarter` - Ticks per quarter note.
/// * `microseconds_per_quarter` - Tempo as the length of one quarter note.
///
/// # Returns
///
/// * The span rounded to the nearest tick, never negative.
pub fn seconds_to_ticks(delta_seconds: f64, ticks_per_quarter: u16, microseconds_per_quarter: u32) -> u32 {
    let ticks = delta_seconds * MICROSECONDS_PER_SECOND / microseconds_per_quarter as f64
        * ticks_per_quarter as f64;
    // saturating cast, NaN lands on 0
    ticks.round().max(0.0) as u32
}

/// Converts a span of ticks to seconds at the given resolution and tempo.
pub fn ticks_to_seconds(delta_ticks: u32, ticks_per_quarter: u16, microseconds_per_quarter: u32) -> f64 {
    delta_ticks as f64 * microseconds_per_quarter as f64
        / MICROSECONDS_PER_SECOND
        / ticks_per_quarter as f64
}

/// Converts beats per minute to the tempo field value (microseconds per quarter note).
pub fn bpm_to_microseconds_per_quarter(bpm: f64) -> Result<u32> {
    if !bpm.is_finite() || bpm <= 0.0 {
        return Err(Error::MalformedInput(format!("tempo must be a positive BPM, got {}", bpm)));
    }

    let microseconds = (MICROSECONDS_PER_MINUTE / bpm).round();
    if microseconds < 1.0 || microseconds > MAX_TEMPO_MICROSECONDS as f64 {
        return Err(Error::MalformedInput(format!(
            "tempo {} BPM does not fit the 24-bit tempo field",
            bpm
        )));
    }

    Ok(microseconds as u32)
}

pub fn microseconds_per_quarter_to_bpm(microseconds_per_quarter: u32) -> f64 {
    MICROSECONDS_PER_MINUTE / microseconds_per_quarter as f64
}

/// Time base declared by a file header.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Resolution {
    /// Ticks per quarter note; tick length follows the tempo.
    Metrical(u16),
    /// SMPTE frames, each split into a fixed number of ticks. Ignores tempo.
    Timecode { frames_per_second: f32, ticks_per_frame: u8 },
}

impl Resolution {
    pub fn from_timing(timing: Timing) -> Result<Self> {
        match timing {
            Timing::Metrical(ticks_per_quarter) if ticks_per_quarter.as_int() == 0 => {
                Err(Error::Parse("header declares 0 ticks per quarter note".to_string()))
            }
            Timing::Metrical(ticks_per_quarter) => Ok(Resolution::Metrical(ticks_per_quarter.as_int())),
            Timing::Timecode(_, 0) => Err(Error::Parse("header declares 0 ticks per frame".to_string())),
            Timing::Timecode(fps, ticks_per_frame) => Ok(Resolution::Timecode {
                frames_per_second: fps.as_f32(),
                ticks_per_frame,
            }),
        }
    }

    pub fn ticks_to_seconds(&self, delta_ticks: u32, microseconds_per_quarter: u32) -> f64 {
        match *self {
            Resolution::Metrical(ticks_per_quarter) => {
                ticks_to_seconds(delta_ticks, ticks_per_quarter, microseconds_per_quarter)
            }
            Resolution::Timecode { frames_per_second, ticks_per_frame } => {
                delta_ticks as f64 / (frames_per_second as f64 * ticks_per_frame as f64)
            }
        }
    }
}
