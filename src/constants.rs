// Export defaults
pub const DEFAULT_TEMPO_BPM: f64 = 120.0;
pub const DEFAULT_TICKS_PER_QUARTER: u16 = 480;
pub const DEFAULT_CHANNEL: u8 = 0;

// Note defaults
pub const DEFAULT_VELOCITY: u8 = 64;
pub const MAX_MIDI_VALUE: u8 = 127;

// Time units
pub const MICROSECONDS_PER_SECOND: f64 = 1_000_000.0;
pub const MICROSECONDS_PER_MINUTE: f64 = 60_000_000.0;

// Field limits of the binary format
pub const MAX_CHANNEL: u8 = 15;
pub const MAX_TICKS_PER_QUARTER: u16 = 0x7FFF;
pub const MAX_TEMPO_MICROSECONDS: u32 = 0x00FF_FFFF;
pub const MAX_DELTA_TICKS: u32 = 0x0FFF_FFFF;
