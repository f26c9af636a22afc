//! note-midi CLI: convert note lists to MIDI files and back.
//!
//! Usage:
//!   note-midi export notes.json out.mid [--tempo BPM] [--ppq N] [--channel N]
//!                    [--duration SECONDS] [--zero-velocity-off]
//!   note-midi import in.mid notes.json [--duration SECONDS | --reference-wav FILE]

use std::{env, error::Error, fs};

use log::info;

use note_midi::{
    export_notes_to_path, import_notes_from_path, notes_from_json, notes_to_json,
    reference_duration_from_wav, ExportOptions, ImportOptions, NoteOffStyle,
};

const USAGE: &str = "Usage:
  note-midi export <notes.json> <out.mid> [--tempo BPM] [--ppq N] [--channel N] [--duration SECONDS] [--zero-velocity-off]
  note-midi import <in.mid> <notes.json> [--duration SECONDS | --reference-wav FILE]";

fn flag_value<'a>(args: &'a [String], flag: &str) -> Option<&'a str> {
    args.iter()
        .position(|a| a == flag)
        .and_then(|i| args.get(i + 1))
        .map(String::as_str)
}

fn parsed_flag<T>(args: &[String], flag: &str) -> Result<Option<T>, Box<dyn Error>>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match flag_value(args, flag) {
        Some(raw) => raw
            .parse()
            .map(Some)
            .map_err(|e| format!("invalid value {:?} for {}: {}", raw, flag, e).into()),
        None => Ok(None),
    }
}

fn run_export(input: &str, output: &str, args: &[String]) -> Result<(), Box<dyn Error>> {
    let defaults = ExportOptions::default();
    let options = ExportOptions {
        tempo_bpm: parsed_flag(args, "--tempo")?.unwrap_or(defaults.tempo_bpm),
        ticks_per_quarter: parsed_flag(args, "--ppq")?.unwrap_or(defaults.ticks_per_quarter),
        channel: parsed_flag(args, "--channel")?.unwrap_or(defaults.channel),
        track_duration_seconds: parsed_flag(args, "--duration")?,
        note_off_style: if args.iter().any(|a| a == "--zero-velocity-off") {
            NoteOffStyle::ZeroVelocityNoteOn
        } else {
            NoteOffStyle::NoteOff
        },
    };

    let notes = notes_from_json(&fs::read_to_string(input)?)?;
    export_notes_to_path(&notes, &options, output)?;

    info!("wrote {} notes to {} at {} BPM", notes.len(), output, options.tempo_bpm);
    Ok(())
}

fn run_import(input: &str, output: &str, args: &[String]) -> Result<(), Box<dyn Error>> {
    let target_duration_seconds = match (parsed_flag::<f64>(args, "--duration")?, flag_value(args, "--reference-wav")) {
        (Some(_), Some(_)) => return Err("use either --duration or --reference-wav, not both".into()),
        (Some(seconds), None) => Some(seconds),
        (None, Some(wav)) => Some(reference_duration_from_wav(wav)?),
        (None, None) => None,
    };

    let notes = import_notes_from_path(input, &ImportOptions { target_duration_seconds })?;
    fs::write(output, notes_to_json(&notes)?)?;

    info!("read {} notes from {} into {}", notes.len(), input, output);
    Ok(())
}

fn run(args: &[String]) -> Result<(), Box<dyn Error>> {
    match args {
        [command, input, output, rest @ ..] if command == "export" => run_export(input, output, rest),
        [command, input, output, rest @ ..] if command == "import" => run_import(input, output, rest),
        _ => Err(USAGE.into()),
    }
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args: Vec<String> = env::args().skip(1).collect();
    if let Err(e) = run(&args) {
        eprintln!("{}", e);
        std::process::exit(1);
    }
}
