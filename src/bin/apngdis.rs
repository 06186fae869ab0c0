use std::{
    fs,
    path::{Path, PathBuf},
};

use anyhow::Context;
use clap::Parser;
use simple_apng::{disassemble, Options};

/// Extracts the frames of an animated PNG with their timing and placement.
#[derive(Debug, Parser)]
#[command(version)]
struct Args {
    input: PathBuf,
    /// Frame file name prefix. Directories and extensions are ignored, files
    /// are always written next to the input.
    #[arg(default_value = "apngframe")]
    prefix: String,
    #[arg(short, long)]
    verbose: bool,
    #[arg(long)]
    strict_crc: bool,
}

fn file_prefix(prefix: &str) -> &str {
    let name = Path::new(prefix)
        .file_name()
        .and_then(|name| name.to_str())
        .unwrap_or(prefix);
    name.split('.').next().unwrap_or(name)
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    let verbosity = if args.verbose {
        log::LevelFilter::Info
    } else {
        log::LevelFilter::Warn
    };
    pretty_env_logger::formatted_builder()
        .filter_level(verbosity)
        .init();

    let options = Options {
        strict_crc: args.strict_crc,
        ..Options::default()
    };
    let input = fs::read(&args.input)
        .with_context(|| format!("Failed to read {}", args.input.display()))?;
    let frames = disassemble(&input, &options, file_prefix(&args.prefix))
        .with_context(|| format!("Failed to decode {}", args.input.display()))?;

    let dir = args
        .input
        .parent()
        .map(PathBuf::from)
        .unwrap_or_default();
    for frame in &frames.frames {
        let path = dir.join(&frame.file_name);
        fs::write(&path, &frame.png)
            .with_context(|| format!("Failed to write {}", path.display()))?;
    }
    let metadata = frames.metadata_json()?;
    let path = dir.join(frames.metadata_file_name());
    fs::write(&path, &metadata).with_context(|| format!("Failed to write {}", path.display()))?;
    println!("{metadata}");
    Ok(())
}
