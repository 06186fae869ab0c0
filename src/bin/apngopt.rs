use std::{
    fs,
    path::{Path, PathBuf},
};

use anyhow::Context;
use clap::{Parser, ValueEnum};
use simple_apng::{Options, Target, APNG};

#[derive(Debug, Clone, Copy, ValueEnum)]
enum TargetArg {
    Apng,
    Webp,
}

impl From<TargetArg> for Target {
    fn from(target: TargetArg) -> Self {
        match target {
            TargetArg::Apng => Target::Apng,
            TargetArg::Webp => Target::WebP,
        }
    }
}

/// Shrinks an animated PNG without changing how it looks.
#[derive(Debug, Parser)]
#[command(version)]
struct Args {
    input: PathBuf,
    /// Defaults to `<input stem>_opt.png` next to the input.
    output: Option<PathBuf>,
    /// Log every frame decision.
    #[arg(short, long)]
    verbose: bool,
    /// Format the frames are optimized for.
    #[arg(long, value_enum, default_value_t = TargetArg::Webp)]
    target: TargetArg,
    /// Fail on chunks with a bad CRC.
    #[arg(long)]
    strict_crc: bool,
    /// Copy text, gamma and other color-independent chunks to the output.
    #[arg(long)]
    keep_metadata: bool,
}

fn default_output(input: &Path) -> PathBuf {
    let stem = input
        .file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
        .unwrap_or_else(|| "output".to_owned());
    input.with_file_name(format!("{stem}_opt.png"))
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
        target: args.target.into(),
        strict_crc: args.strict_crc,
        keep_metadata: args.keep_metadata,
    };
    let output = args.output.unwrap_or_else(|| default_output(&args.input));

    let input = fs::read(&args.input)
        .with_context(|| format!("Failed to read {}", args.input.display()))?;
    let apng = APNG::decode(&input, &options)
        .with_context(|| format!("Failed to decode {}", args.input.display()))?;
    let optimized = apng.optimize().context("Failed to optimize frames")?;
    let bytes = optimized.encode().context("Failed to encode frames")?;

    let temp = output.with_extension("png.tmp");
    fs::write(&temp, &bytes).with_context(|| format!("Failed to write {}", temp.display()))?;
    fs::rename(&temp, &output)
        .with_context(|| format!("Failed to move output to {}", output.display()))?;
    log::info!(
        "{} -> {}: {} -> {} bytes",
        args.input.display(),
        output.display(),
        input.len(),
        bytes.len()
    );
    Ok(())
}
