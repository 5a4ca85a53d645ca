//! Developer CLI: reads a raw shellcode file, runs it through the guidance
//! engine, and writes the rewritten buffer (plus a stats summary) back out.
//!
//! Not part of any distributable implant component. This binary exists for
//! manually poking at `lito`/`morpher`/`wig` against a real byte buffer
//! without writing a one-off test.

use std::fs;
use std::path::PathBuf;

use clap::Parser;
use thiserror::Error;
use tracing_subscriber::EnvFilter;
use wig::prelude::*;

#[derive(Debug, Parser)]
#[command(name = "metamorph-cli", about = "Drive the lito/morpher/wig pipeline against a file")]
struct Args {
    /// Input file containing raw x86/x64 bytes.
    input: PathBuf,

    /// Output file for the rewritten bytes. Defaults to `<input>.out`.
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Optional TOML file overriding `MorphConfig`/`ManifoldConstraints`
    /// defaults.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Seed for the engine's persistent alien-search RNG and for this call's
    /// `morph()` pass. `0` derives one from the system clock. Overrides any
    /// seed set in `--config`.
    #[arg(short, long)]
    seed: Option<u64>,

    /// Decode in 32-bit mode instead of the default 64-bit.
    #[arg(long)]
    mode32: bool,

    /// ABI tag influencing manifold defaults. Overrides any tag set in
    /// `--config`.
    #[arg(long)]
    platform_tag: Option<String>,
}

#[derive(Debug, Error)]
enum CliError {
    #[error("failed to read {path}: {source}")]
    ReadInput { path: PathBuf, source: std::io::Error },
    #[error("failed to read config {path}: {source}")]
    ReadConfig { path: PathBuf, source: std::io::Error },
    #[error("failed to parse config {path}: {source}")]
    ParseConfig { path: PathBuf, source: toml::de::Error },
    #[error("failed to write {path}: {source}")]
    WriteOutput { path: PathBuf, source: std::io::Error },
    #[error(transparent)]
    Wig(#[from] wig::WigError),
}

/// The on-disk shape of `--config`: every field optional, missing fields
/// fall back to `Default::default()`.
#[derive(Debug, Default, serde::Deserialize)]
struct FileConfig {
    #[serde(default)]
    engine: Option<WigEngineConfig>,
    #[serde(default)]
    seed: Option<u64>,
}

fn main() {
    tracing_subscriber::fmt().with_env_filter(EnvFilter::from_default_env()).init();

    if let Err(err) = run(Args::parse()) {
        eprintln!("error: {err}");
        std::process::exit(1);
    }
}

fn run(args: Args) -> Result<(), CliError> {
    let input_bytes = fs::read(&args.input).map_err(|source| CliError::ReadInput {
        path: args.input.clone(),
        source,
    })?;

    let file_config = match &args.config {
        Some(path) => load_file_config(path)?,
        None => FileConfig::default(),
    };

    let mut engine_config = file_config.engine.unwrap_or_default();
    let seed = args.seed.or(file_config.seed).unwrap_or(0);
    engine_config.seed = seed;
    engine_config.mode64 = !args.mode32;
    if let Some(platform_tag) = args.platform_tag {
        engine_config.manifold = ManifoldConstraints::for_platform(&platform_tag);
        engine_config.platform_tag = platform_tag;
    }

    let engine = WigEngine::from_config(engine_config);
    let result = engine.rewrite(&input_bytes, seed)?;

    let output_path = args.output.clone().unwrap_or_else(|| default_output_path(&args.input));
    fs::write(&output_path, &result.bytes).map_err(|source| CliError::WriteOutput {
        path: output_path.clone(),
        source,
    })?;

    println!("input:        {} bytes", input_bytes.len());
    println!("output:       {} bytes ({})", result.bytes.len(), output_path.display());
    println!("novelty:      {:.4}", result.novelty);
    println!("thoughts:     {}", result.chain_of_thought.thoughts.len());

    Ok(())
}

fn load_file_config(path: &PathBuf) -> Result<FileConfig, CliError> {
    let raw = fs::read_to_string(path).map_err(|source| CliError::ReadConfig {
        path: path.clone(),
        source,
    })?;
    toml::from_str(&raw).map_err(|source| CliError::ParseConfig {
        path: path.clone(),
        source,
    })
}

fn default_output_path(input: &std::path::Path) -> PathBuf {
    let mut out = input.to_path_buf();
    let new_name = match out.file_name().and_then(|n| n.to_str()) {
        Some(name) => format!("{name}.out"),
        None => "metamorph.out".to_string(),
    };
    out.set_file_name(new_name);
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_output_path_appends_out_suffix() {
        let input = PathBuf::from("/tmp/shellcode.bin");
        assert_eq!(default_output_path(&input), PathBuf::from("/tmp/shellcode.bin.out"));
    }

    #[test]
    fn empty_file_config_falls_back_to_defaults() {
        let config = FileConfig::default();
        assert!(config.engine.is_none());
        assert!(config.seed.is_none());
    }
}
