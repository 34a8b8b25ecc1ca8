use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use mch_data::model_data::{ExportOptions, FormatRevision, ModelData, ModelOptions};
use mch_data::one_data::{archive_summary, interpolate_archive};
use mch_lib::{Mch, One};
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::info;

#[derive(Parser)]
#[command(name = "mch_data_json")]
#[command(about = "Convert field character models to JSON and field animations to 60 fps")]
#[command(version)]
struct Cli {
    /// Use the texture layout and 4 byte animation counts of the oldest files
    #[arg(long, global = true)]
    legacy: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Decode a model and write it as JSON
    Dump {
        /// Input .mch file
        input: PathBuf,

        /// Output JSON file (default: <input>.json)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Vertex units per decoded unit
        #[arg(long, default_value_t = 256.0)]
        divisor: f32,

        /// Animation archive with additional animations for the character
        #[arg(long)]
        one: Option<PathBuf>,
    },

    /// List the characters and animations in an archive
    Info {
        /// Input .one file
        input: PathBuf,
    },

    /// Insert interpolated frames between the frames of every animation in an archive
    Interpolate {
        /// Input .one file
        input: PathBuf,

        /// Output .one file (default: <name>-new.one)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Frames to insert between each pair of frames
        #[arg(long, default_value_t = 1)]
        extra: usize,
    },

    /// Decode a model and export it again using its own skin groups
    Roundtrip {
        /// Input .mch file
        input: PathBuf,

        /// Output .mch file (default: <name>-new.mch)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Vertex units per decoded unit
        #[arg(long, default_value_t = 256.0)]
        divisor: f32,

        /// Recalculate face normals
        #[arg(long)]
        regenerate_normals: bool,
    },
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .init();

    let cli = Cli::parse();
    let revision = if cli.legacy {
        FormatRevision::LEGACY
    } else {
        FormatRevision::CURRENT
    };

    match cli.command {
        Commands::Dump {
            input,
            output,
            divisor,
            one,
        } => {
            let options = ModelOptions {
                revision,
                vertex_divisor: divisor,
            };
            let output = output.unwrap_or_else(|| append_extension(&input, "json"));
            dump(&input, &output, one.as_deref(), &options)
        }
        Commands::Info { input } => print_info(&input, revision),
        Commands::Interpolate {
            input,
            output,
            extra,
        } => {
            let output = output.unwrap_or_else(|| new_file_name(&input, "one"));
            interpolate(&input, &output, extra, revision)
        }
        Commands::Roundtrip {
            input,
            output,
            divisor,
            regenerate_normals,
        } => {
            let options = ModelOptions {
                revision,
                vertex_divisor: divisor,
            };
            let output = output.unwrap_or_else(|| new_file_name(&input, "mch"));
            roundtrip(
                &input,
                &output,
                &options,
                &ExportOptions {
                    regenerate_normals,
                    rest_space_positions: false,
                },
            )
        }
    }
}

fn dump(input: &Path, output: &Path, one: Option<&Path>, options: &ModelOptions) -> Result<()> {
    let start = Instant::now();
    let mut model = ModelData::from_file(input, options)
        .with_context(|| format!("Failed to read {:?}.", input))?;
    if let Some(one) = one {
        model.load_archive_animations(one)?;
    }
    info!("Parse: {:?}", start.elapsed());

    let json = serde_json::to_string_pretty(&model)?;
    std::fs::write(output, json).with_context(|| format!("Failed to write {:?}.", output))?;
    info!("Wrote {:?}", output);
    Ok(())
}

fn print_info(input: &Path, revision: FormatRevision) -> Result<()> {
    let one = One::from_file_with_count_width(input, revision.anim_count_width)
        .with_context(|| format!("Failed to read {:?}.", input))?;

    for character in archive_summary(&one) {
        println!(
            "{} flags: {:#010x} model: {} size: {:#x} animations: {}",
            character.name,
            character.flags,
            character.has_model,
            character.size,
            character.frame_counts.len()
        );
        for (i, frame_count) in character.frame_counts.iter().enumerate() {
            println!("    {}: {} frames", i, frame_count);
        }
    }
    Ok(())
}

fn interpolate(input: &Path, output: &Path, extra: usize, revision: FormatRevision) -> Result<()> {
    let start = Instant::now();
    let one = One::from_file_with_count_width(input, revision.anim_count_width)
        .with_context(|| format!("Failed to read {:?}.", input))?;
    info!("Parse: {:?}", start.elapsed());

    let new_one = interpolate_archive(&one, extra)?;
    new_one
        .write_to_file(output)
        .with_context(|| format!("Failed to write {:?}.", output))?;
    info!("Wrote {:?}", output);
    Ok(())
}

fn roundtrip(
    input: &Path,
    output: &Path,
    options: &ModelOptions,
    export_options: &ExportOptions,
) -> Result<()> {
    let mch = Mch::from_file_with_count_width(input, options.revision.anim_count_width)
        .with_context(|| format!("Failed to read {:?}.", input))?;
    let character = mch_data::model_data::character_id(input).unwrap_or_default();
    let model = ModelData::from_mch(&mch, &character, options)?;

    let new_mch = model.to_mch(&mch, &model.vertex_groups(), export_options)?;
    new_mch
        .write_to_file(output)
        .with_context(|| format!("Failed to write {:?}.", output))?;

    if new_mch == mch {
        info!("Wrote {:?} with no changes", output);
    } else {
        info!("Wrote {:?}", output);
    }
    Ok(())
}

fn append_extension(input: &Path, extension: &str) -> PathBuf {
    let mut path = input.as_os_str().to_owned();
    path.push(".");
    path.push(extension);
    PathBuf::from(path)
}

/// Creates a path like "d000-new.mch" next to the input file.
fn new_file_name(input: &Path, extension: &str) -> PathBuf {
    let stem = input
        .file_stem()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_default();
    input.with_file_name(format!("{}-new.{}", stem, extension))
}
