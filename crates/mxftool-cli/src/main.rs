//! mxf - inspect MXF files and write demo clips.
//!
//! `mxf info <file>` prints the partition layout and the header metadata
//! summary; `mxf avid-clip <prefix>` writes the three-file demo clip the
//! clip writer produces (one MJPEG 20:1 video track, two 16-bit PCM
//! audio tracks).

use std::fs::File;
use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use serde_json::json;

use mxftool_archive::register_archive_extensions;
use mxftool_avid::{AvidClipWriter, EssenceKind, EssenceParams, ProjectFormat};
use mxftool_core::{Rational, Ul};
use mxftool_file::MxfFile;
use mxftool_labels::{items, op, sets};
use mxftool_meta::{register_avid_extensions, DataModel, HeaderMetadata};

#[derive(Parser)]
#[command(name = "mxf", version, about = "MXF container inspector and writer")]
struct Cli {
    /// Increase log verbosity (-v debug, -vv trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Show the partition layout and header metadata of a file
    Info {
        file: PathBuf,
        /// Emit JSON instead of text
        #[arg(long)]
        json: bool,
    },
    /// Write a demo Avid clip as <prefix>_v1.mxf, <prefix>_a1.mxf,
    /// <prefix>_a2.mxf
    AvidClip {
        /// Output filename prefix
        output_prefix: String,
    },
}

fn main() -> ExitCode {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(err) => {
            // help and version requests are not usage errors
            if err.use_stderr() {
                eprintln!("{err}");
                return ExitCode::FAILURE;
            }
            print!("{err}");
            return ExitCode::SUCCESS;
        }
    };

    let level = match cli.verbose {
        0 => "warn",
        1 => "debug",
        _ => "trace",
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(level)),
        )
        .with_writer(std::io::stderr)
        .init();

    let result = match cli.command {
        Command::Info { file, json } => info(&file, json),
        Command::AvidClip { output_prefix } => avid_clip(&output_prefix),
    };
    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("mxf: {err:#}");
            ExitCode::FAILURE
        }
    }
}

/// Data model accepting baseline, archive and Avid files.
fn full_model() -> Result<DataModel> {
    let mut model = DataModel::baseline();
    register_archive_extensions(&mut model)?;
    register_avid_extensions(&mut model)?;
    model.finalize()?;
    Ok(model)
}

fn pattern_name(label: &Ul) -> &'static str {
    if op::is_op_1a(label) {
        "OP-1a"
    } else if op::is_op_atom(label) {
        "OP-Atom"
    } else {
        "unknown"
    }
}

fn info(path: &PathBuf, as_json: bool) -> Result<()> {
    let handle = File::open(path).with_context(|| format!("open {}", path.display()))?;
    let mut file = MxfFile::new(handle);
    file.read_header_partition()
        .with_context(|| format!("{} is not an MXF file", path.display()))?;

    let mut metadata = HeaderMetadata::new(full_model()?)?;
    let header_metadata = file
        .read_header_metadata(&mut metadata, 0)
        .map(|_| true)
        .unwrap_or(false);
    file.read_partitions().ok(); // fall back to the header partition only

    let header = file.partition(0).clone();
    let mut partitions = Vec::new();
    for partition in file.partitions() {
        partitions.push(json!({
            "kind": format!("{:?}", partition.kind),
            "status": format!("{:?}", partition.status),
            "offset": partition.this_partition,
            "body_sid": partition.body_sid,
            "index_sid": partition.index_sid,
            "header_byte_count": partition.header_byte_count,
            "index_byte_count": partition.index_byte_count,
        }));
    }

    let mut packages = Vec::new();
    if header_metadata {
        for set in metadata.iter() {
            if set.key != sets::MATERIAL_PACKAGE && set.key != sets::SOURCE_PACKAGE {
                continue;
            }
            let kind = if set.key == sets::MATERIAL_PACKAGE {
                "material"
            } else {
                "source"
            };
            let name = set.string_item(&items::PACKAGE_NAME).ok();
            let track_count = set
                .ref_vec_item(&items::TRACKS)
                .map(|tracks| tracks.len())
                .unwrap_or(0);
            packages.push(json!({
                "kind": kind,
                "name": name,
                "tracks": track_count,
            }));
        }
    }

    let product = metadata
        .find(&sets::IDENTIFICATION)
        .and_then(|id| metadata.set(id).string_item(&items::PRODUCT_NAME).ok());

    if as_json {
        let out = json!({
            "file": path.display().to_string(),
            "operational_pattern": pattern_name(&header.operational_pattern),
            "run_in": file.stream().runin(),
            "partitions": partitions,
            "packages": packages,
            "product": product,
        });
        println!("{}", serde_json::to_string_pretty(&out)?);
        return Ok(());
    }

    println!("{}", path.display());
    println!("  operational pattern: {}", pattern_name(&header.operational_pattern));
    println!("  essence containers:  {}", header.essence_containers.len());
    if let Some(product) = product {
        println!("  written by:          {product}");
    }
    println!("  partitions:");
    for partition in file.partitions() {
        println!(
            "    {:?} {:?} at {} (header {} bytes, index {} bytes)",
            partition.kind,
            partition.status,
            partition.this_partition,
            partition.header_byte_count,
            partition.index_byte_count
        );
    }
    if !packages.is_empty() {
        println!("  packages:");
        for package in &packages {
            println!(
                "    {} {} ({} tracks)",
                package["kind"].as_str().unwrap_or("?"),
                package["name"].as_str().unwrap_or("<unnamed>"),
                package["tracks"]
            );
        }
    }
    Ok(())
}

fn avid_clip(prefix: &str) -> Result<()> {
    let mut writer = AvidClipWriter::new(ProjectFormat::Pal25i, Rational::new(4, 3), false, true);
    writer.set_project_name("test project");
    writer.set_clip_name("test clip");
    writer.set_tape("test tape", 10 * 60 * 60 * 25);
    writer.add_user_comment("Descript", "a test project");

    writer.register_essence_element(
        1,
        1,
        EssenceKind::Mjpeg201,
        EssenceParams::default(),
        format!("{prefix}_v1.mxf"),
    )?;
    let pcm = EssenceParams {
        quantization_bits: 16,
    };
    writer.register_essence_element(2, 3, EssenceKind::Pcm, pcm, format!("{prefix}_a1.mxf"))?;
    writer.register_essence_element(3, 4, EssenceKind::Pcm, pcm, format!("{prefix}_a2.mxf"))?;

    writer.prepare_to_write()?;

    let video_frame = vec![0u8; 288_000];
    let audio_frame = vec![0u8; 1920 * 2];
    for _ in 0..50 {
        writer.write_samples(1, 1, &video_frame)?;
        writer.write_samples(2, 1920, &audio_frame)?;
        writer.write_samples(3, 1920, &audio_frame)?;
    }
    writer.complete_write()?;

    println!("wrote {prefix}_v1.mxf, {prefix}_a1.mxf, {prefix}_a2.mxf");
    Ok(())
}
