//! Command-line front end for the enhancement core: decode an image,
//! run it through the pipeline, optionally auto-tune and print a
//! quality report, and encode the result.

use aqualume_core::save::{save, SaveOptions};
use aqualume_core::schema::{StageId, PIPELINE_ORDER};
use aqualume_core::{analyze_quality, create_engine, Image, Value};
use clap::Parser;
use serde::Serialize;
use std::path::{Path, PathBuf};

/// Run the underwater enhancement pipeline over one or more images.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Input image paths.
    inputs: Vec<PathBuf>,

    /// Destination directory for processed outputs.
    #[arg(short, long, default_value = "./out")]
    output: PathBuf,

    /// Enable the global auto-tune layer for every stage.
    #[arg(long)]
    auto_tune: bool,

    /// Use the enhanced (literature-based) auto-tune estimators where available.
    #[arg(long)]
    enhanced: bool,

    /// Disable one pipeline stage by its wire id, e.g. `--disable fusion`. May repeat.
    #[arg(long = "disable")]
    disabled_stages: Vec<String>,

    /// Print a quality report to stdout after processing.
    #[arg(long)]
    quality_report: bool,

    /// JPEG quality for output encoding (1-100).
    #[arg(long, default_value_t = 92)]
    jpeg_quality: u8,
}

#[derive(Serialize)]
struct ProgressLine<'a> {
    stage: &'a str,
    percent: u8,
    file: &'a str,
}

fn wire_id_to_stage(id: &str) -> Option<StageId> {
    PIPELINE_ORDER.into_iter().find(|s| s.wire_id() == id.trim())
}

fn process_one(path: &Path, args: &Args) -> anyhow::Result<()> {
    let decoded = image::open(path)?.to_rgb8();
    let img = Image {
        width: decoded.width(),
        height: decoded.height(),
        data: decoded.into_raw(),
    };

    let mut engine = create_engine();
    engine.set_auto_tune(args.auto_tune);
    engine.set_enhanced_auto_tune(args.enhanced);
    if args.auto_tune {
        for stage in PIPELINE_ORDER {
            engine.set_stage_auto_tune(stage, true);
        }
    }
    for disabled in &args.disabled_stages {
        if let Some(stage) = wire_id_to_stage(disabled) {
            engine.set_parameter(stage.enable_key(), Value::Bool(false))?;
        }
    }

    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_else(|| "unknown".to_string());

    let mut sink = |stage: &str, percent: u8| {
        println!(
            "{}",
            serde_json::to_string(&ProgressLine {
                stage,
                percent,
                file: &name,
            })
            .unwrap()
        );
    };
    let result = engine.process(&img, Some(&mut sink), None)?;

    if args.quality_report {
        let report = analyze_quality(&img.to_f32(), &result.image.to_f32());
        eprintln!("quality[{name}] overall={:.2}", report.overall);
        for (family, f) in &report.families {
            eprintln!("  {family}: {:.2}", f.score);
            for rec in &f.recommendations {
                eprintln!("    recommend {}({:+.2})", rec.action, rec.delta);
            }
        }
    }

    std::fs::create_dir_all(&args.output)?;
    let out_path = args.output.join(format!("processed_{name}.jpg"));
    save(
        &result.image,
        &out_path,
        &SaveOptions::jpeg(args.jpeg_quality),
        false,
    )?;

    for warning in &result.warnings {
        eprintln!("warning[{name}] {:?}: {}", warning.stage, warning.message);
    }

    Ok(())
}

fn main() -> anyhow::Result<()> {
    env_logger::init();
    let args = Args::parse();
    for input in &args.inputs {
        if let Err(e) = process_one(input, &args) {
            eprintln!("error processing {}: {e}", input.display());
        }
    }
    Ok(())
}
