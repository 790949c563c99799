use std::path::{Path, PathBuf};
use std::process;

use clap::Parser;
use log::SetLoggerError;
use simplelog::{ColorChoice, ConfigBuilder, LevelFilter, TermLogger, TerminalMode};

use banana_watermark_removal::batch::{process_directory, process_file};
use banana_watermark_removal::{
    default_output_path, AlphaMapCache, DirectorySource, ProcessOptions, ProcessResult,
    WatermarkEngine, WatermarkMode,
};

#[derive(Parser)]
#[command(
    name = "banana-watermark",
    about = "Restore the watermark region of Gemini and NotebookLM image exports",
    version,
    after_help = "Simple usage: banana-watermark <image>  (writes <image>_cleaned.png)\n\n\
                  NOTE: Gemini mode only removes the VISIBLE logo; it cannot remove SynthID.\n\
                  NotebookLM mode repaints the bottom-right corner with sampled background."
)]
struct Cli {
    /// Input image file or directory
    input: String,

    /// Output file or directory (default: {name}_cleaned.png)
    #[arg(short, long)]
    output: Option<String>,

    /// Which watermark to remove
    #[arg(short, long, value_enum, default_value_t = WatermarkMode::Gemini)]
    mode: WatermarkMode,

    /// Directory holding the bg_48.png / bg_96.png reference captures
    #[arg(long, env = "BANANA_WATERMARK_ASSETS", default_value = "assets")]
    assets: PathBuf,

    /// Enable verbose output
    #[arg(short, long)]
    verbose: bool,

    /// Suppress all non-error output
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,
}

fn init_logging(opts: &ProcessOptions) -> Result<(), SetLoggerError> {
    let level = if opts.verbose {
        LevelFilter::Debug
    } else if opts.quiet {
        LevelFilter::Error
    } else {
        LevelFilter::Warn
    };
    let config = ConfigBuilder::new()
        .add_filter_allow_str("banana_watermark_removal")
        .build();
    TermLogger::init(level, config, TerminalMode::Stderr, ColorChoice::Auto)
}

fn main() {
    let cli = Cli::parse();

    let opts = ProcessOptions {
        mode: cli.mode,
        verbose: cli.verbose,
        quiet: cli.quiet,
    };
    if let Err(e) = init_logging(&opts) {
        eprintln!("Warning: Failed to initialise logging: {e}");
    }

    let input_path = Path::new(&cli.input);
    if !input_path.exists() {
        eprintln!("Error: Input path does not exist: {}", cli.input);
        process::exit(1);
    }

    if opts.mode == WatermarkMode::Gemini && !cli.assets.is_dir() {
        eprintln!(
            "Error: Reference capture directory not found: {}",
            cli.assets.display()
        );
        eprintln!("Pass --assets <dir> containing bg_48.png and bg_96.png");
        process::exit(1);
    }

    let engine = WatermarkEngine::new(AlphaMapCache::new(DirectorySource::new(&cli.assets)));

    if !opts.quiet {
        eprintln!("Mode: {}", opts.mode);
        eprintln!();
    }

    let results = if input_path.is_dir() {
        let output_dir = if let Some(o) = &cli.output {
            PathBuf::from(o)
        } else {
            eprintln!("Error: Output directory is required for batch processing");
            eprintln!("Usage: banana-watermark <input_dir> -o <output_dir>");
            process::exit(1);
        };
        process_directory(&engine, input_path, &output_dir, &opts)
    } else {
        let output_path = match &cli.output {
            Some(o) => PathBuf::from(o),
            None => default_output_path(input_path),
        };
        vec![process_file(&engine, input_path, &output_path, &opts)]
    };

    let mut success_count = 0u32;
    let mut fail_count = 0u32;

    for r in &results {
        print_result(r, &opts);
        if r.success {
            success_count += 1;
        } else {
            fail_count += 1;
        }
    }

    if results.len() > 1 && !opts.quiet {
        eprintln!();
        eprint!("[Summary] Processed: {success_count}");
        if fail_count > 0 {
            eprint!(", Failed: {fail_count}");
        }
        eprintln!(" (Total: {})", results.len());
    }

    if fail_count > 0 {
        process::exit(1);
    }
}

fn print_result(result: &ProcessResult, opts: &ProcessOptions) {
    if opts.quiet && result.success {
        return;
    }

    let filename = result.path.file_name().map_or_else(
        || result.path.display().to_string(),
        |f| f.to_string_lossy().to_string(),
    );

    if result.success {
        eprintln!("[OK] {filename}");
    } else {
        eprintln!("[FAIL] {filename}: {}", result.message);
    }

    if opts.verbose && !result.message.is_empty() {
        eprintln!("  -> {}", result.message);
    }
}
