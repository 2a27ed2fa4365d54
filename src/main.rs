use clap::{Parser, Subcommand};
use recast::controller::{self, Converter, ConverterOptions, DirectorySaver};
use recast::imaging::{ConversionParams, OutputFormat, RustBackend};
use recast::source::IncomingFile;
use recast::{config, estimate, output};
use std::path::PathBuf;
use std::sync::Arc;

/// Shared flags for commands that encode.
#[derive(clap::Args, Clone)]
struct ParamArgs {
    /// JPEG/WebP quality, 1-100 (ignored by PNG, BMP and GIF)
    #[arg(long, short)]
    quality: Option<u32>,

    /// Resize to this width in pixels (needs --height)
    #[arg(long, requires = "height", value_parser = clap::value_parser!(u32).range(1..))]
    width: Option<u32>,

    /// Resize to this height in pixels (needs --width)
    #[arg(long, requires = "width", value_parser = clap::value_parser!(u32).range(1..))]
    height: Option<u32>,
}

#[derive(Parser)]
#[command(name = "recast")]
#[command(about = "Re-encode images with exact size estimates")]
#[command(long_about = "\
Re-encode images with exact size estimates

recast converts a single image to JPEG, PNG, WebP, BMP or GIF. Every
estimate comes from running the real encoder, so the reported size is the
size of the file you get.

  recast info photo.png
  recast compare photo.png --quality 75
  recast convert photo.png --format webp --quality 80 --out-dir out/

Saved files are named after the source and the saving, e.g.
photo-86pct-reduced.webp (disable with --plain-name or [naming] in the
config).

Run 'recast gen-config' to generate a documented recast.toml.")]
#[command(version)]
struct Cli {
    /// Config file (missing file = stock defaults)
    #[arg(long, default_value = "recast.toml", global = true)]
    config: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Show type, size and dimensions of an image
    Info {
        file: PathBuf,
    },
    /// Convert an image and save the result
    Convert {
        file: PathBuf,

        /// Output format: jpeg, png, webp, bmp or gif
        #[arg(long, short)]
        format: Option<OutputFormat>,

        #[command(flatten)]
        params: ParamArgs,

        /// Directory to save into
        #[arg(long, short, default_value = ".")]
        out_dir: PathBuf,

        /// Name the output <name>.<ext> without the ratio
        #[arg(long)]
        plain_name: bool,
    },
    /// Estimate every output format, smallest first
    Compare {
        file: PathBuf,

        #[command(flatten)]
        params: ParamArgs,

        /// Print the report as JSON
        #[arg(long)]
        json: bool,
    },
    /// Print a stock recast.toml with all options documented
    GenConfig,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();
    let cli = Cli::parse();

    match cli.command {
        Command::Info { file } => {
            let config = config::load_config(&cli.config)?;
            let backend = backend_for(&config);
            let source = controller::open_source(
                &backend,
                IncomingFile::read(&file, config.limits.max_file_size)?,
                config.limits.max_file_size,
            )?;
            output::print_source_info(&source);
        }
        Command::Convert {
            file,
            format,
            params,
            out_dir,
            plain_name,
        } => {
            let config = config::load_config(&cli.config)?;
            let mut options = ConverterOptions::from_config(&config);
            if plain_name {
                options.embed_ratio = false;
            }

            let (tx, rx) = std::sync::mpsc::channel();
            let printer = std::thread::spawn(move || {
                for event in rx {
                    for line in output::format_estimate_event(&event) {
                        println!("{}", line);
                    }
                }
            });

            let mut converter = Converter::new(
                Arc::new(backend_for(&config)),
                options,
                build_params(&config, format, &params),
            )
            .with_events(tx);
            converter.accept_file(IncomingFile::read(&file, config.limits.max_file_size)?)?;
            let artifact = converter.convert()?;
            let saver = DirectorySaver::new(out_dir);
            converter.download(&saver)?;
            // Dropping the converter closes the event channel.
            drop(converter);
            printer.join().map_err(|_| "event printer panicked")?;

            output::print_artifact(&artifact, &saver.path_for(&artifact.file_name));
        }
        Command::Compare { file, params, json } => {
            let config = config::load_config(&cli.config)?;
            init_thread_pool(&config.processing);
            let backend = backend_for(&config);
            let source = controller::open_source(
                &backend,
                IncomingFile::read(&file, config.limits.max_file_size)?,
                config.limits.max_file_size,
            )?;
            let results =
                estimate::compare_formats(&backend, &source, &build_params(&config, None, &params))?;
            let report = output::CompareReport::new(&source, &results);
            if json {
                println!("{}", serde_json::to_string_pretty(&report)?);
            } else {
                output::print_compare_report(&report);
            }
        }
        Command::GenConfig => {
            print!("{}", config::stock_config_toml());
        }
    }

    Ok(())
}

fn backend_for(config: &config::RecastConfig) -> RustBackend {
    RustBackend::with_filter(config.resize.filter.filter_type())
}

/// Start from the config defaults and apply command-line overrides.
fn build_params(
    config: &config::RecastConfig,
    format: Option<OutputFormat>,
    args: &ParamArgs,
) -> ConversionParams {
    let mut params = config.default_params();
    if let Some(format) = format {
        params.format = format;
    }
    if let Some(quality) = args.quality {
        params.quality = config.quality(quality);
    }
    if let (Some(width), Some(height)) = (args.width, args.height) {
        params.resize = true;
        params.width = width;
        params.height = height;
    }
    params
}

/// Size the global rayon pool from `[processing]`. Never more than the core count.
fn init_thread_pool(processing: &config::ProcessingConfig) {
    let threads = config::effective_threads(processing);
    rayon::ThreadPoolBuilder::new()
        .num_threads(threads)
        .build_global()
        .ok();
}
