use std::path::{Path, PathBuf};
use std::process;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use logo_watermarker::{
    is_supported_logo, save_image, BatchReport, ImageQueue, Placement, Position, ProcessResult,
    Settings, Watermarker, DEFAULT_JPEG_QUALITY, DEFAULT_SETTINGS_FILE,
};

#[derive(Parser)]
#[command(
    name = "logo-watermark",
    about = "Apply a logo watermark to a batch of product photos",
    version,
    after_help = "Simple usage: logo-watermark --logo logo.png photos/ -o out/\n\n\
                  Logo, output folder and placement are remembered in the settings file\n\
                  between runs. Outputs are written as <name>_watermarked.jpg."
)]
#[allow(clippy::struct_excessive_bools)]
struct Cli {
    /// Input images (.png, .jpg, .jpeg) or directories containing them
    inputs: Vec<PathBuf>,

    /// PNG logo to apply
    #[arg(short, long)]
    logo: Option<PathBuf>,

    /// Output directory (default: next to each input)
    #[arg(short, long)]
    output_dir: Option<PathBuf>,

    /// Logo anchor, ignored with --repeat
    #[arg(short, long, value_enum)]
    position: Option<Position>,

    /// Logo width as a percentage of the image width
    #[arg(short, long, value_parser = parse_scale)]
    scale: Option<f64>,

    /// Logo opacity percentage (0-100)
    #[arg(long, value_parser = parse_opacity)]
    opacity: Option<f64>,

    /// Tile the logo across the whole image
    #[arg(short, long, conflicts_with = "no_repeat")]
    repeat: bool,

    /// Place a single logo at the anchor
    #[arg(long)]
    no_repeat: bool,

    /// Drop an input from the batch (repeatable)
    #[arg(long, value_name = "PATH")]
    exclude: Vec<PathBuf>,

    /// Render the first input to PATH and exit without running the batch
    #[arg(long, value_name = "PATH")]
    preview: Option<PathBuf>,

    /// JPEG quality for outputs (1-100)
    #[arg(long, default_value_t = DEFAULT_JPEG_QUALITY, value_parser = clap::value_parser!(u8).range(1..=100))]
    quality: u8,

    /// Settings file
    #[arg(long, default_value = DEFAULT_SETTINGS_FILE)]
    settings: PathBuf,

    /// Do not write the settings file on exit
    #[arg(long)]
    no_save_settings: bool,

    /// Enable verbose output
    #[arg(short, long)]
    verbose: bool,

    /// Suppress all non-error output
    #[arg(short, long)]
    quiet: bool,
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose, cli.quiet);

    let loaded = Settings::load_or_default(&cli.settings);
    let mut settings = loaded.clone();
    apply_overrides(&cli, &mut settings);

    let code = run(&cli, &settings);

    if !cli.no_save_settings {
        if let Err(e) = settings_to_save(&loaded, settings).save(&cli.settings) {
            tracing::warn!("{e}");
        }
    }

    process::exit(code);
}

fn parse_scale(s: &str) -> Result<f64, String> {
    let v: f64 = s.parse().map_err(|e| format!("{e}"))?;
    if v.is_finite() && v > 0.0 {
        Ok(v)
    } else {
        Err(format!("scale must be a positive percentage, got {s}"))
    }
}

fn parse_opacity(s: &str) -> Result<f64, String> {
    let v: f64 = s.parse().map_err(|e| format!("{e}"))?;
    if (0.0..=100.0).contains(&v) {
        Ok(v)
    } else {
        Err(format!("opacity must be within 0..=100, got {s}"))
    }
}

/// Never persist a placement that cannot be used; keep the last good one.
fn settings_to_save(loaded: &Settings, mut current: Settings) -> Settings {
    if let Err(e) = current.placement().validate() {
        let fallback = if loaded.placement().validate().is_ok() {
            loaded.placement()
        } else {
            Placement::default()
        };
        tracing::warn!("{e}; not saving this placement");
        current.set_placement(&fallback);
    }
    current
}

fn init_logging(verbose: bool, quiet: bool) {
    let default_level = if verbose {
        "debug"
    } else if quiet {
        "error"
    } else {
        "warn"
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_thread_ids(false)
        .compact()
        .init();
}

/// Command-line values win over the remembered ones.
fn apply_overrides(cli: &Cli, settings: &mut Settings) {
    if let Some(logo) = &cli.logo {
        settings.logo_path = logo.display().to_string();
    }
    if let Some(dir) = &cli.output_dir {
        settings.output_dir = dir.display().to_string();
    }
    if let Some(position) = cli.position {
        settings.position = position;
    }
    if let Some(scale) = cli.scale {
        settings.scale = scale;
    }
    if let Some(opacity) = cli.opacity {
        settings.opacity = opacity;
    }
    if cli.repeat {
        settings.repeat_logo = true;
    } else if cli.no_repeat {
        settings.repeat_logo = false;
    }
}

fn run(cli: &Cli, settings: &Settings) -> i32 {
    let queue = match build_queue(cli) {
        Ok(q) => q,
        Err(msg) => {
            eprintln!("Error: {msg}");
            return 1;
        }
    };
    if queue.is_empty() {
        eprintln!("Error: No images to process. Add .png, .jpg or .jpeg files.");
        return 2;
    }

    let Some(logo_path) = settings.logo() else {
        eprintln!("Error: No logo selected. Use --logo <file.png>.");
        return 2;
    };
    if !is_supported_logo(&logo_path) {
        eprintln!("Error: Logo must be a .png file: {}", logo_path.display());
        return 2;
    }

    let placement = settings.placement();
    let watermarker = match Watermarker::open(&logo_path, placement) {
        Ok(w) => w.with_jpeg_quality(cli.quality),
        Err(e) => {
            eprintln!("Error: {e}");
            return 1;
        }
    };

    if let Some(preview_path) = &cli.preview {
        return preview(&watermarker, &queue, preview_path, cli);
    }

    if !cli.quiet {
        describe(watermarker.placement(), &logo_path);
    }

    let output_dir = settings.output_dir();
    let report = watermarker.process_batch(queue.paths(), output_dir.as_deref(), |p| {
        if !cli.quiet {
            eprintln!("[{}/{}] {}", p.completed, p.total, p.path.display());
        }
    });

    for line in report_lines(&report, cli.quiet) {
        eprintln!("{line}");
    }

    i32::from(report.succeeded() != report.results.len())
}

fn build_queue(cli: &Cli) -> Result<ImageQueue, String> {
    let mut queue = ImageQueue::new();
    for input in &cli.inputs {
        if input.is_dir() {
            queue
                .add_dir(input)
                .map_err(|e| format!("Failed to read directory {}: {e}", input.display()))?;
        } else if !queue.add(input.clone()) {
            tracing::warn!("skipping {}: not a .png, .jpg or .jpeg file", input.display());
        }
    }
    for path in &cli.exclude {
        if !queue.remove_path(path) {
            tracing::warn!("--exclude {} matched nothing", path.display());
        }
    }
    Ok(queue)
}

fn preview(watermarker: &Watermarker, queue: &ImageQueue, out: &Path, cli: &Cli) -> i32 {
    let Some(first) = queue.first() else {
        return 2;
    };
    let rendered = watermarker
        .render_file(first)
        .and_then(|img| save_image(&img, out, cli.quality));
    match rendered {
        Ok(()) => {
            if !cli.quiet {
                eprintln!("Preview of {} written to {}", first.display(), out.display());
            }
            0
        }
        Err(e) => {
            eprintln!("Preview failed: {e}");
            1
        }
    }
}

fn describe(placement: &Placement, logo: &Path) {
    let layout = if placement.repeat {
        "tiled".to_string()
    } else {
        placement.position.to_string()
    };
    eprintln!(
        "Logo {} at {:.0}% width, {:.0}% opacity, {layout}",
        logo.display(),
        placement.scale_percent,
        placement.opacity_percent,
    );
    eprintln!();
}

/// Status lines for a finished batch. Each failure is listed exactly once:
/// per file normally, as a single block in quiet mode.
fn report_lines(report: &BatchReport, quiet: bool) -> Vec<String> {
    let total = report.results.len();
    let ok = report.succeeded();

    if quiet {
        return report
            .failure_summary()
            .map(|summary| vec![format!("Some files failed:\n\n{summary}")])
            .unwrap_or_default();
    }

    let mut lines: Vec<String> = report.results.iter().map(result_line).collect();
    lines.push(String::new());
    if ok == total {
        lines.push(format!("[Summary] All {total} images watermarked successfully"));
    } else {
        lines.push(format!(
            "[Summary] Processed: {ok}, Failed: {} (Total: {total})",
            total - ok
        ));
    }
    lines
}

fn result_line(result: &ProcessResult) -> String {
    let filename = result.file_name();
    match &result.error {
        None => format!("[OK] {filename} -> {}", result.output.display()),
        Some(e) => format!("[FAIL] {filename}: {e}"),
    }
}
