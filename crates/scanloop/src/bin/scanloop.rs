use std::cell::Cell;
use std::path::PathBuf;
use std::process::ExitCode;
use std::rc::Rc;
use std::time::Duration;

use clap::{Args, Parser, Subcommand};
use log::{info, warn};

use scanloop::decode::RqrrDecoder;
use scanloop::{CameraHandle, CaptureConfig, CaptureCoordinator, DecodeResult, StillCamera};

/// Scan barcodes in still images through the capture/decode loop.
#[derive(Parser, Debug)]
#[command(name = "scanloop", version, about)]
struct Cli {
    /// Log debug output to stderr.
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Only log errors.
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    quiet: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Decode images, printing one JSON line per result.
    Scan(ScanArgs),
    /// Print the default configuration as JSON.
    Config,
}

#[derive(Args, Debug)]
struct ScanArgs {
    /// JSON configuration file; flags below override it.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Keep scanning after the first result.
    #[arg(long)]
    continuous: bool,

    /// Also try each image rotated by 90°.
    #[arg(long)]
    vertical: bool,

    /// Also try light-on-dark symbols.
    #[arg(long)]
    invert: bool,

    #[arg(long)]
    no_auto_zoom: bool,

    /// Scan the whole image instead of the centred window.
    #[arg(long)]
    full_screen: bool,

    /// Stop once nothing happened for this long.
    #[arg(long, default_value_t = 250)]
    idle_ms: u64,

    #[arg(required = true)]
    images: Vec<PathBuf>,
}

fn main() -> Result<ExitCode, Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    init_logging(&cli);

    match cli.command {
        Command::Config => {
            println!("{}", serde_json::to_string_pretty(&CaptureConfig::default())?);
            Ok(ExitCode::SUCCESS)
        }
        Command::Scan(args) => scan(args),
    }
}

fn scan(args: ScanArgs) -> Result<ExitCode, Box<dyn std::error::Error>> {
    let mut config = match &args.config {
        Some(path) => CaptureConfig::from_json_file(path)?,
        None => CaptureConfig::default(),
    };
    config.continuous_scan |= args.continuous;
    config.support_vertical_code |= args.vertical;
    config.support_luminance_invert |= args.invert;
    config.framing.full_screen |= args.full_screen;
    if args.no_auto_zoom {
        config.auto_zoom.enabled = false;
    }

    let camera = CameraHandle::new(StillCamera::from_paths(&args.images)?);
    let found = Rc::new(Cell::new(0usize));
    let counter = Rc::clone(&found);
    let listener = move |result: &DecodeResult| {
        counter.set(counter.get() + 1);
        match serde_json::to_string(result) {
            Ok(line) => println!("{line}"),
            Err(err) => warn!("could not serialize result: {err}"),
        }
        false
    };

    let mut session = CaptureCoordinator::new(config, camera, RqrrDecoder::new(), listener)?;
    session.start()?;
    let end = session.run_until_done(Duration::from_millis(args.idle_ms))?;
    session.shutdown();
    info!("session ended: {end:?}, {} result(s)", found.get());

    if found.get() == 0 {
        eprintln!("no barcode found");
        return Ok(ExitCode::FAILURE);
    }
    Ok(ExitCode::SUCCESS)
}

fn init_logging(cli: &Cli) {
    let level = if cli.verbose {
        log::LevelFilter::Debug
    } else if cli.quiet {
        log::LevelFilter::Error
    } else {
        scanloop::core::level_from_env(log::LevelFilter::Info)
    };

    #[cfg(feature = "tracing")]
    {
        scanloop::core::init_tracing(false);
        // Bridge `log` records when the subscriber did not already.
        let _ = tracing_log::LogTracer::init_with_filter(level);
    }

    #[cfg(not(feature = "tracing"))]
    {
        let _ = scanloop::core::init_with_level(level);
    }
}
