mod app;
mod dimensions;
mod render;

use app::MorphApp;
use clap::{Parser, ValueEnum};
use morphtap::{DrainMode, MorphOperator, SenselSdk};
use std::path::PathBuf;
use tracing::error;
use tracing_subscriber::EnvFilter;

#[derive(Clone, Copy, Debug, ValueEnum)]
enum Backend {
    /// Sensel device through the vendor library
    Sensel,
    /// Any multitouch touchpad through evdev
    Touchpad,
}

#[derive(Parser)]
#[command(name = "morphtap", about = "Sensel Morph contact viewer")]
struct Cli {
    /// Device backend
    #[arg(short, long, value_enum, default_value_t = Backend::Sensel)]
    backend: Backend,

    /// Path to the vendor shared library
    #[arg(long, default_value = "libsensel.so")]
    library: PathBuf,

    /// Read one frame per cycle instead of draining the backlog
    #[arg(long)]
    fast: bool,

    /// Number of trail frames to show (max 20)
    #[arg(short, long, default_value_t = 20)]
    trails: usize,

    /// Enable verbose logging to stderr
    #[arg(short, long)]
    verbose: bool,
}

fn main() {
    let cli = Cli::parse();

    let default_level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .with_writer(std::io::stderr)
        .init();

    let trails = cli.trails.min(app::HISTORY_MAX);
    let mode = if cli.fast {
        DrainMode::LatestOnly
    } else {
        DrainMode::Backlog
    };

    #[cfg(target_os = "linux")]
    {
        use morphtap::sdk::libsensel::LibSensel;
        use morphtap::sdk::touchpad::TouchpadSdk;

        match cli.backend {
            Backend::Sensel => {
                let sdk = match LibSensel::load(&cli.library) {
                    Ok(sdk) => sdk,
                    Err(e) => {
                        error!("Unable to load Sensel library: {}", e);
                        std::process::exit(1);
                    }
                };
                run(MorphOperator::new(sdk, mode), trails);
            }
            Backend::Touchpad => run(MorphOperator::new(TouchpadSdk::new(), mode), trails),
        }
    }

    #[cfg(not(target_os = "linux"))]
    {
        let _ = (mode, trails);
        error!("No {:?} backend on this platform", cli.backend);
        std::process::exit(1);
    }
}

#[cfg_attr(not(target_os = "linux"), allow(dead_code))]
fn run<S: SenselSdk + 'static>(op: MorphOperator<S>, trails: usize) {
    let options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_inner_size([900.0, 432.0])
            .with_min_inner_size([320.0, 240.0])
            .with_title("Morphtap - Sensel Morph Viewer"),
        ..Default::default()
    };

    let result = eframe::run_native(
        "Morphtap",
        options,
        Box::new(move |_cc| Ok(Box::new(MorphApp::new(op, trails)))),
    );
    if let Err(e) = result {
        error!("Failed to run eframe: {}", e);
        std::process::exit(1);
    }
}
