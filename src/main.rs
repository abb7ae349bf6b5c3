use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;

use clap::Parser;

use context_distiller::config::{self, DistillerConfig};
use context_distiller::pipeline::assembly::{AssemblyReport, Mode, PayloadAssembler};
use context_distiller::pipeline::cancel::CancelFlag;
use context_distiller::pipeline::import::RawInput;
use context_distiller::pipeline::processor::{build_distiller, DistillRequest, DistillStats};

#[derive(Parser, Debug)]
#[command(name = config::APP_NAME, version, about = "Distill files, archives, media and pasted notes into one handoff snapshot")]
struct Cli {
    /// Inputs, processed in the order given
    files: Vec<PathBuf>,

    /// handoff, debug or review
    #[arg(short, long, default_value_t = Mode::Handoff)]
    mode: Mode,

    /// Free text to include before the files
    #[arg(long)]
    paste: Option<String>,

    /// Read the pasted text from a file
    #[arg(long, conflicts_with = "paste")]
    paste_file: Option<PathBuf>,

    /// Model name (overrides DISTILLER_MODEL)
    #[arg(long)]
    model: Option<String>,

    /// Give up on media still processing after this many seconds
    #[arg(long)]
    poll_timeout_secs: Option<u64>,

    /// Assemble and print the payload without calling the model
    #[arg(long)]
    print_payload: bool,
}

fn main() -> ExitCode {
    // A missing .env is fine; the environment may already be set.
    let _ = dotenvy::dotenv();
    context_distiller::init_tracing();

    tracing::info!("{} v{}", config::APP_NAME, config::APP_VERSION);

    match run(Cli::parse()) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {e}");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    let Cli {
        files,
        mode,
        paste,
        paste_file,
        model,
        poll_timeout_secs,
        print_payload,
    } = cli;

    let pasted_text = match (paste, paste_file) {
        (Some(text), _) => Some(text),
        (None, Some(path)) => {
            let bytes = std::fs::read(&path).map_err(|e| format!("{}: {e}", path.display()))?;
            Some(String::from_utf8_lossy(&bytes).into_owned())
        }
        (None, None) => None,
    };

    let inputs = files
        .iter()
        .map(|path| RawInput::from_path(path).map_err(|e| format!("{}: {e}", path.display())))
        .collect::<Result<Vec<_>, _>>()?;

    let cancel = CancelFlag::new();

    if print_payload {
        let assembly = PayloadAssembler::new(None, cancel).assemble(mode, pasted_text.as_deref(), inputs)?;
        println!("{}", assembly.payload.render_text());
        print_report(&assembly.report);
        return Ok(());
    }

    let mut config = DistillerConfig::from_env()?;
    if let Some(model) = model {
        config.model = model;
    }
    if let Some(secs) = poll_timeout_secs {
        config.poll.timeout = Duration::from_secs(secs);
    }

    let distiller = build_distiller(&config, cancel)?;
    let output = distiller.distill(DistillRequest {
        mode,
        pasted_text,
        inputs,
    })?;

    println!("{}", output.summary);
    print_report(&output.report);
    Ok(())
}

fn print_report(report: &AssemblyReport) {
    for failure in &report.failures {
        eprintln!("{}", failure.render());
    }
    for name in &report.skipped {
        eprintln!("[SKIPPED {name}]");
    }

    let stats = DistillStats::from(report);
    eprintln!(
        "{} blocks, {} failures, {} skipped, {} junk entries filtered, {} media",
        stats.blocks, stats.failures, stats.skipped, stats.junk_filtered, stats.media
    );
}
