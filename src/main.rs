use starfield::{Outcome, PngSequence, Simulation, SimulationConfig};
use starfield::{bench_compositor, bench_gravitation, bench_sort, bench_step};

use anyhow::{bail, Result};
use clap::Parser;
use log::info;

use std::path::PathBuf;

#[derive(Parser, Debug)]
struct Args {
    /// Scenario file under `scenarios/`
    #[arg(short, long, default_value = "default.yaml")]
    file_name: String,

    /// Stop after this many frames (overrides the scenario)
    #[arg(long)]
    frames: Option<u64>,

    /// Worker pool size (overrides the scenario)
    #[arg(long)]
    workers: Option<usize>,

    /// Resume from the scenario's state file
    #[arg(long)]
    load: bool,

    /// Run the micro-benchmarks instead of a simulation
    #[arg(long)]
    bench: bool,
}

// load here to keep main clean
fn load_config(args: &Args) -> Result<SimulationConfig> {
    let config_path = PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("scenarios").join(&args.file_name);
    let mut config = SimulationConfig::load(&config_path)?;

    if let Some(frames) = args.frames {
        config.engine.frames = frames;
    }
    if let Some(workers) = args.workers {
        config.engine.workers = workers;
    }
    config.validate()?;

    Ok(config)
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Args::parse();

    if args.bench {
        bench_gravitation();
        bench_compositor();
        bench_sort();
        bench_step();
        return Ok(());
    }

    let config = load_config(&args)?;
    info!("scenario {} loaded", args.file_name);

    let mut sink = PngSequence::new(&config.output.directory, &config.output.prefix)?;

    let mut sim = if args.load {
        Simulation::resume_or_new(config)?
    } else {
        Simulation::new(config)?
    };
    sink = sink.resume_after(sim.frames_done());

    match sim.run(&mut sink) {
        Outcome::Success => Ok(()),
        Outcome::Stopped => {
            info!("stopped on request");
            Ok(())
        }
        Outcome::Fatal(e) => bail!(e),
    }
}
