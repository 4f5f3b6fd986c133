use physim::{ScenarioConfig, Scenario};
use physim::{bench_octree, bench_step};

use anyhow::{Context, Result};
use clap::Parser;
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

use std::fs::File;
use std::io::BufReader;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "physim", about = "Particle simulation driver")]
struct Args {
    /// Scenario YAML, relative to ./scenarios unless the path exists as given
    #[arg(short, long, default_value = "falling_particles.yaml")]
    file: String,

    /// Override the number of steps of the scenario
    #[arg(long)]
    steps: Option<usize>,

    /// Worker threads of the fluid stage
    #[arg(long)]
    threads: Option<usize>,

    /// Logging verbosity: trace, debug, info, warn or error
    #[arg(long, default_value = "info")]
    log_level: String,

    /// Run the timing benchmarks instead of a scenario
    #[arg(long)]
    bench: bool,
}

// load here to keep main clean
fn load_scenario_from_yaml(file_name: &str) -> Result<ScenarioConfig> {
    let given = PathBuf::from(file_name);
    let config_path = if given.exists() {
        given
    } else {
        PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("scenarios").join(file_name)
    };

    let file = File::open(&config_path)
        .with_context(|| format!("failed to open scenario {}", config_path.display()))?;
    let reader = BufReader::new(file);
    let scenario_cfg: ScenarioConfig = serde_yaml::from_reader(reader)
        .with_context(|| format!("failed to parse scenario {}", config_path.display()))?;

    Ok(scenario_cfg)
}

fn main() -> Result<()> {
    let args = Args::parse();

    let log_level = match args.log_level.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };
    let subscriber = FmtSubscriber::builder()
        .with_max_level(log_level)
        .with_target(false)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    if args.bench {
        bench_octree();
        bench_step();
        return Ok(());
    }

    let scenario_cfg = load_scenario_from_yaml(&args.file)?;
    let mut scenario = Scenario::build_scenario(&scenario_cfg).context("invalid scenario")?;
    let steps = args.steps.unwrap_or(scenario.steps);
    let threads = args.threads.unwrap_or(scenario.threads);

    info!(file = %args.file, steps, threads, "running scenario");
    let sim = &mut scenario.simulator;
    for step in 0..steps {
        sim.apply_time_step_parallel(threads);
        if step % 100 == 0 {
            let n = sim.free_particles().len() + sim.sized_particles().len();
            let centroid = sim
                .free_particles()
                .iter()
                .map(|p| p.cur_pos)
                .chain(sim.sized_particles().iter().map(|p| p.particle.cur_pos))
                .fold(physim::NVec3::zeros(), |acc, x| acc + x)
                / (n.max(1) as f64);
            info!(step, particles = n, centroid = ?centroid, "progress");
        }
    }

    for p in sim.sized_particles() {
        println!("sized {:3}: pos = {:?}, vel = {:?}", p.particle.index, p.particle.cur_pos.as_slice(), p.particle.cur_vel.as_slice());
    }
    for a in sim.agent_particles() {
        println!("agent {:3}: pos = {:?}, target = {:?}", a.particle.index, a.particle.cur_pos.as_slice(), a.target.as_slice());
    }
    info!(steps, "done");

    Ok(())
}
