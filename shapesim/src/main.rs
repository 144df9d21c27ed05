use shapesim::{ScenarioConfig, Scenario};
use shapesim::{bench_collision, bench_step};

use clap::Parser;
use anyhow::{Context, Result};
use tracing_subscriber::EnvFilter;

use std::fs::File;
use std::io::BufReader;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(about = "Headless driver for shape-matching particle physics scenarios")]
struct Args {
    /// Scenario file, either a path or a name under `scenarios/`
    #[arg(short, default_value = "drop_box.yaml")]
    file_name: String,

    /// Override the scenario's step count
    #[arg(long)]
    steps: Option<usize>,

    /// Run the timing benchmarks instead of a scenario
    #[arg(long)]
    bench: bool,
}

fn resolve_scenario_path(file_name: &str) -> PathBuf {
    let direct = PathBuf::from(file_name);
    if direct.is_file() {
        return direct;
    }
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("scenarios").join(file_name)
}

// load here to keep main clean
fn load_scenario_from_yaml(file_name: &str) -> Result<ScenarioConfig> {
    let config_path = resolve_scenario_path(file_name);
    let file = File::open(&config_path)
        .with_context(|| format!("failed to open scenario {}", config_path.display()))?;
    let reader = BufReader::new(file);
    let scenario_cfg: ScenarioConfig = serde_yaml::from_reader(reader)
        .with_context(|| format!("failed to parse scenario {}", config_path.display()))?;
    Ok(scenario_cfg)
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let args = Args::parse();

    if args.bench {
        bench_collision();
        bench_step();
        return Ok(());
    }

    let scenario_cfg = load_scenario_from_yaml(&args.file_name)?;
    let mut scenario = Scenario::build_scenario(scenario_cfg)?;
    if let Some(steps) = args.steps {
        scenario.engine.steps = steps;
    }

    scenario.run();

    println!(
        "t = {:.3} s after {} steps, {} contacts in last step",
        scenario.world.time(),
        scenario.world.step_count(),
        scenario.world.contacts_last_step()
    );
    for (i, body) in scenario.world.bodies().iter().enumerate() {
        let x = body.position();
        let v = body.velocity();
        println!(
            "body {i:3} {:?}: x = ({:8.3}, {:8.3}, {:8.3}), v = ({:8.3}, {:8.3}, {:8.3})",
            body.kind(),
            x.x,
            x.y,
            x.z,
            v.x,
            v.y,
            v.z
        );
    }

    Ok(())
}
