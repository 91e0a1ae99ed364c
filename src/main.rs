use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use log::debug;
use rand::Rng;

use petri_exam::config::SimConfig;
use petri_exam::exam;
use petri_exam::options::{Options, OutputFormat};
use petri_exam::report::{AnalysisReport, SetSummary, StepRecord, Trajectory, TreeSummary};
use petri_exam::simulation::{ExamPolicy, Simulator, StepOutcome};

fn main() {
    if std::env::var("PETRI_LOG").is_ok() {
        let e = env_logger::Env::new()
            .filter("PETRI_LOG")
            .write_style("PETRI_LOG_STYLE");
        env_logger::init_from_env(e);
    }

    let args: Vec<String> = std::env::args().skip(1).collect();
    let options = match Options::parse_from_args(&args) {
        Ok(options) => options,
        Err(err) => match err.downcast::<clap::Error>() {
            Ok(clap_err) => clap_err.exit(),
            Err(err) => {
                eprintln!("error: {}", err);
                std::process::exit(2);
            }
        },
    };
    debug!("petri-exam options: {:?}", options);

    if let Err(err) = run(&options) {
        eprintln!("error: {:#}", err);
        std::process::exit(1);
    }
}

fn run(options: &Options) -> Result<()> {
    let mut config = SimConfig::load_from_file(&options.config)?;
    if let Some(steps) = options.steps {
        config.max_steps = steps;
    }
    if let Some(depth) = options.depth {
        config.tree_depth = depth;
    }
    let seed = options
        .seed
        .or(config.seed)
        .unwrap_or_else(|| rand::rng().random());
    debug!("config: {:?}, seed {}", config, seed);

    let net = exam::exam_net(config.candidates, config.examiners)?;
    net.log_diagnostics();
    let policy = ExamPolicy::with_weights(&net, config.success_weight, config.retry_weight)?;
    let mut sim = Simulator::seeded(net, Box::new(policy), seed)?
        .with_explore_config(config.explore_config());

    let mut report = AnalysisReport::new("exam");
    let mode = options.mode;

    if mode.simulate() {
        report.trajectory = Some(simulate(&mut sim, seed, config.max_steps)?);
    }
    if mode.set() {
        report.reachability_set = Some(SetSummary::new(&sim.reachability_set(), sim.net()));
    }

    let tree = (mode.tree() || options.dot_dir.is_some())
        .then(|| sim.reachability_tree(config.tree_depth));
    if mode.tree() {
        report.tree = tree.as_ref().map(TreeSummary::new);
    }

    if mode.matrix() {
        match sim.reachability_matrix() {
            Ok(matrix) => {
                report.dead_markings = matrix.dead_markings();
                report.matrix = Some(matrix);
            }
            Err(err) => report.error = Some(err.to_string()),
        }
    }

    if let Some(dir) = &options.dot_dir {
        fs::create_dir_all(dir)
            .with_context(|| format!("Failed to create dot directory: {:?}", dir))?;
        write_dot(&dir.join("net.dot"), &sim.net().to_dot(sim.current_marking()))?;
        if let Some(tree) = &tree {
            write_dot(&dir.join("tree.dot"), &tree.dot())?;
        }
    }

    match options.format {
        OutputFormat::Text => print!("{}", report),
        OutputFormat::Json => println!("{}", report.to_json()?),
    }
    Ok(())
}

fn simulate(sim: &mut Simulator, seed: u64, max_steps: usize) -> Result<Trajectory> {
    let initial = sim.current_label();
    let mut steps = Vec::new();
    let mut terminated = false;

    while steps.len() < max_steps {
        match sim.step()? {
            StepOutcome::Fired { transition, marking } => {
                let record = StepRecord {
                    step: steps.len() + 1,
                    transition: sim.net().transitions()[transition].name.clone(),
                    marking: sim.net().label(&marking),
                };
                steps.push(record);
            }
            StepOutcome::NoEnabledTransition => {
                terminated = true;
                break;
            }
        }
    }

    Ok(Trajectory {
        seed,
        initial,
        steps,
        final_marking: sim.current_label(),
        terminated,
    })
}

fn write_dot(path: &Path, dot: &str) -> Result<()> {
    fs::write(path, dot).with_context(|| format!("Failed to write {:?}", path))?;
    log::info!("wrote {:?}", path);
    Ok(())
}
