use std::path::PathBuf;

use anyhow::Context;
use chrono::Utc;
use evopolicy_env::{CartPole, FrameExporter as _, Recording};
use evopolicy_training::{
    config::TrainingConfig,
    crossover::{CrossoverStrategy, DeParams},
    fitness::{self, RolloutOptions},
    generation::GenerationLoop,
    mutation::{DEFAULT_GAUSSIAN_STD_DEV, MutationStrategy},
};

use crate::{
    model::PolicyModel,
    util::{self, JsonFrameExporter, Output},
};

const MODEL_NAME: &str = "cart-pole";

#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
enum CrossoverArg {
    TwoPoint,
    SinglePoint,
    DeUniform,
    DeClassic,
}

impl From<CrossoverArg> for CrossoverStrategy {
    fn from(arg: CrossoverArg) -> Self {
        match arg {
            CrossoverArg::TwoPoint => Self::TwoPoint,
            CrossoverArg::SinglePoint => Self::SinglePoint,
            CrossoverArg::DeUniform => Self::DeUniform,
            CrossoverArg::DeClassic => Self::DeClassic(DeParams::default()),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
enum MutationArg {
    Swap,
    Scramble,
    Inverse,
    Gaussian,
    Uniform,
}

impl From<MutationArg> for MutationStrategy {
    fn from(arg: MutationArg) -> Self {
        match arg {
            MutationArg::Swap => Self::Swap,
            MutationArg::Scramble => Self::Scramble,
            MutationArg::Inverse => Self::Inverse,
            MutationArg::Gaussian => Self::Gaussian {
                std_dev: DEFAULT_GAUSSIAN_STD_DEV,
            },
            MutationArg::Uniform => Self::Uniform,
        }
    }
}

#[derive(Default, Debug, Clone, clap::Args)]
pub(crate) struct TrainArg {
    /// Training configuration file (JSON); flags below override its values
    #[arg(long)]
    config: Option<PathBuf>,
    #[arg(long)]
    population_size: Option<usize>,
    #[arg(long)]
    generations: Option<usize>,
    #[arg(long)]
    seed: Option<u64>,
    #[arg(long, value_enum)]
    crossover: Option<CrossoverArg>,
    #[arg(long, value_enum)]
    mutation: Option<MutationArg>,
    /// Score at which the mutation rate bottoms out
    #[arg(long)]
    goal: Option<f32>,
    /// Stop once a generation's best score reaches this value
    #[arg(long)]
    acceptance: Option<f32>,
    /// Output file path for the trained model (stdout if omitted)
    #[arg(long)]
    output: Option<PathBuf>,
    /// Output file path for the fitness-per-generation plot series
    #[arg(long)]
    history: Option<PathBuf>,
    /// Record an episode of the best agent to this file
    #[arg(long)]
    record: Option<PathBuf>,
}

impl TrainArg {
    fn load_config(&self) -> anyhow::Result<TrainingConfig> {
        let mut config = match &self.config {
            Some(path) => util::read_json_file("training config", path)?,
            None => TrainingConfig::default(),
        };
        if let Some(size) = self.population_size {
            config.population_size = size;
        }
        if let Some(generations) = self.generations {
            config.max_generations = generations;
        }
        if let Some(seed) = self.seed {
            config.seed = Some(seed);
        }
        if let Some(crossover) = self.crossover {
            config.crossover = crossover.into();
        }
        if let Some(mutation) = self.mutation {
            config.mutation = mutation.into();
        }
        if let Some(goal) = self.goal {
            config.goal_score = goal;
        }
        if let Some(acceptance) = self.acceptance {
            config.acceptance_score = Some(acceptance);
        }
        Ok(config)
    }
}

pub(crate) fn run(arg: &TrainArg) -> anyhow::Result<()> {
    let mut config = arg.load_config()?;
    let mut training =
        GenerationLoop::new(&config, CartPole::new).context("Invalid training configuration")?;
    let reason = training
        .run(config.max_generations, config.acceptance_score)
        .context("Training failed")?;
    eprintln!("Training stopped: {reason}");
    if let Some(last) = training.history().last() {
        eprintln!(
            "Generation {}: best {:.3}, mean {:.3}, mutation rate {:.3}",
            last.generation, last.best, last.mean, last.mutation_rate
        );
    }

    if let Some(path) = &arg.history {
        let plot = training.history().plot_series(config.acceptance_score);
        Output::save_json(&plot, Some(path.clone()))?;
        eprintln!("History saved to {}", path.display());
    }

    let best = training
        .best_individual()
        .context("No individual was evaluated")?;
    if let Some(path) = &arg.record {
        let options = RolloutOptions {
            record_frames: true,
            ..RolloutOptions::with_max_steps(config.max_steps)
        };
        let mut env = CartPole::new(training.seed());
        let rollout = fitness::simulate(best.agent(), &mut env, &options)
            .context("Failed to record the best agent")?;
        eprintln!(
            "Recorded episode: score {:.1}, {} steps",
            rollout.score, rollout.steps
        );
        JsonFrameExporter.export(&Recording {
            path: path.clone(),
            frames: rollout.frames,
        })?;
    }

    config.seed = Some(training.seed());
    let model = PolicyModel {
        name: MODEL_NAME.to_owned(),
        trained_at: Utc::now(),
        final_fitness: best.fitness(),
        seed: training.seed(),
        config,
        agent: best.agent().clone(),
    };
    Output::save_json(&model, arg.output.clone())?;

    eprintln!();
    eprintln!("Model saved successfully");
    if let Some(path) = &arg.output {
        eprintln!("  Path: {}", path.display());
    }
    eprintln!("  Name: {}", model.name);
    eprintln!("  Trained at: {}", model.trained_at);
    eprintln!("  Final fitness: {:.3}", model.final_fitness);
    eprintln!("  Topology: {:?}", model.agent.widths());

    Ok(())
}
