use std::path::PathBuf;

use anyhow::Context;
use evopolicy_env::{CartPole, FrameExporter as _, Recording, cart_pole::DEFAULT_STEP_LIMIT};
use evopolicy_training::fitness::{self, RolloutOptions};

use crate::{
    model::PolicyModel,
    util::{self, JsonFrameExporter},
};

#[derive(Debug, Clone, clap::Args)]
pub(crate) struct ReplayArg {
    /// Path to the trained model file (JSON format)
    model: PathBuf,
    /// Environment seed for the episode
    #[arg(long, default_value_t = 0)]
    seed: u64,
    /// Log every step of the episode (visible with `RUST_LOG=trace`)
    #[arg(long)]
    render: bool,
    /// Record the episode's frames to this file
    #[arg(long)]
    record: Option<PathBuf>,
}

pub(crate) fn run(arg: &ReplayArg) -> anyhow::Result<()> {
    let ReplayArg {
        model,
        seed,
        render,
        record,
    } = arg;

    eprintln!("Loading model from {}", model.display());
    let model: PolicyModel = util::read_json_file("model", model)?;
    eprintln!(
        "Loaded {} (trained at {}, fitness {:.3})",
        model.name, model.trained_at, model.final_fitness
    );

    let options = RolloutOptions {
        render: *render,
        record_frames: record.is_some(),
        max_steps: Some(model.config.max_steps.unwrap_or(DEFAULT_STEP_LIMIT)),
    };
    let rollout = fitness::simulate(&model.agent, &mut CartPole::new(*seed), &options)
        .context("Episode failed")?;
    eprintln!(
        "Score: {:.1} in {} steps{}",
        rollout.score,
        rollout.steps,
        if rollout.truncated { " (step limit)" } else { "" }
    );

    if let Some(path) = record {
        JsonFrameExporter.export(&Recording {
            path: path.clone(),
            frames: rollout.frames,
        })?;
    }
    Ok(())
}
