use clap::{Parser, Subcommand};

use self::{example_config::ExampleConfigArg, replay::ReplayArg, train::TrainArg};

mod example_config;
mod replay;
mod train;

#[derive(Debug, Clone, Parser)]
#[command(author, version, about, long_about = None)]
pub struct CommandArgs {
    #[command(subcommand)]
    mode: Mode,
}

#[derive(Debug, Clone, Subcommand)]
enum Mode {
    /// Evolve a policy network on the cart-pole task
    Train(#[clap(flatten)] TrainArg),
    /// Play a trained model and optionally record the episode
    Replay(#[clap(flatten)] ReplayArg),
    /// Print the default training configuration as JSON
    ExampleConfig(#[clap(flatten)] ExampleConfigArg),
}

pub fn run() -> anyhow::Result<()> {
    let args = CommandArgs::parse();
    match args.mode {
        Mode::Train(arg) => train::run(&arg)?,
        Mode::Replay(arg) => replay::run(&arg)?,
        Mode::ExampleConfig(arg) => example_config::run(&arg)?,
    }
    Ok(())
}
