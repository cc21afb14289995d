use std::path::PathBuf;

use evopolicy_training::config::TrainingConfig;

use crate::util::Output;

#[derive(Default, Debug, Clone, clap::Args)]
pub(crate) struct ExampleConfigArg {
    /// Output file path (stdout if omitted)
    #[arg(long)]
    output: Option<PathBuf>,
}

pub(crate) fn run(arg: &ExampleConfigArg) -> anyhow::Result<()> {
    let ExampleConfigArg { output } = arg;
    Output::save_json(&TrainingConfig::default(), output.clone())
}
