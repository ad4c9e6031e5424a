use clap;
use std::path::PathBuf;

#[derive(clap::Parser,Debug)]
pub struct CorrectArgs {
    #[command(subcommand)]
    pub action: Action,
}

#[derive(clap::Subcommand,Debug)]
pub enum Action {
    /// write default correction settings
    NewSettings(NewSettingsArgs),
    /// load a dataset, apply the configured corrections and export the result
    Run(RunArgs),
    ListCorrections,
}

#[derive(clap::Args,Debug)]
pub struct NewSettingsArgs {
    pub destination:PathBuf,
}

#[derive(clap::Args,Debug)]
pub struct RunArgs {
    pub dataset_dir:PathBuf,
    pub settings:PathBuf,
    pub output_dir:PathBuf,
    /// repeat corrections even if they were already applied
    #[clap(long)]
    pub force:bool,
}
