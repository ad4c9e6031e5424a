use clap;
use std::path::PathBuf;

#[derive(clap::Parser,Debug)]
pub struct AcquireArgs {
    #[command(subcommand)]
    pub action: Action,
}

#[derive(clap::Subcommand,Debug)]
pub enum Action {
    /// write a template acquisition plan (json)
    NewPlan(NewFileArgs),
    /// write the default channel presets
    NewPresets(NewFileArgs),
    /// run a plan against the simulated microscope
    Simulate(SimulateArgs),
    /// print what a dataset directory holds
    Inspect(DatasetArgs),
    /// close a journal left open by an interrupted run
    RepairJournal(DatasetArgs),
    ListOrders,
}

#[derive(clap::Args,Debug)]
pub struct NewFileArgs {
    pub destination:PathBuf,
}

#[derive(clap::Args,Debug)]
pub struct DatasetArgs {
    pub dataset_dir:PathBuf,
}

#[derive(clap::Args,Debug)]
pub struct SimulateArgs {
    pub plan:PathBuf,
    pub presets:PathBuf,
    pub output_dir:PathBuf,
    /// indexed or linear
    #[clap(long, default_value = "indexed")]
    pub file_order:String,
    /// none, per_frame or append_raw
    #[clap(long, default_value = "per_frame")]
    pub persist:String,
    #[clap(long, default_value_t = 100)]
    pub poll_ms:u64,
    /// step a virtual clock instead of sleeping through the time delays
    #[clap(long)]
    pub virtual_time:bool,
    #[clap(long, default_value_t = 0)]
    pub seed:u64,
    /// stage z of the simulated focal plane
    #[clap(long, default_value_t = 0.0)]
    pub focal_plane:f64,
}
