use std::sync::atomic::AtomicBool;
use std::time::Duration;
use acq_index::acq_order::AcquisitionOrder;
use acq_index::config::ConfigFile;
use acq_index::plan::{AcquisitionPlan, ChannelPresets};
use image_store::dataset;
use image_store::file_order::FileOrder;
use image_store::indices::IndexSubset;
use image_store::journal::{repair_journal as repair, JOURNAL_FILENAME};
use image_store::store::{IndexedImageStore, Persist, StoreSettings};
use log::info;
use crate::acq_manager::{AcqError, AcqManager};
use crate::args::{DatasetArgs, NewFileArgs, SimulateArgs};
use crate::clock::{Clock, ManualClock, SystemClock};
use crate::driver::SimulatedDriver;
use crate::run::{run_acquisition, RunOptions, RunReport};

pub fn list_orders() -> String {
    AcquisitionOrder::list()
}

pub fn new_plan(args:&NewFileArgs) -> Result<(),AcqError> {
    AcquisitionPlan::template().to_file(&args.destination)?;
    info!("plan template written to {:?}",args.destination);
    Ok(())
}

pub fn new_presets(args:&NewFileArgs) -> Result<(),AcqError> {
    ChannelPresets::default().to_file(&args.destination)?;
    info!("channel presets written to {:?}",args.destination.with_extension(ChannelPresets::file_ext()));
    Ok(())
}

fn bad_option(what:&'static str,value:&str) -> AcqError {
    AcqError::InvalidOption { what, value: value.to_string() }
}

pub fn simulate(args:&SimulateArgs) -> Result<RunReport,AcqError> {
    let plan = AcquisitionPlan::from_file(&args.plan)?;
    let presets = ChannelPresets::from_file(&args.presets)?;
    let settings = StoreSettings {
        file_order: FileOrder::encode(&args.file_order).ok_or_else(|| bad_option("file order",&args.file_order))?,
        persist: Persist::encode(&args.persist).ok_or_else(|| bad_option("persist",&args.persist))?,
        keep_in_memory: false,
        ..StoreSettings::default()
    };
    let store = IndexedImageStore::create(&args.output_dir,&plan,settings)?;
    let clock:Box<dyn Clock> = match args.virtual_time {
        true => Box::new(ManualClock::new()),
        false => Box::new(SystemClock::new())
    };
    let mut manager = AcqManager::new(&plan,&presets,store,clock)?;
    let mut driver = SimulatedDriver::new(plan.frame_shape,args.seed);
    driver.focal_plane = args.focal_plane;
    let options = RunOptions { poll_interval: Duration::from_millis(args.poll_ms) };
    let stop = AtomicBool::new(false);
    run_acquisition(&mut manager,&mut driver,&options,&stop)
}

pub fn inspect(args:&DatasetArgs) -> Result<String,AcqError> {
    let ds = dataset::load(&args.dataset_dir,&IndexSubset::all())?;
    Ok(ds.summary())
}

pub fn repair_journal(args:&DatasetArgs) -> Result<usize,AcqError> {
    let contents = repair(&args.dataset_dir.join(JOURNAL_FILENAME))?;
    match contents.repaired {
        true => info!("journal repaired; {} records kept",contents.records.len()),
        false => info!("journal is intact ({} records)",contents.records.len()),
    }
    Ok(contents.records.len())
}
