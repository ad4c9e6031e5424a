use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use acq_index::acq_order::AcquisitionOrder;
use acq_index::plan::{AcquisitionPlan, ChannelPreset, ChannelPresets};
use acquire::acq_manager::AcqManager;
use acquire::clock::ManualClock;
use acquire::driver::{DriverError, SimulatedDriver, StageDriver};
use acquire::run::{run_acquisition, RunOptions};
use image_store::dataset::load;
use image_store::indices::IndexSubset;
use image_store::store::{IndexedImageStore, Persist, StoreSettings};
use ndarray::Array2;
use tempfile::TempDir;

fn init_logger() {
    let _ = env_logger::builder().is_test(true).try_init();
}

fn options() -> RunOptions {
    RunOptions { poll_interval: Duration::from_millis(500) }
}

fn time_lapse() -> AcquisitionPlan {
    AcquisitionPlan {
        positions: vec![[0.0,0.0,0.0]],
        z_offsets: vec![-1.0,0.0,1.0],
        time_delays: vec![0.0,30.0],
        channels: vec![String::from("BF"),String::from("GFP")],
        frame_shape: [8,8],
        order: AcquisitionOrder::ZCXYT,
        track_focus: false,
    }
}

#[test]
fn time_lapse_lands_on_disk() {
    init_logger();
    let dir = TempDir::new().unwrap();
    let plan = time_lapse();
    let clock = ManualClock::new();
    let store = IndexedImageStore::create(dir.path(),&plan,StoreSettings::default()).unwrap();
    let mut manager = AcqManager::new(&plan,&ChannelPresets::default(),store,Box::new(clock.clone())).unwrap();
    let mut driver = SimulatedDriver::new(plan.frame_shape,3);

    let report = run_acquisition(&mut manager,&mut driver,&options(),&AtomicBool::new(false)).unwrap();
    assert!(report.complete);
    assert!(!report.stopped);
    assert_eq!(report.frames,12);
    assert_eq!(report.polls,60);
    assert!(clock_reached(&clock,30.0));

    let records = manager.store().records();
    assert!(records[..6].iter().all(|r| r.elapsed_s < 30.0));
    assert!(records[6..].iter().all(|r| r.elapsed_s >= 30.0));
    assert_eq!(records[3].channel,"GFP");
    assert_eq!(records[3].exposure_ms,100.0);

    let ds = load(dir.path(),&IndexSubset::all()).unwrap();
    assert!(ds.is_complete());
    assert!(!ds.journal_repaired);
    assert_eq!(ds.data.shape(),&[8,8,3,2,1,2]);
}

fn clock_reached(clock:&ManualClock,t:f64) -> bool {
    use acquire::clock::Clock;
    clock.now_s() >= t
}

#[test]
fn focus_tracking_follows_the_focal_plane() {
    init_logger();
    let plan = AcquisitionPlan {
        positions: vec![[0.0,0.0,0.0]],
        z_offsets: vec![-2.0,-1.0,0.0,1.0,2.0],
        time_delays: vec![0.0,0.0,0.0],
        channels: vec![String::from("BF")],
        frame_shape: [16,16],
        order: AcquisitionOrder::ZCXYT,
        track_focus: true,
    };
    let mut manager = AcqManager::new(&plan,&ChannelPresets::default(),IndexedImageStore::in_memory(&plan),Box::new(ManualClock::new())).unwrap();
    let mut driver = SimulatedDriver::new(plan.frame_shape,11);
    driver.focal_plane = 1.0;

    let report = run_acquisition(&mut manager,&mut driver,&options(),&AtomicBool::new(false)).unwrap();
    assert!(report.complete);
    assert_eq!(report.focus_offset,1.0);
    let records = manager.store().records();
    assert!(records[..5].iter().all(|r| r.focus_offset == 0.0));
    assert!(records[5..].iter().all(|r| r.focus_offset == 1.0));
    // last slice of the last stack: +2 around the refocused plane
    assert_eq!(driver.stage()[2],3.0);
}

/// Simulated microscope that raises the stop flag after a few frames.
struct StopAfter {
    inner:SimulatedDriver,
    frames:usize,
    stop:Arc<AtomicBool>,
}

impl StageDriver for StopAfter {
    fn move_to(&mut self,target:[f64;3]) -> Result<(),DriverError> {
        self.inner.move_to(target)
    }
    fn select_channel(&mut self,channel:&str,preset:Option<&ChannelPreset>) -> Result<(),DriverError> {
        self.inner.select_channel(channel,preset)
    }
    fn capture_frame(&mut self) -> Result<Array2<u16>,DriverError> {
        let frame = self.inner.capture_frame()?;
        if self.inner.frames_captured() == self.frames {
            self.stop.store(true,Ordering::SeqCst);
        }
        Ok(frame)
    }
}

#[test]
fn stopped_run_leaves_a_repairable_dataset() {
    init_logger();
    let dir = TempDir::new().unwrap();
    let plan = time_lapse();
    let settings = StoreSettings { persist: Persist::AppendRaw, keep_in_memory: false, ..StoreSettings::default() };
    let store = IndexedImageStore::create(dir.path(),&plan,settings).unwrap();
    let mut manager = AcqManager::new(&plan,&ChannelPresets::default(),store,Box::new(ManualClock::new())).unwrap();
    let stop = Arc::new(AtomicBool::new(false));
    let mut driver = StopAfter { inner: SimulatedDriver::new(plan.frame_shape,5), frames: 4, stop: stop.clone() };

    let report = run_acquisition(&mut manager,&mut driver,&options(),&stop).unwrap();
    assert!(report.stopped);
    assert!(!report.complete);
    assert_eq!(report.frames,4);
    drop(manager);

    let ds = load(dir.path(),&IndexSubset::all()).unwrap();
    assert!(ds.journal_repaired);
    assert_eq!(ds.records.len(),4);
    assert_eq!(ds.missing_frames.len(),8);
    assert!(ds.summary().contains("4 of 12 records (repaired)"));
}
