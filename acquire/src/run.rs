//! Driver loop: walks an [AcqManager] through a whole run against a [StageDriver].

use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use acq_index::coordinate::Axis;
use log::info;
use ndarray::{stack, Array2, Array3, ArrayView2};
use crate::acq_manager::{AcqError, AcqManager, AcqState};
use crate::driver::StageDriver;

#[derive(Clone,Debug)]
pub struct RunOptions {
    /// sleep between time-gate polls
    pub poll_interval:Duration,
}

impl Default for RunOptions {
    fn default() -> Self {
        Self { poll_interval: Duration::from_millis(100) }
    }
}

#[derive(Clone,Debug,PartialEq)]
pub struct RunReport {
    pub frames:usize,
    pub complete:bool,
    pub stopped:bool,
    pub polls:usize,
    pub focus_offset:f64,
}

/// Collects the planes of the z-stack being acquired when focus tracking is on.
struct ZStackCollector {
    planes:Vec<Array2<f32>>,
    n_slices:usize,
}

impl ZStackCollector {
    fn push(&mut self,frame:&Array2<u16>) -> Option<Array3<f32>> {
        self.planes.push(frame.mapv(|v| v as f32));
        if self.planes.len() < self.n_slices {
            return None
        }
        let views:Vec<ArrayView2<f32>> = self.planes.iter().map(|p| p.view()).collect();
        let z_stack = stack(ndarray::Axis(2),&views).ok();
        self.planes.clear();
        z_stack
    }
}

/// Runs the manager to completion (or until `stop` is raised). Focus tracking runs after each
/// completed z-stack when the plan asks for it and slices are the fastest axis, so every
/// stack is acquired without interruption.
pub fn run_acquisition(manager:&mut AcqManager,driver:&mut dyn StageDriver,options:&RunOptions,stop:&AtomicBool) -> Result<RunReport,AcqError> {
    let plan = manager.plan().clone();
    let n_slices = plan.axis_sizes().slice;
    let mut collector = match plan.track_focus && n_slices > 1 && plan.order.fastest_axis() == Axis::Slice {
        true => Some(ZStackCollector { planes: Vec::with_capacity(n_slices), n_slices }),
        false => None
    };
    if plan.track_focus && collector.is_none() {
        info!("focus tracking needs slices as the fastest axis of a multi-slice plan; not tracking");
    }

    if manager.state() == AcqState::Idle && manager.counter() == 0 {
        manager.start()?;
    }

    let mut frames = 0;
    let mut polls = 0;
    let mut stopped = false;
    loop {
        if stop.load(Ordering::SeqCst) {
            manager.stop();
            stopped = true;
            break
        }
        match manager.state() {
            AcqState::FrameRequest => {
                let request = manager.acknowledge()?;
                driver.move_to(request.stage_target)?;
                driver.select_channel(&request.channel,request.preset.as_ref())?;
                let frame = driver.capture_frame()?;
                let z_stack = collector.as_mut().and_then(|c| c.push(&frame));
                manager.submit_frame(frame)?;
                frames += 1;
                if let Some(z_stack) = z_stack {
                    manager.track_focus(z_stack.view(),plan.z_step());
                }
            }
            AcqState::Waiting => {
                manager.clock().sleep(options.poll_interval);
                manager.poll_wait()?;
                polls += 1;
            }
            AcqState::Idle => break,
            AcqState::Busy => return Err(AcqError::IllegalTransition { state: AcqState::Busy, action: "drive the run loop" }),
        }
    }

    let report = RunReport {
        frames,
        complete: manager.is_complete(),
        stopped,
        polls,
        focus_offset: manager.focus_offset(),
    };
    info!("run finished: {} frames, complete={}, {} gate polls, focus bias {:+.3}",report.frames,report.complete,report.polls,report.focus_offset);
    Ok(report)
}
