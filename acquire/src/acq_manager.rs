//! Frame-by-frame acquisition protocol.
//!
//! The manager decides which coordinate to request next and when. A driver loop sees four
//! states: `Idle`, `FrameRequest` (a request is ready to be picked up), `Busy` (the driver is
//! capturing it) and `Waiting` (the next request is held back by the time gate).
//!
//! The time gate is measured from the moment the previous time point started: a frame at time
//! index `t` is released once `delay(t) - delay(t_prev)` seconds have passed.

use std::fmt;
use acq_index::acq_order::{to_coordinate, IndexError};
use acq_index::config::ConfigError;
use acq_index::coordinate::FrameCoordinate;
use acq_index::plan::{AcquisitionPlan, ChannelPreset, ChannelPresets, PlanError};
use image_store::metadata::MetadataRecord;
use image_store::store::{IndexedImageStore, Persist};
use image_store::StoreError;
use log::{debug, info, warn};
use ndarray::{Array2, ArrayView3};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use utils::focus::{slice_scores, FocusMetric, GradientEnergy};
use crate::clock::Clock;
use crate::driver::DriverError;

#[derive(Clone,Copy,Debug,PartialEq,Eq,Serialize,Deserialize)]
pub enum AcqState {
    Idle,
    FrameRequest,
    Busy,
    Waiting,
}

impl fmt::Display for AcqState {
    fn fmt(&self,f:&mut fmt::Formatter) -> fmt::Result {
        write!(f,"{:?}",self)
    }
}

#[derive(Error,Debug)]
pub enum AcqError {
    #[error("cannot {action} while {state}")]
    IllegalTransition {
        state:AcqState,
        action:&'static str,
    },
    #[error("the store already holds {0} frames; start a new store for a new run")]
    StoreNotEmpty(usize),
    #[error("unknown {what} {value:?}")]
    InvalidOption {
        what:&'static str,
        value:String,
    },
    #[error(transparent)]
    Index(#[from] IndexError),
    #[error(transparent)]
    Plan(#[from] PlanError),
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error(transparent)]
    Driver(#[from] DriverError),
    #[error(transparent)]
    Config(#[from] ConfigError),
}

/// What the driver has to do for the next frame.
#[derive(Clone,Debug,PartialEq)]
pub struct FrameRequest {
    pub counter:usize,
    pub coordinate:FrameCoordinate,
    /// position + slice offset + focus bias + channel parfocal offset
    pub stage_target:[f64;3],
    pub channel:String,
    pub preset:Option<ChannelPreset>,
}

pub struct AcqManager {
    plan:AcquisitionPlan,
    presets:ChannelPresets,
    store:IndexedImageStore,
    persist:Persist,
    clock:Box<dyn Clock>,
    metric:Box<dyn FocusMetric>,
    state:AcqState,
    counter:usize,
    request:Option<FrameRequest>,
    /// next coordinate while the gate is closed
    pending:Option<FrameCoordinate>,
    run_start:f64,
    time_point_start:f64,
    time_index:usize,
    focus_offset:f64,
    complete:bool,
}

impl AcqManager {

    /// Frames are persisted the way the store's settings say.
    pub fn new(plan:&AcquisitionPlan,presets:&ChannelPresets,store:IndexedImageStore,clock:Box<dyn Clock>) -> Result<Self,AcqError> {
        plan.validate(presets)?;
        if !store.records().is_empty() {
            return Err(AcqError::StoreNotEmpty(store.records().len()))
        }
        let persist = store.settings().persist;
        Ok(Self {
            plan: plan.clone(),
            presets: presets.clone(),
            store,
            persist,
            clock,
            metric: Box::new(GradientEnergy),
            state: AcqState::Idle,
            counter: 0,
            request: None,
            pending: None,
            run_start: 0.0,
            time_point_start: 0.0,
            time_index: 1,
            focus_offset: 0.0,
            complete: false,
        })
    }

    pub fn state(&self) -> AcqState {
        self.state
    }

    pub fn plan(&self) -> &AcquisitionPlan {
        &self.plan
    }

    pub fn clock(&self) -> &dyn Clock {
        self.clock.as_ref()
    }

    pub fn store(&self) -> &IndexedImageStore {
        &self.store
    }

    /// counter of the current (or next) frame, 1-based
    pub fn counter(&self) -> usize {
        self.counter
    }

    pub fn request(&self) -> Option<&FrameRequest> {
        self.request.as_ref()
    }

    pub fn focus_offset(&self) -> f64 {
        self.focus_offset
    }

    pub fn is_complete(&self) -> bool {
        self.complete
    }

    fn illegal(&self,action:&'static str) -> AcqError {
        AcqError::IllegalTransition { state: self.state, action }
    }

    fn build_request(&self,coord:FrameCoordinate) -> FrameRequest {
        let channel = self.plan.channel_id(coord.channel).unwrap_or("").to_string();
        let preset = self.presets.get(&channel).cloned();
        let parfocal = preset.as_ref().map(|p| p.z_offset).unwrap_or(0.0);
        FrameRequest {
            counter: self.counter,
            coordinate: coord,
            stage_target: self.plan.stage_target(&coord,self.focus_offset + parfocal),
            channel,
            preset,
        }
    }

    /// Seconds that must pass after the current time point started before `next` may go.
    /// Delays are relative to the previous time point's start: time point t opens once
    /// delay[t] - delay[t-1] has elapsed since time point t-1 began, clamped at zero.
    fn required_wait(&self,next:&FrameCoordinate) -> f64 {
        match next.time == self.time_index {
            true => 0.0,
            false => (self.plan.time_delay(next.time) - self.plan.time_delay(self.time_index)).max(0.0)
        }
    }

    fn gate_open(&self,next:&FrameCoordinate) -> bool {
        self.clock.now_s() - self.time_point_start >= self.required_wait(next)
    }

    fn release(&mut self,coord:FrameCoordinate) {
        if coord.time != self.time_index || self.counter == 1 {
            self.time_point_start = self.clock.now_s();
            self.time_index = coord.time;
        }
        // the request is built when released so it carries the latest focus bias
        self.request = Some(self.build_request(coord));
        self.pending = None;
        self.state = AcqState::FrameRequest;
    }

    pub fn start(&mut self) -> Result<&FrameRequest,AcqError> {
        if self.state != AcqState::Idle || self.counter != 0 {
            return Err(self.illegal("start a run"))
        }
        self.counter = 1;
        self.run_start = self.clock.now_s();
        let first = to_coordinate(self.plan.order,&self.plan.axis_sizes(),1)?;
        self.time_index = first.time;
        self.release(first);
        info!("acquisition started: {} frames ({}), order {}",self.plan.n_frames(),self.plan.axis_sizes(),self.plan.order);
        self.request.as_ref().ok_or(AcqError::IllegalTransition { state: AcqState::Idle, action: "start a run" })
    }

    /// The driver takes the pending request.
    pub fn acknowledge(&mut self) -> Result<FrameRequest,AcqError> {
        if self.state != AcqState::FrameRequest {
            return Err(self.illegal("acknowledge a request"))
        }
        let request = self.request.clone().ok_or(self.illegal("acknowledge a request"))?;
        self.state = AcqState::Busy;
        Ok(request)
    }

    /// Hands the captured frame to the store and moves on to the next coordinate.
    pub fn submit_frame(&mut self,pixels:Array2<u16>) -> Result<AcqState,AcqError> {
        if self.state != AcqState::Busy {
            return Err(self.illegal("submit a frame"))
        }
        let request = self.request.clone().ok_or(self.illegal("submit a frame"))?;
        let record = MetadataRecord::new(
            &self.plan,
            request.counter,
            &request.coordinate,
            &request.channel,
            request.preset.as_ref(),
            self.focus_offset,
        ).with_elapsed(self.clock.now_s() - self.run_start);
        self.store.ingest(&request.coordinate,&pixels,record,self.persist)?;
        debug!("frame {} of {} at {}",request.counter,self.plan.n_frames(),request.coordinate);

        self.counter += 1;
        if self.counter > self.plan.n_frames() {
            self.state = AcqState::Idle;
            self.request = None;
            self.complete = true;
            info!("acquisition complete after {:.1} s",self.clock.now_s() - self.run_start);
            return Ok(self.state)
        }
        let next = to_coordinate(self.plan.order,&self.plan.axis_sizes(),self.counter)?;
        match self.gate_open(&next) {
            true => self.release(next),
            false => {
                debug!("holding {} for {:.3} s",next,self.required_wait(&next));
                self.request = None;
                self.pending = Some(next);
                self.state = AcqState::Waiting;
            }
        }
        Ok(self.state)
    }

    /// Re-evaluates the time gate.
    pub fn poll_wait(&mut self) -> Result<AcqState,AcqError> {
        if self.state != AcqState::Waiting {
            return Err(self.illegal("poll the time gate"))
        }
        let next = self.pending.ok_or(self.illegal("poll the time gate"))?;
        if self.gate_open(&next) {
            self.release(next);
        }
        Ok(self.state)
    }

    /// Scores every slice of a (rows, cols, slice) z-stack and moves the focus bias by the
    /// distance between the sharpest slice and the middle one. The bias accumulates over the
    /// run and applies to every later request. Returns the 0-based sharpest slice.
    pub fn track_focus(&mut self,z_stack:ArrayView3<f32>,z_step:f64) -> usize {
        let scores = slice_scores(z_stack,self.metric.as_ref());
        if scores.is_empty() {
            return 0
        }
        let mut best = 0;
        for (i,s) in scores.iter().enumerate() {
            if *s > scores[best] {
                best = i;
            }
        }
        let middle = (scores.len() - 1)/2;
        let shift = z_step*(best as f64 - middle as f64);
        self.focus_offset += shift;
        if shift != 0.0 {
            info!("focus moved by {:+.3} (sharpest slice {} of {}); bias now {:+.3}",shift,best + 1,scores.len(),self.focus_offset);
        }
        // a request released before the update is re-targeted
        if let (AcqState::FrameRequest,Some(r)) = (self.state,self.request.as_ref()) {
            self.request = Some(self.build_request(r.coordinate));
        }
        best
    }

    /// Cancels the run from any state. The journal is left as it is and repaired on load.
    pub fn stop(&mut self) {
        if self.state != AcqState::Idle {
            warn!("acquisition stopped at frame {} of {} while {}",self.counter,self.plan.n_frames(),self.state);
        }
        self.state = AcqState::Idle;
        self.request = None;
        self.pending = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use acq_index::acq_order::AcquisitionOrder;
    use ndarray::Array3;
    use crate::clock::ManualClock;

    fn plan(z:usize,channels:usize,positions:usize,delays:Vec<f64>) -> AcquisitionPlan {
        let names = ["BF","GFP","mCherry"];
        AcquisitionPlan {
            positions: (0..positions).map(|i| [10.0*i as f64,0.0,100.0]).collect(),
            z_offsets: (0..z).map(|i| i as f64).collect(),
            time_delays: delays,
            channels: names[..channels].iter().map(|s| s.to_string()).collect(),
            frame_shape: [2,2],
            order: AcquisitionOrder::ZCXYT,
            track_focus: false,
        }
    }

    fn manager(plan:&AcquisitionPlan,clock:&ManualClock) -> AcqManager {
        let store = IndexedImageStore::in_memory(plan);
        AcqManager::new(plan,&ChannelPresets::default(),store,Box::new(clock.clone())).unwrap()
    }

    fn frame() -> Array2<u16> {
        Array2::zeros((2,2))
    }

    #[test]
    fn four_frames_without_delays() {
        let clock = ManualClock::new();
        let p = plan(2,2,1,vec![0.0]);
        let mut m = manager(&p,&clock);
        assert_eq!(m.state(),AcqState::Idle);
        m.start().unwrap();
        let mut seen = vec![];
        for _ in 0..4 {
            assert_eq!(m.state(),AcqState::FrameRequest);
            let r = m.acknowledge().unwrap();
            assert_eq!(m.state(),AcqState::Busy);
            seen.push(r.coordinate);
            m.submit_frame(frame()).unwrap();
        }
        assert_eq!(m.state(),AcqState::Idle);
        assert!(m.is_complete());
        assert_eq!(seen[1],FrameCoordinate::new(2,1,1,1));
        assert_eq!(seen[2],FrameCoordinate::new(1,2,1,1));
        assert!(matches!(m.submit_frame(frame()),Err(AcqError::IllegalTransition{ state:AcqState::Idle, .. })));
        assert_eq!(m.store().records().len(),4);
    }

    #[test]
    fn time_gate_holds_until_delay_elapses() {
        let clock = ManualClock::new();
        let p = plan(1,1,1,vec![0.0,10.0]);
        let mut m = manager(&p,&clock);
        m.start().unwrap();
        m.acknowledge().unwrap();
        assert_eq!(m.submit_frame(frame()).unwrap(),AcqState::Waiting);
        assert!(m.request().is_none());
        clock.set(9.99);
        assert_eq!(m.poll_wait().unwrap(),AcqState::Waiting);
        clock.set(10.0);
        assert_eq!(m.poll_wait().unwrap(),AcqState::FrameRequest);
        assert_eq!(m.request().unwrap().coordinate.time,2);
        let r = m.acknowledge().unwrap();
        clock.advance(Duration::from_millis(250));
        m.submit_frame(frame()).unwrap();
        assert_eq!(r.counter,2);
        assert_eq!(m.store().records()[1].elapsed_s,10.25);
    }

    #[test]
    fn gate_is_relative_to_the_previous_time_point() {
        let clock = ManualClock::new();
        let p = plan(1,1,1,vec![0.0,5.0,7.0]);
        let mut m = manager(&p,&clock);
        m.start().unwrap();
        m.acknowledge().unwrap();
        m.submit_frame(frame()).unwrap();
        // time point 2 starts late
        clock.set(8.0);
        assert_eq!(m.poll_wait().unwrap(),AcqState::FrameRequest);
        m.acknowledge().unwrap();
        assert_eq!(m.submit_frame(frame()).unwrap(),AcqState::Waiting);
        clock.set(9.5);
        assert_eq!(m.poll_wait().unwrap(),AcqState::Waiting);
        clock.set(10.0);
        assert_eq!(m.poll_wait().unwrap(),AcqState::FrameRequest);
    }

    #[test]
    fn illegal_transitions_are_rejected() {
        let clock = ManualClock::new();
        let p = plan(1,1,1,vec![]);
        let mut m = manager(&p,&clock);
        assert!(m.acknowledge().is_err());
        assert!(m.poll_wait().is_err());
        m.start().unwrap();
        assert!(matches!(m.start(),Err(AcqError::IllegalTransition{ state:AcqState::FrameRequest, .. })));
        assert!(matches!(m.submit_frame(frame()),Err(AcqError::IllegalTransition{ state:AcqState::FrameRequest, .. })));
        m.acknowledge().unwrap();
        assert!(m.acknowledge().is_err());
        let err = m.submit_frame(Array2::zeros((3,3))).unwrap_err();
        assert!(matches!(err,AcqError::Store(StoreError::FrameShapeMismatch{..})));
        assert_eq!(m.state(),AcqState::Busy);
    }

    #[test]
    fn focus_bias_accumulates_and_moves_targets() {
        let clock = ManualClock::new();
        let p = plan(5,1,1,vec![]);
        let mut m = manager(&p,&clock);
        m.start().unwrap();
        assert_eq!(m.request().unwrap().stage_target,[0.0,0.0,100.0]);
        // sharp content only in slice 4 (0-based 3)
        let mut stack = Array3::<f32>::zeros((4,4,5));
        stack[[1,1,3]] = 100.0;
        assert_eq!(m.track_focus(stack.view(),0.5),3);
        assert_eq!(m.focus_offset(),0.5);
        assert_eq!(m.request().unwrap().stage_target,[0.0,0.0,100.5]);
        stack[[1,1,3]] = 0.0;
        stack[[2,2,0]] = 100.0;
        m.track_focus(stack.view(),0.5);
        assert_eq!(m.focus_offset(),-0.5);
        let r = m.acknowledge().unwrap();
        m.submit_frame(frame()).unwrap();
        assert_eq!(m.store().records()[0].focus_offset,-0.5);
        assert_eq!(r.stage_target[2],99.5);
    }

    #[test]
    fn parfocal_offset_is_added_to_the_stage_target() {
        let clock = ManualClock::new();
        let p = AcquisitionPlan { order: AcquisitionOrder::CZXYT, ..plan(1,2,1,vec![]) };
        let mut m = manager(&p,&clock);
        m.start().unwrap();
        m.acknowledge().unwrap();
        m.submit_frame(frame()).unwrap();
        let r = m.request().unwrap();
        assert_eq!(r.channel,"GFP");
        assert_eq!(r.stage_target[2],100.5);
    }

    #[test]
    fn stop_forces_idle_from_any_state() {
        let clock = ManualClock::new();
        let p = plan(1,1,1,vec![0.0,60.0]);
        let mut m = manager(&p,&clock);
        m.start().unwrap();
        m.acknowledge().unwrap();
        m.submit_frame(frame()).unwrap();
        assert_eq!(m.state(),AcqState::Waiting);
        m.stop();
        assert_eq!(m.state(),AcqState::Idle);
        assert!(!m.is_complete());
        assert!(m.start().is_err());
    }
}
