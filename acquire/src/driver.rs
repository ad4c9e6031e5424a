//! Hardware driver contract and a simulated microscope for dry runs and tests.

use std::f64::consts::PI;
use acq_index::plan::ChannelPreset;
use log::debug;
use ndarray::Array2;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use thiserror::Error;

#[derive(Error,Debug)]
pub enum DriverError {
    #[error("stage cannot reach {0:?}")]
    StageOutOfTravel([f64;3]),
    #[error("channel {0} is not available on this instrument")]
    UnknownChannel(String),
    #[error("frame capture failed: {0}")]
    Capture(String),
}

/// Synchronous stage, illumination and camera control. Each call returns once the hardware
/// has settled.
pub trait StageDriver {
    fn move_to(&mut self,target:[f64;3]) -> Result<(),DriverError>;
    fn select_channel(&mut self,channel:&str,preset:Option<&ChannelPreset>) -> Result<(),DriverError>;
    fn capture_frame(&mut self) -> Result<Array2<u16>,DriverError>;
}

/// Camera looking at a periodic test target. Contrast falls off with the distance between the
/// stage z and the focal plane, which moves with the selected channel's parfocal offset.
pub struct SimulatedDriver {
    frame_shape:[usize;2],
    /// stage z at which the target is in focus for a channel without offset
    pub focal_plane:f64,
    /// focal plane shift added after every capture
    pub drift_per_frame:f64,
    /// half-width of the uniform read noise in counts
    pub noise:f64,
    /// stage travel limit in z
    pub z_limit:f64,
    rng:StdRng,
    stage:[f64;3],
    channel_offset:f64,
    frames_captured:usize,
}

impl SimulatedDriver {
    pub fn new(frame_shape:[usize;2],seed:u64) -> Self {
        Self {
            frame_shape,
            focal_plane: 0.0,
            drift_per_frame: 0.0,
            noise: 4.0,
            z_limit: 1e4,
            rng: StdRng::seed_from_u64(seed),
            stage: [0.0,0.0,0.0],
            channel_offset: 0.0,
            frames_captured: 0,
        }
    }

    pub fn stage(&self) -> [f64;3] {
        self.stage
    }

    pub fn frames_captured(&self) -> usize {
        self.frames_captured
    }

    fn sharpness(&self) -> f64 {
        let dz = self.stage[2] - (self.focal_plane + self.channel_offset);
        (-dz*dz/(2.0*0.8*0.8)).exp()
    }
}

impl StageDriver for SimulatedDriver {
    fn move_to(&mut self,target:[f64;3]) -> Result<(),DriverError> {
        if target[2].abs() > self.z_limit {
            return Err(DriverError::StageOutOfTravel(target))
        }
        self.stage = target;
        Ok(())
    }

    fn select_channel(&mut self,channel:&str,preset:Option<&ChannelPreset>) -> Result<(),DriverError> {
        let preset = preset.ok_or(DriverError::UnknownChannel(channel.to_string()))?;
        self.channel_offset = preset.z_offset;
        Ok(())
    }

    fn capture_frame(&mut self) -> Result<Array2<u16>,DriverError> {
        let amplitude = 800.0*self.sharpness();
        let period = 8.0;
        let noise = self.noise;
        let rng = &mut self.rng;
        let frame = Array2::from_shape_fn((self.frame_shape[0],self.frame_shape[1]),|(r,c)|{
            let pattern = (2.0*PI*r as f64/period).sin()*(2.0*PI*c as f64/period).sin();
            let n = match noise > 0.0 {
                true => rng.gen_range(-noise..noise),
                false => 0.0
            };
            (1000.0 + amplitude*pattern + n).round().clamp(0.0,u16::MAX as f64) as u16
        });
        self.frames_captured += 1;
        self.focal_plane += self.drift_per_frame;
        debug!("captured frame {} at {:?}",self.frames_captured,self.stage);
        Ok(frame)
    }
}
