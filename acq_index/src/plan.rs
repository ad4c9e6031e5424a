//! Acquisition plan and the channel presets it references.

use std::collections::BTreeMap;
use std::fs::File;
use std::io::{Read, Write};
use std::path::Path;
use log::debug;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use crate::acq_order::AcquisitionOrder;
use crate::config::ConfigFile;
use crate::coordinate::{AxisSizes, FrameCoordinate};

pub const PLAN_FILENAME:&str = "plan.json";

#[derive(Error,Debug)]
pub enum PlanError {
    #[error("time delays must be non-decreasing (delay {index} is {value} s, previous is {previous} s)")]
    NonMonotonicDelays {
        index:usize,
        value:f64,
        previous:f64,
    },
    #[error("frame shape {0:?} has an empty axis")]
    EmptyFrameShape([usize;2]),
    #[error("channel {0:?} has no preset")]
    UnknownChannel(String),
    #[error("plan file io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("plan file is corrupt: {0}")]
    Json(#[from] serde_json::Error),
}

/// Hardware settings for one named channel.
#[derive(Clone,Debug,PartialEq,Serialize,Deserialize)]
pub struct ChannelPreset {
    pub exposure_ms:f64,
    pub illumination:String,
    pub intensity:f64,
    /// parfocal z correction for this channel (um)
    #[serde(default)]
    pub z_offset:f64,
}

/// Immutable channel id -> preset lookup handed to every component that resolves channels.
#[derive(Clone,Debug,PartialEq,Serialize,Deserialize)]
pub struct ChannelPresets {
    pub presets:BTreeMap<String,ChannelPreset>,
}

impl Default for ChannelPresets {
    fn default() -> Self {
        let mut presets = BTreeMap::new();
        presets.insert(String::from("BF"),ChannelPreset {
            exposure_ms: 10.0,
            illumination: String::from("brightfield"),
            intensity: 0.2,
            z_offset: 0.0,
        });
        presets.insert(String::from("GFP"),ChannelPreset {
            exposure_ms: 100.0,
            illumination: String::from("led_470"),
            intensity: 0.8,
            z_offset: 0.5,
        });
        presets.insert(String::from("mCherry"),ChannelPreset {
            exposure_ms: 150.0,
            illumination: String::from("led_565"),
            intensity: 0.8,
            z_offset: 1.0,
        });
        Self { presets }
    }
}

impl ConfigFile for ChannelPresets {
    fn file_ext() -> String {
        String::from("channel_presets")
    }
}

impl ChannelPresets {
    pub fn get(&self,channel:&str) -> Option<&ChannelPreset> {
        self.presets.get(channel)
    }
}

/// Everything needed to run one acquisition; created once per run and never modified.
#[derive(Clone,Debug,PartialEq,Serialize,Deserialize)]
pub struct AcquisitionPlan {
    /// stage positions (x, y, z)
    pub positions:Vec<[f64;3]>,
    /// z offsets relative to each position
    pub z_offsets:Vec<f64>,
    /// seconds, non-decreasing
    pub time_delays:Vec<f64>,
    pub channels:Vec<String>,
    /// (rows, cols)
    pub frame_shape:[usize;2],
    pub order:AcquisitionOrder,
    #[serde(default)]
    pub track_focus:bool,
}

impl AcquisitionPlan {

    /// small two-channel z-stack time lapse used as a template for new plans
    pub fn template() -> Self {
        Self {
            positions: vec![[0.0,0.0,0.0],[500.0,0.0,0.0]],
            z_offsets: vec![-2.0,-1.0,0.0,1.0,2.0],
            time_delays: vec![0.0,60.0,120.0],
            channels: vec![String::from("BF"),String::from("GFP")],
            frame_shape: [512,512],
            order: AcquisitionOrder::ZCXYT,
            track_focus: false,
        }
    }

    pub fn axis_sizes(&self) -> AxisSizes {
        AxisSizes {
            slice: self.z_offsets.len().max(1),
            channel: self.channels.len().max(1),
            position: self.positions.len().max(1),
            time: self.time_delays.len().max(1),
        }
    }

    pub fn n_frames(&self) -> usize {
        self.axis_sizes().n_frames()
    }

    pub fn frame_size_bytes(&self) -> usize {
        self.frame_shape[0]*self.frame_shape[1]*std::mem::size_of::<u16>()
    }

    pub fn position(&self,index:usize) -> [f64;3] {
        self.positions.get(index - 1).copied().unwrap_or([0.0,0.0,0.0])
    }

    pub fn z_offset(&self,index:usize) -> f64 {
        self.z_offsets.get(index - 1).copied().unwrap_or(0.0)
    }

    pub fn time_delay(&self,index:usize) -> f64 {
        self.time_delays.get(index - 1).copied().unwrap_or(0.0)
    }

    pub fn channel_id(&self,index:usize) -> Option<&str> {
        self.channels.get(index - 1).map(|s| s.as_str())
    }

    /// mean spacing of the z offsets; 0 for a single plane
    pub fn z_step(&self) -> f64 {
        match self.z_offsets.len() {
            0 | 1 => 0.0,
            n => (self.z_offsets[n - 1] - self.z_offsets[0]) / (n - 1) as f64
        }
    }

    /// stage target for a coordinate with an extra z bias (e.g. accumulated focus drift)
    pub fn stage_target(&self,coord:&FrameCoordinate,z_bias:f64) -> [f64;3] {
        let p = self.position(coord.position);
        [p[0],p[1],p[2] + self.z_offset(coord.slice) + z_bias]
    }

    pub fn validate(&self,presets:&ChannelPresets) -> Result<(),PlanError> {
        if self.frame_shape[0] == 0 || self.frame_shape[1] == 0 {
            return Err(PlanError::EmptyFrameShape(self.frame_shape))
        }
        for (i,pair) in self.time_delays.windows(2).enumerate() {
            if pair[1] < pair[0] {
                return Err(PlanError::NonMonotonicDelays { index:i + 2, value:pair[1], previous:pair[0] })
            }
        }
        for channel in &self.channels {
            if presets.get(channel).is_none() {
                return Err(PlanError::UnknownChannel(channel.clone()))
            }
        }
        debug!("plan valid: {} frames ({})",self.n_frames(),self.axis_sizes());
        Ok(())
    }

    pub fn to_file(&self,file_path:&Path) -> Result<(),PlanError> {
        let s = serde_json::to_string_pretty(&self)?;
        let mut f = File::create(file_path)?;
        f.write_all(s.as_bytes())?;
        Ok(())
    }

    pub fn from_file(file_path:&Path) -> Result<Self,PlanError> {
        let mut f = File::open(file_path)?;
        let mut s = String::new();
        f.read_to_string(&mut s)?;
        Ok(serde_json::from_str(&s)?)
    }
}
