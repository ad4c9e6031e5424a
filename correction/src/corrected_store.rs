//! Derived f32 buffer the corrections work on, and the log of what has been applied to it.

use acq_index::coordinate::AxisSizes;
use ndarray::{Array3, Array6, ArrayView6};
use serde::{Deserialize, Serialize};

#[derive(Clone,Debug,PartialEq)]
pub struct CorrectedStore {
    /// (rows, cols, slice, channel, position, time)
    pub data:Array6<f32>,
    /// channel id of each channel index
    pub channels:Vec<String>,
    /// dataset position number (1-based) of each position index
    pub positions:Vec<usize>,
    /// (channel, position, time) entries whose refocus window had to be shifted
    pub focus_invalid:Array3<bool>,
}

impl CorrectedStore {
    pub fn from_raw(raw:ArrayView6<u16>,channels:&[String],positions:&[usize]) -> Self {
        let data = raw.mapv(|v| v as f32);
        let s = data.shape();
        let focus_invalid = Array3::from_elem((s[3],s[4],s[5]),false);
        Self {
            data,
            channels: channels.to_vec(),
            positions: positions.to_vec(),
            focus_invalid,
        }
    }

    pub fn frame_shape(&self) -> [usize;2] {
        [self.data.shape()[0],self.data.shape()[1]]
    }

    pub fn sizes(&self) -> AxisSizes {
        let s = self.data.shape();
        AxisSizes::new(s[2],s[3],s[4],s[5])
    }

    pub fn channel_index(&self,channel:&str) -> Option<usize> {
        self.channels.iter().position(|c| c == channel)
    }

    /// Same store with new pixel data; the channel, position and time axes are unchanged.
    pub fn with_data(&self,data:Array6<f32>) -> Self {
        Self {
            data,
            channels: self.channels.clone(),
            positions: self.positions.clone(),
            focus_invalid: self.focus_invalid.clone(),
        }
    }
}

/// Ordered names of the corrections applied to a corrected store.
#[derive(Clone,Debug,Default,PartialEq,Serialize,Deserialize)]
pub struct CorrectionLog {
    applied:Vec<String>,
}

impl CorrectionLog {
    pub fn contains(&self,name:&str) -> bool {
        self.applied.iter().any(|a| a == name)
    }

    pub fn push(&mut self,name:&str) {
        self.applied.push(name.to_string())
    }

    pub fn clear(&mut self) {
        self.applied.clear()
    }

    pub fn count(&self,name:&str) -> usize {
        self.applied.iter().filter(|a| *a == name).count()
    }

    pub fn names(&self) -> &[String] {
        &self.applied
    }
}
