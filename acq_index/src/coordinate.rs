use std::fmt;
use serde::{Deserialize, Serialize};

/// One of the four acquisition axes.
#[derive(Clone,Copy,Debug,PartialEq,Eq,Hash,Serialize,Deserialize)]
pub enum Axis {
    Slice,
    Channel,
    Position,
    Time,
}

impl Axis {
    pub const ALL:[Axis;4] = [Axis::Slice,Axis::Channel,Axis::Position,Axis::Time];

    /// letters used by acquisition-order tags
    pub fn tag(&self) -> &'static str {
        match self {
            Axis::Slice => "Z",
            Axis::Channel => "C",
            Axis::Position => "XY",
            Axis::Time => "T",
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Axis::Slice => "slice",
            Axis::Channel => "channel",
            Axis::Position => "position",
            Axis::Time => "time",
        }
    }
}

/// Cardinalities of the slice, channel, position and time axes.
#[derive(Clone,Copy,Debug,PartialEq,Eq,Serialize,Deserialize)]
pub struct AxisSizes {
    pub slice:usize,
    pub channel:usize,
    pub position:usize,
    pub time:usize,
}

impl AxisSizes {
    pub fn new(slice:usize,channel:usize,position:usize,time:usize) -> Self {
        Self { slice, channel, position, time }
    }

    pub fn get(&self,axis:Axis) -> usize {
        match axis {
            Axis::Slice => self.slice,
            Axis::Channel => self.channel,
            Axis::Position => self.position,
            Axis::Time => self.time,
        }
    }

    pub fn set(&mut self,axis:Axis,size:usize) {
        match axis {
            Axis::Slice => self.slice = size,
            Axis::Channel => self.channel = size,
            Axis::Position => self.position = size,
            Axis::Time => self.time = size,
        }
    }

    pub fn n_frames(&self) -> usize {
        self.slice*self.channel*self.position*self.time
    }
}

impl fmt::Display for AxisSizes {
    fn fmt(&self,f:&mut fmt::Formatter) -> fmt::Result {
        write!(f,"slice={} channel={} position={} time={}",self.slice,self.channel,self.position,self.time)
    }
}

/// 1-based (slice, channel, position, time) index of a frame.
#[derive(Clone,Copy,Debug,PartialEq,Eq,Hash,Serialize,Deserialize)]
pub struct FrameCoordinate {
    pub slice:usize,
    pub channel:usize,
    pub position:usize,
    pub time:usize,
}

impl FrameCoordinate {
    pub fn new(slice:usize,channel:usize,position:usize,time:usize) -> Self {
        Self { slice, channel, position, time }
    }

    /// the first frame of any run
    pub fn origin() -> Self {
        Self::new(1,1,1,1)
    }

    pub fn get(&self,axis:Axis) -> usize {
        match axis {
            Axis::Slice => self.slice,
            Axis::Channel => self.channel,
            Axis::Position => self.position,
            Axis::Time => self.time,
        }
    }

    pub fn set(&mut self,axis:Axis,index:usize) {
        match axis {
            Axis::Slice => self.slice = index,
            Axis::Channel => self.channel = index,
            Axis::Position => self.position = index,
            Axis::Time => self.time = index,
        }
    }

    /// 0-based (slice, channel, position, time) for array indexing
    pub fn zero_based(&self) -> [usize;4] {
        [self.slice - 1,self.channel - 1,self.position - 1,self.time - 1]
    }
}

impl fmt::Display for FrameCoordinate {
    fn fmt(&self,f:&mut fmt::Formatter) -> fmt::Result {
        write!(f,"(sl{} ch{} p{} t{})",self.slice,self.channel,self.position,self.time)
    }
}
