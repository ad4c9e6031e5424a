use acq_index::coordinate::FrameCoordinate;
use acq_index::plan::{AcquisitionPlan, ChannelPreset};
use serde::{Deserialize, Serialize};

/// Journal entry for one ingested frame.
#[derive(Clone,Debug,PartialEq,Serialize,Deserialize)]
pub struct MetadataRecord {
    pub counter:usize,
    pub coordinate:FrameCoordinate,
    pub channel:String,
    pub exposure_ms:f64,
    pub illumination:String,
    pub intensity:f64,
    /// stage position (x, y, z) of the field of view
    pub position:[f64;3],
    /// z offset of the slice relative to the position
    pub slice_offset:f64,
    /// accumulated focus-tracking bias at the time of capture
    #[serde(default)]
    pub focus_offset:f64,
    /// seconds since the start of the run
    pub elapsed_s:f64,
    pub frame_shape:[usize;2],
}

impl MetadataRecord {
    /// Record for `coord` resolved against the plan. Elapsed time starts at zero and is set
    /// with [MetadataRecord::with_elapsed] when the frame is ingested.
    pub fn new(plan:&AcquisitionPlan,counter:usize,coord:&FrameCoordinate,channel_id:&str,preset:Option<&ChannelPreset>,focus_offset:f64) -> Self {
        let (exposure_ms,illumination,intensity) = match preset {
            Some(p) => (p.exposure_ms,p.illumination.clone(),p.intensity),
            None => (0.0,String::new(),0.0)
        };
        Self {
            counter,
            coordinate: *coord,
            channel: channel_id.to_string(),
            exposure_ms,
            illumination,
            intensity,
            position: plan.position(coord.position),
            slice_offset: plan.z_offset(coord.slice),
            focus_offset,
            elapsed_s: 0.0,
            frame_shape: plan.frame_shape,
        }
    }

    pub fn with_elapsed(mut self,elapsed_s:f64) -> Self {
        self.elapsed_s = elapsed_s;
        self
    }
}
