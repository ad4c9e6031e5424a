//! Best-effort recovery of a dataset's shape and acquisition order from its journal alone.
//!
//! Each axis gets a repeat period: the journal position of the first record whose index on
//! that axis differs from the first record's. Axes that never change have no period and are
//! singletons. Sorting by period gives the nesting, fastest first. When the distinct-index
//! counts promise more frames than the journal holds, the run was cut short and the slowest
//! axis with a period is shortened until the shape fits.

use std::collections::{BTreeMap, HashSet};
use acq_index::acq_order::AcquisitionOrder;
use acq_index::coordinate::{Axis, AxisSizes};
use acq_index::plan::AcquisitionPlan;
use log::warn;
use crate::error::StoreError;
use crate::metadata::MetadataRecord;

#[derive(Clone,Debug,PartialEq)]
pub struct AxisInference {
    pub axis:Axis,
    /// `None` when the index never changes
    pub repeat_period:Option<usize>,
    pub distinct:usize,
}

#[derive(Clone,Debug,PartialEq)]
pub struct Reconstruction {
    /// axes fastest first
    pub axes:Vec<AxisInference>,
    /// tag spelled from the sorted axes, e.g. "ZCXYT"
    pub inferred_order:String,
    /// a known order consistent with the varying axes, if any
    pub order:Option<AcquisitionOrder>,
    pub sizes:AxisSizes,
    pub n_records:usize,
    pub truncated_axis:Option<Axis>,
}

impl Reconstruction {
    pub fn expected_frames(&self) -> usize {
        self.sizes.n_frames()
    }

    /// the inferred shape accounts for every journal record
    pub fn is_exact(&self) -> bool {
        self.truncated_axis.is_none() && self.expected_frames() == self.n_records
    }

    /// Plan equivalent to what the journal shows. Positions, offsets and channel ids come from
    /// the first record seen at each index; time delays are the earliest elapsed time seen at
    /// each time index.
    pub fn to_plan(&self,records:&[MetadataRecord]) -> AcquisitionPlan {
        let mut positions = BTreeMap::<usize,[f64;3]>::new();
        let mut z_offsets = BTreeMap::<usize,f64>::new();
        let mut channels = BTreeMap::<usize,String>::new();
        let mut delays = BTreeMap::<usize,f64>::new();
        for r in records {
            let c = r.coordinate;
            if c.slice > self.sizes.slice || c.channel > self.sizes.channel
                || c.position > self.sizes.position || c.time > self.sizes.time {
                continue
            }
            positions.entry(c.position).or_insert(r.position);
            z_offsets.entry(c.slice).or_insert(r.slice_offset);
            channels.entry(c.channel).or_insert(r.channel.clone());
            let d = delays.entry(c.time).or_insert(r.elapsed_s);
            if r.elapsed_s < *d {
                *d = r.elapsed_s;
            }
        }
        let first = delays.values().next().copied().unwrap_or(0.0);
        let mut time_delays:Vec<f64> = delays.values().map(|d| d - first).collect();
        for i in 1..time_delays.len() {
            if time_delays[i] < time_delays[i - 1] {
                time_delays[i] = time_delays[i - 1];
            }
        }
        let order = match self.order {
            Some(order) => order,
            None => {
                warn!("inferred order {} is not a known acquisition order; assuming {}",self.inferred_order,AcquisitionOrder::default());
                AcquisitionOrder::default()
            }
        };
        AcquisitionPlan {
            positions: axis_list(self.sizes.position,positions.into_values().collect()),
            z_offsets: axis_list(self.sizes.slice,z_offsets.into_values().collect()),
            time_delays: axis_list(self.sizes.time,time_delays),
            channels: channels.into_values().collect(),
            frame_shape: records.first().map(|r| r.frame_shape).unwrap_or([0,0]),
            order,
            track_focus: false,
        }
    }
}

/// a single-entry axis is stored as an empty list
fn axis_list<T>(n:usize,v:Vec<T>) -> Vec<T> {
    match n > 1 {
        true => v,
        false => vec![]
    }
}

/// first known order whose nesting lists the varying axes in the same relative order
fn consistent_order(varying:&[Axis]) -> Option<AcquisitionOrder> {
    AcquisitionOrder::ALL.iter().copied().find(|order|{
        let restricted:Vec<Axis> = order.axes().iter().copied().filter(|a| varying.contains(a)).collect();
        restricted == varying
    })
}

pub fn reconstruct_from_journal(records:&[MetadataRecord]) -> Result<Reconstruction,StoreError> {
    let first = records.first().ok_or(StoreError::EmptyJournal)?;

    let mut axes:Vec<AxisInference> = Axis::ALL.iter().map(|axis|{
        let first_index = first.coordinate.get(*axis);
        let repeat_period = records.iter().position(|r| r.coordinate.get(*axis) != first_index);
        let distinct = records.iter().map(|r| r.coordinate.get(*axis)).collect::<HashSet<usize>>().len();
        AxisInference { axis:*axis, repeat_period, distinct }
    }).collect();
    // stable sort keeps singletons in slice, channel, position, time order
    axes.sort_by_key(|a| a.repeat_period.unwrap_or(usize::MAX));

    let sorted:Vec<Axis> = axes.iter().map(|a| a.axis).collect();
    let inferred_order = AcquisitionOrder::tag_from_axes(&sorted);
    let varying:Vec<Axis> = axes.iter().filter(|a| a.repeat_period.is_some()).map(|a| a.axis).collect();
    let order = consistent_order(&varying);

    let mut sizes = AxisSizes::new(1,1,1,1);
    for a in &axes {
        sizes.set(a.axis,a.distinct);
    }

    let n_records = records.len();
    let mut truncated_axis = None;
    let expected = sizes.n_frames();
    if expected > n_records {
        match varying.last() {
            Some(slowest) => {
                let delta = expected - n_records;
                let size = sizes.get(*slowest);
                let others = expected / size;
                let cut = (delta + others - 1) / others;
                let new_size = size.saturating_sub(cut).max(1);
                warn!(
                    "journal holds {} of {} expected frames; {} axis shortened from {} to {}",
                    n_records,expected,slowest.name(),size,new_size
                );
                sizes.set(*slowest,new_size);
                truncated_axis = Some(*slowest);
            }
            None => warn!("journal holds {} records but no axis varies",n_records),
        }
    }
    else if expected < n_records {
        warn!("journal holds {} records but its indices only span {} frames; records repeat",n_records,expected);
    }

    let r = Reconstruction { axes, inferred_order, order, sizes, n_records, truncated_axis };
    if !r.is_exact() {
        warn!("reconstructed shape ({}) is a best-effort estimate",r.sizes);
    }
    Ok(r)
}
