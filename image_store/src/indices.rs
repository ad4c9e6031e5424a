//! Per-axis index subsets used when loading part of a dataset.

use acq_index::coordinate::{Axis, AxisSizes, FrameCoordinate};
use ndarray::Array6;
use serde::{Deserialize, Serialize};
use crate::error::StoreError;

/// Requested 1-based indices per axis; `None` or an empty list selects the whole axis.
#[derive(Clone,Debug,Default,PartialEq,Serialize,Deserialize)]
pub struct IndexSubset {
    pub slices:Option<Vec<usize>>,
    pub channels:Option<Vec<usize>>,
    pub positions:Option<Vec<usize>>,
    pub times:Option<Vec<usize>>,
}

impl IndexSubset {
    pub fn all() -> Self {
        Self::default()
    }

    fn get(&self,axis:Axis) -> Option<&Vec<usize>> {
        match axis {
            Axis::Slice => self.slices.as_ref(),
            Axis::Channel => self.channels.as_ref(),
            Axis::Position => self.positions.as_ref(),
            Axis::Time => self.times.as_ref(),
        }
    }
}

/// Validated subset: the global 1-based indices kept on each axis, in request order.
#[derive(Clone,Debug,PartialEq)]
pub struct Allocation {
    pub slices:Vec<usize>,
    pub channels:Vec<usize>,
    pub positions:Vec<usize>,
    pub times:Vec<usize>,
}

impl Allocation {
    pub fn get(&self,axis:Axis) -> &Vec<usize> {
        match axis {
            Axis::Slice => &self.slices,
            Axis::Channel => &self.channels,
            Axis::Position => &self.positions,
            Axis::Time => &self.times,
        }
    }

    pub fn sizes(&self) -> AxisSizes {
        AxisSizes::new(self.slices.len(),self.channels.len(),self.positions.len(),self.times.len())
    }

    /// 0-based (slice, channel, position, time) position of a global coordinate inside the
    /// allocated buffer, or `None` when the coordinate was not requested.
    pub fn local(&self,coord:&FrameCoordinate) -> Option<[usize;4]> {
        let find = |axis:Axis| self.get(axis).iter().position(|i| *i == coord.get(axis));
        Some([find(Axis::Slice)?,find(Axis::Channel)?,find(Axis::Position)?,find(Axis::Time)?])
    }

    /// every requested coordinate, slice fastest
    pub fn coordinates(&self) -> Vec<FrameCoordinate> {
        let mut v = Vec::with_capacity(self.sizes().n_frames());
        for t in &self.times {
            for p in &self.positions {
                for c in &self.channels {
                    for s in &self.slices {
                        v.push(FrameCoordinate::new(*s,*c,*p,*t));
                    }
                }
            }
        }
        v
    }

    /// zeroed (rows, cols, slice, channel, position, time) buffer for this subset
    pub fn allocate(&self,frame_shape:[usize;2]) -> Array6<u16> {
        let s = self.sizes();
        Array6::zeros((frame_shape[0],frame_shape[1],s.slice,s.channel,s.position,s.time))
    }
}

/// Every requested index must lie in `[1, size]` and appear once; a violation on any axis
/// fails with `InvalidIndexSet`.
pub fn check_indices(subset:&IndexSubset,sizes:&AxisSizes) -> Result<Allocation,StoreError> {
    let resolve = |axis:Axis| -> Result<Vec<usize>,StoreError> {
        let size = sizes.get(axis);
        match subset.get(axis) {
            None => Ok((1..=size).collect()),
            Some(v) if v.is_empty() => Ok((1..=size).collect()),
            Some(v) => {
                let mut seen = Vec::with_capacity(v.len());
                for i in v {
                    if *i == 0 || *i > size {
                        return Err(StoreError::InvalidIndexSet {
                            axis: axis.name(),
                            reason: format!("index {} is outside [1,{}]",i,size),
                        })
                    }
                    if seen.contains(i) {
                        return Err(StoreError::InvalidIndexSet {
                            axis: axis.name(),
                            reason: format!("index {} is requested twice",i),
                        })
                    }
                    seen.push(*i);
                }
                Ok(seen)
            }
        }
    };
    Ok(Allocation {
        slices: resolve(Axis::Slice)?,
        channels: resolve(Axis::Channel)?,
        positions: resolve(Axis::Position)?,
        times: resolve(Axis::Time)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_subset_selects_everything() {
        let a = check_indices(&IndexSubset::all(),&AxisSizes::new(3,2,1,4)).unwrap();
        assert_eq!(a.sizes(),AxisSizes::new(3,2,1,4));
        assert_eq!(a.coordinates().len(),24);
        let buf = a.allocate([5,6]);
        assert_eq!(buf.shape(),&[5,6,3,2,1,4]);
    }

    #[test]
    fn subset_maps_global_to_local() {
        let subset = IndexSubset { slices: Some(vec![3,1]), times: Some(vec![]), ..Default::default() };
        let a = check_indices(&subset,&AxisSizes::new(3,2,2,2)).unwrap();
        assert_eq!(a.slices,vec![3,1]);
        assert_eq!(a.times,vec![1,2]);
        assert_eq!(a.local(&FrameCoordinate::new(1,2,1,2)),Some([1,1,0,1]));
        assert_eq!(a.local(&FrameCoordinate::new(2,1,1,1)),None);
    }

    #[test]
    fn out_of_range_fails_on_every_axis() {
        let sizes = AxisSizes::new(2,2,2,2);
        let cases = vec![
            IndexSubset { slices: Some(vec![3]), ..Default::default() },
            IndexSubset { channels: Some(vec![0]), ..Default::default() },
            IndexSubset { positions: Some(vec![5]), ..Default::default() },
            IndexSubset { times: Some(vec![1,1]), ..Default::default() },
        ];
        for subset in cases {
            assert!(matches!(check_indices(&subset,&sizes),Err(StoreError::InvalidIndexSet{..})));
        }
    }
}
