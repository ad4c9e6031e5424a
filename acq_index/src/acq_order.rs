//! Acquisition-order index algebra.
//!
//! An acquisition order names the nesting of the four axes from fastest- to slowest-varying.
//! The 1-based acquisition counter `k` and a frame coordinate are related by a mixed-radix
//! decomposition over the axis sizes taken in that order. Every function here is pure.

use std::fmt;
use std::str::FromStr;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use crate::coordinate::{Axis, AxisSizes, FrameCoordinate};

#[derive(Error,Debug,Clone,PartialEq,Eq)]
pub enum IndexError {
    #[error("unknown acquisition order {0:?}")]
    UnknownOrder(String),
    #[error("{what} index {index} is outside [1,{size}]")]
    CoordinateOutOfRange {
        what:&'static str,
        index:usize,
        size:usize,
    },
}

/// Axis nesting conventions, fastest-varying axis first.
/// `T` is the time-lapse-only convention: time varies fastest and the remaining axes,
/// normally singletons, nest as slice, channel, position.
#[allow(clippy::upper_case_acronyms)]
#[derive(Clone,Copy,Debug,PartialEq,Eq,Hash,Serialize,Deserialize)]
pub enum AcquisitionOrder {
    ZCXYT,
    CZXYT,
    TCZXY,
    TZCXY,
    ZXYCT,
    ZXYTC,
    T,
}

impl Default for AcquisitionOrder {
    fn default() -> Self {
        AcquisitionOrder::ZCXYT
    }
}

impl AcquisitionOrder {
    pub const ALL:[AcquisitionOrder;7] = [
        AcquisitionOrder::ZCXYT,
        AcquisitionOrder::CZXYT,
        AcquisitionOrder::TCZXY,
        AcquisitionOrder::TZCXY,
        AcquisitionOrder::ZXYCT,
        AcquisitionOrder::ZXYTC,
        AcquisitionOrder::T,
    ];

    pub fn list() -> String {
        Self::ALL.iter().map(|o| o.decode()).collect::<Vec<&str>>().join("\n")
    }

    pub fn encode(name:&str) -> Result<Self,IndexError> {
        match name {
            "ZCXYT" => Ok(Self::ZCXYT),
            "CZXYT" => Ok(Self::CZXYT),
            "TCZXY" => Ok(Self::TCZXY),
            "TZCXY" => Ok(Self::TZCXY),
            "ZXYCT" => Ok(Self::ZXYCT),
            "ZXYTC" => Ok(Self::ZXYTC),
            "T" => Ok(Self::T),
            _=> Err(IndexError::UnknownOrder(name.to_string()))
        }
    }

    pub fn decode(&self) -> &'static str {
        match self {
            Self::ZCXYT => "ZCXYT",
            Self::CZXYT => "CZXYT",
            Self::TCZXY => "TCZXY",
            Self::TZCXY => "TZCXY",
            Self::ZXYCT => "ZXYCT",
            Self::ZXYTC => "ZXYTC",
            Self::T => "T",
        }
    }

    /// axes from fastest- to slowest-varying
    pub fn axes(&self) -> [Axis;4] {
        use Axis::*;
        match self {
            Self::ZCXYT => [Slice,Channel,Position,Time],
            Self::CZXYT => [Channel,Slice,Position,Time],
            Self::TCZXY => [Time,Channel,Slice,Position],
            Self::TZCXY | Self::T => [Time,Slice,Channel,Position],
            Self::ZXYCT => [Slice,Position,Channel,Time],
            Self::ZXYTC => [Slice,Position,Time,Channel],
        }
    }

    pub fn fastest_axis(&self) -> Axis {
        self.axes()[0]
    }

    /// tag spelled out from a fastest-first axis list, e.g. "ZCXYT"
    pub fn tag_from_axes(axes:&[Axis]) -> String {
        axes.iter().map(|a| a.tag()).collect()
    }

    /// the full four-axis tag for a fastest-first axis list
    pub fn from_axes(axes:&[Axis;4]) -> Result<Self,IndexError> {
        Self::encode(&Self::tag_from_axes(axes))
    }
}

impl FromStr for AcquisitionOrder {
    type Err = IndexError;
    fn from_str(s:&str) -> Result<Self,Self::Err> {
        Self::encode(s)
    }
}

impl fmt::Display for AcquisitionOrder {
    fn fmt(&self,f:&mut fmt::Formatter) -> fmt::Result {
        write!(f,"{}",self.decode())
    }
}

pub fn check_coordinate(sizes:&AxisSizes,coord:&FrameCoordinate) -> Result<(),IndexError> {
    for axis in Axis::ALL {
        let index = coord.get(axis);
        let size = sizes.get(axis);
        if index == 0 || index > size {
            return Err(IndexError::CoordinateOutOfRange { what:axis.name(), index, size })
        }
    }
    Ok(())
}

/// Decomposes the 1-based counter `k` into a coordinate; the first axis of `order` advances
/// every step, each following axis every (product of the preceding sizes) steps.
pub fn to_coordinate(order:AcquisitionOrder,sizes:&AxisSizes,k:usize) -> Result<FrameCoordinate,IndexError> {
    let n = sizes.n_frames();
    if k == 0 || k > n {
        return Err(IndexError::CoordinateOutOfRange { what:"counter", index:k, size:n })
    }
    let mut rem = k - 1;
    let mut coord = FrameCoordinate::origin();
    for axis in order.axes() {
        let size = sizes.get(axis);
        coord.set(axis,rem % size + 1);
        rem /= size;
    }
    Ok(coord)
}

/// Exact inverse of [to_coordinate].
pub fn to_counter(order:AcquisitionOrder,sizes:&AxisSizes,coord:&FrameCoordinate) -> Result<usize,IndexError> {
    check_coordinate(sizes,coord)?;
    let mut k = 0;
    let mut stride = 1;
    for axis in order.axes() {
        k += (coord.get(axis) - 1)*stride;
        stride *= sizes.get(axis);
    }
    Ok(k + 1)
}

/// Same as [to_counter] but parses the order tag first.
pub fn to_counter_tagged(order:&str,sizes:&AxisSizes,coord:&FrameCoordinate) -> Result<usize,IndexError> {
    to_counter(AcquisitionOrder::encode(order)?,sizes,coord)
}

pub fn to_coordinate_tagged(order:&str,sizes:&AxisSizes,k:usize) -> Result<FrameCoordinate,IndexError> {
    to_coordinate(AcquisitionOrder::encode(order)?,sizes,k)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn slice_cycles_fastest_for_zcxyt() {
        let sizes = AxisSizes::new(3,2,1,1);
        let coords:Vec<FrameCoordinate> = (1..=6).map(|k| to_coordinate(AcquisitionOrder::ZCXYT,&sizes,k).unwrap()).collect();
        let expected = vec![
            FrameCoordinate::new(1,1,1,1),
            FrameCoordinate::new(2,1,1,1),
            FrameCoordinate::new(3,1,1,1),
            FrameCoordinate::new(1,2,1,1),
            FrameCoordinate::new(2,2,1,1),
            FrameCoordinate::new(3,2,1,1),
        ];
        assert_eq!(coords,expected);
    }

    #[test]
    fn time_cycles_fastest_for_tczxy() {
        let sizes = AxisSizes::new(2,2,1,3);
        let c = to_coordinate(AcquisitionOrder::TCZXY,&sizes,4).unwrap();
        assert_eq!(c,FrameCoordinate::new(1,2,1,1));
        let c = to_coordinate(AcquisitionOrder::TCZXY,&sizes,7).unwrap();
        assert_eq!(c,FrameCoordinate::new(2,1,1,1));
    }

    #[test]
    fn singleton_axes_never_advance() {
        let sizes = AxisSizes::new(1,1,1,4);
        for order in AcquisitionOrder::ALL {
            for k in 1..=4 {
                let c = to_coordinate(order,&sizes,k).unwrap();
                assert_eq!(c,FrameCoordinate::new(1,1,1,k));
            }
        }
    }

    #[test]
    fn rejects_out_of_range() {
        let sizes = AxisSizes::new(2,2,2,2);
        assert!(matches!(to_coordinate(AcquisitionOrder::ZCXYT,&sizes,0),Err(IndexError::CoordinateOutOfRange{..})));
        assert!(matches!(to_coordinate(AcquisitionOrder::ZCXYT,&sizes,17),Err(IndexError::CoordinateOutOfRange{..})));
        let bad = FrameCoordinate::new(1,3,1,1);
        assert_eq!(
            to_counter(AcquisitionOrder::ZCXYT,&sizes,&bad),
            Err(IndexError::CoordinateOutOfRange { what:"channel", index:3, size:2 })
        );
        let zero = FrameCoordinate::new(0,1,1,1);
        assert!(to_counter(AcquisitionOrder::CZXYT,&sizes,&zero).is_err());
    }

    #[test]
    fn unknown_tag_is_rejected() {
        assert_eq!(AcquisitionOrder::encode("XYZCT"),Err(IndexError::UnknownOrder(String::from("XYZCT"))));
        assert!(to_counter_tagged("ZZZ",&AxisSizes::new(1,1,1,1),&FrameCoordinate::origin()).is_err());
        assert_eq!(to_coordinate_tagged("T",&AxisSizes::new(2,1,1,3),2),Ok(FrameCoordinate::new(1,1,1,2)));
        assert_eq!("ZXYTC".parse::<AcquisitionOrder>(),Ok(AcquisitionOrder::ZXYTC));
    }

    #[test]
    fn tags_match_axes() {
        for order in AcquisitionOrder::ALL {
            match order {
                AcquisitionOrder::T => assert_eq!(AcquisitionOrder::tag_from_axes(&order.axes()),"TZCXY"),
                _=> assert_eq!(AcquisitionOrder::from_axes(&order.axes()),Ok(order)),
            }
        }
    }
}
