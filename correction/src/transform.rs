//! Per-(channel, position, time) processing.
//!
//! Every (c,p,t) z-stack is an independent unit of work, so the corrections map units in
//! parallel and stitch the results back into a new buffer.

use ndarray::{s, Array3, Array6, ArrayView3};
use rayon::prelude::*;
use crate::corrected_store::CorrectedStore;
use crate::error::CorrectionError;

/// 0-based indices of one (channel, position, time) z-stack.
#[derive(Clone,Copy,Debug,PartialEq,Eq)]
pub struct Unit {
    pub channel:usize,
    pub position:usize,
    pub time:usize,
}

/// Opaque numerical step applied to each z-stack of a channel, e.g. deconvolution or a
/// phase-retrieval solver. Stacks are (rows, cols, slice). The returned stack must keep the
/// pixel shape; it may change the slice count as long as every unit agrees.
pub trait ChannelTransform: Send + Sync {
    fn apply(&self,channel:&str,stack:ArrayView3<f32>) -> Result<Array3<f32>,String>;
}

/// units in (channel, position, time) order, channel fastest
pub fn units(store:&CorrectedStore) -> Vec<Unit> {
    let sz = store.sizes();
    let mut v = Vec::with_capacity(sz.channel*sz.position*sz.time);
    for time in 0..sz.time {
        for position in 0..sz.position {
            for channel in 0..sz.channel {
                v.push(Unit { channel, position, time });
            }
        }
    }
    v
}

pub fn unit_stack<'a>(data:&'a Array6<f32>,unit:&Unit) -> ArrayView3<'a,f32> {
    data.slice(s![..,..,..,unit.channel,unit.position,unit.time])
}

/// Runs `f` over every unit in parallel; results come back in [units] order.
pub fn par_map_units<T,F>(store:&CorrectedStore,f:F) -> Result<Vec<T>,CorrectionError>
    where T:Send, F:Fn(&Unit,ArrayView3<f32>) -> Result<T,CorrectionError> + Send + Sync {
    let work:Vec<(Unit,ArrayView3<f32>)> = units(store).into_iter().map(|u| (u,unit_stack(&store.data,&u))).collect();
    work.into_par_iter().map(|(u,stack)| f(&u,stack)).collect()
}

/// Builds a new (rows, cols, slice, c, p, t) buffer from per-unit stacks in [units] order.
pub fn assemble(store:&CorrectedStore,name:&str,stacks:Vec<Array3<f32>>) -> Result<Array6<f32>,CorrectionError> {
    let [rows,cols] = store.frame_shape();
    let sz = store.sizes();
    let n_slices = stacks.first().map(|s| s.dim().2).unwrap_or(sz.slice);
    let mut data = Array6::<f32>::zeros((rows,cols,n_slices,sz.channel,sz.position,sz.time));
    for (unit,stack) in units(store).iter().zip(stacks.iter()) {
        let (r,c,n) = stack.dim();
        if [r,c,n] != [rows,cols,n_slices] {
            return Err(CorrectionError::ShapeChanged { name: name.to_string(), expected: [rows,cols,n_slices], found: [r,c,n] })
        }
        data.slice_mut(s![..,..,..,unit.channel,unit.position,unit.time]).assign(stack);
    }
    Ok(data)
}

/// Applies an opaque transform to every unit of the store.
pub fn apply_channel_transform(store:&CorrectedStore,name:&str,transform:&dyn ChannelTransform) -> Result<CorrectedStore,CorrectionError> {
    let stacks = par_map_units(store,|u,stack|{
        transform.apply(&store.channels[u.channel],stack).map_err(|reason|
            CorrectionError::Transform { name: name.to_string(), reason }
        )
    })?;
    Ok(store.with_data(assemble(store,name,stacks)?))
}
