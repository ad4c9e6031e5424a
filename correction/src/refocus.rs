//! Refocus: keep only the slices around the sharpest plane of each z-stack.
//!
//! The window is `2*radius + 1` slices centered on the best-focus slice. A window that would
//! run past either end of the stack is shifted inward and that (channel, position, time) is
//! flagged in `focus_invalid`. In parfocal mode only the master channel is searched; every
//! other channel uses the master's best slice plus its own fixed offset.

use std::collections::BTreeMap;
use log::{debug, warn};
use ndarray::{s, Array2, Array3, Axis};
use serde::{Deserialize, Serialize};
use utils::focus::{best_focus_index, FocusMetric, GradientEnergy, LaplacianVariance};
use crate::corrected_store::CorrectedStore;
use crate::error::CorrectionError;
use crate::transform::{assemble, par_map_units, unit_stack, Unit};

#[derive(Clone,Copy,Debug,PartialEq,Eq,Serialize,Deserialize)]
pub enum ReturnMethod {
    /// mean of the window; one slice per stack
    Average,
    /// the window itself
    All,
}

#[derive(Clone,Copy,Debug,PartialEq,Eq,Serialize,Deserialize)]
pub enum FocusMetricKind {
    GradientEnergy,
    LaplacianVariance,
}

impl FocusMetricKind {
    pub fn metric(&self) -> Box<dyn FocusMetric> {
        match self {
            Self::GradientEnergy => Box::new(GradientEnergy),
            Self::LaplacianVariance => Box::new(LaplacianVariance),
        }
    }
}

#[derive(Clone,Debug,PartialEq,Serialize,Deserialize)]
pub struct Parfocal {
    pub master:String,
    /// slice offset of each channel relative to the master's best slice; absent means 0
    pub offsets:BTreeMap<String,i64>,
}

#[derive(Clone,Debug,PartialEq,Serialize,Deserialize)]
pub struct RefocusParams {
    pub radius:usize,
    pub method:ReturnMethod,
    pub metric:FocusMetricKind,
    pub parfocal:Option<Parfocal>,
}

impl Default for RefocusParams {
    fn default() -> Self {
        Self {
            radius: 1,
            method: ReturnMethod::Average,
            metric: FocusMetricKind::GradientEnergy,
            parfocal: None,
        }
    }
}

/// First slice of a `window`-slice window centered on `center`, shifted inward to fit in
/// `n_slices`; the flag is set when it had to move.
pub fn focus_window(center:i64,radius:usize,n_slices:usize) -> (usize,bool) {
    let window = 2*radius + 1;
    let lo = center - radius as i64;
    let max_lo = (n_slices - window) as i64;
    match lo {
        lo if lo < 0 => (0,true),
        lo if lo > max_lo => (max_lo as usize,true),
        lo => (lo as usize,false),
    }
}

pub fn refocus(store:&CorrectedStore,params:&RefocusParams) -> Result<CorrectedStore,CorrectionError> {
    let sz = store.sizes();
    let window = 2*params.radius + 1;
    if window > sz.slice {
        return Err(CorrectionError::WindowTooLarge { window, slices: sz.slice })
    }
    let metric = params.metric.metric();

    // best slice of the master channel for every (position, time)
    let master_best = match &params.parfocal {
        None => None,
        Some(pf) => {
            let master = store.channel_index(&pf.master).ok_or_else(|| CorrectionError::UnknownChannel(pf.master.clone()))?;
            let mut best = Array2::<usize>::zeros((sz.position,sz.time));
            for ((p,t),b) in best.indexed_iter_mut() {
                let unit = Unit { channel: master, position: p, time: t };
                *b = best_focus_index(unit_stack(&store.data,&unit),metric.as_ref());
            }
            Some(best)
        }
    };

    let results = par_map_units(store,|u,stack|{
        let center = match (&params.parfocal,&master_best) {
            (Some(pf),Some(best)) => {
                let offset = pf.offsets.get(&store.channels[u.channel]).copied().unwrap_or(0);
                best[[u.position,u.time]] as i64 + offset
            }
            _=> best_focus_index(stack,metric.as_ref()) as i64
        };
        let (lo,shifted) = focus_window(center,params.radius,sz.slice);
        let kept = stack.slice(s![..,..,lo..lo + window]);
        let out:Array3<f32> = match params.method {
            ReturnMethod::All => kept.to_owned(),
            ReturnMethod::Average => kept.mean_axis(Axis(2))
                .map(|m| m.insert_axis(Axis(2)))
                .unwrap_or_else(|| kept.to_owned()),
        };
        debug!("refocus c{} p{} t{}: center {} window {}..{}",u.channel + 1,u.position + 1,u.time + 1,center,lo,lo + window);
        Ok((out,shifted))
    })?;

    let mut focus_invalid = store.focus_invalid.clone();
    let mut stacks = Vec::with_capacity(results.len());
    for (u,(stack,shifted)) in crate::transform::units(store).iter().zip(results.into_iter()) {
        focus_invalid[[u.channel,u.position,u.time]] = shifted;
        stacks.push(stack);
    }
    let n_invalid = focus_invalid.iter().filter(|f| **f).count();
    if n_invalid > 0 {
        warn!("{} of {} z-stacks had their focus window shifted at the stack edge",n_invalid,focus_invalid.len());
    }
    let mut out = store.with_data(assemble(store,"Refocus",stacks)?);
    out.focus_invalid = focus_invalid;
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::Array6;

    /// stack whose only texture sits in `sharp[c]` for channel c
    fn store(n_slices:usize,sharp:&[usize]) -> CorrectedStore {
        let raw = Array6::<u16>::from_shape_fn((4,4,n_slices,sharp.len(),1,1),|(r,c,sl,ch,_,_)| {
            match sl == sharp[ch] && (r + c) % 2 == 0 {
                true => 500 + sl as u16,
                false => 100 + sl as u16,
            }
        });
        let channels:Vec<String> = (0..sharp.len()).map(|i| format!("ch{}",i)).collect();
        CorrectedStore::from_raw(raw.view(),&channels,&[1])
    }

    fn params(radius:usize,method:ReturnMethod) -> RefocusParams {
        RefocusParams { radius, method, ..RefocusParams::default() }
    }

    #[test]
    fn average_and_all_collapse_the_slice_axis() {
        let st = store(5,&[2]);
        let avg = refocus(&st,&params(1,ReturnMethod::Average)).unwrap();
        assert_eq!(avg.sizes().slice,1);
        // mean of the three off-texture pixels around slice 2
        assert!((avg.data[[0,1,0,0,0,0]] - 102.0).abs() < 1e-4);
        let all = refocus(&st,&params(1,ReturnMethod::All)).unwrap();
        assert_eq!(all.sizes().slice,3);
        assert_eq!(all.data[[0,0,1,0,0,0]],502.0);
        assert!(!all.focus_invalid[[0,0,0]]);
    }

    #[test]
    fn edge_windows_shift_inward_and_flag() {
        let st = store(5,&[0,4,2]);
        let all = refocus(&st,&params(1,ReturnMethod::All)).unwrap();
        assert_eq!(all.data[[0,0,0,0,0,0]],500.0);
        assert_eq!(all.data[[0,0,2,1,0,0]],504.0);
        assert_eq!(all.focus_invalid.iter().copied().collect::<Vec<bool>>(),vec![true,true,false]);
        assert_eq!(focus_window(2,1,5),(1,false));
        assert_eq!(focus_window(-3,1,5),(0,true));
        assert_eq!(focus_window(9,2,5),(0,true));
    }

    #[test]
    fn parfocal_uses_master_plus_offset() {
        // ch1 is sharpest at 3 but its fixed offset from the master says 1 + 1 = 2
        let st = store(5,&[1,3]);
        let mut offsets = BTreeMap::new();
        offsets.insert(String::from("ch1"),1);
        let p = RefocusParams {
            radius: 0,
            method: ReturnMethod::All,
            parfocal: Some(Parfocal { master: String::from("ch0"), offsets }),
            ..RefocusParams::default()
        };
        let out = refocus(&st,&p).unwrap();
        assert_eq!(out.data[[0,0,0,0,0,0]],501.0);
        assert_eq!(out.data[[0,0,0,1,0,0]],102.0);

        let mut far = p.clone();
        far.radius = 1;
        far.parfocal.as_mut().unwrap().offsets.insert(String::from("ch1"),10);
        let out = refocus(&st,&far).unwrap();
        assert!(!out.focus_invalid[[0,0,0]]);
        assert!(out.focus_invalid[[1,0,0]]);

        let mut unknown = p;
        unknown.parfocal.as_mut().unwrap().master = String::from("DAPI");
        assert!(matches!(refocus(&st,&unknown),Err(CorrectionError::UnknownChannel(_))));
    }

    #[test]
    fn window_wider_than_stack_is_an_error() {
        let st = store(3,&[1]);
        assert!(matches!(refocus(&st,&params(2,ReturnMethod::Average)),Err(CorrectionError::WindowTooLarge{ window:5, slices:3 })));
    }
}
