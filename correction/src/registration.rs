//! Channel-to-channel registration. Every channel is resampled onto a fixed channel with a
//! 2D affine transform, either supplied or estimated from the data.

use std::collections::BTreeMap;
use std::sync::Arc;
use log::{info, warn};
use ndarray::{s, Array2, Array3, ArrayView2, Axis};
use serde::{Deserialize, Serialize};
use utils::fft::phase_correlation_shift;
use crate::corrected_store::CorrectedStore;
use crate::error::CorrectionError;
use crate::transform::{assemble, par_map_units};

/// Maps an output pixel (row, col) to the source pixel it is sampled from:
/// `src = matrix * out + translation`.
#[derive(Clone,Copy,Debug,PartialEq,Serialize,Deserialize)]
pub struct AffineTransform {
    pub matrix:[[f64;2];2],
    pub translation:[f64;2],
}

impl Default for AffineTransform {
    fn default() -> Self {
        Self::identity()
    }
}

impl AffineTransform {
    pub fn identity() -> Self {
        Self { matrix: [[1.0,0.0],[0.0,1.0]], translation: [0.0,0.0] }
    }

    /// transform that moves image content by (dr, dc)
    pub fn from_shift(dr:f64,dc:f64) -> Self {
        Self { matrix: [[1.0,0.0],[0.0,1.0]], translation: [-dr,-dc] }
    }

    pub fn is_identity(&self) -> bool {
        *self == Self::identity()
    }

    pub fn source(&self,r:f64,c:f64) -> (f64,f64) {
        let m = &self.matrix;
        (m[0][0]*r + m[0][1]*c + self.translation[0],m[1][0]*r + m[1][1]*c + self.translation[1])
    }

    /// Bilinear resampling; samples falling outside the image are 0.
    pub fn warp(&self,image:ArrayView2<f32>) -> Array2<f32> {
        let (rows,cols) = image.dim();
        if self.is_identity() {
            return image.to_owned()
        }
        Array2::from_shape_fn((rows,cols),|(r,c)| {
            let (sr,sc) = self.source(r as f64,c as f64);
            bilinear(&image,sr,sc)
        })
    }
}

fn bilinear(image:&ArrayView2<f32>,r:f64,c:f64) -> f32 {
    let (rows,cols) = image.dim();
    let r0 = r.floor();
    let c0 = c.floor();
    let fr = (r - r0) as f32;
    let fc = (c - c0) as f32;
    let sample = |ri:f64,ci:f64| -> f32 {
        match ri >= 0.0 && ci >= 0.0 && (ri as usize) < rows && (ci as usize) < cols {
            true => image[[ri as usize,ci as usize]],
            false => 0.0
        }
    };
    let top = sample(r0,c0)*(1.0 - fc) + sample(r0,c0 + 1.0)*fc;
    let bottom = sample(r0 + 1.0,c0)*(1.0 - fc) + sample(r0 + 1.0,c0 + 1.0)*fc;
    top*(1.0 - fr) + bottom*fr
}

/// Finds the transform that brings `moving` onto `fixed`.
pub trait RegistrationEstimator: Send + Sync {
    fn estimate(&self,fixed:ArrayView2<f32>,moving:ArrayView2<f32>) -> Result<AffineTransform,String>;
}

/// Translation-only estimate from the phase-correlation peak.
#[derive(Clone,Copy,Debug,Default)]
pub struct PhaseCorrelationEstimator;

impl RegistrationEstimator for PhaseCorrelationEstimator {
    fn estimate(&self,fixed:ArrayView2<f32>,moving:ArrayView2<f32>) -> Result<AffineTransform,String> {
        if fixed.dim() != moving.dim() {
            return Err(format!("image shapes differ: {:?} and {:?}",fixed.dim(),moving.dim()))
        }
        let (dr,dc) = phase_correlation_shift(fixed,moving);
        Ok(AffineTransform::from_shift(dr,dc))
    }
}

#[derive(Clone)]
pub struct RegistrationParams {
    pub fixed_channel:String,
    /// per-channel transforms; estimated from the data when absent
    pub transforms:Option<BTreeMap<String,AffineTransform>>,
    pub estimator:Arc<dyn RegistrationEstimator>,
}

impl RegistrationParams {
    pub fn new(fixed_channel:&str) -> Self {
        Self {
            fixed_channel: fixed_channel.to_string(),
            transforms: None,
            estimator: Arc::new(PhaseCorrelationEstimator),
        }
    }
}

/// Estimates one transform per channel from the central slice of position 1, time point 1.
pub fn estimate_transforms(store:&CorrectedStore,fixed_channel:&str,estimator:&dyn RegistrationEstimator) -> Result<BTreeMap<String,AffineTransform>,CorrectionError> {
    let fixed = store.channel_index(fixed_channel).ok_or_else(|| CorrectionError::UnknownChannel(fixed_channel.to_string()))?;
    let central = (store.sizes().slice - 1)/2;
    let plane = |ci:usize| store.data.slice(s![..,..,central,ci,0,0]);
    let mut transforms = BTreeMap::new();
    for (ci,channel) in store.channels.iter().enumerate() {
        let t = match ci == fixed {
            true => AffineTransform::identity(),
            false => estimator.estimate(plane(fixed),plane(ci)).map_err(|reason|
                CorrectionError::Transform { name: String::from("Registration"), reason }
            )?,
        };
        info!("registration {} -> {}: translation ({:.2},{:.2})",channel,fixed_channel,t.translation[0],t.translation[1]);
        transforms.insert(channel.clone(),t);
    }
    Ok(transforms)
}

pub fn register(store:&CorrectedStore,params:&RegistrationParams) -> Result<CorrectedStore,CorrectionError> {
    let transforms = match &params.transforms {
        Some(supplied) => {
            if store.channel_index(&params.fixed_channel).is_none() {
                return Err(CorrectionError::UnknownChannel(params.fixed_channel.clone()))
            }
            for channel in supplied.keys().filter(|k| store.channel_index(k).is_none()) {
                warn!("transform supplied for {} which is not in the store; ignored",channel);
            }
            supplied.clone()
        }
        None => estimate_transforms(store,&params.fixed_channel,params.estimator.as_ref())?,
    };
    let per_channel:Vec<AffineTransform> = store.channels.iter()
        .map(|c| transforms.get(c).copied().unwrap_or_default())
        .collect();

    let stacks = par_map_units(store,|u,stack|{
        let t = &per_channel[u.channel];
        let mut out = Array3::<f32>::zeros(stack.raw_dim());
        for (src,mut dst) in stack.axis_iter(Axis(2)).zip(out.axis_iter_mut(Axis(2))) {
            dst.assign(&t.warp(src));
        }
        Ok(out)
    })?;
    Ok(store.with_data(assemble(store,"Registration",stacks)?))
}
