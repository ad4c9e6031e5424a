//! Flat-field correction against per-channel background images.

use std::collections::BTreeMap;
use std::path::PathBuf;
use image_store::raw_io;
use image_store::StoreError;
use log::{info, warn};
use ndarray::{Array2, Array3, Axis};
use crate::corrected_store::CorrectedStore;
use crate::error::CorrectionError;
use crate::transform::{assemble, par_map_units};

/// Channel id -> background (illumination profile) image. Built once and handed to the
/// flat-field correction; nothing else mutates it.
#[derive(Clone,Debug,Default,PartialEq)]
pub struct ChannelBackgrounds {
    images:BTreeMap<String,Array2<f32>>,
}

impl ChannelBackgrounds {
    pub fn new() -> Self {
        Self::default()
    }

    /// Loads raw u16 background frames, one file per channel.
    pub fn from_files(files:&BTreeMap<String,PathBuf>,frame_shape:[usize;2]) -> Result<Self,CorrectionError> {
        let mut bg = Self::new();
        for (channel,path) in files {
            let frame = raw_io::read_frame(path,frame_shape)?.ok_or_else(||
                StoreError::Unreadable(path.clone(),format!("not a {}x{} u16 frame",frame_shape[0],frame_shape[1]))
            )?;
            bg.insert(channel,frame.mapv(|v| v as f32),false)?;
            info!("background for {} loaded from {:?}",channel,path);
        }
        Ok(bg)
    }

    /// Replacing an existing background needs `force`.
    pub fn insert(&mut self,channel:&str,image:Array2<f32>,force:bool) -> Result<(),CorrectionError> {
        if self.images.contains_key(channel) && !force {
            return Err(CorrectionError::ConfirmationRequired(format!("channel {} already has a background image",channel)))
        }
        if self.images.insert(channel.to_string(),image).is_some() {
            warn!("background for {} replaced",channel);
        }
        Ok(())
    }

    pub fn get(&self,channel:&str) -> Option<&Array2<f32>> {
        self.images.get(channel)
    }

    pub fn channels(&self) -> Vec<&str> {
        self.images.keys().map(|k| k.as_str()).collect()
    }
}

/// Divides every plane by its channel's background (dark level removed from both) and
/// rescales by the background mean, so a flat background maps to itself. Channels without
/// a background pass through unchanged.
pub fn flat_field(store:&CorrectedStore,backgrounds:&ChannelBackgrounds,dark_level:f32) -> Result<CorrectedStore,CorrectionError> {
    let frame_shape = store.frame_shape();
    let mut gains = BTreeMap::<usize,Array2<f32>>::new();
    for (ci,channel) in store.channels.iter().enumerate() {
        match backgrounds.get(channel) {
            Some(bg) if bg.dim() == (frame_shape[0],frame_shape[1]) => {
                let bg = bg.mapv(|v| (v - dark_level).max(f32::EPSILON));
                let mean = bg.mean().unwrap_or(1.0);
                gains.insert(ci,bg.mapv(|v| mean/v));
            }
            Some(bg) => warn!("background for {} is {:?}, frames are {:?}; channel left uncorrected",channel,bg.dim(),frame_shape),
            None => warn!("no background for {}; channel left uncorrected",channel),
        }
    }

    let stacks = par_map_units(store,|u,stack|{
        let mut out:Array3<f32> = stack.to_owned();
        if let Some(gain) = gains.get(&u.channel) {
            for mut plane in out.axis_iter_mut(Axis(2)) {
                plane.zip_mut_with(gain,|v,g| *v = (*v - dark_level)*g);
            }
        }
        Ok(out)
    })?;
    Ok(store.with_data(assemble(store,"FlatField",stacks)?))
}
