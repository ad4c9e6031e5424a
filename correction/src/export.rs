//! Writes a corrected store to disk, one f32 file per (slice, channel, position, time).

use std::fs::{create_dir_all, File};
use std::io::Write;
use std::path::{Path, PathBuf};
use acq_index::coordinate::FrameCoordinate;
use byteorder::{ByteOrder, LittleEndian};
use image_store::file_order::FrameNaming;
use log::{info, warn};
use ndarray::{s, ArrayView2};
use serde::{Deserialize, Serialize};
use crate::corrected_store::{CorrectedStore, CorrectionLog};
use crate::error::CorrectionError;

pub const EXPORT_EXT:&str = "f32";
pub const EXPORT_MANIFEST:&str = "export_manifest.json";

/// Written next to the exported frames.
#[derive(Clone,Debug,PartialEq,Serialize,Deserialize)]
pub struct ExportManifest {
    pub corrections:Vec<String>,
    pub channels:Vec<String>,
    /// dataset position number of each exported position, in export order
    pub positions:Vec<usize>,
    pub skipped_positions:Vec<usize>,
    /// (rows, cols)
    pub frame_shape:[usize;2],
    pub n_slices:usize,
    pub n_times:usize,
}

#[derive(Clone,Debug,PartialEq)]
pub struct ExportReport {
    pub files:Vec<PathBuf>,
    pub manifest:ExportManifest,
}

fn write_f32_frame(path:&Path,frame:ArrayView2<f32>) -> Result<(),CorrectionError> {
    let samples:Vec<f32> = frame.iter().copied().collect();
    let mut byte_buff:Vec<u8> = vec![0;4*samples.len()];
    LittleEndian::write_f32_into(&samples,&mut byte_buff);
    let mut f = File::create(path)?;
    f.write_all(&byte_buff)?;
    Ok(())
}

/// Exports every frame of `store` under `out_dir`. With `skip_invalid`, positions with a
/// shifted focus window in any channel or time point are left out and the remaining positions
/// are numbered contiguously from 1.
pub fn export_corrected(store:&CorrectedStore,log:&CorrectionLog,out_dir:&Path,prefix:&str,skip_invalid:bool) -> Result<ExportReport,CorrectionError> {
    create_dir_all(out_dir)?;
    let sz = store.sizes();
    let naming = FrameNaming::new(prefix,EXPORT_EXT);

    let mut kept = vec![];
    let mut skipped = vec![];
    for p in 0..sz.position {
        let invalid = store.focus_invalid.slice(s![..,p,..]).iter().any(|f| *f);
        match skip_invalid && invalid {
            true => skipped.push(p),
            false => kept.push(p),
        }
    }
    if !skipped.is_empty() {
        warn!("skipping positions {:?}: focus window shifted at the stack edge",
            skipped.iter().map(|p| store.positions[*p]).collect::<Vec<usize>>()
        );
    }

    let mut files = Vec::with_capacity(sz.slice*sz.channel*kept.len()*sz.time);
    for t in 0..sz.time {
        for (new_p,p) in kept.iter().enumerate() {
            for c in 0..sz.channel {
                for sl in 0..sz.slice {
                    let coord = FrameCoordinate::new(sl + 1,c + 1,new_p + 1,t + 1);
                    let path = out_dir.join(naming.indexed_name(&coord));
                    write_f32_frame(&path,store.data.slice(s![..,..,sl,c,*p,t]))?;
                    files.push(path);
                }
            }
        }
    }

    let manifest = ExportManifest {
        corrections: log.names().to_vec(),
        channels: store.channels.clone(),
        positions: kept.iter().map(|p| store.positions[*p]).collect(),
        skipped_positions: skipped.iter().map(|p| store.positions[*p]).collect(),
        frame_shape: store.frame_shape(),
        n_slices: sz.slice,
        n_times: sz.time,
    };
    let mut f = File::create(out_dir.join(EXPORT_MANIFEST))?;
    f.write_all(serde_json::to_string_pretty(&manifest)?.as_bytes())?;
    info!("exported {} frames to {:?}",files.len(),out_dir);
    Ok(ExportReport { files, manifest })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs::read;
    use ndarray::Array6;
    use tempfile::TempDir;

    fn store() -> CorrectedStore {
        let raw = Array6::<u16>::from_shape_fn((2,3,1,2,3,2),|(r,c,_,ch,p,t)| (1000*t + 100*p + 10*ch + 3*r + c) as u16);
        let mut st = CorrectedStore::from_raw(raw.view(),&[String::from("BF"),String::from("GFP")],&[2,5,7]);
        // dataset position 5, GFP, second time point
        st.focus_invalid[[1,1,1]] = true;
        st
    }

    #[test]
    fn every_frame_is_written() {
        let dir = TempDir::new().unwrap();
        let mut log = CorrectionLog::default();
        log.push("FlatField");
        let report = export_corrected(&store(),&log,dir.path(),"corr",false).unwrap();
        assert_eq!(report.files.len(),12);
        assert_eq!(report.manifest.positions,vec![2,5,7]);
        assert_eq!(report.manifest.corrections,vec![String::from("FlatField")]);

        let bytes = read(dir.path().join("corr_sl1_ch2_p3_t2.f32")).unwrap();
        assert_eq!(bytes.len(),4*6);
        let mut samples = vec![0f32;6];
        LittleEndian::read_f32_into(&bytes,&mut samples);
        assert_eq!(samples[0],1210.0);
        assert_eq!(samples[5],1215.0);
        assert!(dir.path().join(EXPORT_MANIFEST).exists());
    }

    #[test]
    fn invalid_positions_are_skipped_and_renumbered() {
        let dir = TempDir::new().unwrap();
        let report = export_corrected(&store(),&CorrectionLog::default(),dir.path(),"corr",true).unwrap();
        assert_eq!(report.files.len(),8);
        assert_eq!(report.manifest.positions,vec![2,7]);
        assert_eq!(report.manifest.skipped_positions,vec![5]);
        assert!(!dir.path().join("corr_sl1_ch1_p3_t1.f32").exists());

        // export position 2 is dataset position 7
        let bytes = read(dir.path().join("corr_sl1_ch1_p2_t1.f32")).unwrap();
        let mut samples = vec![0f32;6];
        LittleEndian::read_f32_into(&bytes,&mut samples);
        assert_eq!(samples[0],200.0);
    }
}
