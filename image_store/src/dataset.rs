//! Loading a (possibly partial) dataset back from its directory.

use std::collections::HashSet;
use std::fmt::Write as _;
use std::path::{Path, PathBuf};
use acq_index::acq_order::to_counter;
use acq_index::config::ConfigFile;
use acq_index::coordinate::FrameCoordinate;
use acq_index::plan::{AcquisitionPlan, PLAN_FILENAME};
use log::{info, warn};
use ndarray::{s, Array6, ArrayView2};
use crate::error::StoreError;
use crate::file_order::FileOrder;
use crate::indices::{check_indices, Allocation, IndexSubset};
use crate::journal::{read_journal, JOURNAL_FILENAME};
use crate::metadata::MetadataRecord;
use crate::raw_io;
use crate::reconstruct::{reconstruct_from_journal, Reconstruction};
use crate::store::{StoreSettings, STORE_SETTINGS_NAME};

/// Where the pixels of a dataset live on disk.
#[derive(Clone,Copy,Debug,PartialEq,Eq)]
pub enum FrameLayout {
    Files(FileOrder),
    AppendRaw,
}

#[derive(Debug)]
pub struct Dataset {
    pub dir:PathBuf,
    pub plan:AcquisitionPlan,
    /// set when the plan file was missing and the shape came from the journal
    pub reconstruction:Option<Reconstruction>,
    pub records:Vec<MetadataRecord>,
    pub journal_repaired:bool,
    pub allocation:Allocation,
    /// (rows, cols, slice, channel, position, time) over the allocated subset
    pub data:Array6<u16>,
    pub layout:Option<FrameLayout>,
    /// requested frames that have no pixels on disk; their buffer slots stay zero
    pub missing_frames:Vec<FrameCoordinate>,
}

impl Dataset {

    /// pixels of a global coordinate, if it was part of the loaded subset
    pub fn frame(&self,coord:&FrameCoordinate) -> Option<ArrayView2<u16>> {
        let [sl,ch,po,ti] = self.allocation.local(coord)?;
        Some(self.data.slice(s![..,..,sl,ch,po,ti]))
    }

    pub fn is_complete(&self) -> bool {
        self.missing_frames.is_empty() && self.records.len() == self.plan.n_frames()
    }

    pub fn summary(&self) -> String {
        let mut s = String::new();
        let _ = writeln!(s,"dataset:        {}",self.dir.display());
        let _ = writeln!(s,"order:          {}",self.plan.order);
        let _ = writeln!(s,"axis sizes:     {}",self.plan.axis_sizes());
        let _ = writeln!(s,"frame shape:    {}x{}",self.plan.frame_shape[0],self.plan.frame_shape[1]);
        let _ = writeln!(s,"channels:       {}",self.plan.channels.join(" "));
        let _ = writeln!(s,"journal:        {} of {} records{}",
            self.records.len(),self.plan.n_frames(),
            match self.journal_repaired { true => " (repaired)", false => "" }
        );
        let layout = match self.layout {
            Some(FrameLayout::Files(order)) => format!("{} frame files",order.decode()),
            Some(FrameLayout::AppendRaw) => String::from("append-raw file"),
            None => String::from("no frame data"),
        };
        let _ = writeln!(s,"layout:         {}",layout);
        let _ = writeln!(s,"loaded:         {} ({} missing)",self.allocation.sizes(),self.missing_frames.len());
        if let Some(r) = &self.reconstruction {
            let _ = writeln!(s,"reconstructed:  order {} exact={} truncated={}",
                r.inferred_order,r.is_exact(),
                r.truncated_axis.map(|a| a.name()).unwrap_or("none")
            );
        }
        s
    }
}

fn load_settings(dir:&Path) -> StoreSettings {
    match StoreSettings::from_file(&dir.join(STORE_SETTINGS_NAME)) {
        Ok(settings) => settings,
        Err(e) => {
            warn!("no readable store settings in {:?} ({}); assuming defaults",dir,e);
            StoreSettings::default()
        }
    }
}

fn detect_layout(dir:&Path,settings:&StoreSettings) -> Option<FrameLayout> {
    if dir.join(settings.append_raw_name()).exists() {
        return Some(FrameLayout::AppendRaw)
    }
    settings.naming.detect(dir).map(FrameLayout::Files)
}

/// Loads the requested subset of the dataset in `dir`. The journal is repaired in memory if
/// the run was interrupted; without a plan file the shape is reconstructed from the journal.
/// Frames missing from disk are reported in [Dataset::missing_frames].
pub fn load(dir:&Path,subset:&IndexSubset) -> Result<Dataset,StoreError> {
    if !dir.is_dir() {
        return Err(StoreError::Unreadable(dir.to_owned(),String::from("not a directory")))
    }
    let settings = load_settings(dir);

    let journal_path = dir.join(JOURNAL_FILENAME);
    let (records,journal_repaired) = match journal_path.exists() {
        true => {
            let contents = read_journal(&journal_path)?;
            (contents.records,contents.repaired)
        }
        false => {
            warn!("dataset {:?} has no journal",dir);
            (vec![],false)
        }
    };

    let plan_path = dir.join(PLAN_FILENAME);
    let (plan,reconstruction) = match plan_path.exists() {
        true => (AcquisitionPlan::from_file(&plan_path)?,None),
        false => {
            warn!("dataset {:?} has no plan file; reconstructing from the journal",dir);
            let r = reconstruct_from_journal(&records).map_err(|e|
                StoreError::Unreadable(dir.to_owned(),format!("no plan file and {}",e))
            )?;
            (r.to_plan(&records),Some(r))
        }
    };

    let allocation = check_indices(subset,&plan.axis_sizes())?;
    let layout = detect_layout(dir,&settings);
    let mut data = allocation.allocate(plan.frame_shape);
    let mut missing_frames = vec![];
    let sizes = plan.axis_sizes();
    let journaled:HashSet<FrameCoordinate> = records.iter().map(|r| r.coordinate).collect();

    for coord in allocation.coordinates() {
        let frame = match layout {
            Some(FrameLayout::Files(file_order)) => {
                let path = dir.join(settings.naming.get_filename(file_order,plan.order,&sizes,&coord));
                match path.exists() {
                    true => raw_io::read_frame(&path,plan.frame_shape)?,
                    false => None
                }
            }
            // unwritten slots inside the file read back as zeros; trust the journal instead
            Some(FrameLayout::AppendRaw) if !journaled.contains(&coord) => None,
            Some(FrameLayout::AppendRaw) => {
                let k = to_counter(plan.order,&sizes,&coord)?;
                raw_io::read_frame_at(&dir.join(settings.append_raw_name()),k - 1,plan.frame_shape)?
            }
            None => None
        };
        match (frame,allocation.local(&coord)) {
            (Some(frame),Some([sl,ch,po,ti])) => data.slice_mut(s![..,..,sl,ch,po,ti]).assign(&frame),
            _=> missing_frames.push(coord),
        }
    }

    if !missing_frames.is_empty() {
        warn!("{} of {} requested frames are missing from {:?}",missing_frames.len(),allocation.sizes().n_frames(),dir);
    }
    info!("loaded {} from {:?}",allocation.sizes(),dir);

    Ok(Dataset {
        dir: dir.to_owned(),
        plan,
        reconstruction,
        records,
        journal_repaired,
        allocation,
        data,
        layout,
        missing_frames,
    })
}
