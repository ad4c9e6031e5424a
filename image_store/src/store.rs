//! Indexed image store: raw frame buffer, frame files and the metadata journal of one run.

use std::fs::create_dir_all;
use std::path::{Path, PathBuf};
use acq_index::acq_order::{check_coordinate, to_counter};
use acq_index::config::ConfigFile;
use acq_index::coordinate::FrameCoordinate;
use acq_index::plan::{AcquisitionPlan, PLAN_FILENAME};
use log::{debug, info, warn};
use ndarray::{s, Array2, Array6};
use serde::{Deserialize, Serialize};
use crate::error::StoreError;
use crate::file_order::{FileOrder, FrameNaming};
use crate::journal::{JournalWriter, JOURNAL_FILENAME};
use crate::metadata::MetadataRecord;
use crate::raw_io;

/// base name of the store settings file inside a dataset directory
pub const STORE_SETTINGS_NAME:&str = "dataset";

/// What happens to the pixels of an ingested frame on disk.
#[derive(Clone,Copy,Debug,PartialEq,Eq,Serialize,Deserialize)]
pub enum Persist {
    None,
    PerFrame,
    AppendRaw,
}

impl Persist {
    pub fn encode(name:&str) -> Option<Self> {
        match name {
            "none" => Some(Self::None),
            "per_frame" => Some(Self::PerFrame),
            "append_raw" => Some(Self::AppendRaw),
            _=> None
        }
    }
}

#[derive(Clone,Debug,PartialEq,Serialize,Deserialize)]
pub struct StoreSettings {
    pub file_order:FileOrder,
    pub persist:Persist,
    pub keep_in_memory:bool,
    pub naming:FrameNaming,
}

impl Default for StoreSettings {
    fn default() -> Self {
        Self {
            file_order: FileOrder::default(),
            persist: Persist::PerFrame,
            keep_in_memory: true,
            naming: FrameNaming::default(),
        }
    }
}

impl ConfigFile for StoreSettings {
    fn file_ext() -> String {
        String::from("store_settings")
    }
}

impl StoreSettings {
    pub fn append_raw_name(&self) -> String {
        format!("{}_frames.{}",self.naming.prefix,raw_io::APPEND_RAW_EXT)
    }
}

pub struct IndexedImageStore {
    dir:Option<PathBuf>,
    plan:AcquisitionPlan,
    settings:StoreSettings,
    journal:Option<JournalWriter>,
    records:Vec<MetadataRecord>,
    buffer:Option<Array6<u16>>,
    files_written:usize,
}

impl IndexedImageStore {

    /// Store without a dataset directory; the journal lives only in memory.
    pub fn in_memory(plan:&AcquisitionPlan) -> Self {
        let settings = StoreSettings { persist: Persist::None, keep_in_memory: true, ..StoreSettings::default() };
        Self::new(None,plan,settings,None)
    }

    /// Creates the dataset directory with its plan, settings and an empty journal.
    pub fn create(dir:&Path,plan:&AcquisitionPlan,settings:StoreSettings) -> Result<Self,StoreError> {
        if !dir.exists() {
            create_dir_all(dir)?;
        }
        plan.to_file(&dir.join(PLAN_FILENAME))?;
        settings.to_file(&dir.join(STORE_SETTINGS_NAME))?;
        let journal = JournalWriter::create(&dir.join(JOURNAL_FILENAME),plan.n_frames())?;
        info!("created dataset {:?} for {} frames ({})",dir,plan.n_frames(),plan.axis_sizes());
        Ok(Self::new(Some(dir.to_owned()),plan,settings,Some(journal)))
    }

    fn new(dir:Option<PathBuf>,plan:&AcquisitionPlan,settings:StoreSettings,journal:Option<JournalWriter>) -> Self {
        let buffer = match settings.keep_in_memory {
            true => {
                let sz = plan.axis_sizes();
                Some(Array6::zeros((plan.frame_shape[0],plan.frame_shape[1],sz.slice,sz.channel,sz.position,sz.time)))
            }
            false => None
        };
        Self {
            dir,
            plan: plan.clone(),
            settings,
            journal,
            records: vec![],
            buffer,
            files_written: 0,
        }
    }

    pub fn plan(&self) -> &AcquisitionPlan {
        &self.plan
    }

    pub fn settings(&self) -> &StoreSettings {
        &self.settings
    }

    pub fn dir(&self) -> Option<&Path> {
        self.dir.as_deref()
    }

    pub fn records(&self) -> &[MetadataRecord] {
        &self.records
    }

    pub fn buffer(&self) -> Option<&Array6<u16>> {
        self.buffer.as_ref()
    }

    pub fn is_complete(&self) -> bool {
        self.records.len() == self.plan.n_frames()
    }

    pub fn get_filename(&self,coord:&FrameCoordinate) -> String {
        self.settings.naming.get_filename(self.settings.file_order,self.plan.order,&self.plan.axis_sizes(),coord)
    }

    /// Changing the naming convention once frames are on disk splits the dataset across two
    /// conventions, so it needs `force`.
    pub fn set_file_order(&mut self,file_order:FileOrder,force:bool) -> Result<(),StoreError> {
        if file_order == self.settings.file_order {
            return Ok(())
        }
        if self.files_written > 0 && !force {
            return Err(StoreError::ConfirmationRequired(format!(
                "{} frames are already named with the {} convention",
                self.files_written,self.settings.file_order.decode()
            )))
        }
        warn!("file order changed from {} to {}",self.settings.file_order.decode(),file_order.decode());
        self.settings.file_order = file_order;
        if let Some(dir) = &self.dir {
            self.settings.to_file(&dir.join(STORE_SETTINGS_NAME))?;
        }
        Ok(())
    }

    pub fn ingest(&mut self,coord:&FrameCoordinate,pixels:&Array2<u16>,record:MetadataRecord,persist:Persist) -> Result<(),StoreError> {
        let (rows,cols) = pixels.dim();
        if [rows,cols] != self.plan.frame_shape {
            return Err(StoreError::FrameShapeMismatch { expected: self.plan.frame_shape, found: [rows,cols] })
        }
        let sizes = self.plan.axis_sizes();
        check_coordinate(&sizes,coord)?;
        if self.records.len() == self.plan.n_frames() {
            return Err(StoreError::JournalFull(self.plan.n_frames()))
        }

        // pixels go to disk before the record so a failed write leaves no orphan journal entry
        match persist {
            Persist::None => {}
            Persist::PerFrame => {
                let dir = self.dir.as_ref().ok_or(StoreError::NoDirectory)?;
                let path = dir.join(self.get_filename(coord));
                raw_io::write_frame(&path,pixels.view())?;
                self.files_written += 1;
                debug!("wrote {:?}",path);
            }
            Persist::AppendRaw => {
                let dir = self.dir.as_ref().ok_or(StoreError::NoDirectory)?;
                let k = to_counter(self.plan.order,&sizes,coord)?;
                let path = dir.join(self.settings.append_raw_name());
                raw_io::write_frame_at(&path,k - 1,pixels.view())?;
            }
        }

        if let Some(journal) = self.journal.as_mut() {
            journal.append(&record)?;
        }
        self.records.push(record);

        if let Some(buffer) = self.buffer.as_mut() {
            let [sl,ch,po,ti] = coord.zero_based();
            buffer.slice_mut(s![..,..,sl,ch,po,ti]).assign(pixels);
        }
        Ok(())
    }

    /// Closes the journal of a run that ends early; a complete journal closes itself.
    pub fn close(&mut self) -> Result<(),StoreError> {
        if let Some(journal) = self.journal.as_mut() {
            journal.close()?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use acq_index::acq_order::{to_coordinate, AcquisitionOrder};
    use crate::journal::read_journal;
    use tempfile::TempDir;

    fn small_plan() -> AcquisitionPlan {
        AcquisitionPlan {
            positions: vec![[0.0,0.0,0.0]],
            z_offsets: vec![0.0,1.0],
            time_delays: vec![],
            channels: vec![String::from("BF"),String::from("GFP")],
            frame_shape: [3,2],
            order: AcquisitionOrder::ZCXYT,
            track_focus: false,
        }
    }

    fn ingest_all(store:&mut IndexedImageStore,plan:&AcquisitionPlan,persist:Persist) {
        for k in 1..=plan.n_frames() {
            let c = to_coordinate(plan.order,&plan.axis_sizes(),k).unwrap();
            let frame = Array2::<u16>::from_elem((3,2),k as u16);
            let r = MetadataRecord::new(plan,k,&c,plan.channel_id(c.channel).unwrap(),None,0.0);
            store.ingest(&c,&frame,r,persist).unwrap();
        }
    }

    #[test]
    fn rejects_wrong_frame_shape() {
        let plan = small_plan();
        let mut store = IndexedImageStore::in_memory(&plan);
        let c = FrameCoordinate::origin();
        let r = MetadataRecord::new(&plan,1,&c,"BF",None,0.0);
        let err = store.ingest(&c,&Array2::zeros((2,3)),r,Persist::None).unwrap_err();
        assert!(matches!(err,StoreError::FrameShapeMismatch { expected:[3,2], found:[2,3] }));
        assert!(store.records().is_empty());
    }

    #[test]
    fn in_memory_buffer_is_addressed_by_coordinate() {
        let plan = small_plan();
        let mut store = IndexedImageStore::in_memory(&plan);
        ingest_all(&mut store,&plan,Persist::None);
        assert!(store.is_complete());
        let buf = store.buffer().unwrap();
        assert_eq!(buf.shape(),&[3,2,2,2,1,1]);
        // counter 3 is slice 1, channel 2 for ZCXYT
        assert_eq!(buf[[0,0,0,1,0,0]],3);
        assert_eq!(buf[[2,1,1,0,0,0]],2);
        let c = FrameCoordinate::origin();
        let r = MetadataRecord::new(&plan,5,&c,"BF",None,0.0);
        assert!(matches!(store.ingest(&c,&Array2::zeros((3,2)),r,Persist::None),Err(StoreError::JournalFull(4))));
    }

    #[test]
    fn persisting_without_directory_fails() {
        let plan = small_plan();
        let mut store = IndexedImageStore::in_memory(&plan);
        let c = FrameCoordinate::origin();
        let r = MetadataRecord::new(&plan,1,&c,"BF",None,0.0);
        assert!(matches!(store.ingest(&c,&Array2::zeros((3,2)),r,Persist::PerFrame),Err(StoreError::NoDirectory)));
    }

    #[test]
    fn per_frame_files_and_closed_journal() {
        let dir = TempDir::new().unwrap();
        let plan = small_plan();
        let mut store = IndexedImageStore::create(dir.path(),&plan,StoreSettings::default()).unwrap();
        ingest_all(&mut store,&plan,Persist::PerFrame);
        assert!(dir.path().join("img_sl2_ch1_p1_t1.raw").exists());
        assert_eq!(utils::find_files(dir.path(),"raw").unwrap().len(),4);
        let j = read_journal(&dir.path().join(JOURNAL_FILENAME)).unwrap();
        assert!(!j.repaired);
        assert_eq!(j.records.len(),4);
        assert_eq!(j.records,store.records().to_vec());
    }

    #[test]
    fn failed_frame_write_is_not_journaled() {
        let dir = TempDir::new().unwrap();
        let plan = small_plan();
        let mut store = IndexedImageStore::create(dir.path(),&plan,StoreSettings::default()).unwrap();
        let c = FrameCoordinate::origin();
        // a directory squatting on the frame's file name makes the write fail
        let blocker = dir.path().join(store.get_filename(&c));
        std::fs::create_dir(&blocker).unwrap();
        let frame = Array2::<u16>::from_elem((3,2),7);
        let r = MetadataRecord::new(&plan,1,&c,"BF",None,0.0);
        assert!(matches!(store.ingest(&c,&frame,r.clone(),Persist::PerFrame),Err(StoreError::Io(_))));
        assert!(store.records().is_empty());
        assert_eq!(store.buffer().unwrap()[[0,0,0,0,0,0]],0);

        std::fs::remove_dir(&blocker).unwrap();
        store.ingest(&c,&frame,r,Persist::PerFrame).unwrap();
        store.close().unwrap();
        assert_eq!(store.records().len(),1);
        let j = read_journal(&dir.path().join(JOURNAL_FILENAME)).unwrap();
        assert_eq!(j.records.len(),1);
        assert_eq!(j.records[0].coordinate,c);
    }

    #[test]
    fn file_order_change_needs_force_after_writes() {
        let dir = TempDir::new().unwrap();
        let plan = small_plan();
        let mut store = IndexedImageStore::create(dir.path(),&plan,StoreSettings::default()).unwrap();
        store.set_file_order(FileOrder::Linear,false).unwrap();
        store.set_file_order(FileOrder::Indexed,false).unwrap();
        ingest_all(&mut store,&plan,Persist::PerFrame);
        assert!(matches!(store.set_file_order(FileOrder::Linear,false),Err(StoreError::ConfirmationRequired(_))));
        store.set_file_order(FileOrder::Linear,true).unwrap();
        assert_eq!(store.get_filename(&FrameCoordinate::new(2,2,1,1)),"img4.raw");
        let saved = StoreSettings::from_file(&dir.path().join(STORE_SETTINGS_NAME)).unwrap();
        assert_eq!(saved.file_order,FileOrder::Linear);
    }

    #[test]
    fn append_raw_file_grows_by_frame() {
        let dir = TempDir::new().unwrap();
        let plan = small_plan();
        let settings = StoreSettings { keep_in_memory: false, ..StoreSettings::default() };
        let mut store = IndexedImageStore::create(dir.path(),&plan,settings).unwrap();
        ingest_all(&mut store,&plan,Persist::AppendRaw);
        assert!(store.buffer().is_none());
        let raw = dir.path().join(store.settings().append_raw_name());
        assert_eq!(std::fs::metadata(&raw).unwrap().len() as usize,4*plan.frame_size_bytes());
        let third = raw_io::read_frame_at(&raw,2,[3,2]).unwrap().unwrap();
        assert!(third.iter().all(|v| *v == 3));
    }
}
