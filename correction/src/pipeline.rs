use acq_index::coordinate::AxisSizes;
use image_store::dataset::Dataset;
use log::{info, warn};
use ndarray::Array6;
use crate::corrected_store::{CorrectedStore, CorrectionLog};
use crate::corrections::Correction;
use crate::error::CorrectionError;

#[derive(Clone,Copy,Debug,PartialEq,Eq)]
pub enum ApplyOutcome {
    Applied,
    /// the correction is already in the log; re-run with force to repeat it
    AlreadyApplied,
}

/// Owns the raw buffer it was built from, the corrected store derived from it and the log
/// of corrections applied so far. The corrected store is created from the raw buffer on
/// first use.
pub struct CorrectionPipeline {
    raw:Array6<u16>,
    channels:Vec<String>,
    positions:Vec<usize>,
    corrected:Option<CorrectedStore>,
    log:CorrectionLog,
}

impl CorrectionPipeline {
    pub fn new(raw:Array6<u16>,channels:Vec<String>,positions:Vec<usize>) -> Self {
        Self {
            raw,
            channels,
            positions,
            corrected: None,
            log: CorrectionLog::default(),
        }
    }

    pub fn from_dataset(dataset:&Dataset) -> Self {
        let channels = dataset.allocation.channels.iter()
            .map(|c| dataset.plan.channel_id(*c).map(|s| s.to_string()).unwrap_or_else(|| format!("ch{}",c)))
            .collect();
        Self::new(dataset.data.clone(),channels,dataset.allocation.positions.clone())
    }

    pub fn raw_sizes(&self) -> AxisSizes {
        let s = self.raw.shape();
        AxisSizes::new(s[2],s[3],s[4],s[5])
    }

    pub fn channels(&self) -> &[String] {
        &self.channels
    }

    pub fn log(&self) -> &CorrectionLog {
        &self.log
    }

    pub fn corrected(&self) -> Option<&CorrectedStore> {
        self.corrected.as_ref()
    }

    /// The corrected store, created from the raw buffer if no correction has run yet.
    pub fn corrected_or_raw(&mut self) -> &CorrectedStore {
        let (raw,channels,positions) = (&self.raw,&self.channels,&self.positions);
        self.corrected.get_or_insert_with(|| CorrectedStore::from_raw(raw.view(),channels,positions))
    }

    /// Drops the corrected store and the log.
    pub fn reset(&mut self) {
        self.corrected = None;
        self.log.clear();
    }

    /// Runs `transform` on the corrected store and replaces it with the result.
    ///
    /// A name already in the log is skipped unless `force` is set. A correction that needs a
    /// z-stack fails with `MissingZStack` once the slice axis has collapsed to one plane; with
    /// `force`, and a raw buffer that still has one, the corrected store is rebuilt from raw
    /// and the log starts over.
    pub fn apply<F>(&mut self,name:&str,requires_z_stack:bool,transform:F,force:bool) -> Result<ApplyOutcome,CorrectionError>
    where F:FnOnce(&CorrectedStore) -> Result<CorrectedStore,CorrectionError> {
        if self.log.contains(name) && !force {
            warn!("{} has already been applied; pass force to apply it again",name);
            return Ok(ApplyOutcome::AlreadyApplied)
        }
        if requires_z_stack && self.corrected_or_raw().sizes().slice == 1 {
            match force && self.raw_sizes().slice > 1 {
                true => {
                    warn!("{} needs a z-stack; rebuilding the corrected store from raw data and discarding {:?}",name,self.log.names());
                    self.reset();
                }
                false => return Err(CorrectionError::MissingZStack(name.to_string()))
            }
        }
        let next = transform(self.corrected_or_raw())?;
        self.corrected = Some(next);
        self.log.push(name);
        info!("{} applied; corrected store is now {}",name,self.corrected_or_raw().sizes());
        Ok(ApplyOutcome::Applied)
    }

    pub fn apply_correction(&mut self,correction:&Correction,force:bool) -> Result<ApplyOutcome,CorrectionError> {
        self.apply(correction.name(),correction.requires_z_stack(),|store| correction.run(store),force)
    }
}
