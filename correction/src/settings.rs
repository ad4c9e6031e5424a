use std::collections::{BTreeMap, HashMap};
use std::path::PathBuf;
use std::sync::Arc;
use acq_index::config::ConfigFile;
use serde::{Deserialize, Serialize};
use crate::corrections::{Correction, CorrectionKind};
use crate::error::CorrectionError;
use crate::flat_field::ChannelBackgrounds;
use crate::refocus::{FocusMetricKind, Parfocal, RefocusParams, ReturnMethod};
use crate::registration::RegistrationParams;
use crate::transform::ChannelTransform;

/// Opaque per-channel methods available to a run, by the correction they implement.
pub type TransformRegistry = HashMap<CorrectionKind,Arc<dyn ChannelTransform>>;

#[derive(Clone,Debug,PartialEq,Serialize,Deserialize)]
pub struct FlatFieldSettings {
    pub dark_level:f32,
    /// channel id -> raw u16 background frame
    pub backgrounds:BTreeMap<String,PathBuf>,
}

#[derive(Clone,Debug,PartialEq,Serialize,Deserialize)]
pub struct RefocusSettings {
    pub radius:usize,
    pub method:ReturnMethod,
    pub metric:FocusMetricKind,
    /// enables parfocal mode
    pub parfocal_master:Option<String>,
    pub parfocal_offsets:BTreeMap<String,i64>,
}

#[derive(Clone,Debug,Default,PartialEq,Serialize,Deserialize)]
pub struct RegistrationSettings {
    /// defaults to the first channel of the dataset
    pub fixed_channel:Option<String>,
}

#[derive(Clone,Debug,PartialEq,Serialize,Deserialize)]
pub struct CorrectionSettings {
    /// applied in this order
    pub corrections:Vec<CorrectionKind>,
    /// repeat corrections already in the log
    pub force:bool,
    pub export_prefix:String,
    /// leave out positions whose focus window was shifted
    pub export_skip_invalid:bool,
    pub flat_field:FlatFieldSettings,
    pub refocus:RefocusSettings,
    pub registration:RegistrationSettings,
}

impl Default for FlatFieldSettings {
    fn default() -> Self {
        Self {
            dark_level: 100.0,
            backgrounds: BTreeMap::new(),
        }
    }
}

impl Default for RefocusSettings {
    fn default() -> Self {
        let p = RefocusParams::default();
        Self {
            radius: p.radius,
            method: p.method,
            metric: p.metric,
            parfocal_master: None,
            parfocal_offsets: BTreeMap::new(),
        }
    }
}

impl Default for CorrectionSettings {
    fn default() -> Self {
        Self {
            corrections: vec![CorrectionKind::FlatField,CorrectionKind::Refocus,CorrectionKind::Registration],
            force: false,
            export_prefix: String::from("corr"),
            export_skip_invalid: true,
            flat_field: FlatFieldSettings::default(),
            refocus: RefocusSettings::default(),
            registration: RegistrationSettings::default(),
        }
    }
}

impl ConfigFile for CorrectionSettings {
    fn file_ext() -> String {
        String::from("correction_settings")
    }
}

impl RefocusSettings {
    pub fn params(&self) -> RefocusParams {
        RefocusParams {
            radius: self.radius,
            method: self.method,
            metric: self.metric,
            parfocal: self.parfocal_master.as_ref().map(|master| Parfocal {
                master: master.clone(),
                offsets: self.parfocal_offsets.clone(),
            }),
        }
    }
}

impl CorrectionSettings {
    /// Builds the correction for `kind`. Flat-field backgrounds are read from disk here;
    /// opaque methods must be present in `transforms`.
    pub fn correction(&self,kind:CorrectionKind,channels:&[String],frame_shape:[usize;2],transforms:&TransformRegistry) -> Result<Correction,CorrectionError> {
        let opaque = || transforms.get(&kind).cloned().ok_or_else(|| CorrectionError::NoTransform(kind.name().to_string()));
        Ok(match kind {
            CorrectionKind::FlatField => Correction::FlatField {
                backgrounds: ChannelBackgrounds::from_files(&self.flat_field.backgrounds,frame_shape)?,
                dark_level: self.flat_field.dark_level,
            },
            CorrectionKind::Refocus => Correction::Refocus(self.refocus.params()),
            CorrectionKind::Registration => {
                let fixed = match (&self.registration.fixed_channel,channels.first()) {
                    (Some(fixed),_) => fixed.clone(),
                    (None,Some(first)) => first.clone(),
                    (None,None) => return Err(CorrectionError::UnknownChannel(String::from("(none)"))),
                };
                Correction::Registration(RegistrationParams::new(&fixed))
            }
            CorrectionKind::Deconvolution => Correction::Deconvolution(opaque()?),
            CorrectionKind::Alignment => Correction::Alignment(opaque()?),
            CorrectionKind::Pca => Correction::Pca(opaque()?),
            CorrectionKind::PhaseRetrieval => Correction::PhaseRetrieval(opaque()?),
        })
    }
}
