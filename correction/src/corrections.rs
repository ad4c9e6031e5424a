//! The closed set of corrections the pipeline knows how to apply.

use std::fmt;
use std::sync::Arc;
use serde::{Deserialize, Serialize};
use crate::corrected_store::CorrectedStore;
use crate::error::CorrectionError;
use crate::flat_field::{flat_field, ChannelBackgrounds};
use crate::refocus::{refocus, RefocusParams};
use crate::registration::{register, RegistrationParams};
use crate::transform::{apply_channel_transform, ChannelTransform};

/// Name of each correction as recorded in the correction log.
#[derive(Clone,Copy,Debug,PartialEq,Eq,Hash,Serialize,Deserialize)]
pub enum CorrectionKind {
    FlatField,
    Deconvolution,
    Refocus,
    Alignment,
    Registration,
    Pca,
    PhaseRetrieval,
}

impl CorrectionKind {
    pub fn list() -> Vec<Self> {
        vec![
            Self::FlatField,
            Self::Deconvolution,
            Self::Refocus,
            Self::Alignment,
            Self::Registration,
            Self::Pca,
            Self::PhaseRetrieval,
        ]
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::FlatField => "FlatField",
            Self::Deconvolution => "Deconvolution",
            Self::Refocus => "Refocus",
            Self::Alignment => "Alignment",
            Self::Registration => "Registration",
            Self::Pca => "PCA",
            Self::PhaseRetrieval => "PhaseRetrieval",
        }
    }

    /// corrections that work along the slice axis
    pub fn requires_z_stack(&self) -> bool {
        match self {
            Self::Deconvolution | Self::Refocus | Self::PhaseRetrieval => true,
            _=> false
        }
    }
}

impl fmt::Display for CorrectionKind {
    fn fmt(&self,f:&mut fmt::Formatter) -> fmt::Result {
        write!(f,"{}",self.name())
    }
}

/// A correction with its parameters. Numerical methods the pipeline does not own
/// (deconvolution, cross-correlation alignment, PCA, phase retrieval) are carried as opaque
/// per-channel transforms.
#[derive(Clone)]
pub enum Correction {
    FlatField {
        backgrounds:ChannelBackgrounds,
        dark_level:f32,
    },
    Deconvolution(Arc<dyn ChannelTransform>),
    Refocus(RefocusParams),
    Alignment(Arc<dyn ChannelTransform>),
    Registration(RegistrationParams),
    Pca(Arc<dyn ChannelTransform>),
    PhaseRetrieval(Arc<dyn ChannelTransform>),
}

impl Correction {
    pub fn kind(&self) -> CorrectionKind {
        match self {
            Self::FlatField{..} => CorrectionKind::FlatField,
            Self::Deconvolution(_) => CorrectionKind::Deconvolution,
            Self::Refocus(_) => CorrectionKind::Refocus,
            Self::Alignment(_) => CorrectionKind::Alignment,
            Self::Registration(_) => CorrectionKind::Registration,
            Self::Pca(_) => CorrectionKind::Pca,
            Self::PhaseRetrieval(_) => CorrectionKind::PhaseRetrieval,
        }
    }

    pub fn name(&self) -> &'static str {
        self.kind().name()
    }

    pub fn requires_z_stack(&self) -> bool {
        self.kind().requires_z_stack()
    }

    /// Produces the corrected store that replaces `store`.
    pub fn run(&self,store:&CorrectedStore) -> Result<CorrectedStore,CorrectionError> {
        match self {
            Self::FlatField { backgrounds, dark_level } => flat_field(store,backgrounds,*dark_level),
            Self::Refocus(params) => refocus(store,params),
            Self::Registration(params) => register(store,params),
            Self::Deconvolution(t) |
            Self::Alignment(t) |
            Self::Pca(t) |
            Self::PhaseRetrieval(t) => apply_channel_transform(store,self.name(),t.as_ref()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn z_stack_requirements() {
        let needs_z:Vec<&str> = CorrectionKind::list().iter()
            .filter(|k| k.requires_z_stack())
            .map(|k| k.name())
            .collect();
        assert_eq!(needs_z,vec!["Deconvolution","Refocus","PhaseRetrieval"]);
        assert_eq!(Correction::Refocus(RefocusParams::default()).name(),"Refocus");
        assert_eq!(Correction::FlatField { backgrounds: ChannelBackgrounds::new(), dark_level: 0.0 }.kind(),CorrectionKind::FlatField);
    }
}
