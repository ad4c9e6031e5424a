use acq_index::config::ConfigFile;
use image_store::dataset;
use image_store::indices::IndexSubset;
use log::{info, warn};
use crate::args::{NewSettingsArgs, RunArgs};
use crate::corrections::CorrectionKind;
use crate::error::CorrectionError;
use crate::export::{export_corrected, ExportReport};
use crate::pipeline::{ApplyOutcome, CorrectionPipeline};
use crate::settings::{CorrectionSettings, TransformRegistry};

pub fn list_corrections() -> String {
    let names:Vec<String> = CorrectionKind::list().iter().map(|k| match k.requires_z_stack() {
        true => format!("{} (z-stack)",k.name()),
        false => k.name().to_string(),
    }).collect();
    names.join("\n")
}

pub fn new_settings(args:&NewSettingsArgs) -> Result<(),CorrectionError> {
    CorrectionSettings::default().to_file(&args.destination)?;
    info!("correction settings written to {:?}",args.destination.with_extension(CorrectionSettings::file_ext()));
    Ok(())
}

/// Applies the settings' corrections in order. Corrections already in the log are skipped
/// unless the settings force them.
pub fn run_corrections(pipeline:&mut CorrectionPipeline,settings:&CorrectionSettings,transforms:&TransformRegistry,frame_shape:[usize;2]) -> Result<Vec<ApplyOutcome>,CorrectionError> {
    let mut outcomes = Vec::with_capacity(settings.corrections.len());
    for kind in &settings.corrections {
        let correction = settings.correction(*kind,pipeline.channels(),frame_shape,transforms)?;
        outcomes.push(pipeline.apply_correction(&correction,settings.force)?);
    }
    Ok(outcomes)
}

pub fn run(args:&RunArgs) -> Result<ExportReport,CorrectionError> {
    run_with_transforms(args,&TransformRegistry::new())
}

pub fn run_with_transforms(args:&RunArgs,transforms:&TransformRegistry) -> Result<ExportReport,CorrectionError> {
    let mut settings = CorrectionSettings::from_file(&args.settings)?;
    settings.force |= args.force;
    let ds = dataset::load(&args.dataset_dir,&IndexSubset::all())?;
    if !ds.is_complete() {
        warn!("dataset {:?} is incomplete; {} frames are missing and stay zero",args.dataset_dir,ds.missing_frames.len());
    }
    let mut pipeline = CorrectionPipeline::from_dataset(&ds);
    run_corrections(&mut pipeline,&settings,transforms,ds.plan.frame_shape)?;
    let log = pipeline.log().clone();
    let corrected = pipeline.corrected_or_raw();
    export_corrected(corrected,&log,&args.output_dir,&settings.export_prefix,settings.export_skip_invalid)
}
