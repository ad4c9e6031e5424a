use clap::Parser;
use log::error;
use correction::args::*;
use correction::commands::{list_corrections, new_settings, run};

fn main(){
    env_logger::init();
    let args = CorrectArgs::parse();
    use Action::*;
    let result = match &args.action {
        ListCorrections => {
            println!("{}",list_corrections());
            Ok(())
        }
        NewSettings(args) => new_settings(args),
        Run(args) => run(args).map(|report|{
            println!("{} frames exported; corrections: {}",report.files.len(),report.manifest.corrections.join(", "));
            if !report.manifest.skipped_positions.is_empty() {
                println!("skipped positions: {:?}",report.manifest.skipped_positions);
            }
        }),
    };
    if let Err(e) = result {
        error!("{}",e);
        eprintln!("correct: {}",e);
        std::process::exit(1);
    }
}
