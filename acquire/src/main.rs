use clap::Parser;
use log::error;
use acquire::args::*;
use acquire::commands::{inspect, list_orders, new_plan, new_presets, repair_journal, simulate};

fn main(){
    env_logger::init();
    let args = AcquireArgs::parse();
    use Action::*;
    let result = match &args.action {
        ListOrders => {
            println!("{}",list_orders());
            Ok(())
        }
        NewPlan(args) => new_plan(args),
        NewPresets(args) => new_presets(args),
        Simulate(args) => simulate(args).map(|report|{
            println!("{} frames acquired (complete: {}), focus bias {:+.3}",report.frames,report.complete,report.focus_offset);
        }),
        Inspect(args) => inspect(args).map(|summary| print!("{}",summary)),
        RepairJournal(args) => repair_journal(args).map(|n| println!("{} journal records",n)),
    };
    if let Err(e) = result {
        error!("{}",e);
        eprintln!("acquire: {}",e);
        std::process::exit(1);
    }
}
