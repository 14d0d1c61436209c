use clap::Parser;
use env_logger::Env;
use log::info;
use seqtrace::{
    console::{demo_singlet, summary, trace_bundle, Args},
    error::TraceResult,
};

fn main() -> TraceResult<()> {
    env_logger::init_from_env(Env::default().default_filter_or("info"));
    //parse CLI arguments
    let args = Args::parse();
    let config = args.trace_config()?;
    let field_angle = args.field_angle()?;

    //set up and trace the demonstration system
    let stack = demo_singlet()?;
    info!(
        "tracing {} surfaces, total track {:?}",
        stack.len(),
        stack.total_track()
    );
    let history = trace_bundle(&stack, args.rings, field_angle, &config)?;

    print!("{}", summary(&stack, &history)?);
    Ok(())
}
