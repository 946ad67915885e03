//! Sigma/timestep schedule inspection.

use clap::Args;
use serde::Serialize;

use super::common::SettingsArgs;

#[derive(Args)]
pub struct ScheduleArgs {
    #[command(flatten)]
    settings: SettingsArgs,

    /// Print JSON instead of a table
    #[arg(long)]
    json: bool,
}

#[derive(Serialize)]
struct ScheduleReport {
    sampler: String,
    algorithm: &'static str,
    schedule: &'static str,
    steps: usize,
    sigmas: Vec<f32>,
    timesteps: Vec<u32>,
}

pub fn run(args: ScheduleArgs) -> anyhow::Result<()> {
    let config = args.settings.resolve()?;
    let scheduler = config.build_scheduler()?;
    let Some(schedule) = scheduler.schedule() else {
        anyhow::bail!("scheduler has no timesteps");
    };

    let report = ScheduleReport {
        sampler: config.sampler.clone(),
        algorithm: scheduler.algorithm().as_str(),
        schedule: scheduler.noise_schedule().kind.as_str(),
        steps: schedule.steps(),
        sigmas: schedule.sigmas().to_vec(),
        timesteps: schedule.timesteps().to_vec(),
    };

    if args.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    println!(
        "{} ({} / {} schedule, {} steps)",
        report.sampler, report.algorithm, report.schedule, report.steps
    );
    println!();
    println!("  {:>4}  {:>9}  {:>12}", "step", "timestep", "sigma");
    println!("  {:-<4}  {:-<9}  {:-<12}", "", "", "");
    for (i, sigma) in report.sigmas.iter().enumerate() {
        match report.timesteps.get(i) {
            Some(t) => println!("  {i:>4}  {t:>9}  {sigma:>12.6}"),
            None => println!("  {i:>4}  {:>9}  {sigma:>12.6}", "-"),
        }
    }
    Ok(())
}
