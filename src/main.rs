use anyhow::{Context, Result};
use clap::Parser;

use figtao::core::Dataset;
use figtao::logging;
use figtao::tasks::FitEvaluator;
use figtao::ui::cli::args::{Cli, Command, DescribeArgs};
use figtao::ui::types::choices::schema::specs_for_kind;
use figtao::ui::types::choices::{LearnerChoice, TaskChoice, UIChoice};
use strum::EnumMessage;

const RESET: &str = "\x1b[0m";
const BOLD: &str = "\x1b[1m";
const DIM: &str = "\x1b[2m";
const FG_CYAN: &str = "\x1b[36m";
const FG_GREEN: &str = "\x1b[32m";
const FG_GREY: &str = "\x1b[90m";

fn main() -> Result<()> {
    let cli = Cli::parse();
    logging::init(cli.log_level.as_deref()).context("failed to initialize logging")?;

    let task = match cli.command {
        Command::Run(args) => args.into_task_choice()?,
        Command::Describe(args) => return describe(&args),
    };

    match task {
        TaskChoice::FitEvaluate(p) => {
            let train = Dataset::from_json_file(&p.dataset)
                .with_context(|| format!("failed to load dataset {}", p.dataset.display()))?;
            let test = match &p.test_dataset {
                Some(path) => Some(
                    Dataset::from_json_file(path)
                        .with_context(|| format!("failed to load dataset {}", path.display()))?,
                ),
                None => None,
            };

            let kind = p.learner.kind();
            println!("{BOLD}{FG_CYAN}▶ Fit {kind}{RESET}");
            println!(
                "{DIM}rows={} features={} outputs={}{RESET}  {}",
                train.n_samples(),
                train.n_features(),
                train.n_outputs(),
                timestamp_now()
            );
            println!(
                "{FG_GREY}────────────────────────────────────────────────────────────────────────{RESET}"
            );

            let mut runner = FitEvaluator::new(p.learner.build(), kind.to_string(), train, test)
                .context("failed to construct FitEvaluator")?;
            let report = runner.run().context("fit failed")?.clone();

            println!("{}", runner.learner());
            println!("{FG_GREEN}{BOLD}report{RESET} {report}");

            if let Some(path) = p.dump_file
                && !path.as_os_str().is_empty()
            {
                report
                    .export(&path, p.dump_format.into())
                    .with_context(|| format!("failed to export report to {}", path.display()))?;
            }
        }
    }

    Ok(())
}

fn describe(args: &DescribeArgs) -> Result<()> {
    let kind = args.learner_kind()?;
    let specs = specs_for_kind(&LearnerChoice::schema(), kind.into())
        .with_context(|| format!("failed to read parameters of '{kind}'"))?;

    println!(
        "{BOLD}{FG_CYAN}{kind}{RESET}  {}",
        kind.get_detailed_message().unwrap_or_default()
    );
    for spec in specs {
        println!("  {spec}");
    }
    Ok(())
}

fn timestamp_now() -> String {
    use chrono::{Local, SecondsFormat};
    let now = Local::now();
    format!(
        "{DIM}{}{}",
        now.to_rfc3339_opts(SecondsFormat::Secs, true),
        RESET
    )
}
