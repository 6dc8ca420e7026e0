use std::path::PathBuf;
use std::str::FromStr;

use anyhow::{Context, Result, anyhow, bail};
use clap::{Args, Parser, Subcommand, ValueHint};
use serde_json::{Map, Value};

use crate::ui::types::choices::{
    DumpFormat, FitEvaluateParams, LearnerChoice, LearnerKind, TaskChoice, TaskKind, UIChoice,
};

#[derive(Debug, Parser)]
#[command(
    author,
    version,
    about = "Fit and evaluate FIGS and TAO tree models"
)]
pub struct Cli {
    /// Tracing filter, e.g. `debug` or `figtao=trace` (overrides RUST_LOG)
    #[arg(long, global = true, value_name = "FILTER")]
    pub log_level: Option<String>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Fit a learner on a dataset and print the model and its scores
    Run(RunArgs),
    /// List the parameters a learner accepts
    Describe(DescribeArgs),
}

#[derive(Debug, Args)]
pub struct RunArgs {
    /// Task to execute
    #[arg(long, default_value = "fit-evaluate", value_name = "TASK")]
    pub task: String,

    /// Learner to fit (figs, tao)
    #[arg(long, value_name = "LEARNER")]
    pub learner: String,

    /// Training dataset (JSON)
    #[arg(long, value_name = "PATH", value_hint = ValueHint::FilePath)]
    pub dataset: PathBuf,

    /// Held-out dataset scored after fitting (JSON)
    #[arg(long, value_name = "PATH", value_hint = ValueHint::FilePath)]
    pub test_dataset: Option<PathBuf>,

    /// File to write the fit report to
    #[arg(long, value_name = "PATH", value_hint = ValueHint::FilePath)]
    pub dump_file: Option<PathBuf>,

    /// Format for the dump file (json, csv, tsv)
    #[arg(long, value_name = "FORMAT")]
    pub dump_format: Option<String>,

    /// Override learner parameters (key=value, nested keys with dots)
    #[arg(long = "learner-param", value_name = "KEY=VALUE", value_parser = parse_key_value)]
    pub learner_params: Vec<KeyValue>,
}

#[derive(Debug, Args)]
pub struct DescribeArgs {
    /// Learner whose parameters to list (figs, tao)
    #[arg(long, value_name = "LEARNER")]
    pub learner: String,
}

impl DescribeArgs {
    pub fn learner_kind(&self) -> Result<LearnerKind> {
        parse_kind::<LearnerKind>(&self.learner)
            .with_context(|| format!("invalid learner '{}'", self.learner))
    }
}

#[derive(Clone, Debug)]
pub struct KeyValue {
    key: String,
    value: Value,
}

impl RunArgs {
    pub fn into_task_choice(self) -> Result<TaskChoice> {
        let task_kind = parse_kind::<TaskKind>(&self.task)
            .with_context(|| format!("invalid task '{}'", self.task))?;

        match task_kind {
            TaskKind::FitEvaluate => self.into_fit_evaluate_choice(),
        }
    }

    fn into_fit_evaluate_choice(self) -> Result<TaskChoice> {
        let learner = build_choice::<LearnerChoice>(&self.learner, &self.learner_params)
            .with_context(|| format!("invalid learner '{}'", self.learner))?;

        let dump_format = match self.dump_format {
            Some(fmt) => Some(
                parse_dump_format(&fmt).with_context(|| format!("invalid dump format '{fmt}'"))?,
            ),
            None => None,
        };

        Ok(TaskChoice::FitEvaluate(FitEvaluateParams {
            learner,
            dataset: self.dataset,
            test_dataset: self.test_dataset,
            dump_file: self.dump_file,
            dump_format: dump_format.unwrap_or_default(),
        }))
    }
}

fn build_choice<C>(kind_input: &str, overrides: &[KeyValue]) -> Result<C>
where
    C: UIChoice,
    C::Kind: FromStr,
    <C::Kind as FromStr>::Err: std::fmt::Display,
{
    let kind = parse_kind::<C::Kind>(kind_input)?;
    let mut params = C::default_params(kind);
    apply_overrides(&mut params, overrides)?;
    C::from_parts(kind, params)
}

fn parse_kind<T>(raw: &str) -> Result<T>
where
    T: FromStr,
    <T as FromStr>::Err: std::fmt::Display,
{
    for cand in candidate_spellings(raw) {
        if let Ok(parsed) = cand.parse::<T>() {
            return Ok(parsed);
        }
    }
    Err(anyhow!("could not parse value '{raw}'"))
}

fn candidate_spellings(input: &str) -> Vec<String> {
    let mut out = Vec::new();
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return out;
    }

    out.push(trimmed.to_string());
    out.push(trimmed.to_lowercase());
    out.push(kebab_from_token(trimmed));
    out.push(trimmed.replace('_', "-").to_lowercase());
    out.sort();
    out.dedup();
    out
}

fn kebab_from_token(token: &str) -> String {
    let mut buf = String::new();
    let mut prev_lower = false;
    for ch in token.chars() {
        if ch.is_uppercase() {
            if prev_lower {
                buf.push('-');
            }
            buf.extend(ch.to_lowercase());
            prev_lower = false;
        } else if ch == '_' {
            buf.push('-');
            prev_lower = false;
        } else {
            buf.push(ch);
            prev_lower = ch.is_lowercase();
        }
    }
    buf
}

fn parse_dump_format(input: &str) -> Result<DumpFormat> {
    match input.trim().to_lowercase().as_str() {
        "csv" => Ok(DumpFormat::Csv),
        "tsv" => Ok(DumpFormat::Tsv),
        "json" => Ok(DumpFormat::Json),
        other => Err(anyhow!("unknown format '{other}'")),
    }
}

fn apply_overrides(target: &mut Value, overrides: &[KeyValue]) -> Result<()> {
    for kv in overrides {
        set_path(target, &kv.key, kv.value.clone())
            .with_context(|| format!("failed to set '{}'", kv.key))?;
    }
    Ok(())
}

fn set_path(target: &mut Value, path: &str, new_value: Value) -> Result<()> {
    let segments: Vec<&str> = path.split('.').filter(|s| !s.is_empty()).collect();
    let Some((last, parents)) = segments.split_last() else {
        bail!("empty key is not allowed");
    };

    let mut current = target;
    for seg in parents {
        current = ensure_object(current)?
            .entry((*seg).to_string())
            .or_insert(Value::Null);
    }

    ensure_object(current)?.insert((*last).to_string(), new_value);
    Ok(())
}

fn ensure_object(value: &mut Value) -> Result<&mut Map<String, Value>> {
    if value.is_null() {
        *value = Value::Object(Map::new());
    }
    match value {
        Value::Object(map) => Ok(map),
        other => bail!("cannot set nested field on non-object value: {other:?}"),
    }
}

fn parse_key_value(raw: &str) -> Result<KeyValue, String> {
    let (key, value) = raw
        .split_once('=')
        .ok_or_else(|| "expected KEY=VALUE".to_string())?;
    let key = key.trim();
    if key.is_empty() {
        return Err("key cannot be empty".to_string());
    }

    Ok(KeyValue {
        key: key.to_string(),
        value: parse_literal(value.trim()),
    })
}

/// JSON literal when it parses as one, plain string otherwise.
fn parse_literal(raw: &str) -> Value {
    if raw.is_empty() {
        return Value::String(String::new());
    }
    serde_json::from_str(raw).unwrap_or_else(|_| Value::String(raw.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn parse(args: &[&str]) -> Cli {
        Cli::try_parse_from(std::iter::once("figtao").chain(args.iter().copied())).unwrap()
    }

    #[test]
    fn key_value_parses_json_literals_and_strings() {
        let kv = parse_key_value("max_rules=5").unwrap();
        assert_eq!(kv.key, "max_rules");
        assert_eq!(kv.value, json!(5));

        let kv = parse_key_value("task = regression").unwrap();
        assert_eq!(kv.value, json!("regression"));

        let kv = parse_key_value("max_interaction_order=null").unwrap();
        assert_eq!(kv.value, Value::Null);

        assert!(parse_key_value("no-equals").is_err());
        assert!(parse_key_value("=1").is_err());
    }

    #[test]
    fn set_path_creates_nested_objects() {
        let mut v = json!({"initial_tree": null});
        set_path(&mut v, "initial_tree.max_depth", json!(3)).unwrap();
        assert_eq!(v, json!({"initial_tree": {"max_depth": 3}}));

        assert!(set_path(&mut v, "", json!(1)).is_err());
        assert!(set_path(&mut v, "initial_tree.max_depth.deeper", json!(1)).is_err());
    }

    #[test]
    fn candidate_spellings_cover_common_forms() {
        let c = candidate_spellings("FitEvaluate");
        assert!(c.contains(&"fit-evaluate".to_string()));
        let c = candidate_spellings("fit_evaluate");
        assert!(c.contains(&"fit-evaluate".to_string()));
        assert!(candidate_spellings("   ").is_empty());
    }

    #[test]
    fn run_args_build_a_configured_task() {
        let cli = parse(&[
            "run",
            "--learner",
            "TAO",
            "--dataset",
            "train.json",
            "--learner-param",
            "n_iters=3",
            "--learner-param",
            "initial_tree.max_leaf_nodes=4",
            "--dump-format",
            "CSV",
        ]);
        let Command::Run(run) = cli.command else {
            panic!("expected run");
        };

        let TaskChoice::FitEvaluate(params) = run.into_task_choice().unwrap();
        assert_eq!(params.dump_format, DumpFormat::Csv);
        assert_eq!(params.dataset, PathBuf::from("train.json"));
        match params.learner {
            LearnerChoice::Tao(p) => {
                assert_eq!(p.n_iters, 3);
                assert_eq!(p.initial_tree.max_leaf_nodes, Some(4));
                assert_eq!(p.initial_tree.min_samples_split, 2);
            }
            other => panic!("unexpected learner {other:?}"),
        }
    }

    #[test]
    fn bad_learner_param_is_reported() {
        let cli = parse(&[
            "run",
            "--learner",
            "figs",
            "--dataset",
            "d.json",
            "--learner-param",
            "max_interaction_order=0",
        ]);
        let Command::Run(run) = cli.command else {
            panic!("expected run");
        };
        let err = run.into_task_choice().unwrap_err();
        assert!(format!("{err:#}").contains("max_interaction_order"));
    }

    #[test]
    fn unknown_dump_format_is_rejected() {
        let cli = parse(&[
            "run",
            "--learner",
            "figs",
            "--dataset",
            "d.json",
            "--dump-format",
            "xml",
        ]);
        let Command::Run(run) = cli.command else {
            panic!("expected run");
        };
        assert!(run.into_task_choice().is_err());
    }

    #[test]
    fn describe_accepts_loose_spelling_and_global_log_level() {
        let cli = parse(&["describe", "--learner", "Figs", "--log-level", "debug"]);
        assert_eq!(cli.log_level.as_deref(), Some("debug"));
        let Command::Describe(d) = cli.command else {
            panic!("expected describe");
        };
        assert_eq!(d.learner_kind().unwrap(), LearnerKind::Figs);
    }
}
