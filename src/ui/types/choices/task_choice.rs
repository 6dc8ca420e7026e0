use crate::evaluation::ReportFormat;
use crate::ui::types::choices::LearnerChoice;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use strum_macros::{Display, EnumDiscriminants, EnumIter, EnumMessage, EnumString, IntoStaticStr};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DumpFormat {
    Csv,
    Tsv,
    #[default]
    Json,
}

impl From<DumpFormat> for ReportFormat {
    fn from(value: DumpFormat) -> Self {
        match value {
            DumpFormat::Csv => ReportFormat::Csv,
            DumpFormat::Tsv => ReportFormat::Tsv,
            DumpFormat::Json => ReportFormat::Json,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FitEvaluateParams {
    pub learner: LearnerChoice,
    pub dataset: PathBuf,
    #[serde(default)]
    pub test_dataset: Option<PathBuf>,
    #[serde(default)]
    pub dump_file: Option<PathBuf>,
    #[serde(default)]
    pub dump_format: DumpFormat,
}

#[derive(Debug, Clone, Serialize, Deserialize, EnumDiscriminants)]
#[serde(tag = "type", content = "params", rename_all = "kebab-case")]
#[strum_discriminants(name(TaskKind))]
#[strum_discriminants(derive(EnumIter, EnumString, Display, IntoStaticStr, EnumMessage))]
#[strum_discriminants(strum(serialize_all = "kebab-case"))]
pub enum TaskChoice {
    #[strum_discriminants(strum(
        message = "Fit and Evaluate",
        detailed_message = "Fit on one dataset, score it and an optional held-out set."
    ))]
    FitEvaluate(FitEvaluateParams),
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ui::types::choices::FigsParams;
    use serde_json::{Value, json};
    use std::str::FromStr;

    #[test]
    fn task_kind_parses_kebab_name() {
        assert_eq!(TaskKind::from_str("fit-evaluate").unwrap(), TaskKind::FitEvaluate);
    }

    #[test]
    fn dump_format_maps_onto_report_format() {
        assert_eq!(ReportFormat::from(DumpFormat::Csv), ReportFormat::Csv);
        assert_eq!(ReportFormat::from(DumpFormat::default()), ReportFormat::Json);
    }

    #[test]
    fn task_choice_round_trips_through_json() {
        let params = json!({
            "learner": {"type": "figs", "params": {"max_rules": 3}},
            "dataset": "train.json",
            "dump_format": "csv"
        });
        let task: TaskChoice =
            serde_json::from_value(json!({"type": "fit-evaluate", "params": params})).unwrap();

        let TaskChoice::FitEvaluate(p) = &task;
        assert_eq!(p.dataset, PathBuf::from("train.json"));
        assert!(p.test_dataset.is_none());
        assert_eq!(p.dump_format, DumpFormat::Csv);
        match &p.learner {
            LearnerChoice::Figs(f) => assert_eq!(
                f,
                &FigsParams {
                    max_rules: Some(3),
                    ..FigsParams::default()
                }
            ),
            other => panic!("unexpected learner {other:?}"),
        }

        let back = serde_json::to_value(&task).unwrap();
        assert_eq!(back.get("type").and_then(Value::as_str), Some("fit-evaluate"));
    }
}
