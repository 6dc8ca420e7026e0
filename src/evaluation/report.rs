use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt::{Display, Formatter, Result as FmtResult};
use std::fs::File;
use std::io::{BufWriter, Error, Write};
use std::path::Path;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReportFormat {
    Csv,
    Tsv,
    Json,
}

/// Outcome of one fit: model size, timing and per-output scores.
#[derive(Debug, Clone, Serialize)]
pub struct FitReport {
    pub learner: String,
    pub started_at: String,
    pub seconds: f64,
    pub complexity: usize,
    pub model_bytes: usize,
    pub train_scores: Vec<f64>,
    pub test_scores: Option<Vec<f64>>,
    pub extras: BTreeMap<String, f64>,
}

impl FitReport {
    #[inline]
    fn fmtv(v: f64) -> String {
        if v.is_nan() {
            "NaN".into()
        } else {
            format!("{:.6}", v)
        }
    }

    fn fmt_scores(scores: &[f64]) -> String {
        scores
            .iter()
            .map(|s| Self::fmtv(*s))
            .collect::<Vec<_>>()
            .join("/")
    }

    pub fn export(&self, path: &Path, format: ReportFormat) -> Result<(), Error> {
        let mut out = BufWriter::new(File::create(path)?);
        match format {
            ReportFormat::Json => {
                serde_json::to_writer_pretty(&mut out, self)?;
                writeln!(out)?;
            }
            ReportFormat::Csv => self.write_delimited(&mut out, ',')?,
            ReportFormat::Tsv => self.write_delimited(&mut out, '\t')?,
        }
        out.flush()
    }

    fn write_delimited<W: Write>(&self, out: &mut W, sep: char) -> Result<(), Error> {
        let mut header = vec![
            "learner".to_string(),
            "started_at".to_string(),
            "seconds".to_string(),
            "complexity".to_string(),
            "model_bytes".to_string(),
        ];
        let mut row = vec![
            self.learner.clone(),
            self.started_at.clone(),
            Self::fmtv(self.seconds),
            self.complexity.to_string(),
            self.model_bytes.to_string(),
        ];
        for (i, s) in self.train_scores.iter().enumerate() {
            header.push(format!("train_score_{i}"));
            row.push(Self::fmtv(*s));
        }
        if let Some(test) = &self.test_scores {
            for (i, s) in test.iter().enumerate() {
                header.push(format!("test_score_{i}"));
                row.push(Self::fmtv(*s));
            }
        }
        for (k, v) in &self.extras {
            header.push(k.clone());
            row.push(Self::fmtv(*v));
        }
        let sep = sep.to_string();
        writeln!(out, "{}", header.join(&sep))?;
        writeln!(out, "{}", row.join(&sep))
    }
}

impl Display for FitReport {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        write!(
            f,
            "learner={}, complexity={}, bytes={}, t={:.6}s, train={}",
            self.learner,
            self.complexity,
            self.model_bytes,
            self.seconds,
            Self::fmt_scores(&self.train_scores)
        )?;
        if let Some(test) = &self.test_scores {
            write!(f, ", test={}", Self::fmt_scores(test))?;
        }
        for (k, v) in self.extras.iter() {
            write!(f, ", {}={}", k, Self::fmtv(*v))?;
        }
        Ok(())
    }
}
