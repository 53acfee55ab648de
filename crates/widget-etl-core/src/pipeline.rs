//! Fixed stage sequence of the transform pipeline
//!
//! `deduplicate → rank_users → flatten_widget_list → extract_widget_info`,
//! followed by `convert_unsupported_types`. The top-user report forks off the
//! ranked batch and does not feed later stages. A run can start after any
//! stage, for re-entering from a snapshot.

use std::str::FromStr;

use crate::batch::{Batch, Columnar, FlatTable};
use crate::error::Result;
use crate::transform;
use crate::types::TopUser;

/// A batch-producing stage
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Stage {
    Deduplicated,
    Ranked,
    Flattened,
    WidgetInfo,
}

impl Stage {
    pub const ALL: [Stage; 4] = [
        Stage::Deduplicated,
        Stage::Ranked,
        Stage::Flattened,
        Stage::WidgetInfo,
    ];

    /// Name used for logs and snapshot files
    pub fn name(&self) -> &'static str {
        match self {
            Stage::Deduplicated => "deduplicated",
            Stage::Ranked => "ranked",
            Stage::Flattened => "flattened",
            Stage::WidgetInfo => "widget_info",
        }
    }

    pub fn apply(&self, batch: &Batch) -> Result<Batch> {
        match self {
            Stage::Deduplicated => transform::deduplicate(batch),
            Stage::Ranked => transform::rank_users(batch),
            Stage::Flattened => transform::flatten_widget_list(batch),
            Stage::WidgetInfo => transform::extract_widget_info(batch),
        }
    }
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

impl FromStr for Stage {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Stage::ALL
            .iter()
            .copied()
            .find(|stage| stage.name() == s.replace('-', "_"))
            .ok_or_else(|| {
                let names: Vec<&str> = Stage::ALL.iter().map(|st| st.name()).collect();
                format!("unknown stage '{}' (expected one of: {})", s, names.join(", "))
            })
    }
}

/// Everything a pipeline run produces before persistence
#[derive(Debug, Clone)]
pub struct PipelineOutput {
    /// Rows handed to the first executed stage
    pub input_rows: usize,
    /// Row count after each executed stage
    pub stage_rows: Vec<(Stage, usize)>,
    /// `None` when the run started after ranking
    pub top_users: Option<Vec<TopUser>>,
    /// Final flat table, ready for storage and indexing
    pub transformed: FlatTable,
}

impl PipelineOutput {
    pub fn rows_after(&self, stage: Stage) -> Option<usize> {
        self.stage_rows
            .iter()
            .find(|(s, _)| *s == stage)
            .map(|(_, n)| *n)
    }
}

/// Pipeline runner
#[derive(Debug, Clone, Copy, Default)]
pub struct Pipeline {
    resume_after: Option<Stage>,
}

impl Pipeline {
    pub fn new() -> Self {
        Self::default()
    }

    /// Skip every stage up to and including `stage`
    pub fn resume_after(mut self, stage: Stage) -> Self {
        self.resume_after = Some(stage);
        self
    }

    pub fn stages(&self) -> Vec<Stage> {
        Stage::ALL
            .iter()
            .copied()
            .filter(|s| self.resume_after.map_or(true, |after| *s > after))
            .collect()
    }

    pub fn run(&self, batch: &Batch) -> Result<PipelineOutput> {
        self.run_with(batch, |_, _| Ok(()))
    }

    /// Run all stages, calling `on_stage` with each stage's output batch
    pub fn run_with<F>(&self, batch: &Batch, mut on_stage: F) -> Result<PipelineOutput>
    where
        F: FnMut(Stage, &Batch) -> Result<()>,
    {
        let mut current = batch.clone();
        let mut stage_rows = Vec::new();
        let mut top_users = None;

        for stage in self.stages() {
            current = stage.apply(&current)?;
            stage_rows.push((stage, current.len()));

            if stage == Stage::Ranked {
                top_users = Some(transform::get_top_user_per_age_group(&current)?);
            }

            on_stage(stage, &current)?;
        }

        let transformed = transform::convert_unsupported_types(&current)?;

        Ok(PipelineOutput {
            input_rows: batch.len(),
            stage_rows,
            top_users,
            transformed,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::EtlError;
    use crate::types::Scalar;
    use serde_json::{json, Map, Value};

    fn batch(values: Vec<Value>) -> Batch {
        let objects: Vec<Map<String, Value>> = values
            .into_iter()
            .map(|v| v.as_object().cloned().unwrap())
            .collect();
        Batch::from_objects(&objects).unwrap()
    }

    fn raw() -> Batch {
        batch(vec![
            json!({"id": 1, "created_at": "t1", "age_group": "18-24", "user_score": 4,
                   "email": "a@x.com", "location": "NY",
                   "widget_list": [{"name": "a", "amount": 1}, {"name": "b", "amount": 2}]}),
            json!({"id": 1, "created_at": "t1", "age_group": "18-24", "user_score": 4,
                   "email": "a@x.com", "location": "NY",
                   "widget_list": [{"name": "a", "amount": 1}, {"name": "b", "amount": 2}]}),
            json!({"id": 2, "created_at": "t2", "age_group": "18-24", "user_score": 9,
                   "email": "b@x.com", "location": "LA", "widget_list": []}),
            json!({"id": 3, "created_at": "t3", "age_group": "25-34", "user_score": 5,
                   "email": "c@x.com", "location": "NY",
                   "widget_list": [{"name": "c", "amount": 3}]}),
        ])
    }

    #[test]
    fn test_full_run() {
        let mut seen = Vec::new();
        let output = Pipeline::new()
            .run_with(&raw(), |stage, batch| {
                seen.push((stage, batch.len()));
                Ok(())
            })
            .unwrap();

        assert_eq!(output.input_rows, 4);
        assert_eq!(output.rows_after(Stage::Deduplicated), Some(3));
        assert_eq!(output.rows_after(Stage::Flattened), Some(3));
        assert_eq!(seen, output.stage_rows);

        let top: Vec<&Scalar> = output
            .top_users
            .as_ref()
            .unwrap()
            .iter()
            .map(|u| &u.id)
            .collect();
        assert_eq!(top, vec![&Scalar::Int(2), &Scalar::Int(3)]);

        let transformed = &output.transformed;
        assert!(transformed.has_column("age_group_rank"));
        assert!(transformed.has_column("widget_name"));
        assert_eq!(
            transformed.column("widget_name"),
            Some(vec![&Scalar::from("a"), &Scalar::from("b"), &Scalar::from("c")])
        );
    }

    #[test]
    fn test_resume_after_skips_earlier_stages() {
        let flattened = transform::flatten_widget_list(&raw()).unwrap();
        let pipeline = Pipeline::new().resume_after(Stage::Flattened);
        assert_eq!(pipeline.stages(), vec![Stage::WidgetInfo]);

        let output = pipeline.run(&flattened).unwrap();
        assert!(output.top_users.is_none());
        assert_eq!(output.transformed.len(), flattened.len());
    }

    #[test]
    fn test_run_propagates_stage_failure() {
        let data = batch(vec![json!({"id": 1, "created_at": "t", "widget_list": []})]);
        let err = Pipeline::new().run(&data).unwrap_err();
        assert!(matches!(err, EtlError::MissingColumn { .. }));
    }

    #[test]
    fn test_stage_from_str() {
        assert_eq!("widget-info".parse::<Stage>(), Ok(Stage::WidgetInfo));
        assert_eq!("ranked".parse::<Stage>(), Ok(Stage::Ranked));
        assert!("exploded".parse::<Stage>().is_err());
    }
}
