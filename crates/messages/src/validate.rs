//! Post-transform checks on outgoing messages.
//!
//! Transformers call [`Validate::validate`] on every message they build before
//! handing it back. A failure here means the transformer itself produced bad
//! data, not that the publisher sent bad input.
use std::collections::HashSet;

use crate::error::ValidationError;
use crate::types::{
    BatchData, ContentItem, JobNotificationMessage, PhaseProgress, Progress,
    ProjectNotificationMessage, ProjectPhaseNotificationMessage,
};

/// A message that can check its own invariants.
pub trait Validate {
    fn validate(&self) -> Result<(), ValidationError>;
}

fn check_percent(field: &str, value: f64) -> Result<(), ValidationError> {
    if !value.is_finite() || !(0.0..=100.0).contains(&value) {
        return Err(ValidationError::invalid_value(
            field,
            format!("{value} is outside [0, 100]"),
        ));
    }
    Ok(())
}

impl Validate for Progress {
    fn validate(&self) -> Result<(), ValidationError> {
        check_percent("progress.percentage", self.percentage)?;
        if !self.eta.is_finite() || self.eta < 0.0 {
            return Err(ValidationError::invalid_value(
                "progress.eta",
                format!("{} is negative", self.eta),
            ));
        }
        Ok(())
    }
}

impl Validate for PhaseProgress {
    fn validate(&self) -> Result<(), ValidationError> {
        check_percent("progress_percent", self.progress_percent)
    }
}

impl Validate for ProjectNotificationMessage {
    fn validate(&self) -> Result<(), ValidationError> {
        if let Some(progress) = &self.progress {
            progress.validate()?;
        }
        Ok(())
    }
}

impl Validate for ProjectPhaseNotificationMessage {
    fn validate(&self) -> Result<(), ValidationError> {
        let payload = &self.payload;
        if payload.project_id.is_empty() {
            return Err(ValidationError::MissingField("payload.project_id".into()));
        }
        check_percent(
            "payload.overall_progress_percent",
            payload.overall_progress_percent,
        )?;
        if let Some(crawl) = &payload.crawl {
            crawl.validate()?;
        }
        if let Some(analyze) = &payload.analyze {
            analyze.validate()?;
        }
        Ok(())
    }
}

impl Validate for ContentItem {
    fn validate(&self) -> Result<(), ValidationError> {
        if self.id.is_empty() {
            return Err(ValidationError::MissingField("content.id".into()));
        }
        if !self.metrics.rate.is_finite() {
            return Err(ValidationError::invalid_value(
                "content.metrics.rate",
                "must be a finite number",
            ));
        }
        Ok(())
    }
}

impl Validate for BatchData {
    fn validate(&self) -> Result<(), ValidationError> {
        let mut seen = HashSet::with_capacity(self.content_list.len());
        for item in &self.content_list {
            item.validate()?;
            if !seen.insert(item.id.as_str()) {
                return Err(ValidationError::invalid_value(
                    "batch.content_list",
                    format!("duplicate content id {}", item.id),
                ));
            }
        }
        Ok(())
    }
}

impl Validate for JobNotificationMessage {
    fn validate(&self) -> Result<(), ValidationError> {
        if let Some(progress) = &self.progress {
            progress.validate()?;
        }
        if let Some(batch) = &self.batch {
            batch.validate()?;
        }
        Ok(())
    }
}
