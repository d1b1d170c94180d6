use std::collections::HashSet;
use std::sync::Arc;
use std::time::Instant;

use messages::{
    Author, AuthorInput, BatchData, BatchInput, ContentInput, ContentItem, ContentMetrics,
    JobInputMessage, JobNotificationMessage, Media, MediaInput, MessageValidator, MetricsInput,
    Validate,
};
use tracing::{debug, warn};

use crate::category::{ErrorType, MessageType};
use crate::error::TransformError;
use crate::metrics::TransformMetrics;
use crate::normalize::transform_progress;
use crate::project::decode;

/// Converts validated job payloads into client notifications.
pub struct JobTransformer {
    validator: Arc<dyn MessageValidator>,
    metrics: Arc<dyn TransformMetrics>,
}

impl JobTransformer {
    pub fn new(validator: Arc<dyn MessageValidator>, metrics: Arc<dyn TransformMetrics>) -> Self {
        Self { validator, metrics }
    }

    pub fn transform(&self, payload: &[u8]) -> Result<JobNotificationMessage, TransformError> {
        let started = Instant::now();

        self.validator.validate_job_input(payload).map_err(|err| {
            self.metrics
                .record_error(MessageType::Job, ErrorType::Validation);
            TransformError::from(err)
        })?;

        let input: JobInputMessage = decode(MessageType::Job, payload).inspect_err(|_| {
            self.metrics
                .record_error(MessageType::Job, ErrorType::JsonParse);
        })?;

        let output = self.transform_input(input)?;

        let elapsed = started.elapsed();
        self.metrics.record_success(MessageType::Job, elapsed);
        debug!(
            platform = output.platform.as_str(),
            elapsed_micros = elapsed.as_micros() as u64,
            "job_transformed"
        );
        Ok(output)
    }

    /// Map a decoded job message and check the result.
    pub fn transform_input(
        &self,
        input: JobInputMessage,
    ) -> Result<JobNotificationMessage, TransformError> {
        let output = JobNotificationMessage {
            platform: input.platform,
            status: input.status,
            progress: input.progress.map(transform_progress),
            batch: input.batch.map(transform_batch),
        };
        output.validate().map_err(|source| {
            self.metrics
                .record_error(MessageType::Job, ErrorType::OutputValidation);
            TransformError::OutputValidation {
                message_type: MessageType::Job,
                source,
            }
        })?;
        Ok(output)
    }
}

fn transform_batch(input: BatchInput) -> BatchData {
    let content_list = input.content_list.unwrap_or_default();
    let (content_list, duplicates) = dedup_content(content_list);
    if duplicates > 0 {
        warn!(
            keyword = %input.keyword,
            duplicates,
            kept = content_list.len(),
            "duplicate_content_dropped"
        );
    }
    BatchData {
        keyword: input.keyword,
        content_list,
        crawled_at: input.crawled_at,
    }
}

/// Drop items whose `id` was already seen; the first occurrence wins and
/// order is preserved. Returns the kept items and the number dropped.
pub fn dedup_content(items: Vec<ContentInput>) -> (Vec<ContentItem>, usize) {
    let mut seen = HashSet::with_capacity(items.len());
    let mut kept = Vec::with_capacity(items.len());
    let mut duplicates = 0;
    for item in items {
        if seen.contains(&item.id) {
            debug!(content_id = %item.id, "duplicate_content_skipped");
            duplicates += 1;
            continue;
        }
        seen.insert(item.id.clone());
        kept.push(transform_content(item));
    }
    (kept, duplicates)
}

fn transform_content(input: ContentInput) -> ContentItem {
    ContentItem {
        id: input.id,
        text: input.text,
        author: transform_author(input.author),
        metrics: transform_metrics(input.metrics),
        media: input.media.map(transform_media),
        published_at: input.published_at,
        permalink: input.permalink,
    }
}

fn transform_author(input: AuthorInput) -> Author {
    Author {
        id: input.id,
        username: input.username,
        name: input.name,
        followers: input.followers,
        is_verified: input.is_verified,
        avatar_url: input.avatar_url,
    }
}

fn transform_metrics(input: MetricsInput) -> ContentMetrics {
    ContentMetrics {
        views: input.views,
        likes: input.likes,
        comments: input.comments,
        shares: input.shares,
        rate: input.rate,
    }
}

fn transform_media(input: MediaInput) -> Media {
    Media {
        media_type: input.media_type,
        duration: input.duration,
        thumbnail: input.thumbnail,
        url: input.url,
    }
}
