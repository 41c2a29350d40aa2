//! # Embedding backfill
//!
//! One-shot batch job that gives every customer record without an
//! `embedding_vector` a document embedding.
//!
//! Records are processed one at a time: describe, embed with
//! [`TaskType::RetrievalDocument`], then a point update by `_id`. A record
//! that fails is logged and skipped; the scan carries on with the next one.
//! Nothing is retried or rolled back. Because selection only picks records
//! without the field, a second run skips everything the first one stored.
//!
//! Running a backfill while searches hit the same collection is not
//! coordinated in any way: nothing locks or versions `embedding_vector`.

use futures::StreamExt;
use indicatif::ProgressBar;
use mongodb::bson::Document;
use thiserror::Error;
use tracing::{error, info};

use crate::{
    customer::{describe_customer, render_bson},
    embedding::{Embedder, TaskType},
    error::{EmbeddingError, StoreError, WriteError},
    store::CustomerStore,
};

/// Outcome of a backfill run.
#[derive(Debug, Default)]
pub struct BackfillReport {
    /// Records that received an embedding.
    pub processed: usize,
    /// Records that were skipped because of an error.
    pub failed: usize,
    /// Set when the scan itself broke off before the end of the collection.
    pub scan_error: Option<StoreError>,
}

#[derive(Debug, Error)]
enum RecordFailure {
    #[error("record has no _id")]
    MissingId,
    #[error(transparent)]
    Embedding(#[from] EmbeddingError),
    #[error(transparent)]
    Write(#[from] WriteError),
}

/// Embeds and stores a vector for every record that lacks one.
///
/// # Errors
///
/// Returns [`StoreError`] only if the scan cannot be started. Failures on
/// individual records are counted in the report, and a scan that breaks off
/// midway is reported through [`BackfillReport::scan_error`].
pub async fn run_backfill<S, E>(
    store: &S,
    embedder: &E,
    progress: &ProgressBar,
) -> Result<BackfillReport, StoreError>
where
    S: CustomerStore + ?Sized,
    E: Embedder + ?Sized,
{
    info!("Scanning for records without an embedding");
    let mut records = store.pending_records().await?;
    let mut report = BackfillReport::default();

    while let Some(next) = records.next().await {
        let record = match next {
            Ok(record) => record,
            Err(err) => {
                error!("Scan aborted: {}", err);
                report.scan_error = Some(err);
                break;
            }
        };

        let label = record_label(&record);
        match process_record(store, embedder, &record).await {
            Ok(()) => {
                report.processed += 1;
                info!("Processed document {}: {}", report.processed, label);
            }
            Err(err) => {
                report.failed += 1;
                error!("Error processing document {}: {}", label, err);
            }
        }
        progress.set_message(format!(
            "Embedded {} documents ({} failed)",
            report.processed, report.failed
        ));
        progress.tick();
    }

    info!(
        "Finished processing. Added embeddings to {} documents ({} failed).",
        report.processed, report.failed
    );
    Ok(report)
}

async fn process_record<S, E>(store: &S, embedder: &E, record: &Document) -> Result<(), RecordFailure>
where
    S: CustomerStore + ?Sized,
    E: Embedder + ?Sized,
{
    let id = record.get("_id").ok_or(RecordFailure::MissingId)?;
    let text = describe_customer(record);
    let vector = embedder.embed(&text, TaskType::RetrievalDocument).await?;
    store.set_embedding(id, &vector).await?;
    Ok(())
}

fn record_label(record: &Document) -> String {
    record
        .get("_id")
        .map(render_bson)
        .unwrap_or_else(|| "<no _id>".to_string())
}
