//! In-memory doubles for [`Embedder`] and [`CustomerStore`].

use std::sync::Mutex;

use async_trait::async_trait;
use futures::{StreamExt, stream};
use mongodb::bson::{Bson, Document, doc};

use crate::{
    customer::EMBEDDING_FIELD,
    embedding::{Embedder, TaskType},
    error::{EmbeddingError, SearchError, StoreError, WriteError},
    search::{SearchRow, VectorQuery},
    store::{CustomerStore, RecordStream},
};

/// Returns a deterministic vector per text and fails on scripted inputs.
#[derive(Default)]
pub struct FakeEmbedder {
    failing: Vec<String>,
    fixed: Option<Vec<f64>>,
    calls: Mutex<Vec<(String, TaskType)>>,
}

impl FakeEmbedder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fail every request whose text contains `pattern`.
    pub fn failing_on(mut self, pattern: impl Into<String>) -> Self {
        self.failing.push(pattern.into());
        self
    }

    /// Return `vector` for every request instead of the per-text one.
    pub fn returning(mut self, vector: Vec<f64>) -> Self {
        self.fixed = Some(vector);
        self
    }

    pub fn vector_for(text: &str) -> Vec<f64> {
        vec![text.len() as f64, 1.0, -1.0]
    }

    pub fn calls(&self) -> Vec<(String, TaskType)> {
        self.calls.lock().unwrap().clone()
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }
}

#[async_trait]
impl Embedder for FakeEmbedder {
    async fn embed(&self, text: &str, task_type: TaskType) -> Result<Vec<f64>, EmbeddingError> {
        self.calls.lock().unwrap().push((text.to_string(), task_type));
        if self.failing.iter().any(|p| text.contains(p.as_str())) {
            return Err(EmbeddingError::Api {
                status: 500,
                message: "forced embedding failure".to_string(),
            });
        }
        Ok(self.fixed.clone().unwrap_or_else(|| Self::vector_for(text)))
    }
}

/// A collection held in a `Vec`, honouring the missing-embedding selection
/// and `$set` semantics.
#[derive(Default)]
pub struct FakeStore {
    records: Mutex<Vec<Document>>,
    search_rows: Vec<SearchRow>,
    fail_search: bool,
    fail_writes: Vec<Bson>,
    scan_error_after: Option<usize>,
    queries: Mutex<Vec<VectorQuery>>,
}

impl FakeStore {
    pub fn new(records: Vec<Document>) -> Self {
        Self {
            records: Mutex::new(records),
            ..Self::default()
        }
    }

    pub fn with_search_rows(mut self, rows: Vec<SearchRow>) -> Self {
        self.search_rows = rows;
        self
    }

    pub fn failing_search(mut self) -> Self {
        self.fail_search = true;
        self
    }

    pub fn failing_write_for(mut self, id: impl Into<Bson>) -> Self {
        self.fail_writes.push(id.into());
        self
    }

    /// Yield a scan error once `n` records have been streamed.
    pub fn scan_error_after(mut self, n: usize) -> Self {
        self.scan_error_after = Some(n);
        self
    }

    pub fn records(&self) -> Vec<Document> {
        self.records.lock().unwrap().clone()
    }

    pub fn embedded_ids(&self) -> Vec<Bson> {
        self.records()
            .into_iter()
            .filter(|r| r.contains_key(EMBEDDING_FIELD))
            .filter_map(|r| r.get("_id").cloned())
            .collect()
    }

    pub fn search_count(&self) -> usize {
        self.queries.lock().unwrap().len()
    }

    pub fn last_query(&self) -> Option<VectorQuery> {
        self.queries.lock().unwrap().last().cloned()
    }
}

#[async_trait]
impl CustomerStore for FakeStore {
    async fn pending_records(&self) -> Result<RecordStream<'_>, StoreError> {
        let mut pending: Vec<Result<Document, StoreError>> = self
            .records()
            .into_iter()
            .filter(|r| !r.contains_key(EMBEDDING_FIELD))
            .map(Ok)
            .collect();
        if let Some(n) = self.scan_error_after {
            pending.truncate(n);
            pending.push(Err(StoreError::Scan("forced cursor failure".to_string())));
        }
        Ok(stream::iter(pending).boxed())
    }

    async fn set_embedding(&self, id: &Bson, vector: &[f64]) -> Result<(), WriteError> {
        if self.fail_writes.contains(id) {
            return Err(WriteError::Other("forced write failure".to_string()));
        }
        let mut records = self.records.lock().unwrap();
        let record = records
            .iter_mut()
            .find(|r| r.get("_id") == Some(id))
            .ok_or_else(|| WriteError::NotFound(id.to_string()))?;
        let values: Vec<Bson> = vector.iter().copied().map(Bson::Double).collect();
        record.insert(EMBEDDING_FIELD, values);
        Ok(())
    }

    async fn vector_search(&self, query: &VectorQuery) -> Result<Vec<SearchRow>, SearchError> {
        self.queries.lock().unwrap().push(query.clone());
        if self.fail_search {
            return Err(SearchError::Other("forced search failure".to_string()));
        }
        Ok(self
            .search_rows
            .iter()
            .take(query.options.limit as usize)
            .cloned()
            .collect())
    }
}

/// A customer record keyed by an integer `_id`.
pub fn customer(id: i32, profession: &str) -> Document {
    doc! {
        "_id": id,
        "CustomerID": id,
        "Gender": "Female",
        "Age": 30 + id,
        "Annual Income ($)": 40000 + id * 1000,
        "Spending Score (1-100)": 50,
        "Profession": profession,
        "Work Experience": 4,
        "Family Size": 2,
    }
}

/// A search row for customer `id`.
pub fn row(score: f64, id: i32) -> SearchRow {
    SearchRow {
        score,
        customer_id: Some(Bson::Int32(id)),
        gender: Some(Bson::String("Female".to_string())),
        age: Some(Bson::Int32(30 + id)),
        annual_income: Some(Bson::Int32(40000 + id * 1000)),
        spending_score: Some(Bson::Int32(50)),
        profession: Some(Bson::String("Engineer".to_string())),
        work_experience: Some(Bson::Int32(4)),
        family_size: Some(Bson::Int32(2)),
    }
}
