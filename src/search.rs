//! # Vector search
//!
//! Builds the Atlas `$vectorSearch` aggregation and runs a free-text query
//! end to end.
//!
//! The similarity search itself happens inside MongoDB Atlas; this module
//! only shapes the request and the rows that come back. Results keep the
//! order the engine returns (best score first) and are never re-ranked.
//!
//! ## Flow
//!
//! ```text
//! query text ──blank?──▶ SearchView::EmptyQuery
//!     │
//!     ▼ embed (RETRIEVAL_QUERY)
//!     ├──error──▶ SearchView::EmbeddingFailed
//!     ▼
//! $vectorSearch + $project
//!     ├──error──▶ SearchView::NoResults { error: Some(..) }
//!     ├──empty──▶ SearchView::NoResults { error: None }
//!     ▼
//! SearchView::Results(rows)
//! ```

use mongodb::bson::{Bson, Document, doc};
use serde::{Deserialize, Serialize};
use tracing::{debug, error};

use crate::{
    customer::{
        AGE, ANNUAL_INCOME, CUSTOMER_ID, EMBEDDING_FIELD, FAMILY_SIZE, GENDER, PROFESSION,
        PROFILE_FIELDS, SPENDING_SCORE, WORK_EXPERIENCE,
    },
    embedding::{Embedder, TaskType},
    error::{EmbeddingError, SearchError},
    store::CustomerStore,
};

pub const DEFAULT_NUM_CANDIDATES: u32 = 100;
pub const DEFAULT_LIMIT: u32 = 5;

/// Candidate pool and result count for one search.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SearchOptions {
    pub num_candidates: u32,
    pub limit: u32,
}

impl Default for SearchOptions {
    fn default() -> Self {
        Self {
            num_candidates: DEFAULT_NUM_CANDIDATES,
            limit: DEFAULT_LIMIT,
        }
    }
}

impl SearchOptions {
    /// Clamps both values to at least 1 and the candidate pool to at least
    /// `limit`, which Atlas requires.
    pub fn new(num_candidates: u32, limit: u32) -> Self {
        let limit = limit.max(1);
        Self {
            num_candidates: num_candidates.max(limit),
            limit,
        }
    }
}

/// One `$vectorSearch` request.
#[derive(Debug, Clone, PartialEq)]
pub struct VectorQuery {
    pub vector: Vec<f64>,
    pub index: String,
    pub options: SearchOptions,
}

impl VectorQuery {
    pub fn new(vector: Vec<f64>, index: impl Into<String>, options: SearchOptions) -> Self {
        Self {
            vector,
            index: index.into(),
            options,
        }
    }

    /// The two-stage aggregation: similarity search, then projection of the
    /// profile fields plus the score, without `_id`.
    pub fn pipeline(&self) -> Vec<Document> {
        let query_vector: Vec<Bson> = self
            .vector
            .iter()
            .copied()
            .map(Bson::Double)
            .collect();

        let mut search = Document::new();
        search.insert("index", self.index.as_str());
        search.insert("path", EMBEDDING_FIELD);
        search.insert("queryVector", query_vector);
        search.insert("numCandidates", i64::from(self.options.num_candidates));
        search.insert("limit", i64::from(self.options.limit));

        let mut project = doc! { "score": { "$meta": "vectorSearchScore" } };
        for field in PROFILE_FIELDS {
            project.insert(field, 1);
        }
        project.insert("_id", 0);

        vec![doc! { "$vectorSearch": search }, doc! { "$project": project }]
    }
}

/// A projected customer profile and its similarity score.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchRow {
    pub score: f64,
    #[serde(rename = "CustomerID", default, skip_serializing_if = "Option::is_none")]
    pub customer_id: Option<Bson>,
    #[serde(rename = "Gender", default, skip_serializing_if = "Option::is_none")]
    pub gender: Option<Bson>,
    #[serde(rename = "Age", default, skip_serializing_if = "Option::is_none")]
    pub age: Option<Bson>,
    #[serde(rename = "Annual Income ($)", default, skip_serializing_if = "Option::is_none")]
    pub annual_income: Option<Bson>,
    #[serde(rename = "Spending Score (1-100)", default, skip_serializing_if = "Option::is_none")]
    pub spending_score: Option<Bson>,
    #[serde(rename = "Profession", default, skip_serializing_if = "Option::is_none")]
    pub profession: Option<Bson>,
    #[serde(rename = "Work Experience", default, skip_serializing_if = "Option::is_none")]
    pub work_experience: Option<Bson>,
    #[serde(rename = "Family Size", default, skip_serializing_if = "Option::is_none")]
    pub family_size: Option<Bson>,
}

impl SearchRow {
    /// Decodes a row returned by the `$project` stage.
    ///
    /// # Errors
    ///
    /// Returns [`SearchError::Decode`] if `score` is missing or not a number.
    pub fn from_document(document: Document) -> Result<Self, SearchError> {
        mongodb::bson::from_document(document).map_err(|e| SearchError::Decode(e.to_string()))
    }

    /// Profile fields in display order, paired with their column names.
    pub fn fields(&self) -> [(&'static str, Option<&Bson>); 8] {
        [
            (CUSTOMER_ID, self.customer_id.as_ref()),
            (GENDER, self.gender.as_ref()),
            (AGE, self.age.as_ref()),
            (ANNUAL_INCOME, self.annual_income.as_ref()),
            (SPENDING_SCORE, self.spending_score.as_ref()),
            (PROFESSION, self.profession.as_ref()),
            (WORK_EXPERIENCE, self.work_experience.as_ref()),
            (FAMILY_SIZE, self.family_size.as_ref()),
        ]
    }
}

/// Runs `query` against `store`, degrading to an empty result on failure.
///
/// The error, if any, is handed back alongside the empty rows so the caller
/// can show it.
pub async fn vector_search<S>(store: &S, query: &VectorQuery) -> (Vec<SearchRow>, Option<SearchError>)
where
    S: CustomerStore + ?Sized,
{
    debug!(
        "Vector search on index {} (numCandidates={}, limit={})",
        query.index, query.options.num_candidates, query.options.limit
    );
    match store.vector_search(query).await {
        Ok(rows) => (rows, None),
        Err(err) => {
            error!("Vector Search Error: {}", err);
            (Vec::new(), Some(err))
        }
    }
}

/// Everything a single search interaction can end in.
#[derive(Debug)]
pub enum SearchView {
    /// Blank input; nothing was sent anywhere.
    EmptyQuery,
    /// The query could not be embedded.
    EmbeddingFailed(EmbeddingError),
    /// No rows, either because nothing matched or because the search failed.
    NoResults { error: Option<SearchError> },
    /// Rows in engine order.
    Results(Vec<SearchRow>),
}

impl SearchView {
    /// True when the request itself went wrong, as opposed to matching nothing.
    pub fn is_failure(&self) -> bool {
        matches!(
            self,
            SearchView::EmbeddingFailed(_) | SearchView::NoResults { error: Some(_) }
        )
    }
}

/// Input that is empty once surrounding whitespace is removed.
pub fn is_blank_query(query_text: &str) -> bool {
    query_text.trim().is_empty()
}

/// Embeds `query_text` and searches for the closest customer profiles.
///
/// Blank input short-circuits before any external call. Every call embeds
/// afresh; nothing is cached between searches.
pub async fn run_search<E, S>(
    query_text: &str,
    embedder: &E,
    store: &S,
    index: &str,
    options: SearchOptions,
) -> SearchView
where
    E: Embedder + ?Sized,
    S: CustomerStore + ?Sized,
{
    if is_blank_query(query_text) {
        return SearchView::EmptyQuery;
    }
    let query_text = query_text.trim();

    let vector = match embedder.embed(query_text, TaskType::RetrievalQuery).await {
        Ok(vector) => vector,
        Err(err) => {
            error!("Embedding Error: {}", err);
            return SearchView::EmbeddingFailed(err);
        }
    };

    let query = VectorQuery::new(vector, index, options);
    let (rows, error) = vector_search(store, &query).await;

    if rows.is_empty() {
        SearchView::NoResults { error }
    } else {
        SearchView::Results(rows)
    }
}
