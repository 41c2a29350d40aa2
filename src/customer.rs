//! # Customer records
//!
//! Field names of the customer collection and the sentence that gets
//! embedded for each record.
//!
//! Records are read as raw [`Document`]s because the collection is created
//! outside this tool and its numeric columns are not guaranteed to share a
//! BSON type (an income might be an `Int32` in one row and a `Double` in the
//! next). [`render_bson`] turns any scalar into the text a person would write.
//!
//! ```
//! use mongodb::bson::doc;
//! use profile_search::customer::describe_customer;
//!
//! let record = doc! { "Gender": "Female", "Profession": "Artist" };
//! let text = describe_customer(&record);
//! assert!(text.starts_with("Customer Profile: Gender is Female, Age is N/A."));
//! ```

use mongodb::bson::{Bson, Document};

pub const CUSTOMER_ID: &str = "CustomerID";
pub const GENDER: &str = "Gender";
pub const AGE: &str = "Age";
pub const ANNUAL_INCOME: &str = "Annual Income ($)";
pub const SPENDING_SCORE: &str = "Spending Score (1-100)";
pub const PROFESSION: &str = "Profession";
pub const WORK_EXPERIENCE: &str = "Work Experience";
pub const FAMILY_SIZE: &str = "Family Size";

/// Field that receives the document embedding.
pub const EMBEDDING_FIELD: &str = "embedding_vector";

/// Placeholder for absent text fields.
pub const TEXT_PLACEHOLDER: &str = "N/A";
/// Placeholder for absent numeric fields.
pub const NUMBER_PLACEHOLDER: &str = "0";

/// Fields projected into search results, in display order.
pub const PROFILE_FIELDS: [&str; 8] = [
    CUSTOMER_ID,
    GENDER,
    AGE,
    ANNUAL_INCOME,
    SPENDING_SCORE,
    PROFESSION,
    WORK_EXPERIENCE,
    FAMILY_SIZE,
];

/// Builds the natural-language description that is embedded for a record.
///
/// Absent (or `null`) fields fall back to `N/A` for gender, age and
/// profession, and to `0` for the remaining numeric columns.
pub fn describe_customer(record: &Document) -> String {
    let text = |key| field_or(record, key, TEXT_PLACEHOLDER);
    let number = |key| field_or(record, key, NUMBER_PLACEHOLDER);

    format!(
        "Customer Profile: Gender is {}, Age is {}. Annual income is ${}. Spending score is {}. Profession: {}. Work experience: {} years. Family size: {}.",
        text(GENDER),
        text(AGE),
        number(ANNUAL_INCOME),
        number(SPENDING_SCORE),
        text(PROFESSION),
        number(WORK_EXPERIENCE),
        number(FAMILY_SIZE),
    )
}

fn field_or(record: &Document, key: &str, placeholder: &str) -> String {
    match record.get(key) {
        None | Some(Bson::Null) | Some(Bson::Undefined) => placeholder.to_string(),
        Some(value) => render_bson(value),
    }
}

/// Renders a BSON value as plain text.
///
/// Strings lose their quotes, whole doubles keep a trailing `.0`, `null`
/// becomes the empty string. Anything that is not a scalar falls back to its
/// extended-JSON form.
pub fn render_bson(value: &Bson) -> String {
    match value {
        Bson::String(s) => s.clone(),
        Bson::Int32(n) => n.to_string(),
        Bson::Int64(n) => n.to_string(),
        Bson::Double(f) if f.is_finite() && f.fract() == 0.0 => format!("{f:.1}"),
        Bson::Double(f) => f.to_string(),
        Bson::Boolean(b) => b.to_string(),
        Bson::ObjectId(id) => id.to_hex(),
        Bson::Null | Bson::Undefined => String::new(),
        other => other.to_string(),
    }
}
