//! Training-consistent feature encoding.
//!
//! Categorical columns are encoded as the ordinal position of the raw
//! value in the column's persisted category list. Values unseen at
//! training time, and missing cells, encode to [`UNSEEN_CATEGORY`].
//! Columns without a category list are numeric and pass through; missing
//! or unparseable numeric cells become `NaN`.
//!
//! Rows are always laid out in the persisted training column order.

use std::collections::{BTreeMap, HashMap};

use crash_cause_records_models::CrashRecord;
use serde::{Deserialize, Serialize};

/// Code for a categorical value absent from the training categories.
pub const UNSEEN_CATEGORY: i64 = -1;

/// One encoded record, in training column order.
pub type EncodedRow = Vec<f64>;

/// Ordered category list of one categorical column.
///
/// Serialized as a plain JSON array; the array position is the code.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "Vec<String>", into = "Vec<String>")]
pub struct EncoderTable {
    categories: Vec<String>,
    codes: HashMap<String, usize>,
}

impl From<Vec<String>> for EncoderTable {
    fn from(categories: Vec<String>) -> Self {
        let mut codes = HashMap::with_capacity(categories.len());
        for (i, category) in categories.iter().enumerate() {
            // A repeated category keeps its first position.
            codes.entry(category.clone()).or_insert(i);
        }
        Self { categories, codes }
    }
}

impl From<EncoderTable> for Vec<String> {
    fn from(table: EncoderTable) -> Self {
        table.categories
    }
}

impl EncoderTable {
    /// Code of `value`, or [`UNSEEN_CATEGORY`].
    #[must_use]
    pub fn code(&self, value: &str) -> i64 {
        self.codes
            .get(value)
            .and_then(|&i| i64::try_from(i).ok())
            .unwrap_or(UNSEEN_CATEGORY)
    }

    /// The categories in code order.
    #[must_use]
    pub fn categories(&self) -> &[String] {
        &self.categories
    }
}

/// Category tables keyed by column name.
pub type EncoderTables = BTreeMap<String, EncoderTable>;

/// Feature column names in training order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ColumnOrder(Vec<String>);

impl ColumnOrder {
    /// Wraps an ordered column list.
    #[must_use]
    pub const fn new(columns: Vec<String>) -> Self {
        Self(columns)
    }

    /// The column names, in order.
    #[must_use]
    pub fn as_slice(&self) -> &[String] {
        &self.0
    }

    /// Number of columns.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether there are no columns.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Encodes crash records into classifier input rows.
#[derive(Debug, Clone)]
pub struct FeatureEncoder {
    tables: EncoderTables,
    columns: ColumnOrder,
}

impl FeatureEncoder {
    /// Creates an encoder from persisted tables and column order.
    #[must_use]
    pub const fn new(tables: EncoderTables, columns: ColumnOrder) -> Self {
        Self { tables, columns }
    }

    /// The category tables.
    #[must_use]
    pub const fn tables(&self) -> &EncoderTables {
        &self.tables
    }

    /// The training column order.
    #[must_use]
    pub const fn columns(&self) -> &ColumnOrder {
        &self.columns
    }

    /// Encodes every record. Never fails.
    #[must_use]
    pub fn encode<'a>(&self, records: impl IntoIterator<Item = &'a CrashRecord>) -> Vec<EncodedRow> {
        records.into_iter().map(|r| self.encode_record(r)).collect()
    }

    /// Encodes one record.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn encode_record(&self, record: &CrashRecord) -> EncodedRow {
        self.columns
            .as_slice()
            .iter()
            .map(|column| {
                let raw = record.field(column);
                match self.tables.get(column) {
                    Some(table) => raw.map_or(UNSEEN_CATEGORY, |v| table.code(v)) as f64,
                    None => raw
                        .and_then(|v| v.parse::<f64>().ok())
                        .unwrap_or(f64::NAN),
                }
            })
            .collect()
    }
}
