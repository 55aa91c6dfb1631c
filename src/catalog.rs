use serde::Deserialize;
use std::path::Path;
use thiserror::Error;

/// Substitution placeholder understood by query templates. Mirrors the
/// catalog file format, where each `query` column holds at most one slot.
const PLACEHOLDER: &str = "{}";

#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("failed to load query catalog from {path}: {source}")]
    Load {
        path: String,
        #[source]
        source: csv::Error,
    },
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum SubstitutionError {
    #[error("query template has {0} placeholders, expected at most one")]
    MultiplePlaceholders(usize),
}

/// One row of the static catalog table.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct CatalogRow {
    pub category: String,
    pub subcategory: String,
    pub preamble: String,
    #[serde(rename = "query")]
    pub query_template: String,
}

impl CatalogRow {
    /// Substitute `argument` into the template. A template with no
    /// placeholder yields the literal template and drops the argument;
    /// this is long-standing catalog behavior and is kept as-is.
    fn substitute(&self, argument: &str) -> Result<String, SubstitutionError> {
        match self.query_template.matches(PLACEHOLDER).count() {
            0 => Ok(self.query_template.clone()),
            1 => Ok(self.query_template.replacen(PLACEHOLDER, argument, 1)),
            n => Err(SubstitutionError::MultiplePlaceholders(n)),
        }
    }
}

/// A catalog row after substitution, ready to drive one search call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExpandedQuery {
    pub category: String,
    pub subcategory: String,
    pub preamble: String,
    pub query: String,
}

/// The static table of predefined queries, loaded once at process start
/// and shared read-only by every request.
#[derive(Debug, Clone)]
pub struct QueryCatalog {
    rows: Vec<CatalogRow>,
}

impl QueryCatalog {
    pub fn load(path: &Path) -> Result<QueryCatalog, CatalogError> {
        let to_load_err = |source| CatalogError::Load {
            path: path.display().to_string(),
            source,
        };

        let mut reader = csv::Reader::from_path(path).map_err(to_load_err)?;
        let rows = reader
            .deserialize()
            .collect::<Result<Vec<CatalogRow>, csv::Error>>()
            .map_err(to_load_err)?;

        Ok(QueryCatalog { rows })
    }

    pub fn from_rows(rows: Vec<CatalogRow>) -> QueryCatalog {
        QueryCatalog { rows }
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Substitute `argument` into every row, in table order. Rows whose
    /// substitution fails are skipped with a warning rather than failing
    /// the whole expansion.
    pub fn expand(&self, argument: &str) -> Vec<ExpandedQuery> {
        self.rows
            .iter()
            .filter_map(|row| match row.substitute(argument) {
                Ok(query) => Some(ExpandedQuery {
                    category: row.category.clone(),
                    subcategory: row.subcategory.clone(),
                    preamble: row.preamble.clone(),
                    query,
                }),
                Err(err) => {
                    tracing::warn!(
                        category = %row.category,
                        subcategory = %row.subcategory,
                        "skipping catalog row: {err}"
                    );
                    None
                }
            })
            .collect()
    }
}
