//! Query and update evaluation: predicate matching, sorting, projection, and
//! update-operator application.

mod compare;
mod matcher;
mod path;
mod projection;
mod update;

use serde_json::Value;

pub use compare::{compare_json_values, compare_values, ordered_compare, values_equal};
pub use matcher::matches_query;
pub use path::{remove_path, resolve_path, set_path};
pub use projection::project_document;
pub use update::apply_update;

/// Sort order for one sort key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortDirection {
    /// Ascending order
    Ascending,
    /// Descending order
    Descending,
}

/// Options for `find`-shaped operations.
///
/// # Example
///
/// ```rust
/// use vaultdb::{FindOptions, SortDirection};
///
/// let options = FindOptions::new()
///     .sort("age", SortDirection::Descending)
///     .skip(10)
///     .limit(5)
///     .projection(vec!["name", "age"]);
/// ```
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FindOptions {
    /// Sort keys applied in order; ties break on the next key.
    pub sort:       Vec<(String, SortDirection)>,
    /// Number of results to skip after sorting.
    pub skip:       Option<usize>,
    /// Maximum number of results, applied after skip.
    pub limit:      Option<usize>,
    /// Field paths to include in results; empty means all fields.
    pub projection: Option<Vec<String>>,
}

impl FindOptions {
    /// Creates empty options: no sort, no skip, no limit, full documents.
    pub fn new() -> Self { Self::default() }

    /// Appends a sort key.
    pub fn sort(mut self, field: &str, direction: SortDirection) -> Self {
        self.sort.push((field.to_owned(), direction));
        self
    }

    /// Sets the number of results to skip.
    pub const fn skip(mut self, skip: usize) -> Self {
        self.skip = Some(skip);
        self
    }

    /// Sets the maximum number of results.
    pub const fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Restricts returned documents to the named fields.
    pub fn projection(mut self, fields: Vec<&str>) -> Self {
        self.projection = Some(fields.into_iter().map(|s| s.to_owned()).collect());
        self
    }
}

/// Sorts documents by the given `(path, direction)` keys.
///
/// Undefined values sort before defined ones; equal values fall through to
/// the next key. The sort is stable, so untouched documents keep their
/// relative order.
pub fn sort_documents(documents: &mut [Value], keys: &[(String, SortDirection)]) {
    if keys.is_empty() {
        return;
    }
    documents.sort_by(|a, b| {
        for (path, direction) in keys {
            let ordering = compare_values(resolve_path(a, path), resolve_path(b, path));
            let ordering = match direction {
                SortDirection::Ascending => ordering,
                SortDirection::Descending => ordering.reverse(),
            };
            if ordering != std::cmp::Ordering::Equal {
                return ordering;
            }
        }
        std::cmp::Ordering::Equal
    });
}
