//! Query pipeline: search → filter → sort → group
//!
//! The order is fixed. Filters are defined over raw field values while search
//! only looks at the caller's searchable subset, so swapping stages changes
//! results.
//!
//! [`run_query`] is the pure function. [`QueryPipeline`] wraps it with a
//! single-entry memo so a UI can ask for the derived rows on every frame
//! without recomputing when nothing changed.

use std::collections::HashMap;
use std::sync::Arc;

use crate::column::ColumnSet;
use crate::filter::{apply_filters, search, FilterRule};
use crate::group::{group_rows, RowGroup};
use crate::sort::{sort_rows, SortRule};
use crate::value::Row;

/// Everything the pipeline reads besides the rows themselves
#[derive(Debug, Clone, Default, PartialEq)]
pub struct QueryInput {
    pub search: String,
    pub filters: Vec<FilterRule>,
    pub sorts: Vec<SortRule>,
    pub group_field: Option<String>,
}

/// Borrowed pipeline output
#[derive(Debug, Clone, PartialEq)]
pub struct QueryResult<'a> {
    /// Filtered and sorted rows (all groups, in order)
    pub rows: Vec<&'a Row>,
    /// Present when a group field is set
    pub groups: Option<Vec<RowGroup<'a>>>,
}

pub fn run_query<'a>(rows: &'a [Row], columns: &ColumnSet, input: &QueryInput) -> QueryResult<'a> {
    let all: Vec<&Row> = rows.iter().collect();
    let searched = search(all, columns, &input.search);
    let filtered = apply_filters(searched, columns, &input.filters);
    let sorted = sort_rows(filtered, columns, &input.sorts);
    let groups = input
        .group_field
        .as_deref()
        .map(|field| group_rows(&sorted, field));

    QueryResult {
        rows: sorted,
        groups,
    }
}

// =============================================================================
// Memoized pipeline
// =============================================================================

/// Owned pipeline output as indices into the row slice
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DerivedView {
    pub rows: Vec<usize>,
    pub groups: Option<Vec<GroupIndex>>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct GroupIndex {
    pub label: String,
    pub rows: Vec<usize>,
}

impl DerivedView {
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Resolve indices back to rows
    pub fn resolve<'a>(&self, rows: &'a [Row]) -> Vec<&'a Row> {
        self.rows.iter().filter_map(|&i| rows.get(i)).collect()
    }
}

#[derive(Debug, Clone, PartialEq)]
struct MemoKey {
    rows_revision: u64,
    input: QueryInput,
}

/// Single-entry memo over [`run_query`].
///
/// The key is the caller's rows revision plus the structural value of the
/// query input; callers bump the revision whenever they replace the rows.
#[derive(Debug, Default)]
pub struct QueryPipeline {
    cached: Option<(MemoKey, Arc<DerivedView>)>,
    computations: u64,
}

impl QueryPipeline {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn derive(
        &mut self,
        rows: &[Row],
        rows_revision: u64,
        columns: &ColumnSet,
        input: &QueryInput,
    ) -> Arc<DerivedView> {
        if let Some((key, view)) = &self.cached {
            if key.rows_revision == rows_revision && &key.input == input {
                return Arc::clone(view);
            }
        }

        let result = run_query(rows, columns, input);
        let position: HashMap<&str, usize> = rows
            .iter()
            .enumerate()
            .map(|(i, row)| (row.id(), i))
            .collect();
        let to_indices = |rows: &[&Row]| -> Vec<usize> {
            rows.iter()
                .filter_map(|row| position.get(row.id()).copied())
                .collect()
        };

        let view = Arc::new(DerivedView {
            rows: to_indices(&result.rows),
            groups: result.groups.as_ref().map(|groups| {
                groups
                    .iter()
                    .map(|g| GroupIndex {
                        label: g.label.clone(),
                        rows: to_indices(&g.rows),
                    })
                    .collect()
            }),
        });

        self.computations += 1;
        log::trace!("query pipeline recomputed ({} rows)", view.rows.len());
        self.cached = Some((
            MemoKey {
                rows_revision,
                input: input.clone(),
            },
            Arc::clone(&view),
        ));
        view
    }

    pub fn invalidate(&mut self) {
        self.cached = None;
    }

    /// Number of actual recomputations so far
    pub fn computations(&self) -> u64 {
        self.computations
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::column::{ColumnDef, ColumnType};
    use crate::filter::FilterOperator;

    fn columns() -> ColumnSet {
        ColumnSet::new(vec![
            ColumnDef::new("name", "Name", ColumnType::Text),
            ColumnDef::new("active", "Active", ColumnType::Toggle),
        ])
        .unwrap()
    }

    fn rows() -> Vec<Row> {
        vec![
            Row::new("1").with("name", "Bob").with("active", true),
            Row::new("2").with("name", "Ann").with("active", false),
        ]
    }

    fn ids(rows: &[&Row]) -> Vec<String> {
        rows.iter().map(|r| r.id().to_string()).collect()
    }

    #[test]
    fn test_scenario_sort_filter_search_group() {
        let data = rows();
        let cols = columns();

        let sorted = run_query(
            &data,
            &cols,
            &QueryInput {
                sorts: vec![SortRule::asc("name")],
                ..Default::default()
            },
        );
        assert_eq!(ids(&sorted.rows), vec!["2", "1"]);

        let filtered = run_query(
            &data,
            &cols,
            &QueryInput {
                filters: vec![FilterRule::unary("active", FilterOperator::IsTrue)],
                ..Default::default()
            },
        );
        assert_eq!(ids(&filtered.rows), vec!["1"]);

        let searched = run_query(
            &data,
            &cols,
            &QueryInput {
                search: "an".into(),
                ..Default::default()
            },
        );
        assert_eq!(ids(&searched.rows), vec!["2"]);

        let grouped = run_query(
            &data,
            &cols,
            &QueryInput {
                group_field: Some("active".into()),
                ..Default::default()
            },
        );
        let groups = grouped.groups.unwrap();
        assert_eq!(groups.len(), 2);
        assert_eq!(groups[0].label, "Yes");
        assert_eq!(ids(&groups[0].rows), vec!["1"]);
        assert_eq!(groups[1].label, "No");
        assert_eq!(ids(&groups[1].rows), vec!["2"]);
    }

    #[test]
    fn test_group_follows_sort_order() {
        let data = rows();
        let result = run_query(
            &data,
            &columns(),
            &QueryInput {
                sorts: vec![SortRule::asc("name")],
                group_field: Some("active".into()),
                ..Default::default()
            },
        );
        let labels: Vec<String> = result
            .groups
            .unwrap()
            .into_iter()
            .map(|g| g.label)
            .collect();
        assert_eq!(labels, vec!["No", "Yes"]);
    }

    #[test]
    fn test_memo_reuses_until_inputs_change() {
        let data = rows();
        let cols = columns();
        let mut pipeline = QueryPipeline::new();
        let input = QueryInput {
            sorts: vec![SortRule::asc("name")],
            ..Default::default()
        };

        let first = pipeline.derive(&data, 1, &cols, &input);
        let second = pipeline.derive(&data, 1, &cols, &input.clone());
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(pipeline.computations(), 1);
        assert_eq!(first.rows, vec![1, 0]);

        pipeline.derive(&data, 2, &cols, &input);
        assert_eq!(pipeline.computations(), 2);

        let searched = QueryInput {
            search: "bo".into(),
            ..input
        };
        let view = pipeline.derive(&data, 2, &cols, &searched);
        assert_eq!(pipeline.computations(), 3);
        assert_eq!(view.resolve(&data)[0].id(), "1");
    }
}
