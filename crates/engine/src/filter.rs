//! Search and typed filtering
//!
//! The first two stages of the query pipeline. Both take and return borrowed
//! rows so no record is ever copied, and both hand their input back untouched
//! when they have nothing to do (empty query, empty rule list), which lets the
//! caller memoize on identity.
//!
//! Key invariants:
//! - Search only looks at searchable columns
//! - Filter rules are AND-combined and evaluated on raw field values
//! - Operators that take no value never carry one

use serde::{Deserialize, Serialize};

use crate::column::{ColumnDef, ColumnSet, ColumnType};
use crate::value::{CellValue, Row};

// =============================================================================
// Operators
// =============================================================================

/// Filter operator. Which ones apply depends on the column type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FilterOperator {
    // text / tags
    Contains,
    Equals,
    NotContains,
    IsEmpty,
    IsNotEmpty,
    // toggle
    IsTrue,
    IsFalse,
    // select
    Is,
    IsNot,
    // number
    Eq,
    Neq,
    Gt,
    Lt,
    Gte,
    Lte,
    // date
    Before,
    After,
}

impl FilterOperator {
    /// Operators offered for a column type, in menu order
    pub fn operators_for(column_type: ColumnType) -> &'static [FilterOperator] {
        use FilterOperator::*;
        match column_type {
            ColumnType::Text => &[Contains, Equals, NotContains, IsEmpty, IsNotEmpty],
            ColumnType::Toggle => &[IsTrue, IsFalse],
            ColumnType::Select => &[Is, IsNot],
            ColumnType::Number => &[Eq, Neq, Gt, Lt, Gte, Lte, IsEmpty],
            ColumnType::Tags => &[Contains, IsEmpty, IsNotEmpty],
            ColumnType::Date => &[Before, After, IsEmpty],
            ColumnType::Thumbnail => &[IsEmpty, IsNotEmpty],
        }
    }

    /// Default operator when a filter is first added for a column
    pub fn default_for(column_type: ColumnType) -> FilterOperator {
        Self::operators_for(column_type)[0]
    }

    pub fn applies_to(self, column_type: ColumnType) -> bool {
        Self::operators_for(column_type).contains(&self)
    }

    /// Whether the operator compares against a rule value
    pub fn needs_value(self) -> bool {
        !matches!(
            self,
            FilterOperator::IsEmpty
                | FilterOperator::IsNotEmpty
                | FilterOperator::IsTrue
                | FilterOperator::IsFalse
        )
    }

    pub fn label(self) -> &'static str {
        match self {
            FilterOperator::Contains => "contains",
            FilterOperator::Equals => "equals",
            FilterOperator::NotContains => "does not contain",
            FilterOperator::IsEmpty => "is empty",
            FilterOperator::IsNotEmpty => "is not empty",
            FilterOperator::IsTrue => "is true",
            FilterOperator::IsFalse => "is false",
            FilterOperator::Is => "is",
            FilterOperator::IsNot => "is not",
            FilterOperator::Eq => "=",
            FilterOperator::Neq => "≠",
            FilterOperator::Gt => ">",
            FilterOperator::Lt => "<",
            FilterOperator::Gte => "≥",
            FilterOperator::Lte => "≤",
            FilterOperator::Before => "before",
            FilterOperator::After => "after",
        }
    }
}

// =============================================================================
// FilterRule
// =============================================================================

/// One predicate: `field operator value`
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FilterRule {
    pub field: String,
    pub operator: FilterOperator,
    #[serde(default)]
    pub value: String,
}

impl FilterRule {
    pub fn new(field: impl Into<String>, operator: FilterOperator, value: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            operator,
            value: value.into(),
        }
        .normalized()
    }

    /// A rule for an operator that takes no value
    pub fn unary(field: impl Into<String>, operator: FilterOperator) -> Self {
        Self::new(field, operator, "")
    }

    /// Switch operator; a stale value is dropped when the new operator has no use for it.
    pub fn with_operator(mut self, operator: FilterOperator) -> Self {
        self.operator = operator;
        self.normalized()
    }

    /// Drop any value carried by a valueless operator
    pub fn normalized(mut self) -> Self {
        if !self.operator.needs_value() {
            self.value.clear();
        }
        self
    }

    /// Evaluate against one row. Operators that do not apply to the column's
    /// type are ignored (the row passes).
    pub fn matches(&self, column: &ColumnDef, row: &Row) -> bool {
        if !self.operator.applies_to(column.column_type) {
            return true;
        }
        matches_value(
            column.column_type,
            self.operator,
            row.value(&column.key),
            &self.value,
        )
    }
}

fn matches_value(column_type: ColumnType, op: FilterOperator, value: &CellValue, rule: &str) -> bool {
    use FilterOperator::*;

    match op {
        IsEmpty => return value.is_blank(),
        IsNotEmpty => return !value.is_blank(),
        _ => {}
    }

    match column_type {
        ColumnType::Text | ColumnType::Thumbnail => {
            let haystack = value.to_string().to_lowercase();
            let needle = rule.to_lowercase();
            match op {
                Contains => haystack.contains(&needle),
                Equals => haystack == needle,
                NotContains => !haystack.contains(&needle),
                _ => true,
            }
        }
        ColumnType::Toggle => match op {
            IsTrue => matches!(value, CellValue::Bool(true)),
            // absent and null count as false
            IsFalse => matches!(value, CellValue::Bool(false) | CellValue::Null),
            _ => true,
        },
        ColumnType::Select => {
            if rule.is_empty() {
                return true;
            }
            let current = value.to_string();
            match op {
                Is => current == rule,
                IsNot => current != rule,
                _ => true,
            }
        }
        ColumnType::Number => {
            if rule.trim().is_empty() {
                return true;
            }
            let (Some(lhs), Ok(rhs)) = (value.coerce_number(), rule.trim().parse::<f64>()) else {
                return false;
            };
            match op {
                Eq => lhs == rhs,
                Neq => lhs != rhs,
                Gt => lhs > rhs,
                Lt => lhs < rhs,
                Gte => lhs >= rhs,
                Lte => lhs <= rhs,
                _ => true,
            }
        }
        ColumnType::Tags => match op {
            Contains => {
                if rule.is_empty() {
                    return true;
                }
                let needle = rule.to_lowercase();
                value
                    .as_list()
                    .map(|items| items.iter().any(|t| t.to_lowercase().contains(&needle)))
                    .unwrap_or(false)
            }
            _ => true,
        },
        ColumnType::Date => {
            if rule.is_empty() {
                return true;
            }
            let Some(date) = value.as_text().filter(|s| !s.is_empty()) else {
                return false;
            };
            match op {
                Before => date < rule,
                After => date > rule,
                _ => true,
            }
        }
    }
}

// =============================================================================
// Pipeline stages
// =============================================================================

/// Case-insensitive substring search over searchable columns.
///
/// The query is trimmed first. A blank query returns `rows` as given (same
/// allocation).
pub fn search<'a>(rows: Vec<&'a Row>, columns: &ColumnSet, query: &str) -> Vec<&'a Row> {
    let query = query.trim();
    if query.is_empty() {
        return rows;
    }
    let needle = query.to_lowercase();
    let searchable: Vec<&ColumnDef> = columns.iter().filter(|c| c.is_searchable()).collect();

    rows.into_iter()
        .filter(|row| {
            searchable
                .iter()
                .any(|col| value_contains(row.value(&col.key), &needle))
        })
        .collect()
}

fn value_contains(value: &CellValue, needle: &str) -> bool {
    match value {
        CellValue::Null => false,
        CellValue::List(items) => items.iter().any(|item| item.to_lowercase().contains(needle)),
        other => other.to_string().to_lowercase().contains(needle),
    }
}

/// Keep rows that satisfy every rule.
///
/// Rules naming unknown fields are ignored. An empty rule list returns `rows`
/// as given.
pub fn apply_filters<'a>(rows: Vec<&'a Row>, columns: &ColumnSet, filters: &[FilterRule]) -> Vec<&'a Row> {
    let active: Vec<(&FilterRule, &ColumnDef)> = filters
        .iter()
        .filter_map(|rule| columns.get(&rule.field).map(|col| (rule, col)))
        .collect();
    if active.is_empty() {
        return rows;
    }

    rows.into_iter()
        .filter(|row| active.iter().all(|(rule, col)| rule.matches(col, row)))
        .collect()
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::column::SelectOption;

    fn columns() -> ColumnSet {
        ColumnSet::new(vec![
            ColumnDef::new("name", "Name", ColumnType::Text),
            ColumnDef::new("active", "Active", ColumnType::Toggle),
            ColumnDef::new("status", "Status", ColumnType::Select).with_options(vec![
                SelectOption::new("open", "Open"),
                SelectOption::new("closed", "Closed"),
            ]),
            ColumnDef::new("score", "Score", ColumnType::Number),
            ColumnDef::new("tags", "Tags", ColumnType::Tags),
            ColumnDef::new("due", "Due", ColumnType::Date),
        ])
        .unwrap()
    }

    fn rows() -> Vec<Row> {
        vec![
            Row::new("1")
                .with("name", "Bob")
                .with("active", true)
                .with("status", "open")
                .with("score", 10.0)
                .with("tags", vec!["Urgent", "vip"])
                .with("due", "2024-03-01"),
            Row::new("2")
                .with("name", "Ann")
                .with("active", false)
                .with("status", "closed")
                .with("score", 3.0)
                .with("tags", Vec::<String>::new()),
            Row::new("3").with("name", "").with("active", CellValue::Null),
        ]
    }

    fn ids(rows: &[&Row]) -> Vec<String> {
        rows.iter().map(|r| r.id().to_string()).collect()
    }

    fn run(rule: FilterRule) -> Vec<String> {
        let data = rows();
        let cols = columns();
        let refs: Vec<&Row> = data.iter().collect();
        ids(&apply_filters(refs, &cols, &[rule]))
    }

    #[test]
    fn test_text_operators() {
        assert_eq!(run(FilterRule::new("name", FilterOperator::Contains, "o")), vec!["1"]);
        assert_eq!(run(FilterRule::new("name", FilterOperator::Equals, "ANN")), vec!["2"]);
        assert_eq!(run(FilterRule::new("name", FilterOperator::NotContains, "b")), vec!["2", "3"]);
        assert_eq!(run(FilterRule::unary("name", FilterOperator::IsEmpty)), vec!["3"]);
        assert_eq!(run(FilterRule::unary("name", FilterOperator::IsNotEmpty)), vec!["1", "2"]);
    }

    #[test]
    fn test_toggle_is_false_includes_null() {
        assert_eq!(run(FilterRule::unary("active", FilterOperator::IsTrue)), vec!["1"]);
        assert_eq!(run(FilterRule::unary("active", FilterOperator::IsFalse)), vec!["2", "3"]);
    }

    #[test]
    fn test_select_empty_value_is_unconstrained() {
        assert_eq!(run(FilterRule::new("status", FilterOperator::Is, "")), vec!["1", "2", "3"]);
        assert_eq!(run(FilterRule::new("status", FilterOperator::Is, "open")), vec!["1"]);
        assert_eq!(run(FilterRule::new("status", FilterOperator::IsNot, "open")), vec!["2", "3"]);
    }

    #[test]
    fn test_number_operators() {
        assert_eq!(run(FilterRule::new("score", FilterOperator::Gt, "5")), vec!["1"]);
        assert_eq!(run(FilterRule::new("score", FilterOperator::Lte, "10")), vec!["1", "2"]);
        assert_eq!(run(FilterRule::new("score", FilterOperator::Eq, "3")), vec!["2"]);
        assert_eq!(run(FilterRule::new("score", FilterOperator::Neq, "3")), vec!["1"]);
        assert_eq!(run(FilterRule::unary("score", FilterOperator::IsEmpty)), vec!["3"]);
        assert_eq!(run(FilterRule::new("score", FilterOperator::Gt, "")), vec!["1", "2", "3"]);
        assert!(run(FilterRule::new("score", FilterOperator::Gt, "abc")).is_empty());
    }

    #[test]
    fn test_tags_operators() {
        assert_eq!(run(FilterRule::new("tags", FilterOperator::Contains, "urg")), vec!["1"]);
        assert_eq!(run(FilterRule::new("tags", FilterOperator::Contains, "")), vec!["1", "2", "3"]);
        assert_eq!(run(FilterRule::unary("tags", FilterOperator::IsEmpty)), vec!["2", "3"]);
        assert_eq!(run(FilterRule::unary("tags", FilterOperator::IsNotEmpty)), vec!["1"]);
    }

    #[test]
    fn test_date_operators() {
        assert_eq!(run(FilterRule::new("due", FilterOperator::Before, "2024-06-01")), vec!["1"]);
        assert!(run(FilterRule::new("due", FilterOperator::After, "2024-06-01")).is_empty());
        assert_eq!(run(FilterRule::new("due", FilterOperator::After, "")), vec!["1", "2", "3"]);
        assert_eq!(run(FilterRule::unary("due", FilterOperator::IsEmpty)), vec!["2", "3"]);
    }

    #[test]
    fn test_valueless_operator_clears_value() {
        let rule = FilterRule::new("name", FilterOperator::Contains, "abc")
            .with_operator(FilterOperator::IsEmpty);
        assert_eq!(rule.value, "");
        let json = serde_json::to_string(&rule).unwrap();
        assert_eq!(json, r#"{"field":"name","operator":"is_empty","value":""}"#);
    }

    #[test]
    fn test_unknown_field_and_foreign_operator_are_ignored() {
        assert_eq!(run(FilterRule::new("nope", FilterOperator::Contains, "x")), vec!["1", "2", "3"]);
        assert_eq!(run(FilterRule::unary("name", FilterOperator::IsTrue)), vec!["1", "2", "3"]);
    }

    #[test]
    fn test_filters_are_conjunctive() {
        let data = rows();
        let cols = columns();
        let refs: Vec<&Row> = data.iter().collect();
        let out = apply_filters(
            refs,
            &cols,
            &[
                FilterRule::new("score", FilterOperator::Gte, "1"),
                FilterRule::unary("active", FilterOperator::IsFalse),
            ],
        );
        assert_eq!(ids(&out), vec!["2"]);
    }

    #[test]
    fn test_search_matches_searchable_columns_only() {
        let data = rows();
        let cols = columns();
        let refs: Vec<&Row> = data.iter().collect();
        // "open" lives in a select column (searchable by default)
        assert_eq!(ids(&search(refs.clone(), &cols, "OPE")), vec!["1"]);
        // numbers are not searchable by default
        assert!(search(refs, &cols, "10").is_empty());
    }

    #[test]
    fn test_search_lists_match_any_element() {
        let cols = ColumnSet::new(vec![
            ColumnDef::new("tags", "Tags", ColumnType::Tags).with_searchable(true),
        ])
        .unwrap();
        let data = rows();
        let refs: Vec<&Row> = data.iter().collect();
        assert_eq!(ids(&search(refs, &cols, "VIP")), vec!["1"]);
    }

    #[test]
    fn test_empty_query_returns_same_allocation() {
        let data = rows();
        let cols = columns();
        let refs: Vec<&Row> = data.iter().collect();
        let ptr = refs.as_ptr();
        let out = search(refs, &cols, "");
        assert_eq!(out.as_ptr(), ptr);
    }

    #[test]
    fn test_whitespace_search_keeps_rows() {
        let data = rows();
        let cols = columns();
        let refs: Vec<&Row> = data.iter().collect();
        let ptr = refs.as_ptr();
        let out = search(refs, &cols, "   ");
        assert_eq!(out.len(), data.len());
        assert_eq!(out.as_ptr(), ptr);
        assert_eq!(ids(&search(out, &cols, "  ope\t")), vec!["1"]);
    }

    #[test]
    fn test_operators_for_types() {
        assert!(FilterOperator::Contains.applies_to(ColumnType::Tags));
        assert!(!FilterOperator::Equals.applies_to(ColumnType::Tags));
        assert_eq!(FilterOperator::default_for(ColumnType::Number), FilterOperator::Eq);
        assert!(!FilterOperator::IsTrue.needs_value());
        assert!(FilterOperator::Before.needs_value());
    }
}
