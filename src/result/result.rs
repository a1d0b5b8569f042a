use crate::core::{Row, Value};

/// Result of a row-returning query, as produced by the query-execution layer.
#[derive(Debug, Clone)]
pub struct QueryResult {
    pub columns: Vec<String>,
    pub rows: Vec<Row>,
}

impl QueryResult {
    pub fn empty() -> Self {
        Self {
            columns: Vec::new(),
            rows: Vec::new(),
        }
    }

    pub fn new(columns: Vec<String>, rows: Vec<Row>) -> Self {
        Self { columns, rows }
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// First value of the first row, for scalar queries.
    pub fn scalar(&self) -> Option<&Value> {
        self.rows.first().and_then(|row| row.first())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_result() {
        let result = QueryResult::empty();
        assert_eq!(result.row_count(), 0);
        assert!(result.is_empty());
        assert!(result.scalar().is_none());
    }

    #[test]
    fn test_scalar() {
        let result = QueryResult::new(
            vec!["count".into()],
            vec![vec![Value::Integer(3)], vec![Value::Integer(9)]],
        );
        assert_eq!(result.row_count(), 2);
        assert_eq!(result.scalar(), Some(&Value::Integer(3)));
    }
}
