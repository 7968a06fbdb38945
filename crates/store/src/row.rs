use std::sync::Arc;

/// One input record: values in header order, sharing the header itself.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Row {
    columns: Arc<[String]>,
    values: Vec<String>,
}

impl Row {
    pub fn new(columns: Arc<[String]>, values: Vec<String>) -> Self {
        Self { columns, values }
    }

    /// Build a standalone row from `(column, value)` pairs.
    pub fn from_pairs<K, V>(pairs: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<String>,
        V: Into<String>,
    {
        let (columns, values): (Vec<String>, Vec<String>) = pairs
            .into_iter()
            .map(|(k, v)| (k.into(), v.into()))
            .unzip();
        Self::new(columns.into(), values)
    }

    /// Value of `column`, or `None` when the header has no such column or the
    /// record is too short to hold it.
    pub fn get(&self, column: &str) -> Option<&str> {
        let idx = self.columns.iter().position(|c| c == column)?;
        self.values.get(idx).map(String::as_str)
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn values(&self) -> &[String] {
        &self.values
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.columns
            .iter()
            .zip(self.values.iter())
            .map(|(c, v)| (c.as_str(), v.as_str()))
    }
}

/// A [`Row`] plus its embedding. Built per row and handed straight to a sink.
#[derive(Debug, Clone, PartialEq)]
pub struct EnrichedRow {
    pub row: Row,
    pub embedding: Vec<f32>,
}

impl EnrichedRow {
    pub fn new(row: Row, embedding: Vec<f32>) -> Self {
        Self { row, embedding }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn get_by_column_name() {
        let row = Row::from_pairs([("id", "1"), ("text", "hello")]);
        assert_eq!(row.get("text"), Some("hello"));
        assert_eq!(row.get("id"), Some("1"));
        assert_eq!(row.get("missing"), None);
        assert_eq!(row.len(), 2);
    }

    #[test]
    fn short_record_reports_missing_value() {
        let columns: Arc<[String]> = vec!["id".to_string(), "text".to_string()].into();
        let row = Row::new(columns, vec!["1".into()]);
        assert_eq!(row.get("id"), Some("1"));
        assert_eq!(row.get("text"), None);
    }

    #[test]
    fn iter_preserves_header_order() {
        let row = Row::from_pairs([("b", "2"), ("a", "1"), ("c", "3")]);
        let pairs: Vec<_> = row.iter().collect();
        assert_eq!(pairs, vec![("b", "2"), ("a", "1"), ("c", "3")]);
    }

    #[test]
    fn rows_share_header() {
        let columns: Arc<[String]> = vec!["x".to_string()].into();
        let a = Row::new(columns.clone(), vec!["1".into()]);
        let b = Row::new(columns.clone(), vec!["2".into()]);
        assert_eq!(Arc::strong_count(&columns), 3);
        assert_eq!(a.columns(), b.columns());
    }
}
