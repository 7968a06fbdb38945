use std::fs::File;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use store::Row;

use crate::PipelineError;

/// Lazily yields [`Row`]s from a headed CSV file.
///
/// Records with a different field count than the header are reported as
/// input errors rather than padded.
pub struct CsvRowReader {
    path: PathBuf,
    columns: Arc<[String]>,
    records: csv::StringRecordsIntoIter<File>,
}

impl CsvRowReader {
    pub fn open(path: impl AsRef<Path>) -> Result<Self, PipelineError> {
        let path = path.as_ref().to_path_buf();
        let input_err = |source| PipelineError::Input {
            path: path.clone(),
            source,
        };

        let mut reader = csv::ReaderBuilder::new()
            .has_headers(true)
            .from_path(&path)
            .map_err(input_err)?;
        let columns: Arc<[String]> = reader
            .headers()
            .map_err(input_err)?
            .iter()
            .map(String::from)
            .collect();

        tracing::debug!(path = %path.display(), columns = columns.len(), "input opened");
        Ok(Self {
            records: reader.into_records(),
            path,
            columns,
        })
    }

    /// Header names, in file order.
    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Iterator for CsvRowReader {
    type Item = Result<Row, PipelineError>;

    fn next(&mut self) -> Option<Self::Item> {
        let record = self.records.next()?;
        Some(match record {
            Ok(record) => Ok(Row::new(
                Arc::clone(&self.columns),
                record.iter().map(String::from).collect(),
            )),
            Err(source) => Err(PipelineError::Input {
                path: self.path.clone(),
                source,
            }),
        })
    }
}

/// Header of the CSV at `path`, without reading any records.
pub fn read_header(path: impl AsRef<Path>) -> Result<Vec<String>, PipelineError> {
    Ok(CsvRowReader::open(path)?.columns().to_vec())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn yields_rows_in_order() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("in.csv");
        fs::write(&path, "id,text\n1,hello\n2,\"a, b\"\n").unwrap();

        let reader = CsvRowReader::open(&path).unwrap();
        assert_eq!(reader.columns(), ["id", "text"]);
        let rows: Vec<Row> = reader.map(Result::unwrap).collect();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].get("text"), Some("hello"));
        assert_eq!(rows[1].get("text"), Some("a, b"));
        assert_eq!(rows[1].values(), ["2", "a, b"]);
    }

    #[test]
    fn strips_utf8_bom_from_header() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bom.csv");
        fs::write(&path, "\u{feff}text\nx\n").unwrap();
        assert_eq!(read_header(&path).unwrap(), ["text"]);
    }

    #[test]
    fn ragged_record_is_input_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ragged.csv");
        fs::write(&path, "a,b\n1,2\n3\n").unwrap();

        let results: Vec<_> = CsvRowReader::open(&path).unwrap().collect();
        assert!(results[0].is_ok());
        assert!(matches!(results[1], Err(PipelineError::Input { .. })));
    }

    #[test]
    fn missing_file_is_input_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = CsvRowReader::open(dir.path().join("none.csv")).err().unwrap();
        assert!(matches!(err, PipelineError::Input { .. }));
        assert!(err.is_user_error());
    }
}
