//! `listColumns` action: offer the input table's columns as embed-column
//! choices.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue};
use serde::{Deserialize, Serialize};

use crate::PipelineError;
use crate::config::Secret;
use crate::datadir::DataDir;
use crate::input::read_header;

/// One select-box option as the UI expects it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ColumnOption {
    pub value: String,
    pub label: String,
}

pub fn to_options<I, S>(columns: I) -> Vec<ColumnOption>
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    columns
        .into_iter()
        .map(|c| {
            let c = c.into();
            ColumnOption {
                value: c.clone(),
                label: c,
            }
        })
        .collect()
}

#[async_trait]
pub trait ColumnSource: Send + Sync {
    async fn list_columns(&self) -> Result<Vec<String>, PipelineError>;
}

/// Header of the CSV already staged in the data directory.
pub struct LocalColumns {
    data_dir: DataDir,
}

impl LocalColumns {
    pub fn new(data_dir: DataDir) -> Self {
        Self { data_dir }
    }
}

#[async_trait]
impl ColumnSource for LocalColumns {
    async fn list_columns(&self) -> Result<Vec<String>, PipelineError> {
        let input = self.data_dir.locate_input()?;
        read_header(input)
    }
}

#[derive(Deserialize)]
struct TableDetail {
    #[serde(default)]
    columns: Vec<String>,
}

/// Table detail from the platform's Storage API.
pub struct StorageApiColumns {
    client: reqwest::Client,
    endpoint: String,
}

impl StorageApiColumns {
    pub fn new(base_url: &str, token: &Secret, table_id: &str) -> Result<Self, PipelineError> {
        let mut headers = HeaderMap::new();
        let mut token = HeaderValue::from_str(token.expose())
            .map_err(|_| PipelineError::Storage("storage token is not a valid header".into()))?;
        token.set_sensitive(true);
        headers.insert("X-StorageApi-Token", token);

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(|e| PipelineError::Storage(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            endpoint: table_endpoint(base_url, table_id),
        })
    }
}

fn table_endpoint(base_url: &str, table_id: &str) -> String {
    format!(
        "{}/v2/storage/tables/{}",
        base_url.trim_end_matches('/'),
        table_id
    )
}

#[async_trait]
impl ColumnSource for StorageApiColumns {
    async fn list_columns(&self) -> Result<Vec<String>, PipelineError> {
        let response = self
            .client
            .get(&self.endpoint)
            .send()
            .await
            .map_err(|e| PipelineError::Storage(format!("storage API request failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(PipelineError::Storage(format!(
                "storage API returned {}: {body}",
                status.as_u16()
            )));
        }

        let detail: TableDetail = response
            .json()
            .await
            .map_err(|e| PipelineError::Storage(format!("unexpected table detail: {e}")))?;
        Ok(detail.columns)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn options_mirror_column_names() {
        let json = serde_json::to_string(&to_options(["id", "text"])).unwrap();
        assert_eq!(
            json,
            r#"[{"value":"id","label":"id"},{"value":"text","label":"text"}]"#
        );
        assert_eq!(serde_json::to_string(&to_options(Vec::<String>::new())).unwrap(), "[]");
    }

    #[test]
    fn table_endpoint_trims_trailing_slash() {
        assert_eq!(
            table_endpoint("https://connection.keboola.com/", "in.c-main.reviews"),
            "https://connection.keboola.com/v2/storage/tables/in.c-main.reviews"
        );
    }

    #[test]
    fn table_detail_reads_columns() {
        let detail: TableDetail =
            serde_json::from_str(r#"{"id": "in.c-main.t", "columns": ["a", "b"], "rowsCount": 3}"#)
                .unwrap();
        assert_eq!(detail.columns, ["a", "b"]);
    }

    #[tokio::test]
    async fn local_columns_read_input_header() {
        let tmp = tempfile::tempdir().unwrap();
        let data = DataDir::new(tmp.path());
        fs::create_dir_all(data.in_tables()).unwrap();
        fs::write(data.in_tables().join("t.csv"), "id,review text\n1,x\n").unwrap();

        let columns = LocalColumns::new(data).list_columns().await.unwrap();
        assert_eq!(columns, ["id", "review text"]);
    }

    #[tokio::test]
    async fn local_columns_without_input() {
        let tmp = tempfile::tempdir().unwrap();
        let err = LocalColumns::new(DataDir::new(tmp.path()))
            .list_columns()
            .await
            .unwrap_err();
        assert!(matches!(err, PipelineError::NoInput(_)));
    }

    #[tokio::test]
    async fn unreachable_storage_api_is_storage_error() {
        let source =
            StorageApiColumns::new("http://127.0.0.1:9", &Secret::new("token"), "in.c-main.t")
                .unwrap();
        let err = source.list_columns().await.unwrap_err();
        assert!(matches!(err, PipelineError::Storage(_)));
    }

    #[test]
    fn invalid_token_header_rejected() {
        let err = StorageApiColumns::new("http://x", &Secret::new("bad\ntoken"), "t")
            .err()
            .unwrap();
        assert!(matches!(err, PipelineError::Storage(_)));
    }
}
