use std::fs;

use embedpipe::{
    ComponentConfig, ConfigError, DataDir, Job, OutputTarget, PipelineError, Settings,
    StubEmbedder, run,
};

fn settings(format: &str, column: &str) -> Settings {
    let json = format!(
        r##"{{"parameters": {{"embedColumn": "{column}", "#apiKey": "k", "model": "ada_002",
              "outputFormat": "{format}"}}}}"##
    );
    Settings::from_config(&ComponentConfig::from_json(&json).unwrap()).unwrap()
}

fn data_dir(files: &[(&str, &str)]) -> (tempfile::TempDir, DataDir) {
    let tmp = tempfile::tempdir().unwrap();
    let data = DataDir::new(tmp.path());
    fs::create_dir_all(data.in_tables()).unwrap();
    for (name, contents) in files {
        fs::write(data.in_tables().join(name), contents).unwrap();
    }
    (tmp, data)
}

#[test]
fn no_input_table_is_rejected_before_embedding() {
    let (_tmp, data) = data_dir(&[]);
    let err = Job::resolve(&settings("csv", "text"), &data).unwrap_err();
    assert!(matches!(err, PipelineError::NoInput(_)));
    assert!(err.is_user_error());
}

#[test]
fn multiple_input_tables_are_rejected() {
    let (_tmp, data) = data_dir(&[("a.csv", "text\nx\n"), ("b.csv", "text\ny\n")]);
    let err = Job::resolve(&settings("csv", "text"), &data).unwrap_err();
    assert!(matches!(err, PipelineError::NoInput(_)));
}

#[tokio::test]
async fn missing_embed_column_writes_nothing() {
    for format in ["csv", "vector_store"] {
        let (_tmp, data) = data_dir(&[("t.csv", "id,body\n1,x\n")]);
        let job = Job::resolve(&settings(format, "text"), &data).unwrap();
        let embedder = StubEmbedder::new(4);

        let err = run(&job, &embedder).await.unwrap_err();
        assert!(matches!(
            err,
            PipelineError::MissingColumn { ref column, row: None } if column == "text"
        ));
        assert!(err.is_user_error());
        assert_eq!(embedder.calls(), 0);
        assert!(!data.out_tables().exists(), "{format}: no csv output");
        assert!(!data.out_files().exists(), "{format}: no store output");
    }
}

#[tokio::test]
async fn embedding_failure_keeps_rows_written_so_far() {
    let (_tmp, data) = data_dir(&[("t.csv", "text\nfirst\nbad\nthird\n")]);
    let job = Job::resolve(&settings("csv", "text"), &data).unwrap();
    let embedder = StubEmbedder::new(4).failing_on("bad");

    let err = run(&job, &embedder).await.unwrap_err();
    assert!(matches!(err, PipelineError::Embedding { row: 2, .. }));
    assert!(err.is_user_error());

    let written = fs::read_to_string(job.target.output_path()).unwrap();
    assert_eq!(written.lines().count(), 2, "header plus the first row");
}

#[tokio::test]
async fn vector_column_collision_is_schema_error() {
    let (_tmp, data) = data_dir(&[("t.csv", "text,embedding\na,b\n")]);
    let job = Job::resolve(&settings("csv", "text"), &data).unwrap();

    let err = run(&job, &StubEmbedder::new(4)).await.unwrap_err();
    assert!(matches!(err, PipelineError::Schema(_)));
    assert!(err.is_user_error());
}

#[tokio::test]
async fn malformed_csv_is_input_error() {
    let (_tmp, data) = data_dir(&[("t.csv", "id,text\n1,a\n2\n")]);
    let job = Job::resolve(&settings("csv", "text"), &data).unwrap();

    let err = run(&job, &StubEmbedder::new(4)).await.unwrap_err();
    assert!(matches!(err, PipelineError::Input { .. }));
    assert!(err.is_user_error());
}

#[test]
fn path_traversal_in_output_name_is_config_error() {
    let (_tmp, data) = data_dir(&[("t.csv", "text\na\n")]);
    let cfg = ComponentConfig::from_json(
        r##"{"parameters": {"embedColumn": "text", "#apiKey": "k", "model": "small_03",
             "outputFormat": "csv", "output_table_name": "../../etc/x"}}"##,
    )
    .unwrap();
    let settings = Settings::from_config(&cfg).unwrap();

    let err = Job::resolve(&settings, &data).unwrap_err();
    assert!(matches!(err, PipelineError::Config(ConfigError::Validation(_))));
}

#[tokio::test]
async fn failed_archive_leaves_store_directory() {
    let (_tmp, data) = data_dir(&[("t.csv", "text\na\nb\n")]);
    let job = Job::resolve(&settings("vector_store", "text"), &data).unwrap();
    let OutputTarget::VectorStore { dir, archive } = job.target.clone() else {
        panic!("expected vector store target");
    };
    // Occupy the archive path with a non-empty directory so the rename fails.
    fs::create_dir_all(archive.join("blocker")).unwrap();

    let err = run(&job, &StubEmbedder::new(4)).await.unwrap_err();
    assert!(matches!(err, PipelineError::Archive(_)));
    assert!(dir.join("embeddings.lance").is_dir());
    let store = store::VectorStore::open(&dir).await.unwrap();
    assert_eq!(store.count_rows().await.unwrap(), 2);
}
