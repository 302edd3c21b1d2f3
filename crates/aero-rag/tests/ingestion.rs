//! Directory ingestion against in-process providers

use aero_rag::{
    config::RagConfig,
    providers::VectorStoreProvider,
    testing::{pdf_with_pages, FakeEmbedder, FakeLlm, FaultyStore},
    RagPipeline,
};
use std::fs;
use std::sync::Arc;
use tempfile::TempDir;

fn pipeline(store: Arc<FaultyStore>) -> RagPipeline {
    let mut config = RagConfig::default();
    config.chunking.chunk_size = 100;
    config.chunking.chunk_overlap = 10;
    RagPipeline::from_parts(
        config,
        Arc::new(FakeEmbedder::new(32)),
        Arc::new(FakeLlm::answering("ok")),
        store,
    )
    .unwrap()
}

fn manuals_dir() -> TempDir {
    let dir = TempDir::new().unwrap();
    fs::write(dir.path().join("b_checklist.txt"), "Before start: doors closed.\x0cAfter start: APU off.").unwrap();
    fs::write(dir.path().join("a_limits.md"), "# Limits\n\nMax tire speed 225 mph.").unwrap();
    fs::write(dir.path().join("c_broken.pdf"), b"%PDF-1.4 this is not really a pdf").unwrap();
    fs::write(dir.path().join("d_notes.docx"), b"ignored").unwrap();
    fs::create_dir(dir.path().join("e_subdir")).unwrap();
    fs::write(dir.path().join("e_subdir").join("nested.txt"), "not visited").unwrap();
    dir
}

#[tokio::test]
async fn directory_batch_continues_past_bad_documents() {
    let dir = manuals_dir();
    let store = Arc::new(FaultyStore::new(32));
    let rag = pipeline(store.clone());

    let batch = rag.ingest_directory(dir.path()).await.unwrap();

    let sources: Vec<_> = batch
        .documents
        .iter()
        .map(|d| d.source.rsplit('/').next().unwrap().to_string())
        .collect();
    assert_eq!(sources, vec!["a_limits.md", "b_checklist.txt"]);

    assert_eq!(batch.failed_documents.len(), 1);
    assert!(batch.failed_documents[0].source.ends_with("c_broken.pdf"));

    assert_eq!(batch.stored(), 3);
    assert_eq!(batch.failed_chunks(), 0);
    assert_eq!(store.len().await.unwrap(), 3);
}

#[tokio::test]
async fn ingest_path_accepts_single_file() {
    let dir = manuals_dir();
    let rag = pipeline(Arc::new(FaultyStore::new(32)));

    let batch = rag
        .ingest_path(&dir.path().join("b_checklist.txt"))
        .await
        .unwrap();
    assert_eq!(batch.documents.len(), 1);
    assert_eq!(batch.documents[0].attempted, 2);
    assert_eq!(batch.documents[0].stored, 2);

    let hits = rag.retrieve("APU off", Some(1)).await.unwrap();
    assert_eq!(hits.len(), 1);
    assert_eq!(hits[0].page(), Some(2));
    assert_eq!(hits[0].source(), Some("b_checklist.txt"));
}

#[tokio::test]
async fn ingest_path_rejects_unsupported_file() {
    let dir = manuals_dir();
    let rag = pipeline(Arc::new(FaultyStore::new(32)));

    let err = rag
        .ingest_path(&dir.path().join("d_notes.docx"))
        .await
        .unwrap_err();
    assert!(matches!(err, aero_rag::Error::UnsupportedFileType(_)));
}

#[tokio::test]
async fn pdf_upload_is_stored_page_by_page() {
    let store = Arc::new(FaultyStore::new(32));
    let rag = pipeline(store.clone());
    let pdf = pdf_with_pages(&[
        "Hydraulic pressure 3000 psi",
        "Gear retraction 8 seconds",
    ])
    .unwrap();

    let report = rag.ingest_bytes("fcom.pdf", pdf).await.unwrap();
    assert_eq!(report.attempted, 2);
    assert_eq!(report.stored, 2);
    assert!(report.failed.is_empty());
    assert_eq!(store.len().await.unwrap(), 2);

    let hits = rag.retrieve("gear retraction seconds", Some(1)).await.unwrap();
    assert_eq!(hits.len(), 1);
    assert_eq!(hits[0].page(), Some(2));
    assert_eq!(hits[0].source(), Some("fcom.pdf"));
}
