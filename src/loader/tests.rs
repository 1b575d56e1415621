use super::*;
use crate::index::QuoteMetadata;
use crate::quantization::quantize_vector;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const DIM: usize = 4;

fn metadata_json() -> serde_json::Value {
    serde_json::json!([
        {"id": 0, "quote": "Know thyself", "author": "Socrates", "book_title": "Apology", "era": "Ancient"},
        {"id": 1, "quote": "The unexamined life", "author": "Socrates", "book_title": "Apology", "era": "Ancient"},
        {"id": 2, "quote": "Cogito ergo sum", "author": "Descartes", "book_title": "Meditations", "year": 1641}
    ])
}

fn embedding_bytes() -> Vec<u8> {
    let vectors = [
        [1.0f32, 0.0, 0.0, 0.0],
        [0.0, 1.0, 0.0, 0.0],
        [0.6, 0.8, 0.0, 0.0],
    ];
    vectors
        .iter()
        .flat_map(|v| quantize_vector(v))
        .map(|q| q as u8)
        .collect()
}

fn source(server: &MockServer, chunk_paths: &[&str]) -> CollectionSource {
    let base = Url::parse(&server.uri()).expect("mock server URI is valid");
    CollectionSource {
        metadata_url: base.join("/quotes.json").expect("valid path"),
        embedding_urls: chunk_paths
            .iter()
            .map(|p| base.join(p).expect("valid path"))
            .collect(),
        embedding_dim: DIM,
    }
}

async fn mount_collection(server: &MockServer) {
    Mock::given(method("GET"))
        .and(path("/quotes.json"))
        .respond_with(ResponseTemplate::new(200).set_body_json(metadata_json()))
        .expect(1)
        .mount(server)
        .await;
    Mock::given(method("GET"))
        .and(path("/quotes-0.bin"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(embedding_bytes()))
        .expect(1)
        .mount(server)
        .await;
}

#[tokio::test]
async fn load_fetches_and_assembles() {
    let server = MockServer::start().await;
    mount_collection(&server).await;

    let registry: IndexRegistry<QuoteMetadata> = IndexRegistry::new();
    let index = registry
        .load(&source(&server, &["/quotes-0.bin"]))
        .await
        .expect("load succeeds");

    assert_eq!(index.len(), 3);
    assert_eq!(index.embedding_dim(), DIM);
    assert_eq!(
        index.metadata_of(2).map(|m| m.author.as_str()),
        Some("Descartes")
    );
    assert_eq!(index.embedding_of(0), &[127, 0, 0, 0]);
    assert_eq!(registry.cached_count(), 1);
}

#[tokio::test]
async fn load_concatenates_chunks_in_order() {
    let server = MockServer::start().await;
    let bytes = embedding_bytes();
    let (a, b) = bytes.split_at(5);

    Mock::given(method("GET"))
        .and(path("/quotes.json"))
        .respond_with(ResponseTemplate::new(200).set_body_json(metadata_json()))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/quotes-0.bin"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(a.to_vec()))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/quotes-1.bin"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(b.to_vec()))
        .mount(&server)
        .await;

    let registry: IndexRegistry<QuoteMetadata> = IndexRegistry::new();
    let index = registry
        .load(&source(&server, &["/quotes-0.bin", "/quotes-1.bin"]))
        .await
        .expect("load succeeds");

    assert_eq!(index.embedding_of(0), &[127, 0, 0, 0]);
    assert_eq!(index.embedding_of(2), &[76, 102, 0, 0]);
}

#[tokio::test]
async fn concurrent_loads_share_one_fetch() {
    let server = MockServer::start().await;
    // expect(1) on each mock verifies the fetches are not duplicated.
    mount_collection(&server).await;

    let registry: IndexRegistry<QuoteMetadata> = IndexRegistry::new();
    let src = source(&server, &["/quotes-0.bin"]);

    let (first, second) = tokio::join!(registry.load(&src), registry.load(&src));
    let first = first.expect("load succeeds");
    let second = second.expect("load succeeds");

    assert!(Arc::ptr_eq(&first, &second));
    assert_eq!(registry.cached_count(), 1);
}

#[tokio::test]
async fn sequential_loads_hit_the_cache() {
    let server = MockServer::start().await;
    mount_collection(&server).await;

    let registry: IndexRegistry<QuoteMetadata> = IndexRegistry::new();
    let src = source(&server, &["/quotes-0.bin"]);

    let first = registry.load(&src).await.expect("load succeeds");
    let second = registry.load(&src).await.expect("load succeeds");
    assert!(Arc::ptr_eq(&first, &second));
}

#[tokio::test]
async fn non_success_status_fails_the_load() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/quotes.json"))
        .respond_with(ResponseTemplate::new(200).set_body_json(metadata_json()))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/quotes-0.bin"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let registry: IndexRegistry<QuoteMetadata> = IndexRegistry::new();
    let error = registry
        .load(&source(&server, &["/quotes-0.bin"]))
        .await
        .expect_err("load must fail");

    match error {
        SemquoteError::FetchStatus { status, url } => {
            assert_eq!(status, 404);
            assert!(url.ends_with("/quotes-0.bin"));
        }
        other => panic!("expected FetchStatus, got {other:?}"),
    }
    assert_eq!(registry.cached_count(), 0);
}

#[tokio::test]
async fn size_mismatch_fails_the_load() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/quotes.json"))
        .respond_with(ResponseTemplate::new(200).set_body_json(metadata_json()))
        .mount(&server)
        .await;
    // One byte short of 3 items x 4 dims.
    Mock::given(method("GET"))
        .and(path("/quotes-0.bin"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(vec![0u8; 11]))
        .mount(&server)
        .await;

    let registry: IndexRegistry<QuoteMetadata> = IndexRegistry::new();
    let error = registry
        .load(&source(&server, &["/quotes-0.bin"]))
        .await
        .expect_err("load must fail");

    assert_eq!(
        error,
        SemquoteError::SizeMismatch {
            expected: 12,
            actual: 11
        }
    );
}

#[tokio::test]
async fn malformed_metadata_fails_the_load() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/quotes.json"))
        .respond_with(ResponseTemplate::new(200).set_body_string("not json"))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/quotes-0.bin"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(embedding_bytes()))
        .mount(&server)
        .await;

    let registry: IndexRegistry<QuoteMetadata> = IndexRegistry::new();
    let error = registry
        .load(&source(&server, &["/quotes-0.bin"]))
        .await
        .expect_err("load must fail");

    assert!(matches!(error, SemquoteError::MetadataParse { .. }));
}

#[tokio::test]
async fn failed_load_does_not_poison_the_cache() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/quotes.json"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/quotes-0.bin"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(embedding_bytes()))
        .mount(&server)
        .await;

    let registry: IndexRegistry<QuoteMetadata> = IndexRegistry::new();
    let src = source(&server, &["/quotes-0.bin"]);

    registry.load(&src).await.expect_err("first load must fail");
    assert_eq!(registry.cached_count(), 0);

    // Fix the server; the registry must retry from scratch rather than
    // replay the failure.
    server.reset().await;
    mount_collection(&server).await;

    let index = registry.load(&src).await.expect("retry succeeds");
    assert_eq!(index.len(), 3);
    assert_eq!(registry.cached_count(), 1);
}

#[tokio::test]
async fn distinct_collections_cache_independently() {
    let server = MockServer::start().await;
    mount_collection(&server).await;
    Mock::given(method("GET"))
        .and(path("/other.json"))
        .respond_with(ResponseTemplate::new(200).set_body_json(metadata_json()))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/other-0.bin"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(embedding_bytes()))
        .mount(&server)
        .await;

    let base = Url::parse(&server.uri()).expect("mock server URI is valid");
    let other = CollectionSource {
        metadata_url: base.join("/other.json").expect("valid path"),
        embedding_urls: vec![base.join("/other-0.bin").expect("valid path")],
        embedding_dim: DIM,
    };

    let registry: IndexRegistry<QuoteMetadata> = IndexRegistry::new();
    let quotes = registry
        .load(&source(&server, &["/quotes-0.bin"]))
        .await
        .expect("load succeeds");
    let other = registry.load(&other).await.expect("load succeeds");

    assert!(!Arc::ptr_eq(&quotes, &other));
    assert_eq!(registry.cached_count(), 2);
}

#[test]
fn cache_key_derives_from_metadata_url() {
    let src = CollectionSource {
        metadata_url: Url::parse("https://example.com/quotes.json").expect("valid URL"),
        embedding_urls: vec![],
        embedding_dim: DIM,
    };
    assert_eq!(src.cache_key(), "https://example.com/quotes.json");
}
