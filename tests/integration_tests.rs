//! Integration tests using mock HTTP server
//!
//! Tests the full flow: provider adapter → paginated, rate-limited calls →
//! records, partial results and bulk retries

use chainfetch::config::{AppConfig, ProviderKind};
use chainfetch::providers::{MoralisClient, OpenSeaClient, ProviderConfig, TatumClient};
use chainfetch::{Scheme, StopCause, Termination};
use pretty_assertions::assert_eq;
use serde_json::json;
use wiremock::matchers::{header, method, path, query_param, query_param_is_missing};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn provider_config(server: &MockServer) -> ProviderConfig {
    ProviderConfig::with_api_key("test-key")
        .endpoint(Scheme::Http, server.address().to_string())
        .rate_limit(100.0)
}

fn nft(token_id: usize) -> serde_json::Value {
    json!({"token_id": token_id.to_string(), "token_address": "0xabc"})
}

// ============================================================================
// Moralis
// ============================================================================

#[tokio::test]
async fn test_moralis_contract_nfts_follows_cursor() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api/v2/nft/0xabc"))
        .and(header("x-api-key", "test-key"))
        .and(query_param("chain", "eth"))
        .and(query_param_is_missing("cursor"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "total": 3,
            "cursor": "page2",
            "result": [nft(1), nft(2)]
        })))
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/api/v2/nft/0xabc"))
        .and(query_param("cursor", "page2"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "total": 3,
            "cursor": null,
            "result": [nft(3)]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let client = MoralisClient::new(provider_config(&server)).unwrap();
    let outcome = client.contract_nfts("0xabc", "eth", None).await.unwrap();

    assert!(outcome.is_complete());
    assert_eq!(outcome.pages, 2);
    assert_eq!(outcome.known_total, Some(3));
    let ids: Vec<_> = outcome
        .records
        .iter()
        .map(|r| r["token_id"].as_str().unwrap().to_string())
        .collect();
    assert_eq!(ids, vec!["1", "2", "3"]);
}

#[tokio::test]
async fn test_moralis_record_limit_stops_paging() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api/v2/nft/0xabc"))
        .and(query_param_is_missing("cursor"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "cursor": "page2",
            "result": [nft(1), nft(2)]
        })))
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/api/v2/nft/0xabc"))
        .and(query_param("cursor", "page2"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "cursor": "page3",
            "result": [nft(3), nft(4)]
        })))
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/api/v2/nft/0xabc"))
        .and(query_param("cursor", "page3"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "cursor": null,
            "result": [nft(5)]
        })))
        .expect(0)
        .mount(&server)
        .await;

    let client = MoralisClient::new(provider_config(&server).max_records(3)).unwrap();
    let outcome = client.contract_nfts("0xabc", "eth", None).await.unwrap();

    assert_eq!(outcome.termination, Termination::LimitReached);
    assert_eq!(outcome.records.len(), 3);
}

#[tokio::test]
async fn test_moralis_transfers_partial_on_server_error() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api/v2/0xwallet/nft/transfers"))
        .and(query_param("direction", "to"))
        .and(query_param_is_missing("cursor"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "cursor": "next",
            "result": [nft(1), nft(2)]
        })))
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/api/v2/0xwallet/nft/transfers"))
        .and(query_param("cursor", "next"))
        .respond_with(ResponseTemplate::new(502))
        .mount(&server)
        .await;

    let client = MoralisClient::new(provider_config(&server)).unwrap();
    let outcome = client
        .nft_transfers("0xwallet", "eth", None, Some("to"))
        .await
        .unwrap();

    assert!(outcome.is_partial());
    assert_eq!(outcome.records.len(), 2);
    assert!(matches!(
        outcome.termination,
        Termination::Partial(StopCause::HttpStatus { status: 502, .. })
    ));

    let err = outcome.into_complete().unwrap_err();
    assert!(err.to_string().contains("after 2 records"));
}

#[tokio::test]
async fn test_moralis_token_metadata_lifts_fields() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api/v2/nft/0xabc/7"))
        .and(query_param("chain", "polygon"))
        .and(query_param("format", "decimal"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "token_id": "7",
            "metadata": "{\"name\":\"Seven\",\"image\":\"ipfs://seven\"}"
        })))
        .mount(&server)
        .await;

    let client = MoralisClient::new(provider_config(&server)).unwrap();
    let fields = vec!["name".to_string(), "attributes".to_string()];
    let record = client
        .token_metadata("0xabc", "7", "polygon", Some("decimal"), &fields)
        .await
        .unwrap();

    assert_eq!(record["token_id"], json!("7"));
    assert_eq!(record["name"], json!("Seven"));
    assert_eq!(record["attributes"], serde_json::Value::Null);
}

#[tokio::test]
async fn test_moralis_many_metadata_reports_failures() {
    let server = MockServer::start().await;

    for token in ["1", "2"] {
        Mock::given(method("GET"))
            .and(path(format!("/api/v2/nft/0xabc/{token}")))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(json!({"token_id": token})),
            )
            .mount(&server)
            .await;
    }
    Mock::given(method("GET"))
        .and(path("/api/v2/nft/0xabc/bad"))
        .respond_with(ResponseTemplate::new(500))
        .expect(3)
        .mount(&server)
        .await;

    let client = MoralisClient::new(provider_config(&server)).unwrap();
    let outcome = client
        .many_token_metadata(
            "0xabc",
            vec!["1".into(), "bad".into(), "2".into()],
            "eth",
            None,
            &[],
        )
        .await;

    assert!(!outcome.is_complete());
    let ids: Vec<_> = outcome.succeeded.iter().map(|(id, _)| id.as_str()).collect();
    assert_eq!(ids, vec!["1", "2"]);
    assert_eq!(outcome.permanently_failed.len(), 1);
    assert_eq!(outcome.permanently_failed[0].item, "bad");
    assert_eq!(outcome.permanently_failed[0].attempts, 3);
}

#[tokio::test]
async fn test_moralis_resync_status() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api/v2/nft/0xabc/1/metadata/resync"))
        .and(query_param("flag", "uri"))
        .and(query_param("mode", "sync"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"status": "completed"})))
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/api/v2/nft/0xabc/2/metadata/resync"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({"status": "Resync request submitted"})),
        )
        .mount(&server)
        .await;

    let client = MoralisClient::new(provider_config(&server)).unwrap();
    assert!(client.resync_metadata("0xabc", "1", "eth").await.unwrap());
    assert!(!client.resync_metadata("0xabc", "2", "eth").await.unwrap());

    let outcome = client
        .resync_many("0xabc", vec!["1".into(), "2".into()], "eth", None)
        .await;
    assert_eq!(outcome.succeeded.len(), 1);
    assert_eq!(outcome.permanently_failed[0].item, "2");
    assert!(outcome.permanently_failed[0]
        .last_error
        .contains("did not complete"));
}

// ============================================================================
// Tatum
// ============================================================================

#[tokio::test]
async fn test_tatum_current_block_with_testnet_header() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/v3/ethereum/block/current"))
        .and(header("x-api-key", "test-key"))
        .and(header("x-testnet-type", "ethereum-sepolia"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!(3_100_200)))
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/v3/ethereum/block/current"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("content-type", "text/plain")
                .set_body_string("15537393"),
        )
        .mount(&server)
        .await;

    let client = TatumClient::new(provider_config(&server)).unwrap();
    assert_eq!(
        client.current_block(Some("ethereum-sepolia")).await.unwrap(),
        3_100_200
    );
    assert_eq!(client.current_block(None).await.unwrap(), 15_537_393);
}

#[tokio::test]
async fn test_tatum_multitoken_transactions_offset_pages() {
    let server = MockServer::start().await;
    let route = "/v3/multitoken/transaction/ETH/0xacct/0xtoken";

    for (offset, count) in [("0", 2), ("2", 2), ("4", 0)] {
        let page: Vec<_> = (0..count).map(|i| json!({"tx": format!("{offset}-{i}")})).collect();
        Mock::given(method("GET"))
            .and(path(route))
            .and(query_param("offset", offset))
            .and(query_param("pageSize", "2"))
            .and(query_param("from", "100"))
            .respond_with(ResponseTemplate::new(200).set_body_json(page))
            .expect(1)
            .mount(&server)
            .await;
    }

    let client = TatumClient::new(provider_config(&server).page_size(2)).unwrap();
    let outcome = client
        .multitoken_transactions("0xacct", "0xtoken", "ETH", Some(100), None)
        .await
        .unwrap();

    assert!(outcome.is_complete());
    assert_eq!(outcome.records.len(), 4);
    assert_eq!(outcome.pages, 3);
    assert_eq!(outcome.records[3]["tx"], json!("2-1"));
}

// ============================================================================
// OpenSea
// ============================================================================

#[tokio::test]
async fn test_opensea_token_metadata() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api/v1/metadata/0xabc/0x1f"))
        .and(query_param("format", "json"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "name": "Token 31",
            "attributes": []
        })))
        .mount(&server)
        .await;

    let config = ProviderConfig::default()
        .endpoint(Scheme::Http, server.address().to_string())
        .rate_limit(100.0);
    let client = OpenSeaClient::new(config).unwrap();
    let record = client
        .token_metadata("0xabc", "0x1f", Some("json"))
        .await
        .unwrap();

    assert_eq!(record["name"], json!("Token 31"));
}

// ============================================================================
// Configuration → Provider
// ============================================================================

#[tokio::test]
async fn test_config_file_drives_provider() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/v3/ethereum/block/current"))
        .and(header("x-api-key", "from-config"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!(42)))
        .expect(1)
        .mount(&server)
        .await;

    let yaml = format!(
        r#"
tatum:
  api_key: from-config
  host: "{}"
  scheme: http
  rate_limit: 50
"#,
        server.address()
    );
    let config = AppConfig::from_yaml_str(&yaml).unwrap();
    let client = TatumClient::new(config.provider_config(ProviderKind::Tatum).unwrap()).unwrap();

    assert_eq!(client.current_block(None).await.unwrap(), 42);
}
