/// Integration tests with mocked external APIs
/// Exercises the prospecting pipeline and Mercado Pago plan detection without hitting real services
use chrono::{Duration, Utc};
use rubi_backend::cache::{ProspectCache, QuerySignature};
use rubi_backend::integrations::mercadopago_client::{MercadoPagoClient, PlanApi};
use rubi_backend::models::{ProspectOutcome, ProspectQuery};
use rubi_backend::integrations::places_client::PlacesClient;
use rubi_backend::prospecting::{ProspectService, MAX_DETAIL_LOOKUPS};
use serde_json::json;
use wiremock::matchers::{header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate, Times};

fn padaria_query() -> ProspectQuery {
    ProspectQuery {
        niche: "padaria".to_string(),
        city: "Curitiba".to_string(),
        state: "PR".to_string(),
        no_website_only: None,
        low_rating_only: None,
    }
}

async fn mount_text_search(server: &MockServer, body: serde_json::Value, times: impl Into<Times>) {
    Mock::given(method("GET"))
        .and(path("/textsearch/json"))
        .and(query_param("query", "padaria em Curitiba PR"))
        .and(query_param("key", "test_key"))
        .respond_with(ResponseTemplate::new(200).set_body_json(body))
        .expect(times)
        .mount(server)
        .await;
}

async fn mount_details(
    server: &MockServer,
    place_id: &str,
    result: serde_json::Value,
    times: impl Into<Times>,
) {
    Mock::given(method("GET"))
        .and(path("/details/json"))
        .and(query_param("place_id", place_id))
        .and(query_param("key", "test_key"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({"status": "OK", "result": result})),
        )
        .expect(times)
        .mount(server)
        .await;
}

/// Two bakeries: one with a website (score 50), one without website and low rating (score 100).
async fn mount_two_bakeries(server: &MockServer, times: u64) {
    mount_text_search(
        server,
        json!({
            "status": "OK",
            "results": [
                {"place_id": "p1", "name": "Padaria Central"},
                {"place_id": "p2", "name": "Padaria do Bairro"}
            ]
        }),
        times,
    )
    .await;

    mount_details(
        server,
        "p1",
        json!({
            "name": "Padaria Central",
            "website": "https://padariacentral.com.br",
            "rating": 4.6,
            "formatted_phone_number": "(41) 3333-0001",
            "formatted_address": "Rua XV de Novembro, 100 - Centro, Curitiba - PR",
            "business_status": "OPERATIONAL"
        }),
        times,
    )
    .await;

    mount_details(
        server,
        "p2",
        json!({
            "name": "Padaria do Bairro",
            "rating": 3.4,
            "formatted_phone_number": "(41) 99999-0002",
            "formatted_address": "Rua das Flores, 20 - Batel, Curitiba - PR",
            "business_status": "OPERATIONAL",
            "geometry": {"location": {"lat": -25.43, "lng": -49.27}}
        }),
        times,
    )
    .await;
}

fn leads(outcome: ProspectOutcome) -> Vec<rubi_backend::models::BusinessRecord> {
    match outcome {
        ProspectOutcome::Leads(leads) => leads,
        other => panic!("expected leads, got {:?}", other),
    }
}

#[tokio::test]
async fn test_pipeline_scores_sorts_and_caches() {
    let mock_server = MockServer::start().await;
    mount_two_bakeries(&mock_server, 1).await;

    let cache = ProspectCache::new();
    let service = ProspectService::new(
        PlacesClient::new(mock_server.uri(), "test_key"),
        cache.clone(),
    );

    let result = leads(service.build_results(&padaria_query()).await.unwrap());

    assert_eq!(result.len(), 2);
    assert_eq!(result[0].name, "Padaria do Bairro");
    assert_eq!(result[0].score, 100);
    assert_eq!(result[1].name, "Padaria Central");
    assert_eq!(result[1].score, 50);
    assert!(result[0].geometry.is_some());

    let signature = QuerySignature::new(&padaria_query());
    assert_eq!(signature.as_str(), "padaria-Curitiba-PR-undefined-undefined");
    assert_eq!(cache.get(&signature), Some(result));
}

#[tokio::test]
async fn test_second_call_is_served_from_cache() {
    let mock_server = MockServer::start().await;
    // Each upstream endpoint must be hit exactly once across both calls
    mount_two_bakeries(&mock_server, 1).await;

    let service = ProspectService::new(
        PlacesClient::new(mock_server.uri(), "test_key"),
        ProspectCache::new(),
    );

    let first = service.build_results(&padaria_query()).await.unwrap();
    let second = service.build_results(&padaria_query()).await.unwrap();

    assert_eq!(
        serde_json::to_vec(&first).unwrap(),
        serde_json::to_vec(&second).unwrap()
    );
}

#[tokio::test]
async fn test_stale_entry_triggers_recomputation() {
    let mock_server = MockServer::start().await;
    mount_two_bakeries(&mock_server, 1).await;

    let cache = ProspectCache::new();
    let signature = QuerySignature::new(&padaria_query());
    cache.put_at(signature.clone(), vec![], Utc::now() - Duration::hours(25));

    let service = ProspectService::new(
        PlacesClient::new(mock_server.uri(), "test_key"),
        cache.clone(),
    );
    let result = leads(service.build_results(&padaria_query()).await.unwrap());

    assert_eq!(result.len(), 2);
    assert_eq!(cache.get(&signature).map(|l| l.len()), Some(2));
    assert_eq!(cache.len(), 1);
}

#[tokio::test]
async fn test_non_ok_status_short_circuits() {
    let mock_server = MockServer::start().await;
    mount_text_search(
        &mock_server,
        json!({"status": "ZERO_RESULTS", "results": []}),
        1,
    )
    .await;

    Mock::given(method("GET"))
        .and(path("/details/json"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"status": "OK"})))
        .expect(0)
        .mount(&mock_server)
        .await;

    let cache = ProspectCache::new();
    let service = ProspectService::new(
        PlacesClient::new(mock_server.uri(), "test_key"),
        cache.clone(),
    );

    let outcome = service.build_results(&padaria_query()).await.unwrap();
    assert_eq!(
        serde_json::to_value(&outcome).unwrap(),
        json!({"google_status": "ZERO_RESULTS"})
    );
    assert!(cache.is_empty());
}

#[tokio::test]
async fn test_provider_error_message_is_forwarded() {
    let mock_server = MockServer::start().await;
    mount_text_search(
        &mock_server,
        json!({
            "status": "REQUEST_DENIED",
            "error_message": "The provided API key is invalid.",
            "results": []
        }),
        1,
    )
    .await;

    let service = ProspectService::new(
        PlacesClient::new(mock_server.uri(), "test_key"),
        ProspectCache::new(),
    );

    let outcome = service.build_results(&padaria_query()).await.unwrap();
    assert_eq!(
        serde_json::to_value(&outcome).unwrap(),
        json!({
            "google_status": "REQUEST_DENIED",
            "google_error": "The provided API key is invalid."
        })
    );
}

#[tokio::test]
async fn test_one_failed_detail_fails_the_batch() {
    let mock_server = MockServer::start().await;
    mount_text_search(
        &mock_server,
        json!({"status": "OK", "results": [{"place_id": "p1"}, {"place_id": "p2"}]}),
        1,
    )
    .await;
    mount_details(&mock_server, "p1", json!({"name": "Ok"}), 0..=1).await;

    Mock::given(method("GET"))
        .and(path("/details/json"))
        .and(query_param("place_id", "p2"))
        .respond_with(ResponseTemplate::new(500).set_body_string("Internal Server Error"))
        .mount(&mock_server)
        .await;

    let cache = ProspectCache::new();
    let service = ProspectService::new(
        PlacesClient::new(mock_server.uri(), "test_key"),
        cache.clone(),
    );

    let result = service.build_results(&padaria_query()).await;
    assert!(result.is_err());
    assert!(cache.is_empty());
}

#[tokio::test]
async fn test_details_without_result_fail_the_batch() {
    let mock_server = MockServer::start().await;
    mount_text_search(
        &mock_server,
        json!({"status": "OK", "results": [{"place_id": "gone"}]}),
        1,
    )
    .await;

    Mock::given(method("GET"))
        .and(path("/details/json"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({"status": "NOT_FOUND"})),
        )
        .mount(&mock_server)
        .await;

    let service = ProspectService::new(
        PlacesClient::new(mock_server.uri(), "test_key"),
        ProspectCache::new(),
    );

    assert!(service.build_results(&padaria_query()).await.is_err());
}

#[tokio::test]
async fn test_fan_out_is_capped() {
    let mock_server = MockServer::start().await;
    let results: Vec<_> = (0..20)
        .map(|i| json!({"place_id": format!("place-{}", i)}))
        .collect();
    mount_text_search(&mock_server, json!({"status": "OK", "results": results}), 1).await;

    Mock::given(method("GET"))
        .and(path("/details/json"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "status": "OK",
            "result": {"name": "Lead", "formatted_phone_number": "(41) 3000-0000"}
        })))
        .expect(MAX_DETAIL_LOOKUPS as u64)
        .mount(&mock_server)
        .await;

    let service = ProspectService::new(
        PlacesClient::new(mock_server.uri(), "test_key"),
        ProspectCache::new(),
    );

    let result = leads(service.build_results(&padaria_query()).await.unwrap());
    assert_eq!(result.len(), MAX_DETAIL_LOOKUPS);
}

#[tokio::test]
async fn test_results_past_the_cap_may_lack_place_id() {
    let mock_server = MockServer::start().await;
    let mut results: Vec<_> = (0..MAX_DETAIL_LOOKUPS)
        .map(|i| json!({"place_id": format!("place-{}", i)}))
        .collect();
    results.push(json!({"name": "Sem identificador"}));
    mount_text_search(&mock_server, json!({"status": "OK", "results": results}), 1).await;

    Mock::given(method("GET"))
        .and(path("/details/json"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "status": "OK",
            "result": {"name": "Lead", "website": "https://lead.com.br"}
        })))
        .expect(MAX_DETAIL_LOOKUPS as u64)
        .mount(&mock_server)
        .await;

    let service = ProspectService::new(
        PlacesClient::new(mock_server.uri(), "test_key"),
        ProspectCache::new(),
    );

    let result = leads(service.build_results(&padaria_query()).await.unwrap());
    assert_eq!(result.len(), MAX_DETAIL_LOOKUPS);
}

#[tokio::test]
async fn test_looked_up_result_without_place_id_fails_the_batch() {
    let mock_server = MockServer::start().await;
    mount_text_search(
        &mock_server,
        json!({
            "status": "OK",
            "results": [{"place_id": "p1"}, {"name": "Sem identificador"}]
        }),
        1,
    )
    .await;
    mount_details(&mock_server, "p1", json!({"name": "Padaria Central"}), 0..=1).await;

    let cache = ProspectCache::new();
    let service = ProspectService::new(
        PlacesClient::new(mock_server.uri(), "test_key"),
        cache.clone(),
    );

    let err = service.build_results(&padaria_query()).await.unwrap_err();
    assert_eq!(err.status_code(), axum::http::StatusCode::INTERNAL_SERVER_ERROR);
    assert!(err.to_string().contains("without place_id"));
    assert!(cache.is_empty());
}

#[tokio::test]
async fn test_filters_apply_to_fresh_results() {
    let mock_server = MockServer::start().await;
    mount_two_bakeries(&mock_server, 1).await;

    let service = ProspectService::new(
        PlacesClient::new(mock_server.uri(), "test_key"),
        ProspectCache::new(),
    );
    let query = ProspectQuery {
        no_website_only: Some(true),
        low_rating_only: Some(true),
        ..padaria_query()
    };

    let result = leads(service.build_results(&query).await.unwrap());
    assert_eq!(result.len(), 1);
    assert_eq!(result[0].name, "Padaria do Bairro");
}

#[tokio::test]
async fn test_plan_api_prefers_subscriptions_shape() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/subscriptions/v1/plans/plan-new"))
        .and(header("authorization", "Bearer test_token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"id": "plan-new"})))
        .expect(1)
        .mount(&mock_server)
        .await;
    Mock::given(method("GET"))
        .and(path("/preapproval_plan/plan-new"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"id": "plan-new"})))
        .expect(0)
        .mount(&mock_server)
        .await;

    let client = MercadoPagoClient::new(mock_server.uri(), "test_token");
    assert_eq!(
        client.resolve_plan_api("plan-new").await,
        Some(PlanApi::Subscriptions)
    );
}

#[tokio::test]
async fn test_plan_api_falls_back_to_preapproval() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/subscriptions/v1/plans/plan-old"))
        .respond_with(ResponseTemplate::new(404).set_body_json(json!({"message": "not found"})))
        .expect(1)
        .mount(&mock_server)
        .await;
    Mock::given(method("GET"))
        .and(path("/preapproval_plan/plan-old"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"id": "plan-old"})))
        .expect(1)
        .mount(&mock_server)
        .await;

    let client = MercadoPagoClient::new(mock_server.uri(), "test_token");
    assert_eq!(
        client.resolve_plan_api("plan-old").await,
        Some(PlanApi::Preapproval)
    );
}

#[tokio::test]
async fn test_plan_api_fails_closed() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(404))
        .expect(2)
        .mount(&mock_server)
        .await;

    let client = MercadoPagoClient::new(mock_server.uri(), "test_token");
    assert_eq!(client.resolve_plan_api("missing").await, None);
}
