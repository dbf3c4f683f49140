//! Triage API router.
//!
//! Returns a composable `Router` that can be mounted on any axum server.
//! Routes are nested under `/api/`.

use axum::http::Method;
use axum::routing::{get, post};
use axum::Router;
use tower_http::cors::{Any, CorsLayer};

use crate::api::endpoints;
use crate::api::middleware;
use crate::api::types::ApiContext;

/// Build the API router with all endpoints under `/api/`.
///
/// NOTE: Path params use `:param` syntax (matchit 0.7 / axum 0.7).
pub fn api_router(ctx: ApiContext) -> Router {
    let cors = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST])
        .allow_headers(Any)
        .allow_origin(Any);

    let routes = Router::new()
        .route("/health", get(endpoints::health::check))
        .route("/areas", get(endpoints::areas::list))
        .route("/sessions", post(endpoints::sessions::create))
        .route("/sessions/:id", get(endpoints::sessions::detail))
        .route("/triage", post(endpoints::triage::run))
        .route("/tip", get(endpoints::tip::daily))
        .route("/models", get(endpoints::models::list))
        .with_state(ctx)
        .layer(axum::middleware::from_fn(middleware::audit::log_access));

    Router::new().nest("/api", routes).layer(cors)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::time::Duration;

    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use http_body_util::BodyExt;
    use tower::ServiceExt;

    use crate::catalog::FacilityCatalog;
    use crate::config::AppConfig;
    use crate::geo::GeoPoint;
    use crate::models::FacilityRecord;
    use crate::pipeline::gateway::{
        GatewayError, LlmClient, MockLlmClient, ModelGateway, ModelInfo, RetryPolicy,
    };
    use crate::pipeline::{MatchOptions, TriagePipeline};

    const CAT_REPLY: &str =
        "URGENCY: MEDIUM\nRESPONSE: 今天帶去看醫生\nANIMAL_TYPE: 貓\nSEARCH_KEYWORDS: 貓 動物醫院";

    fn catalog() -> &'static FacilityCatalog {
        let record = |name: &str, lat: f64, tags: &[&str]| FacilityRecord {
            name: name.into(),
            rating: "4.7".into(),
            status: "營業中".into(),
            position: Some(GeoPoint { lat, lon: 121.5170 }),
            tags: tags.iter().map(|t| t.to_string()).collect(),
        };
        Box::leak(Box::new(FacilityCatalog::from_records(vec![
            record("貓專科", 25.06, &["貓"]),
            record("夜間急診", 25.05, &["24H", "急診"]),
        ])))
    }

    /// Answers like the mock, after a delay.
    struct SlowLlmClient {
        delay: Duration,
        inner: MockLlmClient,
    }

    impl LlmClient for SlowLlmClient {
        fn generate(&self, model: &str, prompt: &str) -> Result<String, GatewayError> {
            std::thread::sleep(self.delay);
            self.inner.generate(model, prompt)
        }

        fn list_models(&self) -> Result<Vec<ModelInfo>, GatewayError> {
            self.inner.list_models()
        }
    }

    fn context(mock: impl LlmClient + 'static) -> ApiContext {
        let config = AppConfig {
            api_key: Some("test-key".into()),
            ..AppConfig::default()
        };
        let gateway = ModelGateway::new(
            Arc::new(mock),
            RetryPolicy::immediate(vec!["A".into(), "B".into()]),
            "tip-model".into(),
        );
        let pipeline = TriagePipeline::new(gateway, catalog(), MatchOptions::default());
        ApiContext::new(pipeline, config)
    }

    fn app(mock: MockLlmClient) -> Router {
        api_router(context(mock))
    }

    fn get_request(uri: &str) -> Request<Body> {
        Request::builder().uri(uri).body(Body::empty()).unwrap()
    }

    fn post_json(uri: &str, body: serde_json::Value) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri(uri)
            .header("Content-Type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    async fn response_json(response: axum::http::Response<Body>) -> serde_json::Value {
        let body = response.into_body().collect().await.unwrap().to_bytes();
        serde_json::from_slice(&body).unwrap()
    }

    #[tokio::test]
    async fn health_reports_catalog_and_key() {
        let response = app(MockLlmClient::new(CAT_REPLY))
            .oneshot(get_request("/api/health"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let json = response_json(response).await;
        assert_eq!(json["status"], "ok");
        assert_eq!(json["api_key_configured"], true);
        assert_eq!(json["catalog_size"], 2);
        assert_eq!(json["catalog"]["state"], "loaded");
        assert_eq!(json["match_options"]["cap"], 5);
        assert!(json["match_options"]["radius_km"].is_null());
    }

    #[tokio::test]
    async fn areas_lists_presets() {
        let response = app(MockLlmClient::new(CAT_REPLY))
            .oneshot(get_request("/api/areas"))
            .await
            .unwrap();
        let json = response_json(response).await;
        assert_eq!(json["areas"][0]["name"], "台北車站");
        assert!(json["default_location"]["lat"].is_number());
    }

    #[tokio::test]
    async fn triage_returns_complete_report() {
        let response = app(MockLlmClient::new(CAT_REPLY))
            .oneshot(post_json(
                "/api/triage",
                serde_json::json!({ "symptoms": "貓咪一直打噴嚏", "lat": 25.0478, "lon": 121.5170 }),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let json = response_json(response).await;
        assert!(json["session_id"].is_string());
        assert_eq!(json["result"]["urgency"], "MEDIUM");
        assert_eq!(json["result"]["animal_type"], "貓");
        assert_eq!(json["source"]["model"], "A");
        assert_eq!(json["degraded"], false);
        assert_eq!(json["match_status"], "found");
        assert_eq!(json["facilities"][0]["facility"]["name"], "貓專科");
        assert!(json["map_search_url"]
            .as_str()
            .unwrap()
            .starts_with("https://www.google.com/maps/search/?api=1&query="));
    }

    #[tokio::test]
    async fn triage_outage_still_answers_with_er_facilities() {
        let mock = MockLlmClient::failing(GatewayError::RateLimited {
            model: "any".into(),
            body: String::new(),
        });
        let response = app(mock)
            .oneshot(post_json("/api/triage", serde_json::json!({ "symptoms": "狗狗抽搐" })))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let json = response_json(response).await;
        assert_eq!(json["result"]["urgency"], "HIGH");
        assert_eq!(json["degraded"], true);
        assert_eq!(json["source"]["kind"], "system_busy");
        assert_eq!(json["facilities"][0]["facility"]["name"], "夜間急診");
        assert_eq!(json["location"]["source"], "default");
    }

    #[tokio::test]
    async fn triage_rejects_empty_symptoms() {
        let response = app(MockLlmClient::new(CAT_REPLY))
            .oneshot(post_json("/api/triage", serde_json::json!({ "symptoms": "   " })))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let json = response_json(response).await;
        assert_eq!(json["error"]["code"], "BAD_REQUEST");
    }

    #[tokio::test]
    async fn triage_rejects_oversized_symptoms() {
        let long = "咳".repeat(2_001);
        let response = app(MockLlmClient::new(CAT_REPLY))
            .oneshot(post_json("/api/triage", serde_json::json!({ "symptoms": long })))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn triage_rejects_unknown_session() {
        let response = app(MockLlmClient::new(CAT_REPLY))
            .oneshot(post_json(
                "/api/triage",
                serde_json::json!({ "symptoms": "貓咳嗽", "session_id": uuid::Uuid::new_v4() }),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn session_keeps_sticky_model_across_turns() {
        let router = app(MockLlmClient::new(CAT_REPLY));

        let created = router
            .clone()
            .oneshot(post_json("/api/sessions", serde_json::json!({})))
            .await
            .unwrap();
        assert_eq!(created.status(), StatusCode::CREATED);
        let id = response_json(created).await["id"].as_str().unwrap().to_string();

        let turn = router
            .clone()
            .oneshot(post_json(
                "/api/triage",
                serde_json::json!({ "symptoms": "貓咪嘔吐", "session_id": id, "area": "信義區" }),
            ))
            .await
            .unwrap();
        assert_eq!(turn.status(), StatusCode::OK);
        assert_eq!(response_json(turn).await["location"]["name"], "信義區");

        let snapshot = router
            .oneshot(get_request(&format!("/api/sessions/{id}")))
            .await
            .unwrap();
        let json = response_json(snapshot).await;
        assert_eq!(json["sticky_model"], "A");
        assert_eq!(json["transcript"].as_array().unwrap().len(), 2);
        assert_eq!(json["transcript"][0]["role"], "user");
    }

    #[tokio::test]
    async fn abandoned_turn_still_checks_session_in() {
        let router = api_router(context(SlowLlmClient {
            delay: Duration::from_millis(300),
            inner: MockLlmClient::new(CAT_REPLY),
        }));

        let created = router
            .clone()
            .oneshot(post_json("/api/sessions", serde_json::json!({})))
            .await
            .unwrap();
        let id = response_json(created).await["id"].as_str().unwrap().to_string();

        // The client gives up while the model call is still running.
        let abandoned = tokio::time::timeout(
            Duration::from_millis(50),
            router.clone().oneshot(post_json(
                "/api/triage",
                serde_json::json!({ "symptoms": "貓咪嘔吐", "session_id": id }),
            )),
        )
        .await;
        assert!(abandoned.is_err());

        tokio::time::sleep(Duration::from_millis(800)).await;
        let snapshot = router
            .clone()
            .oneshot(get_request(&format!("/api/sessions/{id}")))
            .await
            .unwrap();
        assert_eq!(snapshot.status(), StatusCode::OK);
        let json = response_json(snapshot).await;
        assert_eq!(json["sticky_model"], "A");
        assert_eq!(json["transcript"].as_array().unwrap().len(), 2);

        // The session accepts the next turn.
        let next = router
            .oneshot(post_json(
                "/api/triage",
                serde_json::json!({ "symptoms": "還是在吐", "session_id": id }),
            ))
            .await
            .unwrap();
        assert_eq!(next.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn session_detail_validates_id() {
        let router = app(MockLlmClient::new(CAT_REPLY));
        let response = router
            .clone()
            .oneshot(get_request("/api/sessions/not-a-uuid"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let response = router
            .oneshot(get_request(&format!("/api/sessions/{}", uuid::Uuid::new_v4())))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn tip_falls_back_when_model_fails() {
        let response = app(MockLlmClient::failing(GatewayError::Timeout(15)))
            .oneshot(get_request("/api/tip"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let json = response_json(response).await;
        assert_eq!(json["tip"], crate::pipeline::prompt::TIP_FALLBACK);
    }

    #[tokio::test]
    async fn models_reports_recommended_availability() {
        let mock = MockLlmClient::new(CAT_REPLY).with_models(vec![ModelInfo {
            name: "A".into(),
            display_name: None,
            supported_generation_methods: vec!["generateContent".into()],
        }]);
        let response = app(mock).oneshot(get_request("/api/models")).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let json = response_json(response).await;
        assert_eq!(json["recommended"], "A");
        assert_eq!(json["recommended_available"], true);
    }

    #[tokio::test]
    async fn models_without_key_is_503() {
        let response = app(MockLlmClient::failing(GatewayError::MissingApiKey))
            .oneshot(get_request("/api/models"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(response_json(response).await["error"]["code"], "NOT_CONFIGURED");
    }

    #[tokio::test]
    async fn unknown_route_is_404() {
        let response = app(MockLlmClient::new(CAT_REPLY))
            .oneshot(get_request("/nonexistent"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }
}
