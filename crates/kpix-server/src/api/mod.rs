use std::collections::HashMap;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use axum::{
    extract::{rejection::JsonRejection, State},
    http::{header, HeaderName, Method, StatusCode},
    response::IntoResponse,
    routing::{get, post},
    Extension, Json, Router,
};
use kpix_core::{Platform, ProfileKpi};
use kpix_extract::HybridOrchestrator;
use serde::Serialize;
use tower::ServiceBuilder;
use tower_http::cors::CorsLayer;

use crate::middleware::{enforce_rate_limit, request_id, RateLimitState, RequestId};

#[derive(Clone)]
pub struct AppState {
    pub orchestrator: Arc<HybridOrchestrator>,
}

#[derive(Debug, Serialize)]
pub struct ExtractResponse {
    pub success: bool,
    pub data: HashMap<Platform, ProfileKpi>,
}

#[derive(Debug, Serialize)]
pub struct ApiFailure {
    pub success: bool,
    pub message: String,
}

impl ApiFailure {
    fn bad_request(message: impl Into<String>) -> (StatusCode, Json<Self>) {
        (
            StatusCode::BAD_REQUEST,
            Json(Self {
                success: false,
                message: message.into(),
            }),
        )
    }
}

#[derive(Debug, Serialize)]
struct HealthData {
    status: &'static str,
    request_id: String,
}

pub fn default_rate_limit_state(max_requests: usize) -> RateLimitState {
    RateLimitState::new(max_requests, Duration::from_secs(3600))
}

fn build_cors() -> CorsLayer {
    CorsLayer::new()
        .allow_origin(tower_http::cors::Any)
        .allow_methods([Method::GET, Method::POST])
        .allow_headers([
            header::CONTENT_TYPE,
            HeaderName::from_static("x-request-id"),
        ])
}

pub fn build_app(state: AppState, rate_limit: RateLimitState) -> Router {
    Router::new()
        .route("/api/health", get(health))
        .route(
            "/api/extract",
            post(extract).layer(axum::middleware::from_fn_with_state(
                rate_limit,
                enforce_rate_limit,
            )),
        )
        .layer(
            ServiceBuilder::new()
                .layer(build_cors())
                .layer(axum::middleware::from_fn(request_id)),
        )
        .with_state(state)
}

async fn health(Extension(req_id): Extension<RequestId>) -> impl IntoResponse {
    Json(serde_json::json!({
        "success": true,
        "data": HealthData {
            status: "ok",
            request_id: req_id.0,
        },
    }))
}

/// Body maps platform name to profile URL or handle, e.g.
/// `{"instagram": "https://instagram.com/natgeo"}`. Unknown platform names
/// and empty bodies are rejected up front; extraction failures never fail
/// the request, they come back as unsuccessful snapshots.
async fn extract(
    State(state): State<AppState>,
    body: Result<Json<HashMap<String, String>>, JsonRejection>,
) -> axum::response::Response {
    let Json(body) = match body {
        Ok(body) => body,
        Err(rejection) => {
            return ApiFailure::bad_request(format!("invalid request body: {rejection}"))
                .into_response();
        }
    };

    if body.is_empty() {
        return ApiFailure::bad_request("request body must map platform names to profile URLs")
            .into_response();
    }

    let mut requests: HashMap<Platform, String> = HashMap::with_capacity(body.len());
    for (name, target) in body {
        let Ok(platform) = Platform::from_str(&name) else {
            return ApiFailure::bad_request(format!("unknown platform: {name}")).into_response();
        };
        if target.trim().is_empty() {
            return ApiFailure::bad_request(format!("empty target for platform {platform}"))
                .into_response();
        }
        requests.insert(platform, target);
    }

    let data = state.orchestrator.extract_all(&requests).await;
    (
        StatusCode::OK,
        Json(ExtractResponse {
            success: true,
            data,
        }),
    )
        .into_response()
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use axum::body::{to_bytes, Body};
    use axum::http::Request;
    use kpix_cache::CacheManager;
    use kpix_core::EngagementMetrics;
    use kpix_extract::{
        ExtractError, Extractor, OrchestratorConfig, PlatformLimiters, RetryPolicy,
    };
    use tower::ServiceExt;

    struct FixedExtractor {
        platform: Platform,
        followers: u64,
    }

    #[async_trait]
    impl Extractor for FixedExtractor {
        fn platform(&self) -> Platform {
            self.platform
        }

        async fn api_followers(&self, _target: &str) -> Result<u64, ExtractError> {
            Ok(self.followers)
        }

        async fn api_engagement(&self, _target: &str) -> Result<EngagementMetrics, ExtractError> {
            Err(ExtractError::Unsupported {
                platform: self.platform,
            })
        }

        async fn scrape_followers(&self, _target: &str) -> Result<u64, ExtractError> {
            Err(ExtractError::Unsupported {
                platform: self.platform,
            })
        }

        async fn scrape_engagement(
            &self,
            _target: &str,
        ) -> Result<EngagementMetrics, ExtractError> {
            Err(ExtractError::Unsupported {
                platform: self.platform,
            })
        }

        fn estimate_engagement(&self, followers: u64) -> EngagementMetrics {
            kpix_extract::estimate::estimate_engagement(
                kpix_extract::descriptor(self.platform),
                followers,
            )
        }
    }

    fn test_app() -> Router {
        let mut extractors: HashMap<Platform, Arc<dyn Extractor>> = HashMap::new();
        for platform in Platform::ALL {
            extractors.insert(
                platform,
                Arc::new(FixedExtractor {
                    platform,
                    followers: 1234,
                }),
            );
        }
        let orchestrator = Arc::new(HybridOrchestrator::new(
            extractors,
            Arc::new(CacheManager::memory_only(60)),
            Arc::new(PlatformLimiters::new()),
            RetryPolicy::new(0),
            OrchestratorConfig::default(),
        ));
        build_app(AppState { orchestrator }, default_rate_limit_state(100))
    }

    async fn body_json(response: axum::response::Response) -> serde_json::Value {
        let bytes = to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("body bytes");
        serde_json::from_slice(&bytes).expect("json parse")
    }

    #[tokio::test]
    async fn health_reports_ok_and_echoes_request_id() {
        let response = test_app()
            .oneshot(
                Request::builder()
                    .uri("/api/health")
                    .header("x-request-id", "abc-123")
                    .body(Body::empty())
                    .expect("request"),
            )
            .await
            .expect("response");

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response.headers().get("x-request-id").unwrap(),
            "abc-123"
        );
        let json = body_json(response).await;
        assert_eq!(json["success"], true);
        assert_eq!(json["data"]["status"], "ok");
        assert_eq!(json["data"]["request_id"], "abc-123");
    }

    #[tokio::test]
    async fn extract_returns_snapshot_per_platform() {
        let response = test_app()
            .oneshot(
                Request::builder()
                    .method(Method::POST)
                    .uri("/api/extract")
                    .header(header::CONTENT_TYPE, "application/json")
                    .body(Body::from(
                        r#"{"instagram": "https://instagram.com/natgeo"}"#,
                    ))
                    .expect("request"),
            )
            .await
            .expect("response");

        assert_eq!(response.status(), StatusCode::OK);
        let json = body_json(response).await;
        assert_eq!(json["success"], true);
        let kpi = &json["data"]["instagram"];
        assert_eq!(kpi["followers_count"], 1234);
        assert_eq!(kpi["extraction_success"], true);
    }

    #[tokio::test]
    async fn extract_rejects_unknown_platform() {
        let response = test_app()
            .oneshot(
                Request::builder()
                    .method(Method::POST)
                    .uri("/api/extract")
                    .header(header::CONTENT_TYPE, "application/json")
                    .body(Body::from(r#"{"myspace": "https://myspace.com/tom"}"#))
                    .expect("request"),
            )
            .await
            .expect("response");

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let json = body_json(response).await;
        assert_eq!(json["success"], false);
        assert!(json["message"]
            .as_str()
            .unwrap()
            .contains("unknown platform"));
    }

    #[tokio::test]
    async fn extract_rejects_empty_body() {
        let response = test_app()
            .oneshot(
                Request::builder()
                    .method(Method::POST)
                    .uri("/api/extract")
                    .header(header::CONTENT_TYPE, "application/json")
                    .body(Body::from("{}"))
                    .expect("request"),
            )
            .await
            .expect("response");

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let json = body_json(response).await;
        assert_eq!(json["success"], false);
    }

    #[tokio::test]
    async fn extract_rejects_malformed_json_with_structured_body() {
        let response = test_app()
            .oneshot(
                Request::builder()
                    .method(Method::POST)
                    .uri("/api/extract")
                    .header(header::CONTENT_TYPE, "application/json")
                    .body(Body::from("not json"))
                    .expect("request"),
            )
            .await
            .expect("response");

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let json = body_json(response).await;
        assert_eq!(json["success"], false);
    }

    #[tokio::test]
    async fn rate_limit_rejects_after_window_fills() {
        let mut extractors: HashMap<Platform, Arc<dyn Extractor>> = HashMap::new();
        extractors.insert(
            Platform::Instagram,
            Arc::new(FixedExtractor {
                platform: Platform::Instagram,
                followers: 1,
            }),
        );
        let orchestrator = Arc::new(HybridOrchestrator::new(
            extractors,
            Arc::new(CacheManager::memory_only(60)),
            Arc::new(PlatformLimiters::new()),
            RetryPolicy::new(0),
            OrchestratorConfig::default(),
        ));
        let app = build_app(AppState { orchestrator }, default_rate_limit_state(1));

        let request = || {
            Request::builder()
                .method(Method::POST)
                .uri("/api/extract")
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(
                    r#"{"instagram": "https://instagram.com/natgeo"}"#,
                ))
                .expect("request")
        };

        let first = app.clone().oneshot(request()).await.expect("response");
        assert_eq!(first.status(), StatusCode::OK);

        let second = app.oneshot(request()).await.expect("response");
        assert_eq!(second.status(), StatusCode::TOO_MANY_REQUESTS);
    }
}
