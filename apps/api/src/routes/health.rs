use axum::{extract::State, Json};
use serde_json::{json, Value};

use crate::state::AppState;

/// GET /health
/// Returns a simple status object with service version.
pub async fn health_handler(State(state): State<AppState>) -> Json<Value> {
    Json(json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
        "service": env!("CARGO_PKG_NAME"),
        "hrflow_configured": state.config.hrflow.credentials().is_some()
    }))
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use axum::{
        body::{to_bytes, Body},
        http::{Request, StatusCode},
    };
    use serde_json::Value;
    use tower::ServiceExt;

    use crate::config::HrflowConfig;
    use crate::documents::hrflow::HrflowParser;
    use crate::llm_client::LlmClient;
    use crate::routes::build_router;
    use crate::scoring::ReviewedHybridScorer;
    use crate::state::AppState;

    #[tokio::test]
    async fn test_health_reports_ok() {
        let llm = LlmClient::new("sk-test".to_string(), "http://127.0.0.1:9".to_string());
        let app = build_router(AppState::for_tests(
            Arc::new(HrflowParser::new(&HrflowConfig::default())),
            Arc::new(ReviewedHybridScorer::new(llm)),
        ));
        let response = app
            .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body: Value =
            serde_json::from_slice(&to_bytes(response.into_body(), usize::MAX).await.unwrap())
                .unwrap();
        assert_eq!(body["status"], "ok");
        assert_eq!(body["service"], "staffing-api");
        assert_eq!(body["hrflow_configured"], false);
    }
}
