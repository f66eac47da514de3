//! HTTP surface: the rendered report plus a small JSON API.

use std::sync::Arc;

use axum::{
    Json, Router,
    extract::State,
    http::StatusCode,
    response::{Html, IntoResponse, Response},
    routing::{get, post},
};
use serde::{Deserialize, Serialize};
use tower_http::trace::TraceLayer;

use crate::{
    report::{Report, escape_html},
    sql::{self, fmt::format_query_value},
};

#[derive(Debug, Deserialize)]
pub struct FormatRequest {
    /// `None` when the field is missing; an explicit `null` is `Some`.
    #[serde(default, deserialize_with = "present")]
    pub query: Option<serde_json::Value>,
}

fn present<'de, D>(deserializer: D) -> Result<Option<serde_json::Value>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    serde_json::Value::deserialize(deserializer).map(Some)
}

#[derive(Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct FormatResponse {
    pub formatted: String,
}

pub fn router(report: Arc<Report>) -> Router {
    Router::new()
        .route("/", get(page))
        .route("/api/results", get(results))
        .route("/api/format", post(format_text))
        .route("/health", get(health))
        .layer(TraceLayer::new_for_http())
        .with_state(report)
}

async fn page(State(report): State<Arc<Report>>) -> Response {
    match report.render().await {
        Ok(page) => Html(page).into_response(),
        Err(e) => report_failed(e),
    }
}

async fn results(State(report): State<Arc<Report>>) -> Response {
    match report.results().await {
        Ok(results) => Json(results).into_response(),
        Err(e) => report_failed(e),
    }
}

async fn format_text(Json(request): Json<FormatRequest>) -> Json<FormatResponse> {
    Json(FormatResponse {
        formatted: format_query_value(request.query.as_ref()),
    })
}

async fn health() -> &'static str {
    "ok"
}

fn report_failed(e: sql::Error) -> Response {
    tracing::error!("failed to run report: {e}");
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Html(format!("Report failed: {}", escape_html(&e.to_string()))),
    )
        .into_response()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sql::{DataSource, QueryDefinition, QueryResult};
    use axum::body::{Body, to_bytes};
    use axum::http::{Request, header};
    use tower::ServiceExt;

    fn report(database: &str, init_sql: Option<&str>) -> Arc<Report> {
        Arc::new(Report {
            title: "Test report".to_string(),
            definitions: vec![QueryDefinition {
                description: "Names".to_string(),
                query: "SELECT Name FROM Patients ORDER BY Name".to_string(),
            }],
            source: match init_sql {
                Some(init_sql) => DataSource::new(database).with_init_sql(init_sql),
                None => DataSource::new(database),
            },
        })
    }

    fn seeded() -> Arc<Report> {
        report(
            ":memory:",
            Some("CREATE TABLE Patients (Name TEXT); INSERT INTO Patients VALUES ('<Ada>'), ('Bob');"),
        )
    }

    async fn body_string(response: Response) -> String {
        let bytes = to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("read body");
        String::from_utf8(bytes.to_vec()).expect("utf-8 body")
    }

    #[tokio::test]
    async fn test_page() {
        let response = router(seeded())
            .oneshot(Request::get("/").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let body = body_string(response).await;
        assert!(body.contains("<title>Test report</title>"));
        assert!(body.contains("Query 1:"));
        assert!(body.contains("&lt;Ada&gt;"));
        assert!(!body.contains("<Ada>"));
    }

    #[tokio::test]
    async fn test_results() {
        let response = router(seeded())
            .oneshot(Request::get("/api/results").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let results: Vec<QueryResult> =
            serde_json::from_str(&body_string(response).await).expect("json body");
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].header, vec!["Name"]);
        assert_eq!(
            results[0].rows,
            vec![vec![Some("<Ada>".to_string())], vec![Some("Bob".to_string())]]
        );
    }

    #[tokio::test]
    async fn test_unreachable_database() {
        let dir = tempfile::tempdir().expect("tempdir");
        let missing = dir.path().join("missing.db");
        let response = router(report(&missing.to_string_lossy(), None))
            .oneshot(Request::get("/").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert!(body_string(response).await.starts_with("Report failed: open database"));
    }

    async fn post_format(body: &str) -> FormatResponse {
        let response = router(seeded())
            .oneshot(
                Request::post("/api/format")
                    .header(header::CONTENT_TYPE, "application/json")
                    .body(Body::from(body.to_string()))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        serde_json::from_str(&body_string(response).await).expect("json body")
    }

    #[tokio::test]
    async fn test_format() {
        let response = post_format(r#"{"query": "SELECT a FROM b"}"#).await;
        assert_eq!(response.formatted, "\n<b>SELECT</b> a \n<b>FROM</b> b");
    }

    #[tokio::test]
    async fn test_format_unexpected_type() {
        assert_eq!(
            post_format(r#"{"query": 7}"#).await.formatted,
            "Unexpected type: number"
        );
        assert_eq!(
            post_format(r#"{"query": null}"#).await.formatted,
            "Unexpected type: object"
        );
        assert_eq!(
            post_format(r#"{}"#).await.formatted,
            "Unexpected type: undefined"
        );
    }

    #[tokio::test]
    async fn test_health() {
        let response = router(seeded())
            .oneshot(Request::get("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(body_string(response).await, "ok");
    }
}
