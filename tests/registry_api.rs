mod common;

use anyhow::Result;
use axum::http::StatusCode;
use chrono::Duration;
use common::ensure_config;
use indicator_registry::datamodel::IndicatorDocument;
use indicator_registry::test_utils::TestRegistry;
use indicator_registry::test_utils::fixtures::document_json;
use indicator_registry::test_utils::http::TestApp;
use serde_json::Value;
use serial_test::serial;

const DOCUMENT_A: &str = r#"{
    "apiVersion": "indicatorprotocol.io/v1",
    "metadata": { "labels": { "deployment": "abc-123" } },
    "spec": {
        "product": { "name": "my-product-a", "version": "1" },
        "indicators": [
            {
                "name": "indie1",
                "promql": "promql1",
                "thresholds": [{ "level": "critical", "operator": "gt", "value": 10 }]
            },
            { "name": "indie2", "promql": "promql2" }
        ]
    }
}"#;

fn test_app() -> Result<(TestRegistry, TestApp)> {
    ensure_config();
    let registry = TestRegistry::new()?;
    let app = TestApp::new(registry.state.clone())?;
    Ok((registry, app))
}

async fn list(app: &TestApp) -> Result<Vec<IndicatorDocument>> {
    let response = app.get("/v1/indicator-documents").await?;
    response.assert_status(StatusCode::OK);
    response.json()
}

mod register_tests {
    use super::*;

    #[tokio::test]
    #[serial]
    async fn test_register_and_list() -> Result<()> {
        let (_registry, app) = test_app()?;

        let response = app.post_json("/v1/register", DOCUMENT_A).await?;
        response.assert_status(StatusCode::OK);
        assert_eq!(response.json::<Value>()?, serde_json::json!({}));

        let documents = list(&app).await?;
        assert_eq!(documents.len(), 1);

        let document = &documents[0];
        assert_eq!(document.product_name(), "my-product-a");
        assert_eq!(document.labels()["deployment"], "abc-123");
        assert_eq!(document.uid, document.uid());
        assert!(document.uid.starts_with("my-product-a-"));
        assert_eq!(document.spec.indicators.len(), 2);
        assert!(document.spec.indicators[0].status.is_none());

        Ok(())
    }

    #[tokio::test]
    #[serial]
    async fn test_register_document_without_indicators() -> Result<()> {
        let (_registry, app) = test_app()?;

        let empty = r#"{
            "apiVersion": "indicatorprotocol.io/v1",
            "metadata": { "labels": { "deployment": "abc-123" } },
            "spec": {
                "product": { "name": "my-product-empty", "version": "1" },
                "indicators": []
            }
        }"#;
        app.post_json("/v1/register", empty)
            .await?
            .assert_status(StatusCode::OK);

        let body: Value = app.get("/v1/indicator-documents").await?.json()?;
        let documents = body.as_array().unwrap();
        assert_eq!(documents.len(), 1);
        assert_eq!(documents[0]["spec"]["product"]["name"], "my-product-empty");
        assert_eq!(documents[0]["spec"]["indicators"], serde_json::json!([]));

        Ok(())
    }

    #[tokio::test]
    #[serial]
    async fn test_register_again_replaces_the_document() -> Result<()> {
        let (_registry, app) = test_app()?;

        app.post_json("/v1/register", DOCUMENT_A).await?;
        let updated = DOCUMENT_A.replace(r#""version": "1""#, r#""version": "2""#);
        app.post_json("/v1/register", &updated)
            .await?
            .assert_status(StatusCode::OK);
        app.post_json("/v1/register", &document_json("other", "abc-123"))
            .await?
            .assert_status(StatusCode::OK);

        let documents = list(&app).await?;
        assert_eq!(documents.len(), 2);
        assert_eq!(documents[0].spec.product.version, "2");
        assert_eq!(documents[1].product_name(), "other");

        Ok(())
    }

    #[tokio::test]
    #[serial]
    async fn test_register_without_content_type() -> Result<()> {
        let (_registry, app) = test_app()?;

        app.post_raw("/v1/register", DOCUMENT_A.as_bytes())
            .await?
            .assert_status(StatusCode::OK);
        assert_eq!(list(&app).await?.len(), 1);

        Ok(())
    }

    #[tokio::test]
    #[serial]
    async fn test_register_lists_every_validation_error() -> Result<()> {
        let (_registry, app) = test_app()?;

        let invalid = r#"{
            "apiVersion": "indicatorprotocol.io/v1",
            "spec": {
                "product": { "name": "", "version": "" },
                "indicators": [{ "name": "indie1", "promql": "" }]
            }
        }"#;
        let response = app.post_json("/v1/register", invalid).await?;
        response
            .assert_status(StatusCode::UNPROCESSABLE_ENTITY)
            .assert_content_type("application/json");

        let body: Value = response.json()?;
        let errors = body["errors"].as_array().unwrap();
        assert_eq!(errors.len(), 3);
        for expected in [
            "product name is required",
            "product version is required",
            "indicators[0] promql is required",
        ] {
            assert!(errors.iter().any(|error| error == expected), "{}", expected);
        }
        assert!(list(&app).await?.is_empty());

        Ok(())
    }

    #[tokio::test]
    #[serial]
    async fn test_register_rejects_the_step_label_in_any_case() -> Result<()> {
        let (_registry, app) = test_app()?;

        let document = DOCUMENT_A.replace(r#""deployment""#, r#""StEp""#);
        app.post_json("/v1/register", &document)
            .await?
            .assert_status(StatusCode::UNPROCESSABLE_ENTITY)
            .assert_body_contains("reserved 'StEp' label");

        Ok(())
    }

    #[tokio::test]
    #[serial]
    async fn test_register_malformed_documents() -> Result<()> {
        let (_registry, app) = test_app()?;

        let response = app.post_json("/v1/register", "{ not json").await?;
        response.assert_status(StatusCode::BAD_REQUEST);
        let body: Value = response.json()?;
        assert!(
            body["errors"][0]
                .as_str()
                .unwrap()
                .starts_with("could not unmarshal indicators: ")
        );

        let unsupported = DOCUMENT_A.replace("indicatorprotocol.io/v1", "v0");
        app.post_json("/v1/register", &unsupported)
            .await?
            .assert_status(StatusCode::BAD_REQUEST)
            .assert_body_contains("invalid apiVersion 'v0'");

        let missing = DOCUMENT_A.replace(r#""apiVersion": "indicatorprotocol.io/v1","#, "");
        app.post_json("/v1/register", &missing)
            .await?
            .assert_status(StatusCode::BAD_REQUEST)
            .assert_body_contains("apiVersion is required");

        Ok(())
    }
}

mod status_tests {
    use super::*;

    #[tokio::test]
    #[serial]
    async fn test_bulk_status_then_list() -> Result<()> {
        let (registry, app) = test_app()?;

        app.post_json("/v1/register", DOCUMENT_A).await?;
        let uid = list(&app).await?[0].uid.clone();

        registry.clock.advance(Duration::seconds(30));
        let statuses = r#"[
            { "name": "indie1", "status": "critical" },
            { "name": "indie2", "status": "warning" }
        ]"#;
        app.post_json(
            &format!("/v1/indicator-documents/{}/bulk_status", uid),
            statuses,
        )
        .await?
        .assert_status(StatusCode::OK);

        let documents = list(&app).await?;
        let indicators = &documents[0].spec.indicators;
        let indie1 = indicators[0].status.as_ref().unwrap();
        assert_eq!(indie1.value.as_deref(), Some("critical"));
        assert_eq!(
            indie1.updated_at,
            indicator_registry::test_utils::test_epoch() + Duration::seconds(30)
        );
        assert_eq!(
            indicators[1].status.as_ref().unwrap().value.as_deref(),
            Some("warning")
        );

        Ok(())
    }

    #[tokio::test]
    #[serial]
    async fn test_statuses_survive_registration() -> Result<()> {
        let (_registry, app) = test_app()?;

        app.post_json("/v1/register", DOCUMENT_A).await?;
        let uid = list(&app).await?[0].uid.clone();
        app.post_json(
            &format!("/v1/indicator-documents/{}/bulk_status", uid),
            r#"[{ "name": "indie1", "status": "critical" }]"#,
        )
        .await?;

        // the registration agent sends documents without status
        app.post_json("/v1/register", DOCUMENT_A).await?;

        let body: Value = app.get("/v1/indicator-documents").await?.json()?;
        let indicators = &body[0]["spec"]["indicators"];
        assert_eq!(indicators[0]["status"]["value"], "critical");
        assert!(indicators[0]["status"]["updatedAt"].is_string());
        assert!(indicators[1].get("status").is_none());

        Ok(())
    }

    #[tokio::test]
    #[serial]
    async fn test_bulk_status_malformed_body() -> Result<()> {
        let (_registry, app) = test_app()?;

        let response = app
            .post_json("/v1/indicator-documents/some-uid/bulk_status", r#"{"name":1}"#)
            .await?;
        response
            .assert_status(StatusCode::BAD_REQUEST)
            .assert_body_contains("could not unmarshal statuses");

        Ok(())
    }
}

mod expiry_tests {
    use super::*;

    #[tokio::test]
    #[serial]
    async fn test_documents_expire_after_ttl() -> Result<()> {
        ensure_config();
        let registry = TestRegistry::with_ttl(Duration::minutes(2))?;
        let app = TestApp::new(registry.state.clone())?;

        app.post_json("/v1/register", DOCUMENT_A).await?;
        registry.clock.advance(Duration::seconds(90));
        app.post_json("/v1/register", &document_json("other", "abc-123"))
            .await?;

        registry.clock.advance(Duration::seconds(30));
        let documents = list(&app).await?;
        assert_eq!(documents.len(), 1);
        assert_eq!(documents[0].product_name(), "other");

        // registering again brings the document back
        app.post_json("/v1/register", DOCUMENT_A).await?;
        assert_eq!(list(&app).await?.len(), 2);

        registry.clock.advance(Duration::minutes(2));
        assert!(list(&app).await?.is_empty());

        Ok(())
    }
}

mod routing_tests {
    use super::*;

    #[tokio::test]
    #[serial]
    async fn test_unknown_route_is_plaintext_404() -> Result<()> {
        let (_registry, app) = test_app()?;

        let response = app.get("/v2/indicator-documents").await?;
        response.assert_status(StatusCode::NOT_FOUND);
        assert_eq!(response.body(), "404 page not found");

        Ok(())
    }

    #[tokio::test]
    #[serial]
    async fn test_metrics_count_requests_per_route() -> Result<()> {
        let (_registry, app) = test_app()?;

        app.post_json("/v1/register", DOCUMENT_A).await?;
        app.post_json("/v1/register", "{").await?;
        app.get("/v1/indicator-documents").await?;
        app.get("/nowhere").await?;

        let response = app.get("/metrics").await?;
        response.assert_status(StatusCode::OK);
        let body = response.body();
        assert!(body.contains(r#"registry_http_requests{route="/v1/register",status="200"} 1"#));
        assert!(body.contains(r#"registry_http_requests{route="/v1/register",status="400"} 1"#));
        assert!(
            body.contains(r#"registry_http_requests{route="/v1/indicator-documents",status="200"} 1"#)
        );
        assert!(body.contains(r#"registry_http_requests{route="unmatched",status="404"} 1"#));

        Ok(())
    }

    #[tokio::test]
    #[serial]
    async fn test_api_documentation_is_served() -> Result<()> {
        let (_registry, app) = test_app()?;

        let response = app.get("/docs").await?;
        response.assert_status(StatusCode::OK);
        response.assert_body_contains("/v1/register");

        Ok(())
    }
}
