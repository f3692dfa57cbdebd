use serde_json::json;
use uploader_engine::{DriveSettings, DriveSheetExporter, FailureKind, SheetExporter};
use wiremock::matchers::{header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn exporter(server: &MockServer, token: Option<&str>) -> DriveSheetExporter {
    DriveSheetExporter::new(DriveSettings {
        api_base: format!("{}/drive/v3/", server.uri()),
        access_token: token.map(str::to_string),
        ..DriveSettings::default()
    })
    .expect("exporter")
}

#[tokio::test]
async fn exports_sheet_as_csv_with_bearer_token() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/drive/v3/files/1AbC/export"))
        .and(query_param("mimeType", "text/csv"))
        .and(header("authorization", "Bearer ya29.token"))
        .respond_with(ResponseTemplate::new(200).set_body_raw("id,title\n1,Hat\n", "text/csv"))
        .expect(1)
        .mount(&server)
        .await;

    let csv = exporter(&server, Some("ya29.token"))
        .export_csv("1AbC")
        .await
        .unwrap();
    assert_eq!(csv, "id,title\n1,Hat\n");
}

#[tokio::test]
async fn drive_error_message_is_surfaced_verbatim() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/drive/v3/files/missing/export"))
        .respond_with(ResponseTemplate::new(404).set_body_json(json!({
            "error": {"code": 404, "message": "File not found: missing."}
        })))
        .mount(&server)
        .await;

    let err = exporter(&server, None).export_csv("missing").await.unwrap_err();
    assert_eq!(err.kind, FailureKind::HttpStatus(404));
    assert_eq!(err.message, "File not found: missing.");
}

#[tokio::test]
async fn forbidden_export_is_unauthorized() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/drive/v3/files/private/export"))
        .respond_with(ResponseTemplate::new(403).set_body_string("nope"))
        .mount(&server)
        .await;

    let err = exporter(&server, None).export_csv("private").await.unwrap_err();
    assert_eq!(err.kind, FailureKind::Unauthorized);
    assert_eq!(err.message, "403 Forbidden");
}
