mod common;

use campus_core::api::{PortalBackend, ResourceBackend};
use campus_core::{ApiError, CampusHttpClient, Role};
use common::{api, backend, mount_get, TOKEN};
use serde_json::json;
use wiremock::matchers::{body_json, header, method, path, query_param};
use wiremock::{Mock, ResponseTemplate};

#[tokio::test]
async fn paginated_and_plain_lists_normalize() {
    let t = backend().await;
    mount_get(
        &t.server,
        "departements",
        json!({"count": 1, "next": null, "previous": null, "results": [{"id": 1, "code": "INF", "name": "Informatique"}]}),
        None,
    )
    .await;
    mount_get(&t.server, "filieres", json!([{"id": 4, "code": "GL", "name": "Génie Logiciel"}]), None).await;

    let departments = t.client.list("departements", &[]).await.unwrap();
    let programs = t.client.list("filieres", &[]).await.unwrap();
    assert_eq!(departments.len(), 1);
    assert_eq!(programs[0]["code"], json!("GL"));
}

#[tokio::test]
async fn requests_carry_the_bearer_token_and_filters() {
    let t = backend().await;
    Mock::given(method("GET"))
        .and(path(api("users")))
        .and(query_param("role", "ENSEIGNANT"))
        .and(header("authorization", format!("Bearer {}", TOKEN).as_str()))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .expect(1)
        .mount(&t.server)
        .await;

    let params = vec![("role".to_string(), "ENSEIGNANT".to_string())];
    let users = t.client.list("users", &params).await.unwrap();
    assert!(users.is_empty());
}

#[tokio::test]
async fn field_errors_are_surfaced_verbatim() {
    let t = backend().await;
    Mock::given(method("POST"))
        .and(path(api("departements")))
        .respond_with(
            ResponseTemplate::new(400).set_body_json(json!({"code": ["department with this code already exists."]})),
        )
        .mount(&t.server)
        .await;

    let err = t
        .client
        .create("departements", &json!({"code": "INF", "name": "Informatique"}))
        .await
        .unwrap_err();
    assert_eq!(err.field(), Some("code"));
    assert_eq!(err.user_message(), "department with this code already exists.");
}

#[tokio::test]
async fn permission_errors_use_detail() {
    let t = backend().await;
    Mock::given(method("DELETE"))
        .and(path(api("modules/3")))
        .respond_with(ResponseTemplate::new(403).set_body_json(json!({"detail": "You do not have permission to perform this action."})))
        .mount(&t.server)
        .await;

    let err = t.client.delete("modules", 3).await.unwrap_err();
    assert!(matches!(err, ApiError::Server { status: 403, .. }));
    assert_eq!(err.user_message(), "You do not have permission to perform this action.");
}

#[tokio::test]
async fn empty_delete_responses_are_fine() {
    let t = backend().await;
    Mock::given(method("DELETE"))
        .and(path(api("departements/2")))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&t.server)
        .await;

    t.client.delete("departements", 2).await.unwrap();
}

#[tokio::test]
async fn login_posts_credentials() {
    let t = backend().await;
    Mock::given(method("POST"))
        .and(path(api("login")))
        .and(body_json(json!({"email": "prof@campus.ma", "password": "secret"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "access": "acc", "refresh": "ref", "role": "ENSEIGNANT", "username": "prof"
        })))
        .mount(&t.server)
        .await;

    let anonymous = CampusHttpClient::new(&format!("{}/api", t.server.uri()));
    let credentials = anonymous.login("prof@campus.ma", "secret").await.unwrap();
    assert_eq!(credentials.role, Role::Enseignant);
    assert_eq!(credentials.username, "prof");
}

#[tokio::test]
async fn enrollment_validation_posts_the_status() {
    let t = backend().await;
    Mock::given(method("POST"))
        .and(path(api("inscriptions/7/validate")))
        .and(body_json(json!({"status": "REJECTED", "rejection_reason": "Incomplete file"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"id": 7, "status": "REJECTED"})))
        .expect(1)
        .mount(&t.server)
        .await;

    t.client
        .validate_enrollment(7, campus_core::resource::EnrollmentStatus::Rejected, Some("Incomplete file"))
        .await
        .unwrap();
}

#[tokio::test]
async fn unreachable_server_is_a_network_error() {
    let client = CampusHttpClient::new("http://127.0.0.1:9/api");
    let err = client.list("departements", &[]).await.unwrap_err();
    assert!(matches!(err, ApiError::Network(_)));
}
