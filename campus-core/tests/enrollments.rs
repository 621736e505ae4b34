mod common;

use campus_core::enrollments::{
    my_enrollments, ApplicationForm, Decision, DecisionOutcome, EnrollmentDesk, APPLICATION_FAILED, SELECT_PROGRAM,
};
use campus_core::grades::StatusKind;
use common::{api, backend, mount_get, requests_to};
use serde_json::json;
use wiremock::matchers::{body_json, method, path};
use wiremock::{Mock, ResponseTemplate};

#[tokio::test]
async fn validating_a_pending_enrollment_drops_the_pending_count() {
    let t = backend().await;
    mount_get(
        &t.server,
        "inscriptions",
        json!([
            {"id": 1, "student": 21, "student_name": "Amina Idrissi", "filiere": 10, "filiere_name": "Génie Logiciel", "academic_year": "2024-2025", "status": "PENDING"},
            {"id": 2, "student": 22, "student_name": "Youssef Benali", "filiere": 10, "academic_year": "2024-2025", "status": "VALIDATED"}
        ]),
        Some(1),
    )
    .await;
    Mock::given(method("POST"))
        .and(path(api("inscriptions/1/validate")))
        .and(body_json(json!({"status": "VALIDATED"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"id": 1, "status": "VALIDATED"})))
        .expect(1)
        .mount(&t.server)
        .await;
    mount_get(
        &t.server,
        "inscriptions",
        json!([
            {"id": 1, "student": 21, "filiere": 10, "academic_year": "2024-2025", "status": "VALIDATED"},
            {"id": 2, "student": 22, "filiere": 10, "academic_year": "2024-2025", "status": "VALIDATED"}
        ]),
        None,
    )
    .await;

    let mut desk = EnrollmentDesk::new();
    desk.load(&t.client, &t.cache).await;
    assert_eq!(desk.pending_count(), 1);
    assert_eq!(desk.pending()[0].student_label(), "Amina Idrissi");

    let outcome = desk
        .decide(1, Decision::Validate, &|_: &str| true, &t.client, &t.cache)
        .await;
    assert_eq!(outcome, DecisionOutcome::Done);
    assert_eq!(desk.pending_count(), 0);
}

#[tokio::test]
async fn declined_confirmation_sends_nothing() {
    let t = backend().await;
    mount_get(
        &t.server,
        "inscriptions",
        json!([{"id": 1, "filiere": 10, "academic_year": "2024-2025", "status": "PENDING"}]),
        None,
    )
    .await;

    let mut desk = EnrollmentDesk::new();
    desk.load(&t.client, &t.cache).await;
    let outcome = desk
        .decide(
            1,
            Decision::Reject {
                reason: Some("Incomplete file".into()),
            },
            &|_: &str| false,
            &t.client,
            &t.cache,
        )
        .await;

    assert_eq!(outcome, DecisionOutcome::Cancelled);
    assert!(requests_to(&t.server, "POST", "inscriptions/1/validate").await.is_empty());
    assert_eq!(desk.pending_count(), 1);
}

#[tokio::test]
async fn my_enrollments_read_the_student_endpoint() {
    let t = backend().await;
    mount_get(
        &t.server,
        "inscriptions/my_inscriptions",
        json!([
            {"id": 3, "filiere": 10, "filiere_details": {"name": "Génie Logiciel", "code": "GL"}, "academic_year": "2024-2025", "status": "REJECTED", "rejection_reason": "Incomplete file"}
        ]),
        None,
    )
    .await;

    let mut screen = my_enrollments();
    screen.load(&t.client, &t.cache).await;
    let record = &screen.records().unwrap()[0];
    let cells = screen.row_cells(record);
    assert_eq!(cells[2], "Génie Logiciel");
    assert_eq!(cells[5], "REJECTED (Incomplete file)");

    screen.set_query("génie");
    assert_eq!(screen.filtered().len(), 1);
}

#[tokio::test]
async fn application_needs_a_program() {
    let t = backend().await;
    mount_get(&t.server, "filieres", json!([{"id": 10, "code": "GL", "name": "Génie Logiciel"}]), None).await;

    let mut form = ApplicationForm::open(&t.client, &t.cache, "2024-2025").await.unwrap();
    assert_eq!(form.programs().len(), 1);

    let err = form.submit(&t.client, &t.cache).await.unwrap_err();
    assert_eq!(err, SELECT_PROGRAM);
    assert!(requests_to(&t.server, "POST", "inscriptions").await.is_empty());
}

#[tokio::test]
async fn application_posts_program_and_year() {
    let t = backend().await;
    mount_get(&t.server, "filieres", json!([{"id": 10, "code": "GL", "name": "Génie Logiciel"}]), None).await;
    Mock::given(method("POST"))
        .and(path(api("inscriptions")))
        .and(body_json(json!({"filiere": 10, "academic_year": "2024-2025"})))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({"id": 9, "filiere": 10, "academic_year": "2024-2025", "status": "PENDING"})))
        .expect(1)
        .mount(&t.server)
        .await;

    let mut form = ApplicationForm::open(&t.client, &t.cache, "2024-2025").await.unwrap();
    form.select_program(10).unwrap();
    form.submit(&t.client, &t.cache).await.unwrap();
    assert_eq!(form.status().map(|s| s.kind), Some(StatusKind::Success));
}

#[tokio::test]
async fn duplicate_application_surfaces_the_server_reason() {
    let t = backend().await;
    mount_get(&t.server, "filieres", json!([]), None).await;
    Mock::given(method("POST"))
        .and(path(api("inscriptions")))
        .respond_with(ResponseTemplate::new(400).set_body_json(json!({
            "non_field_errors": ["You already applied for this academic year."]
        })))
        .up_to_n_times(1)
        .mount(&t.server)
        .await;
    Mock::given(method("POST"))
        .and(path(api("inscriptions")))
        .respond_with(ResponseTemplate::new(500))
        .mount(&t.server)
        .await;

    let mut form = ApplicationForm::open(&t.client, &t.cache, "2024-2025").await.unwrap();
    form.select_program(10).unwrap();

    let err = form.submit(&t.client, &t.cache).await.unwrap_err();
    assert_eq!(err, "You already applied for this academic year.");
    assert_eq!(form.status().map(|s| s.kind), Some(StatusKind::Error));

    let err = form.submit(&t.client, &t.cache).await.unwrap_err();
    assert_eq!(err, APPLICATION_FAILED);
}
