mod common;

use campus_core::grades::{GradeField, GradeSheet, StatusKind, SAVE_FAILED, SAVE_OK};
use campus_core::screen::Remote;
use campus_core::{GradeError, QueryKey};
use common::{api, backend};
use serde_json::json;
use wiremock::matchers::{body_json, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

async fn mount_roster(server: &MockServer, year: &str) {
    Mock::given(method("GET"))
        .and(path(api("notes/students_by_module")))
        .and(query_param("module_id", "4"))
        .and(query_param("academic_year", year))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "module": {"id": 4, "name": "Programmation Rust", "code": "INF301"},
            "students": [
                {"student_id": 21, "student_name": "Amina Idrissi", "cne": "R130000001", "note_controle": "12.00", "note_examen": null},
                {"student_id": 22, "student_name": "Youssef Benali", "cne": null, "note_controle": null, "note_examen": null}
            ]
        })))
        .mount(server)
        .await;
}

#[tokio::test]
async fn roster_loads_with_decimal_strings() {
    let t = backend().await;
    mount_roster(&t.server, "2024-2025").await;

    let mut sheet = GradeSheet::new(4, "2024-2025");
    sheet.load(&t.client).await;

    assert_eq!(sheet.module().map(|m| m.name.as_str()), Some("Programmation Rust"));
    assert_eq!(sheet.rows().len(), 2);
    assert_eq!(sheet.grade(21, GradeField::Control), Some(12.0));
    assert_eq!(sheet.grade(22, GradeField::Control), None);
}

#[tokio::test]
async fn edits_average_and_bulk_save() {
    let t = backend().await;
    mount_roster(&t.server, "2024-2025").await;
    Mock::given(method("POST"))
        .and(path(api("notes/bulk_update")))
        .and(body_json(json!({
            "module_id": 4,
            "academic_year": "2024-2025",
            "grades": [
                {"student_id": 21, "note_controle": 12.0, "note_examen": 8.0},
                {"student_id": 22, "note_controle": null, "note_examen": null}
            ]
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"updated": 2})))
        .expect(1)
        .mount(&t.server)
        .await;

    let mut sheet = GradeSheet::new(4, "2024-2025");
    sheet.load(&t.client).await;

    assert!(matches!(
        sheet.set_grade(21, GradeField::Exam, "20.5"),
        Err(GradeError::OutOfRange(_))
    ));
    assert_eq!(sheet.grade(21, GradeField::Exam), None);

    sheet.set_grade(21, GradeField::Exam, "8").unwrap();
    let row = &sheet.rows()[0];
    assert_eq!(row.average_label(), "9.60");
    assert_eq!(row.is_passing(), Some(false));

    // a cached grade list is re-fetched after the save
    let grades_key = QueryKey::collection("notes");
    t.cache.fetch(&grades_key, || async { Ok(json!([])) }).await.unwrap();

    sheet.save(&t.client, &t.cache).await.unwrap();
    let status = sheet.status().unwrap();
    assert_eq!(status.kind, StatusKind::Success);
    assert_eq!(status.text, SAVE_OK);
    assert!(t.cache.is_stale(&grades_key));
    assert_eq!(sheet.rows().len(), 2);
}

#[tokio::test]
async fn failed_save_keeps_rows_and_reports() {
    let t = backend().await;
    mount_roster(&t.server, "2024-2025").await;
    Mock::given(method("POST"))
        .and(path(api("notes/bulk_update")))
        .respond_with(ResponseTemplate::new(403).set_body_json(json!({"detail": "Not your module."})))
        .mount(&t.server)
        .await;

    let mut sheet = GradeSheet::new(4, "2024-2025");
    sheet.load(&t.client).await;
    sheet.set_grade(22, GradeField::Control, "15").unwrap();

    let err = sheet.save(&t.client, &t.cache).await.unwrap_err();
    assert_eq!(err, GradeError::Rejected("Not your module.".into()));
    assert_eq!(sheet.status().map(|s| s.text.as_str()), Some(SAVE_FAILED));
    assert_eq!(sheet.grade(22, GradeField::Control), Some(15.0));
    assert!(!sheet.is_saving());
}

#[tokio::test]
async fn changing_the_year_reloads() {
    let t = backend().await;
    mount_roster(&t.server, "2024-2025").await;
    Mock::given(method("GET"))
        .and(path(api("notes/students_by_module")))
        .and(query_param("academic_year", "2023-2024"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "module": {"id": 4, "name": "Programmation Rust", "code": "INF301"},
            "students": []
        })))
        .expect(1)
        .mount(&t.server)
        .await;

    let mut sheet = GradeSheet::new(4, "2024-2025");
    sheet.load(&t.client).await;
    sheet.set_academic_year("2023-2024", &t.client).await;

    assert_eq!(sheet.academic_year(), "2023-2024");
    assert!(sheet.rows().is_empty());
    assert!(matches!(sheet.state(), Remote::Ready(_)));
}
