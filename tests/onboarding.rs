mod common;
use axum::http::StatusCode;
use regex::Regex;
use serde_json::{Value, json};

use crate::common::{
    Action, Flow, FlowContext, create_user_action, setup_server, setup_test_db, signin_action,
    signin_admin_action,
};

fn saved_id(ctx: &FlowContext, key: &str) -> String {
    ctx.get(key)["id"]
        .as_str()
        .expect("saved object has no id")
        .to_string()
}

fn assert_field_matches(field: &'static str, pattern: &'static str) -> impl Fn(&str) + Send + Sync {
    move |body| {
        let value: Value = serde_json::from_str(body).unwrap();
        let id = value[field].as_str().expect("identifier missing");
        assert!(Regex::new(pattern).unwrap().is_match(id), "{id} !~ {pattern}");
    }
}

fn school_action(admin_key: &'static str, code: &'static str) -> Action {
    Action::new("school_create", "POST", "/api/v1/schools/").with_dyn_body(move |ctx| {
        json!({
            "school_admin_id": saved_id(ctx, admin_key),
            "school_name": format!("School {code}"),
            "school_code": code,
            "board": "CBSE",
        })
    })
}

fn class_action(school_key: &'static str) -> Action {
    Action::new("class_create", "POST", "/api/v1/classes/").with_dyn_body(move |ctx| {
        json!({
            "school_id": saved_id(ctx, school_key),
            "grade": "9",
            "division": "a",
            "academic_year": "2025-2026",
        })
    })
}

#[tokio::test]
async fn route_school_onboarding_test() {
    let pool = setup_test_db().await;
    let mut server = setup_server(&pool).await;

    Flow::new()
        .step(signin_admin_action())
        .step(create_user_action("head_one", "head-one-pass", "SCHOOL_ADMIN").with_save_as("head_one"))
        .step(school_action("head_one", "27251000101").with_save_as("school"))
        .step(
            school_action("head_one", "27251000101")
                .with_expect(StatusCode::CONFLICT)
                .assert_body(|body| assert!(body.contains("error"))),
        )
        .step(signin_action("head_one", "head-one-pass", "SCHOOL_ADMIN").with_clear_cookies(true))
        .step(
            class_action("school")
                .assert_body(assert_field_matches("class_code", r"^CLS-2025-9A-\d{3}$"))
                .assert_body(|body| {
                    let class: Value = serde_json::from_str(body).unwrap();
                    assert_eq!(class["class_name"], "Std 9A");
                    assert_eq!(class["total_sessions"], 48);
                }),
        )
        // same grade, division and year twice
        .step(class_action("school").with_expect(StatusCode::CONFLICT))
        .step(
            Action::new("student_create", "POST", "/api/v1/students/")
                .with_dyn_body(|ctx| {
                    json!({
                        "school_id": saved_id(ctx, "school"),
                        "first_name": "Asha",
                        "last_name": "Patil",
                        "gender": "female",
                        "date_of_birth": "2011-04-02",
                        "student_class": "9",
                        "division": "A",
                        "roll_number": "12",
                        "academic_year": "2025-2026",
                        "gr_number": "GR-0001",
                        "school_email": "asha@school.example",
                        "enrollment_date": "2025-06-10",
                    })
                })
                .assert_body(assert_field_matches("skill_lab_reg_id", r"^SKILL\d{4}[A-Z0-9]{6}$")),
        )
        .step(
            Action::new("teacher_create", "POST", "/api/v1/teachers/")
                .with_dyn_body(|ctx| {
                    json!({
                        "school_id": saved_id(ctx, "school"),
                        "full_name": "Ravi Kulkarni",
                        "gender": "male",
                        "designation": "Thinking coach",
                        "qualification": "M.Sc.",
                        "mobile_number": "9800000000",
                        "official_email": "ravi@school.example",
                        "joining_date": "2024-06-01",
                        "employment_type": "full_time",
                    })
                })
                .assert_body(assert_field_matches("employee_id", r"^EMP\d{4}[A-Z0-9]{6}$"))
                .assert_body(|body| assert!(body.contains("\"attendance_status\":\"present\""))),
        )
        .step(
            Action::new("parent_create", "POST", "/api/v1/parents/")
                .with_dyn_body(|ctx| {
                    json!({
                        "school_id": saved_id(ctx, "school"),
                        "full_name": "Meera Patil",
                        "relation_to_student": "mother",
                        "mobile_number": "9811111111",
                        "email": "meera@example.com",
                    })
                })
                .assert_body(assert_field_matches("parent_id", r"^P[A-Z0-9]{5}$"))
                .assert_body(|body| assert!(body.contains("\"account_status\":\"pending\""))),
        )
        .step(
            Action::new("dashboard", "GET", "/api/v1/account/dashboard").assert_body(|body| {
                let dashboard: Value = serde_json::from_str(body).unwrap();
                assert_eq!(dashboard["schools"], 1);
                assert_eq!(dashboard["classes"], 1);
                assert_eq!(dashboard["students"], 1);
                assert_eq!(dashboard["teachers"], 1);
                assert_eq!(dashboard["parents"], 1);
            }),
        )
        .run(&mut server, pool)
        .await;
}

#[tokio::test]
async fn route_school_admin_scope_test() {
    let pool = setup_test_db().await;
    let mut server = setup_server(&pool).await;

    Flow::new()
        .step(signin_admin_action())
        .step(create_user_action("head_one", "head-one-pass", "SCHOOL_ADMIN").with_save_as("head_one"))
        .step(create_user_action("head_two", "head-two-pass", "SCHOOL_ADMIN").with_save_as("head_two"))
        .step(school_action("head_one", "27251000101").with_save_as("school_one"))
        .step(school_action("head_two", "27251000202").with_save_as("school_two"))
        .step(class_action("school_one").with_save_as("class_one"))
        .step(signin_action("head_two", "head-two-pass", "SCHOOL_ADMIN").with_clear_cookies(true))
        .step(
            Action::new("school_list", "GET", "/api/v1/schools/page").assert_body(|body| {
                let page: Value = serde_json::from_str(body).unwrap();
                assert_eq!(page["total"], 1);
                assert_eq!(page["items"][0]["school_code"], "27251000202");
            }),
        )
        .step(class_action("school_one").with_expect(StatusCode::FORBIDDEN))
        .step(
            Action::new("class_get", "GET", "dynamic")
                .with_dyn_path(|ctx| format!("/api/v1/classes/{}", saved_id(ctx, "class_one")))
                .with_expect(StatusCode::FORBIDDEN),
        )
        // reassigning the school to someone else is ignored
        .step(
            Action::new("school_update", "PUT", "dynamic")
                .with_dyn_path(|ctx| format!("/api/v1/schools/{}", saved_id(ctx, "school_two")))
                .with_dyn_body(|ctx| {
                    json!({
                        "school_admin_id": saved_id(ctx, "head_one"),
                        "school_name": "Renamed school",
                        "school_code": "27251000202",
                        "board": "ICSE",
                    })
                })
                .assert_body(|body| assert!(body.contains("Renamed school")))
                .with_save_as("school_two_updated"),
        )
        .step(
            Action::new("school_get", "GET", "dynamic")
                .with_dyn_path(|ctx| format!("/api/v1/schools/{}", saved_id(ctx, "school_two"))),
        )
        .step(
            Action::new("school_delete", "DELETE", "dynamic")
                .with_dyn_path(|ctx| format!("/api/v1/schools/{}", saved_id(ctx, "school_two")))
                .with_expect(StatusCode::FORBIDDEN),
        )
        .run(&mut server, pool)
        .await;
}

fn student_action(school_key: &'static str) -> Action {
    Action::new("student_create", "POST", "/api/v1/students/").with_dyn_body(move |ctx| {
        json!({
            "school_id": saved_id(ctx, school_key),
            "first_name": "Kabir",
            "last_name": "Shah",
            "gender": "male",
            "date_of_birth": "2012-01-15",
            "student_class": "8",
            "division": "B",
            "roll_number": "4",
            "academic_year": "2025-2026",
            "gr_number": "GR-0042",
            "school_email": "kabir@school.example",
            "enrollment_date": "2025-06-10",
        })
    })
}

fn parent_action(school_key: &'static str, name: &'static str) -> Action {
    Action::new("parent_create", "POST", "/api/v1/parents/").with_dyn_body(move |ctx| {
        json!({
            "school_id": saved_id(ctx, school_key),
            "full_name": name,
            "relation_to_student": "guardian",
            "mobile_number": "9822222222",
            "email": "guardian@example.com",
        })
    })
}

fn parent_students(ctx: &FlowContext) -> String {
    format!("/api/v1/parents/{}/students", saved_id(ctx, "parent"))
}

fn parent_student(ctx: &FlowContext) -> String {
    format!(
        "/api/v1/parents/{}/students/{}",
        saved_id(ctx, "parent"),
        saved_id(ctx, "student")
    )
}

fn assert_linked(count: usize) -> impl Fn(&str) + Send + Sync {
    move |body| {
        let parent: Value = serde_json::from_str(body).unwrap();
        assert_eq!(parent["full_name"], "Nisha Shah");
        let students = parent["students"].as_array().unwrap();
        assert_eq!(students.len(), count);
        if count > 0 {
            assert_eq!(students[0]["first_name"], "Kabir");
        }
    }
}

#[tokio::test]
async fn route_parent_student_link_test() {
    let pool = setup_test_db().await;
    let mut server = setup_server(&pool).await;

    Flow::new()
        .step(signin_admin_action())
        .step(create_user_action("head_one", "head-one-pass", "SCHOOL_ADMIN").with_save_as("head_one"))
        .step(create_user_action("head_two", "head-two-pass", "SCHOOL_ADMIN").with_save_as("head_two"))
        .step(school_action("head_one", "27251000101").with_save_as("school_one"))
        .step(school_action("head_two", "27251000202").with_save_as("school_two"))
        .step(signin_action("head_one", "head-one-pass", "SCHOOL_ADMIN").with_clear_cookies(true))
        .step(student_action("school_one").with_save_as("student"))
        .step(parent_action("school_one", "Nisha Shah").with_save_as("parent"))
        .step(
            Action::new("parent_get", "GET", "dynamic")
                .with_dyn_path(|ctx| format!("/api/v1/parents/{}", saved_id(ctx, "parent")))
                .assert_body(assert_linked(0)),
        )
        .step(
            Action::new("parent_link", "POST", "dynamic")
                .with_dyn_path(parent_students)
                .with_dyn_body(|ctx| json!({ "student_id": saved_id(ctx, "student") }))
                .assert_body(assert_linked(1)),
        )
        // linking twice keeps a single link
        .step(
            Action::new("parent_link", "POST", "dynamic")
                .with_dyn_path(parent_students)
                .with_dyn_body(|ctx| json!({ "student_id": saved_id(ctx, "student") }))
                .assert_body(assert_linked(1)),
        )
        .step(
            Action::new("parent_get", "GET", "dynamic")
                .with_dyn_path(|ctx| format!("/api/v1/parents/{}", saved_id(ctx, "parent")))
                .assert_body(assert_linked(1)),
        )
        .step(signin_action("head_two", "head-two-pass", "SCHOOL_ADMIN").with_clear_cookies(true))
        .step(parent_action("school_two", "Other Parent").with_save_as("parent_two"))
        // a student from another school
        .step(
            Action::new("parent_link", "POST", "dynamic")
                .with_dyn_path(|ctx| {
                    format!("/api/v1/parents/{}/students", saved_id(ctx, "parent_two"))
                })
                .with_dyn_body(|ctx| json!({ "student_id": saved_id(ctx, "student") }))
                .with_expect(StatusCode::FORBIDDEN),
        )
        .step(
            Action::new("parent_unlink", "DELETE", "dynamic")
                .with_dyn_path(parent_student)
                .with_expect(StatusCode::FORBIDDEN),
        )
        .step(signin_action("head_one", "head-one-pass", "SCHOOL_ADMIN").with_clear_cookies(true))
        .step(Action::new("parent_unlink", "DELETE", "dynamic").with_dyn_path(parent_student))
        .step(
            Action::new("parent_unlink", "DELETE", "dynamic")
                .with_dyn_path(parent_student)
                .with_expect(StatusCode::NOT_FOUND),
        )
        .step(
            Action::new("parent_get", "GET", "dynamic")
                .with_dyn_path(|ctx| format!("/api/v1/parents/{}", saved_id(ctx, "parent")))
                .assert_body(assert_linked(0)),
        )
        .run(&mut server, pool)
        .await;
}
