mod common;
use std::time::Duration;

use axum::http::StatusCode;
use serde_json::{Value, json};
use skillab::lms::ContentType;
use skillab::model::entity::{Lesson, LessonCreate, LessonResource, LessonResourceCreate};
use skillab::model::{CrudRepository, DbConnection, ModelManager};
use skillab::web::AuthenticatedUser;

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

fn lesson_path(suffix: &'static str) -> impl Fn(&FlowContext) -> String + Send + Sync {
    move |ctx| format!("/api/v1/lessons/{}{}", saved_id(ctx, "lesson"), suffix)
}

fn assert_content_type(expected: &'static str) -> impl Fn(&str) + Send + Sync {
    move |body| {
        let lesson: Value = serde_json::from_str(body).unwrap();
        assert_eq!(lesson["primary_content_type"], expected);
    }
}

#[tokio::test]
async fn route_lesson_classification_test() {
    let pool = setup_test_db().await;
    let mut server = setup_server(&pool).await;

    Flow::new()
        .step(signin_admin_action())
        .step(
            Action::new("lesson_create", "POST", "/api/v1/lessons/")
                .with_body(json!({
                    "title": "Thinking in patterns",
                    "article_content": "<p>   </p>",
                    "quiz_data": "[{\"q\": \"2 + 2?\"}]",
                    "default_content_type": "video",
                }))
                .assert_body(assert_content_type("quiz"))
                .with_save_as("lesson"),
        )
        // videos win over everything else
        .step(
            Action::new("lesson_update", "PUT", "dynamic")
                .with_dyn_path(lesson_path(""))
                .with_body(json!({
                    "title": "Thinking in patterns",
                    "video_urls": "[\"https://videos.example/1\"]",
                    "article_content": "<p>Read me</p>",
                    "quiz_data": "[{\"q\": \"2 + 2?\"}]",
                }))
                .assert_body(assert_content_type("video")),
        )
        // nothing but the default left
        .step(
            Action::new("lesson_update", "PUT", "dynamic")
                .with_dyn_path(lesson_path(""))
                .with_body(json!({
                    "title": "Thinking in patterns",
                    "default_content_type": "article",
                }))
                .assert_body(assert_content_type("article")),
        )
        .step(
            Action::new("lesson_attach", "POST", "dynamic")
                .with_dyn_path(lesson_path("/resources"))
                .with_body(json!({
                    "title": "",
                    "file_path": "worksheets/patterns.PDF",
                }))
                .assert_body(|body| {
                    let resource: Value = serde_json::from_str(body).unwrap();
                    assert_eq!(resource["resource_type"], "pdf");
                    assert_eq!(resource["title"], "worksheets/patterns.PDF");
                    assert_eq!(resource["file_size"], 0);
                })
                .with_save_as("resource"),
        )
        .step(
            Action::new("lesson_get", "GET", "dynamic")
                .with_dyn_path(lesson_path(""))
                .assert_body(|body| {
                    let lesson: Value = serde_json::from_str(body).unwrap();
                    assert_eq!(lesson["primary_content_type"], "mixed");
                    assert_eq!(lesson["resources"].as_array().unwrap().len(), 1);
                }),
        )
        .step(
            Action::new("lesson_attach", "POST", "dynamic")
                .with_dyn_path(lesson_path("/resources"))
                .with_body(json!({
                    "title": "escape",
                    "file_path": "../config.toml",
                }))
                .with_expect(StatusCode::BAD_REQUEST),
        )
        .step(Action::new("lesson_detach", "DELETE", "dynamic").with_dyn_path(|ctx| {
            format!(
                "/api/v1/lessons/{}/resources/{}",
                saved_id(ctx, "lesson"),
                saved_id(ctx, "resource")
            )
        }))
        .step(
            Action::new("lesson_get", "GET", "dynamic")
                .with_dyn_path(lesson_path(""))
                .assert_body(assert_content_type("article")),
        )
        .run(&mut server, pool)
        .await;
}

#[tokio::test]
async fn route_lesson_visibility_test() {
    let pool = setup_test_db().await;
    let mut server = setup_server(&pool).await;

    Flow::new()
        .step(signin_admin_action())
        .step(create_user_action("learner", "learner-pass", "STUDENT"))
        .step(
            Action::new("lesson_create", "POST", "/api/v1/lessons/")
                .with_body(json!({ "title": "Draft lesson" }))
                .assert_body(|body| assert!(body.contains("\"is_published\":false")))
                .with_save_as("lesson"),
        )
        .step(
            Action::new("lesson_create", "POST", "/api/v1/lessons/")
                .with_body(json!({ "title": "Published lesson", "status": "published" })),
        )
        .step(signin_action("learner", "learner-pass", "STUDENT").with_clear_cookies(true))
        .step(
            Action::new("lesson_list", "GET", "/api/v1/lessons/page").assert_body(|body| {
                let page: Value = serde_json::from_str(body).unwrap();
                assert_eq!(page["total"], 1);
                assert_eq!(page["items"][0]["title"], "Published lesson");
            }),
        )
        .step(
            Action::new("lesson_get", "GET", "dynamic")
                .with_dyn_path(lesson_path(""))
                .with_expect(StatusCode::NOT_FOUND),
        )
        .step(
            Action::new("lesson_create", "POST", "/api/v1/lessons/")
                .with_body(json!({ "title": "Not allowed" }))
                .with_expect(StatusCode::FORBIDDEN),
        )
        .run(&mut server, pool)
        .await;
}

#[tokio::test]
async fn route_lesson_progress_test() {
    let pool = setup_test_db().await;
    let mut server = setup_server(&pool).await;

    Flow::new()
        .step(signin_admin_action())
        .step(
            Action::new("lesson_create", "POST", "/api/v1/lessons/")
                .with_body(json!({ "title": "Counted lesson", "status": "published" }))
                .assert_body(|body| assert!(body.contains("\"completion_rate\":0.0")))
                .with_save_as("lesson"),
        )
        .step(Action::new("lesson_view", "POST", "dynamic").with_dyn_path(lesson_path("/view")))
        .step(Action::new("lesson_view", "POST", "dynamic").with_dyn_path(lesson_path("/view")))
        .step(Action::new("lesson_view", "POST", "dynamic").with_dyn_path(lesson_path("/view")))
        .step(
            Action::new("lesson_complete", "POST", "dynamic")
                .with_dyn_path(lesson_path("/complete"))
                .assert_body(|body| {
                    let lesson: Value = serde_json::from_str(body).unwrap();
                    assert_eq!(lesson["view_count"], 3);
                    assert_eq!(lesson["completion_count"], 1);
                    assert_eq!(lesson["completion_rate"], 33.3);
                }),
        )
        .run(&mut server, pool)
        .await;
}

fn resource_path(ctx: &FlowContext) -> String {
    format!(
        "/api/v1/lessons/{}/resources/{}",
        saved_id(ctx, "lesson"),
        saved_id(ctx, "resource")
    )
}

#[tokio::test]
async fn route_lesson_attach_detach_test() {
    let pool = setup_test_db().await;
    let mut server = setup_server(&pool).await;

    Flow::new()
        .step(signin_admin_action())
        .step(
            Action::new("lesson_create", "POST", "/api/v1/lessons/")
                .with_body(json!({
                    "title": "Counting games",
                    "default_content_type": "quiz",
                }))
                .assert_body(assert_content_type("quiz"))
                .with_save_as("lesson"),
        )
        .step(
            Action::new("lesson_attach", "POST", "dynamic")
                .with_dyn_path(lesson_path("/resources"))
                .with_body(json!({
                    "title": "Board",
                    "file_path": "boards/counting.png",
                }))
                .with_save_as("resource"),
        )
        .step(
            Action::new("lesson_get", "GET", "dynamic")
                .with_dyn_path(lesson_path(""))
                .assert_body(assert_content_type("mixed")),
        )
        .step(Action::new("lesson_detach", "DELETE", "dynamic").with_dyn_path(resource_path))
        .step(
            Action::new("lesson_get", "GET", "dynamic")
                .with_dyn_path(lesson_path(""))
                .assert_body(|body| {
                    let lesson: Value = serde_json::from_str(body).unwrap();
                    assert_eq!(lesson["primary_content_type"], "quiz");
                    assert!(lesson["resources"].as_array().unwrap().is_empty());
                }),
        )
        .step(
            Action::new("lesson_detach", "DELETE", "dynamic")
                .with_dyn_path(resource_path)
                .with_expect(StatusCode::NOT_FOUND),
        )
        .run(&mut server, pool)
        .await;
}

#[tokio::test]
async fn route_lesson_resource_move_test() {
    let pool = setup_test_db().await;
    let mut server = setup_server(&pool).await;

    Flow::new()
        .step(signin_admin_action())
        .step(
            Action::new("lesson_create", "POST", "/api/v1/lessons/")
                .with_body(json!({ "title": "Shapes", "default_content_type": "video" }))
                .with_save_as("lesson"),
        )
        .step(
            Action::new("lesson_create", "POST", "/api/v1/lessons/")
                .with_body(json!({ "title": "Symmetry", "default_content_type": "article" }))
                .with_save_as("other_lesson"),
        )
        .step(
            Action::new("lesson_attach", "POST", "dynamic")
                .with_dyn_path(lesson_path("/resources"))
                .with_body(json!({ "title": "Shape cards", "file_path": "cards/shapes.pdf" }))
                .with_save_as("resource"),
        )
        .step(
            Action::new("lesson_get", "GET", "dynamic")
                .with_dyn_path(lesson_path(""))
                .assert_body(assert_content_type("mixed")),
        )
        // the path must name the lesson the attachment belongs to
        .step(
            Action::new("lesson_resource_update", "PUT", "dynamic")
                .with_dyn_path(|ctx| {
                    format!(
                        "/api/v1/lessons/{}/resources/{}",
                        saved_id(ctx, "other_lesson"),
                        saved_id(ctx, "resource")
                    )
                })
                .with_body(json!({ "title": "Renamed" }))
                .with_expect(StatusCode::NOT_FOUND),
        )
        .step(
            Action::new("lesson_resource_update", "PUT", "dynamic")
                .with_dyn_path(resource_path)
                .with_dyn_body(|ctx| json!({ "lesson_id": saved_id(ctx, "other_lesson") }))
                .assert_body(|body| {
                    let resource: Value = serde_json::from_str(body).unwrap();
                    assert_eq!(resource["title"], "Shape cards");
                    assert_eq!(resource["resource_type"], "pdf");
                }),
        )
        .step(
            Action::new("lesson_get", "GET", "dynamic")
                .with_dyn_path(lesson_path(""))
                .assert_body(assert_content_type("video")),
        )
        .step(
            Action::new("lesson_get", "GET", "dynamic")
                .with_dyn_path(|ctx| format!("/api/v1/lessons/{}", saved_id(ctx, "other_lesson")))
                .assert_body(|body| {
                    let lesson: Value = serde_json::from_str(body).unwrap();
                    assert_eq!(lesson["primary_content_type"], "mixed");
                    assert_eq!(lesson["resources"].as_array().unwrap().len(), 1);
                }),
        )
        .run(&mut server, pool)
        .await;
}

// An edit and an attachment racing on the same lesson must both be reflected
// in the stored content type, whichever commits first.
#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn lesson_edit_and_attach_serialize_test() {
    let db = setup_test_db().await;
    let mm = ModelManager::new(DbConnection::from_pool(db.pool().clone()));
    let admin = AuthenticatedUser::admin();

    let lesson = Lesson::create(
        &mm,
        &admin,
        LessonCreate {
            title: "Reading maps".to_string(),
            article_content: "<p>draft</p>".to_string(),
            ..Default::default()
        },
    )
    .await
    .unwrap();
    assert_eq!(lesson.primary_content_type(), ContentType::Article);
    let lesson_id = lesson.id();

    let mut blocker = db.pool().begin().await.unwrap();
    sqlx::query("SELECT id FROM lessons WHERE id = $1 FOR UPDATE")
        .bind(lesson_id)
        .execute(&mut *blocker)
        .await
        .unwrap();

    let edit = {
        let mm = mm.clone();
        let admin = admin.clone();
        tokio::spawn(async move {
            let data = LessonCreate {
                title: "Reading maps".to_string(),
                ..Default::default()
            };
            lesson.update(&mm, &admin, data).await
        })
    };
    let attach = {
        let mm = mm.clone();
        let admin = admin.clone();
        tokio::spawn(async move {
            let data = LessonResourceCreate {
                lesson_id,
                title: "Map sheet".to_string(),
                file_path: "sheet.pdf".to_string(),
                file_size: 0,
            };
            LessonResource::create(&mm, &admin, data).await
        })
    };

    // both writers are now queued behind the row lock
    tokio::time::sleep(Duration::from_millis(200)).await;
    blocker.commit().await.unwrap();

    edit.await.unwrap().unwrap();
    attach.await.unwrap().unwrap();

    let stored = Lesson::find_by_id(&mm, &admin, lesson_id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(stored.primary_content_type(), ContentType::Mixed);
}
