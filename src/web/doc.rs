use utoipa::openapi::security::{ApiKey, ApiKeyValue, SecurityScheme};
use utoipa::{Modify, OpenApi};

pub struct CookieAuthModifier;

impl Modify for CookieAuthModifier {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(schema) = openapi.components.as_mut() {
            schema.add_security_scheme(
                "cookie",
                SecurityScheme::ApiKey(ApiKey::Cookie(ApiKeyValue::with_description(
                    "SID",
                    "JWT token for current user",
                ))),
            );
        }
    }
}

#[derive(OpenApi)]
#[openapi(
    info(title = "Skillab API", description = "Skill Lab school administration backend"),
    paths(
        crate::web::routes::account::account_signin_handler,
        crate::web::routes::account::account_signout_handler,
        crate::web::routes::account::account_me_handler,
        crate::web::routes::account::account_password_handler,
        crate::web::routes::account::account_dashboard_handler,
        crate::web::routes::account::account_create_user_handler,
        crate::web::routes::account::account_list_handler,
        crate::web::routes::account::account_update_handler,
        crate::web::routes::account::account_delete_handler,
        crate::web::routes::schools::schools_create_handler,
        crate::web::routes::schools::schools_list_handler,
        crate::web::routes::schools::schools_search_handler,
        crate::web::routes::schools::schools_get_handler,
        crate::web::routes::schools::schools_update_handler,
        crate::web::routes::schools::schools_delete_handler,
        crate::web::routes::classes::classes_create_handler,
        crate::web::routes::classes::classes_list_handler,
        crate::web::routes::classes::classes_get_handler,
        crate::web::routes::classes::classes_update_handler,
        crate::web::routes::classes::classes_delete_handler,
        crate::web::routes::students::students_create_handler,
        crate::web::routes::students::students_list_handler,
        crate::web::routes::students::students_get_handler,
        crate::web::routes::students::students_update_handler,
        crate::web::routes::students::students_delete_handler,
        crate::web::routes::teachers::teachers_create_handler,
        crate::web::routes::teachers::teachers_list_handler,
        crate::web::routes::teachers::teachers_get_handler,
        crate::web::routes::teachers::teachers_update_handler,
        crate::web::routes::teachers::teachers_delete_handler,
        crate::web::routes::coordinators::coordinators_create_handler,
        crate::web::routes::coordinators::coordinators_list_handler,
        crate::web::routes::coordinators::coordinators_get_handler,
        crate::web::routes::coordinators::coordinators_update_handler,
        crate::web::routes::coordinators::coordinators_delete_handler,
        crate::web::routes::parents::parents_create_handler,
        crate::web::routes::parents::parents_list_handler,
        crate::web::routes::parents::parents_get_handler,
        crate::web::routes::parents::parents_update_handler,
        crate::web::routes::parents::parents_delete_handler,
        crate::web::routes::parents::parents_link_student_handler,
        crate::web::routes::parents::parents_unlink_student_handler,
        crate::web::routes::lessons::lessons_create_handler,
        crate::web::routes::lessons::lessons_list_handler,
        crate::web::routes::lessons::lessons_get_handler,
        crate::web::routes::lessons::lessons_update_handler,
        crate::web::routes::lessons::lessons_delete_handler,
        crate::web::routes::lessons::lessons_view_handler,
        crate::web::routes::lessons::lessons_complete_handler,
        crate::web::routes::lessons::lessons_resources_handler,
        crate::web::routes::lessons::lessons_attach_handler,
        crate::web::routes::lessons::lessons_resource_update_handler,
        crate::web::routes::lessons::lessons_detach_handler,
    ),
    modifiers(&CookieAuthModifier),
    tags(
        (name = "account", description = "Sessions and accounts"),
        (name = "schools", description = "Schools and their admins"),
        (name = "classes", description = "Classes of a school"),
        (name = "students", description = "Student enrollment"),
        (name = "teachers", description = "Thinking coaches"),
        (name = "coordinators", description = "Program coordinators"),
        (name = "parents", description = "Parents and guardians"),
        (name = "lessons", description = "Lessons and their attachments"),
    )
)]
pub struct ApiDoc;

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_openapi_lists_routes() {
        let doc = ApiDoc::openapi();
        let paths = &doc.paths.paths;
        assert!(paths.contains_key("/api/v1/account/signin"));
        assert!(paths.contains_key("/api/v1/classes/{id}"));
        assert!(paths.contains_key("/api/v1/lessons/{lesson_id}/resources"));
        assert!(paths.contains_key("/api/v1/parents/{id}/students/{student_id}"));
        assert!(doc.components.is_some());
    }
}
