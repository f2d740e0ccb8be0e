use axum::routing::get;
use utoipa_axum::router::OpenApiRouter;
use utoipa_axum::routes;

use crate::handlers;
use crate::state::AppState;

pub fn routes() -> OpenApiRouter<AppState> {
    OpenApiRouter::new()
        .nest("/sessions", session_routes())
        .nest("/check-in", checkin_routes())
        .nest("/attendance", attendance_routes())
        .nest("/summary", summary_routes())
        .nest("/maintenance", maintenance_routes())
        .nest("/terms", term_routes())
        .nest("/classrooms", classroom_routes())
        .nest("/subjects", subject_routes())
        .nest("/students", student_routes())
}

fn session_routes() -> OpenApiRouter<AppState> {
    OpenApiRouter::new()
        .routes(routes!(handlers::session::create_session))
        .routes(routes!(handlers::session::deactivate_sessions))
        .routes(routes!(handlers::session::get_session))
        .routes(routes!(handlers::session::cancel_session))
        .route("/{token}/feed", get(handlers::session::session_feed))
}

fn checkin_routes() -> OpenApiRouter<AppState> {
    OpenApiRouter::new().routes(routes!(handlers::checkin::check_in))
}

fn attendance_routes() -> OpenApiRouter<AppState> {
    OpenApiRouter::new()
        .routes(routes!(
            handlers::attendance::save_attendance,
            handlers::attendance::list_attendance
        ))
        .routes(routes!(handlers::attendance::delete_attendance))
}

fn summary_routes() -> OpenApiRouter<AppState> {
    OpenApiRouter::new()
        .routes(routes!(handlers::summary::dashboard))
        .routes(routes!(handlers::summary::grid_summary))
}

fn maintenance_routes() -> OpenApiRouter<AppState> {
    OpenApiRouter::new().routes(routes!(handlers::maintenance::recalculate_counts))
}

fn term_routes() -> OpenApiRouter<AppState> {
    OpenApiRouter::new()
        .routes(routes!(
            handlers::term::create_term,
            handlers::term::list_terms
        ))
        .routes(routes!(handlers::term::active_term))
        .routes(routes!(handlers::term::activate_term))
        .routes(routes!(handlers::term::delete_term))
}

fn classroom_routes() -> OpenApiRouter<AppState> {
    OpenApiRouter::new().routes(routes!(
        handlers::roster::create_classroom,
        handlers::roster::list_classrooms
    ))
}

fn subject_routes() -> OpenApiRouter<AppState> {
    OpenApiRouter::new()
        .routes(routes!(
            handlers::roster::create_subject,
            handlers::roster::list_subjects
        ))
        .routes(routes!(handlers::session::list_active_sessions))
}

fn student_routes() -> OpenApiRouter<AppState> {
    OpenApiRouter::new()
        .routes(routes!(handlers::roster::create_student))
        .routes(routes!(
            handlers::roster::move_student,
            handlers::roster::delete_student
        ))
}
