use crate::{
    routes::{
        students::{delete_student, get_student, get_students, post_new_student, put_student},
        upload::post_upload,
    },
    state::BursarState,
};
use axum::{
    Router,
    extract::DefaultBodyLimit,
    routing::{get, post},
};
use std::convert::Infallible;
use tower_http::trace::TraceLayer;

pub mod students;
pub mod upload;

pub fn router(state: BursarState) -> Router {
    let max_upload_bytes = state.config().upload_config().max_bytes();

    Router::new()
        .route("/students", get(get_students).post(post_new_student))
        .route(
            "/students/{id}",
            get(get_student).put(put_student).delete(delete_student),
        )
        .route(
            "/upload",
            post(post_upload).layer::<_, Infallible>(DefaultBodyLimit::max(max_upload_bytes)),
        )
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
