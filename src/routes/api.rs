//! Record routes, mounted under `/api`. Collection paths also answer with a trailing slash.

use crate::handlers::{
    create_education, create_secondary_email, create_user, delete_education, delete_secondary_email,
    delete_user, export_users_csv, import_users_csv, list_educations, list_secondary_emails, list_users,
    read_user, search_users, update_user,
};
use crate::state::AppState;
use axum::{
    routing::{delete, get, post},
    Router,
};

pub fn api_routes(state: AppState) -> Router {
    Router::new()
        .route("/users", get(list_users).post(create_user))
        .route("/users/", get(list_users).post(create_user))
        .route("/users/search", get(search_users))
        .route("/users/search/", get(search_users))
        .route("/users/export/csv", get(export_users_csv))
        .route("/users/import/csv", post(import_users_csv))
        .route(
            "/users/:user_id",
            get(read_user).put(update_user).delete(delete_user),
        )
        .route(
            "/users/:user_id/secondary_emails",
            get(list_secondary_emails).post(create_secondary_email),
        )
        .route(
            "/users/:user_id/secondary_emails/",
            get(list_secondary_emails).post(create_secondary_email),
        )
        .route(
            "/users/:user_id/educations",
            get(list_educations).post(create_education),
        )
        .route(
            "/users/:user_id/educations/",
            get(list_educations).post(create_education),
        )
        .route("/secondary_emails/:email_id", delete(delete_secondary_email))
        .route("/educations/:education_id", delete(delete_education))
        .with_state(state)
}
