//! Person, secondary email and education handlers.

use crate::error::AppError;
use crate::model::{NewEducationRecord, NewPerson, NewSecondaryContact, Pagination, PersonPatch, SearchQuery};
use crate::response::{created, listed, ok, paged};
use crate::service::RecordService;
use crate::state::AppState;
use axum::{
    extract::{Path, Query, State},
    Json,
};
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::collections::HashMap;

fn parse_id(id_str: &str) -> Result<i64, AppError> {
    id_str
        .parse()
        .map_err(|_| AppError::BadRequest(format!("invalid id: {}", id_str)))
}

fn parse_body<T: DeserializeOwned>(body: Value) -> Result<T, AppError> {
    if !body.is_object() {
        return Err(AppError::BadRequest("body must be a JSON object".into()));
    }
    serde_json::from_value(body).map_err(|e| AppError::Validation(e.to_string()))
}

fn parse_u32(key: &str, v: &str) -> Result<u32, AppError> {
    v.parse()
        .map_err(|_| AppError::BadRequest(format!("{} must be a non-negative integer", key)))
}

/// Split query parameters into pagination and search filters. Unknown keys are ignored.
fn split_params(params: HashMap<String, String>) -> Result<(Pagination, SearchQuery), AppError> {
    let mut page = Pagination::default();
    let mut query = SearchQuery::default();
    for (k, v) in params {
        match k.as_str() {
            "skip" => page.skip = Some(parse_u32("skip", &v)?),
            "limit" => page.limit = Some(parse_u32("limit", &v)?),
            "full_name" => query.full_name = Some(v),
            "primary_email" => query.primary_email = Some(v),
            "high_school" => query.high_school = Some(v),
            "institution_name" => query.institution_name = Some(v),
            "institution_type" => query.institution_type = Some(v),
            "secondary_email" => query.secondary_email = Some(v),
            _ => {}
        }
    }
    Ok((page, query))
}

pub async fn list_users(
    State(state): State<AppState>,
    Query(params): Query<HashMap<String, String>>,
) -> Result<impl axum::response::IntoResponse, AppError> {
    let (page, _) = split_params(params)?;
    let rows = RecordService::list_persons(&state.pool, page).await?;
    Ok(paged(rows, RecordService::effective_page(page)))
}

pub async fn search_users(
    State(state): State<AppState>,
    Query(params): Query<HashMap<String, String>>,
) -> Result<impl axum::response::IntoResponse, AppError> {
    let (page, query) = split_params(params)?;
    let rows = RecordService::search_persons(&state.pool, &query, page).await?;
    Ok(paged(rows, RecordService::effective_page(page)))
}

pub async fn create_user(
    State(state): State<AppState>,
    Json(body): Json<Value>,
) -> Result<impl axum::response::IntoResponse, AppError> {
    let person: NewPerson = parse_body(body)?;
    let row = RecordService::create_person(&state.pool, person).await?;
    Ok(created(row))
}

pub async fn read_user(
    State(state): State<AppState>,
    Path(id_str): Path<String>,
) -> Result<impl axum::response::IntoResponse, AppError> {
    let id = parse_id(&id_str)?;
    let row = RecordService::get_person(&state.pool, id).await?;
    Ok(ok(row))
}

pub async fn update_user(
    State(state): State<AppState>,
    Path(id_str): Path<String>,
    Json(body): Json<Value>,
) -> Result<impl axum::response::IntoResponse, AppError> {
    let id = parse_id(&id_str)?;
    let patch: PersonPatch = parse_body(body)?;
    let row = RecordService::update_person(&state.pool, id, patch).await?;
    Ok(ok(row))
}

pub async fn delete_user(
    State(state): State<AppState>,
    Path(id_str): Path<String>,
) -> Result<impl axum::response::IntoResponse, AppError> {
    let id = parse_id(&id_str)?;
    let row = RecordService::delete_person(&state.pool, id).await?;
    Ok(ok(row))
}

pub async fn create_secondary_email(
    State(state): State<AppState>,
    Path(id_str): Path<String>,
    Json(body): Json<Value>,
) -> Result<impl axum::response::IntoResponse, AppError> {
    let person_id = parse_id(&id_str)?;
    let contact: NewSecondaryContact = parse_body(body)?;
    let row = RecordService::create_secondary_contact(&state.pool, person_id, contact).await?;
    Ok(created(row))
}

pub async fn list_secondary_emails(
    State(state): State<AppState>,
    Path(id_str): Path<String>,
) -> Result<impl axum::response::IntoResponse, AppError> {
    let person_id = parse_id(&id_str)?;
    let rows = RecordService::list_secondary_contacts(&state.pool, person_id).await?;
    Ok(listed(rows))
}

pub async fn delete_secondary_email(
    State(state): State<AppState>,
    Path(id_str): Path<String>,
) -> Result<impl axum::response::IntoResponse, AppError> {
    let id = parse_id(&id_str)?;
    let row = RecordService::delete_secondary_contact(&state.pool, id).await?;
    Ok(ok(row))
}

pub async fn create_education(
    State(state): State<AppState>,
    Path(id_str): Path<String>,
    Json(body): Json<Value>,
) -> Result<impl axum::response::IntoResponse, AppError> {
    let person_id = parse_id(&id_str)?;
    let record: NewEducationRecord = parse_body(body)?;
    let row = RecordService::create_education_record(&state.pool, person_id, record).await?;
    Ok(created(row))
}

pub async fn list_educations(
    State(state): State<AppState>,
    Path(id_str): Path<String>,
) -> Result<impl axum::response::IntoResponse, AppError> {
    let person_id = parse_id(&id_str)?;
    let rows = RecordService::list_education_records(&state.pool, person_id).await?;
    Ok(listed(rows))
}

pub async fn delete_education(
    State(state): State<AppState>,
    Path(id_str): Path<String>,
) -> Result<impl axum::response::IntoResponse, AppError> {
    let id = parse_id(&id_str)?;
    let row = RecordService::delete_education_record(&state.pool, id).await?;
    Ok(ok(row))
}
