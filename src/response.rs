//! Response envelopes: `{"data": ...}` for single records and `{"data": [...], "meta": {...}}`
//! for lists.

use crate::model::Pagination;
use axum::{http::StatusCode, Json};
use serde::Serialize;

#[derive(Serialize)]
pub struct Record<T> {
    pub data: T,
}

#[derive(Serialize)]
pub struct Listing<T> {
    pub data: Vec<T>,
    pub meta: ListMeta,
}

/// `count` is the size of this page; `skip` and `limit` echo the effective window when the
/// list is paged.
#[derive(Serialize)]
pub struct ListMeta {
    pub count: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub skip: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub limit: Option<u32>,
}

pub fn created<T: Serialize>(data: T) -> (StatusCode, Json<Record<T>>) {
    (StatusCode::CREATED, Json(Record { data }))
}

pub fn ok<T: Serialize>(data: T) -> (StatusCode, Json<Record<T>>) {
    (StatusCode::OK, Json(Record { data }))
}

/// Unpaged list, e.g. the children of one person.
pub fn listed<T: Serialize>(data: Vec<T>) -> (StatusCode, Json<Listing<T>>) {
    let meta = ListMeta {
        count: data.len(),
        skip: None,
        limit: None,
    };
    (StatusCode::OK, Json(Listing { data, meta }))
}

/// One page of a paged list. `page` must already be resolved to its effective values.
pub fn paged<T: Serialize>(data: Vec<T>, page: Pagination) -> (StatusCode, Json<Listing<T>>) {
    let meta = ListMeta {
        count: data.len(),
        skip: page.skip,
        limit: page.limit,
    };
    (StatusCode::OK, Json(Listing { data, meta }))
}
