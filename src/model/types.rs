//! Persisted rows, read shapes and request payloads.

use crate::model::Patch;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Row of `persons`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Person {
    pub id: i64,
    pub full_name: String,
    pub birth_date: Option<NaiveDate>,
    pub address: Option<String>,
    pub high_school: Option<String>,
    pub primary_email: String,
    pub remark1: Option<String>,
    pub remark2: Option<String>,
    pub remark3: Option<String>,
}

/// Row of `secondary_contacts`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct SecondaryContact {
    pub id: i64,
    #[serde(rename = "user_id")]
    pub person_id: i64,
    pub email: String,
    pub description: Option<String>,
}

/// Row of `education_records`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct EducationRecord {
    pub id: i64,
    #[serde(rename = "user_id")]
    pub person_id: i64,
    pub institution_name: String,
    pub student_id: Option<String>,
    pub institution_type: Option<String>,
    pub degree: Option<String>,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
}

/// A person with both child collections loaded, children ordered by id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PersonRecord {
    #[serde(flatten)]
    pub person: Person,
    #[serde(rename = "secondary_emails")]
    pub secondary_contacts: Vec<SecondaryContact>,
    #[serde(rename = "educations")]
    pub education_records: Vec<EducationRecord>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewSecondaryContact {
    pub email: String,
    #[serde(default)]
    pub description: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct NewEducationRecord {
    pub institution_name: String,
    #[serde(default)]
    pub student_id: Option<String>,
    #[serde(default)]
    pub institution_type: Option<String>,
    #[serde(default)]
    pub degree: Option<String>,
    #[serde(default)]
    pub start_date: Option<NaiveDate>,
    #[serde(default)]
    pub end_date: Option<NaiveDate>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct NewPerson {
    pub full_name: String,
    #[serde(default)]
    pub birth_date: Option<NaiveDate>,
    #[serde(default)]
    pub address: Option<String>,
    #[serde(default)]
    pub high_school: Option<String>,
    pub primary_email: String,
    #[serde(default)]
    pub remark1: Option<String>,
    #[serde(default)]
    pub remark2: Option<String>,
    #[serde(default)]
    pub remark3: Option<String>,
    #[serde(default, rename = "secondary_emails", alias = "secondary_contacts")]
    pub secondary_contacts: Vec<NewSecondaryContact>,
    #[serde(default, rename = "educations", alias = "education_records")]
    pub education_records: Vec<NewEducationRecord>,
}

/// Partial update of a person. Scalars are applied only when not `Unset`; a child list
/// that is `Some` (even empty) replaces every existing child of that kind.
#[derive(Debug, Clone, PartialEq, Default, Deserialize)]
pub struct PersonPatch {
    #[serde(default)]
    pub full_name: Patch<String>,
    #[serde(default)]
    pub birth_date: Patch<NaiveDate>,
    #[serde(default)]
    pub address: Patch<String>,
    #[serde(default)]
    pub high_school: Patch<String>,
    #[serde(default)]
    pub primary_email: Patch<String>,
    #[serde(default)]
    pub remark1: Patch<String>,
    #[serde(default)]
    pub remark2: Patch<String>,
    #[serde(default)]
    pub remark3: Patch<String>,
    #[serde(default, rename = "secondary_emails", alias = "secondary_contacts")]
    pub secondary_contacts: Option<Vec<NewSecondaryContact>>,
    #[serde(default, rename = "educations", alias = "education_records")]
    pub education_records: Option<Vec<NewEducationRecord>>,
}

/// Optional search criteria, ANDed together. Each is a case-insensitive substring match.
#[derive(Debug, Clone, PartialEq, Default, Deserialize)]
pub struct SearchQuery {
    pub full_name: Option<String>,
    pub primary_email: Option<String>,
    pub high_school: Option<String>,
    pub institution_name: Option<String>,
    pub institution_type: Option<String>,
    pub secondary_email: Option<String>,
}

/// Offset pagination from `skip` / `limit` query parameters.
#[derive(Debug, Clone, Copy, PartialEq, Default, Deserialize)]
pub struct Pagination {
    pub skip: Option<u32>,
    pub limit: Option<u32>,
}
