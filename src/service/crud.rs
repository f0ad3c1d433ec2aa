//! Record CRUD against SQLite. Every mutating operation runs in one transaction.

use crate::error::AppError;
use crate::model::{
    EducationRecord, NewEducationRecord, NewPerson, NewSecondaryContact, Pagination, Patch, Person, PersonPatch,
    PersonRecord, SearchQuery, SecondaryContact,
};
use crate::service::RequestValidator;
use crate::sql::{
    bind_query, bind_query_as, delete_by_id, delete_children_of, insert_education_record, insert_person,
    insert_secondary_contact, search_persons, select_all_persons, select_education_records_in,
    select_person_by_id, select_person_by_primary_email, select_persons_page, select_secondary_contacts_in,
    update_person, QueryBuf, EDUCATION_RECORD_COLUMNS, MAX_LIMIT, PERSON_COLUMNS, SECONDARY_CONTACT_COLUMNS,
};
use crate::store::{EDUCATION_RECORDS_TABLE, PERSONS_TABLE, SECONDARY_CONTACTS_TABLE};
use sqlx::sqlite::SqliteRow;
use sqlx::{FromRow, SqliteConnection, SqlitePool};
use std::collections::HashMap;

pub const DEFAULT_LIMIT: u32 = 100;

/// Person ids per batch when loading children; stays well below SQLite's bound-parameter cap.
const CHILD_BATCH: usize = 500;

pub struct RecordService;

impl RecordService {
    /// Fill in the defaults a list or search will actually apply.
    pub fn effective_page(page: Pagination) -> Pagination {
        Pagination {
            skip: Some(page.skip.unwrap_or(0)),
            limit: Some(page.limit.unwrap_or(DEFAULT_LIMIT).min(MAX_LIMIT)),
        }
    }

    /// Page of persons in id order with children loaded. Limit defaults to 100, max 1000.
    pub async fn list_persons(pool: &SqlitePool, page: Pagination) -> Result<Vec<PersonRecord>, AppError> {
        let (limit, offset) = resolve_page(page);
        let mut conn = pool.acquire().await?;
        let persons: Vec<Person> = fetch_all(&mut conn, &select_persons_page(limit, offset)).await?;
        Ok(attach_children(&mut conn, persons).await?)
    }

    /// Persons matching every supplied filter, each at most once, in id order.
    pub async fn search_persons(
        pool: &SqlitePool,
        query: &SearchQuery,
        page: Pagination,
    ) -> Result<Vec<PersonRecord>, AppError> {
        let (limit, offset) = resolve_page(page);
        let mut conn = pool.acquire().await?;
        let persons: Vec<Person> = fetch_all(&mut conn, &search_persons(query, limit, offset)).await?;
        Ok(attach_children(&mut conn, persons).await?)
    }

    /// Every person with children, in id order.
    pub async fn all_persons(pool: &SqlitePool) -> Result<Vec<PersonRecord>, AppError> {
        let mut conn = pool.acquire().await?;
        let persons: Vec<Person> = fetch_all(&mut conn, &select_all_persons()).await?;
        Ok(attach_children(&mut conn, persons).await?)
    }

    pub async fn get_person(pool: &SqlitePool, id: i64) -> Result<PersonRecord, AppError> {
        let mut conn = pool.acquire().await?;
        load_record(&mut conn, id).await
    }

    pub async fn find_person_by_primary_email(pool: &SqlitePool, email: &str) -> Result<Option<Person>, AppError> {
        let mut conn = pool.acquire().await?;
        Ok(fetch_optional(&mut conn, &select_person_by_primary_email(email.trim())).await?)
    }

    /// Insert a person and all inline children atomically. The email lookup up front only
    /// short-circuits the common case; the unique constraints decide.
    pub async fn create_person(pool: &SqlitePool, mut person: NewPerson) -> Result<PersonRecord, AppError> {
        RequestValidator::validate_new_person(&mut person)?;
        if Self::find_person_by_primary_email(pool, &person.primary_email).await?.is_some() {
            return Err(AppError::DuplicateEmail(person.primary_email));
        }
        let mut tx = pool.begin().await?;
        match create_person_tx(&mut tx, &person).await {
            Ok(record) => {
                tx.commit().await?;
                tracing::info!(person_id = record.person.id, "person created");
                Ok(record)
            }
            Err(e) => {
                tracing::warn!(error = %e, "create person rolled back");
                tx.rollback().await?;
                Err(e)
            }
        }
    }

    /// Apply a partial update. Present scalars are written; a present child list replaces the
    /// existing children of that kind. All or nothing.
    /// A missing person is `NotFound` before the patch itself is validated.
    pub async fn update_person(pool: &SqlitePool, id: i64, patch: PersonPatch) -> Result<PersonRecord, AppError> {
        let mut tx = pool.begin().await?;
        match update_person_tx(&mut tx, id, patch).await {
            Ok(record) => {
                tx.commit().await?;
                tracing::info!(person_id = id, "person updated");
                Ok(record)
            }
            Err(e) => {
                tracing::warn!(person_id = id, error = %e, "update person rolled back");
                tx.rollback().await?;
                Err(e)
            }
        }
    }

    /// Delete a person; children go with it through the cascade. Returns the last known state.
    pub async fn delete_person(pool: &SqlitePool, id: i64) -> Result<PersonRecord, AppError> {
        let mut tx = pool.begin().await?;
        let record = load_record(&mut tx, id).await?;
        execute(&mut tx, &delete_by_id(PERSONS_TABLE, PERSON_COLUMNS, id)).await?;
        tx.commit().await?;
        tracing::info!(person_id = id, "person deleted");
        Ok(record)
    }

    pub async fn create_secondary_contact(
        pool: &SqlitePool,
        person_id: i64,
        mut contact: NewSecondaryContact,
    ) -> Result<SecondaryContact, AppError> {
        RequestValidator::validate_secondary_contact(&mut contact)?;
        let mut conn = pool.acquire().await?;
        ensure_person_exists(&mut conn, person_id).await?;
        let created: SecondaryContact = fetch_one(&mut conn, &insert_secondary_contact(person_id, &contact))
            .await
            .map_err(|e| child_insert_error(e, person_id, Some(&contact.email)))?;
        tracing::info!(person_id, contact_id = created.id, "secondary contact created");
        Ok(created)
    }

    pub async fn list_secondary_contacts(pool: &SqlitePool, person_id: i64) -> Result<Vec<SecondaryContact>, AppError> {
        let mut conn = pool.acquire().await?;
        ensure_person_exists(&mut conn, person_id).await?;
        Ok(fetch_all(&mut conn, &select_secondary_contacts_in(&[person_id])).await?)
    }

    pub async fn delete_secondary_contact(pool: &SqlitePool, id: i64) -> Result<SecondaryContact, AppError> {
        let mut conn = pool.acquire().await?;
        fetch_optional(&mut conn, &delete_by_id(SECONDARY_CONTACTS_TABLE, SECONDARY_CONTACT_COLUMNS, id))
            .await?
            .ok_or_else(|| AppError::NotFound(format!("secondary email {}", id)))
    }

    pub async fn create_education_record(
        pool: &SqlitePool,
        person_id: i64,
        mut record: NewEducationRecord,
    ) -> Result<EducationRecord, AppError> {
        RequestValidator::validate_education_record(&mut record)?;
        let mut conn = pool.acquire().await?;
        ensure_person_exists(&mut conn, person_id).await?;
        let created: EducationRecord = fetch_one(&mut conn, &insert_education_record(person_id, &record))
            .await
            .map_err(|e| child_insert_error(e, person_id, None))?;
        tracing::info!(person_id, education_id = created.id, "education record created");
        Ok(created)
    }

    pub async fn list_education_records(pool: &SqlitePool, person_id: i64) -> Result<Vec<EducationRecord>, AppError> {
        let mut conn = pool.acquire().await?;
        ensure_person_exists(&mut conn, person_id).await?;
        Ok(fetch_all(&mut conn, &select_education_records_in(&[person_id])).await?)
    }

    pub async fn delete_education_record(pool: &SqlitePool, id: i64) -> Result<EducationRecord, AppError> {
        let mut conn = pool.acquire().await?;
        fetch_optional(&mut conn, &delete_by_id(EDUCATION_RECORDS_TABLE, EDUCATION_RECORD_COLUMNS, id))
            .await?
            .ok_or_else(|| AppError::NotFound(format!("education record {}", id)))
    }
}

fn resolve_page(page: Pagination) -> (u32, u32) {
    let page = RecordService::effective_page(page);
    (page.limit.unwrap_or(DEFAULT_LIMIT), page.skip.unwrap_or(0))
}

async fn create_person_tx(conn: &mut SqliteConnection, person: &NewPerson) -> Result<PersonRecord, AppError> {
    let created: Person = fetch_one(conn, &insert_person(person))
        .await
        .map_err(|e| AppError::duplicate_or_db(e, &person.primary_email))?;
    let mut secondary_contacts = Vec::with_capacity(person.secondary_contacts.len());
    for contact in &person.secondary_contacts {
        let row: SecondaryContact = fetch_one(conn, &insert_secondary_contact(created.id, contact))
            .await
            .map_err(|e| AppError::duplicate_or_db(e, &contact.email))?;
        secondary_contacts.push(row);
    }
    let mut education_records = Vec::with_capacity(person.education_records.len());
    for record in &person.education_records {
        let row: EducationRecord = fetch_one(conn, &insert_education_record(created.id, record)).await?;
        education_records.push(row);
    }
    Ok(PersonRecord {
        person: created,
        secondary_contacts,
        education_records,
    })
}

async fn update_person_tx(conn: &mut SqliteConnection, id: i64, mut patch: PersonPatch) -> Result<PersonRecord, AppError> {
    ensure_person_exists(conn, id).await?;
    RequestValidator::validate_patch(&mut patch)?;
    if let Patch::Set(email) = &patch.primary_email {
        let owner: Option<Person> = fetch_optional(conn, &select_person_by_primary_email(email)).await?;
        if owner.is_some_and(|p| p.id != id) {
            return Err(AppError::DuplicateEmail(email.clone()));
        }
    }
    if let Some(q) = update_person(id, &patch) {
        execute(conn, &q).await.map_err(AppError::conflict_or_db)?;
    }
    if let Some(contacts) = &patch.secondary_contacts {
        execute(conn, &delete_children_of(SECONDARY_CONTACTS_TABLE, id)).await?;
        for contact in contacts {
            fetch_one::<SecondaryContact>(conn, &insert_secondary_contact(id, contact))
                .await
                .map_err(AppError::conflict_or_db)?;
        }
    }
    if let Some(records) = &patch.education_records {
        execute(conn, &delete_children_of(EDUCATION_RECORDS_TABLE, id)).await?;
        for record in records {
            fetch_one::<EducationRecord>(conn, &insert_education_record(id, record))
                .await
                .map_err(AppError::conflict_or_db)?;
        }
    }
    load_record(conn, id).await
}

async fn ensure_person_exists(conn: &mut SqliteConnection, id: i64) -> Result<Person, AppError> {
    fetch_optional(conn, &select_person_by_id(id))
        .await?
        .ok_or_else(|| AppError::NotFound(format!("user {}", id)))
}

async fn load_record(conn: &mut SqliteConnection, id: i64) -> Result<PersonRecord, AppError> {
    let person = ensure_person_exists(conn, id).await?;
    let mut records = attach_children(conn, vec![person]).await?;
    records.pop().ok_or_else(|| AppError::NotFound(format!("user {}", id)))
}

/// Batch-load both child collections for `persons`, preserving the order of `persons`.
async fn attach_children(conn: &mut SqliteConnection, persons: Vec<Person>) -> Result<Vec<PersonRecord>, sqlx::Error> {
    let ids: Vec<i64> = persons.iter().map(|p| p.id).collect();
    let mut contacts_by_person: HashMap<i64, Vec<SecondaryContact>> = HashMap::new();
    let mut educations_by_person: HashMap<i64, Vec<EducationRecord>> = HashMap::new();
    for chunk in ids.chunks(CHILD_BATCH) {
        let contacts: Vec<SecondaryContact> = fetch_all(conn, &select_secondary_contacts_in(chunk)).await?;
        for c in contacts {
            contacts_by_person.entry(c.person_id).or_default().push(c);
        }
        let educations: Vec<EducationRecord> = fetch_all(conn, &select_education_records_in(chunk)).await?;
        for e in educations {
            educations_by_person.entry(e.person_id).or_default().push(e);
        }
    }
    Ok(persons
        .into_iter()
        .map(|person| PersonRecord {
            secondary_contacts: contacts_by_person.remove(&person.id).unwrap_or_default(),
            education_records: educations_by_person.remove(&person.id).unwrap_or_default(),
            person,
        })
        .collect())
}

/// A child insert that trips the foreign key lost its parent in between; a unique
/// violation on a contact is a duplicate address.
fn child_insert_error(err: sqlx::Error, person_id: i64, email: Option<&str>) -> AppError {
    if let sqlx::Error::Database(db) = &err {
        if db.is_foreign_key_violation() {
            return AppError::NotFound(format!("user {}", person_id));
        }
    }
    match email {
        Some(email) => AppError::duplicate_or_db(err, email),
        None => AppError::Db(err),
    }
}

async fn fetch_optional<O>(conn: &mut SqliteConnection, q: &QueryBuf) -> Result<Option<O>, sqlx::Error>
where
    O: for<'r> FromRow<'r, SqliteRow> + Send + Unpin,
{
    tracing::debug!(sql = %q.sql, params = ?q.params, "query");
    bind_query_as(sqlx::query_as::<_, O>(&q.sql), &q.params)
        .fetch_optional(&mut *conn)
        .await
}

async fn fetch_one<O>(conn: &mut SqliteConnection, q: &QueryBuf) -> Result<O, sqlx::Error>
where
    O: for<'r> FromRow<'r, SqliteRow> + Send + Unpin,
{
    tracing::debug!(sql = %q.sql, params = ?q.params, "query");
    bind_query_as(sqlx::query_as::<_, O>(&q.sql), &q.params)
        .fetch_one(&mut *conn)
        .await
}

async fn fetch_all<O>(conn: &mut SqliteConnection, q: &QueryBuf) -> Result<Vec<O>, sqlx::Error>
where
    O: for<'r> FromRow<'r, SqliteRow> + Send + Unpin,
{
    tracing::debug!(sql = %q.sql, params = ?q.params, "query");
    bind_query_as(sqlx::query_as::<_, O>(&q.sql), &q.params)
        .fetch_all(&mut *conn)
        .await
}

async fn execute(conn: &mut SqliteConnection, q: &QueryBuf) -> Result<u64, sqlx::Error> {
    tracing::debug!(sql = %q.sql, params = ?q.params, "execute");
    let result = bind_query(sqlx::query(&q.sql), &q.params).execute(&mut *conn).await?;
    Ok(result.rows_affected())
}
