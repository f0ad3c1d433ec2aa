//! Builds parameterized SELECT, INSERT, UPDATE, DELETE for the three record tables.
//! Identifiers come from constants only; every value is a bound parameter.

use crate::model::{NewEducationRecord, NewPerson, NewSecondaryContact, Patch, PersonPatch, SearchQuery};
use crate::sql::SqlValue;
use crate::store::{EDUCATION_RECORDS_TABLE, PERSONS_TABLE, SECONDARY_CONTACTS_TABLE};

pub const PERSON_COLUMNS: &[&str] = &[
    "id",
    "full_name",
    "birth_date",
    "address",
    "high_school",
    "primary_email",
    "remark1",
    "remark2",
    "remark3",
];

pub const SECONDARY_CONTACT_COLUMNS: &[&str] = &["id", "person_id", "email", "description"];

pub const EDUCATION_RECORD_COLUMNS: &[&str] = &[
    "id",
    "person_id",
    "institution_name",
    "student_id",
    "institution_type",
    "degree",
    "start_date",
    "end_date",
];

pub const MAX_LIMIT: u32 = 1000;

const PERSON_ALIAS: &str = "p";
const EDUCATION_ALIAS: &str = "e";
const CONTACT_ALIAS: &str = "s";

#[derive(Debug)]
pub struct QueryBuf {
    pub sql: String,
    pub params: Vec<SqlValue>,
}

impl QueryBuf {
    fn new() -> Self {
        QueryBuf {
            sql: String::new(),
            params: Vec::new(),
        }
    }

    fn push_param(&mut self, v: impl Into<SqlValue>) {
        self.params.push(v.into());
    }
}

fn column_list(columns: &[&str]) -> String {
    columns.join(", ")
}

/// `alias.col AS col` for each column, so row decoding by name is unaffected by joins.
fn aliased_column_list(alias: &str, columns: &[&str]) -> String {
    columns
        .iter()
        .map(|c| format!("{}.{} AS {}", alias, c, c))
        .collect::<Vec<_>>()
        .join(", ")
}

/// Escape LIKE wildcards in user input and wrap it for substring matching. Case is left
/// alone: SQLite's LIKE folds both sides the same way (ASCII letters only).
pub fn like_pattern(needle: &str) -> String {
    let mut out = String::with_capacity(needle.len() + 2);
    out.push('%');
    for c in needle.chars() {
        if matches!(c, '%' | '_' | '\\') {
            out.push('\\');
        }
        out.push(c);
    }
    out.push('%');
    out
}

fn pagination_clause(limit: u32, offset: u32) -> String {
    format!(" LIMIT {} OFFSET {}", limit.min(MAX_LIMIT), offset)
}

/// SELECT one person by id. Caller binds nothing else.
pub fn select_person_by_id(id: i64) -> QueryBuf {
    let mut q = QueryBuf::new();
    q.push_param(id);
    q.sql = format!("SELECT {} FROM {} WHERE id = ?", column_list(PERSON_COLUMNS), PERSONS_TABLE);
    q
}

pub fn select_person_by_primary_email(email: &str) -> QueryBuf {
    let mut q = QueryBuf::new();
    q.push_param(email);
    q.sql = format!(
        "SELECT {} FROM {} WHERE primary_email = ?",
        column_list(PERSON_COLUMNS),
        PERSONS_TABLE
    );
    q
}

/// SELECT a page of persons in id order.
pub fn select_persons_page(limit: u32, offset: u32) -> QueryBuf {
    let mut q = QueryBuf::new();
    q.sql = format!(
        "SELECT {} FROM {} ORDER BY id{}",
        column_list(PERSON_COLUMNS),
        PERSONS_TABLE,
        pagination_clause(limit, offset)
    );
    q
}

/// SELECT every person in id order (export).
pub fn select_all_persons() -> QueryBuf {
    let mut q = QueryBuf::new();
    q.sql = format!("SELECT {} FROM {} ORDER BY id", column_list(PERSON_COLUMNS), PERSONS_TABLE);
    q
}

fn present(filter: &Option<String>) -> Option<&str> {
    filter.as_deref().filter(|s| !s.trim().is_empty())
}

/// Search persons: each needed child table is joined once, every supplied filter is ANDed,
/// and DISTINCT over the person columns collapses join fan-out to one row per person.
/// Both education filters constrain the same education row.
pub fn search_persons(query: &SearchQuery, limit: u32, offset: u32) -> QueryBuf {
    let mut q = QueryBuf::new();
    let mut joins = Vec::new();
    let mut where_parts = Vec::new();

    let person_filters = [
        ("full_name", &query.full_name),
        ("primary_email", &query.primary_email),
        ("high_school", &query.high_school),
    ];
    let education_filters = [
        ("institution_name", &query.institution_name),
        ("institution_type", &query.institution_type),
    ];

    for (col, filter) in person_filters {
        if let Some(needle) = present(filter) {
            where_parts.push(format!("{}.{} LIKE ? ESCAPE '\\'", PERSON_ALIAS, col));
            q.push_param(like_pattern(needle));
        }
    }

    if education_filters.iter().any(|(_, f)| present(f).is_some()) {
        joins.push(format!(
            " JOIN {} {} ON {}.person_id = {}.id",
            EDUCATION_RECORDS_TABLE, EDUCATION_ALIAS, EDUCATION_ALIAS, PERSON_ALIAS
        ));
        for (col, filter) in education_filters {
            if let Some(needle) = present(filter) {
                where_parts.push(format!("{}.{} LIKE ? ESCAPE '\\'", EDUCATION_ALIAS, col));
                q.push_param(like_pattern(needle));
            }
        }
    }

    if let Some(needle) = present(&query.secondary_email) {
        joins.push(format!(
            " JOIN {} {} ON {}.person_id = {}.id",
            SECONDARY_CONTACTS_TABLE, CONTACT_ALIAS, CONTACT_ALIAS, PERSON_ALIAS
        ));
        where_parts.push(format!("{}.email LIKE ? ESCAPE '\\'", CONTACT_ALIAS));
        q.push_param(like_pattern(needle));
    }

    let distinct = if joins.is_empty() { "" } else { "DISTINCT " };
    let where_clause = if where_parts.is_empty() {
        String::new()
    } else {
        format!(" WHERE {}", where_parts.join(" AND "))
    };
    q.sql = format!(
        "SELECT {}{} FROM {} {}{}{} ORDER BY {}.id{}",
        distinct,
        aliased_column_list(PERSON_ALIAS, PERSON_COLUMNS),
        PERSONS_TABLE,
        PERSON_ALIAS,
        joins.join(""),
        where_clause,
        PERSON_ALIAS,
        pagination_clause(limit, offset)
    );
    q
}

/// SELECT children whose person_id is in `person_ids`, ordered by child id. Used to batch-load
/// collections for a page of persons.
pub fn select_children_in(table: &str, columns: &[&str], person_ids: &[i64]) -> QueryBuf {
    let mut q = QueryBuf::new();
    if person_ids.is_empty() {
        q.sql = format!("SELECT {} FROM {} WHERE 1 = 0", column_list(columns), table);
        return q;
    }
    let placeholders: Vec<&str> = person_ids
        .iter()
        .map(|id| {
            q.push_param(*id);
            "?"
        })
        .collect();
    q.sql = format!(
        "SELECT {} FROM {} WHERE person_id IN ({}) ORDER BY id",
        column_list(columns),
        table,
        placeholders.join(", ")
    );
    q
}

pub fn select_secondary_contacts_in(person_ids: &[i64]) -> QueryBuf {
    select_children_in(SECONDARY_CONTACTS_TABLE, SECONDARY_CONTACT_COLUMNS, person_ids)
}

pub fn select_education_records_in(person_ids: &[i64]) -> QueryBuf {
    select_children_in(EDUCATION_RECORDS_TABLE, EDUCATION_RECORD_COLUMNS, person_ids)
}

fn insert_returning(table: &str, columns: &[&str], values: Vec<SqlValue>) -> QueryBuf {
    let mut q = QueryBuf::new();
    let insert_cols: Vec<&str> = columns.iter().copied().filter(|c| *c != "id").collect();
    debug_assert_eq!(insert_cols.len(), values.len());
    let placeholders = vec!["?"; values.len()];
    q.params = values;
    q.sql = format!(
        "INSERT INTO {} ({}) VALUES ({}) RETURNING {}",
        table,
        insert_cols.join(", "),
        placeholders.join(", "),
        column_list(columns)
    );
    q
}

/// INSERT a person (scalars only); children are inserted separately.
pub fn insert_person(person: &NewPerson) -> QueryBuf {
    insert_returning(
        PERSONS_TABLE,
        PERSON_COLUMNS,
        vec![
            person.full_name.clone().into(),
            person.birth_date.into(),
            person.address.clone().into(),
            person.high_school.clone().into(),
            person.primary_email.clone().into(),
            person.remark1.clone().into(),
            person.remark2.clone().into(),
            person.remark3.clone().into(),
        ],
    )
}

pub fn insert_secondary_contact(person_id: i64, contact: &NewSecondaryContact) -> QueryBuf {
    insert_returning(
        SECONDARY_CONTACTS_TABLE,
        SECONDARY_CONTACT_COLUMNS,
        vec![
            person_id.into(),
            contact.email.clone().into(),
            contact.description.clone().into(),
        ],
    )
}

pub fn insert_education_record(person_id: i64, record: &NewEducationRecord) -> QueryBuf {
    insert_returning(
        EDUCATION_RECORDS_TABLE,
        EDUCATION_RECORD_COLUMNS,
        vec![
            person_id.into(),
            record.institution_name.clone().into(),
            record.student_id.clone().into(),
            record.institution_type.clone().into(),
            record.degree.clone().into(),
            record.start_date.into(),
            record.end_date.into(),
        ],
    )
}

fn push_set<T: Clone + Into<SqlValue>>(q: &mut QueryBuf, sets: &mut Vec<String>, col: &str, field: &Patch<T>) {
    if let Some(value) = field.as_update() {
        q.push_param(value.cloned());
        sets.push(format!("{} = ?", col));
    }
}

/// UPDATE persons by id: SET only the scalar attributes that are not `Unset`.
/// Returns `None` when the patch touches no scalar attribute.
pub fn update_person(id: i64, patch: &PersonPatch) -> Option<QueryBuf> {
    let mut q = QueryBuf::new();
    let mut sets = Vec::new();
    push_set(&mut q, &mut sets, "full_name", &patch.full_name);
    push_set(&mut q, &mut sets, "birth_date", &patch.birth_date);
    push_set(&mut q, &mut sets, "address", &patch.address);
    push_set(&mut q, &mut sets, "high_school", &patch.high_school);
    push_set(&mut q, &mut sets, "primary_email", &patch.primary_email);
    push_set(&mut q, &mut sets, "remark1", &patch.remark1);
    push_set(&mut q, &mut sets, "remark2", &patch.remark2);
    push_set(&mut q, &mut sets, "remark3", &patch.remark3);
    if sets.is_empty() {
        return None;
    }
    q.push_param(id);
    q.sql = format!("UPDATE {} SET {} WHERE id = ?", PERSONS_TABLE, sets.join(", "));
    Some(q)
}

/// DELETE one row by id, returning the deleted row.
pub fn delete_by_id(table: &str, columns: &[&str], id: i64) -> QueryBuf {
    let mut q = QueryBuf::new();
    q.push_param(id);
    q.sql = format!("DELETE FROM {} WHERE id = ? RETURNING {}", table, column_list(columns));
    q
}

/// DELETE every child of one person (replace-all sync).
pub fn delete_children_of(table: &str, person_id: i64) -> QueryBuf {
    let mut q = QueryBuf::new();
    q.push_param(person_id);
    q.sql = format!("DELETE FROM {} WHERE person_id = ?", table);
    q
}
