#![allow(dead_code)]

use dossier::{NewEducationRecord, NewPerson, NewSecondaryContact};
use sqlx::SqlitePool;

pub async fn pool() -> SqlitePool {
    dossier::connect_in_memory().await.unwrap()
}

pub fn person(full_name: &str, email: &str) -> NewPerson {
    NewPerson {
        full_name: full_name.to_string(),
        primary_email: email.to_string(),
        ..Default::default()
    }
}

pub fn contact(email: &str) -> NewSecondaryContact {
    NewSecondaryContact {
        email: email.to_string(),
        description: None,
    }
}

pub fn education(name: &str, kind: Option<&str>) -> NewEducationRecord {
    NewEducationRecord {
        institution_name: name.to_string(),
        institution_type: kind.map(String::from),
        ..Default::default()
    }
}

pub async fn count(pool: &SqlitePool, table: &str) -> i64 {
    let (n,): (i64,) = sqlx::query_as(&format!("SELECT COUNT(*) FROM {}", table))
        .fetch_one(pool)
        .await
        .unwrap();
    n
}
