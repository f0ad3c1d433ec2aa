mod common;

use chrono::NaiveDate;
use common::{contact, count, education, person, pool};
use dossier::{AppError, NewPerson, Pagination, Patch, PersonPatch, RecordService};

#[tokio::test]
async fn create_person_with_children() {
    let pool = pool().await;
    let mut new = person("Ann Lee", "ann@x.com");
    new.birth_date = NaiveDate::from_ymd_opt(1990, 4, 2);
    new.secondary_contacts = vec![contact("ann.work@x.com"), contact("ann.alt@x.com")];
    new.education_records = vec![education("MIT", Some("University"))];

    let created = RecordService::create_person(&pool, new).await.unwrap();
    assert_eq!(created.person.full_name, "Ann Lee");
    assert_eq!(created.person.birth_date, NaiveDate::from_ymd_opt(1990, 4, 2));
    assert_eq!(created.secondary_contacts.len(), 2);
    assert_eq!(created.education_records.len(), 1);
    assert!(created
        .secondary_contacts
        .iter()
        .all(|c| c.person_id == created.person.id));

    let fetched = RecordService::get_person(&pool, created.person.id).await.unwrap();
    assert_eq!(fetched, created);
}

#[tokio::test]
async fn create_trims_and_validates() {
    let pool = pool().await;
    let created = RecordService::create_person(&pool, person("  Ann  ", " ann@x.com "))
        .await
        .unwrap();
    assert_eq!(created.person.full_name, "Ann");
    assert_eq!(created.person.primary_email, "ann@x.com");

    let err = RecordService::create_person(&pool, person("Bob", "not-an-email"))
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Validation(_)));
    let err = RecordService::create_person(&pool, person("   ", "bob@x.com"))
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Validation(_)));
}

#[tokio::test]
async fn duplicate_primary_email_writes_nothing() {
    let pool = pool().await;
    RecordService::create_person(&pool, person("Ann", "ann@x.com")).await.unwrap();

    let mut dup = person("Other Ann", "ANN@x.com");
    dup.secondary_contacts = vec![contact("other@x.com")];
    dup.education_records = vec![education("Yale", None)];
    let err = RecordService::create_person(&pool, dup).await.unwrap_err();
    assert!(matches!(err, AppError::DuplicateEmail(_)));

    assert_eq!(count(&pool, "persons").await, 1);
    assert_eq!(count(&pool, "secondary_contacts").await, 0);
    assert_eq!(count(&pool, "education_records").await, 0);
}

#[tokio::test]
async fn failed_child_insert_rolls_back_create() {
    let pool = pool().await;
    let mut owner = person("Ann", "ann@x.com");
    owner.secondary_contacts = vec![contact("shared@x.com")];
    RecordService::create_person(&pool, owner).await.unwrap();

    let mut new = person("Bob", "bob@x.com");
    new.secondary_contacts = vec![contact("bob2@x.com"), contact("shared@x.com")];
    let err = RecordService::create_person(&pool, new).await.unwrap_err();
    assert!(matches!(err, AppError::DuplicateEmail(_)));

    assert!(RecordService::find_person_by_primary_email(&pool, "bob@x.com")
        .await
        .unwrap()
        .is_none());
    assert_eq!(count(&pool, "secondary_contacts").await, 1);
}

#[tokio::test]
async fn get_missing_person_is_not_found() {
    let pool = pool().await;
    let err = RecordService::get_person(&pool, 42).await.unwrap_err();
    assert!(matches!(err, AppError::NotFound(_)));
}

#[tokio::test]
async fn list_pages_in_id_order() {
    let pool = pool().await;
    for i in 0..5 {
        RecordService::create_person(&pool, person(&format!("P{}", i), &format!("p{}@x.com", i)))
            .await
            .unwrap();
    }
    let page = RecordService::list_persons(
        &pool,
        Pagination {
            skip: Some(1),
            limit: Some(2),
        },
    )
    .await
    .unwrap();
    let names: Vec<&str> = page.iter().map(|r| r.person.full_name.as_str()).collect();
    assert_eq!(names, ["P1", "P2"]);

    let all = RecordService::list_persons(&pool, Pagination::default()).await.unwrap();
    assert_eq!(all.len(), 5);
    assert!(all.windows(2).all(|w| w[0].person.id < w[1].person.id));

    let past_end = RecordService::list_persons(
        &pool,
        Pagination {
            skip: Some(10),
            limit: None,
        },
    )
    .await
    .unwrap();
    assert!(past_end.is_empty());
}

#[tokio::test]
async fn update_scalars_leaves_children_alone() {
    let pool = pool().await;
    let mut new = person("Ann", "ann@x.com");
    new.address = Some("1 Main St".into());
    new.secondary_contacts = vec![contact("ann2@x.com")];
    let created = RecordService::create_person(&pool, new).await.unwrap();

    let patch = PersonPatch {
        full_name: Patch::Set("Ann Lee".into()),
        address: Patch::Null,
        ..Default::default()
    };
    let updated = RecordService::update_person(&pool, created.person.id, patch).await.unwrap();
    assert_eq!(updated.person.full_name, "Ann Lee");
    assert_eq!(updated.person.address, None);
    assert_eq!(updated.person.primary_email, "ann@x.com");
    assert_eq!(updated.secondary_contacts, created.secondary_contacts);
}

#[tokio::test]
async fn update_replaces_child_lists() {
    let pool = pool().await;
    let mut new = person("Ann", "ann@x.com");
    new.secondary_contacts = vec![contact("a1@x.com"), contact("a2@x.com")];
    new.education_records = vec![education("MIT", Some("University"))];
    let created = RecordService::create_person(&pool, new).await.unwrap();
    let old_ids: Vec<i64> = created.secondary_contacts.iter().map(|c| c.id).collect();

    let patch = PersonPatch {
        secondary_contacts: Some(vec![contact("a2@x.com"), contact("a3@x.com")]),
        education_records: Some(vec![]),
        ..Default::default()
    };
    let updated = RecordService::update_person(&pool, created.person.id, patch).await.unwrap();

    let emails: Vec<&str> = updated.secondary_contacts.iter().map(|c| c.email.as_str()).collect();
    assert_eq!(emails, ["a2@x.com", "a3@x.com"]);
    assert!(updated.secondary_contacts.iter().all(|c| !old_ids.contains(&c.id)));
    assert!(updated.education_records.is_empty());
    assert_eq!(count(&pool, "secondary_contacts").await, 2);
    assert_eq!(count(&pool, "education_records").await, 0);
}

#[tokio::test]
async fn update_to_another_persons_email_is_rejected() {
    let pool = pool().await;
    RecordService::create_person(&pool, person("Ann", "ann@x.com")).await.unwrap();
    let bob = RecordService::create_person(&pool, person("Bob", "bob@x.com")).await.unwrap();

    let patch = PersonPatch {
        primary_email: Patch::Set("Ann@X.com".into()),
        ..Default::default()
    };
    let err = RecordService::update_person(&pool, bob.person.id, patch).await.unwrap_err();
    assert!(matches!(err, AppError::DuplicateEmail(_)));

    let same = PersonPatch {
        primary_email: Patch::Set("bob@x.com".into()),
        ..Default::default()
    };
    RecordService::update_person(&pool, bob.person.id, same).await.unwrap();
}

#[tokio::test]
async fn failed_update_keeps_prior_state() {
    let pool = pool().await;
    let mut new = person("Ann", "ann@x.com");
    new.secondary_contacts = vec![contact("a1@x.com")];
    new.education_records = vec![education("MIT", None)];
    let created = RecordService::create_person(&pool, new).await.unwrap();

    let patch = PersonPatch {
        full_name: Patch::Set("Renamed".into()),
        education_records: Some(vec![education("Yale", None)]),
        secondary_contacts: Some(vec![contact("dup@x.com"), contact("dup@x.com")]),
        ..Default::default()
    };
    let err = RecordService::update_person(&pool, created.person.id, patch).await.unwrap_err();
    assert!(matches!(err, AppError::Conflict(_)));

    let after = RecordService::get_person(&pool, created.person.id).await.unwrap();
    assert_eq!(after, created);
}

#[tokio::test]
async fn update_rejects_null_required_fields_and_missing_person() {
    let pool = pool().await;
    let created = RecordService::create_person(&pool, person("Ann", "ann@x.com")).await.unwrap();

    let patch = PersonPatch {
        full_name: Patch::Null,
        ..Default::default()
    };
    let err = RecordService::update_person(&pool, created.person.id, patch).await.unwrap_err();
    assert!(matches!(err, AppError::Validation(_)));

    let err = RecordService::update_person(&pool, 999, PersonPatch::default())
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::NotFound(_)));

    let invalid = PersonPatch {
        primary_email: Patch::Set("not-an-email".into()),
        ..Default::default()
    };
    let err = RecordService::update_person(&pool, 999, invalid).await.unwrap_err();
    assert!(matches!(err, AppError::NotFound(_)));
}

#[tokio::test]
async fn delete_cascades_to_children() {
    let pool = pool().await;
    let mut new = person("Ann", "ann@x.com");
    new.secondary_contacts = vec![contact("a1@x.com")];
    new.education_records = vec![education("MIT", None), education("Yale", None)];
    let created = RecordService::create_person(&pool, new).await.unwrap();
    let keep = RecordService::create_person(
        &pool,
        NewPerson {
            secondary_contacts: vec![contact("b1@x.com")],
            ..person("Bob", "bob@x.com")
        },
    )
    .await
    .unwrap();

    let deleted = RecordService::delete_person(&pool, created.person.id).await.unwrap();
    assert_eq!(deleted, created);

    assert_eq!(count(&pool, "persons").await, 1);
    assert_eq!(count(&pool, "secondary_contacts").await, 1);
    assert_eq!(count(&pool, "education_records").await, 0);
    assert!(RecordService::get_person(&pool, keep.person.id).await.is_ok());

    let err = RecordService::delete_person(&pool, created.person.id).await.unwrap_err();
    assert!(matches!(err, AppError::NotFound(_)));
}

#[tokio::test]
async fn child_operations() {
    let pool = pool().await;
    let ann = RecordService::create_person(&pool, person("Ann", "ann@x.com")).await.unwrap();
    let id = ann.person.id;

    let c = RecordService::create_secondary_contact(&pool, id, contact("a1@x.com")).await.unwrap();
    assert_eq!(c.person_id, id);
    let err = RecordService::create_secondary_contact(&pool, id, contact("A1@x.com"))
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::DuplicateEmail(_)));

    let mut edu = education("MIT", Some("University"));
    edu.start_date = NaiveDate::from_ymd_opt(2010, 9, 1);
    let e = RecordService::create_education_record(&pool, id, edu).await.unwrap();
    assert_eq!(e.start_date, NaiveDate::from_ymd_opt(2010, 9, 1));

    let mut backwards = education("Yale", None);
    backwards.start_date = NaiveDate::from_ymd_opt(2012, 1, 1);
    backwards.end_date = NaiveDate::from_ymd_opt(2011, 1, 1);
    let err = RecordService::create_education_record(&pool, id, backwards)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Validation(_)));

    assert_eq!(RecordService::list_secondary_contacts(&pool, id).await.unwrap(), vec![c.clone()]);
    assert_eq!(RecordService::list_education_records(&pool, id).await.unwrap(), vec![e.clone()]);

    assert_eq!(RecordService::delete_secondary_contact(&pool, c.id).await.unwrap(), c);
    assert_eq!(RecordService::delete_education_record(&pool, e.id).await.unwrap(), e);
    assert!(matches!(
        RecordService::delete_secondary_contact(&pool, c.id).await,
        Err(AppError::NotFound(_))
    ));
    assert!(matches!(
        RecordService::delete_education_record(&pool, e.id).await,
        Err(AppError::NotFound(_))
    ));
}

#[tokio::test]
async fn child_operations_on_missing_person_are_not_found() {
    let pool = pool().await;
    assert!(matches!(
        RecordService::create_secondary_contact(&pool, 7, contact("x@x.com")).await,
        Err(AppError::NotFound(_))
    ));
    assert!(matches!(
        RecordService::create_education_record(&pool, 7, education("MIT", None)).await,
        Err(AppError::NotFound(_))
    ));
    assert!(matches!(
        RecordService::list_secondary_contacts(&pool, 7).await,
        Err(AppError::NotFound(_))
    ));
    assert!(matches!(
        RecordService::list_education_records(&pool, 7).await,
        Err(AppError::NotFound(_))
    ));
}
