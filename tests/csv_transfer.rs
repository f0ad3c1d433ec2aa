mod common;

use chrono::NaiveDate;
use common::{contact, count, education, person, pool};
use dossier::{export_csv, import_csv, AppError, NewPerson, RecordService};

#[tokio::test]
async fn export_lists_everyone_with_flattened_children() {
    let pool = pool().await;
    let mut edu = education("MIT", Some("University"));
    edu.degree = Some("BSc".into());
    edu.start_date = NaiveDate::from_ymd_opt(2008, 9, 1);
    RecordService::create_person(
        &pool,
        NewPerson {
            birth_date: NaiveDate::from_ymd_opt(1990, 4, 2),
            address: Some("1 Main St, Springfield".into()),
            secondary_contacts: vec![contact("a1@x.com"), contact("a2@x.com")],
            education_records: vec![edu],
            ..person("Ann", "ann@x.com")
        },
    )
    .await
    .unwrap();
    RecordService::create_person(&pool, person("Bob", "bob@x.com")).await.unwrap();

    let bytes = export_csv(&pool).await.unwrap();
    let mut reader = csv::Reader::from_reader(bytes.as_slice());
    let headers: Vec<String> = reader.headers().unwrap().iter().map(String::from).collect();
    assert_eq!(headers, dossier::transfer::csv::EXPORT_HEADERS);

    let rows: Vec<csv::StringRecord> = reader.records().map(Result::unwrap).collect();
    assert_eq!(rows.len(), 2);
    assert_eq!(&rows[0][1], "Ann");
    assert_eq!(&rows[0][2], "1990-04-02");
    assert_eq!(&rows[0][3], "1 Main St, Springfield");
    assert_eq!(&rows[0][9], "a1@x.com, a2@x.com");
    assert_eq!(&rows[0][10], "University: MIT (BSc) [2008-09-01 - Present]");
    assert_eq!(&rows[1][2], "");
    assert_eq!(&rows[1][9], "");
    assert_eq!(&rows[1][10], "");
}

#[tokio::test]
async fn empty_store_exports_only_the_header() {
    let pool = pool().await;
    let bytes = export_csv(&pool).await.unwrap();
    let text = String::from_utf8(bytes).unwrap();
    assert_eq!(text.lines().count(), 1);
    assert!(text.starts_with("id,full_name,"));
}

#[tokio::test]
async fn export_then_import_restores_core_fields() {
    let source = pool().await;
    RecordService::create_person(
        &source,
        NewPerson {
            birth_date: NaiveDate::from_ymd_opt(1985, 12, 31),
            high_school: Some("Central".into()),
            remark2: Some("note, with comma".into()),
            secondary_contacts: vec![contact("ann2@x.com")],
            ..person("Ann", "ann@x.com")
        },
    )
    .await
    .unwrap();
    RecordService::create_person(&source, person("Bob", "bob@x.com")).await.unwrap();
    let bytes = export_csv(&source).await.unwrap();

    let target = pool().await;
    let summary = import_csv(&target, &bytes).await.unwrap();
    assert_eq!(summary.imported, 2);
    assert_eq!(summary.skipped, 0);
    assert!(summary.errors.is_empty());

    let copied = RecordService::all_persons(&target).await.unwrap();
    let source_rows = RecordService::all_persons(&source).await.unwrap();
    for (a, b) in copied.iter().zip(source_rows.iter()) {
        assert_eq!(a.person.full_name, b.person.full_name);
        assert_eq!(a.person.primary_email, b.person.primary_email);
        assert_eq!(a.person.birth_date, b.person.birth_date);
        assert_eq!(a.person.high_school, b.person.high_school);
        assert_eq!(a.person.remark2, b.person.remark2);
        assert!(a.secondary_contacts.is_empty());
    }
    assert_eq!(count(&target, "secondary_contacts").await, 0);
}

#[tokio::test]
async fn bad_rows_are_skipped_and_reported() {
    let pool = pool().await;
    RecordService::create_person(&pool, person("Existing", "taken@x.com")).await.unwrap();

    let csv = "\u{feff}full_name,primary_email,birth_date\n\
               Ann,ann@x.com,1990-01-02\n\
               No Email,,\n\
               Dup,TAKEN@x.com,\n\
               Bad Date,bd@x.com,02/01/1990\n\
               Bad Email,nope,\n\
               Bob,bob@x.com,\n";
    let summary = import_csv(&pool, csv.as_bytes()).await.unwrap();
    assert_eq!(summary.imported, 2);
    assert_eq!(summary.skipped, 4);
    assert_eq!(summary.errors.len(), 4);
    assert!(summary.errors[0].starts_with("Row 3:"));
    assert!(summary.errors[1].contains("taken@x.com") || summary.errors[1].contains("TAKEN@x.com"));
    assert!(summary.message.contains("2 imported"));

    let bob = RecordService::find_person_by_primary_email(&pool, "bob@x.com")
        .await
        .unwrap();
    assert!(bob.is_some());
    assert_eq!(count(&pool, "persons").await, 3);
}

#[tokio::test]
async fn repeated_email_within_one_file_imports_once() {
    let pool = pool().await;
    let csv = "primary_email,full_name\nann@x.com,Ann\nann@x.com,Ann Again\n";
    let summary = import_csv(&pool, csv.as_bytes()).await.unwrap();
    assert_eq!(summary.imported, 1);
    assert_eq!(summary.skipped, 1);
    let ann = RecordService::find_person_by_primary_email(&pool, "ann@x.com")
        .await
        .unwrap()
        .unwrap();
    assert_eq!(ann.full_name, "Ann");
}

#[tokio::test]
async fn missing_required_header_rejects_file() {
    let pool = pool().await;
    let err = import_csv(&pool, b"full_name,address\nAnn,Somewhere\n")
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Validation(_)));
    assert_eq!(count(&pool, "persons").await, 0);
}

#[tokio::test]
async fn non_utf8_file_is_rejected() {
    let pool = pool().await;
    let err = import_csv(&pool, &[0x66, 0x75, 0xff, 0xfe, 0x0a]).await.unwrap_err();
    assert!(matches!(err, AppError::Validation(_)));
}

#[tokio::test]
async fn database_error_on_one_row_skips_only_that_row() {
    let pool = pool().await;
    sqlx::query(
        "CREATE TRIGGER reject_broken BEFORE INSERT ON persons WHEN NEW.full_name = 'Broken' \
         BEGIN SELECT RAISE(ABORT, 'rejected by trigger'); END",
    )
    .execute(&pool)
    .await
    .unwrap();

    let csv = "full_name,primary_email\nAnn,ann@x.com\nBroken,broken@x.com\nBob,bob@x.com\n";
    let summary = import_csv(&pool, csv.as_bytes()).await.unwrap();
    assert_eq!(summary.imported, 2);
    assert_eq!(summary.skipped, 1);
    assert_eq!(summary.errors.len(), 1);
    assert!(summary.errors[0].starts_with("Row 3:"));
    assert!(summary.errors[0].contains("rejected by trigger"));

    assert!(RecordService::find_person_by_primary_email(&pool, "bob@x.com")
        .await
        .unwrap()
        .is_some());
    assert!(RecordService::find_person_by_primary_email(&pool, "broken@x.com")
        .await
        .unwrap()
        .is_none());
}
