//! End-to-end run: JSONL feed → transforms → SQLite tables

use std::io::Write;

use widget_etl_core::{
    build_inverted_index, read_file, Columnar, Pipeline, QualitySuite, Scalar, Stage,
};
use widget_etl_store::{EtlDb, StoreError, INVERTED_INDEX_TABLE, TRANSFORMED_TABLE};

const FEED: &str = r#"{"id": 1, "created_at": "2023-03-01T10:00:00", "creation_date": "2023-03-01", "age_group": "18-24", "user_score": 7.5, "email": "ann@example.com", "location": "Austin, TX", "revenue": 120.0, "widget_list": [{"name": "gear", "amount": 2}, {"name": "bolt", "amount": 5}]}
{"id": 1, "created_at": "2023-03-01T10:00:00", "creation_date": "2023-03-01", "age_group": "18-24", "user_score": 7.5, "email": "ann@example.com", "location": "Austin, TX", "revenue": 120.0, "widget_list": [{"name": "gear", "amount": 2}, {"name": "bolt", "amount": 5}]}
{"id": 2, "created_at": "2023-03-02T11:30:00", "creation_date": "2023-03-02", "age_group": "25-34", "user_score": 4.0, "email": "bob@example.com", "location": "Denver, CO", "revenue": 80.5, "widget_list": [{"name": "cog", "amount": 1}]}

{"id": 3, "created_at": "2023-03-03T09:15:00", "creation_date": "2023-03-03", "age_group": "18-24", "user_score": 9.0, "email": "cy@example.com", "location": "Austin, TX", "revenue": 300.0, "widget_list": []}
{"id": 4, "created_at": "2023-03-04T08:00:00", "creation_date": "2023-03-04", "age_group": "25-34", "user_score": 6.0, "email": "di@example.com", "location": "Austin, TX", "revenue": 10.0, "widget_list": [{"name": "cog", "amount": 3}]}
"#;

fn write_feed() -> tempfile::NamedTempFile {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    file.write_all(FEED.as_bytes()).unwrap();
    file
}

#[test]
fn test_full_etl_run() {
    let feed = write_feed();
    let dir = tempfile::tempdir().unwrap();
    let db_path = dir.path().join("export").join("database.db");

    let raw = read_file(feed.path()).unwrap();
    assert_eq!(raw.len(), 5);

    let report = QualitySuite::default().validate(&raw).unwrap();
    assert!(report.success());

    let output = Pipeline::new().run(&raw).unwrap();
    assert_eq!(output.rows_after(Stage::Deduplicated), Some(4));
    assert_eq!(output.rows_after(Stage::Flattened), Some(4));

    let top_ids: Vec<Scalar> = output
        .top_users
        .as_ref()
        .unwrap()
        .iter()
        .map(|u| u.id.clone())
        .collect();
    assert_eq!(top_ids, vec![Scalar::Int(3), Scalar::Int(4)]);

    let mut db = EtlDb::open_or_create(&db_path).unwrap();
    let written = db.load(TRANSFORMED_TABLE, &output.transformed).unwrap();
    assert_eq!(written, 4);

    let index = build_inverted_index(&output.transformed).unwrap();
    db.replace_table(INVERTED_INDEX_TABLE, &index.to_table())
        .unwrap();
    db.mark_run_complete().unwrap();

    // Ranked order: 18-24 (id 1; id 3 dropped by flattening), then 25-34 (id 4, id 2)
    let stored_index = db.read_table(INVERTED_INDEX_TABLE).unwrap();
    assert_eq!(
        stored_index.rows(),
        &[
            vec![Scalar::from("Austin, TX"), Scalar::from("1,1,4")],
            vec![Scalar::from("Denver, CO"), Scalar::from("2")],
        ]
    );

    let stored = db.read_table(TRANSFORMED_TABLE).unwrap();
    assert_eq!(
        stored.column("widget_name"),
        Some(vec![
            &Scalar::from("gear"),
            &Scalar::from("bolt"),
            &Scalar::from("cog"),
            &Scalar::from("cog"),
        ])
    );
    assert_eq!(
        stored.column("age_group_rank"),
        Some(vec![&Scalar::Int(2), &Scalar::Int(2), &Scalar::Int(1), &Scalar::Int(2)])
    );
    assert!(stored
        .column("widget_list")
        .unwrap()
        .iter()
        .all(|v| matches!(v, Scalar::Text(t) if t.starts_with('{'))));
}

#[test]
fn test_rerun_replaces_tables() {
    let feed = write_feed();
    let dir = tempfile::tempdir().unwrap();
    let db_path = dir.path().join("database.db");
    let raw = read_file(feed.path()).unwrap();

    for _ in 0..2 {
        let output = Pipeline::new().run(&raw).unwrap();
        let mut db = EtlDb::open_or_create(&db_path).unwrap();
        db.load(TRANSFORMED_TABLE, &output.transformed).unwrap();
        let index = build_inverted_index(&output.transformed).unwrap();
        db.replace_table(INVERTED_INDEX_TABLE, &index.to_table())
            .unwrap();
    }

    let db = EtlDb::open_existing(&db_path).unwrap();
    let stats = db.stats().unwrap();
    assert_eq!(stats.rows_in(TRANSFORMED_TABLE), Some(4));
    assert_eq!(stats.rows_in(INVERTED_INDEX_TABLE), Some(2));
}

#[test]
fn test_index_failure_leaves_transformed_table() {
    let feed = write_feed();
    let dir = tempfile::tempdir().unwrap();
    let raw = read_file(feed.path()).unwrap();
    let output = Pipeline::new().run(&raw).unwrap();

    let mut db = EtlDb::open_or_create(&dir.path().join("database.db")).unwrap();
    db.load(TRANSFORMED_TABLE, &output.transformed).unwrap();

    let index = build_inverted_index(&output.transformed).unwrap();
    let err = db.replace_table("bad name", &index.to_table()).unwrap_err();
    assert!(matches!(err, StoreError::InvalidTableName(_)));

    assert_eq!(db.stats().unwrap().rows_in(TRANSFORMED_TABLE), Some(4));
    assert!(db.stats().unwrap().rows_in(INVERTED_INDEX_TABLE).is_none());
    assert!(output.transformed.has_column("location"));
}
