//! Restore pipeline against the in-memory store

use chrono::NaiveDate;
use peak_import::export::ExportReader;
use peak_import::record_types::RecordTypeMap;
use peak_import::sink::{MemoryRecordSink, MemoryStore, RecordSink};
use peak_import::students::StudentRow;
use peak_import::{ImportProfile, MatchBy, MissingDatePolicy, ReconcileOptions, Reconciler, StudentIndex};

const ACADEMY: i64 = 2;

const EXPORT: &str = "\
name,gender,created_at,jump_cm,medball_m,run20m_sec,sit_reach_cm,run10m_sec,situp_count,back_strength
김철수,남,2025-05-04 23:47:00,150,NULL,3.9,12,,40,F
이영희,여,2025-05-04 09:10:00,171,6.5,,,2.1,,
이영희,여,,168,,,,,,
김철수,여,2025-05-04 23:47:00,999,,,,,,
";

fn reconciler() -> Reconciler {
    let students = vec![
        StudentRow {
            id: 11,
            name: "김철수".to_string(),
            gender: Some("M".to_string()),
        },
        StudentRow {
            id: 12,
            name: "이영희".to_string(),
            gender: Some("F".to_string()),
        },
    ];
    let profile = ImportProfile::default();
    let options = ReconcileOptions {
        exclusions: profile.exclude_names.clone(),
        gender_map: profile.gender_map(),
        date_policy: MissingDatePolicy::Today,
        academy_id: Some(ACADEMY),
    };

    Reconciler::new(StudentIndex::build(students, MatchBy::NameAndGender), options)
        .with_today(NaiveDate::from_ymd_opt(2026, 3, 1).unwrap())
}

async fn restore(store: &mut MemoryStore) -> usize {
    let reconciler = reconciler();
    let mut export =
        ExportReader::from_reader(EXPORT.as_bytes(), &RecordTypeMap::default(), true).unwrap();
    let mut sink = MemoryRecordSink::replacing(store, ACADEMY);
    let report = reconciler.run(&mut export, &mut sink).await.unwrap();
    sink.finish().await.unwrap();

    assert_eq!(report.unmatched.len(), 1);
    assert_eq!(report.defaulted_dates, 1);
    report.records_emitted
}

#[tokio::test]
async fn test_restore_is_idempotent() {
    let mut store = MemoryStore::new();

    let emitted = restore(&mut store).await;
    assert_eq!(emitted, 8);
    let first = store.clone();

    restore(&mut store).await;
    assert_eq!(store, first);
    assert_eq!(store.count_scope(ACADEMY), 8);
}

#[tokio::test]
async fn test_restore_keeps_other_academies() {
    let mut store = MemoryStore::new();
    {
        let options = ReconcileOptions {
            exclusions: Default::default(),
            gender_map: ImportProfile::default().gender_map(),
            date_policy: MissingDatePolicy::SkipRow,
            academy_id: Some(1),
        };
        let index = StudentIndex::build(
            vec![StudentRow {
                id: 99,
                name: "최다은".to_string(),
                gender: Some("F".to_string()),
            }],
            MatchBy::NameAndGender,
        );
        let mut export = ExportReader::from_reader(
            "name,gender,created_at,jump_cm\n최다은,여,2025-04-01,180\n".as_bytes(),
            &RecordTypeMap::default(),
            true,
        )
        .unwrap();
        let mut sink = MemoryRecordSink::replacing(&mut store, 1);
        Reconciler::new(index, options)
            .run(&mut export, &mut sink)
            .await
            .unwrap();
        sink.finish().await.unwrap();
    }

    restore(&mut store).await;
    assert_eq!(store.count_scope(1), 1);
    assert_eq!(store.count_scope(ACADEMY), 8);
}

#[tokio::test]
async fn test_restore_drops_stale_records() {
    let mut store = MemoryStore::new();
    restore(&mut store).await;

    let mut export = ExportReader::from_reader(
        "name,gender,created_at,jump_cm\n김철수,남,2025-06-01,155\n".as_bytes(),
        &RecordTypeMap::default(),
        true,
    )
    .unwrap();
    let mut sink = MemoryRecordSink::replacing(&mut store, ACADEMY);
    reconciler().run(&mut export, &mut sink).await.unwrap();
    sink.finish().await.unwrap();
    assert_eq!(sink.deleted(), 8);
    drop(sink);

    let values: Vec<f64> = store.records().values().copied().collect();
    assert_eq!(values, vec![155.0]);
}
