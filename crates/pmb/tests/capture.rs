mod common;

use std::fs;

use pmb::{
    ArtifactKind, Capture, CaptureContext, CaptureEngine, CaptureWindow, Codec, CollaboratorError,
    DatabaseScope, IgnoreStore, PmbError, RangeBoundary, SegmentId,
};

use common::{BrokenSigner, FakeDb, Fixture, XorSigner, at};

fn ctx(hour: i8, minute: i8) -> CaptureContext {
    CaptureContext {
        now: at(hour, minute),
        scope: DatabaseScope::Named("app".into()),
    }
}

fn boundary(fixture: &Fixture, db: &FakeDb) -> RangeBoundary {
    let signer = XorSigner;
    CaptureEngine::new(&fixture.config, db, fixture.pipeline(&signer))
        .tracker()
        .current_boundary()
        .unwrap()
}

fn plaintext(fixture: &Fixture, file_name: &str) -> String {
    let out = fixture.dir.path().join("decoded.sql");
    let signer = XorSigner;
    fixture
        .pipeline(&signer)
        .decode(
            Codec::Zstd,
            &fixture.backup_dir().join(file_name),
            &out,
        )
        .unwrap();
    fs::read_to_string(out).unwrap()
}

#[test]
fn full_then_incremental_captures_every_new_segment_once() {
    let fixture = Fixture::new();
    fixture.segments(1..=10);
    let db = FakeDb::new(&fixture);
    let signer = XorSigner;
    let engine = CaptureEngine::new(&fixture.config, &db, fixture.pipeline(&signer));

    let full = engine.full(&ctx(2, 0)).unwrap();
    let Capture::Full { artifact, before } = full else {
        panic!("expected a full capture, got {full:?}");
    };
    assert_eq!(before, SegmentId(10));
    assert_eq!(artifact.file_name(), "pmb_full_20240301_0200.sql.zst");
    assert_eq!(
        engine.tracker().current_boundary().unwrap(),
        RangeBoundary {
            before: Some(SegmentId(10)),
            last: None
        }
    );

    // The dump opened 000011; the server keeps writing.
    for seq in 11..=14 {
        fixture.segment(seq, &format!("insert {seq}\n"));
    }

    let inc = engine.incremental(&ctx(2, 30)).unwrap();
    let Capture::Incremental {
        artifact,
        window,
        segments,
    } = inc
    else {
        panic!("expected an incremental capture, got {inc:?}");
    };
    assert_eq!(
        window,
        CaptureWindow {
            first: SegmentId(11),
            last: SegmentId(14)
        }
    );
    assert_eq!(segments, (11..=14).map(SegmentId).collect::<Vec<_>>());
    assert_eq!(artifact.name.kind, ArtifactKind::Incremental);

    let boundary = engine.tracker().current_boundary().unwrap();
    assert_eq!(boundary.before, Some(SegmentId(14)));
    assert_eq!(boundary.last, None);
    assert_eq!(
        boundary.window_to(SegmentId(15)).map(|w| w.first),
        Some(SegmentId(15))
    );

    let text = plaintext(&fixture, &artifact.file_name());
    assert!(text.starts_with("-- export of database app\n"));
    let positions: Vec<usize> = (11..=14)
        .map(|seq| text.find(&format!("insert {seq}")).unwrap())
        .collect();
    assert!(positions.windows(2).all(|p| p[0] < p[1]));

    assert_eq!(
        fixture.backup_files(),
        vec![
            "pmb_full_20240301_0200.sql.zst",
            "pmb_full_20240301_0200.sql.zst.b3",
            "pmb_inc_20240301_0230.sql.zst",
            "pmb_inc_20240301_0230.sql.zst.b3",
        ]
    );
    assert_eq!(fixture.work_entries(), 0);
}

#[test]
fn consecutive_incrementals_do_not_overlap() {
    let fixture = Fixture::new();
    fixture.segments(1..=3);
    let db = FakeDb::new(&fixture);
    let signer = XorSigner;
    let engine = CaptureEngine::new(&fixture.config, &db, fixture.pipeline(&signer));

    engine.full(&ctx(1, 0)).unwrap();
    fixture.segment(4, "a\n");
    let first = engine.incremental(&ctx(1, 15)).unwrap();
    fixture.segment(5, "b\n");
    let second = engine.incremental(&ctx(1, 30)).unwrap();

    let (Capture::Incremental { segments: a, .. }, Capture::Incremental { segments: b, .. }) =
        (first, second)
    else {
        panic!("expected two incremental captures");
    };
    assert_eq!(a, vec![SegmentId(4)]);
    assert_eq!(b, vec![SegmentId(5)]);
}

#[test]
fn second_full_on_the_same_day_changes_nothing() {
    let fixture = Fixture::new();
    fixture.segments(1..=10);
    let db = FakeDb::new(&fixture);
    let signer = XorSigner;
    let engine = CaptureEngine::new(&fixture.config, &db, fixture.pipeline(&signer));

    engine.full(&ctx(2, 0)).unwrap();
    let files = fixture.backup_files();
    let record = fs::read_to_string(fixture.config.boundary_path()).unwrap();

    let err = engine.full(&ctx(5, 0)).unwrap_err();
    assert!(matches!(err, PmbError::Precondition(_)), "{err:?}");
    assert_eq!(fixture.backup_files(), files);
    assert_eq!(
        fs::read_to_string(fixture.config.boundary_path()).unwrap(),
        record
    );
    assert_eq!(db.count("dump"), 1);
}

#[test]
fn first_full_creates_the_backup_directory() {
    let fixture = Fixture::new();
    fs::remove_dir(fixture.backup_dir()).unwrap();
    fixture.segments(1..=3);
    let db = FakeDb::new(&fixture);
    let signer = XorSigner;
    let engine = CaptureEngine::new(&fixture.config, &db, fixture.pipeline(&signer));

    let capture = engine.full(&ctx(2, 0)).unwrap();
    assert!(matches!(capture, Capture::Full { before: SegmentId(3), .. }), "{capture:?}");
    assert_eq!(
        fixture.backup_files(),
        vec![
            "pmb_full_20240301_0200.sql.zst",
            "pmb_full_20240301_0200.sql.zst.b3"
        ]
    );
}

#[test]
fn full_needs_a_log_segment() {
    let fixture = Fixture::new();
    let db = FakeDb::new(&fixture);
    let signer = XorSigner;
    let engine = CaptureEngine::new(&fixture.config, &db, fixture.pipeline(&signer));

    let err = engine.full(&ctx(2, 0)).unwrap_err();
    assert!(matches!(err, PmbError::Precondition(_)), "{err:?}");
    assert_eq!(db.count("dump"), 0);
    assert!(fixture.backup_files().is_empty());
}

#[test]
fn incremental_requires_a_full_from_today() {
    let fixture = Fixture::new();
    fixture.segments(1..=3);
    let db = FakeDb::new(&fixture);
    let signer = XorSigner;
    let engine = CaptureEngine::new(&fixture.config, &db, fixture.pipeline(&signer));

    let err = engine.incremental(&ctx(2, 0)).unwrap_err();
    assert!(matches!(err, PmbError::Precondition(_)), "{err:?}");
    assert_eq!(db.count("flush"), 0);
    assert!(fixture.backup_files().is_empty());
    assert_eq!(boundary(&fixture, &db), RangeBoundary::default());
}

#[test]
fn full_from_yesterday_does_not_count() {
    let fixture = Fixture::new();
    fixture.segments(1..=3);
    let db = FakeDb::new(&fixture);
    let signer = XorSigner;
    let engine = CaptureEngine::new(&fixture.config, &db, fixture.pipeline(&signer));

    engine
        .full(&CaptureContext {
            now: jiff::civil::date(2024, 2, 29).at(23, 0, 0, 0),
            scope: DatabaseScope::All,
        })
        .unwrap();
    let err = engine.incremental(&ctx(0, 30)).unwrap_err();
    assert!(matches!(err, PmbError::Precondition(_)), "{err:?}");
}

#[test]
fn empty_window_still_rotates_and_leaves_the_boundary() {
    let fixture = Fixture::new();
    fixture.segments(1..=10);
    let db = FakeDb::new(&fixture);
    db.rotate.set(false);
    let signer = XorSigner;
    let engine = CaptureEngine::new(&fixture.config, &db, fixture.pipeline(&signer));

    engine.full(&ctx(2, 0)).unwrap();
    fixture.segment(11, "late\n");
    let first = engine.incremental(&ctx(2, 10)).unwrap();
    assert!(matches!(first, Capture::Incremental { .. }), "{first:?}");
    let before = engine.tracker().current_boundary().unwrap();
    let files = fixture.backup_files();

    let second = engine.incremental(&ctx(2, 20)).unwrap();
    assert!(
        matches!(second, Capture::Empty { window } if window.is_empty()),
        "{second:?}"
    );
    assert_eq!(engine.tracker().current_boundary().unwrap(), before);
    assert_eq!(fixture.backup_files(), files);
    assert_eq!(db.count("flush"), 2);
    assert_eq!(db.count("export"), 1);
}

#[test]
fn segments_replayed_by_a_restore_are_skipped() {
    let fixture = Fixture::new();
    fixture.segments(1..=10);
    let db = FakeDb::new(&fixture);
    let signer = XorSigner;
    let engine = CaptureEngine::new(&fixture.config, &db, fixture.pipeline(&signer));
    engine.full(&ctx(2, 0)).unwrap();

    fixture.segment(11, "replayed\n");
    fixture.segment(12, "replayed\n");
    fixture.segment(13, "fresh\n");
    let ignore = IgnoreStore::new(fixture.config.ignore_path(), common::BASE);
    ignore
        .save(&[SegmentId(11), SegmentId(12)].into_iter().collect())
        .unwrap();

    let capture = engine.incremental(&ctx(3, 0)).unwrap();
    let Capture::Incremental {
        artifact,
        window,
        segments,
    } = capture
    else {
        panic!("expected an incremental capture, got {capture:?}");
    };
    assert_eq!(window.first, SegmentId(11));
    assert_eq!(window.last, SegmentId(13));
    assert_eq!(segments, vec![SegmentId(13)]);

    let text = plaintext(&fixture, &artifact.file_name());
    assert!(text.contains("fresh"));
    assert!(!text.contains("replayed"));

    assert!(!fixture.config.ignore_path().exists());
    assert_eq!(
        engine.tracker().current_boundary().unwrap().before,
        Some(SegmentId(13))
    );
}

#[test]
fn fully_ignored_window_rolls_forward_without_an_artifact() {
    let fixture = Fixture::new();
    fixture.segments(1..=10);
    let db = FakeDb::new(&fixture);
    let signer = XorSigner;
    let engine = CaptureEngine::new(&fixture.config, &db, fixture.pipeline(&signer));
    engine.full(&ctx(2, 0)).unwrap();

    let ignore = IgnoreStore::new(fixture.config.ignore_path(), common::BASE);
    ignore.save(&[SegmentId(11)].into_iter().collect()).unwrap();
    let files = fixture.backup_files();

    let capture = engine.incremental(&ctx(3, 0)).unwrap();
    assert!(matches!(capture, Capture::Ignored { .. }), "{capture:?}");
    assert_eq!(fixture.backup_files(), files);
    assert_eq!(db.count("export"), 0);
    assert!(ignore.load().unwrap().is_empty());
    assert_eq!(
        engine.tracker().current_boundary().unwrap().before,
        Some(SegmentId(11))
    );
}

#[test]
fn failed_dump_leaves_no_artifact_or_plaintext() {
    let fixture = Fixture::new();
    fixture.segments(1..=4);
    let db = FakeDb::new(&fixture);
    db.fail_dump.set(true);
    let signer = XorSigner;
    let engine = CaptureEngine::new(&fixture.config, &db, fixture.pipeline(&signer));

    let err = engine.full(&ctx(2, 0)).unwrap_err();
    assert!(
        matches!(err, PmbError::Collaborator(CollaboratorError::Diagnostic { .. })),
        "{err:?}"
    );
    assert!(fixture.backup_files().is_empty());
}

#[test]
fn encryption_failure_keeps_the_window_for_the_next_run() {
    let fixture = Fixture::with_encryption(true);
    fixture.segments(1..=10);
    let db = FakeDb::new(&fixture);
    let good = XorSigner;
    CaptureEngine::new(&fixture.config, &db, fixture.pipeline(&good))
        .full(&ctx(2, 0))
        .unwrap();
    let files = fixture.backup_files();
    assert_eq!(
        files,
        vec![
            "pmb_full_20240301_0200.sql.enc",
            "pmb_full_20240301_0200.sql.enc.b3"
        ]
    );

    let broken = BrokenSigner;
    let failing = CaptureEngine::new(&fixture.config, &db, fixture.pipeline(&broken));
    let err = failing.incremental(&ctx(2, 30)).unwrap_err();
    assert!(
        matches!(err, PmbError::Collaborator(CollaboratorError::Diagnostic { .. })),
        "{err:?}"
    );
    assert_eq!(fixture.backup_files(), files);
    assert_eq!(fixture.work_entries(), 0);
    assert_eq!(
        failing.tracker().current_boundary().unwrap().before,
        Some(SegmentId(10))
    );

    let retry = CaptureEngine::new(&fixture.config, &db, fixture.pipeline(&good))
        .incremental(&ctx(2, 45))
        .unwrap();
    let Capture::Incremental { window, .. } = retry else {
        panic!("expected an incremental capture, got {retry:?}");
    };
    assert_eq!(window.first, SegmentId(11));
}

#[test]
fn incremental_in_the_same_minute_is_refused_before_rotating() {
    let fixture = Fixture::new();
    fixture.segments(1..=3);
    let db = FakeDb::new(&fixture);
    let signer = XorSigner;
    let engine = CaptureEngine::new(&fixture.config, &db, fixture.pipeline(&signer));
    engine.full(&ctx(2, 0)).unwrap();
    engine.incremental(&ctx(2, 30)).unwrap();
    let flushes = db.count("flush");

    let err = engine.incremental(&ctx(2, 30)).unwrap_err();
    assert!(matches!(err, PmbError::Precondition(_)), "{err:?}");
    assert_eq!(db.count("flush"), flushes);
}

#[test]
fn all_databases_scope_reaches_the_tools() {
    let fixture = Fixture::new();
    fixture.segments(1..=3);
    let db = FakeDb::new(&fixture);
    let signer = XorSigner;
    let engine = CaptureEngine::new(&fixture.config, &db, fixture.pipeline(&signer));
    let all = |minute| CaptureContext {
        now: at(4, minute),
        scope: DatabaseScope::All,
    };

    let Capture::Full { artifact, .. } = engine.full(&all(0)).unwrap() else {
        panic!("expected a full capture");
    };
    assert!(plaintext(&fixture, &artifact.file_name()).contains("all databases"));
}
