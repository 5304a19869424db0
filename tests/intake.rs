use promptedit::app::intake::{accepts_file, Intake, IntakeEvent, IntakeRequest, IntakeSource};
use promptedit::image_utils::{IntakeError, MimeType};
use std::path::Path;
use std::{thread, time::Duration};
use tempfile::tempdir;

mod common;
use common::{png_bytes, solid_image, write_image};

fn wait_for_events(intake: &mut Intake, expected: usize) -> Vec<IntakeEvent> {
    let mut events = Vec::new();
    for _ in 0..200 {
        events.extend(intake.poll());
        if events.len() >= expected {
            break;
        }
        thread::sleep(Duration::from_millis(10));
    }
    events
}

#[test]
fn intake_decodes_files_from_disk() {
    let tmp = tempdir().unwrap();
    let img_path = tmp.path().join("sample.png");
    write_image(&img_path, &solid_image(4, 4, [10, 20, 30, 255]));

    let mut intake = Intake::new();
    intake.submit(IntakeRequest::add(IntakeSource::Path(img_path)));
    assert!(intake.is_busy());

    let events = wait_for_events(&mut intake, 1);
    assert!(!intake.is_busy());
    match &events[..] {
        [IntakeEvent::Loaded(loaded)] => {
            assert_eq!(loaded.source.name, "sample.png");
            assert_eq!(loaded.source.mime, MimeType::Png);
            assert_eq!(loaded.preview.size, [4, 4]);
            assert_eq!(loaded.replace, None);
        }
        _ => panic!("expected one loaded image"),
    }
}

#[test]
fn intake_keeps_submission_order_and_replacement_target() {
    let mut intake = Intake::new();
    for (i, color) in [[1, 0, 0, 255], [2, 0, 0, 255]].into_iter().enumerate() {
        intake.submit(IntakeRequest::replace(
            IntakeSource::Bytes {
                name: format!("{i}.png"),
                bytes: png_bytes(&solid_image(2, 2, color)),
            },
            100 + i as u64,
        ));
    }
    let events = wait_for_events(&mut intake, 2);
    let names: Vec<_> = events
        .iter()
        .map(|event| match event {
            IntakeEvent::Loaded(loaded) => (loaded.source.name.clone(), loaded.replace),
            IntakeEvent::Failed { name, .. } => panic!("{name} failed"),
        })
        .collect();
    assert_eq!(
        names,
        vec![("0.png".to_string(), Some(100)), ("1.png".to_string(), Some(101))]
    );
}

#[test]
fn intake_reports_undecodable_bytes() {
    let mut intake = Intake::new();
    intake.submit(IntakeRequest::add(IntakeSource::Bytes {
        name: "fake.png".into(),
        bytes: b"definitely not a png".to_vec(),
    }));
    let events = wait_for_events(&mut intake, 1);
    assert!(matches!(
        &events[..],
        [IntakeEvent::Failed {
            error: IntakeError::Unsupported,
            ..
        }]
    ));
}

#[test]
fn intake_reports_missing_files() {
    let mut intake = Intake::new();
    intake.submit(IntakeRequest::add(IntakeSource::Path(
        "/does/not/exist.png".into(),
    )));
    let events = wait_for_events(&mut intake, 1);
    match &events[..] {
        [IntakeEvent::Failed { name, error }] => {
            assert_eq!(name, "exist.png");
            assert!(matches!(error, IntakeError::Io { .. }));
        }
        _ => panic!("expected a failure"),
    }
}

#[test]
fn accepts_file_prefers_declared_mime() {
    assert!(accepts_file("photo.png", "image/png", None));
    assert!(accepts_file("clipboard", "image/webp", None));
    assert!(!accepts_file("photo.png", "text/plain", None));
    assert!(accepts_file("photo.JPG", "", None));
    assert!(!accepts_file("notes.txt", "", None));
    assert!(accepts_file("ignored", "", Some(Path::new("/tmp/a.webp"))));
}
