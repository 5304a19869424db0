use promptedit::adjust::{AspectRatio, Filter};
use promptedit::app::dispatcher::run_job;
use promptedit::gemini::GenerationError;
use promptedit::session::{
    batch_failure_message, EditResult, JobKind, JobOutcome, Mode, Session, SessionError,
};

mod common;
use common::{generated_image, source_image, FakeEditor};

fn single_outcome(session: &Session, color: [u8; 4]) -> JobOutcome {
    JobOutcome {
        epoch: session.epoch(),
        kind: JobKind::Single,
        results: vec![Ok(generated_image(color))],
    }
}

fn generate_single(session: &mut Session, color: [u8; 4]) -> u64 {
    session.prepare_generation("Remove background").unwrap();
    let outcome = single_outcome(session, color);
    let id = outcome.results[0].as_ref().unwrap().id;
    assert!(session.apply_outcome(outcome));
    id
}

#[test]
fn single_image_generate_pushes_history() {
    let mut session = Session::new();
    let cat = source_image("cat.png", [200, 10, 10, 255]);
    let (cat_base64, cat_mime) = (cat.base64.clone(), cat.mime);
    session.add_image(cat).unwrap();
    assert_eq!(session.mode(), Mode::Single);

    let job = session.prepare_generation("Remove background").unwrap();
    assert_eq!(job.kind, JobKind::Single);
    assert_eq!(job.requests.len(), 1);
    assert_eq!(job.requests[0].image_base64.as_str(), &*cat_base64);
    assert_eq!(job.requests[0].mime, cat_mime);
    assert_eq!(job.requests[0].prompt, "Remove background");
    assert!(session.is_loading());
    assert!(!session.can_undo());

    let outcome = single_outcome(&session, [1, 2, 3, 255]);
    let edited_id = outcome.results[0].as_ref().unwrap().id;
    assert!(session.apply_outcome(outcome));

    assert!(!session.is_loading());
    assert_eq!(session.history().len(), 1);
    assert_eq!(session.history().cursor(), 0);
    let displayed = session.displayed().unwrap();
    assert!(displayed.is_edited());
    assert_eq!(displayed.id(), edited_id);

    assert!(session.undo());
    let displayed = session.displayed().unwrap();
    assert!(!displayed.is_edited());
    assert_eq!(displayed.id(), session.images()[0].id);
}

#[test]
fn failed_single_edit_leaves_history_alone() {
    let mut session = Session::new();
    session.add_image(source_image("cat.png", [200, 10, 10, 255])).unwrap();
    generate_single(&mut session, [1, 1, 1, 255]);

    session.prepare_generation("Make it blue").unwrap();
    let outcome = JobOutcome {
        epoch: session.epoch(),
        kind: JobKind::Single,
        results: vec![Err(GenerationError::Blocked("SAFETY".into()))],
    };
    assert!(session.apply_outcome(outcome));
    assert_eq!(session.history().len(), 1);
    assert_eq!(
        session.error(),
        Some("Failed to edit image: Request was blocked: SAFETY. Please adjust your prompt.")
    );
}

#[test]
fn generating_after_undo_discards_redo_branch() {
    let mut session = Session::new();
    session.add_image(source_image("cat.png", [200, 10, 10, 255])).unwrap();
    let a = generate_single(&mut session, [1, 0, 0, 255]);
    generate_single(&mut session, [2, 0, 0, 255]);
    assert!(session.undo());
    let c = generate_single(&mut session, [3, 0, 0, 255]);

    let ids: Vec<u64> = session.history().entries().iter().map(|e| e.id).collect();
    assert_eq!(ids, vec![a, c]);
    assert_eq!(session.history().cursor(), 1);
    assert!(!session.can_redo());
}

#[test]
fn missing_prompt_or_image_is_reported() {
    let mut session = Session::new();
    let err = session.prepare_generation("Remove background").unwrap_err();
    assert_eq!(err, SessionError::MissingInput);
    assert_eq!(
        session.error(),
        Some("Please upload an image and enter an editing prompt.")
    );
    assert!(!session.is_loading());

    session.add_image(source_image("cat.png", [200, 10, 10, 255])).unwrap();
    assert_eq!(session.error(), None);
    assert_eq!(
        session.prepare_generation("   ").unwrap_err(),
        SessionError::MissingInput
    );
    assert!(!session.can_generate("  "));
    assert!(session.can_generate("Remove background"));
}

#[test]
fn collection_changes_are_refused_while_loading() {
    let mut session = Session::new();
    session.add_image(source_image("a.png", [1, 0, 0, 255])).unwrap();
    session.prepare_generation("Remove background").unwrap();

    let extra = source_image("b.png", [2, 0, 0, 255]);
    assert_eq!(session.add_image(extra.clone()).unwrap_err(), SessionError::Busy);
    assert_eq!(session.replace_image(0, extra).unwrap_err(), SessionError::Busy);
    assert_eq!(session.remove_image(0).unwrap_err(), SessionError::Busy);
    assert_eq!(session.new_session().unwrap_err(), SessionError::Busy);
    assert_eq!(
        session.prepare_generation("again").unwrap_err(),
        SessionError::Busy
    );
    assert!(!session.can_generate("again"));
}

#[test]
fn batch_failure_is_isolated_to_its_slot() {
    let mut session = Session::new();
    let a = source_image("a.png", [10, 0, 0, 255]);
    let b = source_image("b.png", [20, 0, 0, 255]);
    let c = source_image("c.png", [30, 0, 0, 255]);
    let editor = FakeEditor::new().fail_on(&b);
    for image in [a, b, c] {
        session.add_image(image).unwrap();
    }
    assert!(session.is_batch());

    let job = session.prepare_generation("Add a retro filter").unwrap();
    assert_eq!(job.kind, JobKind::Batch);
    assert_eq!(job.requests.len(), 3);
    let outcome = run_job(&editor, job);
    assert!(session.apply_outcome(outcome));

    let results = session.results();
    assert!(matches!(results[0], EditResult::Done(_)));
    assert!(matches!(results[1], EditResult::Failed(_)));
    assert!(matches!(results[2], EditResult::Done(_)));
    assert_eq!(
        session.error(),
        Some("1 of 3 images failed to edit. Successful results are still available.")
    );
    assert_eq!(session.exportable().len(), 2);
    assert_eq!(editor.calls(), 3);
}

#[test]
fn batch_without_failures_has_no_warning() {
    let mut session = Session::new();
    session.add_image(source_image("a.png", [10, 0, 0, 255])).unwrap();
    session.add_image(source_image("b.png", [20, 0, 0, 255])).unwrap();
    let editor = FakeEditor::new();
    let job = session.prepare_generation("Add a retro filter").unwrap();
    session.apply_outcome(run_job(&editor, job));
    assert_eq!(session.error(), None);
    let summary = session.batch_summary();
    assert_eq!((summary.done, summary.failed, summary.pending), (2, 0, 0));
}

#[test]
fn batch_failure_message_counts() {
    assert_eq!(
        batch_failure_message(2, 5),
        "2 of 5 images failed to edit. Successful results are still available."
    );
}

#[test]
fn regeneration_only_touches_its_slot() {
    let mut session = Session::new();
    let a = source_image("a.png", [10, 0, 0, 255]);
    let b = source_image("b.png", [20, 0, 0, 255]);
    let editor = FakeEditor::new();
    session.add_image(a).unwrap();
    session.add_image(b.clone()).unwrap();
    let job = session.prepare_generation("Make it pop").unwrap();
    session.apply_outcome(run_job(&editor, job));
    let first_id = session.results()[0].result().unwrap().id;
    let second_id = session.results()[1].result().unwrap().id;

    let job = session.prepare_regeneration(1, "Make it pop").unwrap();
    assert_eq!(job.kind, JobKind::Slot(1));
    assert_eq!(job.requests.len(), 1);
    assert_eq!(job.requests[0].image_base64, b.base64.to_string());
    session.apply_outcome(run_job(&editor, job));

    assert_eq!(session.results()[0].result().unwrap().id, first_id);
    assert_ne!(session.results()[1].result().unwrap().id, second_id);
}

#[test]
fn failed_regeneration_names_the_image() {
    let mut session = Session::new();
    let a = source_image("a.png", [10, 0, 0, 255]);
    let b = source_image("b.png", [20, 0, 0, 255]);
    let editor = FakeEditor::new().fail_on(&b);
    session.add_image(a).unwrap();
    session.add_image(b).unwrap();
    let job = session.prepare_regeneration(1, "Make it pop").unwrap();
    session.apply_outcome(run_job(&editor, job));
    assert!(session.results()[0].is_pending());
    assert!(session.results()[1].error().is_some());
    assert!(session
        .error()
        .unwrap()
        .starts_with("Failed to edit image 2: "));
}

#[test]
fn regeneration_needs_batch_mode() {
    let mut session = Session::new();
    session.add_image(source_image("a.png", [10, 0, 0, 255])).unwrap();
    assert_eq!(
        session.prepare_regeneration(0, "x").unwrap_err(),
        SessionError::NotBatch
    );
    session.add_image(source_image("b.png", [20, 0, 0, 255])).unwrap();
    assert_eq!(
        session.prepare_regeneration(5, "x").unwrap_err(),
        SessionError::NoSuchImage(5)
    );
}

#[test]
fn stale_outcome_is_discarded() {
    let mut session = Session::new();
    session.add_image(source_image("a.png", [10, 0, 0, 255])).unwrap();
    let job = session.prepare_generation("Remove background").unwrap();
    let stale = JobOutcome {
        epoch: job.epoch.wrapping_sub(1),
        kind: JobKind::Single,
        results: vec![Ok(generated_image([1, 1, 1, 255]))],
    };
    assert!(!session.apply_outcome(stale));
    assert!(session.is_loading());
    assert!(session.history().is_empty());

    assert!(session.apply_outcome(single_outcome(&session, [2, 2, 2, 255])));
    assert_eq!(session.history().len(), 1);
}

#[test]
fn first_image_resets_cosmetics_but_keeps_ratio() {
    let mut session = Session::new();
    session.adjustments.brightness = 150;
    session.adjustments.contrast = 40;
    session.adjustments.filter = Filter::Sepia;
    session.adjustments.aspect_ratio = "16:9".parse().unwrap();
    session.enhancer = Some(1);

    session.add_image(source_image("a.png", [10, 0, 0, 255])).unwrap();
    assert_eq!(session.adjustments.brightness, 100);
    assert_eq!(session.adjustments.contrast, 100);
    assert_eq!(session.adjustments.filter, Filter::None);
    assert_eq!(session.enhancer, None);
    assert_eq!(
        session.adjustments.aspect_ratio,
        AspectRatio::Ratio {
            width: 16.0,
            height: 9.0
        }
    );

    // later uploads leave the look alone
    session.adjustments.filter = Filter::Invert;
    session.add_image(source_image("b.png", [20, 0, 0, 255])).unwrap();
    assert_eq!(session.adjustments.filter, Filter::Invert);
}

#[test]
fn entering_batch_mode_keeps_the_visible_edit() {
    let mut session = Session::new();
    session.add_image(source_image("a.png", [10, 0, 0, 255])).unwrap();
    let edited = generate_single(&mut session, [5, 5, 5, 255]);

    session.add_image(source_image("b.png", [20, 0, 0, 255])).unwrap();
    assert!(session.is_batch());
    assert!(session.history().is_empty());
    assert_eq!(session.results()[0].result().unwrap().id, edited);
    assert!(session.results()[1].is_pending());
    assert!(!session.can_undo());

    // and leaving it turns the remaining result into history
    session.remove_image(1).unwrap();
    assert_eq!(session.mode(), Mode::Single);
    assert_eq!(session.history().len(), 1);
    assert_eq!(session.history().current().unwrap().id, edited);
    assert!(session.can_undo());
}

#[test]
fn replace_image_forgets_its_result() {
    let mut session = Session::new();
    let editor = FakeEditor::new();
    session.add_image(source_image("a.png", [10, 0, 0, 255])).unwrap();
    session.add_image(source_image("b.png", [20, 0, 0, 255])).unwrap();
    let job = session.prepare_generation("Make it pop").unwrap();
    session.apply_outcome(run_job(&editor, job));

    let replacement = source_image("c.png", [30, 0, 0, 255]);
    let replacement_id = replacement.id;
    session.replace_image(0, replacement).unwrap();
    assert_eq!(session.images()[0].id, replacement_id);
    assert!(session.results()[0].is_pending());
    assert!(session.results()[1].result().is_some());
    assert_eq!(
        session
            .replace_image(9, source_image("d.png", [40, 0, 0, 255]))
            .unwrap_err(),
        SessionError::NoSuchImage(9)
    );
}

#[test]
fn replacement_follows_its_target_after_removal() {
    let mut session = Session::new();
    let a = source_image("a.png", [10, 0, 0, 255]);
    let b = source_image("b.png", [20, 0, 0, 255]);
    let c = source_image("c.png", [30, 0, 0, 255]);
    let (b_id, c_id) = (b.id, c.id);
    for image in [a, b, c] {
        session.add_image(image).unwrap();
    }
    // replacement for b picked while it sits at index 1, then a is removed
    assert_eq!(session.index_of(b_id), Some(1));
    session.remove_image(0).unwrap();

    let replacement = source_image("b2.png", [40, 0, 0, 255]);
    let replacement_id = replacement.id;
    assert_eq!(session.replace_image_by_id(b_id, replacement), Ok(0));
    let ids: Vec<_> = session.images().iter().map(|image| image.id).collect();
    assert_eq!(ids, vec![replacement_id, c_id]);
}

#[test]
fn replacement_for_removed_image_is_dropped() {
    let mut session = Session::new();
    let a = source_image("a.png", [10, 0, 0, 255]);
    let b = source_image("b.png", [20, 0, 0, 255]);
    let (a_id, b_id) = (a.id, b.id);
    session.add_image(a).unwrap();
    session.add_image(b).unwrap();
    session.remove_image(1).unwrap();
    let epoch = session.epoch();

    assert_eq!(
        session.replace_image_by_id(b_id, source_image("b2.png", [40, 0, 0, 255])),
        Err(SessionError::ImageRemoved)
    );
    assert_eq!(session.images().len(), 1);
    assert_eq!(session.images()[0].id, a_id);
    assert_eq!(session.epoch(), epoch);
}

#[test]
fn collection_changes_bump_the_epoch() {
    let mut session = Session::new();
    let start = session.epoch();
    session.add_image(source_image("a.png", [10, 0, 0, 255])).unwrap();
    session.add_image(source_image("b.png", [20, 0, 0, 255])).unwrap();
    session.remove_image(0).unwrap();
    session.new_session().unwrap();
    assert_eq!(session.epoch(), start + 4);
}

#[test]
fn new_session_drops_everything() {
    let mut session = Session::new();
    session.add_image(source_image("a.png", [10, 0, 0, 255])).unwrap();
    generate_single(&mut session, [5, 5, 5, 255]);
    session.new_session().unwrap();
    assert_eq!(session.mode(), Mode::Empty);
    assert!(session.displayed().is_none());
    assert!(session.history().is_empty());
    assert!(session.exportable().is_empty());
    assert!(session.live_image_ids().is_empty());
}

#[test]
fn enhancer_suffix_reaches_the_editor() {
    let mut session = Session::new();
    let editor = FakeEditor::new();
    session.add_image(source_image("a.png", [10, 0, 0, 255])).unwrap();
    session.enhancer = Some(0);
    let job = session.prepare_generation("  Remove background  ").unwrap();
    session.apply_outcome(run_job(&editor, job));
    assert_eq!(
        editor.prompts(),
        vec!["Remove background Keep the result photorealistic with natural textures.".to_string()]
    );
}

#[test]
fn selection_follows_batch_images() {
    let mut session = Session::new();
    session.add_image(source_image("a.png", [10, 0, 0, 255])).unwrap();
    let b = source_image("b.png", [20, 0, 0, 255]);
    let b_id = b.id;
    session.add_image(b).unwrap();
    assert!(session.select(1));
    assert!(!session.select(2));
    assert_eq!(session.displayed().unwrap().id(), b_id);
    session.remove_image(1).unwrap();
    assert_eq!(session.selected(), 0);
}

#[test]
fn live_ids_cover_sources_and_results() {
    let mut session = Session::new();
    let a = source_image("a.png", [10, 0, 0, 255]);
    let a_id = a.id;
    session.add_image(a).unwrap();
    let edited = generate_single(&mut session, [5, 5, 5, 255]);
    let live = session.live_image_ids();
    assert!(live.contains(&a_id));
    assert!(live.contains(&edited));
}

#[test]
fn aborted_generation_releases_the_session() {
    let mut session = Session::new();
    session.add_image(source_image("a.png", [10, 0, 0, 255])).unwrap();
    session.prepare_generation("Remove background").unwrap();
    session.abort_generation("Failed to edit image: worker gone");
    assert!(!session.is_loading());
    assert_eq!(session.error(), Some("Failed to edit image: worker gone"));
}
