use std::sync::Mutex;

use async_trait::async_trait;
use chrono::{DateTime, Duration, TimeZone, Utc};
use notewa_core::{
    DispatchOutcome, DispatchReceipt, Dispatcher, NoteCheck, ReminderError, ReminderService, SkipReason,
};
use notewa_gateway::DryRunDispatcher;
use notewa_store::{FileStore, NewNote, NoteUpdate};

#[derive(Default)]
struct RecordingGateway {
    sent_to: Mutex<Vec<String>>,
}

#[async_trait]
impl Dispatcher for RecordingGateway {
    async fn dispatch(&self, phone: &str, _message: &str) -> Result<DispatchReceipt, ReminderError> {
        self.sent_to.lock().unwrap().push(phone.to_string());
        Ok(DispatchReceipt::default())
    }
}

fn now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 10, 18, 9, 30, 0).unwrap()
}

fn note(title: &str, hours: i64) -> NewNote {
    NewNote {
        title: title.to_string(),
        content: None,
        deadline: Some(now() + Duration::hours(hours)),
    }
}

#[tokio::test]
async fn repeated_sweeps_remind_once() {
    let dir = tempfile::tempdir().unwrap();
    let store = FileStore::open(dir.path()).unwrap();
    let sari = store.register_user("sari", "081234567890", now()).unwrap();
    let budi = store.register_user("budi", "+6281398765432", now()).unwrap();
    store.create_note(&sari.id, note("Laporan", 2), now()).unwrap();
    store.create_note(&budi.id, note("Bayar kos", 20), now()).unwrap();
    store.create_note(&budi.id, note("Liburan", 72), now()).unwrap();

    let service = ReminderService::new(store, RecordingGateway::default());

    let first = service.run_scheduled(now()).await.unwrap();
    assert_eq!(first.processed, 2);
    assert_eq!(first.sent(), 2);
    let mut phones = service.dispatcher().sent_to.lock().unwrap().clone();
    phones.sort();
    assert_eq!(phones, vec!["6281234567890".to_string(), "6281398765432".to_string()]);

    let second = service.run_scheduled(now() + Duration::minutes(30)).await.unwrap();
    assert_eq!(second.processed, 2);
    assert_eq!(second.sent(), 0);
    assert!(second
        .outcomes
        .iter()
        .all(|o| matches!(o, DispatchOutcome::Skipped { reason: SkipReason::AlreadyReminded, .. })));
}

#[tokio::test]
async fn dry_run_does_not_use_up_the_reminder() {
    let dir = tempfile::tempdir().unwrap();
    let store = FileStore::open(dir.path()).unwrap();
    let u = store.register_user("sari", "081234567890", now()).unwrap();
    let n = store.create_note(&u.id, note("Laporan", 2), now()).unwrap();

    let preview = ReminderService::new(store, DryRunDispatcher).run_scheduled(now()).await.unwrap();
    assert_eq!(preview.sent(), 1);

    let store = FileStore::open(dir.path()).unwrap();
    assert_eq!(store.list_notes(&u.id).unwrap()[0].reminder_sent_at, None);

    let service = ReminderService::new(store, RecordingGateway::default());
    let real = service.run_scheduled(now() + Duration::minutes(5)).await.unwrap();
    assert_eq!(
        real.outcomes,
        vec![DispatchOutcome::Sent {
            note_id: n.id.clone(),
            phone_number: "6281234567890".into(),
            hours_diff: 2,
        }]
    );
    assert_eq!(*service.dispatcher().sent_to.lock().unwrap(), vec!["6281234567890".to_string()]);
}

#[tokio::test]
async fn edit_after_reminder_allows_a_new_one() {
    let dir = tempfile::tempdir().unwrap();
    let store = FileStore::open(dir.path()).unwrap();
    let u = store.register_user("sari", "081234567890", now()).unwrap();
    let n = store.create_note(&u.id, note("Laporan", 2), now()).unwrap();

    let gateway = RecordingGateway::default();
    let service = ReminderService::new(store, gateway);

    let report = service.check_note(NoteCheck::new(&n.id, &u.id), now()).await.unwrap();
    assert_eq!(report.sent(), 1);

    service
        .source()
        .update_note(
            &n.id,
            &u.id,
            NoteUpdate {
                deadline: Some(Some(now() + Duration::hours(4))),
                ..NoteUpdate::default()
            },
            now(),
        )
        .unwrap();

    let report = service.check_note(NoteCheck::new(&n.id, &u.id), now()).await.unwrap();
    assert_eq!(
        report.outcomes,
        vec![DispatchOutcome::Sent {
            note_id: n.id.clone(),
            phone_number: "6281234567890".into(),
            hours_diff: 4,
        }]
    );
}

#[tokio::test]
async fn completed_note_check_is_skipped() {
    let dir = tempfile::tempdir().unwrap();
    let store = FileStore::open(dir.path()).unwrap();
    let u = store.register_user("sari", "081234567890", now()).unwrap();
    let n = store.create_note(&u.id, note("Laporan", 2), now()).unwrap();
    store.set_completed(&n.id, &u.id, true, now()).unwrap();

    let service = ReminderService::new(store, RecordingGateway::default());
    let report = service.check_note(NoteCheck::new(&n.id, &u.id), now()).await.unwrap();

    assert_eq!(
        report.outcomes,
        vec![DispatchOutcome::Skipped {
            note_id: n.id,
            reason: SkipReason::Completed
        }]
    );
}

#[tokio::test]
async fn unknown_note_is_reported() {
    let dir = tempfile::tempdir().unwrap();
    let store = FileStore::open(dir.path()).unwrap();
    let service = ReminderService::new(store, RecordingGateway::default());

    let err = service
        .check_note(NoteCheck::new("note-999999", "user-000001"), now())
        .await
        .unwrap_err();
    assert_eq!(err, ReminderError::NoteNotFound("note-999999".into()));
}
