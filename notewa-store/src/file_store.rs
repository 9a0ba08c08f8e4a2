//! JSON-file persistence: `store.json` for users and notes, `history.jsonl`
//! as an append-only activity log.

use anyhow::{bail, Context, Result};
use chrono::{DateTime, Utc};
use notewa_core::{normalize, ReminderCandidate};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fs::{self, OpenOptions};
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};
use fs4::fs_std::FileExt;
use tracing::warn;

use crate::model::{HistoryAction, NewNote, Note, NoteHistory, NoteUpdate, User};

pub const DEFAULT_HISTORY_LIMIT: usize = 50;

#[derive(Debug, Default, Serialize, Deserialize)]
struct StoreData {
    #[serde(default)]
    next_id: u64,
    #[serde(default)]
    users: Vec<User>,
    #[serde(default)]
    notes: Vec<Note>,
}

impl StoreData {
    fn allocate_id(&mut self, prefix: &str) -> String {
        self.next_id += 1;
        format!("{prefix}-{:06}", self.next_id)
    }

    fn owned_note_mut(&mut self, id: &str, user_id: &str) -> Result<&mut Note> {
        self.notes
            .iter_mut()
            .find(|n| n.id == id && n.user_id == user_id)
            .ok_or_else(|| anyhow::anyhow!("Note not found or access denied: {id}"))
    }

    fn candidate(&self, note: &Note) -> ReminderCandidate {
        let phone = self
            .users
            .iter()
            .find(|u| u.id == note.user_id)
            .map(|u| u.phone_number.clone());
        ReminderCandidate {
            note_id: note.id.clone(),
            title: note.title.clone(),
            deadline: note.deadline,
            phone_number: phone,
            is_completed: note.is_completed,
            reminder_sent_at: note.reminder_sent_at,
        }
    }
}

/// Handle on a store directory. Any number of handles, in this or other
/// processes, may share a root: every load-modify-save cycle holds an
/// exclusive lock on `store.lock`.
pub struct FileStore {
    root: PathBuf,
}

impl FileStore {
    pub fn open(root: impl Into<PathBuf>) -> Result<Self> {
        let root = root.into();
        fs::create_dir_all(&root).with_context(|| format!("create {}", root.display()))?;
        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn data_path(&self) -> PathBuf {
        self.root.join("store.json")
    }

    fn history_path(&self) -> PathBuf {
        self.root.join("history.jsonl")
    }

    /// Lock held until the returned file is dropped.
    fn lock(&self, exclusive: bool) -> Result<fs::File> {
        let p = self.root.join("store.lock");
        let f = OpenOptions::new()
            .create(true)
            .truncate(false)
            .write(true)
            .open(&p)
            .with_context(|| format!("open {}", p.display()))?;
        let locked = if exclusive {
            FileExt::lock_exclusive(&f)
        } else {
            FileExt::lock_shared(&f)
        };
        locked.with_context(|| format!("lock {}", p.display()))?;
        Ok(f)
    }

    fn load(&self) -> Result<StoreData> {
        let p = self.data_path();
        if !p.exists() {
            return Ok(StoreData::default());
        }
        let s = fs::read_to_string(&p).with_context(|| format!("read {}", p.display()))?;
        serde_json::from_str(&s).with_context(|| format!("parse {}", p.display()))
    }

    fn save(&self, data: &StoreData) -> Result<()> {
        let p = self.data_path();
        let tmp = p.with_extension("json.tmp");
        let json = serde_json::to_string_pretty(data)?;
        fs::write(&tmp, json).with_context(|| format!("write {}", tmp.display()))?;
        fs::rename(&tmp, &p).with_context(|| format!("replace {}", p.display()))?;
        Ok(())
    }

    fn with_data<T>(&self, f: impl FnOnce(&mut StoreData) -> Result<T>) -> Result<T> {
        let _guard = self.lock(true)?;
        let mut data = self.load()?;
        let out = f(&mut data)?;
        self.save(&data)?;
        Ok(out)
    }

    fn read_data<T>(&self, f: impl FnOnce(&StoreData) -> T) -> Result<T> {
        let _guard = self.lock(false)?;
        Ok(f(&self.load()?))
    }

    // History is best-effort: a failed append never undoes the note change.
    fn record_history(&self, id: String, note: &Note, action: HistoryAction, details: String, now: DateTime<Utc>) {
        let entry = NoteHistory {
            id,
            note_id: note.id.clone(),
            user_id: note.user_id.clone(),
            action,
            action_details: Some(details),
            created_at: now,
        };
        let res = (|| -> Result<()> {
            let p = self.history_path();
            let mut f = OpenOptions::new().create(true).append(true).open(&p)?;
            writeln!(f, "{}", serde_json::to_string(&entry)?)?;
            Ok(())
        })();
        if let Err(e) = res {
            warn!(note_id = %note.id, error = %e, "failed to record history");
        }
    }

    pub fn register_user(&self, username: &str, phone_number: &str, now: DateTime<Utc>) -> Result<User> {
        let username = username.trim();
        let phone_number = phone_number.trim();
        if username.is_empty() {
            bail!("Username must not be empty");
        }
        let phone_re = Regex::new(r"^\+?[0-9]{10,15}$")?;
        if !phone_re.is_match(phone_number) {
            bail!("Invalid phone number (expected 10-15 digits, optional leading +): {phone_number}");
        }
        normalize(phone_number)?;

        self.with_data(|data| {
            if data.users.iter().any(|u| u.username == username) {
                bail!("Username already taken");
            }
            let user = User {
                id: data.allocate_id("user"),
                username: username.to_string(),
                phone_number: phone_number.to_string(),
                created_at: now,
                updated_at: now,
            };
            data.users.push(user.clone());
            Ok(user)
        })
    }

    /// Plaintext username lookup.
    pub fn login(&self, username: &str) -> Result<User> {
        let username = username.trim();
        self.read_data(|data| data.users.iter().find(|u| u.username == username).cloned())?
            .ok_or_else(|| anyhow::anyhow!("User not found"))
    }

    pub fn user(&self, id: &str) -> Result<Option<User>> {
        self.read_data(|data| data.users.iter().find(|u| u.id == id).cloned())
    }

    pub fn create_note(&self, user_id: &str, new: NewNote, now: DateTime<Utc>) -> Result<Note> {
        let title = new.title.trim().to_string();
        if title.is_empty() {
            bail!("Note title must not be empty");
        }

        let (note, hist_id) = self.with_data(|data| {
            if !data.users.iter().any(|u| u.id == user_id) {
                bail!("User not found");
            }
            let note = Note {
                id: data.allocate_id("note"),
                title,
                content: clean_content(new.content),
                deadline: new.deadline,
                created_at: now,
                updated_at: now,
                is_completed: false,
                user_id: user_id.to_string(),
                reminder_sent_at: None,
            };
            data.notes.push(note.clone());
            Ok((note, data.allocate_id("hist")))
        })?;

        self.record_history(hist_id, &note, HistoryAction::Created, format!("Note \"{}\" created", note.title), now);
        Ok(note)
    }

    pub fn update_note(&self, id: &str, user_id: &str, update: NoteUpdate, now: DateTime<Utc>) -> Result<Note> {
        let (note, hist_id) = self.with_data(|data| {
            let note = data.owned_note_mut(id, user_id)?;
            if let Some(title) = update.title {
                let title = title.trim();
                if title.is_empty() {
                    bail!("Note title must not be empty");
                }
                note.title = title.to_string();
            }
            if let Some(content) = update.content {
                note.content = clean_content(content);
            }
            if let Some(deadline) = update.deadline {
                if note.deadline != deadline {
                    note.reminder_sent_at = None;
                }
                note.deadline = deadline;
            }
            note.updated_at = now;
            let note = note.clone();
            Ok((note, data.allocate_id("hist")))
        })?;

        self.record_history(hist_id, &note, HistoryAction::Updated, format!("Note \"{}\" updated", note.title), now);
        Ok(note)
    }

    pub fn set_completed(&self, id: &str, user_id: &str, completed: bool, now: DateTime<Utc>) -> Result<Note> {
        let (note, hist_id) = self.with_data(|data| {
            let note = data.owned_note_mut(id, user_id)?;
            note.is_completed = completed;
            note.updated_at = now;
            let note = note.clone();
            Ok((note, data.allocate_id("hist")))
        })?;

        let state = if completed { "completed" } else { "incomplete" };
        self.record_history(
            hist_id,
            &note,
            HistoryAction::Completed,
            format!("Note \"{}\" marked as {state}", note.title),
            now,
        );
        Ok(note)
    }

    pub fn delete_note(&self, id: &str, user_id: &str, now: DateTime<Utc>) -> Result<Note> {
        let (note, hist_id) = self.with_data(|data| {
            let pos = data
                .notes
                .iter()
                .position(|n| n.id == id && n.user_id == user_id)
                .ok_or_else(|| anyhow::anyhow!("Note not found or access denied: {id}"))?;
            let note = data.notes.remove(pos);
            Ok((note, data.allocate_id("hist")))
        })?;

        self.record_history(hist_id, &note, HistoryAction::Deleted, format!("Note \"{}\" deleted", note.title), now);
        Ok(note)
    }

    /// The user's notes, newest first.
    pub fn list_notes(&self, user_id: &str) -> Result<Vec<Note>> {
        let mut notes = self.read_data(|data| {
            data.notes
                .iter()
                .filter(|n| n.user_id == user_id)
                .cloned()
                .collect::<Vec<_>>()
        })?;
        notes.sort_by(|a, b| b.created_at.cmp(&a.created_at).then_with(|| b.id.cmp(&a.id)));
        Ok(notes)
    }

    /// The user's activity log, newest first.
    pub fn history(&self, user_id: &str, limit: usize) -> Result<Vec<NoteHistory>> {
        let p = self.history_path();
        if !p.exists() {
            return Ok(vec![]);
        }
        let f = fs::File::open(&p).with_context(|| format!("open {}", p.display()))?;

        let mut rows: Vec<NoteHistory> = Vec::new();
        for line in BufReader::new(f).lines() {
            let line = line?;
            if line.trim().is_empty() {
                continue;
            }
            if let Ok(h) = serde_json::from_str::<NoteHistory>(&line) {
                if h.user_id == user_id {
                    rows.push(h);
                }
            }
        }

        // Appended in time order; stable reverse keeps same-instant entries newest first.
        rows.reverse();
        rows.truncate(limit);
        Ok(rows)
    }

    /// Incomplete notes with a deadline in `[start, end]`, joined with the owner's phone.
    pub fn candidates_between(&self, start: DateTime<Utc>, end: DateTime<Utc>) -> Result<Vec<ReminderCandidate>> {
        self.read_data(|data| {
            data.notes
                .iter()
                .filter(|n| !n.is_completed)
                .filter(|n| n.deadline.is_some_and(|d| d >= start && d <= end))
                .map(|n| data.candidate(n))
                .collect()
        })
    }

    pub fn note_candidate(&self, note_id: &str, user_id: &str) -> Result<Option<ReminderCandidate>> {
        self.read_data(|data| {
            data.notes
                .iter()
                .find(|n| n.id == note_id && n.user_id == user_id)
                .map(|n| data.candidate(n))
        })
    }

    pub fn mark_reminded(&self, note_ids: &[String], at: DateTime<Utc>) -> Result<()> {
        self.with_data(|data| {
            for note in data.notes.iter_mut().filter(|n| note_ids.contains(&n.id)) {
                note.reminder_sent_at = Some(at);
            }
            Ok(())
        })
    }
}

fn clean_content(content: Option<String>) -> Option<String> {
    content
        .map(|c| c.trim().to_string())
        .filter(|c| !c.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 10, 18, 9, 30, 0).unwrap()
    }

    fn store() -> (tempfile::TempDir, FileStore) {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::open(dir.path()).unwrap();
        (dir, store)
    }

    #[test]
    fn register_and_login() {
        let (_dir, s) = store();
        let u = s.register_user("sari", "081234567890", now()).unwrap();
        assert_eq!(s.login("sari").unwrap(), u);
        assert_eq!(s.login("budi").unwrap_err().to_string(), "User not found");
    }

    #[test]
    fn duplicate_username_is_rejected() {
        let (_dir, s) = store();
        s.register_user("sari", "081234567890", now()).unwrap();
        let err = s.register_user("sari", "081298765432", now()).unwrap_err();
        assert_eq!(err.to_string(), "Username already taken");
    }

    #[test]
    fn phone_format_is_validated() {
        let (_dir, s) = store();
        assert!(s.register_user("a", "12345", now()).is_err());
        assert!(s.register_user("b", "0812-3456-7890", now()).is_err());
        assert!(s.register_user("c", "+6281234567890", now()).is_ok());
    }

    #[test]
    fn note_lifecycle_writes_history() {
        let (_dir, s) = store();
        let u = s.register_user("sari", "081234567890", now()).unwrap();

        let n = s
            .create_note(
                &u.id,
                NewNote {
                    title: "  Laporan  ".into(),
                    content: Some("   ".into()),
                    deadline: Some(now() + Duration::hours(5)),
                },
                now(),
            )
            .unwrap();
        assert_eq!(n.title, "Laporan");
        assert_eq!(n.content, None);

        let later = now() + Duration::minutes(1);
        let n = s
            .update_note(
                &n.id,
                &u.id,
                NoteUpdate {
                    title: Some("Laporan KP".into()),
                    ..NoteUpdate::default()
                },
                later,
            )
            .unwrap();
        assert_eq!(n.title, "Laporan KP");
        assert_eq!(n.updated_at, later);

        s.set_completed(&n.id, &u.id, true, later).unwrap();
        s.delete_note(&n.id, &u.id, later).unwrap();
        assert!(s.list_notes(&u.id).unwrap().is_empty());

        let actions: Vec<_> = s.history(&u.id, DEFAULT_HISTORY_LIMIT).unwrap().iter().map(|h| h.action).collect();
        assert_eq!(
            actions,
            vec![
                HistoryAction::Deleted,
                HistoryAction::Completed,
                HistoryAction::Updated,
                HistoryAction::Created
            ]
        );
        assert_eq!(s.history(&u.id, 2).unwrap().len(), 2);

        let mut ids: Vec<_> = s.history(&u.id, DEFAULT_HISTORY_LIMIT).unwrap().into_iter().map(|h| h.id).collect();
        ids.sort();
        ids.dedup();
        assert_eq!(ids.len(), 4);
    }

    #[test]
    fn handles_on_one_root_do_not_lose_writes() {
        let (dir, s) = store();
        let u = s.register_user("sari", "081234567890", now()).unwrap();

        let workers: Vec<_> = (0..4)
            .map(|w| {
                let root = dir.path().to_path_buf();
                let user_id = u.id.clone();
                std::thread::spawn(move || {
                    let handle = FileStore::open(root).unwrap();
                    for i in 0..10 {
                        let title = format!("w{w}-{i}");
                        let n = handle
                            .create_note(&user_id, NewNote { title, ..NewNote::default() }, now())
                            .unwrap();
                        handle.mark_reminded(&[n.id], now()).unwrap();
                    }
                })
            })
            .collect();
        for w in workers {
            w.join().unwrap();
        }

        let notes = s.list_notes(&u.id).unwrap();
        assert_eq!(notes.len(), 40);
        assert!(notes.iter().all(|n| n.reminder_sent_at == Some(now())));
    }

    #[test]
    fn other_users_cannot_touch_notes() {
        let (_dir, s) = store();
        let a = s.register_user("a", "081234567890", now()).unwrap();
        let b = s.register_user("b", "081298765432", now()).unwrap();
        let n = s
            .create_note(&a.id, NewNote { title: "x".into(), ..NewNote::default() }, now())
            .unwrap();

        assert!(s.set_completed(&n.id, &b.id, true, now()).is_err());
        assert!(s.delete_note(&n.id, &b.id, now()).is_err());
        assert!(s.note_candidate(&n.id, &b.id).unwrap().is_none());
    }

    #[test]
    fn candidates_are_windowed_and_joined_with_phone() {
        let (_dir, s) = store();
        let u = s.register_user("sari", "081234567890", now()).unwrap();
        let mk = |title: &str, hours: Option<i64>| {
            s.create_note(
                &u.id,
                NewNote {
                    title: title.into(),
                    content: None,
                    deadline: hours.map(|h| now() + Duration::hours(h)),
                },
                now(),
            )
            .unwrap()
        };
        let soon = mk("soon", Some(3));
        mk("later", Some(48));
        mk("none", None);
        let done = mk("done", Some(2));
        s.set_completed(&done.id, &u.id, true, now()).unwrap();

        let c = s.candidates_between(now(), now() + Duration::hours(24)).unwrap();
        assert_eq!(c.len(), 1);
        assert_eq!(c[0].note_id, soon.id);
        assert_eq!(c[0].phone_number.as_deref(), Some("081234567890"));
    }

    #[test]
    fn changing_deadline_clears_reminder_marker() {
        let (_dir, s) = store();
        let u = s.register_user("sari", "081234567890", now()).unwrap();
        let n = s
            .create_note(
                &u.id,
                NewNote {
                    title: "x".into(),
                    content: None,
                    deadline: Some(now() + Duration::hours(3)),
                },
                now(),
            )
            .unwrap();

        s.mark_reminded(&[n.id.clone()], now()).unwrap();
        assert_eq!(s.note_candidate(&n.id, &u.id).unwrap().unwrap().reminder_sent_at, Some(now()));

        s.update_note(
            &n.id,
            &u.id,
            NoteUpdate {
                deadline: Some(Some(now() + Duration::hours(6))),
                ..NoteUpdate::default()
            },
            now(),
        )
        .unwrap();
        assert_eq!(s.note_candidate(&n.id, &u.id).unwrap().unwrap().reminder_sent_at, None);
    }
}
