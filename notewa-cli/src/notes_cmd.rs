use anyhow::{bail, Result};
use chrono::{DateTime, Utc};
use clap::Subcommand;
use notewa_core::{format_deadline_jakarta, hours_until, parse_deadline};
use notewa_store::{NewNote, Note, NoteUpdate};

use crate::reminders_cmd;
use crate::state::{open_store, require_session};

#[derive(Subcommand, Debug)]
pub enum NoteCommand {
    /// Create a note. Deadlines are Jakarta time ("2026-10-19 17:00") or RFC 3339.
    Add {
        #[arg(long)]
        title: String,

        #[arg(long)]
        content: Option<String>,

        #[arg(long)]
        deadline: Option<String>,

        /// Do not run the reminder check after saving
        #[arg(long, default_value_t = false)]
        no_check: bool,
    },

    /// Change a note's title, content or deadline
    Edit {
        id: String,

        #[arg(long)]
        title: Option<String>,

        #[arg(long)]
        content: Option<String>,

        #[arg(long, conflicts_with = "clear_deadline")]
        deadline: Option<String>,

        #[arg(long, default_value_t = false)]
        clear_deadline: bool,

        #[arg(long, default_value_t = false)]
        no_check: bool,
    },

    /// Mark a note as done (or not done with --undo)
    Done {
        id: String,

        #[arg(long, default_value_t = false)]
        undo: bool,
    },

    /// Delete a note
    Rm { id: String },

    /// List your notes, newest first
    List {
        /// Include completed notes
        #[arg(long, default_value_t = false)]
        all: bool,
    },
}

pub async fn run(cmd: NoteCommand) -> Result<()> {
    let session = require_session()?;
    let store = open_store()?;
    let now = Utc::now();

    match cmd {
        NoteCommand::Add {
            title,
            content,
            deadline,
            no_check,
        } => {
            let deadline = deadline.as_deref().map(parse_deadline).transpose()?;
            let note = store.create_note(
                &session.user_id,
                NewNote {
                    title,
                    content,
                    deadline,
                },
                now,
            )?;
            println!("Created {}", note_line(&note, now));

            if note.deadline.is_some() && !no_check {
                reminders_cmd::auto_check(&note.id, &session.user_id).await;
            }
        }

        NoteCommand::Edit {
            id,
            title,
            content,
            deadline,
            clear_deadline,
            no_check,
        } => {
            let deadline = match (deadline, clear_deadline) {
                (Some(raw), _) => Some(Some(parse_deadline(&raw)?)),
                (None, true) => Some(None),
                (None, false) => None,
            };
            if title.is_none() && content.is_none() && deadline.is_none() {
                bail!("Nothing to change (pass --title, --content, --deadline or --clear-deadline)");
            }
            let note = store.update_note(
                &id,
                &session.user_id,
                NoteUpdate {
                    title,
                    content: content.map(Some),
                    deadline,
                },
                now,
            )?;
            println!("Updated {}", note_line(&note, now));

            if note.deadline.is_some() && !no_check {
                reminders_cmd::auto_check(&note.id, &session.user_id).await;
            }
        }

        NoteCommand::Done { id, undo } => {
            let note = store.set_completed(&id, &session.user_id, !undo, now)?;
            println!("{}", note_line(&note, now));
        }

        NoteCommand::Rm { id } => {
            let note = store.delete_note(&id, &session.user_id, now)?;
            println!("Deleted {} \"{}\"", note.id, note.title);
        }

        NoteCommand::List { all } => {
            let notes: Vec<Note> = store
                .list_notes(&session.user_id)?
                .into_iter()
                .filter(|n| all || !n.is_completed)
                .collect();
            if notes.is_empty() {
                println!("No notes yet. Add one: notewa note add --title <title>");
            }
            for n in &notes {
                println!("{}", note_line(n, now));
                if let Some(c) = &n.content {
                    println!("      {c}");
                }
            }
        }
    }

    Ok(())
}

pub fn history(limit: usize) -> Result<()> {
    let session = require_session()?;
    let rows = open_store()?.history(&session.user_id, limit)?;
    if rows.is_empty() {
        println!("No activity yet.");
    }
    for h in rows {
        println!(
            "{}  {:<9} {}  {}",
            h.created_at.format("%Y-%m-%d %H:%M"),
            format!("{:?}", h.action).to_lowercase(),
            h.note_id,
            h.action_details.unwrap_or_default()
        );
    }
    Ok(())
}

fn note_line(note: &Note, now: DateTime<Utc>) -> String {
    let mark = if note.is_completed { "x" } else { " " };
    let due = match note.deadline {
        Some(d) => {
            let left = hours_until(d, now);
            let rel = if left >= 0 {
                format!("{left} jam lagi")
            } else {
                format!("lewat {} jam", -left)
            };
            format!("  (deadline: {} WIB, {rel})", format_deadline_jakarta(d))
        }
        None => String::new(),
    };
    format!("[{mark}] {}  {}{due}", note.id, note.title)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 10, 18, 9, 30, 0).unwrap()
    }

    fn note(deadline: Option<DateTime<Utc>>, done: bool) -> Note {
        Note {
            id: "note-000001".into(),
            title: "Laporan KP".into(),
            content: None,
            deadline,
            created_at: now(),
            updated_at: now(),
            is_completed: done,
            user_id: "user-000001".into(),
            reminder_sent_at: None,
        }
    }

    #[test]
    fn line_without_deadline() {
        assert_eq!(note_line(&note(None, true), now()), "[x] note-000001  Laporan KP");
    }

    #[test]
    fn line_shows_jakarta_deadline_and_hours_left() {
        let line = note_line(&note(Some(now() + Duration::minutes(150)), false), now());
        assert_eq!(
            line,
            "[ ] note-000001  Laporan KP  (deadline: Minggu, 18 Oktober 2026 pukul 19.00 WIB, 3 jam lagi)"
        );
    }

    #[test]
    fn line_marks_overdue_notes() {
        let line = note_line(&note(Some(now() - Duration::hours(5)), false), now());
        assert!(line.ends_with("lewat 5 jam)"));
    }
}
