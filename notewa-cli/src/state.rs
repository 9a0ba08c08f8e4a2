use anyhow::{bail, Context, Result};
use chrono::{DateTime, Utc};
use notewa_store::FileStore;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// `$NOTEWA_HOME`, else `$HOME/.notewa`.
pub fn notewa_home() -> Result<PathBuf> {
    resolve_home(std::env::var("NOTEWA_HOME").ok(), std::env::var("HOME").ok())
}

fn resolve_home(notewa_home: Option<String>, home: Option<String>) -> Result<PathBuf> {
    if let Some(dir) = notewa_home.filter(|d| !d.trim().is_empty()) {
        return Ok(PathBuf::from(dir));
    }
    let home = home.context("HOME is not set (or set NOTEWA_HOME)")?;
    Ok(PathBuf::from(home).join(".notewa"))
}

pub fn ensure_notewa_home() -> Result<PathBuf> {
    let dir = notewa_home()?;
    fs::create_dir_all(&dir).with_context(|| format!("create {}", dir.display()))?;
    Ok(dir)
}

pub fn open_store() -> Result<FileStore> {
    FileStore::open(ensure_notewa_home()?)
}

/// The user currently "logged in" on this machine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    pub user_id: String,
    pub username: String,
    pub logged_in_at: DateTime<Utc>,
}

pub fn session_path() -> Result<PathBuf> {
    Ok(ensure_notewa_home()?.join("session.json"))
}

pub fn write_session(session: &Session) -> Result<()> {
    write_session_at(&session_path()?, session)
}

fn write_session_at(p: &Path, session: &Session) -> Result<()> {
    let json = serde_json::to_string_pretty(session)?;
    fs::write(p, json).with_context(|| format!("write {}", p.display()))?;
    Ok(())
}

pub fn read_session() -> Result<Option<Session>> {
    read_session_at(&session_path()?)
}

fn read_session_at(p: &Path) -> Result<Option<Session>> {
    if !p.exists() {
        return Ok(None);
    }
    let s = fs::read_to_string(p).with_context(|| format!("read {}", p.display()))?;
    Ok(Some(serde_json::from_str(&s).with_context(|| format!("parse {}", p.display()))?))
}

pub fn clear_session() -> Result<()> {
    let p = session_path()?;
    if p.exists() {
        fs::remove_file(&p).with_context(|| format!("remove {}", p.display()))?;
    }
    Ok(())
}

pub fn require_session() -> Result<Session> {
    match read_session()? {
        Some(s) => Ok(s),
        None => bail!("Not logged in. Run: notewa login --username <name>"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn notewa_home_overrides_home() {
        let p = resolve_home(Some("/tmp/nw".into()), Some("/home/sari".into())).unwrap();
        assert_eq!(p, PathBuf::from("/tmp/nw"));

        let p = resolve_home(Some("  ".into()), Some("/home/sari".into())).unwrap();
        assert_eq!(p, PathBuf::from("/home/sari/.notewa"));

        assert!(resolve_home(None, None).is_err());
    }

    #[test]
    fn session_round_trips_on_disk() {
        let dir = tempfile::tempdir().unwrap();
        let p = dir.path().join("session.json");
        assert_eq!(read_session_at(&p).unwrap(), None);

        let s = Session {
            user_id: "user-000001".into(),
            username: "sari".into(),
            logged_in_at: Utc.with_ymd_and_hms(2026, 10, 18, 9, 30, 0).unwrap(),
        };
        write_session_at(&p, &s).unwrap();
        assert_eq!(read_session_at(&p).unwrap(), Some(s));
    }
}
