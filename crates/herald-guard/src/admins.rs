//! Persisted operator roster.

use herald_core::error::HeraldError;
use herald_core::sanitize::is_valid_actor_id;
use std::path::{Path, PathBuf};
use std::sync::RwLock;
use tracing::{info, warn};

/// Ordered admin set backed by a JSON array on disk.
///
/// Every mutation writes the file before it takes effect in memory, so a
/// failed write leaves the roster unchanged.
pub struct AdminRoster {
    path: PathBuf,
    admins: RwLock<Vec<String>>,
}

impl AdminRoster {
    /// Load the roster at `path`, or create it from `seed` on first run.
    pub fn open(path: &Path, seed: &[String]) -> Result<Self, HeraldError> {
        let admins = if path.exists() {
            let raw = std::fs::read_to_string(path)?;
            let list: Vec<String> = serde_json::from_str(&raw)?;
            normalize(list)
        } else {
            let list = normalize(seed.to_vec());
            write_list(path, &list)?;
            info!("admin roster created at {} with {} entries", path.display(), list.len());
            list
        };

        Ok(Self {
            path: path.to_path_buf(),
            admins: RwLock::new(admins),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Snapshot of the current admin set, in insertion order.
    pub fn list(&self) -> Vec<String> {
        self.admins
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    pub fn contains(&self, actor_id: &str) -> bool {
        let actor = actor_id.trim();
        self.admins
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .iter()
            .any(|a| a == actor)
    }

    /// Add an admin. Returns `Ok(false)` if already present.
    pub fn add(&self, actor_id: &str) -> Result<bool, HeraldError> {
        let actor = actor_id.trim();
        if !is_valid_actor_id(actor) {
            return Err(HeraldError::InvalidInput(format!("invalid actor id: {actor}")));
        }

        let mut admins = self
            .admins
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        if admins.iter().any(|a| a == actor) {
            return Ok(false);
        }

        let mut next = admins.clone();
        next.push(actor.to_string());
        self.persist(&next)?;
        *admins = next;
        info!("admin added: {actor}");
        Ok(true)
    }

    /// Remove an admin. Returns `Ok(false)` if not present.
    pub fn remove(&self, actor_id: &str) -> Result<bool, HeraldError> {
        let actor = actor_id.trim();
        let mut admins = self
            .admins
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        if !admins.iter().any(|a| a == actor) {
            return Ok(false);
        }

        let next: Vec<String> = admins.iter().filter(|a| *a != actor).cloned().collect();
        self.persist(&next)?;
        *admins = next;
        info!("admin removed: {actor}");
        Ok(true)
    }

    /// Re-read the roster file, replacing the in-memory set. A missing or
    /// malformed file is an error and leaves the roster unchanged.
    pub fn reload(&self) -> Result<usize, HeraldError> {
        if !self.path.exists() {
            return Err(HeraldError::NotFound(format!(
                "admin roster {}",
                self.path.display()
            )));
        }
        let raw = std::fs::read_to_string(&self.path)?;
        let list = normalize(serde_json::from_str(&raw)?);
        let count = list.len();
        *self
            .admins
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner()) = list;
        info!("admin roster reloaded from {}: {count} entries", self.path.display());
        Ok(count)
    }

    fn persist(&self, list: &[String]) -> Result<(), HeraldError> {
        write_list(&self.path, list).inspect_err(|e| {
            warn!("failed to persist admin roster {}: {e}", self.path.display());
        })
    }
}

fn normalize(list: Vec<String>) -> Vec<String> {
    let mut out: Vec<String> = Vec::with_capacity(list.len());
    for admin in list {
        let admin = admin.trim().to_string();
        if !admin.is_empty() && !out.contains(&admin) {
            out.push(admin);
        }
    }
    out
}

fn write_list(path: &Path, list: &[String]) -> Result<(), HeraldError> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let json = serde_json::to_string_pretty(list)?;
    std::fs::write(path, json)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU64, Ordering};

    static COUNTER: AtomicU64 = AtomicU64::new(0);

    fn temp_path() -> PathBuf {
        let n = COUNTER.fetch_add(1, Ordering::SeqCst);
        let dir = std::env::temp_dir().join(format!(
            "__herald_admins_test_{}_{n}__",
            std::process::id()
        ));
        let _ = std::fs::remove_dir_all(&dir);
        dir.join("admins.json")
    }

    #[test]
    fn test_seeded_on_first_open() {
        let path = temp_path();
        let seed = vec![" 100000000001 ".to_string(), "100000000001".to_string()];
        let roster = AdminRoster::open(&path, &seed).unwrap();
        assert_eq!(roster.list(), vec!["100000000001"]);
        assert!(path.exists());
    }

    #[test]
    fn test_existing_file_wins_over_seed() {
        let path = temp_path();
        AdminRoster::open(&path, &["100000000001".to_string()]).unwrap();
        let roster = AdminRoster::open(&path, &["100000000009".to_string()]).unwrap();
        assert_eq!(roster.list(), vec!["100000000001"]);
    }

    #[test]
    fn test_add_and_remove_persist() {
        let path = temp_path();
        let roster = AdminRoster::open(&path, &[]).unwrap();
        assert!(roster.add("100000000001").unwrap());
        assert!(!roster.add("100000000001").unwrap());
        assert!(roster.add("100000000002").unwrap());
        assert!(roster.contains(" 100000000002"));

        let reopened = AdminRoster::open(&path, &[]).unwrap();
        assert_eq!(reopened.list(), vec!["100000000001", "100000000002"]);

        assert!(roster.remove("100000000001").unwrap());
        assert!(!roster.remove("100000000001").unwrap());
        let reopened = AdminRoster::open(&path, &[]).unwrap();
        assert_eq!(reopened.list(), vec!["100000000002"]);
    }

    #[test]
    fn test_invalid_id_rejected() {
        let path = temp_path();
        let roster = AdminRoster::open(&path, &[]).unwrap();
        assert!(matches!(
            roster.add("not-a-number"),
            Err(HeraldError::InvalidInput(_))
        ));
        assert!(roster.list().is_empty());
    }

    #[test]
    fn test_corrupt_file_is_error() {
        let path = temp_path();
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(&path, "not json").unwrap();
        assert!(matches!(
            AdminRoster::open(&path, &[]),
            Err(HeraldError::Serialization(_))
        ));
    }

    #[test]
    fn test_reload_picks_up_file_edits() {
        let path = temp_path();
        let roster = AdminRoster::open(&path, &["100000000001".to_string()]).unwrap();
        std::fs::write(&path, r#"["100000000002", "100000000003"]"#).unwrap();
        assert_eq!(roster.reload().unwrap(), 2);
        assert_eq!(roster.list(), vec!["100000000002", "100000000003"]);
        assert!(!roster.contains("100000000001"));
    }

    #[test]
    fn test_failed_reload_keeps_roster() {
        let path = temp_path();
        let roster = AdminRoster::open(&path, &["100000000001".to_string()]).unwrap();
        std::fs::write(&path, "{broken").unwrap();
        assert!(roster.reload().is_err());
        std::fs::remove_file(&path).unwrap();
        assert!(matches!(roster.reload(), Err(HeraldError::NotFound(_))));
        assert_eq!(roster.list(), vec!["100000000001"]);
    }
}
