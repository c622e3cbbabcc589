use std::fs;
use std::io::ErrorKind;
use std::path::PathBuf;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

/// The stored identity: who is signed in and the bearer token the backend
/// gave them. Obtaining the token happens outside this program; `login`
/// only records what the user pastes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Session {
    pub email: String,
    pub token: String,
}

/// Reads and writes the session JSON file.
pub struct SessionFile {
    path: PathBuf,
}

impl SessionFile {
    pub fn new(override_path: Option<PathBuf>) -> Self {
        let path = override_path.unwrap_or_else(Self::default_path);
        Self { path }
    }

    pub fn path(&self) -> &PathBuf {
        &self.path
    }

    fn default_path() -> PathBuf {
        // Use XDG data directory or fallback
        if let Some(proj_dirs) = directories::ProjectDirs::from("", "", "teamdiary") {
            proj_dirs.data_dir().join("session.json")
        } else {
            // Fallback to current directory
            PathBuf::from("session.json")
        }
    }

    /// `None` when no one has signed in on this machine.
    pub fn current_user(&self) -> Result<Option<Session>> {
        let raw = match fs::read_to_string(&self.path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => {
                return Err(e).with_context(|| {
                    format!("Failed to read session file {}", self.path.display())
                });
            }
        };
        let session: Session = serde_json::from_str(&raw).with_context(|| {
            format!(
                "Session file {} is corrupt; run `login` again",
                self.path.display()
            )
        })?;
        Ok(Some(session))
    }

    pub fn is_signed_in(&self) -> bool {
        matches!(self.current_user(), Ok(Some(_)))
    }

    pub fn sign_in(&self, session: &Session) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        let raw = serde_json::to_string_pretty(session)?;
        fs::write(&self.path, raw).with_context(|| {
            format!("Failed to write session file {}", self.path.display())
        })?;
        Ok(())
    }

    /// Removes the session file; signing out twice is fine.
    pub fn sign_out(&self) -> Result<()> {
        match fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e).with_context(|| {
                format!("Failed to remove session file {}", self.path.display())
            }),
        }
    }
}
