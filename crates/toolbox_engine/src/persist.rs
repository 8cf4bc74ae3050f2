use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use tempfile::NamedTempFile;
use thiserror::Error;
use toolbox_logging::toolbox_debug;

/// Gives up looking for a free `name (n).ext` after this many attempts.
const MAX_COPIES: u32 = 999;

#[derive(Debug, Error)]
pub enum PersistError {
    #[error("output directory missing or not writable: {0}")]
    OutputDir(String),
    #[error("no free file name for {0} in the output directory")]
    NoFreeName(String),
    #[error("io error: {0}")]
    Io(#[from] io::Error),
}

/// Creates `dir` if needed and checks that files can be created in it.
pub fn ensure_output_dir(dir: &Path) -> Result<(), PersistError> {
    if dir.exists() {
        let meta = fs::metadata(dir).map_err(|e| PersistError::OutputDir(e.to_string()))?;
        if !meta.is_dir() {
            return Err(PersistError::OutputDir(format!(
                "{} is not a directory",
                dir.display()
            )));
        }
    } else {
        fs::create_dir_all(dir).map_err(|e| PersistError::OutputDir(e.to_string()))?;
    }
    NamedTempFile::new_in(dir).map_err(|e| PersistError::OutputDir(e.to_string()))?;
    Ok(())
}

/// What to do when a file with the download name already exists.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Collision {
    #[default]
    Replace,
    /// Save next to it as `name (1).ext`, `name (2).ext`, ...
    KeepBoth,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SavedArtifact {
    pub path: PathBuf,
    pub size: u64,
}

/// Saves transform results under their download names. Content goes to a
/// temp file in the same directory first, so a reader never sees a partial
/// artifact.
#[derive(Debug, Clone)]
pub struct ArtifactWriter {
    dir: PathBuf,
    collision: Collision,
}

impl ArtifactWriter {
    pub fn new(dir: PathBuf) -> Self {
        Self {
            dir,
            collision: Collision::Replace,
        }
    }

    pub fn with_collision(mut self, collision: Collision) -> Self {
        self.collision = collision;
        self
    }

    pub fn save(&self, file_name: &str, bytes: &[u8]) -> Result<SavedArtifact, PersistError> {
        ensure_output_dir(&self.dir)?;

        let mut tmp = NamedTempFile::new_in(&self.dir)?;
        tmp.write_all(bytes)?;
        tmp.flush()?;
        tmp.as_file_mut().sync_all()?;

        let path = match self.collision {
            Collision::Replace => {
                let target = self.dir.join(file_name);
                if target.exists() {
                    fs::remove_file(&target)?;
                }
                tmp.persist(&target).map_err(|e| PersistError::Io(e.error))?;
                target
            }
            Collision::KeepBoth => self.persist_beside(tmp, file_name)?,
        };
        toolbox_debug!("Saved {} ({} bytes)", path.display(), bytes.len());
        Ok(SavedArtifact {
            path,
            size: bytes.len() as u64,
        })
    }

    fn persist_beside(
        &self,
        mut tmp: NamedTempFile,
        file_name: &str,
    ) -> Result<PathBuf, PersistError> {
        for copy in 0..=MAX_COPIES {
            let target = self.dir.join(numbered_name(file_name, copy));
            match tmp.persist_noclobber(&target) {
                Ok(_) => return Ok(target),
                Err(err) if err.error.kind() == io::ErrorKind::AlreadyExists => tmp = err.file,
                Err(err) => return Err(PersistError::Io(err.error)),
            }
        }
        Err(PersistError::NoFreeName(file_name.to_string()))
    }
}

/// `photo.png` for copy 0, then `photo (1).png`, `photo (2).png`, ...
fn numbered_name(file_name: &str, copy: u32) -> String {
    if copy == 0 {
        return file_name.to_string();
    }
    match file_name.rsplit_once('.') {
        Some((base, ext)) if !base.is_empty() => format!("{base} ({copy}).{ext}"),
        _ => format!("{file_name} ({copy})"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn numbers_copies_before_the_extension() {
        assert_eq!(numbered_name("photo.png", 0), "photo.png");
        assert_eq!(numbered_name("photo.png", 2), "photo (2).png");
        assert_eq!(numbered_name("untitled", 1), "untitled (1)");
    }
}
