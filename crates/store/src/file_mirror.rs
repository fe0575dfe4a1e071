//! File-backed local mirror.
//!
//! Each record key maps to `{key}.mirror.json` inside the mirror directory.
//! Writes go to a temp file first and are renamed into place, so a crash
//! mid-write leaves the previous mirror intact.

use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use crate::error::Result;
use crate::mirror::{LocalMirror, MirroredState};
use crate::remote::RecordKey;

/// Mirror persisted as JSON files in a directory.
#[derive(Debug, Clone)]
pub struct FileMirror {
    dir: PathBuf,
}

impl FileMirror {
    /// Create a mirror rooted at `dir`, creating the directory if needed.
    pub fn new(dir: impl Into<PathBuf>) -> Result<Self> {
        let dir = dir.into();
        if !dir.exists() {
            fs::create_dir_all(&dir)?;
        }
        Ok(Self { dir })
    }

    /// Directory holding the mirror files.
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Path of the mirror file for a key.
    pub fn mirror_path(&self, key: &RecordKey) -> PathBuf {
        self.dir.join(format!("{}.mirror.json", file_stem(key)))
    }
}

/// Make a key safe to use as a file name.
fn file_stem(key: &RecordKey) -> String {
    key.as_str()
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '-' || c == '_' {
                c
            } else {
                '_'
            }
        })
        .collect()
}

impl LocalMirror for FileMirror {
    fn set(&self, key: &RecordKey, state: &MirroredState) -> Result<()> {
        let path = self.mirror_path(key);
        let temp_path = path.with_extension("json.tmp");

        let file = File::create(&temp_path)?;
        let mut writer = BufWriter::new(file);
        serde_json::to_writer(&mut writer, state)?;
        writer.flush()?;

        fs::rename(temp_path, path)?;
        Ok(())
    }

    fn get(&self, key: &RecordKey) -> Result<Option<MirroredState>> {
        let path = self.mirror_path(key);
        if !path.exists() {
            return Ok(None);
        }

        let json = fs::read_to_string(path)?;
        Ok(Some(serde_json::from_str(&json)?))
    }

    fn clear(&self, key: &RecordKey) -> Result<()> {
        let path = self.mirror_path(key);
        if path.exists() {
            fs::remove_file(path)?;
        }
        Ok(())
    }
}
