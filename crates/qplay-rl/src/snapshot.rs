//! Saving and restoring learned values between runs

use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::Path;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use qplay_core::Result;

use crate::value_store::ValueStore;

/// Everything needed to resume training: the table plus the schedule position
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainingSnapshot {
    pub session_id: Uuid,
    pub saved_at: DateTime<Utc>,
    pub generation: u64,
    pub epsilon: f64,
    pub total_steps: u64,
    pub store: ValueStore,
}

impl TrainingSnapshot {
    /// Write the snapshot as JSON, replacing the file atomically
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let tmp_path = path.with_extension("json.tmp");
        {
            let mut writer = BufWriter::new(File::create(&tmp_path)?);
            serde_json::to_writer(&mut writer, self)?;
            writer.flush()?;
        }
        std::fs::rename(&tmp_path, path)?;
        Ok(())
    }

    /// Read a snapshot and check that its table is well-formed
    pub fn load(path: &Path) -> Result<Self> {
        let reader = BufReader::new(File::open(path)?);
        let snapshot: Self = serde_json::from_reader(reader)?;
        snapshot.store.validate()?;
        Ok(snapshot)
    }
}
