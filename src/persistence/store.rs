//! Saved body state
//!
//! A run can be written out between frames and picked up again later. The
//! file is YAML holding a [`SavedState`]: a format version, where the run
//! stood, and one [`BodyRecord`] per body in set order.

use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::PersistError;
use crate::simulation::states::{Body, BodyRecord};

/// Bumped whenever the record layout changes
pub const STATE_VERSION: u32 = 2;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SavedState {
    pub version: u32,
    pub seconds_done: u64, // simulated seconds
    pub frame: u64, // frames emitted so far
    pub bodies: Vec<BodyRecord>,
}

impl SavedState {
    pub fn new(seconds_done: u64, frame: u64, bodies: Vec<BodyRecord>) -> Self {
        Self {
            version: STATE_VERSION,
            seconds_done,
            frame,
            bodies,
        }
    }

    /// Write the state, replacing `path`
    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), PersistError> {
        let file = File::create(path)?;
        let mut writer = BufWriter::new(file);
        serde_yaml::to_writer(&mut writer, self)?;
        writer.flush()?;
        Ok(())
    }

    /// Read and validate a state written by [`SavedState::save`]
    pub fn load(path: impl AsRef<Path>) -> Result<Self, PersistError> {
        let file = File::open(path)?;
        let reader = BufReader::new(file);
        let state: SavedState = serde_yaml::from_reader(reader)?;
        state.validate()?;
        Ok(state)
    }

    pub fn validate(&self) -> Result<(), PersistError> {
        if self.version != STATE_VERSION {
            return Err(PersistError::Version {
                found: self.version,
                expected: STATE_VERSION,
            });
        }
        for (index, record) in self.bodies.iter().enumerate() {
            if let Some(reason) = record.defect() {
                return Err(PersistError::Malformed { index, reason });
            }
        }
        Ok(())
    }

    /// Turn the records back into bodies
    pub fn into_bodies(self) -> Vec<Body> {
        self.bodies.iter().map(Body::from_record).collect()
    }
}
