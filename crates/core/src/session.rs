//! Application logic shared by the GUI and CLI.
//!
//! A [`Session`] ties the settings store to the tool: profiles are read
//! from the device the first time they are needed, edits go to the store,
//! and `apply` pushes stored rows back to the mouse.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::{Error, Result};
use crate::profile::{Field, ProfileId, ProfileSettings};
use crate::runner::{CommandRunner, SystemRunner};
use crate::store::SettingsStore;
use crate::tool::{Ratslap, ResetTarget, PROGRAM_NAME};

/// Version written into exported profile files.
const EXPORT_FORMAT_VERSION: u32 = 1;

/// On-disk shape of an exported profile set.
#[derive(Debug, Serialize, Deserialize)]
struct ProfileFile {
    version: u32,
    profiles: Vec<ProfileSettings>,
}

/// Stored location of ratslap, if the user has picked one before.
pub fn locate_tool(store: &SettingsStore) -> Result<Option<PathBuf>> {
    store.tool_path(PROGRAM_NAME)
}

/// Store plus tool, with the profile the user is looking at.
pub struct Session<R = SystemRunner> {
    store: SettingsStore,
    tool: Ratslap<R>,
    current: Option<ProfileId>,
}

impl<R: CommandRunner> Session<R> {
    pub fn new(store: SettingsStore, tool: Ratslap<R>) -> Self {
        Self {
            store,
            tool,
            current: None,
        }
    }

    pub fn store(&self) -> &SettingsStore {
        &self.store
    }

    pub fn tool(&self) -> &Ratslap<R> {
        &self.tool
    }

    /// Profile most recently loaded, if any.
    pub fn current(&self) -> Option<ProfileId> {
        self.current
    }

    /// Persist the tool's path so the next start finds it.
    pub fn remember_tool_path(&self) -> Result<()> {
        self.store.set_tool_path(PROGRAM_NAME, self.tool.path())
    }

    /// Activate `id` on the device and return its settings.
    ///
    /// The stored row wins; without one the device is read and the result
    /// stored.
    pub fn load_profile(&mut self, id: ProfileId) -> Result<ProfileSettings> {
        self.tool.select(id)?;
        self.current = Some(id);
        self.stored_or_scraped(id)
    }

    /// Settings of `id` without switching the device to it or writing
    /// anything to the store.
    pub fn view_profile(&self, id: ProfileId) -> Result<ProfileSettings> {
        match self.store.profile(id)? {
            Some(stored) => Ok(stored),
            None => self.tool.read_profile(id),
        }
    }

    fn stored_or_scraped(&self, id: ProfileId) -> Result<ProfileSettings> {
        if let Some(stored) = self.store.profile(id)? {
            debug!(profile = %id, "Using stored profile");
            return Ok(stored);
        }
        let scraped = self.tool.read_profile(id)?;
        self.store.insert_profile(&scraped)?;
        Ok(scraped)
    }

    /// Record a user edit. Nothing reaches the device until [`Session::apply`].
    pub fn set_field(&self, id: ProfileId, field: Field, value: &str) -> Result<()> {
        if !field.is_editable() {
            return Err(Error::NotEditable(field));
        }
        let value = match field {
            Field::Color => value.trim().to_lowercase(),
            _ => value.trim().to_string(),
        };
        self.stored_or_scraped(id)?;
        self.store.update_field(id, field, &value)
    }

    /// Push every stored profile to the device.
    pub fn apply(&self) -> Result<Vec<(ProfileId, Vec<Field>)>> {
        let mut applied = Vec::new();
        for id in ProfileId::ALL {
            let Some(stored) = self.store.profile(*id)? else {
                continue;
            };
            let sent = self.tool.modify(*id, &stored)?;
            applied.push((*id, sent));
        }
        info!(profiles = applied.len(), "Applied stored profiles");
        Ok(applied)
    }

    /// Factory-reset profiles on the device and forget their stored edits.
    ///
    /// Returns the reloaded current profile, or `None` when no profile has
    /// been loaded yet, in which case the active profile is not touched.
    pub fn reset(&mut self, target: ResetTarget) -> Result<Option<ProfileSettings>> {
        self.tool.reset(target)?;
        match target {
            ResetTarget::All => self.store.clear_profiles()?,
            ResetTarget::One(id) => {
                self.store.delete_profile(id)?;
            }
        }
        match self.current {
            Some(current) => self.load_profile(current).map(Some),
            None => Ok(None),
        }
    }

    /// Write every stored profile to a JSON file.
    pub fn export_profiles(&self, path: &Path) -> Result<usize> {
        let file = ProfileFile {
            version: EXPORT_FORMAT_VERSION,
            profiles: self.store.profiles()?,
        };
        fs::write(path, serde_json::to_string_pretty(&file)?)?;
        info!(path = %path.display(), count = file.profiles.len(), "Exported profiles");
        Ok(file.profiles.len())
    }

    /// Load profiles from a JSON file into the store, replacing rows of the same name.
    pub fn import_profiles(&self, path: &Path) -> Result<usize> {
        let file: ProfileFile = serde_json::from_str(&fs::read_to_string(path)?)?;
        if file.version != EXPORT_FORMAT_VERSION {
            return Err(Error::Parse(format!(
                "unsupported profile file version {}",
                file.version
            )));
        }
        for profile in &file.profiles {
            self.store.insert_profile(profile)?;
        }
        info!(path = %path.display(), count = file.profiles.len(), "Imported profiles");
        Ok(file.profiles.len())
    }
}
