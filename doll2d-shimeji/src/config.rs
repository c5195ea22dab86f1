use crate::DollError;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// One crossfade entry of the mix table.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct MixEntry {
    pub from: String,
    pub to: String,
    pub duration: f32,
}

impl MixEntry {
    pub fn new(from: &str, to: &str, duration: f32) -> Self {
        Self {
            from: from.to_string(),
            to: to.to_string(),
            duration,
        }
    }
}

/// Everything an [`crate::Overlay`] needs to load and drive its dolls.
///
/// Missing JSON fields fall back to [`DollConfig::default`].
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DollConfig {
    pub atlas_path: PathBuf,
    pub skeleton_path: PathBuf,
    /// Applied to every length in the skeleton at load time, including the hit box.
    pub scale: f32,
    /// Looping animation played while the doll is idle.
    pub idle_animation: String,
    /// Looping animation played while the doll is held.
    pub pick_animation: String,
    pub mixes: Vec<MixEntry>,
    pub default_mix: f32,
    /// Anchor of dolls spawned without an explicit position.
    pub spawn: [f32; 2],
    /// Added to the pointer position while a doll is held.
    pub grab_offset: [f32; 2],
    /// Screen space grows downward; the skeleton is flipped vertically to stay upright.
    pub y_down: bool,
    pub premultiplied_alpha: bool,
}

impl Default for DollConfig {
    fn default() -> Self {
        Self {
            atlas_path: PathBuf::from("assets/rm4a1/rm4a1.atlas"),
            skeleton_path: PathBuf::from("assets/rm4a1/rm4a1.skel"),
            scale: 1.0,
            idle_animation: "wait".to_string(),
            pick_animation: "pick".to_string(),
            mixes: vec![
                MixEntry::new("wait", "pick", 0.1),
                MixEntry::new("pick", "wait", 0.2),
            ],
            default_mix: 0.0,
            spawn: [0.0, 0.0],
            grab_offset: [0.0, 0.0],
            y_down: true,
            premultiplied_alpha: true,
        }
    }
}

impl DollConfig {
    pub fn from_json_str(input: &str) -> Result<Self, DollError> {
        Ok(serde_json::from_str(input)?)
    }

    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, DollError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| DollError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let mut config = Self::from_json_str(&text)?;
        config.resolve_relative_to(path.parent().unwrap_or(Path::new("")));
        Ok(config)
    }

    pub fn to_json_string(&self) -> Result<String, DollError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Makes relative asset paths relative to `base` instead of the working directory.
    pub fn resolve_relative_to(&mut self, base: &Path) {
        for path in [&mut self.atlas_path, &mut self.skeleton_path] {
            if path.is_relative() {
                *path = base.join(&*path);
            }
        }
    }
}
