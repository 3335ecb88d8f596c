use anyhow::Context;
use pathpdf_core::{RoadmapData, RoadmapId, SessionKey, Vec2};
use pathpdf_graph::TreeLayouter;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineSettings {
    pub layout: LayoutSettings,
    /// Focus mode state for newly opened roadmaps.
    pub start_in_focus_mode: bool,
    pub completion_policy: CompletionPolicy,
    pub session_key_mode: SessionKeyMode,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            layout: LayoutSettings::default(),
            start_in_focus_mode: false,
            completion_policy: CompletionPolicy::default(),
            session_key_mode: SessionKeyMode::default(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LayoutSettings {
    #[serde(default = "default_x_step")]
    pub x_step: f32,
    #[serde(default = "default_y_step")]
    pub y_step: f32,
    #[serde(default)]
    pub origin: Vec2,
}

impl Default for LayoutSettings {
    fn default() -> Self {
        Self {
            x_step: default_x_step(),
            y_step: default_y_step(),
            origin: Vec2::default(),
        }
    }
}

impl LayoutSettings {
    pub fn layouter(&self) -> TreeLayouter {
        TreeLayouter {
            x_step: self.x_step,
            y_step: self.y_step,
            origin: self.origin,
        }
    }
}

fn default_x_step() -> f32 {
    TreeLayouter::DEFAULT_X_STEP
}
fn default_y_step() -> f32 {
    TreeLayouter::DEFAULT_Y_STEP
}

/// How "completed" and "in progress" interact on the same node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum CompletionPolicy {
    /// Completing clears in-progress; starting clears completion.
    #[default]
    Exclusive,
    /// The two flags are unrelated.
    Independent,
}

/// What the local session cache is keyed by.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum SessionKeyMode {
    /// Roadmap title. Two roadmaps with one title share state.
    Title,
    /// Roadmap id, falling back to the title when the id is blank.
    #[default]
    Id,
    /// Roadmap id plus a content hash, so a regenerated tree starts fresh.
    ContentHash,
}

const CONTENT_HASH_PREFIX: usize = 12;

impl SessionKeyMode {
    pub fn key_for(self, id: &RoadmapId, roadmap: &RoadmapData) -> SessionKey {
        let base = if self == SessionKeyMode::Title || id.0.trim().is_empty() {
            roadmap.title.clone()
        } else {
            id.0.clone()
        };
        match self {
            SessionKeyMode::ContentHash => {
                let hash = roadmap.content_hash();
                SessionKey::new(format!("{base}@{}", &hash[..CONTENT_HASH_PREFIX]))
            }
            SessionKeyMode::Title | SessionKeyMode::Id => SessionKey::new(base),
        }
    }
}

impl EngineSettings {
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("pathpdf").join("settings.json"))
    }

    /// Reads settings from `path`. A missing file yields defaults.
    pub fn load_from(path: &Path) -> anyhow::Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read settings file {}", path.display()))?;
        let settings = serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse settings file {}", path.display()))?;
        Ok(settings)
    }

    /// Loads from the platform config directory, falling back to defaults on
    /// any failure.
    pub fn load() -> Self {
        let Some(path) = Self::default_path() else {
            return Self::default();
        };
        tracing::info!("Loading settings from {:?}", path);
        match Self::load_from(&path) {
            Ok(settings) => settings,
            Err(e) => {
                tracing::error!("{e:#}");
                Self::default()
            }
        }
    }

    pub fn save_to(&self, path: &Path) -> anyhow::Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create {}", parent.display()))?;
        }
        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(path, content)
            .with_context(|| format!("Failed to write settings file {}", path.display()))?;
        Ok(())
    }

    pub fn save(&self) -> anyhow::Result<()> {
        let path = Self::default_path().context("No config directory on this platform")?;
        self.save_to(&path)
    }
}
