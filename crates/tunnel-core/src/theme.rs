use serde::{Deserialize, Serialize};
use std::fmt;

/// Progression category a node belongs to. Links are counted per theme on the
/// server; every fifth link within one theme is a milestone.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Theme {
    Memory,
    Logic,
    Emotion,
    Creativity,
    Focus,
}

impl Theme {
    pub const ALL: [Theme; 5] = [
        Theme::Memory,
        Theme::Logic,
        Theme::Emotion,
        Theme::Creativity,
        Theme::Focus,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Theme::Memory => "memory",
            Theme::Logic => "logic",
            Theme::Emotion => "emotion",
            Theme::Creativity => "creativity",
            Theme::Focus => "focus",
        }
    }

    pub fn color_rgb(self) -> [f32; 3] {
        match self {
            Theme::Memory => [0.35, 0.55, 1.0],     // blue
            Theme::Logic => [0.3, 0.95, 0.75],      // teal
            Theme::Emotion => [1.0, 0.35, 0.5],     // rose
            Theme::Creativity => [0.95, 0.75, 0.3], // amber
            Theme::Focus => [0.7, 0.45, 1.0],       // violet
        }
    }

    fn name_stem(self) -> &'static str {
        match self {
            Theme::Memory => "Mnemo",
            Theme::Logic => "Axio",
            Theme::Emotion => "Limbi",
            Theme::Creativity => "Vara",
            Theme::Focus => "Lumen",
        }
    }

    /// Label shown by the host tooltip, e.g. `Axio-07`.
    pub fn display_name(self, ordinal: u32) -> String {
        format!("{}-{:02}", self.name_stem(), ordinal)
    }
}

impl fmt::Display for Theme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
