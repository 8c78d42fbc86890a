use serde::{Deserialize, Serialize};

/// Tunables for one editor instance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EditorConfig {
    pub max_undo: usize,
    pub max_normalize_iterations: usize,
    /// Preset font sizes in pixels applied by heading levels 1 through 6.
    pub heading_font_sizes: [u64; 6],
    pub default_font_size: u64,
    pub min_font_size: u64,
    pub font_families: Vec<String>,
    /// Declaration rendered on table cells that carry no border of their own.
    pub default_cell_border: String,
    pub placeholder: String,
    pub max_table_size: usize,
}

impl Default for EditorConfig {
    fn default() -> Self {
        Self {
            max_undo: 200,
            max_normalize_iterations: 100,
            heading_font_sizes: [32, 28, 24, 20, 18, 16],
            default_font_size: 16,
            min_font_size: 1,
            font_families: [
                "Inter",
                "Arial",
                "Times New Roman",
                "Courier New",
                "Roboto",
                "Open Sans",
                "Playfair Display",
            ]
            .into_iter()
            .map(String::from)
            .collect(),
            default_cell_border: "1px solid #d1d5db".to_string(),
            placeholder: "Buraya yazmaya başlayın…".to_string(),
            max_table_size: 32,
        }
    }
}

impl EditorConfig {
    pub fn from_json_str(json: &str) -> Result<Self, serde_json::Error> {
        let config: EditorConfig = serde_json::from_str(json)?;
        Ok(config.with_defaults())
    }

    pub(crate) fn with_defaults(mut self) -> Self {
        let defaults = EditorConfig::default();
        if self.max_undo == 0 {
            self.max_undo = defaults.max_undo;
        }
        if self.max_normalize_iterations == 0 {
            self.max_normalize_iterations = defaults.max_normalize_iterations;
        }
        if self.min_font_size == 0 {
            self.min_font_size = 1;
        }
        if self.default_font_size < self.min_font_size {
            self.default_font_size = self.min_font_size;
        }
        if self.max_table_size == 0 {
            self.max_table_size = defaults.max_table_size;
        }
        self
    }

    /// Preset size for a heading level, if the level is in range.
    pub fn heading_font_size(&self, level: u64) -> Option<u64> {
        let ix = usize::try_from(level).ok()?.checked_sub(1)?;
        self.heading_font_sizes.get(ix).copied()
    }
}
