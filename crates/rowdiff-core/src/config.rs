//! Render settings consumed by the pipeline

use crate::flatten::Layout;
use serde::{Deserialize, Serialize};

/// The `[render]` table of the config file
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RenderConfig {
    /// "unified" or "split"
    pub layout: Layout,
    /// Wrap long lines instead of truncating them
    pub wrap: bool,
    /// Columns per side; 0 derives it from the terminal width
    pub column_width: usize,
    /// Extra rows materialized above and below the viewport
    pub overscan: usize,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            layout: Layout::Split,
            wrap: false,
            column_width: 0,
            overscan: 0,
        }
    }
}

impl RenderConfig {
    /// Column budget per side for a terminal `total_width` columns wide
    ///
    /// `gutter` is the width taken by line numbers and markers on each side.
    pub fn effective_column_width(&self, total_width: usize, gutter: usize) -> usize {
        if self.column_width > 0 {
            return self.column_width;
        }
        let sides = match self.layout {
            Layout::Unified => 1,
            Layout::Split => 2,
        };
        (total_width / sides).saturating_sub(gutter).max(1)
    }
}
