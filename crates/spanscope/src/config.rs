/// Layout knobs for the waterfall and tree projections
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RenderConfig {
    /// Columns of indentation per tree level
    pub indent_width: usize,
    /// How many attributes a waterfall row previews
    pub attribute_preview: usize,
    /// Width in cells of a full-length duration bar
    pub bar_width: u16,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            indent_width: 2,
            attribute_preview: 4,
            bar_width: 40,
        }
    }
}
