//! Options controlling extraction

/// How an archive is laid out on disk when it is extracted.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ExtractOptions {
    /// Drop the first path segment of every entry, skipping entries that have none
    pub strip_top_dir: bool,
    /// Replace files and symlinks that already exist at the target path
    pub overwrite: bool,
}

impl ExtractOptions {
    /// Create options with both switches off
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether to strip the top-level directory of every entry
    pub fn with_strip_top_dir(mut self, strip: bool) -> Self {
        self.strip_top_dir = strip;
        self
    }

    /// Whether existing targets may be replaced
    pub fn with_overwrite(mut self, overwrite: bool) -> Self {
        self.overwrite = overwrite;
        self
    }
}
