//! Configuration for the parser.

use bon::Builder;

/// Umbrella options struct.
#[derive(Debug, Clone)]
pub struct Options {
    /// Enable or disable syntax extensions.
    pub extension: ExtensionOptions,
}

impl Default for Options {
    fn default() -> Self {
        Options {
            extension: ExtensionOptions::default(),
        }
    }
}

/// Options to select extensions.
#[derive(Debug, Clone, Builder)]
pub struct ExtensionOptions {
    /// Enables GFM pipe tables. On by default; the strict CommonMark test
    /// harness turns it off.
    ///
    /// ```rust
    /// # use rivermark::{parse_document, Block, Options};
    /// let blocks = parse_document("| a |\n| - |\n", &Options::default());
    /// assert!(matches!(blocks[0], Block::Table(..)));
    /// ```
    #[builder(default = true)]
    pub table: bool,
}

impl Default for ExtensionOptions {
    fn default() -> Self {
        ExtensionOptions { table: true }
    }
}
