//! Static site generation: content loading, markdown rendering, the
//! built-in layout and the full site build.

pub mod content;
pub mod layout;
pub mod markdown;
pub mod passthrough;
pub mod site;

pub use content::load_content;
pub use layout::Layout;
pub use markdown::MarkdownRenderer;
pub use site::{BuildOptions, BuildReport, TAG_LIST_FILE, build_site};
