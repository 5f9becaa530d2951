//! A thin adapter for requesting syntax-highlighted markup for a code
//! snippet, given a language and a theme.
//!
//! Tokenization and rendering are delegated to [`syntect`], markup-to-node
//! conversion to [`scraper`]. What ambra itself does:
//!
//! - resolve which grammar to use when the caller supplies a custom grammar
//!   definition instead of a built-in language name
//! - cache engine instances keyed by grammar+theme so repeated requests for
//!   the same custom grammar don't reinitialize the engine
//! - optionally throttle how often a highlight pass runs when the input
//!   changes rapidly, eg in a keystroke-driven editor

mod cache;
mod engine;
mod error;
mod highlight;
mod languages;
mod nodes;
mod themes;
mod throttle;

pub use engine::HighlightStyle;
pub use error::Error;
pub use highlight::{HighlightOptions, Highlighted, Highlighter};
pub use languages::{CustomLanguage, Language, PLAIN_LANGUAGE_NAME};
pub use nodes::{HtmlNode, Transformer, remove_tab_index_from_pre};
pub use themes::ThemeVariant;
