//! Progressive search engine and its text-search backend (spec §2 C1, C11).

pub mod progressive;
pub mod text_search;

pub use progressive::{search_progressive, ProgressiveHit};
pub use text_search::{search, SearchHit};
