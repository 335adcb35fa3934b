//! Deck generation against a template presentation

pub mod dates;
pub mod paginator;
pub mod table;
pub mod template;

pub use paginator::{SLIDE_INSERT_OFFSET, paginate};
pub use template::TemplateDeck;
