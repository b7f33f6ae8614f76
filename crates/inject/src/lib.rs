//! Data injection for templated text.
//!
//! Session content (views, mostly) is authored as plain text with brace
//! tokens that reference a JSON context. [`render`] substitutes every
//! resolvable token, iterating collections through bracketed sub-templates
//! and leaving unresolvable tokens in place with a logged warning.
//!
//! The syntax is documented on the [`render`] module; path lookup rules on
//! the [`path`] module.

pub mod path;
pub mod render;

pub use path::resolve;
pub use render::render;
