//! Rendering of parsed documents.

pub mod html;
pub mod math;

pub use html::{render_html, HtmlConfig};
pub use math::MathBackend;
