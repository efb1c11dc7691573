// LaTeX generation: escaping, per-section formatters, template styles and
// placeholder substitution. Everything in here is pure; file and process
// work lives in `pipeline`.

pub mod escape;
pub mod format;
pub mod style;
pub mod template;

pub use style::{TemplateError, TemplateKey};
pub use template::render_document;
