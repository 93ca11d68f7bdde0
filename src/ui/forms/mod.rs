//! Form views

mod field_renderer;
mod wizard;

pub use wizard::draw_wizard;
