//! Mode dispatch: one display representation for streamed and one-shot content.

pub mod dispatcher;
pub mod render;

pub use dispatcher::ModeDispatcher;
pub use render::render;
