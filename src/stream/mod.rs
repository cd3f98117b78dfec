//! Frame parser for the line-oriented generation event stream.
//! Raw chunks in, typed frames out, independent of chunk boundaries.

pub mod frame;
pub mod parser;

pub use frame::{Citation, Frame};
pub use parser::{FrameParser, DATA_MARKER, DONE_SENTINEL};
