pub mod render;
pub mod session;

pub use session::{CorrectionState, LookupSession};
