pub mod anchor;
pub mod engine;
pub mod outcome;
pub mod pass;

pub use anchor::{resolve, SheetAnchor, SheetAnchors};
pub use engine::classify;
pub use outcome::{DuplicateField, PassSummary, SheetSummary};
pub use pass::run_pass;
