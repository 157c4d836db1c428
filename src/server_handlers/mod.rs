pub mod report;
pub mod docs;

pub use report::*;
pub use docs::*;
