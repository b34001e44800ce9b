mod pseudo;
mod report;
mod script;

pub use pseudo::*;
pub use report::*;
pub use script::*;
