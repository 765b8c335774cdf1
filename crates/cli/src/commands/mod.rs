pub mod history;
pub mod journal;
pub mod quarantine;
pub mod scan;

pub use history::*;
pub use journal::*;
pub use quarantine::*;
pub use scan::*;
