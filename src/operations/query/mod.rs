mod is_valid;
mod volume;

pub use is_valid::{IsValid, ValidityReport};
pub use volume::Volume;
