pub mod observation;
pub mod prediction;

pub use observation::*;
pub use prediction::*;
