pub mod candidate;
pub mod constraints;
pub mod errors;
pub mod fitness;
pub mod parameter;

pub use candidate::*;
pub use constraints::*;
pub use errors::*;
pub use fitness::*;
pub use parameter::*;
