pub mod options;
pub mod sources;
pub mod validation;

pub use options::*;
pub use sources::*;
pub use validation::*;
