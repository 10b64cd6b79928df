pub mod analysis;
pub mod derived;
pub mod provider;
pub mod transcript;

pub use analysis::*;
pub use derived::*;
pub use provider::*;
pub use transcript::*;
