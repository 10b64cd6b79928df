pub mod client;
pub mod masking_prompt;
pub mod parse;
pub mod prompts;

pub use client::*;
pub use masking_prompt::*;
pub use parse::*;
pub use prompts::*;
