pub mod stage0_segment;
pub mod stage1_mask;
pub mod stage2_analyze;
pub mod stage3_project;

pub use stage0_segment::*;
pub use stage1_mask::*;
pub use stage2_analyze::*;
pub use stage3_project::*;
