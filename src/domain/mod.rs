pub mod employer;
pub mod plan;
pub mod quota;

pub use employer::*;
pub use plan::*;
pub use quota::*;
