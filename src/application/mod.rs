pub mod quota;

pub use quota::*;
