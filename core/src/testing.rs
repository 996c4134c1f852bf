pub mod judge;
pub mod result;
pub mod runner;
pub mod testcase;

pub use judge::*;
pub use result::*;
pub use runner::*;
pub use testcase::*;
