pub mod integration;
pub mod scale;
pub mod suite;

pub use integration::*;
pub use scale::*;
pub use suite::*;
