//! Dominican fiscal rules: NCF numbering and ITBIS

pub mod itbis;
pub mod ncf;

pub use itbis::*;
pub use ncf::*;
