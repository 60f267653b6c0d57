mod catalog;
mod dialect;
mod facts;
mod identity;

pub use catalog::*;
pub use dialect::*;
pub use facts::*;
pub use identity::*;
