pub mod proxy;
pub mod target;

pub use proxy::*;
pub use target::*;
