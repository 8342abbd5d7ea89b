pub mod common;
pub mod draw;
pub mod recommendation;
pub mod result;
pub mod statistics;
pub mod sync;

pub use common::*;
pub use draw::*;
pub use recommendation::*;
pub use result::*;
pub use statistics::*;
pub use sync::*;
