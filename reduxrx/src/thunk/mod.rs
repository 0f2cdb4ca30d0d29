mod async_thunk;
mod meta;
mod middleware;
mod options;
mod payload;

pub use async_thunk::*;
pub use meta::*;
pub use middleware::*;
pub use options::*;
pub use payload::*;
