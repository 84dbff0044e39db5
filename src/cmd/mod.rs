mod output;
mod proxy;
mod resolve;
mod search;
mod serve;
mod stream;

pub use proxy::cmd_proxy;
pub use resolve::cmd_resolve;
pub use search::{cmd_search, cmd_trending};
pub use serve::cmd_serve;
pub use stream::cmd_stream;
