//! JSON-RPC 2.0 over HTTP

pub mod backend;
pub mod dispatch;
pub mod http;
pub mod protocol;

pub use backend::NotebookBackend;
pub use dispatch::{Dispatcher, Method, Reply};
pub use http::create_router;
pub use protocol::{JsonRpcError, JsonRpcRequest, JsonRpcResponse};
