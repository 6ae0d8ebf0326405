mod context;
mod environment;
mod error;

pub use context::{RequestContext, UpstreamError, REQUEST_ID_HEADER};
pub use environment::Environment;
pub use error::AppError;
