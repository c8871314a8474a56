pub mod context;
pub mod error;

pub use context::{AppContext, ServerSelection, ServerTarget};
pub use error::{NotestreamError, Result};
