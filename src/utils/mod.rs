//! Utility modules.

pub mod file;
pub mod retry;

pub use file::{is_text_file, read_file_content};
pub use retry::{RetryPolicy, Retryable, with_retry};
