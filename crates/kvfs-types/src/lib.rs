//! kvfs-types: shared status codes and result types for kvfs.
//!
//! Every fallible operation in the workspace returns [`Result<T>`] with a
//! [`Status`] error carrying a numeric code from [`status_code`] and an
//! optional message. Handler layers translate codes to POSIX errno values
//! via [`status_code::to_errno`].

#[allow(non_snake_case)]
pub mod status_code;

pub mod result;
pub mod status;

// Re-export commonly used items at the crate root.
pub use result::{make_error, make_error_msg, Result};
pub use status::Status;
pub use status_code::*;
