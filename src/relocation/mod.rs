//! Thread relocation: the copy/commit executor, the `relocate` entry point
//! used by the move and copy commands, and single-post attachment.

pub mod attach;
pub mod executor;
pub mod service;

pub use executor::{CopiedThread, RelocationExecutor};
pub use service::{RelocateRequest, relocate};
