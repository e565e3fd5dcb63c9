#![doc = include_str!("../README.md")]
#![deny(unsafe_code)]
#![deny(unused_crate_dependencies)]

pub mod archive;
pub mod driver;
pub mod eligibility;
pub mod emission;
pub mod error;
pub mod prompt;
pub mod report;

pub use archive::{OUTPUT_ARCHIVE_NAME, extract_zip, pack_dir};
pub use driver::{ArchiveOutcome, EMPTY_OR_REFUSED, FileTransformer, TransformConfig};
pub use eligibility::SkipReason;
pub use emission::{EmittedFile, parse_multi_file};
pub use error::TransformError;
pub use report::{BatchReport, FileFailure, FileOutcome, FileStatus};

// Only referenced from the integration tests' fakes
#[cfg(test)]
use async_trait as _;
