// Library crate root.
//
// The binary (src/main.rs) is a thin CLI over `pipeline`; everything it
// drives is exported here for use as a library.

pub mod acn;
pub mod config;
pub mod connectivity;
pub mod corrector;
pub mod error;
pub mod ilp;
pub mod im;
pub mod metrics;
pub mod optimizer;

#[cfg(feature = "im-io")]
pub mod pipeline;

pub use error::{DownsampleError, DownsampleStatus};
pub use optimizer::{downsample, downsample_into};

#[cfg(test)]
pub mod test_helpers;
