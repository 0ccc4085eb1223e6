//! External process execution
//!
//! Every stage of the pipeline is backed by an external executable. This
//! module hides how those executables are launched behind the
//! [`ProcessRunner`] trait so the stages can be exercised without real
//! binaries.
//!
//! - [`CliProcessRunner`]: launches the executable with `tokio::process`,
//!   forwarding each stdout/stderr line to a callback as soon as it is read
//!
//! ## Usage
//!
//! ```no_run
//! use audio_fetch::process::{CliProcessRunner, ProcessRunner};
//! use std::ffi::OsString;
//! use std::path::Path;
//! use tokio_util::sync::CancellationToken;
//!
//! # #[tokio::main]
//! # async fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let runner = CliProcessRunner::new();
//! let args = vec![OsString::from("--version")];
//! let outcome = runner
//!     .run(
//!         Path::new("/usr/bin/ffmpeg"),
//!         &args,
//!         &CancellationToken::new(),
//!         &mut |line: &str| println!("{line}"),
//!     )
//!     .await?;
//! println!("exit code: {:?}", outcome.exit_code);
//! # Ok(())
//! # }
//! ```

mod cli;
mod lines;
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
pub(crate) mod scripted;
mod traits;

pub use cli::CliProcessRunner;
pub use traits::{LineSink, ProcessRunner};
