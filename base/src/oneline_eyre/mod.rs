//! A custom [`eyre::EyreHandler`] that reports errors as a single compact
//! line instead of a multi-page backtrace dump. Install it once, before any
//! `eyre::Report` is constructed.
//!
//! [`eyre::EyreHandler`]: https://docs.rs/eyre/*/eyre/trait.EyreHandler.html

use eyre::Result;

use handler::HookBuilder;

mod handler;

/// Install the default `oneline_eyre` hook as the global error report hook.
/// Only the first install in a process succeeds.
pub fn install() -> Result<()> {
    HookBuilder::default()
        .capture_backtrace_by_default(true)
        .install()
}
