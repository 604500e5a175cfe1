//! Single-line backtrace rendering shared by the `oneline_eyre` error hook.
//!
//! A resolved [`backtrace::Backtrace`] normally `Debug`-prints as many lines,
//! one frame per line. Log aggregators that expect one log line per event
//! mangle that into noise. This crate renders the same frames joined by a
//! caller-supplied separator instead of `\n`, so the whole backtrace survives
//! as a single structured log line.

use std::env;
use std::fmt::{self, Formatter};

use backtrace::Backtrace;

/// Write `backtrace`'s frames onto `f`, one frame per `line_separator`
/// instead of one frame per newline.
///
/// When `show_full_paths` is false, source paths that fall under the current
/// working directory are rendered relative to it.
pub fn fmt_backtrace(
    backtrace: &Backtrace,
    f: &mut Formatter<'_>,
    line_separator: &str,
    show_full_paths: bool,
) -> fmt::Result {
    let cwd = if show_full_paths {
        None
    } else {
        env::current_dir().ok()
    };

    for (i, frame) in backtrace.frames().iter().enumerate() {
        let symbols = frame.symbols();
        if symbols.is_empty() {
            write!(f, "{line_separator}{i:4}: <unresolved {:?}>", frame.ip())?;
            continue;
        }
        for symbol in symbols {
            let name = symbol
                .name()
                .map(|n| n.to_string())
                .unwrap_or_else(|| "<unknown>".to_string());
            write!(f, "{line_separator}{i:4}: {name}")?;

            if let Some(file) = symbol.filename() {
                let rendered = match &cwd {
                    Some(cwd) => file.strip_prefix(cwd).unwrap_or(file).display().to_string(),
                    None => file.display().to_string(),
                };
                match symbol.lineno() {
                    Some(line) => write!(f, " at {rendered}:{line}")?,
                    None => write!(f, " at {rendered}")?,
                }
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    struct DebugViaFmtBacktrace<'a>(&'a Backtrace);

    impl fmt::Debug for DebugViaFmtBacktrace<'_> {
        fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
            fmt_backtrace(self.0, f, " ## ", false)
        }
    }

    #[test]
    fn renders_without_newlines() {
        let backtrace = Backtrace::new();
        let rendered = format!("{:?}", DebugViaFmtBacktrace(&backtrace));
        assert!(!rendered.contains('\n'));
    }
}
