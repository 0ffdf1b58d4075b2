//! Shared helpers for the command-line tool adapters.

use std::process::Command;

use log::debug;

/// Why an external tool invocation produced no usable output.
#[derive(Debug)]
pub(super) enum RunError {
    /// The program could not be spawned (missing binary, permissions).
    Spawn(std::io::Error),
    /// The program ran but exited non-zero.
    Status(Option<i32>),
}

impl core::fmt::Display for RunError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::Spawn(e) => write!(f, "spawn failed: {e}"),
            Self::Status(Some(code)) => write!(f, "exited with status {code}"),
            Self::Status(None) => write!(f, "terminated by signal"),
        }
    }
}

/// Run `program args…` and return its stdout as (lossy) UTF-8.
pub(super) fn run(program: &str, args: &[&str]) -> Result<String, RunError> {
    debug!("exec: {} {}", program, args.join(" "));
    let output = Command::new(program)
        .args(args)
        .output()
        .map_err(RunError::Spawn)?;
    if !output.status.success() {
        return Err(RunError::Status(output.status.code()));
    }
    Ok(String::from_utf8_lossy(&output.stdout).into_owned())
}

/// Like [`run`], but tolerates a non-zero exit as long as stdout is
/// non-empty. smartctl encodes drive health in its exit status bits.
pub(super) fn run_lenient(program: &str, args: &[&str]) -> Result<String, RunError> {
    debug!("exec: {} {}", program, args.join(" "));
    let output = Command::new(program)
        .args(args)
        .output()
        .map_err(RunError::Spawn)?;
    if output.stdout.is_empty() && !output.status.success() {
        return Err(RunError::Status(output.status.code()));
    }
    Ok(String::from_utf8_lossy(&output.stdout).into_owned())
}

/// Parse the leading number of a token such as `"36"`, `"+45.0°C"` or
/// `"41.5C"`.
pub(super) fn leading_number(token: &str) -> Option<f32> {
    let s = token.trim().trim_start_matches('+');
    let end = s
        .char_indices()
        .find(|(i, c)| !(c.is_ascii_digit() || *c == '.' || (*i == 0 && *c == '-')))
        .map_or(s.len(), |(i, _)| i);
    s[..end].parse::<f32>().ok().filter(|v| v.is_finite())
}
