//! External process seam.
//!
//! Every `ffmpeg`/`exiftool` invocation goes through [`Toolchain`], so tests can substitute a fake.

use std::ffi::OsString;
use std::process::{Command, Stdio};

use anyhow::Context as _;

use crate::foundation::error::TileResult;

/// Captured result of one tool invocation.
#[derive(Clone, Debug, Default)]
pub struct ToolOutput {
    pub success: bool,
    pub code: Option<i32>,
    pub stdout: Vec<u8>,
    pub stderr: String,
}

impl ToolOutput {
    /// Both output streams as text, stderr first (where `ffmpeg` writes its diagnostics).
    pub fn diagnostics(&self) -> String {
        let stdout = String::from_utf8_lossy(&self.stdout);
        if stdout.trim().is_empty() {
            self.stderr.clone()
        } else {
            format!("{}\n{}", self.stderr, stdout)
        }
    }
}

pub trait Toolchain: Send + Sync {
    /// Run `program` with `args` to completion.
    ///
    /// `Err` means the process could not be started at all; a non-zero exit is `Ok` with
    /// `success == false`.
    fn run(&self, program: &str, args: &[OsString]) -> TileResult<ToolOutput>;

    /// Whether `program -version` runs successfully.
    fn is_available(&self, program: &str) -> bool {
        self.run(program, &[OsString::from("-version")])
            .map(|out| out.success)
            .unwrap_or(false)
    }
}

/// Runs tools as child processes from `PATH`.
#[derive(Clone, Copy, Debug, Default)]
pub struct SystemToolchain;

impl Toolchain for SystemToolchain {
    fn run(&self, program: &str, args: &[OsString]) -> TileResult<ToolOutput> {
        tracing::debug!(program, args = %display_args(args), "spawning tool");
        let out = Command::new(program)
            .args(args)
            .stdin(Stdio::null())
            .output()
            .with_context(|| format!("failed to run '{program}' (is it installed and on PATH?)"))?;

        Ok(ToolOutput {
            success: out.status.success(),
            code: out.status.code(),
            stdout: out.stdout,
            stderr: String::from_utf8_lossy(&out.stderr).into_owned(),
        })
    }
}

pub(crate) fn display_args(args: &[OsString]) -> String {
    args.iter()
        .map(|a| a.to_string_lossy())
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
#[path = "../tests/unit/tools.rs"]
mod tests;
