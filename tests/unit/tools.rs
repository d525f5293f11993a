use super::*;
use crate::foundation::error::TileError;

/// Answers `-version` for `ffmpeg` only.
struct VersionOnly;

impl Toolchain for VersionOnly {
    fn run(&self, program: &str, args: &[OsString]) -> TileResult<ToolOutput> {
        assert_eq!(args, [OsString::from("-version")]);
        match program {
            "ffmpeg" => Ok(ToolOutput {
                success: true,
                code: Some(0),
                ..Default::default()
            }),
            "broken" => Ok(ToolOutput {
                success: false,
                code: Some(127),
                ..Default::default()
            }),
            _ => Err(TileError::Other(anyhow::anyhow!("{program} not found"))),
        }
    }
}

#[test]
fn availability_follows_the_version_check() {
    assert!(VersionOnly.is_available("ffmpeg"));
    assert!(!VersionOnly.is_available("broken"));
    assert!(!VersionOnly.is_available("exiftool"));
}

#[test]
fn missing_program_is_unavailable_on_the_system() {
    assert!(!SystemToolchain.is_available("tilecast-no-such-program"));
}

#[test]
fn diagnostics_put_stderr_first() {
    let out = ToolOutput {
        stdout: b"30\n".to_vec(),
        stderr: "warning".to_string(),
        ..Default::default()
    };
    assert_eq!(out.diagnostics(), "warning\n30\n");
    let quiet = ToolOutput {
        stderr: "only".to_string(),
        ..Default::default()
    };
    assert_eq!(quiet.diagnostics(), "only");
}
