use std::path::PathBuf;
use std::sync::Mutex;

use super::*;
use crate::foundation::core::TileId;
use crate::frame::{Frame, FrameSequence};
use crate::tools::ToolOutput;

/// Records the staged frame count and scratch directory, then exits with `status`.
struct StagingRecorder {
    succeed: bool,
    seen: Mutex<Option<(PathBuf, usize)>>,
}

impl StagingRecorder {
    fn new(succeed: bool) -> Arc<Self> {
        Arc::new(Self {
            succeed,
            seen: Mutex::new(None),
        })
    }
}

impl Toolchain for StagingRecorder {
    fn run(&self, _program: &str, args: &[OsString]) -> TileResult<ToolOutput> {
        let i = args.iter().position(|a| a == "-i").unwrap();
        let dir = Path::new(&args[i + 1]).parent().unwrap().to_path_buf();
        let staged = std::fs::read_dir(&dir).unwrap().count();
        *self.seen.lock().unwrap() = Some((dir, staged));
        Ok(ToolOutput {
            success: self.succeed,
            code: Some(if self.succeed { 0 } else { 1 }),
            stdout: Vec::new(),
            stderr: if self.succeed {
                String::new()
            } else {
                "libvpx-vp9: encoder not found\n".to_string()
            },
        })
    }
}

fn tile(frames: usize, w: u32, h: u32) -> Tile {
    let frames = (0..frames).map(|i| Frame::transparent(i, w, h)).collect();
    Tile {
        id: TileId::new(1, 0),
        sequence: FrameSequence::uniform(frames).unwrap(),
    }
}

#[test]
fn args_scale_pad_and_keep_alpha() {
    let args = encode_args(
        Path::new("/s/frame_%06d.png"),
        12.5,
        TileSpec::new(99, 100).unwrap(),
        Path::new("/o/x_Row1_Col1.webm"),
        &EncoderOpts::default(),
    );
    let args: Vec<String> = args.iter().map(|a| a.to_string_lossy().into_owned()).collect();
    let pos = |flag: &str| args.iter().position(|a| a == flag).unwrap();

    assert!(pos("-framerate") < pos("-i"));
    assert_eq!(args[pos("-framerate") + 1], "12.5");
    assert_eq!(args[pos("-i") + 1], "/s/frame_%06d.png");
    assert_eq!(
        args[pos("-vf") + 1],
        "scale=99:100:flags=lanczos,pad=ceil(iw/2)*2:ceil(ih/2)*2:color=black@0"
    );
    assert_eq!(args[pos("-pix_fmt") + 1], "yuva420p");
    assert_eq!(args[pos("-c:v") + 1], "libvpx-vp9");
    assert_eq!(args[pos("-b:v") + 1], "2M");
    assert!(args.contains(&"-y".to_string()));
    assert_eq!(args.last().unwrap(), "/o/x_Row1_Col1.webm");
}

#[test]
fn no_overwrite_uses_ffmpeg_no_clobber_flag() {
    let opts = EncoderOpts {
        overwrite: false,
        ..EncoderOpts::default()
    };
    let args = encode_args(
        Path::new("p"),
        5.0,
        TileSpec::new(2, 2).unwrap(),
        Path::new("o"),
        &opts,
    );
    assert!(args.iter().any(|a| a == "-n"));
    assert!(!args.iter().any(|a| a == "-y"));
}

#[test]
fn frames_are_staged_and_scratch_is_removed_on_success() {
    let recorder = StagingRecorder::new(true);
    let enc = FfmpegTileEncoder::new(recorder.clone(), EncoderOpts::default());
    let out = tempfile::tempdir().unwrap();

    enc.encode(&tile(3, 4, 4), 5.0, &out.path().join("t.webm"))
        .unwrap();

    let (dir, staged) = recorder.seen.lock().unwrap().clone().unwrap();
    assert_eq!(staged, 3);
    assert!(!dir.exists());
}

#[test]
fn encoder_failure_is_per_tile_and_still_cleans_up() {
    let recorder = StagingRecorder::new(false);
    let enc = FfmpegTileEncoder::new(recorder.clone(), EncoderOpts::default());
    let out = tempfile::tempdir().unwrap();

    let err = enc
        .encode(&tile(2, 4, 4), 5.0, &out.path().join("t.webm"))
        .unwrap_err();
    match &err {
        TileError::EncodeFailure { tile, detail } => {
            assert_eq!(*tile, TileId::new(1, 0));
            assert!(detail.contains("encoder not found"), "{detail}");
        }
        other => panic!("unexpected error: {other}"),
    }
    assert!(!err.is_fatal());

    let (dir, _) = recorder.seen.lock().unwrap().clone().unwrap();
    assert!(!dir.exists());
}

#[test]
fn existing_output_fails_without_overwrite() {
    let recorder = StagingRecorder::new(true);
    let enc = FfmpegTileEncoder::new(
        recorder.clone(),
        EncoderOpts {
            overwrite: false,
            ..EncoderOpts::default()
        },
    );
    let out = tempfile::tempdir().unwrap();
    let path = out.path().join("t.webm");
    std::fs::write(&path, b"old").unwrap();

    let err = enc.encode(&tile(1, 2, 2), 5.0, &path).unwrap_err();
    assert!(matches!(err, TileError::EncodeFailure { .. }));
    assert!(recorder.seen.lock().unwrap().is_none());
}

/// Writes a truncated output file, then exits non-zero.
struct HalfWritten;

impl Toolchain for HalfWritten {
    fn run(&self, _program: &str, args: &[OsString]) -> TileResult<ToolOutput> {
        std::fs::write(args.last().unwrap(), b"\x1a\x45\xdf\xa3").unwrap();
        Ok(ToolOutput {
            success: false,
            code: Some(1),
            stdout: Vec::new(),
            stderr: "Error while encoding\n".to_string(),
        })
    }
}

#[test]
fn failed_encode_leaves_no_output_file() {
    let enc = FfmpegTileEncoder::new(Arc::new(HalfWritten), EncoderOpts::default());
    let out = tempfile::tempdir().unwrap();
    let path = out.path().join("cat_Row2_Col1.webm");

    let err = enc.encode(&tile(2, 4, 4), 5.0, &path).unwrap_err();
    assert!(matches!(err, TileError::EncodeFailure { .. }), "{err}");
    assert!(!path.exists());
}

#[test]
fn odd_tiles_are_padded_transparently() {
    let args = encode_args(
        Path::new("p"),
        5.0,
        TileSpec::new(15, 15).unwrap(),
        Path::new("o"),
        &EncoderOpts::default(),
    );
    let vf = args
        .iter()
        .map(|a| a.to_string_lossy().into_owned())
        .find(|a| a.starts_with("scale="))
        .unwrap();
    assert!(vf.ends_with(":color=black@0"), "{vf}");
}

/// Removes the staging directory itself before reporting success.
struct SweepsScratch;

impl Toolchain for SweepsScratch {
    fn run(&self, _program: &str, args: &[OsString]) -> TileResult<ToolOutput> {
        let i = args.iter().position(|a| a == "-i").unwrap();
        std::fs::remove_dir_all(Path::new(&args[i + 1]).parent().unwrap()).unwrap();
        std::fs::write(args.last().unwrap(), b"webm").unwrap();
        Ok(ToolOutput {
            success: true,
            code: Some(0),
            ..Default::default()
        })
    }
}

#[test]
fn scratch_cleanup_failure_does_not_fail_a_written_tile() {
    let enc = FfmpegTileEncoder::new(Arc::new(SweepsScratch), EncoderOpts::default());
    let out = tempfile::tempdir().unwrap();
    let path = out.path().join("t.webm");

    enc.encode(&tile(1, 2, 2), 5.0, &path).unwrap();
    assert!(path.exists());
}
