use super::*;

fn solid(w: u32, h: u32, px: [u8; 4]) -> Frame {
    let data = px.repeat(w as usize * h as usize);
    Frame::new(0, w, h, data).unwrap()
}

#[test]
fn frame_new_checks_buffer_length() {
    assert!(Frame::new(0, 2, 2, vec![0u8; 15]).is_err());
    assert!(Frame::new(0, 2, 2, vec![0u8; 16]).is_ok());
}

#[test]
fn with_duration_drops_non_positive_values() {
    let f = Frame::transparent(0, 1, 1).with_duration_ms(Some(0.0));
    assert_eq!(f.duration_ms, None);
    let f = Frame::transparent(0, 1, 1).with_duration_ms(Some(40.0));
    assert_eq!(f.duration_ms, Some(40.0));
}

#[test]
fn copy_region_clips_to_destination() {
    let src = solid(4, 4, [9, 8, 7, 255]);
    let mut dst = Frame::transparent(0, 3, 3);
    src.copy_region_to(Region::full(4, 4), &mut dst, 1, 1);
    assert_eq!(dst.pixel(0, 0), [0, 0, 0, 0]);
    assert_eq!(dst.pixel(1, 1), [9, 8, 7, 255]);
    assert_eq!(dst.pixel(2, 2), [9, 8, 7, 255]);
    assert_eq!(dst.pixel(0, 2), [0, 0, 0, 0]);
}

#[test]
fn strict_policy_rejects_mismatched_frames() {
    let frames = vec![solid(4, 4, [1, 1, 1, 255]), solid(3, 4, [2, 2, 2, 255])];
    let err = FrameSequence::new(frames, DimensionPolicy::Strict).unwrap_err();
    match err {
        TileError::DimensionMismatch {
            index,
            width,
            height,
            got_width,
            got_height,
        } => {
            assert_eq!((index, width, height, got_width, got_height), (1, 4, 4, 3, 4));
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn lenient_policy_pads_smaller_and_clips_larger_frames() {
    let frames = vec![
        solid(4, 4, [1, 1, 1, 255]),
        solid(2, 2, [2, 2, 2, 255]),
        solid(6, 6, [3, 3, 3, 255]),
    ];
    let (seq, warnings) = FrameSequence::new(frames, DimensionPolicy::Lenient).unwrap();
    assert_eq!(warnings.len(), 2);
    assert_eq!(seq.len(), 3);
    assert!(seq.frames().iter().all(|f| f.dimensions() == (4, 4)));

    let padded = &seq.frames()[1];
    assert_eq!(padded.pixel(1, 1), [2, 2, 2, 255]);
    assert_eq!(padded.pixel(3, 3), [0, 0, 0, 0]);
    assert_eq!(seq.frames()[2].pixel(3, 3), [3, 3, 3, 255]);
}

#[test]
fn sequence_reindexes_frames_and_rejects_empty_input() {
    let mut a = solid(1, 1, [0, 0, 0, 255]);
    a.index = 7;
    let seq = FrameSequence::uniform(vec![a.clone(), a]).unwrap();
    assert_eq!(seq.frames()[0].index, 0);
    assert_eq!(seq.frames()[1].index, 1);
    assert!(FrameSequence::uniform(Vec::new()).is_err());
}
