use super::*;

/// Frames whose pixels encode their own coordinates and frame index.
fn patterned(frames: usize, w: u32, h: u32) -> FrameSequence {
    let frames = (0..frames)
        .map(|i| {
            let mut data = Vec::with_capacity((w * h * 4) as usize);
            for y in 0..h {
                for x in 0..w {
                    data.extend_from_slice(&[x as u8, y as u8, i as u8, 255]);
                }
            }
            Frame::new(i, w, h, data).unwrap()
        })
        .collect();
    FrameSequence::uniform(frames).unwrap()
}

fn plan(seq: &FrameSequence, tw: u32, th: u32) -> GridPlan {
    GridPlan::plan(seq.canvas(), TileSpec::new(tw, th).unwrap()).unwrap()
}

#[test]
fn edge_cell_region_is_clipped_to_canvas() {
    let region = source_region(
        Canvas::new(100, 50),
        TileSpec::new(40, 40).unwrap(),
        TileId::new(1, 2),
    )
    .unwrap();
    assert_eq!(
        region,
        Region {
            x: 80,
            y: 40,
            width: 20,
            height: 10
        }
    );
}

#[test]
fn edge_tile_is_padded_with_transparency() {
    let seq = patterned(2, 100, 50);
    let grid = plan(&seq, 40, 40);
    let tile = crop_tile(&seq, &grid, TileId::new(1, 2)).unwrap();
    assert_eq!(tile.sequence.len(), 2);

    for frame in tile.sequence.frames() {
        assert_eq!(frame.dimensions(), (40, 40));
        for y in 0..40 {
            for x in 0..40 {
                let px = frame.pixel(x, y);
                if x < 20 && y < 10 {
                    assert_eq!(px, [(80 + x) as u8, (40 + y) as u8, frame.index as u8, 255]);
                } else {
                    assert_eq!(px[3], 0, "pixel ({x},{y}) should be transparent");
                }
            }
        }
    }
}

#[test]
fn uncovered_cell_is_fully_transparent() {
    let frame = patterned(1, 10, 10).first().clone();
    let out = crop_frame(&frame, TileSpec::new(8, 8).unwrap(), TileId::new(3, 0));
    assert_eq!(out.dimensions(), (8, 8));
    assert!(out.data.iter().all(|b| *b == 0));
}

#[test]
fn recomposition_reproduces_the_source() {
    for (w, h, tw, th) in [(100, 50, 40, 40), (7, 13, 3, 5), (16, 16, 16, 16), (5, 3, 9, 9)] {
        let seq = patterned(3, w, h);
        let grid = plan(&seq, tw, th);
        let tiles: Vec<Tile> = grid
            .cells()
            .map(|id| crop_tile(&seq, &grid, id).unwrap())
            .collect();
        assert_eq!(tiles.len(), grid.len());

        let back = recompose(&tiles, &grid).unwrap();
        assert_eq!(back.canvas(), seq.canvas());
        for (a, b) in back.frames().iter().zip(seq.frames()) {
            assert_eq!(a.data, b.data, "{w}x{h} tiled {tw}x{th}");
        }
    }
}

#[test]
fn cropping_outside_the_grid_is_rejected() {
    let seq = patterned(1, 10, 10);
    let grid = plan(&seq, 5, 5);
    assert!(crop_tile(&seq, &grid, TileId::new(2, 0)).is_err());
}
