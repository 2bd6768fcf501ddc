//! Quarter-turn transposes of single-channel sample grids.

/// Rotate a `width × height` grid 90° clockwise.
///
/// The result is `height × width`: the sample at `(x, y)` lands at index
/// `x * height + height - y - 1`. Only the first `width * height` bytes of
/// `src` are read.
pub fn rotate_clockwise(src: &[u8], width: usize, height: usize) -> Vec<u8> {
    let mut dst = vec![0u8; width * height];
    for y in 0..height {
        let row = &src[y * width..(y + 1) * width];
        for (x, &v) in row.iter().enumerate() {
            dst[x * height + height - y - 1] = v;
        }
    }
    dst
}

/// Rotate a `width × height` grid 90° counter-clockwise.
///
/// Undoes [`rotate_clockwise`]: rotating a `W × H` grid clockwise and the
/// resulting `H × W` grid counter-clockwise reproduces the input.
pub fn rotate_counter_clockwise(src: &[u8], width: usize, height: usize) -> Vec<u8> {
    let mut dst = vec![0u8; width * height];
    for y in 0..width {
        for x in 0..height {
            dst[x + y * height] = src[x * width + width - 1 - y];
        }
    }
    dst
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn clockwise_moves_top_row_to_right_column() {
        // 3x2:
        // a b c
        // d e f
        let src = b"abcdef";
        let dst = rotate_clockwise(src, 3, 2);
        // 2x3:
        // d a
        // e b
        // f c
        assert_eq!(&dst, b"daebfc");
    }

    #[test]
    fn counter_clockwise_moves_top_row_to_left_column() {
        let src = b"abcdef";
        let dst = rotate_counter_clockwise(src, 3, 2);
        // c f
        // b e
        // a d
        assert_eq!(&dst, b"cfbead");
    }

    #[test]
    fn ignores_trailing_chroma_bytes() {
        let mut src = vec![1, 2, 3, 4];
        src.extend_from_slice(&[9, 9]);
        assert_eq!(rotate_clockwise(&src, 2, 2), vec![3, 1, 4, 2]);
    }

    fn grid() -> impl Strategy<Value = (usize, usize, Vec<u8>)> {
        (1usize..24, 1usize..24).prop_flat_map(|(w, h)| {
            (Just(w), Just(h), proptest::collection::vec(any::<u8>(), w * h))
        })
    }

    proptest! {
        #[test]
        fn rotation_round_trips_under_dimension_swap((w, h, data) in grid()) {
            let rotated = rotate_clockwise(&data, w, h);
            let back = rotate_counter_clockwise(&rotated, h, w);
            prop_assert_eq!(back, data);
        }

        #[test]
        fn four_clockwise_turns_are_identity((w, h, data) in grid()) {
            let r1 = rotate_clockwise(&data, w, h);
            let r2 = rotate_clockwise(&r1, h, w);
            let r3 = rotate_clockwise(&r2, w, h);
            let r4 = rotate_clockwise(&r3, h, w);
            prop_assert_eq!(r4, data);
        }
    }
}
