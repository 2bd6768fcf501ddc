//! Luminance-to-bit binarization.
//!
//! Two thresholding schemes are provided:
//! - a global histogram threshold: one black point for the whole grid,
//!   estimated from a sparse row sample; cheap and tolerant of noise, but
//!   weak under uneven lighting;
//! - a hybrid (locally adaptive) threshold: per 8×8 block black points
//!   smoothed over a 5×5 block neighbourhood; precise on shadows and
//!   gradients. Grids smaller than 40 px fall back to the global scheme.

use std::cell::OnceCell;

use scanloop_core::LuminanceFrame;

const LUMINANCE_BITS: u32 = 5;
const LUMINANCE_SHIFT: u32 = 8 - LUMINANCE_BITS;
const LUMINANCE_BUCKETS: usize = 1 << LUMINANCE_BITS;

const BLOCK_SIZE_POWER: usize = 3;
const BLOCK_SIZE: usize = 1 << BLOCK_SIZE_POWER;
const BLOCK_SIZE_MASK: usize = BLOCK_SIZE - 1;
const MINIMUM_DIMENSION: usize = BLOCK_SIZE * 5;
const MIN_DYNAMIC_RANGE: u32 = 24;

/// Dense bit grid; a set bit is a black module.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BitMatrix {
    width: usize,
    height: usize,
    row_words: usize,
    bits: Vec<u64>,
}

impl BitMatrix {
    pub fn new(width: usize, height: usize) -> Self {
        let row_words = width.div_ceil(64);
        Self {
            width,
            height,
            row_words,
            bits: vec![0; row_words * height],
        }
    }

    #[inline]
    pub fn width(&self) -> usize {
        self.width
    }

    #[inline]
    pub fn height(&self) -> usize {
        self.height
    }

    #[inline]
    pub fn get(&self, x: usize, y: usize) -> bool {
        let word = self.bits[y * self.row_words + x / 64];
        (word >> (x % 64)) & 1 == 1
    }

    #[inline]
    pub fn set(&mut self, x: usize, y: usize) {
        self.bits[y * self.row_words + x / 64] |= 1u64 << (x % 64);
    }

    /// Number of black modules.
    pub fn count_black(&self) -> usize {
        self.bits.iter().map(|w| w.count_ones() as usize).sum()
    }
}

/// Thresholding scheme applied to a luminance view.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Binarizer {
    /// Locally adaptive block thresholding.
    Hybrid,
    /// One histogram-derived threshold for the whole view.
    GlobalHistogram,
}

impl Binarizer {
    /// Threshold `luminance`; `None` when no usable black point exists
    /// (e.g. a flat, unimodal view).
    pub fn binarize(self, luminance: &LuminanceFrame) -> Option<BitMatrix> {
        match self {
            Self::Hybrid => hybrid_matrix(luminance),
            Self::GlobalHistogram => global_histogram_matrix(luminance),
        }
    }
}

/// A luminance view paired with the binarizer to apply to it.
///
/// The black matrix is computed on first request and cached, so decoders
/// that never look at it pay nothing.
#[derive(Debug)]
pub struct BinaryBitmap {
    luminance: LuminanceFrame,
    binarizer: Binarizer,
    matrix: OnceCell<Option<BitMatrix>>,
}

impl BinaryBitmap {
    pub fn new(luminance: LuminanceFrame, binarizer: Binarizer) -> Self {
        Self {
            luminance,
            binarizer,
            matrix: OnceCell::new(),
        }
    }

    #[inline]
    pub fn luminance(&self) -> &LuminanceFrame {
        &self.luminance
    }

    #[inline]
    pub fn binarizer(&self) -> Binarizer {
        self.binarizer
    }

    #[inline]
    pub fn width(&self) -> usize {
        self.luminance.width()
    }

    #[inline]
    pub fn height(&self) -> usize {
        self.luminance.height()
    }

    pub fn black_matrix(&self) -> Option<&BitMatrix> {
        self.matrix
            .get_or_init(|| self.binarizer.binarize(&self.luminance))
            .as_ref()
    }
}

fn global_histogram_matrix(luminance: &LuminanceFrame) -> Option<BitMatrix> {
    let width = luminance.width();
    let height = luminance.height();
    let mut buckets = [0u32; LUMINANCE_BUCKETS];
    let mut row = Vec::with_capacity(width);
    // Sample four rows across the middle three fifths of the view.
    for i in 1..5 {
        let y = height * i / 5;
        let samples = luminance.row(y, &mut row);
        let left = width / 5;
        let right = width * 4 / 5;
        for &v in &samples[left..right] {
            buckets[(v >> LUMINANCE_SHIFT) as usize] += 1;
        }
    }
    let black_point = estimate_black_point(&buckets)?;

    let samples = luminance.matrix();
    let mut matrix = BitMatrix::new(width, height);
    for y in 0..height {
        let offset = y * width;
        for x in 0..width {
            if samples[offset + x] < black_point {
                matrix.set(x, y);
            }
        }
    }
    Some(matrix)
}

/// Pick the valley between the two dominant histogram peaks.
pub(crate) fn estimate_black_point(buckets: &[u32; LUMINANCE_BUCKETS]) -> Option<u8> {
    let mut max_bucket_count = 0u32;
    let mut first_peak = 0usize;
    let mut first_peak_size = 0u32;
    for (x, &count) in buckets.iter().enumerate() {
        if count > first_peak_size {
            first_peak = x;
            first_peak_size = count;
        }
        max_bucket_count = max_bucket_count.max(count);
    }

    // The second peak should be both large and far from the first.
    let mut second_peak = 0usize;
    let mut second_peak_score = 0u64;
    for (x, &count) in buckets.iter().enumerate() {
        let distance = x.abs_diff(first_peak) as u64;
        let score = count as u64 * distance * distance;
        if score > second_peak_score {
            second_peak = x;
            second_peak_score = score;
        }
    }

    if first_peak > second_peak {
        std::mem::swap(&mut first_peak, &mut second_peak);
    }
    if second_peak - first_peak <= LUMINANCE_BUCKETS / 16 {
        return None;
    }

    let mut best_valley = second_peak - 1;
    let mut best_valley_score = -1i64;
    for x in (first_peak + 1..second_peak).rev() {
        let from_first = (x - first_peak) as i64;
        let score = from_first
            * from_first
            * (second_peak - x) as i64
            * (max_bucket_count - buckets[x]) as i64;
        if score > best_valley_score {
            best_valley = x;
            best_valley_score = score;
        }
    }
    Some((best_valley << LUMINANCE_SHIFT) as u8)
}

fn hybrid_matrix(luminance: &LuminanceFrame) -> Option<BitMatrix> {
    let width = luminance.width();
    let height = luminance.height();
    if width < MINIMUM_DIMENSION || height < MINIMUM_DIMENSION {
        return global_histogram_matrix(luminance);
    }
    let samples = luminance.matrix();
    let sub_width = (width >> BLOCK_SIZE_POWER) + usize::from(width & BLOCK_SIZE_MASK != 0);
    let sub_height = (height >> BLOCK_SIZE_POWER) + usize::from(height & BLOCK_SIZE_MASK != 0);
    let black_points = block_black_points(&samples, sub_width, sub_height, width, height);

    let mut matrix = BitMatrix::new(width, height);
    let max_y_offset = height - BLOCK_SIZE;
    let max_x_offset = width - BLOCK_SIZE;
    for y in 0..sub_height {
        let y_offset = (y << BLOCK_SIZE_POWER).min(max_y_offset);
        let top = cap(y, sub_height - 3);
        for x in 0..sub_width {
            let x_offset = (x << BLOCK_SIZE_POWER).min(max_x_offset);
            let left = cap(x, sub_width - 3);
            let mut sum = 0u32;
            for row in &black_points[top - 2..=top + 2] {
                sum += row[left - 2..=left + 2].iter().sum::<u32>();
            }
            let threshold = sum / 25;
            for yy in 0..BLOCK_SIZE {
                let offset = (y_offset + yy) * width + x_offset;
                for xx in 0..BLOCK_SIZE {
                    if u32::from(samples[offset + xx]) <= threshold {
                        matrix.set(x_offset + xx, y_offset + yy);
                    }
                }
            }
        }
    }
    Some(matrix)
}

#[inline]
fn cap(value: usize, max: usize) -> usize {
    if value < 2 {
        2
    } else {
        value.min(max)
    }
}

/// Per-block black points.
///
/// Low-contrast blocks get `min / 2` (they are assumed white) unless their
/// already-computed neighbours suggest a darker region, in which case the
/// neighbour estimate is reused so a block inside a large dark module is not
/// mistaken for background.
fn block_black_points(
    samples: &[u8],
    sub_width: usize,
    sub_height: usize,
    width: usize,
    height: usize,
) -> Vec<Vec<u32>> {
    let max_y_offset = height - BLOCK_SIZE;
    let max_x_offset = width - BLOCK_SIZE;
    let mut black_points = vec![vec![0u32; sub_width]; sub_height];
    for y in 0..sub_height {
        let y_offset = (y << BLOCK_SIZE_POWER).min(max_y_offset);
        for x in 0..sub_width {
            let x_offset = (x << BLOCK_SIZE_POWER).min(max_x_offset);
            let mut sum = 0u32;
            let mut min = u32::from(u8::MAX);
            let mut max = 0u32;
            let mut yy = 0;
            while yy < BLOCK_SIZE {
                let offset = (y_offset + yy) * width + x_offset;
                for &v in &samples[offset..offset + BLOCK_SIZE] {
                    let v = u32::from(v);
                    sum += v;
                    min = min.min(v);
                    max = max.max(v);
                }
                yy += 1;
                if max - min > MIN_DYNAMIC_RANGE {
                    // Contrast is established; only the sum is still needed.
                    while yy < BLOCK_SIZE {
                        let offset = (y_offset + yy) * width + x_offset;
                        sum += samples[offset..offset + BLOCK_SIZE]
                            .iter()
                            .map(|&v| u32::from(v))
                            .sum::<u32>();
                        yy += 1;
                    }
                }
            }

            let mut average = sum >> (BLOCK_SIZE_POWER * 2);
            if max - min <= MIN_DYNAMIC_RANGE {
                average = min / 2;
                if y > 0 && x > 0 {
                    let neighbours = (black_points[y - 1][x]
                        + 2 * black_points[y][x - 1]
                        + black_points[y - 1][x - 1])
                        / 4;
                    if min < neighbours {
                        average = neighbours;
                    }
                }
            }
            black_points[y][x] = average;
        }
    }
    black_points
}
