//! Separable box blur for the shadow mask.
//!
//! Two one-dimensional passes: horizontal from the mask into a scratch
//! plane, then vertical from the scratch plane back into the mask. Windows
//! are clamped at the frame edges and averaged over the taps that exist.
//!
//! Most of a typical mask is fully lit (1.0). A row (horizontal pass) or a
//! column (vertical pass) that is uniformly lit is written straight through
//! without summing, which also keeps those pixels at exactly 1.0.

use crate::scheduler::{run_bands, WorkerPool};

/// Blurs `mask` in place with a `(2 * radius + 1)`-tap box filter per axis.
///
/// `scratch` must be the same size as `mask`. Rows are processed in bands of
/// `band_rows` on `pool` when one is given.
pub fn separable_box_blur(
    mask: &mut [f32],
    scratch: &mut [f32],
    width: usize,
    radius: usize,
    pool: Option<&WorkerPool>,
    band_rows: usize,
) {
    if width == 0 || mask.is_empty() {
        return;
    }
    debug_assert_eq!(mask.len(), scratch.len());
    let height = mask.len() / width;
    let chunk = band_rows.max(1) * width;

    {
        let src: &[f32] = mask;
        let bands: Vec<(usize, &mut [f32])> = scratch.chunks_mut(chunk).enumerate().collect();
        run_bands(pool, bands, |(band, dst)| {
            let y0 = band * band_rows.max(1);
            for (dy, dst_row) in dst.chunks_mut(width).enumerate() {
                let start = (y0 + dy) * width;
                horizontal_row(&src[start..start + width], dst_row, radius);
            }
        });
    }

    let column_lit: Vec<bool> = (0..width)
        .map(|x| (0..height).all(|y| scratch[y * width + x] == 1.0))
        .collect();

    let src: &[f32] = scratch;
    let bands: Vec<(usize, &mut [f32])> = mask.chunks_mut(chunk).enumerate().collect();
    run_bands(pool, bands, |(band, dst)| {
        let y0 = band * band_rows.max(1);
        for (dy, dst_row) in dst.chunks_mut(width).enumerate() {
            vertical_row(src, dst_row, &column_lit, y0 + dy, width, height, radius);
        }
    });
}

fn horizontal_row(src: &[f32], dst: &mut [f32], radius: usize) {
    if src.iter().all(|&v| v == 1.0) {
        dst.fill(1.0);
        return;
    }
    let last = src.len() - 1;
    for (x, out) in dst.iter_mut().enumerate() {
        let lo = x.saturating_sub(radius);
        let hi = (x + radius).min(last);
        let sum: f32 = src[lo..=hi].iter().sum();
        *out = sum / (hi - lo + 1) as f32;
    }
}

fn vertical_row(
    src: &[f32],
    dst: &mut [f32],
    column_lit: &[bool],
    y: usize,
    width: usize,
    height: usize,
    radius: usize,
) {
    let lo = y.saturating_sub(radius);
    let hi = (y + radius).min(height - 1);
    let taps = (hi - lo + 1) as f32;
    for (x, out) in dst.iter_mut().enumerate() {
        if column_lit[x] {
            *out = 1.0;
            continue;
        }
        let sum: f32 = (lo..=hi).map(|yy| src[yy * width + x]).sum();
        *out = sum / taps;
    }
}
