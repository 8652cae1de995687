//! Per-frame state: camera, light and every per-pixel buffer.
//!
//! [`FrameContext`] owns all pixel planes in 64-byte aligned storage. Stages
//! borrow it explicitly and document which planes they write:
//!
//! | plane            | written by                 | read by                    |
//! |------------------|----------------------------|----------------------------|
//! | color            | rasterizer, composite      | presentation               |
//! | depth            | rasterizer                 | shadow stage, debug views  |
//! | normal, position | rasterizer                 | shadow stage               |
//! | reflect          | rasterizer                 | shadow stage               |
//! | shadow scratch   | shadow stage (recompute)   | blur                       |
//! | shadow cache     | blur (swap)                | composite, every frame     |
//! | reflect cache    | shadow stage (recompute)   | composite, every frame     |
//!
//! Parallel phases never share a pixel: the frame is cut into horizontal
//! bands of whole rows ([`GBufferRows`], [`ShadowRows`]) and each band goes
//! to exactly one worker.

use std::alloc::{self, Layout};
use std::ops::{Deref, DerefMut};
use std::ptr::NonNull;

use bytemuck::Pod;

use crate::camera::{Camera, CameraBasis};
use crate::colors;
use crate::error::RenderError;
use crate::light::DirectionalLight;
use crate::math::Vec3;

/// Depth of a pixel no fragment has covered this frame.
pub const DEPTH_EMPTY: f32 = f32::MAX;

/// Surfaces with a normal `y` below this are not "upward facing" and are
/// skipped by the shadow/reflection stage.
pub const UPWARD_THRESHOLD: f32 = 0.5;

/// True for pixels a fragment was written to this frame.
#[inline]
pub fn has_depth(depth: f32) -> bool {
    depth > 0.0 && depth < DEPTH_EMPTY
}

/// Zero-initialised heap storage aligned to [`AlignedBuffer::ALIGN`] bytes.
pub struct AlignedBuffer<T: Pod> {
    ptr: NonNull<T>,
    len: usize,
    layout: Layout,
}

// SAFETY: the buffer uniquely owns its allocation, like `Box<[T]>`.
unsafe impl<T: Pod + Send> Send for AlignedBuffer<T> {}
unsafe impl<T: Pod + Sync> Sync for AlignedBuffer<T> {}

impl<T: Pod> AlignedBuffer<T> {
    pub const ALIGN: usize = 64;

    /// Allocates `len` zeroed elements.
    pub fn zeroed(len: usize, what: &'static str) -> Result<Self, RenderError> {
        let alloc_error = || RenderError::Allocation {
            what,
            bytes: len.saturating_mul(std::mem::size_of::<T>()),
        };
        let layout = Layout::array::<T>(len)
            .and_then(|layout| layout.align_to(Self::ALIGN))
            .map_err(|_| alloc_error())?;

        if layout.size() == 0 {
            return Ok(Self {
                ptr: NonNull::dangling(),
                len,
                layout,
            });
        }

        // SAFETY: `layout` has a non-zero size.
        let raw = unsafe { alloc::alloc_zeroed(layout) }.cast::<T>();
        let ptr = NonNull::new(raw).ok_or_else(alloc_error)?;
        log::debug!("allocated {what}: {} bytes", layout.size());
        Ok(Self { ptr, len, layout })
    }

    /// Allocates `len` elements set to `value`.
    pub fn filled(len: usize, value: T, what: &'static str) -> Result<Self, RenderError> {
        let mut buffer = Self::zeroed(len, what)?;
        buffer.fill(value);
        Ok(buffer)
    }
}

impl<T: Pod> Deref for AlignedBuffer<T> {
    type Target = [T];

    fn deref(&self) -> &[T] {
        // SAFETY: `ptr` is valid for `len` initialised elements (all-zero is
        // a valid `Pod` value) or dangling with `len * size_of::<T>() == 0`.
        unsafe { std::slice::from_raw_parts(self.ptr.as_ptr(), self.len) }
    }
}

impl<T: Pod> DerefMut for AlignedBuffer<T> {
    fn deref_mut(&mut self) -> &mut [T] {
        // SAFETY: as in `deref`, and `&mut self` guarantees uniqueness.
        unsafe { std::slice::from_raw_parts_mut(self.ptr.as_ptr(), self.len) }
    }
}

impl<T: Pod> Drop for AlignedBuffer<T> {
    fn drop(&mut self) {
        if self.layout.size() != 0 {
            // SAFETY: allocated in `zeroed` with this exact layout.
            unsafe { alloc::dealloc(self.ptr.as_ptr().cast(), self.layout) }
        }
    }
}

/// Which buffer to show in place of the final image.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DebugView {
    #[default]
    Color,
    Normals,
    Depth,
    Reflection,
    ShadowMask,
}

impl DebugView {
    /// Cycles through the views in declaration order.
    pub fn next(self) -> Self {
        match self {
            DebugView::Color => DebugView::Normals,
            DebugView::Normals => DebugView::Depth,
            DebugView::Depth => DebugView::Reflection,
            DebugView::Reflection => DebugView::ShadowMask,
            DebugView::ShadowMask => DebugView::Color,
        }
    }
}

impl std::fmt::Display for DebugView {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            DebugView::Color => "color",
            DebugView::Normals => "normals",
            DebugView::Depth => "depth",
            DebugView::Reflection => "reflection",
            DebugView::ShadowMask => "shadow mask",
        };
        f.write_str(name)
    }
}

/// Mutable view of a band of whole rows of the rasterizer's outputs.
pub struct GBufferRows<'a> {
    /// First frame row in this band.
    pub y0: usize,
    pub rows: usize,
    pub width: usize,
    pub color: &'a mut [u32],
    pub depth: &'a mut [f32],
    pub normal: &'a mut [Vec3],
    pub position: &'a mut [Vec3],
    pub reflect: &'a mut [Vec3],
}

/// Read-only view of the rasterizer's outputs.
#[derive(Clone, Copy)]
pub struct GBuffer<'a> {
    pub width: usize,
    pub height: usize,
    pub depth: &'a [f32],
    pub normal: &'a [Vec3],
    pub position: &'a [Vec3],
    pub reflect: &'a [Vec3],
}

/// Mutable view of a band of the shadow stage's recompute targets.
pub struct ShadowRows<'a> {
    pub y0: usize,
    pub rows: usize,
    pub mask: &'a mut [f32],
    pub reflect_cache: &'a mut [u32],
}

/// Camera, light and all per-pixel planes for one render target.
pub struct FrameContext {
    width: usize,
    height: usize,
    pub camera: Camera,
    pub light: DirectionalLight,
    basis: CameraBasis,
    color: AlignedBuffer<u32>,
    depth: AlignedBuffer<f32>,
    normal: AlignedBuffer<Vec3>,
    position: AlignedBuffer<Vec3>,
    reflect: AlignedBuffer<Vec3>,
    shadow_scratch: AlignedBuffer<f32>,
    blur_scratch: AlignedBuffer<f32>,
    shadow_cache: AlignedBuffer<f32>,
    reflect_cache: AlignedBuffer<u32>,
    frame_counter: u64,
}

impl FrameContext {
    pub fn new(
        width: u32,
        height: u32,
        camera: Camera,
        light: DirectionalLight,
    ) -> Result<Self, RenderError> {
        if width == 0 || height == 0 {
            return Err(RenderError::InvalidDimensions { width, height });
        }
        let (w, h) = (width as usize, height as usize);
        let n = w
            .checked_mul(h)
            .ok_or(RenderError::InvalidDimensions { width, height })?;

        Ok(Self {
            width: w,
            height: h,
            camera,
            light,
            basis: camera.basis(w, h),
            color: AlignedBuffer::zeroed(n, "color buffer")?,
            depth: AlignedBuffer::filled(n, DEPTH_EMPTY, "depth buffer")?,
            normal: AlignedBuffer::zeroed(n, "normal buffer")?,
            position: AlignedBuffer::zeroed(n, "position buffer")?,
            reflect: AlignedBuffer::zeroed(n, "reflection buffer")?,
            shadow_scratch: AlignedBuffer::filled(n, 1.0, "shadow scratch")?,
            blur_scratch: AlignedBuffer::zeroed(n, "blur scratch")?,
            shadow_cache: AlignedBuffer::filled(n, 1.0, "shadow cache")?,
            reflect_cache: AlignedBuffer::zeroed(n, "reflection cache")?,
            frame_counter: 0,
        })
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn pixel_count(&self) -> usize {
        self.width * self.height
    }

    /// Per-frame camera basis, refreshed by [`FrameContext::prepare`].
    pub fn basis(&self) -> &CameraBasis {
        &self.basis
    }

    /// Derives this frame's camera basis from [`FrameContext::camera`].
    pub fn prepare(&mut self) {
        self.basis = self.camera.basis(self.width, self.height);
    }

    /// Resets the rasterizer outputs. The temporal caches are kept.
    pub fn clear(&mut self, clear_color: u32) {
        self.color.fill(clear_color);
        self.depth.fill(DEPTH_EMPTY);
        self.normal.fill(Vec3::ZERO);
        self.position.fill(Vec3::ZERO);
        self.reflect.fill(Vec3::ZERO);
    }

    /// Forgets the cached shadow mask and reflections and restarts the
    /// recompute cadence, so the next post-process recomputes.
    pub fn reset_temporal(&mut self) {
        self.shadow_cache.fill(1.0);
        self.reflect_cache.fill(0);
        self.frame_counter = 0;
    }

    pub fn color(&self) -> &[u32] {
        &self.color
    }

    pub fn color_mut(&mut self) -> &mut [u32] {
        &mut self.color
    }

    pub fn depth(&self) -> &[f32] {
        &self.depth
    }

    pub fn normals(&self) -> &[Vec3] {
        &self.normal
    }

    pub fn positions(&self) -> &[Vec3] {
        &self.position
    }

    pub fn reflections(&self) -> &[Vec3] {
        &self.reflect
    }

    pub fn shadow_cache(&self) -> &[f32] {
        &self.shadow_cache
    }

    pub fn reflect_cache(&self) -> &[u32] {
        &self.reflect_cache
    }

    pub fn frame_counter(&self) -> u64 {
        self.frame_counter
    }

    /// Returns the current counter value and advances it.
    pub(crate) fn advance_frame_counter(&mut self) -> u64 {
        let current = self.frame_counter;
        self.frame_counter = self.frame_counter.wrapping_add(1);
        current
    }

    /// The color buffer as ARGB8888 bytes for presentation.
    pub fn color_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.color)
    }

    /// Value at pixel `(x, y)` of the color buffer.
    pub fn pixel(&self, x: usize, y: usize) -> Option<u32> {
        (x < self.width && y < self.height).then(|| self.color[y * self.width + x])
    }

    /// Splits the rasterizer outputs into bands of `band_rows` rows.
    pub fn gbuffer_bands(&mut self, band_rows: usize) -> Vec<GBufferRows<'_>> {
        let width = self.width;
        let chunk = band_rows.max(1) * width;
        self.color
            .chunks_mut(chunk)
            .zip(self.depth.chunks_mut(chunk))
            .zip(self.normal.chunks_mut(chunk))
            .zip(self.position.chunks_mut(chunk))
            .zip(self.reflect.chunks_mut(chunk))
            .enumerate()
            .map(
                |(i, ((((color, depth), normal), position), reflect))| GBufferRows {
                    y0: i * band_rows.max(1),
                    rows: color.len() / width,
                    width,
                    color,
                    depth,
                    normal,
                    position,
                    reflect,
                },
            )
            .collect()
    }

    /// The whole frame as a single band.
    pub fn gbuffer_rows(&mut self) -> GBufferRows<'_> {
        GBufferRows {
            y0: 0,
            rows: self.height,
            width: self.width,
            color: &mut self.color,
            depth: &mut self.depth,
            normal: &mut self.normal,
            position: &mut self.position,
            reflect: &mut self.reflect,
        }
    }

    /// Shared G-buffer plus recompute targets split into bands of
    /// `band_rows` rows.
    pub(crate) fn shadow_bands(&mut self, band_rows: usize) -> (GBuffer<'_>, Vec<ShadowRows<'_>>) {
        let width = self.width;
        let band_rows = band_rows.max(1);
        let chunk = band_rows * width;
        let gbuffer = GBuffer {
            width,
            height: self.height,
            depth: &self.depth,
            normal: &self.normal,
            position: &self.position,
            reflect: &self.reflect,
        };
        let bands = self
            .shadow_scratch
            .chunks_mut(chunk)
            .zip(self.reflect_cache.chunks_mut(chunk))
            .enumerate()
            .map(|(i, (mask, reflect_cache))| ShadowRows {
                y0: i * band_rows,
                rows: mask.len() / width,
                mask,
                reflect_cache,
            })
            .collect();
        (gbuffer, bands)
    }

    /// `(mask, blur scratch)` for the separable blur.
    pub(crate) fn blur_targets(&mut self) -> (&mut [f32], &mut [f32]) {
        (&mut self.shadow_scratch, &mut self.blur_scratch)
    }

    /// Promotes the freshly blurred mask to the shadow cache.
    pub(crate) fn swap_shadow_cache(&mut self) {
        std::mem::swap(&mut self.shadow_scratch, &mut self.shadow_cache);
    }

    /// `(color, shadow cache, reflect cache)` for compositing.
    pub(crate) fn composite_targets(&mut self) -> (&mut [u32], &[f32], &[u32]) {
        (&mut self.color, &self.shadow_cache, &self.reflect_cache)
    }

    /// Overwrites the color buffer with a visualisation of another plane.
    pub fn visualize(&mut self, view: DebugView) {
        let to_color = |v: Vec3| colors::pack_rgb(v * 0.5 + Vec3::splat(0.5));
        match view {
            DebugView::Color => {}
            DebugView::Normals => {
                for (c, &n) in self.color.iter_mut().zip(self.normal.iter()) {
                    *c = to_color(n);
                }
            }
            DebugView::Reflection => {
                for (c, &r) in self.color.iter_mut().zip(self.reflect.iter()) {
                    *c = to_color(r);
                }
            }
            DebugView::Depth => {
                let (lo, hi) = self
                    .depth
                    .iter()
                    .copied()
                    .filter(|&d| has_depth(d))
                    .fold((f32::MAX, 0.0f32), |(lo, hi), d| (lo.min(d), hi.max(d)));
                let range = if hi - lo < 1e-6 { 1.0 } else { hi - lo };
                for (c, &d) in self.color.iter_mut().zip(self.depth.iter()) {
                    // Near is bright.
                    let t = if has_depth(d) { 1.0 - (d - lo) / range } else { 0.0 };
                    *c = colors::pack_rgb(Vec3::splat(t));
                }
            }
            DebugView::ShadowMask => {
                for (c, &s) in self.color.iter_mut().zip(self.shadow_cache.iter()) {
                    *c = colors::pack_rgb(Vec3::splat(s));
                }
            }
        }
    }
}
