//! Four-wide normalize / reflect used by the rasterizer's reflection channel.
//!
//! The scalar functions are the reference semantics. The batched functions
//! process four vectors in structure-of-arrays form; on x86_64 they use SSE
//! with a Newton-refined reciprocal square root, elsewhere a plain lane loop
//! that the compiler can vectorize. Both agree with the scalar path to within
//! a few ulps of `f32` on unit vectors.
//!
//! Vectors whose squared length is below `f32::MIN_POSITIVE` pass through
//! unchanged on every path.

use super::vec3::Vec3;

/// Scalar reference: `normalize(v)`.
#[inline]
pub fn normalize(v: Vec3) -> Vec3 {
    v.normalize()
}

/// Scalar reference: `normalize(reflect(v, n))`.
#[inline]
pub fn reflect_normalize(v: Vec3, n: Vec3) -> Vec3 {
    v.reflect(n).normalize()
}

/// Normalizes four vectors in place.
#[cfg(target_arch = "x86_64")]
#[inline]
pub fn normalize4(v: &mut [Vec3; 4]) {
    // SAFETY: SSE2 is part of the x86_64 baseline.
    unsafe { sse::normalize4(v) }
}

/// Reflects four vectors about the same normal `n`, then normalizes them.
#[cfg(target_arch = "x86_64")]
#[inline]
pub fn reflect_normalize4(v: &[Vec3; 4], n: Vec3) -> [Vec3; 4] {
    // SAFETY: SSE2 is part of the x86_64 baseline.
    unsafe { sse::reflect_normalize4(v, n) }
}

/// Normalizes four vectors in place.
#[cfg(not(target_arch = "x86_64"))]
#[inline]
pub fn normalize4(v: &mut [Vec3; 4]) {
    lanes::normalize4(v)
}

/// Reflects four vectors about the same normal `n`, then normalizes them.
#[cfg(not(target_arch = "x86_64"))]
#[inline]
pub fn reflect_normalize4(v: &[Vec3; 4], n: Vec3) -> [Vec3; 4] {
    lanes::reflect_normalize4(v, n)
}

#[cfg(any(not(target_arch = "x86_64"), test))]
mod lanes {
    use super::Vec3;

    struct Soa {
        x: [f32; 4],
        y: [f32; 4],
        z: [f32; 4],
    }

    impl Soa {
        fn load(v: &[Vec3; 4]) -> Self {
            Self {
                x: [v[0].x, v[1].x, v[2].x, v[3].x],
                y: [v[0].y, v[1].y, v[2].y, v[3].y],
                z: [v[0].z, v[1].z, v[2].z, v[3].z],
            }
        }

        fn normalize(&mut self) {
            for k in 0..4 {
                let ls = self.x[k] * self.x[k] + self.y[k] * self.y[k] + self.z[k] * self.z[k];
                if ls >= f32::MIN_POSITIVE {
                    let inv = 1.0 / ls.sqrt();
                    self.x[k] *= inv;
                    self.y[k] *= inv;
                    self.z[k] *= inv;
                }
            }
        }

        fn store(&self) -> [Vec3; 4] {
            std::array::from_fn(|k| Vec3::new(self.x[k], self.y[k], self.z[k]))
        }
    }

    pub fn normalize4(v: &mut [Vec3; 4]) {
        let mut soa = Soa::load(v);
        soa.normalize();
        *v = soa.store();
    }

    pub fn reflect_normalize4(v: &[Vec3; 4], n: Vec3) -> [Vec3; 4] {
        let mut soa = Soa::load(v);
        for k in 0..4 {
            let td = 2.0 * (n.x * soa.x[k] + n.y * soa.y[k] + n.z * soa.z[k]);
            soa.x[k] -= td * n.x;
            soa.y[k] -= td * n.y;
            soa.z[k] -= td * n.z;
        }
        soa.normalize();
        soa.store()
    }
}

#[cfg(target_arch = "x86_64")]
mod sse {
    use std::arch::x86_64::*;

    use super::Vec3;

    #[inline(always)]
    unsafe fn load(v: &[Vec3; 4]) -> (__m128, __m128, __m128) {
        (
            _mm_set_ps(v[3].x, v[2].x, v[1].x, v[0].x),
            _mm_set_ps(v[3].y, v[2].y, v[1].y, v[0].y),
            _mm_set_ps(v[3].z, v[2].z, v[1].z, v[0].z),
        )
    }

    #[inline(always)]
    unsafe fn store(x: __m128, y: __m128, z: __m128) -> [Vec3; 4] {
        let mut xb = [0.0f32; 4];
        let mut yb = [0.0f32; 4];
        let mut zb = [0.0f32; 4];
        _mm_storeu_ps(xb.as_mut_ptr(), x);
        _mm_storeu_ps(yb.as_mut_ptr(), y);
        _mm_storeu_ps(zb.as_mut_ptr(), z);
        std::array::from_fn(|k| Vec3::new(xb[k], yb[k], zb[k]))
    }

    /// `1/sqrt(ls)` per lane, one Newton-Raphson step on top of `rsqrtps`.
    /// Lanes below `f32::MIN_POSITIVE` get a scale of exactly 1.0.
    #[inline(always)]
    unsafe fn inv_length(ls: __m128) -> __m128 {
        let half = _mm_set1_ps(0.5);
        let three = _mm_set1_ps(3.0);
        let approx = _mm_rsqrt_ps(ls);
        let refined = _mm_mul_ps(
            _mm_mul_ps(half, approx),
            _mm_sub_ps(three, _mm_mul_ps(_mm_mul_ps(ls, approx), approx)),
        );
        let usable = _mm_cmpge_ps(ls, _mm_set1_ps(f32::MIN_POSITIVE));
        _mm_or_ps(
            _mm_and_ps(usable, refined),
            _mm_andnot_ps(usable, _mm_set1_ps(1.0)),
        )
    }

    #[inline(always)]
    unsafe fn length_sq(x: __m128, y: __m128, z: __m128) -> __m128 {
        _mm_add_ps(
            _mm_add_ps(_mm_mul_ps(x, x), _mm_mul_ps(y, y)),
            _mm_mul_ps(z, z),
        )
    }

    pub unsafe fn normalize4(v: &mut [Vec3; 4]) {
        let (x, y, z) = load(v);
        let inv = inv_length(length_sq(x, y, z));
        *v = store(_mm_mul_ps(x, inv), _mm_mul_ps(y, inv), _mm_mul_ps(z, inv));
    }

    pub unsafe fn reflect_normalize4(v: &[Vec3; 4], n: Vec3) -> [Vec3; 4] {
        let nx = _mm_set1_ps(n.x);
        let ny = _mm_set1_ps(n.y);
        let nz = _mm_set1_ps(n.z);
        let (vx, vy, vz) = load(v);

        let dot = _mm_add_ps(
            _mm_add_ps(_mm_mul_ps(nx, vx), _mm_mul_ps(ny, vy)),
            _mm_mul_ps(nz, vz),
        );
        let td = _mm_mul_ps(_mm_set1_ps(2.0), dot);
        let rx = _mm_sub_ps(vx, _mm_mul_ps(td, nx));
        let ry = _mm_sub_ps(vy, _mm_mul_ps(td, ny));
        let rz = _mm_sub_ps(vz, _mm_mul_ps(td, nz));

        let inv = inv_length(length_sq(rx, ry, rz));
        store(_mm_mul_ps(rx, inv), _mm_mul_ps(ry, inv), _mm_mul_ps(rz, inv))
    }
}
