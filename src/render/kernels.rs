//! Compositing kernels.
//!
//! Each kernel works in place on the byte view of two render targets, four
//! bytes per entry in RGBA order. Every implementation produces exactly the
//! same bytes as the plain one:
//!
//! - blend: `alpha = s.a + (s.a != 0)`, then `d = (d * (256 - alpha) + s * alpha) / 256`
//! - multiply: `d = d * (s + 1) / 256`
//!
//! The fastest implementation the CPU supports is picked once per process.

use std::sync::OnceLock;

use tracing::debug;

/// In-place kernel over two byte streams
pub type KernelFn = fn(&mut [u8], &[u8]);

/// One set of compositing kernels
#[derive(Debug, Clone, Copy)]
pub struct Kernels {
    pub name: &'static str,
    pub blend: KernelFn,
    pub multiply: KernelFn,
}

pub const PLAIN: Kernels = Kernels {
    name: "plain",
    blend: plain::blend,
    multiply: plain::multiply,
};

static SELECTED: OnceLock<Kernels> = OnceLock::new();

/// Kernels for this CPU, probed on first use
pub fn kernels() -> &'static Kernels {
    SELECTED.get_or_init(|| {
        let selected = available().into_iter().last().unwrap_or(PLAIN);
        debug!("Using {} compositing kernels", selected.name);
        selected
    })
}

/// Every kernel set this CPU can run, slowest first
pub fn available() -> Vec<Kernels> {
    #[allow(unused_mut)]
    let mut list = vec![PLAIN];
    #[cfg(target_arch = "x86_64")]
    {
        if is_x86_feature_detected!("sse2") {
            list.push(x86::SSE2);
        }
        if is_x86_feature_detected!("avx2") {
            list.push(x86::AVX2);
        }
    }
    list
}

mod plain {
    pub fn blend(dst: &mut [u8], src: &[u8]) {
        for (d, s) in dst.chunks_exact_mut(4).zip(src.chunks_exact(4)) {
            let alpha = s[3] as u32 + (s[3] != 0) as u32;
            for i in 0..4 {
                d[i] = ((d[i] as u32 * (256 - alpha) + s[i] as u32 * alpha) / 256) as u8;
            }
        }
    }

    pub fn multiply(dst: &mut [u8], src: &[u8]) {
        for (d, s) in dst.iter_mut().zip(src) {
            *d = (*d as u32 * (*s as u32 + 1) / 256) as u8;
        }
    }
}

#[cfg(target_arch = "x86_64")]
mod x86 {
    use std::arch::x86_64::*;

    use super::{plain, Kernels};

    pub const SSE2: Kernels = Kernels {
        name: "sse2",
        blend: blend_sse2,
        multiply: multiply_sse2,
    };

    pub const AVX2: Kernels = Kernels {
        name: "avx2",
        blend: blend_avx2,
        multiply: multiply_avx2,
    };

    // These wrappers are only reachable through `available()`, which has
    // already checked the CPU features they need.

    fn blend_sse2(dst: &mut [u8], src: &[u8]) {
        let done = unsafe { sse2::blend(dst, src) };
        plain::blend(&mut dst[done..], &src[done.min(src.len())..]);
    }

    fn multiply_sse2(dst: &mut [u8], src: &[u8]) {
        let done = unsafe { sse2::multiply(dst, src) };
        plain::multiply(&mut dst[done..], &src[done.min(src.len())..]);
    }

    fn blend_avx2(dst: &mut [u8], src: &[u8]) {
        let done = unsafe { avx2::blend(dst, src) };
        plain::blend(&mut dst[done..], &src[done.min(src.len())..]);
    }

    fn multiply_avx2(dst: &mut [u8], src: &[u8]) {
        let done = unsafe { avx2::multiply(dst, src) };
        plain::multiply(&mut dst[done..], &src[done.min(src.len())..]);
    }

    mod sse2 {
        use super::*;

        const WIDTH: usize = 16;

        /// Blend whole 16-byte blocks; returns the number of bytes processed.
        #[target_feature(enable = "sse2")]
        pub unsafe fn blend(dst: &mut [u8], src: &[u8]) -> usize {
            let n = dst.len().min(src.len()) / WIDTH * WIDTH;
            let zero = _mm_setzero_si128();
            let one = _mm_set1_epi16(1);
            let full = _mm_set1_epi16(256);

            for offset in (0..n).step_by(WIDTH) {
                let d = _mm_loadu_si128(dst.as_ptr().add(offset) as *const __m128i);
                let s = _mm_loadu_si128(src.as_ptr().add(offset) as *const __m128i);

                let mut halves = [
                    (_mm_unpacklo_epi8(d, zero), _mm_unpacklo_epi8(s, zero)),
                    (_mm_unpackhi_epi8(d, zero), _mm_unpackhi_epi8(s, zero)),
                ];
                for (d16, s16) in halves.iter_mut() {
                    // Broadcast each pixel's alpha over its four lanes
                    let alpha = _mm_shufflehi_epi16::<0xff>(_mm_shufflelo_epi16::<0xff>(*s16));
                    // cmpeq yields -1 where alpha is zero, so this adds 1 elsewhere
                    let alpha = _mm_add_epi16(
                        alpha,
                        _mm_add_epi16(_mm_cmpeq_epi16(alpha, zero), one),
                    );
                    let inverse = _mm_sub_epi16(full, alpha);
                    let sum = _mm_add_epi16(
                        _mm_mullo_epi16(*d16, inverse),
                        _mm_mullo_epi16(*s16, alpha),
                    );
                    *d16 = _mm_srli_epi16::<8>(sum);
                }

                let out = _mm_packus_epi16(halves[0].0, halves[1].0);
                _mm_storeu_si128(dst.as_mut_ptr().add(offset) as *mut __m128i, out);
            }
            n
        }

        #[target_feature(enable = "sse2")]
        pub unsafe fn multiply(dst: &mut [u8], src: &[u8]) -> usize {
            let n = dst.len().min(src.len()) / WIDTH * WIDTH;
            let zero = _mm_setzero_si128();
            let one = _mm_set1_epi16(1);

            for offset in (0..n).step_by(WIDTH) {
                let d = _mm_loadu_si128(dst.as_ptr().add(offset) as *const __m128i);
                let s = _mm_loadu_si128(src.as_ptr().add(offset) as *const __m128i);

                let lo = _mm_mullo_epi16(
                    _mm_unpacklo_epi8(d, zero),
                    _mm_add_epi16(_mm_unpacklo_epi8(s, zero), one),
                );
                let hi = _mm_mullo_epi16(
                    _mm_unpackhi_epi8(d, zero),
                    _mm_add_epi16(_mm_unpackhi_epi8(s, zero), one),
                );
                let out = _mm_packus_epi16(_mm_srli_epi16::<8>(lo), _mm_srli_epi16::<8>(hi));
                _mm_storeu_si128(dst.as_mut_ptr().add(offset) as *mut __m128i, out);
            }
            n
        }
    }

    mod avx2 {
        use super::*;

        const WIDTH: usize = 32;

        // Unpack and pack both work within 128-bit halves, so pixel order
        // comes back unchanged.

        #[target_feature(enable = "avx2")]
        pub unsafe fn blend(dst: &mut [u8], src: &[u8]) -> usize {
            let n = dst.len().min(src.len()) / WIDTH * WIDTH;
            let zero = _mm256_setzero_si256();
            let one = _mm256_set1_epi16(1);
            let full = _mm256_set1_epi16(256);

            for offset in (0..n).step_by(WIDTH) {
                let d = _mm256_loadu_si256(dst.as_ptr().add(offset) as *const __m256i);
                let s = _mm256_loadu_si256(src.as_ptr().add(offset) as *const __m256i);

                let mut halves = [
                    (_mm256_unpacklo_epi8(d, zero), _mm256_unpacklo_epi8(s, zero)),
                    (_mm256_unpackhi_epi8(d, zero), _mm256_unpackhi_epi8(s, zero)),
                ];
                for (d16, s16) in halves.iter_mut() {
                    let alpha =
                        _mm256_shufflehi_epi16::<0xff>(_mm256_shufflelo_epi16::<0xff>(*s16));
                    let alpha = _mm256_add_epi16(
                        alpha,
                        _mm256_add_epi16(_mm256_cmpeq_epi16(alpha, zero), one),
                    );
                    let inverse = _mm256_sub_epi16(full, alpha);
                    let sum = _mm256_add_epi16(
                        _mm256_mullo_epi16(*d16, inverse),
                        _mm256_mullo_epi16(*s16, alpha),
                    );
                    *d16 = _mm256_srli_epi16::<8>(sum);
                }

                let out = _mm256_packus_epi16(halves[0].0, halves[1].0);
                _mm256_storeu_si256(dst.as_mut_ptr().add(offset) as *mut __m256i, out);
            }
            n
        }

        #[target_feature(enable = "avx2")]
        pub unsafe fn multiply(dst: &mut [u8], src: &[u8]) -> usize {
            let n = dst.len().min(src.len()) / WIDTH * WIDTH;
            let zero = _mm256_setzero_si256();
            let one = _mm256_set1_epi16(1);

            for offset in (0..n).step_by(WIDTH) {
                let d = _mm256_loadu_si256(dst.as_ptr().add(offset) as *const __m256i);
                let s = _mm256_loadu_si256(src.as_ptr().add(offset) as *const __m256i);

                let lo = _mm256_mullo_epi16(
                    _mm256_unpacklo_epi8(d, zero),
                    _mm256_add_epi16(_mm256_unpacklo_epi8(s, zero), one),
                );
                let hi = _mm256_mullo_epi16(
                    _mm256_unpackhi_epi8(d, zero),
                    _mm256_add_epi16(_mm256_unpackhi_epi8(s, zero), one),
                );
                let out = _mm256_packus_epi16(
                    _mm256_srli_epi16::<8>(lo),
                    _mm256_srli_epi16::<8>(hi),
                );
                _mm256_storeu_si256(dst.as_mut_ptr().add(offset) as *mut __m256i, out);
            }
            n
        }
    }
}
