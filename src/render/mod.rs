//! Render targets and compositing.
//!
//! A [`RenderTarget`] holds one [`RgbaColor`] per key. Storage is padded to a
//! multiple of [`ALIGNMENT`] entries and aligned on 32 bytes so the SIMD
//! kernels can walk whole vectors without a tail loop. Padding entries are
//! never sent to a device.

pub mod kernels;

use zerocopy::{FromBytes, Immutable, IntoBytes, KnownLayout};

use crate::color::RgbaColor;

pub use kernels::{kernels, Kernels};

/// Number of entries per storage lane
pub const ALIGNMENT: usize = 8;

/// One 32-byte aligned run of entries
#[derive(Clone, Copy, Default, FromBytes, IntoBytes, KnownLayout, Immutable)]
#[repr(C, align(32))]
struct Lane([RgbaColor; ALIGNMENT]);

/// Round `size` up to the next multiple of [`ALIGNMENT`]
pub const fn align(size: usize) -> usize {
    size.div_ceil(ALIGNMENT) * ALIGNMENT
}

/// Per-key RGBA canvas
#[derive(Clone, Default)]
pub struct RenderTarget {
    len: usize,
    lanes: Vec<Lane>,
}

impl RenderTarget {
    /// Allocate a transparent target for `len` keys
    pub fn new(len: usize) -> Self {
        Self {
            len,
            lanes: vec![Lane::default(); align(len) / ALIGNMENT],
        }
    }

    /// Number of keys
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Number of allocated entries, padding included
    pub fn capacity(&self) -> usize {
        self.lanes.len() * ALIGNMENT
    }

    /// Every allocated entry, padding included
    pub fn entries(&self) -> &[RgbaColor] {
        <[RgbaColor]>::ref_from_bytes(self.lanes.as_bytes()).unwrap_or_default()
    }

    pub fn entries_mut(&mut self) -> &mut [RgbaColor] {
        <[RgbaColor]>::mut_from_bytes(self.lanes.as_mut_bytes()).unwrap_or_default()
    }

    /// Key entries only
    pub fn as_slice(&self) -> &[RgbaColor] {
        &self.entries()[..self.len]
    }

    pub fn as_mut_slice(&mut self) -> &mut [RgbaColor] {
        let len = self.len;
        &mut self.entries_mut()[..len]
    }

    /// Raw bytes of every allocated entry
    pub fn as_bytes(&self) -> &[u8] {
        self.lanes.as_bytes()
    }

    pub fn as_mut_bytes(&mut self) -> &mut [u8] {
        self.lanes.as_mut_bytes()
    }

    pub fn get(&self, index: usize) -> Option<RgbaColor> {
        self.as_slice().get(index).copied()
    }

    /// Set one key; out of range indices are ignored
    pub fn set(&mut self, index: usize, color: RgbaColor) {
        if let Some(entry) = self.as_mut_slice().get_mut(index) {
            *entry = color;
        }
    }

    /// Set every key to `color`
    pub fn fill(&mut self, color: RgbaColor) {
        self.as_mut_slice().fill(color);
    }

    /// Copy another target of the same size into this one
    pub fn copy_from(&mut self, other: &RenderTarget) {
        let n = self.lanes.len().min(other.lanes.len());
        self.lanes[..n].copy_from_slice(&other.lanes[..n]);
    }

    /// Exchange storage with another target without copying entries
    pub fn swap(&mut self, other: &mut RenderTarget) {
        std::mem::swap(self, other);
    }

    pub fn iter(&self) -> std::slice::Iter<'_, RgbaColor> {
        self.as_slice().iter()
    }
}

impl std::fmt::Debug for RenderTarget {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RenderTarget")
            .field("len", &self.len)
            .field("capacity", &self.capacity())
            .finish()
    }
}

impl PartialEq for RenderTarget {
    fn eq(&self, other: &Self) -> bool {
        self.as_slice() == other.as_slice()
    }
}

impl std::ops::Index<usize> for RenderTarget {
    type Output = RgbaColor;

    fn index(&self, index: usize) -> &RgbaColor {
        &self.as_slice()[index]
    }
}

impl std::ops::IndexMut<usize> for RenderTarget {
    fn index_mut(&mut self, index: usize) -> &mut RgbaColor {
        &mut self.as_mut_slice()[index]
    }
}

/// Alpha-blend `src` over `dst`, in place.
///
/// `src` alpha weighs each channel; the result keeps the formula's alpha.
pub fn blend(dst: &mut RenderTarget, src: &RenderTarget) {
    (kernels().blend)(dst.as_mut_bytes(), src.as_bytes());
}

/// Multiply `dst` by `src`, channel by channel, in place.
pub fn multiply(dst: &mut RenderTarget, src: &RenderTarget) {
    (kernels().multiply)(dst.as_mut_bytes(), src.as_bytes());
}
