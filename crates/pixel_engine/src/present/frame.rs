//! Caller-facing view of the currently mapped staging buffer
//!
//! Pixels are packed 32-bit values, row-major. Rows may be padded: the byte
//! offset of pixel `(x, y)` is always `x * 4 + y * stride`, never
//! `(x + y * width) * 4`.

use super::device::MappedRegion;
use super::types::SurfaceSize;

const BYTES_PER_PIXEL: usize = 4;

/// Non-owning `{ base address, row stride }` descriptor of a pixel buffer
///
/// A view handed out by the engine borrows the engine mutably, so it cannot
/// outlive the next `present()` or `resize()`; the compiler rejects that.
/// The view does not clip: addressing a pixel outside `width x height` panics
/// instead of writing past the buffer.
#[derive(Debug)]
pub struct FrameBufferView<'a> {
    bytes: &'a mut [u8],
    stride: usize,
    width: u32,
    height: u32,
}

impl<'a> FrameBufferView<'a> {
    /// Build a view over caller-owned memory
    ///
    /// Returns `None` when the slice is too short for `height` rows of
    /// `stride` bytes, when `stride` is smaller than a row of pixels or not a
    /// multiple of 4, or when the slice is not 4-byte aligned.
    pub fn new(bytes: &'a mut [u8], stride: usize, width: u32, height: u32) -> Option<Self> {
        let row_bytes = (width as usize).checked_mul(BYTES_PER_PIXEL)?;
        if stride < row_bytes || stride % BYTES_PER_PIXEL != 0 {
            return None;
        }
        if bytes.as_ptr() as usize % BYTES_PER_PIXEL != 0 {
            return None;
        }
        let required = match height {
            0 => 0,
            h => stride.checked_mul(h as usize - 1)?.checked_add(row_bytes)?,
        };
        if bytes.len() < required {
            return None;
        }

        Some(Self {
            bytes,
            stride,
            width,
            height,
        })
    }

    /// Build a view over a backend's mapped staging memory
    ///
    /// # Safety
    /// `region` must describe a live mapping that nothing else accesses for
    /// the whole of `'a`.
    pub(crate) unsafe fn from_region(region: &MappedRegion, size: SurfaceSize) -> Option<Self> {
        let bytes = std::slice::from_raw_parts_mut(region.ptr().as_ptr(), region.len());
        Self::new(bytes, region.stride(), size.width, size.height)
    }

    /// Base address of the first pixel row
    pub fn as_ptr(&self) -> *const u8 {
        self.bytes.as_ptr()
    }

    /// Mutable base address of the first pixel row
    pub fn as_mut_ptr(&mut self) -> *mut u8 {
        self.bytes.as_mut_ptr()
    }

    /// Bytes between the starts of consecutive rows
    pub const fn stride(&self) -> usize {
        self.stride
    }

    /// Width in pixels
    pub const fn width(&self) -> u32 {
        self.width
    }

    /// Height in pixels
    pub const fn height(&self) -> u32 {
        self.height
    }

    /// Width and height together
    pub const fn size(&self) -> SurfaceSize {
        SurfaceSize::new(self.width, self.height)
    }

    /// Byte offset of pixel `(x, y)` from the base address
    pub const fn offset_of(&self, x: u32, y: u32) -> usize {
        x as usize * BYTES_PER_PIXEL + y as usize * self.stride
    }

    /// Raw bytes, padding included
    pub fn bytes(&self) -> &[u8] {
        self.bytes
    }

    /// Mutable raw bytes, padding included
    pub fn bytes_mut(&mut self) -> &mut [u8] {
        self.bytes
    }

    /// Pixels of row `y`, padding excluded
    ///
    /// # Panics
    /// If `y >= height`.
    pub fn row(&self, y: u32) -> &[u32] {
        let range = self.row_range(y);
        bytemuck::cast_slice(&self.bytes[range])
    }

    /// Mutable pixels of row `y`, padding excluded
    ///
    /// # Panics
    /// If `y >= height`.
    pub fn row_mut(&mut self, y: u32) -> &mut [u32] {
        let range = self.row_range(y);
        bytemuck::cast_slice_mut(&mut self.bytes[range])
    }

    /// Read pixel `(x, y)`
    ///
    /// # Panics
    /// If the coordinate is outside the view.
    pub fn pixel(&self, x: u32, y: u32) -> u32 {
        self.row(y)[x as usize]
    }

    /// Write pixel `(x, y)`
    ///
    /// # Panics
    /// If the coordinate is outside the view.
    pub fn set_pixel(&mut self, x: u32, y: u32, color: u32) {
        self.row_mut(y)[x as usize] = color;
    }

    /// Fill every pixel with `color`
    pub fn clear(&mut self, color: u32) {
        for y in 0..self.height {
            self.row_mut(y).fill(color);
        }
    }

    fn row_range(&self, y: u32) -> std::ops::Range<usize> {
        assert!(y < self.height, "row {y} outside view of height {}", self.height);
        let start = y as usize * self.stride;
        start..start + self.width as usize * BYTES_PER_PIXEL
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn backing(words: usize) -> Vec<u32> {
        vec![0u32; words]
    }

    #[test]
    fn test_rejects_bad_geometry() {
        let mut words = backing(64);
        let bytes: &mut [u8] = bytemuck::cast_slice_mut(&mut words);

        // stride shorter than a row
        assert!(FrameBufferView::new(bytes, 12, 4, 4).is_none());
    }

    #[test]
    fn test_rejects_unaligned_stride_and_short_slices() {
        let mut words = backing(64);
        let bytes: &mut [u8] = bytemuck::cast_slice_mut(&mut words);
        assert!(FrameBufferView::new(bytes, 18, 4, 4).is_none());

        let mut words = backing(15);
        let bytes: &mut [u8] = bytemuck::cast_slice_mut(&mut words);
        assert!(FrameBufferView::new(bytes, 16, 4, 4).is_none());
    }

    #[test]
    fn test_addressing_uses_stride() {
        // 3x2 pixels, rows padded to 8 pixels (32 bytes)
        let mut words = backing(16);
        let bytes: &mut [u8] = bytemuck::cast_slice_mut(&mut words);
        let mut view = FrameBufferView::new(bytes, 32, 3, 2).expect("valid geometry");

        view.set_pixel(2, 1, 0x00FF_5733);
        assert_eq!(view.offset_of(2, 1), 2 * 4 + 32);
        assert_eq!(view.pixel(2, 1), 0x00FF_5733);
        assert_eq!(view.row(1).len(), 3);
        drop(view);

        assert_eq!(words[8 + 2], 0x00FF_5733);
        assert_eq!(words.iter().filter(|&&w| w != 0).count(), 1);
    }

    #[test]
    fn test_last_row_may_omit_padding() {
        let mut words = backing(8 + 3);
        let bytes: &mut [u8] = bytemuck::cast_slice_mut(&mut words);
        let mut view = FrameBufferView::new(bytes, 32, 3, 2).expect("last row needs no padding");
        view.set_pixel(2, 1, 7);
        assert_eq!(view.pixel(2, 1), 7);
    }

    #[test]
    fn test_clear_leaves_padding_alone() {
        let mut words = vec![0xDEAD_BEEFu32; 8];
        let bytes: &mut [u8] = bytemuck::cast_slice_mut(&mut words);
        let mut view = FrameBufferView::new(bytes, 16, 2, 2).expect("valid geometry");
        view.clear(1);
        drop(view);
        assert_eq!(words, vec![1, 1, 0xDEAD_BEEF, 0xDEAD_BEEF, 1, 1, 0xDEAD_BEEF, 0xDEAD_BEEF]);
    }

    #[test]
    #[should_panic]
    fn test_out_of_range_pixel_panics() {
        let mut words = backing(4);
        let bytes: &mut [u8] = bytemuck::cast_slice_mut(&mut words);
        let mut view = FrameBufferView::new(bytes, 8, 2, 2).expect("valid geometry");
        view.set_pixel(2, 0, 1);
    }
}
