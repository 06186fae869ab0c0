use crate::{
    error::{Error, Result},
    pixel::Pixel,
};

/// Sanity ceiling for widths, heights and offsets read from a file.
pub const MAX_DIMENSION: u32 = 1_000_000;

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Rect {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}
impl Rect {
    pub const fn new(x: u32, y: u32, width: u32, height: u32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    pub const fn canvas(width: u32, height: u32) -> Self {
        Self::new(0, 0, width, height)
    }

    /// Checks a frame rectangle against a canvas of `width` x `height`.
    pub fn validate(&self, width: u32, height: u32) -> Result<()> {
        if self.width == 0 || self.height == 0 {
            return Err(Error::geometry(format!(
                "empty frame rectangle {}x{}",
                self.width, self.height
            )));
        }
        if [self.x, self.y, self.width, self.height]
            .iter()
            .any(|&v| v > MAX_DIMENSION)
        {
            return Err(Error::geometry(format!(
                "frame rectangle {self:?} exceeds the {MAX_DIMENSION} pixel ceiling"
            )));
        }
        if !self.fits_within(width, height) {
            return Err(Error::geometry(format!(
                "frame rectangle {self:?} doesn't fit the {width}x{height} canvas"
            )));
        }
        Ok(())
    }

    pub fn fits_within(&self, width: u32, height: u32) -> bool {
        self.x as u64 + self.width as u64 <= width as u64
            && self.y as u64 + self.height as u64 <= height as u64
    }

    pub fn contains(&self, x: u32, y: u32) -> bool {
        x >= self.x && y >= self.y && x - self.x < self.width && y - self.y < self.height
    }
}

/// Frame display time as the fraction `numerator / denominator` seconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Delay {
    pub numerator: u32,
    pub denominator: u32,
}
impl Delay {
    /// Delay given to images that carry no fcTL of their own.
    pub const DEFAULT_IMAGE: Delay = Delay::new(1, 10);

    pub const fn new(numerator: u32, denominator: u32) -> Self {
        Self {
            numerator,
            denominator,
        }
    }

    /// A zero denominator means hundredths of a second.
    pub fn effective_denominator(&self) -> u32 {
        if self.denominator == 0 {
            100
        } else {
            self.denominator
        }
    }

    /// Rational sum of two display times, used when a duplicate frame is
    /// folded into its predecessor.
    pub fn merge(self, other: Delay) -> Delay {
        if self.denominator == other.denominator {
            let (numerator, denominator) = fit(
                self.numerator as u64 + other.numerator as u64,
                self.denominator as u64,
                u32::MAX as u64,
            );
            return Delay::new(numerator as u32, denominator as u32);
        }
        let (n1, d1) = (self.numerator as u64, self.effective_denominator() as u64);
        let (n2, d2) = (other.numerator as u64, other.effective_denominator() as u64);
        let numerator = n1 * d2 + n2 * d1;
        let denominator = d1 * d2;
        let divisor = gcd(numerator, denominator).max(1);
        let (numerator, denominator) =
            fit(numerator / divisor, denominator / divisor, u32::MAX as u64);
        Delay::new(numerator as u32, denominator as u32)
    }

    /// Same duration, regardless of how the fraction is written.
    pub fn same_duration(&self, other: &Delay) -> bool {
        self.numerator as u64 * other.effective_denominator() as u64
            == other.numerator as u64 * self.effective_denominator() as u64
    }

    /// The 16-bit pair stored in an fcTL chunk.
    pub fn to_fctl_fields(self) -> (u16, u16) {
        let (numerator, denominator) = fit(
            self.numerator as u64,
            self.denominator as u64,
            u16::MAX as u64,
        );
        (numerator as u16, denominator as u16)
    }

    pub fn as_millis(&self) -> u32 {
        let den = self.effective_denominator() as u64;
        ((self.numerator as u64 * 1000 + den / 2) / den) as u32
    }
}

fn gcd(mut a: u64, mut b: u64) -> u64 {
    while b != 0 {
        (a, b) = (b, a % b);
    }
    a
}

/// Halves both terms until they fit in `max`, keeping the denominator
/// non-zero when it started out non-zero.
fn fit(mut numerator: u64, mut denominator: u64, max: u64) -> (u64, u64) {
    while numerator > max || denominator > max {
        numerator = (numerator + 1) / 2;
        denominator = ((denominator + 1) / 2).max(1);
    }
    (numerator, denominator)
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub enum DisposeOp {
    #[default]
    None = 0,
    Background = 1,
    Previous = 2,
}
impl TryFrom<u8> for DisposeOp {
    type Error = Error;
    fn try_from(value: u8) -> Result<Self> {
        match value {
            0 => Ok(Self::None),
            1 => Ok(Self::Background),
            2 => Ok(Self::Previous),
            i => Err(Error::malformed(format!("unknown dispose op {i}"))),
        }
    }
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub enum BlendOp {
    #[default]
    Source = 0,
    Over = 1,
}
impl TryFrom<u8> for BlendOp {
    type Error = Error;
    fn try_from(value: u8) -> Result<Self> {
        match value {
            0 => Ok(Self::Source),
            1 => Ok(Self::Over),
            i => Err(Error::malformed(format!("unknown blend op {i}"))),
        }
    }
}

/// Where and how one sub-image lands on the canvas.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameControl {
    pub rect: Rect,
    pub delay: Delay,
    pub dispose_op: DisposeOp,
    pub blend_op: BlendOp,
}
impl FrameControl {
    /// Control used for images without an fcTL: the whole canvas, replaced
    /// and kept.
    pub fn full_canvas(width: u32, height: u32) -> Self {
        Self {
            rect: Rect::canvas(width, height),
            delay: Delay::DEFAULT_IMAGE,
            dispose_op: DisposeOp::None,
            blend_op: BlendOp::Source,
        }
    }
}

/// A sub-image as stored in the file, before composition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawFrame {
    pub control: FrameControl,
    pub image: Frame,
}

/// A tightly packed pixel buffer with its display time.
///
/// Pixels start out as RGBA8; after downconversion the same type carries
/// 1, 2 or 3 byte samples.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    width: u32,
    height: u32,
    bytes_per_pixel: usize,
    pixels: Vec<u8>,
    pub delay: Delay,
}
impl Frame {
    /// A zeroed (fully transparent) frame.
    pub fn new(width: u32, height: u32, bytes_per_pixel: usize) -> Result<Self> {
        let len = buffer_len(width, height, bytes_per_pixel)?;
        let mut pixels = Vec::new();
        pixels.try_reserve_exact(len)?;
        pixels.resize(len, 0);
        Ok(Self {
            width,
            height,
            bytes_per_pixel,
            pixels,
            delay: Delay::DEFAULT_IMAGE,
        })
    }

    pub fn rgba(width: u32, height: u32) -> Result<Self> {
        Self::new(width, height, 4)
    }

    pub fn from_rgba(width: u32, height: u32, pixels: Vec<u8>) -> Result<Self> {
        Self::from_raw(width, height, 4, pixels)
    }

    pub fn from_raw(
        width: u32,
        height: u32,
        bytes_per_pixel: usize,
        pixels: Vec<u8>,
    ) -> Result<Self> {
        let len = buffer_len(width, height, bytes_per_pixel)?;
        if pixels.len() != len {
            return Err(Error::codec(format!(
                "expected {len} bytes for a {width}x{height} frame, got {}",
                pixels.len()
            )));
        }
        Ok(Self {
            width,
            height,
            bytes_per_pixel,
            pixels,
            delay: Delay::DEFAULT_IMAGE,
        })
    }

    pub fn with_delay(mut self, delay: Delay) -> Self {
        self.delay = delay;
        self
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn bytes_per_pixel(&self) -> usize {
        self.bytes_per_pixel
    }

    pub fn stride(&self) -> usize {
        self.width as usize * self.bytes_per_pixel
    }

    pub fn bounds(&self) -> Rect {
        Rect::canvas(self.width, self.height)
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.pixels
    }

    pub(crate) fn as_bytes_mut(&mut self) -> &mut [u8] {
        &mut self.pixels
    }

    pub fn same_pixels(&self, other: &Frame) -> bool {
        self.width == other.width
            && self.height == other.height
            && self.bytes_per_pixel == other.bytes_per_pixel
            && self.pixels == other.pixels
    }

    fn offset(&self, x: u32, y: u32) -> usize {
        assert!(
            x < self.width && y < self.height,
            "pixel ({x}, {y}) outside a {}x{} frame",
            self.width,
            self.height
        );
        y as usize * self.stride() + x as usize * self.bytes_per_pixel
    }

    pub fn sample(&self, x: u32, y: u32) -> &[u8] {
        let start = self.offset(x, y);
        &self.pixels[start..start + self.bytes_per_pixel]
    }

    pub fn sample_mut(&mut self, x: u32, y: u32) -> &mut [u8] {
        let start = self.offset(x, y);
        let bpp = self.bytes_per_pixel;
        &mut self.pixels[start..start + bpp]
    }

    /// RGBA accessor; only meaningful for 4 byte frames.
    pub fn get(&self, x: u32, y: u32) -> Pixel {
        assert_eq!(self.bytes_per_pixel, 4, "get() needs an RGBA frame");
        Pixel::from_slice(self.sample(x, y))
    }

    pub fn set(&mut self, x: u32, y: u32, pixel: Pixel) {
        assert_eq!(self.bytes_per_pixel, 4, "set() needs an RGBA frame");
        self.sample_mut(x, y).copy_from_slice(&pixel.to_bytes());
    }

    /// Full row `y`.
    pub fn row(&self, y: u32) -> &[u8] {
        let start = self.offset(0, y);
        &self.pixels[start..start + self.stride()]
    }

    /// The slice of each row covered by `rect`, top to bottom.
    pub fn rect_rows(&self, rect: Rect) -> impl Iterator<Item = &[u8]> + '_ {
        assert!(rect.fits_within(self.width, self.height));
        let start = rect.x as usize * self.bytes_per_pixel;
        let len = rect.width as usize * self.bytes_per_pixel;
        (rect.y..rect.y + rect.height).map(move |y| &self.row(y)[start..start + len])
    }

    pub(crate) fn rect_rows_mut(&mut self, rect: Rect) -> impl Iterator<Item = &mut [u8]> + '_ {
        assert!(rect.fits_within(self.width, self.height));
        let start = rect.x as usize * self.bytes_per_pixel;
        let len = rect.width as usize * self.bytes_per_pixel;
        let stride = self.stride();
        self.pixels
            .chunks_exact_mut(stride)
            .skip(rect.y as usize)
            .take(rect.height as usize)
            .map(move |row| &mut row[start..start + len])
    }

    fn rect_row_mut(&mut self, rect: Rect, y: u32) -> &mut [u8] {
        let start = self.offset(rect.x, y);
        let len = rect.width as usize * self.bytes_per_pixel;
        &mut self.pixels[start..start + len]
    }

    /// Sets every pixel in `rect` to `value`.
    pub fn fill_rect(&mut self, rect: Rect, value: &[u8]) {
        assert_eq!(value.len(), self.bytes_per_pixel);
        assert!(rect.fits_within(self.width, self.height));
        for y in rect.y..rect.y + rect.height {
            for pixel in self
                .rect_row_mut(rect, y)
                .chunks_exact_mut(value.len())
            {
                pixel.copy_from_slice(value);
            }
        }
    }

    /// Copies `rect` from a frame of the same layout.
    pub fn copy_rect_from(&mut self, source: &Frame, rect: Rect) {
        assert_eq!(self.bytes_per_pixel, source.bytes_per_pixel);
        assert!(rect.fits_within(self.width, self.height));
        assert!(rect.fits_within(source.width, source.height));
        for (y, row) in (rect.y..).zip(source.rect_rows(rect)) {
            self.rect_row_mut(rect, y).copy_from_slice(row);
        }
    }

    /// Replaces the whole buffer with `source`'s, reusing the allocation.
    pub fn copy_from(&mut self, source: &Frame) {
        assert_eq!(self.bytes_per_pixel, source.bytes_per_pixel);
        assert_eq!((self.width, self.height), (source.width, source.height));
        self.pixels.copy_from_slice(&source.pixels);
    }

    /// Swaps in a buffer with a different sample size, used by downconversion.
    pub(crate) fn replace_pixels(&mut self, bytes_per_pixel: usize, pixels: Vec<u8>) {
        debug_assert_eq!(
            pixels.len(),
            self.width as usize * self.height as usize * bytes_per_pixel
        );
        self.bytes_per_pixel = bytes_per_pixel;
        self.pixels = pixels;
    }
}

fn buffer_len(width: u32, height: u32, bytes_per_pixel: usize) -> Result<usize> {
    if width == 0 || height == 0 {
        return Err(Error::geometry(format!("empty {width}x{height} frame")));
    }
    (width as usize)
        .checked_mul(height as usize)
        .and_then(|v| v.checked_mul(bytes_per_pixel))
        .ok_or_else(|| {
            Error::ResourceExhaustion(format!("{width}x{height} frame doesn't fit in memory"))
        })
}
