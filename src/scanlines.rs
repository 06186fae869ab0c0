use std::ops::RangeFrom;

use crate::{
    chunks::ihdr::{IHDRChunk, Interlacing},
    error::{Error, Result},
    filters::reconstruct_scanlines,
    interlacing::{Adam7Iter, PixelIndicesIter},
};

/// Yields each unfiltered row (without its filter byte) together with the
/// indices of the image pixels it holds.
pub(crate) trait ScanlineIterator<'a>: Iterator<Item = (&'a [u8], Vec<usize>)> {}
impl<'a> ScanlineIterator<'a> for NormalScanline<'a> {}
impl<'a> ScanlineIterator<'a> for Adam7ScanlineIter<'a> {}

/// Number of bytes a `width` x `height` image occupies once inflated,
/// filter bytes included.
pub(crate) fn image_data_len(header: &IHDRChunk, width: u32, height: u32) -> usize {
    match header.interlace_method {
        Interlacing::None => {
            calculate_scanline_width(width, header.pixel_width()) * height as usize
        }
        Interlacing::Adam7 => Adam7Iter::new(width as usize, height as usize)
            .map(|pass| {
                calculate_scanline_width(pass.width as u32, header.pixel_width()) * pass.height
            })
            .sum(),
    }
}

/// Reverses the filters of every pass in place.
pub(crate) fn reconstruct(
    image_data: &mut [u8],
    header: &IHDRChunk,
    width: u32,
    height: u32,
) -> Result<()> {
    let expected = image_data_len(header, width, height);
    if image_data.len() < expected {
        return Err(Error::codec(format!(
            "image data is {} bytes, {expected} needed for {width}x{height}",
            image_data.len()
        )));
    }
    let filter_width = header.filter_width() as usize;
    match header.interlace_method {
        Interlacing::None => reconstruct_scanlines(
            &mut image_data[..expected],
            header.row_bytes(width),
            filter_width,
        ),
        Interlacing::Adam7 => {
            let mut rest = &mut image_data[..expected];
            for pass in Adam7Iter::new(width as usize, height as usize) {
                let row_bytes = header.row_bytes(pass.width as u32);
                let (pass_data, tail) =
                    std::mem::take(&mut rest).split_at_mut((row_bytes + 1) * pass.height);
                reconstruct_scanlines(pass_data, row_bytes, filter_width)?;
                rest = tail;
            }
            Ok(())
        }
    }
}

/// Rows of already reconstructed image data.
pub(crate) fn scanlines<'a>(
    image_data: &'a [u8],
    header: &IHDRChunk,
    width: u32,
    height: u32,
) -> Box<dyn ScanlineIterator<'a> + 'a> {
    match header.interlace_method {
        Interlacing::None => Box::new(NormalScanline::new(
            image_data,
            header.pixel_width(),
            width,
            height,
        )),
        Interlacing::Adam7 => Box::new(Adam7ScanlineIter::new(
            image_data,
            header.pixel_width(),
            width,
            height,
        )),
    }
}

pub(crate) struct NormalScanline<'a> {
    scanline_iter: std::iter::Take<std::slice::Chunks<'a, u8>>,
    counter: RangeFrom<usize>,
    width: usize,
}
impl<'a> NormalScanline<'a> {
    pub(crate) fn new(image_data: &'a [u8], pixel_width: u8, width: u32, height: u32) -> Self {
        Self {
            scanline_iter: image_data
                .chunks(calculate_scanline_width(width, pixel_width))
                .take(height as usize),
            counter: 0..,
            width: width as usize,
        }
    }
}
impl<'a> Iterator for NormalScanline<'a> {
    type Item = (&'a [u8], Vec<usize>);
    fn next(&mut self) -> Option<Self::Item> {
        let next_scanline = self.scanline_iter.next()?;
        let mut v = Vec::with_capacity(self.width);
        for _ in 0..self.width {
            v.push(self.counter.next()?)
        }
        Some((&next_scanline[1..], v))
    }
}

pub(crate) struct Adam7ScanlineIter<'a> {
    image_data: &'a [u8],
    pixel_width: u8,
    inner_iter: Option<Adam7Iter>,
    scanline_iter: Option<
        std::iter::Zip<std::iter::Take<std::slice::Chunks<'a, u8>>, ChunkIter<PixelIndicesIter>>,
    >,
}
impl<'a> Adam7ScanlineIter<'a> {
    pub(crate) fn new(image_data: &'a [u8], pixel_width: u8, width: u32, height: u32) -> Self {
        let inner_iter = Some(Adam7Iter::new(width as usize, height as usize));
        Self {
            image_data,
            pixel_width,
            inner_iter,
            scanline_iter: None,
        }
    }
}
impl<'a> Iterator for Adam7ScanlineIter<'a> {
    type Item = (&'a [u8], Vec<usize>);
    fn next(&mut self) -> Option<Self::Item> {
        if let Some((scanline, indices)) = self.scanline_iter.as_mut().and_then(Iterator::next) {
            return Some((&scanline[1..], indices));
        }
        let sub_image = self.inner_iter.as_mut().and_then(|in_iter| in_iter.next())?;
        let scanline_length = calculate_scanline_width(sub_image.width as u32, self.pixel_width);
        let split = usize::min(scanline_length * sub_image.height, self.image_data.len());
        let (sub_image_data, rest): (&'a [u8], &'a [u8]) = self.image_data.split_at(split);
        let height = sub_image.height;
        let pixel_indices = sub_image.pixel_indices.vec_chunks(sub_image.width);
        self.scanline_iter = Some(
            sub_image_data
                .chunks(scanline_length)
                .take(height)
                .zip(pixel_indices),
        );
        self.image_data = rest;
        self.next()
    }
}

struct ChunkIter<I> {
    inner: I,
    size: usize,
}
impl<V, I> Iterator for ChunkIter<I>
where
    I: Iterator<Item = V>,
{
    type Item = Vec<I::Item>;
    fn next(&mut self) -> Option<Self::Item> {
        let mut results = Vec::with_capacity(self.size);
        for _ in 0..self.size {
            results.push(self.inner.next()?);
        }
        Some(results)
    }
}
trait IteratorExt<S> {
    fn vec_chunks(self, n: usize) -> ChunkIter<S>;
}
impl<T> IteratorExt<T> for T {
    fn vec_chunks(self, size: usize) -> ChunkIter<T> {
        ChunkIter { inner: self, size }
    }
}

const fn calculate_scanline_width(image_width: u32, pixel_width: u8) -> usize {
    (image_width as usize * pixel_width as usize).div_ceil(8) + 1
}
