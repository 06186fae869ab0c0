use std::{cmp::Reverse, collections::HashMap};

use log::debug;

use crate::{
    animation::AnimationSequence,
    color::{ColorModel, Palette},
    error::Result,
    pixel::Pixel,
};

const CUBE_SLOTS: usize = 16 * 16 * 16;

/// What the pixels of a whole RGBA sequence have in common.
struct ColorStats {
    /// Pixel count per distinct RGBA value, tracked up to one past the
    /// palette limit.
    counts: HashMap<Pixel, u32>,
    /// Grey levels used by visible pixels.
    grey_used: [bool; 256],
    /// Opaque colors whose components are all multiples of 16.
    cube_used: Box<[bool; CUBE_SLOTS]>,
    all_opaque: bool,
    /// Alpha is only ever 0 or 255.
    binary_alpha: bool,
    /// Every visible pixel is grey.
    greyscale: bool,
}
impl ColorStats {
    fn collect(sequence: &AnimationSequence) -> Self {
        let mut stats = Self {
            counts: HashMap::new(),
            grey_used: [false; 256],
            cube_used: Box::new([false; CUBE_SLOTS]),
            all_opaque: true,
            binary_alpha: true,
            greyscale: true,
        };
        for frame in sequence.frames() {
            for sample in frame.as_bytes().chunks_exact(4) {
                stats.add(Pixel::from_slice(sample));
            }
        }
        stats
    }

    fn add(&mut self, pixel: Pixel) {
        self.all_opaque &= pixel.alpha == u8::MAX;
        if pixel.alpha != 0 {
            if pixel.alpha != u8::MAX {
                self.binary_alpha = false;
            } else if (pixel.red | pixel.green | pixel.blue) & 0x0f == 0 {
                self.cube_used[cube_index(pixel)] = true;
            }
            if pixel.is_grey() {
                self.grey_used[pixel.red as usize] = true;
            } else {
                self.greyscale = false;
            }
        }
        if let Some(count) = self.counts.get_mut(&pixel) {
            *count += 1;
        } else if self.counts.len() <= Palette::MAX_ENTRIES {
            self.counts.insert(pixel, 1);
        }
    }

    fn fits_palette(&self) -> bool {
        self.counts.len() <= Palette::MAX_ENTRIES
    }

    fn unused_grey(&self) -> Option<u8> {
        self.grey_used.iter().position(|used| !used).map(|i| i as u8)
    }

    fn unused_cube_color(&self) -> Option<[u8; 3]> {
        self.cube_used.iter().position(|used| !used).map(|i| {
            [
                ((i >> 8) as u8) << 4,
                (((i >> 4) & 0x0f) as u8) << 4,
                ((i & 0x0f) as u8) << 4,
            ]
        })
    }

    /// Palette ordered by alpha, then by how often each color is used, then
    /// by value. A transparent entry is added when none exists and there's
    /// room.
    fn palette(&self) -> Result<Palette> {
        let mut entries: Vec<(Pixel, u32)> = self.counts.iter().map(|(p, n)| (*p, *n)).collect();
        if entries.len() < Palette::MAX_ENTRIES && !entries.iter().any(|(p, _)| p.alpha == 0) {
            entries.push((Pixel::TRANSPARENT, 0));
        }
        entries.sort_by_key(|(p, n)| (p.alpha, Reverse(*n), p.red, p.green, p.blue));
        Palette::new(entries.into_iter().map(|(p, _)| p).collect())
    }
}

fn cube_index(pixel: Pixel) -> usize {
    ((pixel.red as usize >> 4) << 8) | ((pixel.green as usize >> 4) << 4) | (pixel.blue as usize >> 4)
}

/// Picks the smallest color model that represents every frame exactly.
fn choose_model(stats: &ColorStats) -> Result<ColorModel> {
    if stats.greyscale && stats.binary_alpha && stats.fits_palette() {
        return Ok(ColorModel::Grey {
            key: stats.unused_grey(),
        });
    }
    if stats.fits_palette() {
        return Ok(ColorModel::Indexed(stats.palette()?));
    }
    if stats.greyscale {
        return Ok(ColorModel::GreyAlpha);
    }
    if stats.binary_alpha {
        let key = stats.unused_cube_color();
        if stats.all_opaque || key.is_some() {
            return Ok(ColorModel::Rgb { key });
        }
    }
    Ok(ColorModel::Rgba)
}

/// Rewrites an RGBA pixel as a sample of `model`.
fn encode_pixel(model: &ColorModel, lookup: &HashMap<Pixel, u8>, pixel: Pixel, out: &mut Vec<u8>) {
    match model {
        ColorModel::Grey { key } => match (*key, pixel.alpha) {
            (Some(key), 0) => out.push(key),
            _ => out.push(pixel.red),
        },
        ColorModel::GreyAlpha => out.extend_from_slice(&[pixel.blue, pixel.alpha]),
        ColorModel::Rgb { key } => match (*key, pixel.alpha) {
            (Some(key), 0) => out.extend_from_slice(&key),
            _ => out.extend_from_slice(&[pixel.red, pixel.green, pixel.blue]),
        },
        ColorModel::Indexed(_) => out.push(lookup.get(&pixel).copied().unwrap_or_default()),
        ColorModel::Rgba => out.extend_from_slice(&pixel.to_bytes()),
    }
}

/// Converts an RGBA sequence to the smallest lossless color model.
/// Sequences that were already converted are left as they are.
pub(crate) fn downconvert(sequence: &mut AnimationSequence) -> Result<()> {
    if *sequence.color_model() != ColorModel::Rgba {
        return Ok(());
    }
    let stats = ColorStats::collect(sequence);
    debug!(
        "{} colors, greyscale: {}, binary alpha: {}, opaque: {}",
        if stats.fits_palette() {
            stats.counts.len().to_string()
        } else {
            format!("more than {}", Palette::MAX_ENTRIES)
        },
        stats.greyscale,
        stats.binary_alpha,
        stats.all_opaque
    );

    let model = choose_model(&stats)?;
    if model == ColorModel::Rgba {
        return Ok(());
    }

    let lookup: HashMap<Pixel, u8> = model
        .palette()
        .map(|palette| {
            palette
                .entries()
                .iter()
                .enumerate()
                .map(|(i, p)| (*p, i as u8))
                .collect()
        })
        .unwrap_or_default();
    let bytes_per_pixel = model.bytes_per_pixel();
    for frame in sequence.frames_mut() {
        let mut pixels = Vec::new();
        pixels.try_reserve_exact(frame.width() as usize * frame.height() as usize * bytes_per_pixel)?;
        for sample in frame.as_bytes().chunks_exact(4) {
            encode_pixel(&model, &lookup, Pixel::from_slice(sample), &mut pixels);
        }
        frame.replace_pixels(bytes_per_pixel, pixels);
    }
    sequence.set_color_model(model);
    Ok(())
}
