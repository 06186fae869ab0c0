use crate::{
    color::ColorModel,
    frame::{Frame, Rect},
};

/// How two samples are compared when looking for changed pixels.
#[derive(Debug, Clone)]
pub(crate) struct DiffRules {
    /// The last byte of each sample is alpha.
    alpha_channel: bool,
    /// Sample rendered as transparent, when the model has one.
    key: Option<Vec<u8>>,
    /// Palette indices whose color is not fully opaque.
    translucent_indices: Vec<u8>,
}
impl DiffRules {
    pub(crate) fn for_model(model: &ColorModel) -> Self {
        Self {
            alpha_channel: model.has_alpha_channel(),
            key: model.transparent_sample(),
            translucent_indices: model
                .palette()
                .map(|palette| {
                    (0..=u8::MAX)
                        .zip(palette.entries())
                        .filter(|(_, color)| color.alpha != u8::MAX)
                        .map(|(index, _)| index)
                        .collect()
                })
                .unwrap_or_default(),
        }
    }

    /// Value written into cleared rectangles for background disposal.
    pub(crate) fn transparent_sample(&self) -> Option<&[u8]> {
        self.key.as_deref()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Diff {
    pub rect: Rect,
    /// Every changed pixel can be drawn with `BlendOp::Over` using the
    /// image written to `over`.
    pub over_possible: bool,
}

/// Finds the pixels that differ between the canvas `below` and the frame
/// `next`, and fills `over` with an image that turns `below` into `next`
/// when blended over it.
pub(crate) fn diff_frames(
    below: &Frame,
    next: &Frame,
    over: &mut Frame,
    rules: &DiffRules,
    even_offsets: bool,
) -> Diff {
    let bpp = next.bytes_per_pixel();
    let stride = next.stride();
    let width = next.width();
    let mut over_possible = rules.alpha_channel || rules.key.is_some();
    let mut bounds: Option<(u32, u32, u32, u32)> = None;

    let rows = below
        .as_bytes()
        .chunks_exact(stride)
        .zip(next.as_bytes().chunks_exact(stride))
        .zip(over.as_bytes_mut().chunks_exact_mut(stride));
    for (y, ((below_row, next_row), over_row)) in (0..).zip(rows) {
        let pixels = below_row
            .chunks_exact(bpp)
            .zip(next_row.chunks_exact(bpp))
            .zip(over_row.chunks_exact_mut(bpp));
        for (x, ((old, new), out)) in (0..width).zip(pixels) {
            let changed = if rules.alpha_channel {
                old != new && (old[bpp - 1] != 0 || new[bpp - 1] != 0)
            } else {
                old != new
            };
            if changed {
                if rules.alpha_channel {
                    over_possible &= new[bpp - 1] == u8::MAX;
                } else if rules.key.as_deref() == Some(new)
                    || rules.translucent_indices.contains(&new[0])
                {
                    over_possible = false;
                }
                bounds = Some(match bounds {
                    None => (x, y, x, y),
                    Some((x0, y0, x1, y1)) => (x0.min(x), y0.min(y), x1.max(x), y1.max(y)),
                });
                out.copy_from_slice(new);
            } else {
                match rules.key.as_deref() {
                    Some(key) if !rules.alpha_channel => out.copy_from_slice(key),
                    _ => out.fill(0),
                }
            }
        }
    }

    let rect = match bounds {
        None => Rect::new(0, 0, 1, 1),
        Some((mut x_min, mut y_min, x_max, y_max)) => {
            if even_offsets {
                x_min -= x_min % 2;
                y_min -= y_min % 2;
            }
            Rect::new(x_min, y_min, x_max - x_min + 1, y_max - y_min + 1)
        }
    };
    Diff {
        rect,
        over_possible,
    }
}
