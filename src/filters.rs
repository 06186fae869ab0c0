use crate::error::{Error, Result};

/// Per-scanline prediction filters. `a` is the byte one pixel to the left,
/// `b` the byte above and `c` the byte above-left.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Filter {
    None = 0,
    Sub = 1,
    Up = 2,
    Average = 3,
    Paeth = 4,
}
impl Filter {
    fn predict(&self, a: u8, b: u8, c: u8) -> u8 {
        match self {
            Filter::None => 0,
            Filter::Sub => a,
            Filter::Up => b,
            Filter::Average => ((a as u16 + b as u16) / 2) as u8,
            Filter::Paeth => paeth(a, b, c),
        }
    }

    pub fn filter(&self, x: u8, a: u8, b: u8, c: u8) -> u8 {
        x.wrapping_sub(self.predict(a, b, c))
    }

    pub fn reconstruct(&self, x: u8, a: u8, b: u8, c: u8) -> u8 {
        x.wrapping_add(self.predict(a, b, c))
    }
}
impl TryFrom<u8> for Filter {
    type Error = Error;
    fn try_from(value: u8) -> Result<Self> {
        match value {
            0 => Ok(Self::None),
            1 => Ok(Self::Sub),
            2 => Ok(Self::Up),
            3 => Ok(Self::Average),
            4 => Ok(Self::Paeth),
            i => Err(Error::codec(format!("unknown filter type {i}"))),
        }
    }
}

fn paeth(a: u8, b: u8, c: u8) -> u8 {
    let p = a as i16 + b as i16 - c as i16;
    let pa = (p - a as i16).abs();
    let pb = (p - b as i16).abs();
    let pc = (p - c as i16).abs();
    if pa <= pb && pa <= pc {
        a
    } else if pb <= pc {
        b
    } else {
        c
    }
}

/// Undoes filtering in place. `data` holds rows of `row_bytes` bytes, each
/// prefixed with its filter type; `filter_width` is the byte distance to the
/// corresponding byte of the previous pixel.
pub(crate) fn reconstruct_scanlines(
    data: &mut [u8],
    row_bytes: usize,
    filter_width: usize,
) -> Result<()> {
    let stride = row_bytes + 1;
    if data.len() % stride != 0 {
        return Err(Error::codec(format!(
            "{} bytes of image data don't split into {stride} byte scanlines",
            data.len()
        )));
    }
    let mut previous: Option<usize> = None;
    for start in (0..data.len()).step_by(stride) {
        let filter = Filter::try_from(data[start])?;
        let (before, current) = data.split_at_mut(start + 1);
        let current = &mut current[..row_bytes];
        let prior = previous.map(|p| &before[p + 1..p + 1 + row_bytes]);
        for i in 0..row_bytes {
            let a = if i >= filter_width {
                current[i - filter_width]
            } else {
                0
            };
            let (b, c) = match prior {
                Some(prior) if i >= filter_width => (prior[i], prior[i - filter_width]),
                Some(prior) => (prior[i], 0),
                None => (0, 0),
            };
            current[i] = filter.reconstruct(current[i], a, b, c);
        }
        previous = Some(start);
    }
    Ok(())
}

/// Appends `filter`'s byte followed by the filtered row to `out`.
pub(crate) fn filter_row(
    filter: Filter,
    row: &[u8],
    prior: Option<&[u8]>,
    filter_width: usize,
    out: &mut Vec<u8>,
) {
    out.push(filter as u8);
    for (i, &x) in row.iter().enumerate() {
        let a = if i >= filter_width {
            row[i - filter_width]
        } else {
            0
        };
        let (b, c) = match prior {
            Some(prior) if i >= filter_width => (prior[i], prior[i - filter_width]),
            Some(prior) => (prior[i], 0),
            None => (0, 0),
        };
        out.push(filter.filter(x, a, b, c));
    }
}

/// Sum of the distance of each byte from zero, treated as signed; gives
/// up once it reaches `limit`.
fn filter_cost(filtered: &[u8], limit: u64) -> u64 {
    let mut sum = 0u64;
    for &v in filtered {
        sum += if v < 128 { v as u64 } else { 256 - v as u64 };
        if sum >= limit {
            break;
        }
    }
    sum
}

/// Filters every row with whichever filter has the lowest cost, appending
/// the result to `out`. `row_buffer` is scratch space.
pub(crate) fn filter_adaptive<'a>(
    rows: impl Iterator<Item = &'a [u8]>,
    filter_width: usize,
    out: &mut Vec<u8>,
    row_buffer: &mut Vec<u8>,
) {
    let mut prior: Option<&[u8]> = None;
    for row in rows {
        let mut best = Filter::None;
        let mut best_cost = filter_cost(row, u64::MAX);
        let candidates: &[Filter] = if prior.is_some() {
            &[Filter::Sub, Filter::Up, Filter::Average, Filter::Paeth]
        } else {
            &[Filter::Sub]
        };
        for &filter in candidates {
            row_buffer.clear();
            filter_row(filter, row, prior, filter_width, row_buffer);
            let cost = filter_cost(&row_buffer[1..], best_cost);
            if cost < best_cost {
                best = filter;
                best_cost = cost;
            }
        }
        filter_row(best, row, prior, filter_width, out);
        prior = Some(row);
    }
}

/// Prefixes every row with filter type 0.
pub(crate) fn filter_none<'a>(rows: impl Iterator<Item = &'a [u8]>, out: &mut Vec<u8>) {
    for row in rows {
        out.push(Filter::None as u8);
        out.extend_from_slice(row);
    }
}
