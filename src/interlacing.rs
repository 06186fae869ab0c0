use std::{iter::StepBy, ops::Range};


pub(crate) struct Adam7Iter {
    current_pass: Option<usize>,
    width: usize,
    height: usize,
}
impl Adam7Iter {
    pub(crate) fn new(width: usize, height: usize) -> Self {
        Self {
            current_pass: Some(0),
            width,
            height,
        }
    }

    const STARTING_ROW: [usize; 7] = [0, 0, 4, 0, 2, 0, 1];
    const STARTING_COL: [usize; 7] = [0, 4, 0, 2, 0, 1, 0];
    const ROW_INCREMENT: [usize; 7] = [8, 8, 8, 4, 4, 2, 2];
    const COL_INCREMENT: [usize; 7] = [8, 8, 4, 4, 2, 2, 1];
}
impl Iterator for Adam7Iter {
    type Item = SubImage;
    fn next(&mut self) -> Option<Self::Item> {
        let mut pass = self.current_pass?;
        while pass < 7 {
            let pass_width = self
                .width
                .saturating_sub(Self::STARTING_COL[pass])
                .div_ceil(Self::COL_INCREMENT[pass]);
            let pass_height = self
                .height
                .saturating_sub(Self::STARTING_ROW[pass])
                .div_ceil(Self::ROW_INCREMENT[pass]);
            // If either is zero, the sub image has no pixels and we can go to the next image.
            if pass_width == 0 || pass_height == 0 {
                pass += 1;
                continue;
            }
            if pass == 6 {
                self.current_pass = None;
            } else {
                self.current_pass = Some(pass + 1);
            }
            return Some(SubImage {
                width: pass_width,
                height: pass_height,
                pixel_indices: PixelIndicesIter::new(
                    (Self::STARTING_ROW[pass]..self.height).step_by(Self::ROW_INCREMENT[pass]),
                    (Self::STARTING_COL[pass]..self.width).step_by(Self::COL_INCREMENT[pass]),
                    self.width,
                ),
            });
        }
        self.current_pass = None;
        None
    }
}

#[derive(Debug)]
pub(crate) struct SubImage {
    pub(crate) width: usize,
    pub(crate) height: usize,
    pub(crate) pixel_indices: PixelIndicesIter,
}

#[derive(Debug)]
pub(crate) struct PixelIndicesIter {
    rows: StepBy<Range<usize>>,
    current_row: Option<usize>,
    orig_columns: StepBy<Range<usize>>,
    columns: StepBy<Range<usize>>,
    /// Width of the full image, used to turn (row, column) into an index.
    width: usize,
}
impl PixelIndicesIter {
    pub(crate) fn new(
        mut rows: StepBy<Range<usize>>,
        columns: StepBy<Range<usize>>,
        width: usize,
    ) -> Self {
        let current_row = rows.next();
        Self {
            rows,
            current_row,
            orig_columns: columns.clone(),
            columns,
            width,
        }
    }
}
impl Iterator for PixelIndicesIter {
    type Item = usize;
    fn next(&mut self) -> Option<Self::Item> {
        if let Some(column) = self.columns.next() {
            return Some(self.current_row? * self.width + column);
        }
        self.current_row = Some(self.rows.next()?);
        self.columns = self.orig_columns.clone();
        Some(self.current_row? * self.width + self.columns.next()?)
    }
}
