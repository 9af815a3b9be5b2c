use crate::{IntRect, Span};
use std::sync::{Mutex, PoisonError};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Shape {
    /// Width of the image
    pub width: usize,
    /// Height of the image
    pub height: usize,
    /// How many elements we need to skip to get to the next row.
    pub row_stride: usize,
    /// How many elements we need to skip to get to the next column.
    pub col_stride: usize,
}

impl Shape {
    #[inline]
    pub fn offset(&self, row: usize, col: usize) -> usize {
        row * self.row_stride + col * self.col_stride
    }

    #[inline]
    pub fn nth(&self, n: usize) -> Option<(usize, usize)> {
        if self.width == 0 {
            return None;
        }
        let row = n / self.width;
        let col = n - row * self.width;
        (row < self.height).then_some((row, col))
    }
}

pub trait Image {
    type Pixel;

    fn data(&self) -> &[Self::Pixel];

    fn shape(&self) -> Shape;

    fn width(&self) -> usize {
        self.shape().width
    }

    fn height(&self) -> usize {
        self.shape().height
    }

    fn get(&self, row: usize, col: usize) -> Option<&Self::Pixel> {
        if row >= self.height() || col >= self.width() {
            return None;
        }
        let offset = self.shape().offset(row, col);
        self.data().get(offset)
    }

    /// Iterate over pixels in row-major order, padding is skipped
    fn iter(&self) -> ImageIter<'_, Self::Pixel> {
        ImageIter {
            index: 0,
            shape: self.shape(),
            data: self.data(),
        }
    }
}

pub struct ImageIter<'a, P> {
    index: usize,
    shape: Shape,
    data: &'a [P],
}

impl<P> ImageIter<'_, P> {
    pub fn position(&self) -> (usize, usize) {
        self.shape.nth(self.index).unwrap_or((self.shape.height, 0))
    }
}

impl<'a, P> Iterator for ImageIter<'a, P> {
    type Item = &'a P;

    fn next(&mut self) -> Option<Self::Item> {
        self.nth(0)
    }

    fn nth(&mut self, n: usize) -> Option<Self::Item> {
        self.index += n + 1;
        let (row, col) = self.shape.nth(self.index - 1)?;
        self.data.get(self.shape.offset(row, col))
    }
}

pub trait ImageMut: Image {
    fn data_mut(&mut self) -> &mut [Self::Pixel];

    fn get_mut(&mut self, row: usize, col: usize) -> Option<&mut Self::Pixel> {
        if row >= self.height() || col >= self.width() {
            return None;
        }
        let index = self.shape().offset(row, col);
        self.data_mut().get_mut(index)
    }

    fn clear(&mut self)
    where
        Self::Pixel: Default,
    {
        let shape = self.shape();
        let data = self.data_mut();
        for row in 0..shape.height {
            for col in 0..shape.width {
                data[shape.offset(row, col)] = Default::default();
            }
        }
    }

    /// Split image into independently lockable rows placed at `(x, y)` in device space
    fn rows(&mut self, x: i32, y: i32) -> ImageRows<'_, Self::Pixel> {
        let shape = self.shape();
        let bounds = IntRect::from_size(x, y, shape.width, shape.height);
        debug_assert_eq!(shape.col_stride, 1);
        let rows = if shape.width == 0 {
            Vec::new()
        } else {
            self.data_mut()
                .chunks_mut(shape.row_stride.max(1))
                .take(shape.height)
                .map(|row| Mutex::new(&mut row[..shape.width]))
                .collect()
        };
        ImageRows { bounds, rows }
    }
}

/// Rows of an image, each guarded by its own lock
///
/// Used by compositors receiving spans of different rows from multiple threads.
pub struct ImageRows<'a, P> {
    bounds: IntRect,
    rows: Vec<Mutex<&'a mut [P]>>,
}

impl<P> ImageRows<'_, P> {
    /// Device space bounds covered by the rows
    pub fn bounds(&self) -> IntRect {
        self.bounds
    }

    /// Run `f` on the pixels covered by the span, parts outside of the bounds are skipped
    pub fn with_span(&self, span: Span, f: impl FnOnce(&mut [P])) {
        if !(self.bounds.y0..self.bounds.y1).contains(&span.y) {
            return;
        }
        let x0 = span.x.max(self.bounds.x0);
        let x1 = span.x_end.min(self.bounds.x1);
        if x0 >= x1 {
            return;
        }
        let Some(row) = self.rows.get((span.y - self.bounds.y0) as usize) else {
            return;
        };
        // a panicking compositor can not leave a row half written in a way that matters
        let mut row = row.lock().unwrap_or_else(PoisonError::into_inner);
        let start = (x0 - self.bounds.x0) as usize;
        let end = (x1 - self.bounds.x0) as usize;
        f(&mut row[start..end])
    }
}

#[derive(Debug, Clone)]
pub struct ImageOwned<P> {
    shape: Shape,
    data: Vec<P>,
}

impl<P> ImageOwned<P> {
    pub fn new(shape: Shape, data: Vec<P>) -> Self {
        Self { shape, data }
    }

    pub fn new_default(height: usize, width: usize) -> Self
    where
        P: Default,
    {
        Self::new_with(height, width, |_, _| Default::default())
    }

    pub fn new_with<F>(height: usize, width: usize, mut f: F) -> Self
    where
        F: FnMut(usize, usize) -> P,
    {
        let mut data = Vec::with_capacity(height * width);
        for row in 0..height {
            for col in 0..width {
                data.push(f(row, col))
            }
        }
        Self {
            shape: Shape {
                width,
                height,
                row_stride: width,
                col_stride: 1,
            },
            data,
        }
    }

    pub fn to_vec(self) -> Vec<P> {
        self.data
    }
}

impl<P> Image for ImageOwned<P> {
    type Pixel = P;

    fn shape(&self) -> Shape {
        self.shape
    }

    fn data(&self) -> &[Self::Pixel] {
        &self.data
    }
}

impl<P> ImageMut for ImageOwned<P> {
    fn data_mut(&mut self) -> &mut [Self::Pixel] {
        &mut self.data
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_image_owned() {
        let mut image = ImageOwned::new_with(2, 3, |row, col| row * 10 + col);
        assert_eq!(image.get(1, 2), Some(&12));
        assert_eq!(image.get(2, 0), None);
        assert_eq!(image.get(0, 3), None);
        let values: Vec<_> = image.iter().copied().collect();
        assert_eq!(values, vec![0, 1, 2, 10, 11, 12]);
        if let Some(value) = image.get_mut(0, 1) {
            *value = 7;
        }
        assert_eq!(image.get(0, 1), Some(&7));
        image.clear();
        assert!(image.iter().all(|value| *value == 0));
    }

    #[test]
    fn test_rows() {
        let mut image = ImageOwned::<u8>::new_default(3, 4);
        {
            let rows = image.rows(10, 20);
            assert_eq!(rows.bounds(), IntRect::new(10, 20, 14, 23));
            let span = |x, x_end, y| Span {
                x,
                x_end,
                y,
                alpha: 255,
            };
            rows.with_span(span(8, 12, 21), |pixels| pixels.fill(1));
            rows.with_span(span(13, 20, 22), |pixels| pixels.fill(2));
            // outside of the image
            rows.with_span(span(10, 14, 19), |pixels| pixels.fill(3));
            rows.with_span(span(14, 16, 20), |pixels| pixels.fill(3));
        }
        assert_eq!(
            image.to_vec(),
            vec![0, 0, 0, 0, 1, 1, 0, 0, 0, 0, 0, 2]
        );
    }
}
