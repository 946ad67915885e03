//! Strided NCHW views over flat tensor storage.
//!
//! Every latent and image in the pipeline is laid out batch-major,
//! channel-major, row-major (`N × C × H × W`). [`Nchw`] owns the one index
//! formula; [`TensorView`] and [`TensorViewMut`] wrap a flat slice with it so
//! that tile extraction and blending never re-derive offsets by hand.

use crate::error::TensorError;
use crate::tensor::Tensor;

/// Shape of a 4-D NCHW tensor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Nchw {
    /// Batch size.
    pub n: usize,
    /// Channels.
    pub c: usize,
    /// Height (rows).
    pub h: usize,
    /// Width (columns).
    pub w: usize,
}

impl Nchw {
    /// Creates a shape.
    pub const fn new(n: usize, c: usize, h: usize, w: usize) -> Self {
        Self { n, c, h, w }
    }

    /// Interprets a dim list as NCHW.
    pub fn from_dims(dims: &[usize]) -> Result<Self, TensorError> {
        match *dims {
            [n, c, h, w] => Ok(Self { n, c, h, w }),
            _ => Err(TensorError::invalid_shape(dims, "expected 4 dims (NCHW)")),
        }
    }

    /// The shape as a dim array.
    pub const fn dims(&self) -> [usize; 4] {
        [self.n, self.c, self.h, self.w]
    }

    /// Total element count.
    pub const fn len(&self) -> usize {
        self.n * self.c * self.h * self.w
    }

    /// True when any dim is zero.
    pub const fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Elements in one `H × W` plane.
    pub const fn plane(&self) -> usize {
        self.h * self.w
    }

    /// Flat offset of element `(b, c, y, x)`.
    ///
    /// Bounds are checked in debug builds only; callers index through
    /// [`TensorView::get`] for checked access.
    #[inline]
    pub fn offset(&self, b: usize, c: usize, y: usize, x: usize) -> usize {
        debug_assert!(
            b < self.n && c < self.c && y < self.h && x < self.w,
            "index ({b}, {c}, {y}, {x}) out of bounds for {self:?}"
        );
        ((b * self.c + c) * self.h + y) * self.w + x
    }

    /// True when `(b, c, y, x)` lies inside the shape.
    #[inline]
    pub fn contains(&self, b: usize, c: usize, y: usize, x: usize) -> bool {
        b < self.n && c < self.c && y < self.h && x < self.w
    }
}

/// Read-only NCHW view.
#[derive(Debug, Clone, Copy)]
pub struct TensorView<'a> {
    shape: Nchw,
    data: &'a [f32],
}

impl<'a> TensorView<'a> {
    /// Views a tensor as NCHW.
    pub fn new(tensor: &'a Tensor) -> Result<Self, TensorError> {
        let shape = Nchw::from_dims(tensor.dims())?;
        Ok(Self {
            shape,
            data: tensor.as_slice(),
        })
    }

    /// Views a raw slice with an explicit shape.
    pub fn from_slice(shape: Nchw, data: &'a [f32]) -> Result<Self, TensorError> {
        if data.len() != shape.len() {
            return Err(TensorError::DataLength {
                dims: shape.dims().to_vec(),
                expected: shape.len(),
                len: data.len(),
            });
        }
        Ok(Self { shape, data })
    }

    /// Shape of the view.
    #[inline]
    pub fn shape(&self) -> Nchw {
        self.shape
    }

    /// Element at `(b, c, y, x)`, or `None` outside the shape.
    #[inline]
    pub fn get(&self, b: usize, c: usize, y: usize, x: usize) -> Option<f32> {
        if self.shape.contains(b, c, y, x) {
            Some(self.data[self.shape.offset(b, c, y, x)])
        } else {
            None
        }
    }

    /// One contiguous row `(b, c, y, x0..x0+len)`.
    ///
    /// # Panics
    ///
    /// Panics if the row segment leaves the shape.
    #[inline]
    pub fn row(&self, b: usize, c: usize, y: usize, x0: usize, len: usize) -> &'a [f32] {
        assert!(x0 + len <= self.shape.w, "row segment out of bounds");
        let start = self.shape.offset(b, c, y, 0) + x0;
        &self.data[start..start + len]
    }
}

/// Mutable NCHW view.
#[derive(Debug)]
pub struct TensorViewMut<'a> {
    shape: Nchw,
    data: &'a mut [f32],
}

impl<'a> TensorViewMut<'a> {
    /// Views a tensor mutably as NCHW.
    pub fn new(tensor: &'a mut Tensor) -> Result<Self, TensorError> {
        let shape = Nchw::from_dims(tensor.dims())?;
        Ok(Self {
            shape,
            data: tensor.as_mut_slice(),
        })
    }

    /// Views a raw mutable slice with an explicit shape.
    pub fn from_slice(shape: Nchw, data: &'a mut [f32]) -> Result<Self, TensorError> {
        if data.len() != shape.len() {
            return Err(TensorError::DataLength {
                dims: shape.dims().to_vec(),
                expected: shape.len(),
                len: data.len(),
            });
        }
        Ok(Self { shape, data })
    }

    /// Shape of the view.
    #[inline]
    pub fn shape(&self) -> Nchw {
        self.shape
    }

    /// Element at `(b, c, y, x)`, or `None` outside the shape.
    #[inline]
    pub fn get(&self, b: usize, c: usize, y: usize, x: usize) -> Option<f32> {
        if self.shape.contains(b, c, y, x) {
            Some(self.data[self.shape.offset(b, c, y, x)])
        } else {
            None
        }
    }

    /// Mutable element at `(b, c, y, x)`, or `None` outside the shape.
    #[inline]
    pub fn get_mut(&mut self, b: usize, c: usize, y: usize, x: usize) -> Option<&mut f32> {
        if self.shape.contains(b, c, y, x) {
            let idx = self.shape.offset(b, c, y, x);
            Some(&mut self.data[idx])
        } else {
            None
        }
    }

    /// One contiguous mutable row `(b, c, y, x0..x0+len)`.
    ///
    /// # Panics
    ///
    /// Panics if the row segment leaves the shape.
    #[inline]
    pub fn row_mut(&mut self, b: usize, c: usize, y: usize, x0: usize, len: usize) -> &mut [f32] {
        assert!(x0 + len <= self.shape.w, "row segment out of bounds");
        let start = self.shape.offset(b, c, y, 0) + x0;
        &mut self.data[start..start + len]
    }
}

/// Copies an `h × w` window starting at `(src_y, src_x)` of `src` into `dst`
/// at `(dst_y, dst_x)`, for every batch and channel.
///
/// Both views must agree on `n` and `c`; the window must fit in both.
pub fn copy_window(
    src: &TensorView<'_>,
    (src_y, src_x): (usize, usize),
    dst: &mut TensorViewMut<'_>,
    (dst_y, dst_x): (usize, usize),
    (h, w): (usize, usize),
) -> Result<(), TensorError> {
    let s = src.shape();
    let d = dst.shape();
    if s.n != d.n || s.c != d.c {
        return Err(TensorError::shape_mismatch(&d.dims(), &s.dims()));
    }
    if src_y + h > s.h || src_x + w > s.w || dst_y + h > d.h || dst_x + w > d.w {
        return Err(TensorError::invalid_shape(
            &s.dims(),
            "copy window exceeds source or destination bounds",
        ));
    }
    for b in 0..s.n {
        for c in 0..s.c {
            for y in 0..h {
                let row = src.row(b, c, src_y + y, src_x, w);
                dst.row_mut(b, c, dst_y + y, dst_x, w).copy_from_slice(row);
            }
        }
    }
    Ok(())
}
