//! Owned, shape-tagged numeric buffers.
//!
//! A [`Tensor`] is the unit of data exchanged between every stage of the
//! sampling core: noise, latents, denoiser predictions, decoded tiles. It has
//! exactly one owner at a time. Stages either borrow it read-only or take it
//! by value, and a tensor handed to [`TensorPool::release`](crate::TensorPool::release)
//! cannot be touched again because the pool now owns it.
//!
//! ## Storage
//!
//! Arithmetic always runs in `f32`. A tensor tagged [`DType::F16`] keeps its
//! values rounded to half precision: constructors and [`Tensor::quantize`]
//! round through [`half::f16`], and [`Tensor::to_f16_bits`] /
//! [`Tensor::from_f16_bits`] exchange raw half-precision words with the
//! model runtime.

#[cfg(not(feature = "std"))]
use alloc::{vec, vec::Vec};

use half::f16;

use crate::error::TensorError;

/// Element type of a tensor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub enum DType {
    /// IEEE 754 half precision.
    F16,
    /// IEEE 754 single precision.
    #[default]
    F32,
}

impl DType {
    /// Size of one element in bytes at the model boundary.
    pub const fn size_bytes(self) -> usize {
        match self {
            DType::F16 => 2,
            DType::F32 => 4,
        }
    }

    /// Short lowercase name (`"f16"`, `"f32"`).
    pub const fn as_str(self) -> &'static str {
        match self {
            DType::F16 => "f16",
            DType::F32 => "f32",
        }
    }

    /// Round a value to this dtype's precision.
    #[inline]
    pub fn round(self, value: f32) -> f32 {
        match self {
            DType::F16 => f16::from_f32(value).to_f32(),
            DType::F32 => value,
        }
    }
}

/// Number of elements implied by a dim list.
#[inline]
pub fn element_count(dims: &[usize]) -> usize {
    dims.iter().product()
}

/// An owned, shape-tagged numeric buffer.
#[derive(Debug, Clone, PartialEq)]
pub struct Tensor {
    dtype: DType,
    dims: Vec<usize>,
    data: Vec<f32>,
}

impl Tensor {
    /// Creates a zero-filled tensor.
    pub fn zeros(dtype: DType, dims: &[usize]) -> Self {
        Self {
            dtype,
            dims: dims.to_vec(),
            data: vec![0.0; element_count(dims)],
        }
    }

    /// Creates a tensor filled with `value` (rounded to `dtype`).
    pub fn full(dtype: DType, dims: &[usize], value: f32) -> Self {
        Self {
            dtype,
            dims: dims.to_vec(),
            data: vec![dtype.round(value); element_count(dims)],
        }
    }

    /// Wraps a flat buffer. Values are rounded to `dtype`.
    pub fn from_vec(dtype: DType, dims: &[usize], data: Vec<f32>) -> Result<Self, TensorError> {
        let expected = element_count(dims);
        if data.len() != expected {
            return Err(TensorError::DataLength {
                dims: dims.to_vec(),
                expected,
                len: data.len(),
            });
        }
        let mut tensor = Self {
            dtype,
            dims: dims.to_vec(),
            data,
        };
        tensor.quantize();
        Ok(tensor)
    }

    /// Builds an `F16` tensor from raw half-precision bit patterns.
    pub fn from_f16_bits(dims: &[usize], bits: &[u16]) -> Result<Self, TensorError> {
        let expected = element_count(dims);
        if bits.len() != expected {
            return Err(TensorError::DataLength {
                dims: dims.to_vec(),
                expected,
                len: bits.len(),
            });
        }
        Ok(Self {
            dtype: DType::F16,
            dims: dims.to_vec(),
            data: bits.iter().map(|&b| f16::from_bits(b).to_f32()).collect(),
        })
    }

    /// Splits the tensor into dtype, dims, and flat storage.
    pub fn into_parts(self) -> (DType, Vec<usize>, Vec<f32>) {
        (self.dtype, self.dims, self.data)
    }

    /// Element type.
    #[inline]
    pub fn dtype(&self) -> DType {
        self.dtype
    }

    /// Ordered dims.
    #[inline]
    pub fn dims(&self) -> &[usize] {
        &self.dims
    }

    /// Number of elements.
    #[inline]
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// True when the tensor holds no elements.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Flat read-only data.
    #[inline]
    pub fn as_slice(&self) -> &[f32] {
        &self.data
    }

    /// Flat mutable data.
    ///
    /// Writes through this slice are not rounded; call [`quantize`](Self::quantize)
    /// afterwards for `F16` tensors that leave the core.
    #[inline]
    pub fn as_mut_slice(&mut self) -> &mut [f32] {
        &mut self.data
    }

    /// Consumes the tensor and returns its flat storage.
    pub fn into_vec(self) -> Vec<f32> {
        self.data
    }

    /// Returns `true` when `other` has the same dims.
    #[inline]
    pub fn same_shape(&self, other: &Tensor) -> bool {
        self.dims == other.dims
    }

    /// Fails with [`TensorError::ShapeMismatch`] unless `other` has the same dims.
    #[inline]
    pub fn check_same_shape(&self, other: &Tensor) -> Result<(), TensorError> {
        if self.same_shape(other) {
            Ok(())
        } else {
            Err(TensorError::shape_mismatch(&self.dims, &other.dims))
        }
    }

    /// Sets every element to `value`.
    pub fn fill(&mut self, value: f32) {
        self.data.fill(self.dtype.round(value));
    }

    /// Rounds every element to the tensor's dtype.
    pub fn quantize(&mut self) {
        if self.dtype == DType::F16 {
            for v in &mut self.data {
                *v = f16::from_f32(*v).to_f32();
            }
        }
    }

    /// Returns a copy converted to `dtype`.
    pub fn to_dtype(&self, dtype: DType) -> Tensor {
        let mut out = Tensor {
            dtype,
            dims: self.dims.clone(),
            data: self.data.clone(),
        };
        out.quantize();
        out
    }

    /// Exports the data as raw half-precision bit patterns.
    pub fn to_f16_bits(&self) -> Vec<u16> {
        self.data.iter().map(|&v| f16::from_f32(v).to_bits()).collect()
    }

    /// Reinterprets the dims without touching the data.
    pub fn reshape(&mut self, dims: &[usize]) -> Result<(), TensorError> {
        if element_count(dims) != self.data.len() {
            return Err(TensorError::DataLength {
                dims: dims.to_vec(),
                expected: element_count(dims),
                len: self.data.len(),
            });
        }
        self.dims = dims.to_vec();
        Ok(())
    }

    /// Copies all elements from `src`.
    pub fn copy_from(&mut self, src: &Tensor) -> Result<(), TensorError> {
        self.check_same_shape(src)?;
        self.data.copy_from_slice(&src.data);
        Ok(())
    }

    /// Multiplies every element by `factor`.
    pub fn scale(&mut self, factor: f32) {
        for v in &mut self.data {
            *v *= factor;
        }
    }

    /// `self += factor * other`, elementwise.
    pub fn add_scaled(&mut self, other: &Tensor, factor: f32) -> Result<(), TensorError> {
        self.check_same_shape(other)?;
        for (dst, &src) in self.data.iter_mut().zip(other.data.iter()) {
            *dst += factor * src;
        }
        Ok(())
    }

    /// `self = a * self + b * other`, elementwise.
    pub fn blend(&mut self, a: f32, other: &Tensor, b: f32) -> Result<(), TensorError> {
        self.check_same_shape(other)?;
        for (dst, &src) in self.data.iter_mut().zip(other.data.iter()) {
            *dst = a * *dst + b * src;
        }
        Ok(())
    }

    /// Arithmetic mean of all elements (0 for an empty tensor).
    pub fn mean(&self) -> f32 {
        if self.data.is_empty() {
            return 0.0;
        }
        let sum: f64 = self.data.iter().map(|&v| f64::from(v)).sum();
        (sum / self.data.len() as f64) as f32
    }

    /// Population standard deviation of all elements.
    pub fn std_dev(&self) -> f32 {
        if self.data.is_empty() {
            return 0.0;
        }
        let mean = f64::from(self.mean());
        let var: f64 = self
            .data
            .iter()
            .map(|&v| {
                let d = f64::from(v) - mean;
                d * d
            })
            .sum::<f64>()
            / self.data.len() as f64;
        libm::sqrt(var) as f32
    }
}
