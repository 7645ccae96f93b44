use std::fmt;

use smallvec::SmallVec;

use crate::config::BlobConfig;
use crate::error::{CNNForgeError, Result};

/// Shape type: stack-allocated for ≤4 axes (the legacy NCHW case),
/// spills to heap for higher dimensionality.
pub type BlobShape = SmallVec<[usize; 4]>;

/// Hard cap on blob rank, inherited from the weight format.
pub const MAX_BLOB_AXES: usize = 32;

/// The basic data container: a flat f32 value buffer plus an equally-sized
/// gradient buffer. The gradient buffer exists only because trained weight
/// records carry one; forward-only code never touches it.
#[derive(Debug, Clone, PartialEq)]
pub struct Blob {
    pub(crate) data: Vec<f32>,
    pub(crate) diff: Vec<f32>,
    pub(crate) shape: BlobShape,
    pub(crate) cap: usize,
}

fn checked_capacity(shape: &[usize]) -> Result<usize> {
    if shape.len() > MAX_BLOB_AXES {
        return Err(CNNForgeError::ExceedMaxAxes);
    }
    let mut cap = 1usize;
    for &dim in shape {
        if dim == 0 {
            return Err(CNNForgeError::InvalidShape);
        }
        cap *= dim;
    }
    Ok(cap)
}

impl Blob {
    /// Create a zero-filled blob of the given shape.
    pub fn new(shape: &[usize]) -> Result<Self> {
        let cap = checked_capacity(shape)?;
        Ok(Self {
            data: vec![0.0; cap],
            diff: vec![0.0; cap],
            shape: BlobShape::from_slice(shape),
            cap,
        })
    }

    /// Create a blob of the given shape with every element set to `value`.
    pub fn filled(shape: &[usize], value: f32) -> Result<Self> {
        let cap = checked_capacity(shape)?;
        Ok(Self {
            data: vec![value; cap],
            diff: vec![0.0; cap],
            shape: BlobShape::from_slice(shape),
            cap,
        })
    }

    /// Adopt an existing payload as the blob's data. The payload length must
    /// equal the shape's capacity.
    pub fn from_parts(shape: &[usize], data: Vec<f32>) -> Result<Self> {
        let cap = checked_capacity(shape)?;
        if data.len() != cap {
            return Err(CNNForgeError::CountMismatch {
                expected: cap,
                actual: data.len(),
            });
        }
        Ok(Self {
            diff: vec![0.0; cap],
            data,
            shape: BlobShape::from_slice(shape),
            cap,
        })
    }

    /// Reconstruct a blob from an externally-decoded weight record.
    ///
    /// Legacy 4-D dims win when any of them is nonzero; otherwise the
    /// explicit dim list is used. Payload lengths must match the capacity.
    pub fn from_config(config: &BlobConfig) -> Result<Self> {
        let shape: Vec<usize> =
            if config.num != 0 || config.channels != 0 || config.height != 0 || config.width != 0 {
                vec![config.num, config.channels, config.height, config.width]
            } else {
                config.shape.clone()
            };

        let mut blob = Self::new(&shape)?;
        if !config.data.is_empty() {
            if config.data.len() != blob.cap {
                return Err(CNNForgeError::CountMismatch {
                    expected: blob.cap,
                    actual: config.data.len(),
                });
            }
            blob.data.copy_from_slice(&config.data);
        }
        if !config.diff.is_empty() {
            if config.diff.len() != blob.cap {
                return Err(CNNForgeError::CountMismatch {
                    expected: blob.cap,
                    actual: config.diff.len(),
                });
            }
            blob.diff.copy_from_slice(&config.diff);
        }
        Ok(blob)
    }

    pub fn shape(&self) -> &[usize] {
        &self.shape
    }

    pub fn shape_of(&self, index: usize) -> usize {
        self.shape[index]
    }

    pub fn axes_num(&self) -> usize {
        self.shape.len()
    }

    pub fn capacity(&self) -> usize {
        self.cap
    }

    pub fn data(&self) -> &[f32] {
        &self.data
    }

    pub(crate) fn data_mut(&mut self) -> &mut [f32] {
        &mut self.data
    }

    pub fn diff(&self) -> &[f32] {
        &self.diff
    }

    pub fn shape_equals(&self, other: &Blob) -> bool {
        self.shape == other.shape
    }

    /// Shape extent under the legacy 4-axis convention: axes past the rank
    /// read as 1. Legacy access on a blob of rank > 4 is a caller contract
    /// violation.
    pub fn legacy_shape(&self, index: usize) -> Result<usize> {
        if self.axes_num() > 4 {
            return Err(CNNForgeError::Invariant(
                "legacy accessors require rank <= 4".into(),
            ));
        }
        if index >= self.axes_num() {
            return Ok(1);
        }
        Ok(self.shape[index])
    }

    pub fn num(&self) -> Result<usize> {
        self.legacy_shape(0)
    }

    pub fn channels(&self) -> Result<usize> {
        self.legacy_shape(1)
    }

    pub fn height(&self) -> Result<usize> {
        self.legacy_shape(2)
    }

    pub fn width(&self) -> Result<usize> {
        self.legacy_shape(3)
    }

    /// Resolve a possibly-negative axis index (`-1` is the last axis).
    pub fn canonical_axis(&self, axis: isize) -> Result<usize> {
        let rank = self.axes_num() as isize;
        if axis < -rank || axis >= rank {
            return Err(CNNForgeError::InvalidAxis {
                axis,
                rank: self.axes_num(),
            });
        }
        if axis < 0 {
            Ok((axis + rank) as usize)
        } else {
            Ok(axis as usize)
        }
    }

    /// Row-major data offset of an index vector.
    ///
    /// An index contributes to the offset only when `0 < idx < shape[axis]`;
    /// anything else (including out-of-range values) lands on the axis
    /// origin. Legacy callers address size-1 leading axes with index 1 and
    /// rely on this clamp, so it must not be tightened. An index vector
    /// longer than the rank is a caller contract violation.
    pub fn offset(&self, indices: &[usize]) -> Result<usize> {
        if indices.len() > self.axes_num() {
            return Err(CNNForgeError::Invariant(format!(
                "offset: {} indices for rank {}",
                indices.len(),
                self.axes_num()
            )));
        }

        let mut offset = 0usize;
        for (i, &dim) in self.shape.iter().enumerate() {
            offset *= dim;
            if let Some(&idx) = indices.get(i) {
                if idx > 0 && idx < dim {
                    offset += idx;
                }
            }
        }
        Ok(offset)
    }

    pub fn get(&self, indices: &[usize]) -> Result<f32> {
        Ok(self.data[self.offset(indices)?])
    }

    pub fn set(&mut self, indices: &[usize], value: f32) -> Result<()> {
        let offset = self.offset(indices)?;
        self.data[offset] = value;
        Ok(())
    }

    /// Extract the axis-aligned sub-blob between two 4-D index vectors.
    /// The output extent per axis is `hi[i] - lo[i]`, or 1 when equal.
    pub fn range(&self, lo: &[usize], hi: &[usize]) -> Result<Blob> {
        if self.axes_num() != 4 || lo.len() != 4 || hi.len() != 4 {
            return Err(CNNForgeError::InvalidParam(
                "range requires a rank-4 blob and rank-4 index vectors".into(),
            ));
        }

        let mut shape = [0usize; 4];
        for i in 0..4 {
            if hi[i] < lo[i] {
                return Err(CNNForgeError::InvalidParam(format!(
                    "range: hi {} below lo {} on axis {i}",
                    hi[i], lo[i]
                )));
            }
            shape[i] = hi[i] - lo[i];
            if shape[i] == 0 {
                shape[i] = 1;
            }
        }

        let mut result = Blob::new(&shape)?;
        for n in lo[0]..hi[0] {
            for c in lo[1]..hi[1] {
                for h in lo[2]..hi[2] {
                    for w in lo[3]..hi[3] {
                        let value = self.get(&[n, c, h, w])?;
                        result.set(&[n - lo[0], c - lo[1], h - lo[2], w - lo[3]], value)?;
                    }
                }
            }
        }
        Ok(result)
    }

    /// Return a deep copy with a new shape of the same capacity.
    pub fn reshape(&self, shape: &[usize]) -> Result<Blob> {
        let cap = checked_capacity(shape)?;
        if cap != self.cap {
            return Err(CNNForgeError::CountMismatch {
                expected: self.cap,
                actual: cap,
            });
        }
        let mut result = self.clone();
        result.shape = BlobShape::from_slice(shape);
        Ok(result)
    }
}

impl fmt::Display for Blob {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for dim in &self.shape {
            write!(f, "{dim} ")?;
        }
        write!(f, "({})", self.cap)
    }
}
