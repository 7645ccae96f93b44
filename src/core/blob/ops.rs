use crate::error::{CNNForgeError, Result};

use super::blob::Blob;

/// One entry of a top-k query: class index and its score.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TopValue {
    pub index: usize,
    pub value: f32,
}

impl Blob {
    /// Multiply every element by a constant factor.
    pub fn scale(&mut self, factor: f32) {
        for v in &mut self.data {
            *v *= factor;
        }
    }

    /// Add a constant to every element.
    pub fn shift(&mut self, amount: f32) {
        for v in &mut self.data {
            *v += amount;
        }
    }

    /// Raise every element to the given power.
    pub fn powx(&mut self, exponent: f32) {
        for v in &mut self.data {
            *v = v.powf(exponent);
        }
    }

    /// Exponentiate every element.
    pub fn exp(&mut self) {
        for v in &mut self.data {
            *v = v.exp();
        }
    }

    /// Elementwise in-place addition. Capacities must match; shapes are
    /// advisory.
    pub fn add(&mut self, other: &Blob) -> Result<()> {
        if self.cap != other.cap {
            return Err(CNNForgeError::CountMismatch {
                expected: self.cap,
                actual: other.cap,
            });
        }
        for (v, &o) in self.data.iter_mut().zip(other.data.iter()) {
            *v += o;
        }
        Ok(())
    }

    /// Elementwise product into a fresh blob. Capacities must match; shapes
    /// are advisory, the result takes `self`'s shape.
    pub fn dot(&self, other: &Blob) -> Result<Blob> {
        if self.cap != other.cap {
            return Err(CNNForgeError::CountMismatch {
                expected: self.cap,
                actual: other.cap,
            });
        }
        let mut result = Blob::new(&self.shape)?;
        for (r, (&a, &b)) in result
            .data
            .iter_mut()
            .zip(self.data.iter().zip(other.data.iter()))
        {
            *r = a * b;
        }
        Ok(result)
    }

    /// Sum of absolute values over all elements.
    pub fn l1_norm(&self) -> f32 {
        self.data.iter().map(|v| v.abs()).sum()
    }

    /// Sum of squares over all elements (no square root).
    pub fn l2_norm(&self) -> f32 {
        self.data.iter().map(|v| v * v).sum()
    }

    /// Swap the last two axes of a rank-4 blob, materializing a new blob.
    pub fn transpose(&self) -> Result<Blob> {
        if self.axes_num() != 4 {
            return Err(CNNForgeError::ShapeMismatch {
                expected: vec![4],
                actual: vec![self.axes_num()],
            });
        }
        let (num, channels, height, width) =
            (self.shape[0], self.shape[1], self.shape[2], self.shape[3]);
        let mut result = Blob::new(&[num, channels, width, height])?;
        for n in 0..num {
            for c in 0..channels {
                for h in 0..height {
                    for w in 0..width {
                        let src = ((n * channels + c) * height + h) * width + w;
                        let dst = ((n * channels + c) * width + w) * height + h;
                        result.data[dst] = self.data[src];
                    }
                }
            }
        }
        Ok(result)
    }

    /// Dense matrix multiply over the last two axes of two rank-4 blobs.
    ///
    /// Requires `self.width == other.height`. The result shape is
    /// `[self.num * other.num, self.channels * other.channels, self.height,
    /// other.width]`. Plain row·column accumulation; nothing is blocked or
    /// tiled.
    pub fn mmul(&self, other: &Blob) -> Result<Blob> {
        if self.axes_num() != 4 || other.axes_num() != 4 {
            return Err(CNNForgeError::ShapeMismatch {
                expected: vec![4, 4],
                actual: vec![self.axes_num(), other.axes_num()],
            });
        }
        let (sn, sc, sh, sw) = (self.shape[0], self.shape[1], self.shape[2], self.shape[3]);
        let (on, oc, oh, ow) = (
            other.shape[0],
            other.shape[1],
            other.shape[2],
            other.shape[3],
        );
        if sw != oh {
            return Err(CNNForgeError::ShapeMismatch {
                expected: vec![sh, sw],
                actual: vec![oh, ow],
            });
        }

        let mut result = Blob::new(&[sn * on, sc * oc, sh, ow])?;
        let a = &self.data;
        let b = &other.data;
        let out_channels = sc * oc;
        for n1 in 0..sn {
            for n2 in 0..on {
                for c1 in 0..sc {
                    for c2 in 0..oc {
                        let a_base = (n1 * sc + c1) * sh * sw;
                        let b_base = (n2 * oc + c2) * oh * ow;
                        let out_base = ((n1 * on + n2) * out_channels + (c1 * oc + c2)) * sh * ow;
                        for h in 0..sh {
                            for w in 0..ow {
                                let mut sum = 0.0f32;
                                for k in 0..sw {
                                    sum += a[a_base + h * sw + k] * b[b_base + k * ow + w];
                                }
                                result.data[out_base + h * ow + w] = sum;
                            }
                        }
                    }
                }
            }
        }
        Ok(result)
    }

    /// The `k` largest (index, value) pairs of the last-axis slice, sorted
    /// descending by value. Addresses the blob through the legacy
    /// `[1,1,1,i]` path, so leading size-1 axes read at their origin.
    pub fn get_top(&self, k: usize) -> Result<Vec<TopValue>> {
        let width = self.width()?;
        let mut values = Vec::with_capacity(width);
        for i in 0..width {
            values.push(TopValue {
                index: i,
                value: self.get(&[1, 1, 1, i])?,
            });
        }
        values.sort_by(|a, b| {
            b.value
                .partial_cmp(&a.value)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        values.truncate(k);
        Ok(values)
    }
}
