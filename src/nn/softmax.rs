use rayon::prelude::*;

use crate::config::LayerConfig;
use crate::core::blob::Blob;
use crate::error::{CNNForgeError, Result};

use super::Layer;

/// Numerically stable softmax along a (possibly negative) normalization
/// axis: subtract the per-slice max, exponentiate, divide by the per-slice
/// sum.
pub struct SoftmaxLayer {
    axis: isize,
    name: String,
    bottom: Vec<String>,
    top: Vec<String>,
}

impl SoftmaxLayer {
    pub fn from_config(config: &LayerConfig) -> Result<Self> {
        let axis = config.softmax_param.as_ref().map(|p| p.axis).unwrap_or(-1);
        Ok(Self {
            axis,
            name: config.name.clone(),
            bottom: config.bottom.clone(),
            top: config.top.clone(),
        })
    }
}

impl Layer for SoftmaxLayer {
    fn forward(&self, bottom: &[Blob]) -> Result<Vec<Blob>> {
        let input = bottom
            .first()
            .ok_or_else(|| CNNForgeError::InvalidParam("softmax: forward without input".into()))?;
        let axis = input.canonical_axis(self.axis)?;
        let axis_dim = input.shape()[axis];
        let inner: usize = input.shape()[axis + 1..].iter().product();

        let mut top = input.clone();
        // Every outer slab holds `inner` independent fibers striding by
        // `inner` along the normalization axis.
        top.data_mut()
            .par_chunks_mut(axis_dim * inner)
            .for_each(|slab| {
                for j in 0..inner {
                    let max = (0..axis_dim)
                        .map(|c| slab[c * inner + j])
                        .fold(f32::NEG_INFINITY, f32::max);
                    let mut sum = 0.0f32;
                    for c in 0..axis_dim {
                        let e = (slab[c * inner + j] - max).exp();
                        slab[c * inner + j] = e;
                        sum += e;
                    }
                    for c in 0..axis_dim {
                        slab[c * inner + j] /= sum;
                    }
                }
            });

        Ok(vec![top])
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn bottom(&self) -> &[String] {
        &self.bottom
    }

    fn top(&self) -> &[String] {
        &self.top
    }
}
