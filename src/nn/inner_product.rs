use crate::config::LayerConfig;
use crate::core::blob::Blob;
use crate::error::{CNNForgeError, Result};

use super::Layer;

/// Fully-connected layer: flattens the axes before `axis` into M and the
/// rest into K, then multiplies against the transposed `[N, K]` weight.
pub struct InnerProductLayer {
    num_output: usize,
    bias_term: bool,
    axis: isize,
    weight: Option<Blob>,
    bias: Option<Blob>,
    name: String,
    bottom: Vec<String>,
    top: Vec<String>,
}

/// Weight records arrive either as legacy rank-4 or as plain `[N, K]`
/// matrices; normalize to rank-4 so the matrix accessors line up.
fn as_matrix(blob: Blob) -> Result<Blob> {
    match blob.axes_num() {
        4 => Ok(blob),
        2 => {
            let shape = [1, 1, blob.shape()[0], blob.shape()[1]];
            blob.reshape(&shape)
        }
        1 => {
            let shape = [1, 1, 1, blob.shape()[0]];
            blob.reshape(&shape)
        }
        rank => Err(CNNForgeError::ShapeMismatch {
            expected: vec![4],
            actual: vec![rank],
        }),
    }
}

impl InnerProductLayer {
    pub fn from_config(config: &LayerConfig) -> Result<Self> {
        let param = config
            .inner_product_param
            .as_ref()
            .ok_or_else(|| CNNForgeError::MissingParam("inner_product_param".into()))?;
        if param.num_output == 0 {
            return Err(CNNForgeError::InvalidParam(
                "inner product num_output must be positive".into(),
            ));
        }

        let mut weight = None;
        let mut bias = None;
        if !config.blobs.is_empty() {
            weight = Some(as_matrix(Blob::from_config(&config.blobs[0])?)?);
            if param.bias_term {
                let bias_config = config.blobs.get(1).ok_or_else(|| {
                    CNNForgeError::MissingParam("inner product bias blob".into())
                })?;
                bias = Some(as_matrix(Blob::from_config(bias_config)?)?);
            }
        }

        Ok(Self {
            num_output: param.num_output,
            bias_term: param.bias_term,
            axis: param.axis,
            weight,
            bias,
            name: config.name.clone(),
            bottom: config.bottom.clone(),
            top: config.top.clone(),
        })
    }
}

impl Layer for InnerProductLayer {
    fn forward(&self, bottom: &[Blob]) -> Result<Vec<Blob>> {
        let input = bottom.first().ok_or_else(|| {
            CNNForgeError::InvalidParam("inner product: forward without input".into())
        })?;
        let weight = self
            .weight
            .as_ref()
            .ok_or_else(|| CNNForgeError::MissingParam("inner product weights".into()))?;

        let axis = input.canonical_axis(self.axis)?;
        let m: usize = input.shape()[..axis].iter().product();
        let k: usize = input.shape()[axis..].iter().product();
        if k != weight.width()? {
            return Err(CNNForgeError::ShapeMismatch {
                expected: vec![weight.height()?, weight.width()?],
                actual: vec![m, k],
            });
        }

        let flattened = input.reshape(&[1, 1, m, k])?;
        let mut top = flattened.mmul(&weight.transpose()?)?;

        if self.bias_term {
            let bias = self
                .bias
                .as_ref()
                .ok_or_else(|| CNNForgeError::MissingParam("inner product bias".into()))?;
            if bias.capacity() != self.num_output {
                return Err(CNNForgeError::CountMismatch {
                    expected: self.num_output,
                    actual: bias.capacity(),
                });
            }
            // Broadcast the [1, N] bias over the M rows.
            let ones = Blob::filled(&[1, 1, m, 1], 1.0)?;
            top.add(&ones.mmul(bias)?)?;
        }

        log::trace!("{} {} -> {}", self.name, input, top);
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
