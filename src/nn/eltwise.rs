use crate::config::{EltwiseOp, EltwiseParam, LayerConfig};
use crate::core::blob::Blob;
use crate::error::{CNNForgeError, Result};

use super::Layer;

/// Elementwise combination of two or more equally-sized inputs.
///
/// `PROD` chains pairwise products, `SUM` adds coefficient-scaled inputs,
/// `MAX` takes the running maximum and returns an argmax mask as a second
/// output recording which input won each element.
pub struct EltwiseLayer {
    op: EltwiseOp,
    coeffs: Vec<f32>,
    name: String,
    bottom: Vec<String>,
    top: Vec<String>,
}

impl EltwiseLayer {
    pub fn from_config(config: &LayerConfig) -> Result<Self> {
        let param = config
            .eltwise_param
            .as_ref()
            .ok_or_else(|| CNNForgeError::MissingParam("eltwise_param".into()))?;
        let mut layer = Self::from_param(param);
        layer.name = config.name.clone();
        layer.bottom = config.bottom.clone();
        layer.top = config.top.clone();
        Ok(layer)
    }

    pub fn from_param(param: &EltwiseParam) -> Self {
        Self {
            op: param.operation,
            coeffs: param.coeff.clone(),
            name: String::new(),
            bottom: Vec::new(),
            top: Vec::new(),
        }
    }
}

impl Layer for EltwiseLayer {
    fn forward(&self, bottom: &[Blob]) -> Result<Vec<Blob>> {
        if bottom.len() < 2 {
            return Err(CNNForgeError::InvalidParam(
                "eltwise needs at least two inputs".into(),
            ));
        }
        let cap = bottom[0].capacity();
        for input in &bottom[1..] {
            if input.capacity() != cap {
                return Err(CNNForgeError::CountMismatch {
                    expected: cap,
                    actual: input.capacity(),
                });
            }
        }

        match self.op {
            EltwiseOp::Prod => {
                let mut top = bottom[0].dot(&bottom[1])?;
                for input in &bottom[2..] {
                    top = top.dot(input)?;
                }
                Ok(vec![top])
            }

            EltwiseOp::Sum => {
                let coeffs: Vec<f32> = if self.coeffs.is_empty() {
                    vec![1.0; bottom.len()]
                } else if self.coeffs.len() == bottom.len() {
                    self.coeffs.clone()
                } else {
                    return Err(CNNForgeError::InvalidParam(format!(
                        "eltwise SUM: {} coefficients for {} inputs",
                        self.coeffs.len(),
                        bottom.len()
                    )));
                };

                let mut top = Blob::new(bottom[0].shape())?;
                for (input, &coeff) in bottom.iter().zip(coeffs.iter()) {
                    for (acc, &x) in top.data_mut().iter_mut().zip(input.data().iter()) {
                        *acc += coeff * x;
                    }
                }
                Ok(vec![top])
            }

            EltwiseOp::Max => {
                let mut top = Blob::new(bottom[0].shape())?;
                let mut mask = Blob::new(bottom[0].shape())?;

                // First pair: ties go to the second input. Later inputs only
                // replace the running maximum when strictly greater.
                for i in 0..cap {
                    let a = bottom[0].data()[i];
                    let b = bottom[1].data()[i];
                    if a > b {
                        top.data_mut()[i] = a;
                        mask.data_mut()[i] = 0.0;
                    } else {
                        top.data_mut()[i] = b;
                        mask.data_mut()[i] = 1.0;
                    }
                }
                for (k, input) in bottom.iter().enumerate().skip(2) {
                    for i in 0..cap {
                        let x = input.data()[i];
                        if x > top.data()[i] {
                            top.data_mut()[i] = x;
                            mask.data_mut()[i] = k as f32;
                        }
                    }
                }
                Ok(vec![top, mask])
            }
        }
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
