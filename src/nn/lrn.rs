use crate::config::{
    EltwiseOp, EltwiseParam, LayerConfig, NormRegion, PoolMethod, PoolParam, PowerParam,
};
use crate::core::blob::Blob;
use crate::error::{CNNForgeError, Result};

use super::{EltwiseLayer, Layer, PoolingLayer, PowerLayer, SplitLayer};

/// Local response normalization.
///
/// Cross-channel mode normalizes each value by the squared activity of the
/// channels around it. Within-channel mode is built entirely from the
/// generic Split, Power, Pooling and Eltwise layers; its correctness is
/// exactly the correctness of those four primitives combined.
pub struct LrnLayer {
    size: usize,
    pre_pad: usize,
    alpha: f32,
    beta: f32,
    k: f32,
    region: NormRegion,
    name: String,
    bottom: Vec<String>,
    top: Vec<String>,
}

impl LrnLayer {
    pub fn from_config(config: &LayerConfig) -> Result<Self> {
        let param = config
            .lrn_param
            .as_ref()
            .ok_or_else(|| CNNForgeError::MissingParam("lrn_param".into()))?;
        if param.local_size == 0 || param.local_size % 2 == 0 {
            return Err(CNNForgeError::InvalidParam(
                "LRN only supports odd values for local_size".into(),
            ));
        }
        Ok(Self {
            size: param.local_size,
            pre_pad: (param.local_size - 1) / 2,
            alpha: param.alpha,
            beta: param.beta,
            k: param.k,
            region: param.norm_region,
            name: config.name.clone(),
            bottom: config.bottom.clone(),
            top: config.top.clone(),
        })
    }

    fn cross_channel_forward(&self, input: &Blob) -> Result<Vec<Blob>> {
        let num = input.num()?;
        let channels = input.channels()?;
        let height = input.height()?;
        let width = input.width()?;

        let mut top = Blob::new(input.shape())?;
        let in_data = input.data();
        let plane = height * width;
        let scale = self.alpha / self.size as f32;

        for n in 0..num {
            let sample = n * channels * plane;
            for h in 0..height {
                for w in 0..width {
                    let at = |c: usize| in_data[sample + c * plane + h * width + w];
                    // Sliding window over channels: add the entering channel,
                    // drop the one leaving. Channels outside [0, C) contribute
                    // nothing.
                    let mut sum = 0.0f32;
                    for c in 0..=(self.pre_pad.min(channels - 1)) {
                        sum += at(c) * at(c);
                    }
                    for c in 0..channels {
                        let v = self.k + scale * sum;
                        top.data_mut()[sample + c * plane + h * width + w] =
                            at(c) / v.powf(self.beta);

                        let entering = c + self.pre_pad + 1;
                        if entering < channels {
                            sum += at(entering) * at(entering);
                        }
                        if c >= self.pre_pad {
                            let leaving = c - self.pre_pad;
                            sum -= at(leaving) * at(leaving);
                        }
                    }
                }
            }
        }

        log::trace!("{} cross-channel {} -> {}", self.name, input, top);
        Ok(vec![top])
    }

    fn within_channel_forward(&self, bottom: &[Blob]) -> Result<Vec<Blob>> {
        // One copy feeds the normalizer, the other the final product.
        let split = SplitLayer::with_count(2)?;
        let split_out = split.forward(bottom)?;

        // Square the input.
        let square = PowerLayer::from_param(
            "lrn_square",
            &PowerParam {
                power: 2.0,
                ..PowerParam::default()
            },
        );
        let squared = square.forward(&split_out[0..1])?;

        // Average the squares over each local neighborhood.
        let pool = PoolingLayer::from_param(&PoolParam {
            pool: PoolMethod::Ave,
            kernel_size: self.size,
            pad: self.pre_pad,
            stride: 1,
            ..PoolParam::default()
        })?;
        let pooled = pool.forward(&squared)?;

        // (1 + alpha * s)^-beta, where s is the pooled squared neighborhood.
        let power = PowerLayer::from_param(
            "lrn_power",
            &PowerParam {
                power: -self.beta,
                scale: self.alpha,
                shift: 1.0,
            },
        );
        let scaled = power.forward(&pooled)?;

        // Multiply the untouched copy by the inverse denominator.
        let product = EltwiseLayer::from_param(&EltwiseParam {
            operation: EltwiseOp::Prod,
            coeff: Vec::new(),
        });
        let mut product_input = vec![split_out[1].clone()];
        product_input.extend(scaled);
        let top = product.forward(&product_input)?;

        log::trace!("{} within-channel {} -> {}", self.name, bottom[0], top[0]);
        Ok(top)
    }
}

impl Layer for LrnLayer {
    fn forward(&self, bottom: &[Blob]) -> Result<Vec<Blob>> {
        let input = bottom
            .first()
            .ok_or_else(|| CNNForgeError::InvalidParam("lrn: forward without input".into()))?;
        if input.axes_num() != 4 {
            return Err(CNNForgeError::ShapeMismatch {
                expected: vec![4],
                actual: vec![input.axes_num()],
            });
        }

        match self.region {
            NormRegion::AcrossChannels => self.cross_channel_forward(input),
            NormRegion::WithinChannel => self.within_channel_forward(bottom),
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
