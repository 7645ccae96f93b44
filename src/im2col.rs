//! Lowers convolution receptive fields into matrix columns so convolution
//! reduces to a dense matrix multiply.

use crate::error::{CNNForgeError, Result};

/// Output extent of one convolution/pooling axis:
/// `(in + 2*pad - (dilation*(kernel-1)+1)) / stride + 1`, floored.
pub fn conv_out_size(
    dim: usize,
    kernel: usize,
    pad: usize,
    stride: usize,
    dilation: usize,
) -> Result<usize> {
    if kernel == 0 || stride == 0 || dilation == 0 {
        return Err(CNNForgeError::InvalidParam(
            "kernel, stride and dilation must be nonzero".into(),
        ));
    }
    let extent = (dim + 2 * pad) as isize - (dilation * (kernel - 1) + 1) as isize;
    if extent < 0 {
        return Err(CNNForgeError::InvalidParam(format!(
            "kernel {kernel} (dilation {dilation}) extends beyond padded input {dim}+2*{pad}"
        )));
    }
    Ok(extent as usize / stride + 1)
}

/// Expand one image (channels × height × width, row-major) into the im2col
/// matrix `[channels*kernel_h*kernel_w, out_h*out_w]`.
///
/// Rows enumerate (channel, kernel_row, kernel_col) triples, columns
/// enumerate output spatial positions. Taps falling outside the padded
/// input stay at the zero fill; a source row outside `[0, height)` skips
/// its whole output row.
#[allow(clippy::too_many_arguments)]
pub fn im2col(
    data: &[f32],
    channels: usize,
    height: usize,
    width: usize,
    kernel_h: usize,
    kernel_w: usize,
    pad_h: usize,
    pad_w: usize,
    stride_h: usize,
    stride_w: usize,
    dilation_h: usize,
    dilation_w: usize,
) -> Result<Vec<f32>> {
    if data.len() < channels * height * width {
        return Err(CNNForgeError::CountMismatch {
            expected: channels * height * width,
            actual: data.len(),
        });
    }

    let out_h = conv_out_size(height, kernel_h, pad_h, stride_h, dilation_h)?;
    let out_w = conv_out_size(width, kernel_w, pad_w, stride_w, dilation_w)?;
    let mut out = vec![0.0f32; channels * kernel_h * kernel_w * out_h * out_w];

    let mut idx = 0;
    for channel in 0..channels {
        let channel_base = channel * height * width;
        for k_row in 0..kernel_h {
            for k_col in 0..kernel_w {
                let mut in_row = (k_row * dilation_h) as isize - pad_h as isize;
                for _ in 0..out_h {
                    if in_row >= 0 && (in_row as usize) < height {
                        let row_base = channel_base + in_row as usize * width;
                        let mut in_col = (k_col * dilation_w) as isize - pad_w as isize;
                        for _ in 0..out_w {
                            if in_col >= 0 && (in_col as usize) < width {
                                out[idx] = data[row_base + in_col as usize];
                            }
                            in_col += stride_w as isize;
                            idx += 1;
                        }
                    } else {
                        idx += out_w;
                    }
                    in_row += stride_h as isize;
                }
            }
        }
    }

    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn out_size_matches_reference_cases() {
        assert_eq!(conv_out_size(5, 3, 0, 1, 1).unwrap(), 3);
        assert_eq!(conv_out_size(5, 3, 1, 2, 1).unwrap(), 3);
        assert_eq!(conv_out_size(4, 2, 0, 2, 1).unwrap(), 2);
        assert_eq!(conv_out_size(5, 3, 0, 1, 2).unwrap(), 1);
    }

    #[test]
    fn out_size_rejects_oversized_kernel() {
        assert!(conv_out_size(3, 5, 0, 1, 1).is_err());
    }

    #[test]
    fn identity_kernel_passes_data_through() {
        let input = [1.0, 1.0, 1.0, 2.0, 2.0, 2.0, 3.0, 3.0, 3.0];
        let out = im2col(&input, 1, 3, 3, 1, 1, 0, 0, 1, 1, 1, 1).unwrap();
        assert_eq!(out, input);
    }

    #[test]
    fn padded_taps_stay_zero() {
        // 2x2 input, 3x3 kernel, pad 1: single output column per kernel tap.
        let input = [1.0, 2.0, 3.0, 4.0];
        let out = im2col(&input, 1, 2, 2, 3, 3, 1, 1, 1, 1, 1, 1).unwrap();
        // Rows follow (k_row, k_col); the center 2x2 of the 3x3 tap grid
        // lands on the data, the border rows stay at the zero fill.
        assert_eq!(out.len(), 9 * 2 * 2);
        // tap (0,0): reads input shifted by (-1,-1) => only out[3] sees 1.0
        assert_eq!(&out[0..4], &[0.0, 0.0, 0.0, 1.0]);
        // tap (1,1): aligned with the data
        assert_eq!(&out[4 * 4..5 * 4], &[1.0, 2.0, 3.0, 4.0]);
        // tap (2,2): reads input shifted by (+1,+1) => only out[0] sees 4.0
        assert_eq!(&out[8 * 4..9 * 4], &[4.0, 0.0, 0.0, 0.0]);
    }
}
