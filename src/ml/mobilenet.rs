// ============================================================
// Layer 5 — MobileNetV2 Backbone
// ============================================================
// The convolutional feature extractor, without the ImageNet
// classification top (`include_top = false`).
//
// Architecture (Sandler et al., 2018), width multiplier α:
//
//   stem   Conv 3×3 / 2 → 32·α   + BN + ReLU6
//   blocks inverted residuals, (t, c, n, s):
//            (1,  16, 1, 1)
//            (6,  24, 2, 2)
//            (6,  32, 3, 2)
//            (6,  64, 4, 2)
//            (6,  96, 3, 1)
//            (6, 160, 3, 2)
//            (6, 320, 1, 1)
//   head   Conv 1×1 → 1280       + BN + ReLU6
//
// Each inverted residual block is:
//   expand 1×1 (×t) + BN + ReLU6        (skipped when t = 1)
//   depthwise 3×3 / s + BN + ReLU6
//   project 1×1 + BN                    (linear bottleneck)
//   + input, when stride 1 and channel count unchanged
//
// At 96×96 input the output feature map is [N, 1280, 3, 3].
//
// BatchNorm uses ε = 1e-3 and keeps 99.9% of the running
// statistics per step, the same constants the ImageNet weights
// were trained with.

use burn::{
    nn::{
        conv::{Conv2d, Conv2dConfig},
        BatchNorm, BatchNormConfig, PaddingConfig2d,
    },
    prelude::*,
};

/// (expansion t, output channels c, repeats n, first stride s)
const INVERTED_RESIDUAL_SETTINGS: [(usize, usize, usize, usize); 7] = [
    (1, 16, 1, 1),
    (6, 24, 2, 2),
    (6, 32, 3, 2),
    (6, 64, 4, 2),
    (6, 96, 3, 1),
    (6, 160, 3, 2),
    (6, 320, 1, 1),
];

const STEM_CHANNELS: usize = 32;
const LAST_CHANNELS: usize = 1280;
const BN_EPSILON: f64 = 1e-3;
const BN_MOMENTUM: f64 = 1e-3;

#[derive(Config, Debug)]
pub struct MobileNetV2Config {
    /// Width multiplier applied to every layer's channel count
    #[config(default = 1.0)]
    pub alpha: f64,
}

impl MobileNetV2Config {
    pub fn init<B: Backend>(&self, device: &B::Device) -> MobileNetV2<B> {
        let stem_out = make_divisible(STEM_CHANNELS as f64 * self.alpha, 8);
        let stem = ConvNorm::new([3, stem_out], 3, 2, 1, device);

        let mut blocks = Vec::new();
        let mut in_channels = stem_out;
        for (expansion, channels, repeats, stride) in INVERTED_RESIDUAL_SETTINGS {
            let out_channels = make_divisible((channels as f64 * self.alpha).trunc(), 8);
            for i in 0..repeats {
                let stride = if i == 0 { stride } else { 1 };
                blocks.push(InvertedResidual::new(
                    in_channels, out_channels, expansion, stride, device,
                ));
                in_channels = out_channels;
            }
        }

        let head = ConvNorm::new([in_channels, self.output_channels()], 1, 1, 1, device);

        MobileNetV2 { stem, blocks, head }
    }

    /// Channel count of the feature map the backbone produces
    pub fn output_channels(&self) -> usize {
        if self.alpha > 1.0 {
            make_divisible(LAST_CHANNELS as f64 * self.alpha, 8)
        } else {
            LAST_CHANNELS
        }
    }
}

/// Round `value` to the nearest multiple of `divisor`,
/// never going below 90% of the original value.
pub fn make_divisible(value: f64, divisor: usize) -> usize {
    let d = divisor as f64;
    let rounded = (((value + d / 2.0) / d).floor() as usize * divisor).max(divisor);
    if (rounded as f64) < 0.9 * value {
        rounded + divisor
    } else {
        rounded
    }
}

fn relu6<B: Backend, const D: usize>(x: Tensor<B, D>) -> Tensor<B, D> {
    x.clamp(0.0, 6.0)
}

/// Convolution followed by batch normalisation (no bias on the conv)
#[derive(Module, Debug)]
pub struct ConvNorm<B: Backend> {
    conv: Conv2d<B>,
    norm: BatchNorm<B>,
}

impl<B: Backend> ConvNorm<B> {
    fn new(
        channels: [usize; 2],
        kernel:   usize,
        stride:   usize,
        groups:   usize,
        device:   &B::Device,
    ) -> Self {
        let padding = kernel / 2;
        let conv = Conv2dConfig::new(channels, [kernel, kernel])
            .with_stride([stride, stride])
            .with_padding(PaddingConfig2d::Explicit(padding, padding))
            .with_groups(groups)
            .with_bias(false)
            .init(device);
        let norm = BatchNormConfig::new(channels[1])
            .with_epsilon(BN_EPSILON)
            .with_momentum(BN_MOMENTUM)
            .init(device);
        Self { conv, norm }
    }

    fn forward(&self, x: Tensor<B, 4>) -> Tensor<B, 4> {
        self.norm.forward(self.conv.forward(x))
    }
}

#[derive(Module, Debug)]
pub struct InvertedResidual<B: Backend> {
    expand:    Option<ConvNorm<B>>,
    depthwise: ConvNorm<B>,
    project:   ConvNorm<B>,
}

impl<B: Backend> InvertedResidual<B> {
    fn new(
        in_channels:  usize,
        out_channels: usize,
        expansion:    usize,
        stride:       usize,
        device:       &B::Device,
    ) -> Self {
        let hidden = in_channels * expansion;
        let expand = (expansion != 1)
            .then(|| ConvNorm::new([in_channels, hidden], 1, 1, 1, device));
        let depthwise = ConvNorm::new([hidden, hidden], 3, stride, hidden, device);
        let project   = ConvNorm::new([hidden, out_channels], 1, 1, 1, device);
        Self { expand, depthwise, project }
    }

    fn forward(&self, input: Tensor<B, 4>) -> Tensor<B, 4> {
        let x = match &self.expand {
            Some(expand) => relu6(expand.forward(input.clone())),
            None         => input.clone(),
        };
        let x = relu6(self.depthwise.forward(x));
        let x = self.project.forward(x);

        // Residual only when shape is preserved (stride 1, same channels)
        if x.dims() == input.dims() {
            x + input
        } else {
            x
        }
    }
}

#[derive(Module, Debug)]
pub struct MobileNetV2<B: Backend> {
    stem:   ConvNorm<B>,
    blocks: Vec<InvertedResidual<B>>,
    head:   ConvNorm<B>,
}

impl<B: Backend> MobileNetV2<B> {
    /// images: [batch, 3, H, W] → features: [batch, 1280, H/32, W/32]
    pub fn forward(&self, images: Tensor<B, 4>) -> Tensor<B, 4> {
        let mut x = relu6(self.stem.forward(images));
        for block in &self.blocks {
            x = block.forward(x);
        }
        relu6(self.head.forward(x))
    }

    pub fn num_blocks(&self) -> usize {
        self.blocks.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    type TestBackend = burn::backend::NdArray;

    #[test]
    fn test_make_divisible() {
        assert_eq!(make_divisible(32.0, 8), 32);
        assert_eq!(make_divisible(11.2, 8), 16);
        assert_eq!(make_divisible(3.0, 8), 8);
        // 0.35 * 16 = 5.6 → 8 (never below one divisor)
        assert_eq!(make_divisible(5.6, 8), 8);
        // 0.5 * 24 = 12 → 16 (rounds half up)
        assert_eq!(make_divisible(12.0, 8), 16);
    }

    #[test]
    fn test_block_count() {
        let device = Default::default();
        let model = MobileNetV2Config::new().with_alpha(0.35).init::<TestBackend>(&device);
        assert_eq!(model.num_blocks(), 17);
    }

    #[test]
    fn test_output_channels() {
        assert_eq!(MobileNetV2Config::new().output_channels(), 1280);
        assert_eq!(MobileNetV2Config::new().with_alpha(0.35).output_channels(), 1280);
        assert_eq!(MobileNetV2Config::new().with_alpha(1.4).output_channels(), 1792);
    }

    #[test]
    fn test_feature_map_shape() {
        let device = Default::default();
        let model = MobileNetV2Config::new().with_alpha(0.35).init::<TestBackend>(&device);
        let images = Tensor::<TestBackend, 4>::zeros([2, 3, 64, 64], &device);
        assert_eq!(model.forward(images).dims(), [2, 1280, 2, 2]);
    }
}
