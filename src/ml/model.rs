use burn::{
    nn::{
        loss::CrossEntropyLossConfig,
        pool::{AdaptiveAvgPool2d, AdaptiveAvgPool2dConfig},
        BatchNorm, BatchNormConfig,
        Dropout, DropoutConfig,
        Linear, LinearConfig,
    },
    prelude::*,
    module::AutodiffModule,
    tensor::{activation, backend::AutodiffBackend},
};

use crate::ml::mobilenet::{MobileNetV2, MobileNetV2Config};

#[derive(Config, Debug)]
pub struct CifarClassifierConfig {
    #[config(default = 10)]
    pub num_classes: usize,
    #[config(default = 1.0)]
    pub alpha:       f64,
    #[config(default = 256)]
    pub dense_units: usize,
    #[config(default = 0.4)]
    pub dropout:     f64,
}

impl CifarClassifierConfig {
    pub fn init<B: Backend>(&self, device: &B::Device) -> CifarClassifier<B> {
        let backbone_cfg = MobileNetV2Config::new().with_alpha(self.alpha);
        let features     = backbone_cfg.output_channels();

        CifarClassifier {
            backbone: backbone_cfg.init(device),
            pool:     AdaptiveAvgPool2dConfig::new([1, 1]).init(),
            norm:     BatchNormConfig::new(features).with_momentum(0.01).with_epsilon(1e-3).init(device),
            hidden:   LinearConfig::new(features, self.dense_units).init(device),
            dropout:  DropoutConfig::new(self.dropout).init(),
            output:   LinearConfig::new(self.dense_units, self.num_classes).init(device),
        }
    }
}

/// MobileNetV2 → global average pool → BN → Dense(256, relu) → Dropout → Dense(10)
#[derive(Module, Debug)]
pub struct CifarClassifier<B: Backend> {
    pub backbone: MobileNetV2<B>,
    pool:         AdaptiveAvgPool2d,
    norm:         BatchNorm<B>,
    hidden:       Linear<B>,
    dropout:      Dropout,
    output:       Linear<B>,
}

impl<B: Backend> CifarClassifier<B> {
    /// images: [batch, 3, S, S] → logits: [batch, num_classes]
    pub fn forward(&self, images: Tensor<B, 4>) -> Tensor<B, 2> {
        self.classify_features(self.backbone.forward(images))
    }

    /// Classification top applied to a backbone feature map
    fn classify_features(&self, features: Tensor<B, 4>) -> Tensor<B, 2> {
        let [batch_size, channels, _, _] = features.dims();
        let x = self.pool.forward(features).reshape([batch_size, channels]);
        let x = self.norm.forward(x);
        let x = activation::relu(self.hidden.forward(x));
        let x = self.dropout.forward(x);
        self.output.forward(x)
    }

    /// Softmax over classes: [batch, num_classes], rows sum to 1
    pub fn probabilities(&self, images: Tensor<B, 4>) -> Tensor<B, 2> {
        activation::softmax(self.forward(images), 1)
    }

    /// Swap in a (pretrained) backbone, keeping the classification top
    pub fn with_backbone(self, backbone: MobileNetV2<B>) -> Self {
        Self { backbone, ..self }
    }
}

impl<B: AutodiffBackend> CifarClassifier<B> {
    /// Forward pass with the backbone frozen: it runs on the inner
    /// (non-autodiff) backend in inference mode, so its BatchNorm
    /// statistics stay fixed and no gradients reach its weights.
    pub fn forward_frozen(&self, images: Tensor<B, 4>) -> Tensor<B, 2> {
        let features = self.backbone.valid().forward(images.inner());
        self.classify_features(Tensor::from_inner(features))
    }

    /// Cross-entropy loss on logits (softmax + categorical cross-entropy)
    pub fn forward_loss(
        &self,
        images:  Tensor<B, 4>,
        targets: Tensor<B, 1, Int>,
        frozen:  bool,
    ) -> (Tensor<B, 1>, Tensor<B, 2>) {
        let logits = if frozen {
            self.forward_frozen(images)
        } else {
            self.forward(images)
        };
        let loss = CrossEntropyLossConfig::new()
            .init(&logits.device())
            .forward(logits.clone(), targets);
        (loss, logits)
    }
}

/// Number of rows whose argmax equals the target label
pub fn count_correct<B: Backend>(logits: Tensor<B, 2>, targets: Tensor<B, 1, Int>) -> usize {
    let [batch_size, _] = logits.dims();
    let correct: i64 = logits
        .argmax(1)
        .reshape([batch_size])
        .equal(targets)
        .int()
        .sum()
        .into_scalar()
        .elem::<i64>();
    correct as usize
}

#[cfg(test)]
mod tests {
    use super::*;
    use burn::optim::GradientsParams;
    use crate::domain::classes::NUM_CLASSES;

    type TestBackend = burn::backend::NdArray;
    type TestAutodiff = burn::backend::Autodiff<TestBackend>;

    fn small_config() -> CifarClassifierConfig {
        CifarClassifierConfig::new().with_alpha(0.35).with_dense_units(16)
    }

    #[test]
    fn test_logits_shape() {
        let device = Default::default();
        let model = small_config().init::<TestBackend>(&device);
        let images = Tensor::<TestBackend, 4>::ones([2, 3, 32, 32], &device);
        assert_eq!(model.forward(images).dims(), [2, NUM_CLASSES]);
    }

    #[test]
    fn test_probabilities_sum_to_one() {
        let device = Default::default();
        let model = small_config().init::<TestBackend>(&device);
        let images = Tensor::<TestBackend, 4>::random(
            [1, 3, 32, 32],
            burn::tensor::Distribution::Uniform(0.0, 1.0),
            &device,
        );
        let probs = model.probabilities(images).into_data().to_vec::<f32>().unwrap();
        assert_eq!(probs.len(), NUM_CLASSES);
        let sum: f32 = probs.iter().sum();
        assert!((sum - 1.0).abs() < 1e-4, "sum = {sum}");
    }

    #[test]
    fn test_frozen_backbone_gets_no_gradient() {
        let device = Default::default();
        let model = small_config().init::<TestAutodiff>(&device);
        let images = Tensor::<TestAutodiff, 4>::ones([2, 3, 32, 32], &device);
        let targets = Tensor::<TestAutodiff, 1, Int>::from_ints([1, 4], &device);

        let (loss, logits) = model.forward_loss(images, targets, true);
        assert_eq!(logits.dims(), [2, NUM_CLASSES]);

        let mut grads = loss.backward();
        let backbone_grads = GradientsParams::from_module(&mut grads, &model.backbone);
        assert!(backbone_grads.is_empty());

        let all_grads = GradientsParams::from_grads(grads, &model);
        assert!(!all_grads.is_empty());
    }

    #[test]
    fn test_count_correct() {
        let device = Default::default();
        let logits = Tensor::<TestBackend, 2>::from_floats(
            [[0.1, 0.9], [0.8, 0.2], [0.3, 0.7]],
            &device,
        );
        let targets = Tensor::<TestBackend, 1, Int>::from_ints([1, 1, 1], &device);
        assert_eq!(count_correct(logits, targets), 2);
    }
}
