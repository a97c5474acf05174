//! Embedding Backbone Contract and Deterministic Stand-Ins

use image::DynamicImage;
use ndarray::Array2;
use tracing::warn;

use crate::BackboneError;

/// A pretrained embedding model used purely for feature extraction.
///
/// `encode` must be idempotent and side-effect-free from the engine's
/// perspective; the output dimension is fixed per backbone instance.
pub trait Backbone<S>: Send + Sync {
    /// Output dimension D
    fn dimension(&self) -> usize;

    /// Encode a batch of raw samples into a (batch_size, D) matrix
    fn encode(&self, samples: &[S]) -> Result<Array2<f32>, BackboneError>;
}

/// Encode samples in bounded chunks, dropping chunks whose inference fails.
///
/// Returns the successful chunks and the number of dropped samples; callers
/// decide whether zero successes degrades their stage.
pub fn encode_in_chunks<S>(
    backbone: &dyn Backbone<S>,
    samples: &[S],
    chunk_size: usize,
) -> (Vec<Array2<f32>>, usize) {
    let mut chunks = Vec::new();
    let mut dropped = 0usize;

    for chunk in samples.chunks(chunk_size.max(1)) {
        match backbone.encode(chunk) {
            Ok(matrix) => chunks.push(matrix),
            Err(e) => {
                dropped += chunk.len();
                warn!("dropping {} samples after backbone failure: {}", chunk.len(), e);
            }
        }
    }

    (chunks, dropped)
}

fn mix(a: u64, b: u64) -> u64 {
    let mut x = a
        .wrapping_mul(0x9E37_79B9_7F4A_7C15)
        .wrapping_add(b)
        .wrapping_add(0x2545_F491_4F6C_DD1D);
    x ^= x >> 33;
    x = x.wrapping_mul(0xFF51_AFD7_ED55_8CCD);
    x ^= x >> 33;
    x
}

fn fnv1a(bytes: &[u8]) -> u64 {
    let mut hash = 0xCBF2_9CE4_8422_2325u64;
    for &b in bytes {
        hash ^= b as u64;
        hash = hash.wrapping_mul(0x0000_0100_0000_01B3);
    }
    hash
}

/// Deterministic image backbone projecting thumbnail intensities through
/// fixed pseudo-random signs.
///
/// A stand-in with the same contract as a pretrained vision model, useful
/// for validation runs and environments without model weights.
pub struct HashingImageBackbone {
    dimension: usize,
}

/// Thumbnail edge used before projection
const PATCH_EDGE: u32 = 16;

impl HashingImageBackbone {
    pub fn new(dimension: usize) -> Self {
        Self { dimension }
    }
}

impl Default for HashingImageBackbone {
    fn default() -> Self {
        Self::new(64)
    }
}

impl Backbone<DynamicImage> for HashingImageBackbone {
    fn dimension(&self) -> usize {
        self.dimension
    }

    fn encode(&self, samples: &[DynamicImage]) -> Result<Array2<f32>, BackboneError> {
        let mut output = Array2::zeros((samples.len(), self.dimension));

        for (row, image) in samples.iter().enumerate() {
            let gray = image
                .resize_exact(PATCH_EDGE, PATCH_EDGE, image::imageops::FilterType::Triangle)
                .to_luma8();
            let patch: Vec<f32> = gray.pixels().map(|p| p.0[0] as f32 / 255.0).collect();

            let scale = (patch.len() as f32).sqrt();
            for d in 0..self.dimension {
                let mut acc = 0.0f32;
                for (i, &v) in patch.iter().enumerate() {
                    let sign = if mix(i as u64, d as u64) & 1 == 0 {
                        1.0
                    } else {
                        -1.0
                    };
                    acc += sign * v;
                }
                output[(row, d)] = acc / scale;
            }
        }

        Ok(output)
    }
}

/// Deterministic text backbone hashing tokens into a fixed-width bag.
pub struct HashingTextBackbone {
    dimension: usize,
}

impl HashingTextBackbone {
    pub fn new(dimension: usize) -> Self {
        Self { dimension }
    }
}

impl Default for HashingTextBackbone {
    fn default() -> Self {
        Self::new(64)
    }
}

impl Backbone<String> for HashingTextBackbone {
    fn dimension(&self) -> usize {
        self.dimension
    }

    fn encode(&self, samples: &[String]) -> Result<Array2<f32>, BackboneError> {
        let mut output = Array2::zeros((samples.len(), self.dimension));

        for (row, text) in samples.iter().enumerate() {
            let mut token_count = 0usize;
            for token in text
                .split(|c: char| !c.is_alphanumeric())
                .filter(|t| !t.is_empty())
            {
                let lowered = token.to_lowercase();
                let bucket = (fnv1a(lowered.as_bytes()) % self.dimension as u64) as usize;
                let sign = if fnv1a(lowered.as_bytes()) & (1 << 32) == 0 {
                    1.0
                } else {
                    -1.0
                };
                output[(row, bucket)] += sign;
                token_count += 1;
            }
            if token_count > 0 {
                let scale = (token_count as f32).sqrt();
                for d in 0..self.dimension {
                    output[(row, d)] /= scale;
                }
            }
        }

        Ok(output)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgb, RgbImage};

    fn sample_image(seed: u8) -> DynamicImage {
        DynamicImage::ImageRgb8(RgbImage::from_fn(24, 24, |x, y| {
            Rgb([seed.wrapping_add(x as u8), y as u8, seed])
        }))
    }

    #[test]
    fn test_image_backbone_shape_is_independent_of_input_size() {
        let backbone = HashingImageBackbone::new(32);
        let small = sample_image(1);
        let large = DynamicImage::ImageRgb8(RgbImage::from_pixel(301, 97, Rgb([9, 9, 9])));

        let out = backbone.encode(&[small, large]).unwrap();
        assert_eq!(out.shape(), &[2, 32]);
    }

    #[test]
    fn test_image_backbone_is_deterministic() {
        let backbone = HashingImageBackbone::default();
        let a = backbone.encode(&[sample_image(3)]).unwrap();
        let b = backbone.encode(&[sample_image(3)]).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_text_backbone_separates_distinct_documents() {
        let backbone = HashingTextBackbone::new(32);
        let out = backbone
            .encode(&["alpha beta gamma".to_string(), "delta epsilon".to_string()])
            .unwrap();

        assert_eq!(out.shape(), &[2, 32]);
        let row_a = out.row(0);
        let row_b = out.row(1);
        assert!(row_a.iter().zip(row_b.iter()).any(|(a, b)| a != b));
    }

    #[test]
    fn test_empty_text_encodes_to_zero_vector() {
        let backbone = HashingTextBackbone::new(16);
        let out = backbone.encode(&["!!!".to_string()]).unwrap();
        assert!(out.row(0).iter().all(|v| *v == 0.0));
    }

    struct FailingBackbone;

    impl Backbone<String> for FailingBackbone {
        fn dimension(&self) -> usize {
            4
        }

        fn encode(&self, samples: &[String]) -> Result<Array2<f32>, BackboneError> {
            if samples.iter().any(|s| s.contains("poison")) {
                return Err(BackboneError::Inference("poisoned batch".to_string()));
            }
            Ok(Array2::zeros((samples.len(), 4)))
        }
    }

    #[test]
    fn test_encode_in_chunks_drops_failing_chunk_only() {
        let samples = vec![
            "ok".to_string(),
            "ok".to_string(),
            "poison".to_string(),
            "ok".to_string(),
        ];
        let (chunks, dropped) = encode_in_chunks(&FailingBackbone, &samples, 2);

        assert_eq!(chunks.len(), 1);
        assert_eq!(dropped, 2);
        assert_eq!(chunks[0].nrows(), 2);
    }
}
