//! Image Intensity and Shape Statistics

use std::collections::BTreeMap;

use image::{DynamicImage, GenericImageView};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::spectral::SpectralAnalyzer;
use crate::statistics::SummaryStats;

/// Pixel statistics run on a bounded thumbnail of each image.
const THUMBNAIL_EDGE: u32 = 128;

/// Statistical descriptor for a buffered image set.
///
/// Two image datasets always flatten to the same key set, enabling
/// cross-dataset comparison downstream.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ImageStatistics {
    /// Number of images described
    pub sample_count: usize,
    /// Per-channel intensity mean over all pixels, in [0, 1]
    pub channel_mean: [Option<f64>; 3],
    /// Per-channel intensity standard deviation
    pub channel_std: [Option<f64>; 3],
    /// Width distribution over original image dimensions
    pub width: SummaryStats,
    /// Height distribution over original image dimensions
    pub height: SummaryStats,
    /// Width / height distribution
    pub aspect_ratio: SummaryStats,
    /// Mean high-frequency power ratio of intensity scanlines
    pub edge_density: Option<f64>,
}

impl ImageStatistics {
    /// Compute the descriptor over buffered images
    pub fn compute(images: &[DynamicImage]) -> Self {
        if images.is_empty() {
            return Self::default();
        }

        let mut widths = Vec::with_capacity(images.len());
        let mut heights = Vec::with_capacity(images.len());
        let mut aspects = Vec::with_capacity(images.len());

        let mut sum = [0.0f64; 3];
        let mut sum_sq = [0.0f64; 3];
        let mut n_pixels = 0usize;

        let mut analyzer = SpectralAnalyzer::new();
        let mut edge_ratios = Vec::new();

        for image in images {
            let (w, h) = image.dimensions();
            widths.push(w as f64);
            heights.push(h as f64);
            if h > 0 {
                aspects.push(w as f64 / h as f64);
            }

            let thumb = image.thumbnail(THUMBNAIL_EDGE, THUMBNAIL_EDGE);

            let rgb = thumb.to_rgb8();
            for pixel in rgb.pixels() {
                for c in 0..3 {
                    let v = pixel.0[c] as f64 / 255.0;
                    sum[c] += v;
                    sum_sq[c] += v * v;
                }
            }
            n_pixels += rgb.pixels().len();

            let gray = thumb.to_luma8();
            if gray.height() > 0 {
                let row = gray.height() / 2;
                let scanline: Vec<f64> = (0..gray.width())
                    .map(|x| gray.get_pixel(x, row).0[0] as f64 / 255.0)
                    .collect();
                if let Some(ratio) = analyzer.analyze(&scanline).high_ratio() {
                    edge_ratios.push(ratio);
                }
            }
        }

        debug!(images = images.len(), pixels = n_pixels, "image statistics computed");

        let mut channel_mean = [None; 3];
        let mut channel_std = [None; 3];
        if n_pixels > 0 {
            let n = n_pixels as f64;
            for c in 0..3 {
                let mean = sum[c] / n;
                channel_mean[c] = Some(mean);
                if n_pixels >= 2 {
                    channel_std[c] = Some((sum_sq[c] / n - mean * mean).max(0.0).sqrt());
                }
            }
        }

        let edge_density = if edge_ratios.is_empty() {
            None
        } else {
            Some(edge_ratios.iter().sum::<f64>() / edge_ratios.len() as f64)
        };

        Self {
            sample_count: images.len(),
            channel_mean,
            channel_std,
            width: SummaryStats::compute(&widths),
            height: SummaryStats::compute(&heights),
            aspect_ratio: SummaryStats::compute(&aspects),
            edge_density,
        }
    }

    /// Fixed key set of the flat descriptor
    pub fn keys() -> &'static [&'static str] {
        &[
            "pixel_mean_r",
            "pixel_mean_g",
            "pixel_mean_b",
            "pixel_std_r",
            "pixel_std_g",
            "pixel_std_b",
            "width_mean",
            "width_std",
            "width_min",
            "width_max",
            "height_mean",
            "height_std",
            "height_min",
            "height_max",
            "aspect_mean",
            "aspect_std",
            "edge_density",
        ]
    }

    /// Flatten to the fixed key set; undefined metrics stay `None`
    pub fn flatten(&self) -> BTreeMap<String, Option<f64>> {
        let mut map = BTreeMap::new();
        map.insert("pixel_mean_r".to_string(), self.channel_mean[0]);
        map.insert("pixel_mean_g".to_string(), self.channel_mean[1]);
        map.insert("pixel_mean_b".to_string(), self.channel_mean[2]);
        map.insert("pixel_std_r".to_string(), self.channel_std[0]);
        map.insert("pixel_std_g".to_string(), self.channel_std[1]);
        map.insert("pixel_std_b".to_string(), self.channel_std[2]);
        map.insert("width_mean".to_string(), self.width.mean);
        map.insert("width_std".to_string(), self.width.std_dev);
        map.insert("width_min".to_string(), self.width.min);
        map.insert("width_max".to_string(), self.width.max);
        map.insert("height_mean".to_string(), self.height.mean);
        map.insert("height_std".to_string(), self.height.std_dev);
        map.insert("height_min".to_string(), self.height.min);
        map.insert("height_max".to_string(), self.height.max);
        map.insert("aspect_mean".to_string(), self.aspect_ratio.mean);
        map.insert("aspect_std".to_string(), self.aspect_ratio.std_dev);
        map.insert("edge_density".to_string(), self.edge_density);
        map
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use image::{Rgb, RgbImage};

    fn solid(w: u32, h: u32, value: u8) -> DynamicImage {
        DynamicImage::ImageRgb8(RgbImage::from_pixel(w, h, Rgb([value, value, value])))
    }

    fn striped(w: u32, h: u32) -> DynamicImage {
        DynamicImage::ImageRgb8(RgbImage::from_fn(w, h, |x, _| {
            if x % 2 == 0 {
                Rgb([255, 255, 255])
            } else {
                Rgb([0, 0, 0])
            }
        }))
    }

    #[test]
    fn test_channel_means_of_solid_images() {
        let images = vec![solid(16, 16, 0), solid(16, 16, 255)];
        let stats = ImageStatistics::compute(&images);

        assert_eq!(stats.sample_count, 2);
        assert_relative_eq!(stats.channel_mean[0].unwrap(), 0.5, epsilon = 1e-9);
        assert_relative_eq!(stats.channel_std[0].unwrap(), 0.5, epsilon = 1e-9);
    }

    #[test]
    fn test_shape_statistics_over_varying_sizes() {
        let images = vec![solid(10, 20, 128), solid(30, 20, 128)];
        let stats = ImageStatistics::compute(&images);

        assert_relative_eq!(stats.width.mean.unwrap(), 20.0);
        assert_relative_eq!(stats.height.mean.unwrap(), 20.0);
        assert_relative_eq!(stats.aspect_ratio.mean.unwrap(), 1.0);
    }

    #[test]
    fn test_stripes_have_higher_edge_density_than_solid() {
        let striped_stats = ImageStatistics::compute(&[striped(64, 64)]);
        let solid_stats = ImageStatistics::compute(&[solid(64, 64, 128)]);

        let striped_edges = striped_stats.edge_density.unwrap();
        match solid_stats.edge_density {
            Some(solid_edges) => assert!(striped_edges > solid_edges),
            // A flat scanline carries no spectral power at all
            None => assert!(striped_edges > 0.0),
        }
    }

    #[test]
    fn test_flatten_key_set_is_fixed() {
        let populated = ImageStatistics::compute(&[solid(8, 8, 7)]);
        let empty = ImageStatistics::default();

        let keys_a: Vec<_> = populated.flatten().into_keys().collect();
        let keys_b: Vec<_> = empty.flatten().into_keys().collect();
        assert_eq!(keys_a, keys_b);
        assert_eq!(keys_a.len(), ImageStatistics::keys().len());
    }
}
