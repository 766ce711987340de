//! Variant planning: which renditions to produce for one upload.
//!
//! Every job gets an "original" variant whose JPEG quality depends on the
//! declared upload size, plus three fixed renditions. The fixed renditions are
//! sized by exactly one [`DimensionPolicy`] per planner and compressed either at
//! a fixed quality or towards the upper bound of the size range in their name.
//! No planned side may exceed the planner's maximum dimension.

use crate::config::{DEFAULT_MAX_VARIANT_DIMENSION, DimensionPolicy};
use crate::error::PlanningError;
use crate::models::{Compression, Dimensions, VariantSpec};

const KB: u64 = 1024;
const MB: u64 = 1024 * KB;

pub const ORIGINAL: &str = "original";

pub const HEAVY_QUALITY: u8 = 50;
pub const MODERATE_QUALITY: u8 = 70;
pub const PASS_THROUGH_QUALITY: u8 = 100;

struct FixedVariant {
    name: &'static str,
    quality: u8,
    max_bytes: u64,
    standard: (u32, u32),
}

const FIXED_VARIANTS: [FixedVariant; 3] = [
    FixedVariant {
        name: "250-300KB",
        quality: 80,
        max_bytes: 300 * KB,
        standard: (1920, 1080),
    },
    FixedVariant {
        name: "150-200KB",
        quality: 60,
        max_bytes: 200 * KB,
        standard: (1280, 720),
    },
    FixedVariant {
        name: "10-50KB",
        quality: 20,
        max_bytes: 50 * KB,
        standard: (640, 360),
    },
];

/// Quality of the "original" variant by declared size. Brackets are exclusive
/// on the lower bound: exactly 5 MB is moderate, exactly 2 MB is pass-through.
pub fn original_quality(size_bytes: u64) -> u8 {
    match size_bytes {
        s if s > 5 * MB => HEAVY_QUALITY,
        s if s > 2 * MB => MODERATE_QUALITY,
        _ => PASS_THROUGH_QUALITY,
    }
}

/// Height that keeps `original`'s aspect ratio at `base_width`.
pub fn aspect_height(base_width: u32, original: Dimensions) -> Result<u32, PlanningError> {
    let ratio = original
        .aspect_ratio()
        .filter(|r| *r > 0.0)
        .ok_or(PlanningError::UndefinedAspectRatio {
            width: original.width,
            height: original.height,
        })?;
    Ok((base_width as f64 / ratio).round().max(1.0) as u32)
}

#[derive(Debug, Clone)]
pub struct VariantPlanner {
    policy: DimensionPolicy,
    max_dimension: u32,
    size_targets: bool,
}

impl VariantPlanner {
    pub fn new(policy: DimensionPolicy) -> Self {
        Self {
            policy,
            max_dimension: DEFAULT_MAX_VARIANT_DIMENSION,
            size_targets: false,
        }
    }

    /// Largest width or height any variant may be planned at.
    pub fn with_max_dimension(mut self, max_dimension: u32) -> Self {
        self.max_dimension = max_dimension;
        self
    }

    /// Compress the fixed renditions towards their byte budget instead of a fixed quality.
    pub fn with_size_targets(mut self, enabled: bool) -> Self {
        self.size_targets = enabled;
        self
    }

    pub fn policy(&self) -> DimensionPolicy {
        self.policy
    }

    fn fixed_compression(&self, variant: &FixedVariant) -> Compression {
        if self.size_targets {
            Compression::TargetBytes(variant.max_bytes)
        } else {
            Compression::Quality(variant.quality)
        }
    }

    /// Plan all variants for an upload of `size_bytes` with optional source dimensions.
    ///
    /// Fails as a whole: a plan is never partial.
    pub fn plan(
        &self,
        size_bytes: u64,
        original: Option<Dimensions>,
    ) -> Result<Vec<VariantSpec>, PlanningError> {
        if size_bytes == 0 {
            return Err(PlanningError::EmptyPayload);
        }

        // Zero means "keep the source dimensions".
        let (orig_w, orig_h) = original.map(|d| (d.width, d.height)).unwrap_or((0, 0));
        let mut specs = vec![VariantSpec::new(
            ORIGINAL,
            Compression::Quality(original_quality(size_bytes)),
            orig_w,
            orig_h,
        )];

        match self.policy {
            DimensionPolicy::AspectPreserving { base_width } => {
                let original = original.ok_or(PlanningError::MissingDimensions)?;
                let height = aspect_height(base_width, original)?;
                for variant in &FIXED_VARIANTS {
                    specs.push(VariantSpec::new(
                        variant.name,
                        self.fixed_compression(variant),
                        base_width,
                        height,
                    ));
                }
            }
            DimensionPolicy::Standard => {
                for variant in &FIXED_VARIANTS {
                    let (width, height) = variant.standard;
                    specs.push(VariantSpec::new(
                        variant.name,
                        self.fixed_compression(variant),
                        width,
                        height,
                    ));
                }
            }
        }

        if let Some(spec) = specs
            .iter()
            .find(|s| s.width > self.max_dimension || s.height > self.max_dimension)
        {
            return Err(PlanningError::DimensionsTooLarge {
                variant: spec.name.clone(),
                width: spec.width,
                height: spec.height,
                max: self.max_dimension,
            });
        }

        Ok(specs)
    }
}

impl Default for VariantPlanner {
    fn default() -> Self {
        Self::new(DimensionPolicy::AspectPreserving {
            base_width: crate::config::DEFAULT_BASE_WIDTH,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn quality_of(specs: &[VariantSpec], name: &str) -> Compression {
        specs
            .iter()
            .find(|s| s.name == name)
            .map(|s| s.compression)
            .unwrap()
    }

    #[test]
    fn test_original_quality_brackets() {
        assert_eq!(original_quality(6 * MB), HEAVY_QUALITY);
        assert_eq!(original_quality(3 * MB), MODERATE_QUALITY);
        assert_eq!(original_quality(MB), PASS_THROUGH_QUALITY);
    }

    #[test]
    fn test_original_quality_exact_boundaries() {
        assert_eq!(original_quality(5 * MB), MODERATE_QUALITY);
        assert_eq!(original_quality(5 * MB + 1), HEAVY_QUALITY);
        assert_eq!(original_quality(2 * MB), PASS_THROUGH_QUALITY);
        assert_eq!(original_quality(2 * MB + 1), MODERATE_QUALITY);
    }

    #[test]
    fn test_plan_has_four_unique_variants() {
        let planner = VariantPlanner::default();
        let specs = planner
            .plan(3 * MB, Some(Dimensions::new(4000, 3000)))
            .unwrap();
        assert_eq!(specs.len(), 4);

        let mut names: Vec<_> = specs.iter().map(|s| s.name.as_str()).collect();
        names.sort();
        names.dedup();
        assert_eq!(names, vec!["10-50KB", "150-200KB", "250-300KB", "original"]);

        assert_eq!(quality_of(&specs, ORIGINAL), Compression::Quality(70));
        assert_eq!(quality_of(&specs, "250-300KB"), Compression::Quality(80));
        assert_eq!(quality_of(&specs, "150-200KB"), Compression::Quality(60));
        assert_eq!(quality_of(&specs, "10-50KB"), Compression::Quality(20));
    }

    #[test]
    fn test_original_keeps_source_dimensions() {
        let specs = VariantPlanner::default()
            .plan(MB, Some(Dimensions::new(4000, 3000)))
            .unwrap();
        let original = specs.iter().find(|s| s.name == ORIGINAL).unwrap();
        assert_eq!((original.width, original.height), (4000, 3000));
    }

    #[test]
    fn test_aspect_preserving_heights() {
        let cases = [(4000u32, 3000u32), (1920, 1080), (333, 1000), (1001, 997), (7, 3)];
        let base_width = 1200u32;
        let planner = VariantPlanner::new(DimensionPolicy::AspectPreserving { base_width });

        for (w, h) in cases {
            let specs = planner.plan(MB, Some(Dimensions::new(w, h))).unwrap();
            for spec in specs.iter().filter(|s| s.name != ORIGINAL) {
                assert_eq!(spec.width, base_width);
                // Rounding to whole pixels moves the height by at most half a pixel.
                let error = (spec.height as f64 * w as f64 - base_width as f64 * h as f64).abs();
                assert!(
                    error <= 0.5 * w as f64,
                    "{}x{} -> {}x{} off by {}",
                    w,
                    h,
                    spec.width,
                    spec.height,
                    error
                );
            }
        }
    }

    #[test]
    fn test_zero_height_is_a_planning_error() {
        let err = VariantPlanner::default()
            .plan(MB, Some(Dimensions::new(800, 0)))
            .unwrap_err();
        assert_eq!(
            err,
            PlanningError::UndefinedAspectRatio {
                width: 800,
                height: 0
            }
        );
    }

    #[test]
    fn test_zero_width_is_a_planning_error() {
        let err = VariantPlanner::default()
            .plan(MB, Some(Dimensions::new(0, 600)))
            .unwrap_err();
        assert!(matches!(err, PlanningError::UndefinedAspectRatio { .. }));
    }

    #[test]
    fn test_missing_dimensions() {
        let err = VariantPlanner::default().plan(MB, None).unwrap_err();
        assert_eq!(err, PlanningError::MissingDimensions);
    }

    #[test]
    fn test_empty_payload() {
        let err = VariantPlanner::default()
            .plan(0, Some(Dimensions::new(10, 10)))
            .unwrap_err();
        assert_eq!(err, PlanningError::EmptyPayload);
    }

    #[test]
    fn test_standard_policy_ignores_aspect() {
        let planner = VariantPlanner::new(DimensionPolicy::Standard);
        let specs = planner.plan(6 * MB, None).unwrap();
        assert_eq!(quality_of(&specs, ORIGINAL), Compression::Quality(50));

        let small = specs.iter().find(|s| s.name == "10-50KB").unwrap();
        assert_eq!((small.width, small.height), (640, 360));

        let original = specs.iter().find(|s| s.name == ORIGINAL).unwrap();
        assert_eq!((original.width, original.height), (0, 0));
    }

    #[test]
    fn test_extreme_aspect_ratio_is_rejected() {
        let err = VariantPlanner::default()
            .plan(32 * KB, Some(Dimensions::new(1, 10_000)))
            .unwrap_err();
        assert_eq!(
            err,
            PlanningError::DimensionsTooLarge {
                variant: "250-300KB".to_string(),
                width: 1200,
                height: 12_000_000,
                max: DEFAULT_MAX_VARIANT_DIMENSION,
            }
        );
    }

    #[test]
    fn test_oversized_original_is_rejected() {
        let planner = VariantPlanner::new(DimensionPolicy::Standard).with_max_dimension(4096);
        let err = planner
            .plan(MB, Some(Dimensions::new(5000, 3000)))
            .unwrap_err();
        assert!(matches!(
            err,
            PlanningError::DimensionsTooLarge { ref variant, max: 4096, .. } if variant == ORIGINAL
        ));

        assert!(planner.plan(MB, Some(Dimensions::new(4096, 3000))).is_ok());
    }

    #[test]
    fn test_base_width_above_limit_is_rejected() {
        let planner = VariantPlanner::new(DimensionPolicy::AspectPreserving { base_width: 2000 })
            .with_max_dimension(1024);
        let err = planner
            .plan(MB, Some(Dimensions::new(800, 600)))
            .unwrap_err();
        assert!(matches!(err, PlanningError::DimensionsTooLarge { width: 2000, .. }));
    }

    #[test]
    fn test_size_targets_use_range_upper_bound() {
        let specs = VariantPlanner::default()
            .with_size_targets(true)
            .plan(3 * MB, Some(Dimensions::new(4000, 3000)))
            .unwrap();

        assert_eq!(quality_of(&specs, ORIGINAL), Compression::Quality(70));
        assert_eq!(quality_of(&specs, "250-300KB"), Compression::TargetBytes(300 * KB));
        assert_eq!(quality_of(&specs, "150-200KB"), Compression::TargetBytes(200 * KB));
        assert_eq!(quality_of(&specs, "10-50KB"), Compression::TargetBytes(50 * KB));
    }
}
