//! 按宽度几何递减的缩放策略。

use super::{PolicyKind, PolicyParameters, PolicySnapshot, ScaleSet, SizingPolicy, SourceMetrics};

/// 从原始宽度开始，每一步乘以 `step_modifier` 并向下取整，
/// 第一个低于 `min_width` 的候选不输出并终止。
///
/// 超过 `max_width` 的候选跳过但继续迭代。`step_modifier` 不在 (0, 1) 内时只输出原始尺寸，
/// 宽度降到 0 时同样终止，因此未经配置层校验的参数也不会死循环。
#[derive(Debug, Clone)]
pub struct WidthPolicy {
    parameters: PolicyParameters,
}

impl WidthPolicy {
    pub fn new(parameters: PolicyParameters) -> Self {
        Self { parameters }
    }
}

impl SizingPolicy for WidthPolicy {
    fn kind(&self) -> PolicyKind {
        PolicyKind::Width
    }

    fn scale(&self, metrics: &SourceMetrics) -> ScaleSet {
        let params = &self.parameters;
        let mut sizes = ScaleSet::new();

        if params.include_source && params.within_max_width(metrics.width) {
            sizes.insert(metrics.width, metrics.height);
        }

        if !params.shrinks() {
            return sizes;
        }

        let mut width = metrics.width;
        let mut height = metrics.height;

        loop {
            width = (width as f64 * params.step_modifier).floor() as u32;
            height = (height as f64 * params.step_modifier).floor() as u32;

            // min_width 为 0 时由宽度归零终止
            if width == 0 || width < params.min_width {
                break;
            }

            if !params.within_max_width(width) {
                continue;
            }

            sizes.insert(width, height.max(1));
        }

        sizes
    }

    fn snapshot(&self) -> PolicySnapshot {
        PolicySnapshot {
            policy: self.kind().as_str().to_string(),
            parameters: self.parameters,
            sizes: Vec::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::policy::test_parameters;

    const SOURCE: SourceMetrics = SourceMetrics {
        width: 1920,
        height: 1280,
        byte_size: 500_000,
    };

    fn policy(step: f64) -> WidthPolicy {
        WidthPolicy::new(PolicyParameters {
            step_modifier: step,
            ..test_parameters()
        })
    }

    #[test]
    fn scale_down() {
        let sizes = policy(0.8).scale(&SOURCE);

        assert!(sizes.len() > 1);
        assert!(sizes.contains_width(1920));
    }

    #[test]
    fn geometric_sequence_terminates_before_min_width() {
        let sizes = WidthPolicy::new(PolicyParameters {
            step_modifier: 0.8,
            include_source: false,
            ..test_parameters()
        })
        .scale(&SOURCE);

        // 1920 * 0.8^n，逐步向下取整，256 < 300 时停止
        assert_eq!(sizes.widths(), vec![1536, 1228, 982, 785, 628, 502, 401, 320]);
        assert_eq!(sizes.height_of(1536), Some(1024));
        assert_eq!(sizes.height_of(320), Some(214));
    }

    #[test]
    fn scale_down_with_max_width() {
        let sizes = WidthPolicy::new(PolicyParameters {
            step_modifier: 0.8,
            max_width: Some(1000),
            ..test_parameters()
        })
        .scale(&SOURCE);

        assert!(!sizes.is_empty());
        for target in &sizes {
            assert!(target.width < 1000);
        }
    }

    #[test]
    fn scale_down_with_include_source_disabled() {
        let sizes = WidthPolicy::new(PolicyParameters {
            include_source: false,
            ..test_parameters()
        })
        .scale(&SOURCE);

        assert!(!sizes.contains_width(1920));
    }

    #[test]
    fn source_narrower_than_min_width_only_yields_native() {
        let small = SourceMetrics {
            width: 200,
            height: 100,
            byte_size: 10_000,
        };

        let sizes = policy(0.5).scale(&small);

        assert_eq!(sizes.widths(), vec![200]);
    }

    #[test]
    fn zero_min_width_terminates_without_zero_width() {
        let sizes = WidthPolicy::new(PolicyParameters {
            min_width: 0,
            include_source: false,
            ..test_parameters()
        })
        .scale(&SourceMetrics {
            width: 100,
            height: 100,
            byte_size: 10_000,
        });

        assert_eq!(sizes.widths(), vec![50, 25, 12, 6, 3, 1]);
        assert!(sizes.iter().all(|target| target.height >= 1));
    }

    #[test]
    fn non_shrinking_step_only_yields_native() {
        for step in [0.0, 1.0, 1.5, f64::NAN] {
            let sizes = policy(step).scale(&SOURCE);

            assert_eq!(sizes.widths(), vec![1920], "step {}", step);
        }
    }
}
