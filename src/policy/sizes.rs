//! 显式宽度列表策略。

use super::{PolicyKind, PolicyParameters, PolicySnapshot, ScaleSet, SizingPolicy, SourceMetrics};

/// 使用调用方给定的宽度列表。
///
/// 大于原图宽度的项被静默跳过（从不放大）；列表去重由调用方负责。
///
/// 注意：该策略不检查 `min_width` / `max_width`，调用方列出的宽度只要不超过原图就会输出。
#[derive(Debug, Clone)]
pub struct SizesPolicy {
    parameters: PolicyParameters,
    sizes: Vec<u32>,
}

impl SizesPolicy {
    pub fn new(parameters: PolicyParameters, sizes: Vec<u32>) -> Self {
        Self { parameters, sizes }
    }

    pub fn sizes(&self) -> &[u32] {
        &self.sizes
    }
}

impl SizingPolicy for SizesPolicy {
    fn kind(&self) -> PolicyKind {
        PolicyKind::Sizes
    }

    fn scale(&self, metrics: &SourceMetrics) -> ScaleSet {
        let mut sizes = ScaleSet::new();

        if metrics.width == 0 || metrics.height == 0 {
            return sizes;
        }

        if self.parameters.include_source {
            sizes.insert(metrics.width, metrics.height);
        }

        for &width in &self.sizes {
            if width == 0 || width > metrics.width {
                continue;
            }

            sizes.insert(width, metrics.height_for(width));
        }

        sizes
    }

    fn snapshot(&self) -> PolicySnapshot {
        PolicySnapshot {
            policy: self.kind().as_str().to_string(),
            parameters: self.parameters,
            sizes: self.sizes.clone(),
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

    #[test]
    fn scale_down() {
        let policy = SizesPolicy::new(
            PolicyParameters {
                include_source: false,
                ..test_parameters()
            },
            vec![500, 10000, 1920],
        );

        let sizes = policy.scale(&SOURCE);

        assert_eq!(sizes.len(), 2);
        assert_eq!(sizes.widths(), vec![500, 1920]);
        assert_eq!(sizes.height_of(500), Some(333));
    }

    #[test]
    fn scale_down_with_include_source() {
        let policy = SizesPolicy::new(test_parameters(), vec![500, 800]);

        let sizes = policy.scale(&SOURCE);

        assert_eq!(sizes.len(), 3);
        assert_eq!(sizes.widths(), vec![1920, 500, 800]);
    }

    #[test]
    fn ignores_min_and_max_width() {
        let policy = SizesPolicy::new(
            PolicyParameters {
                include_source: false,
                max_width: Some(400),
                ..test_parameters()
            },
            vec![100, 1000],
        );

        assert_eq!(policy.scale(&SOURCE).widths(), vec![100, 1000]);
    }

    #[test]
    fn snapshot_records_requested_widths() {
        let policy = SizesPolicy::new(test_parameters(), vec![320, 640]);

        assert_eq!(policy.sizes(), &[320, 640]);
        assert_eq!(policy.snapshot().sizes, vec![320, 640]);
        assert_eq!(policy.snapshot().policy, "sizes");
    }
}
