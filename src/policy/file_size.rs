//! 按预估文件体积几何递减的缩放策略。

use super::{PolicyKind, PolicyParameters, PolicySnapshot, ScaleSet, SizingPolicy, SourceMetrics};

/// 假设编码后体积与像素面积成正比：
///
/// ```text
/// ratio       = height / width
/// pixel_price = byte_size / (width² · ratio)
/// width'      = floor(sqrt((estimate / pixel_price) / ratio))
/// ```
///
/// 每一步先把预估体积乘以 `step_modifier`，再反推宽度。循环至少执行一次，
/// 在预估体积不再大于 `min_file_size` 或宽度不再大于 `min_width` 时结束；
/// 候选宽度降到 0 时也结束。`step_modifier` 不在 (0, 1) 内时只输出原始尺寸。
#[derive(Debug, Clone)]
pub struct FileSizePolicy {
    parameters: PolicyParameters,
}

impl FileSizePolicy {
    pub fn new(parameters: PolicyParameters) -> Self {
        Self { parameters }
    }
}

impl SizingPolicy for FileSizePolicy {
    fn kind(&self) -> PolicyKind {
        PolicyKind::FileSize
    }

    fn scale(&self, metrics: &SourceMetrics) -> ScaleSet {
        let params = &self.parameters;
        let mut sizes = ScaleSet::new();

        if metrics.width == 0 || metrics.height == 0 {
            return sizes;
        }

        let byte_size = metrics.byte_size as f64;

        if params.include_source
            && params.within_max_width(metrics.width)
            && params.within_max_file_size(byte_size)
        {
            sizes.insert(metrics.width, metrics.height);
        }

        if metrics.byte_size == 0 || !params.shrinks() {
            return sizes;
        }

        let ratio = metrics.aspect_ratio();
        let width = metrics.width as f64;
        let pixel_price = byte_size / (width * width * ratio);
        let mut estimate = byte_size;

        loop {
            estimate *= params.step_modifier;
            let candidate = ((estimate / pixel_price) / ratio).sqrt().floor() as u32;
            if candidate == 0 {
                break;
            }

            if params.within_max_file_size(estimate)
                && params.within_max_width(candidate)
                && candidate >= params.min_width
            {
                sizes.insert(candidate, metrics.height_for(candidate));
            }

            if !(estimate > params.min_file_size as f64 && candidate > params.min_width) {
                break;
            }
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
