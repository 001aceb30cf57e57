//! # 缩放策略模块（policy）
//!
//! ## 设计思路
//!
//! 缩放策略是一个纯函数：输入源图指标（宽、高、字节数）与策略参数，
//! 输出一组“宽度 → 高度”的目标尺寸。没有 I/O，也不做任何渲染，
//! 相同输入永远得到相同输出，因此可以脱离文件系统单独测试。
//!
//! 三种策略实现同一个 [`SizingPolicy`] trait，在构造工厂时按 [`PolicyKind`]
//! 一次性选定，之后每次渲染不再重新分派。
//!
//! | 策略 | 规则 |
//! |------|------|
//! | [`WidthPolicy`] | 宽度按步进系数几何递减，直到低于最小宽度 |
//! | [`FileSizePolicy`] | 预估文件体积按步进系数几何递减，反推宽度 |
//! | [`SizesPolicy`] | 使用调用方给定的宽度列表，跳过放大 |

mod file_size;
mod sizes;
mod width;

use serde::{Deserialize, Serialize};

use crate::error::FactoryError;

pub use file_size::FileSizePolicy;
pub use sizes::SizesPolicy;
pub use width::WidthPolicy;

/// 策略类型。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PolicyKind {
    FileSize,
    Width,
    Sizes,
}

impl PolicyKind {
    /// 从配置字符串解析策略。
    pub fn from_str(policy: &str) -> Result<Self, FactoryError> {
        match policy.trim().to_lowercase().as_str() {
            "filesize" => Ok(Self::FileSize),
            "width" => Ok(Self::Width),
            "sizes" => Ok(Self::Sizes),
            other => Err(FactoryError::InvalidConfiguration(format!(
                "未知缩放策略：{}（可选：filesize / width / sizes）",
                other
            ))),
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::FileSize => "filesize",
            Self::Width => "width",
            Self::Sizes => "sizes",
        }
    }
}

/// 策略参数，构造工厂时确定，之后不可变。
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PolicyParameters {
    pub min_width: u32,
    pub max_width: Option<u32>,
    pub min_file_size: u64,
    pub max_file_size: Option<u64>,
    /// 每一步的缩放系数，取值 (0, 1)。
    pub step_modifier: f64,
    /// 是否输出原始分辨率。
    pub include_source: bool,
}

impl PolicyParameters {
    fn within_max_width(&self, width: u32) -> bool {
        self.max_width.is_none_or(|max| width <= max)
    }

    fn within_max_file_size(&self, size: f64) -> bool {
        self.max_file_size.is_none_or(|max| size <= max as f64)
    }

    /// 步进系数在 (0, 1) 内时每一步都严格缩小，几何迭代才会终止。
    fn shrinks(&self) -> bool {
        self.step_modifier > 0.0 && self.step_modifier < 1.0
    }
}

/// 源图指标。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SourceMetrics {
    pub width: u32,
    pub height: u32,
    /// 源文件字节数。
    pub byte_size: u64,
}

impl SourceMetrics {
    /// 高宽比（`height / width`）。
    pub fn aspect_ratio(&self) -> f64 {
        self.height as f64 / self.width as f64
    }

    /// 按原图比例推导高度，至少为 1 像素。
    pub fn height_for(&self, width: u32) -> u32 {
        ((width as f64 * self.aspect_ratio()).round() as u32).max(1)
    }
}

/// 单个目标尺寸。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TargetSize {
    pub width: u32,
    pub height: u32,
}

/// 目标尺寸集合：按宽度唯一，保留插入顺序。
///
/// 重复插入同一宽度时原位覆盖高度，不改变顺序。消费方如需有序输出需自行排序。
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScaleSet {
    entries: Vec<TargetSize>,
}

impl ScaleSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, width: u32, height: u32) {
        match self.entries.iter_mut().find(|entry| entry.width == width) {
            Some(entry) => entry.height = height,
            None => self.entries.push(TargetSize { width, height }),
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, TargetSize> {
        self.entries.iter()
    }

    pub fn contains_width(&self, width: u32) -> bool {
        self.entries.iter().any(|entry| entry.width == width)
    }

    pub fn height_of(&self, width: u32) -> Option<u32> {
        self.entries
            .iter()
            .find(|entry| entry.width == width)
            .map(|entry| entry.height)
    }

    pub fn widths(&self) -> Vec<u32> {
        self.entries.iter().map(|entry| entry.width).collect()
    }
}

impl<'a> IntoIterator for &'a ScaleSet {
    type Item = &'a TargetSize;
    type IntoIter = std::slice::Iter<'a, TargetSize>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.iter()
    }
}

/// 生成变体时所用策略的可持久化快照，缓存清单据此判断参数是否变更。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PolicySnapshot {
    pub policy: String,
    pub parameters: PolicyParameters,
    #[serde(default)]
    pub sizes: Vec<u32>,
}

/// 缩放策略能力。
pub trait SizingPolicy: Send + Sync {
    fn kind(&self) -> PolicyKind;

    /// 计算目标尺寸集合。纯函数，无 I/O。
    fn scale(&self, metrics: &SourceMetrics) -> ScaleSet;

    fn snapshot(&self) -> PolicySnapshot;
}

/// 按策略类型构造策略实例。
///
/// `sizes` 仅对 [`PolicyKind::Sizes`] 生效。
pub fn build_policy(
    kind: PolicyKind,
    parameters: PolicyParameters,
    sizes: &[u32],
) -> Box<dyn SizingPolicy> {
    match kind {
        PolicyKind::FileSize => Box::new(FileSizePolicy::new(parameters)),
        PolicyKind::Width => Box::new(WidthPolicy::new(parameters)),
        PolicyKind::Sizes => Box::new(SizesPolicy::new(parameters, sizes.to_vec())),
    }
}

#[cfg(test)]
pub(crate) fn test_parameters() -> PolicyParameters {
    PolicyParameters {
        min_width: 300,
        max_width: None,
        min_file_size: 5000,
        max_file_size: None,
        step_modifier: 0.5,
        include_source: true,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scale_set_overwrites_in_place() {
        let mut set = ScaleSet::new();
        set.insert(800, 600);
        set.insert(400, 300);
        set.insert(800, 601);

        assert_eq!(set.widths(), vec![800, 400]);
        assert_eq!(set.height_of(800), Some(601));
        assert_eq!(set.len(), 2);
    }

    #[test]
    fn policy_kind_roundtrip() {
        for name in ["filesize", "width", "sizes"] {
            assert_eq!(PolicyKind::from_str(name).expect("known policy").as_str(), name);
        }
        assert!(matches!(
            PolicyKind::from_str("area"),
            Err(FactoryError::InvalidConfiguration(_))
        ));
    }

    #[test]
    fn build_policy_selects_kind() {
        let params = test_parameters();

        assert_eq!(build_policy(PolicyKind::Width, params, &[]).kind(), PolicyKind::Width);
        assert_eq!(build_policy(PolicyKind::FileSize, params, &[]).kind(), PolicyKind::FileSize);
        assert_eq!(build_policy(PolicyKind::Sizes, params, &[500]).kind(), PolicyKind::Sizes);
    }

    #[test]
    fn height_for_keeps_aspect_ratio() {
        let metrics = SourceMetrics {
            width: 1920,
            height: 1080,
            byte_size: 1,
        };

        assert_eq!(metrics.height_for(960), 540);
        assert_eq!(metrics.height_for(1), 1);
    }
}
