//! # 配置模块
//!
//! ## 设计思路
//!
//! 所有可调参数集中在一个不可变的 `FactoryConfig` 中，构造工厂时一次性校验，
//! 之后每次 `create` 不再重复校验，也不存在“配置到一半”的工厂实例。
//!
//! ## 实现思路
//!
//! - `Default` 提供与历史行为一致的默认值（`sizes` 策略、步进 0.5、最小宽度 300）。
//! - 字符串型枚举（驱动、策略、滤镜）沿用 `from_str` / `as_str` 双向映射，
//!   便于从 JSON 读取并在日志中稳定输出。
//! - `validate` 将字符串解析为强类型，任何非法值都返回 `InvalidConfiguration`。

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use image::imageops::FilterType;
use serde::{Deserialize, Serialize};

use crate::error::FactoryError;
use crate::policy::{PolicyKind, PolicyParameters};

/// 缩放驱动（白名单）。
///
/// - `Image`：`image::DynamicImage::resize_exact`
/// - `FastImageResize`：`fast_image_resize` SIMD 卷积，失败时回退 `Image`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Driver {
    Image,
    FastImageResize,
}

impl Driver {
    pub fn from_str(driver: &str) -> Result<Self, FactoryError> {
        match driver.trim().to_lowercase().as_str() {
            "image" => Ok(Self::Image),
            "fast_image_resize" => Ok(Self::FastImageResize),
            other => Err(FactoryError::InvalidConfiguration(format!(
                "未知驱动：{}（可选：image / fast_image_resize）",
                other
            ))),
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Image => "image",
            Self::FastImageResize => "fast_image_resize",
        }
    }
}

/// 缩放滤镜。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResizeFilter {
    Nearest,
    Triangle,
    CatmullRom,
    Gaussian,
    Lanczos3,
}

impl ResizeFilter {
    pub fn from_str(filter: &str) -> Result<Self, FactoryError> {
        match filter.trim().to_lowercase().as_str() {
            "nearest" => Ok(Self::Nearest),
            "triangle" => Ok(Self::Triangle),
            "catmull_rom" => Ok(Self::CatmullRom),
            "gaussian" => Ok(Self::Gaussian),
            "lanczos3" => Ok(Self::Lanczos3),
            other => Err(FactoryError::InvalidConfiguration(format!(
                "未知滤镜：{}（可选：nearest / triangle / catmull_rom / gaussian / lanczos3）",
                other
            ))),
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Nearest => "nearest",
            Self::Triangle => "triangle",
            Self::CatmullRom => "catmull_rom",
            Self::Gaussian => "gaussian",
            Self::Lanczos3 => "lanczos3",
        }
    }

    pub(crate) fn to_image_filter(self) -> FilterType {
        match self {
            Self::Nearest => FilterType::Nearest,
            Self::Triangle => FilterType::Triangle,
            Self::CatmullRom => FilterType::CatmullRom,
            Self::Gaussian => FilterType::Gaussian,
            Self::Lanczos3 => FilterType::Lanczos3,
        }
    }
}

/// 工厂配置。
///
/// 字段覆盖了定位、缓存、缩放策略、编码与优化五个阶段。
/// 所有字段都有默认值，JSON 中只需写出需要覆盖的部分。
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FactoryConfig {
    /// 缩放驱动标识，见 [`Driver`]。
    pub driver: String,
    /// 源图片根目录。
    pub source_root: PathBuf,
    /// 输出（公开）根目录。
    pub public_root: PathBuf,
    /// 是否只按文件名在源目录中查找，并把结果平铺到请求路径所在目录。
    pub rebase: bool,
    /// 开启后已存在的变体不会被覆盖，且可整体命中缓存。
    pub enable_cache: bool,
    /// 是否在渲染完成后运行优化器。
    pub optimize: bool,
    /// 缩放策略：`filesize` / `width` / `sizes`。
    pub policy: String,
    /// 每一步的缩放系数，必须在 (0, 1) 之间。
    pub step_modifier: f64,
    /// 最小宽度（像素），必须大于 0。
    pub min_width: u32,
    /// 最大宽度（像素）。
    pub max_width: Option<u32>,
    /// 预估文件体积下限（字节），仅 `filesize` 策略使用。
    pub min_file_size: u64,
    /// 预估文件体积上限（字节），仅 `filesize` 策略使用。
    pub max_file_size: Option<u64>,
    /// 显式宽度列表，仅 `sizes` 策略使用。
    pub sizes: Vec<u32>,
    /// 是否把原始分辨率也作为一个变体输出。
    pub include_source: bool,
    /// 按扩展名覆盖优化命令，`{path}` 会被替换为文件路径。
    pub optimizer_options: HashMap<String, Vec<String>>,
    /// JPEG 编码质量（1~100）。
    pub quality: u8,
    /// 缩放滤镜，见 [`ResizeFilter`]。
    pub filter: String,
    /// 解码后的像素上限（`width * height`）。
    pub max_decoded_pixels: u64,
    /// 异步模式下同时进行的缩放任务数。
    pub concurrency: usize,
}

impl Default for FactoryConfig {
    fn default() -> Self {
        Self {
            driver: Driver::Image.as_str().to_string(),
            source_root: PathBuf::from("./"),
            public_root: PathBuf::from("./"),
            rebase: false,
            enable_cache: false,
            optimize: false,
            policy: PolicyKind::Sizes.as_str().to_string(),
            step_modifier: 0.5,
            min_width: 300,
            max_width: None,
            min_file_size: 5000,
            max_file_size: None,
            sizes: Vec::new(),
            include_source: true,
            optimizer_options: HashMap::new(),
            quality: 90,
            filter: ResizeFilter::Lanczos3.as_str().to_string(),
            max_decoded_pixels: 100_000_000,
            concurrency: std::thread::available_parallelism()
                .map(|n| n.get())
                .unwrap_or(4),
        }
    }
}

/// 校验通过后的强类型配置片段。
#[derive(Debug, Clone)]
pub(crate) struct ValidatedConfig {
    pub(crate) driver: Driver,
    pub(crate) policy: PolicyKind,
    pub(crate) filter: ResizeFilter,
    pub(crate) parameters: PolicyParameters,
}

impl FactoryConfig {
    /// 从 JSON 字符串读取配置，缺省字段使用默认值。
    ///
    /// # 示例
    /// ```rust
    /// use responsive_images::FactoryConfig;
    ///
    /// let config = FactoryConfig::from_json_str(r#"{ "policy": "width", "step_modifier": 0.8 }"#)?;
    /// assert_eq!(config.policy, "width");
    /// assert_eq!(config.min_width, 300);
    /// # Ok::<(), responsive_images::FactoryError>(())
    /// ```
    pub fn from_json_str(content: &str) -> Result<Self, FactoryError> {
        serde_json::from_str(content)
            .map_err(|e| FactoryError::InvalidConfiguration(format!("解析配置失败: {}", e)))
    }

    /// 从 JSON 文件读取配置。
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, FactoryError> {
        let content = fs::read_to_string(path.as_ref())?;
        Self::from_json_str(&content)
    }

    /// 策略参数快照。
    pub fn policy_parameters(&self) -> PolicyParameters {
        PolicyParameters {
            min_width: self.min_width,
            max_width: self.max_width,
            min_file_size: self.min_file_size,
            max_file_size: self.max_file_size,
            step_modifier: self.step_modifier,
            include_source: self.include_source,
        }
    }

    /// 一次性校验全部配置。
    pub(crate) fn validate(&self) -> Result<ValidatedConfig, FactoryError> {
        let driver = Driver::from_str(&self.driver)?;
        let policy = PolicyKind::from_str(&self.policy)?;
        let filter = ResizeFilter::from_str(&self.filter)?;

        if self.min_width == 0 {
            return Err(FactoryError::InvalidConfiguration(
                "min_width 必须大于 0".to_string(),
            ));
        }
        if !(self.step_modifier > 0.0 && self.step_modifier < 1.0) {
            return Err(FactoryError::InvalidConfiguration(format!(
                "step_modifier 必须在 (0, 1) 之间，当前：{}",
                self.step_modifier
            )));
        }
        if !(1..=100).contains(&self.quality) {
            return Err(FactoryError::InvalidConfiguration(format!(
                "quality 必须在 1~100 之间，当前：{}",
                self.quality
            )));
        }
        if let Some(max_width) = self.max_width {
            if max_width < self.min_width {
                return Err(FactoryError::InvalidConfiguration(format!(
                    "max_width（{}）不能小于 min_width（{}）",
                    max_width, self.min_width
                )));
            }
        }
        if self.max_decoded_pixels == 0 {
            return Err(FactoryError::InvalidConfiguration(
                "max_decoded_pixels 必须大于 0".to_string(),
            ));
        }

        Ok(ValidatedConfig {
            driver,
            policy,
            filter,
            parameters: self.policy_parameters(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        let validated = FactoryConfig::default().validate().expect("default config should be valid");

        assert_eq!(validated.driver, Driver::Image);
        assert_eq!(validated.policy, PolicyKind::Sizes);
        assert_eq!(validated.filter, ResizeFilter::Lanczos3);
        assert!(validated.parameters.include_source);
    }

    #[test]
    fn rejects_unknown_driver() {
        let config = FactoryConfig {
            driver: "imagick".to_string(),
            ..FactoryConfig::default()
        };

        assert!(matches!(config.validate(), Err(FactoryError::InvalidConfiguration(_))));
    }

    #[test]
    fn rejects_step_modifier_outside_open_interval() {
        for step in [0.0, 1.0, 1.5, -0.2, f64::NAN] {
            let config = FactoryConfig {
                step_modifier: step,
                ..FactoryConfig::default()
            };
            assert!(
                matches!(config.validate(), Err(FactoryError::InvalidConfiguration(_))),
                "step {} should be rejected",
                step
            );
        }
    }

    #[test]
    fn rejects_zero_min_width() {
        let config = FactoryConfig {
            min_width: 0,
            ..FactoryConfig::default()
        };

        assert!(matches!(config.validate(), Err(FactoryError::InvalidConfiguration(_))));
    }

    #[test]
    fn rejects_max_width_below_min_width() {
        let config = FactoryConfig {
            min_width: 500,
            max_width: Some(400),
            ..FactoryConfig::default()
        };

        assert!(matches!(config.validate(), Err(FactoryError::InvalidConfiguration(_))));
    }

    #[test]
    fn parses_partial_json_with_defaults() {
        let config = FactoryConfig::from_json_str(
            r#"{ "driver": "fast_image_resize", "policy": "filesize", "max_file_size": 100000 }"#,
        )
        .expect("partial json should parse");

        assert_eq!(config.max_file_size, Some(100_000));
        assert_eq!(config.min_file_size, 5000);
        assert!(config.include_source);

        let validated = config.validate().expect("config should be valid");
        assert_eq!(validated.driver, Driver::FastImageResize);
        assert_eq!(validated.policy, PolicyKind::FileSize);
    }

    #[test]
    fn negative_min_width_in_json_is_invalid_configuration() {
        let result = FactoryConfig::from_json_str(r#"{ "min_width": -10 }"#);

        assert!(matches!(result, Err(FactoryError::InvalidConfiguration(_))));
    }

    #[test]
    fn reads_config_from_json_file() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("responsive.json");
        fs::write(&path, r#"{ "policy": "width", "sizes": [480, 960], "enable_cache": true }"#)
            .expect("write config");

        let config = FactoryConfig::from_json_file(&path).expect("config file should parse");

        assert_eq!(config.policy, "width");
        assert_eq!(config.sizes, vec![480, 960]);
        assert!(config.enable_cache);
        assert_eq!(config.step_modifier, 0.5);
    }

    #[test]
    fn missing_config_file_is_io_error() {
        let dir = tempfile::tempdir().expect("tempdir");

        let result = FactoryConfig::from_json_file(dir.path().join("missing.json"));

        assert!(matches!(result, Err(FactoryError::Io(_))));
    }

    #[test]
    fn filter_roundtrip_is_stable() {
        for name in ["nearest", "triangle", "catmull_rom", "gaussian", "lanczos3"] {
            let filter = ResizeFilter::from_str(name).expect("known filter");
            assert_eq!(filter.as_str(), name);
        }
    }
}
