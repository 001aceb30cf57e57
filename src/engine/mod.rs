//! # 图片引擎模块（engine）
//!
//! ## 设计思路
//!
//! 工厂只关心“解码 → 缩放 → 编码”三个能力，不关心底层像素实现。
//! 因此以 [`ImageEngine`] trait 作为接缝：
//!
//! - `decode`：读取文件并得到像素图
//! - `dimensions`：读取像素宽高（供缩放策略计算）
//! - `resize`：按目标宽高缩放，源图只读
//! - `encode`：按扩展名编码为字节
//!
//! 图片类型使用关联类型 `Image`，测试中可以用轻量的假图替代真实像素缓冲。
//!
//! ## 实现思路
//!
//! - `raster`：基于 `image` crate 的默认实现（解码 + 像素上限 + 编码）
//! - `resize`：两种缩放驱动（`image::resize_exact` / `fast_image_resize`）
//! - `error`：引擎错误类型

mod error;
mod raster;
mod resize;

use std::path::Path;

pub use error::EngineError;
pub use raster::{RasterEngine, RasterEngineOptions};

/// 图片引擎能力。
///
/// 实现必须是 `Send + Sync`，以便异步模式下多个缩放任务共享同一个引擎与源图。
pub trait ImageEngine: Send + Sync + 'static {
    /// 解码后的像素图。
    type Image: Send + Sync + 'static;

    /// 从文件解码图片。
    fn decode(&self, path: &Path) -> Result<Self::Image, EngineError>;

    /// 像素宽高。
    fn dimensions(&self, image: &Self::Image) -> (u32, u32);

    /// 缩放到精确的目标尺寸，不修改源图。
    fn resize(&self, image: &Self::Image, width: u32, height: u32) -> Result<Self::Image, EngineError>;

    /// 按扩展名（如 `jpeg`、`png`）编码为字节。
    fn encode(&self, image: &Self::Image, extension: &str) -> Result<Vec<u8>, EngineError>;
}
