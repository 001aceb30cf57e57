//! # 默认图片引擎
//!
//! ## 设计思路
//!
//! 将“文件 → 图像 → 字节”的过程集中管理，并在关键节点增加资源上限控制。
//! 优先做签名与尺寸检查，再进行完整解码，降低恶意输入触发高内存开销的风险。
//!
//! ## 实现思路
//!
//! 1. 读取文件字节并通过 magic bytes 校验是否为图片
//! 2. 读取 header 尺寸，按像素上限快速拒绝
//! 3. 完整解码
//! 4. 缩放交给 `resize` 子模块按驱动分派
//! 5. 编码时按扩展名推断格式，JPEG 使用配置的质量参数

use std::io::Cursor;
use std::path::Path;

use image::codecs::jpeg::JpegEncoder;
use image::{DynamicImage, GenericImageView, ImageFormat};

use super::{EngineError, ImageEngine};
use crate::config::{Driver, ResizeFilter};

/// 默认引擎的可调参数。
#[derive(Debug, Clone, Copy)]
pub struct RasterEngineOptions {
    /// 缩放驱动。
    pub driver: Driver,
    /// 缩放滤镜。
    pub filter: ResizeFilter,
    /// JPEG 编码质量（1~100）。
    pub quality: u8,
    /// 解码后的像素上限。
    pub max_decoded_pixels: u64,
}

impl Default for RasterEngineOptions {
    fn default() -> Self {
        Self {
            driver: Driver::Image,
            filter: ResizeFilter::Lanczos3,
            quality: 90,
            max_decoded_pixels: 100_000_000,
        }
    }
}

/// 基于 `image` / `fast_image_resize` 的图片引擎。
#[derive(Debug, Clone)]
pub struct RasterEngine {
    pub(super) options: RasterEngineOptions,
}

impl RasterEngine {
    pub fn new(options: RasterEngineOptions) -> Self {
        Self { options }
    }

    pub fn options(&self) -> &RasterEngineOptions {
        &self.options
    }

    /// 通过文件签名（magic bytes）校验输入是否为图片。
    fn validate_image_signature(bytes: &[u8]) -> Result<(), EngineError> {
        if bytes.is_empty() {
            return Err(EngineError::InvalidFormat("图片内容为空".to_string()));
        }

        let kind = infer::get(bytes)
            .ok_or_else(|| EngineError::InvalidFormat("无法识别图片类型".to_string()))?;

        if kind.matcher_type() != infer::MatcherType::Image {
            return Err(EngineError::InvalidFormat(format!(
                "文件签名不是图片类型：{}",
                kind.mime_type()
            )));
        }

        Ok(())
    }

    /// 仅通过内存中的图片头信息读取宽高。
    fn inspect_dimensions_from_memory(bytes: &[u8]) -> Result<(u32, u32), EngineError> {
        image::ImageReader::new(Cursor::new(bytes))
            .with_guessed_format()
            .map_err(|e| EngineError::InvalidFormat(format!("无法识别图片格式：{}", e)))?
            .into_dimensions()
            .map_err(|e| EngineError::InvalidFormat(format!("无法读取图片尺寸：{}", e)))
    }

    /// 校验像素数量是否超过配置上限。
    fn validate_pixel_limits(&self, width: u32, height: u32) -> Result<(), EngineError> {
        let pixels = (width as u64)
            .checked_mul(height as u64)
            .ok_or_else(|| EngineError::ResourceLimit("图片像素数溢出".to_string()))?;

        if pixels > self.options.max_decoded_pixels {
            return Err(EngineError::ResourceLimit(format!(
                "图片像素过大：{} 像素（限制：{} 像素）",
                pixels, self.options.max_decoded_pixels
            )));
        }

        Ok(())
    }
}

impl Default for RasterEngine {
    fn default() -> Self {
        Self::new(RasterEngineOptions::default())
    }
}

impl ImageEngine for RasterEngine {
    type Image = DynamicImage;

    fn decode(&self, path: &Path) -> Result<DynamicImage, EngineError> {
        let bytes = std::fs::read(path).map_err(|e| {
            EngineError::FileSystem(format!("无法读取图片文件 {}：{}", path.display(), e))
        })?;
        Self::validate_image_signature(&bytes)?;

        let (header_width, header_height) = Self::inspect_dimensions_from_memory(&bytes)?;
        self.validate_pixel_limits(header_width, header_height)?;

        let decoded = image::load_from_memory(&bytes)
            .map_err(|e| EngineError::Decode(format!("图片解码失败：{}", e)))?;

        let (width, height) = decoded.dimensions();
        log::debug!("🔍 解码完成 - {} {}x{}", path.display(), width, height);

        Ok(decoded)
    }

    fn dimensions(&self, image: &DynamicImage) -> (u32, u32) {
        image.dimensions()
    }

    fn resize(&self, image: &DynamicImage, width: u32, height: u32) -> Result<DynamicImage, EngineError> {
        if width == 0 || height == 0 {
            return Err(EngineError::ResourceLimit(format!(
                "目标尺寸无效：{}x{}",
                width, height
            )));
        }

        self.resize_exact(image, width, height)
    }

    fn encode(&self, image: &DynamicImage, extension: &str) -> Result<Vec<u8>, EngineError> {
        let format = ImageFormat::from_extension(extension).ok_or_else(|| {
            EngineError::InvalidFormat(format!("不支持的输出格式：{}", extension))
        })?;

        let mut buffer = Vec::new();

        if format == ImageFormat::Jpeg {
            // JPEG 不支持透明通道
            let rgb = DynamicImage::ImageRgb8(image.to_rgb8());
            let encoder = JpegEncoder::new_with_quality(&mut buffer, self.options.quality);
            rgb.write_with_encoder(encoder)
                .map_err(|e| EngineError::Encode(format!("JPEG 编码失败：{}", e)))?;
        } else {
            image
                .write_to(&mut Cursor::new(&mut buffer), format)
                .map_err(|e| EngineError::Encode(format!("{:?} 编码失败：{}", format, e)))?;
        }

        Ok(buffer)
    }
}
