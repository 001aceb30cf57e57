//! # 缩放驱动
//!
//! 按配置的 [`Driver`] 分派：
//! - `Image`：直接使用 `DynamicImage::resize_exact`
//! - `FastImageResize`：SIMD 卷积缩放，失败时回退 `resize_exact`，保证单个变体不因驱动问题丢失

use fast_image_resize as fr;
use image::{DynamicImage, ImageBuffer, Rgba};

use super::{EngineError, RasterEngine};
use crate::config::{Driver, ResizeFilter};

impl RasterEngine {
    pub(super) fn resize_exact(
        &self,
        image: &DynamicImage,
        target_width: u32,
        target_height: u32,
    ) -> Result<DynamicImage, EngineError> {
        let filter = self.options.filter;

        match self.options.driver {
            Driver::Image => Ok(image.resize_exact(target_width, target_height, filter.to_image_filter())),
            Driver::FastImageResize => {
                match Self::resize_with_fast_image_resize(image, target_width, target_height, filter) {
                    Ok(resized) => Ok(resized),
                    Err(err) => {
                        log::warn!(
                            "⚠️ fast_image_resize 缩放失败，回退 image::resize_exact：{}",
                            err
                        );
                        Ok(image.resize_exact(target_width, target_height, filter.to_image_filter()))
                    }
                }
            }
        }
    }

    fn resize_with_fast_image_resize(
        image: &DynamicImage,
        target_width: u32,
        target_height: u32,
        filter: ResizeFilter,
    ) -> Result<DynamicImage, EngineError> {
        let src = image.to_rgba8();
        let (src_width, src_height) = src.dimensions();

        let src_image = fr::images::Image::from_vec_u8(
            src_width,
            src_height,
            src.into_raw(),
            fr::PixelType::U8x4,
        )
        .map_err(|e| EngineError::Decode(format!("构建源图像缓冲失败：{}", e)))?;

        let mut dst_image = fr::images::Image::new(target_width, target_height, fr::PixelType::U8x4);

        let mut resizer = fr::Resizer::new();
        let options = fr::ResizeOptions::new()
            .resize_alg(fr::ResizeAlg::Convolution(Self::to_fast_filter(filter)));

        resizer
            .resize(&src_image, &mut dst_image, Some(&options))
            .map_err(|e| EngineError::Decode(format!("fast_image_resize 执行失败：{}", e)))?;

        let rgba = ImageBuffer::<Rgba<u8>, Vec<u8>>::from_raw(
            target_width,
            target_height,
            dst_image.into_vec(),
        )
        .ok_or_else(|| EngineError::Decode("fast_image_resize 输出缓冲长度异常".to_string()))?;

        Ok(DynamicImage::ImageRgba8(rgba))
    }

    fn to_fast_filter(filter: ResizeFilter) -> fr::FilterType {
        match filter {
            ResizeFilter::Nearest => fr::FilterType::Box,
            ResizeFilter::Triangle => fr::FilterType::Bilinear,
            ResizeFilter::CatmullRom => fr::FilterType::CatmullRom,
            ResizeFilter::Gaussian => fr::FilterType::Mitchell,
            ResizeFilter::Lanczos3 => fr::FilterType::Lanczos3,
        }
    }
}
