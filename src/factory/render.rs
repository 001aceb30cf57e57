//! # 单次渲染流程
//!
//! 拆成三段，供同步与异步入口共用：
//! - `prepare`：定位、缓存查询、基础副本、解码、目标尺寸
//! - `render_variant`：单个变体的缩放 + 编码 + 写入
//! - `finalize`：登记结果、写清单、优化、输出耗时

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};

use super::ResponsiveFactory;
use crate::cache::variant_file_name;
use crate::descriptor::{FailureStage, RenderFailure, ResponsiveImage};
use crate::engine::ImageEngine;
use crate::error::FactoryError;
use crate::policy::SourceMetrics;

/// 单个待渲染变体。
#[derive(Debug, Clone)]
pub(super) struct RenderJob {
    pub(super) width: u32,
    pub(super) height: u32,
    pub(super) path: PathBuf,
    pub(super) url: String,
}

/// 缓存未命中时的渲染计划。
pub(super) struct RenderPlan<I> {
    pub(super) image: ResponsiveImage,
    pub(super) source: Arc<I>,
    pub(super) output_dir: PathBuf,
    pub(super) jobs: Vec<RenderJob>,
}

pub(super) enum Preparation<I> {
    Cached(ResponsiveImage),
    Render(RenderPlan<I>),
}

impl<E: ImageEngine> ResponsiveFactory<E> {
    pub(super) fn prepare(&self, src: &str) -> Result<Preparation<E::Image>, FactoryError> {
        let mut image = ResponsiveImage::new(src);

        // 只接受普通路径段，`..` 会让输出落到 public_root 之外
        let segments: Vec<&str> = image
            .src()
            .split('/')
            .filter(|segment| !segment.is_empty() && *segment != ".")
            .collect();
        let Some((basename, dir_segments)) = segments
            .split_last()
            .filter(|_| !segments.contains(&".."))
        else {
            return Err(FactoryError::SourceNotFound(format!("非法的请求路径：{}", image.src())));
        };

        let url_dir = dir_segments.join("/");
        let lookup = if self.config.rebase {
            basename.to_string()
        } else {
            segments.join("/")
        };

        let resolved = self
            .locator
            .find(&self.config.source_root, &lookup)?
            .ok_or_else(|| {
                FactoryError::SourceNotFound(format!(
                    "{}（源目录：{}）",
                    image.src(),
                    self.config.source_root.display()
                ))
            })?;

        let file_name = resolved.stem().to_string();
        let extension = resolved.extension.clone();
        image.set_source_info(&file_name, &extension, &format!("/{}", url_dir));

        let output_dir = if url_dir.is_empty() {
            self.config.public_root.clone()
        } else {
            self.config.public_root.join(&url_dir)
        };

        log::debug!(
            "🔎 源文件：{}（{} 字节，相对目录：{}）→ 输出目录：{}",
            resolved.pathname.display(),
            resolved.size,
            resolved.relative_path.display(),
            output_dir.display()
        );

        let snapshot = self.policy.snapshot();
        if let Some(widths) = self.cache.lookup(&output_dir, &file_name, &extension, &snapshot)? {
            for width in widths {
                image.add_source(&variant_url(&url_dir, &file_name, width, &extension), width);
            }
            return Ok(Preparation::Cached(image));
        }

        let destination = output_dir.join(format!("{}.{}", file_name, extension));
        let bytes = self.storage.read(&resolved.pathname)?;
        self.storage.write_file(&destination, &bytes)?;

        let decoded = self.engine.decode(&destination)?;
        let (width, height) = self.engine.dimensions(&decoded);
        let metrics = SourceMetrics {
            width,
            height,
            byte_size: resolved.size,
        };

        let scale = self.policy.scale(&metrics);
        log::info!(
            "📐 {} 原始尺寸 {}x{}，策略 {} 生成 {} 个目标尺寸：{:?}",
            image.src(),
            width,
            height,
            self.policy.kind().as_str(),
            scale.len(),
            scale.widths()
        );

        let jobs = scale
            .iter()
            .map(|target| RenderJob {
                width: target.width,
                height: target.height,
                path: output_dir.join(variant_file_name(&file_name, target.width, &extension)),
                url: variant_url(&url_dir, &file_name, target.width, &extension),
            })
            .collect();

        Ok(Preparation::Render(RenderPlan {
            image,
            source: Arc::new(decoded),
            output_dir,
            jobs,
        }))
    }

    /// 渲染单个变体；开启缓存且文件已存在时直接复用。
    pub(super) fn render_variant(
        &self,
        source: &E::Image,
        extension: &str,
        job: &RenderJob,
    ) -> Result<(), FactoryError> {
        if !self.cache.should_render(&job.path) {
            log::debug!("♻️ 复用已有变体：{}", job.path.display());
            return Ok(());
        }

        let resized = self.engine.resize(source, job.width, job.height)?;
        let bytes = self.engine.encode(&resized, extension)?;
        self.storage.write_file(&job.path, &bytes)?;

        log::debug!("🖼️ 已生成 {}x{}：{}", job.width, job.height, job.path.display());
        Ok(())
    }

    pub(super) fn finalize(
        &self,
        plan: RenderPlan<E::Image>,
        outcomes: Vec<Result<(), FactoryError>>,
        prepare_elapsed: Duration,
        render_elapsed: Duration,
        total_start: Instant,
    ) -> ResponsiveImage {
        let RenderPlan {
            mut image,
            output_dir,
            jobs,
            ..
        } = plan;

        for (job, outcome) in jobs.iter().zip(outcomes) {
            match outcome {
                Ok(()) => {
                    image.add_source(&job.url, job.width);
                }
                Err(e) => {
                    log::warn!("⚠️ 变体渲染失败（{}w）：{} - {}", job.width, job.path.display(), e);
                    image.record_failure(RenderFailure {
                        width: job.width,
                        path: job.path.clone(),
                        stage: FailureStage::Render,
                        message: e.to_string(),
                    });
                }
            }
        }

        let complete = image.failures().is_empty();
        if let Err(e) = self.cache.write_manifest(
            &output_dir,
            image.file_name(),
            &image.widths(),
            &self.policy.snapshot(),
            complete,
        ) {
            log::warn!("⚠️ 写入缓存清单失败：{}", e);
        }

        let optimize_start = Instant::now();
        if self.config.optimize {
            self.optimize_variants(&mut image, &output_dir);
        }
        let optimize_elapsed = optimize_start.elapsed();

        log::info!(
            "✅ 响应式图片生成完成 - {} 变体={} 失败={} prepare={}ms render={}ms optimize={}ms total={}ms",
            image.src(),
            image.widths().len(),
            image.failures().len(),
            prepare_elapsed.as_millis(),
            render_elapsed.as_millis(),
            optimize_elapsed.as_millis(),
            total_start.elapsed().as_millis()
        );

        image
    }

    /// 按宽度倒序逐个优化，失败只记录。
    fn optimize_variants(&self, image: &mut ResponsiveImage, output_dir: &Path) {
        let paths: Vec<(u32, PathBuf)> = image
            .widths()
            .into_iter()
            .map(|width| {
                let name = variant_file_name(image.file_name(), width, image.extension());
                (width, output_dir.join(name))
            })
            .collect();

        for (width, path) in paths {
            if let Err(e) = self.optimizer.optimize(&path) {
                log::warn!("⚠️ 变体优化失败（{}w）：{} - {}", width, path.display(), e);
                image.record_failure(RenderFailure {
                    width,
                    path,
                    stage: FailureStage::Optimize,
                    message: e.to_string(),
                });
            }
        }
    }
}

/// 变体 URL：`{url_dir}/{file_name}-{width}.{extension}`，根目录时不带前缀。
fn variant_url(url_dir: &str, file_name: &str, width: u32, extension: &str) -> String {
    let name = variant_file_name(file_name, width, extension);
    if url_dir.is_empty() {
        name
    } else {
        format!("{}/{}", url_dir, name)
    }
}
