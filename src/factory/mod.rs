//! # 渲染编排模块（factory）
//!
//! ## 设计思路
//!
//! `ResponsiveFactory` 只负责流程编排，不直接处理像素与文件格式。
//! 处理链路固定为：
//! 1. 定位源文件并计算输出位置
//! 2. 查询缓存，命中则直接返回
//! 3. 复制基础副本、解码、计算目标尺寸
//! 4. 逐个渲染变体（单个失败不影响其他变体）
//! 5. 写入缓存清单
//! 6. 可选：按宽度倒序优化所有变体
//!
//! ## 实现思路
//!
//! - 配置在构造时一次性校验，策略对象同时选定，之后每次调用共享同一份只读状态。
//! - 协作方（引擎、存储、定位、优化）全部通过 trait 注入，测试可替换为假实现。
//! - 同步 `create` 是参考路径；`create_async` 把准备与渲染放到阻塞线程池，
//!   以信号量限制同时进行的缩放任务数，全部完成后再进入优化阶段。
//! - 记录 `prepare/render/optimize/total` 阶段耗时，便于性能诊断。

mod render;

use std::sync::Arc;
use std::time::Instant;

use tokio::sync::Semaphore;

use crate::cache::VariantCache;
use crate::config::FactoryConfig;
use crate::descriptor::ResponsiveImage;
use crate::engine::{ImageEngine, RasterEngine, RasterEngineOptions};
use crate::error::FactoryError;
use crate::locator::{FsLocator, Locator};
use crate::optimizer::{CommandOptimizer, NoopOptimizer, Optimizer};
use crate::policy::{build_policy, SizingPolicy};
use crate::storage::{FsStorage, Storage};

use render::Preparation;

/// 响应式图片工厂。
///
/// 内部状态全部只读，`Clone` 只复制 `Arc`，可在多个线程或任务间共享。
pub struct ResponsiveFactory<E: ImageEngine = RasterEngine> {
    config: Arc<FactoryConfig>,
    engine: Arc<E>,
    storage: Arc<dyn Storage>,
    locator: Arc<dyn Locator>,
    optimizer: Arc<dyn Optimizer>,
    policy: Arc<dyn SizingPolicy>,
    cache: VariantCache,
}

impl<E: ImageEngine> Clone for ResponsiveFactory<E> {
    fn clone(&self) -> Self {
        Self {
            config: Arc::clone(&self.config),
            engine: Arc::clone(&self.engine),
            storage: Arc::clone(&self.storage),
            locator: Arc::clone(&self.locator),
            optimizer: Arc::clone(&self.optimizer),
            policy: Arc::clone(&self.policy),
            cache: self.cache.clone(),
        }
    }
}

impl ResponsiveFactory<RasterEngine> {
    /// 使用默认协作方创建工厂：`RasterEngine` + 本地文件系统 + 外部命令优化器。
    ///
    /// # 示例
    /// ```rust,no_run
    /// use responsive_images::{FactoryConfig, ResponsiveFactory};
    ///
    /// let config = FactoryConfig {
    ///     source_root: "assets".into(),
    ///     public_root: "public".into(),
    ///     sizes: vec![480, 960],
    ///     ..FactoryConfig::default()
    /// };
    /// let factory = ResponsiveFactory::new(config)?;
    /// let image = factory.create("img/photo.jpeg")?;
    /// println!("{}", image.srcset());
    /// # Ok::<(), responsive_images::FactoryError>(())
    /// ```
    pub fn new(config: FactoryConfig) -> Result<Self, FactoryError> {
        let validated = config.validate()?;

        let engine = RasterEngine::new(RasterEngineOptions {
            driver: validated.driver,
            filter: validated.filter,
            quality: config.quality,
            max_decoded_pixels: config.max_decoded_pixels,
        });

        let optimizer: Arc<dyn Optimizer> = if config.optimize {
            Arc::new(CommandOptimizer::new(&config.optimizer_options))
        } else {
            Arc::new(NoopOptimizer)
        };

        Self::with_collaborators(config, engine, Arc::new(FsStorage), Arc::new(FsLocator), optimizer)
    }
}

impl<E: ImageEngine> ResponsiveFactory<E> {
    /// 使用自定义协作方创建工厂。
    ///
    /// 配置在这里校验，非法配置返回 `InvalidConfiguration`；输出根目录不存在时自动创建。
    pub fn with_collaborators(
        config: FactoryConfig,
        engine: E,
        storage: Arc<dyn Storage>,
        locator: Arc<dyn Locator>,
        optimizer: Arc<dyn Optimizer>,
    ) -> Result<Self, FactoryError> {
        let validated = config.validate()?;
        let policy: Arc<dyn SizingPolicy> =
            Arc::from(build_policy(validated.policy, validated.parameters, &config.sizes));

        storage.ensure_directory(&config.public_root)?;

        log::info!(
            "⚙️ 响应式图片工厂已就绪 - driver={} policy={} cache={} optimize={} rebase={}",
            validated.driver.as_str(),
            validated.policy.as_str(),
            config.enable_cache,
            config.optimize,
            config.rebase
        );

        let cache = VariantCache::new(config.enable_cache, Arc::clone(&storage));

        Ok(Self {
            config: Arc::new(config),
            engine: Arc::new(engine),
            storage,
            locator,
            optimizer,
            policy,
            cache,
        })
    }

    pub fn config(&self) -> &FactoryConfig {
        &self.config
    }

    pub fn policy(&self) -> &dyn SizingPolicy {
        self.policy.as_ref()
    }

    pub fn engine(&self) -> &E {
        &self.engine
    }

    /// 为一张源图生成全部变体并返回描述。
    ///
    /// 源文件不存在、基础副本写入失败或解码失败时返回 `Err`；
    /// 单个变体的渲染或优化失败只记录在 [`ResponsiveImage::failures`] 中。
    pub fn create(&self, src: &str) -> Result<ResponsiveImage, FactoryError> {
        let total_start = Instant::now();

        let prepare_start = Instant::now();
        let plan = match self.prepare(src)? {
            Preparation::Cached(image) => {
                log::info!(
                    "⚡ 缓存命中 - {} 共 {} 个变体 total={}ms",
                    image.src(),
                    image.widths().len(),
                    total_start.elapsed().as_millis()
                );
                return Ok(image);
            }
            Preparation::Render(plan) => plan,
        };
        let prepare_elapsed = prepare_start.elapsed();

        let render_start = Instant::now();
        let outcomes: Vec<_> = plan
            .jobs
            .iter()
            .map(|job| self.render_variant(&plan.source, plan.image.extension(), job))
            .collect();
        let render_elapsed = render_start.elapsed();

        Ok(self.finalize(plan, outcomes, prepare_elapsed, render_elapsed, total_start))
    }

    /// 异步版本的 [`create`](Self::create)。
    ///
    /// 准备阶段与每个缩放任务都在阻塞线程池中执行，同时进行的缩放任务数不超过
    /// `concurrency`。结果与同步版本一致。
    ///
    /// # 示例
    /// ```rust,no_run
    /// use responsive_images::{FactoryConfig, ResponsiveFactory};
    ///
    /// # async fn demo() -> Result<(), responsive_images::FactoryError> {
    /// let factory = ResponsiveFactory::new(FactoryConfig::default())?;
    /// let image = factory.create_async("img/photo.jpeg").await?;
    /// println!("{}", image.srcset());
    /// # Ok(())
    /// # }
    /// ```
    pub async fn create_async(&self, src: &str) -> Result<ResponsiveImage, FactoryError> {
        let total_start = Instant::now();

        let prepare_start = Instant::now();
        let factory = self.clone();
        let request = src.to_string();
        let preparation = tokio::task::spawn_blocking(move || factory.prepare(&request))
            .await
            .map_err(|e| FactoryError::Task(format!("准备阶段线程执行失败：{}", e)))??;

        let plan = match preparation {
            Preparation::Cached(image) => {
                log::info!(
                    "⚡ 缓存命中 - {} 共 {} 个变体 total={}ms",
                    image.src(),
                    image.widths().len(),
                    total_start.elapsed().as_millis()
                );
                return Ok(image);
            }
            Preparation::Render(plan) => plan,
        };
        let prepare_elapsed = prepare_start.elapsed();

        let render_start = Instant::now();
        let semaphore = Arc::new(Semaphore::new(self.config.concurrency.max(1)));
        let mut handles = Vec::with_capacity(plan.jobs.len());

        for job in &plan.jobs {
            let permit = Arc::clone(&semaphore)
                .acquire_owned()
                .await
                .map_err(|e| FactoryError::Task(format!("获取渲染许可失败：{}", e)))?;

            let factory = self.clone();
            let source = Arc::clone(&plan.source);
            let extension = plan.image.extension().to_string();
            let job = job.clone();

            handles.push(tokio::task::spawn_blocking(move || {
                let _permit = permit;
                factory.render_variant(&source, &extension, &job)
            }));
        }

        let mut outcomes = Vec::with_capacity(handles.len());
        for handle in handles {
            let outcome = handle
                .await
                .unwrap_or_else(|e| Err(FactoryError::Task(format!("渲染线程执行失败：{}", e))));
            outcomes.push(outcome);
        }
        let render_elapsed = render_start.elapsed();

        let factory = self.clone();
        tokio::task::spawn_blocking(move || {
            factory.finalize(plan, outcomes, prepare_elapsed, render_elapsed, total_start)
        })
        .await
        .map_err(|e| FactoryError::Task(format!("收尾阶段线程执行失败：{}", e)))
    }
}
