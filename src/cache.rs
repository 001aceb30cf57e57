//! # 变体缓存模块
//!
//! ## 设计思路
//!
//! 缓存判断完全基于输出目录中已存在的文件，不维护任何内存状态：
//!
//! - 单个变体：开启缓存且目标文件已存在时跳过渲染。
//! - 整体命中：开启缓存且基础副本已存在时，尝试直接从磁盘恢复变体列表，
//!   命中则本次调用不做任何解码与缩放。
//!
//! ## 实现思路
//!
//! 1. 优先读取同目录下的清单文件 `{file_name}.variants.json`。清单记录生成时的策略快照，
//!    快照与当前不一致、清单标记为不完整、或列出的文件缺失时视为未命中，避免返回过期变体。
//! 2. 没有清单（或清单无法解析）时回退到文件名索引：匹配 `{file_name}-{宽度}.{ext}`。
//! 3. 结果为空视为未命中。
//! 4. 缓存从不删除任何文件。

use std::path::{Path, PathBuf};
use std::sync::Arc;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::FactoryError;
use crate::policy::PolicySnapshot;
use crate::storage::Storage;

const MANIFEST_SUFFIX: &str = "variants.json";

/// 清单文件内容。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VariantManifest {
    /// 成功生成的变体宽度。
    pub widths: Vec<u32>,
    /// 生成时使用的策略快照。
    pub snapshot: PolicySnapshot,
    /// 所有目标都渲染成功时为 `true`。
    #[serde(default)]
    pub complete: bool,
    /// RFC 3339 时间戳。
    pub generated_at: String,
}

/// 变体缓存。
#[derive(Clone)]
pub struct VariantCache {
    enabled: bool,
    storage: Arc<dyn Storage>,
}

impl VariantCache {
    pub fn new(enabled: bool, storage: Arc<dyn Storage>) -> Self {
        Self { enabled, storage }
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// 是否需要渲染该路径：未开启缓存或文件不存在。
    pub fn should_render(&self, path: &Path) -> bool {
        !self.enabled || !self.storage.exists(path)
    }

    /// 清单文件路径。
    pub fn manifest_path(dir: &Path, file_name: &str) -> PathBuf {
        dir.join(format!("{}.{}", file_name, MANIFEST_SUFFIX))
    }

    /// 尝试从磁盘恢复变体宽度。
    ///
    /// 返回 `None` 表示未命中，需要重新渲染。
    pub fn lookup(
        &self,
        dir: &Path,
        file_name: &str,
        extension: &str,
        snapshot: &PolicySnapshot,
    ) -> Result<Option<Vec<u32>>, FactoryError> {
        if !self.enabled {
            return Ok(None);
        }

        let base = dir.join(format!("{}.{}", file_name, extension));
        if !self.storage.exists(&base) {
            return Ok(None);
        }

        let manifest_path = Self::manifest_path(dir, file_name);
        if self.storage.exists(&manifest_path) {
            match self.read_manifest(&manifest_path) {
                Ok(manifest) => return Ok(self.check_manifest(dir, file_name, extension, snapshot, manifest)),
                Err(e) => {
                    log::warn!("⚠️ 缓存清单不可用，回退到文件名索引：{}（{}）", manifest_path.display(), e);
                }
            }
        }

        let widths = self.index_by_filename(dir, file_name, extension)?;
        if widths.is_empty() {
            return Ok(None);
        }

        log::debug!("📂 文件名索引命中 {} 个变体：{}", widths.len(), base.display());
        Ok(Some(widths))
    }

    /// 写入清单，记录本次生成的变体与策略快照。
    pub fn write_manifest(
        &self,
        dir: &Path,
        file_name: &str,
        widths: &[u32],
        snapshot: &PolicySnapshot,
        complete: bool,
    ) -> Result<(), FactoryError> {
        let manifest = VariantManifest {
            widths: widths.to_vec(),
            snapshot: snapshot.clone(),
            complete,
            generated_at: chrono::Local::now().to_rfc3339(),
        };

        let bytes = serde_json::to_vec_pretty(&manifest)
            .map_err(|e| FactoryError::Storage(format!("序列化缓存清单失败: {}", e)))?;

        self.storage
            .write_file(&Self::manifest_path(dir, file_name), &bytes)
    }

    fn read_manifest(&self, path: &Path) -> Result<VariantManifest, FactoryError> {
        let bytes = self.storage.read(path)?;
        serde_json::from_slice(&bytes)
            .map_err(|e| FactoryError::Storage(format!("解析缓存清单失败: {}", e)))
    }

    fn check_manifest(
        &self,
        dir: &Path,
        file_name: &str,
        extension: &str,
        snapshot: &PolicySnapshot,
        manifest: VariantManifest,
    ) -> Option<Vec<u32>> {
        if manifest.snapshot != *snapshot {
            log::info!("♻️ 策略参数已变更，缓存失效：{}", file_name);
            return None;
        }

        if !manifest.complete || manifest.widths.is_empty() {
            return None;
        }

        let missing = manifest.widths.iter().find(|&&width| {
            !self
                .storage
                .exists(&dir.join(variant_file_name(file_name, width, extension)))
        });

        if let Some(width) = missing {
            log::info!("♻️ 缓存变体缺失（{}w），重新生成：{}", width, file_name);
            return None;
        }

        Some(manifest.widths)
    }

    fn index_by_filename(
        &self,
        dir: &Path,
        file_name: &str,
        extension: &str,
    ) -> Result<Vec<u32>, FactoryError> {
        let pattern = format!(
            r"^{}-(\d+)\.{}$",
            regex::escape(file_name),
            regex::escape(extension)
        );
        let matcher = Regex::new(&pattern)
            .map_err(|e| FactoryError::Storage(format!("构建缓存索引失败: {}", e)))?;

        let widths = self
            .storage
            .list_files(dir)?
            .iter()
            .filter_map(|name| matcher.captures(name))
            .filter_map(|captures| captures.get(1)?.as_str().parse::<u32>().ok())
            .collect();

        Ok(widths)
    }
}

/// 变体文件名：`{file_name}-{width}.{extension}`。
pub fn variant_file_name(file_name: &str, width: u32, extension: &str) -> String {
    format!("{}-{}.{}", file_name, width, extension)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::policy::test_parameters;
    use crate::storage::FsStorage;
    use std::fs;

    fn snapshot(step: f64) -> PolicySnapshot {
        PolicySnapshot {
            policy: "width".to_string(),
            parameters: crate::policy::PolicyParameters {
                step_modifier: step,
                ..test_parameters()
            },
            sizes: Vec::new(),
        }
    }

    fn touch(dir: &Path, name: &str) {
        fs::write(dir.join(name), b"").expect("write");
    }

    fn cache(enabled: bool) -> VariantCache {
        VariantCache::new(enabled, Arc::new(FsStorage))
    }

    #[test]
    fn should_render_respects_enabled_flag() {
        let dir = tempfile::tempdir().expect("tempdir");
        touch(dir.path(), "image-500.jpeg");
        let existing = dir.path().join("image-500.jpeg");
        let missing = dir.path().join("image-300.jpeg");

        assert!(!cache(false).is_enabled());
        assert!(cache(true).is_enabled());
        assert!(cache(false).should_render(&existing));
        assert!(!cache(true).should_render(&existing));
        assert!(cache(true).should_render(&missing));
    }

    #[test]
    fn filename_index_finds_only_matching_variants() {
        let dir = tempfile::tempdir().expect("tempdir");
        for name in [
            "image.jpeg",
            "image-500.jpeg",
            "image-1000.jpeg",
            "image-1000.png",
            "image-x.jpeg",
            "other-300.jpeg",
            "image-extra-300.jpeg",
        ] {
            touch(dir.path(), name);
        }

        let mut widths = cache(true)
            .lookup(dir.path(), "image", "jpeg", &snapshot(0.5))
            .expect("lookup")
            .expect("cache should hit");
        widths.sort();

        assert_eq!(widths, vec![500, 1000]);
    }

    #[test]
    fn lookup_misses_without_base_copy_or_when_disabled() {
        let dir = tempfile::tempdir().expect("tempdir");
        touch(dir.path(), "image-500.jpeg");

        assert!(cache(true).lookup(dir.path(), "image", "jpeg", &snapshot(0.5)).expect("lookup").is_none());

        touch(dir.path(), "image.jpeg");
        assert!(cache(false).lookup(dir.path(), "image", "jpeg", &snapshot(0.5)).expect("lookup").is_none());
    }

    #[test]
    fn empty_index_is_a_miss() {
        let dir = tempfile::tempdir().expect("tempdir");
        touch(dir.path(), "image.jpeg");

        assert!(cache(true).lookup(dir.path(), "image", "jpeg", &snapshot(0.5)).expect("lookup").is_none());
    }

    #[test]
    fn manifest_is_authoritative_over_filename_index() {
        let dir = tempfile::tempdir().expect("tempdir");
        for name in ["image.jpeg", "image-800.jpeg", "image-400.jpeg", "image-200.jpeg"] {
            touch(dir.path(), name);
        }
        let cache = cache(true);
        cache
            .write_manifest(dir.path(), "image", &[800, 400], &snapshot(0.5), true)
            .expect("write manifest");

        let widths = cache
            .lookup(dir.path(), "image", "jpeg", &snapshot(0.5))
            .expect("lookup")
            .expect("cache should hit");

        assert_eq!(widths, vec![800, 400]);
    }

    #[test]
    fn manifest_with_different_parameters_is_a_miss() {
        let dir = tempfile::tempdir().expect("tempdir");
        for name in ["image.jpeg", "image-800.jpeg"] {
            touch(dir.path(), name);
        }
        let cache = cache(true);
        cache
            .write_manifest(dir.path(), "image", &[800], &snapshot(0.5), true)
            .expect("write manifest");

        assert!(cache.lookup(dir.path(), "image", "jpeg", &snapshot(0.8)).expect("lookup").is_none());
    }

    #[test]
    fn manifest_with_missing_variant_or_incomplete_run_is_a_miss() {
        let dir = tempfile::tempdir().expect("tempdir");
        for name in ["image.jpeg", "image-800.jpeg"] {
            touch(dir.path(), name);
        }
        let cache = cache(true);

        cache
            .write_manifest(dir.path(), "image", &[800, 400], &snapshot(0.5), true)
            .expect("write manifest");
        assert!(cache.lookup(dir.path(), "image", "jpeg", &snapshot(0.5)).expect("lookup").is_none());

        cache
            .write_manifest(dir.path(), "image", &[800], &snapshot(0.5), false)
            .expect("write manifest");
        assert!(cache.lookup(dir.path(), "image", "jpeg", &snapshot(0.5)).expect("lookup").is_none());
    }

    #[test]
    fn corrupt_manifest_falls_back_to_filename_index() {
        let dir = tempfile::tempdir().expect("tempdir");
        for name in ["image.jpeg", "image-640.jpeg"] {
            touch(dir.path(), name);
        }
        fs::write(VariantCache::manifest_path(dir.path(), "image"), b"{ not json").expect("write");

        let widths = cache(true)
            .lookup(dir.path(), "image", "jpeg", &snapshot(0.5))
            .expect("lookup")
            .expect("cache should hit");

        assert_eq!(widths, vec![640]);
    }

    #[test]
    fn manifest_records_timestamp() {
        let dir = tempfile::tempdir().expect("tempdir");
        cache(true)
            .write_manifest(dir.path(), "image", &[320], &snapshot(0.5), true)
            .expect("write manifest");

        let bytes = fs::read(VariantCache::manifest_path(dir.path(), "image")).expect("read");
        let manifest: VariantManifest = serde_json::from_slice(&bytes).expect("parse");

        assert!(chrono::DateTime::parse_from_rfc3339(&manifest.generated_at).is_ok());
        assert_eq!(manifest.widths, vec![320]);
    }
}
