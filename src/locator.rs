//! 源文件定位模块
//!
//! # 设计思路
//!
//! 给定源目录与请求的相对路径，找到实际文件并返回其元信息。
//! 请求路径既可能精确对应一个文件，也可能只是文件名（`rebase` 场景），
//! 因此默认实现 [`FsLocator`] 先尝试直接拼接，再在源目录中按路径后缀递归查找。
//!
//! # 实现思路
//!
//! - 递归遍历时对目录项排序，保证多个候选时结果稳定。
//! - 后缀匹配按路径分段比较，`a/image.jpeg` 不会匹配 `ba/image.jpeg`。

use std::fs;
use std::path::{Component, Path, PathBuf};

use crate::error::FactoryError;

/// 定位到的源文件。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedFile {
    /// 完整路径。
    pub pathname: PathBuf,
    /// 字节数。
    pub size: u64,
    /// 扩展名（不含 `.`）。
    pub extension: String,
    /// 文件名（含扩展名）。
    pub filename: String,
    /// 文件所在目录相对于源目录的路径。
    pub relative_path: PathBuf,
}

impl ResolvedFile {
    /// 不含扩展名的文件名。
    pub fn stem(&self) -> &str {
        match self.filename.rsplit_once('.') {
            Some((stem, _)) if !stem.is_empty() => stem,
            _ => &self.filename,
        }
    }
}

/// 定位能力。
pub trait Locator: Send + Sync {
    /// 找不到时返回 `Ok(None)`，只有 I/O 异常才返回 `Err`。
    fn find(&self, root: &Path, relative: &str) -> Result<Option<ResolvedFile>, FactoryError>;
}

/// 基于本地文件系统的定位器。
#[derive(Debug, Clone, Copy, Default)]
pub struct FsLocator;

impl FsLocator {
    fn resolve(root: &Path, pathname: PathBuf) -> Result<ResolvedFile, FactoryError> {
        let metadata = fs::metadata(&pathname)?;
        let filename = pathname
            .file_name()
            .map(|name| name.to_string_lossy().to_string())
            .unwrap_or_default();
        let extension = pathname
            .extension()
            .map(|ext| ext.to_string_lossy().to_string())
            .unwrap_or_default();
        let relative_path = pathname
            .parent()
            .and_then(|parent| parent.strip_prefix(root).ok())
            .map(Path::to_path_buf)
            .unwrap_or_default();

        Ok(ResolvedFile {
            pathname,
            size: metadata.len(),
            extension,
            filename,
            relative_path,
        })
    }

    fn search(dir: &Path, suffix: &[String]) -> Result<Option<PathBuf>, FactoryError> {
        let mut entries: Vec<PathBuf> = fs::read_dir(dir)?
            .flatten()
            .map(|entry| entry.path())
            .collect();
        entries.sort();

        for path in &entries {
            if path.is_file() && ends_with_segments(path, suffix) {
                return Ok(Some(path.clone()));
            }
        }

        for path in entries.iter().filter(|path| path.is_dir()) {
            if let Some(found) = Self::search(path, suffix)? {
                return Ok(Some(found));
            }
        }

        Ok(None)
    }
}

impl Locator for FsLocator {
    fn find(&self, root: &Path, relative: &str) -> Result<Option<ResolvedFile>, FactoryError> {
        let segments = normal_segments(relative);
        if segments.is_empty() {
            return Ok(None);
        }

        let direct: PathBuf = segments.iter().fold(root.to_path_buf(), |path, seg| path.join(seg));
        if direct.is_file() {
            return Self::resolve(root, direct).map(Some);
        }

        if !root.is_dir() {
            return Ok(None);
        }

        match Self::search(root, &segments)? {
            Some(found) => {
                log::debug!("🔎 递归定位到源文件：{} -> {}", relative, found.display());
                Self::resolve(root, found).map(Some)
            }
            None => Ok(None),
        }
    }
}

/// 只保留普通路径段，忽略 `/`、`.` 与 `..`。
fn normal_segments(relative: &str) -> Vec<String> {
    Path::new(relative)
        .components()
        .filter_map(|component| match component {
            Component::Normal(segment) => Some(segment.to_string_lossy().to_string()),
            _ => None,
        })
        .collect()
}

fn ends_with_segments(path: &Path, suffix: &[String]) -> bool {
    let segments: Vec<String> = path
        .components()
        .filter_map(|component| match component {
            Component::Normal(segment) => Some(segment.to_string_lossy().to_string()),
            _ => None,
        })
        .collect();

    segments.len() >= suffix.len() && segments[segments.len() - suffix.len()..] == *suffix
}
