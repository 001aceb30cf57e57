//! 输出存储模块
//!
//! # 设计思路
//!
//! 工厂对磁盘的所有读写都经过 [`Storage`] trait，便于测试中替换为内存实现或注入故障。
//! 默认实现 [`FsStorage`] 直接使用 `std::fs`。
//!
//! # 实现思路
//!
//! - 写文件前自动 `create_dir_all` 父目录，避免上层判断。
//! - 目录不存在时列举结果为空，而不是报错（缓存查找场景下“目录不存在”等价于“没有缓存”）。
//! - 所有可能失败的操作均返回 `Result`，不使用 `expect()` / `unwrap()`。

use std::fs;
use std::path::Path;

use crate::error::FactoryError;

/// 存储能力。
pub trait Storage: Send + Sync {
    fn exists(&self, path: &Path) -> bool;

    fn read(&self, path: &Path) -> Result<Vec<u8>, FactoryError>;

    /// 写入文件，父目录不存在时自动创建。
    fn write_file(&self, path: &Path, bytes: &[u8]) -> Result<(), FactoryError>;

    fn ensure_directory(&self, path: &Path) -> Result<(), FactoryError>;

    /// 列举目录下的文件名（不含子目录），按名称排序。
    fn list_files(&self, dir: &Path) -> Result<Vec<String>, FactoryError>;
}

/// 基于本地文件系统的存储。
#[derive(Debug, Clone, Copy, Default)]
pub struct FsStorage;

impl Storage for FsStorage {
    fn exists(&self, path: &Path) -> bool {
        path.exists()
    }

    fn read(&self, path: &Path) -> Result<Vec<u8>, FactoryError> {
        fs::read(path)
            .map_err(|e| FactoryError::Storage(format!("读取文件 '{}' 失败: {}", path.display(), e)))
    }

    fn write_file(&self, path: &Path, bytes: &[u8]) -> Result<(), FactoryError> {
        if let Some(parent) = path.parent() {
            self.ensure_directory(parent)?;
        }

        fs::write(path, bytes)
            .map_err(|e| FactoryError::Storage(format!("写入文件 '{}' 失败: {}", path.display(), e)))
    }

    fn ensure_directory(&self, path: &Path) -> Result<(), FactoryError> {
        if path.as_os_str().is_empty() || path.exists() {
            return Ok(());
        }

        fs::create_dir_all(path)
            .map_err(|e| FactoryError::Storage(format!("创建目录 '{}' 失败: {}", path.display(), e)))
    }

    fn list_files(&self, dir: &Path) -> Result<Vec<String>, FactoryError> {
        if !dir.is_dir() {
            return Ok(Vec::new());
        }

        let entries = fs::read_dir(dir)
            .map_err(|e| FactoryError::Storage(format!("读取目录 '{}' 失败: {}", dir.display(), e)))?;

        let mut names: Vec<String> = entries
            .flatten()
            .filter(|entry| entry.file_type().map(|t| t.is_file()).unwrap_or(false))
            .map(|entry| entry.file_name().to_string_lossy().to_string())
            .collect();
        names.sort();

        Ok(names)
    }
}
