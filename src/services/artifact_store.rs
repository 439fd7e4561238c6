//! 输出目录 - 业务能力层
//!
//! 只负责文件命名、落盘和清理，不关心流程

use std::path::{Path, PathBuf};

use tokio::fs;
use tracing::{debug, info, warn};

use crate::error::CleanupError;

/// 输出目录
///
/// 职责：
/// - 按固定规则给单版和合并文件命名
/// - 写入文件
/// - 尽力清理，失败只记日志
#[derive(Debug, Clone)]
pub struct ArtifactStore {
    dir: PathBuf,
}

impl ArtifactStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// 创建输出目录（已存在时什么也不做）
    pub async fn ensure_dir(&self) -> std::io::Result<()> {
        fs::create_dir_all(&self.dir).await
    }

    /// 单版文件名 `<date>_page-<n>.pdf`
    pub fn page_file_name(date: &str, page_index: usize) -> String {
        format!("{}_page-{}.pdf", date, page_index)
    }

    /// 合并文件名 `<date>_odiya_news.pdf`
    pub fn merged_file_name(date: &str) -> String {
        format!("{}_odiya_news.pdf", date)
    }

    pub async fn save_page(
        &self,
        date: &str,
        page_index: usize,
        bytes: &[u8],
    ) -> std::io::Result<PathBuf> {
        let path = self.dir.join(Self::page_file_name(date, page_index));
        fs::write(&path, bytes).await?;
        debug!("已保存: {} ({} 字节)", path.display(), bytes.len());
        Ok(path)
    }

    pub async fn save_merged(&self, date: &str, bytes: &[u8]) -> std::io::Result<PathBuf> {
        let path = self.dir.join(Self::merged_file_name(date));
        fs::write(&path, bytes).await?;
        Ok(path)
    }

    /// 删除输出目录下的所有文件，返回删除的个数
    ///
    /// 子目录（浏览器的临时下载目录）保留
    pub async fn clear(&self) -> usize {
        info!("🧹 清理输出目录: {}", self.dir.display());

        let mut entries = match fs::read_dir(&self.dir).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return 0,
            Err(e) => {
                log_cleanup_error(CleanupError {
                    path: self.dir.display().to_string(),
                    source: e,
                });
                return 0;
            }
        };

        let mut deleted = 0;
        loop {
            let entry = match entries.next_entry().await {
                Ok(Some(entry)) => entry,
                Ok(None) => break,
                Err(e) => {
                    log_cleanup_error(CleanupError {
                        path: self.dir.display().to_string(),
                        source: e,
                    });
                    break;
                }
            };

            let path = entry.path();
            match entry.file_type().await {
                Ok(file_type) if file_type.is_dir() => continue,
                Ok(_) => {}
                Err(e) => {
                    log_cleanup_error(CleanupError {
                        path: path.display().to_string(),
                        source: e,
                    });
                    continue;
                }
            }

            match fs::remove_file(&path).await {
                Ok(()) => {
                    deleted += 1;
                    info!(
                        "✓ 已删除: {}",
                        path.file_name().unwrap_or_default().to_string_lossy()
                    );
                }
                Err(e) => log_cleanup_error(CleanupError {
                    path: path.display().to_string(),
                    source: e,
                }),
            }
        }

        deleted
    }
}

fn log_cleanup_error(err: CleanupError) {
    warn!("⚠️ {}", err);
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn names_are_deterministic() {
        assert_eq!(
            ArtifactStore::page_file_name("2024-05-01", 3),
            "2024-05-01_page-3.pdf"
        );
        assert_eq!(
            ArtifactStore::merged_file_name("2024-05-01"),
            "2024-05-01_odiya_news.pdf"
        );
    }

    #[tokio::test]
    async fn ensure_dir_is_idempotent() {
        let temp = TempDir::new().unwrap();
        let store = ArtifactStore::new(temp.path().join("downloads"));
        store.ensure_dir().await.unwrap();
        store.ensure_dir().await.unwrap();
        assert!(store.dir().is_dir());
    }

    #[tokio::test]
    async fn clear_removes_files_but_keeps_subdirectories() {
        let temp = TempDir::new().unwrap();
        let store = ArtifactStore::new(temp.path());
        store.save_page("2024-05-01", 1, b"one").await.unwrap();
        store.save_merged("2024-05-01", b"all").await.unwrap();
        std::fs::create_dir(temp.path().join(".incoming")).unwrap();

        assert_eq!(store.clear().await, 2);
        assert!(temp.path().join(".incoming").is_dir());
        assert_eq!(std::fs::read_dir(temp.path()).unwrap().count(), 1);
    }

    #[tokio::test]
    async fn clear_on_missing_dir_is_a_no_op() {
        let temp = TempDir::new().unwrap();
        let store = ArtifactStore::new(temp.path().join("absent"));
        assert_eq!(store.clear().await, 0);
    }
}
