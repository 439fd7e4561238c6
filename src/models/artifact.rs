use std::path::{Path, PathBuf};

use crate::error::DistributionFailure;

/// 单版获取结果
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageStatus {
    /// 导出成功
    Ok,
    /// 选中版号与请求不一致，已跳过
    Mismatch,
    /// 阅读器报告导出失败，已跳过
    Failed,
}

/// 一版导出的 PDF
///
/// 创建后不再修改
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageArtifact {
    index: usize,
    status: PageStatus,
    payload: Vec<u8>,
    path: Option<PathBuf>,
}

impl PageArtifact {
    pub fn ok(index: usize, payload: Vec<u8>, path: Option<PathBuf>) -> Self {
        Self {
            index,
            status: PageStatus::Ok,
            payload,
            path,
        }
    }

    pub fn mismatch(index: usize) -> Self {
        Self {
            index,
            status: PageStatus::Mismatch,
            payload: Vec::new(),
            path: None,
        }
    }

    pub fn failed(index: usize) -> Self {
        Self {
            index,
            status: PageStatus::Failed,
            payload: Vec::new(),
            path: None,
        }
    }

    /// 版号（从 1 开始）
    pub fn index(&self) -> usize {
        self.index
    }

    pub fn status(&self) -> PageStatus {
        self.status
    }

    pub fn is_ok(&self) -> bool {
        self.status == PageStatus::Ok
    }

    pub fn payload(&self) -> &[u8] {
        &self.payload
    }

    /// 落盘路径（只有成功的版有）
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }
}

/// 一期报纸的获取结果，按版号升序
#[derive(Debug, Clone, Default)]
pub struct RunResult {
    requested: usize,
    artifacts: Vec<PageArtifact>,
}

impl RunResult {
    pub fn new(requested: usize) -> Self {
        Self {
            requested,
            artifacts: Vec::with_capacity(requested),
        }
    }

    /// 追加一版，版号必须严格递增且不超过请求数
    pub(crate) fn push(&mut self, artifact: PageArtifact) {
        debug_assert!(
            self.artifacts
                .last()
                .map_or(true, |last| last.index() < artifact.index()),
            "版号必须严格递增"
        );
        debug_assert!(artifact.index() <= self.requested);
        self.artifacts.push(artifact);
    }

    /// 请求的总版数
    pub fn requested(&self) -> usize {
        self.requested
    }

    pub fn artifacts(&self) -> &[PageArtifact] {
        &self.artifacts
    }

    /// 成功获取的版数
    pub fn acquired(&self) -> usize {
        self.artifacts.iter().filter(|a| a.is_ok()).count()
    }

    /// 版号不一致而被跳过的版
    pub fn mismatched(&self) -> Vec<usize> {
        self.indices_with(PageStatus::Mismatch)
    }

    /// 导出失败而被跳过的版
    pub fn failed(&self) -> Vec<usize> {
        self.indices_with(PageStatus::Failed)
    }

    pub fn is_complete(&self) -> bool {
        self.acquired() == self.requested
    }

    fn indices_with(&self, status: PageStatus) -> Vec<usize> {
        self.artifacts
            .iter()
            .filter(|a| a.status() == status)
            .map(|a| a.index())
            .collect()
    }
}

/// 合并后的整期 PDF
#[derive(Debug, Clone)]
pub struct MergedDocument {
    pub bytes: Vec<u8>,
    /// 合并文档内部的页数
    pub page_count: usize,
    /// 参与合并的版号，按合并顺序
    pub source_pages: Vec<usize>,
}

/// 发送到消息渠道的结果
#[derive(Debug)]
pub enum DistributionOutcome {
    Success { remote_id: String },
    Failure { reason: DistributionFailure },
}

impl DistributionOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, DistributionOutcome::Success { .. })
    }
}
