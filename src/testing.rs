//! 单元测试用的假阅读器和 PDF 样本

use std::collections::HashSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use lopdf::{dictionary, Document, Object, Stream};

use crate::error::{ViewerError, WaitStage};
use crate::infrastructure::{ViewerLauncher, ViewerSession};

/// 生成一个多页 PDF，每页带一个 `PageTag` 整数方便核对顺序
///
/// MediaBox 和 Resources 放在页面树节点上，由页面继承
pub fn sample_pdf(tags: &[i64]) -> Vec<u8> {
    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();
    let font_id = doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => "Helvetica",
    });
    let resources_id = doc.add_object(dictionary! {
        "Font" => dictionary! { "F1" => font_id },
    });

    let mut kids: Vec<Object> = Vec::new();
    for &tag in tags {
        let content_id = doc.add_object(Stream::new(dictionary! {}, b"q Q".to_vec()));
        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "Contents" => content_id,
            "PageTag" => tag,
        });
        kids.push(page_id.into());
    }

    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => kids,
            "Count" => tags.len() as i64,
            "Resources" => resources_id,
            "MediaBox" => vec![
                Object::Integer(0),
                Object::Integer(0),
                Object::Integer(595),
                Object::Integer(842),
            ],
        }),
    );
    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);

    let mut bytes = Vec::new();
    doc.save_to(&mut bytes).unwrap();
    bytes
}

/// 按页序读出每页的 `PageTag`
pub fn page_tags(bytes: &[u8]) -> Vec<i64> {
    let doc = Document::load_mem(bytes).unwrap();
    doc.get_pages()
        .into_values()
        .map(|id| {
            doc.get_dictionary(id)
                .unwrap()
                .get(b"PageTag")
                .unwrap()
                .as_i64()
                .unwrap()
        })
        .collect()
}

/// 导航失败的方式
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NavFailure {
    Timeout,
    MissingControl,
}

#[derive(Default)]
struct FakeState {
    total_pages: usize,
    nav_failures: usize,
    nav_failure_kind: Option<NavFailure>,
    control_ready: bool,
    mismatch_pages: HashSet<usize>,
    timeout_pages: HashSet<usize>,
    ready_timeout_pages: HashSet<usize>,
    page_count_broken: bool,
    canceled_pages: HashSet<usize>,
    selected: usize,
    navigations: Vec<String>,
    selections: Vec<usize>,
    exports: Vec<usize>,
    in_flight: usize,
}

/// 内存中的阅读器
///
/// 克隆共享同一份状态，测试可以在会话交出去之后继续检查调用记录
#[derive(Clone)]
pub struct FakeViewer {
    state: Arc<Mutex<FakeState>>,
    closes: Arc<AtomicUsize>,
    pdf_payloads: bool,
}

impl FakeViewer {
    pub fn with_pages(total_pages: usize) -> Self {
        Self {
            state: Arc::new(Mutex::new(FakeState {
                total_pages,
                ..Default::default()
            })),
            closes: Arc::new(AtomicUsize::new(0)),
            pdf_payloads: false,
        }
    }

    /// 导出内容为真实的单页 PDF（`PageTag` 等于版号）
    pub fn with_pdf_payloads(mut self) -> Self {
        self.pdf_payloads = true;
        self
    }

    /// 前 `times` 次导航失败
    pub fn failing_navigation(self, times: usize, kind: NavFailure) -> Self {
        {
            let mut state = self.state.lock().unwrap();
            state.nav_failures = times;
            state.nav_failure_kind = Some(kind);
        }
        self
    }

    /// 这一版回读到的版号不对
    pub fn mismatch_on(self, page: usize) -> Self {
        self.state.lock().unwrap().mismatch_pages.insert(page);
        self
    }

    /// 这一版下载等待超时
    pub fn timeout_on(self, page: usize) -> Self {
        self.state.lock().unwrap().timeout_pages.insert(page);
        self
    }

    /// 选中这一版后等待渲染超时
    pub fn ready_timeout_on(self, page: usize) -> Self {
        self.state.lock().unwrap().ready_timeout_pages.insert(page);
        self
    }

    /// 读取总版数失败（选择框不见了）
    pub fn broken_page_count(self) -> Self {
        self.state.lock().unwrap().page_count_broken = true;
        self
    }

    /// 这一版下载被阅读器取消
    pub fn cancel_on(self, page: usize) -> Self {
        self.state.lock().unwrap().canceled_pages.insert(page);
        self
    }

    pub fn navigations(&self) -> usize {
        self.state.lock().unwrap().navigations.len()
    }

    pub fn navigated_urls(&self) -> Vec<String> {
        self.state.lock().unwrap().navigations.clone()
    }

    pub fn selections(&self) -> Vec<usize> {
        self.state.lock().unwrap().selections.clone()
    }

    pub fn exports(&self) -> Vec<usize> {
        self.state.lock().unwrap().exports.clone()
    }

    pub fn closes(&self) -> usize {
        self.closes.load(Ordering::SeqCst)
    }

    fn enter(&self) {
        let mut state = self.state.lock().unwrap();
        assert_eq!(state.in_flight, 0, "阅读器操作不能并发");
        state.in_flight += 1;
    }

    fn leave(&self) {
        self.state.lock().unwrap().in_flight -= 1;
    }
}

#[async_trait]
impl ViewerSession for FakeViewer {
    async fn navigate(&self, url: &str, timeout: Duration) -> Result<(), ViewerError> {
        self.enter();
        let result = {
            let mut state = self.state.lock().unwrap();
            state.navigations.push(url.to_string());
            state.control_ready = false;
            if state.nav_failures > 0 {
                state.nav_failures -= 1;
                match state.nav_failure_kind {
                    Some(NavFailure::Timeout) => Err(ViewerError::Timeout {
                        stage: WaitStage::Navigation,
                        after: timeout,
                    }),
                    _ => Ok(()),
                }
            } else {
                state.control_ready = true;
                Ok(())
            }
        };
        tokio::task::yield_now().await;
        self.leave();
        result
    }

    async fn control_present(&self) -> Result<bool, ViewerError> {
        Ok(self.state.lock().unwrap().control_ready)
    }

    async fn page_count(&self) -> Result<usize, ViewerError> {
        let state = self.state.lock().unwrap();
        if state.page_count_broken {
            return Err(ViewerError::ElementMissing {
                selector: "#tpgnumber".to_string(),
            });
        }
        Ok(state.total_pages)
    }

    async fn select_page(&self, index: usize) -> Result<String, ViewerError> {
        self.enter();
        let readback = {
            let mut state = self.state.lock().unwrap();
            state.selections.push(index);
            state.selected = index;
            if state.ready_timeout_pages.contains(&index) {
                Err(ViewerError::Timeout {
                    stage: WaitStage::PageReady,
                    after: Duration::from_secs(60),
                })
            } else if state.mismatch_pages.contains(&index) {
                // 阅读器没跟上，还停在上一版
                Ok(index.saturating_sub(1).to_string())
            } else {
                Ok(index.to_string())
            }
        };
        tokio::task::yield_now().await;
        self.leave();
        readback
    }

    async fn export_current_page(&self) -> Result<Vec<u8>, ViewerError> {
        self.enter();
        let result = {
            let mut state = self.state.lock().unwrap();
            let page = state.selected;
            state.exports.push(page);
            if state.timeout_pages.contains(&page) {
                Err(ViewerError::Timeout {
                    stage: WaitStage::Download,
                    after: Duration::from_secs(60),
                })
            } else if state.canceled_pages.contains(&page) {
                Err(ViewerError::DownloadCanceled {
                    guid: format!("guid-{}", page),
                })
            } else if self.pdf_payloads {
                Ok(sample_pdf(&[page as i64]))
            } else {
                Ok(format!("page-{}", page).into_bytes())
            }
        };
        tokio::task::yield_now().await;
        self.leave();
        result
    }

    async fn close(&mut self) -> Result<(), ViewerError> {
        self.closes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

/// 每次启动都交出同一个假阅读器
pub struct FakeLauncher {
    viewer: FakeViewer,
    launches: AtomicUsize,
}

impl FakeLauncher {
    pub fn new(viewer: FakeViewer) -> Self {
        Self {
            viewer,
            launches: AtomicUsize::new(0),
        }
    }

    pub fn launches(&self) -> usize {
        self.launches.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ViewerLauncher for FakeLauncher {
    type Session = FakeViewer;

    async fn launch(&self) -> Result<FakeViewer, ViewerError> {
        self.launches.fetch_add(1, Ordering::SeqCst);
        Ok(self.viewer.clone())
    }
}
