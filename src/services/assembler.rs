//! PDF 合并 - 业务能力层
//!
//! 按传入顺序把每一版 PDF 的页面依次追加到一个新文档里，不做任何重排

use lopdf::{dictionary, Dictionary, Document, Object, ObjectId};
use tracing::{debug, info};

use crate::error::MergeError;
use crate::models::{MergedDocument, PageArtifact};

/// 页面可以从上级页面树继承的属性
const INHERITABLE: [&[u8]; 4] = [b"Resources", b"MediaBox", b"CropBox", b"Rotate"];

/// 向上查找继承属性的最大层数（防止循环引用）
const MAX_TREE_DEPTH: usize = 32;

/// PDF 合并服务
pub struct Assembler;

impl Assembler {
    /// 合并所有成功的版
    ///
    /// 版号不一致或失败的版直接跳过；任何一版无法解析都会让整个合并失败，
    /// 不会产出半份文档
    pub fn merge(artifacts: &[PageArtifact]) -> Result<MergedDocument, MergeError> {
        let ok_count = artifacts.iter().filter(|a| a.is_ok()).count();
        info!("🔄 开始合并 PDF，共 {} 版", ok_count);

        let mut output = PdfAccumulator::new();
        let mut source_pages = Vec::with_capacity(ok_count);

        for (i, artifact) in artifacts.iter().filter(|a| a.is_ok()).enumerate() {
            let page = artifact.index();
            let source = Document::load_mem(artifact.payload())
                .map_err(|source| MergeError::Unreadable { page, source })?;
            let added = output
                .append(source)
                .map_err(|detail| MergeError::Malformed { page, detail })?;

            debug!(
                "合并第 {}/{} 份 (第 {} 版, {} 页)",
                i + 1,
                ok_count,
                page,
                added
            );
            source_pages.push(page);
        }

        let page_count = output.page_count();
        let bytes = output.finish()?;
        info!("✅ PDF 合并完成: {} 页, {} 字节", page_count, bytes.len());

        Ok(MergedDocument {
            bytes,
            page_count,
            source_pages,
        })
    }
}

/// 正在累积的输出文档
struct PdfAccumulator {
    doc: Document,
    pages_id: ObjectId,
    kids: Vec<Object>,
}

impl PdfAccumulator {
    fn new() -> Self {
        let mut doc = Document::with_version("1.5");
        let pages_id = doc.new_object_id();
        Self {
            doc,
            pages_id,
            kids: Vec::new(),
        }
    }

    fn page_count(&self) -> usize {
        self.kids.len()
    }

    /// 复制 `source` 的全部页面（保持原有页序）并追加到末尾，返回页数
    fn append(&mut self, mut source: Document) -> Result<usize, String> {
        source.renumber_objects_with(self.doc.max_id + 1);

        let page_ids: Vec<ObjectId> = source.get_pages().into_values().collect();

        // 原页面树会被丢弃，先把继承来的属性落到页面自身
        let mut pages = Vec::with_capacity(page_ids.len());
        for id in &page_ids {
            let mut dict = source
                .get_dictionary(*id)
                .map_err(|e| format!("页面对象 {:?} 无效: {}", id, e))?
                .clone();
            for key in INHERITABLE {
                if !dict.has(key) {
                    if let Some(value) = inherited(&source, &dict, key) {
                        dict.set(key.to_vec(), value);
                    }
                }
            }
            dict.set("Parent", self.pages_id);
            pages.push((*id, dict));
        }

        self.doc.max_id = self.doc.max_id.max(source.max_id);
        for (id, object) in source.objects {
            if is_tree_node(&object) {
                continue;
            }
            self.doc.objects.insert(id, object);
        }
        for (id, dict) in pages {
            self.doc.objects.insert(id, Object::Dictionary(dict));
            self.kids.push(Object::Reference(id));
        }

        Ok(page_ids.len())
    }

    fn finish(mut self) -> Result<Vec<u8>, MergeError> {
        let count = self.kids.len() as i64;
        self.doc.objects.insert(
            self.pages_id,
            Object::Dictionary(dictionary! {
                "Type" => "Pages",
                "Kids" => self.kids,
                "Count" => count,
            }),
        );
        let catalog_id = self.doc.add_object(dictionary! {
            "Type" => "Catalog",
            "Pages" => self.pages_id,
        });
        self.doc.trailer.set("Root", catalog_id);
        self.doc.compress();

        let mut bytes = Vec::new();
        self.doc
            .save_to(&mut bytes)
            .map_err(|e| MergeError::Serialize(e.to_string()))?;
        Ok(bytes)
    }
}

/// 目录、页面树和书签节点由输出文档重建
fn is_tree_node(object: &Object) -> bool {
    let node_type = object
        .as_dict()
        .ok()
        .and_then(|dict| dict.get(b"Type").ok())
        .and_then(|name| name.as_name().ok());
    matches!(
        node_type,
        Some(b"Catalog" | b"Pages" | b"Page" | b"Outlines" | b"Outline")
    )
}

fn inherited(doc: &Document, page: &Dictionary, key: &[u8]) -> Option<Object> {
    let mut parent = page.get(b"Parent").and_then(Object::as_reference).ok();
    let mut depth = 0;
    while let Some(id) = parent {
        if depth >= MAX_TREE_DEPTH {
            return None;
        }
        let node = doc.get_dictionary(id).ok()?;
        if let Ok(value) = node.get(key) {
            return Some(value.clone());
        }
        parent = node.get(b"Parent").and_then(Object::as_reference).ok();
        depth += 1;
    }
    None
}
