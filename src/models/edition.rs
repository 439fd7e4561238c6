//! 报纸期号

use chrono::NaiveDate;
use std::fmt::Display;

/// 某一天的报纸
///
/// 总版数在会话建立后读取一次，之后不再变化
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Edition {
    date: NaiveDate,
    base_url: String,
    total_pages: Option<usize>,
}

impl Edition {
    pub fn new(date: NaiveDate, base_url: impl Into<String>) -> Self {
        Self {
            date,
            base_url: base_url.into(),
            total_pages: None,
        }
    }

    /// 今天（本地时间）的报纸
    pub fn today(base_url: impl Into<String>) -> Self {
        Self::new(chrono::Local::now().date_naive(), base_url)
    }

    pub fn date(&self) -> NaiveDate {
        self.date
    }

    /// `YYYY-MM-DD` 形式的日期
    pub fn date_str(&self) -> String {
        self.date.format("%Y-%m-%d").to_string()
    }

    /// 阅读器首版地址 `{base}/{date}/1`
    pub fn viewer_url(&self) -> String {
        format!(
            "{}/{}/1",
            self.base_url.trim_end_matches('/'),
            self.date_str()
        )
    }

    pub fn total_pages(&self) -> Option<usize> {
        self.total_pages
    }

    /// 记录读取到的总版数
    pub fn with_total_pages(self, total_pages: usize) -> Self {
        Self {
            total_pages: Some(total_pages),
            ..self
        }
    }
}

impl Display for Edition {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.total_pages {
            Some(n) => write!(f, "[{} 共 {} 版]", self.date_str(), n),
            None => write!(f, "[{}]", self.date_str()),
        }
    }
}
