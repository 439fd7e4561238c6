use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use chrono::NaiveDate;
use serde::Deserialize;

use crate::error::ConfigError;

/// 默认配置文件路径（存在时才读取）
const DEFAULT_CONFIG_FILE: &str = "odiya.toml";

/// 程序配置
///
/// 启动时构建一次，之后以引用传给需要的组件
#[derive(Clone, Debug)]
pub struct Config {
    /// 报纸阅读器根地址
    pub newspaper_base_url: String,
    // --- Slack 配置 ---
    pub slack_bot_token: String,
    pub slack_channel_id: String,
    pub slack_api_base_url: String,
    /// 下载与合并文件的输出目录
    pub output_dir: PathBuf,
    /// 指定要抓取的日期，缺省为今天
    pub edition_date: Option<NaiveDate>,
    /// 浏览器调试端口，设置后连接已有浏览器而不是启动无头浏览器
    pub browser_debug_port: Option<u16>,
    /// 浏览器可执行文件路径
    pub chrome_executable: Option<PathBuf>,
    // --- 超时与延迟 ---
    pub nav_timeout: Duration,
    pub nav_settle_delay: Duration,
    pub nav_retry_delay: Duration,
    pub page_ready_timeout: Duration,
    pub export_control_timeout: Duration,
    pub download_timeout: Duration,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            newspaper_base_url: String::new(),
            slack_bot_token: String::new(),
            slack_channel_id: String::new(),
            slack_api_base_url: "https://slack.com/api".to_string(),
            output_dir: PathBuf::from("downloads"),
            edition_date: None,
            browser_debug_port: None,
            chrome_executable: None,
            nav_timeout: Duration::from_secs(60),
            nav_settle_delay: Duration::from_millis(5000),
            nav_retry_delay: Duration::from_millis(5000),
            page_ready_timeout: Duration::from_secs(60),
            export_control_timeout: Duration::from_secs(60),
            download_timeout: Duration::from_secs(60),
        }
    }
}

/// TOML 配置文件中的可选项
#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
struct FileConfig {
    newspaper_base_url: Option<String>,
    slack_bot_token: Option<String>,
    slack_channel_id: Option<String>,
    slack_api_base_url: Option<String>,
    output_dir: Option<PathBuf>,
    edition_date: Option<String>,
    browser_debug_port: Option<u16>,
    chrome_executable: Option<PathBuf>,
    nav_timeout_secs: Option<u64>,
    nav_settle_ms: Option<u64>,
    nav_retry_delay_ms: Option<u64>,
    page_ready_timeout_secs: Option<u64>,
    export_control_timeout_secs: Option<u64>,
    download_timeout_secs: Option<u64>,
}

impl Config {
    /// 加载配置：默认值 → 配置文件 → .env 与环境变量，并校验
    pub fn load() -> Result<Self, ConfigError> {
        dotenv_loaded(dotenvy::dotenv(), ".env")?;

        let mut config = Self::default();

        let file_path = std::env::var("ODIYA_CONFIG").ok();
        match file_path.as_deref() {
            Some(path) => config.apply_file(Path::new(path))?,
            None if Path::new(DEFAULT_CONFIG_FILE).exists() => {
                config.apply_file(Path::new(DEFAULT_CONFIG_FILE))?
            }
            None => {}
        }

        config.apply_env(|name| std::env::var(name).ok())?;
        config.validate()?;
        Ok(config)
    }

    /// 用 TOML 配置文件覆盖当前值
    pub fn apply_file(&mut self, path: &Path) -> Result<(), ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::File {
            path: path.display().to_string(),
            reason: e.to_string(),
        })?;
        self.apply_toml(&content).map_err(|e| match e {
            ConfigError::File { reason, .. } => ConfigError::File {
                path: path.display().to_string(),
                reason,
            },
            other => other,
        })
    }

    fn apply_toml(&mut self, content: &str) -> Result<(), ConfigError> {
        let file: FileConfig = toml::from_str(content).map_err(|e| ConfigError::File {
            path: String::new(),
            reason: e.to_string(),
        })?;

        if let Some(v) = file.newspaper_base_url {
            self.newspaper_base_url = v;
        }
        if let Some(v) = file.slack_bot_token {
            self.slack_bot_token = v;
        }
        if let Some(v) = file.slack_channel_id {
            self.slack_channel_id = v;
        }
        if let Some(v) = file.slack_api_base_url {
            self.slack_api_base_url = v;
        }
        if let Some(v) = file.output_dir {
            self.output_dir = v;
        }
        if let Some(v) = file.edition_date {
            self.edition_date = Some(parse_date("edition_date", &v)?);
        }
        if file.browser_debug_port.is_some() {
            self.browser_debug_port = file.browser_debug_port;
        }
        if file.chrome_executable.is_some() {
            self.chrome_executable = file.chrome_executable;
        }
        if let Some(v) = file.nav_timeout_secs {
            self.nav_timeout = Duration::from_secs(v);
        }
        if let Some(v) = file.nav_settle_ms {
            self.nav_settle_delay = Duration::from_millis(v);
        }
        if let Some(v) = file.nav_retry_delay_ms {
            self.nav_retry_delay = Duration::from_millis(v);
        }
        if let Some(v) = file.page_ready_timeout_secs {
            self.page_ready_timeout = Duration::from_secs(v);
        }
        if let Some(v) = file.export_control_timeout_secs {
            self.export_control_timeout = Duration::from_secs(v);
        }
        if let Some(v) = file.download_timeout_secs {
            self.download_timeout = Duration::from_secs(v);
        }
        Ok(())
    }

    /// 用环境变量覆盖当前值
    ///
    /// # 参数
    /// - `lookup`: 按变量名取值，便于测试时注入
    pub fn apply_env<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(v) = lookup("NEWSPAPER_BASE_URL") {
            self.newspaper_base_url = v;
        }
        if let Some(v) = lookup("SLACK_BOT_TOKEN") {
            self.slack_bot_token = v;
        }
        if let Some(v) = lookup("SLACK_CHANNEL_ID") {
            self.slack_channel_id = v;
        }
        if let Some(v) = lookup("SLACK_API_BASE_URL") {
            self.slack_api_base_url = v;
        }
        if let Some(v) = lookup("OUTPUT_DIR") {
            self.output_dir = PathBuf::from(v);
        }
        if let Some(v) = lookup("EDITION_DATE") {
            self.edition_date = Some(parse_date("EDITION_DATE", &v)?);
        }
        if let Some(v) = lookup("BROWSER_DEBUG_PORT") {
            self.browser_debug_port = Some(parse_var("BROWSER_DEBUG_PORT", &v, "u16")?);
        }
        if let Some(v) = lookup("CHROME_EXECUTABLE") {
            self.chrome_executable = Some(PathBuf::from(v));
        }
        if let Some(v) = lookup("NAV_TIMEOUT_SECS") {
            self.nav_timeout = Duration::from_secs(parse_var("NAV_TIMEOUT_SECS", &v, "u64")?);
        }
        if let Some(v) = lookup("NAV_SETTLE_MS") {
            self.nav_settle_delay = Duration::from_millis(parse_var("NAV_SETTLE_MS", &v, "u64")?);
        }
        if let Some(v) = lookup("NAV_RETRY_DELAY_MS") {
            self.nav_retry_delay =
                Duration::from_millis(parse_var("NAV_RETRY_DELAY_MS", &v, "u64")?);
        }
        if let Some(v) = lookup("PAGE_READY_TIMEOUT_SECS") {
            self.page_ready_timeout =
                Duration::from_secs(parse_var("PAGE_READY_TIMEOUT_SECS", &v, "u64")?);
        }
        if let Some(v) = lookup("EXPORT_CONTROL_TIMEOUT_SECS") {
            self.export_control_timeout =
                Duration::from_secs(parse_var("EXPORT_CONTROL_TIMEOUT_SECS", &v, "u64")?);
        }
        if let Some(v) = lookup("DOWNLOAD_TIMEOUT_SECS") {
            self.download_timeout =
                Duration::from_secs(parse_var("DOWNLOAD_TIMEOUT_SECS", &v, "u64")?);
        }
        Ok(())
    }

    /// 校验必需项，缺失时启动即失败
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.newspaper_base_url.trim().is_empty() {
            return Err(ConfigError::Missing {
                var_name: "NEWSPAPER_BASE_URL",
            });
        }
        if !self.newspaper_base_url.starts_with("http://")
            && !self.newspaper_base_url.starts_with("https://")
        {
            return Err(ConfigError::Invalid {
                var_name: "NEWSPAPER_BASE_URL",
                value: self.newspaper_base_url.clone(),
                expected_type: "http(s) URL",
            });
        }
        if self.slack_bot_token.trim().is_empty() {
            return Err(ConfigError::Missing {
                var_name: "SLACK_BOT_TOKEN",
            });
        }
        if self.slack_channel_id.trim().is_empty() {
            return Err(ConfigError::Missing {
                var_name: "SLACK_CHANNEL_ID",
            });
        }
        Ok(())
    }
}

fn parse_var<T: FromStr>(
    var_name: &'static str,
    value: &str,
    expected_type: &'static str,
) -> Result<T, ConfigError> {
    value.trim().parse().map_err(|_| ConfigError::Invalid {
        var_name,
        value: value.to_string(),
        expected_type,
    })
}

fn parse_date(var_name: &'static str, value: &str) -> Result<NaiveDate, ConfigError> {
    NaiveDate::parse_from_str(value.trim(), "%Y-%m-%d").map_err(|_| ConfigError::Invalid {
        var_name,
        value: value.to_string(),
        expected_type: "YYYY-MM-DD",
    })
}

/// `.env` 不存在是正常情况，格式错误则是配置错误
fn dotenv_loaded<T>(result: Result<T, dotenvy::Error>, path: &str) -> Result<(), ConfigError> {
    match result {
        Ok(_) => Ok(()),
        Err(e) if e.not_found() => Ok(()),
        Err(e) => Err(ConfigError::File {
            path: path.to_string(),
            reason: e.to_string(),
        }),
    }
}
