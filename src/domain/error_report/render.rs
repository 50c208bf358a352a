//! Error Report - 错误面板渲染
//!
//! 页面上的每个错误展示区域用 [`ErrorPanel`] 表示，按容器 id 存放在
//! [`ErrorView`] 中。渲染结果是固定结构的 HTML 片段。

use std::collections::HashMap;
use std::fmt::Write;

use super::error_info::ErrorInfo;

/// 单个错误展示面板
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ErrorPanel {
    pub visible: bool,
    pub content: String,
}

/// 错误面板集合
#[derive(Debug, Clone, Default)]
pub struct ErrorView {
    panels: HashMap<String, ErrorPanel>,
}

impl ErrorView {
    pub fn new() -> Self {
        Self::default()
    }

    /// 添加一个隐藏的空面板
    pub fn add_panel(&mut self, container_id: impl Into<String>) {
        self.panels.insert(container_id.into(), ErrorPanel::default());
    }

    pub fn with_panel(mut self, container_id: impl Into<String>) -> Self {
        self.add_panel(container_id);
        self
    }

    pub fn panel(&self, container_id: &str) -> Option<&ErrorPanel> {
        self.panels.get(container_id)
    }

    /// 把错误渲染到指定容器
    ///
    /// 容器不存在时什么也不做。
    pub fn render_error(
        &mut self,
        container_id: &str,
        title: &str,
        base_error: &str,
        info: &ErrorInfo,
    ) {
        let Some(panel) = self.panels.get_mut(container_id) else {
            tracing::debug!(container_id, "Error panel not found, skip rendering");
            return;
        };

        panel.visible = true;
        panel.content = render_error_html(title, base_error, info);
    }
}

/// 生成错误块 HTML
///
/// 结构化详情块仅在 code / type / message / request_id 至少一项非空时输出；
/// 原始文本非空时原样放入 `<pre>`（转义后）。
pub fn render_error_html(title: &str, base_error: &str, info: &ErrorInfo) -> String {
    let mut html = String::new();

    let _ = write!(html, "<div class=\"error-title\">{}</div>", escape_html(title));
    let _ = write!(html, "<div class=\"error-base\">{}</div>", escape_html(base_error));

    if info.has_details() {
        html.push_str("<div class=\"error-details\">");
        if !info.code.is_empty() || !info.error_type.is_empty() {
            let _ = write!(
                html,
                "<div>code: {} | type: {}</div>",
                escape_html(&info.code),
                escape_html(&info.error_type)
            );
        }
        if !info.message.is_empty() {
            let _ = write!(html, "<div>message: {}</div>", escape_html(&info.message));
        }
        if !info.request_id.is_empty() {
            let _ = write!(html, "<div>request_id: {}</div>", escape_html(&info.request_id));
        }
        html.push_str("</div>");
    }

    if !info.raw.is_empty() {
        let _ = write!(html, "<pre class=\"error-raw\">{}</pre>", escape_html(&info.raw));
    }

    html
}

fn escape_html(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            _ => escaped.push(c),
        }
    }
    escaped
}
