//! multipart/form-data 解析
//!
//! 模块拿到的是完整请求体，这里借助 axum 的 `Multipart` 重新解析。
//! 外层路由已经限制过请求体大小，解析时关闭 `Multipart` 自带的默认上限。

use axum::body::{Body, Bytes};
use axum::extract::{DefaultBodyLimit, FromRequest, Multipart, Request};
use http::HeaderMap;
use thiserror::Error;
use tower::{service_fn, Layer, ServiceExt};

#[derive(Debug, Error)]
pub enum FormError {
    #[error("Invalid multipart request: {0}")]
    Invalid(String),

    #[error("Failed to read multipart field: {0}")]
    Field(String),
}

/// 单个表单字段，文件字段带 `filename`
#[derive(Debug, Clone)]
pub struct FormField {
    pub name: String,
    pub filename: Option<String>,
    pub data: Bytes,
}

impl FormField {
    pub fn is_file(&self) -> bool {
        self.filename.as_deref().is_some_and(|f| !f.is_empty())
    }

    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.data).trim().to_string()
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn filename_or<'a>(&'a self, default: &'a str) -> &'a str {
        self.filename
            .as_deref()
            .filter(|f| !f.is_empty())
            .unwrap_or(default)
    }
}

/// 按提交顺序保存的表单
#[derive(Debug, Clone, Default)]
pub struct FormData {
    fields: Vec<FormField>,
}

impl FormData {
    pub async fn parse(headers: &HeaderMap, body: Bytes) -> Result<Self, FormError> {
        let mut request = Request::new(Body::from(body));
        *request.headers_mut() = headers.clone();

        let parser = DefaultBodyLimit::disable().layer(service_fn(|req: Request| async move {
            match Multipart::from_request(req, &()).await {
                Ok(multipart) => Self::collect(multipart).await,
                Err(e) => Err(FormError::Invalid(e.body_text())),
            }
        }));

        parser.oneshot(request).await
    }

    async fn collect(mut multipart: Multipart) -> Result<Self, FormError> {
        let mut fields = Vec::new();
        while let Some(field) = multipart
            .next_field()
            .await
            .map_err(|e| FormError::Field(e.body_text()))?
        {
            let name = field.name().unwrap_or_default().to_string();
            let filename = field.file_name().map(str::to_string);
            let data = field
                .bytes()
                .await
                .map_err(|e| FormError::Field(e.body_text()))?;
            fields.push(FormField {
                name,
                filename,
                data,
            });
        }
        Ok(Self { fields })
    }

    pub fn field(&self, name: &str) -> Option<&FormField> {
        self.fields.iter().find(|f| f.name == name)
    }

    /// 文本字段（去除首尾空白），缺失时为空串
    pub fn text(&self, name: &str) -> String {
        self.field(name).map(FormField::text).unwrap_or_default()
    }

    pub fn has(&self, name: &str) -> bool {
        self.field(name).is_some()
    }

    pub fn file(&self, name: &str) -> Option<&FormField> {
        self.fields.iter().find(|f| f.name == name && f.is_file())
    }

    pub fn files_with_prefix<'a>(&'a self, prefix: &'a str) -> impl Iterator<Item = &'a FormField> {
        self.fields
            .iter()
            .filter(move |f| f.name.starts_with(prefix) && f.is_file())
    }

    pub fn field_names(&self) -> Vec<&str> {
        self.fields.iter().map(|f| f.name.as_str()).collect()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use http::{header, HeaderMap};

    pub const BOUNDARY: &str = "----workbench-test-boundary";

    pub enum Part<'a> {
        Text(&'a str, &'a str),
        File(&'a str, &'a str, &'a [u8]),
    }

    pub fn multipart_body(parts: &[Part<'_>]) -> (HeaderMap, Vec<u8>) {
        let mut body = Vec::new();
        for part in parts {
            body.extend_from_slice(format!("--{BOUNDARY}\r\n").as_bytes());
            match part {
                Part::Text(name, value) => {
                    body.extend_from_slice(
                        format!("Content-Disposition: form-data; name=\"{name}\"\r\n\r\n").as_bytes(),
                    );
                    body.extend_from_slice(value.as_bytes());
                }
                Part::File(name, filename, data) => {
                    body.extend_from_slice(
                        format!(
                            "Content-Disposition: form-data; name=\"{name}\"; filename=\"{filename}\"\r\n\
                             Content-Type: application/octet-stream\r\n\r\n"
                        )
                        .as_bytes(),
                    );
                    body.extend_from_slice(data);
                }
            }
            body.extend_from_slice(b"\r\n");
        }
        body.extend_from_slice(format!("--{BOUNDARY}--\r\n").as_bytes());

        let mut headers = HeaderMap::new();
        headers.insert(
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={BOUNDARY}").parse().unwrap(),
        );
        (headers, body)
    }
}
