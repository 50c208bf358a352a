//! Error Report - 上游错误归一化
//!
//! 模块返回的失败响应可能把上游错误放在 `upstream_error` 或 `error` 字段，
//! request id 可能在原始响应文本的 `error.request_id` 或顶层 `request_id`。
//! 这里把所有已知形态显式列出，统一转换为固定结构的 [`ErrorInfo`]。

use serde::Serialize;
use serde_json::Value;

/// 归一化后的错误信息
///
/// 所有字段缺失时为空字符串。
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ErrorInfo {
    pub code: String,
    #[serde(rename = "type")]
    pub error_type: String,
    pub message: String,
    pub request_id: String,
    pub raw: String,
    /// 原始文本非空且不是合法 JSON
    #[serde(skip)]
    pub raw_parse_failed: bool,
}

impl ErrorInfo {
    /// 是否包含任何结构化字段（code / type / message / request_id）
    pub fn has_details(&self) -> bool {
        !(self.code.is_empty()
            && self.error_type.is_empty()
            && self.message.is_empty()
            && self.request_id.is_empty())
    }
}

/// 解析后的响应体中错误对象所在位置
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ResultShape<'a> {
    /// `{"upstream_error": {...}}`
    Nested(&'a Value),
    /// `{"error": {...}}` 或 `{"error": "..."}`
    Direct(&'a Value),
    /// 没有可识别的错误对象
    Missing,
}

impl<'a> ResultShape<'a> {
    pub fn classify(result: Option<&'a Value>) -> Self {
        let Some(result) = result else {
            return Self::Missing;
        };

        if let Some(upstream) = result.get("upstream_error").filter(|v| is_truthy(v)) {
            return Self::Nested(upstream);
        }

        match result.get("error").filter(|v| is_truthy(v)) {
            Some(error) => Self::Direct(error),
            None => Self::Missing,
        }
    }

    fn error_object(&self) -> Option<&'a Value> {
        match *self {
            Self::Nested(error) | Self::Direct(error) => Some(error),
            Self::Missing => None,
        }
    }
}

/// 原始响应文本的形态（决定 request id 的来源）
#[derive(Debug, Clone, PartialEq)]
pub enum RawShape {
    /// `{"error": {"request_id": "..."}}`
    NestedRequestId(String),
    /// `{"request_id": "..."}`
    TopLevelRequestId(String),
    /// 合法 JSON 但没有 request id
    NoRequestId,
    /// 不是合法 JSON
    Unparseable,
}

impl RawShape {
    pub fn classify(raw: &str) -> Self {
        let parsed: Value = match serde_json::from_str(raw) {
            Ok(value) => value,
            Err(_) => return Self::Unparseable,
        };

        let nested = parsed
            .get("error")
            .and_then(|error| error.get("request_id"))
            .map(field_text)
            .filter(|id| !id.is_empty());
        if let Some(id) = nested {
            return Self::NestedRequestId(id);
        }

        match parsed.get("request_id").map(field_text).filter(|id| !id.is_empty()) {
            Some(id) => Self::TopLevelRequestId(id),
            None => Self::NoRequestId,
        }
    }

    pub fn request_id(&self) -> &str {
        match self {
            Self::NestedRequestId(id) | Self::TopLevelRequestId(id) => id,
            Self::NoRequestId | Self::Unparseable => "",
        }
    }
}

/// 从模块响应中提取上游错误
///
/// - `result`: 解析后的 JSON 响应（解析失败时为 None）
/// - `raw`: 调用方持有的原始响应文本，仅在 `error_response_content` 缺失时使用
///
/// 永不失败：缺失或格式错误的输入都退化为空字符串字段。
pub fn extract_upstream(result: Option<&Value>, raw: &str) -> ErrorInfo {
    let shape = ResultShape::classify(result);
    let error = shape.error_object();

    let raw_text = result
        .and_then(|r| r.get("error_response_content"))
        .filter(|v| is_truthy(v))
        .map(field_text)
        .unwrap_or_else(|| raw.to_string());

    let raw_shape = if raw_text.is_empty() {
        RawShape::NoRequestId
    } else {
        RawShape::classify(&raw_text)
    };

    let field = |name: &str| {
        error
            .and_then(|e| e.get(name))
            .map(field_text)
            .unwrap_or_default()
    };

    ErrorInfo {
        code: field("code"),
        error_type: field("type"),
        message: field("message"),
        request_id: raw_shape.request_id().to_string(),
        raw_parse_failed: raw_shape == RawShape::Unparseable,
        raw: raw_text,
    }
}

/// 标量字段转文本；对象、数组和假值返回空字符串
fn field_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Number(n) if is_truthy(value) => n.to_string(),
        Value::Bool(true) => "true".to_string(),
        _ => String::new(),
    }
}

/// JSON 值的真值判断：null、false、0、空字符串为假
fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().map_or(true, |f| f != 0.0),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_upstream_error_fields() {
        let result = json!({"upstream_error": {"code": "E1", "type": "T", "message": "M"}});
        let info = extract_upstream(Some(&result), "");

        assert_eq!(info.code, "E1");
        assert_eq!(info.error_type, "T");
        assert_eq!(info.message, "M");
        assert_eq!(info.request_id, "");
        assert_eq!(info.raw, "");
        assert!(!info.raw_parse_failed);
    }

    #[test]
    fn test_request_id_from_error_response_content() {
        let result = json!({
            "error": {"code": "E2"},
            "error_response_content": r#"{"error":{"request_id":"abc123"}}"#
        });
        let info = extract_upstream(Some(&result), "");

        assert_eq!(info.code, "E2");
        assert_eq!(info.request_id, "abc123");
        assert_eq!(info.raw, r#"{"error":{"request_id":"abc123"}}"#);
    }

    #[test]
    fn test_absent_result_with_unparseable_raw() {
        let info = extract_upstream(None, "not json");

        assert_eq!(info.code, "");
        assert_eq!(info.error_type, "");
        assert_eq!(info.message, "");
        assert_eq!(info.request_id, "");
        assert_eq!(info.raw, "not json");
        assert!(info.raw_parse_failed);
        assert!(!info.has_details());
    }

    #[test]
    fn test_top_level_request_id_from_caller_raw() {
        let info = extract_upstream(Some(&json!({"success": false})), r#"{"request_id":"r-9"}"#);
        assert_eq!(info.request_id, "r-9");
        assert_eq!(info.code, "");
    }

    #[test]
    fn test_null_upstream_error_falls_back_to_error() {
        let result = json!({
            "upstream_error": null,
            "error": {"code": "InvalidParameter", "message": "bad prompt"}
        });
        let info = extract_upstream(Some(&result), "");
        assert_eq!(info.code, "InvalidParameter");
        assert_eq!(info.message, "bad prompt");
    }

    #[test]
    fn test_string_error_has_no_structured_fields() {
        let result = json!({"success": false, "error": "path not found"});
        let info = extract_upstream(Some(&result), "");
        assert!(!info.has_details());
    }

    #[test]
    fn test_numeric_code_rendered_as_text() {
        let result = json!({"upstream_error": {"code": 429, "message": "rate limited"}});
        let info = extract_upstream(Some(&result), "");
        assert_eq!(info.code, "429");
    }

    #[test]
    fn test_result_shape_classification() {
        let nested = json!({"upstream_error": {"code": "A"}, "error": {"code": "B"}});
        assert!(matches!(ResultShape::classify(Some(&nested)), ResultShape::Nested(_)));

        let direct = json!({"error": {"code": "B"}});
        assert!(matches!(ResultShape::classify(Some(&direct)), ResultShape::Direct(_)));

        assert_eq!(ResultShape::classify(None), ResultShape::Missing);
        assert_eq!(ResultShape::classify(Some(&json!({}))), ResultShape::Missing);
    }

    #[test]
    fn test_raw_shape_prefers_nested_request_id() {
        let raw = r#"{"error":{"request_id":"inner"},"request_id":"outer"}"#;
        assert_eq!(RawShape::classify(raw), RawShape::NestedRequestId("inner".to_string()));
        assert_eq!(RawShape::classify("{}"), RawShape::NoRequestId);
        assert_eq!(RawShape::classify("<html>"), RawShape::Unparseable);
    }

    #[test]
    fn test_serialized_shape_uses_type_key() {
        let info = ErrorInfo {
            error_type: "T".to_string(),
            ..ErrorInfo::default()
        };
        let value = serde_json::to_value(&info).unwrap();
        assert_eq!(value["type"], "T");
        assert!(value.get("raw_parse_failed").is_none());
        assert_eq!(value.as_object().unwrap().len(), 5);
    }
}
