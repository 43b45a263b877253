//! 批次匯入/匯出的 JSON 載荷處理

use serde_json::Value;
use shelf_core::{LedgerError, Result};

use crate::store::Collection;

/// 解析匯入載荷，必須是 JSON 陣列
pub fn parse_payload(collection: Collection, raw: &str) -> Result<Vec<Value>> {
    let value: Value = serde_json::from_str(raw)
        .map_err(|e| LedgerError::ImportFormat(format!("{collection} 不是有效的 JSON: {e}")))?;

    match value {
        Value::Array(records) => Ok(records),
        other => Err(LedgerError::ImportFormat(format!(
            "{collection} 必須是陣列，收到 {}",
            json_kind(&other)
        ))),
    }
}

/// 匯出為 JSON 陣列字串
pub fn render_payload(collection: Collection, records: &[Value]) -> Result<String> {
    serde_json::to_string_pretty(records)
        .map_err(|e| LedgerError::Storage(format!("無法匯出 {collection}: {e}")))
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "布林值",
        Value::Number(_) => "數字",
        Value::String(_) => "字串",
        Value::Array(_) => "陣列",
        Value::Object(_) => "物件",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[test]
    fn test_parse_array() {
        let records = parse_payload(Collection::Sales, r#"[{"id": "S1"}, {"id": "S2"}]"#).unwrap();
        assert_eq!(records.len(), 2);
    }

    #[rstest]
    #[case(r#"{"id": "S1"}"#)]
    #[case("42")]
    #[case("null")]
    #[case("[1, 2")]
    fn test_non_array_rejected(#[case] raw: &str) {
        assert!(matches!(
            parse_payload(Collection::Sales, raw),
            Err(LedgerError::ImportFormat(_))
        ));
    }
}
