// ==========================================
// 空间站货舱管理系统 - 导入记录校验器
// ==========================================
// 职责: 原始记录 → 已校验的 Item / Container
// 红线: 逐条校验, 单条失败只影响该条, 不中断整批
// ==========================================

use crate::domain::container::{Container, RawContainerRecord};
use crate::domain::item::{Item, RawItemRecord};
use crate::domain::spatial::Dimensions;
use crate::domain::types::OpenFace;
use crate::importer::error::{ImportError, RecordViolation};
use chrono::{DateTime, NaiveDate, Utc};
use serde::de::DeserializeOwned;
use serde_json::Value as JsonValue;

/// 表示 "无" 的占位写法
const EMPTY_MARKERS: [&str; 4] = ["", "n/a", "na", "none"];

pub struct RecordValidator;

impl RecordValidator {
    /// 校验物品记录
    ///
    /// # 返回
    /// - Ok(Item): 初始状态 Unplaced
    /// - Err(Vec<RecordViolation>): 该记录的全部违规项
    pub fn validate_item(index: usize, raw: &RawItemRecord) -> Result<Item, Vec<RecordViolation>> {
        let id = raw.item_id.as_deref().map(str::trim).unwrap_or_default().to_string();
        let mut v = Violations::new(index, &id);

        if id.is_empty() {
            v.push("item_id", "物品ID缺失");
        }
        let name = raw.name.as_deref().map(str::trim).unwrap_or_default();
        if name.is_empty() {
            v.push("name", "名称缺失");
        }

        let dims = v.dimensions(raw.width, raw.depth, raw.height);

        let mass = match raw.mass {
            None => {
                v.push("mass", "质量缺失");
                0.0
            }
            Some(m) if !m.is_finite() || m < 0.0 => {
                v.push("mass", format!("质量必须为非负有限数: {}", m));
                0.0
            }
            Some(m) => m,
        };

        let priority = match raw.priority {
            None => {
                v.push("priority", "优先级缺失");
                0
            }
            Some(p) => u32::try_from(p).unwrap_or_else(|_| {
                v.push("priority", format!("优先级超出范围: {}", p));
                0
            }),
        };

        let usage_limit = match raw.usage_limit {
            None => None,
            Some(n) => match u32::try_from(n) {
                Ok(n) => Some(n),
                Err(_) => {
                    v.push("usage_limit", format!("使用次数超出范围: {}", n));
                    None
                }
            },
        };

        let expiry = match raw.expiry.as_deref() {
            None => None,
            Some(s) => match parse_expiry(s) {
                Ok(e) => e,
                Err(msg) => {
                    v.push("expiry", msg);
                    None
                }
            },
        };

        let preferred_zone = raw
            .preferred_zone
            .as_deref()
            .map(str::trim)
            .filter(|z| !z.is_empty())
            .map(str::to_string);

        v.finish()?;

        let mut item = Item::new(id, name, dims, mass, priority);
        if let Some(e) = expiry {
            item = item.with_expiry(e);
        }
        if let Some(n) = usage_limit {
            item = item.with_usage_limit(n);
        }
        if let Some(z) = preferred_zone {
            item = item.with_preferred_zone(z);
        }
        Ok(item)
    }

    /// 校验货箱记录
    pub fn validate_container(
        index: usize,
        raw: &RawContainerRecord,
    ) -> Result<Container, Vec<RecordViolation>> {
        let id = raw.container_id.as_deref().map(str::trim).unwrap_or_default().to_string();
        let mut v = Violations::new(index, &id);

        if id.is_empty() {
            v.push("container_id", "货箱ID缺失");
        }
        let zone = raw.zone.as_deref().map(str::trim).unwrap_or_default();
        if zone.is_empty() {
            v.push("zone", "区域缺失");
        }

        let dims = v.dimensions(raw.width, raw.depth, raw.height);

        let open_face = match raw.open_face.as_deref() {
            None => OpenFace::default(),
            Some(s) => OpenFace::parse(s).unwrap_or_else(|| {
                v.push("open_face", format!("无法识别的开口面: {}", s));
                OpenFace::default()
            }),
        };

        v.finish()?;
        Ok(Container::new(id, zone, dims).with_open_face(open_face))
    }

    /// 把 JSON 数组逐元素解析为原始记录
    ///
    /// 顶层不是数组时整体报错; 单个元素解析失败只记为该元素的违规
    pub fn parse_records<T: DeserializeOwned>(
        json: &str,
        id_field: &str,
    ) -> Result<Vec<Result<T, RecordViolation>>, ImportError> {
        let values: Vec<JsonValue> =
            serde_json::from_str(json).map_err(|e| ImportError::MalformedPayload(e.to_string()))?;

        Ok(values
            .into_iter()
            .enumerate()
            .map(|(index, value)| {
                let id = lookup_id(&value, id_field);
                serde_json::from_value::<T>(value).map_err(|e| RecordViolation {
                    index,
                    id,
                    field: "record".to_string(),
                    message: e.to_string(),
                })
            })
            .collect())
    }
}

/// 解析到期时间: RFC 3339 时刻, 或 YYYY-MM-DD 日期 (当日 00:00 UTC)
pub fn parse_expiry(raw: &str) -> Result<Option<DateTime<Utc>>, String> {
    let s = raw.trim();
    if EMPTY_MARKERS.contains(&s.to_ascii_lowercase().as_str()) {
        return Ok(None);
    }
    if let Ok(ts) = DateTime::parse_from_rfc3339(s) {
        return Ok(Some(ts.with_timezone(&Utc)));
    }
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|dt| Some(dt.and_utc()))
        .ok_or_else(|| format!("无法解析的到期时间: {}", s))
}

/// 从 camelCase / snake_case 两种写法中取记录ID
fn lookup_id(value: &JsonValue, id_field: &str) -> String {
    let camel = snake_to_camel(id_field);
    value
        .get(id_field)
        .or_else(|| value.get(&camel))
        .and_then(JsonValue::as_str)
        .unwrap_or_default()
        .to_string()
}

fn snake_to_camel(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut upper = false;
    for ch in s.chars() {
        if ch == '_' {
            upper = true;
        } else if upper {
            out.extend(ch.to_uppercase());
            upper = false;
        } else {
            out.push(ch);
        }
    }
    out
}

// ==========================================
// 违规收集器
// ==========================================
struct Violations {
    index: usize,
    id: String,
    items: Vec<RecordViolation>,
}

impl Violations {
    fn new(index: usize, id: &str) -> Self {
        Self {
            index,
            id: id.to_string(),
            items: Vec::new(),
        }
    }

    fn push(&mut self, field: &str, message: impl Into<String>) {
        self.items.push(RecordViolation {
            index: self.index,
            id: self.id.clone(),
            field: field.to_string(),
            message: message.into(),
        });
    }

    fn dimensions(&mut self, width: Option<f64>, depth: Option<f64>, height: Option<f64>) -> Dimensions {
        let mut one = |field: &str, value: Option<f64>| match value {
            None => {
                self.push(field, "尺寸缺失");
                0.0
            }
            Some(x) if !x.is_finite() || x <= 0.0 => {
                self.push(field, format!("尺寸必须为正数: {}", x));
                0.0
            }
            Some(x) => x,
        };
        let w = one("width", width);
        let d = one("depth", depth);
        let h = one("height", height);
        Dimensions::new(w, d, h)
    }

    fn finish(self) -> Result<(), Vec<RecordViolation>> {
        if self.items.is_empty() {
            Ok(())
        } else {
            Err(self.items)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn raw_item() -> RawItemRecord {
        RawItemRecord {
            item_id: Some("001".into()),
            name: Some("Food Packet".into()),
            width: Some(10.0),
            depth: Some(10.0),
            height: Some(20.0),
            mass: Some(5.0),
            priority: Some(80),
            expiry: Some("2025-05-20".into()),
            usage_limit: Some(30),
            preferred_zone: Some("Crew Quarters".into()),
        }
    }

    #[test]
    fn test_valid_item() {
        let item = RecordValidator::validate_item(0, &raw_item()).unwrap();
        assert_eq!(item.item_id, "001");
        assert_eq!(item.remaining_uses, Some(30));
        assert_eq!(
            item.expiry,
            Some(Utc.with_ymd_and_hms(2025, 5, 20, 0, 0, 0).unwrap())
        );
        assert_eq!(item.preferred_zone.as_deref(), Some("Crew Quarters"));
    }

    #[test]
    fn test_collects_all_violations() {
        let raw = RawItemRecord {
            width: Some(-1.0),
            priority: Some(-5),
            expiry: Some("tomorrow".into()),
            ..raw_item()
        };
        let errs = RecordValidator::validate_item(3, &raw).unwrap_err();
        let fields: Vec<_> = errs.iter().map(|e| e.field.as_str()).collect();
        assert_eq!(fields, vec!["width", "priority", "expiry"]);
        assert!(errs.iter().all(|e| e.index == 3 && e.id == "001"));
    }

    #[test]
    fn test_missing_required_fields() {
        let errs = RecordValidator::validate_item(0, &RawItemRecord::default()).unwrap_err();
        assert!(errs.iter().any(|e| e.field == "item_id"));
        assert!(errs.iter().any(|e| e.field == "mass"));
        assert!(errs.iter().any(|e| e.field == "priority"));
    }

    #[test]
    fn test_expiry_formats() {
        assert_eq!(parse_expiry("N/A").unwrap(), None);
        assert_eq!(parse_expiry("").unwrap(), None);
        assert_eq!(
            parse_expiry("2025-05-20T12:00:00+02:00").unwrap(),
            Some(Utc.with_ymd_and_hms(2025, 5, 20, 10, 0, 0).unwrap())
        );
        assert!(parse_expiry("20/05/2025").is_err());
    }

    #[test]
    fn test_container_open_face() {
        let raw = RawContainerRecord {
            container_id: Some("contA".into()),
            zone: Some("Crew Quarters".into()),
            width: Some(100.0),
            depth: Some(85.0),
            height: Some(200.0),
            open_face: Some("sideways".into()),
        };
        let errs = RecordValidator::validate_container(1, &raw).unwrap_err();
        assert_eq!(errs[0].field, "open_face");

        let ok = RecordValidator::validate_container(
            1,
            &RawContainerRecord {
                open_face: None,
                ..raw
            },
        )
        .unwrap();
        assert_eq!(ok.open_face, OpenFace::default());
    }

    #[test]
    fn test_parse_records_isolates_bad_elements() {
        let json = r#"[
            {"itemId":"A","name":"a","width":1,"depth":1,"height":1,"mass":1,"priority":1},
            {"itemId":"B","colour":"red"},
            {"item_id":"C","name":"c","width":"wide"}
        ]"#;
        let parsed = RecordValidator::parse_records::<RawItemRecord>(json, "item_id").unwrap();
        assert_eq!(parsed.len(), 3);
        assert!(parsed[0].is_ok());
        let b = parsed[1].as_ref().unwrap_err();
        assert_eq!((b.index, b.id.as_str()), (1, "B"));
        assert_eq!(parsed[2].as_ref().unwrap_err().id, "C");

        assert!(RecordValidator::parse_records::<RawItemRecord>("{}", "item_id").is_err());
    }
}
