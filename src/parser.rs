//! Wire JSON → typed domain objects.
//!
//! The response envelope is parsed loosely (missing fields become `None`)
//! and then the endpoint-specific `RESULTSET` shape is decoded on top of
//! it. `MESSAGEID == "M181030I"` is the server's documented "no data"
//! marker: it means an empty `RESULTSET`, not a protocol error.

use serde_json::Value;

use crate::error::BojApiError;
use crate::model::{ApiEnvelope, MetadataEntry, TimeSeries, TimeSeriesPoint};

/// The documented BOJ "no matching data" message id.
const NO_DATA_MARKER: &str = "M181030I";

fn as_str(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn field<'a>(root: &'a Value, key: &str) -> Option<&'a Value> {
    root.get(key).filter(|v| !v.is_null())
}

pub fn parse_envelope(root: &Value) -> ApiEnvelope {
    let status = field(root, "STATUS").and_then(|v| match v {
        Value::Number(n) => n.as_i64(),
        Value::String(s) => s.trim().parse::<i64>().ok(),
        _ => None,
    });
    ApiEnvelope {
        status,
        message_id: field(root, "MESSAGEID").and_then(as_str),
        message: field(root, "MESSAGE").and_then(as_str),
        date: field(root, "DATE").and_then(as_str),
    }
}

fn is_no_data(envelope: &ApiEnvelope) -> bool {
    envelope.message_id.as_deref() == Some(NO_DATA_MARKER)
}

/// Parse the `RESULTSET` of a `getDataCode`/`getDataLayer` response into
/// `TimeSeries` values. Each entry carries `SERIES_CODE` plus the metadata
/// fields and a nested `VALUES = {SURVEY_DATES: [...], VALUES: [...]}`
/// zipped by position; length mismatches truncate to the shorter side
/// (a `tracing::warn!` is emitted when that happens). `name`/`unit`/
/// `category` prefer the `_J` (Japanese) field, falling back to the
/// English one when the server only populates one of the pair.
pub fn parse_series_resultset(root: &Value, envelope: &ApiEnvelope) -> Result<Vec<TimeSeries>, BojApiError> {
    if is_no_data(envelope) {
        return Ok(Vec::new());
    }

    let Some(resultset) = field(root, "RESULTSET") else {
        return Ok(Vec::new());
    };
    let Some(entries) = resultset.as_array() else {
        return Err(BojApiError::Protocol {
            message: "RESULTSET is not an array".into(),
            status: envelope.status,
            message_id: envelope.message_id.clone(),
            http_status: None,
        });
    };

    let mut series = Vec::with_capacity(entries.len());
    for entry in entries {
        let series_code = field(entry, "SERIES_CODE").and_then(as_str).ok_or_else(|| {
            BojApiError::Protocol {
                message: "series entry missing SERIES_CODE".into(),
                status: envelope.status,
                message_id: envelope.message_id.clone(),
                http_status: None,
            }
        })?;

        let mut ts = TimeSeries::new(series_code);
        ts.name = field(entry, "NAME_OF_TIME_SERIES_J").and_then(as_str).or_else(|| field(entry, "NAME_OF_TIME_SERIES").and_then(as_str));
        ts.unit = field(entry, "UNIT_J").and_then(as_str).or_else(|| field(entry, "UNIT").and_then(as_str));
        ts.frequency = field(entry, "FREQUENCY").and_then(as_str);
        ts.category = field(entry, "CATEGORY_J").and_then(as_str).or_else(|| field(entry, "CATEGORY").and_then(as_str));
        ts.last_update = field(entry, "LAST_UPDATE").and_then(as_str);

        if let Some(values) = field(entry, "VALUES") {
            let dates: Vec<String> = field(values, "SURVEY_DATES")
                .and_then(|v| v.as_array())
                .map(|arr| arr.iter().filter_map(as_str).collect())
                .unwrap_or_default();
            let raw_values: Vec<Option<f64>> = field(values, "VALUES")
                .and_then(|v| v.as_array())
                .map(|arr| arr.iter().map(|v| v.as_f64()).collect())
                .unwrap_or_default();

            if dates.len() != raw_values.len() {
                tracing::warn!(
                    series_code = %ts.series_code,
                    dates_len = dates.len(),
                    values_len = raw_values.len(),
                    "SURVEY_DATES/VALUES length mismatch, truncating to shorter side"
                );
            }

            let len = dates.len().min(raw_values.len());
            ts.points = dates
                .into_iter()
                .take(len)
                .zip(raw_values.into_iter().take(len))
                .map(|(survey_date, value)| TimeSeriesPoint { survey_date, value })
                .collect();
        }

        series.push(ts);
    }
    Ok(series)
}

/// Parse the `NEXTPOSITION` field, if present, as a raw opaque string
/// (decimal int or digit string). Returns `None` for an empty string or
/// absent/null field ("end of stream"). Any other shape is the caller's
/// concern (see [`crate::pagination`]).
pub fn raw_next_position(root: &Value) -> Option<Value> {
    root.get("NEXTPOSITION").cloned()
}

/// Parse a metadata `RESULTSET` entry list per the exhaustive field map in
/// the external interface contract.
pub fn parse_metadata_resultset(
    root: &Value,
    envelope: &ApiEnvelope,
) -> Result<Vec<MetadataEntry>, BojApiError> {
    if is_no_data(envelope) {
        return Ok(Vec::new());
    }
    let Some(resultset) = field(root, "RESULTSET") else {
        return Ok(Vec::new());
    };
    let Some(entries) = resultset.as_array() else {
        return Err(BojApiError::Protocol {
            message: "RESULTSET is not an array".into(),
            status: envelope.status,
            message_id: envelope.message_id.clone(),
            http_status: None,
        });
    };

    let mut out = Vec::with_capacity(entries.len());
    for entry in entries {
        let series_code = field(entry, "SERIES_CODE").and_then(as_str).ok_or_else(|| {
            BojApiError::Protocol {
                message: "metadata entry missing SERIES_CODE".into(),
                status: envelope.status,
                message_id: envelope.message_id.clone(),
                http_status: None,
            }
        })?;

        out.push(MetadataEntry {
            series_code,
            name_ja: field(entry, "NAME_OF_TIME_SERIES_J").and_then(as_str),
            name_en: field(entry, "NAME_OF_TIME_SERIES").and_then(as_str),
            unit_ja: field(entry, "UNIT_J").and_then(as_str),
            unit_en: field(entry, "UNIT").and_then(as_str),
            frequency: field(entry, "FREQUENCY").and_then(as_str),
            category_ja: field(entry, "CATEGORY_J").and_then(as_str),
            category_en: field(entry, "CATEGORY").and_then(as_str),
            layer1: field(entry, "LAYER1").and_then(as_str),
            layer2: field(entry, "LAYER2").and_then(as_str),
            layer3: field(entry, "LAYER3").and_then(as_str),
            layer4: field(entry, "LAYER4").and_then(as_str),
            layer5: field(entry, "LAYER5").and_then(as_str),
            start_of_series: field(entry, "START_OF_THE_TIME_SERIES").and_then(as_str),
            end_of_series: field(entry, "END_OF_THE_TIME_SERIES").and_then(as_str),
            last_update: field(entry, "LAST_UPDATE").and_then(as_str),
            notes_ja: field(entry, "NOTES_J").and_then(as_str),
            notes_en: field(entry, "NOTES").and_then(as_str),
        });
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn no_data_marker_yields_empty_series() {
        let root = json!({"STATUS": 200, "MESSAGEID": "M181030I", "RESULTSET": [{"SERIES_CODE": "X"}]});
        let envelope = parse_envelope(&root);
        let series = parse_series_resultset(&root, &envelope).unwrap();
        assert!(series.is_empty());
    }

    #[test]
    fn series_points_are_zipped_by_position() {
        let root = json!({
            "STATUS": 200,
            "RESULTSET": [{
                "SERIES_CODE": "S1",
                "VALUES": {
                    "SURVEY_DATES": ["2020-01", "2020-02"],
                    "VALUES": [1.5, null]
                }
            }]
        });
        let envelope = parse_envelope(&root);
        let series = parse_series_resultset(&root, &envelope).unwrap();
        assert_eq!(series.len(), 1);
        assert_eq!(series[0].points.len(), 2);
        assert_eq!(series[0].points[0].value, Some(1.5));
        assert_eq!(series[0].points[1].value, None);
    }

    #[test]
    fn mismatched_lengths_truncate_to_shorter_side() {
        let root = json!({
            "STATUS": 200,
            "RESULTSET": [{
                "SERIES_CODE": "S1",
                "VALUES": {
                    "SURVEY_DATES": ["2020-01", "2020-02", "2020-03"],
                    "VALUES": [1.0, 2.0]
                }
            }]
        });
        let envelope = parse_envelope(&root);
        let series = parse_series_resultset(&root, &envelope).unwrap();
        assert_eq!(series[0].points.len(), 2);
    }

    #[test]
    fn series_name_unit_category_prefer_the_japanese_field() {
        let root = json!({
            "STATUS": 200,
            "RESULTSET": [{
                "SERIES_CODE": "S1",
                "NAME_OF_TIME_SERIES_J": "系列名",
                "NAME_OF_TIME_SERIES": "Series Name",
                "UNIT_J": "円",
                "UNIT": "Yen",
                "CATEGORY_J": "分類",
                "CATEGORY": "Category",
            }]
        });
        let envelope = parse_envelope(&root);
        let series = parse_series_resultset(&root, &envelope).unwrap();
        assert_eq!(series[0].name.as_deref(), Some("系列名"));
        assert_eq!(series[0].unit.as_deref(), Some("円"));
        assert_eq!(series[0].category.as_deref(), Some("分類"));
    }

    #[test]
    fn series_name_unit_category_fall_back_to_english_when_japanese_is_absent() {
        let root = json!({
            "STATUS": 200,
            "RESULTSET": [{
                "SERIES_CODE": "S1",
                "NAME_OF_TIME_SERIES": "Series Name",
                "UNIT": "Yen",
                "CATEGORY": "Category",
            }]
        });
        let envelope = parse_envelope(&root);
        let series = parse_series_resultset(&root, &envelope).unwrap();
        assert_eq!(series[0].name.as_deref(), Some("Series Name"));
        assert_eq!(series[0].unit.as_deref(), Some("Yen"));
        assert_eq!(series[0].category.as_deref(), Some("Category"));
    }

    #[test]
    fn metadata_field_mapping() {
        let root = json!({
            "STATUS": 200,
            "RESULTSET": [{
                "SERIES_CODE": "S1",
                "NAME_OF_TIME_SERIES_J": "名前",
                "LAYER1": "A",
            }]
        });
        let envelope = parse_envelope(&root);
        let entries = parse_metadata_resultset(&root, &envelope).unwrap();
        assert_eq!(entries[0].name_ja.as_deref(), Some("名前"));
        assert_eq!(entries[0].layer1.as_deref(), Some("A"));
    }
}
