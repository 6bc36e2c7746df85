//! Merge paginated partial results into stable, ordered domain objects.

use std::collections::HashMap;

use crate::model::{ApiEnvelope, DataCodeResponse, DataLayerResponse, TimeSeries};

/// Merge each series in `incoming` into `acc`, keyed by `series_code`.
/// Merging two series for the same code unions their points by
/// `survey_date` (the later observation wins on duplicate dates), sorts
/// ascending by date, and copies over non-empty metadata fields from the
/// incoming series where present, otherwise preserving what's already in
/// `acc`.
pub fn merge_series_map(acc: &mut HashMap<String, TimeSeries>, incoming: Vec<TimeSeries>) {
    for series in incoming {
        match acc.get_mut(&series.series_code) {
            None => {
                acc.insert(series.series_code.clone(), series);
            }
            Some(existing) => merge_into(existing, series),
        }
    }
}

fn merge_into(existing: &mut TimeSeries, incoming: TimeSeries) {
    for point in incoming.points {
        if let Some(slot) = existing.points.iter_mut().find(|p| p.survey_date == point.survey_date) {
            *slot = point;
        } else {
            existing.points.push(point);
        }
    }
    existing.points.sort_by(|a, b| a.survey_date.cmp(&b.survey_date));

    if incoming.name.is_some() {
        existing.name = incoming.name;
    }
    if incoming.unit.is_some() {
        existing.unit = incoming.unit;
    }
    if incoming.frequency.is_some() {
        existing.frequency = incoming.frequency;
    }
    if incoming.category.is_some() {
        existing.category = incoming.category;
    }
    if incoming.last_update.is_some() {
        existing.last_update = incoming.last_update;
    }
}

/// Emit only codes present in `by_code`, in the order of `ordered_codes`
/// (the request's normalized input order). Every code appears at most
/// once by construction of `by_code`.
pub fn build_data_code_response(
    ordered_codes: &[String],
    by_code: &HashMap<String, TimeSeries>,
    envelope: ApiEnvelope,
) -> DataCodeResponse {
    let series = ordered_codes.iter().filter_map(|code| by_code.get(code).cloned()).collect();
    DataCodeResponse { envelope, series }
}

/// Emit series sorted ascending by `series_code`.
pub fn build_data_layer_response_from_map(
    by_code: &HashMap<String, TimeSeries>,
    envelope: ApiEnvelope,
    next_position: Option<String>,
) -> DataLayerResponse {
    let mut series: Vec<TimeSeries> = by_code.values().cloned().collect();
    series.sort_by(|a, b| a.series_code.cmp(&b.series_code));
    DataLayerResponse { envelope, series, next_position }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::TimeSeriesPoint;

    fn point(date: &str, value: f64) -> TimeSeriesPoint {
        TimeSeriesPoint { survey_date: date.to_string(), value: Some(value) }
    }

    #[test]
    fn merge_unions_points_and_sorts_by_date() {
        let mut acc = HashMap::new();
        let mut first = TimeSeries::new("S1");
        first.points = vec![point("2020-02", 2.0)];
        merge_series_map(&mut acc, vec![first]);

        let mut second = TimeSeries::new("S1");
        second.points = vec![point("2020-01", 1.0), point("2020-02", 2.5)];
        merge_series_map(&mut acc, vec![second]);

        let merged = &acc["S1"];
        assert_eq!(merged.points.len(), 2);
        assert_eq!(merged.points[0].survey_date, "2020-01");
        assert_eq!(merged.points[1].value, Some(2.5), "later observation wins on duplicate date");
    }

    #[test]
    fn merge_preserves_existing_metadata_when_incoming_is_empty() {
        let mut acc = HashMap::new();
        let mut first = TimeSeries::new("S1");
        first.name = Some("Name".into());
        merge_series_map(&mut acc, vec![first]);

        let second = TimeSeries::new("S1");
        merge_series_map(&mut acc, vec![second]);

        assert_eq!(acc["S1"].name.as_deref(), Some("Name"));
    }

    #[test]
    fn build_data_code_response_preserves_input_order() {
        let mut by_code = HashMap::new();
        by_code.insert("B".to_string(), TimeSeries::new("B"));
        by_code.insert("A".to_string(), TimeSeries::new("A"));
        let ordered = vec!["B".to_string(), "A".to_string()];
        let response =
            build_data_code_response(&ordered, &by_code, ApiEnvelope::default());
        let codes: Vec<_> = response.series.iter().map(|s| s.series_code.clone()).collect();
        assert_eq!(codes, vec!["B", "A"]);
    }

    #[test]
    fn build_data_layer_response_sorts_ascending() {
        let mut by_code = HashMap::new();
        by_code.insert("B".to_string(), TimeSeries::new("B"));
        by_code.insert("A".to_string(), TimeSeries::new("A"));
        let response = build_data_layer_response_from_map(&by_code, ApiEnvelope::default(), None);
        let codes: Vec<_> = response.series.iter().map(|s| s.series_code.clone()).collect();
        assert_eq!(codes, vec!["A", "B"]);
    }
}
