//! Domain query → wire query parameters.

use crate::model::{DataCodeQuery, DataLayerQuery, MetadataQuery};

/// Ordered key/value pairs ready to hand to an HTTP client as a query
/// string. Order is not semantically significant but kept deterministic
/// for logging/testing.
pub type WireParams = Vec<(String, String)>;

fn common(db: &str, lang: &str, start_date: Option<&str>, end_date: Option<&str>) -> WireParams {
    let mut params = vec![
        ("format".to_string(), "json".to_string()),
        ("lang".to_string(), lang.to_string()),
        ("db".to_string(), db.to_string()),
    ];
    if let Some(start_date) = start_date {
        params.push(("startDate".to_string(), start_date.to_string()));
    }
    if let Some(end_date) = end_date {
        params.push(("endDate".to_string(), end_date.to_string()));
    }
    params
}

fn push_start_position(params: &mut WireParams, start_position: Option<u64>) {
    if let Some(position) = start_position {
        if position != 1 {
            params.push(("startPosition".to_string(), position.to_string()));
        }
    }
}

/// Build params for a `getDataCode` request against a single chunk of
/// codes at the given cursor position.
pub fn data_code_params(query: &DataCodeQuery, codes: &[String], start_position: u64) -> WireParams {
    let mut params =
        common(&query.db, &query.lang, query.start_date.as_deref(), query.end_date.as_deref());
    params.push(("code".to_string(), codes.join(",")));
    push_start_position(&mut params, Some(start_position));
    params
}

/// Build params for a `getDataLayer` request at the given cursor position.
pub fn data_layer_params(query: &DataLayerQuery, start_position: u64) -> WireParams {
    let mut params =
        common(&query.db, &query.lang, query.start_date.as_deref(), query.end_date.as_deref());
    params.push(("frequency".to_string(), query.frequency.clone()));
    let layers: Vec<&str> = query.layers().into_iter().map(|(_, pattern)| pattern).collect();
    params.push(("layer".to_string(), layers.join(",")));
    push_start_position(&mut params, Some(start_position));
    params
}

/// Build params for a `getMetadata` request. No endpoint-specific extras.
pub fn metadata_params(query: &MetadataQuery) -> WireParams {
    common(&query.db, &query.lang, None, None)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn data_code_params_include_joined_codes() {
        let query = DataCodeQuery::new("db", vec!["A".into(), "B".into()]);
        let params = data_code_params(&query, &query.code, 1);
        assert!(params.contains(&("code".to_string(), "A,B".to_string())));
        assert!(!params.iter().any(|(k, _)| k == "startPosition"));
    }

    #[test]
    fn start_position_omitted_only_when_one() {
        let query = DataCodeQuery::new("db", vec!["A".into()]);
        let params = data_code_params(&query, &query.code, 5);
        assert!(params.contains(&("startPosition".to_string(), "5".to_string())));
    }

    #[test]
    fn data_layer_params_join_contiguous_layers() {
        let query = DataLayerQuery {
            db: "db".into(),
            frequency: "M".into(),
            lang: "JP".into(),
            layer1: "A".into(),
            layer2: Some("B".into()),
            layer3: None,
            layer4: None,
            layer5: None,
            start_date: None,
            end_date: None,
            start_position: None,
        };
        let params = data_layer_params(&query, 1);
        assert!(params.contains(&("layer".to_string(), "A,B".to_string())));
    }
}
