//! OpenSearch query builders.
//!
//! Translates caller-supplied filter parameters into an engine query body.

use chrono::DateTime;
use serde_json::{json, Map, Value};

use crate::errors::SearchError;

/// Build an OpenSearch query body from filter parameters.
///
/// Interpretation per field:
/// - `datetime` — an RFC 3339 instant, or a `start/end` range (either side
///   may be empty for an open-ended bound)
/// - `intersects` — a GeoJSON geometry matched against the `geometry`
///   `geo_shape` field
/// - anything else — an exact term match on `properties.<field>`
///
/// Empty filters produce a `match_all` query. Filters never contribute to
/// scoring; they go into the bool `filter` context.
pub fn build_filter_query(filters: &Map<String, Value>) -> Result<Value, SearchError> {
    if filters.is_empty() {
        return Ok(json!({ "query": { "match_all": {} } }));
    }

    let mut clauses: Vec<Value> = Vec::with_capacity(filters.len());

    for (field, value) in filters {
        let clause = match field.as_str() {
            "datetime" => build_datetime_clause(value)?,
            "intersects" => build_intersects_clause(value)?,
            _ => build_term_clause(field, value)?,
        };
        clauses.push(clause);
    }

    Ok(json!({
        "query": {
            "bool": {
                "filter": clauses
            }
        }
    }))
}

/// Build a term filter on a `properties` field.
fn build_term_clause(field: &str, value: &Value) -> Result<Value, SearchError> {
    if !(value.is_string() || value.is_number() || value.is_boolean()) {
        return Err(SearchError::invalid_query(format!(
            "filter '{}' must be a string, number, or boolean",
            field
        )));
    }

    Ok(json!({
        "term": { format!("properties.{}", field): value }
    }))
}

/// Build a datetime clause: an exact instant, or a `start/end` range.
fn build_datetime_clause(value: &Value) -> Result<Value, SearchError> {
    let text = value.as_str().ok_or_else(|| {
        SearchError::invalid_query("datetime filter must be a string")
    })?;

    match text.split_once('/') {
        Some((start, end)) => {
            let mut range = Map::new();
            if !start.is_empty() {
                validate_datetime(start)?;
                range.insert("gte".to_string(), json!(start));
            }
            if !end.is_empty() {
                validate_datetime(end)?;
                range.insert("lte".to_string(), json!(end));
            }
            if range.is_empty() {
                return Err(SearchError::invalid_query(
                    "datetime range must have at least one bound",
                ));
            }
            Ok(json!({ "range": { "properties.datetime": range } }))
        }
        None => {
            validate_datetime(text)?;
            Ok(json!({ "term": { "properties.datetime": text } }))
        }
    }
}

/// Build a geo_shape intersection clause against the record geometry.
fn build_intersects_clause(value: &Value) -> Result<Value, SearchError> {
    if !value.is_object() {
        return Err(SearchError::invalid_query(
            "intersects filter must be a GeoJSON geometry object",
        ));
    }

    Ok(json!({
        "geo_shape": {
            "geometry": {
                "shape": value,
                "relation": "intersects"
            }
        }
    }))
}

fn validate_datetime(text: &str) -> Result<(), SearchError> {
    DateTime::parse_from_rfc3339(text).map_err(|e| {
        SearchError::invalid_query(format!("invalid datetime '{}': {}", text, e))
    })?;
    Ok(())
}
