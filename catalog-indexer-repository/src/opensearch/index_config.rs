//! Index settings and mappings for catalog collections.
//!
//! The mapping covers the fields a geospatial catalog entry carries: a
//! keyword name, typed `properties.*` fields (identifier, acquisition
//! datetime, earth-observation numerics), and a `geo_shape` geometry for
//! spatial queries.

use serde_json::{json, Value};

/// Get the index settings and mappings for a catalog collection.
pub fn catalog_index_body() -> Value {
    json!({
        "settings": {
            "number_of_shards": 1,
            "number_of_replicas": 1
        },
        "mappings": {
            "properties": {
                "name": {
                    "type": "keyword"
                },
                "properties": {
                    "properties": {
                        "id": { "type": "keyword" },
                        "datetime": { "type": "date" },
                        "eo:cloud_cover": { "type": "integer" },
                        "eo:gsd": { "type": "float" },
                        "eo:off_nadir": { "type": "float" },
                        "eo:azimuth": { "type": "float" },
                        "eo:sun_azimuth": { "type": "float" },
                        "eo:sun_elevation": { "type": "float" }
                    }
                },
                "geometry": {
                    "type": "geo_shape"
                }
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_index_body_structure() {
        let body = catalog_index_body();

        assert!(body["settings"]["number_of_shards"].is_number());
        assert!(body["settings"]["number_of_replicas"].is_number());

        let properties = &body["mappings"]["properties"];
        assert_eq!(properties["name"]["type"], "keyword");
        assert_eq!(properties["geometry"]["type"], "geo_shape");

        let item_properties = &properties["properties"]["properties"];
        assert_eq!(item_properties["id"]["type"], "keyword");
        assert_eq!(item_properties["datetime"]["type"], "date");
        assert_eq!(item_properties["eo:cloud_cover"]["type"], "integer");
        assert_eq!(item_properties["eo:sun_elevation"]["type"], "float");
    }
}
