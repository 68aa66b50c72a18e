//! Firestore REST API types and the JSON codec for document fields.
//!
//! Documents are decoded by converting their typed Firestore values into plain
//! JSON and handing that to serde, so models only need `Deserialize`.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Firestore document value types.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Value {
    NullValue(()),
    BooleanValue(bool),
    IntegerValue(String), // Firestore sends integers as strings
    DoubleValue(f64),
    TimestampValue(String),
    StringValue(String),
    BytesValue(String),
    ReferenceValue(String),
    GeoPointValue(GeoPoint),
    ArrayValue(ArrayValue),
    MapValue(MapValue),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    pub latitude: f64,
    pub longitude: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArrayValue {
    pub values: Option<Vec<Value>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MapValue {
    pub fields: Option<HashMap<String, Value>>,
}

impl Value {
    /// Convert to plain JSON. Integers become numbers, timestamps/bytes/references strings.
    pub fn to_json(&self) -> serde_json::Value {
        use serde_json::Value as Json;

        match self {
            Value::NullValue(()) => Json::Null,
            Value::BooleanValue(b) => Json::Bool(*b),
            Value::IntegerValue(s) => s
                .parse::<i64>()
                .map(Json::from)
                .unwrap_or_else(|_| Json::String(s.clone())),
            Value::DoubleValue(f) => serde_json::Number::from_f64(*f)
                .map(Json::Number)
                .unwrap_or(Json::Null),
            Value::TimestampValue(s)
            | Value::StringValue(s)
            | Value::BytesValue(s)
            | Value::ReferenceValue(s) => Json::String(s.clone()),
            Value::GeoPointValue(p) => serde_json::json!({
                "latitude": p.latitude,
                "longitude": p.longitude,
            }),
            Value::ArrayValue(a) => Json::Array(
                a.values
                    .as_ref()
                    .map(|values| values.iter().map(Value::to_json).collect())
                    .unwrap_or_default(),
            ),
            Value::MapValue(m) => Json::Object(fields_to_json(m.fields.as_ref())),
        }
    }

    /// Convert from plain JSON.
    pub fn from_json(json: &serde_json::Value) -> Self {
        use serde_json::Value as Json;

        match json {
            Json::Null => Value::NullValue(()),
            Json::Bool(b) => Value::BooleanValue(*b),
            Json::Number(n) => {
                if let Some(i) = n.as_i64() {
                    Value::IntegerValue(i.to_string())
                } else {
                    Value::DoubleValue(n.as_f64().unwrap_or_default())
                }
            }
            Json::String(s) => Value::StringValue(s.clone()),
            Json::Array(items) => Value::ArrayValue(ArrayValue {
                values: Some(items.iter().map(Value::from_json).collect()),
            }),
            Json::Object(map) => Value::MapValue(MapValue {
                fields: Some(
                    map.iter()
                        .map(|(k, v)| (k.clone(), Value::from_json(v)))
                        .collect(),
                ),
            }),
        }
    }
}

fn fields_to_json(fields: Option<&HashMap<String, Value>>) -> serde_json::Map<String, serde_json::Value> {
    fields
        .map(|f| f.iter().map(|(k, v)| (k.clone(), v.to_json())).collect())
        .unwrap_or_default()
}

/// Firestore document.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Document {
    /// Full resource name
    pub name: Option<String>,
    /// Document fields
    pub fields: Option<HashMap<String, Value>>,
    /// Create time
    pub create_time: Option<String>,
    /// Update time
    pub update_time: Option<String>,
}

impl Document {
    /// Create a new document with the given fields.
    pub fn new(fields: HashMap<String, Value>) -> Self {
        Self {
            name: None,
            fields: Some(fields),
            create_time: None,
            update_time: None,
        }
    }

    /// Document ID, the last segment of the resource name.
    pub fn id(&self) -> Option<&str> {
        self.name
            .as_deref()
            .and_then(|name| name.rsplit('/').next())
            .filter(|id| !id.is_empty())
    }

    /// Fields as a JSON object, with the document ID under `id`.
    pub fn to_json_object(&self) -> serde_json::Value {
        let mut object = fields_to_json(self.fields.as_ref());
        if let Some(id) = self.id() {
            object.insert("id".to_string(), serde_json::Value::String(id.to_string()));
        }
        serde_json::Value::Object(object)
    }

    /// Decode the document into a model.
    pub fn decode<T: serde::de::DeserializeOwned>(&self) -> Result<T, serde_json::Error> {
        serde_json::from_value(self.to_json_object())
    }

    /// True if the document carries a non-null field of this name.
    pub fn has_field(&self, field: &str) -> bool {
        self.fields
            .as_ref()
            .and_then(|f| f.get(field))
            .is_some_and(|v| !matches!(v, Value::NullValue(())))
    }
}

/// List documents response.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListDocumentsResponse {
    pub documents: Option<Vec<Document>>,
    pub next_page_token: Option<String>,
}

// ============================================================================
// Structured Query Types
// ============================================================================

/// Request body of `documents:runQuery`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RunQueryRequest {
    pub structured_query: StructuredQuery,
}

/// One element of the `documents:runQuery` response stream.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RunQueryResponse {
    #[serde(default)]
    pub document: Option<Document>,
    #[serde(default)]
    pub read_time: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StructuredQuery {
    pub from: Vec<CollectionSelector>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub r#where: Option<Filter>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub order_by: Option<Vec<Order>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub limit: Option<i32>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CollectionSelector {
    pub collection_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub all_descendants: Option<bool>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Filter {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub field_filter: Option<FieldFilter>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub unary_filter: Option<UnaryFilter>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldFilter {
    pub field: FieldReference,
    pub op: String,
    pub value: Value,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UnaryFilter {
    pub op: String,
    pub field: FieldReference,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldReference {
    pub field_path: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Order {
    pub field: FieldReference,
    pub direction: String,
}

impl StructuredQuery {
    /// Query every document of a collection.
    pub fn collection(collection_id: &str) -> Self {
        Self {
            from: vec![CollectionSelector {
                collection_id: collection_id.to_string(),
                all_descendants: None,
            }],
            r#where: None,
            order_by: None,
            limit: None,
        }
    }

    /// Query every document of a collection where `field == value`.
    pub fn field_equals(collection_id: &str, field: &str, value: Value) -> Self {
        Self {
            r#where: Some(Filter {
                field_filter: Some(FieldFilter {
                    field: FieldReference {
                        field_path: field.to_string(),
                    },
                    op: "EQUAL".to_string(),
                    value,
                }),
                unary_filter: None,
            }),
            ..Self::collection(collection_id)
        }
    }

    /// Restrict to documents where `field` is set and not null.
    pub fn where_not_null(mut self, field: &str) -> Self {
        self.r#where = Some(Filter {
            field_filter: None,
            unary_filter: Some(UnaryFilter {
                op: "IS_NOT_NULL".to_string(),
                field: FieldReference {
                    field_path: field.to_string(),
                },
            }),
        });
        self
    }

    /// Add an ascending order on a field.
    pub fn order_by_ascending(mut self, field: &str) -> Self {
        self.order_by.get_or_insert_with(Vec::new).push(Order {
            field: FieldReference {
                field_path: field.to_string(),
            },
            direction: "ASCENDING".to_string(),
        });
        self
    }
}

// ============================================================================
// Aggregation Query Types
// ============================================================================

/// Alias of the COUNT aggregation in `documents:runAggregationQuery`.
pub const COUNT_ALIAS: &str = "count";

/// Request body of `documents:runAggregationQuery`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RunAggregationQueryRequest {
    pub structured_aggregation_query: StructuredAggregationQuery,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StructuredAggregationQuery {
    pub structured_query: StructuredQuery,
    pub aggregations: Vec<Aggregation>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Aggregation {
    pub alias: String,
    pub count: CountAggregation,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CountAggregation {}

impl RunAggregationQueryRequest {
    /// Count the documents matched by a query.
    pub fn count(structured_query: StructuredQuery) -> Self {
        Self {
            structured_aggregation_query: StructuredAggregationQuery {
                structured_query,
                aggregations: vec![Aggregation {
                    alias: COUNT_ALIAS.to_string(),
                    count: CountAggregation::default(),
                }],
            },
        }
    }
}

/// One element of the `documents:runAggregationQuery` response stream.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RunAggregationQueryResponse {
    #[serde(default)]
    pub result: Option<AggregationResult>,
    #[serde(default)]
    pub read_time: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AggregationResult {
    #[serde(default)]
    pub aggregate_fields: HashMap<String, Value>,
}

impl AggregationResult {
    /// Value of an integer aggregate.
    pub fn integer(&self, alias: &str) -> Option<u64> {
        match self.aggregate_fields.get(alias)? {
            Value::IntegerValue(raw) => raw.parse().ok(),
            _ => None,
        }
    }
}

/// Convert a Rust value to Firestore Value.
pub trait ToFirestoreValue {
    fn to_firestore_value(&self) -> Value;
}

impl ToFirestoreValue for String {
    fn to_firestore_value(&self) -> Value {
        Value::StringValue(self.clone())
    }
}

impl ToFirestoreValue for &str {
    fn to_firestore_value(&self) -> Value {
        Value::StringValue(self.to_string())
    }
}

impl ToFirestoreValue for i64 {
    fn to_firestore_value(&self) -> Value {
        Value::IntegerValue(self.to_string())
    }
}

impl ToFirestoreValue for f64 {
    fn to_firestore_value(&self) -> Value {
        Value::DoubleValue(*self)
    }
}

impl ToFirestoreValue for bool {
    fn to_firestore_value(&self) -> Value {
        Value::BooleanValue(*self)
    }
}

impl<T: ToFirestoreValue> ToFirestoreValue for Option<T> {
    fn to_firestore_value(&self) -> Value {
        match self {
            Some(v) => v.to_firestore_value(),
            None => Value::NullValue(()),
        }
    }
}
