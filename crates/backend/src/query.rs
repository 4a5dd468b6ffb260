//! Filter, ordering, and limit predicates for `list_documents`.

use serde::Serialize;
use serde_json::{json, Value};

/// One predicate of a document listing, serialized the way the remote expects
/// it in the `queries[]` parameter.
#[derive(Debug, Clone, PartialEq)]
pub enum Query {
    Equal { attribute: String, values: Vec<Value> },
    Search { attribute: String, text: String },
    OrderDesc(String),
    OrderAsc(String),
    Limit(u32),
}

impl Query {
    pub fn equal(attribute: impl Into<String>, value: impl Into<Value>) -> Self {
        Query::Equal {
            attribute: attribute.into(),
            values: vec![value.into()],
        }
    }

    pub fn search(attribute: impl Into<String>, text: impl Into<String>) -> Self {
        Query::Search {
            attribute: attribute.into(),
            text: text.into(),
        }
    }

    pub fn order_desc(attribute: impl Into<String>) -> Self {
        Query::OrderDesc(attribute.into())
    }

    pub fn order_asc(attribute: impl Into<String>) -> Self {
        Query::OrderAsc(attribute.into())
    }

    pub fn limit(limit: u32) -> Self {
        Query::Limit(limit)
    }

    pub fn method(&self) -> &'static str {
        match self {
            Query::Equal { .. } => "equal",
            Query::Search { .. } => "search",
            Query::OrderDesc(_) => "orderDesc",
            Query::OrderAsc(_) => "orderAsc",
            Query::Limit(_) => "limit",
        }
    }

    pub fn to_value(&self) -> Value {
        match self {
            Query::Equal { attribute, values } => json!({
                "method": self.method(),
                "attribute": attribute,
                "values": values,
            }),
            Query::Search { attribute, text } => json!({
                "method": self.method(),
                "attribute": attribute,
                "values": [text],
            }),
            Query::OrderDesc(attribute) | Query::OrderAsc(attribute) => json!({
                "method": self.method(),
                "attribute": attribute,
            }),
            Query::Limit(limit) => json!({
                "method": self.method(),
                "values": [limit],
            }),
        }
    }

    /// The `queries[]` parameter value.
    pub fn encode(&self) -> String {
        self.to_value().to_string()
    }
}

impl Serialize for Query {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.to_value().serialize(serializer)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn equal_query_encodes_attribute_and_values() {
        let query = Query::equal("accountId", "acc-1");
        assert_eq!(
            query.to_value(),
            json!({"method": "equal", "attribute": "accountId", "values": ["acc-1"]})
        );
    }

    #[test]
    fn ordering_and_limit_omit_unused_keys() {
        assert_eq!(
            Query::order_desc("$createdAt").to_value(),
            json!({"method": "orderDesc", "attribute": "$createdAt"})
        );
        assert_eq!(
            Query::limit(7).to_value(),
            json!({"method": "limit", "values": [7]})
        );
    }

    #[test]
    fn search_query_wraps_text_in_values() {
        let encoded = Query::search("title", "sunset").encode();
        let parsed: Value = serde_json::from_str(&encoded).unwrap();
        assert_eq!(parsed["values"], json!(["sunset"]));
        assert_eq!(parsed["method"], "search");
    }
}
