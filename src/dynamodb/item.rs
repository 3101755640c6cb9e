use aws_sdk_dynamodb::{primitives::Blob, types::AttributeValue};
use std::collections::HashMap;

/// A DynamoDB item built from one imported row.
///
/// Attribute values are limited to what the importer produces: strings,
/// integer numbers, binaries and `NULL` for empty cells.
///
/// # Example
///
/// ```ignore
/// let item = Item::new()
///     .set_integer("id", 5)
///     .set_string("email", "a@b.com");
/// ```
#[derive(Default, Debug, Clone, PartialEq)]
pub struct Item {
    pub(crate) attributes: HashMap<String, AttributeValue>,
}

impl Item {
    /// Creates a new empty `Item`.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_string(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.attributes
            .insert(key.into(), AttributeValue::S(value.into()));
        self
    }

    /// Sets a number attribute. DynamoDB numbers travel as strings.
    pub fn set_integer(mut self, key: impl Into<String>, value: i64) -> Self {
        self.attributes
            .insert(key.into(), AttributeValue::N(value.to_string()));
        self
    }

    pub fn set_binary(mut self, key: impl Into<String>, value: impl Into<Vec<u8>>) -> Self {
        self.attributes
            .insert(key.into(), AttributeValue::B(Blob::new(value)));
        self
    }

    pub fn set_null(mut self, key: impl Into<String>) -> Self {
        self.attributes.insert(key.into(), AttributeValue::Null(true));
        self
    }

    #[cfg(test)]
    /// Gets the value of an attribute as a string.
    ///
    /// Returns `None` if the attribute doesn't exist or is not a string.
    pub fn get_string(&self, key: &str) -> Option<&String> {
        self.attributes.get(key).and_then(|av| av.as_s().ok())
    }

    #[cfg(test)]
    /// Gets the value of an attribute as an integer.
    pub fn get_integer(&self, key: &str) -> Option<i64> {
        self.attributes
            .get(key)
            .and_then(|av| av.as_n().ok())
            .and_then(|n| n.parse().ok())
    }

    #[cfg(test)]
    pub fn get_binary(&self, key: &str) -> Option<&[u8]> {
        self.attributes
            .get(key)
            .and_then(|av| av.as_b().ok())
            .map(|blob| blob.as_ref())
    }

    #[cfg(test)]
    pub fn is_null(&self, key: &str) -> bool {
        matches!(self.attributes.get(key), Some(AttributeValue::Null(true)))
    }

    pub fn into_attributes(self) -> HashMap<String, AttributeValue> {
        self.attributes
    }
}

impl From<HashMap<String, AttributeValue>> for Item {
    fn from(attributes: HashMap<String, AttributeValue>) -> Self {
        Self { attributes }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn typed_setters_and_getters() {
        let item = Item::new()
            .set_string("email", "a@b.com")
            .set_integer("id", 5)
            .set_binary("avatar", "raw")
            .set_null("nickname");

        assert_eq!(item.get_string("email"), Some(&"a@b.com".to_string()));
        assert_eq!(item.get_integer("id"), Some(5));
        assert_eq!(item.get_binary("avatar"), Some(&b"raw"[..]));
        assert!(item.is_null("nickname"));
        assert_eq!(item.get_string("id"), None);
        assert_eq!(item.into_attributes().len(), 4);
    }
}
