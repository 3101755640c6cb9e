use aws_sdk_dynamodb::types::{AttributeDefinition, ScalarAttributeType};
use std::collections::HashMap;

/// Declared attribute types of a table, keyed by attribute name.
///
/// DynamoDB only declares the attributes used in the table's or its
/// indexes' key schemas; every other attribute is schemaless. Columns
/// that are not declared here are imported as strings.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Schema {
    fields: HashMap<String, FieldType>,
}

/// Scalar type of a declared attribute.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldType {
    /// `S`
    String,
    /// `N`
    Number,
    /// `B`
    Binary,
}

impl FieldType {
    fn from_scalar(scalar: &ScalarAttributeType) -> Option<Self> {
        match scalar {
            ScalarAttributeType::S => Some(Self::String),
            ScalarAttributeType::N => Some(Self::Number),
            ScalarAttributeType::B => Some(Self::Binary),
            _ => None,
        }
    }
}

impl Schema {
    /// Creates a new empty `Schema`.
    pub fn new() -> Self {
        Self::default()
    }

    /// Collects the attribute definitions returned by DescribeTable.
    pub fn from_attribute_definitions(definitions: &[AttributeDefinition]) -> Self {
        definitions
            .iter()
            .filter_map(|definition| {
                FieldType::from_scalar(definition.attribute_type())
                    .map(|field_type| (definition.attribute_name().to_string(), field_type))
            })
            .fold(Self::new(), |schema, (name, field_type)| {
                schema.add_field(name, field_type)
            })
    }

    /// Adds a field to the schema and returns the modified `Schema`.
    pub fn add_field(mut self, name: impl Into<String>, field_type: FieldType) -> Self {
        self.fields.insert(name.into(), field_type);
        self
    }

    pub fn field_type(&self, name: &str) -> Option<FieldType> {
        self.fields.get(name).copied()
    }

    /// Returns a reference to the fields in the schema.
    pub fn fields(&self) -> &HashMap<String, FieldType> {
        &self.fields
    }
}
