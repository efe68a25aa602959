use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::{Error, Result};
use crate::model::ObjectId;
use crate::vector::DistanceMetric;

/// Data type of a collection property.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DataType {
    Text,
}

/// A named, typed property stored alongside each vector.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Property {
    pub name: String,
    pub data_type: DataType,
}

impl Property {
    #[must_use]
    pub fn text(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            data_type: DataType::Text,
        }
    }
}

/// Definition of a vector collection.
///
/// `dimension` may be left unset, in which case the first inserted object
/// fixes it for the lifetime of the collection. `model` names the embedding
/// model that produced the stored vectors, when known.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CollectionSchema {
    pub name: String,
    pub properties: Vec<Property>,
    pub metric: DistanceMetric,
    pub dimension: Option<usize>,
    pub model: Option<String>,
}

impl CollectionSchema {
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            properties: Vec::new(),
            metric: DistanceMetric::default(),
            dimension: None,
            model: None,
        }
    }

    #[must_use]
    pub fn with_property(mut self, property: Property) -> Self {
        self.properties.push(property);
        self
    }

    #[must_use]
    pub fn with_metric(mut self, metric: DistanceMetric) -> Self {
        self.metric = metric;
        self
    }

    #[must_use]
    pub fn with_dimension(mut self, dimension: usize) -> Self {
        self.dimension = Some(dimension);
        self
    }

    #[must_use]
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }

    #[must_use]
    pub fn property(&self, name: &str) -> Option<&Property> {
        self.properties.iter().find(|p| p.name == name)
    }

    /// Whether `other` describes the same collection. An unset dimension or
    /// model on either side is compatible with any value.
    #[must_use]
    pub fn is_compatible_with(&self, other: &Self) -> bool {
        self.name == other.name
            && self.properties == other.properties
            && self.metric == other.metric
            && match (self.dimension, other.dimension) {
                (Some(a), Some(b)) => a == b,
                _ => true,
            }
            && match (&self.model, &other.model) {
                (Some(a), Some(b)) => a == b,
                _ => true,
            }
    }

    /// Check that every property in `properties` is declared and has a
    /// value of the declared type. Declared properties may be absent.
    ///
    /// # Errors
    /// Returns [`Error::InvalidData`] for unknown or mistyped properties.
    pub fn validate_properties(&self, properties: &Map<String, Value>) -> Result<()> {
        for (name, value) in properties {
            let property = self.property(name).ok_or_else(|| {
                Error::InvalidData(format!(
                    "property '{name}' is not defined on collection '{}'",
                    self.name
                ))
            })?;

            match property.data_type {
                DataType::Text if value.is_string() => {}
                DataType::Text => {
                    return Err(Error::InvalidData(format!(
                        "property '{name}' on collection '{}' must be text",
                        self.name
                    )));
                }
            }
        }
        Ok(())
    }
}

/// A payload plus its vector, as stored in a collection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DataObject {
    pub id: ObjectId,
    pub properties: Map<String, Value>,
    pub vector: Vec<f32>,
}

impl DataObject {
    #[must_use]
    pub fn new(vector: Vec<f32>) -> Self {
        Self {
            id: ObjectId::new(),
            properties: Map::new(),
            vector,
        }
    }

    #[must_use]
    pub fn with_property(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.properties
            .insert(name.into(), Value::String(value.into()));
        self
    }
}

/// A nearest-vector query.
#[derive(Debug, Clone, PartialEq)]
pub struct NearVector {
    pub vector: Vec<f32>,
    pub limit: usize,
    /// Drop hits farther than this distance.
    pub max_distance: Option<f32>,
}

impl NearVector {
    pub const DEFAULT_LIMIT: usize = 5;

    #[must_use]
    pub fn new(vector: Vec<f32>) -> Self {
        Self {
            vector,
            limit: Self::DEFAULT_LIMIT,
            max_distance: None,
        }
    }

    #[must_use]
    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = limit;
        self
    }

    #[must_use]
    pub fn with_max_distance(mut self, max_distance: f32) -> Self {
        self.max_distance = Some(max_distance);
        self
    }
}

/// One result of a nearest-vector query.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Hit {
    pub id: ObjectId,
    pub properties: Map<String, Value>,
    pub distance: f32,
    pub certainty: Option<f32>,
}

impl Hit {
    /// A text property of the hit, if present.
    #[must_use]
    pub fn text_property(&self, name: &str) -> Option<&str> {
        self.properties.get(name).and_then(Value::as_str)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn paper_schema() -> CollectionSchema {
        CollectionSchema::new("Paper")
            .with_property(Property::text("text"))
            .with_property(Property::text("title"))
    }

    #[test]
    fn test_validate_known_text_properties() {
        let object = DataObject::new(vec![0.0])
            .with_property("text", "abstract title")
            .with_property("title", "title");
        assert!(paper_schema().validate_properties(&object.properties).is_ok());
    }

    #[test]
    fn test_validate_rejects_unknown_property() {
        let object = DataObject::new(vec![0.0]).with_property("author", "someone");
        assert!(paper_schema().validate_properties(&object.properties).is_err());
    }

    #[test]
    fn test_validate_rejects_non_text_value() {
        let mut properties = Map::new();
        properties.insert("title".to_string(), serde_json::json!(42));
        assert!(paper_schema().validate_properties(&properties).is_err());
    }

    #[test]
    fn test_compatibility_ignores_unset_dimension() {
        let declared = paper_schema().with_dimension(384);
        assert!(paper_schema().is_compatible_with(&declared));
        assert!(!declared.is_compatible_with(&paper_schema().with_dimension(768)));
        assert!(!paper_schema().is_compatible_with(&paper_schema().with_metric(DistanceMetric::Dot)));
    }

    #[test]
    fn test_compatibility_checks_model() {
        let mini = paper_schema().with_model("all-MiniLM-L6-v2");
        assert!(paper_schema().is_compatible_with(&mini));
        assert!(mini.is_compatible_with(&paper_schema().with_model("all-MiniLM-L6-v2")));
        assert!(!mini.is_compatible_with(&paper_schema().with_model("mock")));
    }

    #[test]
    fn test_near_vector_builder() {
        let query = NearVector::new(vec![1.0]).with_limit(3).with_max_distance(0.5);
        assert_eq!(query.limit, 3);
        assert_eq!(query.max_distance, Some(0.5));
        assert_eq!(NearVector::new(vec![]).limit, NearVector::DEFAULT_LIMIT);
    }
}
