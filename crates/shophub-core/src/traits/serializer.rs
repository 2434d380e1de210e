//! Pluggable payload serialization for the query cache

use crate::ShopError;
use serde::{Serialize, de::DeserializeOwned};

/// Encodes query payloads into the bytes held by cache entries
pub trait Serializer: Send + Sync + Clone + 'static {
    /// Name of the serializer (for debugging/metrics)
    fn name(&self) -> &str;

    fn serialize<T: Serialize>(&self, value: &T) -> Result<Vec<u8>, ShopError>;

    fn deserialize<T: DeserializeOwned>(&self, bytes: &[u8]) -> Result<T, ShopError>;
}

/// JSON serializer (default)
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonSerializer;

impl Serializer for JsonSerializer {
    fn name(&self) -> &str {
        "json"
    }

    fn serialize<T: Serialize>(&self, value: &T) -> Result<Vec<u8>, ShopError> {
        serde_json::to_vec(value).map_err(|e| ShopError::Serialization(e.to_string()))
    }

    fn deserialize<T: DeserializeOwned>(&self, bytes: &[u8]) -> Result<T, ShopError> {
        serde_json::from_slice(bytes).map_err(|e| ShopError::Deserialization(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Page, Product, Rating};

    #[test]
    fn test_page_of_products() {
        let serializer = JsonSerializer;
        let page = Page {
            items: vec![Product {
                id: 5,
                title: "Yoga Mat".into(),
                price: 39.99,
                description: "Eco-friendly".into(),
                category: "fitness".into(),
                image: String::new(),
                rating: Rating { rate: 4.6, count: 78 },
            }],
            next_page: Some(1),
        };

        let bytes = serializer.serialize(&page).unwrap();
        let decoded: Page<Product> = serializer.deserialize(&bytes).unwrap();
        assert_eq!(decoded, page);
    }

    #[test]
    fn test_wrong_shape_is_deserialization_error() {
        let bytes = JsonSerializer.serialize(&"text").unwrap();
        let err = JsonSerializer.deserialize::<Page<u32>>(&bytes).unwrap_err();
        assert!(matches!(err, ShopError::Deserialization(_)));
        assert_eq!(JsonSerializer.name(), "json");
    }
}
