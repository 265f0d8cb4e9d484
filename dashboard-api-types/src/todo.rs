use serde::{Deserialize, Serialize};
use std::fmt::Display;

/// Server assigned identifier of a to-do item. The server hands these out as strings.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(transparent)]
pub struct ItemId(pub String);

impl Display for ItemId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for ItemId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

/// One row of a to-do widget, as returned by `GET /api/widgets/{widget}/items`
/// and sent back in full on `PUT`.
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq, Eq)]
pub struct TodoItem {
    /// `None` until the server has accepted the item.
    #[serde(default, deserialize_with = "empty_id_as_none")]
    pub id: Option<ItemId>,
    #[serde(default)]
    pub text: String,
    #[serde(default)]
    pub checked: bool,
    #[serde(default)]
    pub order: i32,
}

/// Body of `POST /api/widgets/{widget}/items`.
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq, Eq)]
pub struct NewTodoItem {
    pub text: String,
    pub checked: bool,
}

/// Response of `POST /api/widgets/{widget}/reorder`.
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq, Eq)]
pub struct ReorderAck {
    #[serde(default)]
    pub status: String,
}

impl ReorderAck {
    pub fn success() -> Self {
        Self {
            status: "success".to_string(),
        }
    }
}

fn empty_id_as_none<'de, D>(deserializer: D) -> Result<Option<ItemId>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let id: Option<String> = Option::deserialize(deserializer)?;
    Ok(id.filter(|id| !id.is_empty()).map(ItemId))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn item_from_server_json() {
        let item: TodoItem =
            serde_json::from_str(r#"{"id":"12","text":"milk","checked":true,"order":3}"#)
                .unwrap();
        assert_eq!(item.id, Some(ItemId::from("12")));
        assert_eq!(item.text, "milk");
        assert!(item.checked);
        assert_eq!(item.order, 3);
    }

    #[test]
    fn missing_or_empty_id_is_none() {
        let item: TodoItem = serde_json::from_str(r#"{"text":"eggs"}"#).unwrap();
        assert_eq!(item.id, None);
        assert!(!item.checked);

        let item: TodoItem = serde_json::from_str(r#"{"id":"","text":"eggs"}"#).unwrap();
        assert_eq!(item.id, None);

        let item: TodoItem = serde_json::from_str(r#"{"id":null,"text":"eggs"}"#).unwrap();
        assert_eq!(item.id, None);
    }

    #[test]
    fn reorder_body_is_a_plain_id_array() {
        let ids = vec![ItemId::from("3"), ItemId::from("1")];
        assert_eq!(serde_json::to_string(&ids).unwrap(), r#"["3","1"]"#);
    }
}
