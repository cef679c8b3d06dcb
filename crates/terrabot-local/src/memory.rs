use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::path::Path;
use terrabot_core::{Document, DocumentStore, Error, Result};
use tokio::sync::RwLock;

/// Process-local document store, optionally seeded from a JSON file.
///
/// Seed format: `{"<collection>": [{"id": "...", "<field>": ...}, ...], ...}`. Writes are not
/// persisted back to the file.
#[derive(Debug, Default)]
pub struct MemoryStore {
    collections: RwLock<BTreeMap<String, Vec<Document>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_collections(collections: BTreeMap<String, Vec<Document>>) -> Self {
        Self {
            collections: RwLock::new(collections),
        }
    }

    pub async fn from_json_file(path: &Path) -> Result<Self> {
        let raw = tokio::fs::read_to_string(path)
            .await
            .map_err(|e| Error::Store(format!("{}: {e}", path.display())))?;
        let seed: Map<String, Value> = serde_json::from_str(&raw)
            .map_err(|e| Error::Store(format!("{}: {e}", path.display())))?;
        let mut collections = BTreeMap::new();
        for (name, docs) in seed {
            let Value::Array(items) = docs else {
                return Err(Error::Store(format!("collection {name} is not an array")));
            };
            let docs = items
                .into_iter()
                .enumerate()
                .map(|(i, item)| seed_document(&name, i, item))
                .collect::<Result<Vec<_>>>()?;
            collections.insert(name, docs);
        }
        Ok(Self::from_collections(collections))
    }

    pub async fn insert(&self, collection: &str, doc: Document) {
        let mut cols = self.collections.write().await;
        let docs = cols.entry(collection.to_string()).or_default();
        match docs.iter_mut().find(|d| d.id == doc.id) {
            Some(existing) => *existing = doc,
            None => docs.push(doc),
        }
    }
}

fn seed_document(collection: &str, index: usize, item: Value) -> Result<Document> {
    let Value::Object(mut fields) = item else {
        return Err(Error::Store(format!("{collection}[{index}] is not an object")));
    };
    let id = match fields.remove("id") {
        Some(Value::String(s)) if !s.trim().is_empty() => s,
        _ => return Err(Error::Store(format!("{collection}[{index}] has no string id"))),
    };
    Ok(Document { id, fields })
}

#[async_trait::async_trait]
impl DocumentStore for MemoryStore {
    async fn list(&self, collection: &str) -> Result<Vec<Document>> {
        Ok(self
            .collections
            .read()
            .await
            .get(collection)
            .cloned()
            .unwrap_or_default())
    }

    async fn set_field(&self, collection: &str, id: &str, field: &str, value: Value) -> Result<()> {
        let mut cols = self.collections.write().await;
        let doc = cols
            .get_mut(collection)
            .and_then(|docs| docs.iter_mut().find(|d| d.id == id))
            .ok_or_else(|| Error::NotFound(format!("{collection}/{id}")))?;
        doc.fields.insert(field.to_string(), value);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn seeds_from_a_json_file() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("seed.json");
        std::fs::write(
            &path,
            json!({
                "knowledge_guides": [
                    {"id": "g1", "title": "Land title transfer", "steps": [{"description": "Notarize"}]}
                ],
                "pdfs": [{"id": "p1", "url": "https://example.org/guide.pdf"}]
            })
            .to_string(),
        )
        .unwrap();

        let store = MemoryStore::from_json_file(&path).await.unwrap();
        let guides = store.list("knowledge_guides").await.unwrap();
        assert_eq!(guides.len(), 1);
        assert_eq!(guides[0].id, "g1");
        assert_eq!(guides[0].str_field("title"), Some("Land title transfer"));
        assert!(!guides[0].fields.contains_key("id"));
        assert_eq!(store.list("pdfs").await.unwrap()[0].str_field("url"), Some("https://example.org/guide.pdf"));
        assert!(store.list("nothing").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn rejects_documents_without_ids() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("seed.json");
        std::fs::write(&path, r#"{"pdfs": [{"url": "x"}]}"#).unwrap();
        assert!(matches!(
            MemoryStore::from_json_file(&path).await,
            Err(Error::Store(m)) if m.contains("pdfs[0]")
        ));
    }

    #[tokio::test]
    async fn set_field_updates_in_place() {
        let store = MemoryStore::new();
        store.insert("knowledge_guides", Document::new("g1")).await;
        store
            .set_field("knowledge_guides", "g1", "translated_text", json!("Bayri"))
            .await
            .unwrap();
        let docs = store.list("knowledge_guides").await.unwrap();
        assert_eq!(docs[0].str_field("translated_text"), Some("Bayri"));
        assert!(matches!(
            store.set_field("knowledge_guides", "g9", "x", json!(1)).await,
            Err(Error::NotFound(_))
        ));
    }
}
