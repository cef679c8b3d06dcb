//! Firestore over its REST API.
//!
//! Documents come back as typed values (`{"stringValue": ..}`, `{"mapValue": {"fields": ..}}`);
//! they are decoded into plain JSON before reaching the core.

use serde::Deserialize;
use serde_json::{Map, Value};
use terrabot_core::{Document, DocumentStore, Error, Result};

pub const DEFAULT_BASE_URL: &str = "https://firestore.googleapis.com";
const PAGE_SIZE: &str = "300";

#[derive(Debug, Clone)]
pub struct FirestoreStore {
    client: reqwest::Client,
    base_url: String,
    project: String,
    token: Option<String>,
}

impl FirestoreStore {
    pub fn new(client: reqwest::Client, project: &str, token: Option<String>) -> Self {
        Self {
            client,
            base_url: DEFAULT_BASE_URL.to_string(),
            project: project.to_string(),
            token: token.filter(|t| !t.trim().is_empty()),
        }
    }

    /// Point at an emulator or proxy instead of the public endpoint.
    pub fn with_base_url(mut self, base_url: &str) -> Self {
        self.base_url = base_url.trim_end_matches('/').to_string();
        self
    }

    fn collection_url(&self, collection: &str) -> Result<url::Url> {
        url::Url::parse(&format!(
            "{}/v1/projects/{}/databases/(default)/documents/{}",
            self.base_url, self.project, collection
        ))
        .map_err(|e| Error::Store(e.to_string()))
    }

    fn authorize(&self, rb: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.token {
            Some(t) => rb.bearer_auth(t),
            None => rb,
        }
    }
}

#[async_trait::async_trait]
impl DocumentStore for FirestoreStore {
    async fn list(&self, collection: &str) -> Result<Vec<Document>> {
        let mut out = Vec::new();
        let mut page_token: Option<String> = None;
        loop {
            let mut url = self.collection_url(collection)?;
            {
                let mut q = url.query_pairs_mut();
                q.append_pair("pageSize", PAGE_SIZE);
                if let Some(t) = &page_token {
                    q.append_pair("pageToken", t);
                }
            }
            let resp = self
                .authorize(self.client.get(url))
                .send()
                .await
                .map_err(|e| Error::Store(e.to_string()))?;
            let status = resp.status();
            if !status.is_success() {
                return Err(Error::Store(format!("firestore list {collection}: HTTP {status}")));
            }
            let page: ListResponse = resp.json().await.map_err(|e| Error::Store(e.to_string()))?;
            out.extend(page.documents.into_iter().map(RawDocument::into_document));
            match page.next_page_token.filter(|t| !t.is_empty()) {
                Some(t) => page_token = Some(t),
                None => break,
            }
        }
        tracing::debug!(collection, count = out.len(), "firestore list");
        Ok(out)
    }

    async fn set_field(&self, collection: &str, id: &str, field: &str, value: Value) -> Result<()> {
        let mut url = self.collection_url(collection)?;
        url.path_segments_mut()
            .map_err(|_| Error::Store("firestore base url cannot hold a path".to_string()))?
            .push(id);
        url.query_pairs_mut()
            .append_pair("updateMask.fieldPaths", field);
        let mut fields = Map::new();
        fields.insert(field.to_string(), encode_value(&value));
        let body = serde_json::json!({ "fields": fields });

        let resp = self
            .authorize(self.client.patch(url))
            .json(&body)
            .send()
            .await
            .map_err(|e| Error::Store(e.to_string()))?;
        let status = resp.status();
        if status == reqwest::StatusCode::NOT_FOUND {
            return Err(Error::NotFound(format!("{collection}/{id}")));
        }
        if !status.is_success() {
            return Err(Error::Store(format!("firestore patch {collection}/{id}: HTTP {status}")));
        }
        Ok(())
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ListResponse {
    #[serde(default)]
    documents: Vec<RawDocument>,
    #[serde(default)]
    next_page_token: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RawDocument {
    name: String,
    #[serde(default)]
    fields: Map<String, Value>,
}

impl RawDocument {
    fn into_document(self) -> Document {
        let id = self
            .name
            .rsplit('/')
            .next()
            .unwrap_or(self.name.as_str())
            .to_string();
        let fields = self
            .fields
            .iter()
            .map(|(k, v)| (k.clone(), decode_value(v)))
            .collect();
        Document { id, fields }
    }
}

/// Typed Firestore value to plain JSON. Unknown shapes become `null`.
pub fn decode_value(v: &Value) -> Value {
    let Some(obj) = v.as_object() else {
        return Value::Null;
    };
    let Some((kind, inner)) = obj.iter().next() else {
        return Value::Null;
    };
    match kind.as_str() {
        "stringValue" | "timestampValue" | "referenceValue" | "bytesValue" => inner.clone(),
        "booleanValue" => inner.clone(),
        // 64-bit integers travel as strings.
        "integerValue" => inner
            .as_str()
            .and_then(|s| s.parse::<i64>().ok())
            .map(Value::from)
            .unwrap_or_else(|| inner.clone()),
        "doubleValue" => inner.clone(),
        "nullValue" => Value::Null,
        "geoPointValue" => inner.clone(),
        "mapValue" => {
            let fields = inner
                .get("fields")
                .and_then(Value::as_object)
                .map(|m| m.iter().map(|(k, v)| (k.clone(), decode_value(v))).collect())
                .unwrap_or_default();
            Value::Object(fields)
        }
        "arrayValue" => Value::Array(
            inner
                .get("values")
                .and_then(Value::as_array)
                .map(|vs| vs.iter().map(decode_value).collect())
                .unwrap_or_default(),
        ),
        _ => Value::Null,
    }
}

pub fn encode_value(v: &Value) -> Value {
    use serde_json::json;
    match v {
        Value::Null => json!({ "nullValue": null }),
        Value::Bool(b) => json!({ "booleanValue": b }),
        Value::Number(n) => match n.as_i64() {
            Some(i) => json!({ "integerValue": i.to_string() }),
            None => json!({ "doubleValue": n.as_f64() }),
        },
        Value::String(s) => json!({ "stringValue": s }),
        Value::Array(items) => {
            json!({ "arrayValue": { "values": items.iter().map(encode_value).collect::<Vec<_>>() } })
        }
        Value::Object(m) => {
            let fields: Map<String, Value> =
                m.iter().map(|(k, v)| (k.clone(), encode_value(v))).collect();
            json!({ "mapValue": { "fields": fields } })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixture::serve;
    use axum::extract::{Path, Query, State};
    use axum::http::{HeaderMap, StatusCode};
    use axum::routing::{get, patch};
    use axum::{Json, Router};
    use serde_json::json;
    use std::collections::HashMap;
    use std::sync::{Arc, Mutex};

    const COLLECTION_PATH: &str = "/v1/projects/demo/databases/(default)/documents/knowledge_guides";

    #[test]
    fn decodes_nested_typed_values() {
        let v = json!({"mapValue": {"fields": {
            "title": {"stringValue": "Deed of Sale"},
            "order": {"integerValue": "3"},
            "steps": {"arrayValue": {"values": [
                {"mapValue": {"fields": {"description": {"stringValue": "Notarize"}}}}
            ]}},
            "gone": {"nullValue": null}
        }}});
        assert_eq!(
            decode_value(&v),
            json!({"title": "Deed of Sale", "order": 3, "steps": [{"description": "Notarize"}], "gone": null})
        );
    }

    #[test]
    fn encode_then_decode_keeps_plain_json() {
        let plain = json!({"translated_text": "Bayri ang buhis", "n": 2, "ok": true, "xs": [1.5]});
        assert_eq!(decode_value(&encode_value(&plain)), plain);
    }

    #[derive(Clone, Default)]
    struct Recorder {
        auth: Arc<Mutex<Vec<String>>>,
        patches: Arc<Mutex<Vec<(String, String, Value)>>>,
    }

    async fn list_page(
        State(rec): State<Recorder>,
        headers: HeaderMap,
        Query(q): Query<HashMap<String, String>>,
    ) -> Json<Value> {
        if let Some(a) = headers.get("authorization").and_then(|v| v.to_str().ok()) {
            rec.auth.lock().unwrap().push(a.to_string());
        }
        match q.get("pageToken").map(String::as_str) {
            None => Json(json!({
                "documents": [{
                    "name": "projects/demo/databases/(default)/documents/knowledge_guides/g1",
                    "fields": {"title": {"stringValue": "Land title transfer"}}
                }],
                "nextPageToken": "p2"
            })),
            Some(_) => Json(json!({
                "documents": [{
                    "name": "projects/demo/databases/(default)/documents/knowledge_guides/g2",
                    "fields": {"body": {"stringValue": "Pay the estate tax."}}
                }]
            })),
        }
    }

    async fn patch_doc(
        State(rec): State<Recorder>,
        Path(id): Path<String>,
        Query(q): Query<HashMap<String, String>>,
        Json(body): Json<Value>,
    ) -> StatusCode {
        if id == "missing" {
            return StatusCode::NOT_FOUND;
        }
        let mask = q.get("updateMask.fieldPaths").cloned().unwrap_or_default();
        rec.patches.lock().unwrap().push((id, mask, body));
        StatusCode::OK
    }

    async fn fixture() -> (FirestoreStore, Recorder) {
        let rec = Recorder::default();
        let app = Router::new()
            .route(COLLECTION_PATH, get(list_page))
            .route(&format!("{COLLECTION_PATH}/:id"), patch(patch_doc))
            .with_state(rec.clone());
        let addr = serve(app).await;
        let store = FirestoreStore::new(reqwest::Client::new(), "demo", Some("tok".into()))
            .with_base_url(&format!("http://{addr}"));
        (store, rec)
    }

    #[tokio::test]
    async fn list_follows_page_tokens() {
        let (store, rec) = fixture().await;
        let docs = store.list("knowledge_guides").await.unwrap();
        let ids: Vec<_> = docs.iter().map(|d| d.id.as_str()).collect();
        assert_eq!(ids, vec!["g1", "g2"]);
        assert_eq!(docs[0].str_field("title"), Some("Land title transfer"));
        assert_eq!(docs[1].str_field("body"), Some("Pay the estate tax."));
        assert_eq!(rec.auth.lock().unwrap().as_slice(), ["Bearer tok", "Bearer tok"]);
    }

    #[tokio::test]
    async fn set_field_patches_with_an_update_mask() {
        let (store, rec) = fixture().await;
        store
            .set_field("knowledge_guides", "g1", "translated_text", json!("Bayri ang buhis"))
            .await
            .unwrap();
        let patches = rec.patches.lock().unwrap();
        assert_eq!(patches.len(), 1);
        let (id, mask, body) = &patches[0];
        assert_eq!(id, "g1");
        assert_eq!(mask, "translated_text");
        assert_eq!(
            body,
            &json!({"fields": {"translated_text": {"stringValue": "Bayri ang buhis"}}})
        );
    }

    #[tokio::test]
    async fn missing_document_is_not_found() {
        let (store, _rec) = fixture().await;
        let err = store
            .set_field("knowledge_guides", "missing", "translated_text", json!("x"))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::NotFound(_)));
        assert!(matches!(store.list("other").await, Err(Error::Store(_))));
    }
}
