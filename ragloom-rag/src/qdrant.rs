//! Qdrant vector store backend.
//!
//! Provides [`QdrantVectorStore`] which implements [`VectorStore`] using
//! the [qdrant-client](https://docs.rs/qdrant-client) crate over gRPC.
//!
//! # Example
//!
//! ```rust,ignore
//! use ragloom_rag::qdrant::QdrantVectorStore;
//!
//! let store = QdrantVectorStore::new("http://localhost:6334", Duration::from_secs(60))?;
//! store.ensure_collection("docs", 1024).await?;
//! let hits = store.query("docs", &query_vector, 5).await?;
//! ```

use std::time::Duration;

use async_trait::async_trait;
use qdrant_client::qdrant::point_id::PointIdOptions;
use qdrant_client::qdrant::value::Kind;
use qdrant_client::qdrant::vectors_config::Config as VectorsConfigKind;
use qdrant_client::qdrant::{
    CreateCollectionBuilder, DeletePointsBuilder, Distance, PointId, PointStruct, PointsIdsList,
    SearchPointsBuilder, UpsertPointsBuilder, Value as QdrantValue, VectorParamsBuilder,
};
use qdrant_client::{Payload, Qdrant};
use serde_json::Value;
use tracing::{debug, error};

use crate::document::{Metadata, ScoredPoint, StoredPoint};
use crate::error::{RagError, Result};
use crate::vectorstore::VectorStore;

const BACKEND: &str = "qdrant";

/// A [`VectorStore`] backed by [Qdrant](https://qdrant.tech/).
///
/// Collections use cosine distance. Point payloads are stored as-is, so
/// the chunk text lives under the `content` key.
pub struct QdrantVectorStore {
    client: Qdrant,
}

impl QdrantVectorStore {
    /// Connect to the given URL with a per-call timeout.
    pub fn new(url: &str, timeout: Duration) -> Result<Self> {
        let client = Qdrant::from_url(url).timeout(timeout).build().map_err(map_err)?;
        Ok(Self { client })
    }

    /// Wrap an existing client.
    pub fn from_client(client: Qdrant) -> Self {
        Self { client }
    }

    async fn collection_dimensions(&self, name: &str) -> Result<Option<u64>> {
        let info = self.client.collection_info(name).await.map_err(map_err)?;
        let config = info
            .result
            .and_then(|r| r.config)
            .and_then(|c| c.params)
            .and_then(|p| p.vectors_config)
            .and_then(|v| v.config);
        Ok(match config {
            Some(VectorsConfigKind::Params(params)) => Some(params.size),
            _ => None,
        })
    }
}

fn map_err(e: qdrant_client::QdrantError) -> RagError {
    error!(backend = BACKEND, error = %e, "qdrant call failed");
    RagError::store(BACKEND, e.to_string())
}

fn point_id_to_string(id: Option<PointId>) -> String {
    match id.and_then(|pid| pid.point_id_options) {
        Some(PointIdOptions::Uuid(s)) => s,
        Some(PointIdOptions::Num(n)) => n.to_string(),
        None => String::new(),
    }
}

fn to_json(value: QdrantValue) -> Value {
    match value.kind {
        Some(Kind::BoolValue(b)) => Value::Bool(b),
        Some(Kind::IntegerValue(i)) => Value::from(i),
        Some(Kind::DoubleValue(d)) => Value::from(d),
        Some(Kind::StringValue(s)) => Value::String(s),
        Some(Kind::ListValue(list)) => Value::Array(list.values.into_iter().map(to_json).collect()),
        Some(Kind::StructValue(s)) => {
            Value::Object(s.fields.into_iter().map(|(k, v)| (k, to_json(v))).collect())
        }
        Some(Kind::NullValue(_)) | None => Value::Null,
    }
}

#[async_trait]
impl VectorStore for QdrantVectorStore {
    fn name(&self) -> &str {
        BACKEND
    }

    async fn ensure_collection(&self, name: &str, dimensions: usize) -> Result<()> {
        if self.client.collection_exists(name).await.map_err(map_err)? {
            return match self.collection_dimensions(name).await? {
                Some(size) if size != dimensions as u64 => Err(RagError::Config(format!(
                    "collection '{name}' has dimension {size}, expected {dimensions}"
                ))),
                _ => {
                    debug!(collection = name, "qdrant collection already exists");
                    Ok(())
                }
            };
        }

        self.client
            .create_collection(
                CreateCollectionBuilder::new(name)
                    .vectors_config(VectorParamsBuilder::new(dimensions as u64, Distance::Cosine)),
            )
            .await
            .map_err(map_err)?;

        debug!(collection = name, dimensions, "created qdrant collection");
        Ok(())
    }

    async fn upsert(&self, collection: &str, points: &[StoredPoint]) -> Result<Vec<String>> {
        if points.is_empty() {
            return Ok(Vec::new());
        }
        if let Some(dimensions) = self.collection_dimensions(collection).await? {
            if let Some(bad) = points.iter().find(|p| p.vector.len() as u64 != dimensions) {
                return Err(RagError::store(
                    BACKEND,
                    format!("dimension mismatch: expected {dimensions}, got {}", bad.vector.len()),
                ));
            }
        }

        let structs = points
            .iter()
            .map(|point| {
                let payload = Payload::try_from(Value::Object(point.payload.clone()))
                    .map_err(map_err)?;
                Ok(PointStruct::new(point.id.clone(), point.vector.clone(), payload))
            })
            .collect::<Result<Vec<_>>>()?;

        self.client
            .upsert_points(UpsertPointsBuilder::new(collection, structs).wait(true))
            .await
            .map_err(map_err)?;

        debug!(collection, count = points.len(), "upserted points to qdrant");
        Ok(points.iter().map(|p| p.id.clone()).collect())
    }

    async fn query(
        &self,
        collection: &str,
        vector: &[f32],
        top_k: usize,
    ) -> Result<Vec<ScoredPoint>> {
        if !self.client.collection_exists(collection).await.map_err(map_err)? {
            return Err(RagError::store(BACKEND, format!("collection not found: '{collection}'")));
        }

        let response = self
            .client
            .search_points(
                SearchPointsBuilder::new(collection, vector.to_vec(), top_k as u64)
                    .with_payload(true),
            )
            .await
            .map_err(map_err)?;

        let hits = response
            .result
            .into_iter()
            .map(|scored| {
                let payload: Metadata =
                    scored.payload.into_iter().map(|(k, v)| (k, to_json(v))).collect();
                ScoredPoint { id: point_id_to_string(scored.id), payload, score: scored.score }
            })
            .collect();
        Ok(hits)
    }

    async fn delete(&self, collection: &str, ids: &[String]) -> Result<()> {
        if ids.is_empty() {
            return Ok(());
        }

        let point_ids: Vec<PointId> = ids.iter().map(|id| id.clone().into()).collect();
        self.client
            .delete_points(
                DeletePointsBuilder::new(collection)
                    .points(PointsIdsList { ids: point_ids })
                    .wait(true),
            )
            .await
            .map_err(map_err)?;

        debug!(collection, count = ids.len(), "deleted points from qdrant");
        Ok(())
    }

    async fn delete_collection(&self, name: &str) -> Result<()> {
        self.client.delete_collection(name).await.map_err(map_err)?;
        debug!(collection = name, "deleted qdrant collection");
        Ok(())
    }
}
