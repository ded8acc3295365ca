use crate::database::qdrant_config::create_qdrant_client;
use qdrant_client::{
    qdrant::{
        point_id::PointIdOptions, with_payload_selector::SelectorOptions, CreateCollection,
        DeletePoints, Distance, PointId, PointStruct, PointsSelector, SearchPoints, UpsertPoints,
        Value, VectorParams, VectorsConfig, WithPayloadSelector,
    },
    Qdrant,
};
use std::collections::HashMap;
use std::sync::Arc;
use thiserror::Error;
use uuid::Uuid;

#[derive(Error, Debug)]
pub enum VectorDbError {
    #[error("Connection error: {0}")]
    Connection(String),
    #[error("Operation failed: {0}")]
    Operation(String),
}

/// A scored search hit: point id, similarity score and JSON payload.
pub type SearchHit = (String, f32, HashMap<String, serde_json::Value>);

#[derive(Clone)]
pub struct VectorDb {
    client: Arc<Qdrant>,
}

impl VectorDb {
    pub async fn new(url: &str) -> Result<Self, VectorDbError> {
        let client = create_qdrant_client(url)
            .await
            .map_err(|e| VectorDbError::Connection(e.to_string()))?;
        Ok(Self {
            client: Arc::new(client),
        })
    }

    pub async fn create_collection(&self, name: &str, vector_size: u64) -> Result<(), VectorDbError> {
        let vectors_config = VectorParams {
            size: vector_size,
            distance: Distance::Cosine.into(),
            ..Default::default()
        };

        let vectors_config = VectorsConfig {
            config: Some(qdrant_client::qdrant::vectors_config::Config::Params(
                vectors_config,
            )),
        };

        let create_collection = CreateCollection {
            collection_name: name.to_string(),
            vectors_config: Some(vectors_config),
            ..Default::default()
        };

        match self.client.create_collection(create_collection).await {
            Ok(_) => Ok(()),
            Err(e) if e.to_string().contains("AlreadyExists") => {
                log::info!("Collection {} already exists, skipping creation", name);
                Ok(())
            }
            Err(e) => Err(VectorDbError::Operation(e.to_string())),
        }
    }

    pub async fn store_vector(
        &self,
        collection: &str,
        vector: Vec<f32>,
        payload: HashMap<String, serde_json::Value>,
    ) -> Result<String, VectorDbError> {
        let ids = self.store_vectors(collection, vec![(vector, payload)]).await?;
        Ok(ids.into_iter().next().unwrap_or_default())
    }

    /// Upsert a batch of points in one request. Returns the generated ids in
    /// input order.
    pub async fn store_vectors(
        &self,
        collection: &str,
        entries: Vec<(Vec<f32>, HashMap<String, serde_json::Value>)>,
    ) -> Result<Vec<String>, VectorDbError> {
        let mut ids = Vec::with_capacity(entries.len());
        let mut points = Vec::with_capacity(entries.len());

        for (vector, payload) in entries {
            let point_id = Uuid::new_v4().to_string();
            ids.push(point_id.clone());

            let payload: HashMap<String, Value> = payload
                .into_iter()
                .map(|(k, v)| (k, Value::from(v)))
                .collect();

            points.push(PointStruct {
                id: Some(PointId {
                    point_id_options: Some(PointIdOptions::Uuid(point_id)),
                }),
                vectors: Some(vector.into()),
                payload,
            });
        }

        let upsert_points = UpsertPoints {
            collection_name: collection.to_string(),
            points,
            ..Default::default()
        };

        self.client
            .upsert_points(upsert_points)
            .await
            .map_err(|e| VectorDbError::Operation(e.to_string()))?;

        Ok(ids)
    }

    pub async fn search_vectors(
        &self,
        collection: &str,
        query_vector: Vec<f32>,
        limit: u64,
    ) -> Result<Vec<SearchHit>, VectorDbError> {
        let request = SearchPoints {
            collection_name: collection.to_string(),
            vector: query_vector,
            limit,
            with_payload: Some(WithPayloadSelector {
                selector_options: Some(SelectorOptions::Enable(true)),
            }),
            ..Default::default()
        };

        let results = self
            .client
            .search_points(request)
            .await
            .map_err(|e| VectorDbError::Operation(e.to_string()))?;

        let points = results
            .result
            .into_iter()
            .map(|point| {
                let id = match point.id.and_then(|id| id.point_id_options) {
                    Some(PointIdOptions::Uuid(uuid)) => uuid,
                    _ => String::new(),
                };
                let score = point.score;
                let payload = point
                    .payload
                    .into_iter()
                    .map(|(k, v)| {
                        (
                            k,
                            serde_json::Value::try_from(v).unwrap_or(serde_json::Value::Null),
                        )
                    })
                    .collect();
                (id, score, payload)
            })
            .collect();

        Ok(points)
    }

    pub async fn delete_vectors(
        &self,
        collection: &str,
        ids: Vec<String>,
    ) -> Result<(), VectorDbError> {
        let points = ids
            .into_iter()
            .map(|id| PointId {
                point_id_options: Some(PointIdOptions::Uuid(id)),
            })
            .collect::<Vec<_>>();

        let points_selector = PointsSelector {
            points_selector_one_of: Some(points.into()),
            ..Default::default()
        };

        let delete_points = DeletePoints {
            collection_name: collection.to_string(),
            points: Some(points_selector),
            ..Default::default()
        };

        self.client
            .delete_points(delete_points)
            .await
            .map_err(|e| VectorDbError::Operation(e.to_string()))?;

        Ok(())
    }
}
