// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! LRU cache of loaded model handles
//!
//! Wraps any [`ModelLoader`]. Entries are keyed by kind and artifact path and
//! hold shared, immutable handles. A capacity of 0 disables caching so every
//! request loads fresh.

use std::num::NonZeroUsize;
use std::sync::Arc;

use async_trait::async_trait;
use lru::LruCache;
use tokio::sync::Mutex;
use tracing::debug;

use super::backend::{BackendError, ModelLoader, RecognitionModel, SegmentationModel};
use crate::config::ModelKind;

type CacheKey = (ModelKind, String);

#[derive(Clone)]
enum CachedModel {
    Segmentation(Arc<dyn SegmentationModel>),
    Recognition(Arc<dyn RecognitionModel>),
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ModelCacheStats {
    pub hits: u64,
    pub misses: u64,
    pub entries: usize,
}

struct CacheState {
    entries: LruCache<CacheKey, CachedModel>,
    hits: u64,
    misses: u64,
}

pub struct CachingLoader<L> {
    inner: L,
    state: Option<Mutex<CacheState>>,
}

impl<L: ModelLoader> CachingLoader<L> {
    pub fn new(inner: L, capacity: usize) -> Self {
        let state = NonZeroUsize::new(capacity).map(|cap| {
            Mutex::new(CacheState {
                entries: LruCache::new(cap),
                hits: 0,
                misses: 0,
            })
        });
        Self { inner, state }
    }

    pub async fn stats(&self) -> ModelCacheStats {
        match &self.state {
            Some(state) => {
                let state = state.lock().await;
                ModelCacheStats {
                    hits: state.hits,
                    misses: state.misses,
                    entries: state.entries.len(),
                }
            }
            None => ModelCacheStats::default(),
        }
    }

    async fn lookup(&self, key: &CacheKey) -> Option<CachedModel> {
        let state = self.state.as_ref()?;
        let mut state = state.lock().await;
        match state.entries.get(key).cloned() {
            Some(model) => {
                state.hits += 1;
                debug!("Model cache hit: {} {}", key.0, key.1);
                Some(model)
            }
            None => {
                state.misses += 1;
                None
            }
        }
    }

    async fn store(&self, key: CacheKey, model: CachedModel) {
        if let Some(state) = &self.state {
            let mut state = state.lock().await;
            if let Some((evicted, _)) = state.entries.push(key, model) {
                debug!("Model cache evicted: {} {}", evicted.0, evicted.1);
            }
        }
    }
}

#[async_trait]
impl<L: ModelLoader> ModelLoader for CachingLoader<L> {
    async fn load_segmentation_model(
        &self,
        path: &str,
    ) -> Result<Arc<dyn SegmentationModel>, BackendError> {
        let key = (ModelKind::Segmentation, path.to_string());
        if let Some(CachedModel::Segmentation(model)) = self.lookup(&key).await {
            return Ok(model);
        }

        let model = self.inner.load_segmentation_model(path).await?;
        self.store(key, CachedModel::Segmentation(Arc::clone(&model)))
            .await;
        Ok(model)
    }

    async fn load_recognition_model(
        &self,
        path: &str,
    ) -> Result<Arc<dyn RecognitionModel>, BackendError> {
        let key = (ModelKind::Recognition, path.to_string());
        if let Some(CachedModel::Recognition(model)) = self.lookup(&key).await {
            return Ok(model);
        }

        let model = self.inner.load_recognition_model(path).await?;
        self.store(key, CachedModel::Recognition(Arc::clone(&model)))
            .await;
        Ok(model)
    }
}
