//! Base de conocimiento persistida como artifact versionado.
//!
//! El ledger completo (`session_state`, `learned_insights`,
//! `performance_metrics`) se reescribe como una nueva versión en cada
//! mutación. Si el guardado falla, la mutación en memoria se deshace.

use std::sync::{Mutex, MutexGuard};

use chrono::{Duration, Utc};
use listflow_core::model::{ArtifactData, Insight, SavedArtifact};
use listflow_core::services::{InsightSink, ServiceError};
use log::info;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::PersistenceError;
use crate::fs::VersionedArtifactStore;

pub const DEFAULT_KNOWLEDGE_PATH: &str = "knowledge/knowledge_base.json";
pub const DEFAULT_TTL_DAYS: i64 = 30;
const ACTOR: &str = "knowledge_store";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct KnowledgeLedger {
    #[serde(default)]
    pub session_state: Map<String, Value>,
    #[serde(default)]
    pub learned_insights: Vec<Insight>,
    #[serde(default)]
    pub performance_metrics: Vec<Value>,
}

#[derive(Debug)]
pub struct KnowledgeStore {
    store: VersionedArtifactStore,
    logical_path: String,
    ttl: Duration,
    ledger: KnowledgeLedger,
}

impl KnowledgeStore {
    /// Carga la última versión del ledger o, si no hay ninguna, persiste uno
    /// vacío como versión 1.
    pub fn open(store: VersionedArtifactStore, logical_path: &str, ttl_days: i64) -> Result<Self, PersistenceError> {
        let ttl = Duration::try_days(ttl_days).ok_or(PersistenceError::InvalidTtl(ttl_days))?;
        let mut ks = Self { store,
                            logical_path: logical_path.to_string(),
                            ttl,
                            ledger: KnowledgeLedger::default() };
        match ks.store.load_latest_json(logical_path)? {
            Some(doc) => ks.ledger = serde_json::from_value(doc)?,
            None => {
                info!("no knowledge base at '{logical_path}'; bootstrapping an empty ledger");
                ks.persist("bootstrap")?;
            }
        }
        Ok(ks)
    }

    pub fn ledger(&self) -> &KnowledgeLedger {
        &self.ledger
    }

    pub fn logical_path(&self) -> &str {
        &self.logical_path
    }

    fn persist(&self, reason: &str) -> Result<SavedArtifact, PersistenceError> {
        let doc = serde_json::to_value(&self.ledger)?;
        self.store.save_with_metadata(&self.logical_path, &ArtifactData::Json(doc), ACTOR, reason)
    }

    /// Registra un insight nuevo (confianza acotada a `[0, 1]`).
    pub fn add_insight(&mut self, key: &str, value: Value, source_id: &str, confidence: f64)
                       -> Result<Insight, PersistenceError> {
        let insight = Insight::new(key, value, source_id, confidence);
        self.record_insight(insight.clone())?;
        Ok(insight)
    }

    /// Variante para insights que traen su propio timestamp.
    pub fn record_insight(&mut self, mut insight: Insight) -> Result<(), PersistenceError> {
        insight.confidence = listflow_core::model::clamp_confidence(insight.confidence);
        let reason = format!("insight '{}' from '{}'", insight.key, insight.source_id);
        self.ledger.learned_insights.push(insight);
        if let Err(e) = self.persist(&reason) {
            self.ledger.learned_insights.pop();
            return Err(e);
        }
        Ok(())
    }

    /// El insight más reciente para `key`. Sin `include_expired`, descarta
    /// los más viejos que el TTL.
    pub fn get_latest_insight(&self, key: &str, include_expired: bool) -> Option<&Insight> {
        let now = Utc::now();
        self.ledger
            .learned_insights
            .iter()
            .rev()
            .filter(|i| i.key == key)
            .filter(|i| include_expired || i.age(now) <= self.ttl)
            .fold(None, |best: Option<&Insight>, i| match best {
                Some(b) if b.timestamp >= i.timestamp => Some(b),
                _ => Some(i),
            })
    }

    pub fn find_insights_by_source(&self, source_id: &str) -> Vec<&Insight> {
        self.ledger.learned_insights.iter().filter(|i| i.source_id == source_id).collect()
    }

    pub fn set_session_state(&mut self, key: &str, value: Value) -> Result<(), PersistenceError> {
        let previous = self.ledger.session_state.insert(key.to_string(), value);
        if let Err(e) = self.persist(&format!("session state '{key}'")) {
            match previous {
                Some(v) => self.ledger.session_state.insert(key.to_string(), v),
                None => self.ledger.session_state.remove(key),
            };
            return Err(e);
        }
        Ok(())
    }

    pub fn get_session_state(&self, key: &str) -> Option<&Value> {
        self.ledger.session_state.get(key)
    }

    pub fn session_state(&self) -> &Map<String, Value> {
        &self.ledger.session_state
    }

    pub fn record_metric(&mut self, metric: Value) -> Result<(), PersistenceError> {
        self.ledger.performance_metrics.push(metric);
        if let Err(e) = self.persist("performance metric") {
            self.ledger.performance_metrics.pop();
            return Err(e);
        }
        Ok(())
    }
}

/// `KnowledgeStore` compartible entre handlers.
#[derive(Debug)]
pub struct SharedKnowledgeStore {
    inner: Mutex<KnowledgeStore>,
}

impl SharedKnowledgeStore {
    pub fn new(store: KnowledgeStore) -> Self {
        Self { inner: Mutex::new(store) }
    }

    pub fn lock(&self) -> MutexGuard<'_, KnowledgeStore> {
        self.inner.lock().unwrap_or_else(|p| p.into_inner())
    }
}

impl InsightSink for SharedKnowledgeStore {
    fn add_insight(&self, key: &str, value: Value, source_id: &str, confidence: f64) -> Result<(), ServiceError> {
        self.lock().add_insight(key, value, source_id, confidence)?;
        Ok(())
    }

    fn latest_insight(&self, key: &str, include_expired: bool) -> Result<Option<Insight>, ServiceError> {
        Ok(self.lock().get_latest_insight(key, include_expired).cloned())
    }
}
