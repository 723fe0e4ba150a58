//! Runtime: one spill session per `Engine`.
//!
//! - Picks a storage backend from the configured spill URI.
//! - Roots all segments of the session under `<root>/<uuid>`.
//! - Hands every operator the same `ExecContext` (spill manager, id generator,
//!   page size).
//! - Builds operator trees from `PlanNode`s and drains them.

use std::sync::Arc;
use std::time::Instant;

use thiserror::Error;

use spillway_core::config::EngineConfig;
use spillway_core::id::SpillIdGen;
use spillway_core::tuple::Tuple;

use spillway_mem::{Codec, SegmentName, SpillManager, Storage};

use spillway_io::build_storage_from_config;

use spillway_operators::plan::{build, PlanNode};
use spillway_operators::traits::{ExecContext, OpError, Operator};

use crate::metrics::QueryStats;

#[derive(Debug, Error)]
pub enum ExecError {
    #[error("invalid engine config: {0}")]
    Config(String),
    #[error("storage: {0}")]
    Storage(#[from] spillway_io::Error),
    #[error("operator: {0}")]
    Operator(#[from] OpError),
}

/// Engine owns the spill session shared by every operator it builds.
pub struct Engine {
    cfg: EngineConfig,
    spill: Arc<SpillManager>,
    ids: Arc<SpillIdGen>,
    session_dir: String,
}

impl Engine {
    pub fn new(cfg: EngineConfig) -> Result<Self, ExecError> {
        let storage = build_storage_from_config(&cfg.storage_config())?;
        Self::with_storage(cfg, storage)
    }

    /// Like `new`, but with a caller-supplied backend (e.g. a shared
    /// `MemoryStorage` a test wants to inspect).
    pub fn with_storage(cfg: EngineConfig, storage: Arc<dyn Storage>) -> Result<Self, ExecError> {
        cfg.validate().map_err(|e| ExecError::Config(e.to_string()))?;
        let codec = Codec::from_name(&cfg.codec)
            .map_err(|e| ExecError::Config(format!("codec '{}': {e}", cfg.codec)))?;

        let root = cfg.storage_config().root;
        let session_dir = format!("{}/{}", root.trim_end_matches('/'), uuid::Uuid::new_v4());
        let spill = SpillManager::new(storage, codec, session_dir.clone());
        tracing::debug!(
            session = %session_dir,
            ?codec,
            page_size = cfg.page_size_bytes,
            "engine session started"
        );

        Ok(Self {
            cfg,
            spill: Arc::new(spill),
            ids: Arc::new(SpillIdGen::new()),
            session_dir,
        })
    }

    pub fn config(&self) -> &EngineConfig {
        &self.cfg
    }

    /// Directory (or key prefix) all segments of this session live under.
    pub fn session_dir(&self) -> &str {
        &self.session_dir
    }

    pub fn spill(&self) -> &Arc<SpillManager> {
        &self.spill
    }

    pub fn context(&self) -> ExecContext {
        ExecContext::new(
            Arc::clone(&self.spill),
            Arc::clone(&self.ids),
            self.cfg.page_size_bytes,
        )
    }

    /// Build a fresh operator tree for `plan`.
    pub fn build(&self, plan: &PlanNode) -> Result<Box<dyn Operator>, ExecError> {
        Ok(build(plan, &self.context())?)
    }

    /// Build, open and drain `plan`, returning every output tuple in order.
    pub fn execute(&self, plan: &PlanNode) -> Result<Vec<Tuple>, ExecError> {
        self.execute_with_stats(plan).map(|(tuples, _)| tuples)
    }

    pub fn execute_with_stats(
        &self,
        plan: &PlanNode,
    ) -> Result<(Vec<Tuple>, QueryStats), ExecError> {
        let mut op = self.build(plan)?;
        let started = Instant::now();
        let mut stats = QueryStats::default();

        let result = drain(op.as_mut(), &mut stats);
        op.close();
        let tuples = result?;

        stats.elapsed = started.elapsed();
        stats.emit(op.name());
        Ok((tuples, stats))
    }

    /// Segments currently registered in this session.
    pub fn live_segments(&self) -> Vec<SegmentName> {
        self.spill.list_segments()
    }
}

fn drain(op: &mut dyn Operator, stats: &mut QueryStats) -> Result<Vec<Tuple>, OpError> {
    op.open()?;
    let mut out = Vec::new();
    while let Some(batch) = op.next()? {
        stats.record_batch(batch.len());
        out.extend(batch.into_tuples());
    }
    Ok(out)
}

impl Drop for Engine {
    fn drop(&mut self) {
        for name in self.spill.list_segments() {
            if let Err(e) = self.spill.delete_segment(&name) {
                tracing::warn!(segment = %name, error = %e, "leftover spill segment not deleted");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn memory_cfg() -> EngineConfig {
        EngineConfig {
            spill_uri: Some("memory://".into()),
            ..EngineConfig::default()
        }
    }

    #[test]
    fn sessions_get_distinct_dirs() {
        let a = Engine::new(memory_cfg()).unwrap();
        let b = Engine::new(memory_cfg()).unwrap();
        assert_ne!(a.session_dir(), b.session_dir());
        assert!(a.session_dir().starts_with("memory:/"));
    }

    #[test]
    fn bad_config_is_rejected() {
        let cfg = EngineConfig {
            buffer_frames: 0,
            ..memory_cfg()
        };
        assert!(matches!(Engine::new(cfg), Err(ExecError::Config(_))));

        let cfg = EngineConfig {
            codec: "brotli".into(),
            ..memory_cfg()
        };
        assert!(matches!(Engine::new(cfg), Err(ExecError::Config(_))));

        let cfg = EngineConfig {
            spill_uri: Some("s3://bucket".into()),
            ..EngineConfig::default()
        };
        assert!(matches!(Engine::new(cfg), Err(ExecError::Storage(_))));
    }
}
