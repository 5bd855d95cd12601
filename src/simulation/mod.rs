//! Demo value driver: `AI:0.PresentValue` follows
//! `AV:0.PresentValue * sin(t)`, advancing `t` each tick.
//!
//! Writes go through the store under the object locks, so subscribers of
//! `AI:0` receive change-of-value notifications like for any other writer.


use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tracing::debug;
use tracing::info;
use tracing::warn;

use crate::constants::SIMULATION_SOURCE_INSTANCE;
use crate::constants::SIMULATION_TARGET_INSTANCE;
use crate::AccessError;
use crate::ObjectId;
use crate::ObjectLocks;
use crate::ObjectStore;
use crate::ObjectType;
use crate::PropertyId;
use crate::PropertyValue;
use crate::Result;
use crate::SimulationConfig;
use crate::Value;

pub struct SimulationWorker {
    store: Arc<dyn ObjectStore>,
    locks: Arc<ObjectLocks>,
    config: SimulationConfig,
    source: ObjectId,
    target: ObjectId,
    t: f64,
}

impl SimulationWorker {
    pub fn new(
        store: Arc<dyn ObjectStore>,
        locks: Arc<ObjectLocks>,
        config: SimulationConfig,
    ) -> Self {
        Self {
            store,
            locks,
            config,
            source: ObjectId::new(ObjectType::ANALOG_VALUE, SIMULATION_SOURCE_INSTANCE),
            target: ObjectId::new(ObjectType::ANALOG_INPUT, SIMULATION_TARGET_INSTANCE),
            t: 0.0,
        }
    }

    /// Computes and writes one sample; returns the written value.
    pub async fn tick(&mut self) -> Result<f32> {
        let coefficient = {
            let _guard = self.locks.lock(self.source).await;
            let values = self
                .store
                .read_property(self.source, PropertyId::PRESENT_VALUE.into())
                .await?;
            values.first().and_then(Value::as_f64).ok_or(AccessError::InvalidDataType {
                object: self.source,
                property: PropertyId::PRESENT_VALUE.into(),
            })?
        };

        let sample = (coefficient * self.t.sin()) as f32;
        {
            let _guard = self.locks.lock(self.target).await;
            self.store
                .write_property(
                    self.target,
                    PropertyValue::new(PropertyId::PRESENT_VALUE, vec![Value::Real(sample)]),
                )
                .await?;
        }
        self.t += self.config.step;
        debug!(t = self.t, sample, "simulation tick");
        Ok(sample)
    }

    /// Ticks every `interval_in_ms` until `shutdown` fires. A failing tick
    /// is logged and retried on the next one.
    pub async fn run(
        mut self,
        mut shutdown: watch::Receiver<()>,
    ) -> Result<()> {
        let mut ticker = tokio::time::interval(Duration::from_millis(self.config.interval_in_ms));
        info!(source = %self.source, target = %self.target, "simulation started");

        loop {
            tokio::select! {
                _ = shutdown.changed() => {
                    info!("simulation stopped");
                    return Ok(());
                }
                _ = ticker.tick() => {
                    if let Err(e) = self.tick().await {
                        warn!("simulation tick failed: {:?}", e);
                    }
                }
            }
        }
    }
}
