//! Application state shared by every HTTP and WebSocket handler.

use dashmap::DashMap;
use serde::Serialize;
use sqlx::PgPool;
use std::sync::Arc;
use std::time::Instant;
use ts_rs::TS;

use crate::face::FaceEngine;
use crate::tutor::Tutor;

/// Health status of a service.
#[derive(Debug, Clone, Serialize, PartialEq, TS)]
#[serde(rename_all = "lowercase")]
#[ts(export)]
pub enum ServiceStatus {
    Active,
    Connected,
    Disabled,
    Error,
}

/// A timestamped status entry for a service.
#[derive(Debug, Clone)]
pub struct StatusEntry {
    pub status: ServiceStatus,
    pub updated_at: Instant,
}

/// Thread-safe registry for services to self-report their health status.
#[derive(Debug, Clone, Default)]
pub struct ServiceStatusRegistry {
    inner: Arc<DashMap<String, StatusEntry>>,
}

impl ServiceStatusRegistry {
    /// Creates a new empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts or updates the status for a named service.
    pub fn set(&self, name: &str, status: ServiceStatus) {
        self.inner.insert(
            name.to_owned(),
            StatusEntry {
                status,
                updated_at: Instant::now(),
            },
        );
    }

    /// Returns the current status of a named service, if present.
    pub fn get(&self, name: &str) -> Option<ServiceStatus> {
        self.inner.get(name).map(|entry| entry.status.clone())
    }

    /// Seconds since the named service last reported.
    pub fn age_secs(&self, name: &str) -> Option<u64> {
        self.inner
            .get(name)
            .map(|entry| entry.updated_at.elapsed().as_secs())
    }

    /// Returns a snapshot of all service statuses.
    pub fn all(&self) -> Vec<(String, ServiceStatus)> {
        self.inner
            .iter()
            .map(|entry| (entry.key().clone(), entry.value().status.clone()))
            .collect()
    }
}

#[derive(Clone)]
pub struct AppState {
    pub engine: Arc<FaceEngine>,
    pub tutor: Arc<Tutor>,
    /// `None` when no database is configured.
    pub db_pool: Option<PgPool>,
    pub service_statuses: ServiceStatusRegistry,
}

impl AppState {
    pub fn new(engine: Arc<FaceEngine>, tutor: Arc<Tutor>, db_pool: Option<PgPool>) -> Self {
        let service_statuses = ServiceStatusRegistry::new();
        service_statuses.set(
            "database",
            if db_pool.is_some() {
                ServiceStatus::Connected
            } else {
                ServiceStatus::Disabled
            },
        );
        Self {
            engine,
            tutor,
            db_pool,
            service_statuses,
        }
    }
}
