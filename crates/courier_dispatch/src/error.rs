use std::{
    any::Any,
    fmt::Display,
    panic::{self, AssertUnwindSafe},
};

use jiff::SignedDuration;
use thiserror::Error;

use crate::{
    costing::route_costing::CostingError,
    providers::{geo_provider::GeoError, stores::StoreError},
};

/// Phase of the dispatch pipeline an error was raised in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Stage {
    ContextFactory,
    Clustering,
    GeoLookup,
    Search,
    Extension,
    Dedup,
}

impl Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Stage::ContextFactory => "context factory",
            Stage::Clustering => "clustering",
            Stage::GeoLookup => "geo lookup",
            Stage::Search => "search",
            Stage::Extension => "extension",
            Stage::Dedup => "dedup",
        };

        write!(f, "{name}")
    }
}

#[derive(Debug, Error)]
pub enum DispatchError {
    #[error("invalid input: {0}")]
    Validation(String),

    #[error(transparent)]
    GeoLookup(#[from] GeoError),

    #[error(transparent)]
    Costing(#[from] CostingError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("could not spawn worker thread: {0}")]
    ThreadSpawn(#[from] std::io::Error),

    #[error("worker {worker} panicked")]
    WorkerPanicked { worker: usize },

    #[error("panicked: {message}")]
    Panicked { message: String },

    #[error("workers did not complete within {0}")]
    WorkerTimeout(SignedDuration),

    #[error("workers were cancelled")]
    Cancelled,

    #[error("worker {worker} failed: {source}")]
    Worker {
        worker: usize,
        #[source]
        source: Box<DispatchError>,
    },

    #[error("{stage} failed in iteration {iteration}: {source}")]
    Stage {
        stage: Stage,
        iteration: usize,
        #[source]
        source: Box<DispatchError>,
    },
}

impl DispatchError {
    pub fn validation(message: impl Into<String>) -> Self {
        DispatchError::Validation(message.into())
    }

    pub fn at_stage(self, stage: Stage, iteration: usize) -> Self {
        DispatchError::Stage {
            stage,
            iteration,
            source: Box::new(self),
        }
    }

    /// Builds an error from the payload of a caught panic.
    pub fn from_panic(payload: Box<dyn Any + Send>) -> Self {
        let message = match payload.downcast::<String>() {
            Ok(message) => *message,
            Err(payload) => match payload.downcast::<&'static str>() {
                Ok(message) => (*message).to_owned(),
                Err(_) => "unknown panic payload".to_owned(),
            },
        };

        DispatchError::Panicked { message }
    }

    /// Outermost stage recorded for this error, if any.
    pub fn stage(&self) -> Option<Stage> {
        match self {
            DispatchError::Stage { stage, .. } => Some(*stage),
            DispatchError::Worker { source, .. } => source.stage(),
            _ => None,
        }
    }

    /// Innermost error, stripped of stage and worker wrappers.
    pub fn root_cause(&self) -> &DispatchError {
        match self {
            DispatchError::Stage { source, .. } | DispatchError::Worker { source, .. } => {
                source.root_cause()
            }
            _ => self,
        }
    }
}

/// Runs `f` on the current thread, a panic inside it becomes a
/// [`DispatchError::Panicked`].
pub(crate) fn catch_panic<T>(
    f: impl FnOnce() -> Result<T, DispatchError>,
) -> Result<T, DispatchError> {
    panic::catch_unwind(AssertUnwindSafe(f)).unwrap_or_else(|payload| {
        tracing::error!("Caught a panic");
        Err(DispatchError::from_panic(payload))
    })
}
