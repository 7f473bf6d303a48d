//! `PipelineContext` (§4.6): the clock, registry handle, and cancellation token shared by
//! every node in one query execution.

use crate::registry::Registry;
use crate::time::TimeStamp;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

/// External collaborator (§6): `now() -> TimeStamp`, consulted when a query has no explicit
/// end time.
pub trait Clock: Send + Sync {
    fn now(&self) -> TimeStamp;
}

/// The default clock, backed by the system wall clock.
#[derive(Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> TimeStamp {
        let millis = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_millis() as i64)
            .unwrap_or(0);
        TimeStamp::from_epoch_millis(millis)
    }
}

/// Consulted by long-running iterators at least once per emitted point (§5). Cheap to
/// clone; every clone observes the same underlying flag, so tripping one trips them all.
#[derive(Clone)]
pub struct CancellationToken {
    cancelled: Arc<AtomicBool>,
}

impl Default for CancellationToken {
    fn default() -> Self {
        CancellationToken {
            cancelled: Arc::new(AtomicBool::new(false)),
        }
    }
}

impl CancellationToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }
}

/// Shared across all nodes in one query execution (§4.6).
pub struct PipelineContext {
    pub registry: Arc<Registry>,
    pub clock: Arc<dyn Clock>,
    pub cancellation: CancellationToken,
}

impl PipelineContext {
    pub fn new(registry: Arc<Registry>) -> Self {
        PipelineContext {
            registry,
            clock: Arc::new(SystemClock),
            cancellation: CancellationToken::new(),
        }
    }

    pub fn with_clock(registry: Arc<Registry>, clock: Arc<dyn Clock>) -> Self {
        PipelineContext {
            registry,
            clock,
            cancellation: CancellationToken::new(),
        }
    }
}
