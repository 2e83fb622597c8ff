// Draft engine services: configuration, runtime, derby, pick queue and the
// expiration sweeper, composed over a shared `EngineContext`.

pub mod autopick;
pub mod configuration;
pub mod context;
pub mod derby;
pub mod queue;
pub mod runtime;
pub mod sweeper;

use std::sync::Arc;

pub use configuration::DraftConfigurator;
pub use context::EngineContext;
pub use derby::{DerbyWorkflow, SlotClaim};
pub use queue::PickQueueService;
pub use runtime::{AutopickToggle, DraftRuntime, PickOutcome};
pub use sweeper::{ExpirationSweeper, SweepReport};

/// Every draft service, wired to one context.
pub struct DraftEngine {
    pub config: DraftConfigurator,
    pub runtime: Arc<DraftRuntime>,
    pub derby: Arc<DerbyWorkflow>,
    pub queue: PickQueueService,
    ctx: EngineContext,
}

impl DraftEngine {
    pub fn new(ctx: EngineContext) -> Self {
        DraftEngine {
            config: DraftConfigurator::new(ctx.clone()),
            runtime: Arc::new(DraftRuntime::new(ctx.clone())),
            derby: Arc::new(DerbyWorkflow::new(ctx.clone())),
            queue: PickQueueService::new(ctx.clone()),
            ctx,
        }
    }

    pub fn context(&self) -> &EngineContext {
        &self.ctx
    }

    /// A sweeper driving this engine's runtime and derby workflow.
    pub fn sweeper(&self, max_concurrent: usize) -> ExpirationSweeper {
        ExpirationSweeper::new(
            self.ctx.db.clone(),
            self.ctx.clock.clone(),
            self.runtime.clone(),
            self.derby.clone(),
            max_concurrent,
        )
    }
}
