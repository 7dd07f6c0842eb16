//! Handler interface (C4): the contract every concrete job kind satisfies.

use async_trait::async_trait;

use crate::error::ApiError;
use crate::job::{JobRecord, JobStatus};

#[async_trait]
pub trait JobHandler: Send {
    /// Performs the work. Must terminate by either:
    /// (a) returning `Ok(())` without otherwise transitioning the row
    ///     (the scheduler then implicitly transitions it to `success`),
    /// (b) calling `update(success, ..)` on its job record explicitly,
    /// (c) calling `mark_admin()` to park, or
    /// (d) returning a classified `ApiError`.
    async fn run(&mut self) -> Result<(), ApiError>;

    /// Constant per concrete type: does this handler mutate external
    /// (Google-side) state?
    fn has_side_effects(&self) -> bool;

    /// Short one-line human description, for logs.
    fn describe_short(&self) -> String;

    /// Long multi-line human description, for the admin console.
    fn describe_long(&self) -> String;

    /// Mutable access to the underlying job record, so the queue manager
    /// can drive `mark_active`/`update` around the call to `run`.
    fn job_mut(&mut self) -> &mut JobRecord;

    fn job(&self) -> &JobRecord;

    fn status(&self) -> (JobStatus, u32) {
        self.job().status()
    }
}
