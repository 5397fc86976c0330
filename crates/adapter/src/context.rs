//! Per-worker contexts issued by the facade.

use std::sync::atomic::{AtomicU8, Ordering};

use ledger_bench_types::{BackendKind, ContextId};

use crate::{
    adapter::Session,
    error::{ContextSnafu, Result},
};

const ACQUIRED: u8 = 0;
const RELEASING: u8 = 1;
const RELEASED: u8 = 2;

/// A backend session bound to one client, owned by one worker.
///
/// A context is *acquired* when returned by
/// [`Blockchain::get_context`](crate::Blockchain::get_context) and becomes
/// *released* after the first successful
/// [`Blockchain::release_context`](crate::Blockchain::release_context). Any
/// later use fails with [`crate::AdapterError::Context`]. A release the
/// backend refuses leaves the context acquired so it can be retried.
#[derive(Debug)]
pub struct Context {
    id: ContextId,
    owner: u64,
    name: String,
    client_id: String,
    backend: BackendKind,
    session: Session,
    state: AtomicU8,
}

impl Context {
    pub(crate) fn new(
        id: ContextId,
        owner: u64,
        name: &str,
        backend: BackendKind,
        session: Session,
    ) -> Self {
        Self {
            id,
            owner,
            name: name.to_owned(),
            client_id: session.client_id().to_owned(),
            backend,
            session,
            state: AtomicU8::new(ACQUIRED),
        }
    }

    /// Facade-unique identifier.
    #[must_use]
    pub fn id(&self) -> ContextId {
        self.id
    }

    /// Workload name the context was requested for.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Client the context is bound to.
    #[must_use]
    pub fn client_id(&self) -> &str {
        &self.client_id
    }

    /// Backend that issued the context.
    #[must_use]
    pub fn backend(&self) -> BackendKind {
        self.backend
    }

    /// Returns true once the context has been released.
    #[must_use]
    pub fn is_released(&self) -> bool {
        self.state.load(Ordering::SeqCst) == RELEASED
    }

    /// Returns the backend session if `owner` issued this context and it is
    /// still acquired.
    pub(crate) fn session_for(&self, owner: u64) -> Result<&Session> {
        if self.owner != owner {
            return ContextSnafu { message: format!("{} was issued by another facade", self.id) }
                .fail();
        }
        match self.state.load(Ordering::SeqCst) {
            ACQUIRED => Ok(&self.session),
            RELEASING => {
                ContextSnafu { message: format!("{} is being released", self.id) }.fail()
            },
            _ => ContextSnafu { message: format!("{} has been released", self.id) }.fail(),
        }
    }

    /// Claims the release. Only one caller wins until the claim is settled
    /// with [`Self::finish_release`].
    pub(crate) fn begin_release(&self) -> Result<()> {
        self.state
            .compare_exchange(ACQUIRED, RELEASING, Ordering::SeqCst, Ordering::SeqCst)
            .map(|_| ())
            .map_err(|state| {
                let message = if state == RELEASING {
                    format!("{} is being released", self.id)
                } else {
                    format!("{} already released", self.id)
                };
                ContextSnafu { message }.build()
            })
    }

    /// Settles a claimed release: released on success, acquired again on
    /// failure.
    pub(crate) fn finish_release(&self, released: bool) {
        self.state.store(if released { RELEASED } else { ACQUIRED }, Ordering::SeqCst);
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use ledger_bench_types::ErrorCode;

    use super::*;

    fn context(owner: u64) -> Context {
        let session = Session { handle: 7, client_id: "client-a".into() };
        Context::new(ContextId::new(1), owner, "transfer", BackendKind::Memory, session)
    }

    #[test]
    fn test_accessors() {
        let ctx = context(1);
        assert_eq!(ctx.id(), ContextId::new(1));
        assert_eq!(ctx.name(), "transfer");
        assert_eq!(ctx.client_id(), "client-a");
        assert_eq!(ctx.backend(), BackendKind::Memory);
        assert!(!ctx.is_released());
    }

    #[test]
    fn test_release_exactly_once() {
        let ctx = context(1);
        ctx.begin_release().unwrap();
        ctx.finish_release(true);
        assert!(ctx.is_released());
        assert_eq!(ctx.begin_release().unwrap_err().code(), ErrorCode::Context);
        assert_eq!(ctx.session_for(1).unwrap_err().code(), ErrorCode::Context);
    }

    #[test]
    fn test_pending_release_blocks_use() {
        let ctx = context(1);
        ctx.begin_release().unwrap();
        assert!(!ctx.is_released());
        assert!(ctx.begin_release().unwrap_err().to_string().contains("being released"));
        assert!(ctx.session_for(1).unwrap_err().to_string().contains("being released"));
    }

    #[test]
    fn test_failed_release_rolls_back() {
        let ctx = context(1);
        ctx.begin_release().unwrap();
        ctx.finish_release(false);
        assert!(!ctx.is_released());
        assert_eq!(ctx.session_for(1).unwrap().handle(), 7);
        ctx.begin_release().unwrap();
        ctx.finish_release(true);
        assert!(ctx.is_released());
    }

    #[test]
    fn test_foreign_owner_rejected() {
        let ctx = context(1);
        assert_eq!(ctx.session_for(1).unwrap().handle(), 7);
        let err = ctx.session_for(2).unwrap_err();
        assert!(err.to_string().contains("another facade"));
    }
}
