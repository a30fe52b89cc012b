//! Verb-keyed handler table

use crate::handlers::{
    CdHandler, DownloadHandler, ExitHandler, Handler, MkdirHandler, Outcome, RmHandler,
    SessionContext, UploadHandler,
};
use dirshare_proto::{Command, ProtocolError, Verb};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, warn};

/// Routes parsed commands to the handler registered for their verb
///
/// Shared read-only by every session of a server.
#[derive(Clone, Default)]
pub struct CommandRouter {
    /// Registered handlers by verb
    handlers: HashMap<Verb, Arc<dyn Handler>>,
}

impl CommandRouter {
    /// Create an empty router
    pub fn new() -> Self {
        Self::default()
    }

    /// Router with a handler for every verb
    pub fn standard() -> Self {
        let mut router = Self::new();
        router.register(Verb::Cd, Arc::new(CdHandler));
        router.register(Verb::Mkdir, Arc::new(MkdirHandler));
        router.register(Verb::Rm, Arc::new(RmHandler));
        router.register(Verb::Ul, Arc::new(UploadHandler));
        router.register(Verb::Dl, Arc::new(DownloadHandler));
        router.register(Verb::Exit, Arc::new(ExitHandler));
        router
    }

    /// Register (or replace) the handler for a verb
    pub fn register(&mut self, verb: Verb, handler: Arc<dyn Handler>) {
        debug!("Registered handler for verb: {}", verb);
        self.handlers.insert(verb, handler);
    }

    /// Whether a verb has a handler
    pub fn handles(&self, verb: Verb) -> bool {
        self.handlers.contains_key(&verb)
    }

    /// Run the handler for `command`; an unregistered verb is a no-op
    pub async fn dispatch(
        &self,
        session: &mut SessionContext,
        command: &Command,
    ) -> Result<Outcome, ProtocolError> {
        match self.handlers.get(&command.verb) {
            Some(handler) => {
                debug!("Dispatching: {}", command);
                handler.handle(session, &command.arg).await
            }
            None => {
                warn!("No handler registered for verb: {}", command.verb);
                Ok(Outcome::Continue)
            }
        }
    }
}

impl std::fmt::Debug for CommandRouter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut verbs: Vec<_> = self.handlers.keys().map(|v| v.as_str()).collect();
        verbs.sort_unstable();
        f.debug_struct("CommandRouter").field("verbs", &verbs).finish()
    }
}
