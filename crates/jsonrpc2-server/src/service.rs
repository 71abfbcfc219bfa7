use std::sync::Arc;

use crate::procedure::{BoundProcedure, IntoProcedure, Procedure};

/// A named set of procedures sharing one receiver, ready to be registered.
pub struct Service {
    pub(crate) procedures: Vec<(String, Arc<dyn Procedure>)>,
}

impl Service {
    /// Start a service whose procedures all receive `receiver`.
    pub fn builder<S>(receiver: S) -> ServiceBuilder<S>
    where
        S: Send + Sync + 'static,
    {
        ServiceBuilder::new(Arc::new(receiver))
    }

    /// Like [`builder`](Self::builder) for a receiver that is already shared.
    pub fn from_shared<S>(receiver: Arc<S>) -> ServiceBuilder<S>
    where
        S: Send + Sync + 'static,
    {
        ServiceBuilder::new(receiver)
    }

    /// Procedure names in registration order.
    pub fn procedure_names(&self) -> impl Iterator<Item = &str> {
        self.procedures.iter().map(|(name, _)| name.as_str())
    }

    pub fn len(&self) -> usize {
        self.procedures.len()
    }

    pub fn is_empty(&self) -> bool {
        self.procedures.is_empty()
    }
}

impl std::fmt::Debug for Service {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Service")
            .field("procedures", &self.procedure_names().collect::<Vec<_>>())
            .finish()
    }
}

/// Builder collecting typed procedures for one receiver.
///
/// Names are checked when the service is registered, not here.
pub struct ServiceBuilder<S> {
    receiver: Arc<S>,
    procedures: Vec<(String, Arc<dyn Procedure>)>,
}

impl<S> ServiceBuilder<S>
where
    S: Send + Sync + 'static,
{
    fn new(receiver: Arc<S>) -> Self {
        Self {
            receiver,
            procedures: Vec::new(),
        }
    }

    /// Add a procedure under its PascalCase `name` (`"Subtract"` answers `subtract`).
    pub fn procedure<P, Args>(mut self, name: impl Into<String>, procedure: P) -> Self
    where
        P: IntoProcedure<S, Args>,
        Args: 'static,
    {
        let bound = BoundProcedure::new(Arc::clone(&self.receiver), procedure);
        self.procedures.push((name.into(), Arc::new(bound)));
        self
    }

    pub fn build(self) -> Service {
        Service {
            procedures: self.procedures,
        }
    }
}
