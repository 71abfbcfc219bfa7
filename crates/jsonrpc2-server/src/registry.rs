//! Namespaced procedure registry and dispatcher.

use std::collections::HashMap;
use std::collections::hash_map::Entry;
use std::collections::HashSet;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use futures::FutureExt;
use serde_json::Value;
use thiserror::Error;
use tracing::{debug, error};

use crate::method::to_camel_case;
use crate::params::{Argument, ParamType};
use crate::procedure::Procedure;
use crate::service::Service;

/// Registration failures; a rejected service leaves the registry untouched.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistryError {
    #[error("invalid service procedures: {0}")]
    InvalidServiceProcedures(String),

    #[error("invalid namespace `{0}`: namespaces cannot contain `_`")]
    InvalidNamespace(String),

    #[error("service `{0}` is already registered")]
    ServiceAlreadyRegistered(String),
}

/// Failures raised while resolving or running a procedure.
#[derive(Debug, Error)]
pub enum DispatchError {
    #[error("service `{0}` does not exist")]
    NonExistentService(String),

    #[error("procedure `{procedure}` does not exist on service `{service}`")]
    NonExistentProcedure { service: String, procedure: String },

    #[error("invalid argument type at position {position}: expected {expected}")]
    InvalidArgumentType {
        position: usize,
        expected: &'static str,
    },

    #[error("invalid arguments count: expected {expected}, found {found}")]
    InvalidArgumentsCount { expected: usize, found: usize },

    /// The procedure itself returned a failure.
    #[error("{0}")]
    Procedure(String),

    #[error("failed to encode procedure result: {0}")]
    ResultEncoding(#[source] serde_json::Error),

    #[error("procedure panicked")]
    Panicked,
}

/// A resolved procedure, borrowed from the registry.
#[derive(Clone, Copy)]
pub struct ProcedureDescriptor<'a> {
    service: &'a str,
    name: &'a str,
    procedure: &'a dyn Procedure,
}

impl<'a> ProcedureDescriptor<'a> {
    pub fn service(&self) -> &'a str {
        self.service
    }

    pub fn name(&self) -> &'a str {
        self.name
    }

    /// Ordered formal parameter types, receiver excluded.
    pub fn params(&self) -> &'a [ParamType] {
        self.procedure.param_types()
    }

    /// Runs the procedure; a panic is reported as [`DispatchError::Panicked`].
    pub async fn invoke(&self, args: Vec<Argument>) -> Result<Value, DispatchError> {
        match AssertUnwindSafe(self.procedure.call(args)).catch_unwind().await {
            Ok(outcome) => outcome,
            Err(_) => {
                error!(
                    service = self.service,
                    procedure = self.name,
                    "Procedure panicked"
                );
                Err(DispatchError::Panicked)
            }
        }
    }
}

impl std::fmt::Debug for ProcedureDescriptor<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProcedureDescriptor")
            .field("service", &self.service)
            .field("name", &self.name)
            .field("params", &self.params())
            .finish()
    }
}

/// Services keyed by namespace, procedures keyed by PascalCase name.
///
/// The empty namespace holds procedures called without a service prefix.
#[derive(Default)]
pub struct Registry {
    services: HashMap<String, HashMap<String, Arc<dyn Procedure>>>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers every procedure of `service` under `namespace`.
    ///
    /// Procedure names must be non-empty, start with an uppercase letter, contain
    /// no `_` and be unique within the service.
    pub fn register(
        &mut self,
        namespace: impl Into<String>,
        service: Service,
    ) -> Result<(), RegistryError> {
        let namespace = namespace.into();
        if namespace.contains('_') {
            return Err(RegistryError::InvalidNamespace(namespace));
        }

        let procedures = validate_procedures(service)?;
        match self.services.entry(namespace) {
            Entry::Occupied(entry) => {
                Err(RegistryError::ServiceAlreadyRegistered(entry.key().clone()))
            }
            Entry::Vacant(entry) => {
                debug!(
                    namespace = entry.key().as_str(),
                    procedures = procedures.len(),
                    "Registered service"
                );
                entry.insert(procedures);
                Ok(())
            }
        }
    }

    pub fn lookup(
        &self,
        service: &str,
        procedure: &str,
    ) -> Result<ProcedureDescriptor<'_>, DispatchError> {
        let procedures = self
            .services
            .get_key_value(service)
            .ok_or_else(|| DispatchError::NonExistentService(service.to_string()))?;

        let (name, entry) = procedures.1.get_key_value(procedure).ok_or_else(|| {
            DispatchError::NonExistentProcedure {
                service: service.to_string(),
                procedure: procedure.to_string(),
            }
        })?;

        Ok(ProcedureDescriptor {
            service: procedures.0,
            name,
            procedure: entry.as_ref(),
        })
    }

    /// Resolves and runs a procedure in one step.
    pub async fn invoke(
        &self,
        service: &str,
        procedure: &str,
        args: Vec<Argument>,
    ) -> Result<Value, DispatchError> {
        self.lookup(service, procedure)?.invoke(args).await
    }

    /// Wire method names of every registered procedure, sorted.
    pub fn methods(&self) -> Vec<String> {
        let mut methods: Vec<String> = self
            .services
            .iter()
            .flat_map(|(namespace, procedures)| {
                procedures.keys().map(move |name| {
                    if namespace.is_empty() {
                        to_camel_case(name)
                    } else {
                        format!("{}_{}", namespace, to_camel_case(name))
                    }
                })
            })
            .collect();
        methods.sort();
        methods
    }

    pub fn is_empty(&self) -> bool {
        self.services.is_empty()
    }
}

fn validate_procedures(
    service: Service,
) -> Result<HashMap<String, Arc<dyn Procedure>>, RegistryError> {
    check_procedure_names(&service)?;
    Ok(service.procedures.into_iter().collect())
}

fn check_procedure_names(service: &Service) -> Result<(), RegistryError> {
    let mut seen = HashSet::new();
    for name in service.procedure_names() {
        let reason = if name.is_empty() {
            Some("empty procedure name")
        } else if !name.chars().next().is_some_and(char::is_uppercase) {
            Some("procedure names must start with an uppercase letter")
        } else if name.contains('_') {
            Some("procedure names cannot contain `_`")
        } else if !seen.insert(name) {
            Some("duplicate procedure name")
        } else {
            None
        };

        if let Some(reason) = reason {
            return Err(RegistryError::InvalidServiceProcedures(format!("{reason}: `{name}`")));
        }
    }
    Ok(())
}
