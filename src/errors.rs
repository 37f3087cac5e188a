// Copyright 2025 Cowboy AI, LLC.

//! Error types for model construction, wiring and effect execution

use std::fmt;
use std::sync::Arc;
use thiserror::Error;

/// Why a pending effect completion was settled without running to the end
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CancelReason {
    /// A newer trigger replaced the running instance (`take_latest`)
    Superseded,
    /// The trigger arrived while another instance was running (`take_leading`)
    Dropped,
    /// A newer trigger arrived inside the debounce window
    Debounced,
    /// A newer trigger replaced this one in the throttle buffer
    Throttled,
    /// The task owning the completion went away without settling it
    Abandoned,
}

impl fmt::Display for CancelReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let reason = match self {
            CancelReason::Superseded => "superseded by a newer action",
            CancelReason::Dropped => "dropped while another instance was running",
            CancelReason::Debounced => "replaced inside the debounce window",
            CancelReason::Throttled => "replaced inside the throttle window",
            CancelReason::Abandoned => "abandoned before completion",
        };
        f.write_str(reason)
    }
}

/// Errors raised by the model layer
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ModelError {
    /// Namespace was supplied as something other than text
    #[error("Namespace must be a string, got {found}")]
    NonStringNamespace {
        /// Kind of value that was supplied
        found: String,
    },

    /// Namespace was the empty string
    #[error("Namespace must not be empty")]
    EmptyNamespace,

    /// Namespace does not match the dot-segmented alphanumeric pattern
    #[error("Invalid namespace \"{namespace}\": expected alphanumeric segments separated by '.'")]
    InvalidNamespace {
        /// The rejected namespace
        namespace: String,
    },

    /// Reducer or effect name is not an identifier or qualified action type
    #[error("Invalid action name \"{name}\" on namespace \"{namespace}\"")]
    InvalidActionName {
        /// Namespace of the model being built
        namespace: String,
        /// The rejected name
        name: String,
    },

    /// A name was declared both as a reducer and as an effect
    #[error("Duplicate action names {duplicates:?}; reducers and effects declared: {names:?}")]
    DuplicateActionName {
        /// Names found in both sets
        duplicates: Vec<String>,
        /// Reducer names followed by effect names, in declaration order
        names: Vec<String>,
    },

    /// A blocking effect overrides an effect that does not exist
    #[error("Blocking effect \"{name}\" has no matching effect; effects declared: {effects:?}")]
    OrphanBlockingEffect {
        /// The orphaned blocking-effect name
        name: String,
        /// Effect names that exist
        effects: Vec<String>,
    },

    /// Action creator invoked before the model was combined into a store
    #[error("Model \"{namespace}\" is not registered with a store; combine its reducers first")]
    NotStoreInitialized {
        /// Namespace of the model
        namespace: String,
    },

    /// Effect action creator invoked before the model was handed to the root supervisor
    #[error("Model \"{namespace}\" is not registered with the effect scheduler; start the root supervisor first")]
    NotSchedulerInitialized {
        /// Namespace of the model
        namespace: String,
    },

    /// Payload was not a key-value record
    #[error("Payload for \"{action_type}\" must be an object, got {found}")]
    InvalidPayload {
        /// Action type being built
        action_type: String,
        /// Kind of value that was supplied
        found: String,
    },

    /// Action reached an effect watcher without completion internals
    #[error("Action \"{action_type}\" carries no resolve/reject internals; dispatch it through bound action creators")]
    NonCompatibleAction {
        /// Type of the raw action
        action_type: String,
    },

    /// Lookup of a reducer/effect name that the model does not declare
    #[error("\"{name}\" is not a reducer or effect of \"{namespace}\"; valid names: {}", .valid.join(", "))]
    UndefinedReducerOrEffect {
        /// Namespace searched
        namespace: String,
        /// Name requested
        name: String,
        /// Names that exist
        valid: Vec<String>,
    },

    /// Lookup of a selector name that the model does not declare
    #[error("\"{name}\" is not a selector of \"{namespace}\"; valid selectors: {}", .valid.join(", "))]
    UndefinedSelector {
        /// Namespace searched
        namespace: String,
        /// Name requested
        name: String,
        /// Names that exist
        valid: Vec<String>,
    },

    /// Lookup of a namespace that is not part of the connected models
    #[error("\"{name}\" is not a connected namespace; valid namespaces: {}", .valid.join(", "))]
    UndefinedNamespace {
        /// Namespace requested
        name: String,
        /// Namespaces that exist
        valid: Vec<String>,
    },

    /// Capability requested outside the set granted to this kind of effect
    #[error("\"{name}\" is not available to {scope}; valid capabilities: {}", .valid.join(", "))]
    UndefinedEffectCapability {
        /// Which capability set was searched
        scope: String,
        /// Capability requested
        name: String,
        /// Capabilities that exist in the set
        valid: Vec<String>,
    },

    /// Two combined models share a namespace
    #[error("Duplicate namespace among combined models: {namespaces:?}")]
    DuplicateNamespace {
        /// Every namespace in combine order
        namespaces: Vec<String>,
    },

    /// A namespace is used both as a model and as a parent of another model
    #[error("Namespace \"{namespace}\" is both a model and a parent of \"{nested}\"")]
    NamespaceConflict {
        /// The namespace used as a leaf
        namespace: String,
        /// The namespace nested below it
        nested: String,
    },

    /// Default prop merge found the same key in more than one source
    #[error("Conflicting prop keys; own: {own:?}, state: {state:?}, dispatch: {dispatch:?}")]
    KeyConflict {
        /// Conflicting keys found in own props
        own: Vec<String>,
        /// Conflicting keys found in mapped state props
        state: Vec<String>,
        /// Conflicting keys found in mapped dispatch props
        dispatch: Vec<String>,
    },

    /// Pending completion settled because its effect will not run to the end
    #[error("Effect \"{action_type}\" was cancelled: {reason}")]
    CancelledEffect {
        /// Action type of the trigger
        action_type: String,
        /// Why it was cancelled
        reason: CancelReason,
    },

    /// Entity schema field declaration is neither a model nor a single-element list of one
    #[error("Invalid field \"{field}\" on entity \"{entity}\": {reason}")]
    InvalidEntityField {
        /// Entity namespace
        entity: String,
        /// Field name
        field: String,
        /// What was wrong with it
        reason: String,
    },

    /// Entity namespace that the schema does not know
    #[error("Unknown entity \"{name}\"; known entities: {}", .valid.join(", "))]
    UnknownEntity {
        /// Entity requested
        name: String,
        /// Entities that exist
        valid: Vec<String>,
    },

    /// Scope that the entity does not declare
    #[error("Entity \"{entity}\" has no scope \"{scope}\"; valid scopes: {}", .valid.join(", "))]
    UndefinedScope {
        /// Entity namespace
        entity: String,
        /// Scope requested
        scope: String,
        /// Scopes that exist
        valid: Vec<String>,
    },

    /// Entity object without a usable id attribute
    #[error("Entity \"{entity}\" item has no usable \"{attribute}\" attribute")]
    MissingEntityId {
        /// Entity namespace
        entity: String,
        /// Id attribute name
        attribute: String,
    },

    /// Entity reducer payload that cannot be interpreted
    #[error("Invalid entity command: {0}")]
    InvalidEntityCommand(String),
}

/// Result type for model operations
pub type ModelResult<T> = Result<T, ModelError>;

impl ModelError {
    /// Errors raised while building a model or schema
    pub fn is_construction_error(&self) -> bool {
        matches!(
            self,
            ModelError::NonStringNamespace { .. }
                | ModelError::EmptyNamespace
                | ModelError::InvalidNamespace { .. }
                | ModelError::InvalidActionName { .. }
                | ModelError::DuplicateActionName { .. }
                | ModelError::OrphanBlockingEffect { .. }
                | ModelError::InvalidEntityField { .. }
        )
    }

    /// Errors raised by a name-checked lookup
    pub fn is_lookup_error(&self) -> bool {
        matches!(
            self,
            ModelError::UndefinedReducerOrEffect { .. }
                | ModelError::UndefinedSelector { .. }
                | ModelError::UndefinedNamespace { .. }
                | ModelError::UndefinedEffectCapability { .. }
                | ModelError::UnknownEntity { .. }
                | ModelError::UndefinedScope { .. }
        )
    }

    /// Errors raised because the model was not registered yet
    pub fn is_initialization_error(&self) -> bool {
        matches!(
            self,
            ModelError::NotStoreInitialized { .. } | ModelError::NotSchedulerInitialized { .. }
        )
    }
}

/// Failure of an effect, shared between the awaiting caller and the supervisor.
///
/// Cloning is cheap; every clone refers to the same underlying error.
#[derive(Clone)]
pub struct EffectError(Arc<anyhow::Error>);

impl EffectError {
    /// Wrap any error
    pub fn new(err: impl Into<anyhow::Error>) -> Self {
        Self(Arc::new(err.into()))
    }

    /// The wrapped error
    pub fn inner(&self) -> &anyhow::Error {
        &self.0
    }

    /// Downcast to the concrete error the effect raised
    pub fn downcast_ref<E>(&self) -> Option<&E>
    where
        E: fmt::Display + fmt::Debug + Send + Sync + 'static,
    {
        self.0.downcast_ref::<E>()
    }

    /// The model error, when the failure came from this crate
    pub fn model_error(&self) -> Option<&ModelError> {
        self.downcast_ref::<ModelError>()
    }

    /// True if both handles refer to the same failure
    pub fn same_as(&self, other: &EffectError) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

impl fmt::Display for EffectError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&*self.0, f)
    }
}

impl fmt::Debug for EffectError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(&*self.0, f)
    }
}

impl std::error::Error for EffectError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.0.source()
    }
}

impl From<anyhow::Error> for EffectError {
    fn from(err: anyhow::Error) -> Self {
        Self::new(err)
    }
}

impl From<ModelError> for EffectError {
    fn from(err: ModelError) -> Self {
        Self::new(err)
    }
}
