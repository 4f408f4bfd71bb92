//! Promise reaction records and the reaction job

use crate::capability::PromiseCapability;
use crate::error::PromiseResult;
use crate::value::{Function, Value};

/// Which settlement a reaction answers to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReactionType {
    /// Runs when the promise fulfills
    Fulfill,
    /// Runs when the promise rejects
    Reject,
}

/// A reaction: downstream capability, optional handler, and disposition.
///
/// Immutable once built. A missing handler passes the settlement through
/// with its disposition preserved.
#[derive(Clone)]
pub struct PromiseReaction {
    capability: Option<PromiseCapability>,
    handler: Option<Function>,
    kind: ReactionType,
}

impl PromiseReaction {
    /// Create a reaction record
    pub fn new(
        capability: Option<PromiseCapability>,
        handler: Option<Function>,
        kind: ReactionType,
    ) -> Self {
        Self {
            capability,
            handler,
            kind,
        }
    }

    /// Capability receiving the outcome, if any
    pub fn capability(&self) -> Option<&PromiseCapability> {
        self.capability.as_ref()
    }

    /// Handler invoked with the settlement value, if any
    pub fn handler(&self) -> Option<&Function> {
        self.handler.as_ref()
    }

    /// Reaction type
    pub fn kind(&self) -> ReactionType {
        self.kind
    }
}

pub(crate) fn promise_reaction_job(reaction: PromiseReaction, argument: Value) -> PromiseResult<()> {
    let (outcome, should_reject) = match &reaction.handler {
        None => (argument, reaction.kind != ReactionType::Fulfill),
        Some(handler) => match handler.call(Value::Undefined, &[argument]) {
            Ok(value) => (value, false),
            Err(error) => (error.into_value(), true),
        },
    };

    let Some(capability) = reaction.capability else {
        return Ok(());
    };
    if should_reject {
        capability.reject(outcome)?;
    } else {
        capability.resolve(outcome)?;
    }
    Ok(())
}
