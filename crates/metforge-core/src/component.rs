//! Pipeline component interfaces
//!
//! The business leaves built by factories: transformers rewrite bulletins,
//! predicates decide whether a transformer or action applies, and post
//! actions publish or archive the result. Implementations are shared between
//! worker tasks, so every trait requires `Send + Sync`.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// One aviation weather message
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Bulletin {
    /// Message kind, e.g. METAR, TAF or SIGMET
    pub kind: String,
    /// ICAO station identifier
    pub station: String,
    /// Issue time group as it appears in the message
    pub issued: String,
    /// Full message text
    pub text: String,
    /// Name of the file the message was read from
    pub source: String,
}

/// Rewrites a bulletin
pub trait MessageTransformer: Send + Sync {
    /// Produce the transformed bulletin
    fn transform(&self, bulletin: Bulletin) -> Bulletin;
}

/// Decides whether a stage applies to a bulletin
pub trait ActivationPredicate: Send + Sync {
    /// Whether the stage is active for `bulletin`
    fn is_active(&self, bulletin: &Bulletin) -> bool;
}

/// Side effect run on every processed bulletin
pub trait PostAction: Send + Sync {
    /// Run the action
    fn apply(&self, bulletin: &Bulletin) -> Result<(), ActionError>;
}

/// Failure of a [`PostAction`]
#[derive(Error, Debug)]
pub enum ActionError {
    /// Filesystem failure
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Any other failure reported by the action
    #[error("action '{action}' failed: {message}")]
    Failed {
        /// Action name
        action: String,
        /// What went wrong
        message: String,
    },
}
