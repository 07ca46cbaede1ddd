//! # Commands
//!
//! Commands are the way the shared state of the document is modified in an undoable way. Every command goes
//! through the same three steps, `Fresh -> Executed -> (Undone <-> Executed)*`, and only ever in that order.
//! Calling a step out of order is a bug in the caller: it asserts in debug builds, and is refused with
//! [`CommandError::OutOfSequence`] otherwise.
//!
//! Commands hold the ids of their targets rather than references, and look them up again on every step. Undo
//! and redo may tear down and rebuild objects, but rebuilt objects keep their ids.

pub mod add_cel;
pub mod copy_region;

pub use add_cel::{AddCel, RemoveCel};
pub use copy_region::CopyRegion;

use crate::state::{document::Document, Frame};

#[derive(thiserror::Error, Debug)]
pub enum CommandError {
    #[error("command constructed for a state that does not match the current state")]
    MismatchedState,
    #[error("resource referenced by the command is not found")]
    UnknownResource,
    #[error("{0} already has a cel")]
    FrameOccupied(Frame),
    #[error("source and destination pixel formats differ")]
    FormatMismatch,
    #[error("cannot {step} a command that is {state}")]
    OutOfSequence { state: CommandState, step: Step },
    #[error("failed to write snapshot")]
    Snapshot(#[from] std::io::Error),
    #[error("failed to read snapshot")]
    Decode(#[from] crate::io::DecodeError),
}

#[derive(Copy, Clone, PartialEq, Eq, Hash, Debug, strum::Display)]
#[strum(serialize_all = "lowercase")]
pub enum CommandState {
    Fresh,
    Executed,
    Undone,
}

#[derive(Copy, Clone, PartialEq, Eq, Hash, Debug, strum::Display)]
#[strum(serialize_all = "lowercase")]
pub enum Step {
    Execute,
    Undo,
    Redo,
}
impl Step {
    /// The only state this step may be taken from.
    #[must_use]
    pub fn valid_from(self) -> CommandState {
        match self {
            Self::Execute => CommandState::Fresh,
            Self::Undo => CommandState::Executed,
            Self::Redo => CommandState::Undone,
        }
    }
    /// The state after this step succeeds.
    #[must_use]
    pub fn leads_to(self) -> CommandState {
        match self {
            Self::Execute | Self::Redo => CommandState::Executed,
            Self::Undo => CommandState::Undone,
        }
    }
}

/// The part of a command that actually touches the document. Sequencing is checked before this is reached.
trait Apply {
    /// Apply a single step. If this generates an error, the document should *not* be observably changed.
    fn apply(&mut self, document: &mut Document, step: Step) -> Result<(), CommandError>;
}

#[derive(Debug)]
pub enum Command {
    AddCel(AddCel),
    RemoveCel(RemoveCel),
    CopyRegion(CopyRegion),
}
impl From<AddCel> for Command {
    fn from(value: AddCel) -> Self {
        Self::AddCel(value)
    }
}
impl From<RemoveCel> for Command {
    fn from(value: RemoveCel) -> Self {
        Self::RemoveCel(value)
    }
}
impl From<CopyRegion> for Command {
    fn from(value: CopyRegion) -> Self {
        Self::CopyRegion(value)
    }
}
impl Command {
    #[must_use]
    pub fn state(&self) -> CommandState {
        match self {
            Self::AddCel(c) => c.state,
            Self::RemoveCel(c) => c.state,
            Self::CopyRegion(c) => c.state,
        }
    }
    fn state_mut(&mut self) -> &mut CommandState {
        match self {
            Self::AddCel(c) => &mut c.state,
            Self::RemoveCel(c) => &mut c.state,
            Self::CopyRegion(c) => &mut c.state,
        }
    }
    /// Human readable name, for undo/redo menus and the like.
    #[must_use]
    pub fn label(&self) -> &'static str {
        match self {
            Self::AddCel(_) => "Add Cel",
            Self::RemoveCel(_) => "Remove Cel",
            Self::CopyRegion(_) => "Copy Region",
        }
    }
    pub fn execute(&mut self, document: &mut Document) -> Result<(), CommandError> {
        self.step(document, Step::Execute)
    }
    pub fn undo(&mut self, document: &mut Document) -> Result<(), CommandError> {
        self.step(document, Step::Undo)
    }
    pub fn redo(&mut self, document: &mut Document) -> Result<(), CommandError> {
        self.step(document, Step::Redo)
    }
    fn step(&mut self, document: &mut Document, step: Step) -> Result<(), CommandError> {
        let state = self.state();
        if state != step.valid_from() {
            debug_assert!(false, "cannot {step} {} while {state}", self.label());
            log::error!("refusing to {step} {} while {state}", self.label());
            return Err(CommandError::OutOfSequence { state, step });
        }
        let result = match self {
            Self::AddCel(c) => c.apply(document, step),
            Self::RemoveCel(c) => c.apply(document, step),
            Self::CopyRegion(c) => c.apply(document, step),
        };
        match result {
            Ok(()) => {
                log::trace!("{step} {}", self.label());
                *self.state_mut() = step.leads_to();
                Ok(())
            }
            Err(err) => {
                log::warn!("failed to {step} {}: {err}", self.label());
                Err(err)
            }
        }
    }
}
