use std::fmt;
use thiserror::Error;

/// JSON-RPC error code a wallet returns when the user rejects a signature request.
pub const USER_DECLINED_CODE: i64 = 4001;

/// Failure reported by the contract client.
#[derive(Clone, Debug, Error, Eq, PartialEq)]
#[error("{message}")]
pub struct RemoteError {
    pub code: Option<i64>,
    pub message: String,
}

impl RemoteError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            code: None,
            message: message.into(),
        }
    }

    pub fn with_code(code: i64, message: impl Into<String>) -> Self {
        Self {
            code: Some(code),
            message: message.into(),
        }
    }

    pub fn user_declined() -> Self {
        Self::with_code(USER_DECLINED_CODE, "User denied transaction signature.")
    }

    pub fn is_user_declined(&self) -> bool {
        self.code == Some(USER_DECLINED_CODE)
    }
}

/// Rejections decided locally, before anything is sent to the contract.
#[derive(Clone, Debug, Error, Eq, PartialEq)]
pub enum ValidationError {
    #[error("Type a word before submitting.")]
    EmptyGuess,
    #[error("Your guess must be {expected} letters long!")]
    WrongLength { expected: usize },
    #[error("Still waiting on the previous transaction.")]
    Busy,
    #[error("No game in progress. Press Ctrl+N to start one.")]
    NotActive,
    #[error("Finish the current game before starting a new one.")]
    StartNotAllowed,
    #[error("Difficulty can no longer be increased in this game.")]
    EscalationLocked,
}

/// The user action a remote failure belongs to.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ActionKind {
    Start,
    Guess,
    Escalation,
    Balance,
}

impl fmt::Display for ActionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ActionKind::Start => "starting the game",
            ActionKind::Guess => "checking the answer",
            ActionKind::Escalation => "increasing the difficulty",
            ActionKind::Balance => "reading the contract balance",
        };
        write!(f, "{name}")
    }
}

#[derive(Clone, Debug, Error, Eq, PartialEq)]
pub enum ActionError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error("Transaction signature was declined. Please try again.")]
    UserDeclined,
    #[error("Something went wrong while {action}. Please try again later. ({error})")]
    Remote { action: ActionKind, error: RemoteError },
}

impl ActionError {
    pub fn from_remote(action: ActionKind, error: RemoteError) -> Self {
        if error.is_user_declined() {
            ActionError::UserDeclined
        } else {
            ActionError::Remote { action, error }
        }
    }
}
