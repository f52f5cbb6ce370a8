//! Client-side game session and its transition rules.
//!
//! A [`Session`] is an immutable value. [`Session::reduce`] applies one
//! [`Action`] and returns the next session together with the remote
//! [`Command`] the shell has to run, if any. Remote outcomes come back as
//! `*Settled` actions carrying the [`Ticket`] they were issued under; outcomes
//! for any other ticket are dropped.

use crate::{
    error::{
        ActionError,
        ActionKind,
        RemoteError,
        ValidationError,
    },
    grading::{
        Grade,
        grade,
    },
};
use ethers::types::U256;
use std::fmt;

pub const INITIAL_ATTEMPTS: i8 = 5;
/// Remaining attempts may not drop below this through a difficulty increase.
pub const ESCALATION_FLOOR: i8 = 4;
pub const LOST_ATTEMPTS: i8 = -1;

/// Generation of a session. Bumped on every started game.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Hash, Ord, PartialOrd)]
pub struct Ticket(u64);

impl Ticket {
    pub fn next(self) -> Self {
        Ticket(self.0.wrapping_add(1))
    }
}

/// Reward multiplier in hundredths, as reported by the contract.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Ord, PartialOrd)]
pub struct RewardMultiplier(u64);

impl RewardMultiplier {
    pub fn from_hundredths(hundredths: u64) -> Self {
        Self(hundredths)
    }

    pub fn from_remote(raw: U256) -> Self {
        if raw > U256::from(u64::MAX) {
            Self(u64::MAX)
        } else {
            Self(raw.as_u64())
        }
    }

    pub fn hundredths(self) -> u64 {
        self.0
    }

    pub fn is_set(self) -> bool {
        self.0 > 0
    }
}

impl fmt::Display for RewardMultiplier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let whole = self.0 / 100;
        let frac = self.0 % 100;
        if frac == 0 {
            write!(f, "{whole}")
        } else if frac % 10 == 0 {
            write!(f, "{whole}.{}", frac / 10)
        } else {
            write!(f, "{whole}.{frac:02}")
        }
    }
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub enum Phase {
    Idle,
    AwaitingStart { resume: Box<Phase> },
    Active,
    Won,
    Lost { revealed: String },
}

impl Phase {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Phase::Won | Phase::Lost { .. })
    }
}

/// A mutating call dispatched for the active game and not yet settled.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum Pending {
    Guess(String),
    Escalation,
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub enum Status {
    Welcome,
    AwaitingSignature,
    Started,
    Checking,
    Correct,
    Incorrect,
    GameOver { answer: String },
    Escalated { multiplier: RewardMultiplier },
    Failed(ActionError),
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Status::Welcome => {
                write!(f, "Press Ctrl+N to pay the entry fee and start a game.")
            }
            Status::AwaitingSignature => {
                write!(f, "Requesting signature... confirm the transaction.")
            }
            Status::Started => write!(f, "The game started successfully!"),
            Status::Checking => write!(f, "Checking your answer, please wait."),
            Status::Correct => write!(f, "Correct!"),
            Status::Incorrect => write!(f, "Wrong answer!"),
            Status::GameOver { answer } => {
                write!(f, "Game over, the answer was ({answer}).")
            }
            Status::Escalated { multiplier } => write!(
                f,
                "One attempt fewer, but the reward is now {multiplier}x the entry fee!"
            ),
            Status::Failed(err) => write!(f, "{err}"),
        }
    }
}

/// What `startGame` and its follow-up reads produced.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct StartReceipt {
    pub target_word: String,
    /// `None` when the multiplier read failed.
    pub multiplier: Option<RewardMultiplier>,
    /// `None` when the balance read failed.
    pub balance: Option<U256>,
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct EscalationReceipt {
    /// `None` when the multiplier read-back failed.
    pub multiplier: Option<RewardMultiplier>,
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub enum Action {
    RequestStart,
    StartSettled {
        ticket: Ticket,
        outcome: Result<StartReceipt, RemoteError>,
    },
    SubmitGuess(String),
    GuessSettled {
        ticket: Ticket,
        outcome: Result<(), RemoteError>,
    },
    IncreaseDifficulty,
    EscalationSettled {
        ticket: Ticket,
        outcome: Result<EscalationReceipt, RemoteError>,
    },
    RefreshBalance,
    BalanceFetched {
        ticket: Ticket,
        outcome: Result<U256, RemoteError>,
    },
}

/// Remote work requested by a transition.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum Command {
    StartGame { ticket: Ticket },
    Guess { ticket: Ticket, word: String },
    Escalate { ticket: Ticket },
    FetchBalance { ticket: Ticket },
}

impl Command {
    /// Whether the command sends a transaction the player has to sign.
    pub fn is_mutating(&self) -> bool {
        !matches!(self, Command::FetchBalance { .. })
    }

    pub fn ticket(&self) -> Ticket {
        match self {
            Command::StartGame { ticket }
            | Command::Guess { ticket, .. }
            | Command::Escalate { ticket }
            | Command::FetchBalance { ticket } => *ticket,
        }
    }

    /// Settlement used when the player refuses to sign the command.
    pub fn declined(&self) -> Action {
        let error = RemoteError::user_declined();
        match self {
            Command::StartGame { ticket } => Action::StartSettled {
                ticket: *ticket,
                outcome: Err(error),
            },
            Command::Guess { ticket, .. } => Action::GuessSettled {
                ticket: *ticket,
                outcome: Err(error),
            },
            Command::Escalate { ticket } => Action::EscalationSettled {
                ticket: *ticket,
                outcome: Err(error),
            },
            Command::FetchBalance { ticket } => Action::BalanceFetched {
                ticket: *ticket,
                outcome: Err(error),
            },
        }
    }
}

#[derive(Clone, Debug)]
pub struct Transition {
    pub session: Session,
    pub command: Option<Command>,
}

impl Transition {
    fn stay(session: Session) -> Self {
        Self {
            session,
            command: None,
        }
    }

    fn run(session: Session, command: Command) -> Self {
        Self {
            session,
            command: Some(command),
        }
    }
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Session {
    phase: Phase,
    target_word: String,
    attempts_remaining: i8,
    initial_attempts: i8,
    guesses: Vec<String>,
    multiplier: RewardMultiplier,
    difficulty_locked: bool,
    status: Status,
    contract_balance: Option<U256>,
    pending: Option<Pending>,
    ticket: Ticket,
}

impl Default for Session {
    fn default() -> Self {
        Self::new()
    }
}

impl Session {
    pub fn new() -> Self {
        Self {
            phase: Phase::Idle,
            target_word: String::new(),
            attempts_remaining: INITIAL_ATTEMPTS,
            initial_attempts: INITIAL_ATTEMPTS,
            guesses: Vec::new(),
            multiplier: RewardMultiplier::default(),
            difficulty_locked: true,
            status: Status::Welcome,
            contract_balance: None,
            pending: None,
            ticket: Ticket::default(),
        }
    }

    /// `startNewGame`: the wholesale replacement after a confirmed start.
    fn started(&self, ticket: Ticket, receipt: StartReceipt) -> Self {
        Self {
            phase: Phase::Active,
            target_word: receipt.target_word,
            attempts_remaining: INITIAL_ATTEMPTS,
            initial_attempts: INITIAL_ATTEMPTS,
            guesses: Vec::new(),
            multiplier: receipt.multiplier.unwrap_or_default(),
            difficulty_locked: false,
            status: Status::Started,
            contract_balance: receipt.balance.or(self.contract_balance),
            pending: None,
            ticket,
        }
    }

    pub fn phase(&self) -> &Phase {
        &self.phase
    }

    pub fn target_word(&self) -> &str {
        &self.target_word
    }

    pub fn attempts_remaining(&self) -> i8 {
        self.attempts_remaining
    }

    pub fn initial_attempts(&self) -> i8 {
        self.initial_attempts
    }

    pub fn guesses(&self) -> &[String] {
        &self.guesses
    }

    pub fn multiplier(&self) -> RewardMultiplier {
        self.multiplier
    }

    pub fn difficulty_locked(&self) -> bool {
        self.difficulty_locked
    }

    pub fn status(&self) -> &Status {
        &self.status
    }

    pub fn contract_balance(&self) -> Option<U256> {
        self.contract_balance
    }

    pub fn pending(&self) -> Option<&Pending> {
        self.pending.as_ref()
    }

    pub fn pending_guess(&self) -> Option<&str> {
        match &self.pending {
            Some(Pending::Guess(word)) => Some(word),
            _ => None,
        }
    }

    pub fn ticket(&self) -> Ticket {
        self.ticket
    }

    /// True while a mutating call is in flight.
    pub fn is_busy(&self) -> bool {
        self.pending.is_some() || matches!(self.phase, Phase::AwaitingStart { .. })
    }

    pub fn can_submit(&self) -> bool {
        self.phase == Phase::Active && !self.is_busy()
    }

    /// Letter count of the target word.
    pub fn word_length(&self) -> usize {
        self.target_word.chars().count()
    }

    /// Display-only grading of every confirmed guess.
    pub fn graded_rows(&self) -> Vec<Vec<(char, Grade)>> {
        self.guesses
            .iter()
            .map(|guess| {
                guess
                    .chars()
                    .zip(grade(guess, &self.target_word))
                    .collect()
            })
            .collect()
    }

    fn escalation_floor_reached(&self) -> bool {
        self.attempts_remaining - 1 < ESCALATION_FLOOR
    }

    fn rejected(&self, error: impl Into<ActionError>) -> Transition {
        let mut next = self.clone();
        next.status = Status::Failed(error.into());
        Transition::stay(next)
    }

    fn ignored(&self) -> Transition {
        Transition::stay(self.clone())
    }

    pub fn reduce(&self, action: Action) -> Transition {
        match action {
            Action::RequestStart => self.request_start(),
            Action::StartSettled { ticket, outcome } => {
                self.start_settled(ticket, outcome)
            }
            Action::SubmitGuess(word) => self.submit_guess(word),
            Action::GuessSettled { ticket, outcome } => {
                self.guess_settled(ticket, outcome)
            }
            Action::IncreaseDifficulty => self.increase_difficulty(),
            Action::EscalationSettled { ticket, outcome } => {
                self.escalation_settled(ticket, outcome)
            }
            Action::RefreshBalance => Transition::run(
                self.clone(),
                Command::FetchBalance {
                    ticket: self.ticket,
                },
            ),
            Action::BalanceFetched { ticket, outcome } => {
                if ticket != self.ticket {
                    return self.ignored();
                }
                let mut next = self.clone();
                if let Ok(balance) = outcome {
                    next.contract_balance = Some(balance);
                }
                Transition::stay(next)
            }
        }
    }

    fn request_start(&self) -> Transition {
        if self.is_busy() {
            return self.rejected(ValidationError::Busy);
        }
        if self.phase == Phase::Active {
            return self.rejected(ValidationError::StartNotAllowed);
        }
        let mut next = self.clone();
        next.phase = Phase::AwaitingStart {
            resume: Box::new(self.phase.clone()),
        };
        next.status = Status::AwaitingSignature;
        Transition::run(
            next,
            Command::StartGame {
                ticket: self.ticket.next(),
            },
        )
    }

    fn start_settled(
        &self,
        ticket: Ticket,
        outcome: Result<StartReceipt, RemoteError>,
    ) -> Transition {
        let Phase::AwaitingStart { resume } = &self.phase else {
            return self.ignored();
        };
        if ticket != self.ticket.next() {
            return self.ignored();
        }
        match outcome {
            Ok(receipt) => Transition::stay(self.started(ticket, receipt)),
            Err(error) => {
                let mut next = self.clone();
                next.phase = (**resume).clone();
                next.status =
                    Status::Failed(ActionError::from_remote(ActionKind::Start, error));
                Transition::stay(next)
            }
        }
    }

    fn submit_guess(&self, word: String) -> Transition {
        if self.is_busy() {
            return self.rejected(ValidationError::Busy);
        }
        if self.phase != Phase::Active {
            return self.rejected(ValidationError::NotActive);
        }
        if word.is_empty() {
            return self.rejected(ValidationError::EmptyGuess);
        }
        let expected = self.word_length();
        if word.chars().count() != expected {
            return self.rejected(ValidationError::WrongLength { expected });
        }
        let mut next = self.clone();
        next.pending = Some(Pending::Guess(word.clone()));
        next.status = Status::Checking;
        Transition::run(
            next,
            Command::Guess {
                ticket: self.ticket,
                word,
            },
        )
    }

    fn guess_settled(
        &self,
        ticket: Ticket,
        outcome: Result<(), RemoteError>,
    ) -> Transition {
        if ticket != self.ticket {
            return self.ignored();
        }
        let Some(Pending::Guess(word)) = &self.pending else {
            return self.ignored();
        };
        let mut next = self.clone();
        next.pending = None;
        if let Err(error) = outcome {
            next.status =
                Status::Failed(ActionError::from_remote(ActionKind::Guess, error));
            return Transition::stay(next);
        }

        next.guesses.push(word.clone());
        next.attempts_remaining -= 1;
        if next.escalation_floor_reached() {
            next.difficulty_locked = true;
        }

        let balance = Command::FetchBalance { ticket };
        if *word == next.target_word {
            next.phase = Phase::Won;
            next.difficulty_locked = true;
            next.status = Status::Correct;
            Transition::run(next, balance)
        } else if next.attempts_remaining <= 0 {
            next.phase = Phase::Lost {
                revealed: next.target_word.clone(),
            };
            next.attempts_remaining = LOST_ATTEMPTS;
            next.difficulty_locked = true;
            next.status = Status::GameOver {
                answer: next.target_word.clone(),
            };
            Transition::run(next, balance)
        } else {
            next.status = Status::Incorrect;
            Transition::stay(next)
        }
    }

    fn increase_difficulty(&self) -> Transition {
        if self.is_busy() {
            return self.rejected(ValidationError::Busy);
        }
        if self.phase != Phase::Active {
            return self.rejected(ValidationError::NotActive);
        }
        if self.difficulty_locked || self.escalation_floor_reached() {
            let mut next = self.clone();
            next.difficulty_locked = true;
            next.status = Status::Failed(ValidationError::EscalationLocked.into());
            return Transition::stay(next);
        }
        let mut next = self.clone();
        next.pending = Some(Pending::Escalation);
        next.status = Status::AwaitingSignature;
        Transition::run(
            next,
            Command::Escalate {
                ticket: self.ticket,
            },
        )
    }

    fn escalation_settled(
        &self,
        ticket: Ticket,
        outcome: Result<EscalationReceipt, RemoteError>,
    ) -> Transition {
        if ticket != self.ticket || self.pending != Some(Pending::Escalation) {
            return self.ignored();
        }
        let mut next = self.clone();
        next.pending = None;
        match outcome {
            Ok(receipt) => {
                next.attempts_remaining -= 1;
                next.initial_attempts -= 1;
                if let Some(multiplier) = receipt.multiplier {
                    next.multiplier = multiplier;
                }
                if next.escalation_floor_reached() {
                    next.difficulty_locked = true;
                }
                next.status = Status::Escalated {
                    multiplier: next.multiplier,
                };
            }
            Err(error) => {
                next.status = Status::Failed(ActionError::from_remote(
                    ActionKind::Escalation,
                    error,
                ));
            }
        }
        Transition::stay(next)
    }
}
