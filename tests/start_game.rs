#![allow(non_snake_case)]
use crypto_wordle::{
    error::{
        ActionError,
        ActionKind,
        RemoteError,
    },
    session::{
        Action,
        Phase,
        Session,
        Status,
    },
    test_helpers::*,
};
use ethers::types::U256;

#[tokio::test]
async fn start_game__loads_word_multiplier_and_balance() {
    // given
    let contract = ScriptedContract::new("APPLE");
    contract.set_multiplier(U256::from(100u64));
    contract.set_balance(U256::from(5u64));

    // when
    let session = settle(&contract, &Session::new(), Action::RequestStart).await;

    // then
    assert_eq!(*session.phase(), Phase::Active);
    assert_eq!(session.target_word(), "APPLE");
    assert_eq!(session.attempts_remaining(), 5);
    assert_eq!(session.initial_attempts(), 5);
    assert!(!session.difficulty_locked());
    assert_eq!(*session.status(), Status::Started);
    assert_eq!(session.multiplier().to_string(), "1");
    assert_eq!(
        session.contract_balance(),
        Some(U256::from(5u64) + crypto_wordle::contract::default_entry_fee())
    );
}

#[tokio::test]
async fn start_game__declined_signature_stays_idle() {
    // given
    let session = Session::new();

    // when
    let session = decline(&session, Action::RequestStart);

    // then
    assert_eq!(*session.phase(), Phase::Idle);
    assert_eq!(*session.status(), Status::Failed(ActionError::UserDeclined));
    assert_eq!(session.attempts_remaining(), 5);
    assert!(session.guesses().is_empty());
    assert!(!session.is_busy());
    assert_ne!(
        session.status().to_string(),
        Status::Failed(ActionError::from_remote(
            ActionKind::Start,
            RemoteError::new("boom")
        ))
        .to_string()
    );
}

#[tokio::test]
async fn start_game__remote_failure_is_reported_without_starting() {
    // given
    let contract = ScriptedContract::new("APPLE");
    contract.fail_next(
        Method::StartGame,
        RemoteError::with_code(-32000, "insufficient funds for gas * price + value"),
    );

    // when
    let session = settle(&contract, &Session::new(), Action::RequestStart).await;

    // then
    assert_eq!(*session.phase(), Phase::Idle);
    assert!(matches!(
        session.status(),
        Status::Failed(ActionError::Remote {
            action: ActionKind::Start,
            ..
        })
    ));
    assert_eq!(contract.calls(), vec![Method::StartGame]);
}

#[tokio::test]
async fn start_game__new_game_after_a_loss_resets_everything() {
    // given
    let contract = ScriptedContract::new("CRANE");
    let mut session = settle(&contract, &Session::new(), Action::RequestStart).await;
    for word in ["APPLE", "GRAPE", "LEMON", "MANGO", "PEACH"] {
        session = settle(&contract, &session, Action::SubmitGuess(word.into())).await;
    }
    assert!(matches!(session.phase(), Phase::Lost { .. }));
    contract.set_word("HONEY");

    // when
    let session = settle(&contract, &session, Action::RequestStart).await;

    // then
    assert_eq!(*session.phase(), Phase::Active);
    assert_eq!(session.target_word(), "HONEY");
    assert!(session.guesses().is_empty());
    assert_eq!(session.attempts_remaining(), 5);
    assert!(!session.difficulty_locked());
}

#[tokio::test]
async fn start_game__cannot_restart_an_active_game() {
    // given
    let contract = ScriptedContract::new("APPLE");
    let session = settle(&contract, &Session::new(), Action::RequestStart).await;

    // when
    let transition = session.reduce(Action::RequestStart);

    // then
    assert_eq!(transition.command, None);
    assert_eq!(*transition.session.phase(), Phase::Active);
    assert_eq!(contract.calls().iter().filter(|m| **m == Method::StartGame).count(), 1);
}

#[tokio::test]
async fn start_game__empty_word_from_contract_does_not_start_and_can_be_retried() {
    // given
    let contract = ScriptedContract::new("");

    // when
    let session = settle(&contract, &Session::new(), Action::RequestStart).await;

    // then
    assert_eq!(*session.phase(), Phase::Idle);
    assert!(session.status().to_string().contains("returned no word"));
    assert!(!session.is_busy());

    contract.set_word("APPLE");
    let retried = settle(&contract, &session, Action::RequestStart).await;
    assert_eq!(*retried.phase(), Phase::Active);
    assert_eq!(retried.word_length(), 5);
}
