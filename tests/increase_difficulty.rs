#![allow(non_snake_case)]
use crypto_wordle::{
    error::{
        ActionError,
        ActionKind,
        RemoteError,
        ValidationError,
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

async fn started(contract: &ScriptedContract) -> Session {
    settle(contract, &Session::new(), Action::RequestStart).await
}

#[tokio::test]
async fn increase_difficulty__trades_an_attempt_for_a_bigger_multiplier() {
    // given
    let contract = ScriptedContract::new("APPLE");
    contract.set_multiplier(U256::from(100u64));
    let session = started(&contract).await;

    // when
    let session = settle(&contract, &session, Action::IncreaseDifficulty).await;

    // then
    assert_eq!(session.attempts_remaining(), 4);
    assert_eq!(session.initial_attempts(), 4);
    assert_eq!(session.multiplier().to_string(), "1.5");
    assert!(session.difficulty_locked());
    assert!(session.status().to_string().contains("1.5x"));
    assert_eq!(
        &contract.calls()[4..],
        [Method::ReduceAttempts, Method::RewardMultiplier]
    );
}

#[tokio::test]
async fn increase_difficulty__only_once_per_game() {
    // given
    let contract = ScriptedContract::new("APPLE");
    let session = started(&contract).await;
    let session = settle(&contract, &session, Action::IncreaseDifficulty).await;

    // when
    let again = session.reduce(Action::IncreaseDifficulty);

    // then
    assert_eq!(again.command, None);
    assert_eq!(
        *again.session.status(),
        Status::Failed(ValidationError::EscalationLocked.into())
    );
    assert_eq!(again.session.attempts_remaining(), 4);
}

#[tokio::test]
async fn increase_difficulty__locked_after_the_first_guess() {
    // given
    let contract = ScriptedContract::new("APPLE");
    let session = started(&contract).await;
    let session = settle(&contract, &session, Action::SubmitGuess("GRAPE".into())).await;

    // when
    let transition = session.reduce(Action::IncreaseDifficulty);

    // then
    assert!(session.difficulty_locked());
    assert_eq!(transition.command, None);
}

#[tokio::test]
async fn increase_difficulty__remote_failure_keeps_attempts_and_lock() {
    // given
    let contract = ScriptedContract::new("APPLE");
    let session = started(&contract).await;
    contract.fail_next(Method::ReduceAttempts, RemoteError::new("execution reverted"));

    // when
    let after = settle(&contract, &session, Action::IncreaseDifficulty).await;

    // then
    assert!(matches!(
        after.status(),
        Status::Failed(ActionError::Remote {
            action: ActionKind::Escalation,
            ..
        })
    ));
    assert_eq!(after.attempts_remaining(), 5);
    assert!(!after.difficulty_locked());
    assert_eq!(*after.phase(), Phase::Active);
}

#[tokio::test]
async fn increase_difficulty__escalated_game_is_lost_after_four_misses() {
    // given
    let contract = ScriptedContract::new("CRANE");
    let session = started(&contract).await;
    let mut session = settle(&contract, &session, Action::IncreaseDifficulty).await;

    // when
    for word in ["APPLE", "GRAPE", "LEMON", "MANGO"] {
        session = settle(&contract, &session, Action::SubmitGuess(word.into())).await;
    }

    // then
    assert!(matches!(session.phase(), Phase::Lost { .. }));
    assert_eq!(session.attempts_remaining(), -1);
}
