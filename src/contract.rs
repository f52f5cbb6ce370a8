use crate::{
    error::RemoteError,
    session::{
        Action,
        Command,
        EscalationReceipt,
        RewardMultiplier,
        StartReceipt,
    },
};
use ethers::types::U256;
use std::future::Future;
use tracing::{
    info,
    warn,
};

/// Default entry fee: 0.1 of the chain's native unit, in wei.
pub fn default_entry_fee() -> U256 {
    U256::exp10(17)
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct TxReceipt {
    pub tx_hash: String,
}

/// The game contract, seen from one player.
///
/// The caller identity is bound when the client is built; every call is made
/// on behalf of that account.
pub trait ContractClient {
    /// `startGame`, paying `fee`.
    fn start_game(
        &self,
        fee: U256,
    ) -> impl Future<Output = Result<TxReceipt, RemoteError>> + Send;

    /// `getCurrentWord` for the caller's active game.
    fn current_word(&self) -> impl Future<Output = Result<String, RemoteError>> + Send;

    /// `guessWord`, records the guess on-chain.
    fn guess_word(
        &self,
        word: String,
    ) -> impl Future<Output = Result<TxReceipt, RemoteError>> + Send;

    /// `getContractBalance`, in wei.
    fn contract_balance(&self) -> impl Future<Output = Result<U256, RemoteError>> + Send;

    /// `getRewardMultiplier` in hundredths; zero means no multiplier.
    fn reward_multiplier(
        &self,
    ) -> impl Future<Output = Result<U256, RemoteError>> + Send;

    /// `reduceAttemptsAndChangeMultiplier`.
    fn reduce_attempts_and_change_multiplier(
        &self,
    ) -> impl Future<Output = Result<TxReceipt, RemoteError>> + Send;
}

/// Runs `command` against the contract and returns the settlement to feed
/// back into the session.
pub async fn execute<C: ContractClient + Sync>(
    client: &C,
    entry_fee: U256,
    command: Command,
) -> Action {
    match command {
        Command::StartGame { ticket } => Action::StartSettled {
            ticket,
            outcome: start(client, entry_fee).await,
        },
        Command::Guess { ticket, word } => {
            let outcome = match client.guess_word(word.clone()).await {
                Ok(receipt) => {
                    info!(%word, tx = %receipt.tx_hash, "guess recorded");
                    Ok(())
                }
                Err(e) => {
                    warn!(%word, error = %e, code = ?e.code, "guessWord failed");
                    Err(e)
                }
            };
            Action::GuessSettled { ticket, outcome }
        }
        Command::Escalate { ticket } => Action::EscalationSettled {
            ticket,
            outcome: escalate(client).await,
        },
        Command::FetchBalance { ticket } => {
            let outcome = client.contract_balance().await;
            if let Err(e) = &outcome {
                warn!(error = %e, "getContractBalance failed");
            }
            Action::BalanceFetched { ticket, outcome }
        }
    }
}

async fn start<C: ContractClient + Sync>(
    client: &C,
    entry_fee: U256,
) -> Result<StartReceipt, RemoteError> {
    let receipt = client.start_game(entry_fee).await.inspect_err(|e| {
        warn!(error = %e, code = ?e.code, "startGame failed");
    })?;
    info!(tx = %receipt.tx_hash, "game started");

    let target_word = client.current_word().await.map_err(|e| {
        warn!(error = %e, "getCurrentWord failed after startGame");
        RemoteError {
            code: e.code,
            message: format!("game started but the word could not be loaded: {e}"),
        }
    })?;
    if target_word.is_empty() {
        warn!("getCurrentWord returned an empty word after startGame");
        return Err(RemoteError::new(
            "game started but the contract returned no word",
        ));
    }
    let multiplier = fetch_multiplier(client).await;
    let balance = match client.contract_balance().await {
        Ok(balance) => Some(balance),
        Err(e) => {
            warn!(error = %e, "getContractBalance failed after startGame");
            None
        }
    };
    Ok(StartReceipt {
        target_word,
        multiplier,
        balance,
    })
}

async fn escalate<C: ContractClient + Sync>(
    client: &C,
) -> Result<EscalationReceipt, RemoteError> {
    let receipt = client
        .reduce_attempts_and_change_multiplier()
        .await
        .inspect_err(|e| {
            warn!(error = %e, code = ?e.code, "reduceAttemptsAndChangeMultiplier failed");
        })?;
    info!(tx = %receipt.tx_hash, "difficulty increased");
    Ok(EscalationReceipt {
        multiplier: fetch_multiplier(client).await,
    })
}

async fn fetch_multiplier<C: ContractClient + Sync>(
    client: &C,
) -> Option<RewardMultiplier> {
    match client.reward_multiplier().await {
        Ok(raw) => Some(RewardMultiplier::from_remote(raw)),
        Err(e) => {
            warn!(error = %e, "getRewardMultiplier failed");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    #![allow(non_snake_case)]
    use super::*;
    use crate::{
        session::Ticket,
        test_helpers::{
            Method,
            ScriptedContract,
        },
    };

    #[tokio::test]
    async fn execute__start_game_pays_fee_then_reads_word_multiplier_and_balance() {
        // given
        let contract = ScriptedContract::new("APPLE");
        contract.set_multiplier(U256::from(150u64));
        let ticket = Ticket::default().next();

        // when
        let action =
            execute(&contract, default_entry_fee(), Command::StartGame { ticket }).await;

        // then
        let Action::StartSettled {
            ticket: settled,
            outcome: Ok(receipt),
        } = action
        else {
            panic!("unexpected settlement {action:?}");
        };
        assert_eq!(settled, ticket);
        assert_eq!(receipt.target_word, "APPLE");
        assert_eq!(receipt.multiplier.map(|m| m.hundredths()), Some(150));
        assert_eq!(receipt.balance, Some(default_entry_fee()));
        assert_eq!(
            contract.calls(),
            vec![
                Method::StartGame,
                Method::CurrentWord,
                Method::RewardMultiplier,
                Method::ContractBalance
            ]
        );
    }

    #[tokio::test]
    async fn execute__declined_start_skips_follow_up_reads() {
        // given
        let contract = ScriptedContract::new("APPLE");
        contract.fail_next(Method::StartGame, RemoteError::user_declined());

        // when
        let action = execute(
            &contract,
            default_entry_fee(),
            Command::StartGame {
                ticket: Ticket::default(),
            },
        )
        .await;

        // then
        assert!(matches!(
            action,
            Action::StartSettled { outcome: Err(ref e), .. } if e.is_user_declined()
        ));
        assert_eq!(contract.calls(), vec![Method::StartGame]);
    }

    #[tokio::test]
    async fn execute__escalation_tolerates_failed_multiplier_read() {
        // given
        let contract = ScriptedContract::new("APPLE");
        contract.fail_next(Method::RewardMultiplier, RemoteError::new("timeout"));

        // when
        let action = execute(
            &contract,
            default_entry_fee(),
            Command::Escalate {
                ticket: Ticket::default(),
            },
        )
        .await;

        // then
        assert_eq!(
            action,
            Action::EscalationSettled {
                ticket: Ticket::default(),
                outcome: Ok(EscalationReceipt { multiplier: None }),
            }
        );
    }

    #[tokio::test]
    async fn execute__missing_word_fails_the_start() {
        let contract = ScriptedContract::new("APPLE");
        contract.fail_next(Method::CurrentWord, RemoteError::with_code(-32000, "no game"));

        let action = execute(
            &contract,
            default_entry_fee(),
            Command::StartGame {
                ticket: Ticket::default(),
            },
        )
        .await;

        let Action::StartSettled {
            outcome: Err(error),
            ..
        } = action
        else {
            panic!("start should fail without a word");
        };
        assert_eq!(error.code, Some(-32000));
        assert!(error.message.contains("could not be loaded"));
    }

    #[tokio::test]
    async fn execute__empty_word_fails_the_start() {
        // given
        let contract = ScriptedContract::new("");

        // when
        let action = execute(
            &contract,
            default_entry_fee(),
            Command::StartGame {
                ticket: Ticket::default(),
            },
        )
        .await;

        // then
        let Action::StartSettled {
            outcome: Err(error),
            ..
        } = action
        else {
            panic!("start should fail without a word");
        };
        assert!(error.message.contains("returned no word"));
        assert_eq!(contract.calls(), vec![Method::StartGame, Method::CurrentWord]);
    }
}
