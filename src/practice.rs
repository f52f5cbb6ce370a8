//! Offline stand-in for the on-chain game, used by `--practice`.

use crate::{
    contract::{
        ContractClient,
        TxReceipt,
    },
    error::RemoteError,
    session::{
        ESCALATION_FLOOR,
        INITIAL_ATTEMPTS,
    },
};
use ethers::types::U256;
use rand::{
    Rng,
    seq::IndexedRandom,
};
use std::sync::{
    Arc,
    Mutex,
    MutexGuard,
};
use tracing::debug;

pub const PRACTICE_WORDS: [&str; 24] = [
    "APPLE", "BRAVE", "CHAIN", "CRANE", "DRIFT", "EAGLE", "FLAME", "GHOST",
    "HONEY", "IVORY", "JOLLY", "KNIFE", "LEMON", "MANGO", "NOBLE", "OCEAN",
    "PIANO", "QUEEN", "RIVER", "STONE", "TIGER", "ULTRA", "VIVID", "WHEAT",
];

const BASE_MULTIPLIER: u64 = 100;

#[derive(Debug)]
struct Table {
    entry_fee: U256,
    pot: U256,
    word: Option<String>,
    attempts: i8,
    multiplier: u64,
}

/// In-memory contract with the same surface as the deployed one.
#[derive(Clone, Debug)]
pub struct PracticeContract {
    table: Arc<Mutex<Table>>,
}

impl PracticeContract {
    /// Creates a table whose pot is seeded with ten entry fees.
    pub fn new(entry_fee: U256) -> Self {
        Self::with_pot(entry_fee, entry_fee.saturating_mul(U256::from(10u64)))
    }

    pub fn with_pot(entry_fee: U256, pot: U256) -> Self {
        let table = Table {
            entry_fee,
            pot,
            word: None,
            attempts: 0,
            multiplier: BASE_MULTIPLIER,
        };
        Self {
            table: Arc::new(Mutex::new(table)),
        }
    }

    fn table(&self) -> Result<MutexGuard<'_, Table>, RemoteError> {
        self.table
            .lock()
            .map_err(|_| RemoteError::new("practice table state is poisoned"))
    }

    fn receipt() -> TxReceipt {
        let bytes: [u8; 32] = rand::rng().random();
        TxReceipt {
            tx_hash: format!("0x{}", hex::encode(bytes)),
        }
    }
}

impl ContractClient for PracticeContract {
    async fn start_game(&self, fee: U256) -> Result<TxReceipt, RemoteError> {
        let mut table = self.table()?;
        if fee < table.entry_fee {
            return Err(RemoteError::new("execution reverted: entry fee too low"));
        }
        let word = PRACTICE_WORDS
            .choose(&mut rand::rng())
            .ok_or_else(|| RemoteError::new("practice word list is empty"))?;
        table.pot = table.pot.saturating_add(fee);
        table.word = Some((*word).to_string());
        table.attempts = INITIAL_ATTEMPTS;
        table.multiplier = BASE_MULTIPLIER;
        debug!(pot = %table.pot, "practice game started");
        Ok(Self::receipt())
    }

    async fn current_word(&self) -> Result<String, RemoteError> {
        self.table()?
            .word
            .clone()
            .ok_or_else(|| RemoteError::new("execution reverted: no active game"))
    }

    async fn guess_word(&self, word: String) -> Result<TxReceipt, RemoteError> {
        let mut table = self.table()?;
        let Some(target) = table.word.clone() else {
            return Err(RemoteError::new("execution reverted: no active game"));
        };
        if table.attempts <= 0 {
            return Err(RemoteError::new("execution reverted: no attempts left"));
        }
        table.attempts -= 1;
        if word == target {
            let payout = table.entry_fee.saturating_mul(U256::from(table.multiplier))
                / U256::from(BASE_MULTIPLIER);
            table.pot = table.pot.saturating_sub(payout);
            table.word = None;
            debug!(payout = %payout, "practice game won");
        } else if table.attempts == 0 {
            table.word = None;
            debug!("practice game lost");
        }
        Ok(Self::receipt())
    }

    async fn contract_balance(&self) -> Result<U256, RemoteError> {
        Ok(self.table()?.pot)
    }

    async fn reward_multiplier(&self) -> Result<U256, RemoteError> {
        Ok(U256::from(self.table()?.multiplier))
    }

    async fn reduce_attempts_and_change_multiplier(
        &self,
    ) -> Result<TxReceipt, RemoteError> {
        let mut table = self.table()?;
        if table.word.is_none() {
            return Err(RemoteError::new("execution reverted: no active game"));
        }
        if table.attempts - 1 < ESCALATION_FLOOR {
            return Err(RemoteError::new(
                "execution reverted: attempts cannot be reduced further",
            ));
        }
        table.attempts -= 1;
        table.multiplier = table.multiplier * 3 / 2;
        Ok(Self::receipt())
    }
}

#[cfg(test)]
mod tests {
    #![allow(non_snake_case)]
    use super::*;
    use crate::contract::default_entry_fee;

    #[tokio::test]
    async fn start_game__draws_a_word_from_the_list_and_collects_the_fee() {
        // given
        let fee = default_entry_fee();
        let contract = PracticeContract::with_pot(fee, U256::zero());

        // when
        contract.start_game(fee).await.unwrap();

        // then
        let word = contract.current_word().await.unwrap();
        assert!(PRACTICE_WORDS.contains(&word.as_str()));
        assert_eq!(contract.contract_balance().await.unwrap(), fee);
    }

    #[tokio::test]
    async fn start_game__rejects_a_short_fee() {
        let fee = default_entry_fee();
        let contract = PracticeContract::new(fee);

        let err = contract.start_game(fee - U256::one()).await.unwrap_err();

        assert!(err.message.contains("entry fee"));
        assert!(!err.is_user_declined());
    }

    #[tokio::test]
    async fn guess_word__correct_guess_pays_out_with_multiplier() {
        // given
        let fee = U256::from(1_000u64);
        let contract = PracticeContract::with_pot(fee, U256::from(10_000u64));
        contract.start_game(fee).await.unwrap();
        contract.reduce_attempts_and_change_multiplier().await.unwrap();
        let word = contract.current_word().await.unwrap();

        // when
        contract.guess_word(word).await.unwrap();

        // then
        assert_eq!(
            contract.contract_balance().await.unwrap(),
            U256::from(11_000u64 - 1_500u64)
        );
        assert!(contract.current_word().await.is_err());
    }

    #[tokio::test]
    async fn reduce_attempts__stops_at_the_floor() {
        let fee = default_entry_fee();
        let contract = PracticeContract::new(fee);
        contract.start_game(fee).await.unwrap();

        contract.reduce_attempts_and_change_multiplier().await.unwrap();
        let second = contract.reduce_attempts_and_change_multiplier().await;

        assert!(second.is_err());
        assert_eq!(contract.reward_multiplier().await.unwrap(), U256::from(150u64));
    }
}
