use crate::{
    contract::{
        ContractClient,
        TxReceipt,
        execute,
    },
    error::RemoteError,
    session::{
        Action,
        Session,
    },
};
use ethers::types::U256;
use std::{
    collections::HashMap,
    sync::{
        Arc,
        Mutex,
    },
};

#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub enum Method {
    StartGame,
    CurrentWord,
    GuessWord,
    ContractBalance,
    RewardMultiplier,
    ReduceAttempts,
}

#[derive(Debug, Default)]
struct Script {
    word: String,
    balance: U256,
    multiplier: U256,
    calls: Vec<Method>,
    guesses: Vec<String>,
    failures: HashMap<Method, Vec<RemoteError>>,
    tx_count: u64,
}

/// Deterministic contract double. Clones share the same script.
#[derive(Clone, Debug, Default)]
pub struct ScriptedContract {
    script: Arc<Mutex<Script>>,
}

impl ScriptedContract {
    pub fn new(word: impl Into<String>) -> Self {
        let script = Script {
            word: word.into(),
            ..Script::default()
        };
        Self {
            script: Arc::new(Mutex::new(script)),
        }
    }

    pub fn set_word(&self, word: impl Into<String>) {
        self.script.lock().unwrap().word = word.into();
    }

    pub fn set_multiplier(&self, multiplier: U256) {
        self.script.lock().unwrap().multiplier = multiplier;
    }

    pub fn set_balance(&self, balance: U256) {
        self.script.lock().unwrap().balance = balance;
    }

    /// Queues a failure for the next call to `method`.
    pub fn fail_next(&self, method: Method, error: RemoteError) {
        self.script
            .lock()
            .unwrap()
            .failures
            .entry(method)
            .or_default()
            .push(error);
    }

    pub fn calls(&self) -> Vec<Method> {
        self.script.lock().unwrap().calls.clone()
    }

    /// Guesses that reached the contract.
    pub fn guesses(&self) -> Vec<String> {
        self.script.lock().unwrap().guesses.clone()
    }

    fn record(&self, method: Method) -> Result<(), RemoteError> {
        let mut script = self.script.lock().unwrap();
        script.calls.push(method);
        match script.failures.get_mut(&method) {
            Some(queue) if !queue.is_empty() => Err(queue.remove(0)),
            _ => Ok(()),
        }
    }

    fn receipt(&self) -> TxReceipt {
        let mut script = self.script.lock().unwrap();
        script.tx_count += 1;
        TxReceipt {
            tx_hash: format!("0x{:064x}", script.tx_count),
        }
    }
}

impl ContractClient for ScriptedContract {
    async fn start_game(&self, fee: U256) -> Result<TxReceipt, RemoteError> {
        self.record(Method::StartGame)?;
        {
            let mut script = self.script.lock().unwrap();
            script.balance = script.balance.saturating_add(fee);
            script.guesses.clear();
        }
        Ok(self.receipt())
    }

    async fn current_word(&self) -> Result<String, RemoteError> {
        self.record(Method::CurrentWord)?;
        Ok(self.script.lock().unwrap().word.clone())
    }

    async fn guess_word(&self, word: String) -> Result<TxReceipt, RemoteError> {
        self.record(Method::GuessWord)?;
        self.script.lock().unwrap().guesses.push(word);
        Ok(self.receipt())
    }

    async fn contract_balance(&self) -> Result<U256, RemoteError> {
        self.record(Method::ContractBalance)?;
        Ok(self.script.lock().unwrap().balance)
    }

    async fn reward_multiplier(&self) -> Result<U256, RemoteError> {
        self.record(Method::RewardMultiplier)?;
        Ok(self.script.lock().unwrap().multiplier)
    }

    async fn reduce_attempts_and_change_multiplier(
        &self,
    ) -> Result<TxReceipt, RemoteError> {
        self.record(Method::ReduceAttempts)?;
        {
            let mut script = self.script.lock().unwrap();
            let base = if script.multiplier.is_zero() {
                U256::from(100u64)
            } else {
                script.multiplier
            };
            script.multiplier = base * U256::from(3u64) / U256::from(2u64);
        }
        Ok(self.receipt())
    }
}

/// Applies `action` and keeps executing the resulting commands until the
/// session has nothing left to do. Returns the settled session.
pub async fn settle<C: ContractClient + Sync>(
    client: &C,
    session: &Session,
    action: Action,
) -> Session {
    let mut transition = session.reduce(action);
    while let Some(command) = transition.command.take() {
        let settlement = execute(client, crate::contract::default_entry_fee(), command).await;
        transition = transition.session.reduce(settlement);
    }
    transition.session
}

/// Like [`settle`], but answers every mutating command with a declined signature.
pub fn decline(session: &Session, action: Action) -> Session {
    let transition = session.reduce(action);
    match transition.command {
        Some(command) if command.is_mutating() => {
            transition.session.reduce(command.declined()).session
        }
        _ => transition.session,
    }
}
