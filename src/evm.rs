use crate::{
    contract::{
        ContractClient,
        TxReceipt,
    },
    error::RemoteError,
};
use color_eyre::eyre::{
    Result,
    WrapErr,
};
use ethers::{
    prelude::*,
    providers::{
        MiddlewareError,
        RpcError,
    },
};
use std::sync::Arc;
use tracing::{
    info,
    warn,
};

abigen!(
    WordleGame,
    r#"[
        function startGame() external payable
        function getCurrentWord() external view returns (string)
        function guessWord(string word) external
        function getContractBalance() external view returns (uint256)
        function getRewardMultiplier(address player) external view returns (uint256)
        function reduceAttemptsAndChangeMultiplier() external
    ]"#
);

type SignerClient = SignerMiddleware<Provider<Http>, LocalWallet>;

/// The deployed game contract, called on behalf of one unlocked wallet.
pub struct EvmContract {
    game: WordleGame<SignerClient>,
    player: Address,
}

impl EvmContract {
    pub async fn connect(
        rpc_url: &str,
        chain_id: u64,
        contract: Address,
        wallet: LocalWallet,
    ) -> Result<Self> {
        let provider = Provider::<Http>::try_from(rpc_url)
            .wrap_err_with(|| format!("Invalid RPC URL {rpc_url}"))?;
        let remote_chain = provider
            .get_chainid()
            .await
            .wrap_err("Failed to query chain id from RPC endpoint")?;
        if remote_chain != U256::from(chain_id) {
            warn!(
                expected = chain_id,
                actual = %remote_chain,
                "RPC endpoint reports a different chain id"
            );
        }
        let wallet = wallet.with_chain_id(chain_id);
        let player = wallet.address();
        let client = Arc::new(SignerMiddleware::new(provider, wallet));
        info!(%contract, player = %player, "connected to game contract");
        Ok(Self {
            game: WordleGame::new(contract, client),
            player,
        })
    }

    pub fn player(&self) -> Address {
        self.player
    }
}

fn contract_error(err: ContractError<SignerClient>) -> RemoteError {
    let response = match &err {
        ContractError::MiddlewareError { e } => MiddlewareError::as_error_response(e),
        ContractError::ProviderError { e } => RpcError::as_error_response(e),
        _ => None,
    };
    match response {
        Some(rpc) => RemoteError::with_code(rpc.code, rpc.message.clone()),
        None => RemoteError::new(err.to_string()),
    }
}

fn provider_error(err: ProviderError) -> RemoteError {
    match RpcError::as_error_response(&err) {
        Some(rpc) => RemoteError::with_code(rpc.code, rpc.message.clone()),
        None => RemoteError::new(err.to_string()),
    }
}

async fn confirm(call: ContractCall<SignerClient, ()>) -> Result<TxReceipt, RemoteError> {
    let pending = call.send().await.map_err(contract_error)?;
    let receipt = pending
        .await
        .map_err(provider_error)?
        .ok_or_else(|| RemoteError::new("transaction dropped from the mempool"))?;
    let tx_hash = format!("{:#x}", receipt.transaction_hash);
    if receipt.status == Some(U64::zero()) {
        return Err(RemoteError::new(format!("transaction {tx_hash} reverted")));
    }
    Ok(TxReceipt { tx_hash })
}

impl ContractClient for EvmContract {
    async fn start_game(&self, fee: U256) -> Result<TxReceipt, RemoteError> {
        confirm(self.game.start_game().value(fee)).await
    }

    async fn current_word(&self) -> Result<String, RemoteError> {
        self.game
            .get_current_word()
            .from(self.player)
            .call()
            .await
            .map_err(contract_error)
    }

    async fn guess_word(&self, word: String) -> Result<TxReceipt, RemoteError> {
        confirm(self.game.guess_word(word)).await
    }

    async fn contract_balance(&self) -> Result<U256, RemoteError> {
        self.game
            .get_contract_balance()
            .from(self.player)
            .call()
            .await
            .map_err(contract_error)
    }

    async fn reward_multiplier(&self) -> Result<U256, RemoteError> {
        self.game
            .get_reward_multiplier(self.player)
            .from(self.player)
            .call()
            .await
            .map_err(contract_error)
    }

    async fn reduce_attempts_and_change_multiplier(
        &self,
    ) -> Result<TxReceipt, RemoteError> {
        confirm(self.game.reduce_attempts_and_change_multiplier()).await
    }
}

#[cfg(test)]
mod tests {
    #![allow(non_snake_case)]
    use super::*;
    use ethers::providers::{
        HttpClientError,
        JsonRpcError,
    };

    fn rpc_rejection(code: i64, message: &str) -> ProviderError {
        HttpClientError::JsonRpcError(JsonRpcError {
            code,
            message: message.to_string(),
            data: None,
        })
        .into()
    }

    #[test]
    fn provider_error__keeps_the_json_rpc_code() {
        // given
        let err = rpc_rejection(4001, "User denied transaction signature.");

        // when
        let remote = provider_error(err);

        // then
        assert!(remote.is_user_declined());
        assert_eq!(remote.message, "User denied transaction signature.");
    }

    #[test]
    fn provider_error__without_a_json_rpc_body_has_no_code() {
        let remote = provider_error(ProviderError::CustomError("node unreachable".into()));

        assert_eq!(remote.code, None);
        assert!(remote.message.contains("node unreachable"));
    }

    #[test]
    fn contract_error__provider_failure_keeps_the_json_rpc_code() {
        // given
        let err = ContractError::<SignerClient>::ProviderError {
            e: rpc_rejection(-32000, "execution reverted: game not started"),
        };

        // when
        let remote = contract_error(err);

        // then
        assert_eq!(remote.code, Some(-32000));
        assert_eq!(remote.message, "execution reverted: game not started");
    }
}
