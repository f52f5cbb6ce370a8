use crate::ui;
use color_eyre::eyre::{
    Result,
    WrapErr,
    eyre,
};
use crossterm::event::EventStream;
use crypto_wordle::{
    contract::{
        ContractClient,
        execute,
    },
    deployment::{
        DEPLOYMENTS_ROOT,
        DeploymentEnv,
        DeploymentStore,
        ensure_structure_in,
        record_deployment,
    },
    evm::EvmContract,
    practice::PracticeContract,
    session::{
        Action,
        Command,
        Session,
    },
    wallets,
};
use ethers::types::{
    Address,
    U256,
};
use futures::StreamExt;
use std::{
    path::{
        Path,
        PathBuf,
    },
    sync::Arc,
    time::Duration,
};
use tokio::{
    sync::mpsc,
    time,
};
use tracing::{
    error,
    info,
};

const MAX_ERRORS: usize = 50;
const BALANCE_POLL_INTERVAL: Duration = Duration::from_secs(15);

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct NetworkTarget {
    pub env: DeploymentEnv,
    pub url: String,
    pub chain_id: u64,
}

impl NetworkTarget {
    pub fn new(env: DeploymentEnv, url: Option<String>, chain_id: Option<u64>) -> Self {
        Self {
            env,
            url: url.unwrap_or_else(|| env.default_rpc_url().to_string()),
            chain_id: chain_id.unwrap_or_else(|| env.default_chain_id()),
        }
    }
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub enum Backend {
    Practice,
    Chain {
        network: NetworkTarget,
        contract: Option<Address>,
        save_contract: bool,
        wallet: String,
        wallet_dir: PathBuf,
    },
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct AppConfig {
    pub backend: Backend,
    pub entry_fee: U256,
    pub auto_confirm: bool,
    pub log_dir: PathBuf,
}

#[derive(Clone, Debug)]
pub struct AppSnapshot {
    pub session: Session,
    pub network: String,
    pub account: String,
    pub entry_fee: U256,
    pub errors: Vec<String>,
}

pub struct AppController<C> {
    client: Arc<C>,
    session: Session,
    entry_fee: U256,
    auto_confirm: bool,
    /// Mutating command held until the player signs or declines it.
    awaiting_signature: Option<Command>,
    errors: Vec<String>,
    network: String,
    account: String,
    settled_tx: mpsc::UnboundedSender<Action>,
}

impl<C> AppController<C>
where
    C: ContractClient + Send + Sync + 'static,
{
    pub fn new(
        client: C,
        config: &AppConfig,
        network: String,
        account: String,
        settled_tx: mpsc::UnboundedSender<Action>,
    ) -> Self {
        Self {
            client: Arc::new(client),
            session: Session::new(),
            entry_fee: config.entry_fee,
            auto_confirm: config.auto_confirm,
            awaiting_signature: None,
            errors: Vec::new(),
            network,
            account,
            settled_tx,
        }
    }

    #[cfg(test)]
    pub fn session(&self) -> &Session {
        &self.session
    }

    /// Feeds `action` through the session and dispatches whatever it asks for.
    /// Returns whether the session emitted a command.
    pub fn apply(&mut self, action: Action) -> bool {
        if let Some(message) = remote_failure(&action) {
            self.push_errors(vec![message]);
        }
        let transition = self.session.reduce(action);
        self.session = transition.session;
        match transition.command {
            Some(command) => {
                self.dispatch(command);
                true
            }
            None => false,
        }
    }

    /// Submits a typed guess. False when the session rejected it locally.
    pub fn submit_guess(&mut self, word: String) -> bool {
        self.apply(Action::SubmitGuess(word))
    }

    fn dispatch(&mut self, command: Command) {
        if command.is_mutating() && !self.auto_confirm {
            self.awaiting_signature = Some(command);
            return;
        }
        self.spawn(command);
    }

    fn spawn(&self, command: Command) {
        let client = Arc::clone(&self.client);
        let settled_tx = self.settled_tx.clone();
        let entry_fee = self.entry_fee;
        tokio::spawn(async move {
            let action = execute(client.as_ref(), entry_fee, command).await;
            if settled_tx.send(action).is_err() {
                info!("settlement dropped, app loop is gone");
            }
        });
    }

    /// Resolves the signature prompt. Declining settles the command as a
    /// wallet rejection would.
    pub fn confirm(&mut self, approved: bool) {
        let Some(command) = self.awaiting_signature.take() else {
            return;
        };
        if approved {
            self.spawn(command);
        } else {
            info!(?command, "transaction declined by player");
            let _ = self.apply(command.declined());
        }
    }

    pub fn signature_prompt(&self) -> Option<String> {
        self.awaiting_signature
            .as_ref()
            .map(|command| describe_command(command, self.entry_fee))
    }

    pub fn snapshot(&self) -> AppSnapshot {
        AppSnapshot {
            session: self.session.clone(),
            network: self.network.clone(),
            account: self.account.clone(),
            entry_fee: self.entry_fee,
            errors: self.errors.clone(),
        }
    }

    fn push_errors(&mut self, mut items: Vec<String>) {
        if items.is_empty() {
            return;
        }
        for item in &items {
            error!("{}", item);
        }
        self.errors.append(&mut items);
        if self.errors.len() > MAX_ERRORS {
            let drain = self.errors.len() - MAX_ERRORS;
            self.errors.drain(0..drain);
        }
    }
}

fn remote_failure(action: &Action) -> Option<String> {
    let (label, error) = match action {
        Action::StartSettled { outcome: Err(e), .. } => ("startGame", e),
        Action::GuessSettled { outcome: Err(e), .. } => ("guessWord", e),
        Action::EscalationSettled { outcome: Err(e), .. } => {
            ("reduceAttemptsAndChangeMultiplier", e)
        }
        Action::BalanceFetched { outcome: Err(e), .. } => ("getContractBalance", e),
        _ => return None,
    };
    if error.is_user_declined() {
        return None;
    }
    Some(match error.code {
        Some(code) => format!("{label} failed ({code}): {}", error.message),
        None => format!("{label} failed: {}", error.message),
    })
}

fn describe_command(command: &Command, entry_fee: U256) -> String {
    match command {
        Command::StartGame { .. } => {
            format!("startGame(), paying {} ETH", ui::eth_display(entry_fee))
        }
        Command::Guess { word, .. } => format!("guessWord(\"{word}\")"),
        Command::Escalate { .. } => "reduceAttemptsAndChangeMultiplier()".to_string(),
        Command::FetchBalance { .. } => "getContractBalance()".to_string(),
    }
}

fn resolve_contract(
    store: &DeploymentStore,
    network: &NetworkTarget,
    explicit: Option<Address>,
    save: bool,
) -> Result<Address> {
    if let Some(address) = explicit {
        if save {
            let record = record_deployment(
                store,
                format!("{address:#x}"),
                &network.url,
                network.chain_id,
            )?;
            info!(contract = %record.contract_address, path = ?store.path(), "recorded deployment");
        }
        return Ok(address);
    }
    let record = store.latest()?.ok_or_else(|| {
        eyre!(
            "No {} deployment recorded in {}; pass --contract <address>",
            network.env,
            store.path().display()
        )
    })?;
    record.contract_address.parse::<Address>().map_err(|e| {
        eyre!(
            "Deployment record holds an invalid address {:?}: {e}",
            record.contract_address
        )
    })
}

/// Deployment store backing `backend`. Practice play never touches `root`.
fn open_deployment_store(root: &Path, backend: &Backend) -> Result<Option<DeploymentStore>> {
    match backend {
        Backend::Practice => Ok(None),
        Backend::Chain { network, .. } => {
            ensure_structure_in(root)?;
            DeploymentStore::open_in(root, network.env).map(Some)
        }
    }
}

pub async fn run_app(config: AppConfig) -> Result<()> {
    match config.backend.clone() {
        Backend::Practice => {
            info!("starting practice table");
            let client = PracticeContract::new(config.entry_fee);
            launch(client, &config, "Practice".to_string(), "offline".to_string()).await
        }
        Backend::Chain {
            network,
            contract,
            save_contract,
            wallet,
            wallet_dir,
        } => {
            let store = open_deployment_store(Path::new(DEPLOYMENTS_ROOT), &config.backend)?
                .ok_or_else(|| eyre!("No deployment store for {}", network.env))?;
            let contract = resolve_contract(&store, &network, contract, save_contract)?;
            let descriptor = wallets::find_wallet(&wallet_dir, &wallet)?;
            let signer = wallets::unlock_wallet(&descriptor, network.chain_id)?;
            let client =
                EvmContract::connect(&network.url, network.chain_id, contract, signer)
                    .await
                    .wrap_err_with(|| format!("Failed to connect to {}", network.url))?;
            let account = format!("{} {:#x}", descriptor.name, client.player());
            let label = format!("{} ({})", network.env, network.url);
            launch(client, &config, label, account).await
        }
    }
}

async fn launch<C>(client: C, config: &AppConfig, network: String, account: String) -> Result<()>
where
    C: ContractClient + Send + Sync + 'static,
{
    let (settled_tx, settled_rx) = mpsc::unbounded_channel();
    let controller = AppController::new(client, config, network, account, settled_tx);
    let mut ui_state = ui::UiState::default();

    tracing::info!("Starting UI");
    ui::terminal_enter(&mut ui_state)?;
    let res = run_loop(controller, &mut ui_state, settled_rx).await;
    ui::terminal_exit()?;
    res
}

async fn run_loop<C>(
    mut controller: AppController<C>,
    ui_state: &mut ui::UiState,
    mut settled_rx: mpsc::UnboundedReceiver<Action>,
) -> Result<()>
where
    C: ContractClient + Send + Sync + 'static,
{
    let mut input_events = EventStream::new();
    let mut ticker = time::interval(BALANCE_POLL_INTERVAL);
    ui::draw(ui_state, &controller.snapshot()).wrap_err("initial draw failed")?;

    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => break,
            _ = ticker.tick() => {
                controller.apply(Action::RefreshBalance);
            }
            Some(action) = settled_rx.recv() => {
                controller.apply(action);
            }
            raw_ev = input_events.next() => {
                let Some(raw_ev) = raw_ev else {
                    tracing::warn!("terminal input stream closed");
                    break;
                };
                let event = raw_ev.wrap_err("reading terminal input failed")?;
                let Some(ev) = ui::interpret_event(ui_state, event) else {
                    continue;
                };
                match ev {
                    ui::UserEvent::Quit => break,
                    ui::UserEvent::Start => {
                        controller.apply(Action::RequestStart);
                    }
                    ui::UserEvent::Submit(word) => {
                        if controller.submit_guess(word) {
                            ui::clear_input(ui_state);
                        }
                    }
                    ui::UserEvent::IncreaseDifficulty => {
                        controller.apply(Action::IncreaseDifficulty);
                    }
                    ui::UserEvent::RefreshBalance => {
                        controller.apply(Action::RefreshBalance);
                    }
                    ui::UserEvent::Confirm(approved) => controller.confirm(approved),
                    ui::UserEvent::Redraw => {}
                }
            }
        }
        if let Some(summary) = controller.signature_prompt() {
            ui::open_confirm(ui_state, summary);
        }
        ui::draw(ui_state, &controller.snapshot()).wrap_err("draw failed")?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    #![allow(non_snake_case)]
    use super::*;
    use crypto_wordle::{
        error::{
            ActionError,
            RemoteError,
        },
        session::{
            Phase,
            Status,
            Ticket,
        },
    };
    use tempdir::TempDir;

    fn config(auto_confirm: bool) -> AppConfig {
        AppConfig {
            backend: Backend::Practice,
            entry_fee: U256::exp10(17),
            auto_confirm,
            log_dir: PathBuf::from(".logs"),
        }
    }

    fn controller(
        auto_confirm: bool,
    ) -> (
        AppController<PracticeContract>,
        mpsc::UnboundedReceiver<Action>,
    ) {
        let (tx, rx) = mpsc::unbounded_channel();
        let cfg = config(auto_confirm);
        let client = PracticeContract::new(cfg.entry_fee);
        let controller =
            AppController::new(client, &cfg, "Practice".into(), "offline".into(), tx);
        (controller, rx)
    }

    #[tokio::test]
    async fn apply__start_waits_for_a_signature() {
        // given
        let (mut controller, _rx) = controller(false);

        // when
        controller.apply(Action::RequestStart);

        // then
        assert_eq!(
            controller.signature_prompt().as_deref(),
            Some("startGame(), paying 0.1 ETH")
        );
        assert!(controller.session().is_busy());
    }

    #[tokio::test]
    async fn confirm__declining_leaves_the_session_idle() {
        // given
        let (mut controller, _rx) = controller(false);
        controller.apply(Action::RequestStart);

        // when
        controller.confirm(false);

        // then
        assert_eq!(controller.session().phase(), &Phase::Idle);
        assert_eq!(
            controller.session().status(),
            &Status::Failed(ActionError::UserDeclined)
        );
        assert_eq!(controller.signature_prompt(), None);
        assert!(controller.snapshot().errors.is_empty());
    }

    #[tokio::test]
    async fn confirm__approved_start_settles_through_the_channel() {
        // given
        let (mut controller, mut rx) = controller(false);
        controller.apply(Action::RequestStart);

        // when
        controller.confirm(true);
        let settled = rx.recv().await.unwrap();
        controller.apply(settled);

        // then
        assert_eq!(controller.session().phase(), &Phase::Active);
        assert_eq!(controller.session().word_length(), 5);
        assert!(!controller.session().difficulty_locked());
    }

    #[tokio::test]
    async fn submit_guess__wrong_length_is_rejected_before_dispatch() {
        // given
        let (mut controller, mut rx) = controller(true);
        controller.apply(Action::RequestStart);
        let settled = rx.recv().await.unwrap();
        controller.apply(settled);

        // when
        let accepted = controller.submit_guess("PEAR".to_string());

        // then
        assert!(!accepted);
        assert!(controller.session().can_submit());
        assert!(controller.session().guesses().is_empty());
    }

    #[tokio::test]
    async fn submit_guess__accepted_guess_is_dispatched() {
        // given
        let (mut controller, mut rx) = controller(true);
        controller.apply(Action::RequestStart);
        let settled = rx.recv().await.unwrap();
        controller.apply(settled);

        // when
        let accepted = controller.submit_guess("ZZZZZ".to_string());

        // then
        assert!(accepted);
        assert_eq!(controller.session().pending_guess(), Some("ZZZZZ"));
    }

    #[tokio::test]
    async fn submit_guess__rejected_while_no_game_is_running() {
        let (mut controller, _rx) = controller(true);

        assert!(!controller.submit_guess("APPLE".to_string()));
    }

    #[tokio::test]
    async fn apply__auto_confirm_dispatches_immediately() {
        let (mut controller, mut rx) = controller(true);

        controller.apply(Action::RequestStart);
        let settled = rx.recv().await.unwrap();

        assert!(matches!(settled, Action::StartSettled { outcome: Ok(_), .. }));
        assert_eq!(controller.signature_prompt(), None);
    }

    #[tokio::test]
    async fn apply__failed_balance_read_lands_in_the_errors_panel() {
        let (mut controller, _rx) = controller(true);

        controller.apply(Action::BalanceFetched {
            ticket: Ticket::default(),
            outcome: Err(RemoteError::with_code(-32000, "header not found")),
        });

        assert_eq!(
            controller.snapshot().errors,
            vec!["getContractBalance failed (-32000): header not found".to_string()]
        );
        assert_eq!(controller.session().contract_balance(), None);
    }

    #[test]
    fn open_deployment_store__practice_leaves_the_disk_alone() {
        // given
        let root = TempDir::new("deployments").unwrap();
        let store_root = root.path().join(".deployments");

        // when
        let store = open_deployment_store(&store_root, &Backend::Practice).unwrap();

        // then
        assert!(store.is_none());
        assert!(!store_root.exists());
    }

    #[test]
    fn open_deployment_store__chain_creates_every_network_directory() {
        // given
        let root = TempDir::new("deployments").unwrap();
        let store_root = root.path().join(".deployments");
        let backend = Backend::Chain {
            network: NetworkTarget::new(DeploymentEnv::Sepolia, None, None),
            contract: None,
            save_contract: false,
            wallet: "alice".to_string(),
            wallet_dir: root.path().join("wallets"),
        };

        // when
        let store = open_deployment_store(&store_root, &backend).unwrap().unwrap();

        // then
        assert!(store.path().ends_with("sepolia/deployments.json"));
        assert!(store_root.join("local").join("deployments.json").exists());
    }

    #[tokio::test]
    async fn push_errors__keeps_only_the_most_recent_entries() {
        let (mut controller, _rx) = controller(true);

        controller.push_errors((0..60).map(|i| format!("e{i}")).collect());

        let errors = controller.snapshot().errors;
        assert_eq!(errors.len(), MAX_ERRORS);
        assert_eq!(errors.first().map(String::as_str), Some("e10"));
    }
}
