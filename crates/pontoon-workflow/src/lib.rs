//! Bridge transaction workflow
//!
//! The step state machine behind the bridge screen: Form → (Approve) →
//! Confirm → Done, driven through the signer abstraction so the same
//! transitions hold whether signatures come from the injected provider or
//! the remote wallet.
//!
//! Exactly one action can be in flight per workflow instance. Every
//! mutating action is a no-op while the activity flag is non-idle, which is
//! also what serializes access to the single-slot wallet channel in
//! practice. Failures never advance or crash the machine: they surface as
//! recoverable feedback and leave the step where it was.

use std::sync::Arc;
use std::sync::Mutex;

use serde::Serialize;

use evm_node_client::ChainReader;
use pontoon_core::units::{parse_base_units, parse_units, to_fixed};
use pontoon_core::{
    constants, BridgeCall, BridgeConfig, SignerVariant, TokenDescriptor, TokenRegistry, TxOutcome,
};
use pontoon_session::WalletSession;
use pontoon_signer::BridgeSubmission;

/// Workflow step
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum BridgeStep {
    Form,
    Approve,
    Confirm,
    Done,
}

/// The single in-flight activity; `Idle` means actions are accepted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum Activity {
    Idle,
    CheckingAllowance,
    Approving,
    AwaitingSignature,
    AwaitingConfirmation,
}

impl Activity {
    /// Progress label for the active phase
    pub fn label(&self) -> &'static str {
        match self {
            Self::Idle => "",
            Self::CheckingAllowance => "Checking allowance...",
            Self::Approving => "Approving...",
            Self::AwaitingSignature => "Waiting for signature...",
            Self::AwaitingConfirmation => "Bridging (on-chain)...",
        }
    }
}

#[derive(Debug, Clone)]
struct State {
    step: BridgeStep,
    activity: Activity,
    selected: TokenDescriptor,
    counterpart: TokenDescriptor,
    amount: String,
    from_balance: String,
    to_balance: String,
    success: Option<String>,
    error: Option<String>,
    outcome: Option<TxOutcome>,
}

/// Read-only view of the workflow for the surrounding UI
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkflowSnapshot {
    pub step: BridgeStep,
    pub activity: Activity,
    pub activity_label: String,
    pub selected: TokenDescriptor,
    pub counterpart: TokenDescriptor,
    pub amount: String,
    pub from_balance: String,
    pub to_balance: String,
    pub success: Option<String>,
    pub error: Option<String>,
    pub outcome: Option<TxOutcome>,
    pub can_continue: bool,
}

/// The bridge workflow state machine
pub struct BridgeWorkflow {
    session: WalletSession,
    chain: Arc<dyn ChainReader>,
    registry: TokenRegistry,
    config: BridgeConfig,
    state: Mutex<State>,
}

/// Clears the activity flag on every exit path.
struct ActivityGuard<'a> {
    state: &'a Mutex<State>,
}

impl Drop for ActivityGuard<'_> {
    fn drop(&mut self) {
        self.state.lock().expect("workflow state lock poisoned").activity = Activity::Idle;
    }
}

impl BridgeWorkflow {
    pub fn new(
        session: WalletSession,
        chain: Arc<dyn ChainReader>,
        registry: TokenRegistry,
        config: BridgeConfig,
    ) -> Result<Self, pontoon_core::RegistryError> {
        let selected = registry
            .tokens()
            .first()
            .cloned()
            .ok_or_else(|| pontoon_core::RegistryError::UnknownToken {
                symbol: "<empty registry>".to_string(),
            })?;
        let counterpart = registry.counterpart_of(&selected)?.clone();

        Ok(Self {
            session,
            chain,
            registry,
            config,
            state: Mutex::new(State {
                step: BridgeStep::Form,
                activity: Activity::Idle,
                selected,
                counterpart,
                amount: String::new(),
                from_balance: "0.00".to_string(),
                to_balance: "0.00".to_string(),
                success: None,
                error: None,
                outcome: None,
            }),
        })
    }

    pub fn snapshot(&self) -> WorkflowSnapshot {
        let state = self.lock();
        WorkflowSnapshot {
            step: state.step,
            activity: state.activity,
            activity_label: state.activity.label().to_string(),
            selected: state.selected.clone(),
            counterpart: state.counterpart.clone(),
            amount: state.amount.clone(),
            from_balance: state.from_balance.clone(),
            to_balance: state.to_balance.clone(),
            success: state.success.clone(),
            error: state.error.clone(),
            outcome: state.outcome.clone(),
            can_continue: state.step == BridgeStep::Form
                && state.activity == Activity::Idle
                && amount_valid(&state),
        }
    }

    /// Whether `proceed` would leave the form
    pub fn can_continue(&self) -> bool {
        let state = self.lock();
        state.step == BridgeStep::Form && state.activity == Activity::Idle && amount_valid(&state)
    }

    /// Select the token to bridge; its counterpart follows from the registry.
    pub fn select_token(&self, symbol: &str) {
        let mut state = self.lock();
        if state.activity != Activity::Idle || state.step != BridgeStep::Form {
            return;
        }
        let (selected, counterpart) = match self
            .registry
            .get(symbol)
            .and_then(|t| Ok((t.clone(), self.registry.counterpart_of(t)?.clone())))
        {
            Ok(pair) => pair,
            Err(e) => {
                tracing::warn!("token selection rejected: {}", e);
                state.error = Some("Unknown token".to_string());
                return;
            }
        };
        state.selected = selected;
        state.counterpart = counterpart;
        state.from_balance = "0.00".to_string();
        state.to_balance = "0.00".to_string();
    }

    pub fn set_amount(&self, input: &str) {
        let mut state = self.lock();
        if state.activity != Activity::Idle {
            return;
        }
        state.amount = input.to_string();
    }

    /// Fill the amount with the full queried balance string, unrounded.
    pub fn fill_max(&self) {
        let mut state = self.lock();
        if state.activity != Activity::Idle {
            return;
        }
        state.amount = state.from_balance.clone();
    }

    /// Query both side balances concurrently and apply them independently.
    pub async fn refresh_balances(&self) {
        let Some(address) = self.session.address().await else {
            return;
        };
        let (selected, counterpart) = {
            let state = self.lock();
            (state.selected.clone(), state.counterpart.clone())
        };

        let (from, to) = tokio::join!(
            self.chain.token_balance(&selected, &address),
            self.chain.token_balance(&counterpart, &address),
        );

        let mut state = self.lock();
        state.from_balance = from.unwrap_or_else(|e| {
            tracing::warn!(token = %selected.symbol, "balance query failed: {}", e);
            "0.00".to_string()
        });
        state.to_balance = to.unwrap_or_else(|e| {
            tracing::warn!(token = %counterpart.symbol, "balance query failed: {}", e);
            "0.00".to_string()
        });
    }

    /// Leave the form: native assets go straight to Confirm, contract
    /// tokens through an allowance check that routes to Approve or Confirm.
    pub async fn proceed(&self) {
        let Some(owner) = self.session.address().await else {
            return;
        };

        let (token, requested) = {
            let mut state = self.lock();
            if state.step != BridgeStep::Form || state.activity != Activity::Idle {
                return;
            }
            if !amount_valid(&state) {
                return;
            }
            state.success = None;
            state.error = None;

            let token = state.selected.clone();
            // amount_valid just parsed this successfully
            let Ok(requested) = parse_units(&state.amount, token.decimals) else {
                return;
            };

            if token.is_native() {
                state.step = BridgeStep::Confirm;
                return;
            }
            (token, requested)
        };

        let Some(contract) = token.contract.clone() else {
            return;
        };
        let Some(_guard) = self.begin(Activity::CheckingAllowance) else {
            return;
        };

        match self
            .chain
            .allowance(&contract, &owner, &self.config.bridge_address, token.chain_id)
            .await
        {
            Ok(raw) => {
                let granted = parse_base_units(&raw).unwrap_or(0);
                let mut state = self.lock();
                state.success = Some("Allowance checked".to_string());
                state.step = if granted >= requested {
                    BridgeStep::Confirm
                } else {
                    BridgeStep::Approve
                };
            }
            Err(e) => {
                tracing::warn!(token = %token.symbol, "allowance check failed: {}", e);
                self.lock().error = Some("Failed to check allowance".to_string());
            }
        }
    }

    /// Grant the bridge contract an allowance, then move to Confirm.
    pub async fn approve(&self) {
        let (token, requested) = {
            let mut state = self.lock();
            if state.step != BridgeStep::Approve || state.activity != Activity::Idle {
                return;
            }
            state.success = None;
            state.error = None;
            let token = state.selected.clone();
            let Ok(requested) = parse_units(&state.amount, token.decimals) else {
                state.error = Some("Invalid amount".to_string());
                return;
            };
            (token, requested)
        };

        let Some(signer) = self.session.active_signer().await else {
            self.lock().error = Some("No wallet connected".to_string());
            return;
        };
        let Some(_guard) = self.begin(Activity::Approving) else {
            return;
        };

        match signer
            .approve(&token, &self.config.bridge_address, requested)
            .await
        {
            Ok(outcome) => {
                tracing::info!(hash = %outcome.hash, "approval confirmed");
                let mut state = self.lock();
                state.success = Some("Approved successfully".to_string());
                state.step = BridgeStep::Confirm;
            }
            Err(e) => {
                tracing::warn!(token = %token.symbol, "approval failed: {}", e);
                self.lock().error = Some("Approval failed".to_string());
            }
        }
    }

    /// Submit the bridge call and finish in Done on success.
    ///
    /// Local submissions come back pending and owe a confirmation wait;
    /// remote ones are already confirmed when the reply arrives.
    pub async fn bridge(&self) {
        let (token, counterpart, amount, requested) = {
            let mut state = self.lock();
            if state.step != BridgeStep::Confirm || state.activity != Activity::Idle {
                return;
            }
            state.success = None;
            state.error = None;
            let token = state.selected.clone();
            let Ok(requested) = parse_units(&state.amount, token.decimals) else {
                state.error = Some("Invalid amount".to_string());
                return;
            };
            (token, state.counterpart.clone(), state.amount.clone(), requested)
        };

        let Some(signer) = self.session.active_signer().await else {
            self.lock().error = Some("No wallet connected".to_string());
            return;
        };
        let Some(dest_network) = self.config.bridge_network_id(counterpart.chain_id) else {
            self.lock().error = Some("Unsupported destination network".to_string());
            return;
        };

        let call = BridgeCall {
            dest_network,
            recipient: signer.address().clone(),
            amount: requested,
            token: token.contract.clone(),
            force_update: true,
            calldata: constants::EMPTY_CALLDATA.to_string(),
        };

        let Some(_guard) = self.begin(Activity::AwaitingSignature) else {
            return;
        };
        if signer.variant() == SignerVariant::Remote {
            // One continuous phase: the remote wallet signs, submits and
            // confirms before replying.
            self.lock().success = Some("Bridging (confirming on-chain)...".to_string());
        }

        let outcome = match signer
            .submit_bridge(&token, &self.config.bridge_address, &call)
            .await
        {
            Ok(BridgeSubmission::Confirmed(outcome)) => outcome,
            Ok(BridgeSubmission::Pending(hash)) => {
                self.set_activity(Activity::AwaitingConfirmation);
                match self.chain.wait_for_confirmation(&token.rpc_url, &hash).await {
                    Ok(outcome) => outcome,
                    Err(e) => {
                        tracing::warn!(hash = %hash, "confirmation wait failed: {}", e);
                        self.lock().error = Some("Bridge transaction failed".to_string());
                        return;
                    }
                }
            }
            Err(e) => {
                tracing::warn!(token = %token.symbol, "bridge submission failed: {}", e);
                self.lock().error = Some("Bridge transaction failed".to_string());
                return;
            }
        };

        let formatted = to_fixed(&amount, 4).unwrap_or_else(|_| amount.clone());
        let mut state = self.lock();
        state.success = Some(format!("Bridged {} {}", formatted, token.symbol));
        state.outcome = Some(outcome);
        state.step = BridgeStep::Done;
    }

    /// Back to the form: clears amount, result and feedback.
    pub fn reset(&self) {
        let mut state = self.lock();
        if state.activity != Activity::Idle {
            return;
        }
        state.step = BridgeStep::Form;
        state.amount.clear();
        state.outcome = None;
        state.success = None;
        state.error = None;
    }

    fn begin(&self, activity: Activity) -> Option<ActivityGuard<'_>> {
        let mut state = self.lock();
        if state.activity != Activity::Idle {
            tracing::debug!(?activity, "action ignored while another is in flight");
            return None;
        }
        state.activity = activity;
        Some(ActivityGuard { state: &self.state })
    }

    fn set_activity(&self, activity: Activity) {
        self.lock().activity = activity;
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, State> {
        self.state.lock().expect("workflow state lock poisoned")
    }
}

fn amount_valid(state: &State) -> bool {
    let Ok(amount) = parse_units(&state.amount, state.selected.decimals) else {
        return false;
    };
    let Ok(balance) = parse_units(&state.from_balance, state.selected.decimals) else {
        return false;
    };
    amount > 0 && amount <= balance
}
