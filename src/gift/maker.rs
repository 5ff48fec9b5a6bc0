//! The maker side of a gift.

use crate::{
    abort::AbortSignal,
    balances::{self, BalanceOracle},
    claim::{ClaimError, ClaimEvent, ClaimOutcome, ClaimProtocol},
    config::GiftConfig,
    error::{AmountError, CredentialError, GiftError},
    intents::IntentPipeline,
    relay::RelayApi,
    signers::IntentSigner,
    split::{SplitPlan, split_across_deployments},
    storage::GiftStore,
    types::{
        EscrowCredentials, GiftInfo, GiftLink, GiftRecord, GiftStatus, HistoryKey, LinkError,
        TokenDiff, TokenId, TokenRegistry,
    },
};
use alloy::primitives::{U256, utils::parse_units};
use std::{fmt, sync::Arc};
use tracing::instrument;
use url::Url;

/// Errors produced by the maker lifecycle.
#[derive(Debug, thiserror::Error)]
pub enum MakerError {
    /// The event does not apply to the current state.
    #[error("cannot handle {event} while {state}")]
    InvalidEvent {
        /// Name of the current state.
        state: &'static str,
        /// Name of the rejected event.
        event: &'static str,
    },
    /// The form has no token selected.
    #[error("no token selected")]
    NoTokenSelected,
    /// Only pending gifts can be resumed from history.
    #[error("the gift is not pending")]
    GiftNotPending,
    /// The form input does not validate.
    #[error(transparent)]
    Amount(#[from] AmountError),
    /// A funding attempt failed.
    #[error("funding failed while {phase}")]
    Funding {
        /// The phase that failed.
        phase: MakerPhase,
        /// What went wrong.
        #[source]
        source: GiftError,
    },
    /// The cancel claim failed.
    #[error(transparent)]
    Claim(#[from] ClaimError),
    /// The claim link could not be rendered.
    #[error(transparent)]
    Link(#[from] LinkError),
    /// The gift credentials cannot be used.
    #[error(transparent)]
    Credential(#[from] CredentialError),
}

/// Phases a funding attempt moves through.
///
/// Each phase owns its failure policy: before [`publishing`](Self::Publishing) nothing has
/// been committed anywhere, between publishing and [`updating`](Self::Updating) a failed
/// attempt discards its draft, and once the escrow is funded the draft stays as the only copy
/// of the key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MakerPhase {
    /// Planning the split and signing the transfer-in.
    Signing,
    /// Persisting the draft record.
    Saving,
    /// Publishing the payload to the relay.
    Publishing,
    /// Waiting for settlement.
    Settling,
    /// Attaching the intent hashes to the record.
    Updating,
}

impl fmt::Display for MakerPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Signing => "signing",
            Self::Saving => "saving",
            Self::Publishing => "publishing",
            Self::Settling => "settling",
            Self::Updating => "updating",
        })
    }
}

/// What the editing screen reports about the previous lifecycle run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MakerNotice {
    /// The gift was cancelled and the escrow refunded the maker.
    GiftCancelled,
    /// Someone else claimed the gift before the cancel went through.
    GiftAlreadyClaimed,
    /// The funding attempt failed during the named phase.
    AttemptFailed {
        /// The phase that failed.
        phase: MakerPhase,
    },
}

/// The maker's in-progress gift form.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GiftForm {
    /// The token to gift.
    pub token: Option<TokenId>,
    /// Requested amount in human units, e.g. `"1.5"`.
    pub amount: String,
    /// Message shown to the claimer.
    pub message: String,
}

impl GiftForm {
    /// Validates the form into a funding request.
    fn validate(&self, registry: &TokenRegistry) -> Result<FundingRequest, MakerError> {
        let token = self.token.clone().ok_or(MakerError::NoTokenSelected)?;
        let decimals = registry
            .token_decimals(&token)
            .ok_or_else(|| AmountError::UnknownToken(token.clone()))?;
        let amount = parse_units(&self.amount, decimals)
            .ok()
            .and_then(|parsed| U256::try_from(parsed).ok())
            .filter(|amount| !amount.is_zero())
            .ok_or_else(|| AmountError::InvalidAmount(self.amount.clone()))?;
        Ok(FundingRequest { token, amount, decimals, message: self.message.clone() })
    }
}

/// A validated funding request, with the amount in the token's covering decimals.
#[derive(Debug)]
struct FundingRequest {
    token: TokenId,
    amount: U256,
    decimals: u8,
    message: String,
}

/// Resting states of the maker lifecycle.
#[derive(Debug)]
pub enum MakerState {
    /// Accumulating form input.
    Editing {
        /// The in-progress form.
        form: GiftForm,
        /// Notice from the previous run, if any.
        notice: Option<MakerNotice>,
    },
    /// The gift is funded and shareable.
    Settled {
        /// The live gift.
        gift: GiftInfo,
        /// Claim protocol armed for cancelling.
        claim: ClaimProtocol,
    },
}

impl MakerState {
    /// The state's name.
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Editing { .. } => "editing",
            Self::Settled { .. } => "settled",
        }
    }

    fn editing() -> Self {
        Self::Editing { form: GiftForm::default(), notice: None }
    }
}

/// Events driving the maker lifecycle.
#[derive(Debug, Clone)]
pub enum MakerEvent {
    /// Selects the token to gift.
    SetToken(TokenId),
    /// Sets the gift amount, in human units of the selected token.
    SetAmount(String),
    /// Sets the gift message.
    SetMessage(String),
    /// Signs, persists and publishes the gift.
    RequestSign,
    /// Claims the settled gift back into the maker's wallet.
    CancelGift,
    /// Acknowledges that someone else claimed the gift first.
    AckClaimImpossible,
}

impl MakerEvent {
    /// The event's name.
    pub const fn name(&self) -> &'static str {
        match self {
            Self::SetToken(_) => "set_token",
            Self::SetAmount(_) => "set_amount",
            Self::SetMessage(_) => "set_message",
            Self::RequestSign => "request_sign",
            Self::CancelGift => "cancel_gift",
            Self::AckClaimImpossible => "ack_claim_impossible",
        }
    }
}

/// Drives the full maker lifecycle of one gift at a time.
///
/// The maker's wallet signs the funding transfer, a disposable escrow key receives it, and the
/// store keeps the only durable copy of that key. Cancelling runs the same claim protocol a
/// recipient runs, with the maker as claimer.
#[derive(Debug)]
pub struct GiftMaker {
    wallet: Arc<dyn IntentSigner>,
    balances: Arc<dyn BalanceOracle>,
    registry: TokenRegistry,
    store: GiftStore,
    pipeline: IntentPipeline,
    link_base: Url,
    history_key: HistoryKey,
    state: MakerState,
}

impl GiftMaker {
    /// Creates a maker gifting out of one wallet.
    pub fn new(
        wallet: Arc<dyn IntentSigner>,
        relay: Arc<dyn RelayApi>,
        balances: Arc<dyn BalanceOracle>,
        registry: TokenRegistry,
        store: GiftStore,
        config: &GiftConfig,
    ) -> Self {
        Self {
            history_key: HistoryKey::evm(wallet.address()),
            pipeline: IntentPipeline::from_config(relay, config),
            link_base: config.link_base.clone(),
            state: MakerState::editing(),
            wallet,
            balances,
            registry,
            store,
        }
    }

    /// The maker's current state.
    pub const fn state(&self) -> &MakerState {
        &self.state
    }

    /// The shareable claim URL of the settled gift.
    pub fn share_url(&self) -> Result<Url, MakerError> {
        let MakerState::Settled { gift, .. } = &self.state else {
            return Err(MakerError::InvalidEvent { state: self.state.name(), event: "share_url" });
        };
        let link = GiftLink::new(&gift.record.credentials()?, gift.record.message.clone());
        Ok(link.to_url(&self.link_base)?)
    }

    /// Resumes the settled view over a gift recovered from history.
    ///
    /// Only pending gifts can be resumed; an unfunded draft has nothing to cancel and a
    /// claimed gift is gone.
    pub fn resume(&mut self, gift: GiftInfo) -> Result<(), MakerError> {
        if !matches!(self.state, MakerState::Editing { .. }) {
            return Err(MakerError::InvalidEvent { state: self.state.name(), event: "resume" });
        }
        if !gift.status.is_pending() {
            return Err(MakerError::GiftNotPending);
        }
        self.state =
            MakerState::Settled { gift, claim: ClaimProtocol::new(self.pipeline.clone()) };
        Ok(())
    }

    /// Handles a maker event.
    ///
    /// # Maker lifecycle
    ///
    /// ```text
    ///                 SetToken / SetAmount / SetMessage
    ///                            ┌─────┐
    ///                            ▼     │
    ///                          Editing ┘
    ///                             │ RequestSign
    ///                             ▼
    ///     Signing ──▶ Saving ──▶ Publishing ──▶ Settling ──▶ Updating
    ///        │           │           │              │            │
    ///        │           │           │              │            ▼
    ///        │           │           │              │         Settled ◀─────────────┐
    ///        │           │           │              │            │                  │
    ///        ▼           ▼           ▼              ▼            │ CancelGift /     │
    ///     Editing ◀── Editing ◀── Editing ◀───── Editing         │ AckClaimImpossible
    ///    (nothing persisted)    (draft discarded, best effort)   ▼                  │
    ///                                                         Removing ── retryable ┘
    ///                                                            │      claim error
    ///                                                            ▼
    ///                                                         Editing
    /// ```
    ///
    /// Each event runs to completion before the next is accepted. Funding failures return to
    /// editing with the form kept and a [`MakerNotice`] attached; a draft survives a failure
    /// only once the escrow holds the funds, because from that point it is the only copy of
    /// the escrow key.
    #[instrument(skip_all, fields(state = self.state.name(), event = event.name()))]
    pub async fn handle(
        &mut self,
        event: MakerEvent,
        abort: &AbortSignal,
    ) -> Result<(), MakerError> {
        match event {
            MakerEvent::SetToken(token) => {
                self.on_edit("set_token", |form| form.token = Some(token))
            }
            MakerEvent::SetAmount(amount) => {
                self.on_edit("set_amount", |form| form.amount = amount)
            }
            MakerEvent::SetMessage(message) => {
                self.on_edit("set_message", |form| form.message = message)
            }
            MakerEvent::RequestSign => self.on_request_sign(abort).await,
            MakerEvent::CancelGift => self.on_cancel(abort).await,
            MakerEvent::AckClaimImpossible => self.on_ack(abort).await,
        }
    }

    /// Handle a form edit. Only valid while editing.
    fn on_edit(
        &mut self,
        event: &'static str,
        edit: impl FnOnce(&mut GiftForm),
    ) -> Result<(), MakerError> {
        match &mut self.state {
            MakerState::Editing { form, .. } => {
                edit(form);
                Ok(())
            }
            state => Err(MakerError::InvalidEvent { state: state.name(), event }),
        }
    }

    /// Handle a sign request - fund a fresh escrow with the form's amount.
    ///
    /// Transitions to: [`MakerState::Settled`] on success, or back to
    /// [`MakerState::Editing`] with the form kept and the failed phase noted.
    async fn on_request_sign(&mut self, abort: &AbortSignal) -> Result<(), MakerError> {
        let MakerState::Editing { form, .. } = &self.state else {
            return Err(MakerError::InvalidEvent {
                state: self.state.name(),
                event: "request_sign",
            });
        };
        // Input errors reject the event outright; neither the form nor the state changes.
        let request = form.validate(&self.registry)?;
        let form = form.clone();

        match self.fund(&request, abort).await {
            Ok(gift) => {
                tracing::info!(account = %gift.account_id, "gift settled and ready to share");
                self.state = MakerState::Settled {
                    gift,
                    claim: ClaimProtocol::new(self.pipeline.clone()),
                };
                Ok(())
            }
            Err((phase, source)) => {
                self.state = MakerState::Editing {
                    form,
                    notice: Some(MakerNotice::AttemptFailed { phase }),
                };
                Err(MakerError::Funding { phase, source })
            }
        }
    }

    /// Runs one funding attempt: sign, save the draft, publish, settle, update.
    ///
    /// Escrow credentials are generated fresh per attempt, never reused across retries, so a
    /// stored key always belongs to exactly one attempt.
    async fn fund(
        &self,
        request: &FundingRequest,
        abort: &AbortSignal,
    ) -> Result<GiftInfo, (MakerPhase, GiftError)> {
        use MakerPhase::*;

        // signing: the maker's wallet commits to moving the deltas into the escrow.
        let credentials = EscrowCredentials::generate();
        let diff = self.plan_funding(request).await.map_err(|err| (Signing, err))?;
        let payload = self
            .pipeline
            .sign(self.wallet.as_ref(), credentials.address, diff.clone())
            .await
            .map_err(|err| (Signing, err.into()))?;

        // saving: from here a crash no longer loses the escrow key.
        let record = self
            .store
            .add_gift(&self.history_key, &credentials, diff, request.message.clone())
            .await
            .map_err(|err| (Saving, err.into()))?;

        // publishing
        let intent_hashes = match self.pipeline.publish(&payload).await {
            Ok(hashes) => hashes,
            Err(err) => {
                self.discard_draft(&record).await;
                return Err((Publishing, err.into()));
            }
        };

        // settling
        if let Err(err) = self.pipeline.settle(&intent_hashes, abort).await {
            self.discard_draft(&record).await;
            return Err((Settling, err.into()));
        }

        // updating: the escrow holds the funds now, so the draft stays even when attaching
        // the hashes fails; it is the recovery copy of the key.
        let record = self
            .store
            .update_gift(&self.history_key, &record.secret_key, intent_hashes)
            .await
            .map_err(|err| (Updating, err.into()))?;

        Ok(GiftInfo {
            status: GiftStatus::Pending,
            resolved_token: self.registry.resolve_token(&record.token_diff),
            account_id: credentials.address,
            record,
        })
    }

    /// Plans the transfer-in diff for a funding request.
    ///
    /// With no backing balance in any deployment the full amount is charged to the token's
    /// canonical deployment; the relay then reports the shortfall, which reads better than
    /// failing before a message even exists.
    async fn plan_funding(&self, request: &FundingRequest) -> Result<TokenDiff, GiftError> {
        let balances = self.balances.balances(self.wallet.address()).await?;
        let balances = self.registry.balances_for(&request.token, &balances);
        let plan = if balances::is_funded(&balances) {
            split_across_deployments(request.amount, request.decimals, &balances, &self.registry)?
        } else {
            let deployment = self
                .registry
                .canonical_deployment(&request.token)
                .ok_or_else(|| AmountError::UnknownToken(request.token.clone()))?;
            // The request is scaled to the token's covering decimals; floor it into the
            // deployment's own scale.
            let scale =
                U256::from(10).pow(U256::from(request.decimals - self.registry.decimals(&deployment)));
            SplitPlan::full_on(deployment, request.amount / scale)
        };
        Ok(plan.into_outgoing_diff()?)
    }

    /// Drops a draft whose funds never reached the escrow.
    async fn discard_draft(&self, record: &GiftRecord) {
        if let Err(err) = self.store.remove_gift(&self.history_key, &record.secret_key).await {
            tracing::warn!(%err, "failed to discard unfunded draft");
        }
    }

    /// Handle a cancel request - claim the escrow back into the maker's wallet.
    ///
    /// Transitions to: [`MakerState::Editing`] once the claim resolves. A lost race parks the
    /// nested claim as unclaimable until [`MakerEvent::AckClaimImpossible`]; a retryable claim
    /// failure keeps the gift settled.
    async fn on_cancel(&mut self, abort: &AbortSignal) -> Result<(), MakerError> {
        let MakerState::Settled { gift, claim } = &mut self.state else {
            return Err(MakerError::InvalidEvent {
                state: self.state.name(),
                event: "cancel_gift",
            });
        };
        let secret_key = gift.record.secret_key.clone();
        let event =
            ClaimEvent::ConfirmClaim { gift: gift.clone(), claimer: self.wallet.address() };
        match claim.handle(event, abort).await? {
            Some(outcome) => self.finish_cancel(secret_key, outcome).await,
            // Lost the race; the record stays until the maker acknowledges.
            None => Ok(()),
        }
    }

    /// Handle the already-claimed acknowledgement for the nested claim.
    async fn on_ack(&mut self, abort: &AbortSignal) -> Result<(), MakerError> {
        let MakerState::Settled { gift, claim } = &mut self.state else {
            return Err(MakerError::InvalidEvent {
                state: self.state.name(),
                event: "ack_claim_impossible",
            });
        };
        let secret_key = gift.record.secret_key.clone();
        match claim.handle(ClaimEvent::AckClaimImpossible, abort).await? {
            Some(outcome) => self.finish_cancel(secret_key, outcome).await,
            None => Ok(()),
        }
    }

    /// Consumes a terminal cancel outcome: remove the record and return to editing.
    ///
    /// The escrow is empty in either terminal case. Removal is best effort; a record that
    /// sticks around shows up as claimed in history, since balances outrank records.
    async fn finish_cancel(
        &mut self,
        secret_key: String,
        outcome: ClaimOutcome,
    ) -> Result<(), MakerError> {
        let notice = match outcome {
            ClaimOutcome::Claimed { .. } => MakerNotice::GiftCancelled,
            ClaimOutcome::AlreadyClaimedOrExecuted => MakerNotice::GiftAlreadyClaimed,
            // Nothing moved; the gift stays shareable.
            ClaimOutcome::NotClaimed => return Ok(()),
        };
        // removing
        if let Err(err) = self.store.remove_gift(&self.history_key, &secret_key).await {
            tracing::warn!(%err, "failed to remove finished gift record");
        }
        self.state =
            MakerState::Editing { form: GiftForm::default(), notice: Some(notice) };
        Ok(())
    }
}
