//! The taker side of a gift claim.

use crate::{
    abort::AbortSignal,
    balances::{self, BalanceOracle},
    claim::{ClaimError, ClaimEvent, ClaimOutcome, ClaimProtocol},
    config::GiftConfig,
    error::{AmountError, RelayError},
    intents::IntentPipeline,
    relay::RelayApi,
    types::{GiftInfo, GiftLink, IntentHash, TokenRegistry},
};
use alloy::primitives::Address;
use std::sync::Arc;
use tracing::instrument;
use url::Url;

/// Errors produced by the taker lifecycle.
#[derive(Debug, thiserror::Error)]
pub enum TakerError {
    /// The event does not apply to the current state.
    #[error("cannot handle {event} while {state}")]
    InvalidEvent {
        /// Name of the current state.
        state: &'static str,
        /// Name of the rejected event.
        event: &'static str,
    },
    /// Probing the escrow failed; opening the link again retries.
    #[error(transparent)]
    Relay(#[from] RelayError),
    /// The escrow balance cannot be expressed as a transfer.
    #[error(transparent)]
    Amount(#[from] AmountError),
    /// The claim transfer failed.
    #[error(transparent)]
    Claim(#[from] ClaimError),
}

/// Why a claim attempt ended without the gift.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AbortReason {
    /// The link payload or its secret key is malformed.
    InvalidSecretKey,
    /// The escrow holds nothing; the gift was claimed already or never funded.
    NoTokenOrGiftHasBeenClaimed,
    /// The viewer declined the gift.
    Declined,
    /// Another claim emptied the escrow during this attempt.
    AlreadyClaimedOrExecuted,
}

/// State of the taker lifecycle.
#[derive(Debug)]
pub enum TakerState {
    /// Waiting for a link.
    Idle,
    /// Decoding the link and probing the escrow.
    Reading,
    /// The gift is live; the nested claim waits for confirmation.
    Claiming {
        /// The gift as seen when the link was opened.
        gift: GiftInfo,
        /// The nested claim attempt.
        claim: ClaimProtocol,
    },
    /// The gift arrived.
    Finished {
        /// Intents that settled the claim.
        intent_hashes: Vec<IntentHash>,
    },
    /// The attempt ended without the gift.
    Aborted {
        /// Why the attempt ended.
        reason: AbortReason,
    },
}

impl TakerState {
    /// The state's name.
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Reading => "reading",
            Self::Claiming { .. } => "claiming",
            Self::Finished { .. } => "finished",
            Self::Aborted { .. } => "aborted",
        }
    }
}

/// Events driving the taker lifecycle.
#[derive(Debug, Clone)]
pub enum TakerEvent {
    /// A gift link was opened.
    OpenLink {
        /// The full link URL, fragment included.
        url: Url,
    },
    /// The viewer wants the gift.
    ConfirmClaim,
    /// The viewer declined the gift.
    AbortClaim,
    /// The viewer acknowledged the gift is gone.
    AckClaimImpossible,
}

impl TakerEvent {
    /// The event's name.
    pub const fn name(&self) -> &'static str {
        match self {
            Self::OpenLink { .. } => "open_link",
            Self::ConfirmClaim => "confirm_claim",
            Self::AbortClaim => "abort_claim",
            Self::AckClaimImpossible => "ack_claim_impossible",
        }
    }
}

/// Drives a claim from an opened link to its outcome.
///
/// ```text
///    Idle ──OpenLink──▶ Reading ─────▶ Claiming ──ConfirmClaim──▶ Finished
///     ▲                    │               │
///     └────────────────────┤               │ AbortClaim /
///      retryable probe     │               │ AckClaimImpossible
///                          ▼               ▼
///                       Aborted         Aborted
/// ```
///
/// A link whose secret key does not parse aborts during reading without touching the relay;
/// an empty escrow aborts after one balance probe. Terminal states stay terminal, a new
/// attempt gets a new taker.
#[derive(Debug)]
pub struct GiftTaker {
    /// The account claims are paid out to.
    viewer: Address,
    balances: Arc<dyn BalanceOracle>,
    registry: TokenRegistry,
    pipeline: IntentPipeline,
    state: TakerState,
}

impl GiftTaker {
    /// Creates a taker claiming into the viewer's account.
    pub fn new(
        viewer: Address,
        relay: Arc<dyn RelayApi>,
        balances: Arc<dyn BalanceOracle>,
        registry: TokenRegistry,
        config: &GiftConfig,
    ) -> Self {
        Self {
            viewer,
            balances,
            registry,
            pipeline: IntentPipeline::from_config(relay, config),
            state: TakerState::Idle,
        }
    }

    /// The taker's current state.
    pub const fn state(&self) -> &TakerState {
        &self.state
    }

    /// The gift under claim, when there is one.
    pub const fn gift(&self) -> Option<&GiftInfo> {
        match &self.state {
            TakerState::Claiming { gift, .. } => Some(gift),
            _ => None,
        }
    }

    /// Handles a taker event.
    #[instrument(skip_all, fields(state = self.state.name(), event = event.name()))]
    pub async fn handle(
        &mut self,
        event: TakerEvent,
        abort: &AbortSignal,
    ) -> Result<(), TakerError> {
        match event {
            TakerEvent::OpenLink { url } => self.on_open_link(&url).await,
            TakerEvent::ConfirmClaim => self.on_confirm(abort).await,
            TakerEvent::AbortClaim => {
                self.forward(ClaimEvent::AbortClaim, "abort_claim", abort).await
            }
            TakerEvent::AckClaimImpossible => {
                self.forward(ClaimEvent::AckClaimImpossible, "ack_claim_impossible", abort).await
            }
        }
    }

    /// Handle an opened link - decode it and size up the escrow.
    ///
    /// Transitions to: [`TakerState::Claiming`] when the escrow is funded,
    /// [`TakerState::Aborted`] when the link is bad or the escrow is empty, or back to
    /// [`TakerState::Idle`] when the balance probe fails and is worth retrying.
    async fn on_open_link(&mut self, url: &Url) -> Result<(), TakerError> {
        if !matches!(self.state, TakerState::Idle) {
            return Err(TakerError::InvalidEvent {
                state: self.state.name(),
                event: "open_link",
            });
        }
        self.state = TakerState::Reading;

        // The key is judged before anything goes over the wire; a malformed link never
        // causes a relay call.
        let parsed = GiftLink::from_url(url)
            .ok()
            .and_then(|link| link.credentials().ok().map(|credentials| (link, credentials)));
        let Some((link, credentials)) = parsed else {
            tracing::debug!("opened link does not decode to escrow credentials");
            self.state = TakerState::Aborted { reason: AbortReason::InvalidSecretKey };
            return Ok(());
        };

        let escrow_balances = match self.balances.balances(credentials.address).await {
            Ok(balances) => balances,
            Err(err) => {
                self.state = TakerState::Idle;
                return Err(err.into());
            }
        };
        if !balances::is_funded(&escrow_balances) {
            self.state =
                TakerState::Aborted { reason: AbortReason::NoTokenOrGiftHasBeenClaimed };
            return Ok(());
        }

        let gift =
            match GiftInfo::for_claim(&credentials, &link, &self.registry, &escrow_balances) {
                Ok(gift) => gift,
                Err(err) => {
                    self.state = TakerState::Idle;
                    return Err(err.into());
                }
            };
        tracing::debug!(account = %gift.account_id, "gift link opened");
        self.state =
            TakerState::Claiming { gift, claim: ClaimProtocol::new(self.pipeline.clone()) };
        Ok(())
    }

    /// Handle the claim confirmation - sweep the escrow into the viewer's account.
    ///
    /// Transitions to: [`TakerState::Finished`] when the transfer lands. A lost race parks
    /// the nested claim as unclaimable until [`TakerEvent::AckClaimImpossible`].
    async fn on_confirm(&mut self, abort: &AbortSignal) -> Result<(), TakerError> {
        let TakerState::Claiming { gift, claim } = &mut self.state else {
            return Err(TakerError::InvalidEvent {
                state: self.state.name(),
                event: "confirm_claim",
            });
        };
        let event = ClaimEvent::ConfirmClaim { gift: gift.clone(), claimer: self.viewer };
        match claim.handle(event, abort).await? {
            Some(outcome) => {
                self.finish(outcome);
                Ok(())
            }
            // Lost the race; the viewer has to acknowledge before the state resolves.
            None => Ok(()),
        }
    }

    /// Forwards an event to the nested claim and resolves its outcome.
    async fn forward(
        &mut self,
        event: ClaimEvent,
        name: &'static str,
        abort: &AbortSignal,
    ) -> Result<(), TakerError> {
        let TakerState::Claiming { claim, .. } = &mut self.state else {
            return Err(TakerError::InvalidEvent { state: self.state.name(), event: name });
        };
        match claim.handle(event, abort).await? {
            Some(outcome) => {
                self.finish(outcome);
                Ok(())
            }
            None => Ok(()),
        }
    }

    /// Settles the taker into its terminal state for a claim outcome.
    fn finish(&mut self, outcome: ClaimOutcome) {
        self.state = match outcome {
            ClaimOutcome::Claimed { intent_hashes } => TakerState::Finished { intent_hashes },
            ClaimOutcome::NotClaimed => TakerState::Aborted { reason: AbortReason::Declined },
            ClaimOutcome::AlreadyClaimedOrExecuted => {
                TakerState::Aborted { reason: AbortReason::AlreadyClaimedOrExecuted }
            }
        };
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        relay::InMemoryRelay,
        types::{DeploymentDescriptor, DeploymentId, EscrowCredentials, TokenId},
    };
    use alloy::primitives::U256;
    use base64::Engine;

    fn registry() -> TokenRegistry {
        let mut registry = TokenRegistry::default();
        registry.insert(
            DeploymentId::native(1),
            DeploymentDescriptor { token: TokenId::new("demo".into()), decimals: 2 },
        );
        registry
    }

    struct Setup {
        relay: Arc<InMemoryRelay>,
        taker: GiftTaker,
        viewer: Address,
    }

    fn setup() -> Setup {
        let relay = Arc::new(InMemoryRelay::new());
        let viewer = Address::with_last_byte(9);
        let taker = GiftTaker::new(
            viewer,
            relay.clone(),
            relay.clone(),
            registry(),
            &GiftConfig::default(),
        );
        Setup { relay, taker, viewer }
    }

    fn link_url(credentials: &EscrowCredentials, message: &str) -> Url {
        GiftLink::new(credentials, message)
            .to_url(&GiftConfig::default().link_base)
            .unwrap()
    }

    async fn funded_escrow(relay: &InMemoryRelay, amount: u64) -> EscrowCredentials {
        let credentials = EscrowCredentials::generate();
        relay.fund(credentials.address, DeploymentId::native(1), U256::from(amount)).await;
        credentials
    }

    #[tokio::test]
    async fn malformed_links_abort_without_touching_the_relay() {
        let Setup { relay, mut taker, .. } = setup();
        let abort = AbortSignal::never();

        // Well-formed payload carrying a secret key that does not parse.
        let payload = base64::engine::general_purpose::URL_SAFE_NO_PAD
            .encode(br#"{"secretKey":"secp256k1:zz","message":""}"#);
        let url: Url = format!("https://wallet.test/gift#{payload}").parse().unwrap();
        taker.handle(TakerEvent::OpenLink { url }, &abort).await.unwrap();
        assert!(matches!(
            taker.state(),
            TakerState::Aborted { reason: AbortReason::InvalidSecretKey }
        ));

        // A link with no payload at all.
        let Setup { mut taker, .. } = setup();
        let url: Url = "https://wallet.test/gift".parse().unwrap();
        taker.handle(TakerEvent::OpenLink { url }, &abort).await.unwrap();
        assert!(matches!(
            taker.state(),
            TakerState::Aborted { reason: AbortReason::InvalidSecretKey }
        ));

        assert_eq!(relay.balance_query_count(), 0);
        assert_eq!(relay.publish_count(), 0);
    }

    #[tokio::test]
    async fn empty_escrows_read_as_already_claimed() {
        let Setup { relay, mut taker, .. } = setup();
        let url = link_url(&EscrowCredentials::generate(), "");

        taker.handle(TakerEvent::OpenLink { url }, &AbortSignal::never()).await.unwrap();
        assert!(matches!(
            taker.state(),
            TakerState::Aborted { reason: AbortReason::NoTokenOrGiftHasBeenClaimed }
        ));
        assert_eq!(relay.balance_query_count(), 1);
        assert_eq!(relay.publish_count(), 0);
    }

    #[tokio::test]
    async fn open_then_confirm_claims_the_gift() {
        let Setup { relay, mut taker, viewer } = setup();
        let credentials = funded_escrow(&relay, 150).await;
        let abort = AbortSignal::never();

        taker
            .handle(TakerEvent::OpenLink { url: link_url(&credentials, "happy birthday") }, &abort)
            .await
            .unwrap();
        let gift = taker.gift().expect("gift should be visible while claiming");
        assert_eq!(gift.record.message, "happy birthday");
        assert!(gift.status.is_pending());
        assert_eq!(gift.resolved_token, Some(TokenId::new("demo".into())));

        taker.handle(TakerEvent::ConfirmClaim, &abort).await.unwrap();
        match taker.state() {
            TakerState::Finished { intent_hashes } => assert_eq!(intent_hashes.len(), 1),
            state => panic!("expected finished, got {}", state.name()),
        }
        assert_eq!(
            relay.balance_of(viewer).await[&DeploymentId::native(1)],
            U256::from(150u64)
        );
        assert!(relay.balance_of(credentials.address).await[&DeploymentId::native(1)].is_zero());
    }

    #[tokio::test]
    async fn declined_claims_abort() {
        let Setup { relay, mut taker, .. } = setup();
        let credentials = funded_escrow(&relay, 10).await;
        let abort = AbortSignal::never();

        taker
            .handle(TakerEvent::OpenLink { url: link_url(&credentials, "") }, &abort)
            .await
            .unwrap();
        taker.handle(TakerEvent::AbortClaim, &abort).await.unwrap();
        assert!(matches!(taker.state(), TakerState::Aborted { reason: AbortReason::Declined }));
        assert_eq!(relay.publish_count(), 0);
    }

    #[tokio::test]
    async fn losing_the_race_requires_acknowledgement() {
        let Setup { relay, mut taker, .. } = setup();
        let credentials = funded_escrow(&relay, 10).await;
        let abort = AbortSignal::never();

        taker
            .handle(TakerEvent::OpenLink { url: link_url(&credentials, "") }, &abort)
            .await
            .unwrap();

        // Another taker sweeps the escrow while this one hesitates.
        let mut rival = GiftTaker::new(
            Address::with_last_byte(11),
            relay.clone(),
            relay.clone(),
            registry(),
            &GiftConfig::default(),
        );
        rival
            .handle(TakerEvent::OpenLink { url: link_url(&credentials, "") }, &abort)
            .await
            .unwrap();
        rival.handle(TakerEvent::ConfirmClaim, &abort).await.unwrap();
        assert_eq!(rival.state().name(), "finished");

        // The slow taker's confirm comes back without an outcome and parks unclaimable.
        taker.handle(TakerEvent::ConfirmClaim, &abort).await.unwrap();
        assert_eq!(taker.state().name(), "claiming");

        taker.handle(TakerEvent::AckClaimImpossible, &abort).await.unwrap();
        assert!(matches!(
            taker.state(),
            TakerState::Aborted { reason: AbortReason::AlreadyClaimedOrExecuted }
        ));
    }

    #[tokio::test]
    async fn events_out_of_order_are_rejected() {
        let Setup { mut taker, .. } = setup();
        let err = taker
            .handle(TakerEvent::ConfirmClaim, &AbortSignal::never())
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            TakerError::InvalidEvent { state: "idle", event: "confirm_claim" }
        ));
    }
}
