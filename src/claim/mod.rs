//! The gift claim protocol.

use crate::{
    abort::AbortSignal,
    error::{CredentialError, PipelineError},
    intents::IntentPipeline,
    metrics::ClaimMetrics,
    signers::EscrowSigner,
    types::{GiftInfo, IntentHash},
};
use alloy::primitives::Address;
use std::sync::Arc;
use tracing::instrument;

/// Errors produced by the claim protocol.
#[derive(Debug, thiserror::Error)]
pub enum ClaimError {
    /// The event does not apply to the current state.
    #[error("cannot handle {event} while {state}")]
    InvalidEvent {
        /// Name of the current state.
        state: &'static str,
        /// Name of the rejected event.
        event: &'static str,
    },
    /// Invalid state transition.
    #[error("invalid state transition from {from:?} to {to:?}")]
    InvalidStateTransition {
        /// The state the claim was in.
        from: ClaimState,
        /// The state that was requested.
        to: ClaimState,
    },
    /// The gift credentials cannot be used.
    #[error(transparent)]
    Credential(#[from] CredentialError),
    /// The claim transfer failed.
    #[error(transparent)]
    Pipeline(#[from] PipelineError),
}

/// State of one claim attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClaimState {
    /// Waiting for the claimer to confirm.
    Idle,
    /// The claim transfer is running.
    Claiming,
    /// The escrow was drained into the claimer's account.
    Claimed {
        /// Intents that settled the claim.
        intent_hashes: Vec<IntentHash>,
    },
    /// The escrow cannot cover the claim; another claim got there first.
    ///
    /// Waits for an acknowledgement before the attempt is finished.
    Unclaimable,
    /// The claimer walked away without claiming.
    Aborted,
}

impl ClaimState {
    /// The state's name.
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Claiming => "claiming",
            Self::Claimed { .. } => "claimed",
            Self::Unclaimable => "unclaimable",
            Self::Aborted => "aborted",
        }
    }

    /// Whether the claim finished successfully.
    pub const fn is_claimed(&self) -> bool {
        matches!(self, Self::Claimed { .. })
    }

    /// Whether the escrow turned out to be empty.
    pub const fn is_unclaimable(&self) -> bool {
        matches!(self, Self::Unclaimable)
    }

    /// Check if this state can transition to another state.
    pub const fn can_transition_to(&self, next: &Self) -> bool {
        use ClaimState::*;
        matches!(
            (self, next),
            (Idle, Claiming)
                | (Claiming, Claimed { .. })
                | (Claiming, Unclaimable)
                | (Claiming, Idle)
                | (Idle, Aborted)
        )
    }
}

/// Events driving a claim attempt.
#[derive(Debug, Clone)]
pub enum ClaimEvent {
    /// The claimer confirmed they want the gift.
    ConfirmClaim {
        /// The gift being claimed.
        gift: GiftInfo,
        /// The account receiving the funds.
        claimer: Address,
    },
    /// The claimer acknowledged that the gift is gone.
    AckClaimImpossible,
    /// The claimer walked away.
    AbortClaim,
}

impl ClaimEvent {
    /// The event's name.
    pub const fn name(&self) -> &'static str {
        match self {
            Self::ConfirmClaim { .. } => "confirm_claim",
            Self::AckClaimImpossible => "ack_claim_impossible",
            Self::AbortClaim => "abort_claim",
        }
    }
}

/// Terminal result of a claim attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClaimOutcome {
    /// The gift landed in the claimer's account.
    Claimed {
        /// Intents that settled the claim.
        intent_hashes: Vec<IntentHash>,
    },
    /// The claimer declined; nothing moved.
    NotClaimed,
    /// Another claim drained the escrow first, or the gift was already executed.
    AlreadyClaimedOrExecuted,
}

/// Drives one claim attempt through its states.
///
/// The taker flow and the maker's cancel path (the maker claiming its own gift back) both run
/// this protocol.
#[derive(Debug)]
pub struct ClaimProtocol {
    pipeline: IntentPipeline,
    state: ClaimState,
    metrics: Arc<ClaimMetrics>,
}

impl ClaimProtocol {
    /// Creates an idle claim.
    pub fn new(pipeline: IntentPipeline) -> Self {
        Self { pipeline, state: ClaimState::Idle, metrics: Arc::new(ClaimMetrics::default()) }
    }

    /// The current state.
    pub const fn state(&self) -> &ClaimState {
        &self.state
    }

    /// Handles a claim event.
    ///
    /// Returns the claim outcome once one is reached; `None` means the protocol waits for
    /// further events.
    #[instrument(skip_all, fields(state = self.state.name(), event = event.name()))]
    pub async fn handle(
        &mut self,
        event: ClaimEvent,
        abort: &AbortSignal,
    ) -> Result<Option<ClaimOutcome>, ClaimError> {
        match event {
            ClaimEvent::ConfirmClaim { gift, claimer } => {
                self.on_confirm(gift, claimer, abort).await
            }
            ClaimEvent::AckClaimImpossible => self.on_ack(),
            ClaimEvent::AbortClaim => self.on_abort(),
        }
    }

    /// Handle claim confirmation - drain the escrow into the claimer's account.
    ///
    /// Transitions to: [`ClaimState::Claimed`], [`ClaimState::Unclaimable`] when another claim
    /// emptied the escrow first, or back to [`ClaimState::Idle`] on retryable failures.
    async fn on_confirm(
        &mut self,
        gift: GiftInfo,
        claimer: Address,
        abort: &AbortSignal,
    ) -> Result<Option<ClaimOutcome>, ClaimError> {
        // Parse credentials before transitioning so input errors leave the claim untouched.
        let credentials = gift.record.credentials()?;
        let escrow = EscrowSigner::new(&credentials)?;
        self.transition(ClaimState::Claiming)?;

        match self
            .pipeline
            .execute(&escrow, claimer, gift.record.token_diff.clone(), abort)
            .await
        {
            Ok(outcome) => {
                self.transition(ClaimState::Claimed {
                    intent_hashes: outcome.intent_hashes.clone(),
                })?;
                self.metrics.claimed.increment(1);
                Ok(Some(ClaimOutcome::Claimed { intent_hashes: outcome.intent_hashes }))
            }
            Err(err) if err.is_insufficient_balance() => {
                self.transition(ClaimState::Unclaimable)?;
                self.metrics.unclaimable.increment(1);
                Ok(None)
            }
            Err(err) => {
                // The transfer did not take; return to idle so the claimer can retry.
                self.transition(ClaimState::Idle)?;
                Err(err.into())
            }
        }
    }

    /// Handle the claim impossible acknowledgement.
    ///
    /// Only valid while unclaimable. The state stays put; the terminal outcome tells the
    /// caller to drop its record of the gift.
    fn on_ack(&mut self) -> Result<Option<ClaimOutcome>, ClaimError> {
        if !self.state.is_unclaimable() {
            return Err(ClaimError::InvalidEvent {
                state: self.state.name(),
                event: "ack_claim_impossible",
            });
        }
        Ok(Some(ClaimOutcome::AlreadyClaimedOrExecuted))
    }

    /// Handle the claimer walking away.
    ///
    /// Transitions to: [`ClaimState::Aborted`]
    fn on_abort(&mut self) -> Result<Option<ClaimOutcome>, ClaimError> {
        self.transition(ClaimState::Aborted)?;
        self.metrics.aborted.increment(1);
        Ok(Some(ClaimOutcome::NotClaimed))
    }

    #[instrument(skip(self, next), fields(from = self.state.name(), to = next.name()))]
    fn transition(&mut self, next: ClaimState) -> Result<(), ClaimError> {
        if !self.state.can_transition_to(&next) {
            return Err(ClaimError::InvalidStateTransition {
                from: self.state.clone(),
                to: next,
            });
        }
        tracing::debug!("claim state transition");
        self.state = next;
        Ok(())
    }
}
