//! Per-request verification flow.
//!
//! A request moves through `received -> allocating_id -> fetching_receipt ->
//! matching -> signing -> authorized`, stopping at the first step that
//! rejects. Nothing is signed until the payment has matched, and the id that
//! was priced is the id that gets signed.

use crate::error::{OracleError, Rejection};
use crate::matcher::{find_minted_token_id, MatchFailure, TransferMatcher};
use alloy::primitives::{Address, TxHash, U256};
use oracle_account::{AccountError, AccountService};
use oracle_allocator::{AllocatorError, AllocatorInterface};
use oracle_chain::ReceiptFetcher;
use oracle_types::{
	MintAuthorization, PriceSchedule, TokenId, TransferClaim, VerificationRequest,
};
use rust_decimal::Decimal;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Result of a verification request that ran to completion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VerificationOutcome {
	Authorized(MintAuthorization),
	Rejected {
		token_id: TokenId,
		expected_amount: Decimal,
		rejection: Rejection,
	},
}

impl VerificationOutcome {
	pub fn is_authorized(&self) -> bool {
		matches!(self, VerificationOutcome::Authorized(_))
	}
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Stage {
	Received,
	AllocatingId,
	FetchingReceipt,
	Matching,
	Signing,
}

impl Stage {
	fn as_str(self) -> &'static str {
		match self {
			Stage::Received => "received",
			Stage::AllocatingId => "allocating_id",
			Stage::FetchingReceipt => "fetching_receipt",
			Stage::Matching => "matching",
			Stage::Signing => "signing",
		}
	}
}

/// Price table view shared with the pricing endpoint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PricingQuote {
	pub tiers: Vec<Decimal>,
	pub next_token_id: TokenId,
	pub next_amount: Decimal,
	pub recipient: Address,
	pub token_decimals: u8,
}

/// Payment terms every claim is checked against.
#[derive(Debug, Clone)]
pub(crate) struct PaymentTerms {
	pub schedule: PriceSchedule,
	pub recipient: Address,
	pub token_decimals: u8,
	pub claimed_amount_slack: Decimal,
}

pub struct VerificationEngine {
	fetcher: ReceiptFetcher,
	matcher: TransferMatcher,
	allocator: Arc<dyn AllocatorInterface>,
	account: Arc<AccountService>,
	terms: PaymentTerms,
}

impl VerificationEngine {
	pub(crate) fn new(
		fetcher: ReceiptFetcher,
		matcher: TransferMatcher,
		allocator: Arc<dyn AllocatorInterface>,
		account: Arc<AccountService>,
		terms: PaymentTerms,
	) -> Self {
		Self {
			fetcher,
			matcher,
			allocator,
			account,
			terms,
		}
	}

	pub fn signer_address(&self) -> Address {
		self.account.signer_address()
	}

	pub fn price_schedule(&self) -> &PriceSchedule {
		&self.terms.schedule
	}

	/// Verifies a payment and, if it matches, signs a mint authorization.
	///
	/// The request's hold on its reservation is released whenever it does not
	/// end in an authorization, errors included. Repeated requests for one
	/// payment share the reservation, which only returns to the pool once all
	/// of them have let go.
	pub async fn verify_and_authorize(
		&self,
		request: &VerificationRequest,
	) -> Result<VerificationOutcome, OracleError> {
		let tx_hash = request.tx_hash;
		debug!(
			%tx_hash,
			wallet = %request.wallet,
			stage = Stage::Received.as_str(),
			"Verification requested"
		);

		debug!(%tx_hash, stage = Stage::AllocatingId.as_str());
		let reservation = self
			.allocator
			.reserve(tx_hash, request.wallet)
			.await
			.map_err(|e| OracleError::Allocation(e.to_string()))?;
		let token_id = reservation.token_id;

		let result = self.verify_reserved(request, token_id).await;

		match &result {
			Ok(VerificationOutcome::Authorized(_)) => {
				info!(%tx_hash, token_id, "Mint authorized");
			}
			Ok(VerificationOutcome::Rejected { rejection, .. }) => {
				warn!(
					%tx_hash,
					token_id,
					reason = rejection.kind(),
					"Payment rejected: {}",
					rejection
				);
			}
			Err(e) => {
				warn!(%tx_hash, token_id, "Verification failed: {}", e);
			}
		}

		if !result.as_ref().is_ok_and(VerificationOutcome::is_authorized) {
			match self.allocator.release(token_id, tx_hash).await {
				Ok(()) => {}
				Err(AllocatorError::AlreadyAuthorized(_)) => {
					debug!(%tx_hash, token_id, "Reservation settled by another request");
				}
				Err(e) => warn!(token_id, "Failed to release reservation: {}", e),
			}
		}

		result
	}

	async fn verify_reserved(
		&self,
		request: &VerificationRequest,
		token_id: TokenId,
	) -> Result<VerificationOutcome, OracleError> {
		let tx_hash = request.tx_hash;
		let expected_amount = self.terms.schedule.expected_amount(token_id);
		let rejected = |rejection| VerificationOutcome::Rejected {
			token_id,
			expected_amount,
			rejection,
		};

		if let Some(claimed) = request.claimed_amount {
			if (claimed - expected_amount).abs() > self.terms.claimed_amount_slack {
				warn!(
					%tx_hash,
					token_id,
					%claimed,
					expected = %expected_amount,
					"Client amount differs from price schedule, using server amount"
				);
			}
		}

		debug!(%tx_hash, token_id, stage = Stage::FetchingReceipt.as_str());
		let Some(receipt) = self.fetcher.fetch_receipt(&tx_hash).await else {
			return Ok(rejected(Rejection::ReceiptUnavailable));
		};
		let Some(transaction) = self.fetcher.fetch_transaction(&tx_hash).await else {
			return Ok(rejected(Rejection::TransferNotVerified(
				MatchFailure::TransactionNotFound,
			)));
		};

		debug!(%tx_hash, token_id, stage = Stage::Matching.as_str());
		let claim = TransferClaim {
			tx_hash,
			expected_sender: request.wallet,
			expected_recipient: self.terms.recipient,
			expected_amount,
		};
		let matched = match self.matcher.match_transfer(&receipt, &transaction, &claim) {
			Ok(matched) => matched,
			Err(failure) => return Ok(rejected(Rejection::TransferNotVerified(failure))),
		};
		debug!(
			%tx_hash,
			log_index = matched.log_index,
			amount = %matched.amount,
			"Transfer matched"
		);

		debug!(%tx_hash, token_id, stage = Stage::Signing.as_str());
		let signature = self
			.account
			.sign_mint_authorization(&tx_hash, &request.wallet, token_id)
			.await
			.map_err(|e: AccountError| OracleError::SigningUnavailable(e.to_string()))?;

		// The signature is only handed out if the id is still ours
		self.allocator
			.authorize(token_id, tx_hash)
			.await
			.map_err(|e| OracleError::Allocation(e.to_string()))?;

		Ok(VerificationOutcome::Authorized(MintAuthorization {
			token_id,
			verified: true,
			signature,
			expected_amount,
		}))
	}

	/// Token id minted by a mint transaction, if its receipt shows one.
	pub async fn minted_token_id(&self, tx_hash: &TxHash) -> Option<U256> {
		let receipt = self.fetcher.fetch_receipt(tx_hash).await?;
		if !receipt.success {
			return None;
		}
		find_minted_token_id(&receipt)
	}

	pub async fn pricing(&self) -> Result<PricingQuote, OracleError> {
		let next_token_id = self
			.allocator
			.peek_next()
			.await
			.map_err(|e| OracleError::Allocation(e.to_string()))?;

		Ok(PricingQuote {
			tiers: self.terms.schedule.tiers().to_vec(),
			next_token_id,
			next_amount: self.terms.schedule.expected_amount(next_token_id),
			recipient: self.terms.recipient,
			token_decimals: self.terms.token_decimals,
		})
	}
}
