//! HTTP API for the mint oracle.

use axum::{
	extract::{rejection::JsonRejection, Path, State},
	http::StatusCode,
	response::{IntoResponse, Json, Response},
	routing::{get, post},
	Router,
};
use oracle_core::{OracleError, VerificationEngine, VerificationOutcome};
use oracle_types::{
	parse_tx_hash, ErrorResponse, HealthResponse, MintedTokenResponse, PricingResponse,
	RequestError, VerifyTransferRequest, VerifyTransferResponse,
};
use std::future::Future;
use std::sync::Arc;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::{error, info};

#[derive(Clone)]
struct AppState {
	engine: Arc<VerificationEngine>,
}

pub fn router(engine: Arc<VerificationEngine>) -> Router {
	Router::new()
		.route("/health", get(health))
		.route("/api/verify-transfer", post(verify_transfer))
		.route("/api/pricing", get(pricing))
		.route("/api/mints/{tx_hash}", get(minted_token))
		.with_state(AppState { engine })
		.layer(TraceLayer::new_for_http())
		.layer(CorsLayer::permissive())
}

pub async fn start_http_server(
	engine: Arc<VerificationEngine>,
	host: &str,
	port: u16,
	shutdown: impl Future<Output = ()> + Send + 'static,
) -> anyhow::Result<()> {
	let listener = tokio::net::TcpListener::bind((host, port)).await?;
	info!("HTTP API listening on {}", listener.local_addr()?);

	axum::serve(listener, router(engine))
		.with_graceful_shutdown(shutdown)
		.await?;

	Ok(())
}

fn malformed(error: RequestError) -> Response {
	(
		StatusCode::BAD_REQUEST,
		Json(VerifyTransferResponse::rejected(
			"MalformedRequest",
			error.to_string(),
		)),
	)
		.into_response()
}

fn internal_error(error: &OracleError) -> (StatusCode, Json<ErrorResponse>) {
	error!("Request failed: {}", error);
	(
		StatusCode::INTERNAL_SERVER_ERROR,
		Json(ErrorResponse {
			error: error.to_string(),
		}),
	)
}

async fn verify_transfer(
	State(state): State<AppState>,
	payload: Result<Json<VerifyTransferRequest>, JsonRejection>,
) -> Response {
	let Json(body) = match payload {
		Ok(body) => body,
		Err(rejection) => return malformed(RequestError::MalformedBody(rejection.body_text())),
	};
	let request = match body.validate() {
		Ok(request) => request,
		Err(e) => return malformed(e),
	};

	match state.engine.verify_and_authorize(&request).await {
		Ok(VerificationOutcome::Authorized(authorization)) => {
			(StatusCode::OK, Json(VerifyTransferResponse::authorized(&authorization))).into_response()
		}
		Ok(VerificationOutcome::Rejected {
			expected_amount,
			rejection,
			..
		}) => {
			let response = VerifyTransferResponse {
				expected_amount: Some(expected_amount),
				..VerifyTransferResponse::rejected(rejection.kind(), rejection.to_string())
			};
			(StatusCode::OK, Json(response)).into_response()
		}
		Err(e) => {
			let (status, Json(body)) = internal_error(&e);
			let reason = match e {
				OracleError::SigningUnavailable(_) => "SigningUnavailable",
				OracleError::Allocation(_) => "AllocationFailed",
				OracleError::Config(_) => "Misconfigured",
			};
			(status, Json(VerifyTransferResponse::rejected(reason, body.error))).into_response()
		}
	}
}

async fn pricing(
	State(state): State<AppState>,
) -> Result<Json<PricingResponse>, (StatusCode, Json<ErrorResponse>)> {
	let quote = state.engine.pricing().await.map_err(|e| internal_error(&e))?;

	Ok(Json(PricingResponse {
		tiers: quote.tiers,
		next_token_id: quote.next_token_id,
		next_amount: quote.next_amount,
		recipient: quote.recipient,
		token_decimals: quote.token_decimals,
	}))
}

async fn minted_token(
	State(state): State<AppState>,
	Path(tx_hash): Path<String>,
) -> Result<Json<MintedTokenResponse>, (StatusCode, Json<ErrorResponse>)> {
	let tx_hash = parse_tx_hash(&tx_hash).map_err(|e| {
		(
			StatusCode::BAD_REQUEST,
			Json(ErrorResponse {
				error: e.to_string(),
			}),
		)
	})?;

	match state.engine.minted_token_id(&tx_hash).await {
		Some(token_id) => Ok(Json(MintedTokenResponse {
			tx_hash,
			token_id: token_id.to_string(),
		})),
		None => Err((
			StatusCode::NOT_FOUND,
			Json(ErrorResponse {
				error: "No minted token found in transaction".to_string(),
			}),
		)),
	}
}

async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
	Json(HealthResponse {
		status: "ok".to_string(),
		signer: state.engine.signer_address(),
		timestamp: chrono::Utc::now().timestamp(),
	})
}

#[cfg(test)]
mod tests {
	use super::*;
	use alloy::primitives::{Address, Bytes, TxHash, B256, U256};
	use alloy::sol_types::SolEvent;
	use async_trait::async_trait;
	use axum::body::{to_bytes, Body};
	use axum::http::Request;
	use oracle_account::implementations::local::create_account;
	use oracle_chain::{ChainError, ChainInterface};
	use oracle_config::ConfigLoader;
	use oracle_core::matcher::Transfer;
	use oracle_core::EngineBuilder;
	use oracle_storage::implementations::memory;
	use oracle_types::{ReceiptLog, TransactionInfo, TransactionReceipt};
	use serde_json::{json, Value};
	use std::collections::HashMap;
	use std::sync::Mutex;
	use tower::ServiceExt;

	const CONFIG: &str = r#"
[oracle]
name = "api-test"

[chain]
provider = "fake"
max_attempts = 2
retry_delay_ms = 10

[chain.config]

[account]
provider = "local"

[account.config]
private_key = "0xac0974bec39a17e36ba4a6b4d238ff944bacb478cbed5efcae784d7bf4f2ff80"

[storage]
backend = "memory"

[payment]
recipient = "0x0db12C0A67bc5B8942ea3126a465d7a0b23126C7"
token_address = "0x0578d8a44db98b23bf096a382e016e29a5ce0ffe"
tiers = ["4450", "8900", "17800", "35600", "71150"]
"#;

	const BUYER: &str = "0x00000000000000000000000000000000000000b0";

	#[derive(Default)]
	struct FakeChain {
		receipts: Mutex<HashMap<TxHash, TransactionReceipt>>,
		senders: Mutex<HashMap<TxHash, Address>>,
	}

	#[async_trait]
	impl ChainInterface for FakeChain {
		async fn get_receipt(
			&self,
			tx_hash: &TxHash,
		) -> Result<Option<TransactionReceipt>, ChainError> {
			Ok(self.receipts.lock().unwrap().get(tx_hash).cloned())
		}

		async fn get_transaction(
			&self,
			tx_hash: &TxHash,
		) -> Result<Option<TransactionInfo>, ChainError> {
			Ok(self
				.senders
				.lock()
				.unwrap()
				.get(tx_hash)
				.map(|from| TransactionInfo {
					hash: *tx_hash,
					from: *from,
					to: None,
				}))
		}
	}

	impl FakeChain {
		fn insert(&self, tx_hash: TxHash, from: Address, logs: Vec<ReceiptLog>) {
			self.receipts.lock().unwrap().insert(
				tx_hash,
				TransactionReceipt {
					hash: tx_hash,
					block_number: Some(1),
					success: true,
					logs,
				},
			);
			self.senders.lock().unwrap().insert(tx_hash, from);
		}
	}

	fn app(chain: Arc<FakeChain>) -> Router {
		let config = ConfigLoader::new()
			.with_env_prefix("ORACLE_API_TEST_")
			.load_from_str(CONFIG)
			.unwrap();
		let engine = EngineBuilder::new(config)
			.with_storage_factory("memory", |c| Ok(memory::create_storage(c)))
			.with_chain_factory("fake", move |_| Ok(chain.clone() as Arc<dyn ChainInterface>))
			.with_account_factory("local", create_account)
			.build()
			.unwrap();
		router(Arc::new(engine))
	}

	fn payment_log(from: Address, value: U256) -> ReceiptLog {
		ReceiptLog {
			address: "0x0578d8a44db98b23bf096a382e016e29a5ce0ffe".parse().unwrap(),
			topics: vec![
				Transfer::SIGNATURE_HASH,
				from.into_word(),
				"0x0db12C0A67bc5B8942ea3126a465d7a0b23126C7"
					.parse::<Address>()
					.unwrap()
					.into_word(),
			],
			data: Bytes::from(value.to_be_bytes::<32>().to_vec()),
		}
	}

	async fn send(app: Router, request: Request<Body>) -> (StatusCode, Value) {
		let response = app.oneshot(request).await.unwrap();
		let status = response.status();
		let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
		(status, serde_json::from_slice(&bytes).unwrap())
	}

	fn post_json(body: Value) -> Request<Body> {
		Request::builder()
			.method("POST")
			.uri("/api/verify-transfer")
			.header("content-type", "application/json")
			.body(Body::from(body.to_string()))
			.unwrap()
	}

	fn get(uri: &str) -> Request<Body> {
		Request::builder().uri(uri).body(Body::empty()).unwrap()
	}

	#[tokio::test]
	async fn test_verified_payment_returns_signature() {
		let chain = Arc::new(FakeChain::default());
		let tx_hash = TxHash::repeat_byte(0x01);
		let buyer: Address = BUYER.parse().unwrap();
		let amount = U256::from(4450u64) * U256::from(10u8).pow(U256::from(18u8));
		chain.insert(tx_hash, buyer, vec![payment_log(buyer, amount)]);

		let (status, body) = send(
			app(chain),
			post_json(json!({
				"txHash": tx_hash.to_string(),
				"walletAddress": BUYER,
				"amount": 4450
			})),
		)
		.await;

		assert_eq!(status, StatusCode::OK);
		assert_eq!(body["verified"], true);
		assert_eq!(body["tokenId"], 1);
		assert_eq!(body["expectedAmount"], 4450.0);
		assert_eq!(body["signature"].as_str().unwrap().len(), 132);
	}

	#[tokio::test]
	async fn test_missing_field_is_bad_request() {
		let (status, body) = send(
			app(Arc::new(FakeChain::default())),
			post_json(json!({ "walletAddress": BUYER })),
		)
		.await;

		assert_eq!(status, StatusCode::BAD_REQUEST);
		assert_eq!(body["verified"], false);
		assert_eq!(body["error"], "Missing required parameter: txHash");
	}

	#[tokio::test]
	async fn test_non_json_body_is_bad_request() {
		let request = Request::builder()
			.method("POST")
			.uri("/api/verify-transfer")
			.header("content-type", "application/json")
			.body(Body::from("txHash=0x01"))
			.unwrap();

		let (status, body) = send(app(Arc::new(FakeChain::default())), request).await;
		assert_eq!(status, StatusCode::BAD_REQUEST);
		assert_eq!(body["reason"], "MalformedRequest");
	}

	#[tokio::test]
	async fn test_unknown_transaction_is_rejected_not_failed() {
		let (status, body) = send(
			app(Arc::new(FakeChain::default())),
			post_json(json!({
				"txHash": TxHash::repeat_byte(0x09).to_string(),
				"walletAddress": BUYER
			})),
		)
		.await;

		assert_eq!(status, StatusCode::OK);
		assert_eq!(body["verified"], false);
		assert_eq!(body["reason"], "ReceiptUnavailable");
		assert!(body.get("signature").is_none());
	}

	#[tokio::test]
	async fn test_pricing_reads_configured_schedule() {
		let (status, body) = send(app(Arc::new(FakeChain::default())), get("/api/pricing")).await;

		assert_eq!(status, StatusCode::OK);
		assert_eq!(
			body["tiers"],
			json!([4450.0, 8900.0, 17800.0, 35600.0, 71150.0])
		);
		assert_eq!(body["nextTokenId"], 1);
		assert_eq!(body["nextAmount"], 4450.0);
		assert_eq!(body["tokenDecimals"], 18);
	}

	#[tokio::test]
	async fn test_minted_token_lookup() {
		let chain = Arc::new(FakeChain::default());
		let mint_tx = TxHash::repeat_byte(0x0d);
		chain.insert(
			mint_tx,
			BUYER.parse().unwrap(),
			vec![ReceiptLog {
				address: Address::repeat_byte(0x0f),
				topics: vec![
					Transfer::SIGNATURE_HASH,
					B256::ZERO,
					BUYER.parse::<Address>().unwrap().into_word(),
					B256::with_last_byte(12),
				],
				data: Bytes::new(),
			}],
		);
		let app = app(chain);

		let (status, body) = send(app.clone(), get(&format!("/api/mints/{}", mint_tx))).await;
		assert_eq!(status, StatusCode::OK);
		assert_eq!(body["tokenId"], "12");

		let (status, _) = send(app.clone(), get("/api/mints/0x1234")).await;
		assert_eq!(status, StatusCode::BAD_REQUEST);

		let (status, _) = send(
			app,
			get(&format!("/api/mints/{}", TxHash::repeat_byte(0x0e))),
		)
		.await;
		assert_eq!(status, StatusCode::NOT_FOUND);
	}

	#[tokio::test]
	async fn test_health_reports_signer() {
		let (status, body) = send(app(Arc::new(FakeChain::default())), get("/health")).await;

		assert_eq!(status, StatusCode::OK);
		assert_eq!(body["status"], "ok");
		assert_eq!(
			body["signer"].as_str().unwrap().to_lowercase(),
			"0xf39fd6e51aad88f6f4ce6ab8827279cfffb92266"
		);
		assert!(body["timestamp"].as_i64().unwrap() > 0);
	}
}
