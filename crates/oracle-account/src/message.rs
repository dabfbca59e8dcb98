//! Byte layout of the mint authorization message.
//!
//! The verifier contract recomputes
//! `keccak256(abi.encodePacked("\x19Ethereum Signed Message:\n84", txHash, minter, tokenId))`
//! and recovers the signer from it. The layout below must match bit for bit.

use alloy::primitives::{keccak256, Address, TxHash, B256, U256};
use oracle_types::TokenId;

/// 26-byte personal-message prefix followed by the ASCII length of the payload.
pub const MINT_MESSAGE_PREFIX: &[u8; 28] = b"\x19Ethereum Signed Message:\n84";

/// tx hash (32) + minter (20) + token id (32)
pub const MINT_PAYLOAD_LEN: usize = 32 + 20 + 32;

pub fn pack_mint_message(tx_hash: &TxHash, minter: &Address, token_id: TokenId) -> Vec<u8> {
	let mut packed = Vec::with_capacity(MINT_MESSAGE_PREFIX.len() + MINT_PAYLOAD_LEN);
	packed.extend_from_slice(MINT_MESSAGE_PREFIX);
	packed.extend_from_slice(tx_hash.as_slice());
	packed.extend_from_slice(minter.as_slice());
	packed.extend_from_slice(&U256::from(token_id).to_be_bytes::<32>());
	packed
}

pub fn mint_message_hash(tx_hash: &TxHash, minter: &Address, token_id: TokenId) -> B256 {
	keccak256(pack_mint_message(tx_hash, minter, token_id))
}

#[cfg(test)]
mod tests {
	use super::*;
	use alloy::sol_types::SolValue;

	#[test]
	fn test_prefix_declares_payload_length() {
		assert_eq!(MINT_PAYLOAD_LEN, 84);
		assert!(MINT_MESSAGE_PREFIX.ends_with(MINT_PAYLOAD_LEN.to_string().as_bytes()));
	}

	#[test]
	fn test_packed_layout() {
		let tx_hash = TxHash::repeat_byte(0x11);
		let minter = Address::repeat_byte(0x22);

		let packed = pack_mint_message(&tx_hash, &minter, 258);

		assert_eq!(packed.len(), 112);
		assert_eq!(&packed[..28], MINT_MESSAGE_PREFIX);
		assert_eq!(&packed[28..60], tx_hash.as_slice());
		assert_eq!(&packed[60..80], minter.as_slice());
		assert!(packed[80..110].iter().all(|b| *b == 0));
		assert_eq!(&packed[110..], &[0x01, 0x02]);
	}

	#[test]
	fn test_matches_solidity_encode_packed() {
		let tx_hash: TxHash = "0x5c504ed432cb51138bcf09aa5e8a410dd4a1e204ef84bfed1be16dfba1b22060"
			.parse()
			.unwrap();
		let minter: Address = "0x0db12C0A67bc5B8942ea3126a465d7a0b23126C7".parse().unwrap();

		let expected = (
			String::from_utf8(MINT_MESSAGE_PREFIX.to_vec()).unwrap(),
			tx_hash,
			minter,
			U256::from(3u64),
		)
			.abi_encode_packed();

		assert_eq!(pack_mint_message(&tx_hash, &minter, 3), expected);
		assert_eq!(mint_message_hash(&tx_hash, &minter, 3), keccak256(&expected));
	}
}
