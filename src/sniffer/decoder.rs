//! Decoding of `jsonParsed` transaction detail into [`ParsedTransaction`]

use serde_json::Value;
use solana_sdk::{clock::Slot, pubkey::Pubkey, signature::Signature, system_program};
use solana_transaction_status::{
    EncodedConfirmedTransactionWithStatusMeta, EncodedTransaction, UiInstruction, UiMessage,
    UiParsedInstruction,
};
use std::str::FromStr;
use thiserror::Error;

use crate::types::{InstructionPayload, ParsedTransaction, SourceInstruction, TransferPayload};

/// Instruction type reported by the system program parser for plain transfers
pub const SYSTEM_TRANSFER_TYPE: &str = "transfer";

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DecodeError {
    /// Transaction was not returned in JSON form
    #[error("transaction is not JSON encoded")]
    NotJson,

    /// Message was returned raw instead of parsed
    #[error("transaction message is not parsed")]
    RawMessage,

    #[error("instruction {index} is compiled, program cannot be resolved")]
    CompiledInstruction { index: usize },

    #[error("invalid program id {0}")]
    InvalidProgramId(String),
}

/// Decode a transaction fetched with `UiTransactionEncoding::JsonParsed`
pub fn decode_transaction(
    signature: Signature,
    encoded: EncodedConfirmedTransactionWithStatusMeta,
) -> Result<ParsedTransaction, DecodeError> {
    let slot: Slot = encoded.slot;
    let ui_tx = match encoded.transaction.transaction {
        EncodedTransaction::Json(ui_tx) => ui_tx,
        _ => return Err(DecodeError::NotJson),
    };
    let message = match ui_tx.message {
        UiMessage::Parsed(message) => message,
        UiMessage::Raw(_) => return Err(DecodeError::RawMessage),
    };

    let instructions = message
        .instructions
        .iter()
        .enumerate()
        .map(|(index, ix)| decode_instruction(index, ix))
        .collect::<Result<Vec<_>, _>>()?;

    Ok(ParsedTransaction {
        signature,
        slot,
        instructions,
    })
}

/// Decode one top-level instruction of a parsed message
pub fn decode_instruction(
    index: usize,
    instruction: &UiInstruction,
) -> Result<SourceInstruction, DecodeError> {
    match instruction {
        UiInstruction::Parsed(UiParsedInstruction::Parsed(parsed)) => {
            let program_id = parse_program_id(&parsed.program_id)?;
            let payload = decode_payload(&program_id, &parsed.parsed);
            Ok(SourceInstruction {
                program_id,
                payload,
            })
        }
        UiInstruction::Parsed(UiParsedInstruction::PartiallyDecoded(partial)) => {
            Ok(SourceInstruction {
                program_id: parse_program_id(&partial.program_id)?,
                payload: InstructionPayload::Undecoded,
            })
        }
        UiInstruction::Compiled(_) => Err(DecodeError::CompiledInstruction { index }),
    }
}

/// Interpret the `parsed` object of an instruction
///
/// Only system program transfers get a typed payload. Any field that fails to
/// decode downgrades the instruction to `Parsed { kind }` so it is skipped
/// rather than replicated with wrong values.
pub fn decode_payload(program_id: &Pubkey, parsed: &Value) -> InstructionPayload {
    let kind = parsed
        .get("type")
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string();

    if *program_id != system_program::id() || kind != SYSTEM_TRANSFER_TYPE {
        return InstructionPayload::Parsed { kind };
    }

    let info = parsed.get("info");
    let pubkey_field = |name: &str| {
        info.and_then(|info| info.get(name))
            .and_then(Value::as_str)
            .and_then(|s| Pubkey::from_str(s).ok())
    };

    match (
        pubkey_field("source"),
        pubkey_field("destination"),
        info.and_then(|info| info.get("lamports")).and_then(lamports_from_json),
    ) {
        (Some(source), Some(destination), Some(lamports)) => {
            InstructionPayload::Transfer(TransferPayload {
                source,
                destination,
                lamports,
            })
        }
        _ => {
            tracing::debug!(program = %program_id, "transfer payload incomplete, not decoded");
            InstructionPayload::Parsed { kind }
        }
    }
}

/// Lamport amounts are integers on the wire; a float is floored
fn lamports_from_json(value: &Value) -> Option<u64> {
    if let Some(lamports) = value.as_u64() {
        return Some(lamports);
    }
    value
        .as_f64()
        .filter(|v| v.is_finite() && *v >= 0.0 && *v <= u64::MAX as f64)
        .map(|v| v.floor() as u64)
}

fn parse_program_id(raw: &str) -> Result<Pubkey, DecodeError> {
    Pubkey::from_str(raw).map_err(|_| DecodeError::InvalidProgramId(raw.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use solana_sdk::hash::Hash;

    const SLOT: Slot = 4_321;

    /// `getTransaction` result body around `transaction`
    fn confirmed(transaction: Value) -> EncodedConfirmedTransactionWithStatusMeta {
        serde_json::from_value(json!({
            "slot": SLOT,
            "transaction": transaction,
            "meta": null,
            "blockTime": null
        }))
        .unwrap()
    }

    fn parsed_message(signature: &Signature, instructions: Vec<Value>) -> Value {
        json!({
            "signatures": [signature.to_string()],
            "message": {
                "accountKeys": [{
                    "pubkey": Pubkey::new_unique().to_string(),
                    "writable": true,
                    "signer": true,
                    "source": "transaction"
                }],
                "recentBlockhash": Hash::default().to_string(),
                "instructions": instructions
            }
        })
    }

    fn system_transfer(destination: &Pubkey, lamports: u64) -> Value {
        json!({
            "program": "system",
            "programId": system_program::id().to_string(),
            "parsed": transfer_json(&Pubkey::new_unique(), destination, json!(lamports)),
            "stackHeight": null
        })
    }

    fn compiled_instruction() -> Value {
        json!({
            "programIdIndex": 0,
            "accounts": [0],
            "data": "3Bxs4h24hBtQy9rw",
            "stackHeight": null
        })
    }

    fn transfer_json(source: &Pubkey, destination: &Pubkey, lamports: Value) -> Value {
        json!({
            "type": "transfer",
            "info": {
                "source": source.to_string(),
                "destination": destination.to_string(),
                "lamports": lamports,
            }
        })
    }

    #[test]
    fn test_decode_system_transfer() {
        let source = Pubkey::new_unique();
        let destination = Pubkey::new_unique();
        let payload = decode_payload(
            &system_program::id(),
            &transfer_json(&source, &destination, json!(1_500_000_000u64)),
        );

        assert_eq!(
            payload,
            InstructionPayload::Transfer(TransferPayload {
                source,
                destination,
                lamports: 1_500_000_000,
            })
        );
    }

    #[test]
    fn test_fractional_lamports_are_floored() {
        let source = Pubkey::new_unique();
        let destination = Pubkey::new_unique();
        let payload = decode_payload(
            &system_program::id(),
            &transfer_json(&source, &destination, json!(42.9)),
        );

        match payload {
            InstructionPayload::Transfer(t) => assert_eq!(t.lamports, 42),
            other => panic!("expected transfer, got {other:?}"),
        }
    }

    #[test]
    fn test_other_system_instruction_is_not_transfer() {
        let parsed = json!({
            "type": "createAccount",
            "info": { "lamports": 1000, "space": 0 }
        });
        assert_eq!(
            decode_payload(&system_program::id(), &parsed),
            InstructionPayload::Parsed {
                kind: "createAccount".to_string()
            }
        );
    }

    #[test]
    fn test_transfer_type_from_other_program_is_not_transfer() {
        let token_program = Pubkey::new_unique();
        let parsed = transfer_json(&Pubkey::new_unique(), &Pubkey::new_unique(), json!(10));
        assert_eq!(
            decode_payload(&token_program, &parsed),
            InstructionPayload::Parsed {
                kind: "transfer".to_string()
            }
        );
    }

    #[test]
    fn test_incomplete_transfer_is_not_decoded() {
        let parsed = json!({
            "type": "transfer",
            "info": { "source": Pubkey::new_unique().to_string(), "lamports": 5 }
        });
        assert!(matches!(
            decode_payload(&system_program::id(), &parsed),
            InstructionPayload::Parsed { .. }
        ));

        let negative = transfer_json(&Pubkey::new_unique(), &Pubkey::new_unique(), json!(-1));
        assert!(matches!(
            decode_payload(&system_program::id(), &negative),
            InstructionPayload::Parsed { .. }
        ));
    }

    #[test]
    fn test_decode_parsed_ui_instruction() {
        let destination = Pubkey::new_unique();
        let ui: UiInstruction = serde_json::from_value(json!({
            "program": "system",
            "programId": system_program::id().to_string(),
            "parsed": transfer_json(&Pubkey::new_unique(), &destination, json!(7)),
            "stackHeight": null
        }))
        .unwrap();

        let ix = decode_instruction(0, &ui).unwrap();
        assert_eq!(ix.program_id, system_program::id());
        match ix.payload {
            InstructionPayload::Transfer(t) => {
                assert_eq!(t.destination, destination);
                assert_eq!(t.lamports, 7);
            }
            other => panic!("expected transfer, got {other:?}"),
        }
    }

    #[test]
    fn test_decode_partially_decoded_ui_instruction() {
        let program = Pubkey::new_unique();
        let ui: UiInstruction = serde_json::from_value(json!({
            "programId": program.to_string(),
            "accounts": [Pubkey::new_unique().to_string()],
            "data": "3Bxs4h24hBtQy9rw",
            "stackHeight": null
        }))
        .unwrap();

        let ix = decode_instruction(0, &ui).unwrap();
        assert_eq!(ix.program_id, program);
        assert_eq!(ix.payload, InstructionPayload::Undecoded);
    }

    #[test]
    fn test_decode_json_parsed_transaction() {
        let signature = Signature::from([7u8; 64]);
        let destination = Pubkey::new_unique();
        let other_program = Pubkey::new_unique();
        let encoded = confirmed(parsed_message(
            &signature,
            vec![
                json!({
                    "programId": other_program.to_string(),
                    "accounts": [],
                    "data": "3Bxs4h24hBtQy9rw",
                    "stackHeight": null
                }),
                system_transfer(&destination, 2_000_000),
            ],
        ));

        let tx = decode_transaction(signature, encoded).unwrap();

        assert_eq!(tx.signature, signature);
        assert_eq!(tx.slot, SLOT);
        assert_eq!(tx.instructions.len(), 2);
        assert_eq!(tx.instructions[0].program_id, other_program);
        assert_eq!(tx.instructions[0].payload, InstructionPayload::Undecoded);
        match &tx.instructions[1].payload {
            InstructionPayload::Transfer(t) => {
                assert_eq!(t.destination, destination);
                assert_eq!(t.lamports, 2_000_000);
            }
            other => panic!("expected transfer, got {other:?}"),
        }
    }

    #[test]
    fn test_binary_encoding_is_malformed() {
        let encoded = confirmed(json!(["AQID", "base64"]));
        assert_eq!(
            decode_transaction(Signature::default(), encoded),
            Err(DecodeError::NotJson)
        );
    }

    #[test]
    fn test_raw_message_is_malformed() {
        let encoded = confirmed(json!({
            "signatures": [Signature::default().to_string()],
            "message": {
                "header": {
                    "numRequiredSignatures": 1,
                    "numReadonlySignedAccounts": 0,
                    "numReadonlyUnsignedAccounts": 1
                },
                "accountKeys": [
                    Pubkey::new_unique().to_string(),
                    system_program::id().to_string()
                ],
                "recentBlockhash": Hash::default().to_string(),
                "instructions": [compiled_instruction()]
            }
        }));
        assert_eq!(
            decode_transaction(Signature::default(), encoded),
            Err(DecodeError::RawMessage)
        );
    }

    #[test]
    fn test_compiled_instruction_in_parsed_message_is_malformed() {
        let signature = Signature::default();
        let encoded = confirmed(parsed_message(
            &signature,
            vec![
                system_transfer(&Pubkey::new_unique(), 1),
                compiled_instruction(),
            ],
        ));
        assert_eq!(
            decode_transaction(signature, encoded),
            Err(DecodeError::CompiledInstruction { index: 1 })
        );
    }
}
