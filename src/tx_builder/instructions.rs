//! Translation of watched instructions into operator-signed equivalents
//!
//! Only native system program transfers are replicated. A transfer becomes
//! a transfer of the same amount from the operator to the same destination.
//! Every other instruction is skipped without failing the transaction.

use nonempty::NonEmpty;
use solana_sdk::{pubkey::Pubkey, system_instruction, system_program};
use tracing::debug;

use crate::structured_logging::StructuredLogger;
use crate::types::{InstructionPayload, ParsedTransaction, TranslatedInstruction};

/// Result of translating one watched transaction
#[derive(Debug, Clone, PartialEq)]
pub enum Translation {
    /// At least one instruction to submit, in source order
    Replicate(NonEmpty<TranslatedInstruction>),
    /// No instruction could be translated
    NothingToReplicate,
}

#[derive(Debug, Clone)]
pub struct InstructionTranslator {
    operator: Pubkey,

    /// Accepted for repricing of non-native instructions; transfers copy the
    /// exact amount and never read it
    slippage_tolerance: f64,
}

impl InstructionTranslator {
    pub fn new(operator: Pubkey, slippage_tolerance: f64) -> Self {
        Self {
            operator,
            slippage_tolerance,
        }
    }

    pub fn slippage_tolerance(&self) -> f64 {
        self.slippage_tolerance
    }

    pub fn translate(&self, tx: &ParsedTransaction, logger: &StructuredLogger) -> Translation {
        let mut translated = Vec::new();

        for (index, source) in tx.instructions.iter().enumerate() {
            if source.program_id != system_program::id() {
                debug!(
                    signature = %tx.signature,
                    index,
                    program = %source.program_id,
                    "Skipping instruction of unsupported program"
                );
                continue;
            }

            match &source.payload {
                InstructionPayload::Transfer(transfer) => {
                    let instruction = system_instruction::transfer(
                        &self.operator,
                        &transfer.destination,
                        transfer.lamports,
                    );
                    logger.log_transfer_translated(&transfer.destination, transfer.lamports);
                    translated.push(TranslatedInstruction {
                        instruction,
                        source_index: index,
                        destination: transfer.destination,
                        lamports: transfer.lamports,
                    });
                }
                other => {
                    debug!(
                        signature = %tx.signature,
                        index,
                        payload = ?other,
                        "Skipping non-transfer system instruction"
                    );
                }
            }
        }

        match NonEmpty::from_vec(translated) {
            Some(instructions) => Translation::Replicate(instructions),
            None => Translation::NothingToReplicate,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::SourceInstruction;
    use solana_sdk::signature::Signature;

    fn parsed(instructions: Vec<SourceInstruction>) -> ParsedTransaction {
        ParsedTransaction {
            signature: Signature::default(),
            slot: 100,
            instructions,
        }
    }

    #[test]
    fn test_transfer_is_rebuilt_around_operator() {
        let operator = Pubkey::new_unique();
        let watched = Pubkey::new_unique();
        let destination = Pubkey::new_unique();
        let translator = InstructionTranslator::new(operator, 0.5);

        let tx = parsed(vec![SourceInstruction::transfer(
            watched,
            destination,
            1_500_000_000,
        )]);

        let Translation::Replicate(ixs) = translator.translate(&tx, &StructuredLogger::default())
        else {
            panic!("expected a translated transfer");
        };
        assert_eq!(ixs.len(), 1);

        let translated = ixs.first();
        assert_eq!(translated.destination, destination);
        assert_eq!(translated.lamports, 1_500_000_000);
        assert_eq!(translated.source_index, 0);

        let ix = &translated.instruction;
        assert_eq!(ix.program_id, system_program::id());
        assert_eq!(ix.accounts[0].pubkey, operator);
        assert!(ix.accounts[0].is_signer);
        assert_eq!(ix.accounts[1].pubkey, destination);

        // slippage never touches native amounts
        assert_eq!(translator.slippage_tolerance(), 0.5);
        assert_eq!(transfer_lamports(&ix.data), 1_500_000_000);
    }

    #[test]
    fn test_non_transfer_does_not_block_later_transfers() {
        let operator = Pubkey::new_unique();
        let destination = Pubkey::new_unique();
        let translator = InstructionTranslator::new(operator, 0.5);

        let tx = parsed(vec![
            SourceInstruction::other(Pubkey::new_unique(), "swap"),
            SourceInstruction::other(system_program::id(), "createAccount"),
            SourceInstruction::transfer(Pubkey::new_unique(), destination, 10),
        ]);

        match translator.translate(&tx, &StructuredLogger::default()) {
            Translation::Replicate(ixs) => {
                assert_eq!(ixs.len(), 1);
                assert_eq!(ixs.first().source_index, 2);
                assert_eq!(ixs.first().destination, destination);
            }
            Translation::NothingToReplicate => panic!("transfer should be translated"),
        }
    }

    #[test]
    fn test_multiple_transfers_keep_source_order() {
        let translator = InstructionTranslator::new(Pubkey::new_unique(), 0.5);
        let first = Pubkey::new_unique();
        let second = Pubkey::new_unique();

        let tx = parsed(vec![
            SourceInstruction::transfer(Pubkey::new_unique(), first, 1),
            SourceInstruction::transfer(Pubkey::new_unique(), second, 2),
        ]);

        let Translation::Replicate(ixs) = translator.translate(&tx, &StructuredLogger::default())
        else {
            panic!("expected two transfers");
        };
        let destinations: Vec<_> = ixs.iter().map(|t| t.destination).collect();
        assert_eq!(destinations, vec![first, second]);
    }

    #[test]
    fn test_only_non_transfers_is_nothing_to_replicate() {
        let translator = InstructionTranslator::new(Pubkey::new_unique(), 0.5);
        let tx = parsed(vec![
            SourceInstruction::other(Pubkey::new_unique(), "swap"),
            SourceInstruction {
                program_id: Pubkey::new_unique(),
                payload: InstructionPayload::Undecoded,
            },
        ]);

        assert_eq!(
            translator.translate(&tx, &StructuredLogger::default()),
            Translation::NothingToReplicate
        );
        assert_eq!(
            translator.translate(&parsed(vec![]), &StructuredLogger::default()),
            Translation::NothingToReplicate
        );
    }

    /// System instructions are a u32 LE discriminant followed by fields
    fn transfer_lamports(data: &[u8]) -> u64 {
        assert_eq!(data.len(), 12);
        assert_eq!(&data[..4], &2u32.to_le_bytes(), "transfer discriminant");
        let mut lamports = [0u8; 8];
        lamports.copy_from_slice(&data[4..12]);
        u64::from_le_bytes(lamports)
    }
}
