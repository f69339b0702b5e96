use anchor_lang::prelude::*;
use solana_sdk::{
    instruction::InstructionError, signature::Signature, transaction::TransactionError,
};
use thiserror::Error;

/// Custom error codes raised by the launchpad program.
///
/// Anchor offsets these by 6000, so `InvalidAmount` arrives as
/// `InstructionError(_, Custom(6000))` in a failed transaction.
#[error_code]
#[derive(PartialEq, Eq)]
pub enum ProgramErrorCode {
    #[msg("Invalid amount: must be greater than zero")]
    InvalidAmount,

    #[msg("Invalid reserves: reserves must be greater than zero")]
    InvalidReserves,

    #[msg("Math overflow occurred")]
    MathOverflow,

    #[msg("Insufficient liquidity in bonding curve")]
    InsufficientLiquidity,

    #[msg("Bonding curve already migrated")]
    AlreadyMigrated,

    #[msg("Slippage tolerance exceeded")]
    SlippageExceeded,

    #[msg("Unauthorized: invalid authority")]
    Unauthorized,

    #[msg("Invalid token mint")]
    InvalidTokenMint,

    #[msg("Unlock conditions not met")]
    UnlockConditionsNotMet,

    #[msg("First buyer tokens already unlocked")]
    AlreadyUnlocked,

    #[msg("Only the first buyer can unlock")]
    NotFirstBuyer,
}

impl ProgramErrorCode {
    const ALL: [ProgramErrorCode; 11] = [
        ProgramErrorCode::InvalidAmount,
        ProgramErrorCode::InvalidReserves,
        ProgramErrorCode::MathOverflow,
        ProgramErrorCode::InsufficientLiquidity,
        ProgramErrorCode::AlreadyMigrated,
        ProgramErrorCode::SlippageExceeded,
        ProgramErrorCode::Unauthorized,
        ProgramErrorCode::InvalidTokenMint,
        ProgramErrorCode::UnlockConditionsNotMet,
        ProgramErrorCode::AlreadyUnlocked,
        ProgramErrorCode::NotFirstBuyer,
    ];

    /// Map a custom instruction error number back to the program's code
    pub fn from_custom(code: u32) -> Option<Self> {
        Self::ALL.into_iter().find(|c| u32::from(*c) == code)
    }

    /// Decode the program error carried by a failed transaction, if any
    pub fn from_transaction_error(err: &TransactionError) -> Option<Self> {
        match err {
            TransactionError::InstructionError(_, InstructionError::Custom(code)) => {
                Self::from_custom(*code)
            }
            _ => None,
        }
    }
}

/// Rejected before any network call
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InputError {
    #[error("amount must be greater than zero")]
    NonPositiveAmount,

    #[error("wallet not connected")]
    WalletNotConnected,

    #[error("slippage of {0} bps exceeds 10000")]
    InvalidSlippage(u16),

    #[error("wallet {0} is not the oracle authority")]
    Unauthorized(Pubkey),
}

/// Quote or reserve arithmetic failure, fatal to the current attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum CurveError {
    #[error("invalid reserves: reserves must be greater than zero")]
    InvalidReserves,

    #[error("reserve inconsistency: computed reserves violate the curve invariant")]
    ReserveInconsistency,

    #[error("bonding curve has empty reserves")]
    EmptyReserves,

    #[error("trade would produce zero output")]
    ZeroOutput,

    #[error("math overflow occurred")]
    MathOverflow,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubmissionStage {
    Fetch,
    Build,
    Blockhash,
    Signing,
    Send,
    Confirm,
}

impl std::fmt::Display for SubmissionStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            SubmissionStage::Fetch => "fetch",
            SubmissionStage::Build => "build",
            SubmissionStage::Blockhash => "blockhash",
            SubmissionStage::Signing => "signing",
            SubmissionStage::Send => "send",
            SubmissionStage::Confirm => "confirm",
        };
        f.write_str(s)
    }
}

/// Every error the client surfaces. `Clone` so a deduplicated result can be
/// handed to every waiter.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum LaunchpadError {
    #[error(transparent)]
    Input(#[from] InputError),

    #[error(transparent)]
    Curve(#[from] CurveError),

    #[error("transaction {stage} failed: {message}")]
    Submission {
        stage: SubmissionStage,
        message: String,
    },

    #[error("transaction was already processed but its signature could not be recovered; check your transaction history")]
    AlreadyProcessedUnverified,

    #[error("blockhash expired before confirmation; resubmit with a fresh blockhash")]
    BlockhashExpired,

    #[error("transaction {signature} failed on-chain: {message}")]
    TransactionFailed {
        signature: Signature,
        error: TransactionError,
        program_error: Option<ProgramErrorCode>,
        message: String,
    },

    #[error("account {0} not found")]
    AccountNotFound(Pubkey),

    #[error("account {address} could not be decoded: {message}")]
    AccountDecode { address: Pubkey, message: String },

    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("creation workflow out of order: {0}")]
    Workflow(String),
}

impl LaunchpadError {
    /// Whether re-invoking the high level operation (with a fresh key) is safe
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            LaunchpadError::Submission { .. } | LaunchpadError::BlockhashExpired
        )
    }

    pub(crate) fn submission(stage: SubmissionStage, message: impl Into<String>) -> Self {
        LaunchpadError::Submission {
            stage,
            message: message.into(),
        }
    }

    pub(crate) fn failed(signature: Signature, error: TransactionError) -> Self {
        let program_error = ProgramErrorCode::from_transaction_error(&error);
        let message = match program_error {
            Some(code) => code.to_string(),
            None => error.to_string(),
        };
        LaunchpadError::TransactionFailed {
            signature,
            error,
            program_error,
            message,
        }
    }
}

pub type LaunchpadResult<T> = std::result::Result<T, LaunchpadError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_custom_code_round_trips_through_offset() {
        assert_eq!(u32::from(ProgramErrorCode::InvalidAmount), 6000);
        assert_eq!(
            ProgramErrorCode::from_custom(6008),
            Some(ProgramErrorCode::UnlockConditionsNotMet)
        );
        assert_eq!(ProgramErrorCode::from_custom(42), None);
    }

    #[test]
    fn test_decodes_program_error_from_failed_transaction() {
        let err = TransactionError::InstructionError(1, InstructionError::Custom(6005));
        let failed = LaunchpadError::failed(Signature::default(), err);
        match failed {
            LaunchpadError::TransactionFailed {
                program_error,
                message,
                ..
            } => {
                assert_eq!(program_error, Some(ProgramErrorCode::SlippageExceeded));
                assert_eq!(message, "Slippage tolerance exceeded");
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn test_retryable_kinds() {
        assert!(LaunchpadError::BlockhashExpired.is_retryable());
        assert!(LaunchpadError::submission(SubmissionStage::Send, "boom").is_retryable());
        assert!(!LaunchpadError::AlreadyProcessedUnverified.is_retryable());
        assert!(!LaunchpadError::from(CurveError::ReserveInconsistency).is_retryable());
    }
}
