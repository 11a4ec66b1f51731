//! IPC Payloads for Edition Assignment

use serde::{Deserialize, Serialize};
use uuid::Uuid;

// ============================================================
// INCOMING REQUESTS
// ============================================================

/// Who is asking for the run. Logged only; every caller may assign.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CallerKind {
    OrderSync,
    Admin,
    CheckoutHook,
}

/// Request to (re)number the active line items of one product.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AssignEditionsRequest {
    /// Correlation ID for response tracking
    pub correlation_id: Uuid,
    /// Raw product identifier, validated by the handler
    pub product_id: String,
    pub caller: CallerKind,
    /// Plan only, write nothing
    #[serde(default)]
    pub dry_run: bool,
}

impl AssignEditionsRequest {
    pub fn new(product_id: impl Into<String>, caller: CallerKind) -> Self {
        Self {
            correlation_id: Uuid::new_v4(),
            product_id: product_id.into(),
            caller,
            dry_run: false,
        }
    }

    pub fn dry_run(mut self) -> Self {
        self.dry_run = true;
        self
    }
}

// ============================================================
// OUTGOING RESPONSES
// ============================================================

/// Machine-readable failure class.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCode {
    /// Oversell: more active items than the edition allows
    CapacityExceeded,
    ProductNotFound,
    InvalidRequest,
    LockTimeout,
    Internal,
}

/// Response to an assignment request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AssignEditionsResponse {
    /// Correlation ID from request
    pub correlation_id: Uuid,
    pub success: bool,
    /// Items numbered (or that would be, on a dry run)
    pub assigned_count: u32,
    /// Claimed numbers skipped over
    pub reserved_count: u32,
    /// Error message (if failed)
    pub error: Option<String>,
    pub error_code: Option<ErrorCode>,
    pub elapsed_ms: u64,
}

impl AssignEditionsResponse {
    pub fn failure(
        correlation_id: Uuid,
        code: ErrorCode,
        message: impl Into<String>,
        elapsed_ms: u64,
    ) -> Self {
        Self {
            correlation_id,
            success: false,
            assigned_count: 0,
            reserved_count: 0,
            error: Some(message.into()),
            error_code: Some(code),
            elapsed_ms,
        }
    }
}
