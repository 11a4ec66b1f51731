//! IPC Handler for Edition Assignment
//!
//! Validates the product identifier, delegates to the service and maps every
//! failure onto an `ErrorCode`. Never panics on bad input.

use crate::domain::errors::AssignmentError;
use crate::domain::value_objects::ProductId;
use crate::ipc::payloads::{AssignEditionsRequest, AssignEditionsResponse, ErrorCode};
use crate::ports::inbound::EditionAssignmentApi;
use std::sync::Arc;
use std::time::Instant;
use tracing::{error, info, warn};

/// IPC Handler for Edition Assignment.
pub struct EditionAssignmentHandler<A: EditionAssignmentApi> {
    service: Arc<A>,
}

impl<A: EditionAssignmentApi> EditionAssignmentHandler<A> {
    pub fn new(service: Arc<A>) -> Self {
        Self { service }
    }

    /// Handle an AssignEditionsRequest.
    pub async fn handle_assign_editions(
        &self,
        request: AssignEditionsRequest,
    ) -> AssignEditionsResponse {
        let start_time = Instant::now();
        let correlation_id = request.correlation_id;

        let product_id = match ProductId::parse(&request.product_id) {
            Ok(id) => id,
            Err(e) => {
                warn!(
                    "[editions] Rejected request {} from {:?}: {}",
                    correlation_id, request.caller, e
                );
                return AssignEditionsResponse::failure(
                    correlation_id,
                    ErrorCode::InvalidRequest,
                    e.to_string(),
                    elapsed_ms(start_time),
                );
            }
        };

        info!(
            "[editions] Processing AssignEditionsRequest for {} from {:?}{}",
            product_id,
            request.caller,
            if request.dry_run { " (dry run)" } else { "" }
        );

        let outcome = if request.dry_run {
            self.service
                .preview_assignment(&product_id)
                .await
                .map(|plan| (plan.assigned_count(), plan.reserved.len()))
        } else {
            self.service
                .assign_editions(&product_id)
                .await
                .map(|report| (report.assigned, report.reserved))
        };

        match outcome {
            Ok((assigned, reserved)) => {
                info!(
                    "[editions] ✓ {} editions for {} ({} reserved)",
                    assigned, product_id, reserved
                );
                AssignEditionsResponse {
                    correlation_id,
                    success: true,
                    assigned_count: saturating_u32(assigned),
                    reserved_count: saturating_u32(reserved),
                    error: None,
                    error_code: None,
                    elapsed_ms: elapsed_ms(start_time),
                }
            }
            Err(e) => {
                error!("[editions] ❌ Assignment for {} failed: {}", product_id, e);
                AssignEditionsResponse::failure(
                    correlation_id,
                    error_code(&e),
                    e.to_string(),
                    elapsed_ms(start_time),
                )
            }
        }
    }
}

fn error_code(err: &AssignmentError) -> ErrorCode {
    match err {
        AssignmentError::CapacityExceeded { .. } => ErrorCode::CapacityExceeded,
        AssignmentError::ProductNotFound(_) => ErrorCode::ProductNotFound,
        AssignmentError::InvalidProductId(_) | AssignmentError::TooManyLineItems { .. } => {
            ErrorCode::InvalidRequest
        }
        AssignmentError::LockTimeout { .. } => ErrorCode::LockTimeout,
        AssignmentError::LineItemNotFound(_)
        | AssignmentError::NotAssigned(_)
        | AssignmentError::AlreadyClaimed(_)
        | AssignmentError::InactiveLineItem(_)
        | AssignmentError::Store(_) => ErrorCode::Internal,
    }
}

fn elapsed_ms(start: Instant) -> u64 {
    start.elapsed().as_millis() as u64
}

fn saturating_u32(n: usize) -> u32 {
    u32::try_from(n).unwrap_or(u32::MAX)
}
