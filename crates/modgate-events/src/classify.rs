//! Warning classification.
//!
//! A batch that produced warnings is still a successful batch unless one
//! of them is critical. Only the codes in [`NON_CRITICAL_WARNING_CODES`]
//! are tolerated; any other code escalates the whole response, and the
//! *first* warning of the list (not the most severe) becomes the
//! response's error.

use modgate_protocol::{BackendErrorCode, Warning};

/// Warning codes that leave a batch successful.
pub const NON_CRITICAL_WARNING_CODES: &[BackendErrorCode] = &[BackendErrorCode::NOT_ENOUGH_SPACE];

/// How a finished batch is reported.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Classification {
    /// No warning, or only non-critical ones.
    Success,
    /// At least one critical warning. Carries what the response surfaces.
    Critical {
        code: BackendErrorCode,
        message: String,
    },
}

impl Classification {
    /// Whether this is [`Classification::Critical`].
    pub fn is_critical(&self) -> bool {
        matches!(self, Self::Critical { .. })
    }
}

/// Whether `code` is on the non-critical allow-list.
pub fn is_non_critical(code: BackendErrorCode) -> bool {
    NON_CRITICAL_WARNING_CODES.contains(&code)
}

/// Classifies a batch's accumulated warnings.
///
/// The surfaced code is the first warning's; a first warning without a
/// code (`NONE`) surfaces [`BackendErrorCode::UNKNOWN_ERROR`].
pub fn classify(warnings: &[Warning]) -> Classification {
    if warnings.iter().all(|w| is_non_critical(w.code)) {
        return Classification::Success;
    }

    // `all` returned false, so the list is not empty.
    let first = &warnings[0];
    let code = if first.code == BackendErrorCode::NONE {
        BackendErrorCode::UNKNOWN_ERROR
    } else {
        first.code
    };
    Classification::Critical {
        code,
        message: first.errmsg.clone(),
    }
}
