pub mod auth;
pub mod devices;
pub mod oauth;

use validator::{Validate, ValidationErrors};

use crate::error::AppError;

/// Run `validator` rules on a request body, joining field messages.
pub(crate) fn validate_request<T: Validate>(input: &T) -> Result<(), AppError> {
    input
        .validate()
        .map_err(|e| AppError::BadRequest(describe(&e)))
}

fn describe(errors: &ValidationErrors) -> String {
    let mut messages: Vec<String> = errors
        .field_errors()
        .iter()
        .map(|(field, errs)| {
            let detail = errs
                .iter()
                .filter_map(|e| e.message.as_ref().map(|m| m.to_string()))
                .collect::<Vec<_>>()
                .join(", ");
            if detail.is_empty() {
                format!("{field} is invalid")
            } else {
                detail
            }
        })
        .collect();
    messages.sort();
    messages.join("; ")
}
