use crate::core::errors::ApiError;
use crate::rag::Session;

/// Validate a session id taken from the URL or a request body.
pub fn parse_session(id: &str) -> Result<Session, ApiError> {
    Session::parse(id).ok_or_else(|| ApiError::BadRequest(format!("Invalid session id: {:?}", id)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_ids_outside_the_allowed_alphabet() {
        assert!(parse_session("abc").is_ok());
        assert!(matches!(parse_session("../abc"), Err(ApiError::BadRequest(_))));
    }
}
