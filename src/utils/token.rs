use rand::{distributions::Alphanumeric, thread_rng, Rng};

/// Opaque credential identifying a response session to an anonymous
/// respondent. Alphanumeric only so it survives URLs and local storage.
pub fn generate_session_token(length: usize) -> String {
    thread_rng()
        .sample_iter(&Alphanumeric)
        .take(length)
        .map(char::from)
        .collect()
}
