use rand::Rng;
use uuid::Uuid;

pub const VERIFICATION_CODE_LENGTH: usize = 4;

/// Uniformly random 4-digit code, leading zeros included ("0000".."9999").
pub fn generate_verification_code() -> String {
    let mut rng = rand::thread_rng();
    format!("{:04}", rng.gen_range(0..10_000u32))
}

/// Opaque identifier for a verification session.
pub fn generate_session_id() -> String {
    Uuid::new_v4().to_string()
}

pub fn is_valid_verification_code(code: &str) -> bool {
    code.len() == VERIFICATION_CODE_LENGTH && code.chars().all(|c| c.is_ascii_digit())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generate_verification_code() {
        for _ in 0..200 {
            let code = generate_verification_code();
            assert!(is_valid_verification_code(&code), "bad code {code}");
        }
    }

    #[test]
    fn test_session_ids_differ() {
        assert_ne!(generate_session_id(), generate_session_id());
    }

    #[test]
    fn test_is_valid_verification_code() {
        assert!(is_valid_verification_code("0042"));
        assert!(!is_valid_verification_code("042"));
        assert!(!is_valid_verification_code("12345"));
        assert!(!is_valid_verification_code("12a4"));
    }
}
