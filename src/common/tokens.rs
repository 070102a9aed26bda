// src/common/tokens.rs
//
// Tokens opacos (refresh, reset de senha) e códigos OTP.
// O banco só guarda o SHA-256 em hex; o valor em claro sai uma única vez.

use rand::{rngs::OsRng, Rng, RngCore};
use sha2::{Digest, Sha256};

const TOKEN_BYTES: usize = 32;
pub const OTP_DIGITS: usize = 6;

/// Gera um token aleatório de 256 bits em hex (64 caracteres).
pub fn generate_opaque_token() -> String {
    let mut bytes = [0u8; TOKEN_BYTES];
    OsRng.fill_bytes(&mut bytes);
    hex::encode(bytes)
}

/// Código numérico de 6 dígitos (com zeros à esquerda).
pub fn generate_otp_code() -> String {
    let code: u32 = OsRng.gen_range(0..1_000_000);
    format!("{code:0width$}", width = OTP_DIGITS)
}

pub fn hash_token(value: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(value.as_bytes());
    hex::encode(hasher.finalize())
}

/// OTP é amarrado ao e-mail para que o mesmo código não valha para outra conta.
pub fn hash_otp(email: &str, code: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(email.trim().to_lowercase().as_bytes());
    hasher.update(b"|");
    hasher.update(code.as_bytes());
    hex::encode(hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn opaque_tokens_are_unique_hex() {
        let a = generate_opaque_token();
        let b = generate_opaque_token();
        assert_eq!(a.len(), 64);
        assert!(a.chars().all(|c| c.is_ascii_hexdigit()));
        assert_ne!(a, b);
    }

    #[test]
    fn otp_is_six_digits() {
        for _ in 0..100 {
            let code = generate_otp_code();
            assert_eq!(code.len(), OTP_DIGITS);
            assert!(code.chars().all(|c| c.is_ascii_digit()));
        }
    }

    #[test]
    fn hashes_are_stable_and_fit_the_column() {
        assert_eq!(hash_token("abc"), hash_token("abc"));
        assert_ne!(hash_token("abc"), hash_token("abd"));
        assert_eq!(hash_token("abc").len(), 64);
    }

    #[test]
    fn otp_hash_is_bound_to_normalized_email() {
        assert_eq!(hash_otp("Ana@Example.com ", "123456"), hash_otp("ana@example.com", "123456"));
        assert_ne!(hash_otp("ana@example.com", "123456"), hash_otp("bia@example.com", "123456"));
    }
}
