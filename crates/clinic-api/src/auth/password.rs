//! 비밀번호 해싱 유틸리티.
//!
//! Argon2 기반 비밀번호 해싱 및 검증. 72바이트를 넘는 입력은 해싱 전에
//! SHA-256 hex 다이제스트(64바이트)로 축약되어, 긴 비밀번호도 전체
//! 바이트가 결과에 기여합니다.

use std::borrow::Cow;

use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use sha2::{Digest, Sha256};

/// 이 길이를 넘는 입력은 해싱 전에 축약된다 (바이트 단위).
const PREHASH_BOUND_BYTES: usize = 72;

/// 비밀번호 처리 에러.
#[derive(Debug, thiserror::Error)]
pub enum PasswordError {
    #[error("비밀번호 해싱 실패")]
    HashingFailed,
    #[error("비밀번호 검증 실패")]
    VerificationFailed,
    #[error("잘못된 해시 형식")]
    InvalidHashFormat,
}

/// 경계를 넘는 입력을 고정 길이 다이제스트로 정규화.
fn normalize(password: &str) -> Cow<'_, str> {
    if password.len() > PREHASH_BOUND_BYTES {
        Cow::Owned(hex::encode(Sha256::digest(password.as_bytes())))
    } else {
        Cow::Borrowed(password)
    }
}

/// 비밀번호 해싱.
///
/// Argon2id 알고리즘을 사용하며 솔트는 자동으로 생성됩니다. 반환값은
/// 알고리즘 태그와 솔트가 포함된 PHC 형식 문자열이므로, 검증에 별도
/// 상태가 필요 없습니다.
///
/// # Example
///
/// ```rust,ignore
/// let hash = hash_password("my_secure_password").unwrap();
/// // "$argon2id$v=19$m=19456,t=2,p=1$..."
/// ```
pub fn hash_password(password: &str) -> Result<String, PasswordError> {
    let normalized = normalize(password);
    let salt = SaltString::generate(&mut OsRng);
    let argon2 = Argon2::default();

    let hash = argon2
        .hash_password(normalized.as_bytes(), &salt)
        .map_err(|_| PasswordError::HashingFailed)?;

    Ok(hash.to_string())
}

/// 비밀번호 검증.
///
/// 저장된 해시와 입력된 비밀번호를 비교합니다. 해시 문자열이 PHC 형식이
/// 아니면 `InvalidHashFormat`을 반환하며 패닉하지 않습니다. 호출자는
/// 모든 에러를 "자격 증명 불일치"로 취급해야 합니다.
pub fn verify_password(password: &str, hash: &str) -> Result<(), PasswordError> {
    let parsed_hash = PasswordHash::new(hash).map_err(|_| PasswordError::InvalidHashFormat)?;
    let normalized = normalize(password);

    Argon2::default()
        .verify_password(normalized.as_bytes(), &parsed_hash)
        .map_err(|_| PasswordError::VerificationFailed)
}
