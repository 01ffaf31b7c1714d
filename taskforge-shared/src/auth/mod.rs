/// Authentication and authorization primitives
///
/// - [`password`]: Argon2id password hashing and verification
/// - [`jwt`]: session token issuance, validation, and revocation
/// - [`authorization`]: role and ownership checks
///
/// Passwords are only ever handled as Argon2id PHC hashes; tokens are HS256
/// JWTs carrying the user id and issue time. Revocation is cache-backed and
/// best-effort by design.

pub mod authorization;
pub mod jwt;
pub mod password;
