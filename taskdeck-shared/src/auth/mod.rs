/// Authentication utilities
///
/// This module provides the authentication primitives for TaskDeck:
///
/// # Modules
///
/// - [`jwt`]: Token codec (issue and verify signed identity claims)
/// - [`password`]: Argon2id password hashing and validation
/// - [`gate`]: Session gate (route classification, credential extraction, verification)
///
/// # Example
///
/// ```no_run
/// use taskdeck_shared::auth::password::{hash_password, verify_password};
/// use taskdeck_shared::auth::jwt::{create_token, validate_token, Claims};
/// use uuid::Uuid;
///
/// # fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let hash = hash_password("user_password")?;
/// assert!(verify_password("user_password", &hash)?);
///
/// let claims = Claims::new(Uuid::new_v4(), "user@example.com");
/// let token = create_token(&claims, "secret-key")?;
/// let verified = validate_token(&token, "secret-key")?;
/// assert_eq!(verified.email, "user@example.com");
/// # Ok(())
/// # }
/// ```

pub mod gate;
pub mod jwt;
pub mod password;
