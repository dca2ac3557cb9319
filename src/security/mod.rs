//! # Security Module
//!
//! Credential helpers for handlers. Nothing here is wired into dispatch: a handler (or a
//! wrapper around one) calls these and raises an [`Exception`](crate::error::Exception)
//! when a check fails, which the dispatcher turns into the canonical error response.
//!
//! - [`jwt`] signs and verifies HS512 JSON Web Tokens
//! - [`otp`] generates and validates RFC 6238 time-based one-time passwords
//!
//! ```rust
//! use headway::security::jwt::{self, Claims, VerifyOptions};
//!
//! let secret = jwt::create_key();
//! let claims = Claims { sub: Some("user-1".into()), ..Claims::default() };
//! let token = jwt::sign(&claims, &secret).expect("sign");
//! let back: Option<Claims> = jwt::verify(&token, &secret, &VerifyOptions::default());
//! assert_eq!(back.and_then(|c| c.sub).as_deref(), Some("user-1"));
//! ```

pub mod jwt;
pub mod otp;

pub use jwt::{bearer_token, Claims, JwtError, VerifyOptions};
pub use otp::OtpError;
