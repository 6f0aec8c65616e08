//! Authentication and authorization utilities
//!
//! # Modules
//!
//! - [`confirmation_code`]: One-time signup codes and their hashes
//! - [`jwt`]: Access token generation and validation
//! - [`middleware`]: Bearer token extraction and caller lookup
//! - [`authorization`]: Access policies for each resource
//!
//! # Example
//!
//! ```
//! use yamdb_shared::auth::confirmation_code::generate_code;
//! use yamdb_shared::auth::jwt::{create_token, validate_token, Claims};
//!
//! # fn example() -> Result<(), Box<dyn std::error::Error>> {
//! // Mailed to the user; only the hash is stored
//! let (code, code_hash) = generate_code();
//!
//! // Issued once the code is exchanged
//! let token = create_token(&Claims::new(1), "secret-key-of-at-least-32-bytes!")?;
//! assert_eq!(validate_token(&token, "secret-key-of-at-least-32-bytes!")?.user_id()?, 1);
//! # let _ = (code, code_hash);
//! # Ok(())
//! # }
//! ```

pub mod authorization;
pub mod confirmation_code;
pub mod jwt;
pub mod middleware;
