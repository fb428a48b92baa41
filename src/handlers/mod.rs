//! Handler system
//!
//! Write endpoints delegate their domain logic to handlers. A handler is
//! built per request by a factory registered under a name, bound to the
//! request, the view's record set and a context map.
//!
//! ## Key Components
//!
//! - [`Handler`] - trait with the `validate` / `create` steps
//! - [`HandlerRegistry`] - named factories resolved by views
//! - [`ValidatedData`] - data map carrying errors and the toast value
//! - [`required_field_validation`] - first-missing-field check
//!
//! ## Example
//!
//! ```rust,ignore
//! use weepstay::handlers::HandlerRegistry;
//!
//! let registry = HandlerRegistry::with_defaults();
//! let mut handler = registry.build("country.create", ctx)?;
//! let mut data = handler.validate(input).await?;
//! let payload = handler.create(&mut data).await?;
//! ```

mod region;
mod registry;
mod token;
mod traits;
pub(crate) mod types;
mod user;

pub use region::{RegionCreate, RegionDelete, RegionSummary, RegionUpdate};
pub use registry::{HandlerRegistry, RegistryError};
pub use token::TokenBlacklist;
pub use traits::{Handler, HandlerError, HandlerFactory, ValidationError};
pub use types::{
    is_truthy, required_field_validation, DataMap, ErrorMessage, HandlerContext, MissingField,
    ValidatedData, ERROR_MESSAGE_KEY, FIELD_ERRORS_KEY, TOAST_MESSAGE_KEY,
};
pub use user::{RoleCreate, UserCreate, UserDelete};
