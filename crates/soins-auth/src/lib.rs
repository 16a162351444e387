pub mod dto;
pub mod entities;
pub mod error;
pub mod password;
pub mod permissions;
pub mod rate_limit;
pub mod service;
pub mod session;
pub mod token;

pub use dto::{
    ApiSuccess, ChangePasswordData, ChangePasswordRequest, LoginData, LoginRequest,
    LogoutResponse, MeData, SessionInfo, SetupState, UserPayload,
};
pub use error::AuthError;
pub use permissions::{ModuleGrant, PermissionMatrix, PermissionResolver, RubricGrant};
pub use rate_limit::{LoginRateLimiter, RateLimitDecision};
pub use service::{AuthService, LoginInput};
pub use session::{SessionData, SessionStore};
