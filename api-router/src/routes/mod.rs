pub mod auth;
pub mod interview;
pub mod liveness;
pub mod readiness;
pub mod search;
pub mod sessions;
pub mod speech;
pub mod technical;
