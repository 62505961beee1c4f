mod interceptor;
pub mod policy;

pub(crate) use interceptor::{end_session, renew_and_replay};
pub use policy::{evaluate, is_credential_lifecycle, should_renew, Verdict};
