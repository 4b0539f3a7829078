//! The ChatWire session layer: login, cookie persistence, prompt/response.

pub mod contract;
pub mod cookie_store;
pub mod login;
pub mod respond;
pub mod session;

#[cfg(test)]
mod testutil;

pub use contract::PageContract;
pub use cookie_store::CookieStore;
pub use login::LoginMethod;
pub use respond::ResponseWait;
pub use session::ChatSession;
