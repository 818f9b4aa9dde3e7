pub mod app;
pub mod auth;
pub mod config;
pub mod debounce;
pub mod entitlement;
pub mod language;
pub mod state;
#[cfg(test)]
mod test_http;
pub mod translate;
