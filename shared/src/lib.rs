mod activity;
mod issues;
mod text;

#[cfg(feature = "client")]
pub mod github;

#[cfg(feature = "client")]
pub mod telegram;

pub use activity::*;
pub use issues::*;
pub use text::*;

pub type GithubHandle = String;
