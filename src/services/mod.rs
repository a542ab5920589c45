// 服务模块
// 提供核心业务逻辑服务

pub mod answers;
pub mod api;
pub mod auth;
pub mod challenge;
pub mod content;
pub mod markdown;
pub mod progression;
pub mod session;

#[cfg(test)]
pub(crate) mod test_support;

pub use api::ApiClient;
pub use auth::{guard, AuthContext, Route};
pub use challenge::{ChallengeMode, ChallengeRound, ChallengeSummary};
pub use progression::{ExerciseAttempt, ExerciseNavigator, PracticeSession};
pub use session::SessionStore;
