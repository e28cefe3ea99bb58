//! Online-learning bandits: Beta-posterior Thompson sampling and LinUCB.

pub mod beta;
pub mod linucb;
pub mod selector;
pub mod types;

pub use beta::{BetaBandit, BetaBanditState};
pub use linucb::{LinUcbBandit, LinUcbConfig, LinUcbState};
pub use selector::{SelectionPath, select_top_k};
pub use types::{BetaPosterior, Candidate, PARAM_FLOOR, Selection};
