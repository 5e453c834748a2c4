//! cardwise-core: rule matching and reward valuation for picking the best card
//! for a purchase.
//!
//! Pure and synchronous; the engine never mutates its inputs.

pub mod card;
pub mod pairing;
pub mod purchase;
pub mod ranker;
pub mod resolver;
pub mod reward;
pub mod time;

pub use card::{
    Card, CapType, Caps, CategoryOption, ConfigurableCategory, Conditions, Mcc, MccRange,
    PromoPeriod, Rule, WhitelistMode,
};
pub use pairing::WrapperPolicy;
pub use purchase::{CardConfig, CardConfigs, Channel, Purchase};
pub use ranker::{all_base_rate, calculate_results, rank, recommend, Recommendation};
pub use resolver::{resolve, Resolution};
pub use reward::{compute_reward, evaluate, RewardResult, WrapperApplied, MILE_VALUATIONS};
pub use time::{now_in, parse_eval_time};
