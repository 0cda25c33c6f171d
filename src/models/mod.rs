pub mod credit_score;
pub mod record;
pub mod session;
