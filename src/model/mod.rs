pub mod generated;
pub mod llm_decode;
pub mod scenario;
pub mod session;
pub mod turn;
