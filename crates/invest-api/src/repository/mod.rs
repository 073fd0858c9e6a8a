//! 데이터베이스 접근 계층.

pub mod corp_codes;

pub use corp_codes::CorpCodeRepository;
