//! DART (금융감독원 전자공시) 연동 모듈.
//!
//! 이 크레이트는 DART Open API를 통해 기업 코드 마스터, 기업 개황,
//! 재무제표, 공시 목록을 조회하는 클라이언트를 제공합니다.
//!
//! # 사용 예제
//!
//! ```rust,ignore
//! use invest_dart::{DartClient, DartConfig, FsDiv, ReportCode};
//!
//! let config = DartConfig::from_env().expect("DART_API_KEY");
//! let client = DartClient::new(config)?;
//!
//! let corps = client.download_corp_codes().await?;
//! let listed = corps.iter().filter(|c| c.is_listed()).count();
//! println!("상장사 {} 곳", listed);
//! ```

pub mod client;
pub mod config;
pub mod corp_code;
pub mod error;

pub use client::{
    CompanyProfile, DartClient, Disclosure, DisclosurePage, FinancialAccount, FsDiv, ReportCode,
};
pub use config::DartConfig;
pub use corp_code::{parse_corp_code_archive, parse_corp_code_xml};
pub use error::DartError;
