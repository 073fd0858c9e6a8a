//! DART Open API 클라이언트.
//!
//! 금융감독원 전자공시시스템(DART) Open API를 통해 기업 공시 데이터를
//! 수집합니다.
//!
//! # 지원 데이터
//!
//! - 기업 코드 마스터 (corpCode.xml, ZIP)
//! - 기업 개황 (company.json)
//! - 단일회사 전체 재무제표 (fnlttSinglAcntAll.json)
//! - 공시 목록 (list.json)
//!
//! # API 문서
//!
//! 공식 문서: <https://opendart.fss.or.kr/guide/main.do>

use crate::config::DartConfig;
use crate::corp_code::parse_corp_code_archive;
use crate::error::DartError;
use chrono::NaiveDate;
use invest_core::CorpCode;
use regex::Regex;
use reqwest::Client;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

/// 보고서 코드.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ReportCode {
    /// 사업보고서 (11011)
    Annual,
    /// 반기보고서 (11012)
    HalfYear,
    /// 1분기보고서 (11013)
    Q1,
    /// 3분기보고서 (11014)
    Q3,
}

impl ReportCode {
    /// DART 보고서 코드 반환.
    pub fn code(&self) -> &'static str {
        match self {
            ReportCode::Annual => "11011",
            ReportCode::HalfYear => "11012",
            ReportCode::Q1 => "11013",
            ReportCode::Q3 => "11014",
        }
    }

    /// 코드 문자열에서 파싱.
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "11011" | "annual" => Some(ReportCode::Annual),
            "11012" | "half" => Some(ReportCode::HalfYear),
            "11013" | "q1" => Some(ReportCode::Q1),
            "11014" | "q3" => Some(ReportCode::Q3),
            _ => None,
        }
    }
}

impl Default for ReportCode {
    fn default() -> Self {
        ReportCode::Annual
    }
}

/// 재무제표 구분 (개별/연결).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FsDiv {
    /// 개별 재무제표
    Ofs,
    /// 연결 재무제표
    Cfs,
}

impl FsDiv {
    /// DART 구분 코드 반환.
    pub fn code(&self) -> &'static str {
        match self {
            FsDiv::Ofs => "OFS",
            FsDiv::Cfs => "CFS",
        }
    }

    /// 코드 문자열에서 파싱.
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_uppercase().as_str() {
            "OFS" => Some(FsDiv::Ofs),
            "CFS" => Some(FsDiv::Cfs),
            _ => None,
        }
    }
}

impl Default for FsDiv {
    fn default() -> Self {
        FsDiv::Cfs
    }
}

/// 기업 개황.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompanyProfile {
    /// DART 고유번호
    pub corp_code: String,
    /// 회사명
    pub corp_name: String,
    /// 영문 회사명
    #[serde(default)]
    pub corp_name_eng: Option<String>,
    /// 종목명
    #[serde(default)]
    pub stock_name: Option<String>,
    /// 종목코드
    #[serde(default, deserialize_with = "empty_as_none")]
    pub stock_code: Option<String>,
    /// 대표자명
    #[serde(rename = "ceo_nm", default)]
    pub ceo_name: Option<String>,
    /// 법인 구분 (Y: 유가, K: 코스닥, N: 코넥스, E: 기타)
    #[serde(rename = "corp_cls", default)]
    pub corp_class: Option<String>,
    /// 설립일 (YYYYMMDD)
    #[serde(rename = "est_dt", default)]
    pub established_date: Option<String>,
    /// 홈페이지
    #[serde(rename = "hm_url", default, deserialize_with = "empty_as_none")]
    pub homepage: Option<String>,
    /// 업종 코드
    #[serde(rename = "induty_code", default)]
    pub industry_code: Option<String>,
}

impl CompanyProfile {
    /// 법인 구분 코드에서 상장 시장 반환 (비상장이면 None).
    pub fn market(&self) -> Option<invest_core::Market> {
        invest_core::Market::from_dart_code(self.corp_class.as_deref()?)
    }
}

/// 재무제표 계정 한 건.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FinancialAccount {
    /// 재무제표 구분 (BS/IS/CIS/CF/SCE)
    #[serde(rename = "sj_div")]
    pub statement_div: String,
    /// 재무제표명
    #[serde(rename = "sj_nm")]
    pub statement_name: String,
    /// 계정명 (예: "자산총계", "영업이익")
    #[serde(rename = "account_nm")]
    pub account_name: String,
    /// 당기명 (예: "제 56 기")
    #[serde(rename = "thstrm_nm", default)]
    pub current_term: Option<String>,
    /// 당기 금액
    #[serde(rename = "thstrm_amount", default, deserialize_with = "amount_as_decimal")]
    pub current_amount: Option<Decimal>,
    /// 전기 금액
    #[serde(rename = "frmtrm_amount", default, deserialize_with = "amount_as_decimal")]
    pub previous_amount: Option<Decimal>,
    /// 전전기 금액
    #[serde(
        rename = "bfefrmtrm_amount",
        default,
        deserialize_with = "amount_as_decimal"
    )]
    pub before_previous_amount: Option<Decimal>,
    /// 통화 단위
    #[serde(default)]
    pub currency: Option<String>,
}

/// 공시 목록 한 건.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Disclosure {
    /// DART 고유번호
    pub corp_code: String,
    /// 회사명
    pub corp_name: String,
    /// 보고서명
    #[serde(rename = "report_nm")]
    pub report_name: String,
    /// 접수번호 (공시 뷰어 URL 구성에 사용)
    #[serde(rename = "rcept_no")]
    pub receipt_no: String,
    /// 제출인명
    #[serde(rename = "flr_nm")]
    pub filer_name: String,
    /// 접수일자 (YYYYMMDD)
    #[serde(rename = "rcept_dt")]
    pub receipt_date: String,
    /// 비고
    #[serde(rename = "rm", default)]
    pub remark: Option<String>,
}

/// 공시 목록 페이지.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DisclosurePage {
    /// 페이지 번호
    pub page_no: u32,
    /// 페이지당 건수
    pub page_count: u32,
    /// 총 건수
    pub total_count: u32,
    /// 총 페이지 수
    pub total_page: u32,
    /// 공시 목록
    pub list: Vec<Disclosure>,
}

/// DART Open API 클라이언트.
#[derive(Clone)]
pub struct DartClient {
    config: DartConfig,
    client: Client,
}

impl DartClient {
    /// 새로운 DART 클라이언트 생성.
    ///
    /// # Errors
    /// HTTP 클라이언트 생성에 실패하면 `DartError::Network`를 반환합니다.
    pub fn new(config: DartConfig) -> Result<Self, DartError> {
        let client = Client::builder()
            .timeout(std::time::Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| DartError::Network(format!("HTTP client 생성 실패: {}", e)))?;

        Ok(Self { config, client })
    }

    /// 기업 코드 마스터 전체 다운로드.
    ///
    /// 전체 파일은 수 MB의 ZIP이며 10만 건 이상의 레코드가 들어 있습니다.
    /// 실패 응답은 ZIP이 아닌 JSON/XML 본문으로 오므로 먼저 status를
    /// 확인합니다.
    pub async fn download_corp_codes(&self) -> Result<Vec<CorpCode>, DartError> {
        let url = format!("{}/api/corpCode.xml", self.config.base_url());

        info!("Downloading DART corp code master...");

        let response = self
            .client
            .get(&url)
            .query(&[("crtfc_key", self.config.api_key.as_str())])
            .send()
            .await
            .map_err(|e| DartError::Network(e.to_string()))?;

        let status = response.status();
        let bytes = response
            .bytes()
            .await
            .map_err(|e| DartError::Network(e.to_string()))?;

        if !status.is_success() {
            return Err(DartError::Api {
                status: status.as_u16().to_string(),
                message: String::from_utf8_lossy(&bytes).to_string(),
            });
        }

        // 인증 실패 등은 200으로 작은 에러 본문이 온다
        if !bytes.starts_with(b"PK") {
            let body = String::from_utf8_lossy(&bytes);
            if let Some((code, message)) = extract_error_status(&body) {
                return Err(DartError::from_status(&code, &message));
            }
            return Err(DartError::Archive(format!(
                "ZIP이 아닌 응답: {}",
                body.chars().take(200).collect::<String>()
            )));
        }

        let corps = parse_corp_code_archive(&bytes)?;
        info!("Corp code master downloaded: {} records", corps.len());
        Ok(corps)
    }

    /// 기업 개황 조회.
    pub async fn get_company(&self, corp_code: &str) -> Result<CompanyProfile, DartError> {
        #[derive(Deserialize)]
        struct CompanyResponse {
            status: String,
            message: String,
            #[serde(flatten)]
            profile: Option<CompanyProfile>,
        }

        let resp: CompanyResponse = self
            .get_json("/api/company.json", &[("corp_code", corp_code)])
            .await?;

        if resp.status != "000" {
            return Err(DartError::from_status(&resp.status, &resp.message));
        }
        resp.profile
            .ok_or_else(|| DartError::Parse("기업 개황 응답 본문 누락".to_string()))
    }

    /// 단일회사 전체 재무제표 조회.
    ///
    /// # 인자
    /// * `corp_code` - DART 고유번호 (8자리)
    /// * `year` - 사업연도 (2015년 이후)
    /// * `report` - 보고서 코드
    /// * `fs_div` - 개별/연결 구분
    pub async fn get_financials(
        &self,
        corp_code: &str,
        year: u16,
        report: ReportCode,
        fs_div: FsDiv,
    ) -> Result<Vec<FinancialAccount>, DartError> {
        #[derive(Deserialize)]
        struct FinancialsResponse {
            status: String,
            message: String,
            #[serde(default)]
            list: Option<Vec<FinancialAccount>>,
        }

        let year_s = year.to_string();
        let resp: FinancialsResponse = self
            .get_json(
                "/api/fnlttSinglAcntAll.json",
                &[
                    ("corp_code", corp_code),
                    ("bsns_year", &year_s),
                    ("reprt_code", report.code()),
                    ("fs_div", fs_div.code()),
                ],
            )
            .await?;

        if resp.status != "000" {
            return Err(DartError::from_status(&resp.status, &resp.message));
        }
        Ok(resp.list.unwrap_or_default())
    }

    /// 공시 목록 조회.
    ///
    /// # 인자
    /// * `corp_code` - DART 고유번호
    /// * `from` / `to` - 접수일 구간
    /// * `page_no` - 페이지 번호 (1부터)
    pub async fn get_disclosures(
        &self,
        corp_code: &str,
        from: NaiveDate,
        to: NaiveDate,
        page_no: u32,
    ) -> Result<DisclosurePage, DartError> {
        #[derive(Deserialize)]
        struct ListResponse {
            status: String,
            message: String,
            #[serde(default, deserialize_with = "lenient_u32")]
            page_no: u32,
            #[serde(default, deserialize_with = "lenient_u32")]
            page_count: u32,
            #[serde(default, deserialize_with = "lenient_u32")]
            total_count: u32,
            #[serde(default, deserialize_with = "lenient_u32")]
            total_page: u32,
            #[serde(default)]
            list: Option<Vec<Disclosure>>,
        }

        let bgn_de = from.format("%Y%m%d").to_string();
        let end_de = to.format("%Y%m%d").to_string();
        let page_s = page_no.to_string();

        let resp: ListResponse = self
            .get_json(
                "/api/list.json",
                &[
                    ("corp_code", corp_code),
                    ("bgn_de", &bgn_de),
                    ("end_de", &end_de),
                    ("page_no", &page_s),
                    ("page_count", "100"),
                ],
            )
            .await?;

        if resp.status != "000" {
            return Err(DartError::from_status(&resp.status, &resp.message));
        }

        Ok(DisclosurePage {
            page_no: resp.page_no,
            page_count: resp.page_count,
            total_count: resp.total_count,
            total_page: resp.total_page,
            list: resp.list.unwrap_or_default(),
        })
    }

    /// JSON 엔드포인트 공통 처리 (인증키 자동 첨부).
    async fn get_json<T: serde::de::DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, &str)],
    ) -> Result<T, DartError> {
        let url = format!("{}{}", self.config.base_url(), path);

        let response = self
            .client
            .get(&url)
            .query(&[("crtfc_key", self.config.api_key.as_str())])
            .query(query)
            .send()
            .await
            .map_err(|e| DartError::Network(e.to_string()))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| DartError::Network(e.to_string()))?;

        if !status.is_success() {
            return Err(DartError::Api {
                status: status.as_u16().to_string(),
                message: body,
            });
        }

        debug!("DART response ({}): {} bytes", path, body.len());

        serde_json::from_str(&body)
            .map_err(|e| DartError::Parse(format!("Failed to parse DART response: {}", e)))
    }
}

/// ZIP이 아닌 에러 본문에서 status/message 추출 (JSON 또는 XML).
fn extract_error_status(body: &str) -> Option<(String, String)> {
    #[derive(Deserialize)]
    struct ErrBody {
        status: String,
        message: String,
    }

    if let Ok(err) = serde_json::from_str::<ErrBody>(body) {
        return Some((err.status, err.message));
    }

    // XML 형태: <result><status>020</status><message>...</message></result>
    let re = Regex::new(r"(?s)<status>(.*?)</status>.*?<message>(.*?)</message>").ok()?;
    let caps = re.captures(body)?;
    Some((caps[1].trim().to_string(), caps[2].trim().to_string()))
}

/// 빈 문자열을 None으로 처리.
fn empty_as_none<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let s: Option<String> = Option::deserialize(deserializer)?;
    Ok(s.map(|v| v.trim().to_string()).filter(|v| !v.is_empty()))
}

/// DART 금액 필드 파싱 ("1,234,567" / "-" / "" 모두 허용).
fn amount_as_decimal<'de, D>(deserializer: D) -> Result<Option<Decimal>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let s: Option<String> = Option::deserialize(deserializer)?;
    match s {
        None => Ok(None),
        Some(s) => {
            let cleaned = s.trim().replace(',', "");
            if cleaned.is_empty() || cleaned == "-" {
                return Ok(None);
            }
            cleaned
                .parse::<Decimal>()
                .map(Some)
                .map_err(|_| serde::de::Error::custom(format!("Invalid amount: {}", s)))
        }
    }
}

/// 숫자 또는 문자열로 오는 페이지 필드 파싱.
fn lenient_u32<'de, D>(deserializer: D) -> Result<u32, D::Error>
where
    D: serde::Deserializer<'de>,
{
    use serde_json::Value;

    let v: Value = Value::deserialize(deserializer)?;
    match v {
        Value::Number(n) => Ok(n.as_u64().unwrap_or(0) as u32),
        Value::String(s) => Ok(s.trim().parse().unwrap_or(0)),
        _ => Ok(0),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_report_code_parse() {
        assert_eq!(ReportCode::parse("11011"), Some(ReportCode::Annual));
        assert_eq!(ReportCode::parse("q3"), Some(ReportCode::Q3));
        assert_eq!(ReportCode::parse("99999"), None);
    }

    #[test]
    fn test_fs_div_parse() {
        assert_eq!(FsDiv::parse("cfs"), Some(FsDiv::Cfs));
        assert_eq!(FsDiv::parse("OFS"), Some(FsDiv::Ofs));
        assert_eq!(FsDiv::parse("XYZ"), None);
    }

    #[test]
    fn test_financial_account_amount_parsing() {
        let json = r#"{
            "sj_div": "BS",
            "sj_nm": "재무상태표",
            "account_nm": "자산총계",
            "thstrm_nm": "제 56 기",
            "thstrm_amount": "455,905,980,000,000",
            "frmtrm_amount": "-",
            "bfefrmtrm_amount": "",
            "currency": "KRW"
        }"#;
        let account: FinancialAccount = serde_json::from_str(json).unwrap();
        assert_eq!(account.current_amount, Some(dec!(455905980000000)));
        assert_eq!(account.previous_amount, None);
        assert_eq!(account.before_previous_amount, None);
    }

    #[test]
    fn test_extract_error_status_json() {
        let body = r#"{"status":"020","message":"요청 제한을 초과하였습니다."}"#;
        let (status, _) = extract_error_status(body).unwrap();
        assert_eq!(status, "020");
    }

    #[test]
    fn test_extract_error_status_xml() {
        let body = "<result><status>011</status><message>사용할 수 없는 키입니다.</message></result>";
        let (status, message) = extract_error_status(body).unwrap();
        assert_eq!(status, "011");
        assert!(message.contains("키"));
    }
}
