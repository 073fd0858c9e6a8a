//! KIS 국내 주식 시세 REST API 클라이언트.
//!
//! # 지원 기능
//!
//! - 현재가 조회
//! - 기간별 시세 조회 (일/주/월/년봉)
//! - 업종 지수 조회

use crate::auth::KisTokenManager;
use crate::error::KisError;
use chrono::NaiveDate;
use invest_core::{Candle, ChartPeriod, IndexQuote, Quote};
use reqwest::Client;
use rust_decimal::Decimal;
use serde::{Deserialize, Deserializer};
use std::sync::Arc;
use tracing::{debug, error};

/// KIS 거래 ID (tr_id) 상수 모음.
///
/// 거래 ID는 모든 API 호출에서 작업 유형을 식별하기 위해 필요합니다.
pub mod tr_id {
    /// 국내 주식 현재가 조회
    pub const KR_PRICE: &str = "FHKST01010100";
    /// 국내 주식 기간별 시세 조회 (일/주/월/년)
    pub const KR_ITEM_CHART: &str = "FHKST03010100";
    /// 국내 업종 지수 현재가 조회
    pub const KR_INDEX_PRICE: &str = "FHPUP02100000";
}

/// KIS 시세 클라이언트.
///
/// `KisTokenManager`를 `Arc`로 공유합니다. KIS API는 토큰 발급을 1분에
/// 1회로 제한하므로 동일한 `app_key`를 쓰는 모든 클라이언트가 토큰
/// 관리자를 공유하는 것이 필수입니다.
pub struct KisClient {
    auth: Arc<KisTokenManager>,
    client: Client,
}

impl KisClient {
    /// 새로운 시세 클라이언트 생성 (소유권 이전).
    pub fn new(auth: KisTokenManager) -> Result<Self, KisError> {
        Self::with_shared_auth(Arc::new(auth))
    }

    /// 공유된 토큰 관리자로 클라이언트 생성.
    pub fn with_shared_auth(auth: Arc<KisTokenManager>) -> Result<Self, KisError> {
        let client = Client::builder()
            .timeout(std::time::Duration::from_secs(auth.config().timeout_secs))
            .build()
            .map_err(|e| KisError::Network(format!("HTTP client 생성 실패: {}", e)))?;

        Ok(Self { auth, client })
    }

    /// 내부 토큰 관리자 참조 반환.
    pub fn auth(&self) -> &Arc<KisTokenManager> {
        &self.auth
    }

    /// 주식 현재가 조회.
    ///
    /// # 인자
    /// * `stock_code` - 종목코드 (예: "005930" 삼성전자)
    pub async fn get_quote(&self, stock_code: &str) -> Result<Quote, KisError> {
        let url = format!(
            "{}/uapi/domestic-stock/v1/quotations/inquire-price",
            self.auth.config().rest_base_url()
        );

        let output: KisPriceOutput = self
            .get_envelope(
                &url,
                tr_id::KR_PRICE,
                &[("FID_COND_MRKT_DIV_CODE", "J"), ("FID_INPUT_ISCD", stock_code)],
            )
            .await?;

        Ok(Quote {
            stock_code: stock_code.to_string(),
            price: output.current_price,
            change: output.price_change,
            change_rate: output.change_rate,
            open: output.open,
            high: output.high,
            low: output.low,
            volume: output.volume,
            trading_value: output.trading_value,
            high_52w: output.high_52w,
            low_52w: output.low_52w,
            market_cap: output.market_cap,
            per: output.per,
            pbr: output.pbr,
            eps: output.eps,
        })
    }

    /// 기간별 시세 조회 (일/주/월/년봉).
    ///
    /// KIS는 한 번에 최대 100건을 반환합니다. 응답은 최신순이므로
    /// 날짜 오름차순으로 뒤집어 반환합니다.
    ///
    /// # 인자
    /// * `stock_code` - 종목코드
    /// * `period` - 차트 주기
    /// * `from` / `to` - 조회 구간 (YYYYMMDD로 전송)
    pub async fn get_candles(
        &self,
        stock_code: &str,
        period: ChartPeriod,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<Vec<Candle>, KisError> {
        let url = format!(
            "{}/uapi/domestic-stock/v1/quotations/inquire-daily-itemchartprice",
            self.auth.config().rest_base_url()
        );

        let from_s = from.format("%Y%m%d").to_string();
        let to_s = to.format("%Y%m%d").to_string();

        let output: Vec<KisCandleRow> = self
            .get_envelope2(
                &url,
                tr_id::KR_ITEM_CHART,
                &[
                    ("FID_COND_MRKT_DIV_CODE", "J"),
                    ("FID_INPUT_ISCD", stock_code),
                    ("FID_INPUT_DATE_1", &from_s),
                    ("FID_INPUT_DATE_2", &to_s),
                    ("FID_PERIOD_DIV_CODE", period.kis_code()),
                    ("FID_ORG_ADJ_PRC", "0"),
                ],
            )
            .await?;

        // 조회 구간에 데이터가 모자라면 빈 레코드가 섞여 온다
        let mut candles: Vec<Candle> = output
            .into_iter()
            .filter(|row| !row.date.is_empty())
            .map(|row| row.into_candle())
            .collect::<Result<_, _>>()?;

        candles.sort_by_key(|c| c.date);
        Ok(candles)
    }

    /// 업종 지수 현재가 조회.
    ///
    /// # 인자
    /// * `index_code` - 업종 코드 (예: "0001" 코스피, "1001" 코스닥)
    pub async fn get_index_quote(&self, index_code: &str) -> Result<IndexQuote, KisError> {
        let url = format!(
            "{}/uapi/domestic-stock/v1/quotations/inquire-index-price",
            self.auth.config().rest_base_url()
        );

        let output: KisIndexOutput = self
            .get_envelope(
                &url,
                tr_id::KR_INDEX_PRICE,
                &[("FID_COND_MRKT_DIV_CODE", "U"), ("FID_INPUT_ISCD", index_code)],
            )
            .await?;

        Ok(IndexQuote {
            index_code: index_code.to_string(),
            value: output.value,
            change: output.change,
            change_rate: output.change_rate,
            volume: output.volume,
        })
    }

    /// `output` 단일 레코드 응답 공통 처리.
    async fn get_envelope<T: serde::de::DeserializeOwned>(
        &self,
        url: &str,
        tr_id: &str,
        query: &[(&str, &str)],
    ) -> Result<T, KisError> {
        let body = self.get_raw(url, tr_id, query).await?;

        let resp: KisEnvelope<T> = serde_json::from_str(&body)
            .map_err(|e| KisError::Parse(format!("Failed to parse KIS response: {}", e)))?;
        resp.into_output()
    }

    /// `output2` 배열 레코드 응답 공통 처리.
    async fn get_envelope2<T: serde::de::DeserializeOwned>(
        &self,
        url: &str,
        tr_id: &str,
        query: &[(&str, &str)],
    ) -> Result<Vec<T>, KisError> {
        let body = self.get_raw(url, tr_id, query).await?;

        let resp: KisEnvelope2<T> = serde_json::from_str(&body)
            .map_err(|e| KisError::Parse(format!("Failed to parse KIS response: {}", e)))?;
        resp.into_output()
    }

    /// GET 요청 전송 및 HTTP 수준 에러 처리.
    async fn get_raw(
        &self,
        url: &str,
        tr_id: &str,
        query: &[(&str, &str)],
    ) -> Result<String, KisError> {
        let headers = self.auth.build_headers(tr_id).await?;

        let response = self
            .client
            .get(url)
            .headers(headers)
            .query(query)
            .send()
            .await
            .map_err(|e| KisError::Network(e.to_string()))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| KisError::Network(e.to_string()))?;

        if !status.is_success() {
            error!("KIS request failed: {} {} - {}", tr_id, status, body);
            if status == reqwest::StatusCode::UNAUTHORIZED {
                // 폐기된 토큰일 수 있으므로 캐시를 비워 다음 호출에서 재발급
                self.auth.invalidate().await;
                return Err(KisError::Unauthorized(body));
            }
            return Err(KisError::Api {
                code: status.as_u16().to_string(),
                message: body,
            });
        }

        debug!("KIS response ({}): {} bytes", tr_id, body.len());
        Ok(body)
    }
}

// ========================================
// 응답 타입
// ========================================

/// KIS 공통 응답 봉투 (단일 `output`).
#[derive(Debug, Deserialize)]
struct KisEnvelope<T> {
    rt_cd: String,
    #[serde(default)]
    msg_cd: String,
    #[serde(default)]
    msg1: String,
    output: Option<T>,
}

impl<T> KisEnvelope<T> {
    fn into_output(self) -> Result<T, KisError> {
        if self.rt_cd != "0" {
            return Err(KisError::Api {
                code: self.msg_cd,
                message: self.msg1.trim().to_string(),
            });
        }
        self.output
            .ok_or_else(|| KisError::Parse("KIS 응답에 output 누락".to_string()))
    }
}

/// KIS 공통 응답 봉투 (`output2` 배열).
#[derive(Debug, Deserialize)]
struct KisEnvelope2<T> {
    rt_cd: String,
    #[serde(default)]
    msg_cd: String,
    #[serde(default)]
    msg1: String,
    output2: Option<Vec<T>>,
}

impl<T> KisEnvelope2<T> {
    fn into_output(self) -> Result<Vec<T>, KisError> {
        if self.rt_cd != "0" {
            return Err(KisError::Api {
                code: self.msg_cd,
                message: self.msg1.trim().to_string(),
            });
        }
        self.output2
            .ok_or_else(|| KisError::Parse("KIS 응답에 output2 누락".to_string()))
    }
}

/// 현재가 조회 응답 레코드.
#[derive(Debug, Clone, Deserialize)]
struct KisPriceOutput {
    /// 현재가
    #[serde(rename = "stck_prpr", deserialize_with = "deserialize_decimal")]
    current_price: Decimal,
    /// 전일대비
    #[serde(rename = "prdy_vrss", deserialize_with = "deserialize_decimal")]
    price_change: Decimal,
    /// 등락률 (%)
    #[serde(rename = "prdy_ctrt", deserialize_with = "deserialize_decimal")]
    change_rate: Decimal,
    /// 당일 시가
    #[serde(rename = "stck_oprc", default, deserialize_with = "deserialize_opt_decimal")]
    open: Option<Decimal>,
    /// 당일 고가
    #[serde(rename = "stck_hgpr", default, deserialize_with = "deserialize_opt_decimal")]
    high: Option<Decimal>,
    /// 당일 저가
    #[serde(rename = "stck_lwpr", default, deserialize_with = "deserialize_opt_decimal")]
    low: Option<Decimal>,
    /// 누적거래량
    #[serde(rename = "acml_vol", deserialize_with = "deserialize_i64")]
    volume: i64,
    /// 누적거래대금
    #[serde(rename = "acml_tr_pbmn", default, deserialize_with = "deserialize_opt_decimal")]
    trading_value: Option<Decimal>,
    /// 52주 최고가
    #[serde(rename = "w52_hgpr", default, deserialize_with = "deserialize_opt_decimal")]
    high_52w: Option<Decimal>,
    /// 52주 최저가
    #[serde(rename = "w52_lwpr", default, deserialize_with = "deserialize_opt_decimal")]
    low_52w: Option<Decimal>,
    /// HTS 시가총액 (억원)
    #[serde(rename = "hts_avls", default, deserialize_with = "deserialize_opt_decimal")]
    market_cap: Option<Decimal>,
    /// PER
    #[serde(default, deserialize_with = "deserialize_opt_decimal")]
    per: Option<Decimal>,
    /// PBR
    #[serde(default, deserialize_with = "deserialize_opt_decimal")]
    pbr: Option<Decimal>,
    /// EPS
    #[serde(default, deserialize_with = "deserialize_opt_decimal")]
    eps: Option<Decimal>,
}

/// 기간별 시세 레코드.
#[derive(Debug, Clone, Deserialize)]
struct KisCandleRow {
    /// 영업일자 (YYYYMMDD)
    #[serde(rename = "stck_bsop_date", default)]
    date: String,
    /// 시가
    #[serde(rename = "stck_oprc", default)]
    open: String,
    /// 고가
    #[serde(rename = "stck_hgpr", default)]
    high: String,
    /// 저가
    #[serde(rename = "stck_lwpr", default)]
    low: String,
    /// 종가
    #[serde(rename = "stck_clpr", default)]
    close: String,
    /// 거래량
    #[serde(rename = "acml_vol", default)]
    volume: String,
}

impl KisCandleRow {
    fn into_candle(self) -> Result<Candle, KisError> {
        let date = NaiveDate::parse_from_str(&self.date, "%Y%m%d")
            .map_err(|_| KisError::Parse(format!("Invalid candle date: {}", self.date)))?;

        Ok(Candle {
            date,
            open: parse_decimal(&self.open)?,
            high: parse_decimal(&self.high)?,
            low: parse_decimal(&self.low)?,
            close: parse_decimal(&self.close)?,
            volume: self.volume.parse().unwrap_or(0),
        })
    }
}

/// 업종 지수 응답 레코드.
#[derive(Debug, Clone, Deserialize)]
struct KisIndexOutput {
    /// 업종 지수 현재가
    #[serde(rename = "bstp_nmix_prpr", deserialize_with = "deserialize_decimal")]
    value: Decimal,
    /// 전일대비
    #[serde(rename = "bstp_nmix_prdy_vrss", deserialize_with = "deserialize_decimal")]
    change: Decimal,
    /// 등락률 (%)
    #[serde(rename = "bstp_nmix_prdy_ctrt", deserialize_with = "deserialize_decimal")]
    change_rate: Decimal,
    /// 누적거래량 (천주)
    #[serde(rename = "acml_vol", default, deserialize_with = "deserialize_opt_i64")]
    volume: Option<i64>,
}

// ========================================
// 문자열 숫자 파싱
// ========================================

fn parse_decimal(s: &str) -> Result<Decimal, KisError> {
    let trimmed = s.trim();
    if trimmed.is_empty() || trimmed == "-" {
        return Ok(Decimal::ZERO);
    }
    trimmed
        .parse::<Decimal>()
        .map_err(|_| KisError::Parse(format!("Invalid decimal: {}", s)))
}

/// KIS 숫자 필드는 문자열로 온다. 빈 문자열/"-"는 0으로 처리.
fn deserialize_decimal<'de, D>(deserializer: D) -> Result<Decimal, D::Error>
where
    D: Deserializer<'de>,
{
    let s: String = String::deserialize(deserializer)?;
    parse_decimal(&s).map_err(serde::de::Error::custom)
}

/// 빈 문자열/"-"/"0"을 None으로 취급하는 선택적 Decimal 파싱.
fn deserialize_opt_decimal<'de, D>(deserializer: D) -> Result<Option<Decimal>, D::Error>
where
    D: Deserializer<'de>,
{
    let s: Option<String> = Option::deserialize(deserializer)?;
    match s {
        None => Ok(None),
        Some(s) => {
            let trimmed = s.trim();
            if trimmed.is_empty() || trimmed == "-" || trimmed == "0" || trimmed == "0.00" {
                Ok(None)
            } else {
                trimmed
                    .parse::<Decimal>()
                    .map(Some)
                    .map_err(|_| serde::de::Error::custom(format!("Invalid decimal: {}", s)))
            }
        }
    }
}

fn deserialize_i64<'de, D>(deserializer: D) -> Result<i64, D::Error>
where
    D: Deserializer<'de>,
{
    let s: String = String::deserialize(deserializer)?;
    let trimmed = s.trim();
    if trimmed.is_empty() || trimmed == "-" {
        return Ok(0);
    }
    trimmed
        .parse::<i64>()
        .map_err(|_| serde::de::Error::custom(format!("Invalid integer: {}", s)))
}

fn deserialize_opt_i64<'de, D>(deserializer: D) -> Result<Option<i64>, D::Error>
where
    D: Deserializer<'de>,
{
    let s: Option<String> = Option::deserialize(deserializer)?;
    match s {
        None => Ok(None),
        Some(s) => {
            let trimmed = s.trim();
            if trimmed.is_empty() || trimmed == "-" {
                Ok(None)
            } else {
                trimmed
                    .parse::<i64>()
                    .map(Some)
                    .map_err(|_| serde::de::Error::custom(format!("Invalid integer: {}", s)))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_envelope_error() {
        let json = r#"{"rt_cd":"1","msg_cd":"EGW00123","msg1":"기간이 만료된 token 입니다.","output":null}"#;
        let env: KisEnvelope<KisPriceOutput> = serde_json::from_str(json).unwrap();
        let err = env.into_output().unwrap_err();
        match err {
            KisError::Api { code, message } => {
                assert_eq!(code, "EGW00123");
                assert!(message.contains("token"));
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[test]
    fn test_price_output_parsing() {
        let json = r#"{
            "stck_prpr": "71500",
            "prdy_vrss": "-300",
            "prdy_ctrt": "-0.42",
            "stck_oprc": "71800",
            "stck_hgpr": "72000",
            "stck_lwpr": "71200",
            "acml_vol": "9123456",
            "acml_tr_pbmn": "653211234500",
            "w52_hgpr": "88800",
            "w52_lwpr": "64500",
            "hts_avls": "4268000",
            "per": "12.34",
            "pbr": "1.23",
            "eps": "5795.00"
        }"#;
        let output: KisPriceOutput = serde_json::from_str(json).unwrap();
        assert_eq!(output.current_price, dec!(71500));
        assert_eq!(output.price_change, dec!(-300));
        assert_eq!(output.volume, 9_123_456);
        assert_eq!(output.per, Some(dec!(12.34)));
    }

    #[test]
    fn test_price_output_empty_optionals() {
        // ETF 등 PER/PBR가 없는 종목은 빈 문자열 또는 "0"으로 온다
        let json = r#"{
            "stck_prpr": "10500",
            "prdy_vrss": "0",
            "prdy_ctrt": "0.00",
            "acml_vol": "",
            "per": "",
            "pbr": "0.00",
            "eps": "-"
        }"#;
        let output: KisPriceOutput = serde_json::from_str(json).unwrap();
        assert_eq!(output.volume, 0);
        assert_eq!(output.per, None);
        assert_eq!(output.pbr, None);
        assert_eq!(output.eps, None);
    }

    #[test]
    fn test_candle_row_conversion() {
        let row = KisCandleRow {
            date: "20250102".to_string(),
            open: "71800".to_string(),
            high: "72000".to_string(),
            low: "71200".to_string(),
            close: "71500".to_string(),
            volume: "9123456".to_string(),
        };
        let candle = row.into_candle().unwrap();
        assert_eq!(candle.date, NaiveDate::from_ymd_opt(2025, 1, 2).unwrap());
        assert_eq!(candle.close, dec!(71500));
        assert_eq!(candle.volume, 9_123_456);
    }

    #[test]
    fn test_candle_row_invalid_date() {
        let row = KisCandleRow {
            date: "2025-01-02".to_string(),
            open: "1".to_string(),
            high: "1".to_string(),
            low: "1".to_string(),
            close: "1".to_string(),
            volume: "1".to_string(),
        };
        assert!(matches!(row.into_candle(), Err(KisError::Parse(_))));
    }
}
