//! 시세/기업 도메인 타입.
//!
//! KIS 시세 API와 DART 공시 API의 응답을 정규화한 공용 타입을 정의합니다.
//! 가격은 모두 `rust_decimal::Decimal`을 사용합니다 (부동소수점 오차 방지).

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// 국내 시장 구분.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Market {
    /// 유가증권시장
    Kospi,
    /// 코스닥
    Kosdaq,
    /// 코넥스
    Konex,
}

impl Market {
    /// DART corp master의 시장 구분 코드에서 파싱 (Y: 유가, K: 코스닥, N: 코넥스).
    pub fn from_dart_code(s: &str) -> Option<Self> {
        match s {
            "Y" => Some(Market::Kospi),
            "K" => Some(Market::Kosdaq),
            "N" => Some(Market::Konex),
            _ => None,
        }
    }

    /// 표시 이름 반환.
    pub fn display_name(&self) -> &'static str {
        match self {
            Market::Kospi => "KOSPI",
            Market::Kosdaq => "KOSDAQ",
            Market::Konex => "KONEX",
        }
    }
}

/// 차트 조회 주기.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChartPeriod {
    /// 일봉
    Day,
    /// 주봉
    Week,
    /// 월봉
    Month,
    /// 년봉
    Year,
}

impl ChartPeriod {
    /// KIS 기간분류코드 반환 (FID_PERIOD_DIV_CODE).
    pub fn kis_code(&self) -> &'static str {
        match self {
            ChartPeriod::Day => "D",
            ChartPeriod::Week => "W",
            ChartPeriod::Month => "M",
            ChartPeriod::Year => "Y",
        }
    }

    /// 쿼리 문자열에서 파싱.
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "d" | "day" | "daily" => Some(ChartPeriod::Day),
            "w" | "week" | "weekly" => Some(ChartPeriod::Week),
            "m" | "month" | "monthly" => Some(ChartPeriod::Month),
            "y" | "year" | "yearly" => Some(ChartPeriod::Year),
            _ => None,
        }
    }
}

impl Default for ChartPeriod {
    fn default() -> Self {
        ChartPeriod::Day
    }
}

/// 주식 현재가 스냅샷.
///
/// KIS 현재가 조회 응답(`output`)을 정규화한 타입입니다.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Quote {
    /// 종목코드 (6자리)
    pub stock_code: String,
    /// 현재가
    pub price: Decimal,
    /// 전일 대비
    pub change: Decimal,
    /// 전일 대비율 (%)
    pub change_rate: Decimal,
    /// 시가
    pub open: Option<Decimal>,
    /// 고가
    pub high: Option<Decimal>,
    /// 저가
    pub low: Option<Decimal>,
    /// 누적 거래량
    pub volume: i64,
    /// 누적 거래대금
    pub trading_value: Option<Decimal>,
    /// 52주 최고가
    pub high_52w: Option<Decimal>,
    /// 52주 최저가
    pub low_52w: Option<Decimal>,
    /// 시가총액 (억원)
    pub market_cap: Option<Decimal>,
    /// PER
    pub per: Option<Decimal>,
    /// PBR
    pub pbr: Option<Decimal>,
    /// EPS
    pub eps: Option<Decimal>,
}

/// OHLCV 캔들.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Candle {
    /// 일자
    pub date: NaiveDate,
    /// 시가
    pub open: Decimal,
    /// 고가
    pub high: Decimal,
    /// 저가
    pub low: Decimal,
    /// 종가
    pub close: Decimal,
    /// 거래량
    pub volume: i64,
}

/// 시장 지수 스냅샷.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexQuote {
    /// 지수 코드 (예: "0001" 코스피, "1001" 코스닥)
    pub index_code: String,
    /// 현재 지수
    pub value: Decimal,
    /// 전일 대비
    pub change: Decimal,
    /// 전일 대비율 (%)
    pub change_rate: Decimal,
    /// 누적 거래량 (천주)
    pub volume: Option<i64>,
}

/// DART 기업 코드 마스터 레코드.
///
/// corpCode.xml 한 건에 해당합니다. 상장사는 6자리 종목코드를 가지며,
/// 비상장사는 `stock_code`가 `None`입니다.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CorpCode {
    /// DART 고유번호 (8자리)
    pub corp_code: String,
    /// 회사명
    pub corp_name: String,
    /// 종목코드 (상장사만, 6자리)
    pub stock_code: Option<String>,
    /// 최종 변경일
    pub modify_date: NaiveDate,
}

impl CorpCode {
    /// 상장 여부.
    pub fn is_listed(&self) -> bool {
        self.stock_code.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_chart_period_parse() {
        assert_eq!(ChartPeriod::parse("day"), Some(ChartPeriod::Day));
        assert_eq!(ChartPeriod::parse("W"), Some(ChartPeriod::Week));
        assert_eq!(ChartPeriod::parse("Monthly"), Some(ChartPeriod::Month));
        assert_eq!(ChartPeriod::parse("y"), Some(ChartPeriod::Year));
        assert_eq!(ChartPeriod::parse("hour"), None);
    }

    #[test]
    fn test_chart_period_kis_code() {
        assert_eq!(ChartPeriod::Day.kis_code(), "D");
        assert_eq!(ChartPeriod::Year.kis_code(), "Y");
    }

    #[test]
    fn test_market_from_dart_code() {
        assert_eq!(Market::from_dart_code("Y"), Some(Market::Kospi));
        assert_eq!(Market::from_dart_code("K"), Some(Market::Kosdaq));
        assert_eq!(Market::from_dart_code("E"), None);
    }

    #[test]
    fn test_corp_code_listed() {
        let listed = CorpCode {
            corp_code: "00126380".to_string(),
            corp_name: "삼성전자".to_string(),
            stock_code: Some("005930".to_string()),
            modify_date: NaiveDate::from_ymd_opt(2025, 1, 2).unwrap(),
        };
        assert!(listed.is_listed());

        let unlisted = CorpCode {
            stock_code: None,
            ..listed
        };
        assert!(!unlisted.is_listed());
    }
}
