//! DART 기업 코드 마스터 파일 처리.
//!
//! `GET /api/corpCode.xml`은 `CORPCODE.xml` 하나가 들어 있는 ZIP
//! 아카이브를 반환합니다. 레코드는 평평한 `<list>` 블록의 반복이므로
//! 정규식으로 추출합니다.

use crate::error::DartError;
use chrono::NaiveDate;
use invest_core::CorpCode;
use regex::Regex;
use std::io::{Cursor, Read};
use tracing::debug;

/// ZIP 아카이브에서 CORPCODE.xml을 꺼내 파싱.
pub fn parse_corp_code_archive(bytes: &[u8]) -> Result<Vec<CorpCode>, DartError> {
    let mut archive = zip::ZipArchive::new(Cursor::new(bytes))
        .map_err(|e| DartError::Archive(format!("ZIP 열기 실패: {}", e)))?;

    if archive.is_empty() {
        return Err(DartError::Archive("빈 ZIP 아카이브".to_string()));
    }

    // 파일명은 CORPCODE.xml이지만 이름이 바뀌어도 첫 항목으로 대비
    let index = (0..archive.len())
        .find(|&i| archive.name_for_index(i) == Some("CORPCODE.xml"))
        .unwrap_or(0);

    let mut xml = String::new();
    {
        let mut file = archive
            .by_index(index)
            .map_err(|e| DartError::Archive(format!("ZIP 항목 읽기 실패: {}", e)))?;
        file.read_to_string(&mut xml)
            .map_err(|e| DartError::Archive(format!("XML 읽기 실패: {}", e)))?;
    }

    parse_corp_code_xml(&xml)
}

/// CORPCODE.xml 본문 파싱.
pub fn parse_corp_code_xml(xml: &str) -> Result<Vec<CorpCode>, DartError> {
    // 레코드 단위 추출 후 태그별 캡처
    let record_re = Regex::new(r"(?s)<list>(.*?)</list>")
        .map_err(|e| DartError::Parse(e.to_string()))?;
    let tag_re = Regex::new(
        r"(?s)<corp_code>(.*?)</corp_code>.*?<corp_name>(.*?)</corp_name>.*?<stock_code>(.*?)</stock_code>.*?<modify_date>(.*?)</modify_date>",
    )
    .map_err(|e| DartError::Parse(e.to_string()))?;

    let mut corps = Vec::new();
    for record in record_re.captures_iter(xml) {
        let inner = &record[1];
        let caps = match tag_re.captures(inner) {
            Some(c) => c,
            None => continue, // 필수 태그가 빠진 레코드는 건너뜀
        };

        let corp_code = caps[1].trim().to_string();
        let corp_name = caps[2].trim().to_string();
        if corp_code.is_empty() || corp_name.is_empty() {
            continue;
        }

        // 비상장사는 stock_code가 공백 6칸으로 온다
        let stock_code = {
            let s = caps[3].trim();
            if s.is_empty() {
                None
            } else {
                Some(s.to_string())
            }
        };

        let modify_date = NaiveDate::parse_from_str(caps[4].trim(), "%Y%m%d")
            .map_err(|_| DartError::Parse(format!("Invalid modify_date: {}", &caps[4])))?;

        corps.push(CorpCode {
            corp_code,
            corp_name,
            stock_code,
            modify_date,
        });
    }

    if corps.is_empty() {
        return Err(DartError::Parse(
            "CORPCODE.xml에서 레코드를 찾지 못했습니다".to_string(),
        ));
    }

    debug!("Parsed {} corp code records", corps.len());
    Ok(corps)
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE_XML: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<result>
    <list>
        <corp_code>00126380</corp_code>
        <corp_name>삼성전자</corp_name>
        <stock_code>005930</stock_code>
        <modify_date>20250102</modify_date>
    </list>
    <list>
        <corp_code>00434003</corp_code>
        <corp_name>다코</corp_name>
        <stock_code> </stock_code>
        <modify_date>20170630</modify_date>
    </list>
</result>"#;

    #[test]
    fn test_parse_corp_code_xml() {
        let corps = parse_corp_code_xml(SAMPLE_XML).unwrap();
        assert_eq!(corps.len(), 2);

        assert_eq!(corps[0].corp_code, "00126380");
        assert_eq!(corps[0].corp_name, "삼성전자");
        assert_eq!(corps[0].stock_code.as_deref(), Some("005930"));
        assert!(corps[0].is_listed());

        // 비상장사: stock_code 공백 → None
        assert_eq!(corps[1].stock_code, None);
        assert!(!corps[1].is_listed());
    }

    #[test]
    fn test_parse_empty_document_is_error() {
        let err = parse_corp_code_xml("<result></result>").unwrap_err();
        assert!(matches!(err, DartError::Parse(_)));
    }

    #[test]
    fn test_parse_invalid_date_is_error() {
        let xml = r#"<result><list>
            <corp_code>00126380</corp_code>
            <corp_name>삼성전자</corp_name>
            <stock_code>005930</stock_code>
            <modify_date>2025-01-02</modify_date>
        </list></result>"#;
        assert!(matches!(
            parse_corp_code_xml(xml),
            Err(DartError::Parse(_))
        ));
    }

    #[test]
    fn test_parse_archive_roundtrip() {
        use std::io::Write;
        use zip::write::SimpleFileOptions;

        let mut zip = zip::ZipWriter::new(Cursor::new(Vec::new()));
        zip.start_file("CORPCODE.xml", SimpleFileOptions::default())
            .unwrap();
        zip.write_all(SAMPLE_XML.as_bytes()).unwrap();
        let bytes = zip.finish().unwrap().into_inner();

        let corps = parse_corp_code_archive(&bytes).unwrap();
        assert_eq!(corps.len(), 2);
    }

    #[test]
    fn test_parse_archive_not_a_zip() {
        let err = parse_corp_code_archive(b"not a zip").unwrap_err();
        assert!(matches!(err, DartError::Archive(_)));
    }
}
