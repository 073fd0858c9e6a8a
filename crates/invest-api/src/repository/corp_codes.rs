//! Corp Code Repository
//!
//! DART 기업 코드 마스터의 데이터베이스 연산을 담당합니다.
//!
//! 테이블 스키마는 `migrations/0001_corp_codes.sql` 참조.

use chrono::NaiveDate;
use invest_core::CorpCode;
use sqlx::{FromRow, PgPool};
use tracing::info;

/// corp_codes 테이블 레코드.
#[derive(Debug, Clone, FromRow)]
pub struct CorpCodeRecord {
    pub corp_code: String,
    pub corp_name: String,
    #[sqlx(default)]
    pub stock_code: Option<String>,
    pub modify_date: NaiveDate,
}

impl From<CorpCodeRecord> for CorpCode {
    fn from(r: CorpCodeRecord) -> Self {
        CorpCode {
            corp_code: r.corp_code,
            corp_name: r.corp_name,
            stock_code: r.stock_code,
            modify_date: r.modify_date,
        }
    }
}

/// Corp Code Repository.
pub struct CorpCodeRepository;

impl CorpCodeRepository {
    /// 기업 코드 일괄 upsert.
    ///
    /// 마스터 파일은 10만 건 이상이므로 청크 단위로 나눠 넣습니다.
    /// 반환값은 처리한 레코드 수입니다.
    pub async fn upsert_all(pool: &PgPool, corps: &[CorpCode]) -> Result<usize, sqlx::Error> {
        const CHUNK_SIZE: usize = 1000;

        let mut total = 0usize;
        for chunk in corps.chunks(CHUNK_SIZE) {
            let mut tx = pool.begin().await?;
            for corp in chunk {
                sqlx::query(
                    r#"
                    INSERT INTO corp_codes (corp_code, corp_name, stock_code, modify_date)
                    VALUES ($1, $2, $3, $4)
                    ON CONFLICT (corp_code) DO UPDATE SET
                        corp_name = EXCLUDED.corp_name,
                        stock_code = EXCLUDED.stock_code,
                        modify_date = EXCLUDED.modify_date
                    "#,
                )
                .bind(&corp.corp_code)
                .bind(&corp.corp_name)
                .bind(&corp.stock_code)
                .bind(corp.modify_date)
                .execute(&mut *tx)
                .await?;
            }
            tx.commit().await?;
            total += chunk.len();
        }

        info!("Corp codes upserted: {} records", total);
        Ok(total)
    }

    /// 회사명으로 검색 (부분 일치, 대소문자 무시).
    pub async fn search_by_name(
        pool: &PgPool,
        name: &str,
        listed_only: bool,
        limit: i64,
    ) -> Result<Vec<CorpCode>, sqlx::Error> {
        let pattern = format!("%{}%", name);

        let records = sqlx::query_as::<_, CorpCodeRecord>(
            r#"
            SELECT corp_code, corp_name, stock_code, modify_date
            FROM corp_codes
            WHERE corp_name ILIKE $1
              AND ($2 = FALSE OR stock_code IS NOT NULL)
            ORDER BY corp_name
            LIMIT $3
            "#,
        )
        .bind(&pattern)
        .bind(listed_only)
        .bind(limit)
        .fetch_all(pool)
        .await?;

        Ok(records.into_iter().map(Into::into).collect())
    }

    /// 종목코드로 단건 조회.
    pub async fn find_by_stock_code(
        pool: &PgPool,
        stock_code: &str,
    ) -> Result<Option<CorpCode>, sqlx::Error> {
        let record = sqlx::query_as::<_, CorpCodeRecord>(
            "SELECT corp_code, corp_name, stock_code, modify_date FROM corp_codes WHERE stock_code = $1",
        )
        .bind(stock_code)
        .fetch_optional(pool)
        .await?;

        Ok(record.map(Into::into))
    }

    /// 저장된 레코드 수.
    pub async fn count(pool: &PgPool) -> Result<i64, sqlx::Error> {
        sqlx::query_scalar("SELECT COUNT(*) FROM corp_codes")
            .fetch_one(pool)
            .await
    }
}
