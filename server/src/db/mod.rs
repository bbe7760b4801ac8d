use rocket::{
    fairing::{self, AdHoc},
    Build, Rocket,
};
use rocket_db_pools::Database;
use shared::{DuplicateCheck, IssueRef, PainPoint, PainPointId, PainPointStore, RepositoryId};
use sqlx::PgPool;
use tracing::instrument;

pub mod types;

use self::types::{PainPointIssueRecord, PainPointRecord};

#[derive(Database, Clone, Debug)]
#[database("discovery")]
pub struct DB(PgPool);

impl DB {
    #[instrument(skip(self, body))]
    pub async fn insert_pain_point(
        &self,
        title: &str,
        body: &str,
        slug: &str,
    ) -> anyhow::Result<PainPointRecord> {
        Ok(sqlx::query_as::<_, PainPointRecord>(
            r#"
            INSERT INTO pain_points (title, body, slug)
            VALUES ($1, $2, $3)
            RETURNING id, title, body, slug, created_at
            "#,
        )
        .bind(title)
        .bind(body)
        .bind(slug)
        .fetch_one(&self.0)
        .await?)
    }

    #[instrument(skip(self))]
    pub async fn get_pain_point(&self, id: PainPointId) -> anyhow::Result<Option<PainPointRecord>> {
        Ok(sqlx::query_as::<_, PainPointRecord>(
            r#"
            SELECT id, title, body, slug, created_at
            FROM pain_points
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.0)
        .await?)
    }

    #[instrument(skip(self))]
    pub async fn get_pain_points(
        &self,
        offset: i64,
        limit: i64,
    ) -> anyhow::Result<(Vec<PainPointRecord>, u64)> {
        let records = sqlx::query_as::<_, PainPointRecord>(
            r#"
            SELECT id, title, body, slug, created_at
            FROM pain_points
            ORDER BY created_at DESC, id DESC
            LIMIT $1 OFFSET $2
            "#,
        )
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.0)
        .await?;

        let total: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM pain_points")
            .fetch_one(&self.0)
            .await?;

        Ok((records, total as u64))
    }

    #[instrument(skip(self))]
    pub async fn get_pain_point_issues(
        &self,
        id: PainPointId,
    ) -> anyhow::Result<Vec<PainPointIssueRecord>> {
        Ok(sqlx::query_as::<_, PainPointIssueRecord>(
            r#"
            SELECT pain_point_id, repository, issue_number, issue_url, created_at
            FROM pain_point_issues
            WHERE pain_point_id = $1
            ORDER BY created_at
            "#,
        )
        .bind(id)
        .fetch_all(&self.0)
        .await?)
    }
}

#[async_trait::async_trait]
impl PainPointStore for DB {
    async fn pain_point(&self, id: PainPointId) -> anyhow::Result<Option<PainPoint>> {
        Ok(self.get_pain_point(id).await?.map(Into::into))
    }
}

#[async_trait::async_trait]
impl DuplicateCheck for DB {
    #[instrument(skip(self), fields(repository = %repository))]
    async fn existing_issue(
        &self,
        repository: &RepositoryId,
        id: PainPointId,
    ) -> anyhow::Result<Option<IssueRef>> {
        let record: Option<(i64, String)> = sqlx::query_as(
            r#"
            SELECT issue_number, issue_url
            FROM pain_point_issues
            WHERE pain_point_id = $1 AND repository = $2
            "#,
        )
        .bind(id)
        .bind(repository.to_string())
        .fetch_optional(&self.0)
        .await?;

        Ok(record.map(|(number, url)| IssueRef {
            number: number as u64,
            url,
        }))
    }

    #[instrument(skip(self, issue), fields(repository = %repository, issue = issue.number))]
    async fn record_issue(
        &self,
        repository: &RepositoryId,
        id: PainPointId,
        issue: &IssueRef,
    ) -> anyhow::Result<()> {
        sqlx::query(
            r#"
            INSERT INTO pain_point_issues (pain_point_id, repository, issue_number, issue_url)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT (pain_point_id, repository) DO NOTHING
            "#,
        )
        .bind(id)
        .bind(repository.to_string())
        .bind(issue.number as i64)
        .bind(&issue.url)
        .execute(&self.0)
        .await?;
        Ok(())
    }
}

async fn run_migrations(rocket: Rocket<Build>) -> fairing::Result {
    match DB::fetch(&rocket) {
        Some(db) => match sqlx::migrate!("./migrations").run(&**db).await {
            Ok(_) => Ok(rocket),
            Err(e) => {
                rocket::error!("Failed to initialize SQLx database: {}", e);
                Err(rocket)
            }
        },
        None => Err(rocket),
    }
}

pub fn stage() -> AdHoc {
    AdHoc::on_ignite("SQLx Stage", |rocket| async {
        rocket
            .attach(DB::init())
            .attach(AdHoc::try_on_ignite("SQLx Migrations", run_migrations))
    })
}
