use async_trait::async_trait;
use sqlx::{Postgres, QueryBuilder};
use time::OffsetDateTime;

use crate::{
    application::{
        query::TaskQuery,
        repos::{CreateTaskParams, RepoError, TaskPage, TasksRepo, UpdateTaskParams},
    },
    domain::{entities::TaskRecord, types::TaskStatus},
};

use super::{PostgresRepositories, map_sqlx_error};

const TASK_COLUMNS: &str = "id, title, description, status, assignee_id, created_at, updated_at";

#[derive(sqlx::FromRow)]
struct TaskRow {
    id: i64,
    title: String,
    description: Option<String>,
    status: TaskStatus,
    assignee_id: i64,
    created_at: OffsetDateTime,
    updated_at: OffsetDateTime,
}

impl From<TaskRow> for TaskRecord {
    fn from(row: TaskRow) -> Self {
        Self {
            id: row.id,
            title: row.title,
            description: row.description,
            status: row.status,
            assignee_id: row.assignee_id,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

#[async_trait]
impl TasksRepo for PostgresRepositories {
    async fn create_task(&self, params: CreateTaskParams) -> Result<TaskRecord, RepoError> {
        let sql = format!(
            "INSERT INTO tasks (title, description, status, assignee_id) \
             VALUES ($1, $2, $3, $4) RETURNING {TASK_COLUMNS}"
        );
        let row = sqlx::query_as::<_, TaskRow>(&sql)
            .bind(params.title)
            .bind(params.description)
            .bind(params.status)
            .bind(params.assignee_id)
            .fetch_one(self.pool())
            .await
            .map_err(map_sqlx_error)?;

        Ok(row.into())
    }

    async fn find_task(&self, id: i64) -> Result<TaskRecord, RepoError> {
        let sql = format!("SELECT {TASK_COLUMNS} FROM tasks WHERE id = $1");
        let row = sqlx::query_as::<_, TaskRow>(&sql)
            .bind(id)
            .fetch_optional(self.pool())
            .await
            .map_err(map_sqlx_error)?;

        row.map(TaskRecord::from).ok_or(RepoError::NotFound)
    }

    async fn update_task(&self, params: UpdateTaskParams) -> Result<TaskRecord, RepoError> {
        let sql = format!(
            "UPDATE tasks \
             SET title = $2, description = $3, status = $4, assignee_id = $5, updated_at = now() \
             WHERE id = $1 RETURNING {TASK_COLUMNS}"
        );
        let row = sqlx::query_as::<_, TaskRow>(&sql)
            .bind(params.id)
            .bind(params.title)
            .bind(params.description)
            .bind(params.status)
            .bind(params.assignee_id)
            .fetch_optional(self.pool())
            .await
            .map_err(map_sqlx_error)?;

        row.map(TaskRecord::from).ok_or(RepoError::NotFound)
    }

    async fn delete_task(&self, id: i64) -> Result<(), RepoError> {
        let result = sqlx::query("DELETE FROM tasks WHERE id = $1")
            .bind(id)
            .execute(self.pool())
            .await
            .map_err(map_sqlx_error)?;

        if result.rows_affected() == 0 {
            return Err(RepoError::NotFound);
        }
        Ok(())
    }

    async fn list_tasks(&self, query: &TaskQuery) -> Result<TaskPage, RepoError> {
        let filter = query
            .typed_filter()
            .map_err(|err| RepoError::InvalidInput {
                message: err.detail().to_string(),
            })?;
        let offset = i64::try_from(query.offset())
            .map_err(|_| RepoError::from_persistence("offset exceeds supported range"))?;

        let mut count_qb = QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM tasks");
        Self::apply_task_filter(&mut count_qb, &filter);
        let total: i64 = count_qb
            .build_query_scalar()
            .fetch_one(self.pool())
            .await
            .map_err(map_sqlx_error)?;

        let mut qb = QueryBuilder::<Postgres>::new(format!("SELECT {TASK_COLUMNS} FROM tasks"));
        Self::apply_task_filter(&mut qb, &filter);
        qb.push(" ORDER BY id ASC LIMIT ");
        qb.push_bind(i64::from(query.per_page));
        qb.push(" OFFSET ");
        qb.push_bind(offset);

        let rows = qb
            .build_query_as::<TaskRow>()
            .fetch_all(self.pool())
            .await
            .map_err(map_sqlx_error)?;

        Ok(TaskPage {
            items: rows.into_iter().map(TaskRecord::from).collect(),
            total: Self::convert_count(total)?,
        })
    }

    async fn health_check(&self) -> Result<(), RepoError> {
        self.ping().await.map_err(map_sqlx_error)
    }
}
