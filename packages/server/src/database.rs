use std::time::Duration;

use sea_orm::sea_query::{Index, IndexCreateStatement};
use sea_orm::{
    ConnectOptions, ConnectionTrait, Database, DatabaseConnection, DbErr, EntityTrait, Schema,
};
use tracing::{info, warn};

use crate::entity::{
    assignment, attendance, classroom, qr_session, student, subject, term, timetable_entry,
};

pub async fn init_db(db_url: &str) -> Result<DatabaseConnection, DbErr> {
    let mut opt = ConnectOptions::new(db_url.to_owned());

    // Set connection pool options
    opt.max_connections(100)
        .min_connections(5)
        .connect_timeout(Duration::from_secs(8))
        .acquire_timeout(Duration::from_secs(8))
        .idle_timeout(Duration::from_secs(8))
        .max_lifetime(Duration::from_secs(8))
        .sqlx_logging(true);

    let db = Database::connect(opt).await?;
    create_schema(&db).await?;
    ensure_indexes(&db).await?;

    Ok(db)
}

/// Create every table from its entity definition. Existing tables are left untouched.
pub async fn create_schema<C: ConnectionTrait>(db: &C) -> Result<(), DbErr> {
    create_table(db, term::Entity).await?;
    create_table(db, classroom::Entity).await?;
    create_table(db, student::Entity).await?;
    create_table(db, subject::Entity).await?;
    create_table(db, assignment::Entity).await?;
    create_table(db, timetable_entry::Entity).await?;
    create_table(db, qr_session::Entity).await?;
    create_table(db, attendance::Entity).await?;
    Ok(())
}

async fn create_table<C, E>(db: &C, entity: E) -> Result<(), DbErr>
where
    C: ConnectionTrait,
    E: EntityTrait,
{
    let backend = db.get_database_backend();
    let mut stmt = Schema::new(backend).create_table_from_entity(entity);
    stmt.if_not_exists();
    db.execute_raw(backend.build(&stmt)).await?;
    Ok(())
}

/// Ensure required database indexes exist.
///
/// The natural-key index on `attendance` is what makes concurrent check-ins
/// for the same student collapse into one record, and the partial index on
/// `qr_sessions` keeps at most one active session per slot. Failing to create
/// either is fatal. The lookup indexes only affect query speed.
pub async fn ensure_indexes<C: ConnectionTrait>(db: &C) -> Result<(), DbErr> {
    let natural_key = Index::create()
        .if_not_exists()
        .unique()
        .name("uq_attendance_natural_key")
        .table(attendance::Entity)
        .col(attendance::Column::TermId)
        .col(attendance::Column::SubjectId)
        .col(attendance::Column::ClassroomId)
        .col(attendance::Column::Date)
        .col(attendance::Column::Period)
        .col(attendance::Column::StudentId)
        .to_owned();
    execute_index(db, &natural_key).await?;
    info!("Ensured index uq_attendance_natural_key exists");

    // At most one active session per (subject, date, period).
    // SQLite and Postgres both accept this partial index form.
    db.execute_unprepared(
        "CREATE UNIQUE INDEX IF NOT EXISTS uq_qr_sessions_active_key \
         ON qr_sessions (subject_id, date, period) WHERE is_active",
    )
    .await?;
    info!("Ensured index uq_qr_sessions_active_key exists");

    // Supersession lookup:
    // UPDATE qr_sessions SET is_active = false WHERE subject_id = ? AND date = ? AND period = ?
    let session_key = Index::create()
        .if_not_exists()
        .name("idx_qr_sessions_subject_date_period")
        .table(qr_session::Entity)
        .col(qr_session::Column::SubjectId)
        .col(qr_session::Column::Date)
        .col(qr_session::Column::Period)
        .to_owned();
    if let Err(e) = execute_index(db, &session_key).await {
        warn!(
            "Failed to create index idx_qr_sessions_subject_date_period: {}",
            e
        );
    }

    // Dashboard and grid queries filter by term and date first.
    let term_date = Index::create()
        .if_not_exists()
        .name("idx_attendance_term_date")
        .table(attendance::Entity)
        .col(attendance::Column::TermId)
        .col(attendance::Column::Date)
        .to_owned();
    if let Err(e) = execute_index(db, &term_date).await {
        warn!("Failed to create index idx_attendance_term_date: {}", e);
    }

    Ok(())
}

async fn execute_index<C: ConnectionTrait>(
    db: &C,
    stmt: &IndexCreateStatement,
) -> Result<(), DbErr> {
    let backend = db.get_database_backend();
    db.execute_raw(backend.build(stmt)).await?;
    Ok(())
}
