use sqlx::PgPool;

/// Full bootstrap test: connect, migrate, verify schema.
#[sqlx::test(migrations = "./migrations")]
async fn test_full_bootstrap(pool: PgPool) {
    coursemart_db::health_check(&pool).await.unwrap();

    let tables = ["users", "courses", "course_modules", "lessons", "enrollments"];

    for table in tables {
        let count: (i64,) = sqlx::query_as(&format!("SELECT COUNT(*) FROM {table}"))
            .fetch_one(&pool)
            .await
            .unwrap_or_else(|e| panic!("{table} query failed: {e}"));
        assert_eq!(count.0, 0, "{table} should start empty");
    }
}

/// The one-enrollment-per-pair constraint must exist under its expected name,
/// since error mapping keys on the `uq_` prefix.
#[sqlx::test(migrations = "./migrations")]
async fn test_enrollment_unique_constraint_exists(pool: PgPool) {
    let found: Option<(String,)> = sqlx::query_as(
        "SELECT conname::text FROM pg_constraint WHERE conname = 'uq_enrollments_course_student'",
    )
    .fetch_optional(&pool)
    .await
    .unwrap();
    assert!(found.is_some());
}
