use sea_orm::{
    ConnectOptions, ConnectionTrait, Database, DatabaseBackend, DatabaseConnection, Statement,
};

/// Открыть подключение к sqlite и развернуть схему.
///
/// Подключение возвращается вызывающему и передаётся в сервисы явно —
/// глобального состояния нет.
pub async fn initialize_database(db_path: Option<&str>) -> anyhow::Result<DatabaseConnection> {
    let db_file = db_path.unwrap_or("target/db/app.db");
    if let Some(parent) = std::path::Path::new(db_file).parent() {
        std::fs::create_dir_all(parent)?;
    }
    let absolute_path = if std::path::Path::new(db_file).is_absolute() {
        std::path::PathBuf::from(db_file)
    } else {
        std::env::current_dir()?.join(db_file)
    };
    // Normalize path separators and ensure proper URL form on Windows
    let normalized = absolute_path.to_string_lossy().replace('\\', "/");
    let needs_leading_slash = !normalized.starts_with('/') && normalized.contains(':');
    let prefix = if needs_leading_slash { "/" } else { "" };
    let db_url = format!("sqlite://{}{}?mode=rwc", prefix, normalized);
    let conn = Database::connect(&db_url).await?;

    bootstrap_schema(&conn).await?;
    Ok(conn)
}

/// In-memory база для тестов (один коннект, иначе каждая сессия
/// пула получит свою пустую базу)
pub async fn initialize_in_memory() -> anyhow::Result<DatabaseConnection> {
    let mut options = ConnectOptions::new("sqlite::memory:".to_owned());
    options.max_connections(1);
    let conn = Database::connect(options).await?;
    bootstrap_schema(&conn).await?;
    Ok(conn)
}

/// Ensure required tables exist (minimal schema bootstrap)
async fn bootstrap_schema(conn: &DatabaseConnection) -> anyhow::Result<()> {
    let statements = [
        // Платёжные заказы: журнал попыток оплаты, записи не удаляются
        r#"
        CREATE TABLE IF NOT EXISTS a001_payment_order (
            id TEXT PRIMARY KEY NOT NULL,
            order_number TEXT NOT NULL UNIQUE,
            description TEXT NOT NULL,
            user_id TEXT NOT NULL,
            amount INTEGER NOT NULL,
            currency TEXT NOT NULL,
            status TEXT NOT NULL DEFAULT 'pending',
            gateway_order_id TEXT,
            payment_method TEXT,
            product_json TEXT NOT NULL,
            created_at TEXT,
            updated_at TEXT,
            version INTEGER NOT NULL DEFAULT 0
        );
        "#,
        r#"
        CREATE INDEX IF NOT EXISTS idx_a001_gateway_order_id
            ON a001_payment_order (gateway_order_id);
        "#,
        r#"
        CREATE INDEX IF NOT EXISTS idx_a001_status
            ON a001_payment_order (status);
        "#,
        // Записи на марафоны: одна на пару (user, marathon)
        r#"
        CREATE TABLE IF NOT EXISTS a002_enrollment (
            id TEXT PRIMARY KEY NOT NULL,
            code TEXT NOT NULL DEFAULT '',
            description TEXT NOT NULL DEFAULT '',
            user_id TEXT NOT NULL,
            marathon_id TEXT NOT NULL,
            status TEXT NOT NULL DEFAULT 'pending',
            enrolled_at TEXT,
            total_days INTEGER NOT NULL,
            completed_days_json TEXT NOT NULL DEFAULT '[]',
            is_paid INTEGER NOT NULL DEFAULT 0,
            created_at TEXT,
            updated_at TEXT,
            version INTEGER NOT NULL DEFAULT 0,
            UNIQUE (user_id, marathon_id)
        );
        "#,
        // Покупки упражнений: одна на пару (user, exercise)
        r#"
        CREATE TABLE IF NOT EXISTS a003_exercise_purchase (
            id TEXT PRIMARY KEY NOT NULL,
            code TEXT NOT NULL DEFAULT '',
            description TEXT NOT NULL DEFAULT '',
            user_id TEXT NOT NULL,
            exercise_id TEXT NOT NULL,
            purchased_at TEXT NOT NULL,
            expires_at TEXT NOT NULL,
            created_at TEXT,
            updated_at TEXT,
            version INTEGER NOT NULL DEFAULT 0,
            UNIQUE (user_id, exercise_id)
        );
        "#,
        // Отметки выполнения упражнений по дням
        r#"
        CREATE TABLE IF NOT EXISTS a004_day_progress (
            id TEXT PRIMARY KEY NOT NULL,
            code TEXT NOT NULL DEFAULT '',
            description TEXT NOT NULL DEFAULT '',
            user_id TEXT NOT NULL,
            marathon_id TEXT NOT NULL,
            day INTEGER NOT NULL,
            exercise_id TEXT NOT NULL,
            completed INTEGER NOT NULL DEFAULT 0,
            created_at TEXT,
            updated_at TEXT,
            version INTEGER NOT NULL DEFAULT 0,
            UNIQUE (user_id, marathon_id, day, exercise_id)
        );
        "#,
        // Премиум-доступ: регистр, одна запись на пользователя
        r#"
        CREATE TABLE IF NOT EXISTS a005_premium_access (
            user_id TEXT PRIMARY KEY NOT NULL,
            premium_until TEXT NOT NULL,
            updated_at TEXT
        );
        "#,
        // Маркеры выдачи: ключ идемпотентности грантера по orderNumber
        r#"
        CREATE TABLE IF NOT EXISTS a006_entitlement_grant (
            order_number TEXT PRIMARY KEY NOT NULL,
            product_type TEXT NOT NULL,
            granted_at TEXT NOT NULL
        );
        "#,
    ];

    for sql in statements {
        conn.execute(Statement::from_string(
            DatabaseBackend::Sqlite,
            sql.to_string(),
        ))
        .await?;
    }

    Ok(())
}
