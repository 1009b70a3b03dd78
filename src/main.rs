use std::net::{IpAddr, SocketAddr};

use rbac_backend::{
    AppState,
    config::Config,
    database::{
        Database,
        schema::{fill_database, init_models},
    },
    diagnostics::ExceptionRecorder,
    routes,
};
use sqlx::Executor;
use sqlx::postgres::PgPoolOptions;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() {
    // 初始化日志
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    // 加载配置
    let config = Config::from_env().expect("Failed to load configuration");

    // 设置数据库连接池
    let pool = PgPoolOptions::new()
        .max_connections(10)
        .after_connect(|conn, _meta| {
            Box::pin(async move {
                conn.execute("SET application_name = 'rbac_backend';").await?;
                Ok(())
            })
        })
        .connect(&config.database_url)
        .await
        .expect("Failed to connect to Postgres");

    // 建表并写入默认角色与规则
    init_models(&pool)
        .await
        .expect("Failed to initialise database schema");

    let recorder = ExceptionRecorder::new(config.exceptions_dir.clone());
    let db = Database::postgres(pool, recorder.clone());
    let state = AppState::new(db, config.clone(), recorder);

    fill_database(&state.db, state.hasher, config.seed_demo_users)
        .await
        .expect("Failed to seed default data");

    let app = routes::router(state.clone());

    // 启动服务器
    let addr = SocketAddr::new(
        config.server_host.parse().unwrap_or_else(|_| {
            tracing::warn!("Invalid server_host, falling back to dual-stack default");
            IpAddr::V6(std::net::Ipv6Addr::UNSPECIFIED)
        }),
        config.server_port,
    );
    tracing::info!("Server listening on {}", addr);
    axum::serve(
        tokio::net::TcpListener::bind(&addr)
            .await
            .expect("Failed to bind"),
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await
    .expect("Failed to start server");
}
