//! Prometheus gauges for the database connection pool

use prometheus::{IntGaugeVec, Opts};
use sqlx::PgPool;
use std::sync::OnceLock;

static DB_POOL_CONNECTIONS: OnceLock<IntGaugeVec> = OnceLock::new();

fn pool_connections() -> &'static IntGaugeVec {
    DB_POOL_CONNECTIONS.get_or_init(|| {
        let gauge = IntGaugeVec::new(
            Opts::new(
                "db_pool_connections",
                "Database pool connection count by state",
            ),
            &["service", "state"],
        )
        .expect("valid metric definition");
        // A second registration (e.g. two pools in one test binary) is harmless.
        let _ = prometheus::register(Box::new(gauge.clone()));
        gauge
    })
}

/// Update connection pool gauges (called periodically)
pub fn update_pool_metrics(pool: &PgPool, service: &str) {
    let size = pool.size() as i64;
    let idle = pool.num_idle() as i64;
    let gauges = pool_connections();

    gauges.with_label_values(&[service, "idle"]).set(idle);
    gauges.with_label_values(&[service, "active"]).set(size - idle);
    gauges
        .with_label_values(&[service, "max"])
        .set(pool.options().get_max_connections() as i64);
}
