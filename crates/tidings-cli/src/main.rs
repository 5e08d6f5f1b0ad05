use serde::Serialize;
use std::sync::Arc;
use std::sync::Mutex;
use tokio::time::{Duration, sleep};
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use tidings_core::{
    BoxError, BusError, BusStats, NotificationType, PartitionKind, Subscription,
    default_aggregator, notification,
};

/// センサーの種類をまたいで受け取るためのカテゴリ
trait Reading: Send + Sync {
    fn sensor(&self) -> &str;
    fn value(&self) -> f64;
}

#[derive(Debug)]
struct Temperature {
    sensor: String,
    celsius: f64,
}

#[derive(Debug)]
struct Humidity {
    sensor: String,
    percent: f64,
}

impl Reading for Temperature {
    fn sensor(&self) -> &str {
        &self.sensor
    }

    fn value(&self) -> f64 {
        self.celsius
    }
}

impl Reading for Humidity {
    fn sensor(&self) -> &str {
        &self.sensor
    }

    fn value(&self) -> f64 {
        self.percent
    }
}

notification!(Temperature: dyn Reading);
notification!(Humidity: dyn Reading);

/// 全ての Reading を記録する購読者（polymorphic）
#[derive(Default)]
struct Recorder {
    lines: Mutex<Vec<String>>,
}

impl Recorder {
    fn on_reading(&self, reading: &(dyn Reading + 'static)) {
        let line = format!("{}={}", reading.sensor(), reading.value());
        if let Ok(mut lines) = self.lines.lock() {
            lines.push(line);
        }
    }
}

/// 温度だけを見て、閾値を超えたら失敗する購読者（exact）
struct Thermostat {
    limit: f64,
}

#[derive(Debug, thiserror::Error)]
#[error("{celsius} exceeds the limit of {limit}")]
struct Overheat {
    celsius: f64,
    limit: f64,
}

impl Thermostat {
    fn on_temperature(&self, reading: &Temperature) -> Result<(), Overheat> {
        if reading.celsius > self.limit {
            return Err(Overheat {
                celsius: reading.celsius,
                limit: self.limit,
            });
        }
        info!(sensor = %reading.sensor, celsius = reading.celsius, "thermostat ok");
        Ok(())
    }
}

#[derive(Serialize)]
struct Report {
    delivered: Vec<usize>,
    recorded: Vec<String>,
    greenhouse_subscribers: usize,
    stats: BusStats,
}

#[tokio::main]
async fn main() -> Result<(), BoxError> {
    // (A) ログ: RUST_LOG がなければ tidings_core の debug まで出す
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,tidings_core=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // (B) 既定インスタンス（ランタイム内なので cleanup は Tokio に回る）
    let bus = default_aggregator();
    let recorder = Arc::new(Recorder::default());
    let thermostat = Arc::new(Thermostat { limit: 30.0 });

    bus.subscribe(
        Subscription::<dyn Reading>::new()
            .method(&recorder, Recorder::on_reading)
            .accept_subtypes(),
    )?;
    bus.subscribe(
        Subscription::<Temperature>::new()
            .method(&thermostat, Thermostat::on_temperature)
            .token("greenhouse"),
    )?;

    // (C) 配送
    let mut delivered = Vec::new();
    delivered.push(bus.publish(Humidity {
        sensor: "cellar".into(),
        percent: 71.5,
    })?);
    delivered.push(bus.publish_with_token(
        Temperature {
            sensor: "greenhouse".into(),
            celsius: 24.0,
        },
        "greenhouse",
    )?);

    // (D) handler の失敗は publish のエラーになる
    match bus.publish_with_token(
        Temperature {
            sensor: "greenhouse".into(),
            celsius: 35.5,
        },
        "greenhouse",
    ) {
        Err(BusError::Handler { method, source, .. }) => {
            warn!(%method, error = %source, "publish aborted");
        }
        other => {
            delivered.push(other?);
        }
    }

    // (E) 購読者を破棄すると配送対象から外れ、idle 時に回収される
    drop(thermostat);
    delivered.push(bus.publish_with_token(
        Temperature {
            sensor: "greenhouse".into(),
            celsius: 20.0,
        },
        "greenhouse",
    )?);
    sleep(Duration::from_millis(50)).await;

    let recorded = recorder
        .lines
        .lock()
        .map(|lines| lines.clone())
        .unwrap_or_default();
    let report = Report {
        delivered,
        recorded,
        greenhouse_subscribers: bus.subscription_count(
            PartitionKind::Exact,
            NotificationType::of::<Temperature>(),
        ),
        stats: bus.stats(),
    };
    println!("{}", serde_json::to_string_pretty(&report)?);

    Ok(())
}
