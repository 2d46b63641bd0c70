//! # Integration Tests
//!
//! End-to-end tests across the workspace crates.
//!
//! Covers:
//! - Contract constants and manifest round trips
//! - Broker lifecycle scenarios with paused time
//! - Manifest -> sink/sources -> broker flow

#[cfg(test)]
mod contract_tests {
    use contracts::{ConfigVersion, MAX_BATCH_SIZE};

    #[test]
    fn test_contracts_compile() {
        let _ = ConfigVersion::V1;
        assert_eq!(MAX_BATCH_SIZE, 20);
    }

    #[test]
    fn test_manifest_toml_round_trip() {
        let toml = r#"
            [sink]
            name = "out"
            sink_type = "file"
            [sink.params]
            base_path = "./metrics"

            [[tasks]]
            name = "api"
            namespace = "App/Api"
            interval_ms = 1000
            [tasks.source]
            source_type = "heartbeat"
        "#;
        let manifest =
            config_loader::ConfigLoader::load_from_str(toml, config_loader::ConfigFormat::Toml)
                .unwrap();
        let rendered = config_loader::ConfigLoader::to_toml(&manifest).unwrap();
        let reparsed =
            config_loader::ConfigLoader::load_from_str(&rendered, config_loader::ConfigFormat::Toml)
                .unwrap();

        assert_eq!(reparsed.tasks[0].name, "api");
        assert_eq!(reparsed.sink.params.get("base_path").map(String::as_str), Some("./metrics"));
    }
}

#[cfg(test)]
mod e2e_tests {
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Arc, Mutex};
    use std::time::Duration;

    use broker::sources::MockSourceConfig;
    use broker::{
        create_broker, create_sink, create_source, Broker, BrokerError, MetricPoint, MetricSink,
        MockSource,
    };
    use contracts::{ContractError, FnSource};
    use tokio_util::sync::CancellationToken;

    /// Sink recording every call in order
    #[derive(Default)]
    struct CaptureSink {
        calls: Mutex<Vec<(String, Vec<MetricPoint>)>>,
    }

    impl CaptureSink {
        fn calls(&self) -> Vec<(String, Vec<MetricPoint>)> {
            self.calls.lock().unwrap().clone()
        }
    }

    impl MetricSink for CaptureSink {
        fn name(&self) -> &str {
            "capture"
        }

        async fn publish(
            &self,
            _cancel: &CancellationToken,
            namespace: &str,
            points: &[MetricPoint],
        ) -> Result<(), ContractError> {
            assert!(points.len() <= contracts::MAX_BATCH_SIZE);
            self.calls
                .lock()
                .unwrap()
                .push((namespace.to_string(), points.to_vec()));
            Ok(())
        }
    }

    fn mock(points: usize, fail_every: Option<u64>) -> Arc<MockSource> {
        Arc::new(MockSource::new(MockSourceConfig {
            points,
            fail_every,
            ..Default::default()
        }))
    }

    async fn run_for<S>(broker: &Arc<Broker<S>>, window: Duration)
    where
        S: MetricSink + Sync + 'static,
    {
        let cancel = CancellationToken::new();
        let handle = {
            let broker = Arc::clone(broker);
            let cancel = cancel.clone();
            tokio::spawn(async move { broker.run(cancel).await })
        };
        tokio::time::sleep(window).await;
        cancel.cancel();
        handle.await.unwrap().unwrap();
    }

    /// 100ms task producing 25 points, cancelled at 350ms
    #[tokio::test(start_paused = true)]
    async fn test_periodic_batches_of_twenty_and_five() {
        let broker = Arc::new(create_broker(CaptureSink::default()));
        let source = mock(25, None);
        broker
            .register("api", "App/Api", Duration::from_millis(100), source.clone())
            .await
            .unwrap();

        run_for(&broker, Duration::from_millis(350)).await;

        let firings = source.collections() as usize;
        assert!(firings >= 3);

        let calls = broker.sink().calls();
        assert_eq!(calls.len(), firings * 2);
        for firing in calls.chunks(2) {
            assert_eq!(firing[0].1.len(), 20);
            assert_eq!(firing[1].1.len(), 5);
            assert!(firing.iter().all(|(ns, _)| ns == "App/Api"));

            let stamp = firing[0].1[0].timestamp;
            assert!(stamp.is_some());
            assert!(firing
                .iter()
                .flat_map(|(_, points)| points)
                .all(|p| p.timestamp == stamp));
        }
    }

    /// Source that always fails: one report per firing, no sink traffic
    #[tokio::test(start_paused = true)]
    async fn test_failing_source_never_reaches_sink() {
        let reports = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&reports);
        let broker = Arc::new(
            Broker::builder(CaptureSink::default())
                .error_handler(move |e: &BrokerError| {
                    if matches!(e, BrokerError::Collection { .. }) {
                        counter.fetch_add(1, Ordering::SeqCst);
                    }
                })
                .build(),
        );
        let source = mock(5, Some(1));
        broker
            .register("broken", "App/Broken", Duration::from_millis(100), source.clone())
            .await
            .unwrap();

        run_for(&broker, Duration::from_millis(350)).await;

        let firings = source.collections() as usize;
        assert!(firings >= 3);
        assert_eq!(reports.load(Ordering::SeqCst), firings);
        assert!(broker.sink().calls().is_empty());
        assert_eq!(broker.metrics().collection_failures() as usize, firings);
    }

    /// A firing still collecting at cancellation is published before `run` returns
    #[tokio::test(start_paused = true)]
    async fn test_in_flight_firing_drained() {
        let broker = Arc::new(create_broker(CaptureSink::default()));
        let started = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&started);
        let source = FnSource::arc(move |_cancel| {
            counter.fetch_add(1, Ordering::SeqCst);
            async {
                tokio::time::sleep(Duration::from_millis(80)).await;
                Ok(vec![MetricPoint::new("slow", 1.0)])
            }
        });
        broker
            .register("slow", "App/Slow", Duration::from_millis(100), source)
            .await
            .unwrap();

        // Cancelled at 330ms while the 300ms firing is still collecting
        run_for(&broker, Duration::from_millis(330)).await;

        let firings = started.load(Ordering::SeqCst);
        assert_eq!(firings, 3);
        assert_eq!(broker.sink().calls().len(), firings);
        assert_eq!(broker.metrics().snapshot().workers_in_flight, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_register_after_cancellation_rejected() {
        let broker = Arc::new(create_broker(CaptureSink::default()));
        run_for(&broker, Duration::from_millis(10)).await;

        let err = broker
            .register("late", "ns", Duration::from_millis(100), mock(1, None))
            .await
            .unwrap_err();
        assert!(matches!(err, BrokerError::RegistrationClosed { .. }));
        assert_eq!(broker.metrics().fires(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_tasks_fire_independently() {
        let broker = Arc::new(create_broker(CaptureSink::default()));
        let fast = mock(1, None);
        let slow = mock(1, None);
        broker
            .register("fast", "App/Fast", Duration::from_millis(50), fast.clone())
            .await
            .unwrap();
        broker
            .register("slow", "App/Slow", Duration::from_millis(200), slow.clone())
            .await
            .unwrap();

        run_for(&broker, Duration::from_millis(420)).await;

        assert_eq!(fast.collections(), 8);
        assert_eq!(slow.collections(), 2);
        let calls = broker.sink().calls();
        assert_eq!(calls.iter().filter(|(ns, _)| ns == "App/Fast").count(), 8);
        assert_eq!(calls.iter().filter(|(ns, _)| ns == "App/Slow").count(), 2);
    }

    /// Manifest -> file sink + mock source -> broker -> JSON lines on disk
    #[tokio::test]
    async fn test_manifest_driven_file_output() {
        let dir = tempfile::tempdir().unwrap();
        let toml = format!(
            r#"
            [broker]
            batch_size = 10

            [sink]
            name = "files"
            sink_type = "file"
            [sink.params]
            base_path = "{}"

            [[tasks]]
            name = "api"
            namespace = "App/Api"
            interval_ms = 40
            [tasks.source]
            source_type = "mock"
            [tasks.source.params]
            points = "15"
            "dim.region" = "eu"
            "#,
            dir.path().display().to_string().replace('\\', "/")
        );
        let manifest =
            config_loader::ConfigLoader::load_from_str(&toml, config_loader::ConfigFormat::Toml)
                .unwrap();

        let sink = create_sink(&manifest.sink).await.unwrap();
        let broker = Arc::new(
            Broker::builder(sink)
                .config(manifest.broker.clone().into())
                .build(),
        );
        for task in &manifest.tasks {
            let source = create_source(&task.source, &task.name).unwrap();
            broker
                .register(&task.name, &task.namespace, task.interval(), source)
                .await
                .unwrap();
        }

        run_for(&broker, Duration::from_millis(150)).await;

        let metrics = broker.metrics().snapshot();
        assert!(metrics.firings >= 2);
        assert_eq!(metrics.batches_published, metrics.firings * 2);

        let content = std::fs::read_to_string(dir.path().join("App_Api.jsonl")).unwrap();
        let lines: Vec<serde_json::Value> = content
            .lines()
            .map(|l| serde_json::from_str(l).unwrap())
            .collect();
        assert_eq!(lines.len() as u64, metrics.points_published);
        assert!(lines.iter().all(|l| l["namespace"] == "App/Api"));
        assert!(lines.iter().all(|l| l["dimensions"]["region"] == "eu"));
        assert!(lines.iter().all(|l| l["timestamp"].is_string()));

        let by_series: HashMap<String, usize> =
            lines.iter().fold(HashMap::new(), |mut acc, l| {
                *acc.entry(l["dimensions"]["series"].to_string()).or_default() += 1;
                acc
            });
        assert_eq!(by_series.len(), 15);
    }
}
