//! # Integration Tests
//!
//! 集成测试与端到端测试。
//!
//! 负责：
//! - 合约快照测试
//! - 端到端测试：remote-write 请求 -> HTTP -> 过滤 -> 多个 sink
//! - 故障隔离场景（失败 sink、超时 sink、非有限值）

#[cfg(test)]
mod contract_tests {
    use contracts::{BridgeConfig, Series};

    #[test]
    fn test_contracts_compile() {
        // 验证 contracts crate 可编译
        let _ = contracts::ConfigVersion::V1;
    }

    #[test]
    fn test_default_config_snapshot() {
        let config = BridgeConfig::default();
        assert_eq!(config.server.listen_address, "0.0.0.0:24282");
        assert_eq!(config.server.write_path, "/write");
        assert_eq!(config.server.telemetry_path, "/metrics");
        assert_eq!(config.dispatch.send_timeout_ms, 30_000);
        assert!(!config.dispatch.log_only);
    }

    #[test]
    fn test_series_json_is_flat_label_map() {
        let series = Series::from_pairs([("__name__", "up"), ("job", "node")]);
        let json = serde_json::to_string(&series).unwrap();
        assert_eq!(json, r#"{"__name__":"up","job":"node"}"#);
    }
}

#[cfg(test)]
mod e2e_tests {
    use std::collections::HashMap;
    use std::io::Write;
    use std::sync::Arc;
    use std::time::Duration;

    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use config_loader::{ConfigFormat, ConfigLoader};
    use contracts::Series;
    use dispatcher::{Dispatcher, DispatcherBuilder, MemorySink, Sample, SinkHandle};
    use filter::RuleSet;
    use ingestion::proto::{Label, Sample as WireSample, TimeSeries, WriteRequest};
    use ingestion::{encode_write_request, router, AppState};
    use tower::ServiceExt;

    fn labels(pairs: &[(&str, &str)]) -> Vec<Label> {
        pairs
            .iter()
            .map(|(name, value)| Label {
                name: name.to_string(),
                value: value.to_string(),
            })
            .collect()
    }

    fn series(pairs: &[(&str, &str)], values: &[f64]) -> TimeSeries {
        TimeSeries {
            labels: labels(pairs),
            samples: values
                .iter()
                .enumerate()
                .map(|(i, v)| WireSample {
                    value: *v,
                    timestamp: 1_700_000_000_000 + i as i64,
                })
                .collect(),
        }
    }

    fn write(body: Vec<u8>) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri("/write")
            .header("content-encoding", "snappy")
            .header("content-type", "application/x-protobuf")
            .body(Body::from(body))
            .unwrap()
    }

    fn finite_samples(n: usize) -> Vec<Sample> {
        let series = Arc::new(Series::from_pairs([("__name__", "up"), ("job", "node")]));
        (0..n)
            .map(|i| Sample::new(Arc::clone(&series), i as f64, i as i64))
            .collect()
    }

    /// End-to-end test: remote-write body -> router -> RuleSet -> MemorySinks
    ///
    /// 验证完整的数据流：
    /// 1. snappy + protobuf 请求体被解码
    /// 2. 规则 `app SI test` 只保留 test* 应用
    /// 3. 非有限值被丢弃
    /// 4. 两个 sink 都收到同一批样本
    #[tokio::test]
    async fn test_e2e_remote_write_pipeline() {
        let a = MemorySink::new("a");
        let b = MemorySink::new("b");
        let dispatcher = Dispatcher::new(
            Arc::new(RuleSet::parse("app SI test").unwrap()),
            vec![
                SinkHandle::new(a.clone(), Duration::from_secs(1)),
                SinkHandle::new(b.clone(), Duration::from_secs(1)),
            ],
        );
        let dispatcher = Arc::new(dispatcher);
        let app = router(
            AppState::new(Arc::clone(&dispatcher), None),
            &contracts::ServerConfig::default(),
        );

        let body = encode_write_request(&WriteRequest {
            timeseries: vec![
                series(&[("__name__", "x"), ("app", "testApp")], &[1.0, 2.0]),
                series(&[("app", "prodApp")], &[3.0]),
                series(&[("__name__", "y"), ("app", "TestSuite")], &[f64::INFINITY, 4.0]),
                series(&[], &[5.0]),
            ],
        })
        .unwrap();

        let response = app.oneshot(write(body)).await.unwrap();
        assert_eq!(response.status(), StatusCode::NO_CONTENT);

        for sink in [&a, &b] {
            let values: Vec<f64> = sink.samples().iter().map(|s| s.value).collect();
            assert_eq!(values, vec![1.0, 2.0, 4.0]);
            assert_eq!(sink.deliveries(), 1);
        }

        let stats = dispatcher.stats();
        assert_eq!(stats.received, 6);
        assert_eq!(stats.non_finite, 1);
        assert_eq!(stats.filtered_out, 2);
    }

    /// 失败 sink 不影响其他 sink，各自的计数准确
    #[tokio::test]
    async fn test_failing_sink_scenario() {
        let good = MemorySink::new("good");
        let bad = MemorySink::new("bad").failing("connection refused");
        let dispatcher = Dispatcher::new(
            Arc::new(RuleSet::empty()),
            vec![
                SinkHandle::new(good.clone(), Duration::from_secs(1)),
                SinkHandle::new(bad.clone(), Duration::from_secs(1)),
            ],
        );

        let summary = dispatcher.dispatch(finite_samples(5)).await;
        assert_eq!(summary.received, 5);
        assert_eq!(summary.failed_sinks(), 1);

        let metrics: HashMap<_, _> = dispatcher.metrics().into_iter().collect();
        assert_eq!(metrics["good"].sent_samples, 5);
        assert_eq!(metrics["good"].failed_samples, 0);
        assert_eq!(metrics["bad"].sent_samples, 0);
        assert_eq!(metrics["bad"].failed_samples, 5);
        assert_eq!(metrics["good"].duration_count, 1);
        assert_eq!(metrics["bad"].duration_count, 1);
        assert_eq!(good.sample_count(), 5);
        assert_eq!(bad.deliveries(), 1);
    }

    /// 超时 sink 只记一次失败，不拖住其他 sink
    #[tokio::test]
    async fn test_timed_out_sink_scenario() {
        let fast = MemorySink::new("fast");
        let slow = MemorySink::new("slow").with_delay(Duration::from_secs(30));
        let dispatcher = Dispatcher::new(
            Arc::new(RuleSet::empty()),
            vec![
                SinkHandle::new(fast.clone(), Duration::from_secs(1)),
                SinkHandle::new(slow, Duration::from_millis(50)),
            ],
        );

        let started = std::time::Instant::now();
        let summary = dispatcher.dispatch(finite_samples(3)).await;
        assert!(started.elapsed() < Duration::from_secs(5));
        assert_eq!(summary.failed_sinks(), 1);

        let metrics: HashMap<_, _> = dispatcher.metrics().into_iter().collect();
        assert_eq!(metrics["fast"].sent_samples, 3);
        assert_eq!(metrics["slow"].failed_batches, 1);
        assert_eq!(metrics["slow"].failed_samples, 3);
    }

    #[tokio::test]
    async fn test_infinite_value_scenario() {
        let sink = MemorySink::new("mem");
        let dispatcher = Dispatcher::new(
            Arc::new(RuleSet::empty()),
            vec![SinkHandle::new(sink.clone(), Duration::from_secs(1))],
        );

        let mut batch = finite_samples(3);
        batch[1].value = f64::INFINITY;
        let summary = dispatcher.dispatch(batch).await;

        assert_eq!(summary.delivered, 2);
        assert_eq!(sink.sample_count(), 2);
    }

    /// 配置文件 + 规则文件 -> DispatcherBuilder -> log sinks
    #[tokio::test]
    async fn test_config_to_dispatcher() {
        let mut rules = tempfile::NamedTempFile::new().unwrap();
        writeln!(rules, "# only node exporters\njob EI NODE").unwrap();

        let content = format!(
            r#"
[filter]
rule_file = "{}"

[dispatch]
send_timeout_ms = 2000
log_only = true

[[sinks]]
name = "amqp"
sink_type = "amqp"
[sinks.params]
address = "amqp://localhost:5672"
queue = "metrics"

[[sinks]]
name = "debug"
sink_type = "log"
send_timeout_ms = 100
"#,
            rules.path().display()
        );
        let config = ConfigLoader::load_from_str(&content, ConfigFormat::Toml).unwrap();
        let rule_set = RuleSet::load(config.filter.rule_file.as_deref()).unwrap();
        assert_eq!(rule_set.len(), 1);

        let dispatcher = DispatcherBuilder::new(config.dispatch, config.sinks, Arc::new(rule_set))
            .build()
            .unwrap();
        let timeouts: Vec<_> = dispatcher.handles().iter().map(|h| h.timeout()).collect();
        assert_eq!(
            timeouts,
            vec![Duration::from_millis(2000), Duration::from_millis(100)]
        );

        let summary = dispatcher.dispatch(finite_samples(2)).await;
        assert_eq!(summary.delivered, 2);
        assert_eq!(summary.failed_sinks(), 0);
    }

    /// 全局 Prometheus 指标与进程内计数一致
    #[test]
    fn test_prometheus_metrics_scenario() {
        let recorder = observability::prometheus_builder()
            .unwrap()
            .build_recorder();
        let handle = recorder.handle();
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .unwrap();

        let dispatcher = Dispatcher::new(
            Arc::new(RuleSet::empty()),
            vec![
                SinkHandle::new(MemorySink::new("a"), Duration::from_secs(1)),
                SinkHandle::new(MemorySink::new("b").failing("down"), Duration::from_secs(1)),
            ],
        );

        metrics::with_local_recorder(&recorder, || {
            runtime.block_on(dispatcher.dispatch(finite_samples(5)));
        });

        let output = handle.render();
        assert!(output.contains("received_samples_total 5"), "{output}");
        assert!(output.contains(r#"sent_samples_total{remote="a"} 5"#), "{output}");
        assert!(output.contains(r#"failed_samples_total{remote="b"} 5"#), "{output}");
        assert!(
            output.contains(r#"sent_batch_duration_seconds_count{remote="a"} 1"#),
            "{output}"
        );
        assert!(
            output.contains(r#"sent_batch_duration_seconds_count{remote="b"} 1"#),
            "{output}"
        );
    }
}
