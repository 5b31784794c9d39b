// tests/property_single_flight.rs

mod common;
use crate::common::builders::ConfigFileBuilder;
use crate::common::{fake_coordinator, wait_for_snapshot};

use buildgate::build::BuildOutcome;
use buildgate::config::ModuleConfig;
use buildgate::coordinator::{BuildStatus, ModuleState};
use buildgate_test_utils::fake_builder::{FakeBuilder, failure};
use buildgate_test_utils::fake_watch::FakeWatchBackend;
use proptest::prelude::*;

fn runtime() -> tokio::runtime::Runtime {
    tokio::runtime::Builder::new_multi_thread()
        .worker_threads(2)
        .enable_all()
        .build()
        .expect("tokio runtime")
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    // However many requests pile up on one stale module, exactly one build
    // runs and every request sees its outcome.
    #[test]
    fn concurrent_requests_share_one_build(requests in 1usize..24, succeed in any::<bool>()) {
        let rt = runtime();
        let (builds, results) = rt.block_on(async move {
            let cfg = ConfigFileBuilder::new()
                .bundle()
                .with_module("/app.js", ModuleConfig::default())
                .build();
            let builder = FakeBuilder::gated();
            if !succeed {
                builder.always("/app.js", BuildOutcome::Failure(failure("/app.js", "boom")));
            }
            let watch = FakeWatchBackend::new();
            let coordinator = fake_coordinator(&cfg, &builder, &watch);

            let mut handles = Vec::new();
            for _ in 0..requests {
                let c = coordinator.clone();
                handles.push(tokio::spawn(async move { c.ensure_fresh("/app.js").await }));
            }
            wait_for_snapshot(&coordinator, "/app.js", |s| s.waiting == requests).await;
            builder.release(requests);

            let mut results = Vec::new();
            for handle in handles {
                results.push(handle.await.expect("joined"));
            }
            (builder.calls("/app.js"), results)
        });

        prop_assert_eq!(builds, 1);
        prop_assert_eq!(results.len(), requests);
        for result in results {
            if succeed {
                prop_assert_eq!(result, Ok(BuildStatus::Rebuilt));
            } else {
                prop_assert!(result.is_err());
            }
        }
    }

    // Any interleaving of change events and requests leaves the module either
    // fresh or stale, never stuck building, and never builds more often than
    // there were requests.
    #[test]
    fn invalidations_never_wedge_the_module(ops in proptest::collection::vec(any::<bool>(), 1..40)) {
        let rt = runtime();
        let (state, builds, requests) = rt.block_on(async move {
            let cfg = ConfigFileBuilder::new()
                .bundle()
                .with_module("/app.js", ModuleConfig::default())
                .build();
            let builder = FakeBuilder::new();
            builder.succeed_with("/app.js", &["/src/app.js"]);
            let watch = FakeWatchBackend::new();
            let coordinator = fake_coordinator(&cfg, &builder, &watch);

            let mut requests = 0;
            for request in ops {
                if request {
                    requests += 1;
                    coordinator.ensure_fresh("/app.js").await.expect("fake build succeeds");
                } else {
                    watch.fire("/src/app.js", buildgate::watch::ChangeKind::Modified);
                }
            }
            let snapshot = coordinator.snapshot("/app.js").await.expect("configured");
            (snapshot.state, builder.calls("/app.js"), requests)
        });

        prop_assert_ne!(state, ModuleState::Building);
        prop_assert!(builds <= requests);
        if requests == 0 {
            prop_assert_eq!(state, ModuleState::Unbuilt);
        }
    }
}
