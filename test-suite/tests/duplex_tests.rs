use stagehand::{
    CallContext, Code, DuplexConfig, Harness, Status,
    duplex::{self, State, medium},
};
use stagehand_test_suite::*;
use std::time::Duration;

const PROMPTLY: Duration = Duration::from_secs(5);

#[tokio::test(flavor = "multi_thread")]
async fn ping_and_unknown() {
    Scenario::new(
        ScenarioMetadata::builder()
            .id("duplex_ping_and_unknown")
            .name("Ping and unknown endpoint")
            .purpose("An echo handler answers and an unregistered endpoint is not found")
            .tags(vec![Tag::Transport])
            .build(),
    )
    .run(|| async {
        let (client, teardown) = duplex::create(install_test_routes).await.unwrap();

        assert_eq!(client.call("/ping", "hello").await.unwrap(), "hello");

        let err = client.call("/unknown", "").await.unwrap_err();
        assert_eq!(err.code(), Code::NotFound);
        insta::assert_snapshot!(err.to_string(), @"not_found: no handler registered for `/unknown`");

        teardown.run();
    })
    .await;
}

#[tokio::test(flavor = "multi_thread")]
async fn empty_installer_still_serves() {
    let (client, teardown) = duplex::create_empty().await.unwrap();
    assert_eq!(teardown.state(), State::Serving);

    let err = tokio::time::timeout(PROMPTLY, client.call("/ping", ""))
        .await
        .unwrap()
        .unwrap_err();
    assert_eq!(err.code(), Code::NotFound);
    teardown.run();
}

#[tokio::test(flavor = "multi_thread")]
async fn harness_owns_transport_teardown() {
    let harness = Harness::new();
    let (client, teardown) = duplex::create(install_test_routes).await.unwrap();
    harness.register_with_cleanup("rpc", client.clone(), move || {
        teardown.run();
        Ok(())
    });

    assert_eq!(client.call("/ping", "up").await.unwrap(), "up");
    harness.teardown();

    let err = tokio::time::timeout(PROMPTLY, client.call("/ping", "down"))
        .await
        .unwrap()
        .unwrap_err();
    assert!(err.is_closed(), "{err}");
}

#[tokio::test(flavor = "multi_thread")]
async fn failures_stay_with_their_caller() {
    Scenario::new(
        ScenarioMetadata::builder()
            .id("duplex_failure_isolation")
            .name("Failure isolation")
            .purpose("Failing and panicking handlers only affect the call that hit them")
            .tags(vec![Tag::Transport, Tag::Concurrency])
            .build(),
    )
    .run(|| async {
        let (client, teardown) = duplex::create(install_test_routes).await.unwrap();

        let hanging = tokio::spawn({
            let client = client.fresh();
            async move { client.call("/hang", "").await }
        });

        let failed = client.call("/fail", "").await.unwrap_err();
        assert_eq!(failed.status(), Some(&Status::unavailable("backend offline")));

        let panicked = client.call("/boom", "").await.unwrap_err();
        assert_eq!(panicked.code(), Code::Internal);

        let total: Total = client
            .call_json("/sum", &Sum {
                values: vec![1, 2, 3, 4],
            })
            .await
            .unwrap();
        assert_eq!(total, Total { total: 10 });

        assert!(!hanging.is_finished());
        teardown.run();

        let err = tokio::time::timeout(PROMPTLY, hanging)
            .await
            .unwrap()
            .unwrap()
            .unwrap_err();
        assert!(err.is_closed(), "{err}");
    })
    .await;
}

#[tokio::test(flavor = "multi_thread")]
async fn invalid_json_is_invalid_argument() {
    let (client, teardown) = duplex::create(install_test_routes).await.unwrap();
    let err = client.call("/sum", "[1, 2").await.unwrap_err();
    assert_eq!(err.code(), Code::InvalidArgument);
    teardown.run();
}

#[test_case::test_case(CallContext::new().with_deadline(tokio::time::Instant::now()), Code::DeadlineExceeded; "expired deadline")]
#[test_case::test_case({ let ctx = CallContext::new(); ctx.cancel(); ctx }, Code::Cancelled; "cancelled token")]
#[tokio::test(flavor = "multi_thread")]
async fn dead_context_fails_without_calling(
    ctx: CallContext,
    expected: Code,
) {
    let (client, teardown) = duplex::create(install_test_routes).await.unwrap();

    let err = tokio::time::timeout(PROMPTLY, client.call_with(&ctx, "/hang", ""))
        .await
        .unwrap()
        .unwrap_err();
    assert_eq!(err.code(), expected);

    // the shared connection is untouched
    assert_eq!(client.call("/ping", "ok").await.unwrap(), "ok");
    teardown.run();
}

#[tokio::test(flavor = "multi_thread")]
async fn deadline_interrupts_blocked_call() {
    Scenario::new(
        ScenarioMetadata::builder()
            .id("duplex_deadline")
            .name("Deadline on a blocked call")
            .purpose("A call to a handler that never answers returns once its deadline passes")
            .tags(vec![Tag::Transport, Tag::Cancellation])
            .build(),
    )
    .run(|| async {
        let (client, teardown) = duplex::create(install_test_routes).await.unwrap();
        let ctx = CallContext::new().with_timeout(Duration::from_millis(50));

        let err = tokio::time::timeout(PROMPTLY, client.call_with(&ctx, "/hang", ""))
            .await
            .unwrap()
            .unwrap_err();
        assert!(err.is_deadline_exceeded(), "{err}");

        assert_eq!(client.call("/ping", "after").await.unwrap(), "after");
        teardown.run();
    })
    .await;
}

#[tokio::test(flavor = "multi_thread")]
async fn many_clients_in_parallel() {
    let (client, teardown) = duplex::create(install_test_routes).await.unwrap();

    let calls = (0..32).map(|n| {
        let client = client.fresh();
        async move {
            client
                .call_json::<_, Total>("/sum", &Sum {
                    values: vec![n, n],
                })
                .await
        }
    });
    let totals = futures::future::try_join_all(calls).await.unwrap();

    for (n, total) in totals.into_iter().enumerate() {
        assert_eq!(total.total, 2 * n as i64);
    }
    teardown.run();
}

#[tokio::test(flavor = "multi_thread")]
async fn closing_listener_fails_dials_fast() {
    let (listener, dialer) = medium::listen(&DuplexConfig::default()).unwrap();
    let pending = dialer.dial().await.unwrap();

    listener.close();
    drop(pending);

    let err = tokio::time::timeout(PROMPTLY, dialer.dial())
        .await
        .unwrap()
        .unwrap_err();
    assert!(err.is_closed());
    assert_eq!(dialer.state(), State::Closed);
}

#[tokio::test(flavor = "multi_thread")]
async fn zero_sized_medium_fails_creation() {
    let config = DuplexConfig::builder().buffer_size(0).build();
    let err = duplex::create_with(&config, install_test_routes)
        .await
        .unwrap_err();
    assert!(matches!(err, duplex::Error::Bind { .. }), "{err}");
}
