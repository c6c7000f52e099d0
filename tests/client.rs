use super::*;

fn client(pool: &MockPool) -> Client {
    Client::new(ClientConfig::new(pool.address(), "worker", "x"))
}

fn share() -> (JobId, Extranonce, Ntime, Nonce) {
    (
        JobId::from("bf"),
        "00000001".parse().unwrap(),
        "504e86ed".parse().unwrap(),
        "b2957c02".parse().unwrap(),
    )
}

#[tokio::test]
async fn handshake_reports_session_and_first_job() {
    let pool = MockPool::spawn(Script::default()).await;
    let client = client(&pool);
    let mut events = client.events();

    let session = client.connect().await.unwrap();

    pretty_assert_eq!(session.session_id.as_deref(), Some(mock_pool::SESSION_ID));
    pretty_assert_eq!(
        session.extranonce1,
        mock_pool::EXTRANONCE1.parse::<Extranonce>().unwrap()
    );
    pretty_assert_eq!(session.extranonce2_size, 4);
    assert!(client.is_connected());

    match next_event(&mut events).await {
        Event::SetDifficulty(difficulty) => pretty_assert_eq!(difficulty, Difficulty::from(2.0)),
        event => panic!("expected difficulty, got {event:?}"),
    }

    match next_event(&mut events).await {
        Event::Notify(notify) => {
            pretty_assert_eq!(notify.job_id, JobId::from("bf"));
            assert!(notify.clean_jobs);
        }
        event => panic!("expected notify, got {event:?}"),
    }
}

#[tokio::test]
async fn refused_authorization() {
    let pool = MockPool::spawn(Script {
        authorize: false,
        ..Default::default()
    })
    .await;

    let client = client(&pool);

    assert!(matches!(
        client.connect().await,
        Err(ClientError::Unauthorized { .. })
    ));
    assert!(!client.is_connected());
}

#[tokio::test]
async fn connection_refused() {
    let client = Client::new(ClientConfig::new(
        MockPool::unreachable().await,
        "worker",
        "x",
    ));

    let err = client.connect().await.unwrap_err();
    assert!(err.is_transport(), "{err}");
    assert!(!client.is_connected());
}

#[tokio::test]
async fn silent_pool_hits_connect_timeout() {
    let client = Client::new(ClientConfig {
        connect_timeout: Duration::from_millis(200),
        request_timeout: Duration::from_secs(3),
        ..ClientConfig::new(MockPool::silent().await, "worker", "x")
    });

    let start = Instant::now();
    let err = client.connect().await.unwrap_err();

    assert!(start.elapsed() < Duration::from_secs(1), "{:?}", start.elapsed());
    assert!(matches!(err, ClientError::ConnectTimeout { .. }), "{err}");
    assert!(err.is_transport());
    assert!(!client.is_connected());
}

#[tokio::test]
async fn accepted_share() {
    let mut pool = MockPool::spawn(Script::default()).await;
    let client = client(&pool);
    client.connect().await.unwrap();

    let (job_id, extranonce2, ntime, nonce) = share();

    pretty_assert_eq!(
        client.submit(job_id, extranonce2, ntime, nonce).await.unwrap(),
        SubmitOutcome::Accepted
    );

    pretty_assert_eq!(
        pool.next_submit().await,
        json!(["worker", "bf", "00000001", "504e86ed", "b2957c02"])
    );
}

#[tokio::test]
async fn rejected_share_keeps_reason() {
    let pool = MockPool::spawn(Script {
        submits: Submits::Reject,
        ..Default::default()
    })
    .await;

    let client = client(&pool);
    client.connect().await.unwrap();

    let (job_id, extranonce2, ntime, nonce) = share();

    pretty_assert_eq!(
        client.submit(job_id, extranonce2, ntime, nonce).await.unwrap(),
        SubmitOutcome::Rejected {
            reason: "Low difficulty share".into()
        }
    );
    assert!(client.is_connected());
}

#[tokio::test]
async fn unanswered_share_times_out_without_disconnecting() {
    let pool = MockPool::spawn(Script {
        submits: Submits::Ignore,
        ..Default::default()
    })
    .await;

    let client = Client::new(ClientConfig {
        request_timeout: Duration::from_millis(200),
        ..ClientConfig::new(pool.address(), "worker", "x")
    });

    client.connect().await.unwrap();

    let (job_id, extranonce2, ntime, nonce) = share();

    pretty_assert_eq!(
        client.submit(job_id, extranonce2, ntime, nonce).await.unwrap(),
        SubmitOutcome::TimedOut
    );
    assert!(client.is_connected());
}

#[tokio::test]
async fn reconnect_request_closes_connection() {
    let pool = MockPool::spawn(Script::default()).await;
    let client = client(&pool);
    let mut events = client.events();
    client.connect().await.unwrap();

    pool.send(json!({"id": null, "method": "client.reconnect", "params": []}));

    timeout(WAIT, async {
        loop {
            if let Event::Reconnect = next_event(&mut events).await {
                break;
            }
        }
    })
    .await
    .unwrap();

    assert!(matches!(next_event(&mut events).await, Event::Disconnected));

    timeout(WAIT, client.closed()).await.unwrap();
    assert!(!client.is_connected());
}

#[tokio::test]
async fn pool_closing_socket_emits_disconnected() {
    let pool = MockPool::spawn(Script {
        job: None,
        difficulty: None,
        ..Default::default()
    })
    .await;

    let client = client(&pool);
    let mut events = client.events();
    client.connect().await.unwrap();

    pool.close();

    assert!(matches!(next_event(&mut events).await, Event::Disconnected));
    assert!(!client.is_connected());

    let (job_id, extranonce2, ntime, nonce) = share();
    assert!(matches!(
        client.submit(job_id, extranonce2, ntime, nonce).await,
        Err(ClientError::NotConnected)
    ));
}

#[tokio::test]
async fn disconnect_is_idempotent() {
    let pool = MockPool::spawn(Script::default()).await;
    let client = client(&pool);
    client.connect().await.unwrap();

    client.disconnect().await;
    client.disconnect().await;

    assert!(!client.is_connected());
}

#[tokio::test]
async fn unknown_and_malformed_messages_are_skipped() {
    let pool = MockPool::spawn(Script {
        job: None,
        difficulty: None,
        ..Default::default()
    })
    .await;

    let client = client(&pool);
    let mut events = client.events();
    client.connect().await.unwrap();

    pool.send(json!({"id": null, "method": "mining.set_extranonce", "params": ["00", 4]}));
    pool.send(json!({"id": null, "method": "client.show_message", "params": ["hello"]}));
    pool.send_raw("this is not json");
    pool.send(mock_pool::set_difficulty(8.0));

    match next_event(&mut events).await {
        Event::SetDifficulty(difficulty) => pretty_assert_eq!(difficulty, Difficulty::from(8.0)),
        event => panic!("expected difficulty, got {event:?}"),
    }

    assert!(client.is_connected());
}

#[tokio::test]
async fn client_reconnects_after_disconnect() {
    let pool = MockPool::spawn(Script::default()).await;
    let client = client(&pool);

    client.connect().await.unwrap();
    client.disconnect().await;
    client.connect().await.unwrap();

    assert!(client.is_connected());
    pretty_assert_eq!(pool.connections(), 2);
}
