//! Session controller behaviour against a scripted consultation client.
//!
//! Every test runs on a paused clock, so the 30 second timeout and the reveal
//! pacing elapse instantly.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use lexa_consult::reveal::{RevealPacing, token_boundaries};
use lexa_consult::{
    ConsultClient, ConsultError, ConsultRequest, Phase, SessionConfig, SessionController,
    SessionSnapshot,
};
use lexa_core::models::failure::FailureKind;
use lexa_core::models::message::Role;
use lexa_core::validation::{QueryLimits, ValidationError};
use lexa_storage::memory::MemoryStore;
use lexa_storage::session::session_id;

#[derive(Clone)]
enum Script {
    Reply(&'static str),
    ReplyAfter(Duration, &'static str),
    Fail(ConsultError),
    Hang,
}

type RequestLog = Arc<Mutex<Vec<ConsultRequest>>>;

struct ScriptedClient {
    scripts: HashMap<String, Script>,
    requests: RequestLog,
}

#[async_trait]
impl ConsultClient for ScriptedClient {
    async fn consult(&self, request: &ConsultRequest) -> Result<String, ConsultError> {
        self.requests.lock().unwrap().push(request.clone());
        let script = self
            .scripts
            .get(&request.query)
            .cloned()
            .unwrap_or(Script::Reply("Noted."));
        match script {
            Script::Reply(text) => Ok(text.to_string()),
            Script::ReplyAfter(delay, text) => {
                tokio::time::sleep(delay).await;
                Ok(text.to_string())
            }
            Script::Fail(err) => Err(err),
            Script::Hang => std::future::pending().await,
        }
    }
}

const LONG_REPLY: &str = "You have the right to quiet enjoyment of the premises, \
    to timely repairs, and to written notice before your landlord enters.";

fn test_config() -> SessionConfig {
    SessionConfig {
        pacing: RevealPacing {
            batch_tokens: 1,
            delay: Duration::from_millis(10),
        },
        ..SessionConfig::default()
    }
}

fn scripted(
    scripts: &[(&str, Script)],
    config: SessionConfig,
) -> (SessionController<ScriptedClient>, RequestLog) {
    let requests: RequestLog = Arc::default();
    let client = ScriptedClient {
        scripts: scripts
            .iter()
            .map(|(query, script)| (query.to_string(), script.clone()))
            .collect(),
        requests: Arc::clone(&requests),
    };
    (
        SessionController::new(client, "user_test", config),
        requests,
    )
}

fn contents(snapshot: &SessionSnapshot) -> Vec<(Role, String)> {
    snapshot
        .transcript
        .iter()
        .map(|m| (m.role, m.full_content().to_string()))
        .collect()
}

#[tokio::test(start_paused = true)]
async fn reply_is_appended_and_fully_revealed() {
    let (session, requests) = scripted(
        &[("What are my tenant rights?", Script::Reply("You have the right to..."))],
        test_config(),
    );

    session.submit("What are my tenant rights?").unwrap();

    let pending = session.snapshot();
    assert_eq!(pending.phase, Phase::Requesting);
    assert_eq!(
        contents(&pending),
        vec![(Role::User, "What are my tenant rights?".to_string())]
    );

    let done = session.wait_idle().await;
    assert_eq!(done.transcript.len(), 2);
    let reply = &done.transcript[1];
    assert_eq!(reply.role, Role::Assistant);
    assert_eq!(reply.full_content(), "You have the right to...");
    assert_eq!(reply.displayed_content(), reply.full_content());
    assert!(!reply.is_revealing());
    assert_eq!(done.error, None);

    let sent = requests.lock().unwrap().clone();
    assert_eq!(
        sent,
        vec![ConsultRequest {
            query: "What are my tenant rights?".into(),
            user_id: "user_test".into(),
        }]
    );
}

#[tokio::test(start_paused = true)]
async fn sequential_turns_keep_call_order() {
    let (session, _) = scripted(
        &[
            ("first", Script::Reply("one")),
            ("second", Script::Fail(ConsultError::Network("refused".into()))),
            ("third", Script::Reply("three")),
        ],
        test_config(),
    );

    for query in ["first", "second", "third"] {
        session.submit(query).unwrap();
        session.wait_idle().await;
    }

    let snapshot = session.snapshot();
    let roles: Vec<Role> = snapshot.transcript.iter().map(|m| m.role).collect();
    assert_eq!(
        roles,
        vec![
            Role::User,
            Role::Assistant,
            Role::User,
            Role::Assistant,
            Role::User,
            Role::Assistant,
        ]
    );
    let users: Vec<&str> = snapshot
        .transcript
        .iter()
        .filter(|m| m.role == Role::User)
        .map(|m| m.full_content())
        .collect();
    assert_eq!(users, vec!["first", "second", "third"]);
    assert_eq!(
        snapshot.transcript[3].full_content(),
        FailureKind::NetworkFailure.user_message()
    );
}

#[tokio::test(start_paused = true)]
async fn superseded_request_outcome_is_discarded() {
    let (session, requests) = scripted(
        &[
            ("a", Script::ReplyAfter(Duration::from_secs(5), "reply a")),
            ("b", Script::Reply("reply b")),
        ],
        test_config(),
    );

    session.submit("a").unwrap();
    tokio::time::sleep(Duration::from_secs(1)).await;
    session.submit("b").unwrap();
    session.wait_idle().await;

    // Well past the point where "a" would have answered.
    tokio::time::sleep(Duration::from_secs(10)).await;

    let snapshot = session.snapshot();
    assert_eq!(
        contents(&snapshot),
        vec![
            (Role::User, "b".to_string()),
            (Role::Assistant, "reply b".to_string()),
        ]
    );
    assert_eq!(requests.lock().unwrap().len(), 2);
}

#[tokio::test(start_paused = true)]
async fn rapid_resubmit_over_hung_request_keeps_only_latest_pair() {
    let (session, _) = scripted(
        &[("a", Script::Hang), ("b", Script::Reply("reply b"))],
        test_config(),
    );

    session.submit("a").unwrap();
    session.submit("b").unwrap();
    let snapshot = session.wait_idle().await;

    assert_eq!(
        contents(&snapshot),
        vec![
            (Role::User, "b".to_string()),
            (Role::Assistant, "reply b".to_string()),
        ]
    );
}

#[tokio::test(start_paused = true)]
async fn hung_request_times_out_and_session_accepts_new_submit() {
    let (session, requests) = scripted(&[("slow", Script::Hang)], test_config());

    let started = tokio::time::Instant::now();
    session.submit("slow").unwrap();
    let snapshot = session.wait_idle().await;

    assert!(started.elapsed() >= Duration::from_secs(30));
    let expected = FailureKind::Timeout { seconds: 30 };
    assert_eq!(snapshot.error, Some(expected.clone()));
    assert_eq!(snapshot.transcript.len(), 2);
    assert_eq!(snapshot.transcript[1].role, Role::Assistant);
    assert_eq!(snapshot.transcript[1].full_content(), expected.user_message());

    session.submit("follow up").unwrap();
    assert_eq!(session.snapshot().phase, Phase::Requesting);
    assert_eq!(session.snapshot().error, None);
    let snapshot = session.wait_idle().await;
    assert_eq!(snapshot.transcript.len(), 4);
    assert_eq!(requests.lock().unwrap().len(), 2);
}

#[tokio::test(start_paused = true)]
async fn failures_become_distinct_assistant_replies() {
    let (session, _) = scripted(
        &[
            ("net", Script::Fail(ConsultError::Network("dns".into()))),
            (
                "server",
                Script::Fail(ConsultError::Server {
                    status: 502,
                    body: r#"{"detail":"upstream down"}"#.into(),
                }),
            ),
            ("garbled", Script::Fail(ConsultError::Malformed("eof".into()))),
        ],
        test_config(),
    );

    session.submit("net").unwrap();
    let net = session.wait_idle().await;
    assert_eq!(net.error, Some(FailureKind::NetworkFailure));

    session.submit("server").unwrap();
    let server = session.wait_idle().await;
    let text = server.transcript[3].full_content();
    assert!(text.contains("502"));
    assert!(text.contains("upstream down"));

    session.submit("garbled").unwrap();
    let garbled = session.wait_idle().await;
    assert_eq!(garbled.error, Some(FailureKind::MalformedResponse));
    assert_eq!(
        garbled.transcript[5].full_content(),
        FailureKind::MalformedResponse.user_message()
    );
}

#[tokio::test(start_paused = true)]
async fn client_side_cancellation_is_silent() {
    let (session, _) = scripted(&[("q", Script::Fail(ConsultError::Cancelled))], test_config());

    session.submit("q").unwrap();
    let snapshot = session.wait_idle().await;

    assert!(snapshot.transcript.is_empty());
    assert_eq!(snapshot.error, None);
    assert_eq!(snapshot.phase, Phase::Idle);
}

#[tokio::test(start_paused = true)]
async fn reveal_grows_monotonically_on_token_boundaries() {
    let (session, _) = scripted(&[("rights", Script::Reply(LONG_REPLY))], test_config());
    let bounds = token_boundaries(LONG_REPLY);
    let mut updates = session.subscribe();

    session.submit("rights").unwrap();

    let mut observed: Vec<(String, bool)> = Vec::new();
    loop {
        updates.changed().await.unwrap();
        let snapshot = updates.borrow_and_update().clone();
        if let Some(reply) = snapshot.transcript.get(1) {
            observed.push((reply.displayed_content().to_string(), reply.is_revealing()));
        }
        if snapshot.phase == Phase::Idle && snapshot.transcript.len() == 2 {
            break;
        }
    }

    let mut last_len = 0;
    for (displayed, _) in &observed {
        assert!(displayed.len() >= last_len);
        assert!(LONG_REPLY.starts_with(displayed.as_str()));
        assert!(displayed.is_empty() || bounds.contains(&displayed.len()));
        last_len = displayed.len();
    }

    let distinct: std::collections::BTreeSet<usize> =
        observed.iter().map(|(d, _)| d.len()).collect();
    assert!(distinct.len() > 3, "reveal should pass through several prefixes");

    let (final_text, final_revealing) = observed.last().unwrap();
    assert_eq!(final_text, LONG_REPLY);
    assert!(!final_revealing);

    let finishes = observed
        .windows(2)
        .filter(|pair| pair[0].1 && !pair[1].1)
        .count();
    assert_eq!(finishes, 1);
}

#[tokio::test(start_paused = true)]
async fn reset_twice_is_the_same_as_once() {
    let (session, _) = scripted(&[("a", Script::Hang)], test_config());

    session.submit("a").unwrap();
    session.reset();
    let once = session.snapshot();
    session.reset();
    let twice = session.snapshot();

    assert_eq!(once, twice);
    assert!(twice.transcript.is_empty());
    assert_eq!(twice.phase, Phase::Idle);
    assert_eq!(twice.error, None);

    // The cancelled request's timeout must never land.
    tokio::time::sleep(Duration::from_secs(60)).await;
    assert_eq!(session.snapshot(), twice);
}

#[tokio::test(start_paused = true)]
async fn reset_mid_reveal_stops_the_reveal() {
    let config = SessionConfig {
        pacing: RevealPacing {
            batch_tokens: 1,
            delay: Duration::from_millis(200),
        },
        ..SessionConfig::default()
    };
    let (session, _) = scripted(&[("a", Script::Reply(LONG_REPLY))], config);
    let mut updates = session.subscribe();

    session.submit("a").unwrap();
    updates
        .wait_for(|s| s.phase == Phase::Revealing)
        .await
        .unwrap();
    session.reset();

    tokio::time::sleep(Duration::from_secs(30)).await;
    let snapshot = session.snapshot();
    assert!(snapshot.transcript.is_empty());
    assert_eq!(snapshot.phase, Phase::Idle);
}

#[tokio::test(start_paused = true)]
async fn resubmit_mid_reveal_snaps_previous_reply() {
    let (session, _) = scripted(
        &[("a", Script::Reply(LONG_REPLY)), ("b", Script::Reply("reply b"))],
        test_config(),
    );
    let mut updates = session.subscribe();

    session.submit("a").unwrap();
    updates
        .wait_for(|s| s.phase == Phase::Revealing)
        .await
        .unwrap();
    session.submit("b").unwrap();

    let snapshot = session.snapshot();
    assert_eq!(snapshot.transcript.len(), 3);
    let previous = &snapshot.transcript[1];
    assert_eq!(previous.displayed_content(), LONG_REPLY);
    assert!(!previous.is_revealing());

    let done = session.wait_idle().await;
    assert_eq!(
        contents(&done),
        vec![
            (Role::User, "a".to_string()),
            (Role::Assistant, LONG_REPLY.to_string()),
            (Role::User, "b".to_string()),
            (Role::Assistant, "reply b".to_string()),
        ]
    );
    assert!(done.transcript.iter().all(|m| !m.is_revealing()));
}

#[tokio::test(start_paused = true)]
async fn blank_input_changes_nothing() {
    let (session, requests) = scripted(&[], test_config());
    let before = session.snapshot();

    assert_eq!(session.submit(""), Err(ValidationError::Empty));
    assert_eq!(session.submit("   "), Err(ValidationError::Empty));
    tokio::time::sleep(Duration::from_secs(1)).await;

    assert_eq!(session.snapshot(), before);
    assert!(requests.lock().unwrap().is_empty());
}

#[tokio::test(start_paused = true)]
async fn oversized_input_records_validation_error() {
    let config = SessionConfig {
        limits: QueryLimits { max_chars: 10 },
        ..test_config()
    };
    let (session, requests) = scripted(&[], config);

    let result = session.submit(&"x".repeat(11));
    assert_eq!(result, Err(ValidationError::TooLong { len: 11, max: 10 }));
    tokio::time::sleep(Duration::from_secs(1)).await;

    let snapshot = session.snapshot();
    assert!(snapshot.transcript.is_empty());
    assert!(matches!(snapshot.error, Some(FailureKind::Validation { .. })));
    assert!(requests.lock().unwrap().is_empty());

    session.reset();
    assert_eq!(session.snapshot().error, None);
}

#[tokio::test(start_paused = true)]
async fn session_identifier_comes_from_the_store() {
    let store = MemoryStore::new();
    let expected = session_id(&store).unwrap();
    let requests: RequestLog = Arc::default();
    let client = ScriptedClient {
        scripts: HashMap::new(),
        requests: Arc::clone(&requests),
    };

    let session = SessionController::with_store(client, &store, test_config()).unwrap();
    assert_eq!(session.user_id(), expected);

    session.submit("hello").unwrap();
    session.wait_idle().await;
    session.reset();
    assert_eq!(session.user_id(), expected);
    assert_eq!(requests.lock().unwrap()[0].user_id, expected);
}

#[tokio::test(start_paused = true)]
async fn sub_second_timeout_is_reported_in_whole_seconds() {
    let config = SessionConfig {
        request_timeout: Duration::from_millis(500),
        ..test_config()
    };
    let (session, _) = scripted(&[("slow", Script::Hang)], config);

    session.submit("slow").unwrap();
    let snapshot = session.wait_idle().await;

    assert_eq!(snapshot.error, Some(FailureKind::Timeout { seconds: 1 }));
    let text = snapshot.transcript[1].full_content();
    assert!(text.contains("within 1 second."), "{text}");
    assert!(!text.contains("0 seconds"));
}

#[tokio::test(start_paused = true)]
async fn rejected_query_during_flight_outlives_the_reply() {
    let config = SessionConfig {
        limits: QueryLimits { max_chars: 10 },
        ..test_config()
    };
    let (session, requests) = scripted(
        &[("a", Script::ReplyAfter(Duration::from_secs(5), "reply a"))],
        config,
    );

    session.submit("a").unwrap();
    tokio::time::sleep(Duration::from_secs(1)).await;
    assert!(session.submit(&"x".repeat(11)).is_err());

    let snapshot = session.wait_idle().await;
    assert_eq!(
        contents(&snapshot),
        vec![
            (Role::User, "a".to_string()),
            (Role::Assistant, "reply a".to_string()),
        ]
    );
    assert!(matches!(snapshot.error, Some(FailureKind::Validation { .. })));
    assert_eq!(requests.lock().unwrap().len(), 1);
}
