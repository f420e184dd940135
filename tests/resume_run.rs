//! End-to-end runs of the job against a mock X API, a manual clock and a
//! real checkpoint file.

use chrono::{DateTime, TimeZone, Utc};
use serde_json::json;
use std::time::Duration;
use wiremock::matchers::{method, path, query_param, query_param_is_missing};
use wiremock::{Mock, MockServer, ResponseTemplate};
use xunblock::{
    ApiBaseUrl, CheckpointStore, Credentials, JobOptions, JobOutcome, ManualClock, PageSize,
    Secret, Timekeeper, UnblockJob, UserId, XHttpClient,
};

fn t0() -> DateTime<Utc> {
    Utc.timestamp_opt(1_700_000_000, 0).unwrap()
}

fn client(server: &MockServer) -> XHttpClient {
    let credentials = Credentials {
        consumer_key: Secret::new("API_KEY", "ck").unwrap(),
        consumer_secret: Secret::new("API_KEY_SECRET", "cs").unwrap(),
        access_token: Secret::new("ACCESS_TOKEN", "at").unwrap(),
        access_token_secret: Secret::new("ACCESS_TOKEN_SECRET", "ats").unwrap(),
    };
    let base = ApiBaseUrl::parse(&format!("{}/2", server.uri())).unwrap();
    XHttpClient::new(credentials, base).unwrap()
}

fn options() -> JobOptions {
    JobOptions {
        page_size: PageSize::new(1).unwrap(),
        request_interval: Duration::from_secs(900),
        retry_wait: Duration::from_secs(900),
        max_unblocks: None,
        dry_run: false,
    }
}

async fn mount_me(server: &MockServer) {
    Mock::given(method("GET"))
        .and(path("/2/users/me"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": {"id": "999", "name": "Me", "username": "me"}
        })))
        .mount(server)
        .await;
}

#[tokio::test]
async fn drains_list_through_rate_limit_then_rerun_is_idempotent() {
    let server = MockServer::start().await;
    mount_me(&server).await;

    // First page, then (after both unblocks) the confirming empty fetch.
    Mock::given(method("GET"))
        .and(path("/2/users/999/blocking"))
        .and(query_param_is_missing("pagination_token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": [{"id": "11", "name": "Eleven", "username": "eleven"}],
            "meta": {"result_count": 1, "next_token": "tok-2"}
        })))
        .up_to_n_times(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/2/users/999/blocking"))
        .and(query_param("pagination_token", "tok-2"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": [{"id": "12", "name": "Twelve", "username": "twelve"}],
            "meta": {"result_count": 1}
        })))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/2/users/999/blocking"))
        .and(query_param_is_missing("pagination_token"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({"meta": {"result_count": 0}})),
        )
        .mount(&server)
        .await;

    // The first unblock of 11 hits the rate limit; the window resets at t0 + 1000s.
    Mock::given(method("DELETE"))
        .and(path("/2/users/999/blocking/11"))
        .respond_with(
            ResponseTemplate::new(429)
                .insert_header("x-rate-limit-reset", "1700001000")
                .set_body_json(json!({"title": "Too Many Requests", "status": 429})),
        )
        .up_to_n_times(1)
        .mount(&server)
        .await;
    for target in ["11", "12"] {
        Mock::given(method("DELETE"))
            .and(path(format!("/2/users/999/blocking/{}", target)))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(json!({"data": {"blocking": false}})),
            )
            .expect(1)
            .mount(&server)
            .await;
    }

    let dir = tempfile::tempdir().unwrap();
    let store = CheckpointStore::new(dir.path().join("unblock_progress.json"));
    let clock = ManualClock::starting_at(t0());
    let x = client(&server);

    let report = UnblockJob::new(&x, &clock, store.clone(), options())
        .run()
        .await
        .unwrap();

    assert_eq!(report.unblocked, 2);
    assert_eq!(report.retries, 1);
    assert_eq!(report.pages_fetched, 3);
    assert_eq!(report.outcome, JobOutcome::Drained);
    // window wait, then reset wait: 1000 - 900 + 1
    assert_eq!(
        clock.sleeps()[..2],
        [Duration::from_secs(900), Duration::from_secs(101)]
    );

    let saved = store.try_load().await.unwrap().unwrap();
    assert_eq!(saved.processed_count(), 2);
    assert!(saved.is_processed(&UserId::parse("11").unwrap()));
    assert!(saved.is_processed(&UserId::parse("12").unwrap()));
    assert!(saved.cursor().is_none());

    // The server still lists 11 on a second run: it must be left alone.
    let lagging = MockServer::start().await;
    mount_me(&lagging).await;
    Mock::given(method("GET"))
        .and(path("/2/users/999/blocking"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": [{"id": "11", "name": "Eleven", "username": "eleven"}],
            "meta": {"result_count": 1}
        })))
        .expect(1)
        .mount(&lagging)
        .await;
    Mock::given(method("DELETE"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&lagging)
        .await;

    let rerun_clock = ManualClock::starting_at(clock.now());
    let rerun = UnblockJob::new(&client(&lagging), &rerun_clock, store.clone(), options())
        .run()
        .await
        .unwrap();

    assert_eq!(rerun.unblocked, 0);
    assert_eq!(rerun.skipped, 1);
    assert_eq!(store.try_load().await.unwrap().unwrap().processed_count(), 2);
}

#[tokio::test]
async fn corrupt_checkpoint_is_set_aside() {
    let server = MockServer::start().await;
    mount_me(&server).await;
    Mock::given(method("GET"))
        .and(path("/2/users/999/blocking"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({"meta": {"result_count": 0}})),
        )
        .expect(1)
        .mount(&server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let file = dir.path().join("unblock_progress.json");
    std::fs::write(&file, "{\"processedUsers\": {").unwrap();

    let clock = ManualClock::starting_at(t0());
    let report = UnblockJob::new(&client(&server), &clock, CheckpointStore::new(&file), options())
        .run()
        .await
        .unwrap();

    assert_eq!(report.outcome, JobOutcome::Drained);
    let aside = dir.path().join("unblock_progress.json.corrupt");
    assert_eq!(std::fs::read_to_string(aside).unwrap(), "{\"processedUsers\": {");
}

#[tokio::test]
async fn badly_encoded_checkpoint_is_set_aside() {
    let server = MockServer::start().await;
    mount_me(&server).await;
    Mock::given(method("GET"))
        .and(path("/2/users/999/blocking"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({"meta": {"result_count": 0}})),
        )
        .expect(1)
        .mount(&server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let file = dir.path().join("unblock_progress.json");
    let original = b"{\"processedUsers\": {\"1\": true}, \"paginationToken\": \"\xff\"}".to_vec();
    std::fs::write(&file, &original).unwrap();

    let clock = ManualClock::starting_at(t0());
    let store = CheckpointStore::new(&file);
    let report = UnblockJob::new(&client(&server), &clock, store.clone(), options())
        .run()
        .await
        .unwrap();

    assert_eq!(report.outcome, JobOutcome::Drained);
    let aside = dir.path().join("unblock_progress.json.corrupt");
    assert_eq!(std::fs::read(aside).unwrap(), original);
    assert!(store.try_load().await.unwrap().is_none());
}
