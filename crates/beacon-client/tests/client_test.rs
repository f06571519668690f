use beacon_client::{ClientError, Instance, LeaseInfo, RegistryClient, Status};
use serde_json::json;
use wiremock::matchers::{body_json, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

const APP: &str = "test-app";
const INSTANCE: &str = "test-instance";
const INSTANCE_PATH: &str = "/eureka/v2/apps/test-app/test-instance";
const STATUS_PATH: &str = "/eureka/v2/apps/test-app/test-instance/status";

fn client_for(server: &MockServer) -> RegistryClient {
    RegistryClient::new(server.uri()).expect("mock server uri is a valid base url")
}

fn test_instance() -> Instance {
    Instance::new(APP, INSTANCE)
        .with_host("localhost", "127.0.0.1")
        .with_vip_address(APP)
        .with_port(8080)
}

async fn respond_any(server: &MockServer, code: u16) {
    Mock::given(wiremock::matchers::any())
        .respond_with(ResponseTemplate::new(code))
        .mount(server)
        .await;
}

#[tokio::test]
async fn register_posts_instance_envelope() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/eureka/v2/apps/test-app"))
        .and(header("content-type", "application/json"))
        .and(body_json(json!({
            "instance": {
                "instanceId": "test-instance",
                "hostName": "localhost",
                "app": "test-app",
                "ipAddr": "127.0.0.1",
                "vipAddress": "test-app",
                "status": "UP",
                "port": { "@enabled": true, "$": 8080 }
            }
        })))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&server)
        .await;

    client_for(&server).register(&test_instance()).await.unwrap();
}

#[tokio::test]
async fn register_body_decodes_to_same_instance() {
    let server = MockServer::start().await;
    respond_any(&server, 204).await;

    let mut instance = test_instance().with_lease(LeaseInfo::standard());
    instance.add_metadata("zone", "a");
    client_for(&server).register(&instance).await.unwrap();

    let requests = server.received_requests().await.unwrap();
    assert_eq!(requests.len(), 1);
    let body: serde_json::Value = serde_json::from_slice(&requests[0].body).unwrap();
    let decoded: Instance = serde_json::from_value(body["instance"].clone()).unwrap();
    assert_eq!(decoded, instance);
}

#[tokio::test]
async fn register_rejects_anything_but_204() {
    for code in [200, 201, 400, 500] {
        let server = MockServer::start().await;
        respond_any(&server, code).await;

        let err = client_for(&server)
            .register(&test_instance())
            .await
            .unwrap_err();
        assert!(
            matches!(err, ClientError::UnexpectedStatus(c) if c == code),
            "code {code} gave {err:?}"
        );
    }
}

#[tokio::test]
async fn deregister_sends_bare_delete() {
    let server = MockServer::start().await;
    Mock::given(method("DELETE"))
        .and(path(INSTANCE_PATH))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;

    client_for(&server).deregister(APP, INSTANCE).await.unwrap();

    let requests = server.received_requests().await.unwrap();
    assert!(requests[0].body.is_empty());
    assert!(requests[0].headers.get("content-type").is_none());
}

#[tokio::test]
async fn deregister_rejects_non_200() {
    let server = MockServer::start().await;
    respond_any(&server, 404).await;

    let err = client_for(&server).deregister(APP, INSTANCE).await.unwrap_err();
    assert!(matches!(err, ClientError::UnexpectedStatus(404)));
}

#[tokio::test]
async fn heartbeat_puts_to_instance() {
    let server = MockServer::start().await;
    Mock::given(method("PUT"))
        .and(path(INSTANCE_PATH))
        .and(header("content-type", "application/json"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;

    client_for(&server).heartbeat(APP, INSTANCE).await.unwrap();
}

#[tokio::test]
async fn heartbeat_not_found_is_distinct_from_other_failures() {
    let expired = MockServer::start().await;
    respond_any(&expired, 404).await;
    let err = client_for(&expired).heartbeat(APP, INSTANCE).await.unwrap_err();
    assert!(matches!(err, ClientError::InstanceNotFound));
    assert!(err.is_instance_not_found());

    let unavailable = MockServer::start().await;
    respond_any(&unavailable, 503).await;
    let err = client_for(&unavailable)
        .heartbeat(APP, INSTANCE)
        .await
        .unwrap_err();
    assert!(matches!(err, ClientError::UnexpectedStatus(503)));
    assert!(!err.is_instance_not_found());
}

#[tokio::test]
async fn override_status_puts_value_query() {
    let server = MockServer::start().await;
    Mock::given(method("PUT"))
        .and(path(STATUS_PATH))
        .and(query_param("value", "OUT_OF_SERVICE"))
        .and(header("content-type", "application/json"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;

    client_for(&server)
        .override_status(APP, INSTANCE, Status::OutOfService)
        .await
        .unwrap();
}

#[tokio::test]
async fn override_status_fails_only_on_500() {
    let failing = MockServer::start().await;
    respond_any(&failing, 500).await;
    let err = client_for(&failing)
        .override_status(APP, INSTANCE, Status::Down)
        .await
        .unwrap_err();
    assert!(matches!(err, ClientError::StatusUpdateFailed));

    for code in [404, 418] {
        let server = MockServer::start().await;
        respond_any(&server, code).await;
        client_for(&server)
            .override_status(APP, INSTANCE, Status::Down)
            .await
            .unwrap_or_else(|err| panic!("code {code} should be accepted, got {err:?}"));
    }
}

#[tokio::test]
async fn remove_status_override_deletes_with_up() {
    let server = MockServer::start().await;
    Mock::given(method("DELETE"))
        .and(path(STATUS_PATH))
        .and(query_param("value", "UP"))
        .and(header("content-type", "application/json"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;

    client_for(&server)
        .remove_status_override(APP, INSTANCE)
        .await
        .unwrap();
}

#[tokio::test]
async fn remove_status_override_fails_only_on_500() {
    let failing = MockServer::start().await;
    respond_any(&failing, 500).await;
    let err = client_for(&failing)
        .remove_status_override(APP, INSTANCE)
        .await
        .unwrap_err();
    assert!(matches!(err, ClientError::StatusUpdateFailed));

    let teapot = MockServer::start().await;
    respond_any(&teapot, 418).await;
    client_for(&teapot)
        .remove_status_override(APP, INSTANCE)
        .await
        .unwrap();
}

#[tokio::test]
async fn out_of_service_shortcuts() {
    let server = MockServer::start().await;
    Mock::given(method("PUT"))
        .and(path(STATUS_PATH))
        .and(query_param("value", "OUT_OF_SERVICE"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("DELETE"))
        .and(path(STATUS_PATH))
        .and(query_param("value", "UP"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;

    let client = client_for(&server);
    client.out_of_service(APP, INSTANCE).await.unwrap();
    client.back_in_service(APP, INSTANCE).await.unwrap();
}

#[tokio::test]
async fn error_responses_with_large_bodies_are_released() {
    let big_body = vec![b'x'; 1024 * 1024];
    let server = MockServer::start().await;
    Mock::given(method("PUT"))
        .respond_with(ResponseTemplate::new(500).set_body_bytes(big_body.clone()))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(503).set_body_bytes(big_body))
        .mount(&server)
        .await;

    let client = client_for(&server);
    let instance = test_instance();
    for _ in 0..20 {
        let err = client
            .override_status(APP, INSTANCE, Status::OutOfService)
            .await
            .unwrap_err();
        assert!(matches!(err, ClientError::StatusUpdateFailed));

        let err = client.register(&instance).await.unwrap_err();
        assert!(matches!(err, ClientError::UnexpectedStatus(503)));
    }

    assert_eq!(server.received_requests().await.unwrap().len(), 40);
}

#[tokio::test]
async fn unreachable_registry_is_transport_error() {
    let client = RegistryClient::new("http://127.0.0.1:1").unwrap();
    let err = client.heartbeat(APP, INSTANCE).await.unwrap_err();
    assert!(matches!(err, ClientError::Transport(_)));
    assert_eq!(err.status_code(), None);
}

#[tokio::test]
async fn full_lifecycle() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/eureka/v2/apps/orders"))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("PUT"))
        .and(path("/eureka/v2/apps/orders/i-1"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("PUT"))
        .and(path("/eureka/v2/apps/orders/i-1/status"))
        .and(query_param("value", "OUT_OF_SERVICE"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("DELETE"))
        .and(path("/eureka/v2/apps/orders/i-1/status"))
        .and(query_param("value", "UP"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("DELETE"))
        .and(path("/eureka/v2/apps/orders/i-1"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;

    let client = client_for(&server);
    let instance = Instance::new("orders", "i-1").with_status(Status::Starting);

    client.register(&instance).await.unwrap();
    client.heartbeat("orders", "i-1").await.unwrap();
    client
        .override_status("orders", "i-1", Status::OutOfService)
        .await
        .unwrap();
    client.remove_status_override("orders", "i-1").await.unwrap();
    client.deregister("orders", "i-1").await.unwrap();

    let requests = server.received_requests().await.unwrap();
    let seen: Vec<(String, String, Option<String>)> = requests
        .iter()
        .map(|r| {
            (
                r.method.to_string(),
                r.url.path().to_string(),
                r.url.query().map(str::to_string),
            )
        })
        .collect();
    assert_eq!(
        seen,
        vec![
            ("POST".into(), "/eureka/v2/apps/orders".into(), None),
            ("PUT".into(), "/eureka/v2/apps/orders/i-1".into(), None),
            (
                "PUT".into(),
                "/eureka/v2/apps/orders/i-1/status".into(),
                Some("value=OUT_OF_SERVICE".into())
            ),
            (
                "DELETE".into(),
                "/eureka/v2/apps/orders/i-1/status".into(),
                Some("value=UP".into())
            ),
            ("DELETE".into(), "/eureka/v2/apps/orders/i-1".into(), None),
        ]
    );

    let registered: serde_json::Value = serde_json::from_slice(&requests[0].body).unwrap();
    assert_eq!(registered["instance"]["status"], "STARTING");
}
