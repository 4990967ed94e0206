//! End-to-end flows between daemons on loopback sharing one in-process LAN

use std::sync::Arc;
use std::time::Duration;

use lan_teams::api::create_router;
use lan_teams::domain::identity::Node;
use lan_teams::infrastructure::discovery::{InMemoryDiscovery, InMemoryLan};
use lan_teams::infrastructure::identity::InMemoryIdentityRepository;
use lan_teams::{create_app_state_with, AppConfig};
use serde_json::{json, Value};
use tokio::net::TcpListener;

struct Daemon {
    base: String,
    endpoint: String,
    http: reqwest::Client,
}

impl Daemon {
    async fn start(lan: &InMemoryLan, name: Option<&str>) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let endpoint = listener.local_addr().unwrap().to_string();

        let mut config = AppConfig::default();
        config.team.connect_timeout_secs = 1;
        config.team.request_timeout_secs = 2;
        config.sync.heartbeat_interval_secs = 1;
        config.sync.reconnect_min_secs = 1;
        config.sync.reconnect_max_secs = 1;

        let repository = match name {
            Some(name) => InMemoryIdentityRepository::with_node(Node::new(name).unwrap()),
            None => InMemoryIdentityRepository::new(),
        };
        let discovery = Arc::new(InMemoryDiscovery::new(lan.clone()));

        let state =
            create_app_state_with(&config, Arc::new(repository), discovery, endpoint.clone())
                .unwrap();
        let app = create_router(state);
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self {
            base: format!("http://{}", endpoint),
            endpoint,
            http: reqwest::Client::new(),
        }
    }

    async fn get(&self, path: &str) -> (u16, Value) {
        let response = self
            .http
            .get(format!("{}{}", self.base, path))
            .send()
            .await
            .unwrap();
        let status = response.status().as_u16();
        (status, response.json().await.unwrap())
    }

    async fn post(&self, path: &str, body: Value) -> (u16, Value) {
        let response = self
            .http
            .post(format!("{}{}", self.base, path))
            .json(&body)
            .send()
            .await
            .unwrap();
        let status = response.status().as_u16();
        (status, response.json().await.unwrap())
    }

    async fn put(&self, path: &str, body: Value) -> (u16, Value) {
        let response = self
            .http
            .put(format!("{}{}", self.base, path))
            .json(&body)
            .send()
            .await
            .unwrap();
        let status = response.status().as_u16();
        (status, response.json().await.unwrap())
    }

    async fn create_team(&self, name: &str) -> String {
        let (status, body) = self.post("/api/teams", json!({ "name": name })).await;
        assert_eq!(status, 200, "{}", body);
        assert_eq!(body["code"], 0);
        body["data"]["team_id"].as_str().unwrap().to_string()
    }

    async fn join(&self, leader: &Daemon, team_id: &str) -> (u16, Value) {
        self.post(
            "/api/teams/join",
            json!({ "endpoint": leader.endpoint, "team_id": team_id }),
        )
        .await
    }

    async fn member_names(&self, team_id: &str) -> Vec<String> {
        let (status, body) = self.get(&format!("/api/teams/{}/members", team_id)).await;
        assert_eq!(status, 200, "{}", body);
        body["data"]["members"]
            .as_array()
            .unwrap()
            .iter()
            .map(|m| m["display_name"].as_str().unwrap().to_string())
            .collect()
    }

    async fn joined_team_ids(&self) -> Vec<String> {
        let (_, body) = self.get("/api/teams").await;
        body["data"]["teams"]
            .as_array()
            .unwrap()
            .iter()
            .map(|t| t["team"]["team_id"].as_str().unwrap().to_string())
            .collect()
    }
}

async fn eventually<F, Fut>(mut check: F) -> bool
where
    F: FnMut() -> Fut,
    Fut: std::future::Future<Output = bool>,
{
    for _ in 0..100 {
        if check().await {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(50)).await;
    }
    false
}

#[tokio::test]
async fn test_two_members_join_and_one_leaves() {
    let lan = InMemoryLan::new();
    let alice = Daemon::start(&lan, Some("alice")).await;
    let bob = Daemon::start(&lan, Some("bob")).await;
    let carol = Daemon::start(&lan, Some("carol")).await;

    let team_id = alice.create_team("Platform").await;

    let (status, body) = bob.join(&alice, &team_id).await;
    assert_eq!(status, 200, "{}", body);
    assert_eq!(body["data"]["team"]["is_leader"], false);

    let (status, _) = carol.join(&alice, &team_id).await;
    assert_eq!(status, 200);

    assert_eq!(
        alice.member_names(&team_id).await,
        vec!["alice", "bob", "carol"]
    );
    assert_eq!(bob.member_names(&team_id).await.len(), 3);

    let (status, body) = carol
        .post("/api/teams/leave", json!({ "team_id": team_id }))
        .await;
    assert_eq!(status, 200);
    assert_eq!(body["code"], 0);

    assert_eq!(alice.member_names(&team_id).await, vec!["alice", "bob"]);
    assert!(carol.joined_team_ids().await.is_empty());

    // second leave is a no-op
    let (status, body) = carol
        .post("/api/teams/leave", json!({ "team_id": team_id }))
        .await;
    assert_eq!(status, 200);
    assert_eq!(body["code"], 0);
}

#[tokio::test]
async fn test_repeated_join_keeps_one_entry() {
    let lan = InMemoryLan::new();
    let alice = Daemon::start(&lan, Some("alice")).await;
    let bob = Daemon::start(&lan, Some("bob")).await;

    let team_id = alice.create_team("Platform").await;

    for _ in 0..3 {
        let (status, _) = bob.join(&alice, &team_id).await;
        assert_eq!(status, 200);
    }

    assert_eq!(alice.member_names(&team_id).await, vec!["alice", "bob"]);
    assert_eq!(bob.joined_team_ids().await, vec![team_id]);
}

#[tokio::test]
async fn test_join_without_team_id_asks_the_leader() {
    let lan = InMemoryLan::new();
    let alice = Daemon::start(&lan, Some("alice")).await;
    let bob = Daemon::start(&lan, Some("bob")).await;

    let team_id = alice.create_team("Platform").await;

    let (status, body) = bob
        .post("/api/teams/join", json!({ "endpoint": alice.endpoint }))
        .await;
    assert_eq!(status, 200, "{}", body);
    assert_eq!(body["data"]["team"]["team"]["team_id"], team_id.as_str());
}

#[tokio::test]
async fn test_dissolve_drops_connected_members() {
    let lan = InMemoryLan::new();
    let alice = Daemon::start(&lan, Some("alice")).await;
    let bob = Daemon::start(&lan, Some("bob")).await;

    let team_id = alice.create_team("Platform").await;
    let (status, _) = bob.join(&alice, &team_id).await;
    assert_eq!(status, 200);

    // wait for bob's push channel to come online at the leader
    let online = eventually(|| async {
        let (_, body) = alice.get(&format!("/team/{}/members", team_id)).await;
        body["data"]["members"]
            .as_array()
            .map(|members| members.iter().all(|m| m["is_online"] == true))
            .unwrap_or(false)
    })
    .await;
    assert!(online);

    let (status, body) = alice
        .post("/api/teams/dissolve", json!({ "team_id": team_id }))
        .await;
    assert_eq!(status, 200, "{}", body);

    let dropped = eventually(|| async { bob.joined_team_ids().await.is_empty() }).await;
    assert!(dropped);

    let (status, body) = bob.get(&format!("/api/teams/{}/members", team_id)).await;
    assert_eq!(status, 404);
    assert_eq!(body["code"], 600002);

    let (status, body) = bob.join(&alice, &team_id).await;
    assert_eq!(status, 422);
    assert_eq!(body["code"], 600005);
}

#[tokio::test]
async fn test_leader_cannot_leave_own_team() {
    let lan = InMemoryLan::new();
    let alice = Daemon::start(&lan, Some("alice")).await;
    let team_id = alice.create_team("Platform").await;

    let (status, body) = alice
        .post("/api/teams/leave", json!({ "team_id": team_id }))
        .await;
    assert_eq!(status, 400);
    assert_eq!(body["code"], 600001);
}

#[tokio::test]
async fn test_join_closed_port_is_a_connectivity_error() {
    let lan = InMemoryLan::new();
    let bob = Daemon::start(&lan, Some("bob")).await;

    let closed = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let endpoint = closed.local_addr().unwrap().to_string();
    drop(closed);

    let started = std::time::Instant::now();
    let (status, body) = bob
        .post(
            "/api/teams/join",
            json!({ "endpoint": endpoint, "team_id": "ABC123" }),
        )
        .await;

    assert!(started.elapsed() < Duration::from_secs(5));
    assert_eq!(status, 502);
    assert_eq!(body["code"], 600004);
    assert!(bob.joined_team_ids().await.is_empty());
}

#[tokio::test]
async fn test_unknown_team_is_relayed_from_leader() {
    let lan = InMemoryLan::new();
    let alice = Daemon::start(&lan, Some("alice")).await;
    let bob = Daemon::start(&lan, Some("bob")).await;

    let (status, body) = bob.join(&alice, "ZZZ999").await;
    assert_eq!(status, 422);
    assert_eq!(body["code"], 600005);
    assert!(body["message"].as_str().unwrap().contains("600002"));
}

#[tokio::test]
async fn test_discover_finds_advertised_team() {
    let lan = InMemoryLan::new();
    let alice = Daemon::start(&lan, Some("alice")).await;
    let bob = Daemon::start(&lan, Some("bob")).await;

    let (status, body) = bob
        .post("/api/teams/discover", json!({ "timeout_seconds": 1 }))
        .await;
    assert_eq!(status, 200);
    assert_eq!(body["code"], 0);
    assert!(body["data"]["teams"].as_array().unwrap().is_empty());

    let team_id = alice.create_team("Platform").await;

    let (_, body) = bob
        .post("/api/teams/discover", json!({ "timeout_seconds": 1 }))
        .await;
    let teams = body["data"]["teams"].as_array().unwrap();
    assert_eq!(teams.len(), 1);
    assert_eq!(teams[0]["team_id"], team_id.as_str());
    assert_eq!(teams[0]["leader_endpoint"], alice.endpoint.as_str());
    assert_eq!(teams[0]["member_count"], 1);
}

#[tokio::test]
async fn test_identity_required_before_creating_team() {
    let lan = InMemoryLan::new();
    let node = Daemon::start(&lan, None).await;

    let (status, body) = node.post("/api/teams", json!({ "name": "Platform" })).await;
    assert_eq!(status, 404);
    assert_eq!(body["code"], 600002);

    let (status, body) = node.post("/api/identity", json!({ "name": "dave" })).await;
    assert_eq!(status, 200);
    assert_eq!(body["data"]["name"], "dave");

    let (status, body) = node.get("/api/identity").await;
    assert_eq!(status, 200);
    assert_eq!(body["data"]["name"], "dave");

    node.create_team("Platform").await;
}

#[tokio::test]
async fn test_network_preference_moves_advertised_endpoint() {
    let lan = InMemoryLan::new();
    let alice = Daemon::start(&lan, Some("alice")).await;
    let bob = Daemon::start(&lan, Some("bob")).await;
    let port = alice.endpoint.rsplit_once(':').unwrap().1.to_string();

    let (status, body) = alice.get("/api/network/config").await;
    assert_eq!(status, 200);
    assert!(body["data"]["config"].is_null());
    assert_eq!(body["data"]["endpoint"], alice.endpoint.as_str());

    let (status, body) = alice
        .put("/api/network/config", json!({ "preferred_ip": "300.1.1.1" }))
        .await;
    assert_eq!(status, 400);
    assert_eq!(body["code"], 600001);

    let (status, body) = alice
        .put("/api/network/config", json!({ "preferred_ip": "127.0.0.1" }))
        .await;
    assert_eq!(status, 200, "{}", body);
    assert_eq!(body["data"]["config"]["preferred_ip"], "127.0.0.1");
    assert_eq!(body["data"]["endpoint"], alice.endpoint.as_str());

    // a team created with its own address leads from there
    let (status, body) = alice
        .post(
            "/api/teams",
            json!({ "name": "Platform", "preferred_ip": "127.0.0.2" }),
        )
        .await;
    assert_eq!(status, 200, "{}", body);
    let expected = format!("127.0.0.2:{}", port);
    assert_eq!(body["data"]["team"]["leader_endpoint"], expected.as_str());

    let (_, body) = alice.get("/api/network/config").await;
    assert_eq!(body["data"]["config"]["preferred_ip"], "127.0.0.2");
    assert_eq!(body["data"]["endpoint"], expected.as_str());

    let (_, body) = bob
        .post("/api/teams/discover", json!({ "timeout_seconds": 1 }))
        .await;
    let teams = body["data"]["teams"].as_array().unwrap();
    assert_eq!(teams.len(), 1);
    assert_eq!(teams[0]["leader_endpoint"], expected.as_str());
}
