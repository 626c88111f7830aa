//! Bearer verification against a local key set endpoint.

use std::net::SocketAddr;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::get;
use axum::{Json, Router};
use jsonwebtoken::{Algorithm, EncodingKey, Header, encode};
use serde_json::{Value, json};
use tokio::sync::RwLock;

use devicehub_auth::identity::{IdentityError, IdentityVerifier, JwksVerifier};
use devicehub_core::config::IdentityConfig;

const AUDIENCE: &str = "https://api.devicehub.test";
const DOMAIN: &str = "tenant.devicehub.test";

// Raw HMAC secrets and their unpadded base64url forms.
const SECRET_ONE: &[u8] = b"devicehub-integration-secret-key-0123456789ab";
const SECRET_ONE_B64: &str = "ZGV2aWNlaHViLWludGVncmF0aW9uLXNlY3JldC1rZXktMDEyMzQ1Njc4OWFi";
const SECRET_TWO: &[u8] = b"devicehub-test-signing-secret-000000000000";
const SECRET_TWO_B64: &str = "ZGV2aWNlaHViLXRlc3Qtc2lnbmluZy1zZWNyZXQtMDAwMDAwMDAwMDAw";

#[derive(Clone)]
struct KeyServer {
    keys: Arc<RwLock<Value>>,
    fetches: Arc<AtomicUsize>,
    failing: Arc<AtomicBool>,
}

impl KeyServer {
    fn new(keys: Value) -> Self {
        Self {
            keys: Arc::new(RwLock::new(keys)),
            fetches: Arc::new(AtomicUsize::new(0)),
            failing: Arc::new(AtomicBool::new(false)),
        }
    }

    fn fetches(&self) -> usize {
        self.fetches.load(Ordering::SeqCst)
    }

    fn fail(&self) {
        self.failing.store(true, Ordering::SeqCst);
    }

    async fn spawn(&self) -> SocketAddr {
        async fn jwks(State(server): State<KeyServer>) -> Result<Json<Value>, StatusCode> {
            server.fetches.fetch_add(1, Ordering::SeqCst);
            if server.failing.load(Ordering::SeqCst) {
                return Err(StatusCode::SERVICE_UNAVAILABLE);
            }
            Ok(Json(server.keys.read().await.clone()))
        }

        let app = Router::new()
            .route("/.well-known/jwks.json", get(jwks))
            .with_state(self.clone());
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.ok();
        });
        addr
    }
}

fn jwk(kid: &str, k: &str) -> Value {
    json!({"kty": "oct", "kid": kid, "alg": "HS256", "k": k})
}

fn config(addr: SocketAddr, ttl_seconds: u64) -> IdentityConfig {
    IdentityConfig {
        domain: DOMAIN.to_string(),
        audience: AUDIENCE.to_string(),
        algorithms: vec!["HS256".to_string()],
        jwks_url: format!("http://{addr}/.well-known/jwks.json"),
        jwks_cache_ttl_seconds: ttl_seconds,
        ..IdentityConfig::default()
    }
}

fn now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap()
        .as_secs()
}

fn valid_claims(sub: &str) -> Value {
    json!({
        "sub": sub,
        "aud": AUDIENCE,
        "iss": format!("https://{DOMAIN}/"),
        "exp": now() + 3600,
        "email": format!("{sub}@example.com"),
    })
}

fn sign(kid: &str, secret: &[u8], claims: &Value) -> String {
    let mut header = Header::new(Algorithm::HS256);
    header.kid = Some(kid.to_string());
    encode(&header, claims, &EncodingKey::from_secret(secret)).unwrap()
}

async fn setup(ttl_seconds: u64) -> (KeyServer, JwksVerifier) {
    let server = KeyServer::new(json!({"keys": [jwk("k1", SECRET_ONE_B64)]}));
    let addr = server.spawn().await;
    let verifier = JwksVerifier::from_config(&config(addr, ttl_seconds)).unwrap();
    (server, verifier)
}

#[tokio::test]
async fn test_valid_token_verified() {
    let (_server, verifier) = setup(300).await;
    let token = sign("k1", SECRET_ONE, &valid_claims("auth0|alice"));

    let claims = verifier.verify(&token).await.unwrap();
    assert_eq!(claims.sub, "auth0|alice");
    assert_eq!(claims.email.as_deref(), Some("auth0|alice@example.com"));
    assert!(claims.name.is_none());
}

#[tokio::test]
async fn test_key_set_cached_between_verifications() {
    let (server, verifier) = setup(300).await;
    let token = sign("k1", SECRET_ONE, &valid_claims("alice"));

    for _ in 0..5 {
        verifier.verify(&token).await.unwrap();
    }
    assert_eq!(server.fetches(), 1);
}

#[tokio::test]
async fn test_expired_token_rejected() {
    let (_server, verifier) = setup(300).await;
    let mut claims = valid_claims("alice");
    claims["exp"] = json!(now() - 3600);

    let err = verifier
        .verify(&sign("k1", SECRET_ONE, &claims))
        .await
        .unwrap_err();
    assert!(matches!(err, IdentityError::Expired), "{err:?}");
}

#[tokio::test]
async fn test_wrong_audience_rejected() {
    let (_server, verifier) = setup(300).await;
    let mut claims = valid_claims("alice");
    claims["aud"] = json!("https://someone-else.test");

    let err = verifier
        .verify(&sign("k1", SECRET_ONE, &claims))
        .await
        .unwrap_err();
    assert!(matches!(err, IdentityError::AudienceMismatch), "{err:?}");
}

#[tokio::test]
async fn test_wrong_issuer_rejected() {
    let (_server, verifier) = setup(300).await;
    let mut claims = valid_claims("alice");
    claims["iss"] = json!("https://evil.test/");

    let err = verifier
        .verify(&sign("k1", SECRET_ONE, &claims))
        .await
        .unwrap_err();
    assert!(matches!(err, IdentityError::IssuerMismatch), "{err:?}");
}

#[tokio::test]
async fn test_bad_signature_rejected() {
    let (_server, verifier) = setup(300).await;
    let token = sign("k1", SECRET_TWO, &valid_claims("alice"));

    let err = verifier.verify(&token).await.unwrap_err();
    assert!(matches!(err, IdentityError::InvalidSignature), "{err:?}");
}

#[tokio::test]
async fn test_missing_subject_rejected() {
    let (_server, verifier) = setup(300).await;
    let mut claims = valid_claims("alice");
    claims.as_object_mut().unwrap().remove("sub");

    let err = verifier
        .verify(&sign("k1", SECRET_ONE, &claims))
        .await
        .unwrap_err();
    assert!(matches!(err, IdentityError::MissingSubject), "{err:?}");
}

#[tokio::test]
async fn test_malformed_and_empty_tokens() {
    let (server, verifier) = setup(300).await;

    assert!(matches!(
        verifier.verify("").await.unwrap_err(),
        IdentityError::MissingCredential
    ));
    assert!(matches!(
        verifier.verify("not.a.jwt").await.unwrap_err(),
        IdentityError::MalformedToken(_)
    ));
    // Rejected before any key set fetch.
    assert_eq!(server.fetches(), 0);
}

#[tokio::test]
async fn test_unknown_kid_refresh_is_rate_limited() {
    let (server, verifier) = setup(300).await;
    verifier
        .verify(&sign("k1", SECRET_ONE, &valid_claims("alice")))
        .await
        .unwrap();

    let err = verifier
        .verify(&sign("k9", SECRET_ONE, &valid_claims("alice")))
        .await
        .unwrap_err();
    assert!(matches!(err, IdentityError::UnknownSigningKey(_)), "{err:?}");
    // The set was fetched moments ago, so no second fetch happens.
    assert_eq!(server.fetches(), 1);
}

#[tokio::test]
async fn test_rotated_key_picked_up_after_expiry() {
    let (server, verifier) = setup(0).await;
    verifier
        .verify(&sign("k1", SECRET_ONE, &valid_claims("alice")))
        .await
        .unwrap();

    *server.keys.write().await = json!({"keys": [jwk("k2", SECRET_TWO_B64)]});

    let claims = verifier
        .verify(&sign("k2", SECRET_TWO, &valid_claims("bob")))
        .await
        .unwrap();
    assert_eq!(claims.sub, "bob");
    assert!(server.fetches() >= 2);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_failing_provider_refreshed_once_for_concurrent_verifies() {
    let (server, verifier) = setup(0).await;
    let token = sign("k1", SECRET_ONE, &valid_claims("alice"));
    verifier.verify(&token).await.unwrap();
    server.fail();

    let verifier = Arc::new(verifier);
    let tasks: Vec<_> = (0..4)
        .map(|_| {
            let verifier = Arc::clone(&verifier);
            let token = token.clone();
            tokio::spawn(async move { verifier.verify(&token).await })
        })
        .collect();
    for task in tasks {
        let claims = task.await.unwrap().unwrap();
        assert_eq!(claims.sub, "alice");
    }

    // One failed refresh; the others reuse the stale set.
    assert_eq!(server.fetches(), 2);

    verifier.verify(&token).await.unwrap();
    assert_eq!(server.fetches(), 2);
}

#[tokio::test]
async fn test_unreachable_provider_reports_unavailable() {
    // Nothing listens on the discard port.
    let addr: SocketAddr = "127.0.0.1:9".parse().unwrap();
    let verifier = JwksVerifier::from_config(&config(addr, 300)).unwrap();

    let err = verifier
        .verify(&sign("k1", SECRET_ONE, &valid_claims("alice")))
        .await
        .unwrap_err();
    assert!(matches!(err, IdentityError::KeySetUnavailable(_)), "{err:?}");
}
