//! Mock Google identity provider for E2E tests.
//!
//! Serves a JWKS endpoint from an in-process HTTP server on its own thread
//! and signs ID tokens shaped like Google's.

use actix_web::{App, HttpResponse, HttpServer, get, web};
use base64::{Engine, engine::general_purpose::URL_SAFE_NO_PAD};
use chrono::{Duration, Utc};
use jsonwebtoken::{Algorithm, EncodingKey, Header};
use rsa::RsaPrivateKey;
use rsa::pkcs1::EncodeRsaPrivateKey;
use rsa::pkcs8::LineEnding;
use rsa::traits::PublicKeyParts;
use serde::Serialize;
use std::net::TcpListener;
use std::sync::{Arc, Mutex};

/// Issuer Google puts in ID tokens.
pub const GOOGLE_ISSUER: &str = "https://accounts.google.com";

/// Client ID the server under test accepts.
pub const TEST_CLIENT_ID: &str = "1234-test.apps.googleusercontent.com";

/// Test RSA key pair with its JWK representation.
#[derive(Clone)]
pub struct TestKeyPair {
    pub kid: String,
    pub encoding_key: EncodingKey,
    pub n_b64: String,
    pub e_b64: String,
}

impl TestKeyPair {
    pub fn generate(kid: &str) -> Self {
        use rsa::rand_core::OsRng;
        let private_key = RsaPrivateKey::new(&mut OsRng, 2048).expect("failed to generate RSA key");

        let pem = private_key
            .to_pkcs1_pem(LineEnding::LF)
            .expect("failed to encode private key");
        let encoding_key =
            EncodingKey::from_rsa_pem(pem.as_bytes()).expect("failed to create encoding key");

        let public_key = private_key.to_public_key();
        TestKeyPair {
            kid: kid.to_string(),
            encoding_key,
            n_b64: URL_SAFE_NO_PAD.encode(public_key.n().to_bytes_be()),
            e_b64: URL_SAFE_NO_PAD.encode(public_key.e().to_bytes_be()),
        }
    }
}

/// Keys currently published by the mock.
pub struct MockGoogleState {
    pub keys: Vec<TestKeyPair>,
}

#[derive(Serialize)]
struct JwksResponse {
    keys: Vec<JwkKey>,
}

#[derive(Serialize)]
struct JwkKey {
    kty: &'static str,
    n: String,
    e: String,
    kid: String,
    alg: &'static str,
    #[serde(rename = "use")]
    use_: &'static str,
}

#[get("/oauth2/v3/certs")]
async fn certs_endpoint(state: web::Data<Arc<Mutex<MockGoogleState>>>) -> HttpResponse {
    let state = state.lock().unwrap();
    let keys = state
        .keys
        .iter()
        .map(|k| JwkKey {
            kty: "RSA",
            n: k.n_b64.clone(),
            e: k.e_b64.clone(),
            kid: k.kid.clone(),
            alg: "RS256",
            use_: "sig",
        })
        .collect();

    HttpResponse::Ok().json(JwksResponse { keys })
}

/// Claims of a Google ID token.
#[derive(Debug, Clone, Serialize)]
pub struct TestIdTokenClaims {
    pub iss: String,
    pub aud: String,
    pub sub: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    pub email_verified: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub picture: Option<String>,
    pub iat: i64,
    pub exp: i64,
}

impl TestIdTokenClaims {
    pub fn valid() -> Self {
        let now = Utc::now();
        Self {
            iss: GOOGLE_ISSUER.to_string(),
            aud: TEST_CLIENT_ID.to_string(),
            sub: "109876543210987654321".to_string(),
            email: Some("maria.gomez@example.com".to_string()),
            email_verified: true,
            name: Some("María Gómez".to_string()),
            picture: Some("https://lh3.googleusercontent.com/a/maria.jpg".to_string()),
            iat: now.timestamp(),
            exp: (now + Duration::minutes(30)).timestamp(),
        }
    }

    pub fn expired(mut self) -> Self {
        let past = Utc::now() - Duration::hours(2);
        self.iat = (past - Duration::hours(1)).timestamp();
        self.exp = past.timestamp();
        self
    }

    pub fn with_audience(mut self, aud: &str) -> Self {
        self.aud = aud.to_string();
        self
    }

    pub fn with_issuer(mut self, iss: &str) -> Self {
        self.iss = iss.to_string();
        self
    }

    pub fn with_email(mut self, email: Option<&str>) -> Self {
        self.email = email.map(String::from);
        self
    }

    pub fn without_picture(mut self) -> Self {
        self.picture = None;
        self
    }
}

/// Mock Google identity provider serving a JWKS endpoint.
pub struct MockGoogleProvider {
    pub jwks_url: String,
    pub state: Arc<Mutex<MockGoogleState>>,
}

impl MockGoogleProvider {
    /// Start the mock on an ephemeral port, on a dedicated thread so it
    /// outlives any single test runtime.
    pub fn start(initial_key: TestKeyPair) -> Self {
        let state = Arc::new(Mutex::new(MockGoogleState {
            keys: vec![initial_key],
        }));

        let listener = TcpListener::bind("127.0.0.1:0").expect("failed to bind");
        let port = listener.local_addr().unwrap().port();
        let jwks_url = format!("http://127.0.0.1:{}/oauth2/v3/certs", port);

        let state_data = state.clone();
        std::thread::spawn(move || {
            actix_rt::System::new().block_on(async move {
                HttpServer::new(move || {
                    App::new()
                        .app_data(web::Data::new(state_data.clone()))
                        .service(certs_endpoint)
                })
                .listen(listener)
                .expect("failed to listen")
                .workers(1)
                .disable_signals()
                .run()
                .await
            })
        });

        MockGoogleProvider { jwks_url, state }
    }

    /// Sign an ID token with the given key.
    pub fn issue_token(&self, claims: &TestIdTokenClaims, key: &TestKeyPair) -> String {
        let mut header = Header::new(Algorithm::RS256);
        header.kid = Some(key.kid.clone());
        jsonwebtoken::encode(&header, claims, &key.encoding_key).expect("failed to encode JWT")
    }

    /// Replace all published keys with `new_key`.
    pub fn rotate_keys(&self, new_key: TestKeyPair) {
        let mut state = self.state.lock().unwrap();
        state.keys = vec![new_key];
    }
}
