//! Shared helpers for the HTTP integration tests

#![allow(dead_code)]

use std::time::Duration;

use actix_web::body::MessageBody;
use actix_web::dev::ServiceResponse;
use actix_web::{test, web};
use serde_json::{json, Value};

use trace_auth::config::MIN_BCRYPT_COST;
use trace_auth::{Config, TokenService};

/// Configuration with a cheap bcrypt cost
pub fn test_config() -> Config {
    Config {
        bcrypt_cost: MIN_BCRYPT_COST,
        ..Config::default()
    }
}

pub fn expiring_config() -> Config {
    Config {
        token_ttl: Duration::ZERO,
        ..test_config()
    }
}

pub fn test_service(config: &Config) -> web::Data<TokenService> {
    web::Data::new(TokenService::new(config))
}

pub fn credentials(username: &str, password: &str) -> Value {
    json!({ "username": username, "password": password })
}

pub fn post_json(path: &str, body: &Value) -> test::TestRequest {
    test::TestRequest::post().uri(path).set_json(body)
}

pub fn get_with_auth(path: &str, authorization: Option<&str>) -> test::TestRequest {
    let req = test::TestRequest::get().uri(path);
    match authorization {
        Some(value) => req.insert_header(("Authorization", value)),
        None => req,
    }
}

/// Split a response into its status code and parsed JSON body
/// (`Value::Null` for empty or non-JSON bodies)
pub async fn status_and_body<B: MessageBody>(resp: ServiceResponse<B>) -> (u16, Value) {
    let status = resp.status().as_u16();
    let bytes = test::read_body(resp).await;
    let value = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, value)
}

pub fn token_of(body: &Value) -> String {
    body["token"]
        .as_str()
        .expect("response should carry a token")
        .to_string()
}
