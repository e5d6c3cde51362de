use crate::auth::validator;
use crate::error::AuthError;
use crate::models::{Identity, LoginRequest, RefreshRequest, RegisterRequest, StatusResponse};
use crate::service::TokenService;
use actix_web::{get, web, HttpResponse, Responder};
use actix_web_httpauth::middleware::HttpAuthentication;

#[get("/")]
async fn index() -> impl Responder {
    let html = r#"
    <!DOCTYPE html>
    <html>
    <head>
        <title>Trace Auth API</title>
        <style>
            body {
                background-color: #0d0d0d;
                color: #00ffcc;
                font-family: monospace;
                padding: 40px;
            }
            code {
                background: #1a1a1a;
                padding: 2px 6px;
                border-radius: 4px;
            }
        </style>
    </head>
    <body>
        <h1>Trace Auth API</h1>
        <ul>
            <li><code>GET /health</code> – Health check (returns OK)</li>
            <li><code>POST /register</code> – Create an account, returns a session token</li>
            <li><code>POST /login</code> – Exchange credentials for a session token</li>
            <li><code>POST /refresh</code> – Swap a token for a new one</li>
            <li><code>POST /logout</code> – Revoke the presented token</li>
            <li><code>GET /protected</code> – Requires <code>Authorization: Token &lt;token&gt;</code></li>
        </ul>
    </body>
    </html>
    "#;

    HttpResponse::Ok()
        .content_type("text/html; charset=utf-8")
        .body(html)
}

/// Simple health check
#[get("/health")]
async fn health() -> impl Responder {
    HttpResponse::Ok().body("OK")
}

pub async fn register(
    body: web::Json<RegisterRequest>,
    service: web::Data<TokenService>,
) -> Result<HttpResponse, AuthError> {
    let response = service.register(&body).await?;
    Ok(HttpResponse::Created().json(response))
}

pub async fn login(
    body: web::Json<LoginRequest>,
    service: web::Data<TokenService>,
) -> Result<HttpResponse, AuthError> {
    let response = service.login(&body).await?;
    Ok(HttpResponse::Ok().json(response))
}

pub async fn refresh(
    body: web::Json<RefreshRequest>,
    service: web::Data<TokenService>,
) -> Result<HttpResponse, AuthError> {
    let response = service.refresh(&body).await?;
    Ok(HttpResponse::Ok().json(response))
}

pub async fn logout(
    identity: web::ReqData<Identity>,
    service: web::Data<TokenService>,
) -> Result<HttpResponse, AuthError> {
    service.logout(&identity).await?;
    Ok(HttpResponse::NoContent().finish())
}

pub async fn protected(identity: web::ReqData<Identity>) -> impl Responder {
    tracing::debug!(username = %identity.username, "Protected resource accessed");
    HttpResponse::Ok().json(StatusResponse {
        status: "ok".to_string(),
    })
}

async fn method_not_allowed() -> Result<HttpResponse, AuthError> {
    Err(AuthError::MethodNotAllowed)
}

/// Unparseable JSON bodies answer 400 with the usual error body.
pub fn json_config() -> web::JsonConfig {
    web::JsonConfig::default()
        .error_handler(|err, _req| AuthError::MalformedBody(err.to_string()).into())
}

/// Register every route of the service.
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.app_data(json_config())
        .service(index)
        .service(health)
        .service(
            web::resource("/register")
                .route(web::post().to(register))
                .default_service(web::to(method_not_allowed)),
        )
        .service(
            web::resource("/login")
                .route(web::post().to(login))
                .default_service(web::to(method_not_allowed)),
        )
        .service(
            web::resource("/refresh")
                .route(web::post().to(refresh))
                .default_service(web::to(method_not_allowed)),
        )
        .service(
            web::resource("/logout")
                .wrap(HttpAuthentication::with_fn(validator))
                .route(web::post().to(logout))
                .default_service(web::to(method_not_allowed)),
        )
        .service(
            web::resource("/protected")
                .wrap(HttpAuthentication::with_fn(validator))
                .route(web::get().to(protected))
                .default_service(web::to(method_not_allowed)),
        );
}
