// src/main.rs

use std::env;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use actix::Actor;
use actix_cors::Cors;
use actix_web::{
    body::{BoxBody, MessageBody},
    dev::{Service, ServiceRequest, ServiceResponse, Transform},
    http,
    middleware::Logger,
    web, App, Error, HttpMessage, HttpResponse, HttpServer,
};
use env_logger::Env;
use futures::future::{ok, Ready};

use projecthub::app_state::AppState;
use projecthub::auth::{login, signup, validate_jwt};
use projecthub::chat_group_api::{
    create_message, get_messages, get_project_chat_group, get_user_chat_groups,
};
use projecthub::emitter::{BusEmitter, EventBus};
use projecthub::entity_store::MongoStore;
use projecthub::file_ingest::DiskStorage;
use projecthub::project_api::{
    add_multiple_users_to_project, add_user_to_project, create_project, delete_project,
    get_project, get_projects_by_organization, get_projects_for_user, remove_user_from_project,
    update_project,
};
use projecthub::project_lifecycle::ProjectLifecycle;
use projecthub::task_api::{create_task, delete_task, get_tasks_by_project, update_task};
use projecthub::user_api::{find_user_by_email, get_user_by_id};
use projecthub::web_socket_server::ws_index;

#[derive(Debug)]
pub struct Authentication;

impl<S, B> Transform<S, ServiceRequest> for Authentication
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error>,
    S::Future: 'static,
    B: MessageBody + 'static,
{
    type Response = ServiceResponse<BoxBody>;
    type Error = Error;
    type Transform = AuthMiddleware<S>;
    type InitError = ();
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        ok(AuthMiddleware { service })
    }
}

pub struct AuthMiddleware<S> {
    service: S,
}

impl<S, B> Service<ServiceRequest> for AuthMiddleware<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error>,
    S::Future: 'static,
    B: MessageBody + 'static,
{
    type Response = ServiceResponse<BoxBody>;
    type Error = Error;
    type Future = Pin<Box<dyn Future<Output = Result<Self::Response, Self::Error>>>>;

    fn poll_ready(&self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.service.poll_ready(cx)
    }

    fn call(&self, req: ServiceRequest) -> Self::Future {
        // Extract "Bearer <token>" from the Authorization header if present;
        // handlers decide whether an authenticated user is required.
        if let Some(auth_header) = req.headers().get(http::header::AUTHORIZATION) {
            if let Ok(auth_str) = auth_header.to_str() {
                if auth_str.starts_with("Bearer ") {
                    let token = auth_str.trim_start_matches("Bearer ").trim().to_string();
                    let secret =
                        env::var("JWT_SECRET").unwrap_or_else(|_| "secret".to_string());
                    match validate_jwt(&token, &secret) {
                        Ok(claims) => {
                            req.extensions_mut().insert(claims.sub);
                        }
                        Err(e) => {
                            let (req_parts, _payload) = req.into_parts();
                            let resp = HttpResponse::Unauthorized()
                                .body(format!("{}", e))
                                .map_into_boxed_body();
                            let srv_resp = ServiceResponse::new(req_parts, resp);
                            return Box::pin(async move { Ok(srv_resp) });
                        }
                    }
                }
            }
        }

        let fut = self.service.call(req);
        Box::pin(async move {
            let res = fut.await?;
            Ok(res.map_into_boxed_body())
        })
    }
}

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    env_logger::Builder::from_env(Env::default().default_filter_or("info")).init();

    let config = projecthub::config::Config::from_env();
    let store = Arc::new(
        MongoStore::connect(&config.mongo_uri, &config.database_name)
            .await
            .expect("Failed to connect to MongoDB"),
    );
    let event_bus = EventBus::new().start();
    let emitter = Arc::new(BusEmitter::new(event_bus.clone()));
    let storage = Arc::new(DiskStorage::new(&config.file_storage_path));
    let lifecycle = Arc::new(ProjectLifecycle::new(store.clone(), storage, emitter));

    println!("Server running at http://{}", config.bind_addr);
    println!("Allowed CORS Origin: {}", config.frontend_origin);

    let bind_addr = config.bind_addr.clone();
    let state = AppState {
        store: store.clone(),
        lifecycle,
        event_bus,
        config: config.clone(),
    };

    let result = HttpServer::new(move || {
        let cors = Cors::default()
            .allowed_origin(&state.config.frontend_origin)
            .allowed_methods(vec!["GET", "POST", "PUT", "DELETE", "OPTIONS"])
            .allowed_headers(vec![
                http::header::CONTENT_TYPE,
                http::header::ACCEPT,
                http::header::AUTHORIZATION,
            ])
            .supports_credentials()
            .max_age(3600);

        App::new()
            .wrap(Logger::default())
            .wrap(cors)
            .wrap(Authentication)
            .app_data(web::Data::new(state.clone()))
            .service(
                web::scope("/auth")
                    .route("/signup", web::post().to(signup))
                    .route("/login", web::post().to(login)),
            )
            .service(
                web::scope("/projects")
                    .route("", web::get().to(get_projects_for_user))
                    .route("/create", web::post().to(create_project))
                    .route("/organization/{id}", web::get().to(get_projects_by_organization))
                    .route("/add_user/{id}", web::post().to(add_user_to_project))
                    .route(
                        "/add_multiple_users/{id}",
                        web::post().to(add_multiple_users_to_project),
                    )
                    .route("/remove_user/{id}", web::post().to(remove_user_from_project))
                    .route("/update/{id}", web::put().to(update_project))
                    .route("/delete/{id}", web::delete().to(delete_project))
                    .route("/{id}", web::get().to(get_project)),
            )
            .service(
                web::scope("/chat_groups")
                    .route("/project/{id}", web::get().to(get_project_chat_group))
                    .route("/user/{id}", web::get().to(get_user_chat_groups))
                    .route("/{id}/messages", web::get().to(get_messages))
                    .route("/{id}/messages", web::post().to(create_message)),
            )
            .service(
                web::scope("/tasks")
                    .route("/create", web::post().to(create_task))
                    .route("/project/{id}", web::get().to(get_tasks_by_project))
                    .route("/update/{id}", web::put().to(update_task))
                    .route("/delete/{id}", web::delete().to(delete_task)),
            )
            .service(
                web::scope("/users")
                    .route("/find_user_email", web::get().to(find_user_by_email))
                    .route("/get/{id}", web::get().to(get_user_by_id)),
            )
            .service(web::resource("/ws").route(web::get().to(ws_index)))
    })
    .bind(&bind_addr)?
    .run()
    .await;

    if let Ok(store) = Arc::try_unwrap(store) {
        store.shutdown().await;
    }
    result
}
