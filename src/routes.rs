use std::sync::Arc;

use actix_web::{HttpRequest, HttpResponse, Responder, guard, http::Method, web};

use crate::error::AppError;
use crate::gpio::{GpioBackend, GpioManager};

pub struct AppState<B: GpioBackend> {
    pub manager: Arc<GpioManager<B>>,
}

impl<B: GpioBackend> Clone for AppState<B> {
    fn clone(&self) -> Self {
        Self {
            manager: Arc::clone(&self.manager),
        }
    }
}

impl<B: GpioBackend + 'static> AppState<B> {
    pub fn api_scope(&self, base_path: &str) -> actix_web::Scope {
        web::scope(base_path)
            .service(
                web::resource("/pins")
                    .route(web::get().to(list_pins::<B>))
                    .route(
                        web::route()
                            .guard(guard_not_methods(&[Method::GET]))
                            .to(method_not_allowed),
                    ),
            )
            .service(
                web::resource("/gpio/{pin}/export")
                    .route(web::post().to(export_pin::<B>))
                    .route(
                        web::route()
                            .guard(guard_not_methods(&[Method::POST]))
                            .to(method_not_allowed),
                    ),
            )
            .service(
                web::resource("/gpio/{pin}/unexport")
                    .route(web::post().to(unexport_pin::<B>))
                    .route(
                        web::route()
                            .guard(guard_not_methods(&[Method::POST]))
                            .to(method_not_allowed),
                    ),
            )
            .service(
                web::resource("/gpio/{pin}/direction")
                    .route(web::get().to(get_direction::<B>))
                    .route(web::post().to(set_direction::<B>))
                    .route(
                        web::route()
                            .guard(guard_not_methods(&[Method::GET, Method::POST]))
                            .to(method_not_allowed),
                    ),
            )
            .service(
                web::resource("/gpio/{pin}/value")
                    .route(web::get().to(get_value::<B>))
                    .route(web::post().to(set_value::<B>))
                    .route(
                        web::route()
                            .guard(guard_not_methods(&[Method::GET, Method::POST]))
                            .to(method_not_allowed),
                    ),
            )
    }
}

async fn list_pins<B: GpioBackend + 'static>(
    state: web::Data<AppState<B>>,
) -> Result<impl Responder, AppError> {
    Ok(web::Json(state.manager.pins().header_pins()))
}

async fn export_pin<B: GpioBackend + 'static>(
    req: HttpRequest,
    body: web::Bytes,
    state: web::Data<AppState<B>>,
) -> Result<impl Responder, AppError> {
    let pin = parse_pin(&req)?;
    let direction = parse_text_payload(&body)?;
    let direction = Some(direction).filter(|d| !d.is_empty());

    state.manager.open(pin, direction).await?;

    Ok(HttpResponse::Ok())
}

async fn unexport_pin<B: GpioBackend + 'static>(
    req: HttpRequest,
    state: web::Data<AppState<B>>,
) -> Result<impl Responder, AppError> {
    let pin = parse_pin(&req)?;

    state.manager.close(pin).await?;

    Ok(HttpResponse::Ok())
}

async fn get_direction<B: GpioBackend + 'static>(
    req: HttpRequest,
    state: web::Data<AppState<B>>,
) -> Result<impl Responder, AppError> {
    let pin = parse_pin(&req)?;
    let direction = state.manager.get_direction(pin).await?;

    Ok(web::Json(direction))
}

async fn set_direction<B: GpioBackend + 'static>(
    req: HttpRequest,
    body: web::Bytes,
    state: web::Data<AppState<B>>,
) -> Result<impl Responder, AppError> {
    let pin = parse_pin(&req)?;
    let direction = parse_text_payload(&body)?;
    if direction.is_empty() {
        return Err(AppError::InvalidValue("Empty direction payload".into()));
    }

    state.manager.set_direction(pin, direction).await?;

    Ok(HttpResponse::Ok())
}

async fn get_value<B: GpioBackend + 'static>(
    req: HttpRequest,
    state: web::Data<AppState<B>>,
) -> Result<impl Responder, AppError> {
    let pin = parse_pin(&req)?;

    let value = state.manager.read(pin).await?;

    Ok(web::Json(value))
}

async fn set_value<B: GpioBackend + 'static>(
    req: HttpRequest,
    body: web::Bytes,
    state: web::Data<AppState<B>>,
) -> Result<impl Responder, AppError> {
    let pin = parse_pin(&req)?;
    let value = parse_value_payload(&body)?;

    state.manager.write(pin, value).await?;

    Ok(HttpResponse::Ok())
}

fn parse_pin(req: &HttpRequest) -> Result<&str, AppError> {
    req.match_info()
        .get("pin")
        .ok_or_else(|| AppError::InvalidPin("missing pin".into()))
}

fn parse_text_payload(body: &[u8]) -> Result<&str, AppError> {
    std::str::from_utf8(body)
        .map(str::trim)
        .map_err(|_| AppError::InvalidValue("Payload must be valid UTF-8".into()))
}

fn parse_value_payload(body: &[u8]) -> Result<bool, AppError> {
    match parse_text_payload(body)? {
        "" => Err(AppError::InvalidValue("Empty value payload".into())),
        "1" | "true" => Ok(true),
        "0" | "false" => Ok(false),
        other => Err(AppError::InvalidValue(format!(
            "Value must be 0, 1, true or false, got {other:?}"
        ))),
    }
}

async fn method_not_allowed() -> HttpResponse {
    HttpResponse::MethodNotAllowed().finish()
}

fn guard_not_methods(methods: &[Method]) -> impl guard::Guard {
    let allowed: Vec<Method> = methods.to_vec();
    guard::fn_guard(move |ctx| !allowed.iter().any(|m| m == ctx.head().method))
}
